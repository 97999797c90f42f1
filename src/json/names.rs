// ABOUTME: JSON element names: naming strategies, alternative names and case-insensitive enums.
// ABOUTME: Derived name tables are memoized per descriptor in a concurrency-safe schema cache.

use super::config::JsonConfig;
use super::element::JsonObject;
use crate::descriptor::{Annotation, SerialDescriptor, SerialKind};
use crate::error::{Error, Result};
use log::trace;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Name tables of one descriptor under one configuration.
pub(crate) struct DescriptorNames {
    descriptor: SerialDescriptor,
    /// Names written on encode, present only when a naming strategy applies.
    encoded: Option<Vec<String>>,
    /// Extra names accepted on decode, lowercased for case-insensitive enums.
    decoded: HashMap<String, usize>,
    case_insensitive: bool,
    /// True when plain element names are not accepted on their own.
    renamed: bool,
    use_alternative_names: bool,
}

impl DescriptorNames {
    fn build(descriptor: &SerialDescriptor, config: &JsonConfig) -> Result<Self> {
        let case_insensitive = config.decode_enums_case_insensitive && descriptor.kind() == SerialKind::Enum;
        let strategy = config
            .naming_strategy
            .filter(|_| descriptor.kind() == SerialKind::CLASS);
        let mut decoded: HashMap<String, usize> = HashMap::new();

        for index in 0..descriptor.elements_count() {
            if config.use_alternative_names {
                for annotation in descriptor.element_annotations(index) {
                    if let Annotation::JsonNames(names) = annotation {
                        for name in names {
                            let name = if case_insensitive { name.to_lowercase() } else { name.clone() };
                            put_or_fail(&mut decoded, descriptor, name, index)?;
                        }
                    }
                }
            }
            let primary = if case_insensitive {
                Some(descriptor.element_name(index).to_lowercase())
            } else {
                strategy.map(|s| s.serial_name_for_json(&descriptor.element_name(index)))
            };
            if let Some(name) = primary {
                put_or_fail(&mut decoded, descriptor, name, index)?;
            }
        }

        let encoded = match strategy {
            Some(strategy) => {
                let mut names = Vec::with_capacity(descriptor.elements_count());
                for (index, base) in descriptor.element_names().enumerate() {
                    let name = strategy.serial_name_for_json(&base);
                    if let Some(previous) = names.iter().position(|n| n == &name) {
                        return Err(Error::configuration(format!(
                            "The transformed name '{name}' for property {base} already exists in {descriptor} \
                             as the name of property {}",
                            descriptor.element_name(previous)
                        )));
                    }
                    debug_assert_eq!(names.len(), index);
                    names.push(name);
                }
                Some(names)
            }
            None => None,
        };

        Ok(Self {
            descriptor: descriptor.clone(),
            encoded,
            decoded,
            case_insensitive,
            renamed: strategy.is_some(),
            use_alternative_names: config.use_alternative_names,
        })
    }

    /// The element index for an input key.
    pub(crate) fn index_of(&self, key: &str) -> Option<usize> {
        if self.case_insensitive {
            return self.decoded.get(&key.to_lowercase()).copied();
        }
        if self.renamed {
            return self.decoded.get(key).copied();
        }
        self.descriptor
            .element_index(key)
            .or_else(|| self.decoded.get(key).copied())
    }

    /// The name written for element `index`.
    pub(crate) fn encoded_name(&self, index: usize) -> Cow<'_, str> {
        match self.encoded.as_ref().and_then(|names| names.get(index)) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => self.descriptor.element_name(index),
        }
    }

    /// The key under which `object` holds element `index`, if any.
    pub(crate) fn find_key<'o>(&self, index: usize, object: &'o JsonObject) -> Option<&'o str> {
        if !self.renamed {
            let base = self.descriptor.element_name(index);
            if let Some((key, _)) = object.get_key_value(base.as_ref()) {
                return Some(key.as_str());
            }
            if !self.use_alternative_names && !self.case_insensitive {
                return None;
            }
        }
        object
            .keys()
            .find(|key| self.index_of(key) == Some(index))
            .map(String::as_str)
    }
}

fn put_or_fail(
    names: &mut HashMap<String, usize>,
    descriptor: &SerialDescriptor,
    name: String,
    index: usize,
) -> Result<()> {
    if let Some(&existing) = names.get(&name) {
        if existing == index {
            return Ok(());
        }
        let entity = if descriptor.kind() == SerialKind::Enum {
            "enum value"
        } else {
            "property"
        };
        return Err(Error::configuration(format!(
            "The suggested name '{name}' for {entity} {} is already one of the names for {entity} {} in {descriptor}",
            descriptor.element_name(index),
            descriptor.element_name(existing)
        )));
    }
    names.insert(name, index);
    Ok(())
}

/// Memoized name tables shared by every operation of one `Json` instance.
///
/// Concurrent misses may build the same table twice; either result is kept.
#[derive(Default)]
pub(crate) struct SchemaCache {
    names: RwLock<HashMap<SerialDescriptor, Arc<DescriptorNames>>>,
}

impl SchemaCache {
    pub(crate) fn names(&self, descriptor: &SerialDescriptor, config: &JsonConfig) -> Result<Arc<DescriptorNames>> {
        if let Some(names) = self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(descriptor)
        {
            return Ok(Arc::clone(names));
        }
        let built = Arc::new(DescriptorNames::build(descriptor, config)?);
        trace!("cached JSON names for {}", descriptor.serial_name());
        let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(names.entry(descriptor.clone()).or_insert(built)))
    }
}

fn needs_table(descriptor: &SerialDescriptor, config: &JsonConfig) -> bool {
    match descriptor.kind() {
        SerialKind::Enum => config.decode_enums_case_insensitive,
        SerialKind::CLASS => config.naming_strategy.is_some(),
        _ => false,
    }
}

/// The element index for `key`, or `None` for an unknown key.
///
/// Plain element names resolve without touching the cache.
pub(crate) fn json_name_index(
    cache: &SchemaCache,
    config: &JsonConfig,
    descriptor: &SerialDescriptor,
    key: &str,
) -> Result<Option<usize>> {
    if !needs_table(descriptor, config) {
        if let Some(index) = descriptor.element_index(key) {
            return Ok(Some(index));
        }
        if !config.use_alternative_names {
            return Ok(None);
        }
    }
    Ok(cache.names(descriptor, config)?.index_of(key))
}

/// The name element `index` is written under.
pub(crate) fn json_element_name<'d>(
    cache: &SchemaCache,
    config: &JsonConfig,
    descriptor: &'d SerialDescriptor,
    index: usize,
) -> Result<Cow<'d, str>> {
    if config.naming_strategy.is_none() || descriptor.kind() != SerialKind::CLASS {
        return Ok(descriptor.element_name(index));
    }
    let names = cache.names(descriptor, config)?;
    Ok(Cow::Owned(names.encoded_name(index).into_owned()))
}
