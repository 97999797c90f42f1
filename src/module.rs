// ABOUTME: SerializersModule: runtime registry of polymorphic subclasses and contextual strategies.
// ABOUTME: Registrations are validated while building; lookups are typed by downcasting.

#![allow(clippy::missing_errors_doc)]

use crate::descriptor::{DescriptorBuilder, SerialDescriptor, SerialKind};
use crate::encoding::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::polymorphic::Subclass;
use crate::strategy::SerialStrategy;
use log::debug;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

type DefaultDeserializer<T> = Arc<dyn Fn(Option<&str>) -> Option<Subclass<T>> + Send + Sync>;

struct PolymorphicScope<T> {
    subclasses: Vec<Subclass<T>>,
    by_name: HashMap<String, usize>,
    default_deserializer: Option<DefaultDeserializer<T>>,
}

struct ContextualEntry {
    descriptor: SerialDescriptor,
    strategy: Box<dyn Any + Send + Sync>,
}

/// Registry consulted by formats and strategies at encode/decode time.
///
/// Polymorphic scopes are keyed by the base serial name and contextual
/// strategies by the serial name of their contextual descriptor.
#[derive(Default)]
pub struct SerializersModule {
    polymorphic: HashMap<String, Box<dyn Any + Send + Sync>>,
    subclass_descriptors: Vec<(String, SerialDescriptor)>,
    contextual: HashMap<String, ContextualEntry>,
}

impl SerializersModule {
    #[must_use]
    pub fn builder() -> SerializersModuleBuilder {
        SerializersModuleBuilder::default()
    }

    /// The shared module with no registrations.
    #[must_use]
    pub fn empty() -> &'static SerializersModule {
        static EMPTY: OnceLock<SerializersModule> = OnceLock::new();
        EMPTY.get_or_init(SerializersModule::default)
    }

    fn scope<T: 'static>(&self, base_name: &str) -> Option<&PolymorphicScope<T>> {
        self.polymorphic.get(base_name)?.downcast_ref()
    }

    /// Registered subclass of `base_name` that owns `value`.
    #[must_use]
    pub fn polymorphic_for_value<T: 'static>(&self, base_name: &str, value: &T) -> Option<Subclass<T>> {
        self.scope::<T>(base_name)?
            .subclasses
            .iter()
            .find(|s| s.matches(value))
            .cloned()
    }

    /// Registered subclass of `base_name` called `name`, falling back to the
    /// scope's default deserializer.
    #[must_use]
    pub fn polymorphic_by_name<T: 'static>(&self, base_name: &str, name: Option<&str>) -> Option<Subclass<T>> {
        let scope = self.scope::<T>(base_name)?;
        if let Some(index) = name.and_then(|n| scope.by_name.get(n)) {
            return Some(scope.subclasses[*index].clone());
        }
        scope.default_deserializer.as_ref().and_then(|f| f(name))
    }

    /// Every registered `(base serial name, subclass descriptor)` pair.
    pub fn subclass_descriptors(&self) -> impl Iterator<Item = (&str, &SerialDescriptor)> {
        self.subclass_descriptors
            .iter()
            .map(|(base, descriptor)| (base.as_str(), descriptor))
    }

    /// Strategy registered for the contextual serial name `name`.
    #[must_use]
    pub fn contextual<T: 'static>(&self, name: &str) -> Option<Arc<dyn SerialStrategy<T>>> {
        self.contextual
            .get(name)?
            .strategy
            .downcast_ref::<Arc<dyn SerialStrategy<T>>>()
            .cloned()
    }

    /// Descriptor of the strategy registered for a contextual descriptor.
    #[must_use]
    pub fn contextual_descriptor(&self, descriptor: &SerialDescriptor) -> Option<SerialDescriptor> {
        if descriptor.kind() != SerialKind::Contextual {
            return None;
        }
        self.contextual
            .get(descriptor.serial_name())
            .map(|entry| entry.descriptor.clone())
    }
}

/// Collects registrations; [`build`](Self::build) reports the first conflict.
#[derive(Default)]
pub struct SerializersModuleBuilder {
    module: SerializersModule,
    error: Option<Error>,
}

impl SerializersModuleBuilder {
    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn scope_mut<T: 'static>(&mut self, base_name: &str) -> Option<&mut PolymorphicScope<T>> {
        let entry = self
            .module
            .polymorphic
            .entry(base_name.to_owned())
            .or_insert_with(|| {
                Box::new(PolymorphicScope::<T> {
                    subclasses: Vec::new(),
                    by_name: HashMap::new(),
                    default_deserializer: None,
                })
            });
        entry.downcast_mut()
    }

    /// Registers subclasses of the polymorphic base `base_name`.
    #[must_use]
    pub fn polymorphic<T: 'static>(mut self, base_name: &str, subclasses: Vec<Subclass<T>>) -> Self {
        for subclass in subclasses {
            let name = subclass.serial_name().to_owned();
            let descriptor = subclass.descriptor().clone();
            let Some(scope) = self.scope_mut::<T>(base_name) else {
                self.fail(Error::configuration(format!(
                    "Polymorphic scope of '{base_name}' is registered for a different base type"
                )));
                return self;
            };
            if scope.by_name.contains_key(&name) {
                self.fail(Error::configuration(format!(
                    "Multiple polymorphic serializers in the scope of '{base_name}' have the same serial name '{name}'"
                )));
                return self;
            }
            scope.by_name.insert(name.clone(), scope.subclasses.len());
            scope.subclasses.push(subclass);
            debug!("registered subclass '{name}' of '{base_name}'");
            self.module
                .subclass_descriptors
                .push((base_name.to_owned(), descriptor));
        }
        self
    }

    /// Registers a fallback used when the discriminator is absent or unknown.
    #[must_use]
    pub fn polymorphic_default_deserializer<T, F>(mut self, base_name: &str, provider: F) -> Self
    where
        T: 'static,
        F: Fn(Option<&str>) -> Option<Subclass<T>> + Send + Sync + 'static,
    {
        let Some(scope) = self.scope_mut::<T>(base_name) else {
            self.fail(Error::configuration(format!(
                "Polymorphic scope of '{base_name}' is registered for a different base type"
            )));
            return self;
        };
        if scope.default_deserializer.is_some() {
            self.fail(Error::configuration(format!(
                "Default deserializer provider for '{base_name}' is already registered"
            )));
            return self;
        }
        scope.default_deserializer = Some(Arc::new(provider));
        self
    }

    /// Registers the strategy resolved for contextual descriptors named `name`.
    #[must_use]
    pub fn contextual<T: 'static>(mut self, name: &str, strategy: Arc<dyn SerialStrategy<T>>) -> Self {
        if self.module.contextual.contains_key(name) {
            self.fail(Error::configuration(format!(
                "Contextual serializer for '{name}' is already registered"
            )));
            return self;
        }
        debug!("registered contextual serializer '{name}'");
        let descriptor = strategy.descriptor().clone();
        self.module.contextual.insert(
            name.to_owned(),
            ContextualEntry {
                descriptor,
                strategy: Box::new(strategy),
            },
        );
        self
    }

    pub fn build(self) -> Result<SerializersModule> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.module),
        }
    }
}

/// Strategy resolved from the module at encode/decode time by contextual name.
pub struct ContextualSerializer<T> {
    descriptor: SerialDescriptor,
    fallback: Option<Arc<dyn SerialStrategy<T>>>,
}

impl<T: 'static> ContextualSerializer<T> {
    /// `fallback` is used when the module has no registration for `name`.
    pub fn new(name: &str, fallback: Option<Arc<dyn SerialStrategy<T>>>) -> Result<Self> {
        let descriptor = DescriptorBuilder::new(name, SerialKind::Contextual).build()?;
        Ok(Self { descriptor, fallback })
    }

    fn resolve(&self, module: &SerializersModule) -> Result<Arc<dyn SerialStrategy<T>>> {
        let name = self.descriptor.serial_name();
        module
            .contextual::<T>(name)
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                Error::serialization(format!(
                    "Serializer for contextual type '{name}' is not found.\n\
                     Register it with SerializersModuleBuilder::contextual."
                ))
            })
    }
}

impl<T: 'static> SerialStrategy<T> for ContextualSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &T) -> Result<()> {
        let strategy = self.resolve(encoder.serializers_module())?;
        strategy.serialize(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T> {
        let strategy = self.resolve(decoder.serializers_module())?;
        strategy.deserialize(decoder)
    }
}
