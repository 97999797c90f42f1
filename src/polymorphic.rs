// ABOUTME: Polymorphic strategy for open and sealed hierarchies.
// ABOUTME: Resolves the concrete subtype by value or by discriminator name, then delegates.

#![allow(clippy::missing_errors_doc)]

use crate::descriptor::{Annotation, DescriptorBuilder, PolymorphicKind, SerialDescriptor, SerialKind};
use crate::encoding::{Decoder, Encoder, SubtypeVisitor};
use crate::error::{Error, Result};
use crate::module::SerializersModule;
use crate::strategy::{string_descriptor, SerialStrategy};
use std::collections::HashMap;
use std::sync::Arc;

type Matcher<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type SerializeFn<T> = Arc<dyn Fn(&mut dyn Encoder, &T) -> Result<()> + Send + Sync>;
type DeserializeFn<T> = Arc<dyn Fn(&mut dyn Decoder) -> Result<T> + Send + Sync>;

/// One concrete subtype `S` of a polymorphic base `T`, type-erased to `T`.
pub struct Subclass<T> {
    descriptor: SerialDescriptor,
    matches: Matcher<T>,
    serialize: SerializeFn<T>,
    deserialize: DeserializeFn<T>,
}

impl<T> Clone for Subclass<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            matches: Arc::clone(&self.matches),
            serialize: Arc::clone(&self.serialize),
            deserialize: Arc::clone(&self.deserialize),
        }
    }
}

impl<T: 'static> Subclass<T> {
    /// Registers `strategy` as the subtype that `downcast` recognises and
    /// `upcast` converts back into the base.
    pub fn new<S: 'static>(
        strategy: Arc<dyn SerialStrategy<S>>,
        upcast: fn(S) -> T,
        downcast: fn(&T) -> Option<&S>,
    ) -> Self {
        let descriptor = strategy.descriptor().clone();
        let for_serialize = Arc::clone(&strategy);
        Self {
            descriptor,
            matches: Arc::new(move |value: &T| downcast(value).is_some()),
            serialize: Arc::new(move |encoder: &mut dyn Encoder, value: &T| match downcast(value) {
                Some(concrete) => for_serialize.serialize(encoder, concrete),
                None => Err(Error::serialization(format!(
                    "Value is not an instance of '{}'",
                    for_serialize.descriptor().serial_name()
                ))),
            }),
            deserialize: Arc::new(move |decoder: &mut dyn Decoder| strategy.deserialize(decoder).map(upcast)),
        }
    }
}

impl<T> Subclass<T> {
    #[must_use]
    pub fn serial_name(&self) -> &str {
        self.descriptor.serial_name()
    }

    #[must_use]
    pub fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn matches(&self, value: &T) -> bool {
        (self.matches)(value)
    }

    pub fn serialize(&self, encoder: &mut dyn Encoder, value: &T) -> Result<()> {
        (self.serialize)(encoder, value)
    }

    pub fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T> {
        (self.deserialize)(decoder)
    }
}

/// Strategy for a base type whose concrete subtype is chosen at runtime.
///
/// Sealed serializers carry their own subclass table; open serializers look
/// subclasses up in the [`SerializersModule`] of the active format. Sealed
/// tables are consulted before the module.
pub struct PolymorphicSerializer<T> {
    descriptor: SerialDescriptor,
    subclasses: Vec<Subclass<T>>,
    by_name: HashMap<String, usize>,
}

impl<T: 'static> PolymorphicSerializer<T> {
    /// An open hierarchy; every subclass comes from the module.
    pub fn open(base_name: &str) -> Result<Self> {
        Self::build(base_name, PolymorphicKind::Open, Vec::new(), Vec::new())
    }

    /// A sealed hierarchy with a fixed subclass table.
    pub fn sealed(base_name: &str, subclasses: Vec<Subclass<T>>) -> Result<Self> {
        Self::build(base_name, PolymorphicKind::Sealed, subclasses, Vec::new())
    }

    /// Rebuilds the base descriptor with class annotations such as
    /// [`Annotation::ClassDiscriminator`].
    pub fn annotated(self, annotations: Vec<Annotation>) -> Result<Self> {
        let kind = match self.descriptor.kind() {
            SerialKind::Polymorphic(kind) => kind,
            _ => PolymorphicKind::Open,
        };
        let base_name = self.descriptor.serial_name().to_owned();
        Self::build(&base_name, kind, self.subclasses, annotations)
    }

    fn build(
        base_name: &str,
        kind: PolymorphicKind,
        subclasses: Vec<Subclass<T>>,
        annotations: Vec<Annotation>,
    ) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(subclasses.len());
        for (index, subclass) in subclasses.iter().enumerate() {
            if by_name.insert(subclass.serial_name().to_owned(), index).is_some() {
                return Err(Error::configuration(format!(
                    "Multiple sealed subclasses of '{base_name}' have the same serial name '{}'",
                    subclass.serial_name()
                )));
            }
        }

        let annotated_key = annotations.iter().find_map(|annotation| match annotation {
            Annotation::ClassDiscriminator(key) => Some(key.as_str()),
            _ => None,
        });
        if let (PolymorphicKind::Sealed, Some(key)) = (kind, annotated_key) {
            let conflicting = subclasses
                .iter()
                .find(|subclass| subclass.descriptor().cached_serial_names().contains(key));
            if let Some(subclass) = conflicting {
                return Err(Error::configuration(format!(
                    "Sealed subclass '{}' of '{base_name}' has property name that conflicts with \
                     class discriminator '{key}'",
                    subclass.serial_name()
                )));
            }
        }

        let value_descriptor = match kind {
            PolymorphicKind::Sealed => {
                let mut builder =
                    DescriptorBuilder::new(format!("serialform.Sealed<{base_name}>"), SerialKind::Contextual);
                for subclass in &subclasses {
                    builder.add_element(subclass.serial_name(), subclass.descriptor().clone(), false);
                }
                builder.build()?
            }
            PolymorphicKind::Open => {
                DescriptorBuilder::new(format!("serialform.Polymorphic<{base_name}>"), SerialKind::Contextual)
                    .build()?
            }
        };
        let mut builder = DescriptorBuilder::new(base_name, SerialKind::Polymorphic(kind))
            .element("type", string_descriptor().clone())
            .element("value", value_descriptor);
        for annotation in annotations {
            builder.push_class_annotation(annotation);
        }
        Ok(Self {
            descriptor: builder.build()?,
            subclasses,
            by_name,
        })
    }

    fn base_name(&self) -> &str {
        self.descriptor.serial_name()
    }

    /// Finds the subclass that owns `value`.
    pub fn find_for_value(&self, module: &SerializersModule, value: &T) -> Result<Subclass<T>> {
        if let Some(subclass) = self.subclasses.iter().find(|s| s.matches(value)) {
            return Ok(subclass.clone());
        }
        module.polymorphic_for_value(self.base_name(), value).ok_or_else(|| {
            Error::serialization(format!(
                "Serializer for the value is not found in the polymorphic scope of '{}'.\n\
                 Register its subclass in a SerializersModule or seal the hierarchy.",
                self.base_name()
            ))
        })
    }

    /// Finds the subclass registered as `name`; `None` asks for the module's
    /// default deserializer.
    pub fn find_by_name(&self, module: &SerializersModule, name: Option<&str>) -> Result<Subclass<T>> {
        if let Some(index) = name.and_then(|n| self.by_name.get(n)) {
            return Ok(self.subclasses[*index].clone());
        }
        module
            .polymorphic_by_name(self.base_name(), name)
            .ok_or_else(|| Error::UnknownSubtype {
                base: self.base_name().to_owned(),
                subtype: name.map(str::to_owned),
            })
    }
}

struct PolymorphicVisitor<'a, T> {
    owner: &'a PolymorphicSerializer<T>,
    selected: Option<Subclass<T>>,
    value: Option<T>,
}

impl<T: 'static> SubtypeVisitor for PolymorphicVisitor<'_, T> {
    fn select(&mut self, module: &SerializersModule, subtype: Option<&str>) -> Result<SerialDescriptor> {
        let subclass = self.owner.find_by_name(module, subtype)?;
        let descriptor = subclass.descriptor().clone();
        self.selected = Some(subclass);
        Ok(descriptor)
    }

    fn decode_selected(&mut self, decoder: &mut dyn Decoder) -> Result<()> {
        let subclass = self
            .selected
            .as_ref()
            .ok_or_else(|| Error::serialization("Cannot read polymorphic value before its type token"))?;
        self.value = Some(subclass.deserialize(decoder)?);
        Ok(())
    }
}

impl<T: 'static> SerialStrategy<T> for PolymorphicSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &T) -> Result<()> {
        let subclass = self.find_for_value(encoder.serializers_module(), value)?;
        encoder.encode_polymorphic(&self.descriptor, subclass.descriptor(), &mut |inner: &mut dyn Encoder| {
            subclass.serialize(inner, value)
        })
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T> {
        let mut visitor = PolymorphicVisitor {
            owner: self,
            selected: None,
            value: None,
        };
        decoder.decode_polymorphic(&self.descriptor, &mut visitor)?;
        visitor.value.ok_or_else(|| {
            Error::serialization(format!(
                "Polymorphic value has not been read for class {}",
                visitor
                    .selected
                    .as_ref()
                    .map_or("unknown class", Subclass::serial_name)
            ))
        })
    }
}

#[cfg(test)]
#[path = "polymorphic_tests.rs"]
mod tests;
