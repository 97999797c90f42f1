// ABOUTME: Enum strategy: values travel as their ordinal in the enum descriptor.
// ABOUTME: Entry names (and their annotations) live on the descriptor elements.

#![allow(clippy::missing_errors_doc)]

use crate::descriptor::{DescriptorBuilder, SerialDescriptor, SerialKind};
use crate::encoding::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::strategy::SerialStrategy;

/// Descriptor of one enum entry: an object named `Enum.Entry`.
pub fn enum_entry_descriptor(enum_name: &str, entry: &str) -> Result<SerialDescriptor> {
    DescriptorBuilder::new(format!("{enum_name}.{entry}"), SerialKind::OBJECT).build()
}

/// Starts an enum descriptor; add entries with [`add_enum_entry`].
#[must_use]
pub fn enum_descriptor_builder(serial_name: &str) -> DescriptorBuilder {
    DescriptorBuilder::new(serial_name, SerialKind::Enum)
}

/// Adds entry `name` to an enum descriptor under construction.
pub fn add_enum_entry(builder: &mut DescriptorBuilder, enum_name: &str, name: &str) -> Result<()> {
    builder.add_element(name, enum_entry_descriptor(enum_name, name)?, false);
    Ok(())
}

/// Strategy for a fieldless enum whose values are listed in ordinal order.
pub struct EnumSerializer<T> {
    descriptor: SerialDescriptor,
    values: Vec<T>,
}

impl<T: PartialEq + Clone> EnumSerializer<T> {
    /// `entries` pairs each serial name with its value, in ordinal order.
    pub fn new(serial_name: &str, entries: Vec<(&str, T)>) -> Result<Self> {
        let mut builder = enum_descriptor_builder(serial_name);
        let mut values = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            add_enum_entry(&mut builder, serial_name, name)?;
            values.push(value);
        }
        Ok(Self {
            descriptor: builder.build()?,
            values,
        })
    }

    /// Uses a prepared (possibly annotated) enum descriptor.
    pub fn with_descriptor(descriptor: SerialDescriptor, values: Vec<T>) -> Result<Self> {
        if descriptor.kind() != SerialKind::Enum {
            return Err(Error::configuration(format!(
                "Descriptor '{}' of kind {} is not an enum descriptor",
                descriptor.serial_name(),
                descriptor.kind()
            )));
        }
        if descriptor.elements_count() != values.len() {
            return Err(Error::configuration(format!(
                "Enum '{}' declares {} entries but {} values were given",
                descriptor.serial_name(),
                descriptor.elements_count(),
                values.len()
            )));
        }
        Ok(Self { descriptor, values })
    }
}

impl<T: PartialEq + Clone + Send + Sync> SerialStrategy<T> for EnumSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &T) -> Result<()> {
        let index = self.values.iter().position(|v| v == value).ok_or_else(|| {
            let names: Vec<_> = self.descriptor.element_names().collect();
            Error::serialization(format!(
                "Value is not a valid enum {}, must be one of [{}]",
                self.descriptor.serial_name(),
                names.join(", ")
            ))
        })?;
        encoder.encode_enum(&self.descriptor, index)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T> {
        let index = decoder.decode_enum(&self.descriptor)?;
        self.values.get(index).cloned().ok_or_else(|| {
            Error::serialization(format!(
                "{index} is not among valid {} enum values, values size is {}",
                self.descriptor.serial_name(),
                self.values.len()
            ))
        })
    }
}
