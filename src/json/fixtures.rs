// ABOUTME: Hand-written strategies shared by the JSON codec unit tests.
// ABOUTME: Classes with defaults, nullable and enum elements, and a sealed Response hierarchy.

use crate::descriptor::{DescriptorBuilder, SerialDescriptor, SerialKind};
use crate::encoding::{Decoder, Encoder};
use crate::enums::EnumSerializer;
use crate::error::{Error, Result};
use crate::polymorphic::{PolymorphicSerializer, Subclass};
use crate::strategy::{
    int_descriptor, missing_fields_error, string_descriptor, Serializable, SerialStrategy, StringSerializer,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Project {
    pub name: String,
    pub language: String,
}

impl Project {
    pub(crate) fn new(name: &str, language: &str) -> Self {
        Self {
            name: name.to_owned(),
            language: language.to_owned(),
        }
    }
}

/// `Project(name, language = "Kotlin")`
pub(crate) struct ProjectSerializer {
    descriptor: SerialDescriptor,
}

impl ProjectSerializer {
    pub(crate) fn new() -> Self {
        let descriptor = DescriptorBuilder::new("Project", SerialKind::CLASS)
            .element("name", string_descriptor().clone())
            .optional_element("language", string_descriptor().clone())
            .build()
            .unwrap();
        Self { descriptor }
    }
}

impl SerialStrategy<Project> for ProjectSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Project) -> Result<()> {
        let d = &self.descriptor;
        let composite = encoder.begin_structure(d)?;
        composite.encode_string_element(d, 0, &value.name)?;
        if composite.should_encode_element_default(d, 1) || value.language != "Kotlin" {
            composite.encode_string_element(d, 1, &value.language)?;
        }
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Project> {
        let d = &self.descriptor;
        let composite = decoder.begin_structure(d)?;
        let mut name = None;
        let mut language = "Kotlin".to_owned();
        while let Some(index) = composite.decode_element_index(d)? {
            match index {
                0 => name = Some(composite.decode_string_element(d, 0)?),
                1 => language = composite.decode_string_element(d, 1)?,
                _ => return Err(Error::serialization(format!("Unexpected index {index}"))),
            }
        }
        composite.end_structure(d)?;
        let name = name.ok_or_else(|| missing_fields_error(0, 0b1, d))?;
        Ok(Project { name, language })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Color {
    Red,
    Green,
}

pub(crate) fn color_serializer() -> EnumSerializer<Color> {
    EnumSerializer::new("Color", vec![("RED", Color::Red), ("GREEN", Color::Green)]).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    /// Nullable and required.
    pub color: Option<Color>,
    /// Optional, defaults to `Red`.
    pub mode: Color,
    /// Optional, defaults to 0.
    pub count: i32,
    /// Nullable and optional, defaults to `None`.
    pub label: Option<String>,
}

pub(crate) struct SettingsSerializer {
    descriptor: SerialDescriptor,
    color: EnumSerializer<Color>,
}

impl SettingsSerializer {
    pub(crate) fn new() -> Self {
        let color = color_serializer();
        let descriptor = DescriptorBuilder::new("Settings", SerialKind::CLASS)
            .element("color", color.descriptor().nullable())
            .optional_element("mode", color.descriptor().clone())
            .optional_element("count", int_descriptor().clone())
            .optional_element("label", string_descriptor().nullable())
            .build()
            .unwrap();
        Self { descriptor, color }
    }
}

impl SerialStrategy<Settings> for SettingsSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Settings) -> Result<()> {
        let d = &self.descriptor;
        let composite = encoder.begin_structure(d)?;
        composite.encode_nullable_serializable_element(d, 0, &self.color, value.color.as_ref())?;
        if composite.should_encode_element_default(d, 1) || value.mode != Color::Red {
            composite.encode_serializable_element(d, 1, &self.color, &value.mode)?;
        }
        if composite.should_encode_element_default(d, 2) || value.count != 0 {
            composite.encode_int_element(d, 2, value.count)?;
        }
        if composite.should_encode_element_default(d, 3) || value.label.is_some() {
            composite.encode_nullable_serializable_element(d, 3, &StringSerializer, value.label.as_ref())?;
        }
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Settings> {
        let d = &self.descriptor;
        let composite = decoder.begin_structure(d)?;
        let mut seen = 0u64;
        let mut settings = Settings {
            color: None,
            mode: Color::Red,
            count: 0,
            label: None,
        };
        while let Some(index) = composite.decode_element_index(d)? {
            seen |= 1 << index;
            match index {
                0 => settings.color = composite.decode_nullable_serializable_element(d, 0, &self.color, None)?,
                1 => settings.mode = composite.decode_serializable_element(d, 1, &self.color, None)?,
                2 => settings.count = composite.decode_int_element(d, 2)?,
                3 => settings.label = composite.decode_nullable_serializable_element(d, 3, &StringSerializer, None)?,
                _ => return Err(Error::serialization(format!("Unexpected index {index}"))),
            }
        }
        composite.end_structure(d)?;
        if seen & 0b1 == 0 {
            return Err(missing_fields_error(seen, 0b1, d));
        }
        Ok(settings)
    }
}

/// A class with a single required element wrapping another strategy.
pub(crate) struct FieldClass<T> {
    descriptor: SerialDescriptor,
    inner: Arc<dyn SerialStrategy<T>>,
}

impl<T> FieldClass<T> {
    pub(crate) fn new(serial_name: &str, field: &str, inner: Arc<dyn SerialStrategy<T>>) -> Self {
        let descriptor = DescriptorBuilder::new(serial_name, SerialKind::CLASS)
            .element(field, inner.descriptor().clone())
            .build()
            .unwrap();
        Self { descriptor, inner }
    }
}

impl<T> SerialStrategy<T> for FieldClass<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &T) -> Result<()> {
        let d = &self.descriptor;
        let composite = encoder.begin_structure(d)?;
        composite.encode_serializable_element(d, 0, &*self.inner, value)?;
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T> {
        let d = &self.descriptor;
        let composite = decoder.begin_structure(d)?;
        let mut value = None;
        while let Some(index) = composite.decode_element_index(d)? {
            if index != 0 {
                return Err(Error::serialization(format!("Unexpected index {index}")));
            }
            value = Some(composite.decode_serializable_element(d, 0, &*self.inner, value)?);
        }
        composite.end_structure(d)?;
        value.ok_or_else(|| missing_fields_error(0, 0b1, d))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Response {
    Ok(i32),
    Err(String),
}

/// Sealed `Response` with `Ok(data: Int)` and `Err(message: String)`.
pub(crate) fn response_serializer() -> PolymorphicSerializer<Response> {
    let ok_body: Arc<dyn SerialStrategy<i32>> = Arc::new(FieldClass::new("Ok", "data", i32::serializer()));
    let err_body: Arc<dyn SerialStrategy<String>> =
        Arc::new(FieldClass::new("Err", "message", String::serializer()));
    let ok = Subclass::new(
        ok_body,
        Response::Ok,
        |r| match r {
            Response::Ok(data) => Some(data),
            Response::Err(_) => None,
        },
    );
    let err = Subclass::new(
        err_body,
        Response::Err,
        |r| match r {
            Response::Err(message) => Some(message),
            Response::Ok(_) => None,
        },
    );
    PolymorphicSerializer::sealed("Response", vec![ok, err]).unwrap()
}
