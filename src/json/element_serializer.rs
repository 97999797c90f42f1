// ABOUTME: Strategies for JsonElement and its node types, usable only with the Json format.
// ABOUTME: Also walks an element tree through any encoder so trees embed in typed values.

#![allow(clippy::missing_errors_doc)]

use super::element::{JsonArray, JsonElement, JsonObject, JsonPrimitive};
use super::JsonDecoder;
use crate::descriptor::{DescriptorBuilder, PolymorphicKind, PrimitiveKind, SerialDescriptor, SerialKind};
use crate::encoding::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::strategy::{string_descriptor, unquoted_literal_descriptor, Serializable, SerialStrategy};
use std::sync::{Arc, OnceLock};

/// Serial name of the JsonObject descriptor; maps under this name always keep object layout.
pub(crate) const JSON_OBJECT_NAME: &str = "serialform.json.JsonObject";

fn build_or_unreachable(builder: DescriptorBuilder) -> SerialDescriptor {
    match builder.build() {
        Ok(descriptor) => descriptor,
        Err(_) => unreachable!("JSON element descriptors have unique element names"),
    }
}

/// Sealed descriptor over the four node kinds.
#[must_use]
pub fn json_element_descriptor() -> &'static SerialDescriptor {
    static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
    CELL.get_or_init(|| {
        build_or_unreachable(
            DescriptorBuilder::new(
                "serialform.json.JsonElement",
                SerialKind::Polymorphic(PolymorphicKind::Sealed),
            )
            .deferred_element("JsonPrimitive", || json_primitive_descriptor().clone(), false)
            .deferred_element("JsonNull", || json_null_descriptor().clone(), false)
            .deferred_element("JsonObject", || json_object_descriptor().clone(), false)
            .deferred_element("JsonArray", || json_array_descriptor().clone(), false),
        )
    })
}

#[must_use]
pub fn json_primitive_descriptor() -> &'static SerialDescriptor {
    static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
    CELL.get_or_init(|| SerialDescriptor::primitive("serialform.json.JsonPrimitive", PrimitiveKind::String))
}

#[must_use]
pub fn json_null_descriptor() -> &'static SerialDescriptor {
    static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
    CELL.get_or_init(|| build_or_unreachable(DescriptorBuilder::new("serialform.json.JsonNull", SerialKind::Enum)))
}

#[must_use]
pub fn json_object_descriptor() -> &'static SerialDescriptor {
    static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
    CELL.get_or_init(|| {
        SerialDescriptor::map(JSON_OBJECT_NAME, string_descriptor().clone(), json_element_descriptor().clone())
    })
}

#[must_use]
pub fn json_array_descriptor() -> &'static SerialDescriptor {
    static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
    CELL.get_or_init(|| SerialDescriptor::list("serialform.json.JsonArray", json_element_descriptor().clone()))
}

/// Writes `element` through the generic protocol.
pub(crate) fn write_element(encoder: &mut dyn Encoder, element: &JsonElement) -> Result<()> {
    match element {
        JsonElement::Null => encoder.encode_null(),
        JsonElement::Primitive(primitive) => write_primitive(encoder, primitive),
        JsonElement::Object(object) => {
            let descriptor = json_object_descriptor();
            let composite = encoder.begin_collection(descriptor, object.len())?;
            for (position, (key, value)) in object.iter().enumerate() {
                composite.encode_string_element(descriptor, position * 2, key)?;
                if composite.encode_element(descriptor, position * 2 + 1)? {
                    write_element(composite.as_encoder(), value)?;
                }
            }
            composite.end_structure(descriptor)
        }
        JsonElement::Array(array) => {
            let descriptor = json_array_descriptor();
            let composite = encoder.begin_collection(descriptor, array.len())?;
            for (index, item) in array.iter().enumerate() {
                if composite.encode_element(descriptor, index)? {
                    write_element(composite.as_encoder(), item)?;
                }
            }
            composite.end_structure(descriptor)
        }
    }
}

fn write_primitive(encoder: &mut dyn Encoder, primitive: &JsonPrimitive) -> Result<()> {
    if primitive.is_string() {
        return encoder.encode_string(primitive.content());
    }
    if primitive.content() == "null" {
        return encoder.encode_null();
    }
    if let Some(value) = primitive.as_bool() {
        return encoder.encode_bool(value);
    }
    if let Some(value) = primitive.as_i64() {
        return encoder.encode_long(value);
    }
    // Other literals keep their exact text.
    encoder
        .encode_inline(unquoted_literal_descriptor())?
        .encode_string(primitive.content())
}

fn json_decoder(decoder: &mut dyn Decoder) -> Result<&mut dyn JsonDecoder> {
    decoder
        .as_json_decoder()
        .ok_or_else(|| Error::serialization("This serializer can be used only with Json format"))
}

fn json_encoder_check(encoder: &mut dyn Encoder) -> Result<()> {
    if encoder.as_json_encoder().is_none() {
        return Err(Error::serialization("This serializer can be used only with Json format"));
    }
    Ok(())
}

fn unexpected(expected: &str, actual: &JsonElement) -> Error {
    Error::decoding(format!(
        "Unexpected JSON element, expected {expected}, had {}",
        actual.type_name()
    ))
}

/// Strategy for any JSON node.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonElementSerializer;

impl SerialStrategy<JsonElement> for JsonElementSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        json_element_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &JsonElement) -> Result<()> {
        match encoder.as_json_encoder() {
            Some(json) => json.encode_json_element(value),
            None => Err(Error::serialization("This serializer can be used only with Json format")),
        }
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<JsonElement> {
        json_decoder(decoder)?.decode_json_element()
    }
}

/// Strategy for JSON objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonObjectSerializer;

impl SerialStrategy<JsonObject> for JsonObjectSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        json_object_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &JsonObject) -> Result<()> {
        json_encoder_check(encoder)?;
        let descriptor = json_object_descriptor();
        let composite = encoder.begin_collection(descriptor, value.len())?;
        for (position, (key, item)) in value.iter().enumerate() {
            composite.encode_string_element(descriptor, position * 2, key)?;
            composite.encode_serializable_element(descriptor, position * 2 + 1, &JsonElementSerializer, item)?;
        }
        composite.end_structure(descriptor)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<JsonObject> {
        match json_decoder(decoder)?.decode_json_element()? {
            JsonElement::Object(object) => Ok(object),
            other => Err(unexpected("JsonObject", &other)),
        }
    }
}

/// Strategy for JSON arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArraySerializer;

impl SerialStrategy<JsonArray> for JsonArraySerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        json_array_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &JsonArray) -> Result<()> {
        json_encoder_check(encoder)?;
        let descriptor = json_array_descriptor();
        let composite = encoder.begin_collection(descriptor, value.len())?;
        for (index, item) in value.iter().enumerate() {
            composite.encode_serializable_element(descriptor, index, &JsonElementSerializer, item)?;
        }
        composite.end_structure(descriptor)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<JsonArray> {
        match json_decoder(decoder)?.decode_json_element()? {
            JsonElement::Array(array) => Ok(array),
            other => Err(unexpected("JsonArray", &other)),
        }
    }
}

/// Strategy for string, number and boolean nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPrimitiveSerializer;

impl SerialStrategy<JsonPrimitive> for JsonPrimitiveSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        json_primitive_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &JsonPrimitive) -> Result<()> {
        json_encoder_check(encoder)?;
        write_primitive(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<JsonPrimitive> {
        match json_decoder(decoder)?.decode_json_element()? {
            JsonElement::Primitive(primitive) => Ok(primitive),
            other => Err(unexpected("JsonPrimitive", &other)),
        }
    }
}

/// Strategy for the `null` node, carried as `()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNullSerializer;

impl SerialStrategy<()> for JsonNullSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        json_null_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, _value: &()) -> Result<()> {
        json_encoder_check(encoder)?;
        encoder.encode_null()
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<()> {
        match json_decoder(decoder)?.decode_json_element()? {
            JsonElement::Null => Ok(()),
            other => Err(unexpected("JsonNull", &other)),
        }
    }
}

impl Serializable for JsonElement {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(JsonElementSerializer)
    }
}

impl Serializable for JsonObject {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(JsonObjectSerializer)
    }
}

impl Serializable for JsonArray {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(JsonArraySerializer)
    }
}

impl Serializable for JsonPrimitive {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(JsonPrimitiveSerializer)
    }
}
