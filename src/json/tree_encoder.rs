// ABOUTME: Encodes typed values into an in-memory JsonElement tree instead of text.
// ABOUTME: Shares key naming, discriminator and null rules with the streaming encoder.

#![allow(clippy::missing_errors_doc)]

use super::composer::{format_double, format_float, special_double};
use super::config::Hint;
use super::element::{JsonArray, JsonElement, JsonObject, JsonPrimitive};
use super::mode::{invalid_key_kind, switch_mode, WriteMode};
use super::names::json_element_name;
use super::polymorphism::{pending_discriminator, writes_own_discriminator};
use super::{Json, JsonEncoder};
use crate::descriptor::{Annotation, EncodeDefaultMode, SerialDescriptor};
use crate::encoding::{encode_polymorphic_pair, CompositeEncoder, Encoder};
use crate::error::{Error, Result};
use crate::module::SerializersModule;
use crate::strategy::{is_unquoted_literal, is_unsigned_number};
use indexmap::IndexMap;

enum Frame {
    Object {
        entries: IndexMap<String, JsonElement>,
        /// Name of the element being written.
        key: Option<String>,
    },
    List {
        items: Vec<JsonElement>,
    },
    Map {
        entries: IndexMap<String, JsonElement>,
        /// Key written by the even index, waiting for its value.
        key: Option<String>,
        descriptor: SerialDescriptor,
    },
}

pub(crate) struct TreeJsonEncoder<'j> {
    json: &'j Json,
    frames: Vec<Frame>,
    result: Option<JsonElement>,
    pending_discriminator: Option<(String, String)>,
    unsigned: bool,
    unquoted: bool,
}

impl<'j> TreeJsonEncoder<'j> {
    pub(crate) fn new(json: &'j Json) -> Self {
        Self {
            json,
            frames: Vec::new(),
            result: None,
            pending_discriminator: None,
            unsigned: false,
            unquoted: false,
        }
    }

    pub(crate) fn finish(self) -> Result<JsonElement> {
        self.result
            .ok_or_else(|| Error::serialization("Nothing was encoded into the JSON tree"))
    }

    fn put_value(&mut self, value: JsonElement) -> Result<()> {
        match self.frames.last_mut() {
            None => {
                self.result = Some(value);
                Ok(())
            }
            Some(Frame::List { items }) => {
                items.push(value);
                Ok(())
            }
            Some(Frame::Object { entries, key }) => {
                let key = key
                    .take()
                    .ok_or_else(|| Error::serialization("Object value written without an element name"))?;
                entries.insert(key, value);
                Ok(())
            }
            Some(Frame::Map { entries, key, descriptor }) => {
                match key.take() {
                    Some(key) => {
                        entries.insert(key, value);
                    }
                    None => {
                        *key = Some(match value {
                            JsonElement::Primitive(primitive) => primitive.content().to_owned(),
                            JsonElement::Null => "null".to_owned(),
                            _ => return Err(invalid_key_kind(&descriptor.element_descriptor(0))),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    fn put_integer(&mut self, signed: i64, unsigned: u64) -> Result<()> {
        let text = if std::mem::take(&mut self.unsigned) {
            unsigned.to_string()
        } else {
            signed.to_string()
        };
        self.put_value(JsonElement::Primitive(JsonPrimitive::literal(text)))
    }

    fn check_special(&self, value: f64) -> Result<()> {
        match special_double(value) {
            Some(text) if !self.json.config().allow_special_floating_point_values => {
                Err(Error::JsonEncoding(format!(
                    "Unexpected special floating-point value {text}. By default, non-finite floating point \
                     values are prohibited because they do not conform JSON specification.\n{}",
                    Hint::SpecialFloats.message()
                )))
            }
            _ => Ok(()),
        }
    }

    fn in_object(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Object { .. }))
    }
}

impl Encoder for TreeJsonEncoder<'_> {
    fn serializers_module(&self) -> &SerializersModule {
        self.json.serializers_module()
    }

    fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.put_value(JsonElement::Primitive(JsonPrimitive::from(value)))
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_byte(&mut self, value: i8) -> Result<()> {
        self.put_integer(i64::from(value), u64::from(value as u8))
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_short(&mut self, value: i16) -> Result<()> {
        self.put_integer(i64::from(value), u64::from(value as u16))
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_int(&mut self, value: i32) -> Result<()> {
        self.put_integer(i64::from(value), u64::from(value as u32))
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_long(&mut self, value: i64) -> Result<()> {
        self.put_integer(value, value as u64)
    }

    fn encode_float(&mut self, value: f32) -> Result<()> {
        self.check_special(f64::from(value))?;
        self.put_value(JsonElement::Primitive(JsonPrimitive::literal(format_float(value))))
    }

    fn encode_double(&mut self, value: f64) -> Result<()> {
        self.check_special(value)?;
        self.put_value(JsonElement::Primitive(JsonPrimitive::literal(format_double(value))))
    }

    fn encode_char(&mut self, value: char) -> Result<()> {
        self.put_value(JsonElement::Primitive(JsonPrimitive::string(value.to_string())))
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        let primitive = if std::mem::take(&mut self.unquoted) {
            JsonPrimitive::literal(value)
        } else {
            JsonPrimitive::string(value)
        };
        self.put_value(JsonElement::Primitive(primitive))
    }

    fn encode_null(&mut self) -> Result<()> {
        self.put_value(JsonElement::Null)
    }

    fn encode_enum(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<()> {
        let name = descriptor.try_element_name(index)?.into_owned();
        self.put_value(JsonElement::Primitive(JsonPrimitive::string(name)))
    }

    fn encode_inline(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn Encoder> {
        if is_unsigned_number(descriptor) {
            self.unsigned = true;
        } else if is_unquoted_literal(descriptor) {
            self.unquoted = true;
        }
        Ok(self)
    }

    fn begin_structure(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn CompositeEncoder> {
        let config = self.json.config();
        let mode = switch_mode(config, self.json.serializers_module(), descriptor)?;
        let mut entries = IndexMap::new();
        let pending = self.pending_discriminator.take();
        match (mode, pending) {
            (WriteMode::Obj | WriteMode::Map, Some((key, value))) => {
                entries.insert(key, JsonElement::Primitive(JsonPrimitive::string(value)));
            }
            (WriteMode::Obj, None) if writes_own_discriminator(config, descriptor) => {
                let value = JsonPrimitive::string(descriptor.serial_name());
                entries.insert(config.class_discriminator.clone(), JsonElement::Primitive(value));
            }
            _ => {}
        }
        let frame = match mode {
            WriteMode::Obj => Frame::Object { entries, key: None },
            WriteMode::Map => Frame::Map {
                entries,
                key: None,
                descriptor: descriptor.clone(),
            },
            WriteMode::List | WriteMode::PolyObj => Frame::List { items: Vec::new() },
        };
        self.frames.push(frame);
        Ok(self)
    }

    fn encode_polymorphic(
        &mut self,
        base: &SerialDescriptor,
        actual: &SerialDescriptor,
        payload: &mut dyn FnMut(&mut dyn Encoder) -> Result<()>,
    ) -> Result<()> {
        if self.json.config().use_array_polymorphism {
            let composite = self.begin_structure(base)?;
            return encode_polymorphic_pair(composite, base, actual, payload);
        }
        self.pending_discriminator = pending_discriminator(self.json.config(), base, actual)?;
        payload(self)
    }

    fn as_json_encoder(&mut self) -> Option<&mut dyn JsonEncoder> {
        Some(self)
    }
}

impl CompositeEncoder for TreeJsonEncoder<'_> {
    fn encode_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<bool> {
        let json = self.json;
        if let Some(Frame::Object { key, .. }) = self.frames.last_mut() {
            *key = Some(json_element_name(&json.schema, json.config(), descriptor, index)?.into_owned());
        }
        Ok(true)
    }

    fn as_encoder(&mut self) -> &mut dyn Encoder {
        self
    }

    fn end_structure(&mut self, _descriptor: &SerialDescriptor) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::serialization("end_structure without a matching begin_structure"))?;
        let element = match frame {
            Frame::Object { entries, .. } | Frame::Map { entries, .. } => JsonElement::Object(JsonObject::from(entries)),
            Frame::List { items } => JsonElement::Array(JsonArray::from(items)),
        };
        self.put_value(element)
    }

    fn should_encode_element_default(&self, descriptor: &SerialDescriptor, index: usize) -> bool {
        for annotation in descriptor.element_annotations(index) {
            match annotation {
                Annotation::EncodeDefault(EncodeDefaultMode::Always) => return true,
                Annotation::EncodeDefault(EncodeDefaultMode::Never) => return false,
                _ => {}
            }
        }
        self.json.config().encode_defaults
    }

    fn encode_null_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<()> {
        if self.in_object() && !self.json.config().explicit_nulls {
            return Ok(());
        }
        if self.encode_element(descriptor, index)? {
            self.encode_null()?;
        }
        Ok(())
    }
}

impl JsonEncoder for TreeJsonEncoder<'_> {
    fn json(&self) -> &Json {
        self.json
    }

    fn encode_json_element(&mut self, element: &JsonElement) -> Result<()> {
        match (self.pending_discriminator.take(), element) {
            (Some((key, value)), JsonElement::Object(object)) => {
                let mut entries = IndexMap::with_capacity(object.len() + 1);
                entries.insert(key, JsonElement::Primitive(JsonPrimitive::string(value)));
                for (name, item) in object.iter() {
                    entries.insert(name.clone(), item.clone());
                }
                self.put_value(JsonElement::Object(JsonObject::from(entries)))
            }
            _ => self.put_value(element.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::MapSerializer;
    use crate::json::JsonConfig;
    use crate::strategy::{Serializable, SerialStrategy};

    fn encode<T>(json: &Json, strategy: &dyn SerialStrategy<T>, value: &T) -> Result<JsonElement> {
        let mut encoder = TreeJsonEncoder::new(json);
        strategy.serialize(&mut encoder, value)?;
        encoder.finish()
    }

    #[test]
    fn test_primitives_and_lists() {
        let json = Json::default();
        let element = encode(&json, &*Vec::<i32>::serializer(), &vec![1, 2, 3]).unwrap();
        assert_eq!(element.to_string(), "[1,2,3]");
        let element = encode(&json, &*String::serializer(), &"hi".to_owned()).unwrap();
        assert_eq!(element.as_str(), Some("hi"));
    }

    #[test]
    fn test_unsigned_values_are_literals() {
        let json = Json::default();
        let element = encode(&json, &*u64::serializer(), &u64::MAX).unwrap();
        assert_eq!(element.to_string(), "18446744073709551615");
    }

    #[test]
    fn test_map_keys_become_strings() {
        let json = Json::default();
        let strategy = MapSerializer::new(i32::serializer(), i32::serializer());
        let map: indexmap::IndexMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
        let element = encode(&json, &strategy, &map).unwrap();
        assert_eq!(element.to_string(), r#"{"1":10,"2":20}"#);
    }

    #[test]
    fn test_special_floats() {
        let json = Json::default();
        assert!(encode(&json, &*f64::serializer(), &f64::NAN).is_err());
        let lenient = Json::new(JsonConfig {
            allow_special_floating_point_values: true,
            ..JsonConfig::default()
        })
        .unwrap();
        let element = encode(&lenient, &*f64::serializer(), &f64::INFINITY).unwrap();
        assert_eq!(element.to_string(), "Infinity");
    }
}
