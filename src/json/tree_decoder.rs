// ABOUTME: Decodes typed values from an in-memory JsonElement tree.
// ABOUTME: Used for element-based decoding and for polymorphic objects buffered by the streaming decoder.

#![allow(clippy::missing_errors_doc)]

use super::config::Hint;
use super::element::{JsonArray, JsonElement, JsonObject, JsonPrimitive};
use super::lexer::Lexer;
use super::mode::{switch_mode, WriteMode};
use super::names::json_name_index;
use super::polymorphism::{class_discriminator, writes_own_discriminator};
use super::streaming_decoder::Coercion;
use super::{Json, JsonDecoder};
use crate::descriptor::{Annotation, SerialDescriptor, SerialKind};
use crate::encoding::{decode_polymorphic_pair, CompositeDecoder, Decoder, SubtypeVisitor};
use crate::error::{minify, Error, Result};
use crate::module::SerializersModule;
use crate::strategy::is_unsigned_number;

/// What the next value-level call reads.
#[derive(Clone, Copy)]
enum Slot<'e> {
    Element(&'e JsonElement),
    /// A map key, always textual in JSON.
    Key(&'e str),
    /// An element missing from its object that reads as null.
    Absent,
}

struct ObjectFrame<'e> {
    object: &'e JsonObject,
    descriptor: SerialDescriptor,
    /// Next descriptor index to examine.
    position: usize,
    /// The selected index and its value; `None` reads as null.
    current: Option<(usize, Option<&'e JsonElement>)>,
    discriminator: Option<String>,
    ignore_unknown: bool,
}

enum Frame<'e> {
    Object(ObjectFrame<'e>),
    /// Arrays, array-encoded maps and `[type, value]` pairs.
    List {
        array: &'e JsonArray,
        position: usize,
    },
    Map {
        object: &'e JsonObject,
        position: usize,
    },
}

impl Frame<'_> {
    fn segment(&self) -> Option<String> {
        match self {
            Frame::Object(frame) => frame
                .current
                .map(|(index, _)| format!(".{}", frame.descriptor.element_name(index))),
            Frame::List { position, .. } => position.checked_sub(1).map(|index| format!("[{index}]")),
            Frame::Map { object, position } => position
                .checked_sub(1)
                .and_then(|index| object.get_index(index / 2))
                .map(|(key, _)| format!("['{key}']")),
        }
    }
}

/// The key `object` holds element `index` of `descriptor` under.
fn find_key<'e>(
    json: &Json,
    descriptor: &SerialDescriptor,
    index: usize,
    object: &'e JsonObject,
) -> Result<Option<&'e str>> {
    let config = json.config();
    if config.naming_strategy.is_none() && !config.use_alternative_names {
        let name = descriptor.element_name(index);
        return Ok(object.get_key_value(name.as_ref()).map(|(key, _)| key.as_str()));
    }
    Ok(json.schema.names(descriptor, config)?.find_key(index, object))
}

/// Coercion of a present value in tree form; mirrors the streaming rules.
fn coerce_tree(json: &Json, descriptor: &SerialDescriptor, index: usize, value: &JsonElement) -> Result<Coercion> {
    let optional = descriptor.is_element_optional(index);
    let element = descriptor.element_descriptor(index);
    if value.is_null() {
        let skip = optional && !element.is_nullable();
        return Ok(if skip { Coercion::Skip } else { Coercion::Keep });
    }
    if element.kind() != SerialKind::Enum {
        return Ok(Coercion::Keep);
    }
    let Some(name) = value.as_primitive().map(JsonPrimitive::content) else {
        return Ok(Coercion::Keep);
    };
    let config = json.config();
    if json_name_index(&json.schema, config, &element, name)?.is_some() {
        Ok(Coercion::Keep)
    } else if optional {
        Ok(Coercion::Skip)
    } else if !config.explicit_nulls && element.is_nullable() {
        Ok(Coercion::Null)
    } else {
        Ok(Coercion::Keep)
    }
}

pub(crate) struct TreeDecoder<'j, 'e> {
    json: &'j Json,
    /// Path of the root element within the original input.
    prefix: String,
    frames: Vec<Frame<'e>>,
    current: Slot<'e>,
    pending_skip: Option<String>,
    unsigned: bool,
}

impl<'j, 'e> TreeDecoder<'j, 'e> {
    pub(crate) fn new(json: &'j Json, root: &'e JsonElement, prefix: String) -> Self {
        Self {
            json,
            prefix,
            frames: Vec::new(),
            current: Slot::Element(root),
            pending_skip: None,
            unsigned: false,
        }
    }

    fn path(&self) -> String {
        let mut path = self.prefix.clone();
        for segment in self.frames.iter().filter_map(Frame::segment) {
            path.push_str(&segment);
        }
        path
    }

    fn fail(&self, message: impl Into<String>, hint: Option<Hint>) -> Error {
        Error::JsonDecoding {
            message: message.into(),
            offset: None,
            path: Some(self.path()),
            hint: hint.map(|hint| hint.message().to_owned()),
            input: None,
        }
    }

    fn found_name(&self) -> &'static str {
        match self.current {
            Slot::Element(element) => element.type_name(),
            Slot::Key(_) => "JsonPrimitive",
            Slot::Absent => "JsonNull",
        }
    }

    /// Content of the current primitive and whether it was quoted.
    fn primitive(&self, expected: &str) -> Result<(&'e str, bool)> {
        match self.current {
            Slot::Element(JsonElement::Primitive(primitive)) => Ok((primitive.content(), primitive.is_string())),
            Slot::Key(key) => Ok((key, true)),
            _ => Err(self.fail(
                format!("Expected JsonPrimitive for {expected}, but had {}", self.found_name()),
                None,
            )),
        }
    }

    fn parse<T: std::str::FromStr>(&self, type_name: &str) -> Result<T> {
        let (content, _) = self.primitive(type_name)?;
        content
            .parse::<T>()
            .map_err(|_| self.fail(format!("Failed to parse literal '{content}' as {type_name} value"), None))
    }

    fn parse_unsigned(&self, type_name: &str, max: u64) -> Result<u64> {
        let value: u64 = self.parse(type_name)?;
        if value > max {
            let message = format!("Failed to parse literal '{value}' as {type_name} value");
            return Err(self.fail(message, None));
        }
        Ok(value)
    }

    /// Signed integers share the text lexer's grammar, exponents included.
    fn parse_signed(&self, type_name: &str) -> Result<i64> {
        let (content, _) = self.primitive(type_name)?;
        Lexer::parse_integer(content)
            .ok_or_else(|| self.fail(format!("Failed to parse literal '{content}' as {type_name} value"), None))
    }

    fn parse_narrow<T: TryFrom<i64>>(&self, type_name: &str) -> Result<T> {
        let value = self.parse_signed(type_name)?;
        T::try_from(value).map_err(|_| self.fail(format!("Failed to parse literal '{value}' as {type_name} value"), None))
    }

    fn parse_floating(&self, type_name: &str) -> Result<f64> {
        let value: f64 = self.parse(type_name)?;
        if !value.is_finite() && !self.json.config().allow_special_floating_point_values {
            return Err(self.fail(
                format!(
                    "Unexpected special floating-point value {value}. By default, non-finite floating point \
                     values are prohibited because they do not conform JSON specification"
                ),
                Some(Hint::SpecialFloats),
            ));
        }
        Ok(value)
    }

    /// The key the current value sits under, for diagnostics.
    fn current_tag(&self) -> String {
        match self.frames.last() {
            Some(Frame::Object(frame)) => frame
                .current
                .map(|(index, _)| frame.descriptor.element_name(index).into_owned())
                .unwrap_or_default(),
            Some(Frame::Map { object, position }) => position
                .checked_sub(1)
                .and_then(|index| object.get_index(index / 2))
                .map(|(key, _)| key.clone())
                .unwrap_or_default(),
            Some(Frame::List { position, .. }) => position.saturating_sub(1).to_string(),
            None => "$".to_owned(),
        }
    }

    fn body_mismatch(&self, expected: &str, descriptor: &SerialDescriptor) -> Error {
        self.fail(
            format!(
                "Expected {expected}, but had {} as the serialized body of {}",
                self.found_name(),
                descriptor.serial_name()
            ),
            None,
        )
    }

    fn object_index(&mut self) -> Result<Option<usize>> {
        let json = self.json;
        let coerce = json.config().coerce_input_values;
        let explicit_nulls = json.config().explicit_nulls;
        let Some(Frame::Object(frame)) = self.frames.last_mut() else {
            return Ok(None);
        };
        while frame.position < frame.descriptor.elements_count() {
            let index = frame.position;
            frame.position += 1;
            let object = frame.object;
            let present = find_key(json, &frame.descriptor, index, object)?.and_then(|key| object.get(key));
            match present {
                Some(value) => {
                    let coercion = if coerce {
                        coerce_tree(json, &frame.descriptor, index, value)?
                    } else {
                        Coercion::Keep
                    };
                    match coercion {
                        Coercion::Skip => continue,
                        Coercion::Null => frame.current = Some((index, None)),
                        Coercion::Keep => frame.current = Some((index, Some(value))),
                    }
                    return Ok(Some(index));
                }
                None => {
                    let descriptor = &frame.descriptor;
                    let read_as_null = !explicit_nulls
                        && !descriptor.is_element_optional(index)
                        && descriptor.element_descriptor(index).is_nullable();
                    if read_as_null {
                        frame.current = Some((index, None));
                        return Ok(Some(index));
                    }
                }
            }
        }
        frame.current = None;
        Ok(None)
    }

    fn check_unknown_keys(&self, frame: &ObjectFrame<'e>) -> Result<()> {
        if frame.ignore_unknown || frame.descriptor.kind().is_polymorphic() {
            return Ok(());
        }
        let config = self.json.config();
        for key in frame.object.keys() {
            if frame.discriminator.as_deref() == Some(key.as_str()) {
                continue;
            }
            if json_name_index(&self.json.schema, config, &frame.descriptor, key)?.is_none() {
                return Err(Error::JsonDecoding {
                    message: format!("Encountered an unknown key '{key}'"),
                    offset: None,
                    path: Some(self.path()),
                    hint: Some(Hint::IgnoreUnknownKeys.message().to_owned()),
                    input: Some(minify(&frame.object.to_string(), None)),
                });
            }
        }
        Ok(())
    }
}

impl Decoder for TreeDecoder<'_, '_> {
    fn serializers_module(&self) -> &SerializersModule {
        self.json.serializers_module()
    }

    fn decode_not_null_mark(&mut self) -> Result<bool> {
        Ok(!matches!(self.current, Slot::Absent | Slot::Element(JsonElement::Null)))
    }

    fn decode_null(&mut self) -> Result<()> {
        match self.current {
            Slot::Absent | Slot::Element(JsonElement::Null) => Ok(()),
            _ => Err(self.fail(format!("Expected JsonNull, but had {}", self.found_name()), None)),
        }
    }

    fn decode_bool(&mut self) -> Result<bool> {
        let (content, quoted) = self.primitive("boolean")?;
        if quoted && !self.json.config().is_lenient && !matches!(self.current, Slot::Key(_)) {
            return Err(self.fail(
                format!("Boolean literal for key '{}' should be unquoted", self.current_tag()),
                Some(Hint::Lenient),
            ));
        }
        match content {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.fail(format!("Failed to parse literal '{content}' as a boolean value"), None)),
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn decode_byte(&mut self) -> Result<i8> {
        if std::mem::take(&mut self.unsigned) {
            return self.parse_unsigned("u8", u64::from(u8::MAX)).map(|v| v as u8 as i8);
        }
        self.parse_narrow("a byte")
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn decode_short(&mut self) -> Result<i16> {
        if std::mem::take(&mut self.unsigned) {
            return self.parse_unsigned("u16", u64::from(u16::MAX)).map(|v| v as u16 as i16);
        }
        self.parse_narrow("a short")
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn decode_int(&mut self) -> Result<i32> {
        if std::mem::take(&mut self.unsigned) {
            return self.parse_unsigned("u32", u64::from(u32::MAX)).map(|v| v as u32 as i32);
        }
        self.parse_narrow("an int")
    }

    #[allow(clippy::cast_possible_wrap)]
    fn decode_long(&mut self) -> Result<i64> {
        if std::mem::take(&mut self.unsigned) {
            return self.parse_unsigned("u64", u64::MAX).map(|v| v as i64);
        }
        self.parse_signed("a long")
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode_float(&mut self) -> Result<f32> {
        self.parse_floating("a float").map(|value| value as f32)
    }

    fn decode_double(&mut self) -> Result<f64> {
        self.parse_floating("a double")
    }

    fn decode_char(&mut self) -> Result<char> {
        let (content, _) = self.primitive("char")?;
        let mut chars = content.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self.fail(format!("Expected single char, but got '{content}'"), None)),
        }
    }

    fn decode_string(&mut self) -> Result<String> {
        let (content, quoted) = self.primitive("string")?;
        if !quoted && !self.json.config().is_lenient {
            return Err(self.fail(
                format!("String literal for key '{}' should be quoted", self.current_tag()),
                Some(Hint::Lenient),
            ));
        }
        Ok(content.to_owned())
    }

    fn decode_enum(&mut self, descriptor: &SerialDescriptor) -> Result<usize> {
        let (name, _) = self.primitive(descriptor.serial_name())?;
        json_name_index(&self.json.schema, self.json.config(), descriptor, name)?.ok_or_else(|| {
            self.fail(
                format!("{} does not contain element with name '{name}'", descriptor.serial_name()),
                None,
            )
        })
    }

    fn decode_inline(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn Decoder> {
        if is_unsigned_number(descriptor) {
            self.unsigned = true;
        }
        Ok(self)
    }

    fn begin_structure(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn CompositeDecoder> {
        let json = self.json;
        let config = json.config();
        let mode = switch_mode(config, json.serializers_module(), descriptor)?;
        let element = match self.current {
            Slot::Element(element) => Some(element),
            _ => None,
        };
        let frame = match (mode, element) {
            (WriteMode::Obj, Some(JsonElement::Object(object))) => {
                let own = writes_own_discriminator(config, descriptor).then(|| config.class_discriminator.clone());
                Frame::Object(ObjectFrame {
                    object,
                    descriptor: descriptor.clone(),
                    position: 0,
                    current: None,
                    discriminator: self.pending_skip.take().or(own),
                    ignore_unknown: config.ignore_unknown_keys
                        || descriptor.has_annotation(&Annotation::JsonIgnoreUnknownKeys),
                })
            }
            (WriteMode::Map, Some(JsonElement::Object(object))) => Frame::Map { object, position: 0 },
            (WriteMode::List | WriteMode::PolyObj, Some(JsonElement::Array(array))) => {
                Frame::List { array, position: 0 }
            }
            (WriteMode::Obj | WriteMode::Map, _) => return Err(self.body_mismatch("JsonObject", descriptor)),
            (WriteMode::List | WriteMode::PolyObj, _) => return Err(self.body_mismatch("JsonArray", descriptor)),
        };
        self.frames.push(frame);
        Ok(self)
    }

    fn decode_polymorphic(&mut self, base: &SerialDescriptor, visitor: &mut dyn SubtypeVisitor) -> Result<()> {
        let json = self.json;
        let config = json.config();
        if config.use_array_polymorphism {
            let composite = self.begin_structure(base)?;
            return decode_polymorphic_pair(composite, base, visitor);
        }
        let Slot::Element(JsonElement::Object(object)) = self.current else {
            return Err(self.body_mismatch("JsonObject", base));
        };
        let key = class_discriminator(base, config).to_owned();
        let subtype = match object.get(&key) {
            None | Some(JsonElement::Null) => None,
            Some(JsonElement::Primitive(primitive)) => Some(primitive.content()),
            Some(other) => {
                return Err(self.fail(
                    format!("Class discriminator '{key}' must be a primitive, but had {}", other.type_name()),
                    None,
                ))
            }
        };
        visitor.select(json.serializers_module(), subtype)?;
        self.pending_skip = Some(key);
        let result = visitor.decode_selected(self);
        self.pending_skip = None;
        result
    }

    fn as_json_decoder(&mut self) -> Option<&mut dyn JsonDecoder> {
        Some(self)
    }
}

impl CompositeDecoder for TreeDecoder<'_, '_> {
    fn decode_element_index(&mut self, _descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        if matches!(self.frames.last(), Some(Frame::Object(_))) {
            return self.object_index();
        }
        match self.frames.last_mut() {
            Some(Frame::Object(_)) => Ok(None),
            Some(Frame::List { array, position }) => Ok((*position < array.len()).then(|| {
                *position += 1;
                *position - 1
            })),
            Some(Frame::Map { object, position }) => Ok((*position < object.len() * 2).then(|| {
                *position += 1;
                *position - 1
            })),
            None => Err(Error::serialization("Element requested outside of a structure")),
        }
    }

    fn select_element(&mut self, _descriptor: &SerialDescriptor, index: usize) -> Result<&mut dyn Decoder> {
        let slot = match self.frames.last() {
            Some(Frame::Object(frame)) => match frame.current {
                Some((current, Some(value))) if current == index => Slot::Element(value),
                Some((current, None)) if current == index => Slot::Absent,
                _ => {
                    let object = frame.object;
                    find_key(self.json, &frame.descriptor, index, object)?
                        .and_then(|key| object.get(key))
                        .map_or(Slot::Absent, Slot::Element)
                }
            },
            Some(Frame::List { array, .. }) => array.get(index).map_or(Slot::Absent, Slot::Element),
            Some(Frame::Map { object, .. }) => match object.get_index(index / 2) {
                Some((key, _)) if index % 2 == 0 => Slot::Key(key.as_str()),
                Some((_, value)) => Slot::Element(value),
                None => Slot::Absent,
            },
            None => return Err(Error::serialization("Element requested outside of a structure")),
        };
        self.current = slot;
        Ok(self)
    }

    fn end_structure(&mut self, _descriptor: &SerialDescriptor) -> Result<()> {
        if let Some(Frame::Object(frame)) = self.frames.last() {
            self.check_unknown_keys(frame)?;
        }
        self.frames
            .pop()
            .ok_or_else(|| Error::serialization("end_structure without a matching begin_structure"))?;
        Ok(())
    }

    fn decode_collection_size(&mut self, _descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        Ok(match self.frames.last() {
            Some(Frame::List { array, .. }) => Some(array.len()),
            Some(Frame::Map { object, .. }) => Some(object.len()),
            _ => None,
        })
    }

    fn as_module(&self) -> &SerializersModule {
        self.json.serializers_module()
    }
}

impl JsonDecoder for TreeDecoder<'_, '_> {
    fn json(&self) -> &Json {
        self.json
    }

    fn decode_json_element(&mut self) -> Result<JsonElement> {
        Ok(match self.current {
            Slot::Element(element) => element.clone(),
            Slot::Key(key) => JsonElement::Primitive(JsonPrimitive::string(key)),
            Slot::Absent => JsonElement::Null,
        })
    }
}

#[cfg(test)]
#[path = "tree_decoder_tests.rs"]
mod tests;
