// ABOUTME: Streaming JSON decoder pulling values from the lexer as strategies ask for them.
// ABOUTME: Handles key lookup, coercion, implicit nulls and discriminator lookahead per structure.

#![allow(clippy::missing_errors_doc)]

use super::config::Hint;
use super::element::JsonElement;
use super::lexer::{Lexer, Token};
use super::mode::{switch_mode, WriteMode};
use super::names::json_name_index;
use super::polymorphism::{class_discriminator, writes_own_discriminator};
use super::tree_decoder::TreeDecoder;
use super::tree_reader::read_element;
use super::{Json, JsonDecoder};
use crate::descriptor::{Annotation, SerialDescriptor, SerialKind};
use crate::encoding::{decode_polymorphic_pair, CompositeDecoder, Decoder, SubtypeVisitor};
use crate::error::{Error, Result};
use crate::marker::ElementMarker;
use crate::module::SerializersModule;
use crate::strategy::is_unsigned_number;
use log::trace;
use std::borrow::Cow;

/// Outcome of checking a known key against the coercion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coercion {
    /// Decode the value as written.
    Keep,
    /// Drop the value; the element keeps its default.
    Skip,
    /// Drop the value and decode the element as null.
    Null,
}

/// Elements that must be read as null when absent from the input.
pub(crate) fn absent_is_null(descriptor: &SerialDescriptor, index: usize) -> bool {
    !descriptor.is_element_optional(index) && descriptor.element_descriptor(index).is_nullable()
}

struct Frame {
    mode: WriteMode,
    /// List and map cursor; -1 before the first element.
    current_index: isize,
    /// True once an object member has been read.
    started: bool,
    marker: Option<ElementMarker>,
    discriminator_to_skip: Option<String>,
    ignore_unknown: bool,
}

pub(crate) struct StreamingJsonDecoder<'j, 'a> {
    json: &'j Json,
    lexer: Lexer<'a>,
    frames: Vec<Frame>,
    /// Discriminator key the next opened object must skip.
    pending_skip: Option<String>,
    /// The element just returned was absent and reads as null.
    unmarked_null: bool,
    /// The next primitive is a map key and is recorded in the path.
    capture_key: bool,
    unsigned: bool,
}

impl<'j, 'a> StreamingJsonDecoder<'j, 'a> {
    pub(crate) fn new(json: &'j Json, input: &'a str) -> Self {
        Self {
            json,
            lexer: Lexer::new(input, json.config().is_lenient),
            frames: Vec::new(),
            pending_skip: None,
            unmarked_null: false,
            capture_key: false,
            unsigned: false,
        }
    }

    pub(crate) fn path(&self) -> String {
        self.lexer.path.render()
    }

    pub(crate) fn expect_eof(&mut self) -> Result<()> {
        self.lexer.expect_eof()
    }

    pub(crate) fn read_tree(&mut self) -> Result<JsonElement> {
        read_element(&mut self.lexer, self.json.config().allow_trailing_comma)
    }

    fn record_key(&mut self, key: &str) {
        if std::mem::take(&mut self.capture_key) {
            self.lexer.path.update_current_map_key(key.to_owned());
        }
    }

    fn top(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::serialization("Element requested outside of a structure"))
    }

    fn read_string_token(&mut self) -> Result<Cow<'a, str>> {
        if self.json.config().is_lenient {
            self.lexer.consume_string_lenient()
        } else {
            self.lexer.consume_string()
        }
    }

    fn decode_narrow<T: TryFrom<i64>>(&mut self, type_name: &str) -> Result<T> {
        let start = self.lexer.skip_whitespace();
        let value = self.lexer.consume_numeric_literal()?;
        self.record_key(&value.to_string());
        T::try_from(value)
            .map_err(|_| self.lexer.fail_at(format!("Failed to parse {type_name} for input '{value}'"), start, None))
    }

    /// Reads an unsigned value of `type_name` that must not exceed `max`.
    fn decode_unsigned(&mut self, type_name: &str, max: u64) -> Result<u64> {
        let start = self.lexer.skip_whitespace();
        let content = self.lexer.consume_string_lenient()?;
        self.record_key(&content);
        content
            .parse::<u64>()
            .ok()
            .filter(|&value| value <= max)
            .ok_or_else(|| {
                self.lexer
                    .fail_at(format!("Failed to parse type '{type_name}' for input '{content}'"), start, None)
            })
    }

    fn decode_floating(&mut self, type_name: &str) -> Result<f64> {
        let start = self.lexer.skip_whitespace();
        let content = self.lexer.consume_string_lenient()?;
        self.record_key(&content);
        let value = content.parse::<f64>().map_err(|_| {
            self.lexer
                .fail_at(format!("Failed to parse type '{type_name}' for input '{content}'"), start, None)
        })?;
        if !value.is_finite() && !self.json.config().allow_special_floating_point_values {
            return Err(self.lexer.fail_at(
                format!(
                    "Unexpected special floating-point value {content}. By default, non-finite floating point \
                     values are prohibited because they do not conform JSON specification"
                ),
                start,
                Some(Hint::SpecialFloats),
            ));
        }
        Ok(value)
    }

    /// Decides whether the value of a known key is replaced by its default or
    /// by null. Consumes the value unless it is kept.
    fn coerce_value(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<Coercion> {
        let optional = descriptor.is_element_optional(index);
        let element = descriptor.element_descriptor(index);
        if optional && !element.is_nullable() && self.lexer.try_consume_null(true) {
            return Ok(Coercion::Skip);
        }
        if element.kind() != SerialKind::Enum {
            return Ok(Coercion::Keep);
        }
        if element.is_nullable() && self.lexer.try_consume_null(false) {
            return Ok(Coercion::Keep);
        }
        let Some(value) = self.lexer.peek_string() else {
            return Ok(Coercion::Keep);
        };
        let json = self.json;
        let config = json.config();
        if json_name_index(&json.schema, config, &element, &value)?.is_some() {
            return Ok(Coercion::Keep);
        }
        let outcome = if optional {
            Coercion::Skip
        } else if !config.explicit_nulls && element.is_nullable() {
            Coercion::Null
        } else {
            return Ok(Coercion::Keep);
        };
        self.read_string_token()?;
        Ok(outcome)
    }

    fn decode_object_index(&mut self, descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        let json = self.json;
        let config = json.config();
        let mut has_comma = self.lexer.try_consume_comma();
        while self.lexer.can_consume_value() {
            if self.top()?.started && !has_comma {
                return Err(self.lexer.fail("Expected comma after the key-value pair"));
            }
            self.top()?.started = true;
            let key_start = self.lexer.skip_whitespace();
            let key = self.lexer.consume_key_string()?;
            self.lexer.consume_token(Token::Colon)?;

            if let Some(index) = json_name_index(&json.schema, config, descriptor, &key)? {
                let coercion = if config.coerce_input_values {
                    self.coerce_value(descriptor, index)?
                } else {
                    Coercion::Keep
                };
                if coercion == Coercion::Skip {
                    has_comma = self.lexer.try_consume_comma();
                    continue;
                }
                if let Some(marker) = self.top()?.marker.as_mut() {
                    marker.mark(index);
                }
                self.unmarked_null = coercion == Coercion::Null;
                self.lexer.path.update_descriptor_index(index);
                return Ok(Some(index));
            }

            let frame = self.top()?;
            let skip_discriminator = frame.discriminator_to_skip.as_deref() == Some(key.as_ref());
            if skip_discriminator {
                frame.discriminator_to_skip = None;
            }
            if !(frame.ignore_unknown || skip_discriminator) {
                return Err(self.lexer.fail_at(
                    format!("Encountered an unknown key '{key}'"),
                    key_start,
                    Some(Hint::IgnoreUnknownKeys),
                ));
            }
            self.lexer.skip_element()?;
            has_comma = self.lexer.try_consume_comma();
        }
        if has_comma && !config.allow_trailing_comma {
            return Err(self.lexer.invalid_trailing_comma("object"));
        }
        let next = self.top()?.marker.as_mut().and_then(ElementMarker::next_unmarked_index);
        if let Some(index) = next {
            self.unmarked_null = true;
            self.lexer.path.update_descriptor_index(index);
        }
        Ok(next)
    }

    fn decode_map_index(&mut self) -> Result<Option<usize>> {
        let current = self.top()?.current_index;
        let decoding_key = current % 2 != 0;
        let mut has_comma = false;
        if decoding_key {
            if current != -1 {
                has_comma = self.lexer.try_consume_comma();
            }
        } else {
            self.lexer.consume_token(Token::Colon)?;
        }
        if !self.lexer.can_consume_value() {
            if has_comma && !self.json.config().allow_trailing_comma {
                return Err(self.lexer.invalid_trailing_comma("object"));
            }
            return Ok(None);
        }
        if decoding_key && current != -1 && !has_comma {
            return Err(self.lexer.fail("Expected comma after the key-value pair"));
        }
        let frame = self.top()?;
        frame.current_index += 1;
        Ok(usize::try_from(frame.current_index).ok())
    }

    fn decode_list_index(&mut self) -> Result<Option<usize>> {
        let has_comma = self.lexer.try_consume_comma();
        if !self.lexer.can_consume_value() {
            if has_comma && !self.json.config().allow_trailing_comma {
                return Err(self.lexer.invalid_trailing_comma("array"));
            }
            return Ok(None);
        }
        let frame = self.top()?;
        if frame.current_index != -1 && !has_comma {
            return Err(self.lexer.fail("Expected end of the array or comma"));
        }
        frame.current_index += 1;
        let index = usize::try_from(frame.current_index).ok();
        if let Some(index) = index {
            self.lexer.path.update_descriptor_index(index);
        }
        Ok(index)
    }
}

impl Decoder for StreamingJsonDecoder<'_, '_> {
    fn serializers_module(&self) -> &SerializersModule {
        self.json.serializers_module()
    }

    fn decode_not_null_mark(&mut self) -> Result<bool> {
        Ok(!self.unmarked_null && !self.lexer.try_consume_null(false))
    }

    fn decode_null(&mut self) -> Result<()> {
        if std::mem::take(&mut self.unmarked_null) {
            return Ok(());
        }
        self.capture_key = false;
        self.lexer.consume_null()
    }

    fn decode_bool(&mut self) -> Result<bool> {
        let value = self.lexer.consume_boolean()?;
        self.record_key(if value { "true" } else { "false" });
        Ok(value)
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn decode_byte(&mut self) -> Result<i8> {
        if std::mem::take(&mut self.unsigned) {
            return self.decode_unsigned("u8", u64::from(u8::MAX)).map(|v| v as u8 as i8);
        }
        self.decode_narrow("byte")
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn decode_short(&mut self) -> Result<i16> {
        if std::mem::take(&mut self.unsigned) {
            return self.decode_unsigned("u16", u64::from(u16::MAX)).map(|v| v as u16 as i16);
        }
        self.decode_narrow("short")
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn decode_int(&mut self) -> Result<i32> {
        if std::mem::take(&mut self.unsigned) {
            return self.decode_unsigned("u32", u64::from(u32::MAX)).map(|v| v as u32 as i32);
        }
        self.decode_narrow("int")
    }

    #[allow(clippy::cast_possible_wrap)]
    fn decode_long(&mut self) -> Result<i64> {
        if std::mem::take(&mut self.unsigned) {
            return self.decode_unsigned("u64", u64::MAX).map(|v| v as i64);
        }
        let value = self.lexer.consume_numeric_literal()?;
        self.record_key(&value.to_string());
        Ok(value)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode_float(&mut self) -> Result<f32> {
        self.decode_floating("float").map(|value| value as f32)
    }

    fn decode_double(&mut self) -> Result<f64> {
        self.decode_floating("double")
    }

    fn decode_char(&mut self) -> Result<char> {
        let start = self.lexer.skip_whitespace();
        let content = self.lexer.consume_string_lenient()?;
        self.record_key(&content);
        let mut chars = content.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self
                .lexer
                .fail_at(format!("Expected single char, but got '{content}'"), start, None)),
        }
    }

    fn decode_string(&mut self) -> Result<String> {
        let value = self.read_string_token()?.into_owned();
        self.record_key(&value);
        Ok(value)
    }

    fn decode_enum(&mut self, descriptor: &SerialDescriptor) -> Result<usize> {
        let start = self.lexer.skip_whitespace();
        let name = self.read_string_token()?;
        self.record_key(&name);
        json_name_index(&self.json.schema, self.json.config(), descriptor, &name)?.ok_or_else(|| {
            self.lexer.fail_at(
                format!("{} does not contain element with name '{name}'", descriptor.serial_name()),
                start,
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
        self.capture_key = false;
        self.lexer.path.push_descriptor(descriptor);
        let begin = match mode.begin() {
            '{' => Token::BeginObject,
            _ => Token::BeginList,
        };
        self.lexer.consume_token(begin)?;
        if self.lexer.peek_next_token() == Token::Comma {
            return Err(self.lexer.fail("Unexpected leading comma"));
        }
        let marker = (mode == WriteMode::Obj && !config.explicit_nulls).then(|| {
            let read_if_absent: fn(&SerialDescriptor, usize) -> bool = absent_is_null;
            ElementMarker::new(descriptor, read_if_absent)
        });
        self.frames.push(Frame {
            mode,
            current_index: -1,
            started: false,
            marker,
            discriminator_to_skip: self.pending_skip.take().or_else(|| {
                (mode == WriteMode::Obj && writes_own_discriminator(config, descriptor))
                    .then(|| config.class_discriminator.clone())
            }),
            ignore_unknown: config.ignore_unknown_keys || descriptor.has_annotation(&Annotation::JsonIgnoreUnknownKeys),
        });
        Ok(self)
    }

    fn decode_polymorphic(&mut self, base: &SerialDescriptor, visitor: &mut dyn SubtypeVisitor) -> Result<()> {
        let json = self.json;
        let config = json.config();
        if config.use_array_polymorphism {
            let composite = self.begin_structure(base)?;
            return decode_polymorphic_pair(composite, base, visitor);
        }
        let key = class_discriminator(base, config).to_owned();
        if let Some(subtype) = self.lexer.peek_leading_matching_value(&key) {
            visitor.select(self.json.serializers_module(), Some(subtype.as_str()))?;
            self.pending_skip = Some(key);
            let result = visitor.decode_selected(self);
            self.pending_skip = None;
            return result;
        }
        trace!(
            "discriminator '{key}' of {} is not the leading key; buffering the object",
            base.serial_name()
        );
        let prefix = self.path();
        let element = self.read_tree()?;
        TreeDecoder::new(self.json, &element, prefix).decode_polymorphic(base, visitor)
    }

    fn as_json_decoder(&mut self) -> Option<&mut dyn JsonDecoder> {
        Some(self)
    }
}

impl CompositeDecoder for StreamingJsonDecoder<'_, '_> {
    fn decode_element_index(&mut self, descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        self.unmarked_null = false;
        match self.top()?.mode {
            WriteMode::Obj => self.decode_object_index(descriptor),
            WriteMode::Map => self.decode_map_index(),
            WriteMode::List | WriteMode::PolyObj => self.decode_list_index(),
        }
    }

    fn select_element(&mut self, _descriptor: &SerialDescriptor, index: usize) -> Result<&mut dyn Decoder> {
        if self.top()?.mode == WriteMode::Map && index % 2 == 0 {
            self.lexer.path.reset_current_map_key();
            self.capture_key = true;
        }
        Ok(self)
    }

    fn end_structure(&mut self, descriptor: &SerialDescriptor) -> Result<()> {
        let frame = self.top()?;
        if frame.ignore_unknown && frame.mode == WriteMode::Obj && descriptor.elements_count() == 0 {
            while self.decode_element_index(descriptor)?.is_some() {}
        }
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::serialization("end_structure without a matching begin_structure"))?;
        let (end, entity) = match frame.mode {
            WriteMode::Obj | WriteMode::Map => (Token::EndObject, "object"),
            WriteMode::List | WriteMode::PolyObj => (Token::EndList, "array"),
        };
        if self.lexer.try_consume_comma() && !self.json.config().allow_trailing_comma {
            return Err(self.lexer.invalid_trailing_comma(entity));
        }
        self.lexer.consume_token(end)?;
        self.lexer.path.pop_descriptor();
        self.unmarked_null = false;
        Ok(())
    }

    fn as_module(&self) -> &SerializersModule {
        self.json.serializers_module()
    }
}

impl JsonDecoder for StreamingJsonDecoder<'_, '_> {
    fn json(&self) -> &Json {
        self.json
    }

    fn decode_json_element(&mut self) -> Result<JsonElement> {
        if std::mem::take(&mut self.unmarked_null) {
            return Ok(JsonElement::Null);
        }
        self.capture_key = false;
        self.read_tree()
    }
}

#[cfg(test)]
#[path = "streaming_decoder_tests.rs"]
mod tests;
