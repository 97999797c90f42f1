// ABOUTME: Streaming JSON encoder writing text through the composer as strategies push values.
// ABOUTME: One instance serves every nesting level through a stack of write modes.

#![allow(clippy::missing_errors_doc)]

use super::composer::{format_double, format_float, special_double, Composer};
use super::config::Hint;
use super::element::JsonElement;
use super::element_serializer::write_element;
use super::mode::{switch_mode, WriteMode};
use super::names::json_element_name;
use super::polymorphism::{pending_discriminator, writes_own_discriminator};
use super::{Json, JsonEncoder};
use crate::descriptor::{Annotation, EncodeDefaultMode, SerialDescriptor};
use crate::encoding::{encode_polymorphic_pair, CompositeEncoder, Encoder};
use crate::error::{Error, Result};
use crate::module::SerializersModule;
use crate::strategy::{is_unquoted_literal, is_unsigned_number};

pub(crate) struct StreamingJsonEncoder<'j> {
    json: &'j Json,
    composer: Composer,
    modes: Vec<WriteMode>,
    pending_discriminator: Option<(String, String)>,
    /// Map keys are always written as JSON strings.
    force_quoting: bool,
    unsigned: bool,
    unquoted: bool,
}

impl<'j> StreamingJsonEncoder<'j> {
    pub(crate) fn new(json: &'j Json) -> Self {
        let config = json.config();
        let indent = config.pretty_print.then(|| config.pretty_print_indent.clone());
        Self {
            json,
            composer: Composer::new(indent),
            modes: Vec::new(),
            pending_discriminator: None,
            force_quoting: false,
            unsigned: false,
            unquoted: false,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.composer.finish()
    }

    fn print_value(&mut self, text: &str) {
        if std::mem::take(&mut self.force_quoting) {
            self.composer.print_quoted(text);
        } else {
            self.composer.print_raw(text);
        }
    }

    fn print_integer(&mut self, signed: i64, unsigned: u64) {
        let text = if std::mem::take(&mut self.unsigned) {
            unsigned.to_string()
        } else {
            signed.to_string()
        };
        self.print_value(&text);
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

    fn write_discriminator(&mut self, key: &str, value: &str) {
        self.composer.next_item();
        self.composer.print_quoted(key);
        self.composer.print(':');
        self.composer.space();
        self.composer.print_quoted(value);
    }

    fn current_mode(&self) -> WriteMode {
        self.modes.last().copied().unwrap_or(WriteMode::Obj)
    }
}

impl Encoder for StreamingJsonEncoder<'_> {
    fn serializers_module(&self) -> &SerializersModule {
        self.json.serializers_module()
    }

    fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.print_value(if value { "true" } else { "false" });
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_byte(&mut self, value: i8) -> Result<()> {
        self.print_integer(i64::from(value), u64::from(value as u8));
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_short(&mut self, value: i16) -> Result<()> {
        self.print_integer(i64::from(value), u64::from(value as u16));
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_int(&mut self, value: i32) -> Result<()> {
        self.print_integer(i64::from(value), u64::from(value as u32));
        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_long(&mut self, value: i64) -> Result<()> {
        self.print_integer(value, value as u64);
        Ok(())
    }

    fn encode_float(&mut self, value: f32) -> Result<()> {
        self.check_special(f64::from(value))?;
        self.print_value(&format_float(value));
        Ok(())
    }

    fn encode_double(&mut self, value: f64) -> Result<()> {
        self.check_special(value)?;
        self.print_value(&format_double(value));
        Ok(())
    }

    fn encode_char(&mut self, value: char) -> Result<()> {
        self.force_quoting = false;
        let mut buffer = [0u8; 4];
        self.composer.print_quoted(value.encode_utf8(&mut buffer));
        Ok(())
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        let unquoted = std::mem::take(&mut self.unquoted);
        if unquoted && !self.force_quoting {
            self.composer.print_raw(value);
        } else {
            self.force_quoting = false;
            self.composer.print_quoted(value);
        }
        Ok(())
    }

    fn encode_null(&mut self) -> Result<()> {
        self.print_value("null");
        Ok(())
    }

    fn encode_enum(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<()> {
        self.force_quoting = false;
        let name = descriptor.try_element_name(index)?;
        self.composer.print_quoted(&name);
        Ok(())
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
        let mode = switch_mode(self.json.config(), self.json.serializers_module(), descriptor)?;
        self.force_quoting = false;
        self.composer.print(mode.begin());
        self.composer.indent();
        let keyed = matches!(mode, WriteMode::Obj | WriteMode::Map);
        if let Some((key, value)) = self.pending_discriminator.take().filter(|_| keyed) {
            self.write_discriminator(&key, &value);
        } else if mode == WriteMode::Obj && writes_own_discriminator(self.json.config(), descriptor) {
            let key = self.json.config().class_discriminator.clone();
            self.write_discriminator(&key, descriptor.serial_name());
        }
        self.modes.push(mode);
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

impl CompositeEncoder for StreamingJsonEncoder<'_> {
    fn encode_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<bool> {
        match self.current_mode() {
            WriteMode::List => {
                if !self.composer.writing_first {
                    self.composer.print(',');
                }
                self.composer.next_item();
            }
            WriteMode::Map => {
                if index % 2 == 0 {
                    if !self.composer.writing_first {
                        self.composer.print(',');
                    }
                    self.composer.next_item();
                    self.force_quoting = true;
                } else {
                    self.composer.print(':');
                    self.composer.space();
                    self.force_quoting = false;
                }
            }
            WriteMode::PolyObj => {
                if index == 0 {
                    self.force_quoting = true;
                } else {
                    self.composer.print(',');
                    self.composer.space();
                    self.force_quoting = false;
                }
            }
            WriteMode::Obj => {
                if !self.composer.writing_first {
                    self.composer.print(',');
                }
                self.composer.next_item();
                let name = json_element_name(&self.json.schema, self.json.config(), descriptor, index)?;
                self.composer.print_quoted(&name);
                self.composer.print(':');
                self.composer.space();
            }
        }
        Ok(true)
    }

    fn as_encoder(&mut self) -> &mut dyn Encoder {
        self
    }

    fn end_structure(&mut self, _descriptor: &SerialDescriptor) -> Result<()> {
        let mode = self
            .modes
            .pop()
            .ok_or_else(|| Error::serialization("end_structure without a matching begin_structure"))?;
        self.composer.unindent();
        self.composer.next_item_if_not_first();
        self.composer.print(mode.end());
        Ok(())
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
        if self.current_mode() == WriteMode::Obj && !self.json.config().explicit_nulls {
            return Ok(());
        }
        if self.encode_element(descriptor, index)? {
            self.encode_null()?;
        }
        Ok(())
    }
}

impl JsonEncoder for StreamingJsonEncoder<'_> {
    fn json(&self) -> &Json {
        self.json
    }

    fn encode_json_element(&mut self, element: &JsonElement) -> Result<()> {
        write_element(self, element)
    }
}

#[cfg(test)]
#[path = "streaming_encoder_tests.rs"]
mod tests;
