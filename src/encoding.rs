// ABOUTME: The push/pull visitor protocol between serializer strategies and formats.
// ABOUTME: Encoder/CompositeEncoder write values; Decoder/CompositeDecoder read them back.

#![allow(clippy::missing_errors_doc)]

use crate::descriptor::SerialDescriptor;
use crate::error::{Error, Result};
use crate::json::{JsonDecoder, JsonEncoder};
use crate::module::SerializersModule;
use crate::strategy::SerialStrategy;

/// Writes one value. Formats implement this together with [`CompositeEncoder`].
///
/// Strategies call exactly one `encode_*` method per value, or open a
/// structure with [`begin_structure`](Self::begin_structure) and close it with
/// [`CompositeEncoder::end_structure`].
pub trait Encoder {
    fn serializers_module(&self) -> &SerializersModule;

    fn encode_bool(&mut self, value: bool) -> Result<()>;
    fn encode_byte(&mut self, value: i8) -> Result<()>;
    fn encode_short(&mut self, value: i16) -> Result<()>;
    fn encode_int(&mut self, value: i32) -> Result<()>;
    fn encode_long(&mut self, value: i64) -> Result<()>;
    fn encode_float(&mut self, value: f32) -> Result<()>;
    fn encode_double(&mut self, value: f64) -> Result<()>;
    fn encode_char(&mut self, value: char) -> Result<()>;
    fn encode_string(&mut self, value: &str) -> Result<()>;

    fn encode_null(&mut self) -> Result<()>;

    /// Written before a present nullable value. Formats without a dedicated
    /// marker leave this empty.
    fn encode_not_null_mark(&mut self) -> Result<()> {
        Ok(())
    }

    /// Writes the enum entry at `index` of `descriptor`.
    fn encode_enum(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<()>;

    /// Returns the encoder used to write the single value wrapped by an inline
    /// descriptor.
    fn encode_inline(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn Encoder>;

    fn begin_structure(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn CompositeEncoder>;

    fn begin_collection(
        &mut self,
        descriptor: &SerialDescriptor,
        size: usize,
    ) -> Result<&mut dyn CompositeEncoder> {
        let _ = size;
        self.begin_structure(descriptor)
    }

    /// Writes a polymorphic value whose concrete subtype is `actual`.
    ///
    /// The default layout is the two-element structure `[serial name, payload]`
    /// described by `base`. Formats may place the discriminator differently.
    fn encode_polymorphic(
        &mut self,
        base: &SerialDescriptor,
        actual: &SerialDescriptor,
        payload: &mut dyn FnMut(&mut dyn Encoder) -> Result<()>,
    ) -> Result<()> {
        let composite = self.begin_structure(base)?;
        encode_polymorphic_pair(composite, base, actual, payload)
    }

    fn as_json_encoder(&mut self) -> Option<&mut dyn JsonEncoder> {
        None
    }
}

/// Writes the default `[serial name, payload]` polymorphic layout into an
/// already opened structure and closes it.
pub fn encode_polymorphic_pair(
    composite: &mut dyn CompositeEncoder,
    base: &SerialDescriptor,
    actual: &SerialDescriptor,
    payload: &mut dyn FnMut(&mut dyn Encoder) -> Result<()>,
) -> Result<()> {
    composite.encode_string_element(base, 0, actual.serial_name())?;
    if composite.encode_element(base, 1)? {
        payload(composite.as_encoder())?;
    }
    composite.end_structure(base)
}

/// Writes the elements of one structure.
pub trait CompositeEncoder {
    /// Prepares the format for element `index`. Returns false when the element
    /// must not be written.
    fn encode_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<bool>;

    /// The encoder that writes the value of the element just prepared.
    fn as_encoder(&mut self) -> &mut dyn Encoder;

    fn end_structure(&mut self, descriptor: &SerialDescriptor) -> Result<()>;

    /// Whether an element still holding its default value should be written.
    fn should_encode_element_default(&self, descriptor: &SerialDescriptor, index: usize) -> bool {
        let _ = (descriptor, index);
        true
    }

    fn encode_bool_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: bool) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_bool(value)?;
        }
        Ok(())
    }

    fn encode_byte_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: i8) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_byte(value)?;
        }
        Ok(())
    }

    fn encode_short_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: i16) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_short(value)?;
        }
        Ok(())
    }

    fn encode_int_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: i32) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_int(value)?;
        }
        Ok(())
    }

    fn encode_long_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: i64) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_long(value)?;
        }
        Ok(())
    }

    fn encode_float_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: f32) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_float(value)?;
        }
        Ok(())
    }

    fn encode_double_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: f64) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_double(value)?;
        }
        Ok(())
    }

    fn encode_char_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: char) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_char(value)?;
        }
        Ok(())
    }

    fn encode_string_element(&mut self, descriptor: &SerialDescriptor, index: usize, value: &str) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_string(value)?;
        }
        Ok(())
    }

    /// Writes an absent nullable element. Formats that omit nulls override this.
    fn encode_null_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            self.as_encoder().encode_null()?;
        }
        Ok(())
    }

    /// Returns the encoder for an inline element, or `None` if it is skipped.
    fn encode_inline_element(
        &mut self,
        descriptor: &SerialDescriptor,
        index: usize,
    ) -> Result<Option<&mut dyn Encoder>> {
        if !self.encode_element(descriptor, index)? {
            return Ok(None);
        }
        let inner = descriptor.element_descriptor(index);
        self.as_encoder().encode_inline(&inner).map(Some)
    }
}

impl dyn CompositeEncoder + '_ {
    /// Writes element `index` with a nested strategy.
    pub fn encode_serializable_element<T>(
        &mut self,
        descriptor: &SerialDescriptor,
        index: usize,
        strategy: &dyn SerialStrategy<T>,
        value: &T,
    ) -> Result<()> {
        if self.encode_element(descriptor, index)? {
            strategy.serialize(self.as_encoder(), value)?;
        }
        Ok(())
    }

    /// Writes a nullable element: the not-null mark and the value, or a null.
    pub fn encode_nullable_serializable_element<T>(
        &mut self,
        descriptor: &SerialDescriptor,
        index: usize,
        strategy: &dyn SerialStrategy<T>,
        value: Option<&T>,
    ) -> Result<()> {
        let Some(value) = value else {
            return self.encode_null_element(descriptor, index);
        };
        if self.encode_element(descriptor, index)? {
            let encoder = self.as_encoder();
            encoder.encode_not_null_mark()?;
            strategy.serialize(encoder, value)?;
        }
        Ok(())
    }
}

/// Reads one value. Formats implement this together with [`CompositeDecoder`].
pub trait Decoder {
    fn serializers_module(&self) -> &SerializersModule;

    /// True when a non-null value follows.
    fn decode_not_null_mark(&mut self) -> Result<bool>;
    fn decode_null(&mut self) -> Result<()>;

    fn decode_bool(&mut self) -> Result<bool>;
    fn decode_byte(&mut self) -> Result<i8>;
    fn decode_short(&mut self) -> Result<i16>;
    fn decode_int(&mut self) -> Result<i32>;
    fn decode_long(&mut self) -> Result<i64>;
    fn decode_float(&mut self) -> Result<f32>;
    fn decode_double(&mut self) -> Result<f64>;
    fn decode_char(&mut self) -> Result<char>;
    fn decode_string(&mut self) -> Result<String>;

    /// Reads an enum entry and returns its index in `descriptor`.
    fn decode_enum(&mut self, descriptor: &SerialDescriptor) -> Result<usize>;

    fn decode_inline(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn Decoder>;

    fn begin_structure(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn CompositeDecoder>;

    /// Reads a polymorphic value. The default reads the two-element
    /// `[serial name, payload]` structure described by `base`.
    fn decode_polymorphic(
        &mut self,
        base: &SerialDescriptor,
        visitor: &mut dyn SubtypeVisitor,
    ) -> Result<()> {
        let composite = self.begin_structure(base)?;
        decode_polymorphic_pair(composite, base, visitor)
    }

    fn as_json_decoder(&mut self) -> Option<&mut dyn JsonDecoder> {
        None
    }
}

/// Receives the discriminator of a polymorphic value and then its payload.
pub trait SubtypeVisitor {
    /// Resolves the concrete subtype. `None` means the input carried no
    /// discriminator.
    fn select(&mut self, module: &SerializersModule, subtype: Option<&str>) -> Result<SerialDescriptor>;

    /// Reads the payload with the subtype chosen by the last `select` call.
    fn decode_selected(&mut self, decoder: &mut dyn Decoder) -> Result<()>;
}

/// Reads the default `[serial name, payload]` layout from an opened structure
/// and closes it.
pub fn decode_polymorphic_pair(
    composite: &mut dyn CompositeDecoder,
    base: &SerialDescriptor,
    visitor: &mut dyn SubtypeVisitor,
) -> Result<()> {
    let mut subtype: Option<String> = None;
    let mut decoded = false;
    if composite.decode_sequentially() {
        let name = composite.decode_string_element(base, 0)?;
        visitor.select(composite.as_module(), Some(&name))?;
        visitor.decode_selected(composite.select_element(base, 1)?)?;
        return composite.end_structure(base);
    }
    while let Some(index) = composite.decode_element_index(base)? {
        match index {
            0 => {
                let name = composite.decode_string_element(base, 0)?;
                visitor.select(composite.as_module(), Some(&name))?;
                subtype = Some(name);
            }
            1 => {
                if subtype.is_none() {
                    return Err(Error::serialization(
                        "Cannot read polymorphic value before its type token",
                    ));
                }
                visitor.decode_selected(composite.select_element(base, 1)?)?;
                decoded = true;
            }
            other => {
                return Err(Error::serialization(format!(
                    "Invalid index in polymorphic deserialization of {}\n Expected 0, 1 or DONE, but got {other}",
                    subtype.as_deref().unwrap_or("unknown class")
                )))
            }
        }
    }
    if !decoded {
        return Err(Error::serialization(format!(
            "Polymorphic value has not been read for class {}",
            subtype.as_deref().unwrap_or("unknown class")
        )));
    }
    composite.end_structure(base)
}

/// Reads the elements of one structure.
pub trait CompositeDecoder {
    /// Returns the next element index the input has data for, or `None` when
    /// the structure is exhausted.
    fn decode_element_index(&mut self, descriptor: &SerialDescriptor) -> Result<Option<usize>>;

    /// Positions the format on element `index` and returns the decoder for its value.
    fn select_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<&mut dyn Decoder>;

    fn end_structure(&mut self, descriptor: &SerialDescriptor) -> Result<()>;

    /// The module of the decoder that opened this structure.
    fn as_module(&self) -> &SerializersModule;

    /// True when elements are guaranteed to arrive as `0..n` in order, so
    /// strategies may read them without calling `decode_element_index`.
    fn decode_sequentially(&self) -> bool {
        false
    }

    /// Number of elements in the collection, when the format knows it up front.
    fn decode_collection_size(&mut self, descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        let _ = descriptor;
        Ok(None)
    }

    fn decode_bool_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<bool> {
        self.select_element(descriptor, index)?.decode_bool()
    }

    fn decode_byte_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<i8> {
        self.select_element(descriptor, index)?.decode_byte()
    }

    fn decode_short_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<i16> {
        self.select_element(descriptor, index)?.decode_short()
    }

    fn decode_int_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<i32> {
        self.select_element(descriptor, index)?.decode_int()
    }

    fn decode_long_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<i64> {
        self.select_element(descriptor, index)?.decode_long()
    }

    fn decode_float_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<f32> {
        self.select_element(descriptor, index)?.decode_float()
    }

    fn decode_double_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<f64> {
        self.select_element(descriptor, index)?.decode_double()
    }

    fn decode_char_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<char> {
        self.select_element(descriptor, index)?.decode_char()
    }

    fn decode_string_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<String> {
        self.select_element(descriptor, index)?.decode_string()
    }

    fn decode_inline_element(&mut self, descriptor: &SerialDescriptor, index: usize) -> Result<&mut dyn Decoder> {
        let inner = descriptor.element_descriptor(index);
        self.select_element(descriptor, index)?.decode_inline(&inner)
    }
}

impl dyn CompositeDecoder + '_ {
    /// Reads element `index` with a nested strategy, merging into `previous`
    /// when the element was already decoded.
    pub fn decode_serializable_element<T>(
        &mut self,
        descriptor: &SerialDescriptor,
        index: usize,
        strategy: &dyn SerialStrategy<T>,
        previous: Option<T>,
    ) -> Result<T> {
        let decoder = self.select_element(descriptor, index)?;
        match previous {
            Some(previous) => strategy.merge(decoder, previous),
            None => strategy.deserialize(decoder),
        }
    }

    /// Reads a nullable element: `None` for an explicit null.
    pub fn decode_nullable_serializable_element<T>(
        &mut self,
        descriptor: &SerialDescriptor,
        index: usize,
        strategy: &dyn SerialStrategy<T>,
        previous: Option<T>,
    ) -> Result<Option<T>> {
        let decoder = self.select_element(descriptor, index)?;
        if !decoder.decode_not_null_mark()? {
            decoder.decode_null()?;
            return Ok(None);
        }
        match previous {
            Some(previous) => strategy.merge(decoder, previous).map(Some),
            None => strategy.deserialize(decoder).map(Some),
        }
    }
}
