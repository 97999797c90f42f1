// ABOUTME: The serializer-strategy interface and the built-in scalar strategies.
// ABOUTME: Covers primitives, unsigned inline numbers, unit/object, pair/triple and nullable.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::descriptor::{DescriptorBuilder, PrimitiveKind, SerialDescriptor, SerialKind};
use crate::encoding::{Decoder, Encoder};
use crate::error::{Error, Result};
use std::sync::{Arc, OnceLock};

/// Serializes and deserializes values of `T` through the visitor protocol.
///
/// Strategies are stateless with respect to any single operation and can be
/// shared between threads.
pub trait SerialStrategy<T>: Send + Sync {
    fn descriptor(&self) -> &SerialDescriptor;

    fn serialize(&self, encoder: &mut dyn Encoder, value: &T) -> Result<()>;

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T>;

    /// Reads a value on top of `previous`. Strategies without update
    /// semantics replace the previous value.
    fn merge(&self, decoder: &mut dyn Decoder, previous: T) -> Result<T> {
        let _ = previous;
        self.deserialize(decoder)
    }
}

/// Types with a default strategy.
pub trait Serializable: Sized + 'static {
    fn serializer() -> Arc<dyn SerialStrategy<Self>>;
}

/// Serial name of the inline descriptor that writes a string without quotes.
pub const UNQUOTED_LITERAL_NAME: &str = "serialform.json.JsonUnquotedLiteral";

const UNSIGNED_NAMES: [&str; 4] = ["u8", "u16", "u32", "u64"];

macro_rules! cached_descriptor {
    ($(#[$meta:meta])* $name:ident, $init:expr) => {
        $(#[$meta])*
        #[must_use]
        pub fn $name() -> &'static SerialDescriptor {
            static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
            CELL.get_or_init(|| $init)
        }
    };
}

cached_descriptor!(bool_descriptor, SerialDescriptor::primitive("bool", PrimitiveKind::Boolean));
cached_descriptor!(byte_descriptor, SerialDescriptor::primitive("i8", PrimitiveKind::Byte));
cached_descriptor!(short_descriptor, SerialDescriptor::primitive("i16", PrimitiveKind::Short));
cached_descriptor!(int_descriptor, SerialDescriptor::primitive("i32", PrimitiveKind::Int));
cached_descriptor!(long_descriptor, SerialDescriptor::primitive("i64", PrimitiveKind::Long));
cached_descriptor!(float_descriptor, SerialDescriptor::primitive("f32", PrimitiveKind::Float));
cached_descriptor!(double_descriptor, SerialDescriptor::primitive("f64", PrimitiveKind::Double));
cached_descriptor!(char_descriptor, SerialDescriptor::primitive("char", PrimitiveKind::Char));
cached_descriptor!(string_descriptor, SerialDescriptor::primitive("String", PrimitiveKind::String));
cached_descriptor!(u8_descriptor, unsigned_descriptor("u8", byte_descriptor()));
cached_descriptor!(u16_descriptor, unsigned_descriptor("u16", short_descriptor()));
cached_descriptor!(u32_descriptor, unsigned_descriptor("u32", int_descriptor()));
cached_descriptor!(u64_descriptor, unsigned_descriptor("u64", long_descriptor()));
cached_descriptor!(
    /// Inline wrapper around a string written verbatim by text formats.
    unquoted_literal_descriptor,
    inline_wrapper(UNQUOTED_LITERAL_NAME, string_descriptor())
);

fn inline_wrapper(name: &str, inner: &SerialDescriptor) -> SerialDescriptor {
    let mut builder = DescriptorBuilder::new(name, SerialKind::CLASS).inline();
    builder.add_element("value", inner.clone(), false);
    match builder.build() {
        Ok(descriptor) => descriptor,
        Err(_) => unreachable!("inline wrapper has exactly one uniquely named element"),
    }
}

fn unsigned_descriptor(name: &str, signed: &SerialDescriptor) -> SerialDescriptor {
    inline_wrapper(name, signed)
}

/// True for the inline descriptors of `u8`, `u16`, `u32` and `u64`.
#[must_use]
pub fn is_unsigned_number(descriptor: &SerialDescriptor) -> bool {
    descriptor.is_inline() && UNSIGNED_NAMES.contains(&descriptor.serial_name())
}

/// True for the unquoted-literal inline descriptor.
#[must_use]
pub fn is_unquoted_literal(descriptor: &SerialDescriptor) -> bool {
    descriptor.is_inline() && descriptor.serial_name() == UNQUOTED_LITERAL_NAME
}

macro_rules! primitive_strategy {
    ($strategy:ident, $ty:ty, $descriptor:ident, $encode:ident, $decode:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $strategy;

        impl SerialStrategy<$ty> for $strategy {
            fn descriptor(&self) -> &SerialDescriptor {
                $descriptor()
            }

            fn serialize(&self, encoder: &mut dyn Encoder, value: &$ty) -> Result<()> {
                encoder.$encode(*value)
            }

            fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<$ty> {
                decoder.$decode()
            }
        }

        impl Serializable for $ty {
            fn serializer() -> Arc<dyn SerialStrategy<Self>> {
                Arc::new($strategy)
            }
        }
    };
}

primitive_strategy!(BoolSerializer, bool, bool_descriptor, encode_bool, decode_bool);
primitive_strategy!(ByteSerializer, i8, byte_descriptor, encode_byte, decode_byte);
primitive_strategy!(ShortSerializer, i16, short_descriptor, encode_short, decode_short);
primitive_strategy!(IntSerializer, i32, int_descriptor, encode_int, decode_int);
primitive_strategy!(LongSerializer, i64, long_descriptor, encode_long, decode_long);
primitive_strategy!(FloatSerializer, f32, float_descriptor, encode_float, decode_float);
primitive_strategy!(DoubleSerializer, f64, double_descriptor, encode_double, decode_double);
primitive_strategy!(CharSerializer, char, char_descriptor, encode_char, decode_char);

#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl SerialStrategy<String> for StringSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        string_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &String) -> Result<()> {
        encoder.encode_string(value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<String> {
        decoder.decode_string()
    }
}

impl Serializable for String {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(StringSerializer)
    }
}

// Unsigned values travel as their same-width signed bit pattern through an
// inline descriptor; text formats print them unsigned.
macro_rules! unsigned_strategy {
    ($strategy:ident, $ty:ty, $signed:ty, $descriptor:ident, $encode:ident, $decode:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $strategy;

        impl SerialStrategy<$ty> for $strategy {
            fn descriptor(&self) -> &SerialDescriptor {
                $descriptor()
            }

            fn serialize(&self, encoder: &mut dyn Encoder, value: &$ty) -> Result<()> {
                encoder.encode_inline($descriptor())?.$encode(*value as $signed)
            }

            fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<$ty> {
                Ok(decoder.decode_inline($descriptor())?.$decode()? as $ty)
            }
        }

        impl Serializable for $ty {
            fn serializer() -> Arc<dyn SerialStrategy<Self>> {
                Arc::new($strategy)
            }
        }
    };
}

unsigned_strategy!(UByteSerializer, u8, i8, u8_descriptor, encode_byte, decode_byte);
unsigned_strategy!(UShortSerializer, u16, i16, u16_descriptor, encode_short, decode_short);
unsigned_strategy!(UIntSerializer, u32, i32, u32_descriptor, encode_int, decode_int);
unsigned_strategy!(ULongSerializer, u64, i64, u64_descriptor, encode_long, decode_long);

/// Strategy for a singleton value: an empty structure of kind OBJECT.
pub struct ObjectSerializer<T> {
    descriptor: SerialDescriptor,
    instance: T,
}

impl<T: Clone> ObjectSerializer<T> {
    pub fn new(serial_name: &str, instance: T) -> Result<Self> {
        let descriptor = DescriptorBuilder::new(serial_name, SerialKind::OBJECT).build()?;
        Ok(Self { descriptor, instance })
    }
}

impl<T: Clone + Send + Sync> SerialStrategy<T> for ObjectSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, _value: &T) -> Result<()> {
        encoder
            .begin_structure(&self.descriptor)?
            .end_structure(&self.descriptor)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<T> {
        let composite = decoder.begin_structure(&self.descriptor)?;
        if !composite.decode_sequentially() {
            if let Some(index) = composite.decode_element_index(&self.descriptor)? {
                return Err(Error::serialization(format!("Unexpected index {index}")));
            }
        }
        composite.end_structure(&self.descriptor)?;
        Ok(self.instance.clone())
    }
}

/// Strategy for `()`, written as an empty object.
pub struct UnitSerializer(ObjectSerializer<()>);

impl UnitSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self(ObjectSerializer {
            descriptor: unit_descriptor().clone(),
            instance: (),
        })
    }
}

impl Default for UnitSerializer {
    fn default() -> Self {
        Self::new()
    }
}

cached_descriptor!(
    unit_descriptor,
    match DescriptorBuilder::new("Unit", SerialKind::OBJECT).build() {
        Ok(descriptor) => descriptor,
        Err(_) => unreachable!("non-blank object descriptor"),
    }
);

impl SerialStrategy<()> for UnitSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        self.0.descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &()) -> Result<()> {
        self.0.serialize(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<()> {
        self.0.deserialize(decoder)
    }
}

impl Serializable for () {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(UnitSerializer::new())
    }
}

/// Strategy for `Option<T>`: a not-null mark before present values.
pub struct NullableSerializer<T> {
    inner: Arc<dyn SerialStrategy<T>>,
    descriptor: SerialDescriptor,
}

impl<T> NullableSerializer<T> {
    #[must_use]
    pub fn new(inner: Arc<dyn SerialStrategy<T>>) -> Self {
        let descriptor = inner.descriptor().nullable();
        Self { inner, descriptor }
    }
}

impl<T> SerialStrategy<Option<T>> for NullableSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Option<T>) -> Result<()> {
        match value {
            Some(value) => {
                encoder.encode_not_null_mark()?;
                self.inner.serialize(encoder, value)
            }
            None => encoder.encode_null(),
        }
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Option<T>> {
        if decoder.decode_not_null_mark()? {
            self.inner.deserialize(decoder).map(Some)
        } else {
            decoder.decode_null()?;
            Ok(None)
        }
    }

    fn merge(&self, decoder: &mut dyn Decoder, previous: Option<T>) -> Result<Option<T>> {
        if !decoder.decode_not_null_mark()? {
            decoder.decode_null()?;
            return Ok(None);
        }
        match previous {
            Some(previous) => self.inner.merge(decoder, previous).map(Some),
            None => self.inner.deserialize(decoder).map(Some),
        }
    }
}

impl<T: Serializable> Serializable for Option<T> {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(NullableSerializer::new(T::serializer()))
    }
}

/// Strategy for `(A, B)`, laid out as a class with `first` and `second`.
pub struct PairSerializer<A, B> {
    first: Arc<dyn SerialStrategy<A>>,
    second: Arc<dyn SerialStrategy<B>>,
    descriptor: SerialDescriptor,
}

impl<A, B> PairSerializer<A, B> {
    pub fn new(first: Arc<dyn SerialStrategy<A>>, second: Arc<dyn SerialStrategy<B>>) -> Result<Self> {
        let descriptor = DescriptorBuilder::new("Pair", SerialKind::CLASS)
            .element("first", first.descriptor().clone())
            .element("second", second.descriptor().clone())
            .build()?;
        Ok(Self { first, second, descriptor })
    }
}

impl<A, B> SerialStrategy<(A, B)> for PairSerializer<A, B> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &(A, B)) -> Result<()> {
        let d = &self.descriptor;
        let composite = encoder.begin_structure(d)?;
        composite.encode_serializable_element(d, 0, &*self.first, &value.0)?;
        composite.encode_serializable_element(d, 1, &*self.second, &value.1)?;
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<(A, B)> {
        let d = &self.descriptor;
        let composite = decoder.begin_structure(d)?;
        let (mut first, mut second) = (None, None);
        if composite.decode_sequentially() {
            first = Some(composite.decode_serializable_element(d, 0, &*self.first, None)?);
            second = Some(composite.decode_serializable_element(d, 1, &*self.second, None)?);
        } else {
            while let Some(index) = composite.decode_element_index(d)? {
                match index {
                    0 => first = Some(composite.decode_serializable_element(d, 0, &*self.first, first.take())?),
                    1 => second = Some(composite.decode_serializable_element(d, 1, &*self.second, second.take())?),
                    other => return Err(Error::serialization(format!("Invalid index: {other}"))),
                }
            }
        }
        composite.end_structure(d)?;
        let first = first.ok_or_else(|| Error::serialization("Element 'first' is missing"))?;
        let second = second.ok_or_else(|| Error::serialization("Element 'second' is missing"))?;
        Ok((first, second))
    }
}

impl<A: Serializable, B: Serializable> Serializable for (A, B) {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        match PairSerializer::new(A::serializer(), B::serializer()) {
            Ok(strategy) => Arc::new(strategy),
            Err(_) => unreachable!("pair element names are distinct"),
        }
    }
}

/// Strategy for `(A, B, C)`, laid out as a class with `first`, `second`, `third`.
pub struct TripleSerializer<A, B, C> {
    first: Arc<dyn SerialStrategy<A>>,
    second: Arc<dyn SerialStrategy<B>>,
    third: Arc<dyn SerialStrategy<C>>,
    descriptor: SerialDescriptor,
}

impl<A, B, C> TripleSerializer<A, B, C> {
    pub fn new(
        first: Arc<dyn SerialStrategy<A>>,
        second: Arc<dyn SerialStrategy<B>>,
        third: Arc<dyn SerialStrategy<C>>,
    ) -> Result<Self> {
        let descriptor = DescriptorBuilder::new("Triple", SerialKind::CLASS)
            .element("first", first.descriptor().clone())
            .element("second", second.descriptor().clone())
            .element("third", third.descriptor().clone())
            .build()?;
        Ok(Self { first, second, third, descriptor })
    }
}

impl<A, B, C> SerialStrategy<(A, B, C)> for TripleSerializer<A, B, C> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &(A, B, C)) -> Result<()> {
        let d = &self.descriptor;
        let composite = encoder.begin_structure(d)?;
        composite.encode_serializable_element(d, 0, &*self.first, &value.0)?;
        composite.encode_serializable_element(d, 1, &*self.second, &value.1)?;
        composite.encode_serializable_element(d, 2, &*self.third, &value.2)?;
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<(A, B, C)> {
        let d = &self.descriptor;
        let composite = decoder.begin_structure(d)?;
        let (mut first, mut second, mut third) = (None, None, None);
        if composite.decode_sequentially() {
            first = Some(composite.decode_serializable_element(d, 0, &*self.first, None)?);
            second = Some(composite.decode_serializable_element(d, 1, &*self.second, None)?);
            third = Some(composite.decode_serializable_element(d, 2, &*self.third, None)?);
        } else {
            while let Some(index) = composite.decode_element_index(d)? {
                match index {
                    0 => first = Some(composite.decode_serializable_element(d, 0, &*self.first, first.take())?),
                    1 => second = Some(composite.decode_serializable_element(d, 1, &*self.second, second.take())?),
                    2 => third = Some(composite.decode_serializable_element(d, 2, &*self.third, third.take())?),
                    other => return Err(Error::serialization(format!("Unexpected index {other}"))),
                }
            }
        }
        composite.end_structure(d)?;
        let first = first.ok_or_else(|| Error::serialization("Element 'first' is missing"))?;
        let second = second.ok_or_else(|| Error::serialization("Element 'second' is missing"))?;
        let third = third.ok_or_else(|| Error::serialization("Element 'third' is missing"))?;
        Ok((first, second, third))
    }
}

impl<A: Serializable, B: Serializable, C: Serializable> Serializable for (A, B, C) {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        match TripleSerializer::new(A::serializer(), B::serializer(), C::serializer()) {
            Ok(strategy) => Arc::new(strategy),
            Err(_) => unreachable!("triple element names are distinct"),
        }
    }
}

/// Builds the error for required elements of `descriptor` absent from input.
///
/// Bit `i` of `seen` is set when element `i` was decoded; bit `i` of
/// `golden_mask` is set when element `i` is required. Every required but
/// unseen element is listed.
#[must_use]
pub fn missing_fields_error(seen: u64, golden_mask: u64, descriptor: &SerialDescriptor) -> Error {
    missing_fields_error_wide(&[seen], &[golden_mask], descriptor)
}

/// [`missing_fields_error`] for descriptors with more than 64 elements; word
/// `w` covers indices `64 * w .. 64 * w + 63`.
#[must_use]
pub fn missing_fields_error_wide(seen: &[u64], golden_mask: &[u64], descriptor: &SerialDescriptor) -> Error {
    let mut fields = Vec::new();
    for (word, golden) in golden_mask.iter().enumerate() {
        let seen = seen.get(word).copied().unwrap_or(0);
        let mut missing = (golden ^ seen) & golden;
        while missing != 0 {
            let bit = missing.trailing_zeros() as usize;
            missing &= missing - 1;
            let index = word * 64 + bit;
            fields.push(descriptor.element_name(index).into_owned());
        }
    }
    Error::MissingFields {
        serial_name: descriptor.serial_name().to_owned(),
        fields,
        path: None,
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
