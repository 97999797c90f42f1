// ABOUTME: Collection strategies: lists, sets, maps and unboxed primitive arrays.
// ABOUTME: Decoding accumulates into a builder that becomes the result exactly once.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::descriptor::SerialDescriptor;
use crate::encoding::{CompositeDecoder, CompositeEncoder, Decoder, Encoder};
use crate::error::{Error, Result};
use crate::strategy::{
    bool_descriptor, byte_descriptor, char_descriptor, double_descriptor, float_descriptor, int_descriptor,
    long_descriptor, short_descriptor, u16_descriptor, u32_descriptor, u64_descriptor, u8_descriptor,
    Serializable, SerialStrategy,
};
use indexmap::{IndexMap, IndexSet};
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

/// Shared encode/decode algorithm for collection-like strategies.
///
/// Implementors describe how to start, grow and finish a builder; the
/// provided methods drive the protocol.
pub trait CollectionLike<C> {
    type Builder;

    fn collection_descriptor(&self) -> &SerialDescriptor;

    fn builder(&self) -> Self::Builder;

    /// Number of element slots the builder already holds (two per map entry).
    fn builder_size(&self, builder: &Self::Builder) -> usize;

    fn to_result(&self, builder: Self::Builder) -> C;

    fn to_builder(&self, value: C) -> Self::Builder;

    fn check_capacity(&self, builder: &mut Self::Builder, size: usize);

    fn collection_size(&self, value: &C) -> usize;

    fn serialize_elements(&self, composite: &mut dyn CompositeEncoder, value: &C) -> Result<()>;

    /// Reads the element at decoder index `index`. `start_index` is the
    /// builder size before decoding began; it positions the element in the
    /// builder and is never passed back to the decoder.
    fn read_element(
        &self,
        composite: &mut dyn CompositeDecoder,
        index: usize,
        builder: &mut Self::Builder,
        start_index: usize,
        check_index: bool,
    ) -> Result<()>;

    fn read_all(
        &self,
        composite: &mut dyn CompositeDecoder,
        builder: &mut Self::Builder,
        start_index: usize,
        size: usize,
    ) -> Result<()> {
        for index in 0..size {
            self.read_element(composite, index, builder, start_index, false)?;
        }
        Ok(())
    }

    fn serialize_collection(&self, encoder: &mut dyn Encoder, value: &C) -> Result<()> {
        let descriptor = self.collection_descriptor();
        let composite = encoder.begin_collection(descriptor, self.collection_size(value))?;
        self.serialize_elements(composite, value)?;
        composite.end_structure(descriptor)
    }

    /// Decodes a collection, appending to `previous` when given.
    fn merge_collection(&self, decoder: &mut dyn Decoder, previous: Option<C>) -> Result<C> {
        let mut builder = match previous {
            Some(previous) => self.to_builder(previous),
            None => self.builder(),
        };
        let start_index = self.builder_size(&builder);
        let descriptor = self.collection_descriptor();
        let composite = decoder.begin_structure(descriptor)?;
        if composite.decode_sequentially() {
            let size = composite.decode_collection_size(descriptor)?.unwrap_or(0);
            self.check_capacity(&mut builder, size);
            self.read_all(composite, &mut builder, start_index, size)?;
        } else {
            while let Some(index) = composite.decode_element_index(descriptor)? {
                self.read_element(composite, index, &mut builder, start_index, true)?;
            }
        }
        composite.end_structure(descriptor)?;
        Ok(self.to_result(builder))
    }
}

/// Strategy for `Vec<T>`.
pub struct ListSerializer<T> {
    element: Arc<dyn SerialStrategy<T>>,
    descriptor: SerialDescriptor,
}

impl<T> ListSerializer<T> {
    #[must_use]
    pub fn new(element: Arc<dyn SerialStrategy<T>>) -> Self {
        let descriptor = SerialDescriptor::list("Vec", element.descriptor().clone());
        Self { element, descriptor }
    }
}

impl<T> CollectionLike<Vec<T>> for ListSerializer<T> {
    type Builder = Vec<T>;

    fn collection_descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn builder(&self) -> Vec<T> {
        Vec::new()
    }

    fn builder_size(&self, builder: &Vec<T>) -> usize {
        builder.len()
    }

    fn to_result(&self, builder: Vec<T>) -> Vec<T> {
        builder
    }

    fn to_builder(&self, value: Vec<T>) -> Vec<T> {
        value
    }

    fn check_capacity(&self, builder: &mut Vec<T>, size: usize) {
        builder.reserve(size);
    }

    fn collection_size(&self, value: &Vec<T>) -> usize {
        value.len()
    }

    fn serialize_elements(&self, composite: &mut dyn CompositeEncoder, value: &Vec<T>) -> Result<()> {
        for (index, item) in value.iter().enumerate() {
            composite.encode_serializable_element(&self.descriptor, index, &*self.element, item)?;
        }
        Ok(())
    }

    fn read_element(
        &self,
        composite: &mut dyn CompositeDecoder,
        index: usize,
        builder: &mut Vec<T>,
        start_index: usize,
        _check_index: bool,
    ) -> Result<()> {
        let item = composite.decode_serializable_element(&self.descriptor, index, &*self.element, None)?;
        let position = start_index + index;
        if position < builder.len() {
            builder.insert(position, item);
        } else {
            builder.push(item);
        }
        Ok(())
    }
}

impl<T> SerialStrategy<Vec<T>> for ListSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Vec<T>) -> Result<()> {
        self.serialize_collection(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Vec<T>> {
        self.merge_collection(decoder, None)
    }

    fn merge(&self, decoder: &mut dyn Decoder, previous: Vec<T>) -> Result<Vec<T>> {
        self.merge_collection(decoder, Some(previous))
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(ListSerializer::new(T::serializer()))
    }
}

/// Strategy for insertion-ordered sets.
pub struct SetSerializer<T> {
    element: Arc<dyn SerialStrategy<T>>,
    descriptor: SerialDescriptor,
}

impl<T> SetSerializer<T> {
    #[must_use]
    pub fn new(element: Arc<dyn SerialStrategy<T>>) -> Self {
        let descriptor = SerialDescriptor::list("IndexSet", element.descriptor().clone());
        Self { element, descriptor }
    }
}

impl<T: Hash + Eq> CollectionLike<IndexSet<T>> for SetSerializer<T> {
    type Builder = IndexSet<T>;

    fn collection_descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn builder(&self) -> IndexSet<T> {
        IndexSet::new()
    }

    fn builder_size(&self, builder: &IndexSet<T>) -> usize {
        builder.len()
    }

    fn to_result(&self, builder: IndexSet<T>) -> IndexSet<T> {
        builder
    }

    fn to_builder(&self, value: IndexSet<T>) -> IndexSet<T> {
        value
    }

    fn check_capacity(&self, builder: &mut IndexSet<T>, size: usize) {
        builder.reserve(size);
    }

    fn collection_size(&self, value: &IndexSet<T>) -> usize {
        value.len()
    }

    fn serialize_elements(&self, composite: &mut dyn CompositeEncoder, value: &IndexSet<T>) -> Result<()> {
        for (index, item) in value.iter().enumerate() {
            composite.encode_serializable_element(&self.descriptor, index, &*self.element, item)?;
        }
        Ok(())
    }

    fn read_element(
        &self,
        composite: &mut dyn CompositeDecoder,
        index: usize,
        builder: &mut IndexSet<T>,
        _start_index: usize,
        _check_index: bool,
    ) -> Result<()> {
        let item = composite.decode_serializable_element(&self.descriptor, index, &*self.element, None)?;
        builder.insert(item);
        Ok(())
    }
}

impl<T: Hash + Eq> SerialStrategy<IndexSet<T>> for SetSerializer<T> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &IndexSet<T>) -> Result<()> {
        self.serialize_collection(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<IndexSet<T>> {
        self.merge_collection(decoder, None)
    }

    fn merge(&self, decoder: &mut dyn Decoder, previous: IndexSet<T>) -> Result<IndexSet<T>> {
        self.merge_collection(decoder, Some(previous))
    }
}

impl<T: Serializable + Hash + Eq> Serializable for IndexSet<T> {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(SetSerializer::new(T::serializer()))
    }
}

/// Strategy for insertion-ordered maps; keys at even, values at odd indices.
pub struct MapSerializer<K, V> {
    key: Arc<dyn SerialStrategy<K>>,
    value: Arc<dyn SerialStrategy<V>>,
    descriptor: SerialDescriptor,
}

impl<K, V> MapSerializer<K, V> {
    #[must_use]
    pub fn new(key: Arc<dyn SerialStrategy<K>>, value: Arc<dyn SerialStrategy<V>>) -> Self {
        let descriptor = SerialDescriptor::map(
            "IndexMap",
            key.descriptor().clone(),
            value.descriptor().clone(),
        );
        Self { key, value, descriptor }
    }
}

impl<K: Hash + Eq, V> CollectionLike<IndexMap<K, V>> for MapSerializer<K, V> {
    type Builder = IndexMap<K, V>;

    fn collection_descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn builder(&self) -> IndexMap<K, V> {
        IndexMap::new()
    }

    fn builder_size(&self, builder: &IndexMap<K, V>) -> usize {
        builder.len() * 2
    }

    fn to_result(&self, builder: IndexMap<K, V>) -> IndexMap<K, V> {
        builder
    }

    fn to_builder(&self, value: IndexMap<K, V>) -> IndexMap<K, V> {
        value
    }

    fn check_capacity(&self, builder: &mut IndexMap<K, V>, size: usize) {
        builder.reserve(size);
    }

    fn collection_size(&self, value: &IndexMap<K, V>) -> usize {
        value.len()
    }

    fn serialize_elements(&self, composite: &mut dyn CompositeEncoder, value: &IndexMap<K, V>) -> Result<()> {
        for (entry, (key, item)) in value.iter().enumerate() {
            let index = entry * 2;
            composite.encode_serializable_element(&self.descriptor, index, &*self.key, key)?;
            composite.encode_serializable_element(&self.descriptor, index + 1, &*self.value, item)?;
        }
        Ok(())
    }

    fn read_all(
        &self,
        composite: &mut dyn CompositeDecoder,
        builder: &mut IndexMap<K, V>,
        start_index: usize,
        size: usize,
    ) -> Result<()> {
        for entry in 0..size {
            self.read_element(composite, entry * 2, builder, start_index, false)?;
        }
        Ok(())
    }

    fn read_element(
        &self,
        composite: &mut dyn CompositeDecoder,
        index: usize,
        builder: &mut IndexMap<K, V>,
        _start_index: usize,
        check_index: bool,
    ) -> Result<()> {
        let key = composite.decode_serializable_element(&self.descriptor, index, &*self.key, None)?;
        if check_index {
            let value_index = composite.decode_element_index(&self.descriptor)?;
            if value_index != Some(index + 1) {
                return Err(Error::serialization(format!(
                    "Value must follow key in a map, index for key: {index}, returned index for value: {}",
                    value_index.map_or_else(|| "DONE".to_owned(), |i| i.to_string())
                )));
            }
        }
        // Non-primitive values already present are updated in place.
        let position = builder.get_index_of(&key);
        let previous = match position {
            Some(_) if !self.value.descriptor().kind().is_primitive() => builder.shift_remove(&key),
            _ => None,
        };
        let value = composite.decode_serializable_element(&self.descriptor, index + 1, &*self.value, previous)?;
        match position {
            Some(position) if position <= builder.len() => {
                builder.shift_insert(position, key, value);
            }
            _ => {
                builder.insert(key, value);
            }
        }
        Ok(())
    }
}

impl<K: Hash + Eq, V> SerialStrategy<IndexMap<K, V>> for MapSerializer<K, V> {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &IndexMap<K, V>) -> Result<()> {
        self.serialize_collection(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<IndexMap<K, V>> {
        self.merge_collection(decoder, None)
    }

    fn merge(&self, decoder: &mut dyn Decoder, previous: IndexMap<K, V>) -> Result<IndexMap<K, V>> {
        self.merge_collection(decoder, Some(previous))
    }
}

impl<K: Serializable + Hash + Eq, V: Serializable> Serializable for IndexMap<K, V> {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(MapSerializer::new(K::serializer(), V::serializer()))
    }
}

/// Element types of unboxed primitive arrays.
pub trait PrimitiveElement: Copy + Default + Send + Sync + 'static {
    fn element_descriptor() -> &'static SerialDescriptor;

    fn array_descriptor() -> &'static SerialDescriptor;

    fn encode_element(
        composite: &mut dyn CompositeEncoder,
        descriptor: &SerialDescriptor,
        index: usize,
        value: Self,
    ) -> Result<()>;

    fn decode_element(composite: &mut dyn CompositeDecoder, descriptor: &SerialDescriptor, index: usize) -> Result<Self>;
}

macro_rules! primitive_element {
    ($ty:ty, $element:ident, $encode:ident, $decode:ident) => {
        impl PrimitiveElement for $ty {
            fn element_descriptor() -> &'static SerialDescriptor {
                $element()
            }

            fn array_descriptor() -> &'static SerialDescriptor {
                static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
                CELL.get_or_init(|| {
                    SerialDescriptor::list(format!("[{}]", $element().serial_name()), $element().clone())
                })
            }

            fn encode_element(
                composite: &mut dyn CompositeEncoder,
                descriptor: &SerialDescriptor,
                index: usize,
                value: Self,
            ) -> Result<()> {
                composite.$encode(descriptor, index, value)
            }

            fn decode_element(
                composite: &mut dyn CompositeDecoder,
                descriptor: &SerialDescriptor,
                index: usize,
            ) -> Result<Self> {
                composite.$decode(descriptor, index)
            }
        }
    };
}

primitive_element!(bool, bool_descriptor, encode_bool_element, decode_bool_element);
primitive_element!(i8, byte_descriptor, encode_byte_element, decode_byte_element);
primitive_element!(i16, short_descriptor, encode_short_element, decode_short_element);
primitive_element!(i32, int_descriptor, encode_int_element, decode_int_element);
primitive_element!(i64, long_descriptor, encode_long_element, decode_long_element);
primitive_element!(f32, float_descriptor, encode_float_element, decode_float_element);
primitive_element!(f64, double_descriptor, encode_double_element, decode_double_element);
primitive_element!(char, char_descriptor, encode_char_element, decode_char_element);

macro_rules! unsigned_element {
    ($ty:ty, $signed:ty, $element:ident, $encode:ident, $decode:ident) => {
        impl PrimitiveElement for $ty {
            fn element_descriptor() -> &'static SerialDescriptor {
                $element()
            }

            fn array_descriptor() -> &'static SerialDescriptor {
                static CELL: OnceLock<SerialDescriptor> = OnceLock::new();
                CELL.get_or_init(|| {
                    SerialDescriptor::list(format!("[{}]", $element().serial_name()), $element().clone())
                })
            }

            fn encode_element(
                composite: &mut dyn CompositeEncoder,
                descriptor: &SerialDescriptor,
                index: usize,
                value: Self,
            ) -> Result<()> {
                match composite.encode_inline_element(descriptor, index)? {
                    Some(encoder) => encoder.$encode(value as $signed),
                    None => Ok(()),
                }
            }

            fn decode_element(
                composite: &mut dyn CompositeDecoder,
                descriptor: &SerialDescriptor,
                index: usize,
            ) -> Result<Self> {
                Ok(composite.decode_inline_element(descriptor, index)?.$decode()? as $ty)
            }
        }
    };
}

unsigned_element!(u8, i8, u8_descriptor, encode_byte, decode_byte);
unsigned_element!(u16, i16, u16_descriptor, encode_short, decode_short);
unsigned_element!(u32, i32, u32_descriptor, encode_int, decode_int);
unsigned_element!(u64, i64, u64_descriptor, encode_long, decode_long);

const INITIAL_CAPACITY: usize = 10;

/// Growable unboxed buffer: starts at ten slots and at least doubles on growth.
pub struct PrimitiveArrayBuilder<E> {
    buffer: Vec<E>,
    position: usize,
}

impl<E: PrimitiveElement> PrimitiveArrayBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_slice(&[])
    }

    /// A builder pre-seeded with `values`.
    #[must_use]
    pub fn from_slice(values: &[E]) -> Self {
        let mut buffer = values.to_vec();
        if buffer.is_empty() {
            buffer.resize(INITIAL_CAPACITY, E::default());
        }
        Self {
            buffer,
            position: values.len(),
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn ensure_capacity(&mut self, required: usize) {
        if self.buffer.len() < required {
            let grown = required.max(self.buffer.len() * 2);
            self.buffer.resize(grown, E::default());
        }
    }

    pub fn append(&mut self, value: E) {
        self.ensure_capacity(self.position + 1);
        self.buffer[self.position] = value;
        self.position += 1;
    }

    #[must_use]
    pub fn build(mut self) -> Box<[E]> {
        self.buffer.truncate(self.position);
        self.buffer.into_boxed_slice()
    }
}

impl<E: PrimitiveElement> Default for PrimitiveArrayBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Strategy for `Box<[E]>` of primitive elements, read and written without
/// per-element strategies.
pub struct PrimitiveArraySerializer<E> {
    _element: std::marker::PhantomData<fn() -> E>,
}

impl<E: PrimitiveElement> PrimitiveArraySerializer<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _element: std::marker::PhantomData,
        }
    }
}

impl<E: PrimitiveElement> Default for PrimitiveArraySerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PrimitiveElement> CollectionLike<Box<[E]>> for PrimitiveArraySerializer<E> {
    type Builder = PrimitiveArrayBuilder<E>;

    fn collection_descriptor(&self) -> &SerialDescriptor {
        E::array_descriptor()
    }

    fn builder(&self) -> PrimitiveArrayBuilder<E> {
        PrimitiveArrayBuilder::new()
    }

    fn builder_size(&self, builder: &PrimitiveArrayBuilder<E>) -> usize {
        builder.position()
    }

    fn to_result(&self, builder: PrimitiveArrayBuilder<E>) -> Box<[E]> {
        builder.build()
    }

    fn to_builder(&self, value: Box<[E]>) -> PrimitiveArrayBuilder<E> {
        PrimitiveArrayBuilder::from_slice(&value)
    }

    fn check_capacity(&self, builder: &mut PrimitiveArrayBuilder<E>, size: usize) {
        builder.ensure_capacity(builder.position() + size);
    }

    fn collection_size(&self, value: &Box<[E]>) -> usize {
        value.len()
    }

    fn serialize_elements(&self, composite: &mut dyn CompositeEncoder, value: &Box<[E]>) -> Result<()> {
        let descriptor = E::array_descriptor();
        for (index, item) in value.iter().enumerate() {
            E::encode_element(composite, descriptor, index, *item)?;
        }
        Ok(())
    }

    fn read_element(
        &self,
        composite: &mut dyn CompositeDecoder,
        index: usize,
        builder: &mut PrimitiveArrayBuilder<E>,
        _start_index: usize,
        _check_index: bool,
    ) -> Result<()> {
        let value = E::decode_element(composite, E::array_descriptor(), index)?;
        builder.append(value);
        Ok(())
    }
}

impl<E: PrimitiveElement> SerialStrategy<Box<[E]>> for PrimitiveArraySerializer<E> {
    fn descriptor(&self) -> &SerialDescriptor {
        E::array_descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Box<[E]>) -> Result<()> {
        self.serialize_collection(encoder, value)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Box<[E]>> {
        self.merge_collection(decoder, None)
    }

    fn merge(&self, decoder: &mut dyn Decoder, previous: Box<[E]>) -> Result<Box<[E]>> {
        self.merge_collection(decoder, Some(previous))
    }
}

impl<E: PrimitiveElement> Serializable for Box<[E]> {
    fn serializer() -> Arc<dyn SerialStrategy<Self>> {
        Arc::new(PrimitiveArraySerializer::<E>::new())
    }
}

#[cfg(test)]
#[path = "collections_tests.rs"]
mod tests;
