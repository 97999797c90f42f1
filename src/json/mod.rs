// ABOUTME: The Json format: configuration, module and name cache behind text and tree entry points.
// ABOUTME: Streaming codecs handle text; tree codecs handle JsonElement values and buffered polymorphism.

//! JSON format for descriptor-driven strategies.
//!
//! A [`Json`] instance is immutable once built and may be shared freely
//! between threads. Every encode or decode call creates its own codec state.

#![allow(clippy::missing_errors_doc)]

mod composer;
pub mod config;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod element;
pub mod element_serializer;
mod lexer;
mod mode;
mod names;
mod path;
mod polymorphism;
mod streaming_decoder;
mod streaming_encoder;
mod tree_decoder;
mod tree_encoder;
mod tree_reader;

pub use config::{ClassDiscriminatorMode, JsonConfig, NamingStrategy};
pub use element::{
    build_json_array, build_json_object, JsonArray, JsonArrayBuilder, JsonElement, JsonObject, JsonObjectBuilder,
    JsonPrimitive,
};
pub use element_serializer::{
    JsonArraySerializer, JsonElementSerializer, JsonNullSerializer, JsonObjectSerializer, JsonPrimitiveSerializer,
};

use crate::error::Result;
use crate::module::SerializersModule;
use crate::strategy::{Serializable, SerialStrategy};
use log::debug;
use names::SchemaCache;
use std::io::Write;
use std::sync::OnceLock;
use streaming_decoder::StreamingJsonDecoder;
use streaming_encoder::StreamingJsonEncoder;
use tree_decoder::TreeDecoder;
use tree_encoder::TreeJsonEncoder;

/// Encoder extension available while writing with [`Json`].
pub trait JsonEncoder {
    fn json(&self) -> &Json;

    /// Writes a JSON tree in place of a typed value.
    fn encode_json_element(&mut self, element: &JsonElement) -> Result<()>;
}

/// Decoder extension available while reading with [`Json`].
pub trait JsonDecoder {
    fn json(&self) -> &Json;

    /// Reads the next value as a JSON tree.
    fn decode_json_element(&mut self) -> Result<JsonElement>;
}

/// A configured JSON format.
pub struct Json {
    config: JsonConfig,
    module: SerializersModule,
    pub(crate) schema: SchemaCache,
}

impl Json {
    /// Builds a format with `config` and no module registrations.
    pub fn new(config: JsonConfig) -> Result<Self> {
        Self::with_module(config, SerializersModule::default())
    }

    /// Builds a format with `config` and `module`. Both are validated here,
    /// so no encode or decode call fails because of them later.
    pub fn with_module(config: JsonConfig, module: SerializersModule) -> Result<Self> {
        config.validate()?;
        polymorphism::validate_module(&config, &module)?;
        debug!(
            "created Json format (lenient: {}, discriminator: '{}', pretty: {})",
            config.is_lenient, config.class_discriminator, config.pretty_print
        );
        Ok(Self {
            config,
            module,
            schema: SchemaCache::default(),
        })
    }

    /// Shared instance with the default configuration.
    #[must_use]
    pub fn default_instance() -> &'static Json {
        static DEFAULT: OnceLock<Json> = OnceLock::new();
        DEFAULT.get_or_init(Json::default)
    }

    #[must_use]
    pub fn config(&self) -> &JsonConfig {
        &self.config
    }

    #[must_use]
    pub fn serializers_module(&self) -> &SerializersModule {
        &self.module
    }

    /// Encodes `value` as JSON text.
    pub fn encode_to_string<T>(&self, strategy: &dyn SerialStrategy<T>, value: &T) -> Result<String> {
        let mut encoder = StreamingJsonEncoder::new(self);
        strategy.serialize(&mut encoder, value)?;
        Ok(encoder.finish())
    }

    /// Encodes `value` as JSON text into `writer`.
    pub fn encode_to_writer<W: Write, T>(
        &self,
        mut writer: W,
        strategy: &dyn SerialStrategy<T>,
        value: &T,
    ) -> Result<()> {
        let text = self.encode_to_string(strategy, value)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Encodes `value` into a JSON tree.
    pub fn encode_to_json_element<T>(&self, strategy: &dyn SerialStrategy<T>, value: &T) -> Result<JsonElement> {
        let mut encoder = TreeJsonEncoder::new(self);
        strategy.serialize(&mut encoder, value)?;
        encoder.finish()
    }

    /// Decodes one value from JSON text; anything but whitespace after it is an error.
    pub fn decode_from_str<T>(&self, strategy: &dyn SerialStrategy<T>, input: &str) -> Result<T> {
        let mut decoder = StreamingJsonDecoder::new(self, input);
        let value = strategy
            .deserialize(&mut decoder)
            .map_err(|e| e.with_path(|| decoder.path()))?;
        decoder.expect_eof()?;
        Ok(value)
    }

    /// Decodes one value from UTF-8 bytes.
    pub fn decode_from_slice<T>(&self, strategy: &dyn SerialStrategy<T>, bytes: &[u8]) -> Result<T> {
        self.decode_from_str(strategy, validate_utf8(bytes)?)
    }

    /// Decodes one value from a JSON tree.
    pub fn decode_from_json_element<T>(&self, strategy: &dyn SerialStrategy<T>, element: &JsonElement) -> Result<T> {
        let mut decoder = TreeDecoder::new(self, element, "$".to_owned());
        strategy
            .deserialize(&mut decoder)
            .map_err(|e| e.with_path(|| "$".to_owned()))
    }

    /// Parses JSON text into a tree without any typed strategy.
    pub fn parse_to_json_element(&self, input: &str) -> Result<JsonElement> {
        let mut decoder = StreamingJsonDecoder::new(self, input);
        let element = decoder.read_tree()?;
        decoder.expect_eof()?;
        Ok(element)
    }

    /// Encodes `value` with its default strategy.
    pub fn to_string<T: Serializable>(&self, value: &T) -> Result<String> {
        self.encode_to_string(&*T::serializer(), value)
    }

    /// Decodes a value with its default strategy.
    pub fn from_str<T: Serializable>(&self, input: &str) -> Result<T> {
        self.decode_from_str(&*T::serializer(), input)
    }
}

impl Default for Json {
    fn default() -> Self {
        Self {
            config: JsonConfig::default(),
            module: SerializersModule::default(),
            schema: SchemaCache::default(),
        }
    }
}

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| crate::error::Error::InvalidUtf8)
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    Ok(std::str::from_utf8(bytes)?)
}
