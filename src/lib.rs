// ABOUTME: Descriptor-driven serialization engine with a JSON format.
// ABOUTME: Strategies describe values once; formats drive them through the encoder and decoder protocol.

//! # serialform
//!
//! A serialization engine where every type is described by a
//! [`SerialDescriptor`] and moved through a format by a [`SerialStrategy`].
//! Strategies talk only to the format-neutral [`Encoder`] and [`Decoder`]
//! protocol, so the same strategy works for streaming JSON text, for
//! in-memory [`JsonElement`](json::JsonElement) trees and for any other
//! format implementing the protocol.
//!
//! ## Quick Start
//!
//! ```rust
//! use serialform::json::{Json, JsonConfig};
//!
//! let json = Json::default();
//! let text = json.to_string(&vec![1u32, 2, 3]).unwrap();
//! assert_eq!(text, "[1,2,3]");
//!
//! let back: Vec<u32> = json.from_str(&text).unwrap();
//! assert_eq!(back, vec![1, 2, 3]);
//!
//! let pretty = Json::new(JsonConfig {
//!     pretty_print: true,
//!     ..JsonConfig::default()
//! })
//! .unwrap();
//! assert_eq!(pretty.to_string(&vec![true]).unwrap(), "[\n    true\n]");
//! ```
//!
//! ## Writing a Strategy
//!
//! ```rust
//! use serialform::descriptor::{DescriptorBuilder, SerialDescriptor, SerialKind};
//! use serialform::encoding::{Decoder, Encoder};
//! use serialform::strategy::{int_descriptor, missing_fields_error, SerialStrategy};
//! use serialform::{Json, Result};
//!
//! #[derive(Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! struct PointSerializer(SerialDescriptor);
//!
//! impl PointSerializer {
//!     fn new() -> Self {
//!         let descriptor = DescriptorBuilder::new("Point", SerialKind::CLASS)
//!             .element("x", int_descriptor().clone())
//!             .optional_element("y", int_descriptor().clone())
//!             .build()
//!             .unwrap();
//!         Self(descriptor)
//!     }
//! }
//!
//! impl SerialStrategy<Point> for PointSerializer {
//!     fn descriptor(&self) -> &SerialDescriptor {
//!         &self.0
//!     }
//!
//!     fn serialize(&self, encoder: &mut dyn Encoder, value: &Point) -> Result<()> {
//!         let composite = encoder.begin_structure(&self.0)?;
//!         composite.encode_int_element(&self.0, 0, value.x)?;
//!         if value.y != 0 || composite.should_encode_element_default(&self.0, 1) {
//!             composite.encode_int_element(&self.0, 1, value.y)?;
//!         }
//!         composite.end_structure(&self.0)
//!     }
//!
//!     fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Point> {
//!         let composite = decoder.begin_structure(&self.0)?;
//!         let (mut x, mut y) = (None, 0);
//!         while let Some(index) = composite.decode_element_index(&self.0)? {
//!             match index {
//!                 0 => x = Some(composite.decode_int_element(&self.0, 0)?),
//!                 _ => y = composite.decode_int_element(&self.0, 1)?,
//!             }
//!         }
//!         composite.end_structure(&self.0)?;
//!         let x = x.ok_or_else(|| missing_fields_error(0, 0b1, &self.0))?;
//!         Ok(Point { x, y })
//!     }
//! }
//!
//! let json = Json::default();
//! let text = json.encode_to_string(&PointSerializer::new(), &Point { x: 1, y: 0 }).unwrap();
//! assert_eq!(text, r#"{"x":1}"#);
//!
//! let err = json.decode_from_str(&PointSerializer::new(), r#"{"y":2}"#).unwrap_err();
//! assert_eq!(err.missing_fields(), Some(&["x".to_owned()][..]));
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `debug` for format
//! construction and module registration, `trace` for buffering decisions and
//! schema caching. Install any logger to see them.

pub mod collections;
pub mod descriptor;
pub mod encoding;
pub mod enums;
pub mod error;
pub mod json;
pub mod marker;
pub mod module;
pub mod polymorphic;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items at the crate root
pub use descriptor::{Annotation, DescriptorBuilder, SerialDescriptor, SerialKind};
pub use encoding::{CompositeDecoder, CompositeEncoder, Decoder, Encoder};
pub use error::{Error, Result};
pub use json::{Json, JsonConfig, JsonElement};
pub use module::SerializersModule;
pub use strategy::{Serializable, SerialStrategy};

/// Encodes a value as JSON text with the default configuration.
///
/// # Example
///
/// ```rust
/// let text = serialform::to_string(&(1i32, "one".to_owned())).unwrap();
/// assert_eq!(text, r#"{"first":1,"second":"one"}"#);
/// ```
pub fn to_string<T: Serializable>(value: &T) -> Result<String> {
    Json::default_instance().to_string(value)
}

/// Decodes a value from JSON text with the default configuration.
///
/// # Example
///
/// ```rust
/// let values: Vec<Option<i64>> = serialform::from_str("[1, null, -3]").unwrap();
/// assert_eq!(values, vec![Some(1), None, Some(-3)]);
/// ```
pub fn from_str<T: Serializable>(input: &str) -> Result<T> {
    Json::default_instance().from_str(input)
}

/// Parses JSON text into a tree with the default configuration.
pub fn parse(input: &str) -> Result<JsonElement> {
    Json::default_instance().parse_to_json_element(input)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
