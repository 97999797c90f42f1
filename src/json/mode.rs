// ABOUTME: Structural write modes of the JSON codec and their selection from descriptor kinds.
// ABOUTME: Maps pick object or array layout from the carrier descriptor of their key.

use super::config::{Hint, JsonConfig};
use super::element_serializer::JSON_OBJECT_NAME;
use crate::descriptor::{SerialDescriptor, SerialKind};
use crate::error::{Error, Result};
use crate::module::SerializersModule;

/// Bracket layout of one open structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// `{"name": value, ...}`
    Obj,
    /// `[value, ...]`
    List,
    /// `{"key": value, ...}` with interleaved key and value indices.
    Map,
    /// `["serial name", payload]`
    PolyObj,
}

impl WriteMode {
    pub(crate) fn begin(self) -> char {
        match self {
            WriteMode::Obj | WriteMode::Map => '{',
            WriteMode::List | WriteMode::PolyObj => '[',
        }
    }

    pub(crate) fn end(self) -> char {
        match self {
            WriteMode::Obj | WriteMode::Map => '}',
            WriteMode::List | WriteMode::PolyObj => ']',
        }
    }
}

/// Chooses the layout for a structure described by `descriptor`.
pub(crate) fn switch_mode(
    config: &JsonConfig,
    module: &SerializersModule,
    descriptor: &SerialDescriptor,
) -> Result<WriteMode> {
    match descriptor.kind() {
        SerialKind::Polymorphic(_) => Ok(WriteMode::PolyObj),
        SerialKind::LIST => Ok(WriteMode::List),
        SerialKind::MAP => select_map_mode(config, module, descriptor),
        _ => Ok(WriteMode::Obj),
    }
}

fn select_map_mode(
    config: &JsonConfig,
    module: &SerializersModule,
    descriptor: &SerialDescriptor,
) -> Result<WriteMode> {
    if config.encode_maps_as_arrays && descriptor.serial_name() != JSON_OBJECT_NAME {
        return Ok(WriteMode::List);
    }
    let key = carrier_descriptor(&descriptor.element_descriptor(0), module);
    let kind = key.kind();
    if kind.is_primitive() || kind == SerialKind::Enum {
        Ok(WriteMode::Map)
    } else if config.allow_structured_map_keys {
        Ok(WriteMode::List)
    } else {
        Err(invalid_key_kind(&key))
    }
}

/// The descriptor whose kind decides the JSON shape: contextual descriptors
/// resolve through the module and inline wrappers unwrap to their element.
pub(crate) fn carrier_descriptor(descriptor: &SerialDescriptor, module: &SerializersModule) -> SerialDescriptor {
    if descriptor.kind() == SerialKind::Contextual {
        if let Some(resolved) = module.contextual_descriptor(descriptor) {
            return carrier_descriptor(&resolved, module);
        }
        return descriptor.clone();
    }
    if descriptor.is_inline() {
        return carrier_descriptor(&descriptor.element_descriptor(0), module);
    }
    descriptor.clone()
}

pub(crate) fn invalid_key_kind(key: &SerialDescriptor) -> Error {
    Error::JsonEncoding(format!(
        "Value of type '{}' can't be used in JSON as a key in the map. It should have either primitive or enum kind, but its kind is '{}'.\n{}",
        key.serial_name(),
        key.kind(),
        Hint::StructuredMapKeys.message()
    ))
}
