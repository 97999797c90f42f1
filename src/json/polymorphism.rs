// ABOUTME: Class discriminator resolution and the checks that keep JSON polymorphism unambiguous.
// ABOUTME: Module registrations are validated once when a Json instance is built.

use super::config::{ClassDiscriminatorMode, JsonConfig};
use crate::descriptor::{Annotation, PolymorphicKind, SerialDescriptor, SerialKind};
use crate::error::{Error, Result};
use crate::module::SerializersModule;

/// The discriminator key for values of `base`: its class annotation, else the configured key.
pub(crate) fn class_discriminator<'a>(base: &'a SerialDescriptor, config: &'a JsonConfig) -> &'a str {
    base.annotations()
        .iter()
        .find_map(|annotation| match annotation {
            Annotation::ClassDiscriminator(key) => Some(key.as_str()),
            _ => None,
        })
        .unwrap_or(&config.class_discriminator)
}

/// Rejects subtypes that cannot carry a discriminator key inside their own object.
pub(crate) fn validate_actual_kind(actual: &SerialDescriptor) -> Result<()> {
    match actual.kind() {
        SerialKind::Enum => Err(Error::serialization(
            "Enums cannot be serialized polymorphically with 'type' parameter. \
             You can use 'use_array_polymorphism' instead",
        )),
        kind if kind.is_primitive() => Err(Error::serialization(
            "Primitives cannot be serialized polymorphically with 'type' parameter. \
             You can use 'use_array_polymorphism' instead",
        )),
        kind if kind.is_polymorphic() => Err(Error::serialization(
            "Actual serializer for polymorphic cannot be polymorphic itself",
        )),
        _ => Ok(()),
    }
}

/// Sealed subtypes are not registered in a module. An annotated key is checked
/// when the sealed strategy is built; the configured key only when written.
pub(crate) fn check_discriminator_collision(
    base: &SerialDescriptor,
    actual: &SerialDescriptor,
    discriminator: &str,
) -> Result<()> {
    if base.kind() != SerialKind::Polymorphic(PolymorphicKind::Sealed) {
        return Ok(());
    }
    if actual.cached_serial_names().contains(discriminator) {
        return Err(Error::JsonEncoding(format!(
            "Sealed class '{}' cannot be serialized as base class '{}' because it has property name \
             that conflicts with JSON class discriminator '{discriminator}'. You can either change class \
             discriminator in JsonConfig, rename the property or fall back to array polymorphism",
            actual.serial_name(),
            base.serial_name()
        )));
    }
    Ok(())
}

/// The `(key, serial name)` pair written into the object of a polymorphic
/// value, or `None` when discriminators are disabled.
pub(crate) fn pending_discriminator(
    config: &JsonConfig,
    base: &SerialDescriptor,
    actual: &SerialDescriptor,
) -> Result<Option<(String, String)>> {
    if config.class_discriminator_mode == ClassDiscriminatorMode::None {
        return Ok(None);
    }
    let key = class_discriminator(base, config);
    check_discriminator_collision(base, actual, key)?;
    validate_actual_kind(actual)?;
    Ok(Some((key.to_owned(), actual.serial_name().to_owned())))
}

/// True when `AllJsonObjects` asks for a discriminator on a plain class or object.
pub(crate) fn writes_own_discriminator(config: &JsonConfig, descriptor: &SerialDescriptor) -> bool {
    config.class_discriminator_mode == ClassDiscriminatorMode::AllJsonObjects
        && matches!(descriptor.kind(), SerialKind::CLASS | SerialKind::OBJECT)
}

/// Checks every polymorphic registration of `module` against `config`.
pub(crate) fn validate_module(config: &JsonConfig, module: &SerializersModule) -> Result<()> {
    for (base, subclass) in module.subclass_descriptors() {
        let kind = subclass.kind();
        if kind.is_polymorphic() || kind == SerialKind::Contextual {
            return Err(Error::configuration(format!(
                "Serializer for {} can't be registered as a subclass for polymorphic serialization of {base} \
                 because its kind {kind} is not concrete. To work with multiple hierarchies, register it as a base class.",
                subclass.serial_name()
            )));
        }
        if config.use_array_polymorphism {
            continue;
        }
        if kind.is_primitive() || kind == SerialKind::Enum {
            return Err(Error::configuration(format!(
                "Serializer for {} of kind {kind} cannot be serialized polymorphically with class discriminator.",
                subclass.serial_name()
            )));
        }
        if subclass.cached_serial_names().contains(&config.class_discriminator) {
            return Err(Error::configuration(format!(
                "Polymorphic serializer for {} has property '{}' that conflicts with JSON class discriminator. \
                 You can either change class discriminator in JsonConfig, rename the property or fall back to \
                 array polymorphism",
                subclass.serial_name(),
                config.class_discriminator
            )));
        }
    }
    Ok(())
}
