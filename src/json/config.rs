// ABOUTME: JSON format configuration: dialect switches, discriminator policy and naming strategy.
// ABOUTME: Also holds the hint texts that decoding errors attach for the flag relaxing a rule.

use crate::error::{Error, Result};

/// Where class discriminators are written on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassDiscriminatorMode {
    /// Every class and object gets a discriminator holding its own serial name.
    AllJsonObjects,
    /// Only values written through a polymorphic strategy get a discriminator.
    #[default]
    Polymorphic,
    /// No discriminator is written; decoding relies on a default deserializer.
    None,
}

/// Transformation applied to class element names on encode and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `fooBar` becomes `foo_bar`.
    SnakeCase,
    /// `fooBar` becomes `foo-bar`.
    KebabCase,
}

impl NamingStrategy {
    /// Returns the JSON name for an element declared as `serial_name`.
    #[must_use]
    pub fn serial_name_for_json(self, serial_name: &str) -> String {
        let delimiter = match self {
            NamingStrategy::SnakeCase => '_',
            NamingStrategy::KebabCase => '-',
        };
        convert_camel_case(serial_name, delimiter)
    }
}

fn convert_camel_case(serial_name: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(serial_name.len() * 2);
    let mut buffered: Option<char> = None;
    let mut upper_run = 0usize;
    for c in serial_name.chars() {
        if c.is_uppercase() {
            if upper_run == 0 && !out.is_empty() && !out.ends_with(delimiter) {
                out.push(delimiter);
            }
            if let Some(b) = buffered {
                out.push(b);
            }
            upper_run += 1;
            buffered = c.to_lowercase().next();
        } else {
            if let Some(b) = buffered.take() {
                // "URLMap" splits as "url_map": the last capital starts a word.
                if upper_run > 1 && c.is_alphabetic() {
                    out.push(delimiter);
                }
                out.push(b);
                upper_run = 0;
            }
            out.push(c);
        }
    }
    if let Some(b) = buffered {
        out.push(b);
    }
    out
}

/// Configuration for a [`Json`](super::Json) instance.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonConfig {
    /// Write elements that still hold their default value (default: false)
    pub encode_defaults: bool,
    /// Skip object keys that match no element (default: false)
    pub ignore_unknown_keys: bool,
    /// Accept unquoted strings and keys and case-insensitive booleans (default: false)
    pub is_lenient: bool,
    /// Write maps with non-primitive keys as `[k1, v1, k2, v2, ...]` (default: false)
    pub allow_structured_map_keys: bool,
    /// Write every map as `[k1, v1, k2, v2, ...]` (default: false)
    pub encode_maps_as_arrays: bool,
    /// Emit newlines and indentation (default: false)
    pub pretty_print: bool,
    /// Indent used by pretty printing; whitespace only (default: four spaces)
    pub pretty_print_indent: String,
    /// Write null element values; when false they are omitted (default: true)
    pub explicit_nulls: bool,
    /// Treat nulls for non-nullable optional elements and unknown enum values as absent (default: false)
    pub coerce_input_values: bool,
    /// Write polymorphic values as `[serial name, payload]` (default: false)
    pub use_array_polymorphism: bool,
    /// Key holding the polymorphic discriminator (default: "type")
    pub class_discriminator: String,
    /// Which values carry a discriminator (default: Polymorphic)
    pub class_discriminator_mode: ClassDiscriminatorMode,
    /// Read and write NaN and infinities as bare literals (default: false)
    pub allow_special_floating_point_values: bool,
    /// Honour `JsonNames` alternative names on decode (default: true)
    pub use_alternative_names: bool,
    /// Rename class elements (default: none)
    pub naming_strategy: Option<NamingStrategy>,
    /// Match enum entries ignoring case on decode (default: false)
    pub decode_enums_case_insensitive: bool,
    /// Accept a comma before a closing bracket (default: false)
    pub allow_trailing_comma: bool,
}

pub(crate) const DEFAULT_DISCRIMINATOR: &str = "type";
pub(crate) const DEFAULT_INDENT: &str = "    ";

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            encode_defaults: false,
            ignore_unknown_keys: false,
            is_lenient: false,
            allow_structured_map_keys: false,
            encode_maps_as_arrays: false,
            pretty_print: false,
            pretty_print_indent: DEFAULT_INDENT.to_owned(),
            explicit_nulls: true,
            coerce_input_values: false,
            use_array_polymorphism: false,
            class_discriminator: DEFAULT_DISCRIMINATOR.to_owned(),
            class_discriminator_mode: ClassDiscriminatorMode::Polymorphic,
            allow_special_floating_point_values: false,
            use_alternative_names: true,
            naming_strategy: None,
            decode_enums_case_insensitive: false,
            allow_trailing_comma: false,
        }
    }
}

impl JsonConfig {
    /// Checks option combinations that can never work together.
    pub fn validate(&self) -> Result<()> {
        if let Some(c) = self
            .pretty_print_indent
            .chars()
            .find(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        {
            return Err(Error::configuration(format!(
                "Only whitespace, tab, newline and carriage return are allowed as pretty print symbols. Had '{c}'"
            )));
        }
        if !self.pretty_print && self.pretty_print_indent != DEFAULT_INDENT {
            return Err(Error::configuration(
                "Indent should not be specified when default printing mode is used",
            ));
        }
        if self.use_array_polymorphism {
            if self.class_discriminator != DEFAULT_DISCRIMINATOR {
                return Err(Error::configuration(
                    "Class discriminator should not be specified when array polymorphism is specified",
                ));
            }
            if self.class_discriminator_mode != ClassDiscriminatorMode::Polymorphic {
                return Err(Error::configuration(
                    "use_array_polymorphism can only be used with the Polymorphic class discriminator mode",
                ));
            }
        }
        Ok(())
    }
}

/// The configuration switch that would have accepted the failing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    IgnoreUnknownKeys,
    Lenient,
    SpecialFloats,
    TrailingComma,
    CoerceInputValues,
    StructuredMapKeys,
}

impl Hint {
    pub(crate) fn message(self) -> &'static str {
        match self {
            Hint::IgnoreUnknownKeys => {
                "Use 'ignore_unknown_keys = true' in 'JsonConfig' or the 'JsonIgnoreUnknownKeys' annotation to ignore unknown keys."
            }
            Hint::Lenient => "Use 'is_lenient = true' in 'JsonConfig' to accept non-compliant JSON.",
            Hint::SpecialFloats => {
                "It is possible to deserialize them using 'allow_special_floating_point_values = true' in 'JsonConfig'."
            }
            Hint::TrailingComma => {
                "Trailing commas are non-compliant JSON and not allowed by default. Use 'allow_trailing_comma = true' in 'JsonConfig' to support them."
            }
            Hint::CoerceInputValues => {
                "Use 'coerce_input_values = true' in 'JsonConfig' to coerce nulls if property has a default value."
            }
            Hint::StructuredMapKeys => {
                "Use 'allow_structured_map_keys = true' in 'JsonConfig' to convert such maps to [key1, value1, key2, value2,...] arrays."
            }
        }
    }
}
