// ABOUTME: Error types for descriptor-driven encoding and decoding.
// ABOUTME: Decoding errors carry input offset, structural path and a configuration hint.

use std::fmt::Write as _;

/// The result type for serialform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed or unexpected JSON input.
    ///
    /// `offset` is a byte offset into the UTF-8 input; tree-based decoding has no
    /// offset and reports only the element path.
    #[error("{}", render_decoding(.message, .offset, .path, .hint, .input))]
    JsonDecoding {
        message: String,
        offset: Option<usize>,
        path: Option<String>,
        hint: Option<String>,
        input: Option<String>,
    },

    /// A value that cannot be represented in JSON under the active configuration.
    #[error("{0}")]
    JsonEncoding(String),

    /// Required fields were absent from the input.
    #[error("{}", render_missing(.serial_name, .fields, .path))]
    MissingFields {
        serial_name: String,
        fields: Vec<String>,
        path: Option<String>,
    },

    /// A polymorphic discriminator named a subtype that is not registered.
    #[error("{}", render_unknown_subtype(.base, .subtype))]
    UnknownSubtype {
        base: String,
        subtype: Option<String>,
    },

    /// Protocol misuse or a value the strategy cannot handle.
    #[error("{0}")]
    Serialization(String),

    /// Invalid configuration or module registration, raised before any data flows.
    #[error("{0}")]
    Configuration(String),

    /// Input bytes are not valid UTF-8.
    #[error("invalid UTF-8 sequence in input")]
    InvalidUtf8,

    /// I/O error while writing output.
    #[error("I/O error: {0}")]
    Io(String),

    /// Custom error message (for serde integration).
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Returns a stable snake-case name for the error variant.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::JsonDecoding { .. } => "json_decoding",
            Error::JsonEncoding(_) => "json_encoding",
            Error::MissingFields { .. } => "missing_fields",
            Error::UnknownSubtype { .. } => "unknown_subtype",
            Error::Serialization(_) => "serialization",
            Error::Configuration(_) => "configuration",
            Error::InvalidUtf8 => "invalid_utf8",
            Error::Io(_) => "io_error",
            Error::Custom(_) => "custom",
        }
    }

    pub(crate) fn serialization(message: impl Into<String>) -> Self {
        Error::Serialization(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Decoding error without a position, as raised by tree-based decoding.
    pub(crate) fn decoding(message: impl Into<String>) -> Self {
        Error::JsonDecoding {
            message: message.into(),
            offset: None,
            path: None,
            hint: None,
            input: None,
        }
    }

    /// Attaches a structural path if the error does not carry one yet.
    #[must_use]
    pub fn with_path(self, new_path: impl FnOnce() -> String) -> Self {
        match self {
            Error::JsonDecoding { message, offset, path: None, hint, input } => Error::JsonDecoding {
                message,
                offset,
                path: Some(new_path()),
                hint,
                input,
            },
            Error::MissingFields { serial_name, fields, path: None } => Error::MissingFields {
                serial_name,
                fields,
                path: Some(new_path()),
            },
            other => other,
        }
    }

    /// Names of the missing fields, if this is a missing-field error.
    #[must_use]
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            Error::MissingFields { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Byte offset into the input, if this is a positioned decoding error.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::JsonDecoding { offset, .. } => *offset,
            _ => None,
        }
    }
}

fn render_decoding(
    message: &str,
    offset: &Option<usize>,
    path: &Option<String>,
    hint: &Option<String>,
    input: &Option<String>,
) -> String {
    let mut out = match *offset {
        Some(offset) => format!("Unexpected JSON token at offset {offset}: {message}"),
        None => message.to_owned(),
    };
    if let Some(path) = path {
        let _ = write!(out, " at path: {path}");
    }
    if let Some(hint) = hint {
        out.push('\n');
        out.push_str(hint);
    }
    if let Some(input) = input {
        let _ = write!(out, "\nJSON input: {input}");
    }
    out
}

fn render_missing(serial_name: &str, fields: &[String], path: &Option<String>) -> String {
    let mut out = if let [single] = fields {
        format!(
            "Field '{single}' is required for type with serial name '{serial_name}', but it was missing"
        )
    } else {
        format!(
            "Fields [{}] are required for type with serial name '{serial_name}', but they were missing",
            fields.join(", ")
        )
    };
    if let Some(path) = path {
        let _ = write!(out, " at path: {path}");
    }
    out
}

fn render_unknown_subtype(base: &str, subtype: &Option<String>) -> String {
    match subtype {
        None => format!(
            "Class discriminator was missing and no default serializers were registered \
             in the polymorphic scope of '{base}'."
        ),
        Some(name) => format!(
            "Serializer for subclass '{name}' is not found in the polymorphic scope of '{base}'.\n\
             Check if class with serial name '{name}' exists and serializer is registered in a \
             corresponding SerializersModule.\n\
             To be registered automatically, the base class '{base}' has to be sealed."
        ),
    }
}

/// Shortens long input around `offset` for inclusion in error messages.
pub(crate) fn minify(input: &str, offset: Option<usize>) -> String {
    if input.len() < 200 {
        return input.to_owned();
    }
    let Some(offset) = offset else {
        let start = floor_char_boundary(input, input.len() - 60);
        return format!(".....{}", &input[start..]);
    };
    let start = offset.saturating_sub(30);
    let end = (offset + 30).min(input.len());
    let prefix = if start == 0 { "" } else { "....." };
    let suffix = if end >= input.len() { "" } else { "....." };
    let start = floor_char_boundary(input, start);
    let end = floor_char_boundary(input, end);
    format!("{prefix}{}{suffix}", &input[start..end])
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

impl serde::de::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
