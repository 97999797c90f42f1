// ABOUTME: Unit tests for the error module.
// ABOUTME: Tests error type identification and message rendering.

use crate::error::{minify, Error};

#[test]
fn test_error_types() {
    assert_eq!(Error::InvalidUtf8.error_type(), "invalid_utf8");
    assert_eq!(Error::decoding("x").error_type(), "json_decoding");
    assert_eq!(Error::Configuration("x".into()).error_type(), "configuration");
}

#[test]
fn test_decoding_display_with_offset_path_and_hint() {
    let err = Error::JsonDecoding {
        message: "Encountered an unknown key 'x'".into(),
        offset: Some(12),
        path: Some("$.users[2]".into()),
        hint: Some("Use 'ignore_unknown_keys = true' to ignore unknown keys.".into()),
        input: Some("{}".into()),
    };
    assert_eq!(
        err.to_string(),
        "Unexpected JSON token at offset 12: Encountered an unknown key 'x' at path: $.users[2]\n\
         Use 'ignore_unknown_keys = true' to ignore unknown keys.\n\
         JSON input: {}"
    );
}

#[test]
fn test_missing_fields_display() {
    let single = Error::MissingFields {
        serial_name: "Project".into(),
        fields: vec!["name".into()],
        path: None,
    };
    assert_eq!(
        single.to_string(),
        "Field 'name' is required for type with serial name 'Project', but it was missing"
    );

    let many = Error::MissingFields {
        serial_name: "Project".into(),
        fields: vec!["name".into(), "owner".into()],
        path: Some("$.projects[0]".into()),
    };
    assert_eq!(
        many.to_string(),
        "Fields [name, owner] are required for type with serial name 'Project', \
         but they were missing at path: $.projects[0]"
    );
}

#[test]
fn test_with_path_keeps_existing_path() {
    let err = Error::decoding("bad").with_path(|| "$.a".into());
    let err = err.with_path(|| "$.b".into());
    assert!(err.to_string().ends_with("at path: $.a"));
}

#[test]
fn test_minify_keeps_short_input() {
    assert_eq!(minify("{\"a\":1}", Some(3)), "{\"a\":1}");
}

#[test]
fn test_minify_around_offset() {
    let input = "x".repeat(300);
    let out = minify(&input, Some(150));
    assert!(out.starts_with("....."));
    assert!(out.ends_with("....."));
    assert_eq!(out.len(), 60 + 10);
}

#[test]
fn test_minify_respects_char_boundaries() {
    let input = "é".repeat(150);
    let out = minify(&input, Some(151));
    assert!(out.starts_with("....."));
}

#[test]
fn test_conversions() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let err = Error::from(io);
    assert_eq!(err.error_type(), "io_error");
    assert_eq!(err.to_string(), "I/O error: pipe closed");

    let bytes = [0x66, 0xff];
    let err = Error::from(std::str::from_utf8(&bytes).unwrap_err());
    assert_eq!(err, Error::InvalidUtf8);

    let err = <Error as serde::de::Error>::custom("bad tree");
    assert_eq!(err.error_type(), "custom");
    assert_eq!(err.to_string(), "bad tree");
}
