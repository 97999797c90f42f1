// ABOUTME: Table-driven conformance runner for JSON text parsing and printing.
// ABOUTME: Uses serde_json as the oracle for parsed trees and regex for diagnostics.

use regex::Regex;
use serde_json::Value as JsonValue;
use serialform::json::{Json, JsonConfig, JsonElement, JsonElementSerializer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Option names the runner maps onto `JsonConfig`.
const KNOWN_OPTIONS: &[&str] = &[
    "is_lenient",
    "allow_trailing_comma",
    "allow_special_floating_point_values",
    "pretty_print",
];

fn build_json(options: Option<&JsonValue>) -> Result<Json, String> {
    let mut config = JsonConfig::default();
    let Some(options) = options else {
        return Json::new(config).map_err(|e| e.to_string());
    };
    let options = options.as_object().ok_or("'options' must be an object")?;
    for (name, value) in options {
        if !KNOWN_OPTIONS.contains(&name.as_str()) {
            return Err(format!("unknown option '{name}'"));
        }
        let flag = value.as_bool().ok_or_else(|| format!("option '{name}' must be a boolean"))?;
        match name.as_str() {
            "is_lenient" => config.is_lenient = flag,
            "allow_trailing_comma" => config.allow_trailing_comma = flag,
            "allow_special_floating_point_values" => config.allow_special_floating_point_values = flag,
            "pretty_print" => config.pretty_print = flag,
            _ => unreachable!(),
        }
    }
    Json::new(config).map_err(|e| e.to_string())
}

/// Converts a parsed tree into the oracle's value model.
fn to_oracle(element: &JsonElement) -> JsonValue {
    serde_json::to_value(element).expect("trees always convert")
}

fn run_test(test: &JsonValue) -> Result<(), String> {
    let input = test["input"].as_str().ok_or("missing 'input'")?;
    let json = build_json(test.get("options"))?;

    match test["type"].as_str().unwrap_or("") {
        "parse" => {
            let element = json.parse_to_json_element(input).map_err(|e| format!("parse failed: {e}"))?;
            let expected_text = test.get("expected").and_then(JsonValue::as_str).unwrap_or(input);
            let expected: JsonValue =
                serde_json::from_str(expected_text).map_err(|e| format!("oracle rejected input: {e}"))?;
            let actual = to_oracle(&element);
            if actual != expected {
                return Err(format!("expected {expected}, got {actual}"));
            }
        }
        "roundtrip" => {
            let element = json.parse_to_json_element(input).map_err(|e| format!("parse failed: {e}"))?;
            let output = json
                .encode_to_string(&JsonElementSerializer, &element)
                .map_err(|e| format!("encode failed: {e}"))?;
            let expected = test["expected_output"].as_str().ok_or("missing 'expected_output'")?;
            if output != expected {
                return Err(format!("expected output {expected:?}, got {output:?}"));
            }
        }
        "parse_error" => {
            let pattern = test["expected_error"].as_str().ok_or("missing 'expected_error'")?;
            let pattern = Regex::new(pattern).map_err(|e| format!("bad expected_error regex: {e}"))?;
            match json.parse_to_json_element(input) {
                Ok(element) => return Err(format!("expected an error, parsed {element}")),
                Err(err) => {
                    if err.error_type() != "json_decoding" {
                        return Err(format!("expected json_decoding, got {}", err.error_type()));
                    }
                    let message = err.to_string();
                    if !pattern.is_match(&message) {
                        return Err(format!("message {message:?} does not match {pattern}"));
                    }
                }
            }
        }
        other => return Err(format!("unknown test type '{other}'")),
    }
    Ok(())
}

/// Runs every case of a test file and returns the failures.
fn run_test_file(path: &Path) -> Vec<String> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let suite: JsonValue = serde_json::from_str(&content).expect("test file is valid JSON");
    let version = suite["version"].as_str().expect("test file has a version");
    assert!(
        Regex::new(r"^\d+\.\d+\.\d+$").unwrap().is_match(version),
        "invalid version '{version}'"
    );

    let name_pattern = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    let mut seen = HashSet::new();
    let mut failures = Vec::new();
    for test in suite["tests"].as_array().expect("'tests' is an array") {
        let name = test["name"].as_str().unwrap_or("unnamed");
        assert!(name_pattern.is_match(name), "invalid test name '{name}'");
        assert!(seen.insert(name.to_owned()), "duplicate test name '{name}'");
        if let Err(reason) = run_test(test) {
            failures.push(format!("{name}: {reason}"));
        }
    }
    failures
}

#[test]
fn test_conformance_json_text() {
    let _ = env_logger::builder().is_test(true).try_init();
    let failures = run_test_file(Path::new("tests/conformance/json_text.json"));
    assert!(failures.is_empty(), "conformance failures:\n{}", failures.join("\n"));
}
