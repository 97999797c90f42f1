// ABOUTME: Unit tests for the streaming JSON decoder.
// ABOUTME: Covers key lookup, coercion, implicit nulls, separators, numbers and polymorphic lookahead.

use crate::collections::MapSerializer;
use crate::json::config::{ClassDiscriminatorMode, JsonConfig, NamingStrategy};
use crate::json::fixtures::{
    response_serializer, Color, FieldClass, Project, ProjectSerializer, Response, Settings, SettingsSerializer,
};
use crate::json::{build_json_array, build_json_object, Json, JsonElement, JsonElementSerializer};
use crate::strategy::Serializable;
use crate::Error;
use indexmap::IndexMap;

fn json_with(config: JsonConfig) -> Json {
    Json::new(config).unwrap()
}

fn decode_project(json: &Json, input: &str) -> crate::Result<Project> {
    json.decode_from_str(&ProjectSerializer::new(), input)
}

#[test]
fn test_optional_element_keeps_default() {
    let project = decode_project(&Json::default(), r#"{"name":"kotlinx.serialization"}"#).unwrap();
    assert_eq!(project, Project::new("kotlinx.serialization", "Kotlin"));
    let project = decode_project(&Json::default(), r#" { "language" : "Rust" , "name" : "serialform" } "#).unwrap();
    assert_eq!(project, Project::new("serialform", "Rust"));
}

#[test]
fn test_duplicate_key_last_wins() {
    let project = decode_project(&Json::default(), r#"{"name":"first","name":"second"}"#).unwrap();
    assert_eq!(project.name, "second");
}

#[test]
fn test_missing_required_field() {
    let err = decode_project(&Json::default(), r#"{"language":"Rust"}"#).unwrap_err();
    assert_eq!(err.missing_fields(), Some(&["name".to_owned()][..]));
    assert!(err
        .to_string()
        .starts_with("Field 'name' is required for type with serial name 'Project', but it was missing"));
}

#[test]
fn test_unknown_key_is_rejected_at_its_offset() {
    let err = decode_project(&Json::default(), r#"{"name":"a","extra":1}"#).unwrap_err();
    assert_eq!(err.offset(), Some(12));
    let message = err.to_string();
    assert!(message.contains("Encountered an unknown key 'extra'"));
    assert!(message.contains("ignore_unknown_keys = true"));
    assert!(message.contains("JSON input: {\"name\":\"a\",\"extra\":1}"));
}

#[test]
fn test_ignore_unknown_keys_skips_nested_values() {
    let json = json_with(JsonConfig {
        ignore_unknown_keys: true,
        ..JsonConfig::default()
    });
    let input = r#"{"extra":{"deep":[1,{"x":"]"}]},"name":"a","more":null}"#;
    assert_eq!(decode_project(&json, input).unwrap(), Project::new("a", "Kotlin"));
}

#[test]
fn test_trailing_comma() {
    let err = decode_project(&Json::default(), r#"{"name":"a",}"#).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Trailing comma before the end of JSON object"));
    assert!(message.contains("allow_trailing_comma"));

    let json = json_with(JsonConfig {
        allow_trailing_comma: true,
        ..JsonConfig::default()
    });
    assert_eq!(decode_project(&json, r#"{"name":"a",}"#).unwrap().name, "a");
    let values: Vec<i32> = json.from_str("[1,2,]").unwrap();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_separator_errors() {
    let json = Json::default();
    let err = json.from_str::<Vec<i32>>("[,1]").unwrap_err();
    assert!(err.to_string().contains("Unexpected leading comma"));
    let err = json.from_str::<Vec<i32>>("[1 2]").unwrap_err();
    assert!(err.to_string().contains("Expected end of the array or comma"));
    let err = decode_project(&json, r#"{"name":"a" "language":"b"}"#).unwrap_err();
    assert!(err.to_string().contains("Expected comma after the key-value pair"));
}

#[test]
fn test_trailing_content_is_rejected() {
    let err = decode_project(&Json::default(), r#"{"name":"a"} x"#).unwrap_err();
    assert_eq!(err.offset(), Some(13));
    assert!(err.to_string().contains("Expected EOF after parsing, but had 'x' instead"));
}

#[test]
fn test_error_path_points_into_lists() {
    let strategy = crate::collections::ListSerializer::new(std::sync::Arc::new(ProjectSerializer::new()));
    let err = Json::default()
        .decode_from_str(&strategy, r#"[{"name":"a"},{"name":1}]"#)
        .unwrap_err();
    assert!(err.to_string().contains("at path: $[1].name"));
}

#[test]
fn test_maps() {
    let json = Json::default();
    let map: IndexMap<i32, i32> = json.from_str(r#"{"1":10,"2":20}"#).unwrap();
    assert_eq!(map.get(&1), Some(&10));
    assert_eq!(map.get(&2), Some(&20));

    let err = json.from_str::<IndexMap<i32, i32>>(r#"{"1":"x"}"#).unwrap_err();
    assert!(err.to_string().contains("at path: $['1']"));

    let arrays = json_with(JsonConfig {
        encode_maps_as_arrays: true,
        ..JsonConfig::default()
    });
    let strategy = MapSerializer::new(i32::serializer(), i32::serializer());
    let map = arrays.decode_from_str(&strategy, "[1,10,2,20]").unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&2], 20);
}

#[test]
fn test_leading_discriminator() {
    let json = Json::default();
    let value = json.decode_from_str(&response_serializer(), r#"{"type":"Ok","data":42}"#).unwrap();
    assert_eq!(value, Response::Ok(42));
}

#[test]
fn test_discriminator_after_payload_is_buffered() {
    let json = Json::default();
    let value = json
        .decode_from_str(&response_serializer(), r#"{"message":"boom","type":"Err"}"#)
        .unwrap();
    assert_eq!(value, Response::Err("boom".to_owned()));
}

#[test]
fn test_unknown_and_missing_subtypes() {
    let json = Json::default();
    let err = json
        .decode_from_str(&response_serializer(), r#"{"type":"Nope","data":1}"#)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownSubtype { subtype: Some(ref s), .. } if s == "Nope"));
    let err = json.decode_from_str(&response_serializer(), r#"{"data":1}"#).unwrap_err();
    assert!(matches!(err, Error::UnknownSubtype { subtype: None, .. }));
}

#[test]
fn test_array_polymorphism() {
    let json = json_with(JsonConfig {
        use_array_polymorphism: true,
        ..JsonConfig::default()
    });
    let value = json.decode_from_str(&response_serializer(), r#"["Ok",{"data":7}]"#).unwrap();
    assert_eq!(value, Response::Ok(7));
}

#[test]
fn test_all_json_objects_skips_own_discriminator() {
    let json = json_with(JsonConfig {
        class_discriminator_mode: ClassDiscriminatorMode::AllJsonObjects,
        ..JsonConfig::default()
    });
    let project = decode_project(&json, r#"{"type":"Project","name":"a"}"#).unwrap();
    assert_eq!(project, Project::new("a", "Kotlin"));
}

#[test]
fn test_unknown_enum_value() {
    let json = Json::default();
    let err = json
        .decode_from_str(&SettingsSerializer::new(), r#"{"color":null,"mode":"BLUE"}"#)
        .unwrap_err();
    assert!(err.to_string().contains("Color does not contain element with name 'BLUE'"));
}

#[test]
fn test_coercion_restores_defaults() {
    let json = json_with(JsonConfig {
        coerce_input_values: true,
        ..JsonConfig::default()
    });
    let settings = json
        .decode_from_str(
            &SettingsSerializer::new(),
            r#"{"color":"GREEN","mode":"BLUE","count":null,"label":null}"#,
        )
        .unwrap();
    assert_eq!(
        settings,
        Settings {
            color: Some(Color::Green),
            mode: Color::Red,
            count: 0,
            label: None,
        }
    );
}

#[test]
fn test_absent_nullable_reads_as_null_without_explicit_nulls() {
    let json = Json::default();
    let err = json.decode_from_str(&SettingsSerializer::new(), "{}").unwrap_err();
    assert_eq!(err.missing_fields(), Some(&["color".to_owned()][..]));

    let json = json_with(JsonConfig {
        explicit_nulls: false,
        ..JsonConfig::default()
    });
    let settings = json.decode_from_str(&SettingsSerializer::new(), "{}").unwrap();
    assert_eq!(settings.color, None);
    assert_eq!(settings.mode, Color::Red);
}

#[test]
fn test_unknown_enum_reads_as_null_without_explicit_nulls() {
    let json = json_with(JsonConfig {
        explicit_nulls: false,
        coerce_input_values: true,
        ..JsonConfig::default()
    });
    let settings = json
        .decode_from_str(&SettingsSerializer::new(), r#"{"color":"BLUE","count":3}"#)
        .unwrap();
    assert_eq!(settings.color, None);
    assert_eq!(settings.count, 3);
}

#[test]
fn test_integer_bounds() {
    let json = Json::default();
    assert_eq!(json.from_str::<i64>("-9223372036854775808").unwrap(), i64::MIN);
    assert_eq!(json.from_str::<i64>("9223372036854775807").unwrap(), i64::MAX);
    let err = json.from_str::<i64>("9223372036854775808").unwrap_err();
    assert!(err.to_string().contains("Numeric value overflow"));
    let err = json.from_str::<i8>("300").unwrap_err();
    assert!(err.to_string().contains("Failed to parse byte for input '300'"));
    assert_eq!(json.from_str::<i32>(r#""42""#).unwrap(), 42);
    assert_eq!(json.from_str::<i64>("1e3").unwrap(), 1000);
}

#[test]
fn test_unsigned_numbers() {
    let json = Json::default();
    assert_eq!(json.from_str::<u64>("18446744073709551615").unwrap(), u64::MAX);
    assert_eq!(json.from_str::<u8>("255").unwrap(), 255);
    let err = json.from_str::<u8>("256").unwrap_err();
    assert!(err.to_string().contains("Failed to parse type 'u8' for input '256'"));
    let map: IndexMap<u32, bool> = json.from_str(r#"{"4294967295":true}"#).unwrap();
    assert_eq!(map.get(&u32::MAX), Some(&true));
}

#[test]
fn test_special_floats() {
    let err = Json::default().from_str::<f64>("NaN").unwrap_err();
    assert!(err.to_string().contains("allow_special_floating_point_values = true"));
    let json = json_with(JsonConfig {
        allow_special_floating_point_values: true,
        ..JsonConfig::default()
    });
    assert!(json.from_str::<f64>("NaN").unwrap().is_nan());
    assert_eq!(json.from_str::<f64>("-Infinity").unwrap(), f64::NEG_INFINITY);
    assert_eq!(json.from_str::<f32>("1.5").unwrap(), 1.5);
}

#[test]
fn test_lenient_strings() {
    let err = decode_project(&Json::default(), r#"{"name":abc}"#).unwrap_err();
    assert!(err.to_string().contains("is_lenient = true"));
    let json = json_with(JsonConfig {
        is_lenient: true,
        ..JsonConfig::default()
    });
    assert_eq!(decode_project(&json, "{name:abc}").unwrap().name, "abc");
}

#[test]
fn test_naming_strategy() {
    let strategy = FieldClass::new("Account", "userName", String::serializer());
    let json = json_with(JsonConfig {
        naming_strategy: Some(NamingStrategy::SnakeCase),
        ..JsonConfig::default()
    });
    assert_eq!(json.decode_from_str(&strategy, r#"{"user_name":"ann"}"#).unwrap(), "ann");
    let err = json.decode_from_str(&strategy, r#"{"userName":"ann"}"#).unwrap_err();
    assert!(err.to_string().contains("Encountered an unknown key 'userName'"));
}

#[test]
fn test_json_element_inside_typed_value() {
    let strategy = FieldClass::new("Wrapper", "payload", JsonElement::serializer());
    let json = Json::default();
    let value = json
        .decode_from_str(&strategy, r#"{"payload":{"a":[1,true,null,"s"]}}"#)
        .unwrap();
    let expected: JsonElement = build_json_object(|o| {
        o.put(
            "a",
            build_json_array(|a| {
                a.add(1);
                a.add(true);
                a.add(JsonElement::Null);
                a.add("s");
            }),
        );
    })
    .into();
    assert_eq!(value, expected);
    assert_eq!(json.decode_from_str(&JsonElementSerializer, "null").unwrap(), JsonElement::Null);
}

#[test]
fn test_merge_appends_and_updates_previous() {
    use super::StreamingJsonDecoder;
    use crate::strategy::SerialStrategy;
    let json = Json::default();

    let list = Vec::<i32>::serializer();
    let mut decoder = StreamingJsonDecoder::new(&json, "[2,3]");
    assert_eq!(list.merge(&mut decoder, vec![1]).unwrap(), vec![1, 2, 3]);

    let map = MapSerializer::new(String::serializer(), i32::serializer());
    let mut previous = IndexMap::new();
    previous.insert("a".to_owned(), 1);
    let mut decoder = StreamingJsonDecoder::new(&json, r#"{"b":2,"a":5}"#);
    let merged = map.merge(&mut decoder, previous).unwrap();
    assert_eq!(
        merged.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
        vec![("a", 5), ("b", 2)]
    );

    let nested = IndexMap::<String, Vec<i32>>::serializer();
    let mut previous = IndexMap::new();
    previous.insert("a".to_owned(), vec![1]);
    let mut decoder = StreamingJsonDecoder::new(&json, r#"{"b":[3],"a":[2]}"#);
    let merged = nested.merge(&mut decoder, previous).unwrap();
    assert_eq!(
        merged.into_iter().collect::<Vec<_>>(),
        vec![("a".to_owned(), vec![1, 2]), ("b".to_owned(), vec![3])]
    );
}
