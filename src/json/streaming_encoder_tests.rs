// ABOUTME: Unit tests for the streaming JSON encoder.
// ABOUTME: Covers defaults, null handling, discriminators, map layouts and pretty printing.

use crate::collections::{ListSerializer, MapSerializer};
use crate::descriptor::{DescriptorBuilder, SerialKind};
use crate::json::config::{ClassDiscriminatorMode, JsonConfig, NamingStrategy};
use crate::json::fixtures::{
    response_serializer, Color, Project, ProjectSerializer, Response, Settings, SettingsSerializer,
};
use crate::json::Json;
use crate::polymorphic::{PolymorphicSerializer, Subclass};
use crate::strategy::{ObjectSerializer, Serializable, SerialStrategy};
use indexmap::IndexMap;
use std::sync::Arc;

fn json_with(config: JsonConfig) -> Json {
    Json::new(config).unwrap()
}

fn settings() -> Settings {
    Settings {
        color: None,
        mode: Color::Green,
        count: 0,
        label: None,
    }
}

#[test]
fn test_defaults_are_omitted() {
    let json = Json::default();
    let project = Project::new("kotlinx.serialization", "Kotlin");
    let text = json.encode_to_string(&ProjectSerializer::new(), &project).unwrap();
    assert_eq!(text, r#"{"name":"kotlinx.serialization"}"#);

    let text = json
        .encode_to_string(&ProjectSerializer::new(), &Project::new("serialform", "Rust"))
        .unwrap();
    assert_eq!(text, r#"{"name":"serialform","language":"Rust"}"#);
}

#[test]
fn test_encode_defaults() {
    let json = json_with(JsonConfig {
        encode_defaults: true,
        ..JsonConfig::default()
    });
    let project = Project::new("kotlinx.serialization", "Kotlin");
    let text = json.encode_to_string(&ProjectSerializer::new(), &project).unwrap();
    assert_eq!(text, r#"{"name":"kotlinx.serialization","language":"Kotlin"}"#);
}

#[test]
fn test_explicit_nulls() {
    let json = Json::default();
    let text = json.encode_to_string(&SettingsSerializer::new(), &settings()).unwrap();
    assert_eq!(text, r#"{"color":null,"mode":"GREEN"}"#);

    let json = json_with(JsonConfig {
        explicit_nulls: false,
        encode_defaults: true,
        ..JsonConfig::default()
    });
    let text = json.encode_to_string(&SettingsSerializer::new(), &settings()).unwrap();
    assert_eq!(text, r#"{"mode":"GREEN","count":0}"#);
}

#[test]
fn test_pretty_print() {
    let json = json_with(JsonConfig {
        pretty_print: true,
        ..JsonConfig::default()
    });
    let project = Project::new("serialform", "Rust");
    let text = json.encode_to_string(&ProjectSerializer::new(), &project).unwrap();
    assert_eq!(text, "{\n    \"name\": \"serialform\",\n    \"language\": \"Rust\"\n}");

    let empty = json.encode_to_string(&*Vec::<i32>::serializer(), &Vec::new()).unwrap();
    assert_eq!(empty, "[]");
}

#[test]
fn test_pretty_print_custom_indent() {
    let json = json_with(JsonConfig {
        pretty_print: true,
        pretty_print_indent: "\t".to_owned(),
        ..JsonConfig::default()
    });
    let text = json.encode_to_string(&*Vec::<i32>::serializer(), &vec![1, 2]).unwrap();
    assert_eq!(text, "[\n\t1,\n\t2\n]");
}

#[test]
fn test_sealed_discriminator_leads_object() {
    let json = Json::default();
    let text = json.encode_to_string(&response_serializer(), &Response::Ok(42)).unwrap();
    assert_eq!(text, r#"{"type":"Ok","data":42}"#);
    let text = json
        .encode_to_string(&response_serializer(), &Response::Err("boom".into()))
        .unwrap();
    assert_eq!(text, r#"{"type":"Err","message":"boom"}"#);
}

#[test]
fn test_custom_discriminator_key() {
    let json = json_with(JsonConfig {
        class_discriminator: "kind".to_owned(),
        ..JsonConfig::default()
    });
    let text = json.encode_to_string(&response_serializer(), &Response::Ok(1)).unwrap();
    assert_eq!(text, r#"{"kind":"Ok","data":1}"#);
}

#[test]
fn test_array_polymorphism() {
    let json = json_with(JsonConfig {
        use_array_polymorphism: true,
        ..JsonConfig::default()
    });
    let text = json.encode_to_string(&response_serializer(), &Response::Ok(7)).unwrap();
    assert_eq!(text, r#"["Ok",{"data":7}]"#);
}

#[test]
fn test_discriminator_mode_none() {
    let json = json_with(JsonConfig {
        class_discriminator_mode: ClassDiscriminatorMode::None,
        ..JsonConfig::default()
    });
    let text = json.encode_to_string(&response_serializer(), &Response::Ok(7)).unwrap();
    assert_eq!(text, r#"{"data":7}"#);
}

#[test]
fn test_all_json_objects_mode() {
    let json = json_with(JsonConfig {
        class_discriminator_mode: ClassDiscriminatorMode::AllJsonObjects,
        ..JsonConfig::default()
    });
    let project = Project::new("serialform", "Rust");
    let text = json.encode_to_string(&ProjectSerializer::new(), &project).unwrap();
    assert_eq!(text, r#"{"type":"Project","name":"serialform","language":"Rust"}"#);
    let text = json.encode_to_string(&response_serializer(), &Response::Ok(3)).unwrap();
    assert_eq!(text, r#"{"type":"Ok","data":3}"#);
}

#[test]
fn test_sealed_subclass_conflicting_with_discriminator() {
    struct Tagged;
    let descriptor = DescriptorBuilder::new("Tagged", SerialKind::CLASS)
        .element("type", crate::strategy::string_descriptor().clone())
        .build()
        .unwrap();
    struct TaggedSerializer(crate::descriptor::SerialDescriptor);
    impl SerialStrategy<Tagged> for TaggedSerializer {
        fn descriptor(&self) -> &crate::descriptor::SerialDescriptor {
            &self.0
        }
        fn serialize(&self, encoder: &mut dyn crate::encoding::Encoder, _value: &Tagged) -> crate::Result<()> {
            let composite = encoder.begin_structure(&self.0)?;
            composite.encode_string_element(&self.0, 0, "x")?;
            composite.end_structure(&self.0)
        }
        fn deserialize(&self, _decoder: &mut dyn crate::encoding::Decoder) -> crate::Result<Tagged> {
            Ok(Tagged)
        }
    }
    let strategy: Arc<dyn SerialStrategy<Tagged>> = Arc::new(TaggedSerializer(descriptor));
    let sealed = PolymorphicSerializer::sealed("Base", vec![Subclass::new(strategy, |t| t, |t| Some(t))]).unwrap();
    let err = Json::default().encode_to_string(&sealed, &Tagged).unwrap_err();
    assert_eq!(err.error_type(), "json_encoding");
    assert!(err.to_string().contains("conflicts with JSON class discriminator 'type'"));
}

#[test]
fn test_object_singleton() {
    let json = Json::default();
    let strategy = ObjectSerializer::new("Unit", ()).unwrap();
    assert_eq!(json.encode_to_string(&strategy, &()).unwrap(), "{}");
}

#[test]
fn test_maps() {
    let json = Json::default();
    let map: IndexMap<i32, i32> = [(1, 1)].into_iter().collect();
    let strategy = MapSerializer::new(i32::serializer(), i32::serializer());
    assert_eq!(json.encode_to_string(&strategy, &map).unwrap(), r#"{"1":1}"#);

    let arrays = json_with(JsonConfig {
        encode_maps_as_arrays: true,
        ..JsonConfig::default()
    });
    assert_eq!(arrays.encode_to_string(&strategy, &map).unwrap(), "[1,1]");
}

#[test]
fn test_structured_map_keys() {
    let key = Arc::new(ProjectSerializer::new());
    let strategy = MapSerializer::new(key, i32::serializer());
    let map: IndexMap<Project, i32> = IndexMap::new();
    let err = Json::default().encode_to_string(&strategy, &map).unwrap_err();
    assert!(err.to_string().contains("can't be used in JSON as a key in the map"));

    let json = json_with(JsonConfig {
        allow_structured_map_keys: true,
        ..JsonConfig::default()
    });
    let mut map = IndexMap::new();
    map.insert(Project::new("a", "Rust"), 1);
    let text = json.encode_to_string(&strategy, &map).unwrap();
    assert_eq!(text, r#"[{"name":"a","language":"Rust"},1]"#);
}

#[test]
fn test_special_floats() {
    let err = Json::default().encode_to_string(&*f64::serializer(), &f64::NAN).unwrap_err();
    assert!(err.to_string().contains("allow_special_floating_point_values"));
    let json = json_with(JsonConfig {
        allow_special_floating_point_values: true,
        ..JsonConfig::default()
    });
    let values = vec![f64::NEG_INFINITY, 1.5];
    let text = json.encode_to_string(&*Vec::<f64>::serializer(), &values).unwrap();
    assert_eq!(text, "[-Infinity,1.5]");
}

#[test]
fn test_unsigned_numbers() {
    let json = Json::default();
    assert_eq!(json.to_string(&u64::MAX).unwrap(), "18446744073709551615");
    assert_eq!(json.to_string(&u8::MAX).unwrap(), "255");
    let map: IndexMap<u32, u32> = [(u32::MAX, 1)].into_iter().collect();
    assert_eq!(json.to_string(&map).unwrap(), r#"{"4294967295":1}"#);
}

#[test]
fn test_strings_are_escaped() {
    let json = Json::default();
    let text = json.to_string(&"a\"b\\c\n\u{1}".to_owned()).unwrap();
    assert_eq!(text, r#""a\"b\\c\n\u0001""#);
    assert_eq!(json.to_string(&'x').unwrap(), r#""x""#);
}

#[test]
fn test_naming_strategy_renames_keys() {
    let descriptor = DescriptorBuilder::new("Account", SerialKind::CLASS)
        .element("userName", crate::strategy::string_descriptor().clone())
        .build()
        .unwrap();
    let strategy = crate::json::fixtures::FieldClass::new("Account", "userName", String::serializer());
    assert_eq!(strategy.descriptor(), &descriptor);
    let json = json_with(JsonConfig {
        naming_strategy: Some(NamingStrategy::SnakeCase),
        ..JsonConfig::default()
    });
    let text = json.encode_to_string(&strategy, &"ann".to_owned()).unwrap();
    assert_eq!(text, r#"{"user_name":"ann"}"#);
}

#[test]
fn test_nested_lists() {
    let inner = ListSerializer::new(i32::serializer());
    let outer = ListSerializer::new(Arc::new(inner));
    let text = Json::default()
        .encode_to_string(&outer, &vec![vec![1], vec![], vec![2, 3]])
        .unwrap();
    assert_eq!(text, "[[1],[],[2,3]]");
}
