// ABOUTME: In-memory JSON tree: JsonElement with primitive, object and array nodes.
// ABOUTME: Builders, typed accessors, compact Display and serde interop live here.

use super::composer::{format_double, format_float, push_quoted};
use indexmap::IndexMap;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// A JSON value as a tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonElement {
    /// The `null` literal
    #[default]
    Null,
    /// A string, number or boolean
    Primitive(JsonPrimitive),
    /// An object with keys in input order
    Object(JsonObject),
    /// An array
    Array(JsonArray),
}

/// A string, number or boolean literal kept as its textual content.
///
/// `is_string` distinguishes `"1"` (a string) from `1` (a number literal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPrimitive {
    content: String,
    is_string: bool,
}

impl JsonPrimitive {
    /// A quoted string primitive.
    #[must_use]
    pub fn string(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_string: true,
        }
    }

    /// An unquoted literal written verbatim, such as a number beyond `f64` precision.
    #[must_use]
    pub fn literal(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_string: false,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        self.is_string
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.content.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.content.parse().ok()
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.content.parse().ok()
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.content.parse().ok()
    }
}

impl fmt::Display for JsonPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_string {
            let mut out = String::with_capacity(self.content.len() + 2);
            push_quoted(&mut out, &self.content);
            f.write_str(&out)
        } else {
            f.write_str(&self.content)
        }
    }
}

/// A JSON object. Duplicate keys collapse to the last value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonObject(IndexMap<String, JsonElement>);

impl JsonObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, JsonElement> {
        self.0
    }
}

impl Deref for JsonObject {
    type Target = IndexMap<String, JsonElement>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<IndexMap<String, JsonElement>> for JsonObject {
    fn from(map: IndexMap<String, JsonElement>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, JsonElement)> for JsonObject {
    fn from_iter<I: IntoIterator<Item = (String, JsonElement)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a JsonObject {
    type Item = (&'a String, &'a JsonElement);
    type IntoIter = indexmap::map::Iter<'a, String, JsonElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A JSON array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonArray(Vec<JsonElement>);

impl JsonArray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<JsonElement> {
        self.0
    }
}

impl Deref for JsonArray {
    type Target = [JsonElement];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<JsonElement>> for JsonArray {
    fn from(items: Vec<JsonElement>) -> Self {
        Self(items)
    }
}

impl FromIterator<JsonElement> for JsonArray {
    fn from_iter<I: IntoIterator<Item = JsonElement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a JsonArray {
    type Item = &'a JsonElement;
    type IntoIter = std::slice::Iter<'a, JsonElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl JsonElement {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, JsonElement::Null)
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&JsonPrimitive> {
        match self {
            JsonElement::Primitive(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonElement::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&JsonArray> {
        match self {
            JsonElement::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The content of a string primitive.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_primitive().filter(|p| p.is_string).map(JsonPrimitive::content)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_primitive().and_then(JsonPrimitive::as_bool)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_primitive().and_then(JsonPrimitive::as_i64)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_primitive().and_then(JsonPrimitive::as_f64)
    }

    /// Member `key` of an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonElement> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Item `index` of an array.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&JsonElement> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Short name of the node type, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonElement::Null => "JsonNull",
            JsonElement::Primitive(p) if p.is_string => "JsonLiteral(string)",
            JsonElement::Primitive(_) => "JsonLiteral",
            JsonElement::Object(_) => "JsonObject",
            JsonElement::Array(_) => "JsonArray",
        }
    }
}

// Compact JSON, identical to what the default Json instance writes.
impl fmt::Display for JsonElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonElement::Null => f.write_str("null"),
            JsonElement::Primitive(p) => fmt::Display::fmt(p, f),
            JsonElement::Object(o) => fmt::Display::fmt(o, f),
            JsonElement::Array(a) => fmt::Display::fmt(a, f),
        }
    }
}

impl fmt::Display for JsonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let mut quoted = String::with_capacity(key.len() + 2);
            push_quoted(&mut quoted, key);
            write!(f, "{quoted}:{value}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for JsonArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

// Convenient From implementations
impl From<bool> for JsonPrimitive {
    fn from(b: bool) -> Self {
        Self::literal(if b { "true" } else { "false" })
    }
}

macro_rules! number_primitive {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for JsonPrimitive {
                fn from(n: $ty) -> Self {
                    Self::literal(n.to_string())
                }
            }

            impl From<$ty> for JsonElement {
                fn from(n: $ty) -> Self {
                    JsonElement::Primitive(n.into())
                }
            }
        )*
    };
}

number_primitive!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<f64> for JsonPrimitive {
    fn from(n: f64) -> Self {
        Self::literal(format_double(n))
    }
}

impl From<f32> for JsonPrimitive {
    fn from(n: f32) -> Self {
        Self::literal(format_float(n))
    }
}

impl From<&str> for JsonPrimitive {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for JsonPrimitive {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<JsonPrimitive> for JsonElement {
    fn from(p: JsonPrimitive) -> Self {
        JsonElement::Primitive(p)
    }
}

impl From<JsonObject> for JsonElement {
    fn from(o: JsonObject) -> Self {
        JsonElement::Object(o)
    }
}

impl From<JsonArray> for JsonElement {
    fn from(a: JsonArray) -> Self {
        JsonElement::Array(a)
    }
}

impl From<bool> for JsonElement {
    fn from(b: bool) -> Self {
        JsonElement::Primitive(b.into())
    }
}

impl From<f64> for JsonElement {
    fn from(n: f64) -> Self {
        JsonElement::Primitive(n.into())
    }
}

impl From<f32> for JsonElement {
    fn from(n: f32) -> Self {
        JsonElement::Primitive(n.into())
    }
}

impl From<&str> for JsonElement {
    fn from(s: &str) -> Self {
        JsonElement::Primitive(s.into())
    }
}

impl From<String> for JsonElement {
    fn from(s: String) -> Self {
        JsonElement::Primitive(s.into())
    }
}

impl<T: Into<JsonElement>> From<Option<T>> for JsonElement {
    fn from(value: Option<T>) -> Self {
        value.map_or(JsonElement::Null, Into::into)
    }
}

impl<T: Into<JsonElement>> From<Vec<T>> for JsonElement {
    fn from(items: Vec<T>) -> Self {
        JsonElement::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Accumulates the members of a [`JsonObject`].
///
/// ```rust
/// use serialform::json::{build_json_object, JsonElement};
///
/// let object = build_json_object(|o| {
///     o.put("name", "serialform");
///     o.put_array("tags", |a| {
///         a.add("json");
///     });
/// });
/// assert_eq!(JsonElement::from(object).to_string(), r#"{"name":"serialform","tags":["json"]}"#);
/// ```
#[derive(Debug, Default)]
pub struct JsonObjectBuilder {
    entries: IndexMap<String, JsonElement>,
}

impl JsonObjectBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member, returning the value previously stored under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<JsonElement>) -> Option<JsonElement> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn put_object(&mut self, key: impl Into<String>, build: impl FnOnce(&mut JsonObjectBuilder)) -> Option<JsonElement> {
        self.put(key, build_json_object(build))
    }

    pub fn put_array(&mut self, key: impl Into<String>, build: impl FnOnce(&mut JsonArrayBuilder)) -> Option<JsonElement> {
        self.put(key, build_json_array(build))
    }

    #[must_use]
    pub fn build(self) -> JsonObject {
        JsonObject(self.entries)
    }
}

/// Accumulates the items of a [`JsonArray`].
#[derive(Debug, Default)]
pub struct JsonArrayBuilder {
    items: Vec<JsonElement>,
}

impl JsonArrayBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: impl Into<JsonElement>) {
        self.items.push(value.into());
    }

    pub fn add_object(&mut self, build: impl FnOnce(&mut JsonObjectBuilder)) {
        self.add(build_json_object(build));
    }

    pub fn add_array(&mut self, build: impl FnOnce(&mut JsonArrayBuilder)) {
        self.add(build_json_array(build));
    }

    #[must_use]
    pub fn build(self) -> JsonArray {
        JsonArray(self.items)
    }
}

pub fn build_json_object(build: impl FnOnce(&mut JsonObjectBuilder)) -> JsonObject {
    let mut builder = JsonObjectBuilder::new();
    build(&mut builder);
    builder.build()
}

pub fn build_json_array(build: impl FnOnce(&mut JsonArrayBuilder)) -> JsonArray {
    let mut builder = JsonArrayBuilder::new();
    build(&mut builder);
    builder.build()
}

// =============================================================================
// serde interop
// =============================================================================

impl Serialize for JsonPrimitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_string {
            return serializer.serialize_str(&self.content);
        }
        if let Some(b) = self.as_bool() {
            serializer.serialize_bool(b)
        } else if let Some(n) = self.as_i64() {
            serializer.serialize_i64(n)
        } else if let Some(n) = self.as_u64() {
            serializer.serialize_u64(n)
        } else if let Some(n) = self.as_f64().filter(|n| n.is_finite()) {
            serializer.serialize_f64(n)
        } else {
            serializer.serialize_str(&self.content)
        }
    }
}

impl Serialize for JsonElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            JsonElement::Null => serializer.serialize_unit(),
            JsonElement::Primitive(p) => p.serialize(serializer),
            JsonElement::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (key, value) in o {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            JsonElement::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for value in a {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

struct ElementVisitor;

impl<'de> Visitor<'de> for ElementVisitor {
    type Value = JsonElement;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> std::result::Result<JsonElement, E> {
        Ok(v.into())
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<JsonElement, E> {
        Ok(v.into())
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<JsonElement, E> {
        Ok(v.into())
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> std::result::Result<JsonElement, E> {
        Ok(v.into())
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<JsonElement, E> {
        Ok(v.into())
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> std::result::Result<JsonElement, E> {
        Ok(v.into())
    }

    fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<JsonElement, E> {
        Ok(JsonElement::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> std::result::Result<JsonElement, E> {
        Ok(JsonElement::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<JsonElement, D::Error> {
        JsonElement::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<JsonElement, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonElement::Array(JsonArray(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<JsonElement, A::Error> {
        let mut entries = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, JsonElement>()? {
            entries.insert(key, value);
        }
        Ok(JsonElement::Object(JsonObject(entries)))
    }
}

impl<'de> Deserialize<'de> for JsonElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ElementVisitor)
    }
}

#[cfg(test)]
#[path = "element_tests.rs"]
mod tests;
