// ABOUTME: Serial descriptors: immutable, shareable metadata describing a type's shape.
// ABOUTME: Covers kinds, element tables, nullable wrapping, annotations and the builder.

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Kinds of primitive values a format can write directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
}

/// Kinds of structured values with a fixed bracket layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Class,
    List,
    Map,
    Object,
}

/// Kinds of polymorphic hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolymorphicKind {
    Open,
    Sealed,
}

/// The shape category of a serializable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerialKind {
    Enum,
    Contextual,
    Primitive(PrimitiveKind),
    Structure(StructureKind),
    Polymorphic(PolymorphicKind),
}

impl SerialKind {
    pub const CLASS: SerialKind = SerialKind::Structure(StructureKind::Class);
    pub const LIST: SerialKind = SerialKind::Structure(StructureKind::List);
    pub const MAP: SerialKind = SerialKind::Structure(StructureKind::Map);
    pub const OBJECT: SerialKind = SerialKind::Structure(StructureKind::Object);

    /// Returns true for primitive kinds.
    #[must_use]
    pub fn is_primitive(self) -> bool {
        matches!(self, SerialKind::Primitive(_))
    }

    /// Returns true for open and sealed polymorphic kinds.
    #[must_use]
    pub fn is_polymorphic(self) -> bool {
        matches!(self, SerialKind::Polymorphic(_))
    }
}

impl fmt::Display for SerialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SerialKind::Enum => "ENUM",
            SerialKind::Contextual => "CONTEXTUAL",
            SerialKind::Primitive(kind) => match kind {
                PrimitiveKind::Boolean => "BOOLEAN",
                PrimitiveKind::Byte => "BYTE",
                PrimitiveKind::Short => "SHORT",
                PrimitiveKind::Int => "INT",
                PrimitiveKind::Long => "LONG",
                PrimitiveKind::Float => "FLOAT",
                PrimitiveKind::Double => "DOUBLE",
                PrimitiveKind::Char => "CHAR",
                PrimitiveKind::String => "STRING",
            },
            SerialKind::Structure(kind) => match kind {
                StructureKind::Class => "CLASS",
                StructureKind::List => "LIST",
                StructureKind::Map => "MAP",
                StructureKind::Object => "OBJECT",
            },
            SerialKind::Polymorphic(PolymorphicKind::Open) => "OPEN",
            SerialKind::Polymorphic(PolymorphicKind::Sealed) => "SEALED",
        };
        f.write_str(name)
    }
}

/// How an element's default value is treated on encode, overriding `encode_defaults`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodeDefaultMode {
    Always,
    Never,
}

/// Metadata attached to a descriptor or to one of its elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Alternative input names accepted for an element or enum entry.
    JsonNames(Vec<String>),
    /// Discriminator key used when this (base) type is written polymorphically.
    ClassDiscriminator(String),
    /// Unknown keys are skipped for this class regardless of configuration.
    JsonIgnoreUnknownKeys,
    /// Overrides the format's default-encoding policy for one element.
    EncodeDefault(EncodeDefaultMode),
    /// Free-form annotation for format backends outside this crate.
    Custom { name: String, value: String },
}

#[derive(Clone)]
enum ElementSlot {
    Eager(SerialDescriptor),
    // Bound on first use so recursive types can refer to themselves.
    Deferred(Arc<dyn Fn() -> SerialDescriptor + Send + Sync>),
}

impl ElementSlot {
    fn resolve(&self) -> SerialDescriptor {
        match self {
            ElementSlot::Eager(descriptor) => descriptor.clone(),
            ElementSlot::Deferred(factory) => factory(),
        }
    }
}

#[derive(Clone)]
struct Element {
    name: String,
    slot: ElementSlot,
    annotations: Vec<Annotation>,
    optional: bool,
}

struct ElementTable {
    serial_name: String,
    kind: SerialKind,
    elements: Vec<Element>,
    indices: HashMap<String, usize>,
    annotations: Vec<Annotation>,
    inline: bool,
}

enum Repr {
    Primitive {
        serial_name: String,
        kind: PrimitiveKind,
    },
    Table(ElementTable),
    ListLike {
        serial_name: String,
        element: SerialDescriptor,
    },
    MapLike {
        serial_name: String,
        key: SerialDescriptor,
        value: SerialDescriptor,
    },
    Nullable {
        serial_name: String,
        original: SerialDescriptor,
    },
}

struct Inner {
    repr: Repr,
    hash: OnceLock<u64>,
    names: OnceLock<HashSet<String>>,
}

/// Static metadata describing the serializable shape of one type.
///
/// Descriptors are cheap to clone (reference counted), immutable after
/// construction and safe to share between threads. Derived data such as the
/// hash and the name set is computed once on first use.
#[derive(Clone)]
pub struct SerialDescriptor(Arc<Inner>);

impl SerialDescriptor {
    fn from_repr(repr: Repr) -> Self {
        Self(Arc::new(Inner {
            repr,
            hash: OnceLock::new(),
            names: OnceLock::new(),
        }))
    }

    /// Descriptor for a primitive type. Primitive descriptors have no elements.
    #[must_use]
    pub fn primitive(serial_name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::from_repr(Repr::Primitive {
            serial_name: serial_name.into(),
            kind,
        })
    }

    /// Descriptor for a list-like collection whose elements share one descriptor.
    #[must_use]
    pub fn list(serial_name: impl Into<String>, element: SerialDescriptor) -> Self {
        Self::from_repr(Repr::ListLike {
            serial_name: serial_name.into(),
            element,
        })
    }

    /// Descriptor for a map: keys at even indices, values at odd indices.
    #[must_use]
    pub fn map(serial_name: impl Into<String>, key: SerialDescriptor, value: SerialDescriptor) -> Self {
        Self::from_repr(Repr::MapLike {
            serial_name: serial_name.into(),
            key,
            value,
        })
    }

    /// Returns a descriptor that is nullable and otherwise forwards to `self`.
    #[must_use]
    pub fn nullable(&self) -> SerialDescriptor {
        if self.is_nullable() {
            return self.clone();
        }
        Self::from_repr(Repr::Nullable {
            serial_name: format!("{}?", self.serial_name()),
            original: self.clone(),
        })
    }

    /// The descriptor a nullable wrapper forwards to, or `self`.
    #[must_use]
    pub fn non_nullable(&self) -> SerialDescriptor {
        match &self.0.repr {
            Repr::Nullable { original, .. } => original.clone(),
            _ => self.clone(),
        }
    }

    /// Identity of the type; nullable wrappers append `?`.
    #[must_use]
    pub fn serial_name(&self) -> &str {
        match &self.0.repr {
            Repr::Primitive { serial_name, .. }
            | Repr::ListLike { serial_name, .. }
            | Repr::MapLike { serial_name, .. }
            | Repr::Nullable { serial_name, .. } => serial_name,
            Repr::Table(table) => &table.serial_name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SerialKind {
        match &self.0.repr {
            Repr::Primitive { kind, .. } => SerialKind::Primitive(*kind),
            Repr::Table(table) => table.kind,
            Repr::ListLike { .. } => SerialKind::LIST,
            Repr::MapLike { .. } => SerialKind::MAP,
            Repr::Nullable { original, .. } => original.kind(),
        }
    }

    #[must_use]
    pub fn elements_count(&self) -> usize {
        match &self.0.repr {
            Repr::Primitive { .. } => 0,
            Repr::Table(table) => table.elements.len(),
            Repr::ListLike { .. } => 1,
            Repr::MapLike { .. } => 2,
            Repr::Nullable { original, .. } => original.elements_count(),
        }
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self.0.repr, Repr::Nullable { .. })
    }

    /// True for value-class style wrappers around a single element.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        match &self.0.repr {
            Repr::Table(table) => table.inline,
            Repr::Nullable { original, .. } => original.is_inline(),
            _ => false,
        }
    }

    /// Annotations attached to the type itself.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        match &self.0.repr {
            Repr::Table(table) => &table.annotations,
            Repr::Nullable { original, .. } => original.annotations(),
            _ => &[],
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        match &self.0.repr {
            Repr::Primitive { serial_name, .. } => Err(Error::serialization(format!(
                "Primitive descriptor '{serial_name}' does not have elements"
            ))),
            Repr::Table(table) if index >= table.elements.len() => {
                Err(Error::serialization(format!(
                    "Index {index} out of bounds [0, {}) for descriptor '{}'",
                    table.elements.len(),
                    table.serial_name
                )))
            }
            Repr::Nullable { original, .. } => original.check_index(index),
            _ => Ok(()),
        }
    }

    /// Name of the element at `index`, failing instead of panicking.
    pub fn try_element_name(&self, index: usize) -> Result<Cow<'_, str>> {
        self.check_index(index)?;
        Ok(match &self.0.repr {
            Repr::Table(table) => Cow::Borrowed(table.elements[index].name.as_str()),
            Repr::Nullable { original, .. } => {
                Cow::Owned(original.try_element_name(index)?.into_owned())
            }
            _ => Cow::Owned(index.to_string()),
        })
    }

    /// Descriptor of the element at `index`, failing instead of panicking.
    pub fn try_element_descriptor(&self, index: usize) -> Result<SerialDescriptor> {
        self.check_index(index)?;
        Ok(match &self.0.repr {
            Repr::Table(table) => table.elements[index].slot.resolve(),
            Repr::ListLike { element, .. } => element.clone(),
            Repr::MapLike { key, value, .. } => {
                if index % 2 == 0 {
                    key.clone()
                } else {
                    value.clone()
                }
            }
            Repr::Nullable { original, .. } => original.try_element_descriptor(index)?,
            Repr::Primitive { .. } => unreachable!("rejected by check_index"),
        })
    }

    /// Name of the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, or always for primitive descriptors.
    #[must_use]
    pub fn element_name(&self, index: usize) -> Cow<'_, str> {
        self.try_element_name(index).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Descriptor of the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, or always for primitive descriptors.
    #[must_use]
    pub fn element_descriptor(&self, index: usize) -> SerialDescriptor {
        self.try_element_descriptor(index)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Whether the element at `index` may be absent from input.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, or always for primitive descriptors.
    #[must_use]
    pub fn is_element_optional(&self, index: usize) -> bool {
        if let Err(e) = self.check_index(index) {
            panic!("{e}");
        }
        match &self.0.repr {
            Repr::Table(table) => table.elements[index].optional,
            Repr::Nullable { original, .. } => original.is_element_optional(index),
            _ => false,
        }
    }

    /// Annotations of the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, or always for primitive descriptors.
    #[must_use]
    pub fn element_annotations(&self, index: usize) -> &[Annotation] {
        if let Err(e) = self.check_index(index) {
            panic!("{e}");
        }
        match &self.0.repr {
            Repr::Table(table) => &table.elements[index].annotations,
            Repr::Nullable { original, .. } => original.element_annotations(index),
            _ => &[],
        }
    }

    /// Index of the element called `name`; `None` is the unknown-name signal.
    #[must_use]
    pub fn element_index(&self, name: &str) -> Option<usize> {
        match &self.0.repr {
            Repr::Primitive { .. } => None,
            Repr::Table(table) => table.indices.get(name).copied(),
            Repr::ListLike { .. } => name.parse().ok(),
            Repr::MapLike { .. } => name.parse().ok(),
            Repr::Nullable { original, .. } => original.element_index(name),
        }
    }

    /// Iterates element names in declaration order.
    pub fn element_names(&self) -> impl Iterator<Item = Cow<'_, str>> + '_ {
        (0..self.elements_count()).map(move |index| self.element_name(index))
    }

    /// The set of element names, computed once and shared.
    #[must_use]
    pub fn cached_serial_names(&self) -> &HashSet<String> {
        self.0.names.get_or_init(|| {
            self.element_names()
                .map(Cow::into_owned)
                .collect()
        })
    }

    /// True when this descriptor or its nullable original carries `annotation`.
    #[must_use]
    pub fn has_annotation(&self, annotation: &Annotation) -> bool {
        self.annotations().contains(annotation)
    }

    fn structural_hash(&self) -> u64 {
        *self.0.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.serial_name().hash(&mut hasher);
            self.kind().hash(&mut hasher);
            self.is_nullable().hash(&mut hasher);
            let count = self.elements_count();
            count.hash(&mut hasher);
            if !matches!(self.0.repr, Repr::Primitive { .. }) {
                for index in 0..count {
                    let child = self.element_descriptor(index);
                    child.serial_name().hash(&mut hasher);
                    child.kind().hash(&mut hasher);
                }
            }
            hasher.finish()
        })
    }
}

impl PartialEq for SerialDescriptor {
    /// Same name, kind and element count, and every child agrees on name and
    /// kind. Children are compared one level deep so recursive types terminate.
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.serial_name() != other.serial_name()
            || self.kind() != other.kind()
            || self.is_nullable() != other.is_nullable()
            || self.elements_count() != other.elements_count()
        {
            return false;
        }
        if matches!(self.0.repr, Repr::Primitive { .. }) {
            return true;
        }
        (0..self.elements_count()).all(|index| {
            let mine = self.element_descriptor(index);
            let theirs = other.element_descriptor(index);
            mine.serial_name() == theirs.serial_name() && mine.kind() == theirs.kind()
        })
    }
}

impl Eq for SerialDescriptor {}

impl Hash for SerialDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Debug for SerialDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serial_name())?;
        if matches!(self.0.repr, Repr::Primitive { .. }) {
            return Ok(());
        }
        f.write_str("(")?;
        for index in 0..self.elements_count() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let child = self.element_descriptor(index);
            write!(f, "{}: {}", self.element_name(index), child.serial_name())?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for SerialDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Builds descriptors with a named element table.
///
/// Used for classes, objects, enums, polymorphic and contextual descriptors.
/// Element annotations pushed with [`push_annotation`](Self::push_annotation)
/// attach to the most recently added element.
///
/// ```rust
/// use serialform::descriptor::{DescriptorBuilder, PrimitiveKind, SerialDescriptor, SerialKind};
///
/// let string = SerialDescriptor::primitive("String", PrimitiveKind::String);
/// let project = DescriptorBuilder::new("Project", SerialKind::CLASS)
///     .element("name", string.clone())
///     .optional_element("language", string)
///     .build()
///     .unwrap();
///
/// assert_eq!(project.elements_count(), 2);
/// assert_eq!(project.element_index("language"), Some(1));
/// assert!(project.is_element_optional(1));
/// ```
pub struct DescriptorBuilder {
    serial_name: String,
    kind: SerialKind,
    elements: Vec<Element>,
    indices: HashMap<String, usize>,
    annotations: Vec<Annotation>,
    inline: bool,
    expected_count: Option<usize>,
    error: Option<Error>,
}

impl DescriptorBuilder {
    #[must_use]
    pub fn new(serial_name: impl Into<String>, kind: SerialKind) -> Self {
        Self {
            serial_name: serial_name.into(),
            kind,
            elements: Vec::new(),
            indices: HashMap::new(),
            annotations: Vec::new(),
            inline: false,
            expected_count: None,
            error: None,
        }
    }

    /// A builder that must receive exactly `elements_count` elements.
    #[must_use]
    pub fn with_elements_count(
        serial_name: impl Into<String>,
        kind: SerialKind,
        elements_count: usize,
    ) -> Self {
        let mut builder = Self::new(serial_name, kind);
        builder.elements.reserve(elements_count);
        builder.expected_count = Some(elements_count);
        builder
    }

    fn push(&mut self, name: String, slot: ElementSlot, optional: bool) {
        if self.error.is_some() {
            return;
        }
        if self.indices.contains_key(&name) {
            self.error = Some(Error::configuration(format!(
                "Element with name '{name}' is already registered in {}",
                self.serial_name
            )));
            return;
        }
        self.indices.insert(name.clone(), self.elements.len());
        self.elements.push(Element {
            name,
            slot,
            annotations: Vec::new(),
            optional,
        });
    }

    /// Adds an element; duplicate names are reported by [`build`](Self::build).
    pub fn add_element(&mut self, name: impl Into<String>, descriptor: SerialDescriptor, is_optional: bool) {
        self.push(name.into(), ElementSlot::Eager(descriptor), is_optional);
    }

    /// Adds an element whose descriptor is produced on demand.
    pub fn add_deferred_element<F>(&mut self, name: impl Into<String>, factory: F, is_optional: bool)
    where
        F: Fn() -> SerialDescriptor + Send + Sync + 'static,
    {
        self.push(name.into(), ElementSlot::Deferred(Arc::new(factory)), is_optional);
    }

    /// Attaches an annotation to the most recently added element.
    pub fn push_annotation(&mut self, annotation: Annotation) {
        match self.elements.last_mut() {
            Some(element) => element.annotations.push(annotation),
            None => {
                if self.error.is_none() {
                    self.error = Some(Error::configuration(format!(
                        "No element to annotate in {}",
                        self.serial_name
                    )));
                }
            }
        }
    }

    pub fn push_class_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    #[must_use]
    pub fn element(mut self, name: impl Into<String>, descriptor: SerialDescriptor) -> Self {
        self.add_element(name, descriptor, false);
        self
    }

    #[must_use]
    pub fn optional_element(mut self, name: impl Into<String>, descriptor: SerialDescriptor) -> Self {
        self.add_element(name, descriptor, true);
        self
    }

    #[must_use]
    pub fn deferred_element<F>(mut self, name: impl Into<String>, factory: F, is_optional: bool) -> Self
    where
        F: Fn() -> SerialDescriptor + Send + Sync + 'static,
    {
        self.add_deferred_element(name, factory, is_optional);
        self
    }

    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.push_annotation(annotation);
        self
    }

    #[must_use]
    pub fn class_annotation(mut self, annotation: Annotation) -> Self {
        self.push_class_annotation(annotation);
        self
    }

    /// Marks the descriptor as an inline (single-value wrapper) descriptor.
    #[must_use]
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn build(self) -> Result<SerialDescriptor> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.serial_name.trim().is_empty() {
            return Err(Error::configuration("Blank serial names are prohibited"));
        }
        if let SerialKind::Primitive(_) = self.kind {
            return Err(Error::configuration(format!(
                "Descriptor '{}' has a primitive kind; use SerialDescriptor::primitive",
                self.serial_name
            )));
        }
        if let Some(expected) = self.expected_count {
            if expected != self.elements.len() {
                return Err(Error::configuration(format!(
                    "Descriptor '{}' declares {expected} elements but {} were added",
                    self.serial_name,
                    self.elements.len()
                )));
            }
        }
        if self.inline && self.elements.len() != 1 {
            return Err(Error::configuration(format!(
                "Inline descriptor '{}' must have exactly one element",
                self.serial_name
            )));
        }
        Ok(SerialDescriptor::from_repr(Repr::Table(ElementTable {
            serial_name: self.serial_name,
            kind: self.kind,
            elements: self.elements,
            indices: self.indices,
            annotations: self.annotations,
            inline: self.inline,
        })))
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
