// ABOUTME: Strategies shared by the integration tests, written against the public API only.
// ABOUTME: A class with defaults, an aliased enum, a user with alternative names and a Shape hierarchy.

#![allow(dead_code)]

use serialform::descriptor::{Annotation, DescriptorBuilder, SerialDescriptor, SerialKind};
use serialform::encoding::{Decoder, Encoder};
use serialform::enums::{add_enum_entry, enum_descriptor_builder, EnumSerializer};
use serialform::polymorphic::{PolymorphicSerializer, Subclass};
use serialform::strategy::{missing_fields_error, string_descriptor, Serializable, SerialStrategy};
use serialform::{Error, Result, SerializersModule};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub language: String,
}

impl Project {
    pub fn new(name: &str, language: &str) -> Self {
        Self {
            name: name.to_owned(),
            language: language.to_owned(),
        }
    }
}

/// `Project(name, language = "Kotlin")`
pub struct ProjectSerializer(SerialDescriptor);

impl ProjectSerializer {
    pub fn new() -> Self {
        let descriptor = DescriptorBuilder::new("Project", SerialKind::CLASS)
            .element("name", string_descriptor().clone())
            .optional_element("language", string_descriptor().clone())
            .build()
            .unwrap();
        Self(descriptor)
    }
}

impl SerialStrategy<Project> for ProjectSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.0
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Project) -> Result<()> {
        let d = &self.0;
        let composite = encoder.begin_structure(d)?;
        composite.encode_string_element(d, 0, &value.name)?;
        if composite.should_encode_element_default(d, 1) || value.language != "Kotlin" {
            composite.encode_string_element(d, 1, &value.language)?;
        }
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Project> {
        let d = &self.0;
        let composite = decoder.begin_structure(d)?;
        let mut name = None;
        let mut language = "Kotlin".to_owned();
        while let Some(index) = composite.decode_element_index(d)? {
            match index {
                0 => name = Some(composite.decode_string_element(d, 0)?),
                1 => language = composite.decode_string_element(d, 1)?,
                _ => return Err(Error::Serialization(format!("Unexpected index {index}"))),
            }
        }
        composite.end_structure(d)?;
        let name = name.ok_or_else(|| missing_fields_error(0, 0b1, d))?;
        Ok(Project { name, language })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Retired,
}

/// `ACTIVE` also accepts `enabled`; `RETIRED` accepts `gone`.
pub fn status_serializer() -> EnumSerializer<Status> {
    let mut builder = enum_descriptor_builder("Status");
    add_enum_entry(&mut builder, "Status", "ACTIVE").unwrap();
    builder.push_annotation(Annotation::JsonNames(vec!["enabled".to_owned()]));
    add_enum_entry(&mut builder, "Status", "RETIRED").unwrap();
    builder.push_annotation(Annotation::JsonNames(vec!["gone".to_owned()]));
    EnumSerializer::with_descriptor(builder.build().unwrap(), vec![Status::Active, Status::Retired]).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_name: String,
    pub status: Status,
    pub tags: Vec<String>,
}

/// `User(userName @JsonNames("login"), status = ACTIVE, tags = [])`
pub struct UserSerializer {
    descriptor: SerialDescriptor,
    status: EnumSerializer<Status>,
    tags: Arc<dyn SerialStrategy<Vec<String>>>,
}

impl UserSerializer {
    pub fn new() -> Self {
        let status = status_serializer();
        let tags = Vec::<String>::serializer();
        let descriptor = DescriptorBuilder::new("User", SerialKind::CLASS)
            .element("userName", string_descriptor().clone())
            .annotated(Annotation::JsonNames(vec!["login".to_owned()]))
            .optional_element("status", status.descriptor().clone())
            .optional_element("tags", tags.descriptor().clone())
            .build()
            .unwrap();
        Self {
            descriptor,
            status,
            tags,
        }
    }
}

impl SerialStrategy<User> for UserSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.descriptor
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &User) -> Result<()> {
        let d = &self.descriptor;
        let composite = encoder.begin_structure(d)?;
        composite.encode_string_element(d, 0, &value.user_name)?;
        if composite.should_encode_element_default(d, 1) || value.status != Status::Active {
            composite.encode_serializable_element(d, 1, &self.status, &value.status)?;
        }
        if composite.should_encode_element_default(d, 2) || !value.tags.is_empty() {
            composite.encode_serializable_element(d, 2, &*self.tags, &value.tags)?;
        }
        composite.end_structure(d)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<User> {
        let d = &self.descriptor;
        let composite = decoder.begin_structure(d)?;
        let mut user_name = None;
        let mut status = Status::Active;
        let mut tags = Vec::new();
        while let Some(index) = composite.decode_element_index(d)? {
            match index {
                0 => user_name = Some(composite.decode_string_element(d, 0)?),
                1 => status = composite.decode_serializable_element(d, 1, &self.status, None)?,
                2 => tags = composite.decode_serializable_element(d, 2, &*self.tags, Some(tags))?,
                _ => return Err(Error::Serialization(format!("Unexpected index {index}"))),
            }
        }
        composite.end_structure(d)?;
        let user_name = user_name.ok_or_else(|| missing_fields_error(0, 0b1, d))?;
        Ok(User {
            user_name,
            status,
            tags,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(f64),
    Rect { width: f64, height: f64 },
}

/// A class with one required `f64` element.
pub struct CircleSerializer(SerialDescriptor);

impl CircleSerializer {
    pub fn new() -> Self {
        let descriptor = DescriptorBuilder::new("Circle", SerialKind::CLASS)
            .element("radius", f64::serializer().descriptor().clone())
            .build()
            .unwrap();
        Self(descriptor)
    }
}

impl SerialStrategy<f64> for CircleSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.0
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &f64) -> Result<()> {
        let composite = encoder.begin_structure(&self.0)?;
        composite.encode_double_element(&self.0, 0, *value)?;
        composite.end_structure(&self.0)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<f64> {
        let composite = decoder.begin_structure(&self.0)?;
        let mut radius = None;
        while let Some(index) = composite.decode_element_index(&self.0)? {
            if index != 0 {
                return Err(Error::Serialization(format!("Unexpected index {index}")));
            }
            radius = Some(composite.decode_double_element(&self.0, 0)?);
        }
        composite.end_structure(&self.0)?;
        radius.ok_or_else(|| missing_fields_error(0, 0b1, &self.0))
    }
}

/// `Rect(width, height)`, both required.
pub struct RectSerializer(SerialDescriptor);

impl RectSerializer {
    pub fn new() -> Self {
        let double = f64::serializer().descriptor().clone();
        let descriptor = DescriptorBuilder::new("Rect", SerialKind::CLASS)
            .element("width", double.clone())
            .element("height", double)
            .build()
            .unwrap();
        Self(descriptor)
    }
}

impl SerialStrategy<(f64, f64)> for RectSerializer {
    fn descriptor(&self) -> &SerialDescriptor {
        &self.0
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &(f64, f64)) -> Result<()> {
        let composite = encoder.begin_structure(&self.0)?;
        composite.encode_double_element(&self.0, 0, value.0)?;
        composite.encode_double_element(&self.0, 1, value.1)?;
        composite.end_structure(&self.0)
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<(f64, f64)> {
        let composite = decoder.begin_structure(&self.0)?;
        let mut seen = 0u64;
        let (mut width, mut height) = (0.0, 0.0);
        while let Some(index) = composite.decode_element_index(&self.0)? {
            seen |= 1 << index;
            match index {
                0 => width = composite.decode_double_element(&self.0, 0)?,
                1 => height = composite.decode_double_element(&self.0, 1)?,
                _ => return Err(Error::Serialization(format!("Unexpected index {index}"))),
            }
        }
        composite.end_structure(&self.0)?;
        if seen & 0b11 != 0b11 {
            return Err(missing_fields_error(seen, 0b11, &self.0));
        }
        Ok((width, height))
    }
}

pub fn circle_subclass() -> Subclass<Shape> {
    let strategy: Arc<dyn SerialStrategy<f64>> = Arc::new(CircleSerializer::new());
    Subclass::new(strategy, Shape::Circle, |s| match s {
        Shape::Circle(radius) => Some(radius),
        Shape::Rect { .. } => None,
    })
}

pub fn rect_subclass() -> Subclass<Shape> {
    let strategy: Arc<dyn SerialStrategy<Shape>> = Arc::new(RectShape(RectSerializer::new()));
    Subclass::new(
        strategy,
        |s| s,
        |s| match s {
            Shape::Rect { .. } => Some(s),
            Shape::Circle(_) => None,
        },
    )
}

/// Adapts [`RectSerializer`] to the `Shape::Rect` variant.
pub struct RectShape(RectSerializer);

impl SerialStrategy<Shape> for RectShape {
    fn descriptor(&self) -> &SerialDescriptor {
        self.0.descriptor()
    }

    fn serialize(&self, encoder: &mut dyn Encoder, value: &Shape) -> Result<()> {
        match value {
            Shape::Rect { width, height } => self.0.serialize(encoder, &(*width, *height)),
            Shape::Circle(_) => Err(Error::Serialization("Not a rectangle".to_owned())),
        }
    }

    fn deserialize(&self, decoder: &mut dyn Decoder) -> Result<Shape> {
        let (width, height) = self.0.deserialize(decoder)?;
        Ok(Shape::Rect { width, height })
    }
}

pub fn sealed_shape() -> PolymorphicSerializer<Shape> {
    PolymorphicSerializer::sealed("Shape", vec![circle_subclass(), rect_subclass()]).unwrap()
}

pub fn open_shape() -> PolymorphicSerializer<Shape> {
    PolymorphicSerializer::open("Shape").unwrap()
}

/// Registers both shapes for the open `Shape` base.
pub fn shape_module() -> SerializersModule {
    SerializersModule::builder()
        .polymorphic("Shape", vec![circle_subclass(), rect_subclass()])
        .build()
        .unwrap()
}
