use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::xml::Element;
use crate::{CatalogError, CatalogResult};

const GEOMETRY_PACKAGE: &str = "com.vividsolutions.jts.geom.";

/// Scalar attribute types understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Boolean,
    Byte,
    Timestamp,
    Double,
    Float,
    Integer,
    Long,
    Short,
    String,
}

impl AttributeType {
    /// Java class name sent as the attribute's `binding`.
    #[must_use]
    pub fn binding(self) -> &'static str {
        match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Timestamp => "java.util.Date",
            Self::Double => "java.lang.Double",
            Self::Float => "java.lang.Float",
            Self::Integer => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Short => "java.lang.Short",
            Self::String => "java.lang.String",
        }
    }
}

impl FromStr for AttributeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" => Ok(Self::Boolean),
            "byte" => Ok(Self::Byte),
            "timestamp" => Ok(Self::Timestamp),
            "double" => Ok(Self::Double),
            "float" => Ok(Self::Float),
            "integer" => Ok(Self::Integer),
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            "string" => Ok(Self::String),
            _ => Err(format!("Unknown attribute type '{s}'")),
        }
    }
}

/// Geometry types, bound to JTS classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    #[must_use]
    pub fn binding(self) -> String {
        format!("{GEOMETRY_PACKAGE}{self}")
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Geometry => "Geometry",
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        })
    }
}

/// One column of a feature type created from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    /// Fully qualified Java class, e.g. `java.lang.String`.
    pub binding: String,
    pub nillable: bool,
}

impl AttributeSpec {
    #[must_use]
    pub fn new(name: &str, typ: AttributeType) -> Self {
        Self::custom(name, typ.binding())
    }

    #[must_use]
    pub fn geometry(name: &str, typ: GeometryType) -> Self {
        Self::custom(name, &typ.binding())
    }

    /// Attribute with an arbitrary binding class.
    #[must_use]
    pub fn custom(name: &str, binding: &str) -> Self {
        Self {
            name: name.to_string(),
            binding: binding.to_string(),
            nillable: false,
        }
    }

    /// Allow null values in this column.
    #[must_use]
    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    #[must_use]
    pub fn is_geometry(&self) -> bool {
        self.binding.starts_with(GEOMETRY_PACKAGE)
    }
}

/// Validate a feature type's attribute list and build its `<attributes>` block.
///
/// The list must be non-empty, every attribute needs a name and a binding, and at
/// least one binding must be a geometry.
pub fn attributes_element(attributes: &[AttributeSpec]) -> CatalogResult<Element> {
    if attributes.is_empty() {
        return Err(CatalogError::InvalidAttributes(
            "at least one attribute is required".to_string(),
        ));
    }
    if let Some(bad) = attributes
        .iter()
        .find(|a| a.name.trim().is_empty() || a.binding.trim().is_empty())
    {
        return Err(CatalogError::InvalidAttributes(format!(
            "attribute '{}' needs both a name and a binding",
            bad.name
        )));
    }
    if !attributes.iter().any(AttributeSpec::is_geometry) {
        return Err(CatalogError::InvalidAttributes(
            "no geometry attribute given".to_string(),
        ));
    }

    let mut node = Element::new("attributes");
    for attr in attributes {
        let mut item = Element::new("attribute");
        item.push_text("name", attr.name.as_str());
        item.push_text("binding", attr.binding.as_str());
        item.push_text("nillable", attr.nillable.to_string());
        node.push(item);
    }
    Ok(node)
}
