//! Schema type definitions
//!
//! Supported attribute types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//! - geometry: planar geometry in the schema's coordinate reference

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::crs::Crs;

/// Supported attribute types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Geometry value
    Geometry,
}

impl AttributeType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Bool => "bool",
            AttributeType::Geometry => "geometry",
        }
    }

    /// Returns true for geometry-valued attributes
    pub fn is_geometry(&self) -> bool {
        matches!(self, AttributeType::Geometry)
    }
}

/// A single named, typed attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute name, unique within the schema
    pub name: String,
    /// Attribute type
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Attribute carries identifier information and is dropped when a
    /// query hides identifiers
    #[serde(default)]
    pub identifier: bool,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            identifier: false,
        }
    }

    /// Create a string attribute
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::String)
    }

    /// Create an int attribute
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Int)
    }

    /// Create a float attribute
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Float)
    }

    /// Create a bool attribute
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    /// Create a geometry attribute
    pub fn geometry(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Geometry)
    }

    /// Marks the attribute as identifier-bearing
    pub fn as_identifier(mut self) -> Self {
        self.identifier = true;
        self
    }
}

/// Complete schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, unique per store
    pub name: String,
    /// Ordered attribute descriptors
    pub attributes: Vec<AttributeDescriptor>,
    /// Name of the default geometry attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_geometry: Option<String>,
    /// Native coordinate reference of geometry attributes
    #[serde(default)]
    pub crs: Crs,
}

impl Schema {
    /// Create a new schema. The first geometry attribute becomes the
    /// default geometry.
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeDescriptor>) -> Self {
        let default_geometry = attributes
            .iter()
            .find(|a| a.attr_type.is_geometry())
            .map(|a| a.name.clone());
        Self {
            name: name.into(),
            attributes,
            default_geometry,
            crs: Crs::default(),
        }
    }

    /// Sets the native coordinate reference
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// Overrides the default geometry attribute
    pub fn with_default_geometry(mut self, name: impl Into<String>) -> Self {
        self.default_geometry = Some(name.into());
        self
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the schema has no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Position of the named attribute
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Descriptor of the named attribute
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Position of the default geometry attribute
    pub fn default_geometry_index(&self) -> Option<usize> {
        self.default_geometry
            .as_deref()
            .and_then(|name| self.index_of(name))
    }

    /// Positions of every geometry-valued attribute
    pub fn geometry_indices(&self) -> Vec<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.attr_type.is_geometry())
            .map(|(i, _)| i)
            .collect()
    }

    /// Builds a narrowed schema holding the attributes at `indices`, in
    /// that order. The default geometry survives only if it is retained.
    pub fn subset(&self, indices: &[usize]) -> Schema {
        let attributes: Vec<AttributeDescriptor> = indices
            .iter()
            .filter_map(|&i| self.attributes.get(i).cloned())
            .collect();
        let default_geometry = self
            .default_geometry
            .as_ref()
            .filter(|name| attributes.iter().any(|a| &a.name == *name))
            .cloned();
        Schema {
            name: self.name.clone(),
            attributes,
            default_geometry,
            crs: self.crs.clone(),
        }
    }

    /// Validates the schema structure itself (not a record)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Schema name must not be empty".into());
        }

        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(format!("Duplicate attribute '{}'", attr.name));
            }
        }

        if let Some(name) = &self.default_geometry {
            match self.attribute(name) {
                Some(attr) if attr.attr_type.is_geometry() => {}
                Some(attr) => {
                    return Err(format!(
                        "Default geometry '{}' has type {}",
                        name,
                        attr.attr_type.type_name()
                    ))
                }
                None => return Err(format!("Default geometry '{}' is not an attribute", name)),
            }
        }

        Ok(())
    }
}
