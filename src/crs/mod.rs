//! Coordinate references and coordinate transforms
//!
//! Reprojection is driven by a [`TransformRegistry`] keyed on
//! (source, target) reference pairs. Identity is implicit for equal
//! references.

mod transform;

pub use transform::{
    transform_geometry, AffineTransform, CoordinateTransform, IdentityTransform, TransformError,
    TransformRegistry, WebMercatorForward, WebMercatorInverse,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authority code of geographic WGS 84
pub const WGS84: &str = "EPSG:4326";

/// Authority code of spherical Web Mercator
pub const WEB_MERCATOR: &str = "EPSG:3857";

/// Coordinate reference identifier, e.g. `EPSG:4326`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Geographic WGS 84
    pub fn wgs84() -> Self {
        Self::new(WGS84)
    }

    /// Spherical Web Mercator
    pub fn web_mercator() -> Self {
        Self::new(WEB_MERCATOR)
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
