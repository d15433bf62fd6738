//! Coordinate transform implementations

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use geo::MapCoords;
use geo_types::{Coord, Geometry};
use thiserror::Error;

use super::Crs;

/// Sphere radius used by Web Mercator, in metres
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude bound beyond which Web Mercator diverges
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Failure to transform a coordinate or find a transform
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Coordinate outside the domain of the transform
    #[error("coordinate ({x}, {y}) outside transform domain: {reason}")]
    OutOfDomain { x: f64, y: f64, reason: String },

    /// Coordinate is NaN or infinite
    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },

    /// No transform registered for the pair
    #[error("no transform from {from} to {to}")]
    Unsupported { from: String, to: String },
}

/// A coordinate operation from one reference to another
pub trait CoordinateTransform: Send + Sync + fmt::Debug {
    /// Transforms one coordinate
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, TransformError>;
}

fn check_finite(coord: Coord<f64>) -> Result<(), TransformError> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(())
    } else {
        Err(TransformError::NonFinite {
            x: coord.x,
            y: coord.y,
        })
    }
}

/// Leaves coordinates unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, TransformError> {
        Ok(coord)
    }
}

/// WGS 84 longitude/latitude to Web Mercator metres
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorForward;

impl CoordinateTransform for WebMercatorForward {
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, TransformError> {
        check_finite(coord)?;
        if coord.y.abs() > MAX_MERCATOR_LAT {
            return Err(TransformError::OutOfDomain {
                x: coord.x,
                y: coord.y,
                reason: format!("latitude beyond ±{}", MAX_MERCATOR_LAT),
            });
        }
        if coord.x.abs() > 180.0 {
            return Err(TransformError::OutOfDomain {
                x: coord.x,
                y: coord.y,
                reason: "longitude beyond ±180".into(),
            });
        }
        let x = EARTH_RADIUS * coord.x.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + coord.y.to_radians() / 2.0).tan().ln();
        Ok(Coord { x, y })
    }
}

/// Web Mercator metres to WGS 84 longitude/latitude
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorInverse;

impl CoordinateTransform for WebMercatorInverse {
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, TransformError> {
        check_finite(coord)?;
        let x = (coord.x / EARTH_RADIUS).to_degrees();
        let y = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Ok(Coord { x, y })
    }
}

/// `x' = a*x + b*y + c`, `y' = d*x + e*y + f`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// Pure translation
    pub fn translate(dx: f64, dy: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: dx,
            d: 0.0,
            e: 1.0,
            f: dy,
        }
    }

    /// Axis scaling about the origin
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: sy,
            f: 0.0,
        }
    }
}

impl CoordinateTransform for AffineTransform {
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, TransformError> {
        check_finite(coord)?;
        Ok(Coord {
            x: self.a * coord.x + self.b * coord.y + self.c,
            y: self.d * coord.x + self.e * coord.y + self.f,
        })
    }
}

/// Transforms every coordinate of a geometry; the first failing
/// coordinate fails the whole geometry.
pub fn transform_geometry(
    transform: &dyn CoordinateTransform,
    geometry: &Geometry<f64>,
) -> Result<Geometry<f64>, TransformError> {
    geometry.try_map_coords(|coord| transform.apply(coord))
}

/// Transforms keyed by (source, target) reference
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<(Crs, Crs), Arc<dyn CoordinateTransform>>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Crs::wgs84(), Crs::web_mercator(), Arc::new(WebMercatorForward));
        registry.register(Crs::web_mercator(), Crs::wgs84(), Arc::new(WebMercatorInverse));
        registry
    }
}

impl TransformRegistry {
    /// Registry with the built-in WGS 84 / Web Mercator pair
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry without any registered transform
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Registers (or replaces) the transform for a pair
    pub fn register(&mut self, from: Crs, to: Crs, transform: Arc<dyn CoordinateTransform>) {
        self.transforms.insert((from, to), transform);
    }

    /// Finds the transform for a pair. Equal references map to identity.
    pub fn lookup(
        &self,
        from: &Crs,
        to: &Crs,
    ) -> Result<Arc<dyn CoordinateTransform>, TransformError> {
        if from == to {
            return Ok(Arc::new(IdentityTransform));
        }
        self.transforms
            .get(&(from.clone(), to.clone()))
            .cloned()
            .ok_or_else(|| TransformError::Unsupported {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_web_mercator_round_trip_origin() {
        let out = WebMercatorForward.apply(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert!(close(out.x, 0.0));
        assert!(close(out.y, 0.0));
    }

    #[test]
    fn test_web_mercator_known_value() {
        let out = WebMercatorForward
            .apply(Coord { x: 180.0, y: 0.0 })
            .unwrap();
        assert!(close(out.x, 20_037_508.342_789_244));

        let back = WebMercatorInverse.apply(out).unwrap();
        assert!(close(back.x, 180.0));
    }

    #[test]
    fn test_web_mercator_rejects_pole() {
        let err = WebMercatorForward
            .apply(Coord { x: 0.0, y: 90.0 })
            .unwrap_err();
        assert!(matches!(err, TransformError::OutOfDomain { .. }));
    }

    #[test]
    fn test_affine_rejects_nan() {
        let err = AffineTransform::translate(1.0, 1.0)
            .apply(Coord {
                x: f64::NAN,
                y: 0.0,
            })
            .unwrap_err();
        assert!(matches!(err, TransformError::NonFinite { .. }));
    }

    #[test]
    fn test_transform_geometry_all_coords() {
        let line: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 2.0)].into();
        let moved = transform_geometry(&AffineTransform::translate(10.0, -1.0), &line).unwrap();
        match moved {
            Geometry::LineString(ls) => {
                assert_eq!(ls.0[0], Coord { x: 10.0, y: -1.0 });
                assert_eq!(ls.0[1], Coord { x: 11.0, y: 1.0 });
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_transform_geometry_fails_whole_geometry() {
        let line: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 89.0)].into();
        assert!(transform_geometry(&WebMercatorForward, &line).is_err());

        let pt: Geometry<f64> = point!(x: 1.0, y: 1.0).into();
        assert!(transform_geometry(&WebMercatorForward, &pt).is_ok());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = TransformRegistry::new();
        assert!(registry.lookup(&Crs::wgs84(), &Crs::web_mercator()).is_ok());
        assert!(registry.lookup(&Crs::wgs84(), &Crs::wgs84()).is_ok());

        let err = registry
            .lookup(&Crs::wgs84(), &Crs::new("EPSG:27700"))
            .unwrap_err();
        assert!(matches!(err, TransformError::Unsupported { .. }));
    }
}
