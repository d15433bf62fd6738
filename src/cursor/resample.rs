//! Geometry resampling decorator

use std::sync::Arc;

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPolygon, Polygon,
};

use super::{BoxCursor, CursorError, CursorResult, RecordCursor};
use crate::query::Resolution;
use crate::record::{Record, Value};
use crate::schema::Schema;

/// Simplifies geometry-valued attributes by decimation; other attributes
/// pass through unchanged.
pub struct ResampleCursor {
    inner: BoxCursor,
    resolution: Resolution,
    geometry_indices: Vec<usize>,
    closed: bool,
}

impl ResampleCursor {
    pub fn new(inner: BoxCursor, resolution: Resolution) -> Self {
        let geometry_indices = inner.schema().geometry_indices();
        Self {
            inner,
            resolution,
            geometry_indices,
            closed: false,
        }
    }
}

impl RecordCursor for ResampleCursor {
    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Record> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        let mut record = self.inner.next()?;
        for &i in &self.geometry_indices {
            if let Some(Value::Geometry(g)) = record.get_at(i) {
                let simplified = decimate(g, self.resolution);
                record.set_at(i, Value::Geometry(simplified));
            }
        }
        Ok(record)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
        }
    }
}

impl Drop for ResampleCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drops vertices closer than the tolerance to the last kept vertex on
/// both axes. End points are always kept; rings that would collapse below
/// four vertices are left untouched.
pub fn decimate(geometry: &Geometry<f64>, res: Resolution) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(ls) => Geometry::LineString(decimate_line(ls, res, 2)),
        Geometry::Polygon(p) => Geometry::Polygon(decimate_polygon(p, res)),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.0.iter().map(|ls| decimate_line(ls, res, 2)).collect(),
        )),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.0.iter().map(|p| decimate_polygon(p, res)).collect(),
        )),
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection::new_from(
            gc.0.iter().map(|g| decimate(g, res)).collect(),
        )),
        other => other.clone(),
    }
}

fn decimate_polygon(polygon: &Polygon<f64>, res: Resolution) -> Polygon<f64> {
    Polygon::new(
        decimate_line(polygon.exterior(), res, 4),
        polygon
            .interiors()
            .iter()
            .map(|ring| decimate_line(ring, res, 4))
            .collect(),
    )
}

fn decimate_line(line: &LineString<f64>, res: Resolution, min_points: usize) -> LineString<f64> {
    let coords = &line.0;
    if coords.len() <= min_points {
        return line.clone();
    }

    let far_enough = |a: &Coord<f64>, b: &Coord<f64>| {
        (a.x - b.x).abs() > res.x || (a.y - b.y).abs() > res.y
    };

    let last = coords[coords.len() - 1];
    let mut kept: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    kept.push(coords[0]);
    for c in &coords[1..coords.len() - 1] {
        if let Some(prev) = kept.last() {
            if far_enough(prev, c) {
                kept.push(*c);
            }
        }
    }
    kept.push(last);

    if kept.len() < min_points {
        return line.clone();
    }
    LineString::new(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{collect, VecCursor};
    use crate::schema::AttributeDescriptor;
    use geo_types::{line_string, point, polygon};

    #[test]
    fn test_decimate_line_drops_close_vertices() {
        let line: Geometry<f64> = line_string![
            (x: 0.0, y: 0.0),
            (x: 0.1, y: 0.1),
            (x: 0.2, y: 0.0),
            (x: 5.0, y: 5.0),
            (x: 5.05, y: 5.0),
        ]
        .into();
        match decimate(&line, Resolution::new(1.0, 1.0)) {
            Geometry::LineString(ls) => {
                assert_eq!(ls.0.len(), 3);
                assert_eq!(ls.0[0], Coord { x: 0.0, y: 0.0 });
                assert_eq!(ls.0[1], Coord { x: 5.0, y: 5.0 });
                assert_eq!(ls.0[2], Coord { x: 5.05, y: 5.0 });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_tolerance_keeps_distinct_vertices() {
        let line: Geometry<f64> =
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)]
                .into();
        match decimate(&line, Resolution::new(0.0, 0.0)) {
            Geometry::LineString(ls) => assert_eq!(ls.0.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ring_never_collapses() {
        let poly: Geometry<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.1, y: 0.0),
            (x: 0.1, y: 0.1),
            (x: 0.0, y: 0.1),
        ]
        .into();
        let out = decimate(&poly, Resolution::new(10.0, 10.0));
        assert_eq!(out, poly);
    }

    #[test]
    fn test_points_and_non_geometry_untouched() {
        let schema = Arc::new(Schema::new(
            "t",
            vec![AttributeDescriptor::int("v"), AttributeDescriptor::geometry("g")],
        ));
        let rec = Record::new(
            "a",
            Arc::clone(&schema),
            vec![Value::Int(7), Value::Geometry(point!(x: 1.0, y: 2.0).into())],
        );
        let c = ResampleCursor::new(
            Box::new(VecCursor::new(schema, vec![rec.clone()])),
            Resolution::new(5.0, 5.0),
        );
        let out = collect(c).unwrap();
        assert_eq!(out[0], rec);
    }
}
