//! Planar geometry primitives used by the allocator.
//!
//! The allocator only talks to geometry through [`GeometryOps`], so the
//! boolean-ops backend can be swapped (or faked in tests). Every fallible
//! operation returns a [`GeometryError`] instead of panicking; the
//! allocator isolates such failures to a single zone/point pair.

use std::panic::{UnwindSafe, catch_unwind};

use geo::{
    Area, BooleanOps, Centroid, CoordsIter, Distance, Euclidean, Intersects, MultiPolygon, Point,
};
use thiserror::Error;

/// A geometry operation that could not produce a usable result.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// An input carried NaN or infinite coordinates.
    #[error("{op}: input has non-finite coordinates")]
    NonFinite {
        /// Operation name.
        op: &'static str,
    },

    /// The boolean-ops engine gave up on the input topology.
    #[error("{op}: geometry engine failed: {message}")]
    Engine {
        /// Operation name.
        op: &'static str,
        /// Panic payload from the engine, if it was a string.
        message: String,
    },

    /// The operation produced geometry with a non-finite area.
    #[error("{op}: result has non-finite area")]
    InvalidResult {
        /// Operation name.
        op: &'static str,
    },
}

/// Polygon primitives in a shared planar reference system.
///
/// Implementations must accept empty multi-polygons on either side and
/// return empty results for them rather than failing.
pub trait GeometryOps {
    /// `a ∩ b`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the intersection cannot be computed.
    fn intersection(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, GeometryError>;

    /// `a − b`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the difference cannot be computed.
    fn difference(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, GeometryError>;

    /// Union of all `shapes`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if any partial union fails.
    fn union_all(&self, shapes: &[&MultiPolygon<f64>]) -> Result<MultiPolygon<f64>, GeometryError>;

    /// Whether `a` and `b` share at least one point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the predicate cannot be evaluated.
    fn intersects(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>)
    -> Result<bool, GeometryError>;

    /// Unsigned area.
    fn area(&self, a: &MultiPolygon<f64>) -> f64;

    /// Centroid, or `None` for empty geometry.
    fn centroid(&self, a: &MultiPolygon<f64>) -> Option<Point<f64>>;

    /// Straight-line distance between two points.
    fn distance(&self, a: Point<f64>, b: Point<f64>) -> f64;
}

/// [`GeometryOps`] backed by the `geo` crate.
///
/// Inputs are checked for non-finite coordinates first, and panics raised
/// inside the boolean-ops engine are caught and reported as
/// [`GeometryError::Engine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeometry;

impl GeometryOps for PlanarGeometry {
    fn intersection(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, GeometryError> {
        const OP: &str = "intersection";
        if a.0.is_empty() || b.0.is_empty() {
            return Ok(MultiPolygon(vec![]));
        }
        ensure_finite(OP, a)?;
        ensure_finite(OP, b)?;
        let out = guarded(OP, || a.intersection(b))?;
        ensure_finite_area(OP, &out)?;
        Ok(out)
    }

    fn difference(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, GeometryError> {
        const OP: &str = "difference";
        if a.0.is_empty() {
            return Ok(MultiPolygon(vec![]));
        }
        if b.0.is_empty() {
            return Ok(a.clone());
        }
        ensure_finite(OP, a)?;
        ensure_finite(OP, b)?;
        let out = guarded(OP, || a.difference(b))?;
        ensure_finite_area(OP, &out)?;
        Ok(out)
    }

    fn union_all(&self, shapes: &[&MultiPolygon<f64>]) -> Result<MultiPolygon<f64>, GeometryError> {
        const OP: &str = "union";
        let mut acc = MultiPolygon(vec![]);
        for shape in shapes.iter().filter(|s| !s.0.is_empty()) {
            ensure_finite(OP, shape)?;
            acc = if acc.0.is_empty() {
                (*shape).clone()
            } else {
                let current = &acc;
                guarded(OP, || current.union(*shape))?
            };
        }
        ensure_finite_area(OP, &acc)?;
        Ok(acc)
    }

    fn intersects(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<bool, GeometryError> {
        const OP: &str = "intersects";
        if a.0.is_empty() || b.0.is_empty() {
            return Ok(false);
        }
        ensure_finite(OP, a)?;
        ensure_finite(OP, b)?;
        guarded(OP, || a.intersects(b))
    }

    fn area(&self, a: &MultiPolygon<f64>) -> f64 {
        a.unsigned_area()
    }

    fn centroid(&self, a: &MultiPolygon<f64>) -> Option<Point<f64>> {
        a.centroid()
    }

    fn distance(&self, a: Point<f64>, b: Point<f64>) -> f64 {
        Euclidean.distance(a, b)
    }
}

fn guarded<T>(op: &'static str, f: impl FnOnce() -> T + UnwindSafe) -> Result<T, GeometryError> {
    catch_unwind(f).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        GeometryError::Engine { op, message }
    })
}

fn ensure_finite(op: &'static str, mp: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if mp.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::NonFinite { op })
    }
}

fn ensure_finite_area(op: &'static str, mp: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if mp.unsigned_area().is_finite() {
        Ok(())
    } else {
        Err(GeometryError::InvalidResult { op })
    }
}
