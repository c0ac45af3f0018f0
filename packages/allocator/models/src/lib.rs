#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Demand point and allocation result types.
//!
//! A demand point is a candidate site (typically a station) with two
//! nested walking-time bands. The allocator turns a list of demand points
//! into an [`Allocation`]: a non-duplicated population estimate per point
//! and band. Values stay fractional until [`Allocation::rounded`] is
//! called at the output boundary.

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A caller-supplied identifier, kept exactly as it was given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplicitId {
    /// An integer identifier.
    Number(i64),
    /// Any other JSON number (fractional, or an integer beyond `i64`),
    /// kept in the form it arrived in.
    Numeric(serde_json::Number),
    /// Any other identifier. Numeric-looking strings stay text.
    Text(String),
}

impl std::fmt::Display for ExplicitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Identity of a demand point.
///
/// Explicit and ordinal identifiers never compare equal, even when they
/// print the same, so an auto-assigned ordinal can't collide with a
/// caller's numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    /// Supplied by the caller.
    Explicit(ExplicitId),
    /// Assigned from the point's position in the request.
    Ordinal(usize),
}

impl PointId {
    /// Uses the caller's id when there is one, else the position.
    #[must_use]
    pub fn explicit_or_ordinal(explicit: Option<ExplicitId>, position: usize) -> Self {
        explicit.map_or(Self::Ordinal(position), Self::Explicit)
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(id) => id.fmt(f),
            Self::Ordinal(n) => write!(f, "{n}"),
        }
    }
}

/// Which walking-time band a computation refers to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Band {
    /// 0–5 minutes.
    Near,
    /// The exclusive 5–10 minute ring.
    Far,
}

impl Band {
    /// Both bands in evaluation order.
    pub const ALL: [Self; 2] = [Self::Near, Self::Far];
}

/// How a zone contested by several points is split between them.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OverlapStrategy {
    /// Pairwise nearest-point-wins differencing in input order.
    ///
    /// Exact for two-way overlaps. With three or more points contesting
    /// the same area the outcome depends on input order.
    #[default]
    Pairwise,
    /// Each contested overlap is split along the perpendicular bisector of
    /// the two claimants, so every fragment goes to its nearest claimant
    /// regardless of input order.
    Voronoi,
}

/// A candidate site with its two walking-time bands.
///
/// All geometry must be in the same reference system as the zones it is
/// allocated against.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandPoint {
    /// Point identity, echoed back in the results.
    pub id: PointId,
    /// Site location.
    pub location: Point<f64>,
    /// Area reachable within the near threshold.
    pub near_band: MultiPolygon<f64>,
    /// Area reachable within the far threshold (includes the near band).
    pub far_band: MultiPolygon<f64>,
}

impl DemandPoint {
    /// The raw band polygon for `band`. For [`Band::Far`] this is the full
    /// far polygon, not the ring.
    #[must_use]
    pub const fn band(&self, band: Band) -> &MultiPolygon<f64> {
        match band {
            Band::Near => &self.near_band,
            Band::Far => &self.far_band,
        }
    }
}

/// Unrounded population estimate for one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAllocation {
    /// Point identity.
    pub id: PointId,
    /// Population within the near band.
    pub population_near: f64,
    /// Population within the far ring.
    pub population_far: f64,
}

impl PointAllocation {
    /// A zero-filled allocation for `id`.
    #[must_use]
    pub const fn empty(id: PointId) -> Self {
        Self {
            id,
            population_near: 0.0,
            population_far: 0.0,
        }
    }

    /// Near plus far.
    #[must_use]
    pub fn population_total(&self) -> f64 {
        self.population_near + self.population_far
    }

    /// Population for one band.
    #[must_use]
    pub const fn population(&self, band: Band) -> f64 {
        match band {
            Band::Near => self.population_near,
            Band::Far => self.population_far,
        }
    }
}

/// Unrounded result of one allocation run, in input point order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Per-point estimates.
    pub points: Vec<PointAllocation>,
}

impl Allocation {
    /// Sum of near populations over all points.
    #[must_use]
    pub fn total_near(&self) -> f64 {
        self.points.iter().map(|p| p.population_near).sum()
    }

    /// Sum of far populations over all points.
    #[must_use]
    pub fn total_far(&self) -> f64 {
        self.points.iter().map(|p| p.population_far).sum()
    }

    /// Sum of both bands over all points.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total_near() + self.total_far()
    }

    /// Rounds every figure to whole residents.
    ///
    /// Totals are rounded from the unrounded sums, never summed from
    /// rounded parts. Halves round to even.
    #[must_use]
    pub fn rounded(&self) -> RoundedAllocation {
        let total_near = self.total_near();
        let total_far = self.total_far();

        RoundedAllocation {
            total_population_near: round_population(total_near),
            total_population_far: round_population(total_far),
            total_population: round_population(total_near + total_far),
            points: self
                .points
                .iter()
                .map(|p| RoundedPointAllocation {
                    id: p.id.clone(),
                    population_near: round_population(p.population_near),
                    population_far: round_population(p.population_far),
                    population_total: round_population(p.population_total()),
                })
                .collect(),
        }
    }
}

/// Population estimate for one point in whole residents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedPointAllocation {
    /// Point identity.
    pub id: PointId,
    /// Residents within the near band.
    pub population_near: u64,
    /// Residents within the far ring.
    pub population_far: u64,
    /// Residents within either.
    pub population_total: u64,
}

/// Allocation result in whole residents, as handed to result consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedAllocation {
    /// Near-band residents over all points.
    pub total_population_near: u64,
    /// Far-ring residents over all points.
    pub total_population_far: u64,
    /// Residents within any band of any point.
    pub total_population: u64,
    /// Per-point figures in input order.
    pub points: Vec<RoundedPointAllocation>,
}

/// Rounds a population to whole residents, halves to even. Negative or
/// non-finite values become zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_population(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round_ties_even() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_and_ordinal_ids_never_alias() {
        let explicit = PointId::Explicit(ExplicitId::Number(0));
        let ordinal = PointId::Ordinal(0);
        assert_ne!(explicit, ordinal);
        assert_eq!(explicit.to_string(), ordinal.to_string());
    }

    #[test]
    fn explicit_or_ordinal_prefers_caller_id() {
        let id = PointId::explicit_or_ordinal(Some(ExplicitId::Text("st-7".to_string())), 3);
        assert_eq!(id, PointId::Explicit(ExplicitId::Text("st-7".to_string())));
        assert_eq!(PointId::explicit_or_ordinal(None, 3), PointId::Ordinal(3));
    }

    #[test]
    fn ids_serialize_untagged() {
        let ids = vec![
            PointId::Explicit(ExplicitId::Number(42)),
            PointId::Explicit(ExplicitId::Text("007".to_string())),
            PointId::Ordinal(1),
        ];
        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json, serde_json::json!([42, "007", 1]));
    }

    #[test]
    fn fractional_and_oversized_ids_are_kept() {
        let ids: Vec<ExplicitId> =
            serde_json::from_value(serde_json::json!([1.5, 18_446_744_073_709_551_615_u64, -3]))
                .unwrap();

        assert!(matches!(ids[0], ExplicitId::Numeric(_)));
        assert_eq!(ids[0].to_string(), "1.5");
        assert!(matches!(ids[1], ExplicitId::Numeric(_)));
        assert_eq!(ids[1].to_string(), "18446744073709551615");
        assert_eq!(ids[2], ExplicitId::Number(-3));
        assert_eq!(
            serde_json::to_value(&ids).unwrap(),
            serde_json::json!([1.5, 18_446_744_073_709_551_615_u64, -3])
        );
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(
            "VORONOI".parse::<OverlapStrategy>().unwrap(),
            OverlapStrategy::Voronoi
        );
        assert_eq!(OverlapStrategy::default(), OverlapStrategy::Pairwise);
        assert_eq!(OverlapStrategy::Pairwise.to_string(), "pairwise");
    }

    #[test]
    fn rounding_happens_on_unrounded_sums() {
        let allocation = Allocation {
            points: vec![
                PointAllocation {
                    id: PointId::Ordinal(0),
                    population_near: 0.4,
                    population_far: 0.4,
                },
                PointAllocation {
                    id: PointId::Ordinal(1),
                    population_near: 0.4,
                    population_far: 0.0,
                },
            ],
        };
        let rounded = allocation.rounded();
        assert_eq!(rounded.points[0].population_near, 0);
        assert_eq!(rounded.points[0].population_total, 1);
        assert_eq!(rounded.total_population_near, 1);
        assert_eq!(rounded.total_population_far, 0);
        assert_eq!(rounded.total_population, 1);
    }

    #[test]
    fn round_population_clamps_and_rounds_half_even() {
        assert_eq!(round_population(2.5), 2);
        assert_eq!(round_population(3.5), 4);
        assert_eq!(round_population(-3.0), 0);
        assert_eq!(round_population(f64::NAN), 0);
    }

    #[test]
    fn empty_allocation_totals_are_zero() {
        let rounded = Allocation::default().rounded();
        assert_eq!(rounded, RoundedAllocation::default());
    }
}
