//! Demand model: the weight grid that drives seasonal order volume.
//!
//! For every (store, category, year, month) cell intersecting the run's
//! date range the model computes
//!
//! ```text
//! weight = seasonal_multiplier[month] * growth_factor(year) * store_volume_weight
//! ```
//!
//! and exposes the normalized grid as a probability mass function for
//! the order sampler. Without this weighting, order volume would be
//! flat over time and the dataset would never exercise a real
//! reporting workload.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::error::{GenError, Result};

/// One cell of the demand grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemandCell {
    pub store_idx: usize,
    pub category_idx: usize,
    pub year: i32,
    /// 1-based calendar month.
    pub month: u32,
}

/// Year-over-year growth factor.
///
/// Piecewise-linear between 1.0 in the first calendar year of the range
/// and `terminal` in the last; pure, and monotonically non-decreasing
/// whenever `terminal >= 1.0` (enforced by config validation).
pub fn growth_factor(year: i32, first_year: i32, last_year: i32, terminal: f64) -> f64 {
    if last_year <= first_year {
        return 1.0;
    }
    let t = (year - first_year) as f64 / (last_year - first_year) as f64;
    1.0 + t * (terminal - 1.0)
}

/// The weight function itself. Pure: same inputs, same weight.
pub fn cell_weight(seasonal: f64, growth: f64, store_weight: f64) -> f64 {
    seasonal * growth * store_weight
}

/// The precomputed demand grid over the configured date range.
pub struct DemandModel {
    cells: Vec<DemandCell>,
    weights: Vec<f64>,
    cumulative: Vec<f64>,
    total: f64,
}

impl DemandModel {
    /// Build the grid for every (store, category) pair and every
    /// (year, month) intersecting `[start_date, end_date]`.
    ///
    /// Zero-weight cells are dropped; an all-zero grand total is a
    /// configuration error (nothing could ever be sampled).
    pub fn build(catalog: &Catalog, cfg: &RunConfig) -> Result<Self> {
        let first_year = cfg.start_date.year();
        let last_year = cfg.end_date.year();

        let mut cells = Vec::new();
        let mut weights = Vec::new();
        for (year, month) in months_in_range(cfg.start_date, cfg.end_date) {
            let growth = growth_factor(year, first_year, last_year, cfg.growth_terminal);
            for (store_idx, store_weight) in catalog.store_weights.iter().enumerate() {
                for (category_idx, category) in catalog.categories.iter().enumerate() {
                    let w = cell_weight(
                        category.seasonal_multiplier(month),
                        growth,
                        *store_weight,
                    );
                    if w > 0.0 {
                        cells.push(DemandCell {
                            store_idx,
                            category_idx,
                            year,
                            month,
                        });
                        weights.push(w);
                    }
                }
            }
        }

        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            return Err(GenError::config(
                "demand grid has zero total weight; check seasonal multipliers and store weights",
            ));
        }

        let mut cumulative = Vec::with_capacity(weights.len());
        let mut acc = 0.0;
        for w in &weights {
            acc += w;
            cumulative.push(acc);
        }

        Ok(Self {
            cells,
            weights,
            cumulative,
            total,
        })
    }

    /// Draw one cell from the weighted distribution, with replacement.
    pub fn sample(&self, rng: &mut StdRng) -> DemandCell {
        let r = rng.gen::<f64>() * self.total;
        let idx = self.cumulative.partition_point(|c| *c <= r);
        self.cells[idx.min(self.cells.len() - 1)]
    }

    /// Normalized probability mass per cell, in cell order.
    pub fn pmf(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w / self.total).collect()
    }

    pub fn cells(&self) -> &[DemandCell] {
        &self.cells
    }
}

/// Iterate (year, month) pairs whose calendar month intersects the range.
fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        out.push((year, month));
        if year == end.year() && month == end.month() {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clap::Parser;
    use rand::SeedableRng;

    fn fixture() -> (Catalog, RunConfig) {
        let cfg = RunConfig::parse_from(["test"]);
        let mut rng = StdRng::seed_from_u64(3);
        let catalog = Catalog::load(&cfg, &mut rng).unwrap();
        (catalog, cfg)
    }

    #[test]
    fn test_growth_factor_anchors_and_monotonicity() {
        assert_eq!(growth_factor(2022, 2022, 2025, 1.8), 1.0);
        assert_eq!(growth_factor(2025, 2022, 2025, 1.8), 1.8);
        let mut prev = 0.0;
        for year in 2022..=2025 {
            let g = growth_factor(year, 2022, 2025, 1.8);
            assert!(g >= prev, "growth must be non-decreasing");
            prev = g;
        }
        // Single-year range degenerates to 1.0 everywhere.
        assert_eq!(growth_factor(2024, 2024, 2024, 3.0), 1.0);
    }

    #[test]
    fn test_cell_weight_is_pure() {
        for _ in 0..3 {
            assert_eq!(cell_weight(1.4, 1.25, 9.0), 1.4 * 1.25 * 9.0);
        }
    }

    #[test]
    fn test_pmf_normalizes() {
        let (catalog, cfg) = fixture();
        let model = DemandModel::build(&catalog, &cfg).unwrap();
        let sum: f64 = model.pmf().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        assert!(model.pmf().iter().all(|p| *p > 0.0));
    }

    #[test]
    fn test_cells_stay_inside_range() {
        let (catalog, mut cfg) = fixture();
        cfg.start_date = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        cfg.end_date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let model = DemandModel::build(&catalog, &cfg).unwrap();
        for cell in model.cells() {
            let in_range = matches!(
                (cell.year, cell.month),
                (2023, 11) | (2023, 12) | (2024, 1) | (2024, 2)
            );
            assert!(in_range, "unexpected cell {:?}", cell);
        }
    }

    #[test]
    fn test_zero_total_rejected() {
        let (mut catalog, cfg) = fixture();
        catalog.store_weights = vec![0.0; catalog.store_weights.len()];
        assert!(matches!(
            DemandModel::build(&catalog, &cfg),
            Err(GenError::Config(_))
        ));
    }

    #[test]
    fn test_sampling_tracks_weights() {
        let (catalog, mut cfg) = fixture();
        // Single year keeps growth flat so the ratio below is purely seasonal.
        cfg.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        cfg.end_date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let model = DemandModel::build(&catalog, &cfg).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let garden = catalog
            .categories
            .iter()
            .position(|c| c.category_name == "Garden & Outdoor")
            .unwrap();
        let (mut may, mut december) = (0u32, 0u32);
        for _ in 0..50_000 {
            let cell = model.sample(&mut rng);
            if cell.category_idx == garden {
                match cell.month {
                    5 => may += 1,
                    12 => december += 1,
                    _ => {}
                }
            }
        }
        // May weighs 1.8 vs December's 0.3 for this category.
        assert!(
            may > december * 3,
            "garden demand should peak in May (may={may}, dec={december})"
        );
    }

    #[test]
    fn test_months_in_range_single_month() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 25).unwrap();
        assert_eq!(months_in_range(start, end), vec![(2024, 6)]);
    }
}
