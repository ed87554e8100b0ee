//! Run configuration: named parameters with env fallbacks, validated at
//! startup. Missing or out-of-range values are fatal, never retried.

use chrono::NaiveDate;
use clap::Parser;

use crate::catalog;
use crate::error::{GenError, Result};

/// Parameters controlling a generation run.
///
/// Every knob can come from the CLI or from the environment (the env names
/// match the original deployment's `.env` contract).
#[derive(Parser, Clone, Debug)]
pub struct RunConfig {
    /// Number of customers to synthesize.
    #[arg(long, env = "NUM_CUSTOMERS", default_value_t = 50_000)]
    pub customers: usize,

    /// Total number of orders to sample across the date range.
    #[arg(long, env = "NUM_ORDERS", default_value_t = 100_000)]
    pub orders: usize,

    /// First order date (inclusive), ISO format.
    #[arg(long, env = "START_DATE", default_value = "2022-12-09")]
    pub start_date: NaiveDate,

    /// Last order date (inclusive), ISO format.
    #[arg(long, env = "END_DATE", default_value = "2025-12-09")]
    pub end_date: NaiveDate,

    /// Documents per write batch.
    #[arg(long, default_value_t = 1_000)]
    pub batch_size: usize,

    /// Maximum in-flight concurrent batch writes (1 = sequential).
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Retry attempts per batch before the run aborts.
    #[arg(long, default_value_t = 5)]
    pub max_write_attempts: u32,

    /// Demand multiplier reached in the final calendar year of the range
    /// (the first year is anchored at 1.0).
    #[arg(long, env = "GROWTH_TERMINAL", default_value_t = 1.8)]
    pub growth_terminal: f64,

    /// Per-store volume weight overrides as a comma-separated list, in
    /// catalog order. Omit to use the built-in weights.
    #[arg(long, env = "STORE_WEIGHTS")]
    pub store_weights: Option<String>,

    /// Fraction of the store x product cross-product that carries inventory.
    #[arg(long, default_value_t = 0.85)]
    pub inventory_coverage: f64,

    /// Probability that a line item comes from outside the order's
    /// demand category.
    #[arg(long, default_value_t = 0.25)]
    pub cross_sell: f64,

    /// Baseline probability of a line-item discount (boosted in peak
    /// season months).
    #[arg(long, default_value_t = 0.30)]
    pub discount_prob: f64,

    /// Upper bound on distinct products per order.
    #[arg(long, default_value_t = 5)]
    pub max_items_per_order: u32,

    /// Sales tax rate applied to order subtotals.
    #[arg(long, default_value_t = 0.10)]
    pub tax_rate: f64,

    /// RNG seed. Identical seeds and parameters reproduce the dataset.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl RunConfig {
    /// Validate all parameters. Called once before generation starts.
    pub fn validate(&self) -> Result<()> {
        if self.customers == 0 {
            return Err(GenError::config("--customers must be at least 1"));
        }
        if self.orders == 0 {
            return Err(GenError::config("--orders must be at least 1"));
        }
        if self.start_date > self.end_date {
            return Err(GenError::config(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.batch_size == 0 {
            return Err(GenError::config("--batch-size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(GenError::config("--concurrency must be at least 1"));
        }
        if self.max_write_attempts == 0 {
            return Err(GenError::config("--max-write-attempts must be at least 1"));
        }
        if self.growth_terminal < 1.0 {
            return Err(GenError::config(format!(
                "--growth-terminal must be >= 1.0 (got {}); growth must be non-decreasing",
                self.growth_terminal
            )));
        }
        if !(self.inventory_coverage > 0.0 && self.inventory_coverage <= 1.0) {
            return Err(GenError::config(
                "--inventory-coverage must be in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.cross_sell) {
            return Err(GenError::config("--cross-sell must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.discount_prob) {
            return Err(GenError::config("--discount-prob must be in [0, 1]"));
        }
        if self.max_items_per_order == 0 || self.max_items_per_order > 20 {
            return Err(GenError::config(
                "--max-items-per-order must be in 1..=20",
            ));
        }
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(GenError::config("--tax-rate must be in [0, 1)"));
        }
        self.store_weight_overrides()?;
        Ok(())
    }

    /// Parse `--store-weights` into per-store weights, if provided.
    ///
    /// The list must carry exactly one positive weight per catalog store.
    pub fn store_weight_overrides(&self) -> Result<Option<Vec<f64>>> {
        let Some(raw) = &self.store_weights else {
            return Ok(None);
        };
        let weights: Vec<f64> = raw
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|e| GenError::config(format!("bad store weight '{s}': {e}")))
            })
            .collect::<Result<_>>()?;
        if weights.len() != catalog::STORE_COUNT {
            return Err(GenError::config(format!(
                "--store-weights must list {} weights, got {}",
                catalog::STORE_COUNT,
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(GenError::config(
                "store weights must all be positive and finite",
            ));
        }
        Ok(Some(weights))
    }
}
