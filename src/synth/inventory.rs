//! Sparse inventory matrix with physical slot assignment.

use std::collections::HashSet;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::error::{GenError, Result};
use crate::ident::TokenAllocator;
use crate::model::{InventoryRecord, SlotLocation};

const AISLES: &[&str] = &["1", "2", "3", "4", "5", "A1", "A2", "B1", "B2", "C1"];
const SHELVES: &[&str] = &["A", "B", "C", "D", "Top", "Middle", "Bottom"];
const BINS: &[Option<&str>] = &[None, Some("1"), Some("2"), Some("3"), Some("12"), Some("24"), Some("36")];
const NOTES: &[Option<&str>] = &[
    None,
    None,
    None,
    Some("High demand"),
    Some("Seasonal"),
    Some("Check weekly"),
    Some("Promotional item"),
    Some("Best seller"),
];

/// The online store warehouses a reduced assortment.
const ONLINE_ASSORTMENT_FACTOR: f64 = 0.45;
/// Reorder threshold as a fraction of initial stock.
const REORDER_FRACTION: f64 = 0.2;
const STOCK_FLOOR: u32 = 1;
const STOCK_CEILING: u32 = 250;

/// Build inventory for a configurable fraction of the store x product
/// cross-product. Stock levels are biased up for high-volume stores and
/// popular categories; `(store, product)` pairs are tracked so no pair
/// is ever emitted twice.
pub fn build(
    catalog: &Catalog,
    cfg: &RunConfig,
    rng: &mut StdRng,
    tokens: &mut TokenAllocator,
) -> Result<Vec<InventoryRecord>> {
    // product index -> category index, for the popularity bias.
    let mut product_category = vec![0usize; catalog.products.len()];
    for (cat_idx, members) in catalog.products_by_category.iter().enumerate() {
        for &p in members {
            product_category[p] = cat_idx;
        }
    }

    let mean_weight: f64 =
        catalog.store_weights.iter().sum::<f64>() / catalog.store_weights.len().max(1) as f64;

    let last_updated = cfg
        .end_date
        .and_hms_opt(12, 0, 0)
        .expect("noon is a valid time")
        .and_utc();

    let mut assigned: HashSet<(usize, usize)> = HashSet::new();
    let mut records = Vec::new();

    for (store_idx, store) in catalog.stores.iter().enumerate() {
        let carry_prob = if store.is_online {
            cfg.inventory_coverage * ONLINE_ASSORTMENT_FACTOR
        } else {
            cfg.inventory_coverage
        };

        for (product_idx, product) in catalog.products.iter().enumerate() {
            if !rng.gen_bool(carry_prob) {
                continue;
            }
            if !assigned.insert((store_idx, product_idx)) {
                return Err(GenError::invariant(
                    "inventory",
                    format!(
                        "duplicate (store, product) pair ({}, {})",
                        store.id, product.id
                    ),
                ));
            }

            let bias = (catalog.store_weights[store_idx] / mean_weight)
                * catalog.category_popularity(product_category[product_idx]);
            let base = rng.gen_range(5..=60) as f64;
            let stock_level =
                ((base * bias).round() as u32).clamp(STOCK_FLOOR, STOCK_CEILING);
            let reorder_threshold = rng
                .gen_bool(0.9)
                .then(|| ((stock_level as f64 * REORDER_FRACTION).ceil() as u32).max(2));

            records.push(InventoryRecord {
                id: tokens.allocate(rng)?,
                store_id: store.id.clone(),
                product_id: product.id.clone(),
                location: SlotLocation {
                    aisle: AISLES[rng.gen_range(0..AISLES.len())].to_string(),
                    shelf: SHELVES[rng.gen_range(0..SHELVES.len())].to_string(),
                    bin: BINS[rng.gen_range(0..BINS.len())].map(str::to_string),
                },
                stock_level,
                reorder_threshold,
                last_updated,
                last_counted: last_updated - Duration::days(rng.gen_range(1..=30)),
                notes: NOTES[rng.gen_range(0..NOTES.len())].map(str::to_string),
                deleted: false,
            });
        }
    }

    Ok(records)
}
