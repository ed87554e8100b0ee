//! Line-item composition and exact order-total aggregation.

use std::collections::HashSet;

use chrono::Datelike;
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::error::{GenError, Result};
use crate::ident::TokenAllocator;
use crate::model::{round_cents, OrderItem};
use crate::synth::orders::OrderSkeleton;

/// Small-integer quantity distribution, skewed toward 1.
const QUANTITY_CHOICES: &[u32] = &[1, 1, 1, 1, 2, 2, 3, 4];
const DISCOUNT_PERCENTS: &[f64] = &[5.0, 10.0, 15.0, 20.0, 25.0];

/// Seasonal multiplier above which a month counts as peak season for
/// discount purposes.
const PEAK_THRESHOLD: f64 = 1.3;
const PEAK_DISCOUNT_BOOST: f64 = 1.75;
/// Cap so a boosted probability stays a probability.
const MAX_DISCOUNT_PROB: f64 = 0.9;

/// Selection attempts before the picker stops trying to find another
/// distinct product for an order.
const MAX_PICK_ATTEMPTS: usize = 100;

/// Compose items for every order skeleton and fill in the orders'
/// summary fields by aggregation.
///
/// Totals are never drawn independently: `item_count`, `subtotal`,
/// `tax`, and `total` all derive from the composed items so the
/// round-trip property holds exactly.
pub fn compose(
    skeletons: &mut [OrderSkeleton],
    catalog: &Catalog,
    cfg: &RunConfig,
    rng: &mut StdRng,
    tokens: &mut TokenAllocator,
) -> Result<Vec<OrderItem>> {
    if catalog.products.is_empty() {
        return Err(GenError::invariant(
            "line items",
            "catalog has no products to select from",
        ));
    }

    let mut items = Vec::with_capacity(skeletons.len() * 2);

    for skeleton in skeletons.iter_mut() {
        let month = skeleton.order.order_date.month();
        let category = &catalog.categories[skeleton.category_idx];
        let peak = category.seasonal_multiplier(month) >= PEAK_THRESHOLD;
        let discount_prob = if peak {
            (cfg.discount_prob * PEAK_DISCOUNT_BOOST).min(MAX_DISCOUNT_PROB)
        } else {
            cfg.discount_prob
        };

        let picks = pick_products(catalog, skeleton.category_idx, cfg, rng);
        debug_assert!(!picks.is_empty());

        let mut subtotal = 0.0;
        for product_idx in &picks {
            let product = &catalog.products[*product_idx];
            let quantity = QUANTITY_CHOICES[rng.gen_range(0..QUANTITY_CHOICES.len())];
            let unit_price = round_cents(product.base_price);
            let discount_percent = if rng.gen_bool(discount_prob) {
                DISCOUNT_PERCENTS[rng.gen_range(0..DISCOUNT_PERCENTS.len())]
            } else {
                0.0
            };

            let gross = quantity as f64 * unit_price;
            let line_total = round_cents(gross * (1.0 - discount_percent / 100.0));
            let discount_amount = round_cents(gross - line_total);
            subtotal += line_total;

            items.push(OrderItem {
                id: tokens.allocate(rng)?,
                order_id: skeleton.order.id.clone(),
                product_id: product.id.clone(),
                sku: product.sku.clone(),
                product_name: product.product_name.clone(),
                quantity,
                unit_price,
                discount_percent,
                discount_amount,
                line_total,
                deleted: false,
            });
        }

        let order = &mut skeleton.order;
        order.item_count = picks.len() as u32;
        order.subtotal = round_cents(subtotal);
        order.tax = round_cents(order.subtotal * cfg.tax_rate);
        order.total = round_cents(order.subtotal + order.tax);
    }

    Ok(items)
}

/// Select 1..=max distinct products, biased toward the order's demand
/// category with a configurable cross-sell probability.
fn pick_products(
    catalog: &Catalog,
    category_idx: usize,
    cfg: &RunConfig,
    rng: &mut StdRng,
) -> Vec<usize> {
    let pool = &catalog.products_by_category[category_idx];
    let target = (rng.gen_range(1..=cfg.max_items_per_order) as usize)
        .min(catalog.products.len());

    let mut chosen: HashSet<usize> = HashSet::with_capacity(target);
    let mut attempts = 0;
    while chosen.len() < target && attempts < MAX_PICK_ATTEMPTS {
        attempts += 1;
        let candidate = if !pool.is_empty() && !rng.gen_bool(cfg.cross_sell) {
            pool[rng.gen_range(0..pool.len())]
        } else {
            rng.gen_range(0..catalog.products.len())
        };
        chosen.insert(candidate);
    }
    if chosen.is_empty() {
        // Deterministic fallback; only reachable with a degenerate catalog.
        chosen.insert(rng.gen_range(0..catalog.products.len()));
    }
    chosen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::DemandModel;
    use crate::synth::{customers, orders};
    use chrono::NaiveDate;
    use clap::Parser;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn compose_run(orders_n: usize) -> (Vec<OrderSkeleton>, Vec<OrderItem>, Catalog) {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.customers = 40;
        cfg.orders = orders_n;
        cfg.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        cfg.end_date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        let catalog = Catalog::load(&cfg, &mut rng).unwrap();
        let mut tokens = TokenAllocator::new();
        let custs = customers::generate(&catalog, &cfg, &mut rng, &mut tokens).unwrap();
        let demand = DemandModel::build(&catalog, &cfg).unwrap();
        let mut skeletons = orders::sample(&catalog, &custs, &demand, &cfg, &mut rng).unwrap();
        let items = compose(&mut skeletons, &catalog, &cfg, &mut rng, &mut tokens).unwrap();
        (skeletons, items, catalog)
    }

    #[test]
    fn test_item_count_matches_items() {
        let (skeletons, items, _) = compose_run(300);
        for s in &skeletons {
            let n = items.iter().filter(|i| i.order_id == s.order.id).count();
            assert_eq!(n as u32, s.order.item_count, "order {}", s.order.id);
            assert!((1..=5).contains(&n));
        }
    }

    #[test]
    fn test_totals_aggregate_exactly() {
        let (skeletons, items, _) = compose_run(300);
        for s in &skeletons {
            let sum: f64 = items
                .iter()
                .filter(|i| i.order_id == s.order.id)
                .map(|i| i.line_total)
                .sum();
            assert!(
                (s.order.subtotal - round_cents(sum)).abs() < 0.005,
                "subtotal mismatch for {}",
                s.order.id
            );
            let expected_total = round_cents(s.order.subtotal + s.order.tax);
            assert!((s.order.total - expected_total).abs() < 0.005);
        }
    }

    #[test]
    fn test_line_math_and_snapshots() {
        let (_, items, catalog) = compose_run(200);
        for item in &items {
            Uuid::parse_str(&item.id).expect("item id must be a UUID");
            let product = catalog
                .products
                .iter()
                .find(|p| p.id == item.product_id)
                .expect("item references a real product");
            assert_eq!(item.sku, product.sku);
            assert_eq!(item.product_name, product.product_name);
            assert!(QUANTITY_CHOICES.contains(&item.quantity));

            let gross = item.quantity as f64 * item.unit_price;
            let expected =
                round_cents(gross * (1.0 - item.discount_percent / 100.0));
            assert!((item.line_total - expected).abs() < 0.005);
            assert!((item.discount_amount - round_cents(gross - expected)).abs() < 0.005);
            assert!(!item.deleted);
        }
    }

    #[test]
    fn test_products_distinct_within_order() {
        let (skeletons, items, _) = compose_run(150);
        for s in &skeletons {
            let mut seen = HashSet::new();
            for i in items.iter().filter(|i| i.order_id == s.order.id) {
                assert!(seen.insert(i.product_id.clone()), "dup product in {}", s.order.id);
            }
        }
    }

    #[test]
    fn test_category_bias_dominates() {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.cross_sell = 0.1;
        let mut rng = StdRng::seed_from_u64(33);
        let catalog = Catalog::load(&cfg, &mut rng).unwrap();
        let cat_idx = 0;
        let mut in_category = 0;
        let mut total = 0;
        for _ in 0..500 {
            for p in pick_products(&catalog, cat_idx, &cfg, &mut rng) {
                total += 1;
                if catalog.products_by_category[cat_idx].contains(&p) {
                    in_category += 1;
                }
            }
        }
        assert!(
            in_category * 2 > total,
            "category products should dominate ({in_category}/{total})"
        );
    }
}
