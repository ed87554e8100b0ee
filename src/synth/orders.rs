//! Order sampling from the demand model's weighted distribution.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::demand::DemandModel;
use crate::error::{GenError, Result};
use crate::model::{Customer, Order};

/// An order header plus the demand category it was drawn under. The
/// category drives line-item selection and is then discarded; it is not
/// a persisted order field.
#[derive(Debug)]
pub struct OrderSkeleton {
    pub order: Order,
    pub category_idx: usize,
}

/// Draw `cfg.orders` orders from the demand distribution.
///
/// Each draw picks a (store, category, year, month) cell, a uniform
/// day and time within that month clamped to the configured range, and
/// a customer homed at the drawn store. A store that attracted no
/// customers falls back to a uniform pick over all customers, so
/// low-weight stores are never fatal.
pub fn sample(
    catalog: &Catalog,
    customers: &[Customer],
    demand: &DemandModel,
    cfg: &RunConfig,
    rng: &mut StdRng,
) -> Result<Vec<OrderSkeleton>> {
    if customers.is_empty() {
        return Err(GenError::invariant(
            "order sampler",
            "no customers available; customer synthesis must run first",
        ));
    }

    let mut by_store: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, c) in customers.iter().enumerate() {
        by_store.entry(c.primary_store_id.as_str()).or_default().push(i);
    }

    let mut day_seq: HashMap<NaiveDate, u32> = HashMap::new();
    let mut fallback_seen = false;
    let mut skeletons = Vec::with_capacity(cfg.orders);

    for _ in 0..cfg.orders {
        let cell = demand.sample(rng);
        let store = &catalog.stores[cell.store_idx];

        let order_date = sample_instant(cell.year, cell.month, cfg, rng);
        debug_assert!(
            order_date.date_naive() >= cfg.start_date && order_date.date_naive() <= cfg.end_date
        );

        let customer_idx = match by_store.get(store.id.as_str()) {
            Some(local) if !local.is_empty() => local[rng.gen_range(0..local.len())],
            _ => {
                if !fallback_seen {
                    tracing::debug!(
                        store = %store.id,
                        "store has no homed customers; falling back to uniform pick"
                    );
                    fallback_seen = true;
                }
                rng.gen_range(0..customers.len())
            }
        };
        let customer = &customers[customer_idx];

        let date = order_date.date_naive();
        let seq = day_seq.entry(date).or_insert(0);
        *seq += 1;
        let order_id = format!("ord-{}-{:04}", date.format("%Y%m%d"), seq);

        skeletons.push(OrderSkeleton {
            order: Order {
                order_id: order_id.clone(),
                id: order_id,
                customer_id: customer.id.clone(),
                store_id: store.id.clone(),
                order_date,
                customer_name: format!("{} {}", customer.first_name, customer.last_name),
                customer_email: customer.email.clone(),
                store_name: store.store_name.clone(),
                item_count: 0,
                subtotal: 0.0,
                tax: 0.0,
                total: 0.0,
                status: "completed".to_string(),
                deleted: false,
            },
            category_idx: cell.category_idx,
        });
    }

    Ok(skeletons)
}

/// Uniform instant within the given month, clamped to the run's
/// start/end dates. Calendar validity (lengths of months, leap years)
/// comes from walking real dates rather than arithmetic on day numbers.
fn sample_instant(
    year: i32,
    month: u32,
    cfg: &RunConfig,
    rng: &mut StdRng,
) -> chrono::DateTime<chrono::Utc> {
    let month_first =
        NaiveDate::from_ymd_opt(year, month, 1).expect("demand cells carry valid months");
    let month_last = last_day_of_month(year, month);
    let lo = month_first.max(cfg.start_date);
    let hi = month_last.min(cfg.end_date);

    let span = (hi - lo).num_days();
    let date = lo + Duration::days(rng.gen_range(0..=span));
    let secs = rng.gen_range(0..86_400);
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
        + Duration::seconds(secs)
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .expect("valid successor month")
        .pred_opt()
        .expect("month has a last day")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::TokenAllocator;
    use crate::synth::customers;
    use clap::Parser;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn run_sampler(cfg: &RunConfig) -> (Catalog, Vec<Customer>, Vec<OrderSkeleton>) {
        let mut rng = StdRng::seed_from_u64(21);
        let catalog = Catalog::load(cfg, &mut rng).unwrap();
        let mut tokens = TokenAllocator::new();
        let custs = customers::generate(&catalog, cfg, &mut rng, &mut tokens).unwrap();
        let demand = DemandModel::build(&catalog, cfg).unwrap();
        let skeletons = sample(&catalog, &custs, &demand, cfg, &mut rng).unwrap();
        (catalog, custs, skeletons)
    }

    #[test]
    fn test_order_count_and_date_bounds() {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.customers = 50;
        cfg.orders = 500;
        cfg.start_date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        cfg.end_date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let (_, _, skeletons) = run_sampler(&cfg);
        assert_eq!(skeletons.len(), 500);
        for s in &skeletons {
            let d = s.order.order_date.date_naive();
            assert!(d >= cfg.start_date && d <= cfg.end_date, "out of range: {d}");
        }
    }

    #[test]
    fn test_order_ids_unique_and_formatted() {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.customers = 20;
        cfg.orders = 300;
        cfg.start_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        cfg.end_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let (_, _, skeletons) = run_sampler(&cfg);
        let mut ids = HashSet::new();
        for s in &skeletons {
            assert!(s.order.order_id.starts_with("ord-202406"));
            assert!(ids.insert(s.order.order_id.clone()), "dup {}", s.order.order_id);
        }
    }

    #[test]
    fn test_references_resolve() {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.customers = 30;
        cfg.orders = 200;
        let (catalog, custs, skeletons) = run_sampler(&cfg);
        let customer_ids: HashSet<_> = custs.iter().map(|c| c.id.as_str()).collect();
        let store_ids: HashSet<_> = catalog.stores.iter().map(|s| s.id.as_str()).collect();
        for s in &skeletons {
            assert!(customer_ids.contains(s.order.customer_id.as_str()));
            assert!(store_ids.contains(s.order.store_id.as_str()));
            assert!(s.category_idx < catalog.categories.len());
            assert!(!s.order.deleted);
            assert_eq!(s.order.status, "completed");
        }
    }

    #[test]
    fn test_snapshot_matches_customer() {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.customers = 10;
        cfg.orders = 50;
        let (_, custs, skeletons) = run_sampler(&cfg);
        for s in &skeletons {
            let c = custs.iter().find(|c| c.id == s.order.customer_id).unwrap();
            assert_eq!(s.order.customer_email, c.email);
            assert_eq!(
                s.order.customer_name,
                format!("{} {}", c.first_name, c.last_name)
            );
        }
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 12),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_empty_customer_pool_is_invariant_error() {
        let cfg = RunConfig::parse_from(["test"]);
        let mut rng = StdRng::seed_from_u64(1);
        let catalog = Catalog::load(&cfg, &mut rng).unwrap();
        let demand = DemandModel::build(&catalog, &cfg).unwrap();
        let err = sample(&catalog, &[], &demand, &cfg, &mut rng).unwrap_err();
        assert!(matches!(err, GenError::Invariant { .. }));
    }
}
