//! Customer synthesis with weighted home-store affinity.

use std::collections::HashSet;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::error::{GenError, Result};
use crate::ident::TokenAllocator;
use crate::model::Customer;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Carlos", "Karen", "Daniel", "Lisa", "Matthew", "Nancy", "Anthony", "Betty", "Mark", "Sandra",
    "Amir", "Ashley", "Steven", "Kimberly", "Andrew", "Emily", "Kenji", "Donna", "Joshua",
    "Michelle", "Kevin", "Carol", "Brian", "Amanda", "George", "Melissa", "Priya", "Deborah",
    "Edward", "Stephanie",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright",
    "Scott", "Torres", "Nguyen", "Hill", "Flores", "Green", "Adams", "Nelson", "Baker", "Hall",
    "Rivera", "Campbell", "Mitchell",
];

const EMAIL_DOMAINS: &[&str] = &[
    "example.com", "mail.example.com", "inbox.example.net", "post.example.org",
];

/// Resampling budget for a colliding email before the run aborts.
const MAX_EMAIL_ATTEMPTS: u32 = 8;

/// How far before the range start a customer account may have been
/// created, in days.
const ACCOUNT_AGE_DAYS: i64 = 5 * 365;

/// Generate `cfg.customers` customer records.
///
/// Home stores follow the catalog's volume weights, so flagship and
/// online stores accumulate proportionally more customers. Must run to
/// completion before order sampling, which references the output.
pub fn generate(
    catalog: &Catalog,
    cfg: &RunConfig,
    rng: &mut StdRng,
    tokens: &mut TokenAllocator,
) -> Result<Vec<Customer>> {
    let cumulative = cumulative_weights(&catalog.store_weights);
    let total_weight = *cumulative
        .last()
        .ok_or_else(|| GenError::invariant("customers", "catalog has no stores"))?;

    let mut customers = Vec::with_capacity(cfg.customers);
    let mut emails: HashSet<String> = HashSet::with_capacity(cfg.customers);

    for i in 0..cfg.customers {
        let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
        let email = allocate_email(first, last, &mut emails, rng)?;

        let store_idx = {
            let r = rng.gen::<f64>() * total_weight;
            let idx = cumulative.partition_point(|c| *c <= r);
            idx.min(catalog.stores.len() - 1)
        };

        let created_date = cfg.start_date - Duration::days(rng.gen_range(0..=ACCOUNT_AGE_DAYS));
        let created_at = created_date
            .and_hms_opt(rng.gen_range(0..24), rng.gen_range(0..60), rng.gen_range(0..60))
            .expect("in-range time components")
            .and_utc();

        let id = tokens.allocate(rng)?;
        customers.push(Customer {
            customer_id: id.clone(),
            id,
            customer_number: format!("cust_{:06}", i + 1),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email,
            phone: phone_number(rng),
            primary_store_id: catalog.stores[store_idx].id.clone(),
            created_at,
            deleted: false,
        });
    }

    Ok(customers)
}

/// Prefix-sum of store weights for categorical sampling.
fn cumulative_weights(weights: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    weights
        .iter()
        .map(|w| {
            acc += w;
            acc
        })
        .collect()
}

/// North American phone format, matching the source dataset.
fn phone_number(rng: &mut StdRng) -> String {
    format!(
        "({}) {}-{:04}",
        rng.gen_range(200..=999),
        rng.gen_range(200..=999),
        rng.gen_range(0..=9999)
    )
}

/// Build a unique email, resampling with a numeric suffix on collision.
fn allocate_email(
    first: &str,
    last: &str,
    taken: &mut HashSet<String>,
    rng: &mut StdRng,
) -> Result<String> {
    for attempt in 0..MAX_EMAIL_ATTEMPTS {
        let domain = EMAIL_DOMAINS[rng.gen_range(0..EMAIL_DOMAINS.len())];
        let candidate = if attempt == 0 {
            format!(
                "{}.{}@{domain}",
                first.to_lowercase(),
                last.to_lowercase()
            )
        } else {
            format!(
                "{}.{}{}@{domain}",
                first.to_lowercase(),
                last.to_lowercase(),
                rng.gen_range(1..=99_999)
            )
        };
        if taken.insert(candidate.clone()) {
            return Ok(candidate);
        }
    }
    Err(GenError::Collision {
        stage: "customer email",
        attempts: MAX_EMAIL_ATTEMPTS,
        detail: format!("could not find a free address for {first} {last}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rand::SeedableRng;

    fn generate_n(n: usize) -> (Catalog, Vec<Customer>) {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.customers = n;
        let mut rng = StdRng::seed_from_u64(5);
        let catalog = Catalog::load(&cfg, &mut rng).unwrap();
        let mut tokens = TokenAllocator::new();
        let customers = generate(&catalog, &cfg, &mut rng, &mut tokens).unwrap();
        (catalog, customers)
    }

    #[test]
    fn test_count_and_unique_emails() {
        let (_, customers) = generate_n(2_000);
        assert_eq!(customers.len(), 2_000);
        let emails: HashSet<_> = customers.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails.len(), customers.len(), "emails must be unique");
    }

    #[test]
    fn test_home_stores_resolve_and_follow_weights() {
        let (catalog, customers) = generate_n(10_000);
        let ids: HashSet<_> = catalog.stores.iter().map(|s| s.id.as_str()).collect();
        for c in &customers {
            assert!(ids.contains(c.primary_store_id.as_str()));
            assert!(!c.deleted);
        }

        // The heaviest store should clearly out-draw the lightest.
        let count_for = |store_id: &str| {
            customers
                .iter()
                .filter(|c| c.primary_store_id == store_id)
                .count()
        };
        let heaviest = catalog
            .store_weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| &catalog.stores[i])
            .unwrap();
        let lightest = catalog
            .store_weights
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| &catalog.stores[i])
            .unwrap();
        assert!(count_for(&heaviest.id) > count_for(&lightest.id));
    }

    #[test]
    fn test_created_before_range_start() {
        let (_, customers) = generate_n(500);
        let cfg = RunConfig::parse_from(["test"]);
        let cutoff = cfg
            .start_date
            .succ_opt()
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        for c in &customers {
            assert!(c.created_at < cutoff);
        }
    }

    #[test]
    fn test_business_numbers_sequential() {
        let (_, customers) = generate_n(12);
        assert_eq!(customers[0].customer_number, "cust_000001");
        assert_eq!(customers[11].customer_number, "cust_000012");
    }

    #[test]
    fn test_email_collision_exhaustion() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut taken = HashSet::new();
        // Pre-poison the base address; suffixed retries still succeed.
        taken.insert("james.smith@example.com".to_string());
        for domain in EMAIL_DOMAINS {
            taken.insert(format!("james.smith@{domain}"));
        }
        let got = allocate_email("James", "Smith", &mut taken, &mut rng).unwrap();
        assert!(got.starts_with("james.smith"));
    }
}
