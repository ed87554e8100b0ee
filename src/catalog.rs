//! Reference catalog: stores, categories, product types, and synthesized
//! products.
//!
//! The static tables below play the role of the deployment's reference
//! data files. Product records are synthesized from name dictionaries
//! with a seeded RNG, so the catalog is fully reproducible for a given
//! seed.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::RunConfig;
use crate::error::{GenError, Result};
use crate::ident::SlugAllocator;
use crate::model::{
    round_cents, Category, Product, ProductEmbedding, ProductType, Store, StoreLocation,
    MONTH_KEYS,
};

/// Fraction of base price that is cost. Fixed so that
/// `(base_price - cost) / base_price` is exactly the 33% gross margin.
pub const COST_FRACTION: f64 = 0.67;

/// Embedding dimensions, matching the upstream vector models.
pub const IMAGE_EMBEDDING_DIM: usize = 512;
pub const DESCRIPTION_EMBEDDING_DIM: usize = 1536;

const PRODUCTS_PER_TYPE: usize = 12;

struct StoreDef {
    display: &'static str,
    key: &'static str,
    city: Option<&'static str>,
    is_online: bool,
    weight: f64,
}

const STORE_DEFS: [StoreDef; 8] = [
    StoreDef { display: "Evergreen Hardware Seattle", key: "Seattle", city: Some("Seattle"), is_online: false, weight: 9.0 },
    StoreDef { display: "Evergreen Hardware Bellevue", key: "Bellevue", city: Some("Bellevue"), is_online: false, weight: 7.0 },
    StoreDef { display: "Evergreen Hardware Tacoma", key: "Tacoma", city: Some("Tacoma"), is_online: false, weight: 6.0 },
    StoreDef { display: "Evergreen Hardware Redmond", key: "Redmond", city: Some("Redmond"), is_online: false, weight: 5.5 },
    StoreDef { display: "Evergreen Hardware Spokane", key: "Spokane", city: Some("Spokane"), is_online: false, weight: 5.0 },
    StoreDef { display: "Evergreen Hardware Kirkland", key: "Kirkland", city: Some("Kirkland"), is_online: false, weight: 4.5 },
    StoreDef { display: "Evergreen Hardware Everett", key: "Everett", city: Some("Everett"), is_online: false, weight: 4.0 },
    StoreDef { display: "Evergreen Hardware Online", key: "Online", city: None, is_online: true, weight: 10.0 },
];

/// Number of stores in the catalog; `--store-weights` must match this.
pub const STORE_COUNT: usize = STORE_DEFS.len();

struct CategoryDef {
    name: &'static str,
    /// Monthly demand multipliers, January first. Western-Washington
    /// seasonality: gardening peaks late spring, plumbing peaks in the
    /// freeze months, lumber follows the build season.
    seasonal: [f64; 12],
}

const CATEGORY_DEFS: [CategoryDef; 9] = [
    CategoryDef { name: "Hand Tools", seasonal: [0.9, 0.9, 1.0, 1.1, 1.1, 1.1, 1.0, 1.0, 1.1, 1.0, 0.9, 0.9] },
    CategoryDef { name: "Power Tools", seasonal: [0.8, 0.9, 1.1, 1.2, 1.2, 1.1, 1.0, 1.0, 1.1, 1.0, 0.9, 1.1] },
    CategoryDef { name: "Paint & Supplies", seasonal: [0.7, 0.8, 1.1, 1.3, 1.4, 1.3, 1.2, 1.1, 1.0, 0.8, 0.6, 0.5] },
    CategoryDef { name: "Electrical", seasonal: [1.0, 0.9, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.1, 1.1, 1.2] },
    CategoryDef { name: "Plumbing", seasonal: [1.3, 1.2, 1.0, 0.9, 0.9, 0.8, 0.8, 0.8, 0.9, 1.0, 1.2, 1.4] },
    CategoryDef { name: "Garden & Outdoor", seasonal: [0.4, 0.5, 0.9, 1.5, 1.8, 1.7, 1.5, 1.3, 1.0, 0.7, 0.4, 0.3] },
    CategoryDef { name: "Hardware & Fasteners", seasonal: [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0] },
    CategoryDef { name: "Lumber & Building Materials", seasonal: [0.6, 0.7, 1.0, 1.2, 1.3, 1.4, 1.4, 1.3, 1.2, 0.9, 0.6, 0.5] },
    CategoryDef { name: "Safety & Workwear", seasonal: [1.0, 1.0, 1.1, 1.1, 1.0, 1.0, 1.0, 1.0, 1.1, 1.0, 0.9, 0.9] },
];

struct TypeDef {
    category: &'static str,
    name: &'static str,
    /// SKU prefix, unique across all types.
    code: &'static str,
    /// Singular item noun used in product names.
    item: &'static str,
    cost_lo: f64,
    cost_hi: f64,
}

const TYPE_DEFS: &[TypeDef] = &[
    TypeDef { category: "Hand Tools", name: "HAMMERS", code: "HAM", item: "Hammer", cost_lo: 8.0, cost_hi: 35.0 },
    TypeDef { category: "Hand Tools", name: "SCREWDRIVERS", code: "SCR", item: "Screwdriver Set", cost_lo: 6.0, cost_hi: 28.0 },
    TypeDef { category: "Hand Tools", name: "WRENCHES", code: "WRN", item: "Wrench Set", cost_lo: 10.0, cost_hi: 45.0 },
    TypeDef { category: "Power Tools", name: "DRILLS", code: "DRL", item: "Drill", cost_lo: 45.0, cost_hi: 180.0 },
    TypeDef { category: "Power Tools", name: "SAWS", code: "SAW", item: "Saw", cost_lo: 60.0, cost_hi: 240.0 },
    TypeDef { category: "Power Tools", name: "SANDERS", code: "SND", item: "Sander", cost_lo: 35.0, cost_hi: 120.0 },
    TypeDef { category: "Paint & Supplies", name: "INTERIOR_PAINT", code: "PNT", item: "Interior Paint", cost_lo: 18.0, cost_hi: 55.0 },
    TypeDef { category: "Paint & Supplies", name: "BRUSHES_ROLLERS", code: "BRU", item: "Brush Kit", cost_lo: 5.0, cost_hi: 22.0 },
    TypeDef { category: "Paint & Supplies", name: "SPRAYERS", code: "SPY", item: "Paint Sprayer", cost_lo: 50.0, cost_hi: 200.0 },
    TypeDef { category: "Electrical", name: "WIRING", code: "WIR", item: "Wire Spool", cost_lo: 15.0, cost_hi: 80.0 },
    TypeDef { category: "Electrical", name: "OUTLETS_SWITCHES", code: "OUT", item: "Outlet Kit", cost_lo: 4.0, cost_hi: 25.0 },
    TypeDef { category: "Electrical", name: "LIGHTING", code: "LGT", item: "Work Light", cost_lo: 12.0, cost_hi: 60.0 },
    TypeDef { category: "Plumbing", name: "PIPES_FITTINGS", code: "PIP", item: "Fitting Kit", cost_lo: 5.0, cost_hi: 40.0 },
    TypeDef { category: "Plumbing", name: "VALVES", code: "VLV", item: "Valve", cost_lo: 8.0, cost_hi: 35.0 },
    TypeDef { category: "Plumbing", name: "WATER_HEATERS", code: "WHT", item: "Water Heater", cost_lo: 180.0, cost_hi: 520.0 },
    TypeDef { category: "Garden & Outdoor", name: "MOWERS", code: "MOW", item: "Mower", cost_lo: 160.0, cost_hi: 480.0 },
    TypeDef { category: "Garden & Outdoor", name: "HOSES_SPRINKLERS", code: "HOS", item: "Garden Hose", cost_lo: 12.0, cost_hi: 48.0 },
    TypeDef { category: "Garden & Outdoor", name: "PLANTERS", code: "PLT", item: "Planter", cost_lo: 6.0, cost_hi: 30.0 },
    TypeDef { category: "Hardware & Fasteners", name: "SCREWS_BOLTS", code: "SBL", item: "Fastener Pack", cost_lo: 3.0, cost_hi: 18.0 },
    TypeDef { category: "Hardware & Fasteners", name: "ANCHORS", code: "ANC", item: "Anchor Pack", cost_lo: 3.0, cost_hi: 15.0 },
    TypeDef { category: "Hardware & Fasteners", name: "HINGES_LATCHES", code: "HNG", item: "Hinge Set", cost_lo: 4.0, cost_hi: 20.0 },
    TypeDef { category: "Lumber & Building Materials", name: "DIMENSIONAL_LUMBER", code: "LBR", item: "Stud Pack", cost_lo: 8.0, cost_hi: 45.0 },
    TypeDef { category: "Lumber & Building Materials", name: "PLYWOOD", code: "PLY", item: "Plywood Sheet", cost_lo: 20.0, cost_hi: 70.0 },
    TypeDef { category: "Lumber & Building Materials", name: "CONCRETE", code: "CON", item: "Concrete Mix", cost_lo: 5.0, cost_hi: 18.0 },
    TypeDef { category: "Safety & Workwear", name: "GLOVES", code: "GLV", item: "Work Gloves", cost_lo: 4.0, cost_hi: 22.0 },
    TypeDef { category: "Safety & Workwear", name: "EYE_PROTECTION", code: "EYE", item: "Safety Glasses", cost_lo: 3.0, cost_hi: 15.0 },
    TypeDef { category: "Safety & Workwear", name: "RESPIRATORS", code: "RSP", item: "Respirator", cost_lo: 10.0, cost_hi: 45.0 },
];

const BRANDS: &[&str] = &[
    "Evergreen", "Rainier", "Cascade", "TruGrip", "IronPeak", "NorthBend", "Stonewall", "BlueFir",
];

const LINES: [&str; PRODUCTS_PER_TYPE] = [
    "Pro", "Classic", "Heavy-Duty", "Compact", "Precision", "Contractor", "Essential", "Max",
    "Ultra", "Standard", "Deluxe", "Trade",
];

const MATERIALS: &[&str] = &[
    "steel", "aluminum", "composite", "hardwood", "polymer", "stainless steel",
];

/// The loaded reference catalog plus the index maps downstream stages use.
pub struct Catalog {
    pub stores: Vec<Store>,
    /// Static per-store volume weights, parallel to `stores`. Run
    /// configuration, not document data.
    pub store_weights: Vec<f64>,
    pub categories: Vec<Category>,
    pub product_types: Vec<ProductType>,
    pub products: Vec<Product>,
    pub embeddings: Vec<ProductEmbedding>,
    /// Product indices grouped by category, parallel to `categories`.
    pub products_by_category: Vec<Vec<usize>>,
}

impl Catalog {
    /// Load the catalog and synthesize products.
    ///
    /// Fails fast on any broken reference: a type naming an unknown
    /// category, a duplicate business key or SKU prefix, or a category
    /// with no positive seasonal weight.
    pub fn load(cfg: &RunConfig, rng: &mut StdRng) -> Result<Catalog> {
        let mut slugs = SlugAllocator::new();

        let overrides = cfg.store_weight_overrides()?;
        let mut stores = Vec::with_capacity(STORE_DEFS.len());
        let mut store_weights = Vec::with_capacity(STORE_DEFS.len());
        for (i, def) in STORE_DEFS.iter().enumerate() {
            let id = slugs.allocate("store", def.key)?;
            stores.push(Store {
                store_id: id.clone(),
                id,
                store_name: def.display.to_string(),
                is_online: def.is_online,
                location: StoreLocation {
                    city: def.city.map(str::to_string),
                    state: def.city.map(|_| "WA".to_string()),
                },
                deleted: false,
            });
            store_weights.push(match &overrides {
                Some(w) => w[i],
                None => def.weight,
            });
        }

        let mut categories = Vec::with_capacity(CATEGORY_DEFS.len());
        let mut category_index: HashMap<&'static str, usize> = HashMap::new();
        for def in &CATEGORY_DEFS {
            validate_seasonal(def.name, &def.seasonal)?;
            let id = slugs.allocate("cat", def.name)?;
            category_index.insert(def.name, categories.len());
            categories.push(Category {
                category_id: id.clone(),
                id,
                category_name: def.name.to_string(),
                seasonal_multipliers: MONTH_KEYS
                    .iter()
                    .zip(def.seasonal)
                    .map(|(k, v)| ((*k).to_string(), v))
                    .collect(),
                deleted: false,
            });
        }

        let mut product_types = Vec::with_capacity(TYPE_DEFS.len());
        let mut products = Vec::new();
        let mut embeddings = Vec::new();
        let mut products_by_category = vec![Vec::new(); categories.len()];
        let mut sku_prefixes = HashSet::new();
        let created_at = Utc::now();

        for def in TYPE_DEFS {
            let cat_idx = *category_index.get(def.category).ok_or_else(|| {
                GenError::config(format!(
                    "product type '{}' references unknown category '{}'",
                    def.name, def.category
                ))
            })?;
            if !sku_prefixes.insert(def.code) {
                return Err(GenError::config(format!(
                    "duplicate SKU prefix '{}' in product type table",
                    def.code
                )));
            }
            let type_id = slugs.allocate("type", def.name)?;
            let category_id = categories[cat_idx].id.clone();
            product_types.push(ProductType {
                product_type_id: type_id.clone(),
                id: type_id.clone(),
                category_id: category_id.clone(),
                type_name: def.name.to_string(),
                deleted: false,
            });

            for (i, line) in LINES.iter().enumerate() {
                let brand = BRANDS[rng.gen_range(0..BRANDS.len())];
                let material = MATERIALS[rng.gen_range(0..MATERIALS.len())];
                let sku = format!("{}-{:04}", def.code, i + 1);
                let product_id = format!("prod_{}", sku.to_lowercase().replace('-', "_"));
                let cost = round_cents(rng.gen_range(def.cost_lo..=def.cost_hi));
                // Left unrounded so the margin identity holds exactly.
                let base_price = cost / COST_FRACTION;

                let mut specifications = BTreeMap::new();
                specifications.insert("brand".to_string(), brand.to_string());
                specifications.insert("material".to_string(), material.to_string());
                specifications.insert(
                    "weight_kg".to_string(),
                    format!("{:.1}", rng.gen_range(0.2..12.0)),
                );

                products_by_category[cat_idx].push(products.len());
                embeddings.push(ProductEmbedding {
                    id: product_id.clone(),
                    product_id: product_id.clone(),
                    image_embedding: random_vector(rng, IMAGE_EMBEDDING_DIM),
                    description_embedding: random_vector(rng, DESCRIPTION_EMBEDDING_DIM),
                    created_at,
                });
                products.push(Product {
                    product_id: product_id.clone(),
                    id: product_id,
                    sku,
                    product_name: format!("{brand} {line} {}", def.item),
                    category_id: category_id.clone(),
                    product_type_id: type_id.clone(),
                    cost,
                    base_price,
                    gross_margin_percent: 33.0,
                    product_description: format!(
                        "{} {} from the {brand} {line} line, built for daily site work.",
                        material_article(material),
                        def.item.to_lowercase()
                    ),
                    specifications,
                    deleted: false,
                });
            }
        }

        Ok(Catalog {
            stores,
            store_weights,
            categories,
            product_types,
            products,
            embeddings,
            products_by_category,
        })
    }

    /// Mean seasonal multiplier of a category, used as a popularity proxy.
    pub fn category_popularity(&self, cat_idx: usize) -> f64 {
        let cat = &self.categories[cat_idx];
        let sum: f64 = cat.seasonal_multipliers.values().sum();
        sum / cat.seasonal_multipliers.len().max(1) as f64
    }
}

/// Reject a seasonal map with no positive weight anywhere in the year,
/// or with a negative weight in any month.
fn validate_seasonal(name: &str, seasonal: &[f64; 12]) -> Result<()> {
    if seasonal.iter().any(|m| *m < 0.0 || !m.is_finite()) {
        return Err(GenError::config(format!(
            "category '{name}' has a negative or non-finite seasonal multiplier"
        )));
    }
    if seasonal.iter().all(|m| *m <= 0.0) {
        return Err(GenError::config(format!(
            "category '{name}' has no positive seasonal multiplier; it could never sell"
        )));
    }
    Ok(())
}

fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn material_article(material: &str) -> &'static str {
    match material.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "An",
        _ => "A",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clap::Parser;
    use rand::SeedableRng;

    fn load_default() -> Catalog {
        let cfg = RunConfig::parse_from(["test"]);
        let mut rng = StdRng::seed_from_u64(1);
        Catalog::load(&cfg, &mut rng).expect("catalog must load")
    }

    #[test]
    fn test_counts_and_unique_ids() {
        let catalog = load_default();
        assert_eq!(catalog.stores.len(), STORE_COUNT);
        assert_eq!(catalog.categories.len(), 9);
        assert_eq!(catalog.products.len(), TYPE_DEFS.len() * PRODUCTS_PER_TYPE);
        assert_eq!(catalog.embeddings.len(), catalog.products.len());

        let mut ids = HashSet::new();
        for s in &catalog.stores {
            assert!(ids.insert(s.id.clone()), "duplicate store id {}", s.id);
        }
        for c in &catalog.categories {
            assert!(ids.insert(c.id.clone()), "duplicate category id {}", c.id);
        }
        let mut skus = HashSet::new();
        for p in &catalog.products {
            assert!(ids.insert(p.id.clone()), "duplicate product id {}", p.id);
            assert!(skus.insert(p.sku.clone()), "duplicate SKU {}", p.sku);
        }
    }

    #[test]
    fn test_gross_margin_identity() {
        let catalog = load_default();
        for p in &catalog.products {
            assert_relative_eq!(
                (p.base_price - p.cost) / p.base_price,
                0.33,
                epsilon = 1e-9
            );
            assert!(p.cost > 0.0 && p.base_price > p.cost);
        }
    }

    #[test]
    fn test_seasonal_maps_complete_and_positive_somewhere() {
        let catalog = load_default();
        for c in &catalog.categories {
            assert_eq!(c.seasonal_multipliers.len(), 12, "{}", c.category_name);
            assert!(
                (1..=12).any(|m| c.seasonal_multiplier(m) > 0.0),
                "{} has no positive month",
                c.category_name
            );
        }
    }

    #[test]
    fn test_validate_seasonal_rejects_dead_category() {
        assert!(validate_seasonal("dead", &[0.0; 12]).is_err());
        let mut negative = [1.0; 12];
        negative[3] = -0.5;
        assert!(validate_seasonal("neg", &negative).is_err());
        assert!(validate_seasonal("ok", &[1.0; 12]).is_ok());
    }

    #[test]
    fn test_embedding_dimensions() {
        let catalog = load_default();
        for e in &catalog.embeddings {
            assert_eq!(e.image_embedding.len(), IMAGE_EMBEDDING_DIM);
            assert_eq!(e.description_embedding.len(), DESCRIPTION_EMBEDDING_DIM);
        }
    }

    #[test]
    fn test_products_by_category_covers_everything() {
        let catalog = load_default();
        let total: usize = catalog.products_by_category.iter().map(Vec::len).sum();
        assert_eq!(total, catalog.products.len());
        for (cat_idx, members) in catalog.products_by_category.iter().enumerate() {
            for &p in members {
                assert_eq!(
                    catalog.products[p].category_id,
                    catalog.categories[cat_idx].id
                );
            }
        }
    }

    #[test]
    fn test_store_weight_overrides_applied() {
        let mut cfg = RunConfig::parse_from(["test"]);
        cfg.store_weights = Some(
            std::iter::repeat("3.5")
                .take(STORE_COUNT)
                .collect::<Vec<_>>()
                .join(","),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let catalog = Catalog::load(&cfg, &mut rng).unwrap();
        assert!(catalog.store_weights.iter().all(|w| *w == 3.5));
    }
}
