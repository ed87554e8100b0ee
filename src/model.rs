//! Typed document structs for every target collection.
//!
//! All documents share the sync-safe shape contract: foreign keys are
//! duplicated as top-level scalar fields, anything independent writers
//! might edit concurrently is a key-addressable map (never a sequence),
//! and every document carries a `deleted` soft-delete flag. Physical
//! deletion is irreversible in the downstream sync fabric, so removal
//! is always expressed by flipping that flag.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowercase month keys for seasonal-multiplier maps, January first.
pub const MONTH_KEYS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Round a monetary value to cents.
pub fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// A retail store. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    #[serde(rename = "_id")]
    pub id: String,
    /// Duplicated for connector-side filtering.
    pub store_id: String,
    pub store_name: String,
    pub is_online: bool,
    pub location: StoreLocation,
    pub deleted: bool,
}

/// Address fields for a physical store. Empty for the online store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A product category with its per-month seasonal demand multipliers.
///
/// The multipliers are a map keyed by [`MONTH_KEYS`] rather than a
/// 12-element array so each month is independently addressable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub category_id: String,
    pub category_name: String,
    pub seasonal_multipliers: BTreeMap<String, f64>,
    pub deleted: bool,
}

impl Category {
    /// Seasonal multiplier for a 1-based calendar month.
    ///
    /// Months absent from the map weigh zero, which the catalog loader
    /// rules out for every category it emits.
    pub fn seasonal_multiplier(&self, month: u32) -> f64 {
        debug_assert!((1..=12).contains(&month));
        MONTH_KEYS
            .get(month as usize - 1)
            .and_then(|k| self.seasonal_multipliers.get(*k))
            .copied()
            .unwrap_or(0.0)
    }
}

/// A product grouping within a category (hammers, drills, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductType {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_type_id: String,
    pub category_id: String,
    pub type_name: String,
    pub deleted: bool,
}

/// A sellable product. `base_price` is derived from cost so that the
/// gross margin is exactly 33%: `base_price = cost / 0.67`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    pub category_id: String,
    pub product_type_id: String,
    pub cost: f64,
    pub base_price: f64,
    pub gross_margin_percent: f64,
    pub product_description: String,
    /// Free-form specification mapping (material, finish, ...).
    pub specifications: BTreeMap<String, String>,
    pub deleted: bool,
}

/// Embedding vectors for one product. Kept in its own collection and
/// never exposed to the sync layer: at ~16-20 KB per document the
/// payload violates the small-document constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEmbedding {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_id: String,
    pub image_embedding: Vec<f32>,
    pub description_embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Physical slot metadata for an inventory record.
///
/// A map, not a sequence: workers editing aisle and bin concurrently
/// must not clobber each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLocation {
    pub aisle: String,
    pub shelf: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,
}

/// Stock of one product at one store.
///
/// The id is a surrogate UUID rather than a (store, product) composite
/// so a product can later occupy multiple physical slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub store_id: String,
    pub product_id: String,
    pub location: SlotLocation,
    pub stock_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_threshold: Option<u32>,
    pub last_updated: DateTime<Utc>,
    pub last_counted: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub deleted: bool,
}

/// A customer with a weighted-choice home store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: String,
    /// Human-legible business identifier (`cust_000001`).
    pub customer_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub primary_store_id: String,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
}

/// An order header. Customer and store details are denormalized as a
/// point-in-time snapshot; summary fields are exact aggregates over the
/// order's items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub store_id: String,
    pub order_date: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub store_name: String,
    pub item_count: u32,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub status: String,
    pub deleted: bool,
}

/// One order line. Stored as an independent document, never embedded in
/// the order, so concurrent edits to sibling lines cannot conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// SKU and name snapshot taken at order time.
    pub sku: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub line_total: f64,
    pub deleted: bool,
}
