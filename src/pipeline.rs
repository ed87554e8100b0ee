//! End-to-end generation pipeline.
//!
//! Stages run strictly in sequence, each fully materializing its output
//! before the next consumes it. Persistence runs last, one collection
//! at a time in dependency order, so no document ever lands in the
//! target store before the parents it references.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::demand::DemandModel;
use crate::error::Result;
use crate::ident::TokenAllocator;
use crate::model::{
    Category, Customer, InventoryRecord, Order, OrderItem, Product, ProductEmbedding,
    ProductType, Store,
};
use crate::store::DocumentStore;
use crate::synth;
use crate::writer::{self, WriteReport, WriterOptions};

/// The complete generated dataset, one vector per target collection.
pub struct Dataset {
    pub stores: Vec<Store>,
    pub categories: Vec<Category>,
    pub product_types: Vec<ProductType>,
    pub products: Vec<Product>,
    pub embeddings: Vec<ProductEmbedding>,
    pub customers: Vec<Customer>,
    pub inventory: Vec<InventoryRecord>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

impl Dataset {
    pub fn total_documents(&self) -> usize {
        self.stores.len()
            + self.categories.len()
            + self.product_types.len()
            + self.products.len()
            + self.embeddings.len()
            + self.customers.len()
            + self.inventory.len()
            + self.orders.len()
            + self.order_items.len()
    }
}

/// Run every generation stage. Pure in-memory work; no I/O.
pub fn generate(cfg: &RunConfig) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut tokens = TokenAllocator::new();

    let catalog = Catalog::load(cfg, &mut rng)?;
    tracing::info!(
        stores = catalog.stores.len(),
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "Catalog loaded"
    );

    let customers = synth::customers::generate(&catalog, cfg, &mut rng, &mut tokens)?;
    tracing::info!(customers = customers.len(), "Customers synthesized");

    let inventory = synth::inventory::build(&catalog, cfg, &mut rng, &mut tokens)?;
    tracing::info!(records = inventory.len(), "Inventory matrix built");

    let demand = DemandModel::build(&catalog, cfg)?;
    tracing::info!(cells = demand.cells().len(), "Demand grid computed");

    let mut skeletons = synth::orders::sample(&catalog, &customers, &demand, cfg, &mut rng)?;
    let order_items = synth::items::compose(&mut skeletons, &catalog, cfg, &mut rng, &mut tokens)?;
    tracing::info!(
        orders = skeletons.len(),
        items = order_items.len(),
        "Orders sampled and composed"
    );

    let orders = skeletons.into_iter().map(|s| s.order).collect();

    let Catalog {
        stores,
        categories,
        product_types,
        products,
        embeddings,
        ..
    } = catalog;

    Ok(Dataset {
        stores,
        categories,
        product_types,
        products,
        embeddings,
        customers,
        inventory,
        orders,
        order_items,
    })
}

/// Persist the dataset, collection by collection in dependency order.
pub async fn persist(
    dataset: &Dataset,
    store: &Arc<dyn DocumentStore>,
    cfg: &RunConfig,
) -> Result<Vec<WriteReport>> {
    let opts = WriterOptions {
        batch_size: cfg.batch_size,
        concurrency: cfg.concurrency,
        max_attempts: cfg.max_write_attempts,
    };
    let total = dataset.total_documents();
    let progress = Arc::new(AtomicUsize::new(0));

    // Parents strictly before children.
    let passes: [(&'static str, Vec<serde_json::Value>); 9] = [
        ("stores", writer::to_documents(&dataset.stores)?),
        ("categories", writer::to_documents(&dataset.categories)?),
        ("product_types", writer::to_documents(&dataset.product_types)?),
        ("products", writer::to_documents(&dataset.products)?),
        ("product_embeddings", writer::to_documents(&dataset.embeddings)?),
        ("customers", writer::to_documents(&dataset.customers)?),
        ("inventory", writer::to_documents(&dataset.inventory)?),
        ("orders", writer::to_documents(&dataset.orders)?),
        ("order_items", writer::to_documents(&dataset.order_items)?),
    ];

    let mut reports = Vec::with_capacity(passes.len());
    for (collection, documents) in passes {
        let report =
            writer::write_collection(store, collection, documents, opts, &progress, total).await?;
        reports.push(report);
    }
    Ok(reports)
}
