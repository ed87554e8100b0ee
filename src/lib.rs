//! Synthesizes a large, internally consistent retail dataset (stores,
//! customers, products, inventory, orders, line items) with realistic
//! seasonal demand and year-over-year growth, shaped for conflict-free
//! distributed sync: no concurrently mutable arrays, duplicated foreign
//! keys, bounded document size, explicit soft-delete flags.
//!
//! The binary drives [`pipeline::generate`] and [`pipeline::persist`];
//! everything else is a stage of that pipeline.

pub mod catalog;
pub mod config;
pub mod demand;
pub mod error;
pub mod ident;
pub mod model;
pub mod pipeline;
pub mod setup;
pub mod store;
pub mod synth;
pub mod writer;
