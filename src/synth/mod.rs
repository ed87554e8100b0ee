//! Synthesis stages: customers, inventory, order sampling, line items.
//!
//! Each stage fully produces its in-memory output before the next one
//! consumes it; only the batch writer overlaps work with I/O.

pub mod customers;
pub mod inventory;
pub mod items;
pub mod orders;
