//! Order-type classification and revenue attribution for vehicle service
//! center operations.
//!
//! Raw line items extracted from an invoice flow through aggregation
//! (duplicate collapsing), registry lookup (item code to category), category
//! normalization and order-type detection; the classified items are
//! persisted and later re-read to bucket revenue by order type. The order
//! lifecycle (auto-progression, overdue marking, completion) lives beside
//! the pipeline because invoice classification rewrites the order's type.
//!
//! This crate is invoked in-process by the surrounding application; it
//! exposes no network surface of its own.

pub mod classify;
pub mod config;
pub mod models;
pub mod services;
