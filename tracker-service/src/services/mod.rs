//! Services for tracker-service.

pub mod database;
pub mod ingest;
pub mod metrics;

pub use database::Database;
pub use ingest::{IngestInvoice, IngestOutcome, IngestService, InvoicePreview, PreviewItem};
pub use metrics::{get_metrics, init_metrics};
