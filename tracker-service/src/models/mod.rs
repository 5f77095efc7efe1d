//! Domain models for tracker-service.

mod duration;
mod invoice;
mod labour_code;
mod line_item;
mod order;

pub use duration::{
    estimated_completion, format_hours, working_minutes_between, WORK_END_HOUR, WORK_START_HOUR,
};
pub use invoice::{
    finalize_totals, generate_invoice_number, CreateInvoice, Invoice, InvoiceStatus,
    InvoiceTotals, ListInvoicesFilter, RevenueFilter,
};
pub use labour_code::{CreateLabourCode, LabourCode, UpdateLabourCode};
pub use line_item::{CreateLineItem, LineItem, LineType};
pub use order::{
    generate_order_number, CreateOrder, Order, OrderStatus, OrderType, OverdueStatus,
    AUTO_PROGRESS_AFTER_MINUTES, OVERDUE_THRESHOLD_HOURS,
};
