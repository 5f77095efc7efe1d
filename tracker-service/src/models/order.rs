//! Order model and lifecycle for tracker-service.

use super::duration::working_minutes_between;
use super::line_item::LineType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

/// Minutes after creation before an order auto-progresses to in-progress.
pub const AUTO_PROGRESS_AFTER_MINUTES: i64 = 10;

/// Calendar hours in progress before an order counts as overdue.
pub const OVERDUE_THRESHOLD_HOURS: i64 = 2;

/// Business classification of an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Inquiry,
    Labour,
    Mixed,
    Sales,
    Service,
    Unspecified,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Inquiry => "inquiry",
            OrderType::Labour => "labour",
            OrderType::Mixed => "mixed",
            OrderType::Sales => "sales",
            OrderType::Service => "service",
            OrderType::Unspecified => "unspecified",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "inquiry" => OrderType::Inquiry,
            "labour" => OrderType::Labour,
            "mixed" => OrderType::Mixed,
            "sales" => OrderType::Sales,
            "service" => OrderType::Service,
            _ => OrderType::Unspecified,
        }
    }

    /// Human-readable name for dashboards and order lists.
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderType::Inquiry => "Inquiry",
            OrderType::Labour => "Labour",
            OrderType::Mixed => "Mixed",
            OrderType::Sales => "Sales",
            OrderType::Service => "Service",
            OrderType::Unspecified => "Unspecified",
        }
    }

    /// Display string showing the component types of a mixed order, e.g.
    /// "Labour and Service". Non-mixed orders render their plain name.
    pub fn display_with_components(&self, components: &[LineType]) -> String {
        if *self == OrderType::Mixed && !components.is_empty() {
            let mut sorted: Vec<LineType> = components.to_vec();
            sorted.sort();
            sorted.dedup();
            sorted
                .into_iter()
                .map(|component| OrderType::from(component).display_name())
                .collect::<Vec<_>>()
                .join(" and ")
        } else {
            self.display_name().to_string()
        }
    }
}

impl From<LineType> for OrderType {
    fn from(line_type: LineType) -> Self {
        match line_type {
            LineType::Labour => OrderType::Labour,
            LineType::Sales => OrderType::Sales,
            LineType::Service => OrderType::Service,
            LineType::Unspecified => OrderType::Unspecified,
        }
    }
}

/// Order status.
///
/// Lifecycle: created -> in_progress -> (overdue or completed or cancelled).
/// Completed and cancelled are terminal. Inquiry orders skip the lifecycle
/// entirely and are completed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    InProgress,
    Overdue,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Overdue => "overdue",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "in_progress" => OrderStatus::InProgress,
            "overdue" => OrderStatus::Overdue,
            "completed" => OrderStatus::Completed,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Created,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Overdue report for a single order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverdueStatus {
    pub is_overdue: bool,
    pub hours_elapsed: f64,
    pub overdue_by_hours: f64,
}

/// A unit of work for a customer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: Uuid,
    pub order_number: String,
    pub branch_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub order_type: String,
    pub status: String,
    /// JSON array of category names, set only while the type is mixed.
    pub mixed_categories: Option<String>,
    pub description: Option<String>,
    pub cancellation_reason: Option<String>,
    pub estimated_duration_minutes: Option<i32>,
    pub actual_duration_minutes: Option<i32>,
    pub created_utc: DateTime<Utc>,
    pub started_utc: Option<DateTime<Utc>>,
    pub completed_utc: Option<DateTime<Utc>>,
    pub cancelled_utc: Option<DateTime<Utc>>,
}

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub branch_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub order_type: OrderType,
    pub description: Option<String>,
    pub estimated_duration_minutes: Option<i32>,
}

impl Order {
    /// Build a new order. Inquiry orders are forced to completed at
    /// creation; everything else starts the lifecycle at created.
    pub fn new(input: CreateOrder, now: DateTime<Utc>) -> Self {
        let is_inquiry = input.order_type == OrderType::Inquiry;
        Order {
            order_id: Uuid::new_v4(),
            order_number: generate_order_number(now),
            branch_id: input.branch_id,
            customer_id: input.customer_id,
            vehicle_id: input.vehicle_id,
            order_type: input.order_type.as_str().to_string(),
            status: if is_inquiry {
                OrderStatus::Completed.as_str().to_string()
            } else {
                OrderStatus::Created.as_str().to_string()
            },
            mixed_categories: None,
            description: input.description,
            cancellation_reason: None,
            estimated_duration_minutes: input.estimated_duration_minutes,
            actual_duration_minutes: None,
            created_utc: now,
            started_utc: None,
            completed_utc: if is_inquiry { Some(now) } else { None },
            cancelled_utc: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_string(&self.status)
    }

    pub fn order_type(&self) -> OrderType {
        OrderType::from_string(&self.order_type)
    }

    /// Move created -> in_progress once the auto-progress window has
    /// elapsed. Evaluated opportunistically on each relevant request; there
    /// is no background scheduler. Returns whether a transition happened.
    pub fn auto_progress_if_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        if self.status() == OrderStatus::Created
            && now - self.created_utc >= Duration::minutes(AUTO_PROGRESS_AFTER_MINUTES)
        {
            self.status = OrderStatus::InProgress.as_str().to_string();
            self.started_utc = Some(self.started_utc.unwrap_or(now));
            return true;
        }
        false
    }

    /// Move in_progress -> overdue once the overdue threshold has elapsed
    /// since the order started. Returns whether a transition happened.
    pub fn mark_overdue_if_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        if self.status() == OrderStatus::InProgress && self.is_overdue(now) {
            self.status = OrderStatus::Overdue.as_str().to_string();
            return true;
        }
        false
    }

    /// Whether an in-progress order has exceeded the overdue threshold.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        if self.status() != OrderStatus::InProgress {
            return false;
        }
        match self.started_utc {
            Some(started) => {
                let elapsed_hours = (now - started).num_seconds() as f64 / 3600.0;
                elapsed_hours >= OVERDUE_THRESHOLD_HOURS as f64
            }
            None => false,
        }
    }

    /// Elapsed and overage hours for delay reporting, rounded to two
    /// decimals.
    pub fn overdue_status(&self, now: DateTime<Utc>) -> OverdueStatus {
        let started = match self.started_utc {
            Some(started) => started,
            None => return OverdueStatus::default(),
        };

        let elapsed_hours = (now - started).num_seconds() as f64 / 3600.0;
        let threshold = OVERDUE_THRESHOLD_HOURS as f64;

        let mut status = OverdueStatus {
            is_overdue: false,
            hours_elapsed: round2(elapsed_hours),
            overdue_by_hours: 0.0,
        };
        if elapsed_hours >= threshold {
            status.is_overdue = true;
            status.overdue_by_hours = round2(elapsed_hours - threshold);
        }
        status
    }

    /// Complete the order, recording the working-hours duration if it was
    /// ever started. Rejects transitions out of terminal states.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status().is_terminal() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Order {} is already {}",
                self.order_number,
                self.status
            )));
        }
        self.status = OrderStatus::Completed.as_str().to_string();
        self.completed_utc = Some(now);
        if let Some(started) = self.started_utc {
            self.actual_duration_minutes = Some(working_minutes_between(started, now) as i32);
        }
        Ok(())
    }

    /// Cancel the order. Rejects transitions out of terminal states.
    pub fn cancel(&mut self, now: DateTime<Utc>, reason: Option<String>) -> Result<(), AppError> {
        if self.status().is_terminal() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Order {} is already {}",
                self.order_number,
                self.status
            )));
        }
        self.status = OrderStatus::Cancelled.as_str().to_string();
        self.cancelled_utc = Some(now);
        self.cancellation_reason = reason;
        Ok(())
    }
}

/// Generate a human-friendly order number: ORD + UTC timestamp + 4 hex
/// chars. Callers persisting orders retry on the rare collision.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("ORD{}{}", now.format("%Y%m%d%H%M%S"), suffix)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
