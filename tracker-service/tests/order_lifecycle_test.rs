//! Order lifecycle tests for tracker-service.

mod common;

use chrono::Duration;
use common::at;
use tracker_service::models::{
    estimated_completion, format_hours, working_minutes_between, CreateOrder, Order, OrderStatus,
    OrderType,
};
use uuid::Uuid;

fn create_input(order_type: OrderType) -> CreateOrder {
    CreateOrder {
        branch_id: None,
        customer_id: Uuid::new_v4(),
        vehicle_id: None,
        order_type,
        description: Some("Walk-in".to_string()),
        estimated_duration_minutes: None,
    }
}

fn service_order() -> Order {
    Order::new(create_input(OrderType::Service), at(9, 0))
}

#[test]
fn new_orders_start_created() {
    let order = service_order();

    assert_eq!(order.status(), OrderStatus::Created);
    assert!(order.started_utc.is_none());
    assert!(order.order_number.starts_with("ORD"));
}

#[test]
fn inquiries_complete_at_creation() {
    let order = Order::new(create_input(OrderType::Inquiry), at(9, 0));

    assert_eq!(order.status(), OrderStatus::Completed);
    assert_eq!(order.completed_utc, Some(at(9, 0)));
}

#[test]
fn auto_progress_waits_out_the_window() {
    let mut order = service_order();

    assert!(!order.auto_progress_if_elapsed(at(9, 9)));
    assert_eq!(order.status(), OrderStatus::Created);

    // Boundary is inclusive: exactly ten minutes progresses.
    assert!(order.auto_progress_if_elapsed(at(9, 10)));
    assert_eq!(order.status(), OrderStatus::InProgress);
    assert_eq!(order.started_utc, Some(at(9, 10)));

    // Already progressed; nothing further happens.
    assert!(!order.auto_progress_if_elapsed(at(9, 30)));
}

#[test]
fn auto_progress_keeps_an_existing_start_time() {
    let mut order = service_order();
    order.started_utc = Some(at(9, 5));

    assert!(order.auto_progress_if_elapsed(at(9, 10)));
    assert_eq!(order.started_utc, Some(at(9, 5)));
}

#[test]
fn overdue_after_two_hours_in_progress() {
    let mut order = service_order();
    order.auto_progress_if_elapsed(at(9, 10));

    assert!(!order.is_overdue(at(11, 9)));
    assert!(order.is_overdue(at(11, 10)));

    // Created orders are never overdue, however old.
    let untouched = service_order();
    assert!(!untouched.is_overdue(at(23, 0)));
}

#[test]
fn overdue_status_reports_elapsed_and_overage() {
    let mut order = service_order();
    order.auto_progress_if_elapsed(at(9, 10));

    let before = order.overdue_status(at(10, 40));
    assert!(!before.is_overdue);
    assert_eq!(before.hours_elapsed, 1.5);
    assert_eq!(before.overdue_by_hours, 0.0);

    let after = order.overdue_status(at(11, 40));
    assert!(after.is_overdue);
    assert_eq!(after.hours_elapsed, 2.5);
    assert_eq!(after.overdue_by_hours, 0.5);
}

#[test]
fn overdue_marking_transitions_the_status() {
    let mut order = service_order();
    order.auto_progress_if_elapsed(at(9, 10));

    assert!(!order.mark_overdue_if_elapsed(at(10, 0)));
    assert!(order.mark_overdue_if_elapsed(at(11, 10)));
    assert_eq!(order.status(), OrderStatus::Overdue);
}

#[test]
fn completion_records_working_duration() {
    let mut order = service_order();
    order.auto_progress_if_elapsed(at(9, 10));

    order.complete(at(11, 10)).expect("open orders complete");

    assert_eq!(order.status(), OrderStatus::Completed);
    assert_eq!(order.completed_utc, Some(at(11, 10)));
    assert_eq!(order.actual_duration_minutes, Some(120));
}

#[test]
fn overdue_orders_can_still_complete_or_cancel() {
    let mut order = service_order();
    order.auto_progress_if_elapsed(at(9, 10));
    order.mark_overdue_if_elapsed(at(11, 30));

    assert!(order.complete(at(12, 0)).is_ok());

    let mut other = service_order();
    other.auto_progress_if_elapsed(at(9, 10));
    other.mark_overdue_if_elapsed(at(11, 30));
    assert!(other
        .cancel(at(12, 0), Some("Customer left".to_string()))
        .is_ok());
    assert_eq!(other.cancellation_reason.as_deref(), Some("Customer left"));
}

#[test]
fn terminal_states_reject_further_transitions() {
    let mut completed = service_order();
    completed.complete(at(10, 0)).expect("completes");
    assert!(completed.complete(at(10, 5)).is_err());
    assert!(completed.cancel(at(10, 5), None).is_err());

    let mut cancelled = service_order();
    cancelled.cancel(at(10, 0), None).expect("cancels");
    assert!(cancelled.complete(at(10, 5)).is_err());
    assert!(!cancelled.auto_progress_if_elapsed(at(23, 0)));
}

#[test]
fn working_minutes_count_only_the_working_window() {
    // Fully inside one working day.
    assert_eq!(working_minutes_between(at(9, 0), at(11, 0)), 120);

    // Start before the window opens.
    assert_eq!(working_minutes_between(at(7, 0), at(9, 0)), 60);

    // Entirely outside the window.
    assert_eq!(working_minutes_between(at(18, 0), at(19, 0)), 0);

    // End before start clamps to zero.
    assert_eq!(working_minutes_between(at(11, 0), at(9, 0)), 0);

    // Spanning an evening: 16:30-17:00 today plus 08:00-08:30 tomorrow.
    let evening = at(16, 30);
    let next_morning = at(8, 30) + Duration::days(1);
    assert_eq!(working_minutes_between(evening, next_morning), 60);
}

#[test]
fn hours_format_for_humans() {
    assert_eq!(format_hours(0.0), "0h");
    assert_eq!(format_hours(0.5), "30m");
    assert_eq!(format_hours(2.25), "2h 15m");
    assert_eq!(format_hours(3.0), "3h");
    assert_eq!(format_hours(-1.0), "0h");
}

#[test]
fn completion_estimate_defaults_to_the_overdue_threshold() {
    let started = at(9, 0);

    assert_eq!(estimated_completion(started, None), at(11, 0));
    assert_eq!(estimated_completion(started, Some(30)), at(9, 30));
}
