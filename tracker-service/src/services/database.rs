//! Database service for tracker-service.

use crate::classify::{
    combine_detections, detect_order_type, mixed_categories_json, CodeRegistry, RevenueBucket,
};
use crate::models::{
    finalize_totals, generate_invoice_number, CreateInvoice, CreateLabourCode, CreateLineItem,
    CreateOrder, Invoice, InvoiceTotals, LabourCode, LineItem, ListInvoicesFilter, Order,
    OrderType, RevenueFilter, UpdateLabourCode, AUTO_PROGRESS_AFTER_MINUTES,
    OVERDUE_THRESHOLD_HOURS,
};
use crate::services::metrics::{DB_QUERY_DURATION, ORDERS_TOTAL, REVENUE_REPORTS_TOTAL};
use async_trait::async_trait;
use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "order_id, order_number, branch_id, customer_id, vehicle_id, \
    order_type, status, mixed_categories, description, cancellation_reason, \
    estimated_duration_minutes, actual_duration_minutes, created_utc, started_utc, \
    completed_utc, cancelled_utc";

const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, status, branch_id, order_id, \
    customer_id, vehicle_id, invoice_date, code_no, reference, subtotal, tax_rate, \
    tax_amount, total_amount, notes, created_utc";

const LINE_ITEM_COLUMNS: &str = "line_item_id, invoice_id, code, description, quantity, unit, \
    unit_price, tax_rate, tax_amount, line_total, order_type, created_utc";

const LABOUR_CODE_COLUMNS: &str =
    "labour_code_id, code, description, category, is_active, created_utc, updated_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "tracker-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Labour Code Operations
    // -------------------------------------------------------------------------

    /// Create a new labour code mapping.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_labour_code(
        &self,
        input: &CreateLabourCode,
    ) -> Result<LabourCode, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_labour_code"])
            .start_timer();

        let labour_code = sqlx::query_as::<_, LabourCode>(&format!(
            r#"
            INSERT INTO labour_codes (labour_code_id, code, description, category, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {LABOUR_CODE_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&input.code)
        .bind(&input.description)
        .bind(&input.category)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Labour code '{}' already exists",
                    input.code
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create labour code: {}", e)),
        })?;

        timer.observe_duration();

        info!(code = %labour_code.code, category = %labour_code.category, "Labour code created");

        Ok(labour_code)
    }

    /// Get a labour code by its code string.
    #[instrument(skip(self))]
    pub async fn get_labour_code(&self, code: &str) -> Result<Option<LabourCode>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_labour_code"])
            .start_timer();

        let labour_code = sqlx::query_as::<_, LabourCode>(&format!(
            r#"
            SELECT {LABOUR_CODE_COLUMNS}
            FROM labour_codes
            WHERE code = $1
            "#,
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get labour code: {}", e)))?;

        timer.observe_duration();

        Ok(labour_code)
    }

    /// List labour codes, optionally only active ones.
    #[instrument(skip(self))]
    pub async fn list_labour_codes(&self, active_only: bool) -> Result<Vec<LabourCode>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_labour_codes"])
            .start_timer();

        let labour_codes = sqlx::query_as::<_, LabourCode>(&format!(
            r#"
            SELECT {LABOUR_CODE_COLUMNS}
            FROM labour_codes
            WHERE (NOT $1) OR is_active
            ORDER BY code
            "#,
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list labour codes: {}", e))
        })?;

        timer.observe_duration();

        Ok(labour_codes)
    }

    /// Update a labour code mapping.
    #[instrument(skip(self, input))]
    pub async fn update_labour_code(
        &self,
        code: &str,
        input: &UpdateLabourCode,
    ) -> Result<Option<LabourCode>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_labour_code"])
            .start_timer();

        let labour_code = sqlx::query_as::<_, LabourCode>(&format!(
            r#"
            UPDATE labour_codes
            SET description = COALESCE($2, description),
                category = COALESCE($3, category),
                is_active = COALESCE($4, is_active),
                updated_utc = NOW()
            WHERE code = $1
            RETURNING {LABOUR_CODE_COLUMNS}
            "#,
        ))
        .bind(code)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update labour code: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref lc) = labour_code {
            info!(code = %lc.code, is_active = lc.is_active, "Labour code updated");
        }

        Ok(labour_code)
    }

    // -------------------------------------------------------------------------
    // Order Operations
    // -------------------------------------------------------------------------

    /// Create a new order. Inquiry orders are persisted already completed.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(&self, input: &CreateOrder) -> Result<Order, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_order"])
            .start_timer();

        // Order numbers are timestamp-derived; retry a few times on the
        // rare collision under concurrent creation.
        let mut result = Err(AppError::DatabaseError(anyhow::anyhow!(
            "Failed to allocate a unique order number"
        )));
        for _ in 0..5 {
            let order = Order::new(input.clone(), Utc::now());
            match self.insert_order(&order).await {
                Err(AppError::Conflict(_)) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }
        let order = result?;

        timer.observe_duration();

        ORDERS_TOTAL.with_label_values(&[order.status.as_str()]).inc();
        info!(
            order_id = %order.order_id,
            order_number = %order.order_number,
            order_type = %order.order_type,
            status = %order.status,
            "Order created"
        );

        Ok(order)
    }

    async fn insert_order(&self, order: &Order) -> Result<Order, AppError> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (
                order_id, order_number, branch_id, customer_id, vehicle_id, order_type,
                status, mixed_categories, description, estimated_duration_minutes,
                created_utc, completed_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(order.order_id)
        .bind(&order.order_number)
        .bind(order.branch_id)
        .bind(order.customer_id)
        .bind(order.vehicle_id)
        .bind(&order.order_type)
        .bind(&order.status)
        .bind(&order.mixed_categories)
        .bind(&order.description)
        .bind(order.estimated_duration_minutes)
        .bind(order.created_utc)
        .bind(order.completed_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Order number collision"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create order: {}", e)),
        })
    }

    /// Get an order by ID.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE order_id = $1
            "#,
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?;

        timer.observe_duration();

        Ok(order)
    }

    /// Move every created order past the auto-progress window to
    /// in_progress. Called opportunistically; returns orders transitioned.
    #[instrument(skip(self))]
    pub async fn auto_progress_orders(&self) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["auto_progress_orders"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'in_progress',
                started_utc = COALESCE(started_utc, NOW())
            WHERE status = 'created'
              AND created_utc <= NOW() - make_interval(mins => $1)
            "#,
        )
        .bind(AUTO_PROGRESS_AFTER_MINUTES as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to auto-progress orders: {}", e))
        })?;

        timer.observe_duration();

        let transitioned = result.rows_affected();
        if transitioned > 0 {
            info!(transitioned = transitioned, "Orders auto-progressed");
        }

        Ok(transitioned)
    }

    /// Move every in-progress order past the overdue threshold to overdue.
    #[instrument(skip(self))]
    pub async fn mark_overdue_orders(&self) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_overdue_orders"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'overdue'
            WHERE status = 'in_progress'
              AND started_utc IS NOT NULL
              AND started_utc <= NOW() - make_interval(hours => $1)
            "#,
        )
        .bind(OVERDUE_THRESHOLD_HOURS as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark overdue orders: {}", e))
        })?;

        timer.observe_duration();

        let transitioned = result.rows_affected();
        if transitioned > 0 {
            warn!(transitioned = transitioned, "Orders marked overdue");
        }

        Ok(transitioned)
    }

    /// Complete an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn complete_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["complete_order"])
            .start_timer();

        let mut order = match self.get_order(order_id).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        order.complete(Utc::now())?;

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, completed_utc = $3, actual_duration_minutes = $4
            WHERE order_id = $1
            "#,
        )
        .bind(order.order_id)
        .bind(&order.status)
        .bind(order.completed_utc)
        .bind(order.actual_duration_minutes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to complete order: {}", e)))?;

        timer.observe_duration();

        ORDERS_TOTAL.with_label_values(&[order.status.as_str()]).inc();
        info!(order_id = %order.order_id, "Order completed");

        Ok(Some(order))
    }

    /// Cancel an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_order"])
            .start_timer();

        let mut order = match self.get_order(order_id).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        order.cancel(Utc::now(), reason)?;

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, cancelled_utc = $3, cancellation_reason = $4
            WHERE order_id = $1
            "#,
        )
        .bind(order.order_id)
        .bind(&order.status)
        .bind(order.cancelled_utc)
        .bind(&order.cancellation_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to cancel order: {}", e)))?;

        timer.observe_duration();

        ORDERS_TOTAL.with_label_values(&[order.status.as_str()]).inc();
        info!(order_id = %order.order_id, "Order cancelled");

        Ok(Some(order))
    }

    /// Persist a re-derived order type and its mixed categories payload.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn update_order_type(
        &self,
        order_id: Uuid,
        order_type: OrderType,
        mixed_categories: Option<String>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_order_type"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE orders
            SET order_type = $2, mixed_categories = $3
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(order_type.as_str())
        .bind(&mixed_categories)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update order type: {}", e))
        })?;

        timer.observe_duration();

        info!(order_id = %order_id, order_type = order_type.as_str(), "Order type updated");

        Ok(())
    }

    /// Re-derive an order's type from every invoice linked to it and
    /// persist the result.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn refresh_order_type(
        &self,
        order_id: Uuid,
    ) -> Result<(OrderType, Vec<String>), AppError> {
        let invoice_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT invoice_id FROM invoices WHERE order_id = $1")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to list invoices for order: {}",
                        e
                    ))
                })?;

        let mut detections = Vec::with_capacity(invoice_ids.len());
        for invoice_id in invoice_ids {
            let codes: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT DISTINCT code FROM invoice_line_items
                WHERE invoice_id = $1 AND code IS NOT NULL
                ORDER BY code
                "#,
            )
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list item codes: {}", e))
            })?;

            detections.push(detect_order_type(&codes, self).await?);
        }

        let (order_type, categories) = combine_detections(&detections);
        let mixed_json = mixed_categories_json(order_type, &categories);
        self.update_order_type(order_id, order_type, mixed_json)
            .await?;

        Ok((order_type, categories))
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create a new invoice. Generates an invoice number when none is
    /// supplied; a supplied duplicate number is a conflict.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let generated = input.invoice_number.is_none();
        let mut result = Err(AppError::DatabaseError(anyhow::anyhow!(
            "Failed to allocate a unique invoice number"
        )));
        for _ in 0..5 {
            let number = match &input.invoice_number {
                Some(number) => number.clone(),
                None => generate_invoice_number(Utc::now()),
            };
            match self.insert_invoice(input, &number).await {
                Err(AppError::Conflict(e)) if generated => {
                    result = Err(AppError::Conflict(e));
                    continue;
                }
                other => {
                    result = other;
                    break;
                }
            }
        }
        let invoice = result?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(invoice)
    }

    async fn insert_invoice(
        &self,
        input: &CreateInvoice,
        invoice_number: &str,
    ) -> Result<Invoice, AppError> {
        let invoice_date = input
            .invoice_date
            .unwrap_or_else(|| Utc::now().date_naive());

        sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, status, branch_id, order_id, customer_id,
                vehicle_id, invoice_date, code_no, reference, subtotal, tax_rate,
                tax_amount, total_amount, notes
            )
            VALUES ($1, $2, 'draft', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(invoice_number)
        .bind(input.branch_id)
        .bind(input.order_id)
        .bind(input.customer_id)
        .bind(input.vehicle_id)
        .bind(invoice_date)
        .bind(&input.code_no)
        .bind(&input.reference)
        .bind(input.subtotal)
        .bind(input.tax_rate)
        .bind(input.tax_amount)
        .bind(input.total_amount)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    invoice_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE invoice_id = $1
            "#,
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Get an invoice by its number (re-uploads reuse the same document).
    #[instrument(skip(self))]
    pub async fn get_invoice_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_by_number"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE invoice_number = $1
            "#,
        ))
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices with optional filters and cursor pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = if filter.page_size > 0 {
            filter.page_size.min(100)
        } else {
            50
        } as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
              AND ($4::uuid IS NULL OR order_id = $4)
              AND ($5::date IS NULL OR invoice_date >= $5)
              AND ($6::date IS NULL OR invoice_date <= $6)
              AND ($7::uuid IS NULL OR invoice_id > $7)
            ORDER BY invoice_id
            LIMIT $8
            "#,
        ))
        .bind(&status_str)
        .bind(filter.branch_id)
        .bind(filter.customer_id)
        .bind(filter.order_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.page_token)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    // -------------------------------------------------------------------------
    // Line Item Operations
    // -------------------------------------------------------------------------

    /// Replace an invoice's line items and reconcile its totals, all or
    /// nothing. Re-uploading the same document must never leave stale or
    /// duplicated rows behind.
    #[instrument(skip(self, items, extracted), fields(invoice_id = %invoice_id, items = items.len()))]
    pub async fn replace_invoice_line_items(
        &self,
        invoice_id: Uuid,
        items: &[CreateLineItem],
        extracted: InvoiceTotals,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_invoice_line_items"])
            .start_timer();

        let totals = finalize_totals(
            extracted.subtotal,
            extracted.tax_amount,
            extracted.total_amount,
            items,
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete line items: {}", e))
            })?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    line_item_id, invoice_id, code, description, quantity, unit,
                    unit_price, tax_rate, tax_amount, line_total, order_type
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(&item.code)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.unit_price)
            .bind(item.tax_rate)
            .bind(item.tax_amount)
            .bind(item.line_total)
            .bind(item.order_type.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e))
            })?;
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET subtotal = $2, tax_amount = $3, total_amount = $4
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice totals: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice_id,
            items = items.len(),
            subtotal = %invoice.subtotal,
            "Invoice line items replaced"
        );

        Ok(invoice)
    }

    /// Get line items for an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items"])
            .start_timer();

        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY created_utc, line_item_id
            "#,
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    /// Get line items across a set of invoices.
    #[instrument(skip(self, invoice_ids), fields(invoices = invoice_ids.len()))]
    pub async fn get_line_items_for_invoices(
        &self,
        invoice_ids: &[Uuid],
    ) -> Result<Vec<LineItem>, AppError> {
        if invoice_ids.is_empty() {
            return Ok(Vec::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items_for_invoices"])
            .start_timer();

        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM invoice_line_items
            WHERE invoice_id = ANY($1)
            "#,
        ))
        .bind(invoice_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    // -------------------------------------------------------------------------
    // Revenue Reporting
    // -------------------------------------------------------------------------

    /// Revenue breakdown by order type over the filtered invoice set.
    ///
    /// Reads the persisted `order_type` of every line item on draft, issued
    /// and paid invoices; cancelled invoices never count.
    #[instrument(skip(self, filter))]
    pub async fn revenue_by_order_type(
        &self,
        filter: &RevenueFilter,
    ) -> Result<RevenueBucket, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_by_order_type"])
            .start_timer();

        let invoice_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT invoice_id
            FROM invoices
            WHERE status IN ('draft', 'issued', 'paid')
              AND ($1::uuid IS NULL OR branch_id = $1)
              AND ($2::uuid IS NULL OR vehicle_id = $2)
              AND ($3::date IS NULL OR invoice_date >= $3)
              AND ($4::date IS NULL OR invoice_date <= $4)
            "#,
        )
        .bind(filter.branch_id)
        .bind(filter.vehicle_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices for revenue: {}", e))
        })?;

        let bucket = if invoice_ids.is_empty() {
            RevenueBucket::default()
        } else {
            let line_items = self.get_line_items_for_invoices(&invoice_ids).await?;
            RevenueBucket::from_line_items(&line_items).with_count(invoice_ids.len() as i64)
        };

        timer.observe_duration();

        REVENUE_REPORTS_TOTAL.with_label_values(&["range"]).inc();
        info!(
            invoices = bucket.count,
            total = %bucket.total,
            "Revenue report computed"
        );

        Ok(bucket)
    }

    /// Revenue breakdown for the current calendar month.
    pub async fn revenue_this_month(&self) -> Result<RevenueBucket, AppError> {
        let today = Utc::now().date_naive();
        let month_start = today.with_day(1).unwrap_or(today);
        let month_end = month_start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(today);

        let bucket = self
            .revenue_by_order_type(&RevenueFilter {
                date_from: Some(month_start),
                date_to: Some(month_end),
                ..Default::default()
            })
            .await?;

        REVENUE_REPORTS_TOTAL.with_label_values(&["month"]).inc();
        Ok(bucket)
    }

    /// Revenue breakdown across all invoices.
    pub async fn revenue_all_time(&self) -> Result<RevenueBucket, AppError> {
        let bucket = self
            .revenue_by_order_type(&RevenueFilter::default())
            .await?;

        REVENUE_REPORTS_TOTAL.with_label_values(&["all_time"]).inc();
        Ok(bucket)
    }

    /// Revenue breakdown for a single vehicle over an optional date range.
    pub async fn revenue_for_vehicle(
        &self,
        vehicle_id: Uuid,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<RevenueBucket, AppError> {
        self.revenue_by_order_type(&RevenueFilter {
            vehicle_id: Some(vehicle_id),
            date_from,
            date_to,
            ..Default::default()
        })
        .await
    }
}

#[async_trait]
impl CodeRegistry for Database {
    async fn lookup(&self, codes: &[String]) -> Result<HashMap<String, String>, AppError> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["lookup_labour_codes"])
            .start_timer();

        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT code, category
            FROM labour_codes
            WHERE is_active = TRUE AND code = ANY($1)
            "#,
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to look up labour codes: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows.into_iter().collect())
    }
}
