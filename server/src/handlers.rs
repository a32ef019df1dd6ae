// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::auth::CurrentEngineer;
use crate::database;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use common::{
    CreateEngineerPayload, CreateItemPayload, CreateTaskPayload, DomainError, Engineer,
    InventoryItemView, InventoryTransaction, MovementPayload, TaskRecord, validate_timing,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info};

/// Fixed denial text for callers without the team-leader capability.
const LEADER_DENIAL: &str = "You do not have permission to access this page.";

/// Handler for provisioning an engineer account.
pub async fn create_engineer(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateEngineerPayload>,
) -> Result<(StatusCode, Json<Engineer>), AppError> {
    debug!("Received request to create engineer: {}", payload.et_id);

    if payload.et_id.trim().is_empty() || payload.name.trim().is_empty() {
        error!("Validation failed: ET id or name is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "ET id and name cannot be empty.",
        ));
    }

    let engineer = database::create_engineer(&pool, payload).await?;
    info!("Engineer created successfully with ID: {}", engineer.id);

    Ok((StatusCode::CREATED, Json(engineer)))
}

/// Handler for listing all engineers.
pub async fn list_engineers(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<Engineer>>, AppError> {
    let engineers = database::list_engineers(&pool).await?;
    Ok(Json(engineers))
}

/// Handler for submitting a task record.
///
/// The owning engineer comes from the authenticated caller, never from the
/// payload. Timing is validated before any database access; the remaining
/// save rules (reporter expansion, duration derivation) run at insert time.
pub async fn create_task(
    State(pool): State<SqlitePool>,
    CurrentEngineer(engineer): CurrentEngineer,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<(StatusCode, Json<TaskRecord>), AppError> {
    debug!(
        "Received task submission from engineer: {}",
        engineer.et_id
    );

    if payload.description.trim().is_empty() {
        error!("Validation failed: problem description is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Problem description cannot be empty.",
        ));
    }

    if let Err(err) = validate_timing(payload.start_time, payload.end_time) {
        error!("Validation failed: {}", err);
        return Err(AppError::new(StatusCode::BAD_REQUEST, &err.to_string())
            .with_field("end_time"));
    }

    let record = database::create_task_record(&pool, &engineer, payload).await?;
    info!("Task record created successfully with ID: {}", record.id);

    Ok((StatusCode::CREATED, Json(record)))
}

/// Optional submitted-at date range on the task listing. Strings rather
/// than `NaiveDate` so malformed values degrade to the unfiltered default
/// instead of failing deserialization.
#[derive(Deserialize, Debug, Default)]
pub struct RangeQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn parse_range(query: &RangeQuery) -> Option<(NaiveDate, NaiveDate)> {
    let from = query.date_from.as_deref()?.parse().ok()?;
    let to = query.date_to.as_deref()?.parse().ok()?;
    Some((from, to))
}

/// Handler for listing task records, newest first. Feeds the spreadsheet
/// and PDF export collaborators, which is why an unparseable date range is
/// silently ignored rather than rejected.
pub async fn list_tasks(
    State(pool): State<SqlitePool>,
    CurrentEngineer(engineer): CurrentEngineer,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<TaskRecord>>, AppError> {
    let range = parse_range(&query);
    let tasks = database::list_task_records(&pool, range).await?;
    info!(
        "Successfully retrieved {} tasks for {}.",
        tasks.len(),
        engineer.et_id
    );
    Ok(Json(tasks))
}

#[derive(Deserialize, Debug, Default)]
pub struct DashboardQuery {
    pub date: Option<String>,
}

/// Handler for the aggregated dashboard. Team leaders only.
pub async fn dashboard(
    State(pool): State<SqlitePool>,
    CurrentEngineer(engineer): CurrentEngineer,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<database::DashboardData>, AppError> {
    if !engineer.is_team_leader {
        error!("Engineer {} denied access to dashboard.", engineer.et_id);
        return Err(AppError::new(StatusCode::FORBIDDEN, LEADER_DENIAL));
    }

    // Malformed dates fall back to the unfiltered view, same as the range
    // filter on exports.
    let date = query.date.as_deref().and_then(|d| d.parse().ok());
    let data = database::task_summary(&pool, date).await?;
    Ok(Json(data))
}

/// Handler for seeding an inventory item.
pub async fn create_inventory_item(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<(StatusCode, Json<InventoryItemView>), AppError> {
    if payload.item.trim().is_empty() {
        error!("Validation failed: item name is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Item name cannot be empty.",
        ));
    }

    let item = database::create_inventory_item(&pool, payload).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Handler for listing the inventory ledger with derived balances.
pub async fn list_inventory_items(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<InventoryItemView>>, AppError> {
    let items = database::list_inventory_items(&pool).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Handler for applying a stock movement (take/add) to an item.
/// The caller is recorded as the performing user on the audit row.
pub async fn apply_movement(
    State(pool): State<SqlitePool>,
    CurrentEngineer(engineer): CurrentEngineer,
    Path(number): Path<i64>,
    Json(payload): Json<MovementPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!(
        "Received {:?} movement of {} against item {} from {}",
        payload.action, payload.quantity, number, engineer.et_id
    );

    let (item, transaction) =
        database::apply_inventory_movement(&pool, number, payload, Some(engineer.id)).await?;

    Ok(Json(serde_json::json!({
        "item": InventoryItemView::from(item),
        "transaction": transaction,
    })))
}

/// Handler for the audit trail of one item, newest first.
pub async fn list_item_transactions(
    State(pool): State<SqlitePool>,
    Path(number): Path<i64>,
) -> Result<Json<Vec<InventoryTransaction>>, AppError> {
    if database::get_inventory_item(&pool, number).await?.is_none() {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            &DomainError::ItemNotFound(number).to_string(),
        ));
    }
    let transactions = database::list_item_transactions(&pool, number).await?;
    Ok(Json(transactions))
}

#[derive(Deserialize, Debug, Default)]
pub struct ClearQuery {
    pub confirm: Option<bool>,
}

/// Handler for the administrative bulk clear of demo data.
/// Without `confirm=true` nothing is deleted and the response says so.
pub async fn clear_demo_data(
    State(pool): State<SqlitePool>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if query.confirm != Some(true) {
        info!("clear_demo_data: flag not set; skipping");
        return Ok(Json(serde_json::json!({
            "skipped": true,
            "tasks": 0,
            "transactions": 0,
            "items": 0,
        })));
    }

    let counts = database::clear_demo_data(&pool).await?;
    info!(
        "Cleared demo data: tasks={}, transactions={}, items={}",
        counts.tasks, counts.transactions, counts.items
    );

    Ok(Json(serde_json::json!({
        "skipped": false,
        "tasks": counts.tasks,
        "transactions": counts.transactions,
        "items": counts.items,
    })))
}

// --- Custom Error Handling ---
// Transforms internal errors (database or domain) into HTTP responses.

/// Our custom error type for the application. Validation errors carry the
/// offending field name so the submitter can be pointed at it.
pub struct AppError {
    code: StatusCode,
    message: String,
    field: Option<&'static str>,
}

impl AppError {
    pub(crate) fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            field: None,
        }
    }

    pub(crate) fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub(crate) fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

/// Converts an `anyhow::Error` coming out of `database.rs` into an
/// `AppError`. Typed domain failures keep their meaning as a status code;
/// anything else is a plain internal error.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::EndBeforeStart) => {
                AppError::new(StatusCode::BAD_REQUEST, &err.to_string()).with_field("end_time")
            }
            Some(DomainError::InvalidQuantity) | Some(DomainError::InvalidPrice) => {
                AppError::new(StatusCode::BAD_REQUEST, &err.to_string())
            }
            Some(DomainError::DuplicateEngineer(_)) => {
                AppError::new(StatusCode::CONFLICT, &err.to_string())
            }
            Some(DomainError::UnknownEngineer(_)) => {
                AppError::new(StatusCode::BAD_REQUEST, &err.to_string())
            }
            Some(DomainError::ItemNotFound(_)) => {
                AppError::new(StatusCode::NOT_FOUND, &err.to_string())
            }
            None => {
                tracing::error!("Internal server error: {:?}", err);
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred.",
                )
            }
        }
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(
            "Responding with error: status_code={}, message={}",
            self.code.as_u16(),
            self.message
        );
        let body = match self.field {
            Some(field) => serde_json::json!({ "error": self.message, "field": field }),
            None => serde_json::json!({ "error": self.message }),
        };
        (self.code, Json(body)).into_response()
    }
}
