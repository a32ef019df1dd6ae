// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use common::{
    CreateEngineerPayload, CreateItemPayload, CreateTaskPayload, DomainError, Engineer,
    InventoryAction, InventoryItem, InventoryTransaction, MovementPayload, TaskCategory,
    TaskRecord, derive_time_taken, expand_reporter, validate_movement_quantity,
};
use serde::Serialize;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::{debug, info};

/// Establishes the database connection pool.
/// If the database does not exist, it creates it.
/// Foreign keys are switched on per connection so the cascade and
/// null-on-delete rules in the schema actually fire.
pub async fn establish_connection_pool(database_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    } else {
        info!("Database already exists.");
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .context("Invalid database URL")?
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .context("Failed to connect to database")?;

    create_schema(&pool).await?;

    info!("Schema is ready.");

    Ok(pool)
}

/// Creates every table the service needs. Shared with the test suites so
/// the in-memory databases cannot drift from the real schema.
///
/// Lifecycle rules live here as foreign-key clauses: deleting an engineer
/// cascades to their task records, deleting an item cascades to its
/// transactions, and deleting an engineer nulls `performed_by` on any
/// transaction they recorded.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // raw_sql: several statements in one call, unlike a prepared query.
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS engineers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            et_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            is_team_leader BOOLEAN NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS task_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            engineer_id INTEGER NOT NULL REFERENCES engineers(id) ON DELETE CASCADE,
            report_date DATE NOT NULL,
            shift TEXT NOT NULL DEFAULT '',
            reporter TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            equipment_type TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            cause_of_problem TEXT NOT NULL DEFAULT '',
            corrective_measure TEXT NOT NULL DEFAULT '',
            start_time TIMESTAMP NULL,
            end_time TIMESTAMP NULL,
            time_taken TEXT NULL,
            status TEXT NOT NULL DEFAULT '',
            remark TEXT NOT NULL DEFAULT '',
            submitted_at TIMESTAMP NOT NULL
        );

        CREATE TABLE IF NOT EXISTS task_record_members (
            task_id INTEGER NOT NULL REFERENCES task_records(id) ON DELETE CASCADE,
            engineer_id INTEGER NOT NULL REFERENCES engineers(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            PRIMARY KEY (task_id, engineer_id)
        );

        CREATE TABLE IF NOT EXISTS inventory_items (
            number INTEGER PRIMARY KEY AUTOINCREMENT,
            item TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            price REAL NOT NULL DEFAULT 0 CHECK (price >= 0)
        );

        CREATE TABLE IF NOT EXISTS inventory_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_number INTEGER NOT NULL REFERENCES inventory_items(number) ON DELETE CASCADE,
            action TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            performed_by INTEGER NULL REFERENCES engineers(id) ON DELETE SET NULL,
            at TIMESTAMP NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create schema")?;

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Provisions an engineer account. `et_id` is unique across all engineers;
/// a duplicate is reported as [`DomainError::DuplicateEngineer`].
pub async fn create_engineer(
    pool: &SqlitePool,
    payload: CreateEngineerPayload,
) -> Result<Engineer> {
    debug!(
        "Insert values: et_id={}, name={}, is_team_leader={}",
        payload.et_id, payload.name, payload.is_team_leader
    );

    let result =
        sqlx::query("INSERT INTO engineers (et_id, name, is_team_leader) VALUES (?, ?, ?)")
            .bind(&payload.et_id)
            .bind(&payload.name)
            .bind(payload.is_team_leader)
            .execute(pool)
            .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(err) if is_unique_violation(&err) => {
            return Err(DomainError::DuplicateEngineer(payload.et_id).into());
        }
        Err(err) => return Err(anyhow::Error::new(err).context("Failed to insert engineer")),
    };

    info!("Engineer created with ID: {}", id);

    Ok(Engineer {
        id,
        et_id: payload.et_id,
        name: payload.name,
        is_team_leader: payload.is_team_leader,
    })
}

/// Retrieves all engineers, ordered by ET id.
pub async fn list_engineers(pool: &SqlitePool) -> Result<Vec<Engineer>> {
    sqlx::query_as::<_, Engineer>("SELECT * FROM engineers ORDER BY et_id ASC")
        .fetch_all(pool)
        .await
        .context("Failed to retrieve engineers from DB")
}

/// Looks up an engineer by external identifier.
pub async fn get_engineer_by_et_id(pool: &SqlitePool, et_id: &str) -> Result<Option<Engineer>> {
    sqlx::query_as::<_, Engineer>("SELECT * FROM engineers WHERE et_id = ?")
        .bind(et_id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up engineer by ET id")
}

/// Inserts a new task record owned by `engineer`.
///
/// The owning engineer is a trusted argument injected by the caller's
/// authentication layer, never part of the payload. Applies the save rules:
/// reporter expansion, elapsed-duration derivation, report-date defaulting.
/// Team members are resolved from ET ids and stored in association order.
pub async fn create_task_record(
    pool: &SqlitePool,
    engineer: &Engineer,
    payload: CreateTaskPayload,
) -> Result<TaskRecord> {
    // Team members form a set: repeated selections of the same engineer
    // collapse to one association, keeping first-occurrence order.
    let mut members: Vec<Engineer> = Vec::with_capacity(payload.team_members.len());
    for et_id in &payload.team_members {
        if members.iter().any(|m| m.et_id == *et_id) {
            continue;
        }
        let member = get_engineer_by_et_id(pool, et_id)
            .await?
            .ok_or_else(|| DomainError::UnknownEngineer(et_id.clone()))?;
        members.push(member);
    }
    let member_names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();

    let report_date = payload
        .report_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let reporter = expand_reporter(&payload.reporter, &engineer.name, &member_names);
    let time_taken = derive_time_taken(payload.start_time, payload.end_time, payload.time_taken);
    let submitted_at = Utc::now();

    debug!(
        "Insert values: engineer={}, category={:?}, report_date={}, reporter={}, time_taken={:?}",
        engineer.et_id, payload.category, report_date, reporter, time_taken
    );

    let mut tx = pool.begin().await.context("Failed to open transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO task_records (
            engineer_id, report_date, shift, reporter, location, equipment_type,
            category, description, cause_of_problem, corrective_measure,
            start_time, end_time, time_taken, status, remark, submitted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(engineer.id)
    .bind(report_date)
    .bind(&payload.shift)
    .bind(&reporter)
    .bind(&payload.location)
    .bind(&payload.equipment_type)
    .bind(payload.category)
    .bind(&payload.description)
    .bind(&payload.cause_of_problem)
    .bind(&payload.corrective_measure)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(&time_taken)
    .bind(&payload.status)
    .bind(&payload.remark)
    .bind(submitted_at)
    .execute(&mut *tx)
    .await
    .context("Failed to insert task record into DB")?
    .last_insert_rowid();

    for (position, member) in members.iter().enumerate() {
        sqlx::query(
            "INSERT INTO task_record_members (task_id, engineer_id, position) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(member.id)
        .bind(position as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to insert task record member association")?;
    }

    tx.commit().await.context("Failed to commit task record")?;

    info!("Task record created successfully with ID: {}", id);

    Ok(TaskRecord {
        id,
        engineer_id: engineer.id,
        report_date,
        shift: payload.shift,
        reporter,
        location: payload.location,
        equipment_type: payload.equipment_type,
        category: payload.category,
        description: payload.description,
        cause_of_problem: payload.cause_of_problem,
        corrective_measure: payload.corrective_measure,
        start_time: payload.start_time,
        end_time: payload.end_time,
        time_taken,
        status: payload.status,
        remark: payload.remark,
        submitted_at,
        team_members: member_names,
    })
}

/// Retrieves task records newest-first, optionally restricted to a
/// submitted-at date range (inclusive on both ends).
pub async fn list_task_records(
    pool: &SqlitePool,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<TaskRecord>> {
    let mut records = match range {
        Some((from, to)) => {
            sqlx::query_as::<_, TaskRecord>(
                "SELECT * FROM task_records WHERE DATE(submitted_at) BETWEEN ? AND ? ORDER BY submitted_at DESC",
            )
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, TaskRecord>("SELECT * FROM task_records ORDER BY submitted_at DESC")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to retrieve task records from DB")?;

    for record in &mut records {
        record.team_members = sqlx::query_scalar(
            r#"
            SELECT e.name FROM task_record_members m
            JOIN engineers e ON e.id = m.engineer_id
            WHERE m.task_id = ?
            ORDER BY m.position ASC
            "#,
        )
        .bind(record.id)
        .fetch_all(pool)
        .await
        .context("Failed to retrieve task record members from DB")?;
    }

    Ok(records)
}

/// One dashboard line: how many reports of one category an engineer filed.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    pub et_id: String,
    pub name: String,
    pub category: TaskCategory,
    pub count: i64,
}

/// Per-engineer report totals for the dashboard footer.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct EngineerTotal {
    pub et_id: String,
    pub total: i64,
}

/// Everything the leader dashboard renders in one response.
#[derive(Serialize, Debug, Clone)]
pub struct DashboardData {
    pub summary: Vec<SummaryRow>,
    pub totals: Vec<EngineerTotal>,
    pub unique_dates: Vec<NaiveDate>,
    pub selected_date: Option<NaiveDate>,
}

/// Aggregates report counts per engineer and category, optionally for a
/// single submission date. `unique_dates` feeds the dashboard date picker.
pub async fn task_summary(pool: &SqlitePool, date: Option<NaiveDate>) -> Result<DashboardData> {
    let summary = match date {
        Some(date) => {
            sqlx::query_as::<_, SummaryRow>(
                r#"
                SELECT e.et_id AS et_id, e.name AS name, t.category AS category, COUNT(*) AS count
                FROM task_records t JOIN engineers e ON e.id = t.engineer_id
                WHERE DATE(t.submitted_at) = ?
                GROUP BY e.et_id, e.name, t.category
                ORDER BY e.et_id ASC, t.category ASC
                "#,
            )
            .bind(date)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, SummaryRow>(
                r#"
                SELECT e.et_id AS et_id, e.name AS name, t.category AS category, COUNT(*) AS count
                FROM task_records t JOIN engineers e ON e.id = t.engineer_id
                GROUP BY e.et_id, e.name, t.category
                ORDER BY e.et_id ASC, t.category ASC
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to aggregate task summary")?;

    // Totals fold the summary rows; the engineer roster is small enough
    // that a linear scan is fine.
    let mut totals: Vec<EngineerTotal> = Vec::new();
    for row in &summary {
        match totals.iter_mut().find(|t| t.et_id == row.et_id) {
            Some(total) => total.total += row.count,
            None => totals.push(EngineerTotal {
                et_id: row.et_id.clone(),
                total: row.count,
            }),
        }
    }

    let unique_dates = sqlx::query_scalar(
        "SELECT DISTINCT DATE(submitted_at) FROM task_records ORDER BY DATE(submitted_at) DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to retrieve distinct submission dates")?;

    Ok(DashboardData {
        summary,
        totals,
        unique_dates,
        selected_date: date,
    })
}

/// Seeds an inventory item with its opening quantity and unit price.
pub async fn create_inventory_item(
    pool: &SqlitePool,
    payload: CreateItemPayload,
) -> Result<InventoryItem> {
    if payload.quantity < 0 {
        return Err(DomainError::InvalidQuantity.into());
    }
    if payload.price < 0.0 {
        return Err(DomainError::InvalidPrice.into());
    }

    let number =
        sqlx::query("INSERT INTO inventory_items (item, quantity, price) VALUES (?, ?, ?)")
            .bind(&payload.item)
            .bind(payload.quantity)
            .bind(payload.price)
            .execute(pool)
            .await
            .context("Failed to insert inventory item into DB")?
            .last_insert_rowid();

    info!("Inventory item created with number: {}", number);

    Ok(InventoryItem {
        number,
        item: payload.item,
        quantity: payload.quantity,
        price: payload.price,
    })
}

/// Retrieves all inventory items, ordered by ledger number.
pub async fn list_inventory_items(pool: &SqlitePool) -> Result<Vec<InventoryItem>> {
    sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items ORDER BY number ASC")
        .fetch_all(pool)
        .await
        .context("Failed to retrieve inventory items from DB")
}

/// Looks up a single inventory item by ledger number.
pub async fn get_inventory_item(pool: &SqlitePool, number: i64) -> Result<Option<InventoryItem>> {
    sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE number = ?")
        .bind(number)
        .fetch_optional(pool)
        .await
        .context("Failed to look up inventory item")
}

/// Applies a stock movement to an item and records the audit transaction.
///
/// The quantity change is a single SQL expression so concurrent movements
/// cannot lose updates: a take clamps at zero with `MAX(quantity - ?, 0)`,
/// an add is unbounded. Both the update and the audit insert run in one
/// database transaction.
pub async fn apply_inventory_movement(
    pool: &SqlitePool,
    item_number: i64,
    payload: MovementPayload,
    performed_by: Option<i64>,
) -> Result<(InventoryItem, InventoryTransaction)> {
    validate_movement_quantity(payload.quantity)?;

    let at = Utc::now();
    let mut tx = pool.begin().await.context("Failed to open transaction")?;

    let update = match payload.action {
        InventoryAction::Take => {
            "UPDATE inventory_items SET quantity = MAX(quantity - ?, 0) WHERE number = ?"
        }
        InventoryAction::Add => {
            "UPDATE inventory_items SET quantity = quantity + ? WHERE number = ?"
        }
    };

    let updated = sqlx::query(update)
        .bind(payload.quantity)
        .bind(item_number)
        .execute(&mut *tx)
        .await
        .context("Failed to update inventory item quantity")?
        .rows_affected();

    if updated == 0 {
        return Err(DomainError::ItemNotFound(item_number).into());
    }

    let transaction_id = sqlx::query(
        "INSERT INTO inventory_transactions (item_number, action, quantity, performed_by, at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(item_number)
    .bind(payload.action)
    .bind(payload.quantity)
    .bind(performed_by)
    .bind(at)
    .execute(&mut *tx)
    .await
    .context("Failed to insert inventory transaction into DB")?
    .last_insert_rowid();

    let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE number = ?")
        .bind(item_number)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to re-read inventory item after movement")?;

    tx.commit()
        .await
        .context("Failed to commit inventory movement")?;

    info!(
        "Applied {:?} of {} to item {}, quantity now {}",
        payload.action, payload.quantity, item_number, item.quantity
    );

    Ok((
        item,
        InventoryTransaction {
            id: transaction_id,
            item_number,
            action: payload.action,
            quantity: payload.quantity,
            performed_by,
            at,
        },
    ))
}

/// Retrieves the audit trail of an item, newest first.
pub async fn list_item_transactions(
    pool: &SqlitePool,
    item_number: i64,
) -> Result<Vec<InventoryTransaction>> {
    sqlx::query_as::<_, InventoryTransaction>(
        "SELECT * FROM inventory_transactions WHERE item_number = ? ORDER BY at DESC, id DESC",
    )
    .bind(item_number)
    .fetch_all(pool)
    .await
    .context("Failed to retrieve inventory transactions from DB")
}

/// Counts of rows removed by [`clear_demo_data`], per entity type.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedCounts {
    pub tasks: u64,
    pub transactions: u64,
    pub items: u64,
}

/// Deletes all task records, inventory transactions, then inventory items,
/// in that order and in one transaction. Engineers are kept. Member
/// associations go with their task records via the cascade rule.
pub async fn clear_demo_data(pool: &SqlitePool) -> Result<ClearedCounts> {
    let mut tx = pool.begin().await.context("Failed to open transaction")?;

    let tasks = sqlx::query("DELETE FROM task_records")
        .execute(&mut *tx)
        .await
        .context("Failed to delete task records")?
        .rows_affected();
    let transactions = sqlx::query("DELETE FROM inventory_transactions")
        .execute(&mut *tx)
        .await
        .context("Failed to delete inventory transactions")?
        .rows_affected();
    let items = sqlx::query("DELETE FROM inventory_items")
        .execute(&mut *tx)
        .await
        .context("Failed to delete inventory items")?
        .rows_affected();

    tx.commit().await.context("Failed to commit bulk clear")?;

    info!(
        "Cleared demo data: tasks={}, transactions={}, items={}",
        tasks, transactions, items
    );

    Ok(ClearedCounts {
        tasks,
        transactions,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Helper function to set up an in-memory SQLite database for testing.
    /// A single pooled connection keeps every query on the same in-memory
    /// database; the schema is the production one from `create_schema`.
    async fn setup_test_db() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("Failed to connect to in-memory SQLite");
        create_schema(&pool).await.expect("Failed to create schema");
        pool
    }

    fn engineer_payload(et_id: &str, name: &str, leader: bool) -> CreateEngineerPayload {
        CreateEngineerPayload {
            et_id: et_id.to_string(),
            name: name.to_string(),
            is_team_leader: leader,
        }
    }

    fn task_payload(description: &str) -> CreateTaskPayload {
        CreateTaskPayload {
            report_date: None,
            shift: "Day".to_string(),
            reporter: String::new(),
            location: "Boiler house".to_string(),
            equipment_type: "Pump".to_string(),
            category: TaskCategory::Maintenance,
            description: description.to_string(),
            cause_of_problem: String::new(),
            corrective_measure: String::new(),
            start_time: None,
            end_time: None,
            time_taken: None,
            status: String::new(),
            remark: String::new(),
            team_members: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_engineer_et_id_is_unique() {
        let pool = setup_test_db().await;
        create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();

        // Act: same ET id again, different name
        let err = create_engineer(&pool, engineer_payload("ET-01", "Someone Else", false))
            .await
            .unwrap_err();

        // Assert: rejected as a duplicate, first row untouched
        assert_eq!(
            err.downcast_ref::<DomainError>(),
            Some(&DomainError::DuplicateEngineer("ET-01".to_string()))
        );
        let engineers = list_engineers(&pool).await.unwrap();
        assert_eq!(engineers.len(), 1);
        assert_eq!(engineers[0].name, "Abel");
    }

    #[tokio::test]
    async fn test_create_task_expands_reporter_and_derives_duration() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();
        create_engineer(&pool, engineer_payload("ET-02", "Biruk", false))
            .await
            .unwrap();
        create_engineer(&pool, engineer_payload("ET-03", "Chala", false))
            .await
            .unwrap();

        let mut payload = task_payload("Replaced the impeller");
        payload.team_members = vec!["ET-02".to_string(), "ET-03".to_string()];
        payload.start_time = Some(Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap());
        payload.end_time = Some(Utc.with_ymd_and_hms(2025, 6, 10, 10, 30, 0).unwrap());

        let record = create_task_record(&pool, &abel, payload).await.unwrap();

        assert_eq!(record.reporter, "Abel, Biruk, Chala");
        assert_eq!(record.time_taken, Some("02:30:00".to_string()));
        assert_eq!(record.engineer_id, abel.id);

        // The listing round-trips the member names in association order.
        let records = list_task_records(&pool, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team_members, vec!["Biruk", "Chala"]);
    }

    #[tokio::test]
    async fn test_create_task_preserves_explicit_time_taken() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();

        let mut payload = task_payload("Routine lube check");
        payload.start_time = Some(Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap());
        payload.end_time = Some(Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap());
        payload.time_taken = Some("half a shift".to_string());

        let record = create_task_record(&pool, &abel, payload).await.unwrap();
        assert_eq!(record.time_taken, Some("half a shift".to_string()));
    }

    #[tokio::test]
    async fn test_repeated_team_member_is_stored_once() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();
        create_engineer(&pool, engineer_payload("ET-02", "Biruk", false))
            .await
            .unwrap();

        let mut payload = task_payload("Belt tensioning");
        payload.team_members = vec!["ET-02".to_string(), "ET-02".to_string()];

        let record = create_task_record(&pool, &abel, payload).await.unwrap();

        // One association, no duplicate in the expanded reporter
        assert_eq!(record.team_members, vec!["Biruk"]);
        assert_eq!(record.reporter, "Abel, Biruk");
        let records = list_task_records(&pool, None).await.unwrap();
        assert_eq!(records[0].team_members, vec!["Biruk"]);
    }

    #[tokio::test]
    async fn test_create_task_rejects_unknown_team_member() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();

        let mut payload = task_payload("Filter swap");
        payload.team_members = vec!["ET-99".to_string()];

        let err = create_task_record(&pool, &abel, payload).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DomainError>(),
            Some(&DomainError::UnknownEngineer("ET-99".to_string()))
        );
        assert!(list_task_records(&pool, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_task_records_filters_by_date_range() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();
        create_task_record(&pool, &abel, task_payload("Inside range"))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let in_range = list_task_records(&pool, Some((today, today))).await.unwrap();
        assert_eq!(in_range.len(), 1);

        let last_week = today - chrono::Duration::days(7);
        let out_of_range = list_task_records(&pool, Some((last_week, last_week)))
            .await
            .unwrap();
        assert!(out_of_range.is_empty());
    }

    #[tokio::test]
    async fn test_task_summary_counts_per_engineer_and_category() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", true))
            .await
            .unwrap();
        let biruk = create_engineer(&pool, engineer_payload("ET-02", "Biruk", false))
            .await
            .unwrap();

        let mut preventive = task_payload("PM round");
        preventive.category = TaskCategory::Preventive;
        create_task_record(&pool, &abel, preventive.clone())
            .await
            .unwrap();
        create_task_record(&pool, &abel, preventive).await.unwrap();
        create_task_record(&pool, &biruk, task_payload("Breakdown fix"))
            .await
            .unwrap();

        let dashboard = task_summary(&pool, None).await.unwrap();

        assert_eq!(dashboard.summary.len(), 2);
        let abel_row = dashboard
            .summary
            .iter()
            .find(|r| r.et_id == "ET-01")
            .unwrap();
        assert_eq!(abel_row.category, TaskCategory::Preventive);
        assert_eq!(abel_row.count, 2);

        assert_eq!(dashboard.totals.len(), 2);
        let abel_total = dashboard
            .totals
            .iter()
            .find(|t| t.et_id == "ET-01")
            .unwrap();
        assert_eq!(abel_total.total, 2);
        assert_eq!(dashboard.unique_dates.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_price_gets_a_price_error() {
        let pool = setup_test_db().await;
        let err = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Coupling".to_string(),
                quantity: 3,
                price: -1.5,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<DomainError>(),
            Some(&DomainError::InvalidPrice)
        );
        assert!(list_inventory_items(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_take_clamps_at_zero() {
        let pool = setup_test_db().await;
        let item = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Gasket".to_string(),
                quantity: 10,
                price: 2.0,
            },
        )
        .await
        .unwrap();

        let (updated, tx) = apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Take,
                quantity: 20,
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(updated.quantity, 0);
        assert_eq!(tx.quantity, 20); // the audit row keeps the requested amount
    }

    #[tokio::test]
    async fn test_take_within_stock_and_add() {
        let pool = setup_test_db().await;
        let item = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Bolt M8".to_string(),
                quantity: 10,
                price: 0.1,
            },
        )
        .await
        .unwrap();

        let (after_take, _) = apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Take,
                quantity: 4,
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(after_take.quantity, 6);

        let (after_add, _) = apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Add,
                quantity: 5,
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(after_add.quantity, 11);

        let trail = list_item_transactions(&pool, item.number).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action, InventoryAction::Add); // newest first
    }

    #[tokio::test]
    async fn test_negative_movement_is_rejected_and_item_unchanged() {
        let pool = setup_test_db().await;
        let item = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Seal kit".to_string(),
                quantity: 5,
                price: 15.0,
            },
        )
        .await
        .unwrap();

        let err = apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Take,
                quantity: -3,
            },
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<DomainError>(),
            Some(&DomainError::InvalidQuantity)
        );
        let unchanged = get_inventory_item(&pool, item.number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.quantity, 5);
        assert!(
            list_item_transactions(&pool, item.number)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_movement_against_missing_item_is_not_found() {
        let pool = setup_test_db().await;
        let err = apply_inventory_movement(
            &pool,
            42,
            MovementPayload {
                action: InventoryAction::Add,
                quantity: 1,
            },
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DomainError>(),
            Some(&DomainError::ItemNotFound(42))
        );
    }

    #[tokio::test]
    async fn test_deleting_engineer_cascades_tasks_and_nulls_transactions() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();
        create_task_record(&pool, &abel, task_payload("Doomed record"))
            .await
            .unwrap();
        let item = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Fuse".to_string(),
                quantity: 3,
                price: 1.0,
            },
        )
        .await
        .unwrap();
        apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Take,
                quantity: 1,
            },
            Some(abel.id),
        )
        .await
        .unwrap();

        // Act: remove the engineer out-of-band (account deprovisioning)
        sqlx::query("DELETE FROM engineers WHERE id = ?")
            .bind(abel.id)
            .execute(&pool)
            .await
            .unwrap();

        // Assert: tasks cascade away, the audit row survives with a null actor
        assert!(list_task_records(&pool, None).await.unwrap().is_empty());
        let trail = list_item_transactions(&pool, item.number).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].performed_by, None);
    }

    #[tokio::test]
    async fn test_deleting_item_cascades_transactions() {
        let pool = setup_test_db().await;
        let item = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Relay".to_string(),
                quantity: 2,
                price: 4.0,
            },
        )
        .await
        .unwrap();
        apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Add,
                quantity: 1,
            },
            None,
        )
        .await
        .unwrap();

        sqlx::query("DELETE FROM inventory_items WHERE number = ?")
            .bind(item.number)
            .execute(&pool)
            .await
            .unwrap();

        assert!(
            list_item_transactions(&pool, item.number)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_clear_demo_data_reports_counts_and_keeps_engineers() {
        let pool = setup_test_db().await;
        let abel = create_engineer(&pool, engineer_payload("ET-01", "Abel", false))
            .await
            .unwrap();
        create_task_record(&pool, &abel, task_payload("First"))
            .await
            .unwrap();
        create_task_record(&pool, &abel, task_payload("Second"))
            .await
            .unwrap();
        let item = create_inventory_item(
            &pool,
            CreateItemPayload {
                item: "Grease".to_string(),
                quantity: 8,
                price: 6.0,
            },
        )
        .await
        .unwrap();
        apply_inventory_movement(
            &pool,
            item.number,
            MovementPayload {
                action: InventoryAction::Take,
                quantity: 2,
            },
            Some(abel.id),
        )
        .await
        .unwrap();

        let counts = clear_demo_data(&pool).await.unwrap();

        assert_eq!(
            counts,
            ClearedCounts {
                tasks: 2,
                transactions: 1,
                items: 1
            }
        );
        assert!(list_task_records(&pool, None).await.unwrap().is_empty());
        assert!(list_inventory_items(&pool).await.unwrap().is_empty());
        assert_eq!(list_engineers(&pool).await.unwrap().len(), 1);
    }
}
