// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers;
use axum::{
    Router,
    routing::{delete, get, post},
};
use sqlx::SqlitePool;

/// Creates and configures the application router.
pub fn create_router(pool: SqlitePool) -> Router {
    Router::new()
        // Engineer provisioning and lookup
        .route("/api/engineers", post(handlers::create_engineer))
        .route("/api/engineers", get(handlers::list_engineers))
        // Task submission and the export-facing listing
        .route("/api/tasks", post(handlers::create_task))
        .route("/api/tasks", get(handlers::list_tasks))
        // Leader-only aggregated dashboard
        .route("/api/dashboard", get(handlers::dashboard))
        // Inventory ledger
        .route("/api/inventory/items", post(handlers::create_inventory_item))
        .route("/api/inventory/items", get(handlers::list_inventory_items))
        .route(
            "/api/inventory/items/{number}/transactions",
            post(handlers::apply_movement),
        )
        .route(
            "/api/inventory/items/{number}/transactions",
            get(handlers::list_item_transactions),
        )
        // Administrative bulk clear, gated by ?confirm=true
        .route("/api/admin/demo-data", delete(handlers::clear_demo_data))
        // Adds the database pool to the application state
        .with_state(pool)
}
