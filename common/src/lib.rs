// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Shared domain types and rules for the maintenance-reporting and
//! inventory service. The `server` crate persists these through sqlx and
//! exposes them over HTTP; everything here is framework-free so the rules
//! can be unit tested without a database.

pub mod error;
pub mod inventory;
pub mod task;

pub use error::DomainError;
pub use inventory::{
    CreateItemPayload, InventoryAction, InventoryItem, InventoryItemView, InventoryTransaction,
    MovementPayload, validate_movement_quantity,
};
pub use task::{
    CreateEngineerPayload, CreateTaskPayload, Engineer, TaskCategory, TaskRecord,
    derive_time_taken, expand_reporter, format_elapsed, validate_timing,
};
