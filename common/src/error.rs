// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use thiserror::Error;

/// Typed domain failures. The server wraps these in `anyhow::Error` on the
/// way up and downcasts again when picking an HTTP status, so the data layer
/// can keep using `.context(..)` everywhere.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("End time must be after start time")]
    EndBeforeStart,

    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Price must be a non-negative number")]
    InvalidPrice,

    #[error("An engineer with ET id '{0}' already exists")]
    DuplicateEngineer(String),

    #[error("Unknown engineer '{0}'")]
    UnknownEngineer(String),

    #[error("Inventory item {0} not found")]
    ItemNotFound(i64),
}
