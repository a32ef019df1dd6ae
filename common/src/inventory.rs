// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One stock-keeping unit. `number` is the primary key shown on the ledger;
/// quantity never goes negative (takes clamp at zero in the data layer).
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct InventoryItem {
    pub number: i64,
    pub item: String,
    pub quantity: i64,
    pub price: f64,
}

impl InventoryItem {
    /// Stock value of this line: quantity times unit price.
    pub fn balance(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// Read model for ledger listings, with the derived balance materialized
/// for the export collaborator.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InventoryItemView {
    pub number: i64,
    pub item: String,
    pub quantity: i64,
    pub price: f64,
    pub balance: f64,
}

impl From<InventoryItem> for InventoryItemView {
    fn from(item: InventoryItem) -> Self {
        let balance = item.balance();
        Self {
            number: item.number,
            item: item.item,
            quantity: item.quantity,
            price: item.price,
            balance,
        }
    }
}

/// Direction of a stock movement.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InventoryAction {
    Take,
    Add,
}

/// Audit record of one stock movement. Immutable once written;
/// `performed_by` is nulled if the engineer is later removed.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct InventoryTransaction {
    pub id: i64,
    pub item_number: i64,
    pub action: InventoryAction,
    pub quantity: i64,
    pub performed_by: Option<i64>,
    pub at: DateTime<Utc>,
}

/// Structure used to receive a stock movement from the API.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MovementPayload {
    pub action: InventoryAction,
    pub quantity: i64,
}

/// Structure used to seed an inventory item.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateItemPayload {
    pub item: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
}

/// Rejects movements whose quantity is not a positive integer.
pub fn validate_movement_quantity(quantity: i64) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidQuantity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_and_zero_quantities_are_rejected() {
        assert_eq!(
            validate_movement_quantity(-3),
            Err(DomainError::InvalidQuantity)
        );
        assert_eq!(
            validate_movement_quantity(0),
            Err(DomainError::InvalidQuantity)
        );
        assert!(validate_movement_quantity(1).is_ok());
    }

    #[test]
    fn test_balance_is_quantity_times_price() {
        let item = InventoryItem {
            number: 1,
            item: "Bearing 6204".to_string(),
            quantity: 12,
            price: 3.5,
        };
        assert_eq!(item.balance(), 42.0);
    }

    #[test]
    fn test_item_view_carries_derived_balance() {
        let view: InventoryItemView = InventoryItem {
            number: 7,
            item: "V-belt".to_string(),
            quantity: 3,
            price: 10.0,
        }
        .into();
        assert_eq!(view.balance, 30.0);
    }
}
