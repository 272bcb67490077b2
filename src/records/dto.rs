use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::records::repo_types::{CategoryKind, Entry, ShoppingItem};

/// Body for creating an expense or an income entry.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateEntryRequest {
    pub title: String,
    pub amount: Option<Decimal>,
    pub category: String,
    #[serde(deserialize_with = "crate::dates::option::deserialize")]
    pub date: Option<Date>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateShoppingItemRequest {
    pub name: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShoppingItemRequest {
    pub purchased: bool,
}

/// Optional overrides when a shopping item is bought.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PurchaseRequest {
    pub price: Option<Decimal>,
    #[serde(deserialize_with = "crate::dates::option::deserialize")]
    pub date: Option<Date>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Serialize)]
pub struct RowCountResponse {
    pub message: &'static str,
    #[serde(rename = "rowCount")]
    pub row_count: u64,
}

impl RowCountResponse {
    pub fn deleted(row_count: u64) -> Self {
        Self {
            message: "Deleted",
            row_count,
        }
    }

    pub fn updated(row_count: u64) -> Self {
        Self {
            message: "Updated",
            row_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub item: ShoppingItem,
    pub expense: Entry,
}
