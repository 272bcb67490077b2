use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Expense and income rows share one shape and live in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Expense,
    Income,
}

impl EntryKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            EntryKind::Expense => "expenses",
            EntryKind::Income => "income",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Expense => "Expense",
            EntryKind::Income => "Income",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub category: String,
    #[serde(with = "crate::dates")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub amount: Decimal,
    pub category: String,
    pub date: Date,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub purchased: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewShoppingItem {
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "category_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Expense,
    Income,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub kind: CategoryKind,
}

/// Color used for categories without one of their own.
pub const FALLBACK_COLOR: &str = "bg-gray-500";

/// Suggested category shown to users until they add their own.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DefaultCategory {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub color: &'static str,
}

pub const DEFAULT_CATEGORIES: &[DefaultCategory] = &[
    DefaultCategory { name: "Food", kind: CategoryKind::Expense, color: "bg-green-500" },
    DefaultCategory { name: "Transport", kind: CategoryKind::Expense, color: "bg-blue-500" },
    DefaultCategory { name: "Utilities", kind: CategoryKind::Expense, color: "bg-yellow-500" },
    DefaultCategory { name: "Entertainment", kind: CategoryKind::Expense, color: "bg-purple-500" },
    DefaultCategory { name: "Health", kind: CategoryKind::Expense, color: "bg-red-500" },
    DefaultCategory { name: "Shopping", kind: CategoryKind::Expense, color: "bg-pink-500" },
    DefaultCategory { name: "Salary", kind: CategoryKind::Income, color: "bg-green-600" },
    DefaultCategory { name: "Freelance", kind: CategoryKind::Income, color: "bg-blue-600" },
    DefaultCategory { name: "Investment", kind: CategoryKind::Income, color: "bg-purple-600" },
    DefaultCategory { name: "Gift", kind: CategoryKind::Income, color: "bg-pink-600" },
];
