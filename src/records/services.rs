use std::sync::Arc;

use axum::extract::FromRef;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    records::{
        dto::{CreateCategoryRequest, CreateEntryRequest, CreateShoppingItemRequest, PurchaseRequest},
        repo::RecordStore,
        repo_types::{
            Category, Entry, EntryKind, NewCategory, NewEntry, NewShoppingItem, ShoppingItem,
            FALLBACK_COLOR,
        },
    },
    state::AppState,
};

/// Category recorded for expenses created from the shopping list.
pub const PURCHASE_CATEGORY: &str = "Shopping";

/// Rejects amounts that a `NUMERIC(14, 2)` column would round or overflow.
pub(crate) fn check_money(field: &str, value: Decimal) -> ApiResult<Decimal> {
    if value.normalize().scale() > 2 {
        return Err(ApiError::validation(format!(
            "{field} must have at most 2 decimal places"
        )));
    }
    if value.abs() >= Decimal::from(1_000_000_000_000_i64) {
        return Err(ApiError::validation(format!("{field} is too large")));
    }
    Ok(value)
}

/// Per-user CRUD over expenses, income, shopping items and categories.
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn RecordStore>,
}

impl FromRef<AppState> for Records {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.records.clone(),
        }
    }
}

impl Records {
    pub async fn list_entries(&self, kind: EntryKind, user_id: Uuid) -> ApiResult<Vec<Entry>> {
        Ok(self.store.list_entries(kind, user_id).await?)
    }

    #[instrument(skip(self, req))]
    pub async fn create_entry(
        &self,
        kind: EntryKind,
        user_id: Uuid,
        req: CreateEntryRequest,
    ) -> ApiResult<Entry> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(ApiError::validation("Title is required"));
        }
        let amount = match req.amount {
            Some(a) if a.is_sign_positive() && !a.is_zero() => check_money("Amount", a)?,
            Some(_) => return Err(ApiError::validation("Amount must be greater than zero")),
            None => return Err(ApiError::validation("Amount is required")),
        };
        let category = req.category.trim();
        if category.is_empty() {
            return Err(ApiError::validation("Category is required"));
        }
        let date = req.date.ok_or_else(|| ApiError::validation("Date is required"))?;

        let entry = self
            .store
            .create_entry(
                kind,
                user_id,
                NewEntry {
                    title: title.to_string(),
                    amount,
                    category: category.to_string(),
                    date,
                },
            )
            .await?;
        info!(entry_id = %entry.id, kind = kind.label(), "entry created");
        Ok(entry)
    }

    pub async fn delete_entry(&self, kind: EntryKind, user_id: Uuid, id: Uuid) -> ApiResult<u64> {
        Ok(self.store.delete_entry(kind, user_id, id).await?)
    }

    pub async fn list_shopping(&self, user_id: Uuid) -> ApiResult<Vec<ShoppingItem>> {
        Ok(self.store.list_shopping(user_id).await?)
    }

    #[instrument(skip(self, req))]
    pub async fn create_shopping(
        &self,
        user_id: Uuid,
        req: CreateShoppingItemRequest,
    ) -> ApiResult<ShoppingItem> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        let price = check_money("Price", req.price.unwrap_or_default())?;
        if price.is_sign_negative() {
            return Err(ApiError::validation("Price must not be negative"));
        }
        Ok(self
            .store
            .create_shopping(
                user_id,
                NewShoppingItem {
                    name: name.to_string(),
                    price,
                },
            )
            .await?)
    }

    pub async fn set_purchased(&self, user_id: Uuid, id: Uuid, purchased: bool) -> ApiResult<u64> {
        Ok(self.store.set_purchased(user_id, id, purchased).await?)
    }

    pub async fn delete_shopping(&self, user_id: Uuid, id: Uuid) -> ApiResult<u64> {
        Ok(self.store.delete_shopping(user_id, id).await?)
    }

    /// Marks a shopping item purchased and records the matching expense.
    ///
    /// The two writes are not atomic. When the expense insert fails the
    /// purchased flag is put back, and the caller gets
    /// [`ApiError::PartialFailure`] saying whether that revert succeeded.
    #[instrument(skip(self, req))]
    pub async fn purchase(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: PurchaseRequest,
    ) -> ApiResult<(ShoppingItem, Entry)> {
        let amount = req.price.map(|p| check_money("Price", p)).transpose()?;
        if amount.is_some_and(|p| p.is_sign_negative()) {
            return Err(ApiError::validation("Price must not be negative"));
        }

        let mut item = self
            .store
            .find_shopping(user_id, id)
            .await?
            .ok_or(ApiError::NotFound("Shopping item"))?;
        let was_purchased = item.purchased;

        if self.store.set_purchased(user_id, id, true).await? == 0 {
            return Err(ApiError::NotFound("Shopping item"));
        }
        item.purchased = true;

        let expense = NewEntry {
            title: item.name.clone(),
            amount: amount.unwrap_or(item.price),
            category: PURCHASE_CATEGORY.to_string(),
            date: req.date.unwrap_or_else(|| OffsetDateTime::now_utc().date()),
        };

        match self.store.create_entry(EntryKind::Expense, user_id, expense).await {
            Ok(entry) => {
                info!(item_id = %id, expense_id = %entry.id, "item purchased");
                Ok((item, entry))
            }
            Err(source) => {
                warn!(item_id = %id, error = %source, "expense insert failed, reverting purchased flag");
                let compensated = match self.store.set_purchased(user_id, id, was_purchased).await {
                    Ok(1) => true,
                    Ok(rows) => {
                        error!(item_id = %id, rows, "purchased flag revert matched no item");
                        false
                    }
                    Err(e) => {
                        error!(item_id = %id, error = %e, "could not revert purchased flag");
                        false
                    }
                };
                Err(ApiError::PartialFailure {
                    completed: "mark_purchased",
                    failed: "record_expense",
                    compensated,
                    source,
                })
            }
        }
    }

    pub async fn list_categories(&self, user_id: Uuid) -> ApiResult<Vec<Category>> {
        Ok(self.store.list_categories(user_id).await?)
    }

    #[instrument(skip(self, req))]
    pub async fn create_category(
        &self,
        user_id: Uuid,
        req: CreateCategoryRequest,
    ) -> ApiResult<Category> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        let kind = req
            .kind
            .ok_or_else(|| ApiError::validation("Type must be expense or income"))?;
        let color = match req.color.trim() {
            "" => FALLBACK_COLOR,
            c => c,
        };
        Ok(self
            .store
            .create_category(
                user_id,
                NewCategory {
                    name: name.to_string(),
                    color: color.to_string(),
                    kind,
                },
            )
            .await?)
    }

    pub async fn delete_category(&self, user_id: Uuid, id: Uuid) -> ApiResult<u64> {
        Ok(self.store.delete_category(user_id, id).await?)
    }
}
