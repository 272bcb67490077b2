use std::sync::Arc;

use axum::extract::FromRef;
use time::{Date, Month};
use uuid::Uuid;

use crate::{
    auth::repo::CredentialStore,
    error::{ApiError, ApiResult},
    ledger::aggregate::{self, Dashboard, Palette, Summary},
    records::{repo::RecordStore, repo_types::EntryKind},
    state::AppState,
};

/// Loads a user's entries and runs the aggregations over them.
#[derive(Clone)]
pub struct Ledger {
    users: Arc<dyn CredentialStore>,
    records: Arc<dyn RecordStore>,
}

impl FromRef<AppState> for Ledger {
    fn from_ref(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            records: state.records.clone(),
        }
    }
}

impl Ledger {
    pub async fn dashboard(&self, user_id: Uuid, today: Date) -> ApiResult<Dashboard> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))?;
        let expenses = self.records.list_entries(EntryKind::Expense, user_id).await?;
        let income = self.records.list_entries(EntryKind::Income, user_id).await?;
        Ok(aggregate::dashboard(&expenses, &income, user.monthly_salary, today))
    }

    pub async fn summary(&self, user_id: Uuid, year: i32, month: u8) -> ApiResult<Summary> {
        let month = Month::try_from(month)
            .map_err(|_| ApiError::validation("Month must be between 1 and 12"))?;
        let expenses = self.records.list_entries(EntryKind::Expense, user_id).await?;
        let income = self.records.list_entries(EntryKind::Income, user_id).await?;
        let palette = Palette::new(&self.records.list_categories(user_id).await?);
        Ok(aggregate::summary(&expenses, &income, &palette, year, month))
    }
}
