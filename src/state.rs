use crate::auth::repo::{CredentialStore, PgCredentialStore};
use crate::config::AppConfig;
use crate::mail::{self, Mailer};
use crate::rate_limit::RateLimiter;
use crate::records::repo::{PgRecordStore, RecordStore};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn CredentialStore>,
    pub records: Arc<dyn RecordStore>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let users = Arc::new(PgCredentialStore::new(db.clone())) as Arc<dyn CredentialStore>;
        let records = Arc::new(PgRecordStore::new(db.clone())) as Arc<dyn RecordStore>;
        let mailer = mail::from_config(&config.mail);

        Ok(Self::from_parts(db, config, users, records, mailer))
    }

    pub fn from_parts(
        db: PgPool,
        config: Arc<AppConfig>,
        users: Arc<dyn CredentialStore>,
        records: Arc<dyn RecordStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        Self {
            db,
            config,
            users,
            records,
            mailer,
            limiter,
        }
    }
}
