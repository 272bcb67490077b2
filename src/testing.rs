//! In-memory stand-ins for the database and mail relay.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{CreateUserError, CredentialStore},
        repo_types::{NewUser, ProfileUpdate, Role, Status, User},
    },
    config::AppConfig,
    mail::{MailMessage, Mailer},
    records::{
        repo::RecordStore,
        repo_types::{Category, Entry, EntryKind, NewCategory, NewEntry, NewShoppingItem, ShoppingItem},
    },
    state::AppState,
};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
}

impl MemoryCredentialStore {
    pub async fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn by_email(&self, email: &str) -> Option<User> {
        self.users.lock().await.iter().find(|u| u.email == email).cloned()
    }

    /// Direct write for arranging test scenarios.
    pub async fn edit(&self, id: Uuid, f: impl FnOnce(&mut User)) {
        if let Some(u) = self.users.lock().await.iter_mut().find(|u| u.id == id) {
            f(u);
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(CreateUserError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            status: Status::Active,
            is_verified: new.is_verified,
            verification_token: new.verification_token,
            reset_password_token: None,
            reset_password_expires: None,
            monthly_salary: Decimal::ZERO,
            expected_savings: Decimal::ZERO,
            salary_deposit_day: 1,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.get(id).await)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.by_email(email).await)
    }

    async fn consume_verification_token(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let mut users = self.users.lock().await;
        let Some(u) = users
            .iter_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };
        u.is_verified = true;
        u.verification_token = None;
        Ok(Some(u.id))
    }

    async fn set_reset_token(&self, id: Uuid, token: &str, expires_ms: i64) -> anyhow::Result<u64> {
        let mut users = self.users.lock().await;
        Ok(match users.iter_mut().find(|u| u.id == id) {
            Some(u) => {
                u.reset_password_token = Some(token.to_string());
                u.reset_password_expires = Some(expires_ms);
                1
            }
            None => 0,
        })
    }

    async fn find_by_reset_token(&self, token: &str, now_ms: i64) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token)
                    && u.reset_password_expires.is_some_and(|exp| exp > now_ms)
            })
            .cloned())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<u64> {
        let mut users = self.users.lock().await;
        Ok(
            match users
                .iter_mut()
                .find(|u| u.id == id && u.reset_password_token.as_deref() == Some(token))
            {
                Some(u) => {
                    u.password_hash = password_hash.to_string();
                    u.reset_password_token = None;
                    u.reset_password_expires = None;
                    1
                }
                None => 0,
            },
        )
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.lock().await.clone())
    }

    async fn update_role_status(&self, id: Uuid, role: Role, status: Status) -> anyhow::Result<u64> {
        let mut users = self.users.lock().await;
        Ok(match users.iter_mut().find(|u| u.id == id) {
            Some(u) => {
                u.role = role;
                u.status = status;
                1
            }
            None => 0,
        })
    }

    async fn update_profile(&self, id: Uuid, profile: ProfileUpdate) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.name = profile.name;
            u.monthly_salary = profile.monthly_salary;
            u.expected_savings = profile.expected_savings;
            u.salary_deposit_day = profile.salary_deposit_day;
            u.clone()
        }))
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    expenses: Mutex<Vec<Entry>>,
    income: Mutex<Vec<Entry>>,
    shopping: Mutex<Vec<ShoppingItem>>,
    categories: Mutex<Vec<Category>>,
    /// Makes expense inserts fail, for exercising partial-failure paths.
    pub fail_expense_inserts: AtomicBool,
    /// Makes purchased-flag updates fail once the item is already purchased.
    pub fail_unmark: AtomicBool,
    /// Removes every shopping item when an expense insert fails, as if a
    /// concurrent delete landed between the two writes of a purchase.
    pub drop_items_on_failed_insert: AtomicBool,
}

impl MemoryRecordStore {
    fn table(&self, kind: EntryKind) -> &Mutex<Vec<Entry>> {
        match kind {
            EntryKind::Expense => &self.expenses,
            EntryKind::Income => &self.income,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_entries(&self, kind: EntryKind, user_id: Uuid) -> anyhow::Result<Vec<Entry>> {
        let mut rows: Vec<Entry> = self
            .table(kind)
            .lock()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn create_entry(&self, kind: EntryKind, user_id: Uuid, entry: NewEntry) -> anyhow::Result<Entry> {
        if kind == EntryKind::Expense && self.fail_expense_inserts.load(Ordering::SeqCst) {
            if self.drop_items_on_failed_insert.load(Ordering::SeqCst) {
                self.shopping.lock().await.clear();
            }
            anyhow::bail!("insert into expenses: connection reset");
        }
        let row = Entry {
            id: Uuid::new_v4(),
            user_id,
            title: entry.title,
            amount: entry.amount,
            category: entry.category,
            date: entry.date,
            created_at: OffsetDateTime::now_utc(),
        };
        self.table(kind).lock().await.push(row.clone());
        Ok(row)
    }

    async fn delete_entry(&self, kind: EntryKind, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let mut rows = self.table(kind).lock().await;
        let before = rows.len();
        rows.retain(|e| !(e.id == id && e.user_id == user_id));
        Ok((before - rows.len()) as u64)
    }

    async fn list_shopping(&self, user_id: Uuid) -> anyhow::Result<Vec<ShoppingItem>> {
        let mut rows: Vec<ShoppingItem> = self
            .shopping
            .lock()
            .await
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_shopping(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<ShoppingItem>> {
        Ok(self
            .shopping
            .lock()
            .await
            .iter()
            .find(|i| i.id == id && i.user_id == user_id)
            .cloned())
    }

    async fn create_shopping(&self, user_id: Uuid, item: NewShoppingItem) -> anyhow::Result<ShoppingItem> {
        let row = ShoppingItem {
            id: Uuid::new_v4(),
            user_id,
            name: item.name,
            price: item.price,
            purchased: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.shopping.lock().await.push(row.clone());
        Ok(row)
    }

    async fn set_purchased(&self, user_id: Uuid, id: Uuid, purchased: bool) -> anyhow::Result<u64> {
        let mut rows = self.shopping.lock().await;
        let Some(item) = rows.iter_mut().find(|i| i.id == id && i.user_id == user_id) else {
            return Ok(0);
        };
        if !purchased && self.fail_unmark.load(Ordering::SeqCst) {
            anyhow::bail!("update shopping item: connection reset");
        }
        item.purchased = purchased;
        Ok(1)
    }

    async fn delete_shopping(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let mut rows = self.shopping.lock().await;
        let before = rows.len();
        rows.retain(|i| !(i.id == id && i.user_id == user_id));
        Ok((before - rows.len()) as u64)
    }

    async fn list_categories(&self, user_id: Uuid) -> anyhow::Result<Vec<Category>> {
        Ok(self
            .categories
            .lock()
            .await
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_category(&self, user_id: Uuid, category: NewCategory) -> anyhow::Result<Category> {
        let row = Category {
            id: Uuid::new_v4(),
            user_id,
            name: category.name,
            color: category.color,
            kind: category.kind,
            created_at: OffsetDateTime::now_utc(),
        };
        self.categories.lock().await.push(row.clone());
        Ok(row)
    }

    async fn delete_category(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let mut rows = self.categories.lock().await;
        let before = rows.len();
        rows.retain(|c| !(c.id == id && c.user_id == user_id));
        Ok((before - rows.len()) as u64)
    }
}

/// Captures outgoing mail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// App state wired to in-memory fakes, with handles kept for assertions.
pub struct Harness {
    pub state: AppState,
    pub users: Arc<MemoryCredentialStore>,
    pub records: Arc<MemoryRecordStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_tests())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");
        let users = Arc::new(MemoryCredentialStore::default());
        let records = Arc::new(MemoryRecordStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_parts(
            db,
            Arc::new(config),
            users.clone(),
            records.clone(),
            mailer.clone(),
        );
        Self {
            state,
            users,
            records,
            mailer,
        }
    }
}
