use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::records::repo_types::{
    Category, Entry, EntryKind, NewCategory, NewEntry, NewShoppingItem, ShoppingItem,
};

/// Per-user ledger records. Every operation is scoped by the owning user id;
/// deletes and updates on rows owned by someone else affect zero rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_entries(&self, kind: EntryKind, user_id: Uuid) -> anyhow::Result<Vec<Entry>>;
    async fn create_entry(&self, kind: EntryKind, user_id: Uuid, entry: NewEntry) -> anyhow::Result<Entry>;
    async fn delete_entry(&self, kind: EntryKind, user_id: Uuid, id: Uuid) -> anyhow::Result<u64>;

    async fn list_shopping(&self, user_id: Uuid) -> anyhow::Result<Vec<ShoppingItem>>;
    async fn find_shopping(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<ShoppingItem>>;
    async fn create_shopping(&self, user_id: Uuid, item: NewShoppingItem) -> anyhow::Result<ShoppingItem>;
    async fn set_purchased(&self, user_id: Uuid, id: Uuid, purchased: bool) -> anyhow::Result<u64>;
    async fn delete_shopping(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<u64>;

    async fn list_categories(&self, user_id: Uuid) -> anyhow::Result<Vec<Category>>;
    async fn create_category(&self, user_id: Uuid, category: NewCategory) -> anyhow::Result<Category>;
    async fn delete_category(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgRecordStore {
    db: PgPool,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list_entries(&self, kind: EntryKind, user_id: Uuid) -> anyhow::Result<Vec<Entry>> {
        let sql = format!(
            r#"
            SELECT id, user_id, title, amount, category, date, created_at
              FROM {}
             WHERE user_id = $1
             ORDER BY date DESC, created_at DESC
            "#,
            kind.table()
        );
        let rows = sqlx::query_as::<_, Entry>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("list {}", kind.table()))?;
        Ok(rows)
    }

    async fn create_entry(&self, kind: EntryKind, user_id: Uuid, entry: NewEntry) -> anyhow::Result<Entry> {
        let sql = format!(
            r#"
            INSERT INTO {} (user_id, title, amount, category, date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, amount, category, date, created_at
            "#,
            kind.table()
        );
        let row = sqlx::query_as::<_, Entry>(&sql)
            .bind(user_id)
            .bind(&entry.title)
            .bind(entry.amount)
            .bind(&entry.category)
            .bind(entry.date)
            .fetch_one(&self.db)
            .await
            .with_context(|| format!("insert into {}", kind.table()))?;
        Ok(row)
    }

    async fn delete_entry(&self, kind: EntryKind, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", kind.table());
        let res = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .with_context(|| format!("delete from {}", kind.table()))?;
        Ok(res.rows_affected())
    }

    async fn list_shopping(&self, user_id: Uuid) -> anyhow::Result<Vec<ShoppingItem>> {
        let rows = sqlx::query_as::<_, ShoppingItem>(
            r#"
            SELECT id, user_id, name, price, purchased, created_at
              FROM shopping_items
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list shopping items")?;
        Ok(rows)
    }

    async fn find_shopping(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<ShoppingItem>> {
        let row = sqlx::query_as::<_, ShoppingItem>(
            r#"
            SELECT id, user_id, name, price, purchased, created_at
              FROM shopping_items
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find shopping item")?;
        Ok(row)
    }

    async fn create_shopping(&self, user_id: Uuid, item: NewShoppingItem) -> anyhow::Result<ShoppingItem> {
        let row = sqlx::query_as::<_, ShoppingItem>(
            r#"
            INSERT INTO shopping_items (user_id, name, price)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, price, purchased, created_at
            "#,
        )
        .bind(user_id)
        .bind(&item.name)
        .bind(item.price)
        .fetch_one(&self.db)
        .await
        .context("insert shopping item")?;
        Ok(row)
    }

    async fn set_purchased(&self, user_id: Uuid, id: Uuid, purchased: bool) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"UPDATE shopping_items SET purchased = $1 WHERE id = $2 AND user_id = $3"#,
        )
        .bind(purchased)
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("update shopping item")?;
        Ok(res.rows_affected())
    }

    async fn delete_shopping(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"DELETE FROM shopping_items WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete shopping item")?;
        Ok(res.rows_affected())
    }

    async fn list_categories(&self, user_id: Uuid) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, user_id, name, color, kind, created_at
              FROM categories
             WHERE user_id = $1
             ORDER BY kind, name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list categories")?;
        Ok(rows)
    }

    async fn create_category(&self, user_id: Uuid, category: NewCategory) -> anyhow::Result<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (user_id, name, color, kind)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, color, kind, created_at
            "#,
        )
        .bind(user_id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(category.kind)
        .fetch_one(&self.db)
        .await
        .context("insert category")?;
        Ok(row)
    }

    async fn delete_category(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"DELETE FROM categories WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete category")?;
        Ok(res.rows_affected())
    }
}
