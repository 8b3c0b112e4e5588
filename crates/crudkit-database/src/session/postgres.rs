//! PostgreSQL storage session.
//!
//! Each [`PgSession`] lazily begins one sqlx transaction on first use and
//! keeps it until commit or rollback. Dropping the session drops the
//! transaction, which rolls it back.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Transaction};
use tracing::debug;

use crudkit_core::error::AppError;
use crudkit_core::result::AppResult;
use crudkit_core::traits::{ListWindow, SessionFactory, StorageSession, Table};
use crudkit_core::types::{FieldMap, FieldValue, FilterSpec, Record};

use super::sql::{self, Builder, classify};
use crate::connection::DatabasePool;

/// Session factory over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabasePool,
}

impl PgStore {
    /// Create a store over a connected pool.
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionFactory for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn open(&self) -> AppResult<Box<dyn StorageSession>> {
        Ok(Box::new(PgSession::new(self.db.pool().clone())))
    }

    async fn ping(&self) -> AppResult<()> {
        if self.db.health_check().await? {
            Ok(())
        } else {
            Err(AppError::database("Health check returned an unexpected value"))
        }
    }
}

/// One transactional session on a PostgreSQL pool.
pub struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    /// Create a session; no connection is taken until the first statement.
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    async fn transaction(&mut self) -> AppResult<&mut Transaction<'static, Postgres>> {
        if self.tx.is_none() {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| classify(e, "Failed to begin transaction"))?;
            self.tx = Some(tx);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction was not started"))
    }

    async fn fetch_optional(&mut self, mut qb: Builder, context: &str) -> AppResult<Option<PgRow>> {
        let tx = self.transaction().await?;
        qb.build()
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| classify(e, context))
    }

    async fn fetch_all(&mut self, mut qb: Builder, context: &str) -> AppResult<Vec<PgRow>> {
        let tx = self.transaction().await?;
        qb.build()
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| classify(e, context))
    }
}

fn select_from(table: &Table) -> Builder {
    let mut qb = Builder::new("SELECT ");
    sql::push_columns(&mut qb, table);
    qb.push(" FROM ");
    sql::push_ident(&mut qb, table.name);
    qb
}

fn returning(qb: &mut Builder, table: &Table) {
    qb.push(" RETURNING ");
    sql::push_columns(qb, table);
}

fn insert_into(table: &Table, values: &FieldMap) -> AppResult<Builder> {
    let mut qb = Builder::new("INSERT INTO ");
    sql::push_ident(&mut qb, table.name);
    if values.is_empty() {
        qb.push(" DEFAULT VALUES");
    } else {
        qb.push(" (");
        sql::push_payload_columns(&mut qb, values);
        qb.push(") VALUES (");
        sql::push_payload_values(&mut qb, table, values)?;
        qb.push(")");
    }
    Ok(qb)
}

#[async_trait]
impl StorageSession for PgSession {
    async fn insert_returning(&mut self, table: &'static Table, values: &FieldMap) -> AppResult<Record> {
        let mut qb = insert_into(table, values)?;
        returning(&mut qb, table);

        let context = format!("Failed to insert {}", table.entity_name);
        let row = self
            .fetch_optional(qb, &context)
            .await?
            .ok_or_else(|| AppError::database(format!("{context}: no row returned")))?;
        sql::decode_row(table, &row)
    }

    async fn update_returning(
        &mut self,
        table: &'static Table,
        key: &FieldValue,
        values: &FieldMap,
    ) -> AppResult<Option<Record>> {
        if values.is_empty() {
            return self.fetch_by_key(table, key).await;
        }

        let mut qb = Builder::new("UPDATE ");
        sql::push_ident(&mut qb, table.name);
        qb.push(" SET ");
        sql::push_assignments(&mut qb, table, values)?;
        qb.push(" WHERE ");
        sql::push_key_match(&mut qb, table, key)?;
        returning(&mut qb, table);

        let context = format!("Failed to update {}", table.entity_name);
        self.fetch_optional(qb, &context)
            .await?
            .map(|row| sql::decode_row(table, &row))
            .transpose()
    }

    async fn upsert_returning(
        &mut self,
        table: &'static Table,
        values: &FieldMap,
        updates: &FieldMap,
    ) -> AppResult<Record> {
        let mut qb = insert_into(table, values)?;
        qb.push(" ON CONFLICT (");
        sql::push_ident(&mut qb, table.primary_key);
        qb.push(") DO UPDATE SET ");
        if updates.is_empty() {
            // DO NOTHING would return no row.
            sql::push_ident(&mut qb, table.primary_key);
            qb.push(" = EXCLUDED.");
            sql::push_ident(&mut qb, table.primary_key);
        } else {
            sql::push_assignments(&mut qb, table, updates)?;
        }
        returning(&mut qb, table);

        let context = format!("Failed to upsert {}", table.entity_name);
        let row = self
            .fetch_optional(qb, &context)
            .await?
            .ok_or_else(|| AppError::database(format!("{context}: no row returned")))?;
        sql::decode_row(table, &row)
    }

    async fn delete(&mut self, table: &'static Table, key: &FieldValue) -> AppResult<u64> {
        let mut qb = Builder::new("DELETE FROM ");
        sql::push_ident(&mut qb, table.name);
        qb.push(" WHERE ");
        sql::push_key_match(&mut qb, table, key)?;

        let tx = self.transaction().await?;
        let result = qb
            .build()
            .execute(&mut **tx)
            .await
            .map_err(|e| classify(e, &format!("Failed to delete {}", table.entity_name)))?;
        Ok(result.rows_affected())
    }

    async fn fetch_by_key(&mut self, table: &'static Table, key: &FieldValue) -> AppResult<Option<Record>> {
        let mut qb = select_from(table);
        qb.push(" WHERE ");
        sql::push_key_match(&mut qb, table, key)?;

        let context = format!("Failed to find {}", table.entity_name);
        self.fetch_optional(qb, &context)
            .await?
            .map(|row| sql::decode_row(table, &row))
            .transpose()
    }

    async fn fetch_by_keys(&mut self, table: &'static Table, keys: &[FieldValue]) -> AppResult<Vec<Record>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pk = table.primary_key_column()?;

        let mut qb = select_from(table);
        qb.push(" WHERE ");
        sql::push_ident(&mut qb, pk.name);
        qb.push(" IN (");
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            sql::push_value(&mut qb, pk, key)?;
        }
        qb.push(")");

        let context = format!("Failed to list {} by ids", table.entity_name);
        self.fetch_all(qb, &context)
            .await?
            .iter()
            .map(|row| sql::decode_row(table, row))
            .collect()
    }

    async fn list(
        &mut self,
        table: &'static Table,
        filter: Option<&FilterSpec>,
        window: &ListWindow,
    ) -> AppResult<Vec<Record>> {
        let mut qb = select_from(table);
        sql::push_where(&mut qb, table, filter)?;
        sql::push_window(&mut qb, table, window)?;

        let context = format!("Failed to list {}", table.entity_name);
        self.fetch_all(qb, &context)
            .await?
            .iter()
            .map(|row| sql::decode_row(table, row))
            .collect()
    }

    async fn count(&mut self, table: &'static Table, filter: Option<&FilterSpec>) -> AppResult<u64> {
        let mut qb = Builder::new("SELECT COUNT(*) FROM ");
        sql::push_ident(&mut qb, table.name);
        sql::push_where(&mut qb, table, filter)?;

        let tx = self.transaction().await?;
        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| classify(e, &format!("Failed to count {}", table.entity_name)))?;
        Ok(total.max(0) as u64)
    }

    async fn commit(&mut self) -> AppResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .map_err(|e| classify(e, "Failed to commit transaction"))?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> AppResult<()> {
        // Statements run eagerly on the open transaction.
        debug!(open = self.tx.is_some(), "Flush requested");
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback()
                .await
                .map_err(|e| classify(e, "Failed to roll back transaction"))?;
        }
        Ok(())
    }
}
