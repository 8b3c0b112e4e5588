//! In-memory storage backend.
//!
//! [`MemoryStore`] keeps committed tables behind a shared mutex. Each
//! [`MemorySession`] reads from a snapshot of the committed tables taken on
//! first use, applies its own writes to that snapshot, and journals them.
//! Commit replays the journal onto the tables as they are at commit time,
//! re-checking constraints, so rows committed meanwhile by other sessions
//! survive. Rollback or drop discards both. Concurrent updates of the same
//! row resolve to the last committer.
//!
//! Sequences are shared by all sessions and never roll back, as in
//! PostgreSQL. Column defaults, not-null and unique constraints are
//! enforced from the table metadata so integrity failures classify exactly
//! as they would on PostgreSQL. `NULL` sorts after every value.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crudkit_core::error::{AppError, IntegrityViolation};
use crudkit_core::result::AppResult;
use crudkit_core::traits::{ColumnDefault, ListWindow, SessionFactory, StorageSession, Table};
use crudkit_core::types::{
    ColumnKind, FieldMap, FieldValue, FilterSpec, Record, SortDirection, SortField,
};

#[derive(Debug, Clone, Default)]
struct TableData {
    rows: Vec<Record>,
    sequence: i64,
}

type Tables = HashMap<&'static str, TableData>;

/// A write waiting for commit.
#[derive(Debug, Clone)]
enum Change {
    Insert(&'static Table, Record),
    Upsert(&'static Table, Record),
    Update(&'static Table, Record),
    Delete(&'static Table, FieldValue),
}

impl Change {
    fn table(&self) -> &'static Table {
        match self {
            Self::Insert(table, _)
            | Self::Upsert(table, _)
            | Self::Update(table, _)
            | Self::Delete(table, _) => table,
        }
    }
}

/// Process-local session factory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a concrete session.
    pub fn session(&self) -> MemorySession {
        MemorySession {
            committed: Arc::clone(&self.committed),
            working: None,
            journal: Vec::new(),
        }
    }

    /// Number of committed rows in a table.
    pub async fn committed_rows(&self, table: &Table) -> usize {
        self.committed
            .lock()
            .await
            .get(table.name)
            .map_or(0, |data| data.rows.len())
    }
}

#[async_trait]
impl SessionFactory for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn open(&self) -> AppResult<Box<dyn StorageSession>> {
        Ok(Box::new(self.session()))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// One session over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    committed: Arc<Mutex<Tables>>,
    /// Snapshot plus this session's own writes.
    working: Option<Tables>,
    /// This session's writes, in order.
    journal: Vec<Change>,
}

impl MemorySession {
    async fn table_mut(&mut self, table: &'static Table) -> &mut TableData {
        if self.working.is_none() {
            let snapshot = self.committed.lock().await.clone();
            self.working = Some(snapshot);
        }
        self.working
            .get_or_insert_with(Tables::new)
            .entry(table.name)
            .or_default()
    }

    async fn rows(&mut self, table: &'static Table) -> &[Record] {
        &self.table_mut(table).await.rows
    }

    /// Build a full row, drawing sequence values from the shared store.
    async fn materialize(&self, table: &'static Table, values: &FieldMap) -> AppResult<Record> {
        let mut committed = self.committed.lock().await;
        let sequence = &mut committed.entry(table.name).or_default().sequence;
        materialize(table, sequence, values)
    }
}
fn key_of<'a>(table: &Table, row: &'a Record) -> &'a FieldValue {
    row.get(table.primary_key).unwrap_or(&FieldValue::Null)
}

fn same(a: &FieldValue, b: &FieldValue) -> bool {
    a.compare(b) == Some(Ordering::Equal)
}

fn violation(table: &Table, kind: IntegrityViolation, column: &str, action: &str) -> AppError {
    AppError::integrity(
        kind,
        format!("Failed to {action} {}: {kind} ({column})", table.entity_name),
    )
}

/// Fill defaults for absent columns and reject unknown ones.
fn materialize(table: &'static Table, sequence: &mut i64, values: &FieldMap) -> AppResult<Record> {
    let now = Utc::now();
    let mut row = Record::new();

    for name in values.columns() {
        table.require_column(name)?;
    }

    for column in table.columns {
        let value = match values.get(column.name) {
            Some(value) => value.clone(),
            None => match column.default {
                Some(ColumnDefault::RandomUuid) => FieldValue::Uuid(Uuid::new_v4()),
                Some(ColumnDefault::Now) => FieldValue::Timestamp(now),
                Some(ColumnDefault::Sequence) => {
                    *sequence += 1;
                    FieldValue::Int(*sequence)
                }
                None => FieldValue::Null,
            },
        };
        if let (Some(ColumnDefault::Sequence), FieldValue::Int(n)) = (column.default, &value) {
            *sequence = (*sequence).max(*n);
        }
        row.insert(column.name, value);
    }
    Ok(row)
}

/// Check a candidate row against the table's constraints. `skip` is the
/// index of the row being replaced, if any.
fn check_constraints(
    table: &'static Table,
    rows: &[Record],
    candidate: &Record,
    skip: Option<usize>,
    action: &str,
) -> AppResult<()> {
    for column in table.columns {
        let value = candidate.get(column.name).unwrap_or(&FieldValue::Null);

        if value.is_null() {
            if !column.nullable {
                return Err(violation(table, IntegrityViolation::NotNull, column.name, action));
            }
            continue;
        }

        if let Some(kind) = value.kind() {
            let compatible = kind == column.kind
                || (column.kind == ColumnKind::Float && kind == ColumnKind::Int);
            if !compatible {
                return Err(AppError::database(format!(
                    "Failed to {action} {}: column '{}' expects {}, got {kind}",
                    table.entity_name, column.name, column.kind
                )));
            }
        }

        let unique = column.unique || column.name == table.primary_key;
        if unique {
            let clash = rows.iter().enumerate().any(|(i, row)| {
                Some(i) != skip
                    && row
                        .get(column.name)
                        .is_some_and(|existing| same(existing, value))
            });
            if clash {
                return Err(violation(table, IntegrityViolation::Unique, column.name, action));
            }
        }
    }
    Ok(())
}

fn compare_rows(a: &Record, b: &Record, order: &[SortField]) -> Ordering {
    for sort in order {
        let left = a.get(&sort.field).unwrap_or(&FieldValue::Null);
        let right = b.get(&sort.field).unwrap_or(&FieldValue::Null);
        let ord = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => left.compare(right).unwrap_or(Ordering::Equal),
        };
        let ord = match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn apply_update(
    table: &'static Table,
    data: &mut TableData,
    index: usize,
    values: &FieldMap,
    action: &str,
) -> AppResult<Record> {
    for name in values.columns() {
        table.require_column(name)?;
    }
    let mut candidate = data.rows[index].clone();
    candidate.merge(values);
    check_constraints(table, &data.rows, &candidate, Some(index), action)?;
    data.rows[index] = candidate.clone();
    Ok(candidate)
}

fn position(table: &Table, rows: &[Record], key: &FieldValue) -> Option<usize> {
    rows.iter().position(|row| same(key_of(table, row), key))
}

/// Apply one journaled write to the committed state of its table.
fn replay(data: &mut TableData, change: &Change) -> AppResult<()> {
    let table = change.table();
    match change {
        Change::Insert(_, row) => {
            check_constraints(table, &data.rows, row, None, "commit")?;
            data.rows.push(row.clone());
        }
        Change::Upsert(_, row) => match position(table, &data.rows, key_of(table, row)) {
            Some(index) => {
                check_constraints(table, &data.rows, row, Some(index), "commit")?;
                data.rows[index] = row.clone();
            }
            None => {
                check_constraints(table, &data.rows, row, None, "commit")?;
                data.rows.push(row.clone());
            }
        },
        Change::Update(_, row) => match position(table, &data.rows, key_of(table, row)) {
            Some(index) => {
                check_constraints(table, &data.rows, row, Some(index), "commit")?;
                data.rows[index] = row.clone();
            }
            None => debug!(table = table.name, "Updated row was deleted concurrently"),
        },
        Change::Delete(_, key) => data.rows.retain(|row| !same(key_of(table, row), key)),
    }
    Ok(())
}

#[async_trait]
impl StorageSession for MemorySession {
    async fn insert_returning(&mut self, table: &'static Table, values: &FieldMap) -> AppResult<Record> {
        let row = self.materialize(table, values).await?;
        let data = self.table_mut(table).await;
        check_constraints(table, &data.rows, &row, None, "insert")?;
        data.rows.push(row.clone());
        self.journal.push(Change::Insert(table, row.clone()));
        Ok(row)
    }

    async fn update_returning(
        &mut self,
        table: &'static Table,
        key: &FieldValue,
        values: &FieldMap,
    ) -> AppResult<Option<Record>> {
        let data = self.table_mut(table).await;
        let Some(index) = position(table, &data.rows, key) else {
            return Ok(None);
        };
        let row = apply_update(table, data, index, values, "update")?;
        self.journal.push(Change::Update(table, row.clone()));
        Ok(Some(row))
    }

    async fn upsert_returning(
        &mut self,
        table: &'static Table,
        values: &FieldMap,
        updates: &FieldMap,
    ) -> AppResult<Record> {
        let key = values.get(table.primary_key).cloned().ok_or_else(|| {
            AppError::internal(format!(
                "Upsert into '{}' needs a value for '{}'",
                table.name, table.primary_key
            ))
        })?;

        let existing = position(table, self.rows(table).await, &key);
        let row = match existing {
            Some(index) => {
                let data = self.table_mut(table).await;
                apply_update(table, data, index, updates, "upsert")?
            }
            None => {
                let row = self.materialize(table, values).await?;
                let data = self.table_mut(table).await;
                check_constraints(table, &data.rows, &row, None, "upsert")?;
                data.rows.push(row.clone());
                row
            }
        };
        self.journal.push(Change::Upsert(table, row.clone()));
        Ok(row)
    }

    async fn delete(&mut self, table: &'static Table, key: &FieldValue) -> AppResult<u64> {
        let data = self.table_mut(table).await;
        let before = data.rows.len();
        data.rows.retain(|row| !same(key_of(table, row), key));
        let removed = (before - data.rows.len()) as u64;
        if removed > 0 {
            self.journal.push(Change::Delete(table, key.clone()));
        }
        Ok(removed)
    }

    async fn fetch_by_key(&mut self, table: &'static Table, key: &FieldValue) -> AppResult<Option<Record>> {
        Ok(self
            .rows(table)
            .await
            .iter()
            .find(|row| same(key_of(table, row), key))
            .cloned())
    }

    async fn fetch_by_keys(&mut self, table: &'static Table, keys: &[FieldValue]) -> AppResult<Vec<Record>> {
        Ok(self
            .rows(table)
            .await
            .iter()
            .filter(|row| keys.iter().any(|key| same(key_of(table, row), key)))
            .cloned()
            .collect())
    }

    async fn list(
        &mut self,
        table: &'static Table,
        filter: Option<&FilterSpec>,
        window: &ListWindow,
    ) -> AppResult<Vec<Record>> {
        let mut matching: Vec<Record> = self
            .rows(table)
            .await
            .iter()
            .filter(|row| filter.is_none_or(|spec| spec.matches(row)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare_rows(a, b, &window.order));

        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = window
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&mut self, table: &'static Table, filter: Option<&FilterSpec>) -> AppResult<u64> {
        Ok(self
            .rows(table)
            .await
            .iter()
            .filter(|row| filter.is_none_or(|spec| spec.matches(row)))
            .count() as u64)
    }

    async fn commit(&mut self) -> AppResult<()> {
        self.working = None;
        let journal = std::mem::take(&mut self.journal);
        if journal.is_empty() {
            return Ok(());
        }

        let mut committed = self.committed.lock().await;
        let mut staged = Tables::new();
        for change in &journal {
            let name = change.table().name;
            let data = staged
                .entry(name)
                .or_insert_with(|| committed.get(name).cloned().unwrap_or_default());
            replay(data, change)?;
        }
        committed.extend(staged);

        debug!(writes = journal.len(), "Memory session committed");
        Ok(())
    }

    async fn flush(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.working = None;
        self.journal.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::traits::Column;
    use crudkit_core::types::FilterField;

    static COUNTERS: Table = Table {
        entity_name: "Counter",
        name: "counters",
        primary_key: "id",
        columns: &[
            Column::new("id", ColumnKind::Int).default(ColumnDefault::Sequence),
            Column::new("label", ColumnKind::Text).unique(),
            Column::new("rank", ColumnKind::Int).nullable(),
        ],
        search_columns: &["label"],
        date_column: None,
    };

    fn label(label: &str) -> FieldMap {
        FieldMap::new().with("label", label)
    }

    #[tokio::test]
    async fn test_sequence_default_and_uncommitted_isolation() {
        let store = MemoryStore::new();
        let mut writer = store.session();
        let first = writer.insert_returning(&COUNTERS, &label("a")).await.expect("insert");
        let second = writer.insert_returning(&COUNTERS, &label("b")).await.expect("insert");
        assert_eq!(first.get("id"), Some(&FieldValue::Int(1)));
        assert_eq!(second.get("id"), Some(&FieldValue::Int(2)));
        assert_eq!(first.get("rank"), Some(&FieldValue::Null));

        let mut reader = store.session();
        assert_eq!(reader.count(&COUNTERS, None).await.expect("count"), 0);

        writer.commit().await.expect("commit");
        let mut reader = store.session();
        assert_eq!(reader.count(&COUNTERS, None).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_unique_and_not_null_violations() {
        let store = MemoryStore::new();
        let mut session = store.session();
        session.insert_returning(&COUNTERS, &label("a")).await.expect("insert");

        let err = session.insert_returning(&COUNTERS, &label("a")).await.unwrap_err();
        assert_eq!(err.violation, Some(IntegrityViolation::Unique));

        let err = session.insert_returning(&COUNTERS, &FieldMap::new()).await.unwrap_err();
        assert_eq!(err.violation, Some(IntegrityViolation::NotNull));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();
        let mut session = store.session();
        session.insert_returning(&COUNTERS, &label("a")).await.expect("insert");
        session.rollback().await.expect("rollback");
        session.commit().await.expect("commit");
        assert_eq!(store.committed_rows(&COUNTERS).await, 0);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let store = MemoryStore::new();
        let mut session = store.session();
        let values = label("a").with("id", 10_i64);
        let row = session
            .upsert_returning(&COUNTERS, &values, &label("a"))
            .await
            .expect("insert");
        assert_eq!(row.get("id"), Some(&FieldValue::Int(10)));

        let row = session
            .upsert_returning(&COUNTERS, &label("b").with("id", 10_i64), &label("b"))
            .await
            .expect("update");
        assert_eq!(row.get("label"), Some(&FieldValue::Text("b".into())));
        assert_eq!(session.count(&COUNTERS, None).await.expect("count"), 1);

        let next = session.insert_returning(&COUNTERS, &label("c")).await.expect("insert");
        assert_eq!(next.get("id"), Some(&FieldValue::Int(11)));
    }

    #[tokio::test]
    async fn test_list_orders_nulls_last_and_windows() {
        let store = MemoryStore::new();
        let mut session = store.session();
        for (name, rank) in [("a", Some(3_i64)), ("b", None), ("c", Some(1))] {
            session
                .insert_returning(&COUNTERS, &label(name).with("rank", rank))
                .await
                .expect("insert");
        }

        let asc = session
            .list(&COUNTERS, None, &ListWindow::unbounded(vec![SortField::asc("rank")]))
            .await
            .expect("list");
        let labels: Vec<_> = asc.iter().filter_map(|r| r.get("label").cloned()).collect();
        assert_eq!(
            labels,
            vec![FieldValue::from("c"), FieldValue::from("a"), FieldValue::from("b")]
        );

        let desc = session
            .list(&COUNTERS, None, &ListWindow::slice(vec![SortField::desc("rank")], 1, 0))
            .await
            .expect("list");
        assert_eq!(desc[0].get("label"), Some(&FieldValue::Text("b".into())));

        let filtered = FilterSpec::new().with(FilterField::is_null("rank", false));
        assert_eq!(session.count(&COUNTERS, Some(&filtered)).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_interleaved_sessions_keep_both_commits() {
        let store = MemoryStore::new();
        let mut first = store.session();
        let mut second = store.session();

        assert_eq!(first.count(&COUNTERS, None).await.expect("count"), 0);

        let b = second.insert_returning(&COUNTERS, &label("b")).await.expect("insert");
        second.commit().await.expect("commit");

        let a = first.insert_returning(&COUNTERS, &label("a")).await.expect("insert");
        first.commit().await.expect("commit");

        assert_ne!(a.get("id"), b.get("id"));
        assert_eq!(store.committed_rows(&COUNTERS).await, 2);
    }

    #[tokio::test]
    async fn test_commit_rechecks_unique_against_latest_rows() {
        let store = MemoryStore::new();
        let mut first = store.session();
        let mut second = store.session();

        first.insert_returning(&COUNTERS, &label("same")).await.expect("insert");
        first.insert_returning(&COUNTERS, &label("other")).await.expect("insert");
        second.insert_returning(&COUNTERS, &label("same")).await.expect("insert");
        second.commit().await.expect("commit");

        let err = first.commit().await.unwrap_err();
        assert_eq!(err.violation, Some(IntegrityViolation::Unique));
        assert_eq!(store.committed_rows(&COUNTERS).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_delete_and_update_both_apply() {
        let store = MemoryStore::new();
        let mut setup = store.session();
        let a = setup.insert_returning(&COUNTERS, &label("a")).await.expect("insert");
        let b = setup.insert_returning(&COUNTERS, &label("b")).await.expect("insert");
        setup.commit().await.expect("commit");
        let a_key = a.get("id").cloned().expect("id");
        let b_key = b.get("id").cloned().expect("id");

        let mut deleter = store.session();
        let mut updater = store.session();
        assert_eq!(deleter.delete(&COUNTERS, &a_key).await.expect("delete"), 1);
        updater
            .update_returning(&COUNTERS, &b_key, &FieldMap::new().with("rank", 7_i64))
            .await
            .expect("update");
        deleter.commit().await.expect("commit");
        updater.commit().await.expect("commit");

        let mut reader = store.session();
        assert!(reader.fetch_by_key(&COUNTERS, &a_key).await.expect("fetch").is_none());
        let row = reader.fetch_by_key(&COUNTERS, &b_key).await.expect("fetch").expect("row");
        assert_eq!(row.get("rank"), Some(&FieldValue::Int(7)));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_key() {
        let store = MemoryStore::new();
        let mut session = store.session();
        let missing = FieldValue::Int(99);
        assert!(session
            .update_returning(&COUNTERS, &missing, &label("z"))
            .await
            .expect("update")
            .is_none());
        assert_eq!(session.delete(&COUNTERS, &missing).await.expect("delete"), 0);
    }
}
