//! Persistence for practice-log entries, labels and their associations.
//!
//! `AppState` holds an `Arc<dyn PracticeLogStore>`; `PgPracticeLogStore` is the
//! production backend. Writes that touch more than one table run inside a
//! single transaction, which rolls back if dropped before `commit`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::models::{attach_children, Entry, Label, LabelDuration};
use super::rows::{DatedDurationRow, EntryLabelRow, LabelDurationRow, LogEntryRow, LogLabelRow};
use super::time_series::DatedDuration;
use crate::store::filters::push_filters;
use crate::store::{
    require_rows_affected, SqlFilter, StoreError, Table, ASSOCIATION_LOG_ENTRY_LABEL_TABLE,
    LOG_ENTRY_TABLE, LOG_LABEL_TABLE,
};

#[async_trait]
pub trait PracticeLogStore: Send + Sync {
    async fn count_log_entries(&self, filters: &[SqlFilter]) -> Result<i64, StoreError>;

    /// Newest first, each entry with its labels.
    async fn select_log_entries(
        &self,
        limit: i64,
        offset: i64,
        filters: &[SqlFilter],
    ) -> Result<Vec<Entry>, StoreError>;

    /// `(date, duration)` pairs, newest first.
    async fn select_entry_durations(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<DatedDuration>, StoreError>;

    /// Assigns a fresh id to every entry, then inserts entries and their
    /// label associations atomically.
    async fn batch_insert_log_entries(&self, entries: &mut [Entry]) -> Result<(), StoreError>;

    /// Replaces scalar fields and the full label set of an existing entry.
    async fn update_log_entry(&self, entry: &Entry) -> Result<(), StoreError>;

    /// Replaces only the assignment list; labels are left alone.
    async fn update_log_assignments(&self, entry: &Entry) -> Result<(), StoreError>;

    async fn delete_log_entry(&self, username: &str, id: Uuid) -> Result<(), StoreError>;

    /// Total minutes over matching entries, 0 when nothing matches.
    async fn sum_log_entry_duration(&self, filters: &[SqlFilter]) -> Result<i64, StoreError>;

    /// Minutes per label over matching entries. Labels without entries are absent.
    async fn list_log_label_durations(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<LabelDuration>, StoreError>;

    /// Labels with `children` filled in.
    async fn select_log_labels(&self, filters: &[SqlFilter]) -> Result<Vec<Label>, StoreError>;

    async fn batch_insert_log_labels(&self, labels: &mut [Label]) -> Result<(), StoreError>;

    async fn update_log_label(&self, label: &Label) -> Result<(), StoreError>;

    async fn delete_log_label(&self, username: &str, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgPracticeLogStore {
    pool: PgPool,
}

impl PgPracticeLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_entry_labels(
        &self,
        entry_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Label>>, StoreError> {
        let mut by_entry: HashMap<Uuid, Vec<Label>> = HashMap::new();
        if entry_ids.is_empty() {
            return Ok(by_entry);
        }

        let rows: Vec<EntryLabelRow> = sqlx::query_as(&format!(
            r#"
            SELECT a.entry_id, l.id AS label_id, l.username, l.parent_id, l.name
            FROM {ASSOCIATION_LOG_ENTRY_LABEL_TABLE} a
            JOIN {LOG_LABEL_TABLE} l ON l.id = a.label_id
            WHERE a.entry_id = ANY($1)
            ORDER BY l.name
            "#
        ))
        .bind(entry_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let (entry_id, label) = row.into_model();
            by_entry.entry(entry_id).or_default().push(label);
        }
        Ok(by_entry)
    }
}

fn push_associations(qb: &mut QueryBuilder<'_, Postgres>, entries: &[(Uuid, Uuid)]) {
    qb.push(format!(
        "INSERT INTO {ASSOCIATION_LOG_ENTRY_LABEL_TABLE} (association_id, entry_id, label_id) "
    ));
    qb.push_values(entries, |mut b, (entry_id, label_id)| {
        b.push_bind(Uuid::new_v4())
            .push_bind(*entry_id)
            .push_bind(*label_id);
    });
}

#[async_trait]
impl PracticeLogStore for PgPracticeLogStore {
    async fn count_log_entries(&self, filters: &[SqlFilter]) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {LOG_ENTRY_TABLE}"));
        push_filters(&mut qb, Table::LogEntries, filters)?;
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn select_log_entries(
        &self,
        limit: i64,
        offset: i64,
        filters: &[SqlFilter],
    ) -> Result<Vec<Entry>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, username, date, duration, message, details, assignments FROM {LOG_ENTRY_TABLE}"
        ));
        push_filters(&mut qb, Table::LogEntries, filters)?;
        qb.push(" ORDER BY date DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows: Vec<LogEntryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut labels = self.load_entry_labels(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut entry = row.into_model();
                entry.labels = labels.remove(&entry.id).unwrap_or_default();
                entry
            })
            .collect())
    }

    async fn select_entry_durations(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<DatedDuration>, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT date, duration FROM {LOG_ENTRY_TABLE}"));
        push_filters(&mut qb, Table::LogEntries, filters)?;
        qb.push(" ORDER BY date DESC");

        let rows: Vec<DatedDurationRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(DatedDuration::from).collect())
    }

    async fn batch_insert_log_entries(&self, entries: &mut [Entry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        for entry in entries.iter_mut() {
            entry.id = Uuid::new_v4();
        }

        let rows: Vec<LogEntryRow> = entries.iter().map(LogEntryRow::from_model).collect();
        let links: Vec<(Uuid, Uuid)> = entries
            .iter()
            .flat_map(|e| e.labels.iter().map(move |l| (e.id, l.id)))
            .collect();

        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {LOG_ENTRY_TABLE} (id, username, date, duration, message, details, assignments) "
        ));
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.id)
                .push_bind(row.username)
                .push_bind(row.date)
                .push_bind(row.duration)
                .push_bind(row.message)
                .push_bind(row.details)
                .push_bind(row.assignments);
        });
        qb.build().execute(&mut *tx).await?;

        if !links.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new("");
            push_associations(&mut qb, &links);
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            "Inserted {} log entries with {} label associations",
            entries.len(),
            links.len()
        );
        Ok(())
    }

    async fn update_log_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let row = LogEntryRow::from_model(entry);
        let mut tx = self.pool.begin().await?;

        // 1. Scalar fields, scoped to the owner
        let result = sqlx::query(&format!(
            r#"
            UPDATE {LOG_ENTRY_TABLE}
            SET date = $1, duration = $2, message = $3, details = $4, assignments = $5
            WHERE id = $6 AND username = $7
            "#
        ))
        .bind(row.date)
        .bind(row.duration)
        .bind(&row.message)
        .bind(&row.details)
        .bind(&row.assignments)
        .bind(row.id)
        .bind(&row.username)
        .execute(&mut *tx)
        .await?;
        require_rows_affected(result, LOG_ENTRY_TABLE, entry.id)?;

        // 2. Drop every existing association
        sqlx::query(&format!(
            "DELETE FROM {ASSOCIATION_LOG_ENTRY_LABEL_TABLE} WHERE entry_id = $1"
        ))
        .bind(entry.id)
        .execute(&mut *tx)
        .await?;

        // 3. Re-insert the new set
        let links: Vec<(Uuid, Uuid)> = entry.labels.iter().map(|l| (entry.id, l.id)).collect();
        if !links.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new("");
            push_associations(&mut qb, &links);
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("Updated log entry {} with {} labels", entry.id, links.len());
        Ok(())
    }

    async fn update_log_assignments(&self, entry: &Entry) -> Result<(), StoreError> {
        let row = LogEntryRow::from_model(entry);
        let result = sqlx::query(&format!(
            "UPDATE {LOG_ENTRY_TABLE} SET assignments = $1 WHERE id = $2 AND username = $3"
        ))
        .bind(&row.assignments)
        .bind(row.id)
        .bind(&row.username)
        .execute(&self.pool)
        .await?;
        require_rows_affected(result, LOG_ENTRY_TABLE, entry.id)?;
        Ok(())
    }

    async fn delete_log_entry(&self, username: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {LOG_ENTRY_TABLE} WHERE id = $1 AND username = $2"
        ))
        .bind(id)
        .bind(username)
        .execute(&self.pool)
        .await?;
        require_rows_affected(result, LOG_ENTRY_TABLE, id)?;
        info!("Deleted log entry {id}");
        Ok(())
    }

    async fn sum_log_entry_duration(&self, filters: &[SqlFilter]) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT COALESCE(SUM(duration), 0)::BIGINT FROM {LOG_ENTRY_TABLE}"
        ));
        push_filters(&mut qb, Table::LogEntries, filters)?;
        let sum: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(sum)
    }

    async fn list_log_label_durations(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<LabelDuration>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {a}.label_id, COALESCE(SUM({LOG_ENTRY_TABLE}.duration), 0)::BIGINT AS duration \
             FROM {a} JOIN {LOG_ENTRY_TABLE} ON {LOG_ENTRY_TABLE}.id = {a}.entry_id",
            a = ASSOCIATION_LOG_ENTRY_LABEL_TABLE
        ));
        push_filters(&mut qb, Table::LogEntries, filters)?;
        qb.push(format!(
            " GROUP BY {ASSOCIATION_LOG_ENTRY_LABEL_TABLE}.label_id ORDER BY {ASSOCIATION_LOG_ENTRY_LABEL_TABLE}.label_id"
        ));

        let rows: Vec<LabelDurationRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LabelDuration::from).collect())
    }

    async fn select_log_labels(&self, filters: &[SqlFilter]) -> Result<Vec<Label>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, username, parent_id, name FROM {LOG_LABEL_TABLE}"
        ));
        push_filters(&mut qb, Table::LogLabels, filters)?;
        qb.push(" ORDER BY name");

        let rows: Vec<LogLabelRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let mut labels: Vec<Label> = rows.into_iter().map(LogLabelRow::into_model).collect();
        attach_children(&mut labels);
        Ok(labels)
    }

    async fn batch_insert_log_labels(&self, labels: &mut [Label]) -> Result<(), StoreError> {
        if labels.is_empty() {
            return Ok(());
        }
        for label in labels.iter_mut() {
            label.id = Uuid::new_v4();
        }

        let rows: Vec<LogLabelRow> = labels.iter().map(LogLabelRow::from_model).collect();
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {LOG_LABEL_TABLE} (id, username, parent_id, name) "
        ));
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.id)
                .push_bind(row.username)
                .push_bind(row.parent_id)
                .push_bind(row.name);
        });

        let mut tx = self.pool.begin().await?;
        qb.build().execute(&mut *tx).await?;
        tx.commit().await?;
        info!("Inserted {} log labels", labels.len());
        Ok(())
    }

    async fn update_log_label(&self, label: &Label) -> Result<(), StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE {LOG_LABEL_TABLE} SET parent_id = $1, name = $2 WHERE id = $3 AND username = $4"
        ))
        .bind(label.parent_id)
        .bind(&label.name)
        .bind(label.id)
        .bind(&label.username)
        .execute(&self.pool)
        .await?;
        require_rows_affected(result, LOG_LABEL_TABLE, label.id)?;
        Ok(())
    }

    async fn delete_log_label(&self, username: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {LOG_LABEL_TABLE} WHERE id = $1 AND username = $2"
        ))
        .bind(id)
        .bind(username)
        .execute(&self.pool)
        .await?;
        require_rows_affected(result, LOG_LABEL_TABLE, id)?;
        info!("Deleted log label {id}");
        Ok(())
    }
}
