use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::models::{Privacy, Profile, ProgressSummary, VideoLogEntry};
use super::rows::{ProfileRow, ProgressSummaryRow, VideoLogEntryRow};
use crate::store::filters::push_filters;
use crate::store::{
    SqlFilter, StoreError, Table, PROGRESS_SUMMARY_TABLE, VIDEO_LOG_ENTRY_TABLE,
    VIDEO_LOG_PROFILE_TABLE,
};

#[async_trait]
pub trait VideoLogStore: Send + Sync {
    /// Inserts new videos and refreshes known ones in one transaction.
    /// Returns the number of rows written.
    async fn batch_upsert_video_log_entries(
        &self,
        entries: &[VideoLogEntry],
    ) -> Result<u64, StoreError>;

    /// Newest first.
    async fn select_video_log_entries(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<VideoLogEntry>, StoreError>;

    /// Newest month first.
    async fn select_progress_summaries(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<ProgressSummary>, StoreError>;

    /// Keyed by `(username, year, month)`; fills in the stored id.
    async fn upsert_progress_summary(&self, summary: &mut ProgressSummary)
        -> Result<(), StoreError>;

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    async fn get_profile_by_username(&self, username: &str)
        -> Result<Option<Profile>, StoreError>;

    /// Creates the user's profile or changes its privacy. The id is minted
    /// once, on creation.
    async fn upsert_profile(&self, username: &str, privacy: Privacy)
        -> Result<Profile, StoreError>;
}

/// 8 random bytes, base64url without padding: 11 characters.
pub fn generate_profile_id() -> String {
    let uuid = Uuid::new_v4();
    URL_SAFE_NO_PAD.encode(&uuid.as_bytes()[..8])
}

#[derive(Clone)]
pub struct PgVideoLogStore {
    pool: PgPool,
}

impl PgVideoLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoLogStore for PgVideoLogStore {
    async fn batch_upsert_video_log_entries(
        &self,
        entries: &[VideoLogEntry],
    ) -> Result<u64, StoreError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let rows: Vec<VideoLogEntryRow> = entries.iter().map(VideoLogEntryRow::from_model).collect();
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {VIDEO_LOG_ENTRY_TABLE} (id, username, published, video_orientation, title, \
             description, is_monthly_progress, thumbnails, minutes_of_guitar_practice) "
        ));
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.id)
                .push_bind(row.username)
                .push_bind(row.published)
                .push_bind(row.video_orientation)
                .push_bind(row.title)
                .push_bind(row.description)
                .push_bind(row.is_monthly_progress)
                .push_bind(row.thumbnails)
                .push_bind(row.minutes_of_guitar_practice);
        });
        qb.push(
            r#" ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                video_orientation = EXCLUDED.video_orientation,
                is_monthly_progress = EXCLUDED.is_monthly_progress,
                thumbnails = EXCLUDED.thumbnails,
                minutes_of_guitar_practice = EXCLUDED.minutes_of_guitar_practice"#,
        );

        let mut tx = self.pool.begin().await?;
        let result = qb.build().execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Upserted {} video log entries", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn select_video_log_entries(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<VideoLogEntry>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, username, published, video_orientation, title, description, \
             is_monthly_progress, thumbnails, minutes_of_guitar_practice FROM {VIDEO_LOG_ENTRY_TABLE}"
        ));
        push_filters(&mut qb, Table::VideoLogEntries, filters)?;
        qb.push(" ORDER BY published DESC");

        let rows: Vec<VideoLogEntryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(VideoLogEntryRow::into_model).collect()
    }

    async fn select_progress_summaries(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<ProgressSummary>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, username, year, month, title, subtitle, body FROM {PROGRESS_SUMMARY_TABLE}"
        ));
        push_filters(&mut qb, Table::ProgressSummaries, filters)?;
        qb.push(" ORDER BY year DESC, month DESC");

        let rows: Vec<ProgressSummaryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ProgressSummary::from).collect())
    }

    async fn upsert_progress_summary(
        &self,
        summary: &mut ProgressSummary,
    ) -> Result<(), StoreError> {
        let id: Uuid = sqlx::query_scalar(&format!(
            r#"
            INSERT INTO {PROGRESS_SUMMARY_TABLE} (id, username, year, month, title, subtitle, body)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT unique_username_year_month DO UPDATE SET
                title = EXCLUDED.title,
                subtitle = EXCLUDED.subtitle,
                body = EXCLUDED.body
            RETURNING id
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&summary.username)
        .bind(summary.year)
        .bind(summary.month)
        .bind(&summary.title)
        .bind(&summary.subtitle)
        .bind(&summary.body)
        .fetch_one(&self.pool)
        .await?;

        summary.id = id;
        info!(
            "Upserted {}-{:02} progress summary for {}",
            summary.year, summary.month, summary.username
        );
        Ok(())
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT id, username, privacy FROM {VIDEO_LOG_PROFILE_TABLE} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProfileRow::into_model).transpose()
    }

    async fn get_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Profile>, StoreError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT id, username, privacy FROM {VIDEO_LOG_PROFILE_TABLE} WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProfileRow::into_model).transpose()
    }

    async fn upsert_profile(
        &self,
        username: &str,
        privacy: Privacy,
    ) -> Result<Profile, StoreError> {
        let row: ProfileRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO {VIDEO_LOG_PROFILE_TABLE} (id, username, privacy)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE SET privacy = EXCLUDED.privacy
            RETURNING id, username, privacy
            "#
        ))
        .bind(generate_profile_id())
        .bind(username)
        .bind(privacy.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.into_model()
    }
}
