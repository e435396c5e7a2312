use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{AuditLogFilter, AuditLogPage, DashboardStats, RecordStore};
use crate::models::{
    AiScoreRow, AuditLogRow, NewAiScore, NewAuditLog, NewResumeHistory, ResumeHistoryRow,
};

const HISTORY_COLUMNS: &str = "id, user_id, file_name, full_name, email, phone, \
    post_applied_for, model_type, ai_score, created_at";
const AI_SCORE_COLUMNS: &str = "id, user_id, file_name, post_applied_for, model_type, ai_score, \
    position_match, match_reasons, mismatch_reasons, job_description, created_at";
const AUDIT_COLUMNS: &str = "id, user_id, action, model_type, file_name, ip_address, created_at";

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the shared WHERE clause for audit log queries.
fn push_audit_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = &filter.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id.clone());
    }
    if let Some(model_type) = &filter.model_type {
        builder.push(" AND model_type = ");
        builder.push_bind(model_type.clone());
    }
    if let Some(action) = &filter.action {
        builder.push(" AND action = ");
        builder.push_bind(action.clone());
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ");
        builder.push_bind(to);
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_history(&self, record: NewResumeHistory) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO resume_history
                (id, user_id, file_name, full_name, email, phone, post_applied_for, model_type, ai_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(&record.file_name)
        .bind(&record.full_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.post_applied_for)
        .bind(&record.model_type)
        .bind(record.ai_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_ai_score(&self, record: NewAiScore) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ai_scores
                (id, user_id, file_name, post_applied_for, model_type, ai_score,
                 position_match, match_reasons, mismatch_reasons, job_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(&record.file_name)
        .bind(&record.post_applied_for)
        .bind(&record.model_type)
        .bind(record.ai_score)
        .bind(record.position_match)
        .bind(&record.match_reasons)
        .bind(&record.mismatch_reasons)
        .bind(&record.job_description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_audit(&self, record: NewAuditLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, model_type, file_name, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(record.action.as_str())
        .bind(&record.model_type)
        .bind(&record.file_name)
        .bind(&record.ip_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_history(&self, user_id: &str) -> Result<Vec<ResumeHistoryRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {HISTORY_COLUMNS} FROM resume_history WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_history(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM resume_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_ai_scores(&self, user_id: &str) -> Result<Vec<AiScoreRow>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {AI_SCORE_COLUMNS} FROM ai_scores WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_ai_scores(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM ai_scores WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, sqlx::Error> {
        let (resumes_parsed, ai_scores_generated, jobs_matched, active_users): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM resume_history),
                    (SELECT COUNT(*) FROM ai_scores),
                    (SELECT COUNT(*) FROM ai_scores WHERE post_applied_for <> ''),
                    (SELECT COUNT(DISTINCT user_id) FROM resume_history)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardStats {
            resumes_parsed,
            ai_scores_generated,
            jobs_matched,
            active_users,
        })
    }

    async fn query_audit_logs(&self, filter: &AuditLogFilter) -> Result<AuditLogPage, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
        push_audit_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs"));
        push_audit_filters(&mut list, filter);
        list.push(" ORDER BY created_at DESC OFFSET ");
        list.push_bind(filter.offset());
        list.push(" LIMIT ");
        list.push_bind(filter.limit() as i64);
        let logs = list.build_query_as::<AuditLogRow>().fetch_all(&self.pool).await?;

        Ok(AuditLogPage {
            logs,
            total,
            page: filter.page(),
            limit: filter.limit(),
        })
    }
}
