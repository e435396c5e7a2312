use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use super::{AuditLogFilter, AuditLogPage, DashboardStats, RecordStore};
use crate::models::{
    AiScoreRow, AuditLogRow, NewAiScore, NewAuditLog, NewResumeHistory, ResumeHistoryRow,
};

/// In-process store for tests. Rows are timestamped one second apart so ordering is stable.
#[derive(Default)]
pub struct MemoryStore {
    pub history: Mutex<Vec<ResumeHistoryRow>>,
    pub ai_scores: Mutex<Vec<AiScoreRow>>,
    pub audit: Mutex<Vec<AuditLogRow>>,
    /// Fails every insert whose file name is listed.
    pub fail_files: HashSet<String>,
    clock: Mutex<i64>,
}

impl MemoryStore {
    pub fn failing_for(files: &[&str]) -> Self {
        Self {
            fail_files: files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    fn tick(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap();
        *clock += 1;
        Utc.timestamp_opt(1_700_000_000 + *clock, 0).unwrap()
    }

    fn check(&self, file_name: &str) -> Result<(), sqlx::Error> {
        if self.fail_files.contains(file_name) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

fn newest_first<T: Clone>(rows: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().rev().filter(|r| keep(r)).cloned().collect()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_history(&self, r: NewResumeHistory) -> Result<(), sqlx::Error> {
        self.check(&r.file_name)?;
        let created_at = self.tick();
        self.history.lock().unwrap().push(ResumeHistoryRow {
            id: Uuid::new_v4(),
            user_id: r.user_id,
            file_name: r.file_name,
            full_name: r.full_name,
            email: r.email,
            phone: r.phone,
            post_applied_for: r.post_applied_for,
            model_type: r.model_type,
            ai_score: r.ai_score,
            created_at,
        });
        Ok(())
    }

    async fn insert_ai_score(&self, r: NewAiScore) -> Result<(), sqlx::Error> {
        self.check(&r.file_name)?;
        let created_at = self.tick();
        self.ai_scores.lock().unwrap().push(AiScoreRow {
            id: Uuid::new_v4(),
            user_id: r.user_id,
            file_name: r.file_name,
            post_applied_for: r.post_applied_for,
            model_type: r.model_type,
            ai_score: r.ai_score,
            position_match: r.position_match,
            match_reasons: r.match_reasons,
            mismatch_reasons: r.mismatch_reasons,
            job_description: r.job_description,
            created_at,
        });
        Ok(())
    }

    async fn insert_audit(&self, r: NewAuditLog) -> Result<(), sqlx::Error> {
        self.check(&r.file_name)?;
        let created_at = self.tick();
        self.audit.lock().unwrap().push(AuditLogRow {
            id: Uuid::new_v4(),
            user_id: r.user_id,
            action: r.action.as_str().to_string(),
            model_type: r.model_type,
            file_name: r.file_name,
            ip_address: r.ip_address,
            created_at,
        });
        Ok(())
    }

    async fn list_history(&self, user_id: &str) -> Result<Vec<ResumeHistoryRow>, sqlx::Error> {
        Ok(newest_first(&self.history.lock().unwrap(), |r| r.user_id == user_id))
    }

    async fn count_history(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        Ok(self.list_history(user_id).await?.len() as i64)
    }

    async fn list_ai_scores(&self, user_id: &str) -> Result<Vec<AiScoreRow>, sqlx::Error> {
        Ok(newest_first(&self.ai_scores.lock().unwrap(), |r| r.user_id == user_id))
    }

    async fn count_ai_scores(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        Ok(self.list_ai_scores(user_id).await?.len() as i64)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, sqlx::Error> {
        let history = self.history.lock().unwrap();
        let scores = self.ai_scores.lock().unwrap();
        let users: HashSet<&str> = history.iter().map(|r| r.user_id.as_str()).collect();

        Ok(DashboardStats {
            resumes_parsed: history.len() as i64,
            ai_scores_generated: scores.len() as i64,
            jobs_matched: scores.iter().filter(|s| !s.post_applied_for.is_empty()).count() as i64,
            active_users: users.len() as i64,
        })
    }

    async fn query_audit_logs(&self, filter: &AuditLogFilter) -> Result<AuditLogPage, sqlx::Error> {
        let matching = newest_first(&self.audit.lock().unwrap(), |r| {
            filter.user_id.as_ref().map_or(true, |u| &r.user_id == u)
                && filter.model_type.as_ref().map_or(true, |m| &r.model_type == m)
                && filter.action.as_ref().map_or(true, |a| &r.action == a)
                && filter.from.map_or(true, |from| r.created_at >= from)
                && filter.to.map_or(true, |to| r.created_at <= to)
        });

        let total = matching.len() as i64;
        let logs = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect();

        Ok(AuditLogPage {
            logs,
            total,
            page: filter.page(),
            limit: filter.limit(),
        })
    }
}
