use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::store::{AuditLogFilter, AuditLogPage, DashboardStats};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub user_id: Option<String>,
    pub model_type: Option<String>,
    pub action: Option<String>,
    #[serde(alias = "startDate")]
    pub date_from: Option<String>,
    #[serde(alias = "endDate")]
    pub date_to: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Which end of the day a bare `YYYY-MM-DD` stands for.
#[derive(Clone, Copy)]
enum DayBound {
    Start,
    End,
}

/// Accepts RFC 3339 timestamps or plain dates. A plain `dateTo` covers the whole day.
fn parse_date(field: &str, raw: &str, bound: DayBound) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "{field} must be an RFC 3339 timestamp or YYYY-MM-DD, got '{raw}'"
        ))
    })?;
    let time = match bound {
        DayBound::Start => NaiveTime::MIN,
        DayBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AuditLogQuery {
    fn into_filter(self) -> Result<AuditLogFilter, AppError> {
        let from = non_empty(self.date_from)
            .map(|raw| parse_date("dateFrom", &raw, DayBound::Start))
            .transpose()?;
        let to = non_empty(self.date_to)
            .map(|raw| parse_date("dateTo", &raw, DayBound::End))
            .transpose()?;

        Ok(AuditLogFilter {
            user_id: non_empty(self.user_id),
            model_type: non_empty(self.model_type),
            action: non_empty(self.action),
            from,
            to,
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(0),
        })
    }
}

/// GET /api/admin/dashboard/stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.store.dashboard_stats().await?))
}

/// GET /api/admin/audit-logs
pub async fn audit_logs(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogPage>, AppError> {
    let filter = query.into_filter()?;
    Ok(Json(state.store.query_audit_logs(&filter).await?))
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn test_plain_dates_cover_whole_days() {
        let query = AuditLogQuery {
            date_from: Some("2025-03-01".into()),
            date_to: Some("2025-03-31".into()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();

        let from = filter.from.unwrap();
        let to = filter.to.unwrap();
        assert_eq!(from.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
    }

    #[test]
    fn test_rfc3339_is_converted_to_utc() {
        let ts = parse_date("dateFrom", "2025-03-01T10:00:00+02:00", DayBound::Start).unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_bad_date_is_validation_error() {
        let query = AuditLogQuery {
            date_to: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = AuditLogQuery {
            user_id: Some("  ".into()),
            action: Some("resume_parsed".into()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.user_id.is_none());
        assert_eq!(filter.action.as_deref(), Some("resume_parsed"));
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), 20);
    }
}
