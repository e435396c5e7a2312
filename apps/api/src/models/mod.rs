pub mod history;

pub use history::{
    AiScoreRow, AuditAction, AuditLogRow, NewAiScore, NewAuditLog, NewResumeHistory,
    ResumeHistoryRow,
};
