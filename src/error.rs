use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Raffle not found")]
    RaffleNotFound,

    #[error("Raffle is locked or closed: {0}")]
    RaffleLockedOrClosed(String),

    #[error("One or more tickets were not found or are not owned by the caller")]
    TicketsNotFoundOrNotOwned,

    #[error("Ticket signature verification failed")]
    SignatureInvalid,

    #[error("Ticket has already been used")]
    TicketAlreadyUsed,

    #[error("Ticket already belongs to another raffle")]
    TicketInOtherRaffle,

    #[error("Raffle capacity exceeded, {remaining} slot(s) remaining")]
    CapacityExceeded { remaining: i64 },

    #[error("Per-user fairness cap exceeded, {remaining_for_user} slot(s) remaining for this user")]
    FairnessCapExceeded { remaining_for_user: i64 },

    #[error("Draw is scheduled for {draw_at} and cannot run earlier without force")]
    DrawTooEarly { draw_at: DateTime<Utc> },

    #[error("Raffle is not eligible for a draw: {0}")]
    DrawNotEligible(String),

    #[error("Not enough active participations to draw ({active})")]
    InsufficientParticipants { active: i64 },

    #[error("Transaction conflict persisted after retries, please retry")]
    ConflictRetryExhausted,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Stable machine-readable kind for every rejection.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::PermissionDenied => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RaffleNotFound => "RAFFLE_NOT_FOUND",
            AppError::RaffleLockedOrClosed(_) => "RAFFLE_LOCKED_OR_CLOSED",
            AppError::TicketsNotFoundOrNotOwned => "TICKETS_NOT_FOUND_OR_NOT_OWNED",
            AppError::SignatureInvalid => "SIGNATURE_INVALID",
            AppError::TicketAlreadyUsed => "TICKET_ALREADY_USED",
            AppError::TicketInOtherRaffle => "TICKET_IN_OTHER_RAFFLE",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::FairnessCapExceeded { .. } => "USER_FAIRNESS_CAP_EXCEEDED",
            AppError::DrawTooEarly { .. } => "DRAW_TOO_EARLY",
            AppError::DrawNotEligible(_) => "DRAW_NOT_ELIGIBLE",
            AppError::InsufficientParticipants { .. } => "INSUFFICIENT_PARTICIPANTS",
            AppError::ConflictRetryExhausted => "CONFLICT_RETRY",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::JwtError(_) => "AUTH_ERROR",
        }
    }

    /// Structured hints attached to the error payload (e.g. remaining slots).
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::CapacityExceeded { remaining } => {
                Some(json!({ "remaining": remaining }))
            }
            AppError::FairnessCapExceeded { remaining_for_user } => {
                Some(json!({ "remaining_for_user": remaining_for_user }))
            }
            AppError::DrawTooEarly { draw_at } => Some(json!({ "draw_at": draw_at })),
            AppError::InsufficientParticipants { active } => {
                Some(json!({ "active_participations": active }))
            }
            AppError::ConflictRetryExhausted => Some(json!({ "retryable": true })),
            _ => None,
        }
    }

    /// Message safe to hand to callers. Internal classes collapse to a fixed
    /// phrase; the full error text (driver messages, constraint names) only
    /// ever goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) => "Database error".to_string(),
            AppError::InternalError(_) => "Internal server error".to_string(),
            AppError::ConfigError(_) => "Configuration error".to_string(),
            other => other.to_string(),
        }
    }

    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied | AppError::SignatureInvalid => StatusCode::FORBIDDEN,
            AppError::NotFound(_)
            | AppError::RaffleNotFound
            | AppError::TicketsNotFoundOrNotOwned => StatusCode::NOT_FOUND,
            AppError::RaffleLockedOrClosed(_)
            | AppError::TicketAlreadyUsed
            | AppError::TicketInOtherRaffle
            | AppError::CapacityExceeded { .. }
            | AppError::FairnessCapExceeded { .. }
            | AppError::DrawTooEarly { .. }
            | AppError::DrawNotEligible(_)
            | AppError::InsufficientParticipants { .. }
            | AppError::ConflictRetryExhausted => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Internal errors are logged in full but never leaked to the caller.
        match self {
            AppError::DatabaseError(err) => log::error!("Database error: {err}"),
            AppError::InternalError(msg) => log::error!("Internal error: {msg}"),
            AppError::ConfigError(msg) => log::error!("Config error: {msg}"),
            AppError::SignatureInvalid => {
                // Security event, keep a trace for auditing.
                log::warn!("Ticket signature verification failed");
            }
            AppError::AuthError(msg) => log::warn!("Authentication error: {msg}"),
            _ => {}
        }
        let message = self.public_message();

        let mut error_body = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(details) = self.details() {
            error_body["details"] = details;
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": error_body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_error_codes() {
        assert_eq!(AppError::RaffleNotFound.code(), "RAFFLE_NOT_FOUND");
        assert_eq!(
            AppError::FairnessCapExceeded {
                remaining_for_user: 0
            }
            .code(),
            "USER_FAIRNESS_CAP_EXCEEDED"
        );
        assert_eq!(
            AppError::CapacityExceeded { remaining: 3 }.code(),
            "CAPACITY_EXCEEDED"
        );
        assert_eq!(AppError::SignatureInvalid.code(), "SIGNATURE_INVALID");
        assert_eq!(AppError::ConflictRetryExhausted.code(), "CONFLICT_RETRY");
    }

    #[test]
    fn test_database_error_message_hides_internals() {
        let err = AppError::DatabaseError(sea_orm::DbErr::Custom(
            "duplicate key value violates unique constraint \"idx_tickets_uuid_unique\""
                .to_string(),
        ));
        assert_eq!(err.public_message(), "Database error");
        assert!(!err.public_message().contains("idx_tickets_uuid_unique"));
    }

    #[test]
    fn test_domain_error_message_passes_through() {
        let err = AppError::CapacityExceeded { remaining: 1 };
        assert_eq!(err.public_message(), err.to_string());
    }

    #[test]
    fn test_fairness_details_carry_remaining_slots() {
        let err = AppError::FairnessCapExceeded {
            remaining_for_user: 2,
        };
        let details = err.details().unwrap();
        assert_eq!(details["remaining_for_user"], 2);
    }
}
