//! Error taxonomy for filedex.
//!
//! One enum rolls up every failure mode named in the error-handling design:
//! auth/ban/premium gating, rate limiting, input validation, storage, and
//! platform errors. Each variant carries enough context to log a useful
//! line without the caller having to format one itself.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication required")]
    AuthRequired,

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("principal is banned: {0}")]
    BannedUser(String),

    #[error("premium required")]
    PremiumRequired,

    #[error("rate limit exceeded for {action}: retry after {retry_after_secs}s")]
    RateLimitExceeded {
        action: String,
        retry_after_secs: u64,
    },

    #[error("platform flood wait: {0}s")]
    FloodWait(u64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("chat platform api error: {0}")]
    PlatformApi(String),

    #[error("channel access denied: {0}")]
    ChannelAccessDenied(String),

    #[error("system error: {0}")]
    System(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("maintenance mode: {0}")]
    MaintenanceMode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),
}

impl Error {
    /// The stable error code used in user-facing responses and structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Error::AuthRequired => "AUTH_REQUIRED",
            Error::InsufficientPermissions(_) => "INSUFFICIENT_PERMISSIONS",
            Error::BannedUser(_) => "BANNED_USER",
            Error::PremiumRequired => "PREMIUM_REQUIRED",
            Error::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Error::FloodWait(_) => "FLOOD_WAIT",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidLink(_) => "INVALID_LINK",
            Error::InvalidFileType(_) => "INVALID_FILE_TYPE",
            Error::Database(_) => "DATABASE_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            Error::PlatformApi(_) => "TELEGRAM_API_ERROR",
            Error::ChannelAccessDenied(_) => "CHANNEL_ACCESS_DENIED",
            Error::System(_) => "SYSTEM_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::MaintenanceMode(_) => "MAINTENANCE_MODE",
            Error::Config(_) => "SYSTEM_ERROR",
            Error::Cache(_) => "SYSTEM_ERROR",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Cache(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::System(format!("serialization error: {e}"))
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_cover_the_published_taxonomy() {
        assert_eq!(Error::AuthRequired.code(), "AUTH_REQUIRED");
        assert_eq!(Error::BannedUser("spam".into()).code(), "BANNED_USER");
        assert_eq!(
            Error::RateLimitExceeded {
                action: "search".into(),
                retry_after_secs: 5
            }
            .code(),
            "RATE_LIMIT_EXCEEDED"
        );
        assert_eq!(Error::FloodWait(3).code(), "FLOOD_WAIT");
        assert_eq!(Error::DuplicateEntry("x".into()).code(), "DUPLICATE_ENTRY");
    }

    #[test]
    fn display_messages_are_human_readable() {
        let e = Error::RateLimitExceeded {
            action: "search".into(),
            retry_after_secs: 5,
        };
        assert_eq!(
            e.to_string(),
            "rate limit exceeded for search: retry after 5s"
        );
    }
}
