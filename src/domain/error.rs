//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for kiln.
///
/// Every failure is raised synchronously at the point of detection and is
/// never caught or retried inside the domain. Callers either pre-validate
/// (e.g. check [`crate::domain::calendar::TradingCalendar::is_trading_day`]
/// before a price lookup) or treat these as fatal for the current run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KilnError {
    #[error("{date} is outside the {subject} range {begin} to {end}")]
    Range {
        subject: String,
        date: NaiveDate,
        begin: NaiveDate,
        end: NaiveDate,
    },

    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("no record for {symbol} on {date}")]
    Lookup { symbol: String, date: NaiveDate },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl KilnError {
    /// Shorthand for a range violation.
    pub fn range(
        subject: impl Into<String>,
        date: NaiveDate,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        KilnError::Range {
            subject: subject.into(),
            date,
            begin,
            end,
        }
    }

    /// Shorthand for a structural precondition violation.
    pub fn validation(reason: impl Into<String>) -> Self {
        KilnError::Validation {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for KilnError {
    fn from(err: std::io::Error) -> Self {
        KilnError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<&KilnError> for std::process::ExitCode {
    fn from(err: &KilnError) -> Self {
        let code: u8 = match err {
            KilnError::Io { .. } => 1,
            KilnError::Data { .. } => 2,
            KilnError::Validation { .. } => 3,
            KilnError::Range { .. } => 4,
            KilnError::Lookup { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
