use std::fmt;

/// Machine-readable error codes for list-store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    StoreOpenFailed,
    StorageFailure,
    CorruptRecord,
    LockPoisoned,
    WorkerUnavailable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::StoreOpenFailed => "E3001",
            Self::StorageFailure => "E3002",
            Self::CorruptRecord => "E3003",
            Self::LockPoisoned => "E5002",
            Self::WorkerUnavailable => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::StoreOpenFailed => "List store could not be opened",
            Self::StorageFailure => "List store read/write failed",
            Self::CorruptRecord => "Corrupt list record",
            Self::LockPoisoned => "List store lock poisoned",
            Self::WorkerUnavailable => "Background worker pool unavailable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the pagekeep config file and retry."),
            Self::StoreOpenFailed => Some("Check the database path and its directory permissions."),
            Self::StorageFailure => Some("Retry once. Run `pk clear` to drop cached lists if it persists."),
            Self::CorruptRecord => Some("Run `pk clear` to drop cached lists; they are refetched on demand."),
            Self::LockPoisoned => Some("Restart the process; a writer panicked mid-update."),
            Self::WorkerUnavailable => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the list store and its background machinery.
///
/// Remote fetch failures are deliberately absent: those are recorded on the
/// list record as [`crate::model::ListState::Error`] and never raised.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}: list database error: {0}", ErrorCode::StorageFailure)]
    Database(#[from] rusqlite::Error),

    #[error("{}: list store lock poisoned", ErrorCode::LockPoisoned)]
    Poisoned,

    #[error("{}: worker pool shut down before the task completed", ErrorCode::WorkerUnavailable)]
    WorkerGone,

    #[error("{}: {0}", ErrorCode::ConfigParseError)]
    Config(#[from] toml::de::Error),
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::StorageFailure,
            Self::Poisoned => ErrorCode::LockPoisoned,
            Self::WorkerGone => ErrorCode::WorkerUnavailable,
            Self::Config(_) => ErrorCode::ConfigParseError,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
