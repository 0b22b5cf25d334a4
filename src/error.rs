use thiserror::Error;

use crate::config::Category;

/// Which half of a [`RangeSpec`](crate::config::RangeSpec) failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Operand {
    #[strum(serialize = "a")]
    A,
    #[strum(serialize = "b")]
    B,
}

/// Configuration was rejected before a session could start
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one operator must be enabled")]
    NoOperators,

    #[error("{category} range for operand {operand} has min {min} greater than max {max}")]
    InvalidRange {
        category: Category,
        operand: Operand,
        min: u32,
        max: u32,
    },

    #[error("{category} range for operand {operand} has max {max} above the limit of {limit}")]
    OperandTooLarge {
        category: Category,
        operand: Operand,
        max: u32,
        limit: u32,
    },

    #[error("division needs a non-zero divisor but the multiplication range for operand a is 0..0")]
    ZeroDivisor,

    #[error("duration must be between {min} and {max} seconds, got {got}")]
    DurationOutOfRange { got: u32, min: u32, max: u32 },

    #[error("could not parse range '{0}', expected MIN..MAX,MIN..MAX")]
    UnparsableRange(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("session has already been started")]
    AlreadyStarted,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not encode session: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not write export: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
