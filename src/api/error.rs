use thiserror::Error;

use crate::core::YearMonth;

/// A request or argument that the engines will not be asked to run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    #[error("--capital must be a finite amount >= 0")]
    Capital,
    #[error("--risk-level must be between 1 and 10")]
    RiskLevel,
    #[error("--years must be between 0 and 100")]
    Years,
    #[error("--expected-return must be > -100")]
    ExpectedReturn,
    #[error("--volatility must be between 0 and 500")]
    Volatility,
    #[error("--paths must be between 1 and 5000")]
    Paths,
    #[error("--target-amount must be a finite amount >= 0")]
    TargetAmount,
    #[error("projection spans {months} months; at most {limit} are supported")]
    WindowTooLarge { months: i64, limit: i64 },
    #[error("invalid --month '{0}', expected YYYY-MM:INCOME[:EXPENSES]")]
    MonthRow(String),
    #[error("income and expenses for {0} must be finite amounts >= 0")]
    MonthAmounts(YearMonth),
    #[error("a simulation starting {start} would run past 9999-12")]
    PastLastMonth { start: YearMonth },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
