//! Convenience result type alias for TvBox.

use crate::error::AppError;

/// A specialized `Result` type for TvBox operations.
pub type AppResult<T> = Result<T, AppError>;
