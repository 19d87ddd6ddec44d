pub mod hybrid;
pub mod semantic;
pub mod structural;

pub use hybrid::*;
pub use semantic::*;
pub use structural::*;

use crate::error::{MovieSearchError, Result};

/// Minimum length of a semantic/hybrid query
pub const MIN_QUERY_LEN: usize = 3;

/// Result page size bounds, shared by all three engines
pub const MAX_LIMIT: usize = 100;

pub(crate) fn validate_query(query: &str) -> Result<()> {
    if query.trim().len() < MIN_QUERY_LEN {
        return Err(MovieSearchError::InvalidArgument(format!(
            "Query must be at least {} characters",
            MIN_QUERY_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_limit(limit: usize) -> Result<()> {
    if limit < 1 || limit > MAX_LIMIT {
        return Err(MovieSearchError::InvalidArgument(format!(
            "Limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(())
}
