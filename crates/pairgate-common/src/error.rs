// ============================================
// File: crates/pairgate-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Provides the error type for parsing operator-supplied values (device
//! ids typed at the console, hex keys from config files).
//!
//! ## Main Functionality
//! - `CommonError`: Base error enum for common operations
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never echo key material into an error message, only its length
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across pairgate crates.
///
/// # Example
/// ```
/// use pairgate_common::error::{CommonError, Result};
///
/// fn require_non_empty(data: &[u8]) -> Result<()> {
///     if data.is_empty() {
///         return Err(CommonError::invalid_input("data", "cannot be empty"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length for '{field}': expected {expected}, got {actual}")]
    InvalidLength {
        /// Name of the field or parameter
        field: String,
        /// Expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    pub fn invalid_length(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            field: field.into(),
            expected,
            actual,
        }
    }
}

// ============================================
// Tests
// ============================================
