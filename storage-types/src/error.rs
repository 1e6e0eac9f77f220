// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Errors raised while building or querying the in-memory disk model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The device description was missing or could not be decoded
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// A size or position field was malformed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The model is not in a state the operation supports
    #[error("Precondition failed: {0}")]
    Precondition(String),
}
