//! Error types for markup text.

use thiserror::Error;

/// Returned by every mutating call on a frozen value.
///
/// Freezing is used to share constants (prompts, separators, error tokens)
/// without copying them, so writing to one is always a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot modify frozen {what}")]
pub struct FrozenMutationError {
    /// What was frozen ("markup text", "multimap", ...).
    pub what: &'static str,
}

impl FrozenMutationError {
    pub fn new(what: &'static str) -> Self {
        Self { what }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrozenMutationError::new("markup text");
        assert_eq!(err.to_string(), "cannot modify frozen markup text");
    }
}
