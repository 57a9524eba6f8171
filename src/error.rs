//! Crate error type.
//!
//! The pipeline itself never fails: absent or degenerate inputs produce
//! empty collections. Errors arise only at the decode boundary, where a
//! payload from the estimation service turns out to be malformed. The type
//! still carries a process exit code so CLI hosts can surface decode
//! failures directly.

/// Exit code reported for a malformed estimator payload.
pub const EXIT_DECODE_FAILURE: u8 = 4;

#[derive(Debug, Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// A payload from the estimation service failed to decode.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(EXIT_DECODE_FAILURE, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}
