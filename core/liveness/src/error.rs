use thiserror::Error;

use crate::session::EngineState;

#[derive(Debug, Error)]
pub enum LivenessError {
    #[error("failed to read model config: {0}")]
    ConfigRead(String),

    #[error("model config document has no entries")]
    EmptyConfig,

    #[error("model config `{name}` has invalid input size {width}x{height}")]
    InvalidModelConfig {
        name: String,
        width: i32,
        height: i32,
    },

    #[error("invalid yuv data size: expected {expected} bytes for {width}x{height}, got {actual}")]
    SizeMismatch {
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },

    #[error("native engine failed to load models (status {0})")]
    NativeLoad(i32),

    #[error("native engine returned a null handle")]
    AllocationFailed,

    #[error("cannot {operation} while engine is {state}")]
    Lifecycle {
        operation: &'static str,
        state: EngineState,
    },

    #[error("threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f32),
}

impl LivenessError {
    /// Integer status reported for load failures: `-1` when the
    /// configuration could not be used, the native status when the engine
    /// rejected it, `None` for errors that are not load failures.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            LivenessError::ConfigRead(_)
            | LivenessError::EmptyConfig
            | LivenessError::InvalidModelConfig { .. } => Some(-1),
            LivenessError::NativeLoad(status) => Some(*status),
            _ => None,
        }
    }
}
