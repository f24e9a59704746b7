//! Error types for speaker-classifier.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Candle tensor/model error.
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    /// A tensor reached a stage boundary with the wrong shape.
    #[error("shape mismatch at {stage}: expected {expected}, got {actual:?}")]
    Shape {
        stage: &'static str,
        expected: String,
        actual: Vec<usize>,
    },

    /// Speaker-id labels have the wrong rank, dtype, length or range.
    #[error("labels: {0}")]
    Label(String),

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn shape(stage: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Error::Shape {
            stage,
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }
}

/// Fail with [`Error::Shape`] unless `tensor` has exactly the `expected` dims.
pub(crate) fn ensure_dims(
    stage: &'static str,
    tensor: &candle_core::Tensor,
    expected: &[usize],
) -> Result<()> {
    if tensor.dims() != expected {
        return Err(Error::shape(stage, format!("{expected:?}"), tensor.dims()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, Tensor};

    #[test]
    fn ensure_dims_accepts_exact_shape() {
        let t = Tensor::zeros((2, 3, 4), DType::F32, &Device::Cpu).unwrap();
        ensure_dims("test", &t, &[2, 3, 4]).unwrap();
    }

    #[test]
    fn ensure_dims_reports_stage_and_shapes() {
        let t = Tensor::zeros((2, 3), DType::F32, &Device::Cpu).unwrap();
        let err = ensure_dims("residual", &t, &[2, 4]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("residual"), "{msg}");
        assert!(msg.contains("[2, 4]"), "{msg}");
        assert!(msg.contains("[2, 3]"), "{msg}");
    }
}
