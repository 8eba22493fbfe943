use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BloomError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, BloomError>;

/// Both images must have the same width and height. Channel count is fixed by the
/// `Rgb<f32>` pixel type, so only the spatial extent can differ.
pub fn ensure_same_dimensions(expected: (u32, u32), found: (u32, u32)) -> Result<()> {
    if expected != found {
        return Err(BloomError::DimensionMismatch { expected, found });
    }
    Ok(())
}

pub fn ensure_non_empty(dimensions: (u32, u32)) -> Result<()> {
    if dimensions.0 == 0 || dimensions.1 == 0 {
        return Err(BloomError::InvalidInput(format!(
            "image has no pixels ({} x {})",
            dimensions.0, dimensions.1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_reports_both_sizes() {
        let err = ensure_same_dimensions((4, 4), (4, 3)).unwrap_err();
        assert_eq!(
            err,
            BloomError::DimensionMismatch {
                expected: (4, 4),
                found: (4, 3)
            }
        );
        assert!(err.to_string().contains("(4, 3)"));
    }

    #[test]
    fn zero_width_is_invalid_input() {
        assert!(matches!(
            ensure_non_empty((0, 10)),
            Err(BloomError::InvalidInput(_))
        ));
        assert!(ensure_non_empty((1, 1)).is_ok());
    }
}
