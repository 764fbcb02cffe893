pub type BubbleResult<T> = Result<T, BubbleError>;

#[derive(thiserror::Error, Debug)]
pub enum BubbleError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BubbleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            BubbleError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(BubbleError::audio("x").to_string().contains("audio error:"));
        assert!(
            BubbleError::export("x")
                .to_string()
                .contains("export error:")
        );
        assert!(
            BubbleError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BubbleError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
