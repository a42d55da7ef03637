use derive_more::Display;

/// Failure kinds raised while bridging pipeline sources onto the engine.
///
/// Errors are carried as [`anyhow::Error`]; the kind is attached either as
/// the root error or as context, so use [`Error::of`] to classify.
#[derive(Debug, Display, Clone, Eq, PartialEq)]
pub enum Error {
    #[display(fmt = "serialization error: {}", _0)]
    Serialization(String),

    #[display(fmt = "translation error: {}", _0)]
    Translation(String),

    #[display(fmt = "open error: {}", _0)]
    Open(String),

    #[display(fmt = "read error: {}", _0)]
    Read(String),

    #[display(fmt = "state error: {}", _0)]
    State(String),

    #[display(fmt = "adapter error: {}", _0)]
    Adapter(String),
}

impl std::error::Error for Error {}

impl Error {
    /// Finds the outermost bridge error kind attached to `err`.
    pub fn of(err: &anyhow::Error) -> Option<&Error> {
        err.downcast_ref::<Error>()
    }

    /// Open and read failures belong to a single partition attempt and may
    /// succeed when the partition is read again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Open(_) | Error::Read(_))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_classify_context() {
        let res: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = res
            .context(Error::Open("failed to open partition 3".to_string()))
            .context("partition 3 failed after 1 attempt(s)")
            .unwrap_err();

        assert_eq!(
            Error::of(&err),
            Some(&Error::Open("failed to open partition 3".to_string()))
        );
        assert_eq!(err.root_cause().to_string(), "connection refused");
        assert!(Error::of(&err).unwrap().is_retryable());
    }

    #[test]
    fn test_classify_root() {
        let err: anyhow::Error = Error::State("reader is closed".to_string()).into();
        assert_eq!(err.to_string(), "state error: reader is closed");
        assert!(!Error::of(&err).unwrap().is_retryable());
        assert!(Error::of(&anyhow::anyhow!("plain")).is_none());
    }
}
