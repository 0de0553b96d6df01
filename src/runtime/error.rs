use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("task canceled")]
    Canceled,

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::Canceled
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Error::Panicked(message)
        } else {
            Error::Canceled
        }
    }
}
