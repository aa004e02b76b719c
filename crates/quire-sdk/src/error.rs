use quire_store::StoreError;
use quire_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// A current/next lookup ran before the version manager was loaded.
    #[error("version not compiled")]
    VersionNotCompiled,

    #[error("no page at path: {0}")]
    PageNotFound(String),

    #[error("invalid version selector: {0}")]
    InvalidVersion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid value: {0}")]
    Type(#[from] TypeError),
}

/// How an error should be reported to an outside caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    InvalidInput,
    Internal,
}

impl SdkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PageNotFound(_) => ErrorClass::NotFound,
            Self::Store(e) if e.original_cause().is_not_found() => ErrorClass::NotFound,
            Self::InvalidVersion(_) | Self::Type(_) => ErrorClass::InvalidInput,
            Self::Store(e) if matches!(e.original_cause(), StoreError::InvalidInput(_)) => {
                ErrorClass::InvalidInput
            }
            _ => ErrorClass::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
