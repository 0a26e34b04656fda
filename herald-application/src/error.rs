use herald_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("provider {provider}: {reason}")]
    Provider { provider: String, reason: String },

    #[error("infra: {0}")]
    Infra(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Domain(DomainError::from(err))
    }
}
