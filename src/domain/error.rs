use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("card {side} must not be empty")]
    EmptyCardSide { side: &'static str },
    #[error("setting `{name}` does not accept `{value}`")]
    InvalidSetting { name: String, value: String },
}

impl DomainError {
    pub fn invalid_setting(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            value: value.into(),
        }
    }
}
