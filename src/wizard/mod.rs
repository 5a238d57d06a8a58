pub mod history;
pub mod machine;
pub mod session;

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no saved settings for this user")]
    NotFound,
}
