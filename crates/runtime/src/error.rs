use crate::model::ModelError;
use crate::tools::ToolError;
use thiserror::Error;

/// Errors that end an agent run.
///
/// Individual tool failures are not here: they are reported back to the
/// model and the run continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("tool discovery failed: {0}")]
    Discovery(#[source] ToolError),

    #[error("completion service: {0}")]
    Completion(#[from] ModelError),

    #[error("exceeded iteration budget of {limit} reasoning rounds")]
    IterationBudgetExceeded { limit: u32 },
}

impl Error {
    /// A reason suitable for showing to the end user.
    ///
    /// Never includes provider status codes or response bodies.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyPrompt => "Request must contain a non-empty \"prompt\".".to_string(),
            Self::Discovery(_) => {
                "The data tools are unavailable right now. Please try again later.".to_string()
            }
            Self::Completion(ModelError::RateLimited(_)) => {
                "The language model service is busy. Please try again shortly.".to_string()
            }
            Self::Completion(_) => {
                "The language model service could not complete the request.".to_string()
            }
            Self::IterationBudgetExceeded { limit } => format!(
                "Exceeded the iteration budget of {limit} reasoning rounds without reaching an answer."
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_provider_details() {
        let err = Error::Completion(ModelError::Api("500: {\"type\":\"overloaded\"}".into()));
        assert!(!err.user_message().contains("500"));

        let err = Error::Discovery(ToolError::Transport("connection refused".into()));
        assert!(!err.user_message().contains("refused"));
    }

    #[test]
    fn budget_message_names_the_budget() {
        let err = Error::IterationBudgetExceeded { limit: 10 };
        assert!(err.user_message().contains("iteration budget"));
        assert!(err.user_message().contains("10"));
    }
}
