use thiserror::Error;

/// Failure reported by the identity provider or the consent step.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The user closed the consent popup
    #[error("Sign-in popup was dismissed")]
    Dismissed,

    /// Transport failure talking to the provider
    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with an error status
    #[error("Identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Provider answered with a body we could not use
    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by [`crate::SignInFlow`].
#[derive(Debug, Error)]
pub enum SignInError {
    #[error("Firebase authentication is not configured. Please set up Firebase environment variables.")]
    Configuration,

    #[error("Your email is not authorized to access the admin panel. Please contact the administrator.")]
    Unauthorized { email: String },

    #[error("Unable to retrieve email from Google account.")]
    MissingEmail,

    #[error("Sign-in with the identity provider failed")]
    Provider(#[source] ProviderError),
}

impl From<ProviderError> for SignInError {
    fn from(err: ProviderError) -> Self {
        SignInError::Provider(err)
    }
}
