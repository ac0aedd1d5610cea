//! Admin panel sign-in.
//!
//! This crate provides:
//! - `SignInFlow`, which signs a user in through the identity provider and
//!   rejects (and signs back out) anyone not on the allow-list
//! - `IdentityClient`, the seam to the identity provider
//! - `FirebaseAuthClient`, an `IdentityClient` backed by the Firebase Auth REST API

pub mod config;
pub mod error;
pub mod firebase;
pub mod flow;
pub mod provider;

pub use config::{ClientConfig, Endpoints};
pub use error::{ProviderError, SignInError};
pub use firebase::FirebaseAuthClient;
pub use flow::SignInFlow;
pub use provider::{ConsentPrompt, ConsentRequest, IdentityAssertion, IdentityClient, IdpCredential};
