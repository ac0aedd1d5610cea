//! Types and policy shared by the admin sign-in client and the backend.
//!
//! The allow-list lives here so that both sides of the sign-in flow apply
//! exactly the same membership rules.

pub mod allowlist;
pub mod api;

pub use allowlist::{is_authorized, AllowList};
pub use api::{ErrorResponse, HealthResponse, Verdict, VerifyTokenRequest, WatermarkRequest};
