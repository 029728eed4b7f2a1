//! Model client implementations for Bentofolio.
//!
//! All clients implement the `bentofolio_core::ModelClient` trait.
//! The router builds them from configuration behind a shared rate limiter.

pub mod openai_compat;
pub mod rate_limit;
pub mod router;

pub use openai_compat::{GITHUB_MODELS_BASE_URL, OpenAiCompatClient};
pub use rate_limit::{RateLimitedClient, RateLimiter};
pub use router::{ProviderRouter, build_from_config};
