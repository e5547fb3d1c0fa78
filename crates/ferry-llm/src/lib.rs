//! Chat completion routing core for Ferry
//!
//! Accepts canonical (`OpenAI`-shaped) chat completion requests, resolves
//! them to an ordered chain of vendor candidates, rotates credentials within
//! a candidate, and translates requests, replies and streams to and from the
//! `OpenAI`, Anthropic, Google and Cloudflare Workers AI wire formats.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod id;
pub mod protocol;
pub mod provider;
pub mod rotation;
pub mod routing;
pub mod stream;
pub mod types;

pub use error::{CandidateFailure, LlmError};
pub use provider::{ChatOutput, ChatProvider, HttpProviderFactory, ProviderFactory};
pub use rotation::TokenManager;
pub use routing::ModelRouter;
pub use stream::ChatStream;
pub use types::{ChatRequest, ChatResponse};
