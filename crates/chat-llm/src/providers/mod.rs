//! Completion providers
//!
//! This module contains the completion endpoint implementations.

pub(crate) mod common;
pub mod openai;
pub mod relay;

pub use openai::OpenAIProvider;
pub use relay::RelayProvider;
