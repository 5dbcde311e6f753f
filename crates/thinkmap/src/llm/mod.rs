//! Multi-model generation
//!
//! [`LlmEngineManager`] fans a request out to several models through a
//! [`GenerationTransport`], validates what comes back and keeps successful
//! results in an [`LlmResultCache`].

mod cache;
mod cancel;
mod engine;
mod transport;

pub use cache::*;
pub use cancel::*;
pub use engine::*;
pub use transport::*;
