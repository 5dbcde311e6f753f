//! Core abstractions for the editing kernel
//!
//! The pieces every manager shares: the spec document, the event mesh, the
//! active-diagram store, undo/redo history, configuration and logging.

pub mod clock;
mod config;
mod document;
mod error;
mod event_bus;
mod events;
mod history;
pub mod logging;
mod spec;
mod state;
mod types;

pub use config::*;
pub use document::*;
pub use error::*;
pub use event_bus::*;
pub use events::*;
pub use history::*;
pub use logging::*;
pub use spec::*;
pub use state::*;
pub use types::*;
