//! Validators
//!
//! - [`DiagramValidator`]: completeness of the rendered diagram
//! - [`validate_properties`]: schema check of a candidate spec
//! - [`analyze_consistency`]: comparison of several models' results

mod consistency;
mod diagram;
pub mod placeholders;
mod property;

pub use consistency::*;
pub use diagram::*;
pub use property::*;
