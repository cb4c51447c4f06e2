//! Jamf Pro upload processors
//!
//! Processors create, update and delete objects on a Jamf Pro server through
//! the Classic and Jamf Pro APIs, and notifiers report what changed to chat
//! webhooks. Processors read their inputs from an [`Environment`] and return a
//! [`ProcessorOutput`]; the [`recipe`] runner chains them.

pub mod api;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod notifiers;
pub mod processors;
pub mod recipe;
pub mod template;

pub use environment::Environment;
pub use error::{AuthError, JamfError};
pub use processors::{Processor, ProcessorContext, ProcessorKind, ProcessorOutput};
