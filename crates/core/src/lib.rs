//! Detection-and-matching engine: color sampling, template matching and the
//! cancellable automation loop that ties them to a screen and a pointer.

pub mod actuator;
pub mod controller;
pub mod error;
pub mod events;
pub mod logger;
pub mod matcher;
pub mod platform;
pub mod sampler;
pub mod settings;
pub mod sleep;
pub mod types;

pub use error::{Error, Result};
