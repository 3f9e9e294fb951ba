//! Shared foundations for the Prism engine: renderer configuration,
//! frame timing, logging setup, and the platform-level error type.

mod config;
mod error;
mod logging;
mod timer;

pub use config::RendererConfig;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
