// Library surface for the headless core, integration tests and the TUI host.
// Keep this free of terminal drawing; that lives in the binary.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod input;
pub mod runtime;
pub mod sensitivity;
pub mod session;
pub mod target;
pub mod util;

pub use error::{AimError, AimResult};
