//! Library exports for the airscriber pipeline.
//!
//! The binary wires these together in [`app::run`]; they are exposed so that
//! integration tests and other front-ends (a camera tracker, a GUI) can drive
//! the same classifier, state machine, canvas and background services.

pub mod app;
pub mod config;
pub mod device;
pub mod draw;
pub mod gesture;
pub mod input;
pub mod recognition;
pub mod session;
pub mod speech;
pub mod ui;
pub mod util;

pub use config::Config;
