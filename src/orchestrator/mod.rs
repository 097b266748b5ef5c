//! Application-level orchestration utilities.
//!
//! Owns the run tracker on the async side and translates commands from the
//! UI thread into tracker calls. UI layers never touch the tracker directly.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
