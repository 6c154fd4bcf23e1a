//! Scheduler runner -- the control surface and the control thread.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, shared state, registration, and accessor methods
//! - `control`: start/stop lifecycle of the control thread
//! - `execution`: the scan/dispatch/wait loop run by the control thread

mod control;
mod core;
mod execution;

pub use self::core::Scheduler;
