//! Simulated modems for exercising the operation engine without hardware.
//!
//! [`channel::SimChannel`] answers AT commands from a script and enforces
//! per-command timeouts like a real port would. [`scenario`] builds
//! scripts: a well-behaved device, or reproducible fault cases for the
//! set-initial-bearer flow together with the outcome the engine must
//! produce for them.

pub mod channel;
pub mod scenario;
