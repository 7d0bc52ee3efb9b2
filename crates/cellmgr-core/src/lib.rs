//! # cellmgr-core
//!
//! Multi-step asynchronous operation engine for cellular modems.
//!
//! A logical operation (set the initial EPS bearer, load it back, scan,
//! register) is an ordered sequence of steps. Each step issues at most one
//! AT command through a [`transport::CommandChannel`] and decides, from the
//! reply, whether to advance, skip, jump to a recovery step, or abort.
//!
//! ## Crate structure
//!
//! - [`transport`]: Command channel trait, timeouts, cancellable dispatch
//! - [`sequence`]: Step enumeration, operation context, sequence controller
//! - [`completion`]: Exactly-once completion sink and operation handle
//! - [`parsers`]: Pure AT response parsers
//! - [`device`]: Per-device session state (cached initial bearer cid)
//! - [`ops`]: The concrete step sequences
//! - [`modem`]: `Modem3gpp` capability trait, vendor impls, `Modem` facade
//! - [`registry`]: Plugin name → implementation mapping
//! - [`config`]: TOML engine configuration

pub mod completion;
pub mod config;
pub mod device;
pub mod modem;
pub mod ops;
pub mod parsers;
pub mod registry;
pub mod sequence;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
