//! Shared types for the cellmgr modem engine.
//!
//! This crate contains:
//! - **Errors**: `ModemError` / `TransportError` and the `ErrorKind` taxonomy
//! - **Bearer types**: IP family, bearer properties, PDP context records
//! - **Network types**: scan results and registration state
//! - **ID generation**: Prefixed UUIDv7 helpers (`op_`, `dev_`)

pub mod bearer;
pub mod error;
pub mod ids;
pub mod network;
