//! Concrete step sequences.
//!
//! | Operation | Steps |
//! |---|---|
//! | set initial bearer | `FIRST → CHECK_MODE → RF_OFF → SET_APN → AUTH → RF_ON → LAST` |
//! | load initial bearer | `FIRST → PROFILE → APN → AUTH → LAST` |
//! | scan networks | `FIRST → SCAN → LAST` |
//! | register | `FIRST → SELECT → CHECK → LAST` |

pub mod load_initial_bearer;
pub mod register;
pub mod scan;
pub mod set_initial_bearer;

pub use load_initial_bearer::{LoadInitialBearer, LoadInitialBearerStep};
pub use register::{Register, RegisterStep};
pub use scan::{ScanNetworks, ScanStep};
pub use set_initial_bearer::{SetInitialBearer, SetInitialBearerStep};

/// `+CFUN` full functionality.
pub const CFUN_FULL: u32 = 1;
/// `+CFUN` RF disabled (transmit and receive off).
pub const CFUN_RF_OFF: u32 = 4;
