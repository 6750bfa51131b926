//! Session module
//!
//! - `auth` - Persisted authentication state and the flag it publishes
//! - `gate` - Navigation state machine driven by that flag

pub mod auth;
pub mod gate;

pub use auth::{token_expiry, AuthSession, SessionProfile, PROFILE_KEY, TOKEN_NAME};
pub use gate::{
    decide, AuthSnapshot, GatePhase, GateView, NavTarget, Router, SessionGate, SessionState,
};
