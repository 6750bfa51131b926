//! TUI (Terminal User Interface) module
//!
//! A thin terminal front-end over the session layer: the splash screen until
//! authentication resolves, then whatever route the session gate selects.

pub mod app;
pub mod types;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, InstallRecord, INSTALL_KEY};
pub use types::{route_segments, LoginField, LoginForm, Screen, ScreenRouter};
