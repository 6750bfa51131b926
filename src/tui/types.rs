//! Core types for TUI screens and navigation

use crate::config::GateConfig;
use crate::session::Router;
use std::sync::Mutex;

/// Application screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Shown until authentication resolves
    Splash,
    /// Sign-in form
    Login,
    /// Post-login landing screen
    Inventory,
}

impl Screen {
    /// Screen a route renders
    pub fn from_route(route: &str, config: &GateConfig) -> Self {
        match route_segments(route).first() {
            Some(group) if *group == config.login_group => Self::Login,
            _ => Self::Inventory,
        }
    }
}

/// Split a route into its non-empty segments
pub fn route_segments(route: &str) -> Vec<String> {
    route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Router over a single current route string
#[derive(Debug)]
pub struct ScreenRouter {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl ScreenRouter {
    /// Start at `initial`
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(initial.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Current route
    pub fn current(&self) -> String {
        self.current.lock().map(|route| route.clone()).unwrap_or_default()
    }

    /// Every route replaced in so far, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|history| history.clone()).unwrap_or_default()
    }
}

impl Router for ScreenRouter {
    fn replace(&self, route: &str) {
        if let Ok(mut current) = self.current.lock() {
            *current = route.to_string();
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(route.to_string());
        }
    }

    fn segments(&self) -> Vec<String> {
        route_segments(&self.current())
    }
}

/// Which login field receives input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    /// Email field
    #[default]
    Email,
    /// Password field
    Password,
}

/// Sign-in form state
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    /// Email input
    pub email: String,
    /// Password input
    pub password: String,
    /// Focused field
    pub focus: LoginField,
}

impl LoginForm {
    /// Add a character to the focused field
    pub fn add_char(&mut self, c: char) {
        match self.focus {
            LoginField::Email => self.email.push(c),
            LoginField::Password => self.password.push(c),
        }
    }

    /// Remove the last character of the focused field
    pub fn backspace(&mut self) {
        match self.focus {
            LoginField::Email => self.email.pop(),
            LoginField::Password => self.password.pop(),
        };
    }

    /// Move focus to the other field
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    /// Whether both fields have content
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    /// Clear both fields
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
