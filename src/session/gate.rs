//! Navigation gate driven by authentication state
//!
//! The gate watches two inputs, the authentication snapshot and the current
//! route, and replaces the screen at most once per meaningful change:
//!
//! - Signed out outside the login flow: go to the login route.
//! - Signed out inside the login flow right after a sign-out: go to the login
//!   route again, which supersedes a stale post-login navigation.
//! - Just signed in while inside the login flow: go to the landing route.
//! - Anything else: stay put.
//!
//! Navigations are dispatched after a short delay so the routing layer can
//! finish mounting. Every meaningful observation bumps a generation counter and
//! cancels the pending navigation, so a stale one can never fire.

use crate::config::GateConfig;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Imperative router the gate drives
pub trait Router: Send + Sync + 'static {
    /// Replace the current screen stack with `route`
    ///
    /// Called with the gate's state lock held; must not call back into the gate.
    fn replace(&self, route: &str);

    /// Segments of the current route, outermost first
    fn segments(&self) -> Vec<String>;
}

/// Authentication flag as published by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSnapshot {
    /// A user is signed in
    pub is_authenticated: bool,
    /// Authentication hasn't resolved yet
    pub is_loading: bool,
}

impl AuthSnapshot {
    /// Unresolved state published at startup
    pub fn loading() -> Self {
        Self { is_authenticated: false, is_loading: true }
    }

    /// Resolved state
    pub fn resolved(is_authenticated: bool) -> Self {
        Self { is_authenticated, is_loading: false }
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}

/// What the gate observed at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// A user is signed in
    pub is_authenticated: bool,
    /// Authentication hasn't resolved yet
    pub is_loading: bool,
    /// First segment of the current route
    pub current_route_group: String,
}

/// Coarse gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Waiting for authentication to resolve
    Splash,
    /// Resolved, no user
    LoggedOut,
    /// Resolved, user signed in
    LoggedIn,
}

/// What the consuming UI should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView {
    /// Loading placeholder; children must not render yet
    Loading,
    /// Children may render
    Ready,
}

/// Where a scheduled navigation goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    /// The login route
    Login,
    /// The post-login landing route
    Landing,
}

/// Navigation decision for one observation
///
/// `changed` is true when `is_authenticated` differs from the previous
/// observation.
pub fn decide(is_authenticated: bool, in_login_group: bool, changed: bool) -> Option<NavTarget> {
    match (is_authenticated, in_login_group, changed) {
        (false, false, _) => Some(NavTarget::Login),
        (false, true, true) => Some(NavTarget::Login),
        (false, true, false) => None,
        (true, true, true) => Some(NavTarget::Landing),
        (true, true, false) => None,
        (true, false, _) => None,
    }
}

struct GateInner {
    is_ready: bool,
    captured_auth: bool,
    last_seen: Option<(bool, String)>,
    last_snapshot: Option<AuthSnapshot>,
    generation: u64,
    pending: Option<(NavTarget, JoinHandle<()>)>,
}

impl GateInner {
    fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some((target, task)) = self.pending.take() {
            task.abort();
            debug!("Canceled pending navigation to {:?}", target);
        }
    }
}

/// Navigation state machine over a [`Router`]
///
/// # Example
/// ```rust,no_run
/// use stockkeep::config::GateConfig;
/// use stockkeep::session::{AuthSnapshot, GateView, Router, SessionGate};
///
/// struct NoopRouter;
///
/// impl Router for NoopRouter {
///     fn replace(&self, _route: &str) {}
///     fn segments(&self) -> Vec<String> { vec!["(tabs)".to_string()] }
/// }
///
/// # async fn example() {
/// let gate = SessionGate::new(NoopRouter, GateConfig::default());
/// assert_eq!(gate.observe(AuthSnapshot::loading()), GateView::Loading);
///
/// // Signed out on a tab screen: navigation to login is scheduled
/// assert_eq!(gate.observe(AuthSnapshot::resolved(false)), GateView::Ready);
/// # }
/// ```
pub struct SessionGate<R: Router> {
    router: Arc<R>,
    config: GateConfig,
    inner: Arc<Mutex<GateInner>>,
}

impl<R: Router> SessionGate<R> {
    /// Create a gate in the splash phase
    pub fn new(router: R, config: GateConfig) -> Self {
        Self::from_shared(Arc::new(router), config)
    }

    /// Create a gate over a router shared with other owners
    pub fn from_shared(router: Arc<R>, config: GateConfig) -> Self {
        Self {
            router,
            config,
            inner: Arc::new(Mutex::new(GateInner {
                is_ready: false,
                captured_auth: false,
                last_seen: None,
                last_snapshot: None,
                generation: 0,
                pending: None,
            })),
        }
    }

    /// The router this gate drives
    pub fn router(&self) -> &Arc<R> {
        &self.router
    }

    /// Whether authentication has resolved at least once
    pub fn is_ready(&self) -> bool {
        self.lock().is_ready
    }

    /// Current coarse state
    pub fn phase(&self) -> GatePhase {
        let inner = self.lock();
        match (inner.is_ready, inner.captured_auth) {
            (false, _) => GatePhase::Splash,
            (true, false) => GatePhase::LoggedOut,
            (true, true) => GatePhase::LoggedIn,
        }
    }

    /// Target of the navigation waiting on its delay, if any
    pub fn pending_navigation(&self) -> Option<NavTarget> {
        self.lock().pending.as_ref().map(|(target, _)| *target)
    }

    /// Current observation generation
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Snapshot plus current route, as the gate would see it now
    pub fn session_state(&self, snapshot: AuthSnapshot) -> SessionState {
        SessionState {
            is_authenticated: snapshot.is_authenticated,
            is_loading: snapshot.is_loading,
            current_route_group: self.route_group(),
        }
    }

    /// Feed one authentication snapshot through the gate
    ///
    /// Returns [`GateView::Loading`] until authentication has resolved once.
    /// Repeating an observation that matches the previous one is a no-op.
    pub fn observe(&self, snapshot: AuthSnapshot) -> GateView {
        let state = self.session_state(snapshot);
        let mut inner = self.lock();
        inner.last_snapshot = Some(snapshot);

        if !inner.is_ready {
            if state.is_loading {
                return GateView::Loading;
            }
            inner.is_ready = true;
            info!("Authentication resolved (authenticated: {})", state.is_authenticated);
        }

        let seen = (state.is_authenticated, state.current_route_group.clone());
        if inner.last_seen.as_ref() == Some(&seen) {
            return GateView::Ready;
        }
        inner.last_seen = Some(seen);

        inner.cancel_pending();

        let in_login_group = state.current_route_group == self.config.login_group;
        let changed = state.is_authenticated != inner.captured_auth;
        inner.captured_auth = state.is_authenticated;

        debug!(
            "Observed {:?} (in login group: {}, changed: {}, generation: {})",
            state, in_login_group, changed, inner.generation
        );

        if let Some(target) = decide(state.is_authenticated, in_login_group, changed) {
            self.schedule(&mut inner, target);
        }

        GateView::Ready
    }

    /// Re-run the last observation against the current route
    ///
    /// Call after the route changed without an authentication change.
    pub fn refresh(&self) -> GateView {
        let last = self.lock().last_snapshot;
        match last {
            Some(snapshot) => self.observe(snapshot),
            None => GateView::Loading,
        }
    }

    /// Observe every snapshot published on `auth` until its sender closes
    pub async fn run(&self, mut auth: watch::Receiver<AuthSnapshot>) {
        loop {
            let snapshot = *auth.borrow_and_update();
            self.observe(snapshot);
            if auth.changed().await.is_err() {
                break;
            }
        }
        debug!("Authentication source closed, stopping session gate");
        self.shutdown();
    }

    /// Cancel any pending navigation
    pub fn shutdown(&self) {
        self.lock().cancel_pending();
    }

    /// Occupy the pending slot with a delayed navigation to `target`
    ///
    /// Callers cancel first, so the slot is always empty here and at most one
    /// navigation is ever pending.
    fn schedule(&self, inner: &mut GateInner, target: NavTarget) {
        debug_assert!(inner.pending.is_none(), "schedule called with a navigation pending");

        let route = match target {
            NavTarget::Login => self.config.login_route.clone(),
            NavTarget::Landing => self.config.landing_route.clone(),
        };
        let generation = inner.generation;
        let delay = Duration::from_millis(self.config.navigation_delay_ms);
        let router = Arc::clone(&self.router);
        let shared = Arc::clone(&self.inner);

        debug!("Scheduling navigation to {} in {:?}", route, delay);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut inner = lock(&shared);
            if inner.generation != generation {
                debug!("Dropping stale navigation to {}", route);
                return;
            }
            inner.pending = None;
            info!("Navigating to {}", route);
            router.replace(&route);
        });

        inner.pending = Some((target, task));
    }

    fn route_group(&self) -> String {
        self.router.segments().into_iter().next().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        lock(&self.inner)
    }
}

impl<R: Router> Drop for SessionGate<R> {
    fn drop(&mut self) {
        // Never fire against a torn-down view layer
        if let Ok(mut inner) = self.inner.lock() {
            inner.cancel_pending();
        }
    }
}

fn lock(inner: &Mutex<GateInner>) -> MutexGuard<'_, GateInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
