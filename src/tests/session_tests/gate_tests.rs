use crate::config::GateConfig;
use crate::session::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LOGIN: &str = "/(auth)/login";
const LANDING: &str = "/(tabs)";

/// Router that records every replace and follows it
struct TestRouter {
    route: Mutex<String>,
    replaced: Mutex<Vec<String>>,
}

impl TestRouter {
    fn at(route: &str) -> Self {
        Self {
            route: Mutex::new(route.to_string()),
            replaced: Mutex::new(Vec::new()),
        }
    }

    fn set_route(&self, route: &str) {
        *self.route.lock().unwrap() = route.to_string();
    }

    fn replaced(&self) -> Vec<String> {
        self.replaced.lock().unwrap().clone()
    }
}

impl Router for TestRouter {
    fn replace(&self, route: &str) {
        *self.route.lock().unwrap() = route.to_string();
        self.replaced.lock().unwrap().push(route.to_string());
    }

    fn segments(&self) -> Vec<String> {
        self.route
            .lock()
            .unwrap()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn gate_at(route: &str) -> (SessionGate<TestRouter>, Arc<TestRouter>) {
    let router = Arc::new(TestRouter::at(route));
    let gate = SessionGate::from_shared(Arc::clone(&router), GateConfig::default());
    (gate, router)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[test]
fn test_decision_table() {
    assert_eq!(decide(false, false, false), Some(NavTarget::Login));
    assert_eq!(decide(false, false, true), Some(NavTarget::Login));
    assert_eq!(decide(false, true, true), Some(NavTarget::Login));
    assert_eq!(decide(false, true, false), None);
    assert_eq!(decide(true, true, true), Some(NavTarget::Landing));
    assert_eq!(decide(true, true, false), None);
    assert_eq!(decide(true, false, true), None);
    assert_eq!(decide(true, false, false), None);
}

#[tokio::test(start_paused = true)]
async fn test_loading_renders_placeholder_without_navigation() {
    let (gate, router) = gate_at(LANDING);

    assert_eq!(gate.phase(), GatePhase::Splash);
    assert_eq!(gate.observe(AuthSnapshot::loading()), GateView::Loading);
    assert_eq!(gate.observe(AuthSnapshot::loading()), GateView::Loading);
    assert!(!gate.is_ready());
    assert_eq!(gate.pending_navigation(), None);

    settle().await;
    assert!(router.replaced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_flow_end_to_end() {
    let (gate, router) = gate_at(LANDING);

    assert_eq!(gate.observe(AuthSnapshot::loading()), GateView::Loading);

    // Resolves signed out on a tab screen
    assert_eq!(gate.observe(AuthSnapshot::resolved(false)), GateView::Ready);
    assert_eq!(gate.phase(), GatePhase::LoggedOut);
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Login));

    // Nothing fires before the delay
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(router.replaced().is_empty());

    settle().await;
    assert_eq!(router.replaced(), vec![LOGIN.to_string()]);
    assert_eq!(gate.pending_navigation(), None);

    // Arriving on the login route while signed out is a no-op
    assert_eq!(gate.refresh(), GateView::Ready);
    assert_eq!(gate.pending_navigation(), None);

    // Signing in from the login route lands on the tabs
    gate.observe(AuthSnapshot::resolved(true));
    assert_eq!(gate.phase(), GatePhase::LoggedIn);
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Landing));

    settle().await;
    assert_eq!(router.replaced(), vec![LOGIN.to_string(), LANDING.to_string()]);

    // Back on the tabs while signed in: stays put
    gate.refresh();
    settle().await;
    assert_eq!(router.replaced().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_observations_navigate_once() {
    let (gate, router) = gate_at(LOGIN);

    gate.observe(AuthSnapshot::resolved(false));
    let generation = gate.generation();
    gate.observe(AuthSnapshot::resolved(true));
    assert_eq!(gate.generation(), generation + 1);

    // Identical observations during the delay don't reschedule
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.observe(AuthSnapshot::resolved(true));
    }
    assert_eq!(gate.generation(), generation + 1);

    settle().await;
    assert_eq!(router.replaced(), vec![LANDING.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_during_delay_supersedes_landing() {
    let (gate, router) = gate_at(LOGIN);

    gate.observe(AuthSnapshot::resolved(false));
    gate.observe(AuthSnapshot::resolved(true));
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Landing));

    tokio::time::sleep(Duration::from_millis(30)).await;
    gate.observe(AuthSnapshot::resolved(false));
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Login));

    settle().await;
    assert_eq!(router.replaced(), vec![LOGIN.to_string()]);
    assert_eq!(gate.phase(), GatePhase::LoggedOut);
}

#[tokio::test(start_paused = true)]
async fn test_ready_never_reverts() {
    let (gate, _router) = gate_at(LOGIN);

    gate.observe(AuthSnapshot::resolved(false));
    assert!(gate.is_ready());

    assert_eq!(gate.observe(AuthSnapshot::loading()), GateView::Ready);
    assert!(gate.is_ready());
    assert_ne!(gate.phase(), GatePhase::Splash);
}

#[tokio::test(start_paused = true)]
async fn test_authenticated_outside_login_flow_stays_put() {
    let (gate, router) = gate_at("/(tabs)/inventory");

    gate.observe(AuthSnapshot::resolved(true));
    assert_eq!(gate.pending_navigation(), None);

    settle().await;
    assert!(router.replaced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restored_session_on_login_route_lands() {
    let (gate, router) = gate_at(LOGIN);

    gate.observe(AuthSnapshot::loading());
    gate.observe(AuthSnapshot::resolved(true));
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Landing));

    settle().await;
    assert_eq!(router.replaced(), vec![LANDING.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_route_change_reevaluates() {
    let (gate, router) = gate_at(LOGIN);

    gate.observe(AuthSnapshot::resolved(false));
    assert_eq!(gate.pending_navigation(), None);

    // The user wanders off the login flow while signed out
    router.set_route("/(tabs)/inventory");
    gate.refresh();
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Login));

    settle().await;
    assert_eq!(router.replaced(), vec![LOGIN.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_navigation() {
    let (gate, router) = gate_at(LANDING);

    gate.observe(AuthSnapshot::resolved(false));
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Login));

    gate.shutdown();
    assert_eq!(gate.pending_navigation(), None);

    settle().await;
    assert!(router.replaced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_pending_navigation() {
    let (gate, router) = gate_at(LANDING);

    gate.observe(AuthSnapshot::resolved(false));
    drop(gate);

    settle().await;
    assert!(router.replaced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_follows_published_snapshots() {
    let (gate, router) = gate_at(LANDING);
    let gate = Arc::new(gate);
    let (tx, rx) = tokio::sync::watch::channel(AuthSnapshot::loading());

    let runner = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move { gate.run(rx).await })
    };

    tokio::task::yield_now().await;
    assert!(!gate.is_ready());

    tx.send(AuthSnapshot::resolved(false)).unwrap();
    settle().await;
    assert!(gate.is_ready());
    assert_eq!(router.replaced(), vec![LOGIN.to_string()]);

    drop(tx);
    runner.await.expect("Gate task panicked");
    assert_eq!(gate.pending_navigation(), None);
}

#[test]
fn test_session_state_reads_route_group() {
    let (gate, _router) = gate_at("/(tabs)/inventory/sku-1");

    let state = gate.session_state(AuthSnapshot::resolved(true));
    assert_eq!(
        state,
        SessionState {
            is_authenticated: true,
            is_loading: false,
            current_route_group: "(tabs)".to_string(),
        }
    );
}

#[test]
fn test_auth_snapshot_defaults_to_loading() {
    assert_eq!(AuthSnapshot::default(), AuthSnapshot::loading());
    assert!(AuthSnapshot::loading().is_loading);
    assert!(!AuthSnapshot::resolved(true).is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_keeps_one_pending_navigation() {
    let (gate, router) = gate_at(LANDING);

    gate.observe(AuthSnapshot::resolved(false));
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Login));

    // Route moves to another signed-out screen during the delay
    tokio::time::sleep(Duration::from_millis(40)).await;
    router.set_route("/(settings)");
    gate.refresh();
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Login));

    // The first task was superseded; only the second one fires
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert!(router.replaced().is_empty());

    settle().await;
    assert_eq!(router.replaced(), vec![LOGIN.to_string()]);
    assert_eq!(gate.pending_navigation(), None);

    // A later change schedules again from the emptied slot
    gate.observe(AuthSnapshot::resolved(true));
    assert_eq!(gate.pending_navigation(), Some(NavTarget::Landing));
    settle().await;
    assert_eq!(router.replaced(), vec![LOGIN.to_string(), LANDING.to_string()]);
}
