// Session Tests Module - Testing the session module
// - gate_tests: SessionGate decisions, delayed navigation, cancellation
// - auth_tests: AuthSession restore, sign-in, sign-out, token expiry

mod auth_tests;
mod gate_tests;
