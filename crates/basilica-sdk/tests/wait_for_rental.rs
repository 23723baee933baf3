//! End-to-end tests for waiting on rentals.
//!
//! A scripted in-memory provider covers the waiter contract with real timers, and a
//! mock HTTP server covers the same flow through `BasilicaClient`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use basilica_sdk::{
    BasilicaClient, Error, RentalState, RentalStatus, RentalStatusProvider, RentalWaiter,
    WaitOptions,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Provider replaying a fixed sequence of states, repeating the last one.
struct ScriptedProvider {
    states: Mutex<Vec<RentalState>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(states: Vec<RentalState>) -> Self {
        Self {
            states: Mutex::new(states),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RentalStatusProvider for ScriptedProvider {
    async fn get_rental(&self, rental_id: &str) -> basilica_sdk::Result<RentalStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().unwrap();
        let state = if states.len() > 1 {
            states.remove(0)
        } else {
            states[0].clone()
        };
        Ok(RentalStatus::new(rental_id, state))
    }
}

fn fast_options() -> WaitOptions {
    WaitOptions::new()
        .with_timeout(Duration::from_millis(400))
        .with_poll_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn scripted_provider_reaches_active() {
    let waiter = RentalWaiter::new(ScriptedProvider::new(vec![
        RentalState::Pending,
        RentalState::Provisioning,
        RentalState::Active,
    ]));

    let status = waiter
        .wait_for_rental("rent-1", &fast_options())
        .await
        .unwrap();

    assert_eq!(status.state(), &RentalState::Active);
    assert_eq!(waiter.provider().calls(), 3);
}

#[tokio::test]
async fn scripted_provider_times_out_within_bound() {
    let waiter = RentalWaiter::new(ScriptedProvider::new(vec![RentalState::Pending]));
    let options = fast_options();
    let start = Instant::now();

    let err = waiter.wait_for_rental("rent-2", &options).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(elapsed >= options.timeout);
    // Generous slack for scheduler latency on busy machines.
    assert!(elapsed < options.timeout + options.poll_interval + Duration::from_millis(500));
    assert!(matches!(
        err,
        Error::RentalWaitTimeout {
            last_state: Some(RentalState::Pending),
            ..
        }
    ));
}

#[tokio::test]
async fn scripted_provider_terminal_failure() {
    let waiter = RentalWaiter::new(ScriptedProvider::new(vec![
        RentalState::Pending,
        RentalState::Failed,
    ]));

    let err = waiter
        .wait_for_rental("rent-3", &fast_options())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RentalTerminalState {
            state: RentalState::Failed,
            ..
        }
    ));
    assert_eq!(waiter.provider().calls(), 2);
}

#[tokio::test]
async fn client_wait_stops_on_cancelled_rental() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rentals/rent-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rental_id": "rent-4",
            "status": "Pending"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rentals/rent-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rental_id": "rent-4",
            "status": {"state": "Cancelled", "message": "cancelled by owner"}
        })))
        .mount(&server)
        .await;

    let client = BasilicaClient::new(server.uri()).unwrap();
    let err = client
        .wait_for_rental("rent-4", &fast_options())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::RentalTerminalState {
            rental_id: "rent-4".to_string(),
            state: RentalState::Cancelled,
        }
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn client_wait_surfaces_provider_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rentals/rent-5"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": "BASILICA_API_AUTH_MISSING",
                "message": "Authentication required",
                "timestamp": "2025-03-02T10:00:00Z",
                "retryable": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BasilicaClient::new(server.uri()).unwrap();
    let err = client
        .wait_for_rental("rent-5", &fast_options())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::MissingAuthentication("Authentication required".to_string())
    );
}
