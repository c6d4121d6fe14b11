//! Shared harness for integration tests.
//!
//! Spawns the real HTTP server on an ephemeral port, wired to in-memory
//! stores, a manual clock and a scripted verification service.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use vote_guard::clock::ManualClock;
use vote_guard::config::VotingConfig;
use vote_guard::http::{HttpServer, VoteResponse};
use vote_guard::lifecycle::Shutdown;
use vote_guard::pipeline::{Collaborators, VoteIntegrityPipeline};
use vote_guard::security::{CounterState, CounterStore, CounterStoreError, MemoryCounterStore};
use vote_guard::store::MemoryStore;
use vote_guard::verification::{VerificationError, VerificationService};

pub const START: u64 = 1_700_000_000;
pub const VALID_PROOF: &str = "valid-proof";

/// Accepts only [`VALID_PROOF`].
pub struct ScriptedVerifier;

#[async_trait]
impl VerificationService for ScriptedVerifier {
    async fn verify(&self, proof_token: &str, _remote_ip: &str) -> Result<bool, VerificationError> {
        Ok(proof_token == VALID_PROOF)
    }
}

/// Verification provider that cannot be reached.
pub struct UnreachableVerifier;

#[async_trait]
impl VerificationService for UnreachableVerifier {
    async fn verify(&self, _: &str, _: &str) -> Result<bool, VerificationError> {
        Err(VerificationError::Malformed("connection reset".into()))
    }
}

/// Counter store that is always down.
pub struct DownCounters;

#[async_trait]
impl CounterStore for DownCounters {
    async fn increment_below(&self, _: &str, _: u64, _: u64) -> Result<CounterState, CounterStoreError> {
        Err(CounterStoreError::Unreachable("connection refused".into()))
    }
}

/// Counter store that never answers within the deadline.
pub struct StalledCounters;

#[async_trait]
impl CounterStore for StalledCounters {
    async fn increment_below(&self, _: &str, _: u64, _: u64) -> Result<CounterState, CounterStoreError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(CounterState::AtLimit(u64::MAX))
    }
}

pub fn test_config() -> VotingConfig {
    let mut config = VotingConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.contest.allowed_contestants = "alice,bob,carol,dave".to_string();
    config.verification.site_key = "test-site-key".to_string();
    config
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub pipeline: Arc<VoteIntegrityPipeline>,
    shutdown: Shutdown,
}

pub struct AppBuilder {
    config: VotingConfig,
    verifier: Arc<dyn VerificationService>,
    counters: Option<Arc<dyn CounterStore>>,
}

impl AppBuilder {
    pub fn config(mut self, config: VotingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn verifier(mut self, verifier: impl VerificationService + 'static) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn counters(mut self, counters: impl CounterStore + 'static) -> Self {
        self.counters = Some(Arc::new(counters));
        self
    }

    pub async fn spawn(self) -> TestApp {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(MemoryStore::new(None));
        let counters = self
            .counters
            .unwrap_or_else(|| Arc::new(MemoryCounterStore::new(clock.clone())) as Arc<dyn CounterStore>);

        let pipeline = Arc::new(VoteIntegrityPipeline::new(
            &self.config,
            Collaborators {
                store: store.clone(),
                counters,
                verifier: self.verifier,
                clock: clock.clone(),
            },
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server = HttpServer::new(self.config, pipeline.clone());
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        TestApp {
            addr,
            client,
            clock,
            store,
            pipeline,
            shutdown,
        }
    }
}

pub fn app() -> AppBuilder {
    AppBuilder {
        config: test_config(),
        verifier: Arc::new(ScriptedVerifier),
        counters: None,
    }
}

/// Token fields a client keeps between calls.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: String,
    pub fingerprint: String,
    pub body: Value,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn request_token(&self, visitor_id: &str, ip: &str) -> reqwest::Response {
        self.client
            .get(self.url("/token"))
            .query(&[("visitorId", visitor_id), ("localId", "local")])
            .header("x-forwarded-for", ip)
            .send()
            .await
            .unwrap()
    }

    pub async fn token(&self, visitor_id: &str, ip: &str) -> Credentials {
        let res = self.request_token(visitor_id, ip).await;
        assert_eq!(res.status(), 200, "token request should succeed");
        let body: Value = res.json().await.unwrap();
        Credentials {
            token: body["token"].as_str().unwrap().to_string(),
            fingerprint: body["fingerprint"].as_str().unwrap().to_string(),
            body,
        }
    }

    pub async fn vote(
        &self,
        creds: &Credentials,
        contestant: &str,
        ip: &str,
        proof: Option<&str>,
    ) -> (u16, VoteResponse) {
        let res = self
            .client
            .post(self.url("/vote"))
            .header("x-forwarded-for", ip)
            .header("x-vote-token", &creds.token)
            .json(&json!({
                "contestant": contestant,
                "fingerprint": creds.fingerprint,
                "recaptcha_token": proof,
            }))
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
