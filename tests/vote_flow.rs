//! End-to-end vote flows over HTTP.

use serde_json::Value;

mod common;

use common::{app, test_config, DownCounters, StalledCounters, UnreachableVerifier, VALID_PROOF};

#[tokio::test]
async fn test_vote_then_duplicate() {
    let app = app().spawn().await;
    let creds = app.token("visitor-alice", "1.1.1.1").await;
    assert_eq!(creds.body["votes_used"], 0);
    assert_eq!(creds.body["is_suspicious"], false);

    let (status, body) = app.vote(&creds, "Alice", "1.1.1.1", None).await;
    assert_eq!(status, 200);
    assert!(body.success);
    assert_eq!(body.message, "Vote recorded for Alice!");
    assert_eq!(body.votes_remaining, Some(2));

    let (status, body) = app.vote(&creds, "alice", "1.1.1.1", None).await;
    assert_eq!(status, 400);
    assert!(!body.success);
    assert_eq!(body.message, "You have already voted for Alice.");

    let votes = app.store.votes().unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].contestant, "alice");
    assert!(!votes[0].verified_via_captcha);
    assert!(!votes[0].verified_via_sms);
}

#[tokio::test]
async fn test_ip_change_requires_verification() {
    let app = app().spawn().await;
    let creds = app.token("visitor-roaming", "1.1.1.1").await;
    let (status, _) = app.vote(&creds, "alice", "1.1.1.1", None).await;
    assert_eq!(status, 200);

    let creds = app.token("visitor-roaming", "2.2.2.2").await;
    assert_eq!(creds.body["is_suspicious"], true);
    assert_eq!(creds.body["votes_used"], 1);

    let logs = app.store.ip_change_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].old_ip.as_deref(), Some("1.1.1.1"));
    assert_eq!(logs[0].new_ip, "2.2.2.2");

    let (status, body) = app.vote(&creds, "bob", "2.2.2.2", None).await;
    assert_eq!(status, 403);
    assert!(body.requires_captcha);

    let (status, body) = app.vote(&creds, "bob", "2.2.2.2", Some("")).await;
    assert_eq!(status, 403);
    assert_eq!(
        body.message,
        "CAPTCHA verification required. Please complete the reCAPTCHA challenge."
    );

    let (status, body) = app.vote(&creds, "bob", "2.2.2.2", Some("   ")).await;
    assert_eq!(status, 403);
    assert_eq!(body.message, "Invalid CAPTCHA response. Please try again.");

    let (status, body) = app.vote(&creds, "bob", "2.2.2.2", Some("forged")).await;
    assert_eq!(status, 403);
    assert_eq!(body.message, "Invalid CAPTCHA response. Please try again.");

    let (status, body) = app.vote(&creds, "bob", "2.2.2.2", Some(VALID_PROOF)).await;
    assert_eq!(status, 200);
    assert_eq!(body.votes_remaining, Some(1));

    let votes = app.store.votes().unwrap();
    assert_eq!(votes.len(), 2);
    assert!(!votes[0].verified_via_captcha);
    assert!(votes[1].verified_via_captcha);
}

#[tokio::test]
async fn test_ip_change_at_vote_time_is_persisted() {
    let app = app().spawn().await;
    let creds = app.token("visitor-hop", "1.1.1.1").await;

    // Rejected for lack of a proof, but the escalation sticks.
    let (status, body) = app.vote(&creds, "alice", "9.9.9.9", None).await;
    assert_eq!(status, 403);
    assert!(body.requires_captcha);

    let session = app.pipeline.sessions().get(&creds.fingerprint).await.unwrap().unwrap();
    assert!(session.is_suspicious());
    assert_eq!(session.ip_address.as_deref(), Some("9.9.9.9"));
    assert_eq!(app.store.ip_change_logs().unwrap().len(), 1);
}

#[tokio::test]
async fn test_token_rate_limit() {
    let app = app().spawn().await;
    for i in 0..10 {
        let res = app.request_token(&format!("visitor-{i}"), "4.4.4.4").await;
        assert_eq!(res.status(), 200);
    }

    let res = app.request_token("visitor-10", "4.4.4.4").await;
    assert_eq!(res.status(), 429);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Too many token requests. Please try again later.");

    let logs = app.store.rate_limit_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].endpoint, "token");
    assert_eq!(logs[0].ip_address, "4.4.4.4");
    assert_eq!(logs[0].fingerprint, None);

    // Other addresses are unaffected; the window resets after a minute.
    assert_eq!(app.request_token("visitor-x", "4.4.4.5").await.status(), 200);
    app.clock.advance(60);
    assert_eq!(app.request_token("visitor-10", "4.4.4.4").await.status(), 200);
}

#[tokio::test]
async fn test_ip_cap_flags_every_session_at_address() {
    let mut config = test_config();
    config.security.max_votes_per_ip = 5;
    let app = app().config(config).spawn().await;

    for i in 0..5 {
        let creds = app.token(&format!("household-{i}"), "3.3.3.3").await;
        let (status, _) = app.vote(&creds, "carol", "3.3.3.3", None).await;
        assert_eq!(status, 200);
    }

    let sixth = app.token("household-5", "3.3.3.3").await;
    assert_eq!(sixth.body["votes_used_from_ip"], 5);
    let (status, body) = app.vote(&sixth, "carol", "3.3.3.3", None).await;
    assert_eq!(status, 403);
    assert_eq!(
        body.message,
        "Maximum votes (5) reached from your location. You cannot vote from multiple browsers."
    );

    let (_, stats) = app.get_json("/stats").await;
    assert_eq!(stats["total_votes"], 5);
    assert_eq!(stats["total_sessions"], 6);
    assert_eq!(stats["suspicious_sessions"], 6);
    assert_eq!(stats["votes_by_contestant"]["carol"], 5);
}

#[tokio::test]
async fn test_vote_rate_limit_escalates_session() {
    let mut config = test_config();
    config.security.rate_limit_votes_per_minute = 2;
    let app = app().config(config).spawn().await;

    for i in 0..2 {
        let creds = app.token(&format!("office-{i}"), "5.5.5.5").await;
        let (status, _) = app.vote(&creds, "dave", "5.5.5.5", None).await;
        assert_eq!(status, 200);
    }

    let third = app.token("office-2", "5.5.5.5").await;
    let (status, body) = app.vote(&third, "dave", "5.5.5.5", None).await;
    assert_eq!(status, 200);
    assert!(!body.success);
    assert!(body.requires_verification);
    assert_eq!(body.message, "Suspicious activity detected. Additional verification required.");

    let logs = app.store.rate_limit_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].endpoint, "vote");
    assert_eq!(logs[0].fingerprint.as_deref(), Some(third.fingerprint.as_str()));

    app.clock.advance(61);
    let (status, _) = app.vote(&third, "dave", "5.5.5.5", None).await;
    assert_eq!(status, 403);
    let (status, body) = app.vote(&third, "dave", "5.5.5.5", Some(VALID_PROOF)).await;
    assert_eq!(status, 200);
    assert!(body.success);
}

#[tokio::test]
async fn test_device_cap() {
    let app = app().spawn().await;
    let creds = app.token("visitor-cap", "6.6.6.6").await;

    for (contestant, remaining) in [("alice", 2), ("bob", 1), ("carol", 0)] {
        let (status, body) = app.vote(&creds, contestant, "6.6.6.6", None).await;
        assert_eq!(status, 200);
        assert_eq!(body.votes_remaining, Some(remaining));
        // Stay outside the burst window.
        app.clock.advance(61);
    }

    let (status, body) = app.vote(&creds, "dave", "6.6.6.6", None).await;
    assert_eq!(status, 403);
    assert_eq!(body.message, "Maximum votes (3) reached for this device.");
}

#[tokio::test]
async fn test_burst_flags_future_votes() {
    let app = app().spawn().await;
    let creds = app.token("visitor-burst", "7.7.7.7").await;

    for contestant in ["alice", "bob", "carol"] {
        let (status, _) = app.vote(&creds, contestant, "7.7.7.7", None).await;
        assert_eq!(status, 200);
    }

    // The third vote tripped the burst check and is stored as elevated.
    let votes = app.store.votes().unwrap();
    assert_eq!(votes.len(), 3);
    assert!(!votes[0].verified_via_captcha);
    assert!(!votes[1].verified_via_captcha);
    assert!(votes[2].verified_via_captcha);
    assert!(votes.iter().all(|v| !v.verified_via_sms));

    let refreshed = app.token("visitor-burst", "7.7.7.7").await;
    assert_eq!(refreshed.body["is_suspicious"], true);
    assert_eq!(refreshed.body["votes_used"], 3);
}

#[tokio::test]
async fn test_token_expiry_boundary() {
    let app = app().spawn().await;
    let first = app.token("visitor-early", "8.8.8.8").await;
    let second = app.token("visitor-late", "8.8.8.9").await;
    let expires_at = first.body["expires_at"].as_u64().unwrap();
    assert_eq!(expires_at, common::START + 30 * 60);

    app.clock.set(expires_at);
    let (status, _) = app.vote(&first, "alice", "8.8.8.8", None).await;
    assert_eq!(status, 200);

    app.clock.set(expires_at + 1);
    let (status, body) = app.vote(&second, "alice", "8.8.8.9", None).await;
    assert_eq!(status, 401);
    assert_eq!(body.message, "Token expired. Please refresh your token.");
}

#[tokio::test]
async fn test_authentication_failures() {
    let app = app().spawn().await;
    let mut creds = app.token("visitor-auth", "1.2.3.4").await;

    let res = app
        .client
        .post(app.url("/vote"))
        .json(&serde_json::json!({ "contestant": "alice", "fingerprint": creds.fingerprint }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let real_token = std::mem::replace(&mut creds.token, "not-the-token".into());
    let (status, body) = app.vote(&creds, "alice", "1.2.3.4", None).await;
    assert_eq!(status, 401);
    assert_eq!(body.message, "Invalid token. Please refresh your token.");

    creds.token = real_token;
    creds.fingerprint = "unknown".into();
    let (status, body) = app.vote(&creds, "alice", "1.2.3.4", None).await;
    assert_eq!(status, 401);
    assert_eq!(body.message, "Invalid session. Please refresh your token.");
}

#[tokio::test]
async fn test_invalid_contestant() {
    let app = app().spawn().await;
    let creds = app.token("visitor-typo", "1.1.1.2").await;
    let (status, body) = app.vote(&creds, "mallory", "1.1.1.2", None).await;
    assert_eq!(status, 400);
    assert_eq!(body.message, "Invalid contestant name. Allowed contestants: alice, bob, carol, dave");
}

#[tokio::test]
async fn test_empty_visitor_rejected() {
    let app = app().spawn().await;
    let res = app.request_token("  ", "1.1.1.3").await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_counter_outage_fails_open() {
    let app = app().counters(DownCounters).spawn().await;
    for i in 0..12 {
        let res = app.request_token(&format!("visitor-{i}"), "4.4.4.4").await;
        assert_eq!(res.status(), 200);
    }

    let creds = app.token("visitor-open", "4.4.4.4").await;
    let (status, body) = app.vote(&creds, "bob", "4.4.4.4", None).await;
    assert_eq!(status, 200);
    assert!(body.success);
    assert!(app.store.rate_limit_logs().unwrap().is_empty());
}

#[tokio::test]
async fn test_stalled_counter_store_fails_open() {
    let mut config = test_config();
    config.timeouts.counter_store_ms = 50;
    let app = app().config(config).counters(StalledCounters).spawn().await;

    let creds = app.token("visitor-stalled", "4.4.4.6").await;
    let (status, body) = app.vote(&creds, "carol", "4.4.4.6", None).await;
    assert_eq!(status, 200);
    assert!(body.success);
}

#[tokio::test]
async fn test_verifier_outage_fails_closed() {
    let app = app().verifier(UnreachableVerifier).spawn().await;
    app.token("visitor-closed", "1.1.1.1").await;
    let creds = app.token("visitor-closed", "2.2.2.2").await;
    assert_eq!(creds.body["is_suspicious"], true);

    let (status, body) = app.vote(&creds, "alice", "2.2.2.2", Some(VALID_PROOF)).await;
    assert_eq!(status, 403);
    assert!(body.requires_captcha);
    assert!(app.store.votes().unwrap().is_empty());
}

#[tokio::test]
async fn test_info_endpoints() {
    let app = app().spawn().await;

    let (status, body) = app.get_json("/").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get_json("/captcha/site-key").await;
    assert_eq!(status, 200);
    assert_eq!(body["site_key"], "test-site-key");

    let (status, body) = app.get_json("/stats").await;
    assert_eq!(status, 200);
    assert_eq!(body["total_votes"], 0);

    let res = app.client.get(app.url("/")).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_site_key_unconfigured() {
    let mut config = test_config();
    config.verification.site_key = String::new();
    let app = app().config(config).spawn().await;

    let (status, body) = app.get_json("/captcha/site-key").await;
    assert_eq!(status, 500);
    assert!(body["detail"].is_string());
}
