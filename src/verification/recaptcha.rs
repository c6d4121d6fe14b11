//! Google reCAPTCHA v2 client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::VerificationConfig;
use crate::verification::{VerificationError, VerificationService};

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: Option<bool>,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Verifies challenge responses against the `siteverify` endpoint.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret_key: String,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(config: &VerificationConfig, request_timeout: Duration) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            verify_url: config.verify_url.clone(),
        })
    }
}

#[async_trait]
impl VerificationService for RecaptchaVerifier {
    async fn verify(&self, proof_token: &str, remote_ip: &str) -> Result<bool, VerificationError> {
        if self.secret_key.is_empty() {
            return Err(VerificationError::NotConfigured("verification.secret_key"));
        }

        let mut form = vec![
            ("secret", self.secret_key.as_str()),
            ("response", proof_token),
        ];
        if !remote_ip.is_empty() {
            form.push(("remoteip", remote_ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;

        if !body.error_codes.is_empty() {
            tracing::debug!(codes = ?body.error_codes, "reCAPTCHA reported errors");
        }
        Ok(body.success == Some(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_provider_response() {
        let ok: SiteVerifyResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(ok.success, Some(true));

        let bad: SiteVerifyResponse =
            serde_json::from_str(r#"{"success": false, "error-codes": ["invalid-input-response"]}"#).unwrap();
        assert_eq!(bad.success, Some(false));
        assert_eq!(bad.error_codes, vec!["invalid-input-response"]);
    }

    #[tokio::test]
    async fn test_missing_secret_is_an_error() {
        let verifier = RecaptchaVerifier::new(&VerificationConfig::default(), Duration::from_secs(1)).unwrap();
        let result = verifier.verify("proof", "1.1.1.1").await;
        assert!(matches!(result, Err(VerificationError::NotConfigured(_))));
    }
}
