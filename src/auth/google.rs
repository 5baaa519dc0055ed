//! Google OAuth 2.0 authorization-code flow.
//!
//! The `state` parameter is a random nonce followed by its HMAC-SHA256 under
//! the JWT secret. The callback accepts it only when the signature holds and
//! it matches the `oauth_state` cookie set at the start of the flow.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const SCOPES: &str = "openid email profile";

#[derive(Debug, Deserialize)]
pub struct GoogleToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    pub name: Option<String>,
}

impl GoogleProfile {
    /// Display name, falling back to the local part of the email.
    pub fn display_name(&self, email: &str) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.is_empty()
    }

    pub fn authorize_url(&self, state: &str) -> AppResult<String> {
        let url = reqwest::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid GOOGLE_AUTH_URL: {}", e)))?;

        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> AppResult<GoogleToken> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send token request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        response
            .json::<GoogleToken>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse token response: {}", e)))
    }

    pub async fn fetch_profile(&self, access_token: &str) -> AppResult<GoogleProfile> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to send userinfo request: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Userinfo request failed ({})",
                response.status()
            )));
        }

        response
            .json::<GoogleProfile>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse userinfo response: {}", e)))
    }
}

fn state_mac(secret: &str) -> AppResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid HMAC key: {}", e)))
}

/// Fresh `nonce.signature` pair, both lowercase hex.
pub fn issue_state(secret: &str) -> AppResult<String> {
    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let mut mac = state_mac(secret)?;
    mac.update(nonce.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{}.{}", nonce, signature))
}

pub fn verify_state(state: &str, secret: &str) -> bool {
    let Some((nonce, signature)) = state.split_once('.') else {
        return false;
    };
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = state_mac(secret) else {
        return false;
    };
    mac.update(nonce.as_bytes());
    mac.verify_slice(&signature).is_ok()
}
