//! OAuth 2.0 device authorization grant (RFC 8628).
//!
//! The terminal stand-in for a browser popup: the provider hands out a short
//! user code, the user approves it in a browser, and we poll the token
//! endpoint until the approval lands. Endpoints default to Google's.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use quadrant_common::Identity;

use super::{Credentials, IdentityProvider};
use crate::errors::AuthError;

pub const GOOGLE_DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const DEFAULT_SCOPE: &str = "openid profile";

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Extra wait added each time the server answers `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Endpoints and client registration for the device flow.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFlowConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub device_code_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scope: String,
    pub provider_name: String,
}

impl DeviceFlowConfig {
    pub fn google(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            device_code_url: GOOGLE_DEVICE_CODE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            provider_name: "google".to_string(),
        }
    }
}

/// Response from the device code endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    /// Google spells this `verification_url`.
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Response from the token polling endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Subset of the OpenID Connect userinfo claims we use.
#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum PollOutcome {
    Authorized(String),
    Pending,
    SlowDown,
}

type Prompt = Arc<dyn Fn(&DeviceCodeResponse) + Send + Sync>;

pub struct DeviceFlowProvider {
    config: DeviceFlowConfig,
    client: reqwest::Client,
    prompt: Prompt,
}

impl DeviceFlowProvider {
    pub fn new(config: DeviceFlowConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            prompt: Arc::new(print_device_prompt),
        }
    }

    /// Replace how the user code is shown to the user.
    pub fn with_prompt(mut self, prompt: impl Fn(&DeviceCodeResponse) + Send + Sync + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    /// Start the flow: returns the device code and the user code to enter.
    pub async fn request_device_code(&self) -> Result<DeviceCodeResponse, AuthError> {
        if self.config.client_id.trim().is_empty() {
            return Err(AuthError::NotConfigured(
                "no OAuth client id; set auth.client_id in quadrant.toml or QUADRANT_CLIENT_ID"
                    .to_string(),
            ));
        }
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        let resp = self
            .client
            .post(&self.config.device_code_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::NOT_FOUND
        {
            return Err(AuthError::NotConfigured(format!(
                "{} rejected the OAuth client id; make sure it is a device-flow (TV and limited input) client",
                self.config.provider_name
            )));
        }

        Ok(resp.error_for_status()?.json::<DeviceCodeResponse>().await?)
    }

    /// Poll once for the access token.
    pub async fn poll_for_token(&self, device_code: &str) -> Result<PollOutcome, AuthError> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("device_code", device_code),
            ("grant_type", DEVICE_GRANT_TYPE),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        // Pending answers come back as 4xx with a JSON body, so the status is
        // not checked here.
        let resp = self
            .client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?
            .json::<TokenResponse>()
            .await?;

        if let Some(token) = resp.access_token {
            return Ok(PollOutcome::Authorized(token));
        }

        match resp.error.as_deref() {
            Some("authorization_pending") => Ok(PollOutcome::Pending),
            Some("slow_down") => Ok(PollOutcome::SlowDown),
            Some("access_denied") => Err(AuthError::Denied(
                resp.error_description
                    .unwrap_or_else(|| "the request was declined".to_string()),
            )),
            Some("expired_token") => Err(AuthError::Expired),
            Some(err) => Err(AuthError::Provider(match resp.error_description {
                Some(desc) => format!("{}: {}", err, desc),
                None => err.to_string(),
            })),
            None => Err(AuthError::Provider(
                "token endpoint returned neither a token nor an error".to_string(),
            )),
        }
    }

    pub async fn fetch_identity(&self, access_token: &str) -> Result<Identity, AuthError> {
        let info = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<UserInfo>()
            .await?;
        Ok(Identity {
            uid: info.sub,
            display_name: info.name.or(info.email),
            provider: self.config.provider_name.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for DeviceFlowProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    async fn sign_in(&self) -> Result<Credentials, AuthError> {
        let code = self.request_device_code().await?;
        (self.prompt)(&code);

        let deadline = Instant::now() + Duration::from_secs(code.expires_in);
        let mut interval = Duration::from_secs(code.interval);
        loop {
            tokio::time::sleep(interval).await;
            match self.poll_for_token(&code.device_code).await? {
                PollOutcome::Authorized(token) => {
                    let identity = self.fetch_identity(&token).await?;
                    tracing::info!(provider = %self.config.provider_name, uid = %identity.uid, "device flow approved");
                    return Ok(Credentials {
                        identity,
                        access_token: Some(token),
                    });
                }
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += SLOW_DOWN_STEP,
            }
            if Instant::now() >= deadline {
                return Err(AuthError::Expired);
            }
        }
    }
}

fn print_device_prompt(code: &DeviceCodeResponse) {
    use console::style;
    println!();
    println!(
        "  Öppna {} och ange koden {}",
        style(&code.verification_uri).cyan().underlined(),
        style(&code.user_code).bold().yellow()
    );
    println!("  {}", style("Väntar på godkännande...").dim());
    if let Err(e) = open::that(&code.verification_uri) {
        tracing::debug!(error = %e, "could not open browser");
    }
}
