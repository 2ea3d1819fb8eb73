//! OAuth2 client-credentials token exchange.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    Credential, ENV_CLIENT_CREDENTIALS_AUDIENCE, ENV_CLIENT_CREDENTIALS_AUTH_STYLE,
    ENV_CLIENT_CREDENTIALS_CLIENT_ID, ENV_CLIENT_CREDENTIALS_SCOPE,
    ENV_CLIENT_CREDENTIALS_TOKEN_URL, SECRET_CLIENT_CREDENTIALS_SECRET,
};
use crate::error::ActionError;
use crate::params::ExecutionContext;

/// Where the client id/secret travel in the token request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStyle {
    /// Credentials as form fields in the request body.
    #[default]
    Body,
    /// Credentials in an HTTP basic header.
    Header,
}

impl AuthStyle {
    fn parse(value: &str) -> Result<Self, ActionError> {
        match value.to_ascii_lowercase().as_str() {
            "body" => Ok(Self::Body),
            "header" => Ok(Self::Header),
            other => Err(ActionError::Auth(format!(
                "unsupported {ENV_CLIENT_CREDENTIALS_AUTH_STYLE} value: {other}"
            ))),
        }
    }
}

/// Configuration for the client-credentials flow, read from the execution
/// context (secret for the client secret, env for everything else).
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub scope: Option<String>,
    pub audience: Option<String>,
    pub auth_style: AuthStyle,
}

impl ClientCredentialsConfig {
    /// Assemble the flow configuration, failing fatally when the secret is
    /// present but the env half of the configuration is incomplete.
    pub fn from_context(ctx: &ExecutionContext) -> Result<Self, ActionError> {
        let client_secret = ctx
            .secret(SECRET_CLIENT_CREDENTIALS_SECRET)
            .ok_or_else(|| {
                ActionError::Auth(format!("{SECRET_CLIENT_CREDENTIALS_SECRET} is missing"))
            })?
            .to_string();
        let client_id = require_env(ctx, ENV_CLIENT_CREDENTIALS_CLIENT_ID)?;
        let token_url = require_env(ctx, ENV_CLIENT_CREDENTIALS_TOKEN_URL)?;
        let auth_style = ctx
            .env(ENV_CLIENT_CREDENTIALS_AUTH_STYLE)
            .map(AuthStyle::parse)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            client_id,
            client_secret,
            token_url,
            scope: ctx.env(ENV_CLIENT_CREDENTIALS_SCOPE).map(String::from),
            audience: ctx.env(ENV_CLIENT_CREDENTIALS_AUDIENCE).map(String::from),
            auth_style,
        })
    }
}

// The client secret never appears in debug output.
impl std::fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"redacted")
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("audience", &self.audience)
            .field("auth_style", &self.auth_style)
            .finish()
    }
}

fn require_env(ctx: &ExecutionContext, key: &str) -> Result<String, ActionError> {
    ctx.env(key)
        .map(String::from)
        .ok_or_else(|| ActionError::Auth(format!("{key} is not configured")))
}

/// Token endpoint response; only the access token matters here.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
}

/// Exchange client credentials for a bearer token.
pub(super) async fn exchange(
    client: &Client,
    config: &ClientCredentialsConfig,
) -> Result<Credential, ActionError> {
    debug!(token_url = %config.token_url, "exchanging client credentials");

    let mut form: Vec<(&str, &str)> = vec![("grant_type", "client_credentials")];
    if let Some(scope) = &config.scope {
        form.push(("scope", scope));
    }
    if let Some(audience) = &config.audience {
        form.push(("audience", audience));
    }

    let request = client.post(&config.token_url);
    let request = match config.auth_style {
        AuthStyle::Body => {
            form.push(("client_id", &config.client_id));
            form.push(("client_secret", &config.client_secret));
            request.form(&form)
        }
        AuthStyle::Header => request
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&form),
    };

    let response = request.send().await?;
    let token = handle_token_response(response).await?;
    Ok(Credential::bearer(&token.access_token))
}

/// Interpret a token endpoint response; any non-2xx is fatal.
pub(super) async fn handle_token_response(
    response: reqwest::Response,
) -> Result<TokenResponse, ActionError> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(ActionError::Auth(format!(
            "token exchange failed with status {}: {text}",
            status.as_u16()
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| ActionError::Auth(format!("malformed token endpoint response: {e}")))
}
