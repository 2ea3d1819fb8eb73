//! Credential acquisition.
//!
//! The action authenticates with whichever secret material the scheduler
//! supplied. The supported variants form a closed set, selected once by
//! inspecting which secret keys are populated and dispatched through a single
//! [`CredentialSource::acquire`] call that yields one `Authorization` value
//! good for one delete request. Nothing is cached: every invocation
//! re-derives its credential.

mod oauth2;
mod service_account;

pub use oauth2::{AuthStyle, ClientCredentialsConfig};
pub use service_account::ServiceAccountKey;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use tracing::debug;

use crate::error::ActionError;
use crate::params::ExecutionContext;

/// Secret key holding a JSON service-account key.
pub const SECRET_SERVICE_ACCOUNT_KEY: &str = "service_account_key";
/// Secret key holding a ready-to-use bearer token.
pub const SECRET_BEARER_TOKEN: &str = "BEARER_AUTH_TOKEN";
/// Secret key holding an access token from an authorization-code flow.
pub const SECRET_AUTH_CODE_ACCESS_TOKEN: &str = "OAUTH2_AUTHORIZATION_CODE_ACCESS_TOKEN";
/// Secret keys holding a basic-auth pair.
pub const SECRET_BASIC_USERNAME: &str = "BASIC_USERNAME";
pub const SECRET_BASIC_PASSWORD: &str = "BASIC_PASSWORD";
/// Secret key holding the client secret for the client-credentials flow.
pub const SECRET_CLIENT_CREDENTIALS_SECRET: &str = "OAUTH2_CLIENT_CREDENTIALS_CLIENT_SECRET";

/// Env keys configuring the client-credentials flow.
pub const ENV_CLIENT_CREDENTIALS_CLIENT_ID: &str = "OAUTH2_CLIENT_CREDENTIALS_CLIENT_ID";
pub const ENV_CLIENT_CREDENTIALS_TOKEN_URL: &str = "OAUTH2_CLIENT_CREDENTIALS_TOKEN_URL";
pub const ENV_CLIENT_CREDENTIALS_SCOPE: &str = "OAUTH2_CLIENT_CREDENTIALS_SCOPE";
pub const ENV_CLIENT_CREDENTIALS_AUDIENCE: &str = "OAUTH2_CLIENT_CREDENTIALS_AUDIENCE";
pub const ENV_CLIENT_CREDENTIALS_AUTH_STYLE: &str = "OAUTH2_CLIENT_CREDENTIALS_AUTH_STYLE";

/// Default token endpoint for the service-account JWT-bearer exchange.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Scope requested for service-account tokens.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// One opaque `Authorization` header value, valid for one invocation.
#[derive(Clone)]
pub struct Credential {
    header: String,
}

impl Credential {
    /// Wrap a bearer token, normalizing to exactly one `Bearer ` prefix.
    pub fn bearer(token: &str) -> Self {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        Self {
            header: format!("Bearer {token}"),
        }
    }

    /// Build a standard basic-auth header from a username/password pair.
    pub fn basic(username: &str, password: &str) -> Self {
        let encoded = BASE64.encode(format!("{username}:{password}"));
        Self {
            header: format!("Basic {encoded}"),
        }
    }

    /// The value to send in the `Authorization` header.
    pub fn header_value(&self) -> &str {
        &self.header
    }
}

// Credential values are secret material; keep them out of debug output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(redacted)")
    }
}

/// The authentication variant selected for this invocation.
#[derive(Clone)]
pub enum CredentialSource {
    /// Service-account key, exchanged via a signed JWT assertion.
    ServiceAccount(ServiceAccountKey),
    /// Pre-shared bearer token.
    Bearer(String),
    /// Access token obtained out-of-band through an authorization-code flow.
    AuthCodeToken(String),
    /// Username/password pair for basic auth.
    Basic { username: String, password: String },
    /// OAuth2 client-credentials configuration.
    ClientCredentials(ClientCredentialsConfig),
}

// Every variant wraps secret material; show only the selected variant.
impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
            Self::Bearer(_) => f.write_str("Bearer(redacted)"),
            Self::AuthCodeToken(_) => f.write_str("AuthCodeToken(redacted)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"redacted")
                .finish(),
            Self::ClientCredentials(config) => {
                f.debug_tuple("ClientCredentials").field(config).finish()
            }
        }
    }
}

impl CredentialSource {
    /// Select the authentication variant from the populated secrets.
    ///
    /// Precedence: service-account key, bearer token, auth-code access token,
    /// basic pair, client credentials. No recognized combination is a fatal
    /// [`ActionError::Auth`]; this runs before any network call.
    pub fn from_context(ctx: &ExecutionContext) -> Result<Self, ActionError> {
        if let Some(raw) = ctx.secret(SECRET_SERVICE_ACCOUNT_KEY) {
            return Ok(Self::ServiceAccount(ServiceAccountKey::parse(raw)?));
        }
        if let Some(token) = ctx.secret(SECRET_BEARER_TOKEN) {
            return Ok(Self::Bearer(token.to_string()));
        }
        if let Some(token) = ctx.secret(SECRET_AUTH_CODE_ACCESS_TOKEN) {
            return Ok(Self::AuthCodeToken(token.to_string()));
        }
        if let Some(username) = ctx.secret(SECRET_BASIC_USERNAME) {
            let password = ctx.secret(SECRET_BASIC_PASSWORD).ok_or_else(|| {
                ActionError::Auth(format!(
                    "{SECRET_BASIC_USERNAME} is set but {SECRET_BASIC_PASSWORD} is missing"
                ))
            })?;
            return Ok(Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        if ctx.secret(SECRET_CLIENT_CREDENTIALS_SECRET).is_some() {
            return Ok(Self::ClientCredentials(ClientCredentialsConfig::from_context(ctx)?));
        }

        Err(ActionError::Auth(
            "no recognized secret material: expected one of service_account_key, \
             BEARER_AUTH_TOKEN, BASIC_USERNAME/BASIC_PASSWORD, \
             OAUTH2_CLIENT_CREDENTIALS_CLIENT_SECRET, or \
             OAUTH2_AUTHORIZATION_CODE_ACCESS_TOKEN"
                .to_string(),
        ))
    }

    /// Turn the selected variant into an `Authorization` value.
    ///
    /// The token-exchange variants perform one POST to their token endpoint;
    /// a non-2xx there is always fatal. The static variants never touch the
    /// network.
    pub async fn acquire(&self, client: &Client) -> Result<Credential, ActionError> {
        match self {
            Self::ServiceAccount(key) => service_account::exchange(client, key).await,
            Self::Bearer(token) | Self::AuthCodeToken(token) => Ok(Credential::bearer(token)),
            Self::Basic { username, password } => {
                debug!("using basic-auth credential");
                Ok(Credential::basic(username, password))
            }
            Self::ClientCredentials(config) => oauth2::exchange(client, config).await,
        }
    }

    /// Project id carried by the key material, when the variant has one.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            _ => None,
        }
    }
}
