//! Authentication against Keystone (v2.0 tokens API).
//!
//! With the `keystone` strategy the client posts admin credentials to
//! `{auth_url}/tokens`, keeps the returned token and picks the `network`
//! service endpoint out of the service catalog. An explicit `endpoint_url`
//! always wins over the catalog. The `noauth` strategy skips Keystone and
//! requires `endpoint_url`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ClientError;

/// Service catalog type of the network-management API.
pub const NETWORK_SERVICE_TYPE: &str = "network";

/// How the client obtains credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Keystone token authentication.
    #[default]
    Keystone,
    /// No authentication; talk to `endpoint_url` directly.
    Noauth,
}

/// Which catalog URL to use for the network service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum EndpointType {
    /// `publicURL`
    #[default]
    #[serde(rename = "publicURL")]
    Public,
    /// `adminURL`
    #[serde(rename = "adminURL")]
    Admin,
    /// `internalURL`
    #[serde(rename = "internalURL")]
    Internal,
}

/// Everything needed to reach the network-management API.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// Authentication strategy.
    pub strategy: AuthStrategy,
    /// Keystone endpoint, e.g. `http://keystone:5000/v2.0`.
    pub auth_url: Option<String>,
    /// Admin user name.
    pub username: Option<String>,
    /// Admin password.
    pub password: Option<String>,
    /// Admin tenant name.
    pub tenant_name: Option<String>,
    /// Catalog region filter.
    pub region: Option<String>,
    /// Catalog URL kind.
    pub endpoint_type: EndpointType,
    /// Explicit API endpoint, bypassing the catalog.
    pub endpoint_url: Option<String>,
}

/// A resolved API endpoint plus the token to present to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Base URL of the network API (without the version prefix).
    pub endpoint: String,
    /// Keystone token, absent for `noauth`.
    pub token: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
struct AuthBody<'a> {
    #[serde(rename = "tenantName", skip_serializing_if = "Option::is_none")]
    tenant_name: Option<&'a str>,
    #[serde(rename = "passwordCredentials")]
    password_credentials: PasswordCredentials<'a>,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL", default)]
    public_url: Option<String>,
    #[serde(rename = "adminURL", default)]
    admin_url: Option<String>,
    #[serde(rename = "internalURL", default)]
    internal_url: Option<String>,
}

impl CatalogEndpoint {
    fn url(&self, endpoint_type: EndpointType) -> Option<&str> {
        match endpoint_type {
            EndpointType::Public => self.public_url.as_deref(),
            EndpointType::Admin => self.admin_url.as_deref(),
            EndpointType::Internal => self.internal_url.as_deref(),
        }
    }
}

/// Resolve a [`Session`] for `settings`.
pub fn authenticate(agent: &ureq::Agent, settings: &AuthSettings) -> Result<Session, ClientError> {
    match settings.strategy {
        AuthStrategy::Noauth => {
            let endpoint = settings.endpoint_url.clone().ok_or_else(|| {
                ClientError::Auth("endpoint_url is required with auth_strategy = noauth".into())
            })?;
            Ok(Session {
                endpoint,
                token: None,
            })
        }
        AuthStrategy::Keystone => keystone_session(agent, settings),
    }
}

fn keystone_session(agent: &ureq::Agent, settings: &AuthSettings) -> Result<Session, ClientError> {
    let auth_url = required(&settings.auth_url, "auth_url")?;
    let username = required(&settings.username, "admin_user")?;
    let password = required(&settings.password, "admin_password")?;

    let url = format!("{}/tokens", auth_url.trim_end_matches('/'));
    debug!("Requesting Keystone token from {}", url);

    let body = TokenRequest {
        auth: AuthBody {
            tenant_name: settings.tenant_name.as_deref(),
            password_credentials: PasswordCredentials { username, password },
        },
    };

    let mut response = agent
        .post(&url)
        .header("Accept", "application/json")
        .send_json(&body)
        .map_err(|e| match e {
            ureq::Error::StatusCode(status) => {
                ClientError::Auth(format!("Keystone returned HTTP {}", status))
            }
            other => ClientError::Transport {
                url: url.clone(),
                message: other.to_string(),
            },
        })?;

    let token: TokenResponse = response
        .body_mut()
        .read_json()
        .map_err(|e| ClientError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;

    let endpoint = match &settings.endpoint_url {
        Some(explicit) => explicit.clone(),
        None => select_endpoint(
            &token.access.service_catalog,
            settings.region.as_deref(),
            settings.endpoint_type,
        )?,
    };

    info!("Authenticated as {} against {}", username, auth_url);
    Ok(Session {
        endpoint,
        token: Some(token.access.token.id),
    })
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ClientError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ClientError::Auth(format!("{} is required for Keystone authentication", name)))
}

/// Pick the network endpoint from a service catalog.
fn select_endpoint(
    catalog: &[CatalogEntry],
    region: Option<&str>,
    endpoint_type: EndpointType,
) -> Result<String, ClientError> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == NETWORK_SERVICE_TYPE)
        .flat_map(|entry| entry.endpoints.iter())
        .filter(|ep| region.is_none_or(|r| ep.region.as_deref() == Some(r)))
        .find_map(|ep| ep.url(endpoint_type))
        .map(str::to_string)
        .ok_or_else(|| {
            ClientError::Auth(format!(
                "no {:?} '{}' endpoint in service catalog{}",
                endpoint_type,
                NETWORK_SERVICE_TYPE,
                region.map(|r| format!(" for region {}", r)).unwrap_or_default()
            ))
        })
}
