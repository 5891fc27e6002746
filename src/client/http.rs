//! Blocking HTTP implementation of [`NetworkClient`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::auth::{self, AuthSettings, Session};
use super::error::ClientError;
use super::models::{Network, Port, PortFilter, PortRequest, Subnet};
use super::NetworkClient;

/// API version prefix for all resource paths.
pub const API_PREFIX: &str = "v2.0";

#[derive(Deserialize)]
struct NetworkBody {
    network: Network,
}

#[derive(Deserialize)]
struct SubnetBody {
    subnet: Subnet,
}

#[derive(Deserialize)]
struct PortBody {
    port: Port,
}

#[derive(Deserialize)]
struct PortsBody {
    #[serde(default)]
    ports: Vec<Port>,
}

#[derive(Serialize)]
struct PortRequestBody<'a> {
    port: &'a PortRequest,
}

/// Client for a Quantum v2.0 REST endpoint.
pub struct HttpNetworkClient {
    agent: ureq::Agent,
    session: Session,
}

impl HttpNetworkClient {
    /// Create a client for an already resolved session.
    pub fn new(session: Session) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            session,
        }
    }

    /// Authenticate according to `settings` and create a client.
    pub fn connect(settings: &AuthSettings) -> Result<Self, ClientError> {
        let agent = ureq::Agent::new_with_defaults();
        let session = auth::authenticate(&agent, settings)?;
        debug!("Using network API endpoint {}", session.endpoint);
        Ok(Self { agent, session })
    }

    /// The endpoint this client sends requests to.
    pub fn endpoint(&self) -> &str {
        &self.session.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.session.endpoint.trim_end_matches('/'),
            API_PREFIX,
            path
        )
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("User-Agent", &format!("qprobe/{}", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/json");
        match &self.session.token {
            Some(token) => request.header("X-Auth-Token", token),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        id: &str,
        path: &str,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let mut response = self
            .authorize(self.agent.get(&url))
            .call()
            .map_err(|e| map_error(e, &url, resource, id))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| decode_error(e, &url))
    }
}

impl NetworkClient for HttpNetworkClient {
    fn show_network(&self, network_id: &str) -> Result<Network, ClientError> {
        let body: NetworkBody =
            self.get("network", network_id, &format!("networks/{}", network_id))?;
        Ok(body.network)
    }

    fn show_subnet(&self, subnet_id: &str) -> Result<Subnet, ClientError> {
        let body: SubnetBody = self.get("subnet", subnet_id, &format!("subnets/{}", subnet_id))?;
        Ok(body.subnet)
    }

    fn show_port(&self, port_id: &str) -> Result<Port, ClientError> {
        let body: PortBody = self.get("port", port_id, &format!("ports/{}", port_id))?;
        Ok(body.port)
    }

    fn list_ports(&self, filter: &PortFilter) -> Result<Vec<Port>, ClientError> {
        let url = self.url("ports");
        debug!("GET {} {:?}", url, filter);
        let mut request = self.authorize(self.agent.get(&url));
        for (key, value) in filter.query_pairs() {
            request = request.query(key, value);
        }
        let mut response = request
            .call()
            .map_err(|e| map_error(e, &url, "ports", ""))?;
        let body: PortsBody = response
            .body_mut()
            .read_json()
            .map_err(|e| decode_error(e, &url))?;
        Ok(body.ports)
    }

    fn create_port(&self, request: &PortRequest) -> Result<Port, ClientError> {
        let url = self.url("ports");
        debug!("POST {} network_id={}", url, request.network_id);
        let mut response = self
            .authorize(self.agent.post(&url))
            .send_json(PortRequestBody { port: request })
            .map_err(|e| map_error(e, &url, "network", &request.network_id))?;
        let body: PortBody = response
            .body_mut()
            .read_json()
            .map_err(|e| decode_error(e, &url))?;
        Ok(body.port)
    }

    fn delete_port(&self, port_id: &str) -> Result<(), ClientError> {
        let url = self.url(&format!("ports/{}", port_id));
        debug!("DELETE {}", url);
        self.authorize(self.agent.delete(&url))
            .call()
            .map_err(|e| map_error(e, &url, "port", port_id))?;
        Ok(())
    }
}

fn map_error(err: ureq::Error, url: &str, resource: &'static str, id: &str) -> ClientError {
    match err {
        ureq::Error::StatusCode(404) => ClientError::NotFound {
            resource,
            id: id.to_string(),
        },
        ureq::Error::StatusCode(status) => ClientError::Status {
            url: url.to_string(),
            status,
        },
        other => ClientError::Transport {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

fn decode_error(err: ureq::Error, url: &str) -> ClientError {
    ClientError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    }
}
