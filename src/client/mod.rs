//! Network-management API client.
//!
//! The probe agent never owns network, subnet or port records; it reads and
//! writes them through a [`NetworkClient`]. [`HttpNetworkClient`] talks to a
//! Quantum v2.0 compatible REST endpoint, authenticating through Keystone
//! when configured to.
//!
//! # Endpoints used
//!
//! | Operation      | Request                          |
//! |----------------|----------------------------------|
//! | `show_network` | `GET /v2.0/networks/{id}`        |
//! | `show_subnet`  | `GET /v2.0/subnets/{id}`         |
//! | `show_port`    | `GET /v2.0/ports/{id}`           |
//! | `list_ports`   | `GET /v2.0/ports?<filter>`       |
//! | `create_port`  | `POST /v2.0/ports`               |
//! | `delete_port`  | `DELETE /v2.0/ports/{id}`        |

pub mod auth;
mod error;
mod http;
mod models;

pub use auth::{AuthSettings, AuthStrategy, EndpointType, Session};
pub use error::ClientError;
pub use http::HttpNetworkClient;
pub use models::{FixedIp, FixedIpRequest, Network, Port, PortFilter, PortRequest, Subnet};

/// Request/response operations against the network-management API.
///
/// Every call is a blocking round trip; implementations do not cache.
pub trait NetworkClient {
    /// Fetch a network.
    fn show_network(&self, network_id: &str) -> Result<Network, ClientError>;

    /// Fetch a subnet.
    fn show_subnet(&self, subnet_id: &str) -> Result<Subnet, ClientError>;

    /// Fetch a port.
    fn show_port(&self, port_id: &str) -> Result<Port, ClientError>;

    /// List ports matching `filter`.
    fn list_ports(&self, filter: &PortFilter) -> Result<Vec<Port>, ClientError>;

    /// Create a port and return the stored record (with allocated IPs and MAC).
    fn create_port(&self, request: &PortRequest) -> Result<Port, ClientError>;

    /// Delete a port.
    fn delete_port(&self, port_id: &str) -> Result<(), ClientError>;
}
