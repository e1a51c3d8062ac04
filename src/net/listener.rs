//! TCP listener binding and endpoint bookkeeping.
//!
//! # Responsibilities
//! - Bind the RPC and HTTP ports
//! - Record what was bound, and when, as a [`ServerEndpoint`]
//!
//! # Design Decisions
//! - Binding happens before any serving task is spawned, so a bind failure
//!   surfaces synchronously to the startup sequence
//! - Port 0 is accepted and resolved to the OS-assigned port

use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

use tokio::net::TcpListener;

/// Wire protocol spoken on an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Rpc,
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Rpc => write!(f, "rpc"),
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// A bound listener, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub protocol: Protocol,
    pub addr: SocketAddr,
    pub started_at: SystemTime,
}

impl ServerEndpoint {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Address a local client should dial to reach this endpoint.
    ///
    /// Wildcard binds are reached over loopback.
    pub fn dial_addr(&self) -> SocketAddr {
        let mut addr = self.addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(match addr {
                SocketAddr::V4(_) => std::net::Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
            });
        }
        addr
    }
}

/// Bind `addr` and describe the result.
pub async fn bind(protocol: Protocol, addr: SocketAddr) -> Result<(TcpListener, ServerEndpoint), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        protocol = %protocol,
        address = %local_addr,
        "Listener bound"
    );

    Ok((
        listener,
        ServerEndpoint {
            protocol,
            addr: local_addr,
            started_at: SystemTime::now(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_port_resolved() {
        let (_listener, endpoint) = bind(Protocol::Rpc, "127.0.0.1:0".parse().unwrap()).await.unwrap();
        assert_ne!(endpoint.port(), 0);
        assert_eq!(endpoint.protocol, Protocol::Rpc);
    }

    #[tokio::test]
    async fn second_bind_on_same_port_fails() {
        let (_listener, endpoint) = bind(Protocol::Http, "127.0.0.1:0".parse().unwrap()).await.unwrap();
        let err = bind(Protocol::Http, endpoint.addr).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }

    #[test]
    fn wildcard_dials_loopback() {
        let endpoint = ServerEndpoint {
            protocol: Protocol::Rpc,
            addr: "0.0.0.0:8082".parse().unwrap(),
            started_at: SystemTime::now(),
        };
        assert_eq!(endpoint.dial_addr(), "127.0.0.1:8082".parse::<SocketAddr>().unwrap());
    }
}
