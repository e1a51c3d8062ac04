//! Wire types and service plumbing for the `gateway.Gateway` RPC service.
//!
//! Generated by `tonic-build` from `proto/gateway.proto`. Messages also
//! derive serde, so they double as the JSON shapes of the HTTP bridge and
//! both protocols share one definition per method.

use tonic::transport::Channel;

tonic::include_proto!("gateway");

pub use gateway_server::{Gateway, GatewayServer};

/// Gateway client over a tonic transport channel.
pub type GatewayClient = gateway_client::GatewayClient<Channel>;
