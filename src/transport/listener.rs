use crate::error::{MeshError, Result};
use crate::transport::tls::{generate_self_signed_cert, make_client_config, make_server_config};
use std::net::SocketAddr;

/// A bound QUIC endpoint that both accepts and dials mesh links.
///
/// Binding is separate from mesh formation so a launcher can bind every
/// rank first (learning ephemeral ports) and only then connect them.
pub struct QuicListener {
    endpoint: quinn::Endpoint,
    local_addr: SocketAddr,
}

impl QuicListener {
    /// Bind a QUIC endpoint on the given address with a self-signed certificate.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let (cert, key) = generate_self_signed_cert()?;
        let server_config = make_server_config(cert, key)?;

        let mut endpoint = quinn::Endpoint::server(server_config, addr)
            .map_err(|e| MeshError::transport_with_source(format!("bind {addr}"), e))?;
        endpoint.set_default_client_config(make_client_config()?);

        let local_addr = endpoint
            .local_addr()
            .map_err(|e| MeshError::transport_with_source("local_addr", e))?;

        Ok(Self {
            endpoint,
            local_addr,
        })
    }

    /// Accept the next incoming QUIC connection.
    pub async fn accept(&self) -> Result<quinn::Connection> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| MeshError::transport("endpoint closed"))?;

        incoming
            .await
            .map_err(|e| MeshError::transport_with_source("accept", e))
    }

    /// Dial a peer's listener.
    pub async fn connect(&self, addr: SocketAddr) -> Result<quinn::Connection> {
        self.endpoint
            .connect(addr, "localhost")
            .map_err(|e| MeshError::transport_with_source(format!("connect {addr}"), e))?
            .await
            .map_err(|e| MeshError::transport_with_source(format!("handshake {addr}"), e))
    }

    /// The local address this endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn endpoint(&self) -> &quinn::Endpoint {
        &self.endpoint
    }
}
