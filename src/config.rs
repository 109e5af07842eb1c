//! Runtime-configurable tuning parameters for rankmesh.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `RANKMESH_`) or by constructing a custom `MeshConfig`.

use std::time::Duration;

use crate::types::Protocol;

/// Tuning parameters for the matching engine and transports.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Payloads of at least this many bytes use the rendezvous protocol.
    ///
    /// `0` forces rendezvous for every message, `usize::MAX` forces eager.
    pub eager_threshold: usize,

    /// Largest frame a transport will accept from a peer.
    pub max_frame_bytes: usize,

    /// Deadline for forming the mesh. Never applied to communication.
    pub connect_timeout: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            eager_threshold: 8 * 1024,          // 8 KiB
            max_frame_bytes: 1024 * 1024 * 1024, // 1 GiB
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl MeshConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `RANKMESH_EAGER_THRESHOLD_BYTES`
    /// - `RANKMESH_MAX_FRAME_BYTES`
    /// - `RANKMESH_CONNECT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("RANKMESH_EAGER_THRESHOLD_BYTES") {
            if let Ok(n) = v.parse::<usize>() {
                cfg.eager_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("RANKMESH_MAX_FRAME_BYTES") {
            if let Ok(n) = v.parse::<usize>() {
                cfg.max_frame_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("RANKMESH_CONNECT_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.connect_timeout = Duration::from_secs(s);
            }
        }

        cfg
    }

    pub fn with_eager_threshold(mut self, bytes: usize) -> Self {
        self.eager_threshold = bytes;
        self
    }

    pub fn with_max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Protocol used for a payload of `len` bytes.
    pub fn protocol_for(&self, len: usize) -> Protocol {
        if len >= self.eager_threshold {
            Protocol::Rendezvous
        } else {
            Protocol::Eager
        }
    }
}
