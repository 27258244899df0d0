//! Server configuration.

use dirsrv_core::operational::ANONYMOUS;
use dirsrv_protocol::DEFAULT_MAX_FRAME_SIZE;

/// Configuration for the directory server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Refuse writes to every backend.
    pub read_only: bool,
    /// Referrals returned when no backend holds a DN.
    pub default_referrals: Vec<String>,
    /// Maintain operational attributes unless a backend overrides it.
    pub lastmod: bool,
    /// Largest accepted LDAPMessage frame in bytes.
    pub max_frame_size: usize,
    /// Modifier name stamped for anonymous writers.
    pub anonymous_marker: String,
}

impl ServerConfig {
    /// Creates a configuration with the defaults.
    pub fn new() -> Self {
        Self {
            read_only: false,
            default_referrals: Vec::new(),
            lastmod: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            anonymous_marker: ANONYMOUS.to_string(),
        }
    }

    /// Sets the global read-only flag.
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Adds a default referral.
    pub fn with_default_referral(mut self, uri: impl Into<String>) -> Self {
        self.default_referrals.push(uri.into());
        self
    }

    /// Sets global operational attribute maintenance.
    pub const fn with_lastmod(mut self, lastmod: bool) -> Self {
        self.lastmod = lastmod;
        self
    }

    /// Sets the maximum frame size.
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the anonymous modifier name.
    pub fn with_anonymous_marker(mut self, marker: impl Into<String>) -> Self {
        self.anonymous_marker = marker.into();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
