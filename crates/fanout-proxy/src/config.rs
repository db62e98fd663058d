use serde::Deserialize;

use crate::error::{ProxyError, Result};

/// Proxy configuration. Fixed once the proxy is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Number of downstream workers; each gets one sentinel on shutdown.
    pub workers: usize,
    /// Address the inbound endpoint binds.
    pub inbound: String,
    /// Address the outbound endpoint binds.
    pub outbound: String,
}

impl ProxyConfig {
    pub const DEFAULT_INBOUND: &'static str = "/tmp/fanout-in.sock";
    pub const DEFAULT_OUTBOUND: &'static str = "/tmp/fanout-out.sock";

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ProxyError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.inbound.is_empty() || self.outbound.is_empty() {
            return Err(ProxyError::InvalidConfig(
                "inbound and outbound addresses must be set".to_string(),
            ));
        }
        if self.inbound == self.outbound {
            return Err(ProxyError::InvalidConfig(format!(
                "inbound and outbound share the address {}",
                self.inbound
            )));
        }
        Ok(())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            inbound: Self::DEFAULT_INBOUND.to_string(),
            outbound: Self::DEFAULT_OUTBOUND.to_string(),
        }
    }
}
