// ── Runtime client configuration ──
//
// Describes how to reach the forum. Built by the CLI (usually from
// islet-config) and handed in; core never reads configuration files.

use std::time::Duration;

use islet_api::{TlsMode, TransportConfig};
use url::Url;

/// Prefix for errors while loading the board list.
pub const COMMUNITY_ERROR_CONTEXT: &str = "Unable to load the community list...\n";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted mirrors).
    DangerAcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site root (e.g., `https://www.nmbxd.com`).
    pub base_url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Overrides the default `islet/<version>` user agent.
    pub user_agent: Option<String>,
    /// Prefix for remote errors on the board and timeline lists.
    pub error_context: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            user_agent: None,
            error_context: Some(COMMUNITY_ERROR_CONTEXT.into()),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            tls: tls_to_transport(&self.tls),
            timeout: self.timeout,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
