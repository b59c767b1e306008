use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP front-end
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default)]
    pub tcp: TcpConfig,
    /// Optional Unix domain socket path, in addition to (or instead of) TCP.
    #[serde(default)]
    pub unix_socket: Option<String>,
    /// How long a synchronous `/v1/chat/completions` request waits for the
    /// queued event to be processed before returning 504. The event itself
    /// is not removed from the queue on timeout.
    #[serde(default = "d_request_timeout_s")]
    pub request_timeout_s: u64,
    #[serde(default)]
    pub require_auth: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name advertised by `/v1/models` and echoed in responses.
    #[serde(default = "d_model_name")]
    pub model_name: String,
    /// Agent type used to route requests arriving over HTTP.
    #[serde(default = "d_agent_type")]
    pub default_agent_type: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tcp: TcpConfig::default(),
            unix_socket: None,
            request_timeout_s: d_request_timeout_s(),
            require_auth: false,
            api_key: None,
            model_name: d_model_name(),
            default_agent_type: d_agent_type(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    8731
}
fn d_request_timeout_s() -> u64 {
    120
}
fn d_model_name() -> String {
    "orchestrator".into()
}
fn d_agent_type() -> String {
    "default".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_localhost_without_auth() {
        let cfg = NetworkConfig::default();
        assert_eq!(cfg.tcp.host, "127.0.0.1");
        assert!(!cfg.require_auth);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let cfg: NetworkConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.tcp.port, 8731);
        assert_eq!(cfg.request_timeout_s, 120);
    }
}
