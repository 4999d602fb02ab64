//! Rate-limit key extraction.
//!
//! A key extractor partitions inbound calls into independent budgets: every
//! call that maps to the same key draws from the same token bucket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::CallContext;

/// Key shared by every call under the global strategy.
pub const GLOBAL_KEY: &str = "global";

/// Key used by the per-peer strategy when the transport has no remote address.
pub const UNKNOWN_PEER_KEY: &str = "unknown-peer";

/// Maps a call to the key of the budget it draws from.
///
/// Implementations must be pure: the same context always yields the same key.
pub trait KeyExtractor: Send + Sync {
    fn extract(&self, ctx: &CallContext) -> String;
}

impl<F> KeyExtractor for F
where
    F: Fn(&CallContext) -> String + Send + Sync,
{
    fn extract(&self, ctx: &CallContext) -> String {
        self(ctx)
    }
}

/// Built-in key extraction strategies.
///
/// Parsing is case-insensitive, both through [`FromStr`] and when the value is
/// read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum KeyStrategy {
    /// All calls share one bucket.
    #[default]
    Global,
    /// One bucket per fully-qualified method.
    PerMethod,
    /// One bucket per caller IP address.
    ///
    /// Registry entries are never evicted, so memory grows with the number of
    /// distinct callers seen over the process lifetime.
    PerPeer,
}

impl KeyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStrategy::Global => "global",
            KeyStrategy::PerMethod => "per-method",
            KeyStrategy::PerPeer => "per-peer",
        }
    }
}

impl KeyExtractor for KeyStrategy {
    fn extract(&self, ctx: &CallContext) -> String {
        match self {
            KeyStrategy::Global => GLOBAL_KEY.to_string(),
            KeyStrategy::PerMethod => ctx.method.clone(),
            KeyStrategy::PerPeer => ctx
                .peer
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| UNKNOWN_PEER_KEY.to_string()),
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(KeyStrategy::Global),
            "per-method" => Ok(KeyStrategy::PerMethod),
            "per-peer" => Ok(KeyStrategy::PerPeer),
            other => Err(format!(
                "unknown rate limit strategy '{}' (expected global, per-method or per-peer)",
                other
            )),
        }
    }
}

impl TryFrom<String> for KeyStrategy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn test_global_strategy_ignores_method() {
        let a = CallContext::new("/svc/A");
        let b = CallContext::new("/svc/B");

        assert_eq!(KeyStrategy::Global.extract(&a), "global");
        assert_eq!(KeyStrategy::Global.extract(&b), "global");
    }

    #[test]
    fn test_per_method_strategy_uses_full_method() {
        let ctx = CallContext::new("/user.v1.UserService/GetUser");
        assert_eq!(
            KeyStrategy::PerMethod.extract(&ctx),
            "/user.v1.UserService/GetUser"
        );
    }

    #[test]
    fn test_per_peer_strategy_uses_ip_only() {
        let peer: SocketAddr = "192.168.1.20:41000".parse().unwrap();
        let ctx = CallContext::new("/m").with_peer(peer);
        assert_eq!(KeyStrategy::PerPeer.extract(&ctx), "192.168.1.20");

        let anonymous = CallContext::new("/m");
        assert_eq!(KeyStrategy::PerPeer.extract(&anonymous), UNKNOWN_PEER_KEY);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("global".parse::<KeyStrategy>(), Ok(KeyStrategy::Global));
        assert_eq!("Per-Method".parse::<KeyStrategy>(), Ok(KeyStrategy::PerMethod));
        assert_eq!("per-peer".parse::<KeyStrategy>(), Ok(KeyStrategy::PerPeer));
        assert!("per-user".parse::<KeyStrategy>().is_err());
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |ctx: &CallContext| format!("tenant:{}", ctx.method.len());
        assert_eq!(extractor.extract(&CallContext::new("/abc")), "tenant:4");
    }
}
