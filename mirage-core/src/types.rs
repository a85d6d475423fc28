use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Transport/application protocol tag carried by a synthetic packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Http,
    Https,
    Ssh,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Icmp => "ICMP",
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Ssh => "SSH",
        }
    }

    /// TCP is the only protocol in the set that carries a flag string.
    pub fn is_connection_oriented(&self) -> bool {
        matches!(self, Self::Tcp)
    }
}

/// Threat classification, ordered none < low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn is_threat(&self) -> bool {
        *self != Self::None
    }
}

/// One synthesized network transmission record. Immutable once constructed.
///
/// Invariant: `src_ip != dst_ip`. `tcp_flags` is populated only when
/// `protocol` is connection-oriented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Unique id derived from the synthesizer's monotonic sequence.
    pub id: String,
    /// Unix timestamp (millis) at creation.
    pub timestamp_ms: i64,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: Protocol,
    /// Payload size in bytes, always in [64, 1500].
    pub payload_bytes: u32,
    pub threat_level: ThreatLevel,
    pub tcp_flags: Option<String>,
    pub description: String,
}

impl Packet {
    pub fn is_threat(&self) -> bool {
        self.threat_level.is_threat()
    }
}

/// One flushed time bucket: counts for a single wall-clock second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSample {
    /// Wall-clock label (minute:second) for chart axes.
    pub time: String,
    pub packets: u64,
    pub threats: u64,
}

/// All-time session totals. Monotonically non-decreasing while the
/// process lives; reset only by restarting the whole session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionTotals {
    pub packets: u64,
    pub threats: u64,
}

/// Aggregator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    Capturing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_level_ordering() {
        assert!(ThreatLevel::None < ThreatLevel::Low);
        assert!(ThreatLevel::Low < ThreatLevel::Medium);
        assert!(ThreatLevel::Medium < ThreatLevel::High);
        assert!(ThreatLevel::High < ThreatLevel::Critical);
    }

    #[test]
    fn test_is_threat() {
        assert!(!ThreatLevel::None.is_threat());
        assert!(ThreatLevel::Low.is_threat());
        assert!(ThreatLevel::Critical.is_threat());
    }

    #[test]
    fn test_only_tcp_is_connection_oriented() {
        assert!(Protocol::Tcp.is_connection_oriented());
        for proto in [Protocol::Udp, Protocol::Icmp, Protocol::Http, Protocol::Https, Protocol::Ssh] {
            assert!(!proto.is_connection_oriented());
        }
    }
}
