//! # Packet Synthesizer — Fabricates one synthetic network event per call
//!
//! Pure generation: no external inputs beyond an optional force-threat flag.
//! Randomness comes from the thread-local uniform source; the only owned
//! state is a strictly-increasing sequence counter used to build unique ids.

use crate::types::{Packet, Protocol, ThreatLevel};
use rand::Rng;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU64, Ordering};

// ── Fixed Pools ──────────────────────────────────────────────────────────────

/// Address pool: internal hosts, DMZ, external benign, external suspicious.
const ADDRESS_POOL: [IpAddr; 10] = [
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 15)),
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 23)),
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8)),
    IpAddr::V4(Ipv4Addr::new(45, 33, 22, 11)),
    IpAddr::V4(Ipv4Addr::new(104, 21, 55, 2)),
    IpAddr::V4(Ipv4Addr::new(185, 199, 108, 153)),
    IpAddr::V4(Ipv4Addr::new(198, 51, 100, 2)),
    IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
];

const PROTOCOLS: [Protocol; 6] = [
    Protocol::Tcp,
    Protocol::Udp,
    Protocol::Icmp,
    Protocol::Http,
    Protocol::Https,
    Protocol::Ssh,
];

/// Well-known destination ports favored by the 80/20 split.
const WELL_KNOWN_PORTS: [u16; 6] = [80, 443, 22, 53, 3306, 8080];

const TCP_FLAG_SETS: [&str; 4] = ["SYN", "ACK", "PSH,ACK", "FIN"];

/// Baseline probability that an unforced packet is classified as a threat.
const THREAT_RATE: f64 = 0.05;

/// Probability that the destination port is an ephemeral one instead of a
/// well-known service port.
const EPHEMERAL_DST_PORT_RATE: f64 = 0.2;

// ── Threat Archetypes ────────────────────────────────────────────────────────

struct ThreatArchetype {
    level: ThreatLevel,
    description: &'static str,
    /// Some archetypes pin the destination port (payload delivery over HTTP).
    forced_dst_port: Option<u16>,
}

/// Partition [0, 1) into the three archetypes at 0.3 and 0.6. Every draw
/// maps to exactly one archetype, no gap, no overlap.
fn classify_threat(draw: f64) -> ThreatArchetype {
    if draw < 0.3 {
        ThreatArchetype {
            level: ThreatLevel::Medium,
            description: "Potential Port Scan detected",
            forced_dst_port: None,
        }
    } else if draw < 0.6 {
        ThreatArchetype {
            level: ThreatLevel::High,
            description: "High frequency packet volume (SYN Flood)",
            forced_dst_port: None,
        }
    } else {
        ThreatArchetype {
            level: ThreatLevel::Critical,
            description: "Suspicious payload signature detected",
            forced_dst_port: Some(80),
        }
    }
}

// ── Synthesizer ──────────────────────────────────────────────────────────────

/// Fabricates synthetic packets. One instance per session; holds nothing
/// but the sequence counter, so it is freely shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct PacketSynthesizer {
    seq: AtomicU64,
}

impl PacketSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packets synthesized so far.
    pub fn sequence(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Fabricate one fully-populated packet. Never fails.
    ///
    /// `force_threat` guarantees a threat classification; otherwise threats
    /// occur at the fixed baseline rate.
    pub fn synthesize(&self, force_threat: bool) -> Packet {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();

        let src_ip = ADDRESS_POOL[rng.gen_range(0..ADDRESS_POOL.len())];
        // Rejection sampling: expected <= 2 draws against a 10-address pool.
        let dst_ip = loop {
            let candidate = ADDRESS_POOL[rng.gen_range(0..ADDRESS_POOL.len())];
            if candidate != src_ip {
                break candidate;
            }
        };

        let protocol = PROTOCOLS[rng.gen_range(0..PROTOCOLS.len())];

        let src_port: u16 = rng.gen_range(1024..=65535);
        let mut dst_port: u16 = if rng.gen_bool(EPHEMERAL_DST_PORT_RATE) {
            rng.gen_range(1024..=9000)
        } else {
            WELL_KNOWN_PORTS[rng.gen_range(0..WELL_KNOWN_PORTS.len())]
        };

        let is_threat = force_threat || rng.gen::<f64>() < THREAT_RATE;

        let (threat_level, description) = if is_threat {
            let archetype = classify_threat(rng.gen::<f64>());
            if let Some(port) = archetype.forced_dst_port {
                dst_port = port;
            }
            (archetype.level, archetype.description)
        } else {
            (ThreatLevel::None, "Normal traffic")
        };

        let tcp_flags = if protocol.is_connection_oriented() {
            Some(TCP_FLAG_SETS[rng.gen_range(0..TCP_FLAG_SETS.len())].to_string())
        } else {
            None
        };

        Packet {
            id: format!("pkt-{}-{}", seq, timestamp_ms),
            timestamp_ms,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            protocol,
            payload_bytes: rng.gen_range(64..=1500),
            threat_level,
            tcp_flags,
            description: description.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_src_and_dst_always_differ() {
        let synth = PacketSynthesizer::new();
        for _ in 0..1000 {
            let p = synth.synthesize(false);
            assert_ne!(p.src_ip, p.dst_ip);
        }
    }

    #[test]
    fn test_payload_size_in_range() {
        let synth = PacketSynthesizer::new();
        for _ in 0..1000 {
            let p = synth.synthesize(false);
            assert!((64..=1500).contains(&p.payload_bytes));
        }
    }

    #[test]
    fn test_forced_threat_is_never_none() {
        let synth = PacketSynthesizer::new();
        for _ in 0..200 {
            let p = synth.synthesize(true);
            assert!(p.threat_level.is_threat());
            assert_ne!(p.description, "Normal traffic");
        }
    }

    #[test]
    fn test_unforced_threat_rate_converges() {
        let synth = PacketSynthesizer::new();
        let n = 20_000;
        let threats = (0..n)
            .filter(|_| synth.synthesize(false).is_threat())
            .count();
        let rate = threats as f64 / n as f64;
        // 5% baseline; ~6 sigma of binomial noise at n=20k is under 1%.
        assert!((rate - 0.05).abs() < 0.01, "observed threat rate {rate}");
    }

    #[test]
    fn test_archetype_partition_has_no_gap_or_overlap() {
        // Boundary draws map to exactly one archetype each.
        assert_eq!(classify_threat(0.0).level, ThreatLevel::Medium);
        assert_eq!(classify_threat(0.299_999).level, ThreatLevel::Medium);
        assert_eq!(classify_threat(0.3).level, ThreatLevel::High);
        assert_eq!(classify_threat(0.599_999).level, ThreatLevel::High);
        assert_eq!(classify_threat(0.6).level, ThreatLevel::Critical);
        assert_eq!(classify_threat(0.999_999).level, ThreatLevel::Critical);
    }

    #[test]
    fn test_critical_archetype_forces_port_80() {
        assert_eq!(classify_threat(0.7).forced_dst_port, Some(80));
        let synth = PacketSynthesizer::new();
        for _ in 0..500 {
            let p = synth.synthesize(true);
            if p.threat_level == ThreatLevel::Critical {
                assert_eq!(p.dst_port, 80);
            }
        }
    }

    #[test]
    fn test_flags_present_iff_tcp() {
        let synth = PacketSynthesizer::new();
        for _ in 0..500 {
            let p = synth.synthesize(false);
            assert_eq!(p.tcp_flags.is_some(), p.protocol == Protocol::Tcp);
            if let Some(ref flags) = p.tcp_flags {
                assert!(TCP_FLAG_SETS.contains(&flags.as_str()));
            }
        }
    }

    #[test]
    fn test_ids_are_unique_and_sequence_monotonic() {
        let synth = PacketSynthesizer::new();
        let mut seen = HashSet::new();
        for i in 1..=200u64 {
            let p = synth.synthesize(false);
            assert!(seen.insert(p.id.clone()), "duplicate id {}", p.id);
            assert_eq!(synth.sequence(), i);
        }
    }

    #[test]
    fn test_well_known_ports_dominate_destinations() {
        let synth = PacketSynthesizer::new();
        let n = 5_000;
        let well_known = (0..n)
            .map(|_| synth.synthesize(false))
            // Critical threats pin dst_port to 80, which is itself in the set.
            .filter(|p| WELL_KNOWN_PORTS.contains(&p.dst_port))
            .count();
        let rate = well_known as f64 / n as f64;
        // 80% branch, expected rate ~0.8.
        assert!(rate > 0.72 && rate < 0.88, "well-known rate {rate}");
    }
}
