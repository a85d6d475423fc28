//! # Mirage Core — Synthetic traffic generation and session aggregation
//!
//! The simulation heart of the Mirage console:
//! - [`synthesizer::PacketSynthesizer`] fabricates one synthetic network
//!   event per call, classifying a fixed fraction as threats
//! - [`aggregator::SessionAggregator`] drives the synthesizer on a
//!   randomized schedule and maintains the bounded rolling-window state the
//!   presentation layer reads
//!
//! No real capture and no real detection: every "packet" is fabricated and
//! every classification comes from fixed probability buckets.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod synthesizer;
pub mod types;

pub use aggregator::SessionAggregator;
pub use config::{AiConfig, CaptureConfig, GeneralConfig, MirageConfig};
pub use error::{MirageError, MirageResult};
pub use synthesizer::PacketSynthesizer;
pub use types::{CaptureState, Packet, Protocol, SessionTotals, ThreatLevel, TrafficSample};
