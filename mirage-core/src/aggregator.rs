//! # Session Aggregator — Drives the synthesizer and maintains rolling state
//!
//! Two independent scheduling loops while capturing:
//! - a self-rescheduling synthesis loop with a freshly drawn random delay
//!   per firing (inter-arrival times vary continuously, no fixed cadence)
//! - a fixed-period flush loop that drains the per-second counters into a
//!   bounded time series
//!
//! All shared state is owned here; the presentation layer only ever reads
//! cloned snapshots.

use crate::config::CaptureConfig;
use crate::synthesizer::PacketSynthesizer;
use crate::types::{CaptureState, Packet, SessionTotals, TrafficSample};
use parking_lot::RwLock;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Stateful aggregator for one capture session.
///
/// The per-second counters are drained with an atomic swap, so a flush
/// observes exactly the events recorded since the previous flush — no
/// double-counting, no loss — even though the two loops interleave.
pub struct SessionAggregator {
    synthesizer: Arc<PacketSynthesizer>,
    /// Bounded event log, newest-first. Eviction from the back.
    packet_log: RwLock<VecDeque<Packet>>,
    /// Bounded time series, oldest-first. Eviction from the front.
    series: RwLock<VecDeque<TrafficSample>>,
    /// Counters for the current one-second window, reset on every flush.
    second_packets: AtomicU64,
    second_threats: AtomicU64,
    /// All-time totals, reset only by process restart.
    total_packets: AtomicU64,
    total_threats: AtomicU64,
    running: AtomicBool,
    /// Bumped on every `start()`. A loop spawned under an older generation
    /// observes the mismatch and exits instead of resurrecting after a
    /// quick stop/start cycle.
    generation: AtomicU64,
    log_capacity: usize,
    series_capacity: usize,
    min_delay_ms: u64,
    max_delay_ms: u64,
    flush_interval_ms: u64,
}

impl SessionAggregator {
    pub fn new(synthesizer: Arc<PacketSynthesizer>, config: &CaptureConfig) -> Self {
        Self {
            synthesizer,
            packet_log: RwLock::new(VecDeque::with_capacity(config.log_capacity)),
            series: RwLock::new(VecDeque::with_capacity(config.series_capacity)),
            second_packets: AtomicU64::new(0),
            second_threats: AtomicU64::new(0),
            total_packets: AtomicU64::new(0),
            total_threats: AtomicU64::new(0),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            log_capacity: config.log_capacity,
            series_capacity: config.series_capacity,
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms.max(config.min_delay_ms + 1),
            flush_interval_ms: config.flush_interval_ms,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Idle → Capturing. No-op if already capturing.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "Capture started");

        // Synthesis loop: sleep a fresh random delay, emit one packet,
        // reschedule. Disarm is checked after every wakeup and again
        // implicitly before the next sleep is ever reached.
        let agg = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let delay_ms = {
                    let mut rng = rand::thread_rng();
                    rng.gen_range(agg.min_delay_ms..agg.max_delay_ms)
                };
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if !agg.armed(generation) {
                    break;
                }
                let packet = agg.synthesizer.synthesize(false);
                agg.record(packet);
            }
            debug!(generation, "Synthesis loop exited");
        });

        // Flush loop: fixed period, first tick one full period after start.
        let agg = Arc::clone(self);
        tokio::spawn(async move {
            let period = Duration::from_millis(agg.flush_interval_ms);
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                if !agg.armed(generation) {
                    break;
                }
                agg.flush_second();
            }
            debug!(generation, "Flush loop exited");
        });
    }

    /// Capturing → Idle. No-op if already idle. Pending timers observe the
    /// disarm on their next wakeup and exit without recording or
    /// rescheduling; accumulated log, series, and totals stay readable.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let totals = self.totals();
        info!(
            packets = totals.packets,
            threats = totals.threats,
            "Capture stopped"
        );
    }

    pub fn state(&self) -> CaptureState {
        if self.running.load(Ordering::SeqCst) {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.state() == CaptureState::Capturing
    }

    fn armed(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    // ── Recording ────────────────────────────────────────────────────────

    /// Synthesize one packet immediately, bypassing the timers, and record
    /// it. Used by the inject control surface.
    pub fn inject(&self, force_threat: bool) -> Packet {
        let packet = self.synthesizer.synthesize(force_threat);
        self.record(packet.clone());
        packet
    }

    fn record(&self, packet: Packet) {
        self.second_packets.fetch_add(1, Ordering::Relaxed);
        self.total_packets.fetch_add(1, Ordering::Relaxed);
        if packet.is_threat() {
            self.second_threats.fetch_add(1, Ordering::Relaxed);
            self.total_threats.fetch_add(1, Ordering::Relaxed);
            debug!(
                id = %packet.id,
                level = packet.threat_level.as_str(),
                desc = %packet.description,
                "Threat classified"
            );
        }
        let mut log = self.packet_log.write();
        if log.len() >= self.log_capacity {
            log.pop_back();
        }
        log.push_front(packet);
    }

    /// Drain the per-second counters into one time bucket.
    fn flush_second(&self) {
        let packets = self.second_packets.swap(0, Ordering::Relaxed);
        let threats = self.second_threats.swap(0, Ordering::Relaxed);
        let sample = TrafficSample {
            time: chrono::Local::now().format("%M:%S").to_string(),
            packets,
            threats,
        };
        let mut series = self.series.write();
        if series.len() >= self.series_capacity {
            series.pop_front();
        }
        series.push_back(sample);
    }

    // ── Snapshots ────────────────────────────────────────────────────────

    /// Bounded event log, newest-first.
    pub fn recent_packets(&self) -> Vec<Packet> {
        self.packet_log.read().iter().cloned().collect()
    }

    /// Look up a single logged packet by id.
    pub fn find_packet(&self, id: &str) -> Option<Packet> {
        self.packet_log.read().iter().find(|p| p.id == id).cloned()
    }

    /// Bounded time series, oldest-first.
    pub fn traffic_series(&self) -> Vec<TrafficSample> {
        self.series.read().iter().cloned().collect()
    }

    pub fn totals(&self) -> SessionTotals {
        SessionTotals {
            packets: self.total_packets.load(Ordering::Relaxed),
            threats: self.total_threats.load(Ordering::Relaxed),
        }
    }

    pub fn log_len(&self) -> usize {
        self.packet_log.read().len()
    }
}
