//! # Console API — HTTP surface for the Mirage dashboard
//!
//! Serves the JSON endpoints the console view polls, the capture controls,
//! and an embedded HTML page at `/`. Every read endpoint returns a cloned
//! snapshot; only the aggregator mutates its own state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use mirage_ai::{parse_report, ThreatAnalyzer};
use mirage_core::SessionAggregator;
use std::sync::Arc;
use tracing::info;

/// Shared state for the console.
#[derive(Clone)]
pub struct ConsoleState {
    pub aggregator: Arc<SessionAggregator>,
    pub analyzer: Arc<ThreatAnalyzer>,
    pub start_time: i64,
}

/// Start the console server. Runs until the process exits.
pub async fn start_console(state: ConsoleState, bind_addr: &str) -> Result<(), String> {
    let app = Router::new()
        .route("/", get(console_html))
        .route("/api/status", get(api_status))
        .route("/api/packets", get(api_packets))
        .route("/api/series", get(api_series))
        .route("/api/capture/start", post(api_capture_start))
        .route("/api/capture/stop", post(api_capture_stop))
        .route("/api/inject", post(api_inject))
        .route("/api/analyze/:id", post(api_analyze))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("Failed to bind console to {}: {}", bind_addr, e))?;

    info!(addr = %bind_addr, "Console started");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Console server error: {}", e))?;

    Ok(())
}

// ── API Handlers ─────────────────────────────────────────────────────────

async fn api_status(State(state): State<ConsoleState>) -> impl IntoResponse {
    let totals = state.aggregator.totals();
    Json(serde_json::json!({
        "state": state.aggregator.state(),
        "total_packets": totals.packets,
        "total_threats": totals.threats,
        "log_len": state.aggregator.log_len(),
        "ai_available": state.analyzer.is_available(),
        "uptime_secs": chrono::Utc::now().timestamp() - state.start_time,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_packets(State(state): State<ConsoleState>) -> impl IntoResponse {
    Json(state.aggregator.recent_packets())
}

async fn api_series(State(state): State<ConsoleState>) -> impl IntoResponse {
    Json(state.aggregator.traffic_series())
}

async fn api_capture_start(State(state): State<ConsoleState>) -> impl IntoResponse {
    state.aggregator.start();
    Json(serde_json::json!({ "state": state.aggregator.state() }))
}

async fn api_capture_stop(State(state): State<ConsoleState>) -> impl IntoResponse {
    state.aggregator.stop();
    Json(serde_json::json!({ "state": state.aggregator.state() }))
}

/// Force one threat packet through the normal recording path.
async fn api_inject(State(state): State<ConsoleState>) -> impl IntoResponse {
    let packet = state.aggregator.inject(true);
    info!(id = %packet.id, level = packet.threat_level.as_str(), "Threat injected");
    Json(packet)
}

/// Run the AI round trip for one logged packet. The analyzer itself never
/// fails; the only error here is an id that has already been evicted.
async fn api_analyze(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(packet) = state.aggregator.find_packet(&id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("packet '{}' not in log", id) })),
        )
            .into_response();
    };
    let raw = state.analyzer.analyze(&packet).await;
    let report = parse_report(&raw);
    Json(serde_json::json!({ "packet": packet, "raw": raw, "report": report })).into_response()
}

// ── Embedded Console HTML ────────────────────────────────────────────────

async fn console_html() -> impl IntoResponse {
    Html(CONSOLE_HTML)
}

const CONSOLE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Mirage — NIDS Console</title>
<style>
  :root { --bg: #0a0e17; --card: #111827; --border: #1f2937; --text: #e5e7eb; --accent: #10b981; --danger: #ef4444; --warn: #f59e0b; --muted: #6b7280; }
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { background: var(--bg); color: var(--text); font-family: 'SF Mono', 'Fira Code', monospace; }
  .header { padding: 16px 24px; border-bottom: 1px solid var(--border); display: flex; justify-content: space-between; align-items: center; }
  .header h1 { font-size: 1.2em; color: var(--accent); }
  .header button { padding: 8px 16px; border-radius: 4px; border: 1px solid var(--border); background: var(--card); color: var(--text); cursor: pointer; font-family: inherit; margin-left: 8px; }
  .header button.active { border-color: var(--danger); color: var(--danger); }
  .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 12px; padding: 16px 24px; }
  .card { background: var(--card); border: 1px solid var(--border); border-radius: 8px; padding: 14px; }
  .card h3 { font-size: 0.7em; color: var(--muted); text-transform: uppercase; letter-spacing: 1px; margin-bottom: 6px; }
  .card .value { font-size: 1.6em; font-weight: bold; }
  .card .value.red { color: var(--danger); }
  .card .value.green { color: var(--accent); }
  .chart { display: flex; align-items: flex-end; gap: 3px; height: 120px; padding: 16px 24px; }
  .chart .bar { flex: 1; background: var(--accent); opacity: 0.7; min-height: 2px; position: relative; }
  .chart .bar .threat { position: absolute; bottom: 0; left: 0; right: 0; background: var(--danger); }
  table { width: calc(100% - 48px); margin: 0 24px 24px; border-collapse: collapse; font-size: 0.8em; }
  th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid var(--border); }
  th { color: var(--muted); text-transform: uppercase; font-size: 0.85em; }
  tr.threat td { color: var(--danger); }
  td button { background: none; border: 1px solid var(--warn); color: var(--warn); border-radius: 3px; cursor: pointer; font-family: inherit; font-size: 0.9em; padding: 2px 8px; }
  #report { margin: 0 24px 24px; padding: 14px; background: var(--card); border: 1px solid var(--warn); border-radius: 8px; display: none; white-space: pre-wrap; font-size: 0.85em; }
</style>
</head>
<body>
<div class="header">
  <h1>MIRAGE <span style="color:var(--muted);font-size:0.8em">NIDS CONSOLE</span></h1>
  <div>
    <button id="toggle" onclick="toggleCapture()">START CAPTURE</button>
    <button onclick="post('/api/inject')">INJECT THREAT</button>
  </div>
</div>
<div class="grid">
  <div class="card"><h3>Total Packets</h3><div class="value" id="total">0</div></div>
  <div class="card"><h3>Threats Detected</h3><div class="value red" id="threats">0</div></div>
  <div class="card"><h3>Capture State</h3><div class="value green" id="state">Idle</div></div>
  <div class="card"><h3>AI Analysis</h3><div class="value" id="ai">-</div></div>
</div>
<div class="chart" id="chart"></div>
<div id="report"></div>
<table>
  <thead><tr><th>Time</th><th>Source</th><th>Destination</th><th>Proto</th><th>Size</th><th>Level</th><th>Description</th><th></th></tr></thead>
  <tbody id="log"></tbody>
</table>
<script>
let capturing = false;
async function post(url) { const r = await fetch(url, { method: 'POST' }); return r.json(); }
async function toggleCapture() {
  const data = await post(capturing ? '/api/capture/stop' : '/api/capture/start');
  capturing = data.state === 'Capturing';
}
async function analyze(id) {
  const el = document.getElementById('report');
  el.style.display = 'block';
  el.textContent = 'Analyzing ' + id + ' ...';
  const data = await post('/api/analyze/' + id);
  const rep = data.report || { analysis: 'Analysis failed.', mitigation: [] };
  el.textContent = 'ANALYSIS\n' + rep.analysis + '\n\nMITIGATION\n' +
    rep.mitigation.map((m, i) => (i + 1) + '. ' + m).join('\n');
}
async function refresh() {
  const status = await (await fetch('/api/status')).json();
  capturing = status.state === 'Capturing';
  document.getElementById('total').textContent = status.total_packets;
  document.getElementById('threats').textContent = status.total_threats;
  document.getElementById('state').textContent = status.state;
  document.getElementById('ai').textContent = status.ai_available ? 'AVAILABLE' : 'NO API KEY';
  document.getElementById('toggle').textContent = capturing ? 'STOP CAPTURE' : 'START CAPTURE';
  document.getElementById('toggle').className = capturing ? 'active' : '';

  const series = await (await fetch('/api/series')).json();
  const peak = Math.max(1, ...series.map(s => s.packets));
  document.getElementById('chart').innerHTML = series.map(s =>
    '<div class="bar" title="' + s.time + ': ' + s.packets + ' pkts, ' + s.threats + ' threats" style="height:' +
    Math.round(100 * s.packets / peak) + '%"><div class="threat" style="height:' +
    (s.packets ? Math.round(100 * s.threats / s.packets) : 0) + '%"></div></div>').join('');

  const packets = await (await fetch('/api/packets')).json();
  document.getElementById('log').innerHTML = packets.map(p =>
    '<tr class="' + (p.threat_level !== 'None' ? 'threat' : '') + '"><td>' +
    new Date(p.timestamp_ms).toLocaleTimeString() + '</td><td>' + p.src_ip + ':' + p.src_port +
    '</td><td>' + p.dst_ip + ':' + p.dst_port + '</td><td>' + p.protocol.toUpperCase() +
    '</td><td>' + p.payload_bytes + 'B</td><td>' + p.threat_level + '</td><td>' + p.description +
    '</td><td>' + (p.threat_level !== 'None'
      ? '<button onclick="analyze(\'' + p.id + '\')">Analyze</button>' : '') + '</td></tr>').join('');
}
setInterval(refresh, 1000);
refresh();
</script>
</body>
</html>
"#;
