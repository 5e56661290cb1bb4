// =============================================================================
// Dashboard page served at `/`
// =============================================================================
//
// Ticker input, red error region, Track / Plot buttons, the live price label
// (fed by `/api/ws`) and the chart image (polled from `/api/chart.svg`).
// =============================================================================

pub const DASHBOARD_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Real-Time Stock Tracker</title>
<style>
  body { font-family: sans-serif; max-width: 960px; margin: 2rem auto; text-align: center; }
  #error { color: red; min-height: 1.2em; }
  #label { font: 16px Arial, sans-serif; min-height: 1.4em; margin: 1rem 0; }
  #chart-box { display: none; margin-top: 1rem; }
  #chart-status { color: #555; }
  button { margin: 0.25rem; }
</style>
</head>
<body>
<h1>Real-Time Stock Tracker</h1>

<label for="ticker">Enter Stock Ticker:</label><br>
<input id="ticker" autocomplete="off">
<div id="error"></div>
<button id="track">Track Stock</button>
<button id="plot">Plot Prices</button>

<div id="label"></div>

<div id="chart-box">
  <div id="chart-status"></div>
  <img id="chart" alt="price chart" width="900" height="540"><br>
  <button id="close">Close chart</button>
</div>

<script>
const $ = (id) => document.getElementById(id);
let chartTimer = null;

async function post(path) {
  const res = await fetch(path, {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ symbol: $("ticker").value }),
  });
  const body = await res.json();
  $("error").textContent = res.ok ? "" : (body.error || "");
  return res.ok;
}

async function refreshChart() {
  const res = await fetch("/api/chart");
  const chart = await res.json();
  if (chart.has_image) {
    $("chart").src = "/api/chart.svg?t=" + Date.now();
  }
  let status = chart.status;
  if (chart.outcome && chart.outcome.state === "cancelled-by-user") status = "Plot closed by user.";
  if (chart.error) status = chart.error;
  $("chart-status").textContent = status;
  if (chart.status !== "running") {
    clearInterval(chartTimer);
    chartTimer = null;
  }
}

$("track").onclick = () => post("/api/track");

$("plot").onclick = async () => {
  if (!(await post("/api/plot"))) return;
  $("chart-box").style.display = "block";
  if (!chartTimer) chartTimer = setInterval(refreshChart, 1000);
  refreshChart();
};

$("close").onclick = async () => {
  await fetch("/api/plot", { method: "DELETE" });
  $("chart-box").style.display = "none";
};

function connectLabel() {
  const proto = location.protocol === "https:" ? "wss:" : "ws:";
  const ws = new WebSocket(proto + "//" + location.host + "/api/ws");
  ws.onmessage = (ev) => { $("label").textContent = ev.data; };
  ws.onclose = () => setTimeout(connectLabel, 2000);
}
connectLabel();
</script>
</body>
</html>
"#;
