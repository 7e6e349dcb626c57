use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};

use common::{EngineError, Interval, Period, StepEvent};
use quant::{Cancelled, ScriptCtx, StepSink};

use crate::AppState;

/// Pause after every non-terminal step so UIs can animate the discovery.
const STEP_DELAY: Duration = Duration::from_millis(450);

pub fn stream_router() -> Router<AppState> {
    Router::new().route("/quant/stream/run", get(stream_run))
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    ticker: String,
    strategy: String,
    #[serde(default = "default_period")]
    period: Period,
    #[serde(default = "default_interval")]
    interval: Interval,
    #[serde(default)]
    params: String,
}

fn default_period() -> Period {
    Period::Mo6
}

fn default_interval() -> Interval {
    Interval::D1
}

/// One outbound SSE frame. Errors terminate the stream; `Complete` is the
/// success terminal.
enum Frame {
    Step(StepEvent),
    Complete(StepEvent),
    Error(EngineError),
}

impl Frame {
    fn into_event(self) -> Event {
        let (name, payload) = match self {
            Frame::Step(step) => ("step", serde_json::to_string(&step)),
            Frame::Complete(step) => ("complete", serde_json::to_string(&step)),
            Frame::Error(err) => (
                "error",
                serde_json::to_string(&json!({
                    "error_kind": err.kind(),
                    "message": err.to_string(),
                })),
            ),
        };
        Event::default()
            .event(name)
            .data(payload.unwrap_or_else(|_| "{}".to_string()))
    }
}

/// SSE surface for progressive strategy execution. Always HTTP 200; failures
/// are delivered as a single `error` event.
async fn stream_run(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Frame>(1);
    tokio::spawn(run_stream_job(state, query, tx));

    let stream = ReceiverStream::new(rx).map(|frame| Ok(frame.into_event()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn run_stream_job(state: AppState, query: StreamQuery, tx: mpsc::Sender<Frame>) {
    if let Err(err) = drive_stream(&state, &query, &tx).await {
        // Client may already be gone; a failed send is not an error.
        let _ = tx.send(Frame::Error(err)).await;
    }
}

async fn drive_stream(
    state: &AppState,
    query: &StreamQuery,
    tx: &mpsc::Sender<Frame>,
) -> Result<(), EngineError> {
    let def = state
        .registry
        .get(&query.strategy)
        .ok_or_else(|| EngineError::UnknownStrategy(query.strategy.clone()))?;

    let user_params: serde_json::Map<String, serde_json::Value> = if query.params.is_empty() {
        serde_json::Map::new()
    } else {
        serde_json::from_str(&query.params)
            .map_err(|e| EngineError::InvalidParams(format!("params is not valid JSON: {e}")))?
    };
    let params = quant::resolve_params(def, &user_params)?;

    let bars =
        super::fetch_history(state, &query.ticker, query.period, query.interval).await?;

    // CPU-bound script runs on the blocking pool; a capacity-1 channel paces
    // it and surfaces client disconnects at the next emission.
    let (step_tx, mut step_rx) = mpsc::channel::<StepEvent>(1);
    let key = def.key;
    let interval = query.interval;
    let registry = state.registry.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let Some(def) = registry.get(key) else {
            return;
        };
        let ctx = ScriptCtx {
            bars: &bars,
            params: &params,
            interval,
        };
        let mut sink = ChannelSink { tx: step_tx };
        // Cancelled means the consumer dropped the stream; nothing to do.
        let _ = quant::stream_strategy(def, &ctx, &mut sink);
    });

    while let Some(step) = step_rx.recv().await {
        let is_final = step.is_final;
        let frame = if is_final {
            Frame::Complete(step)
        } else {
            Frame::Step(step)
        };
        if tx.send(frame).await.is_err() {
            warn!(strategy = %key, "stream client disconnected mid-run");
            break;
        }
        if !is_final {
            tokio::time::sleep(STEP_DELAY).await;
        }
    }

    // The script may be parked in a blocking send; closing the receiver is
    // what cancels it, so it must happen before joining the worker.
    drop(step_rx);

    if let Err(join_err) = worker.await {
        if join_err.is_panic() {
            error!(strategy = %key, "step script panicked");
            return Err(EngineError::InternalComputation(
                "strategy stream execution failed".to_string(),
            ));
        }
    }
    Ok(())
}

struct ChannelSink {
    tx: mpsc::Sender<StepEvent>,
}

impl StepSink for ChannelSink {
    fn emit(&mut self, event: StepEvent) -> Result<(), Cancelled> {
        self.tx.blocking_send(event).map_err(|_| Cancelled)
    }
}
