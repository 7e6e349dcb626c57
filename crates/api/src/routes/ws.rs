use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{finite, Quote};

use crate::AppState;

/// Target cadence for price pushes.
const TICK: Duration = Duration::from_secs(1);

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/quant/ws/live/:ticker", get(ws_live_handler))
}

async fn ws_live_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| live_session(socket, state, ticker))
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    ticker: Option<String>,
}

/// Per-ticker live price fan-out.
///
/// Pushes one `price_update` (or `{error}`) frame per tick; provider failures
/// do not break the cadence. The client may ping (ignored), retarget with
/// `change_ticker`, or close. A send stalled for more than one tick
/// terminates the session.
async fn live_session(mut socket: WebSocket, state: AppState, mut ticker: String) {
    let session = Uuid::new_v4();
    info!(%session, %ticker, "live price session opened");

    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let frame = match tokio::time::timeout(
                    state.provider_timeout,
                    state.market.get_quote(&ticker),
                )
                .await
                {
                    Ok(Ok(quote)) => price_update(&quote),
                    Ok(Err(e)) => {
                        debug!(%ticker, error = %e, "quote fetch failed");
                        json!({ "error": format!("failed to fetch data for {ticker}"), "ticker": ticker.to_uppercase() })
                    }
                    Err(_) => {
                        json!({ "error": format!("quote request for {ticker} timed out"), "ticker": ticker.to_uppercase() })
                    }
                };

                let send = socket.send(Message::Text(frame.to_string()));
                match tokio::time::timeout(TICK, send).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => {
                        warn!(%session, "send failed; closing live session");
                        break;
                    }
                    Err(_) => {
                        warn!(%session, "client stopped collecting; closing live session");
                        break;
                    }
                }
            }

            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) else {
                            continue;
                        };
                        match msg.kind.as_str() {
                            // Keep-alive; never required, never answered.
                            "ping" => {}
                            "change_ticker" => {
                                if let Some(next) = msg.ticker {
                                    info!(%session, from = %ticker, to = %next, "retargeting live session");
                                    ticker = next;
                                }
                            }
                            "close" => break,
                            other => debug!(%session, kind = other, "ignoring client message"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    info!(%session, "live price session closed");
}

fn price_update(quote: &Quote) -> serde_json::Value {
    let change = quote.previous_close.map(|pc| quote.price - pc);
    let change_pct = quote
        .previous_close
        .filter(|pc| *pc != 0.0)
        .map(|pc| (quote.price - pc) / pc * 100.0);

    json!({
        "type": "price_update",
        "data": {
            "ticker": quote.ticker,
            "price": finite(quote.price),
            "change": change.and_then(finite),
            "change_pct": change_pct.and_then(finite),
            "volume": quote.volume.and_then(finite),
            "high": quote.day_high.and_then(finite),
            "low": quote.day_low.and_then(finite),
            "timestamp": quote.ts,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_update_frames_are_finite_json() {
        let quote = Quote {
            ticker: "AAPL".to_string(),
            price: 187.5,
            previous_close: Some(185.0),
            day_high: Some(f64::NAN),
            day_low: Some(183.0),
            volume: None,
            ts: 1_700_000_000,
        };
        let frame = price_update(&quote);
        assert_eq!(frame["type"], "price_update");
        assert_eq!(frame["data"]["price"], 187.5);
        assert_eq!(frame["data"]["change"], 2.5);
        assert!(frame["data"]["high"].is_null());
        assert!(frame["data"]["volume"].is_null());
    }

    #[test]
    fn zero_previous_close_suppresses_percent_change() {
        let quote = Quote {
            ticker: "ZERO".to_string(),
            price: 10.0,
            previous_close: Some(0.0),
            day_high: None,
            day_low: None,
            volume: None,
            ts: 0,
        };
        let frame = price_update(&quote);
        assert!(frame["data"]["change_pct"].is_null());
    }
}
