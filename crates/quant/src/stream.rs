//! Progressive execution scripts for the streaming surface.
//!
//! A script is a finite, ordered sequence of step events pushed into a
//! [`StepSink`]. Ten strategies narrate the canonical six-step script
//! (load, primary indicator, secondary indicator, signal scan, risk metrics,
//! completion); the rest run the generic fallback that collapses the middle
//! into one "Applying Strategy" step. The sink decides pacing and transport;
//! a sink refusing an event cancels the script before its next emission.

use common::{
    Bar, IndicatorSeries, Interval, Metrics, MomentumZone, Side, StepEvent, StrategyOutput,
    TrendDirection,
};

use crate::indicators::{
    atr, bollinger, closes, ema, kalman_1d, macd, roc, rsi, sma, stochastic, volume_ratio, volumes,
};
use crate::metrics::compute_metrics;
use crate::params::Params;
use crate::strategies::{
    mean_reversion, ml, momentum, statistical, trend, volatility, Artifacts, StrategyDef,
};

/// The client went away; stop producing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Consumer of step events. Implementations bridge to the transport; tests
/// collect into a Vec.
pub trait StepSink {
    fn emit(&mut self, event: StepEvent) -> Result<(), Cancelled>;
}

impl StepSink for Vec<StepEvent> {
    fn emit(&mut self, event: StepEvent) -> Result<(), Cancelled> {
        self.push(event);
        Ok(())
    }
}

/// Everything a script needs from the request.
pub struct ScriptCtx<'a> {
    pub bars: &'a [Bar],
    pub params: &'a Params,
    pub interval: Interval,
}

type ScriptFn = fn(&ScriptCtx<'_>, &mut dyn StepSink) -> Result<(), Cancelled>;

/// Run the strategy's custom script, or the generic fallback when it has
/// none. A failing custom script never silently degrades to the fallback.
pub fn stream_strategy(
    def: &StrategyDef,
    ctx: &ScriptCtx<'_>,
    sink: &mut dyn StepSink,
) -> Result<(), Cancelled> {
    match custom_script(def.key) {
        Some(script) => script(ctx, sink),
        None => generic_script(def, ctx, sink),
    }
}

fn custom_script(key: &str) -> Option<ScriptFn> {
    match key {
        "ma_crossover" => Some(script_ma_crossover),
        "ema_strategy" => Some(script_ema_strategy),
        "macd_signal" => Some(script_macd_signal),
        "rsi_strategy" => Some(script_rsi_strategy),
        "stochastic" => Some(script_stochastic),
        "bollinger_reversion" => Some(script_bollinger_reversion),
        "atr_breakout" => Some(script_atr_breakout),
        "kalman_filter" => Some(script_kalman_filter),
        "lstm_proxy" => Some(script_lstm_proxy),
        "gbm_proxy" => Some(script_gbm_proxy),
        _ => None,
    }
}

// ─── Canonical step layout ───────────────────────────────────────────────────

const TOTAL: u32 = 6;
const P_LOAD: u8 = 10;
const P_PRIMARY: u8 = 30;
const P_SECONDARY: u8 = 50;
const P_SCAN: u8 = 70;
const P_METRICS: u8 = 90;
const P_DONE: u8 = 100;

fn loading_step(bars: &[Bar]) -> StepEvent {
    StepEvent::new(
        1,
        TOTAL,
        "Loading Market Data",
        format!("{} bars loaded for analysis", bars.len()),
        P_LOAD,
    )
}

fn indicator_step(
    step: u32,
    progress: u8,
    title: String,
    detail: String,
    name: &'static str,
    values: Vec<f64>,
) -> StepEvent {
    let mut event = StepEvent::new(step, TOTAL, title, detail, progress);
    event.indicator = Some(IndicatorSeries::single(name, values));
    event
}

fn scan_step(title: &str, signals: &[Side], all: &[common::Signal]) -> StepEvent {
    let buys = signals.iter().filter(|s| **s == Side::Buy).count();
    let sells = signals.len() - buys;
    let mut event = StepEvent::new(
        4,
        TOTAL,
        title.to_string(),
        format!("Detected {buys} bullish and {sells} bearish triggers"),
        P_SCAN,
    );
    event.signals = Some(all.to_vec());
    event
}

fn metrics_step(metrics: &Metrics) -> StepEvent {
    StepEvent::new(
        5,
        TOTAL,
        "Computing Risk Metrics",
        format!(
            "Sharpe {} | Win Rate {} | Max DD {}",
            fmt_ratio(metrics.sharpe),
            fmt_pct(metrics.win_rate.map(|w| w * 100.0)),
            fmt_pct(metrics.max_drawdown_pct)
        ),
        P_METRICS,
    )
}

fn complete_step(detail: String, artifacts: &Artifacts, metrics: Metrics) -> StepEvent {
    let mut event = StepEvent::new(6, TOTAL, "Analysis Complete", detail, P_DONE);
    event.is_final = true;
    event.signals = Some(artifacts.signals.clone());
    event.metrics = Some(metrics);
    event.indicator_data = Some(artifacts.indicators.clone());
    event.output_type = Some(artifacts.output.kind());
    event.output = Some(artifacts.output.clone());
    event
}

fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "n/a".to_string(),
    }
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => "n/a".to_string(),
    }
}

fn sides(artifacts: &Artifacts) -> Vec<Side> {
    artifacts.signals.iter().map(|s| s.side).collect()
}

// ─── Custom scripts ──────────────────────────────────────────────────────────

fn script_ma_crossover(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let fast_n = ctx.params.window("fast_period", 10);
    let slow_n = ctx.params.window("slow_period", 30);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let fast = sma(&series, fast_n);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing Fast SMA({fast_n})"),
        format!("Smoothing price with a {fast_n}-bar simple moving average"),
        "fast_sma",
        fast.clone(),
    ))?;

    let slow = sma(&series, slow_n);
    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        format!("Computing Slow SMA({slow_n})"),
        format!("Establishing the trend baseline with a {slow_n}-bar SMA"),
        "slow_sma",
        slow.clone(),
    ))?;

    let artifacts = trend::ma_crossover(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning Crossover Points",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let regime = match (fast.last(), slow.last()) {
        (Some(f), Some(s)) if f.is_finite() && s.is_finite() && f > s => "BULLISH",
        (Some(f), Some(s)) if f.is_finite() && s.is_finite() && f < s => "BEARISH",
        _ => "NEUTRAL",
    };
    sink.emit(complete_step(
        format!(
            "Current regime: {regime}. {} signals generated.",
            artifacts.signals.len()
        ),
        &artifacts,
        metrics,
    ))
}

fn script_ema_strategy(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let fast_n = ctx.params.window("fast_period", 9);
    let slow_n = ctx.params.window("slow_period", 21);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let fast = ema(&series, fast_n);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing Fast EMA({fast_n})"),
        format!("Exponential weighting with span {fast_n}"),
        "fast_ema",
        fast,
    ))?;

    let slow = ema(&series, slow_n);
    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        format!("Computing Slow EMA({slow_n})"),
        format!("Trend baseline with span {slow_n}"),
        "slow_ema",
        slow,
    ))?;

    let artifacts = trend::ema_strategy(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning Crossover Points",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let direction = match &artifacts.output {
        StrategyOutput::Trend { direction, .. } => *direction,
        _ => TrendDirection::Neutral,
    };
    sink.emit(complete_step(
        format!("Regime: {direction:?}. {} signals generated.", artifacts.signals.len()),
        &artifacts,
        metrics,
    ))
}

fn script_macd_signal(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let fast_n = ctx.params.window("fast", 12);
    let slow_n = ctx.params.window("slow", 26);
    let signal_n = ctx.params.window("signal", 9);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let (macd_line, signal_line, _) = macd(&series, fast_n, slow_n, signal_n);
    let macd_lo = macd_line.iter().copied().filter(|v| v.is_finite()).fold(f64::MAX, f64::min);
    let macd_hi = macd_line.iter().copied().filter(|v| v.is_finite()).fold(f64::MIN, f64::max);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing MACD Line (EMA{fast_n} - EMA{slow_n})"),
        if macd_lo <= macd_hi {
            format!("MACD range: [{macd_lo:.2}, {macd_hi:.2}]")
        } else {
            "MACD undefined over this window".to_string()
        },
        "macd",
        macd_line.clone(),
    ))?;

    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        format!("Computing Signal Line (EMA{signal_n} of MACD)"),
        "Trigger line for crossover detection".to_string(),
        "signal",
        signal_line.clone(),
    ))?;

    let artifacts = trend::macd_signal(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning Zero-Side Crossovers",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let momentum = match (macd_line.last(), signal_line.last()) {
        (Some(m), Some(s)) if m.is_finite() && s.is_finite() && m > s => "BULLISH",
        (Some(m), Some(s)) if m.is_finite() && s.is_finite() && m < s => "BEARISH",
        _ => "NEUTRAL",
    };
    sink.emit(complete_step(
        format!("MACD momentum: {momentum}"),
        &artifacts,
        metrics,
    ))
}

fn script_rsi_strategy(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let period = ctx.params.window("period", 14);
    let oversold = ctx.params.float("oversold", 30.0);
    let overbought = ctx.params.float("overbought", 70.0);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let rsi_ch = rsi(&series, period);
    let current = rsi_ch.iter().rev().copied().find(|v| v.is_finite());
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing RSI({period})"),
        format!("Current RSI: {}", fmt_ratio(current)),
        "rsi",
        rsi_ch.clone(),
    ))?;

    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        "Computing Oversold/Overbought Bands".to_string(),
        format!("Entry recovers through {oversold:.0}, exit breaks through {overbought:.0}"),
        "rsi_oversold",
        vec![oversold; ctx.bars.len()],
    ))?;

    let artifacts = momentum::rsi_strategy(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning Threshold Recoveries",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let zone = match &artifacts.output {
        StrategyOutput::Momentum { zone, .. } => *zone,
        _ => MomentumZone::Neutral,
    };
    sink.emit(complete_step(
        format!("Current zone: {zone:?} (RSI {})", fmt_ratio(current)),
        &artifacts,
        metrics,
    ))
}

fn script_stochastic(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let k_period = ctx.params.window("k_period", 14);
    let d_period = ctx.params.window("d_period", 3);

    sink.emit(loading_step(ctx.bars))?;

    let (k, d) = stochastic(ctx.bars, k_period, d_period);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing %K({k_period})"),
        format!("Current %K: {}", fmt_ratio(k.iter().rev().copied().find(|v| v.is_finite()))),
        "stoch_k",
        k,
    ))?;

    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        format!("Computing %D({d_period})"),
        format!("Current %D: {}", fmt_ratio(d.iter().rev().copied().find(|v| v.is_finite()))),
        "stoch_d",
        d,
    ))?;

    let artifacts = momentum::stochastic_strategy(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning K/D Crossovers",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let zone = match &artifacts.output {
        StrategyOutput::Momentum { zone, .. } => format!("{zone:?}"),
        _ => "Neutral".to_string(),
    };
    sink.emit(complete_step(format!("Zone: {zone}"), &artifacts, metrics))
}

fn script_bollinger_reversion(
    ctx: &ScriptCtx<'_>,
    sink: &mut dyn StepSink,
) -> Result<(), Cancelled> {
    let period = ctx.params.window("period", 20);
    let std_dev = ctx.params.float("std_dev", 2.0);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let (mid, upper, lower) = bollinger(&series, period, std_dev);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing Bollinger Middle ({period})"),
        format!("{period}-bar mean as the reversion anchor"),
        "bb_middle",
        mid,
    ))?;

    let mut band_event = StepEvent::new(
        3,
        TOTAL,
        format!("Computing Bands ({std_dev}x sigma)"),
        "Outer bands mark stretched prints".to_string(),
        P_SECONDARY,
    );
    let mut bands = IndicatorSeries::new();
    bands.insert("bb_upper", upper);
    bands.insert("bb_lower", lower);
    band_event.indicator = Some(bands);
    sink.emit(band_event)?;

    let artifacts = mean_reversion::bollinger_reversion(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning Band Touches",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let detail = match &artifacts.output {
        StrategyOutput::MeanReversion {
            distance_from_mean: Some(d),
            ..
        } => format!("Price at {:.0}% of the mean-to-band distance", d * 100.0),
        _ => "Band position undefined on the last bar".to_string(),
    };
    sink.emit(complete_step(detail, &artifacts, metrics))
}

fn script_atr_breakout(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let period = ctx.params.window("period", 14);
    let mult = ctx.params.float("multiplier", 1.5);

    sink.emit(loading_step(ctx.bars))?;

    let atr_ch = atr(ctx.bars, period);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        format!("Computing ATR({period})"),
        format!(
            "Current ATR: {}",
            fmt_ratio(atr_ch.iter().rev().copied().find(|v| v.is_finite()))
        ),
        "atr",
        atr_ch,
    ))?;

    let artifacts = volatility::atr_breakout(ctx.bars, ctx.params);
    let mut channel_event = StepEvent::new(
        3,
        TOTAL,
        format!("Computing Breakout Channel ({mult}x ATR)"),
        "Channel anchored at each prior close".to_string(),
        P_SECONDARY,
    );
    let mut channel = IndicatorSeries::new();
    if let Some(upper) = artifacts.indicators.get("atr_upper") {
        channel.insert("atr_upper", upper.0.clone());
    }
    if let Some(lower) = artifacts.indicators.get("atr_lower") {
        channel.insert("atr_lower", lower.0.clone());
    }
    channel_event.indicator = Some(channel);
    sink.emit(channel_event)?;

    sink.emit(scan_step(
        "Scanning Range Expansions",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let detail = match &artifacts.output {
        StrategyOutput::Volatility { regime, .. } => format!("Volatility regime: {regime:?}"),
        _ => "Volatility regime unavailable".to_string(),
    };
    sink.emit(complete_step(detail, &artifacts, metrics))
}

fn script_kalman_filter(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let q = ctx.params.float("process_noise", 0.01);
    let r = ctx.params.float("measurement_noise", 1.0);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let out = kalman_1d(&series, q, r);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        "Computing Filtered Price Path".to_string(),
        format!("Q={q}, R={r}, final state {}", fmt_ratio(out.filtered.iter().rev().copied().find(|v| v.is_finite()))),
        "kalman",
        out.filtered,
    ))?;

    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        "Computing State Velocity".to_string(),
        "Per-bar change of the filtered state".to_string(),
        "kalman_velocity",
        out.velocity,
    ))?;

    let artifacts = statistical::kalman_filter(ctx.bars, ctx.params);
    sink.emit(scan_step(
        "Scanning Velocity Zero-Crossings",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let detail = match &artifacts.output {
        StrategyOutput::Statistical { filter_state, .. } => {
            format!("Filter state: {filter_state:?}")
        }
        _ => "Filter state unavailable".to_string(),
    };
    sink.emit(complete_step(detail, &artifacts, metrics))
}

fn script_lstm_proxy(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let lookback = ctx.params.window("lookback", 30);
    let series = closes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let rsi_ch = rsi(&series, 14);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        "Computing Momentum Features".to_string(),
        "RSI, MACD histogram, rate of change and volume ratio".to_string(),
        "rsi",
        rsi_ch,
    ))?;

    let artifacts = ml::lstm_proxy(ctx.bars, ctx.params);
    let composite = artifacts
        .indicators
        .get("ml_composite")
        .map(|c| c.0.clone())
        .unwrap_or_default();
    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        "Computing Composite Score".to_string(),
        format!("Blending 4 features over a {lookback}-bar window"),
        "ml_composite",
        composite,
    ))?;

    sink.emit(scan_step(
        "Scanning Score Threshold Crossings",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let detail = match &artifacts.output {
        StrategyOutput::Ml { prediction, .. } => format!("Prediction: {prediction:?}"),
        _ => "Prediction unavailable".to_string(),
    };
    sink.emit(complete_step(detail, &artifacts, metrics))
}

fn script_gbm_proxy(ctx: &ScriptCtx<'_>, sink: &mut dyn StepSink) -> Result<(), Cancelled> {
    let lookback = ctx.params.window("lookback", 20);
    let series = closes(ctx.bars);
    let vols = volumes(ctx.bars);

    sink.emit(loading_step(ctx.bars))?;

    let momentum_ch = roc(&series, lookback);
    sink.emit(indicator_step(
        2,
        P_PRIMARY,
        "Computing Momentum and Volume Features".to_string(),
        format!(
            "Momentum {} | Volume ratio {}",
            fmt_pct(momentum_ch.iter().rev().copied().find(|v| v.is_finite())),
            fmt_ratio(
                volume_ratio(&vols, lookback)
                    .iter()
                    .rev()
                    .copied()
                    .find(|v| v.is_finite())
            )
        ),
        "momentum",
        momentum_ch,
    ))?;

    let artifacts = ml::gbm_proxy(ctx.bars, ctx.params);
    let score = artifacts
        .indicators
        .get("gbm_score")
        .map(|c| c.0.clone())
        .unwrap_or_default();
    sink.emit(indicator_step(
        3,
        P_SECONDARY,
        "Computing Boosted Score".to_string(),
        "Weighting momentum against mean reversion".to_string(),
        "gbm_score",
        score,
    ))?;

    sink.emit(scan_step(
        "Scanning Score Threshold Crossings",
        &sides(&artifacts),
        &artifacts.signals,
    ))?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    sink.emit(metrics_step(&metrics))?;

    let detail = match &artifacts.output {
        StrategyOutput::Ml { prediction, .. } => format!("Prediction: {prediction:?}"),
        _ => "Prediction unavailable".to_string(),
    };
    sink.emit(complete_step(detail, &artifacts, metrics))
}

// ─── Generic fallback ────────────────────────────────────────────────────────

/// Four-step fallback for strategies without a custom script: the canonical
/// middle collapses into a single "Applying Strategy" step.
fn generic_script(
    def: &StrategyDef,
    ctx: &ScriptCtx<'_>,
    sink: &mut dyn StepSink,
) -> Result<(), Cancelled> {
    sink.emit(StepEvent::new(
        1,
        4,
        "Loading Market Data",
        format!("{} bars loaded for analysis", ctx.bars.len()),
        P_LOAD,
    ))?;

    let artifacts = (def.run)(ctx.bars, ctx.params);
    let mut applying = StepEvent::new(
        2,
        4,
        "Applying Strategy",
        format!(
            "{}: {} signals detected",
            def.display_name,
            artifacts.signals.len()
        ),
        P_SECONDARY,
    );
    applying.indicator = Some(artifacts.indicators.clone());
    applying.signals = Some(artifacts.signals.clone());
    sink.emit(applying)?;

    let metrics = compute_metrics(ctx.bars, &artifacts.signals, ctx.interval);
    let mut risk = metrics_step(&metrics);
    risk.step = 3;
    risk.total = 4;
    sink.emit(risk)?;

    let mut done = complete_step(
        format!("{} signals generated.", artifacts.signals.len()),
        &artifacts,
        metrics,
    );
    done.step = 4;
    done.total = 4;
    sink.emit(done)
}
