//! Machine-learning proxy strategies.
//!
//! Both strategies blend normalized indicator features into a composite
//! score, smooth it, and trade threshold crossings. They stand in for
//! sequence models without carrying any model weights.

use std::collections::BTreeMap;

use common::ParamValue::Int;
use common::{finite, Bar, Category, IndicatorSeries, MlPrediction, Side, StrategyOutput};

use crate::indicators::{closes, ema, macd, roc, rsi, sma, volume_ratio, volumes};
use crate::params::Params;
use crate::signals::{crosses_above_level, crosses_below_level, SignalTape};

use super::{last_value, Artifacts, StrategyDef};

const LSTM_ENTRY: f64 = 0.05;
const GBM_ENTRY: f64 = 0.03;
const PREDICTION_BAND: f64 = 0.02;

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "lstm_proxy",
            display_name: "LSTM Forecast (Proxy)",
            category: Category::MlProxy,
            description: "Sequential-model stand-in blending RSI, MACD histogram, ROC and volume.",
            defaults: &[("lookback", Int(30))],
            validate: None,
            run: lstm_proxy,
        },
        StrategyDef {
            key: "gbm_proxy",
            display_name: "Gradient Boosting (Proxy)",
            category: Category::MlProxy,
            description: "Feature-engineered ensemble weighting momentum against mean reversion.",
            defaults: &[("lookback", Int(20))],
            validate: None,
            run: gbm_proxy,
        },
    ]
}

pub(crate) fn lstm_proxy(bars: &[Bar], params: &Params) -> Artifacts {
    let lookback = params.window("lookback", 30);
    let series = closes(bars);
    let vols = volumes(bars);

    let rsi_ch = rsi(&series, 14);
    let (_, _, hist) = macd(&series, 12, 26, 9);
    let roc_ch = roc(&series, 12);
    let vol_ch = volume_ratio(&vols, lookback);

    let composite: Vec<f64> = (0..bars.len())
        .map(|i| {
            let r = rsi_ch[i] / 100.0 - 0.5;
            let h = if series[i] != 0.0 {
                hist[i] / series[i]
            } else {
                f64::NAN
            };
            let rc = roc_ch[i] / 100.0;
            let v = (vol_ch[i] - 1.0).clamp(-1.0, 1.0);
            0.3 * r + 0.3 * h + 0.2 * rc + 0.2 * v
        })
        .collect();
    let smoothed = ema(&composite, lookback);

    let signals = threshold_signals(bars, &smoothed, LSTM_ENTRY);
    let score = last_value(&smoothed);

    let mut features = BTreeMap::new();
    features.insert("rsi", last_value(&rsi_ch).map(|v| (v / 100.0).clamp(0.0, 1.0)));
    features.insert(
        "macd_hist",
        match (last_value(&hist), bars.last().map(|b| b.close)) {
            (Some(h), Some(c)) if c != 0.0 => finite((h / c * 10.0 + 0.5).clamp(0.0, 1.0)),
            _ => None,
        },
    );
    features.insert("roc", last_value(&roc_ch).map(|v| (v / 100.0 * 2.0 + 0.5).clamp(0.0, 1.0)));
    features.insert("volume", last_value(&vol_ch).map(|v| (v / 2.0).clamp(0.0, 1.0)));

    Artifacts {
        signals,
        indicators: IndicatorSeries::single("ml_composite", smoothed),
        output: ml_output(score, features),
    }
}

pub(crate) fn gbm_proxy(bars: &[Bar], params: &Params) -> Artifacts {
    let lookback = params.window("lookback", 20);
    let series = closes(bars);
    let vols = volumes(bars);

    let rsi_ch = rsi(&series, 14);
    let momentum: Vec<f64> = roc(&series, lookback).iter().map(|v| v / 100.0).collect();
    let base = sma(&series, lookback);
    let mean_rev: Vec<f64> = series
        .iter()
        .zip(&base)
        .map(|(c, m)| if *m != 0.0 { c / m - 1.0 } else { f64::NAN })
        .collect();
    let vol_ch = volume_ratio(&vols, lookback);

    let score: Vec<f64> = (0..bars.len())
        .map(|i| {
            let r = rsi_ch[i] / 100.0 - 0.5;
            let m = momentum[i].clamp(-0.1, 0.1);
            let mr = mean_rev[i].clamp(-0.05, 0.05);
            let v = (vol_ch[i] - 1.0).clamp(-1.0, 1.0);
            0.2 * r + 2.0 * m - 3.0 * mr + 0.1 * v
        })
        .collect();
    let smoothed = ema(&score, 5);

    let signals = threshold_signals(bars, &smoothed, GBM_ENTRY);
    let score_last = last_value(&smoothed);

    let mut features = BTreeMap::new();
    features.insert("rsi", last_value(&rsi_ch).map(|v| (v / 100.0).clamp(0.0, 1.0)));
    features.insert("momentum", last_value(&momentum).map(|v| (v * 5.0 + 0.5).clamp(0.0, 1.0)));
    features.insert(
        "mean_reversion",
        last_value(&mean_rev).map(|v| (v * 10.0 + 0.5).clamp(0.0, 1.0)),
    );
    features.insert("volume", last_value(&vol_ch).map(|v| (v / 2.0).clamp(0.0, 1.0)));

    Artifacts {
        signals,
        indicators: IndicatorSeries::single("gbm_score", smoothed),
        output: ml_output(score_last, features),
    }
}

fn threshold_signals(bars: &[Bar], smoothed: &[f64], entry: f64) -> Vec<common::Signal> {
    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above_level(smoothed, entry, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(smoothed, -entry, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }
    tape.into_signals()
}

fn ml_output(score: Option<f64>, features: BTreeMap<&'static str, Option<f64>>) -> StrategyOutput {
    let prediction = match score {
        Some(s) if s > PREDICTION_BAND => MlPrediction::Long,
        Some(s) if s < -PREDICTION_BAND => MlPrediction::Short,
        _ => MlPrediction::Flat,
    };
    StrategyOutput::Ml {
        prediction,
        confidence_score: score.map(|s| (s.abs() * 10.0).min(1.0)),
        features,
    }
}
