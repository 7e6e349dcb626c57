/// Scalar Kalman filter output: filtered price path, one-step velocity, and
/// the final gain.
#[derive(Debug, Clone)]
pub struct KalmanOutput {
    pub filtered: Vec<f64>,
    pub velocity: Vec<f64>,
    pub gain: f64,
}

/// One-dimensional Kalman filter over the close series.
///
/// State is the price itself; the covariance recurrence
/// `P' = P + Q, K = P' / (P' + R), P = (1 - K) P'` drives the gain.
/// Velocity is the per-step change of the filtered state. Non-finite inputs
/// leave holes and the state carries.
pub fn kalman_1d(closes: &[f64], process_noise: f64, measurement_noise: f64) -> KalmanOutput {
    let n = closes.len();
    let mut filtered = vec![f64::NAN; n];
    let mut velocity = vec![f64::NAN; n];

    let Some(first) = closes.iter().copied().find(|v| v.is_finite()) else {
        return KalmanOutput {
            filtered,
            velocity,
            gain: f64::NAN,
        };
    };

    let mut x = first;
    let mut p = 1.0;
    let mut k = 0.0;
    for (i, &z) in closes.iter().enumerate() {
        if !z.is_finite() {
            continue;
        }
        let p_pred = p + process_noise;
        k = p_pred / (p_pred + measurement_noise);
        let prev_x = x;
        x += k * (z - x);
        p = (1.0 - k) * p_pred;
        filtered[i] = x;
        velocity[i] = x - prev_x;
    }

    KalmanOutput {
        filtered,
        velocity,
        gain: k,
    }
}
