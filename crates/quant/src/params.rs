use std::collections::BTreeMap;

use common::{EngineError, ParamValue, Result};

/// Merged and validated strategy parameters: every key from the strategy's
/// default table, with user overrides applied.
#[derive(Debug, Clone)]
pub struct Params(BTreeMap<&'static str, ParamValue>);

impl Params {
    /// Merge user-supplied values over the defaults.
    ///
    /// Rejected with `InvalidParams`: keys not in the default table, values of
    /// the wrong JSON type, integer windows below 1, non-finite floats.
    pub fn resolve(
        defaults: &[(&'static str, ParamValue)],
        user: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let mut merged: BTreeMap<&'static str, ParamValue> = defaults.iter().copied().collect();

        for (key, value) in user {
            let Some(slot) = merged.get_mut(key.as_str()) else {
                return Err(EngineError::InvalidParams(format!(
                    "unknown parameter '{key}'"
                )));
            };
            *slot = match slot {
                ParamValue::Int(_) => {
                    let n = value.as_i64().ok_or_else(|| {
                        EngineError::InvalidParams(format!("parameter '{key}' must be an integer"))
                    })?;
                    ParamValue::Int(n)
                }
                ParamValue::Float(_) => {
                    let f = value.as_f64().ok_or_else(|| {
                        EngineError::InvalidParams(format!("parameter '{key}' must be a number"))
                    })?;
                    ParamValue::Float(f)
                }
            };
        }

        for (key, value) in &merged {
            match value {
                ParamValue::Int(n) if *n < 1 => {
                    return Err(EngineError::InvalidParams(format!(
                        "parameter '{key}' must be >= 1, got {n}"
                    )));
                }
                ParamValue::Float(f) if !f.is_finite() => {
                    return Err(EngineError::InvalidParams(format!(
                        "parameter '{key}' must be finite"
                    )));
                }
                _ => {}
            }
        }

        Ok(Params(merged))
    }

    /// Integer window parameter. The fallback only applies if the key is
    /// missing from the table, which a well-formed default list prevents.
    pub fn window(&self, key: &str, default: usize) -> usize {
        match self.0.get(key) {
            Some(ParamValue::Int(n)) => *n as usize,
            Some(ParamValue::Float(f)) => *f as usize,
            None => default,
        }
    }

    /// Float parameter; integer defaults coerce.
    pub fn float(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(ParamValue::Float(f)) => *f,
            Some(ParamValue::Int(n)) => *n as f64,
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ParamValue::{Float, Int};

    const DEFAULTS: &[(&str, ParamValue)] = &[
        ("fast_period", Int(10)),
        ("slow_period", Int(30)),
        ("threshold", Float(2.0)),
    ];

    fn user(json: &str) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_apply_when_user_map_is_empty() {
        let p = Params::resolve(DEFAULTS, &user("{}")).unwrap();
        assert_eq!(p.window("fast_period", 0), 10);
        assert_eq!(p.float("threshold", 0.0), 2.0);
    }

    #[test]
    fn user_values_override_defaults() {
        let p = Params::resolve(DEFAULTS, &user(r#"{"fast_period": 5, "threshold": 1.5}"#)).unwrap();
        assert_eq!(p.window("fast_period", 0), 5);
        assert_eq!(p.float("threshold", 0.0), 1.5);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = Params::resolve(DEFAULTS, &user(r#"{"bogus": 1}"#)).unwrap_err();
        assert_eq!(err.kind(), "invalid_params");
    }

    #[test]
    fn fractional_value_for_integer_window_is_rejected() {
        let err = Params::resolve(DEFAULTS, &user(r#"{"fast_period": 2.5}"#)).unwrap_err();
        assert_eq!(err.kind(), "invalid_params");
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = Params::resolve(DEFAULTS, &user(r#"{"slow_period": 0}"#)).unwrap_err();
        assert_eq!(err.kind(), "invalid_params");
    }

    #[test]
    fn integer_is_accepted_for_float_parameter() {
        let p = Params::resolve(DEFAULTS, &user(r#"{"threshold": 3}"#)).unwrap();
        assert_eq!(p.float("threshold", 0.0), 3.0);
    }
}
