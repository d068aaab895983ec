// Threshold classification - maps raw metric values onto status buckets
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Presentation bucket attached to an indicator. The sink decides how each
/// bucket is rendered; the core only ever picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleBucket {
    Primary,
    Secondary,
    Tertiary,
    Normal,
    Warning,
    Critical,
    Charging,
    Discharging,
    Success,
    Danger,
    Info,
    Accent,
    Muted,
}

impl StyleBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleBucket::Primary => "primary",
            StyleBucket::Secondary => "secondary",
            StyleBucket::Tertiary => "tertiary",
            StyleBucket::Normal => "normal",
            StyleBucket::Warning => "warning",
            StyleBucket::Critical => "critical",
            StyleBucket::Charging => "charging",
            StyleBucket::Discharging => "discharging",
            StyleBucket::Success => "success",
            StyleBucket::Danger => "danger",
            StyleBucket::Info => "info",
            StyleBucket::Accent => "accent",
            StyleBucket::Muted => "muted",
        }
    }
}

impl fmt::Display for StyleBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PvInputPower,
    LoadPercentage,
    /// State of charge on the 0-100 scale.
    BatterySoc,
    BatteryCurrent,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PvInputPower => "pv_input_power",
            Metric::LoadPercentage => "load_percentage",
            Metric::BatterySoc => "battery_soc",
            Metric::BatteryCurrent => "battery_current",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pv_input_power" => Ok(Metric::PvInputPower),
            "load_percentage" => Ok(Metric::LoadPercentage),
            "battery_soc" => Ok(Metric::BatterySoc),
            "battery_current" => Ok(Metric::BatteryCurrent),
            other => Err(ClassifyError::UnknownMetric(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    #[error("no threshold rule for metric `{0}`")]
    UnknownMetric(String),
    #[error("value {value} for metric `{metric}` is not finite")]
    NonFiniteValue { metric: Metric, value: f64 },
    #[error("invalid threshold rule for `{metric}`: {reason}")]
    InvalidRule { metric: Metric, reason: String },
}

/// One breakpoint. `upper` is exclusive; `None` marks the catch-all band.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Band {
    #[serde(default)]
    pub upper: Option<f64>,
    pub label: String,
    pub style: StyleBucket,
}

impl Band {
    pub fn below(upper: f64, label: &str, style: StyleBucket) -> Self {
        Self {
            upper: Some(upper),
            label: label.to_string(),
            style,
        }
    }

    pub fn otherwise(label: &str, style: StyleBucket) -> Self {
        Self {
            upper: None,
            label: label.to_string(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub bucket: String,
    pub style: StyleBucket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    bands: Vec<Band>,
}

impl ThresholdRule {
    /// Bounds must be strictly ascending and only the last band may omit its bound.
    pub fn new(metric: Metric, bands: Vec<Band>) -> Result<Self, ClassifyError> {
        let invalid = |reason: &str| ClassifyError::InvalidRule {
            metric,
            reason: reason.to_string(),
        };

        let Some((last, bounded)) = bands.split_last() else {
            return Err(invalid("rule has no bands"));
        };
        if last.upper.is_some() {
            return Err(invalid("last band must be a catch-all without an upper bound"));
        }

        let mut previous: Option<f64> = None;
        for band in bounded {
            let upper = band
                .upper
                .ok_or_else(|| invalid("only the last band may omit its upper bound"))?;
            if !upper.is_finite() {
                return Err(invalid("upper bounds must be finite"));
            }
            if previous.is_some_and(|p| upper <= p) {
                return Err(invalid("upper bounds must be strictly ascending"));
            }
            previous = Some(upper);
        }

        Ok(Self { bands })
    }

    fn evaluate(&self, value: f64) -> &Band {
        self.bands
            .iter()
            .find(|band| band.upper.is_none_or(|upper| value < upper))
            .unwrap_or_else(|| &self.bands[self.bands.len() - 1])
    }
}

/// Metric-to-rule table. `Default` carries the operational breakpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    rules: HashMap<Metric, ThresholdRule>,
}

impl ThresholdTable {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, metric: Metric, rule: ThresholdRule) -> Self {
        self.rules.insert(metric, rule);
        self
    }

    /// Build a table from configured overrides keyed by metric name. Metrics not
    /// mentioned keep their default rule.
    pub fn from_overrides(overrides: &HashMap<String, Vec<Band>>) -> Result<Self, ClassifyError> {
        let mut table = Self::default();
        for (name, bands) in overrides {
            let metric: Metric = name.parse()?;
            table
                .rules
                .insert(metric, ThresholdRule::new(metric, bands.clone())?);
        }
        Ok(table)
    }

    pub fn classify(&self, metric: Metric, value: f64) -> Result<Classification, ClassifyError> {
        let rule = self
            .rules
            .get(&metric)
            .ok_or_else(|| ClassifyError::UnknownMetric(metric.to_string()))?;
        if !value.is_finite() {
            return Err(ClassifyError::NonFiniteValue { metric, value });
        }

        let band = rule.evaluate(value);
        Ok(Classification {
            bucket: band.label.clone(),
            style: band.style,
        })
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        // The rules below are statically valid, so construct them directly.
        let rule = |bands: Vec<Band>| ThresholdRule { bands };

        Self::empty()
            .with_rule(
                Metric::PvInputPower,
                rule(vec![
                    Band::below(200.0, "tertiary", StyleBucket::Tertiary),
                    Band::below(800.0, "secondary", StyleBucket::Secondary),
                    Band::otherwise("primary", StyleBucket::Primary),
                ]),
            )
            .with_rule(
                Metric::LoadPercentage,
                rule(vec![
                    Band::below(0.2, "normal", StyleBucket::Normal),
                    Band::below(0.6, "warning", StyleBucket::Warning),
                    Band::otherwise("critical", StyleBucket::Critical),
                ]),
            )
            .with_rule(
                Metric::BatterySoc,
                rule(vec![
                    Band::below(30.0, "critical", StyleBucket::Critical),
                    Band::below(60.0, "warning", StyleBucket::Warning),
                    Band::otherwise("normal", StyleBucket::Normal),
                ]),
            )
            .with_rule(
                Metric::BatteryCurrent,
                rule(vec![
                    Band::below(0.0, "discharging", StyleBucket::Discharging),
                    Band::otherwise("charging", StyleBucket::Charging),
                ]),
            )
    }
}
