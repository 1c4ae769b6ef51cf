//! Suggested amounts for the next feeding or pumping entry.
//!
//! The prediction extrapolates the recent growth of amounts over time and
//! clamps the result around the last amount. Whenever the growth rate cannot
//! be computed the average of the recent window is used instead; the caller
//! always gets a preset list.

use chrono::{DateTime, Utc};
use log::debug;
use shared::{Event, PresetResponse, PresetSource};

/// Presets offered before anything has been logged
pub const DEFAULT_PRESETS: [f64; 4] = [50.0, 100.0, 150.0, 200.0];
/// Number of most recent samples the prediction looks at
pub const WINDOW_SIZE: usize = 5;

const PRESET_FACTORS: [f64; 3] = [0.75, 1.0, 1.25];
const ROUNDING_STEP: f64 = 5.0;
const MIN_FACTOR: f64 = 0.25;
const MAX_FACTOR: f64 = 2.5;
const MAX_FACTOR_WITHIN_1H: f64 = 1.3;
const MAX_FACTOR_WITHIN_4H: f64 = 1.7;

/// One past amount and when it was logged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountSample {
    pub amount: f64,
    pub at: DateTime<Utc>,
}

impl AmountSample {
    /// Feedings and pumping sessions with a positive amount
    pub fn from_event(event: &Event) -> Option<Self> {
        event
            .amount_ml()
            .filter(|amount| amount.is_finite() && *amount > 0.0)
            .map(|amount| Self {
                amount,
                at: event.timestamp,
            })
    }
}

#[derive(Clone, Default)]
pub struct PresetService;

impl PresetService {
    pub fn new() -> Self {
        Self
    }

    /// Presets for the next entry given a chronological history
    pub fn predict(&self, history: &[AmountSample], now: DateTime<Utc>) -> PresetResponse {
        match history {
            [] => PresetResponse {
                presets: DEFAULT_PRESETS.to_vec(),
                source: PresetSource::Default,
            },
            [only] => PresetResponse {
                presets: Self::presets_around(only.amount),
                source: PresetSource::SingleSample,
            },
            _ => {
                let window = &history[history.len().saturating_sub(WINDOW_SIZE)..];
                match Self::growth_prediction(window, now) {
                    Some(prediction) => PresetResponse {
                        presets: Self::presets_around(prediction),
                        source: PresetSource::GrowthRate,
                    },
                    None => {
                        debug!("Growth rate unusable, falling back to average of {} samples", window.len());
                        PresetResponse {
                            presets: Self::presets_around(Self::average(window)),
                            source: PresetSource::Average,
                        }
                    }
                }
            }
        }
    }

    /// `None` when the rate is NaN, infinite or not positive
    fn growth_prediction(window: &[AmountSample], now: DateTime<Utc>) -> Option<f64> {
        let (first, last) = (window.first()?, window.last()?);
        let elapsed_hours = hours_between(first.at, last.at);
        let rate = (last.amount - first.amount) / elapsed_hours;
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }

        let hours_since_last = hours_between(last.at, now);
        let raw = rate * hours_since_last;
        if raw <= 0.0 {
            return Some(last.amount);
        }

        let max_factor = if hours_since_last <= 1.0 {
            MAX_FACTOR_WITHIN_1H
        } else if hours_since_last <= 4.0 {
            MAX_FACTOR_WITHIN_4H
        } else {
            MAX_FACTOR
        };
        Some(raw.clamp(last.amount * MIN_FACTOR, last.amount * max_factor))
    }

    fn average(window: &[AmountSample]) -> f64 {
        window.iter().map(|sample| sample.amount).sum::<f64>() / window.len() as f64
    }

    /// Rounded multiples of the prediction, positive, unique and ascending
    fn presets_around(prediction: f64) -> Vec<f64> {
        let mut presets: Vec<f64> = PRESET_FACTORS
            .iter()
            .map(|factor| round_to_step(prediction * factor))
            .filter(|preset| preset.is_finite() && *preset > 0.0)
            .collect();
        presets.sort_by(|a, b| a.total_cmp(b));
        presets.dedup();
        presets
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

fn round_to_step(value: f64) -> f64 {
    (value / ROUNDING_STEP).round() * ROUNDING_STEP
}
