//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a bar is rejected before it reaches any detector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("field `{field}` is not finite")]
    NonFinite { field: &'static str },

    #[error("inverted bar: high {high} < low {low}")]
    Inverted { high: f64, low: f64 },

    #[error("field `{field}` = {value} lies outside the bar's high/low range")]
    OutsideRange { field: &'static str, value: f64 },

    #[error("negative volume {0}")]
    NegativeVolume(f64),
}

/// OHLCV bar for a single instrument on a single timeframe.
///
/// Bars are immutable once appended to a state machine. The sequence is
/// totally ordered by timestamp and by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check OHLCV sanity: every field finite, high >= low, open/close inside
    /// the range, volume non-negative.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field });
            }
        }

        if self.high < self.low {
            return Err(BarError::Inverted {
                high: self.high,
                low: self.low,
            });
        }

        for (field, value) in [("open", self.open), ("close", self.close)] {
            if value > self.high || value < self.low {
                return Err(BarError::OutsideRange { field, value });
            }
        }

        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume));
        }

        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bar() -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            1.0850,
            1.0870,
            1.0840,
            1.0860,
            1_200.0,
        )
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn rejects_nan_field() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert_eq!(
            bar.validate(),
            Err(BarError::NonFinite { field: "close" })
        );
    }

    #[test]
    fn rejects_infinite_volume() {
        let mut bar = sample_bar();
        bar.volume = f64::INFINITY;
        assert_eq!(
            bar.validate(),
            Err(BarError::NonFinite { field: "volume" })
        );
    }

    #[test]
    fn rejects_inverted_high_low() {
        let mut bar = sample_bar();
        bar.high = 1.0830; // below low
        assert!(matches!(bar.validate(), Err(BarError::Inverted { .. })));
    }

    #[test]
    fn rejects_open_outside_range() {
        let mut bar = sample_bar();
        bar.open = 1.0900;
        assert_eq!(
            bar.validate(),
            Err(BarError::OutsideRange {
                field: "open",
                value: 1.0900
            })
        );
    }

    #[test]
    fn candle_anatomy() {
        let bar = sample_bar();
        assert!((bar.range() - 0.0030).abs() < 1e-12);
        assert!((bar.body() - 0.0010).abs() < 1e-12);
        assert!((bar.upper_shadow() - 0.0010).abs() < 1e-12);
        assert!((bar.lower_shadow() - 0.0010).abs() < 1e-12);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
