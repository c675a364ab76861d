//! Property tests for engine invariants.
//!
//! Uses proptest to verify, over arbitrary bar series:
//! 1. Alternation: the recorded extrema alternate high/low in time order
//! 2. Strict extrema: every recorded fractal beats all neighbours in its window
//! 3. Dominance: the dominant swing is the largest one still in the lookback
//! 4. Zones: every zone holds at least `min_factors` factors
//! 5. Trade lifecycle: at most one open signal, always matching the mode
//! 6. Replay: seek(i) equals a fresh run over the first i+1 bars

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use swingscope_core::domain::{Bar, ExtremumKind, Swing, SwingDirection};
use swingscope_core::{FullState, StrategyConfig, StrategyStateMachine, TradeMode};

// -- Strategies (proptest) ------------------------------

fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

/// One bar's shape: relative close move, wick sizes and volume.
fn arb_step() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (
        -0.01..0.01_f64,
        0.0..0.004_f64,
        0.0..0.004_f64,
        prop_oneof![9 => 800.0..1200.0_f64, 1 => 2500.0..6000.0_f64],
    )
}

fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(arb_step(), 10..max_len).prop_map(|steps| {
        let mut close = 1.0_f64;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (mv, up, down, volume))| {
                let open = close;
                close = open * (1.0 + mv);
                let high = open.max(close) * (1.0 + up);
                let low = open.min(close) * (1.0 - down);
                Bar::new(ts(i), open, high, low, close, volume)
            })
            .collect()
    })
}

fn arb_half_window() -> impl Strategy<Value = usize> {
    1usize..4
}

fn config(half_window: usize) -> StrategyConfig {
    StrategyConfig {
        extremum_half_window: half_window,
        swing_lookback_bars: 40,
        signal_timeout_bars: 15,
        checkpoint_interval: 16,
        ..StrategyConfig::default()
    }
}

fn run(config: StrategyConfig, bars: &[Bar]) -> StrategyStateMachine {
    let mut machine = StrategyStateMachine::new(config).unwrap();
    machine.process_all(bars.to_vec()).unwrap();
    machine
}

/// Swings of `direction` still inside the lookback at the last bar.
fn live_swings(state: &FullState, direction: SwingDirection, lookback: usize) -> Vec<&Swing> {
    let oldest_end = state
        .last_index()
        .and_then(|i| i.checked_sub(lookback))
        .unwrap_or(0);
    state
        .swings
        .iter()
        .filter(|s| s.direction == direction && s.end.index >= oldest_end)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // -- 1. Alternation --------------------------------

    /// Consecutive recorded extrema are of opposite kind and strictly ordered.
    #[test]
    fn extrema_alternate(bars in arb_bars(250), w in arb_half_window()) {
        let state = run(config(w), &bars).snapshot();
        for pair in state.extrema.windows(2) {
            prop_assert_ne!(pair[0].kind, pair[1].kind);
            prop_assert!(pair[0].index < pair[1].index);
        }
        for swing in &state.swings {
            prop_assert_ne!(swing.start.kind, swing.end.kind);
            prop_assert!(swing.magnitude >= 0.0);
        }
    }

    // -- 2. Strict extrema ------------------------------

    /// A recorded high is strictly above every other high in its window (lows
    /// mirror), and it was confirmed no earlier than `w` bars later.
    #[test]
    fn extrema_are_strict(bars in arb_bars(200), w in arb_half_window()) {
        let state = run(config(w), &bars).snapshot();
        for x in &state.extrema {
            prop_assert!(x.index >= w && x.index + w < bars.len());
            for j in x.index - w..=x.index + w {
                if j == x.index {
                    continue;
                }
                match x.kind {
                    ExtremumKind::High => prop_assert!(bars[j].high < x.price),
                    ExtremumKind::Low => prop_assert!(bars[j].low > x.price),
                }
            }
        }
    }

    // -- 3. Dominance ---------------------------------

    /// No swing inside the lookback is larger than the dominant swing of its
    /// direction, and the reference is the larger dominant.
    #[test]
    fn dominant_is_maximal(bars in arb_bars(300), w in arb_half_window()) {
        let config = config(w);
        let lookback = config.swing_lookback_bars;
        let state = run(config, &bars).snapshot();

        for (direction, dominant) in [
            (SwingDirection::Up, &state.dominant_up),
            (SwingDirection::Down, &state.dominant_down),
        ] {
            let live = live_swings(&state, direction, lookback);
            match dominant {
                Some(d) => {
                    prop_assert_eq!(d.direction, direction);
                    for s in &live {
                        prop_assert!(s.magnitude <= d.magnitude);
                    }
                }
                None => prop_assert!(live.is_empty()),
            }
        }

        if let Some(reference) = &state.reference {
            for other in [&state.dominant_up, &state.dominant_down].into_iter().flatten() {
                prop_assert!(reference.magnitude >= other.magnitude);
            }
        } else {
            prop_assert!(state.dominant_up.is_none() && state.dominant_down.is_none());
        }
    }

    // -- 4. Zones ------------------------------------

    /// Zones never form below the configured factor count.
    #[test]
    fn zones_respect_min_factors(bars in arb_bars(200), min_factors in 1usize..4) {
        let config = StrategyConfig {
            min_factors,
            ..config(2)
        };
        let mut machine = StrategyStateMachine::new(config).unwrap();
        for delta in machine.process_all(bars).unwrap() {
            for zone in &delta.zones {
                prop_assert!(zone.factor_count >= min_factors);
                prop_assert_eq!(zone.factor_count, zone.factors.len());
            }
        }
    }

    // -- 5. Trade lifecycle -----------------------------

    /// Signals only appear in Finding mode, and every signal but the open one
    /// has exactly one outcome.
    #[test]
    fn at_most_one_open_signal(bars in arb_bars(300)) {
        let config = StrategyConfig {
            min_factors: 1,
            ..config(2)
        };
        let mut machine = StrategyStateMachine::new(config).unwrap();
        let mut mode = TradeMode::Finding;
        for bar in bars {
            let delta = machine.process_bar(bar).unwrap();
            if let Some(signal) = &delta.signal {
                // Resolution and a new signal never share a bar.
                prop_assert!(delta.outcome.is_none());
                prop_assert_eq!(mode, TradeMode::Finding);
                prop_assert_eq!(machine.mode(), TradeMode::Managing { signal_id: signal.id });
            }
            mode = machine.mode();

            let state = machine.snapshot();
            let open = usize::from(state.open_signal.is_some());
            prop_assert_eq!(state.signals.len(), state.outcomes.len() + open);
            prop_assert_eq!(
                state.open_signal.as_ref().map(|s| s.id),
                state.mode.open_signal()
            );
        }
    }

    // -- 6. Replay -----------------------------------

    /// seek(i) after a full run equals a fresh run stopped at bar i.
    #[test]
    fn seek_equals_prefix_run(bars in arb_bars(150), pick in 0.0..1.0_f64) {
        let i = ((bars.len() - 1) as f64 * pick) as usize;
        let mut full = run(config(2), &bars);
        let sought = full.seek(i).unwrap();
        let prefix = run(config(2), &bars[..=i]).snapshot();
        prop_assert_eq!(sought, prefix);
    }

    /// Seeking to i then j gives the same state as seeking to j directly.
    #[test]
    fn seek_is_path_independent(
        bars in arb_bars(150),
        a in 0.0..1.0_f64,
        b in 0.0..1.0_f64,
    ) {
        let last = bars.len() - 1;
        let (i, j) = ((last as f64 * a) as usize, (last as f64 * b) as usize);
        let mut machine = run(config(2), &bars);
        machine.seek(i).unwrap();
        let via_i = machine.seek(j).unwrap();

        let mut direct = run(config(2), &bars);
        prop_assert_eq!(via_i, direct.seek(j).unwrap());
    }
}
