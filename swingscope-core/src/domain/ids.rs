use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

sequential_id!(
    /// Confirmed extremum (fractal) ID
    ExtremumId,
    "x"
);
sequential_id!(
    /// Swing ID
    SwingId,
    "s"
);
sequential_id!(
    /// Corrective pattern ID
    PatternId,
    "p"
);
sequential_id!(
    /// Emitted signal ID
    SignalId,
    "sig"
);

/// Monotonic ID source. Each state machine owns one, so IDs are a pure
/// function of the bar sequence and replay reproduces them exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGen {
    next_extremum: u64,
    next_swing: u64,
    next_pattern: u64,
    next_signal: u64,
}

impl IdGen {
    pub fn extremum(&mut self) -> ExtremumId {
        let id = ExtremumId(self.next_extremum);
        self.next_extremum += 1;
        id
    }

    pub fn swing(&mut self) -> SwingId {
        let id = SwingId(self.next_swing);
        self.next_swing += 1;
        id
    }

    pub fn pattern(&mut self) -> PatternId {
        let id = PatternId(self.next_pattern);
        self.next_pattern += 1;
        id
    }

    pub fn signal(&mut self) -> SignalId {
        let id = SignalId(self.next_signal);
        self.next_signal += 1;
        id
    }
}
