//! Synthetic Temperature Generator

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Centre of the NORMAL distribution (44.000 °C)
pub const NORMAL_BASE_MC: i32 = 44_000;
/// Lowest value the ramp produces before wrapping
pub const RAMP_MIN_MC: i32 = 30_000;
/// Highest value the ramp produces
pub const RAMP_MAX_MC: i32 = 80_000;
/// Ramp increment per sample
pub const RAMP_STEP_MC: i32 = 100;

/// Generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Small jitter around 44 °C
    #[default]
    Normal,
    /// NORMAL plus a wider ±1 °C jitter
    Noisy,
    /// Sawtooth from 30.1 °C to 80 °C in 0.1 °C steps
    Ramp,
}

/// Input that is not one of the mode tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode {0:?}, expected normal, noisy or ramp")]
pub struct ParseModeError(pub String);

impl Mode {
    /// Every mode, in declaration order
    pub const ALL: [Mode; 3] = [Mode::Normal, Mode::Noisy, Mode::Ramp];

    /// Attribute token for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Noisy => "noisy",
            Mode::Ramp => "ramp",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Mode::Noisy,
            2 => Mode::Ramp,
            _ => Mode::Normal,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    // Case-sensitive; trailing whitespace (e.g. a newline from `echo`) is accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end() {
            "normal" => Ok(Mode::Normal),
            "noisy" => Ok(Mode::Noisy),
            "ramp" => Ok(Mode::Ramp),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Produces one synthetic reading per call
pub struct Generator {
    rng: StdRng,
    /// Last value returned in RAMP mode
    ramp_mc: i32,
}

impl Generator {
    /// Create a generator seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a deterministic generator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            ramp_mc: RAMP_MIN_MC,
        }
    }

    /// Current ramp cursor
    pub fn ramp_cursor(&self) -> i32 {
        self.ramp_mc
    }

    /// Generate one reading in milli-degrees Celsius.
    ///
    /// Only RAMP mode advances any state besides the random source.
    pub fn generate(&mut self, mode: Mode) -> i32 {
        match mode {
            Mode::Normal => self.normal(),
            Mode::Noisy => {
                let base = self.normal();
                base + self.rng.gen_range(0..2000) - 1000
            }
            Mode::Ramp => {
                self.ramp_mc += RAMP_STEP_MC;
                if self.ramp_mc > RAMP_MAX_MC {
                    self.ramp_mc = RAMP_MIN_MC + RAMP_STEP_MC;
                }
                self.ramp_mc
            }
        }
    }

    fn normal(&mut self) -> i32 {
        NORMAL_BASE_MC + self.rng.gen_range(0..500) - 250
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}
