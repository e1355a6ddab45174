// Injectable randomness for the cantus firmus generator.
//
// The generator consumes randomness in exactly one place: the weighted pick
// among filtered melodic candidates. That consumer only ever asks for a
// uniform `f64` in [0, 1), so the seam is the one-method `RandomSource`
// trait. Two implementations live here:
//
// - `SeededRng`: xoshiro256++ (Blackman & Vigna, 2019) seeded through
//   SplitMix64. Identical output for identical seeds on every platform.
// - `ScriptedSource`: replays a fixed list of values, cycling when it runs
//   out. Tests use it to force a particular candidate choice.
//
// Determinism is the contract: same seed, same stream, no OS entropy and
// no global state.

use serde::{Deserialize, Serialize};

/// A source of uniform samples in [0, 1).
pub trait RandomSource {
    /// Next uniform value in [0, 1).
    fn next_f64(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Seeded xoshiro256++ generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    s: [u64; 4],
}

impl SeededRng {
    /// Expand a `u64` seed into the 256-bit state with SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

impl RandomSource for SeededRng {
    /// Upper 53 bits of the next `u64` fill the f64 mantissa.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Replays a scripted sequence of samples, wrapping around at the end.
///
/// Values are clamped into [0, 1) on construction so a script can never
/// push a weighted pick past its last bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptedSource {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        ScriptedSource { values, cursor: 0 }
    }

    /// A source that always returns the same value.
    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }

    /// How many samples have been drawn so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

/// SplitMix64, used only to seed xoshiro256++.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
