// src/encode/ans/table.rs

//! tANS coding tables for the sign and magnitude coders.
//!
//! Tables are derived at first use from closed-form symbol distributions, so
//! the encoder and the decoder always share bit-identical tables. Only exact
//! IEEE operations are involved in the derivation.

use crate::encode::constants::{
    ANS_CARDINALITY_TABLE, ANS_I_RANGE_START, ANS_MAX_SRC_CARDINALITY, ANS_STATE_MASK,
    ANS_THETA_MEANS, CTX_NT_QUANT_BINS, NUM_ANS_P_MODES, NUM_ANS_STATES, NUM_ANS_THETA_MODES,
};
use lazy_static::lazy_static;

const L: usize = NUM_ANS_STATES as usize;

/// Slot increment for the symbol spread. Odd, so it visits every slot once.
const SPREAD_STEP: usize = (L >> 1) + (L >> 3) + 3;

/// Probability of a one in sign mode 0, which would otherwise be zero.
const SIGN_MODE_0_PROB: f64 = 1.0 / 128.0;

/// One encoder transition: bits to emit and the resulting state index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeEntry {
    pub bits: u8,
    pub next_state: u8,
}

/// One decoder transition: the decoded symbol and the state before
/// renormalization, in `[f_s, 2 f_s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeEntry {
    pub symbol: u8,
    pub prev_state: u8,
}

/// Encoder and decoder tables of one coding mode.
#[derive(Debug, Clone)]
pub struct TansTable {
    alphabet: usize,
    freqs: Vec<u32>,
    /// Indexed by `state * alphabet + symbol`.
    encode: Vec<EncodeEntry>,
    /// Indexed by state.
    decode: Vec<DecodeEntry>,
}

impl TansTable {
    /// Builds the table for a symbol distribution. `probs` need not sum to
    /// exactly one; every symbol gets at least one state.
    pub fn from_probabilities(probs: &[f64]) -> Self {
        let freqs = normalize(probs);
        let spread = spread_symbols(&freqs);
        let alphabet = freqs.len();

        // Slots of every symbol in increasing order.
        let mut slots: Vec<Vec<u8>> = vec![Vec::new(); alphabet];
        for (slot, &s) in spread.iter().enumerate() {
            slots[s as usize].push(slot as u8);
        }

        let mut decode = vec![DecodeEntry::default(); L];
        for (s, symbol_slots) in slots.iter().enumerate() {
            for (rank, &slot) in symbol_slots.iter().enumerate() {
                decode[slot as usize] = DecodeEntry {
                    symbol: s as u8,
                    prev_state: (freqs[s] as usize + rank) as u8,
                };
            }
        }

        let mut encode = vec![EncodeEntry::default(); L * alphabet];
        for state in 0..L {
            let x = ANS_I_RANGE_START as usize + state;
            for (s, &f) in freqs.iter().enumerate() {
                let f = f as usize;
                let mut bits = 0;
                while (x >> bits) >= 2 * f {
                    bits += 1;
                }
                let reduced = x >> bits;
                encode[state * alphabet + s] = EncodeEntry {
                    bits: bits as u8,
                    next_state: slots[s][reduced - f],
                };
            }
        }

        TansTable {
            alphabet,
            freqs,
            encode,
            decode,
        }
    }

    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    /// Normalized frequencies, summing to the number of states.
    pub fn freqs(&self) -> &[u32] {
        &self.freqs
    }

    #[inline]
    pub fn encode_entry(&self, state: u32, symbol: u32) -> EncodeEntry {
        self.encode[state as usize * self.alphabet + symbol as usize]
    }

    /// Entry for a full decoder state in `[L, 2L)`.
    #[inline]
    pub fn decode_entry(&self, state: u32) -> DecodeEntry {
        self.decode[(state & ANS_STATE_MASK) as usize]
    }
}

/// Scales a distribution to integer frequencies summing to `L`, none zero.
///
/// Ties are resolved towards the lowest symbol so the result is identical
/// on every platform.
fn normalize(probs: &[f64]) -> Vec<u32> {
    let mut freqs: Vec<u32> = probs
        .iter()
        .map(|&p| ((p * L as f64).round() as u32).max(1))
        .collect();

    let largest = |freqs: &[u32], above: u32| -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &f) in freqs.iter().enumerate() {
            if f > above && best.is_none_or(|b| f > freqs[b]) {
                best = Some(i);
            }
        }
        best
    };

    let mut total: u32 = freqs.iter().sum();
    while total > L as u32 {
        match largest(&freqs, 1) {
            Some(i) => freqs[i] -= 1,
            None => break,
        }
        total -= 1;
    }
    while total < L as u32 {
        if let Some(i) = largest(&freqs, 0) {
            freqs[i] += 1;
        }
        total += 1;
    }
    debug_assert_eq!(freqs.iter().sum::<u32>(), L as u32);
    freqs
}

/// Distributes symbols over the state slots.
fn spread_symbols(freqs: &[u32]) -> [u8; L] {
    let mut spread = [0u8; L];
    let mut pos = 0usize;
    for (s, &f) in freqs.iter().enumerate() {
        for _ in 0..f {
            spread[pos] = s as u8;
            pos = (pos + SPREAD_STEP) & (L - 1);
        }
    }
    debug_assert_eq!(pos, 0);
    spread
}

/// Distribution of the sign bit for mode `p`: a one has probability `p / 32`.
fn sign_distribution(mode: usize) -> [f64; 2] {
    let p1 = if mode == 0 {
        SIGN_MODE_0_PROB
    } else {
        mode as f64 / CTX_NT_QUANT_BINS as f64
    };
    [1.0 - p1, p1]
}

/// Distribution of one magnitude chunk for scale mode `theta_id`.
///
/// The magnitude is modeled as geometric with the mode's mean. Terminal
/// symbols `r < card` carry `(1 - theta) * theta^r`; the continuation symbol
/// (value `card`) carries the tail `theta^card`.
fn magnitude_distribution(theta_id: usize) -> Vec<f64> {
    let mean = ANS_THETA_MEANS[theta_id];
    let theta = mean / (1.0 + mean);
    let card = ANS_CARDINALITY_TABLE[theta_id] as usize;

    let mut probs = Vec::with_capacity(card + 1);
    let mut power = 1.0f64;
    for _ in 0..card {
        probs.push((1.0 - theta) * power);
        power *= theta;
    }
    probs.push(power);
    probs
}

lazy_static! {
    /// Sign coder tables, one per probability mode.
    pub static ref SIGN_TABLES: Vec<TansTable> = (0..NUM_ANS_P_MODES)
        .map(|mode| TansTable::from_probabilities(&sign_distribution(mode)))
        .collect();

    /// Magnitude coder tables, one per scale mode.
    pub static ref MAGNITUDE_TABLES: Vec<TansTable> = (0..NUM_ANS_THETA_MODES)
        .map(|mode| {
            let table = TansTable::from_probabilities(&magnitude_distribution(mode));
            debug_assert!(table.alphabet() <= ANS_MAX_SRC_CARDINALITY);
            table
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tables() -> impl Iterator<Item = &'static TansTable> {
        SIGN_TABLES.iter().chain(MAGNITUDE_TABLES.iter())
    }

    #[test]
    fn test_frequencies_are_normalized() {
        for table in all_tables() {
            assert_eq!(table.freqs().iter().sum::<u32>(), NUM_ANS_STATES);
            assert!(table.freqs().iter().all(|&f| f >= 1));
        }
    }

    #[test]
    fn test_alphabet_sizes() {
        for table in SIGN_TABLES.iter() {
            assert_eq!(table.alphabet(), 2);
        }
        for (mode, table) in MAGNITUDE_TABLES.iter().enumerate() {
            assert_eq!(table.alphabet(), ANS_CARDINALITY_TABLE[mode] as usize + 1);
        }
    }

    #[test]
    fn test_sign_modes_skew_toward_zero() {
        // Mode 0 almost never sees a one; mode 15 is close to balanced.
        assert_eq!(SIGN_TABLES[0].freqs(), &[63, 1]);
        assert_eq!(SIGN_TABLES[8].freqs(), &[48, 16]);
        let f = SIGN_TABLES[15].freqs();
        assert!(f[0] > f[1]);
    }

    #[test]
    fn test_normalize_breaks_ties_deterministically() {
        assert_eq!(normalize(&[0.5, 0.5]), vec![32, 32]);
        // Three equal shares: the remaining state goes to the first symbol.
        assert_eq!(normalize(&[1.0 / 3.0; 3]), vec![22, 21, 21]);
        // Vanishing probabilities still get a state.
        assert_eq!(normalize(&[1.0, 0.0, 0.0]), vec![62, 1, 1]);
    }

    #[test]
    fn test_spread_covers_every_slot() {
        let freqs = normalize(&magnitude_distribution(9));
        let spread = spread_symbols(&freqs);
        for (s, &f) in freqs.iter().enumerate() {
            let count = spread.iter().filter(|&&x| x as usize == s).count();
            assert_eq!(count, f as usize);
        }
    }

    #[test]
    fn test_every_transition_inverts() {
        for table in all_tables() {
            for state in 0..NUM_ANS_STATES {
                for symbol in 0..table.alphabet() as u32 {
                    let x = ANS_I_RANGE_START + state;
                    let entry = table.encode_entry(state, symbol);
                    let emitted = x & ((1 << entry.bits) - 1);

                    // Decode from the state the encoder moved to.
                    let dec = table.decode_entry(ANS_I_RANGE_START + entry.next_state as u32);
                    assert_eq!(dec.symbol as u32, symbol);
                    let mut restored = dec.prev_state as u32;
                    let mut read = 0;
                    while restored < ANS_I_RANGE_START {
                        let bit = (emitted >> (entry.bits - 1 - read)) & 1;
                        restored = (restored << 1) | bit;
                        read += 1;
                    }
                    assert_eq!(read, entry.bits);
                    assert_eq!(restored, x);
                }
            }
        }
    }

    #[test]
    fn test_cheap_symbols_emit_fewer_bits() {
        // In the narrowest magnitude mode zero is far more likely than the
        // continuation, so it must never cost more bits.
        let table = &MAGNITUDE_TABLES[0];
        for state in 0..NUM_ANS_STATES {
            assert!(table.encode_entry(state, 0).bits <= table.encode_entry(state, 1).bits);
        }
    }
}
