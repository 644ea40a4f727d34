//! DVB-S2 Physical Layer Definitions
//!
//! Frame geometry constants and reference-symbol generation for the DVB-S2
//! physical layer: the 26-symbol Start-of-Frame (SOF) sequence, the (64, 7)
//! PLSC signalling code with its scrambler, the pi/2-BPSK mapping used by
//! the PLHEADER, and the unmodulated pilot symbol.
//!
//! These references let data-aided estimators remove the known modulation
//! from received PLHEADER and pilot segments.
//!
//! ## Example
//!
//! ```rust
//! use dvbs2_core::pl_defs::{plheader_symbols, PLHEADER_LEN};
//! use num_complex::Complex64;
//!
//! let mut header = [Complex64::default(); PLHEADER_LEN];
//! plheader_symbols(0x12, &mut header);
//! // pi/2-BPSK symbols all have unit magnitude
//! assert!(header.iter().all(|s| (s.norm() - 1.0).abs() < 1e-12));
//! ```

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

/// Start-of-Frame length in symbols.
pub const SOF_LEN: usize = 26;
/// Physical Layer Signalling Code length in symbols.
pub const PLSC_LEN: usize = 64;
/// PLHEADER length in symbols (SOF + PLSC).
pub const PLHEADER_LEN: usize = SOF_LEN + PLSC_LEN;
/// Payload slot length in symbols.
pub const SLOT_LEN: usize = 90;
/// Pilot block length in symbols.
pub const PILOT_BLK_LEN: usize = 36;
/// Payload symbols between consecutive pilot blocks (16 slots).
pub const PILOT_BLK_INTERVAL: usize = 16 * SLOT_LEN;
/// Maximum number of pilot blocks in a PLFRAME.
pub const MAX_PILOT_BLKS: usize = 22;

/// Normalized frequency offset magnitude below which pilot-aided fine
/// estimation works. The first phase-difference interval of the fine
/// estimator spans 1440 + 90 symbols, so offsets beyond
/// 1/(2*(1440 + 90)) alias from pilot segment to pilot segment.
pub const FINE_FOFFSET_CORR_RANGE: f64 = 3.268e-4;

/// SOF bit sequence, 26 bits MSB first.
pub const SOF: u32 = 0x18D2E82;

/// Generator rows of the (32, 6) code behind the PLSC encoding.
const PLSC_GEN: [u32; 6] = [
    0x90AC2DDD, 0x55555555, 0x33333333, 0x0F0F0F0F, 0x00FF00FF, 0x0000FFFF,
];

/// Scrambling word applied to the 64 PLSC code bits.
const PLSC_SCRAMBLER: u64 = 0x719D_83C9_5342_2DFA;

/// Unmodulated pilot symbol, (1 + j)/sqrt(2).
pub const PILOT_SYMBOL: Complex64 = Complex64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2);

/// Encode a 7-bit PLSC into its scrambled 64-bit codeword (MSB first).
///
/// The six high bits select generator rows of the (32, 6) code; the low bit
/// picks between the interleaved bit and its complement, doubling the code
/// to (64, 7). The result is XORed with the PL scrambling word.
///
/// # Panics
///
/// Panics if `plsc` is not in [0, 127].
pub fn plsc_codeword(plsc: u8) -> u64 {
    assert!(plsc < 128, "PLSC must be a 7-bit value");

    let mut y = 0u32;
    for (i, row) in PLSC_GEN.iter().enumerate() {
        if (plsc >> (6 - i)) & 1 == 1 {
            y ^= row;
        }
    }

    let complement = (plsc & 1) as u64;
    let mut code = 0u64;
    for i in 0..32 {
        let bit = ((y >> (31 - i)) & 1) as u64;
        code |= bit << (63 - 2 * i);
        code |= (bit ^ complement) << (62 - 2 * i);
    }

    code ^ PLSC_SCRAMBLER
}

/// The 90 PLHEADER bits (SOF followed by the scrambled PLSC codeword).
pub fn plheader_bits(plsc: u8) -> [u8; PLHEADER_LEN] {
    let mut bits = [0u8; PLHEADER_LEN];
    for i in 0..SOF_LEN {
        bits[i] = ((SOF >> (SOF_LEN - 1 - i)) & 1) as u8;
    }
    let code = plsc_codeword(plsc);
    for i in 0..PLSC_LEN {
        bits[SOF_LEN + i] = ((code >> (PLSC_LEN - 1 - i)) & 1) as u8;
    }
    bits
}

/// pi/2-BPSK mapping of one PLHEADER bit at symbol index `idx`.
///
/// Even indexes map onto the 45/225-degree diagonal, odd indexes onto the
/// 135/315-degree diagonal.
#[inline]
pub fn pi2_bpsk(bit: u8, idx: usize) -> Complex64 {
    let r = FRAC_1_SQRT_2;
    match (idx % 2, bit & 1) {
        (0, 0) => Complex64::new(r, r),
        (0, _) => Complex64::new(-r, -r),
        (_, 0) => Complex64::new(-r, r),
        (_, _) => Complex64::new(r, -r),
    }
}

/// Write the 90 reference PLHEADER symbols for a PLSC into `out`.
///
/// # Panics
///
/// Panics if `out` is shorter than [`PLHEADER_LEN`] or `plsc` exceeds 127.
pub fn plheader_symbols(plsc: u8, out: &mut [Complex64]) {
    assert!(out.len() >= PLHEADER_LEN, "output slice too short");
    let bits = plheader_bits(plsc);
    for (i, &bit) in bits.iter().enumerate() {
        out[i] = pi2_bpsk(bit, i);
    }
}

/// Write the 26 reference SOF symbols into `out`.
///
/// These are the first [`SOF_LEN`] PLHEADER symbols and do not depend on
/// the PLSC.
pub fn sof_symbols(out: &mut [Complex64]) {
    assert!(out.len() >= SOF_LEN, "output slice too short");
    for i in 0..SOF_LEN {
        let bit = ((SOF >> (SOF_LEN - 1 - i)) & 1) as u8;
        out[i] = pi2_bpsk(bit, i);
    }
}
