//! DVB-S2 BCH Outer Codec
//!
//! Systematic binary BCH encoder/decoder over GF(2^m) for the outer error
//! correction of DVB-S2 FECFRAMEs. Short FECFRAME codes work in GF(2^14)
//! with p(x) = 1 + x + x^3 + x^5 + x^14; normal FECFRAME codes work in
//! GF(2^16) with p(x) = 1 + x^2 + x^3 + x^5 + x^16. Each code is a
//! shortened BCH from the mother code of length 2^m - 1.
//!
//! The encoder offers two datapaths selected at construction: a bitwise
//! reference LFSR, and a packed datapath that feeds the parity shift
//! register one message byte at a time through a precomputed 256-entry
//! remainder table (the same technique as a table-driven CRC, widened to a
//! multi-word register). The decoder is the classic algebraic pipeline:
//! syndromes, Berlekamp-Massey, Chien search over the shortened positions,
//! correction, and a syndrome re-check.
//!
//! Codewords are bit-packed, MSB first within each byte, message bits in
//! the high-order positions. All DVB-S2 message and codeword lengths are
//! byte multiples.
//!
//! ## Example
//!
//! ```rust
//! use dvbs2_core::bch_codec::{BchCodec, BchParams};
//!
//! let params = BchParams::new(3240, 3072).unwrap();
//! let mut codec = BchCodec::new(params).unwrap();
//!
//! let msg = vec![0xA5u8; params.k() / 8];
//! let mut codeword = vec![0u8; params.n() / 8];
//! codec.encode(&msg, &mut codeword);
//!
//! // Two bit errors
//! codeword[0] ^= 0x81;
//!
//! let mut decoded = vec![0u8; params.k() / 8];
//! let corrections = codec.decode(&codeword, &mut decoded).unwrap();
//! assert_eq!(corrections, 2);
//! assert_eq!(decoded, msg);
//! ```

use crate::bit_packing::get_bit;
use crate::galois::GaloisField;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primitive polynomial 1 + x + x^3 + x^5 + x^14 (short FECFRAMEs).
pub const SHORT_PRIM_POLY: u32 = 0x402B;
/// Primitive polynomial 1 + x^2 + x^3 + x^5 + x^16 (normal FECFRAMEs).
pub const NORMAL_PRIM_POLY: u32 = 0x1002D;

/// The (N, K, t) outer-code triples defined by DVB-S2.
const DVBS2_BCH_CODES: &[(usize, usize, usize)] = &[
    // Short FECFRAME (GF(2^14))
    (3240, 3072, 12),
    (5400, 5232, 12),
    (6480, 6312, 12),
    (7200, 7032, 12),
    (9720, 9552, 12),
    (10800, 10632, 12),
    (11880, 11712, 12),
    (12600, 12432, 12),
    (13320, 13152, 12),
    (14400, 14232, 12),
    // Normal FECFRAME (GF(2^16))
    (16200, 16008, 12),
    (21600, 21408, 12),
    (25920, 25728, 12),
    (32400, 32208, 12),
    (38880, 38688, 12),
    (43200, 43040, 10),
    (48600, 48408, 12),
    (51840, 51648, 12),
    (54000, 53840, 10),
    (57600, 57472, 8),
    (58320, 58192, 8),
];

/// FECFRAME size class, which fixes the BCH mother code field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FecFrame {
    /// Normal FECFRAME — 64800 coded bits, BCH over GF(2^16).
    Normal,
    /// Short FECFRAME — 16200 coded bits, BCH over GF(2^14).
    Short,
}

impl FecFrame {
    /// Degree m of the mother-code field GF(2^m).
    pub fn gf_degree(&self) -> u32 {
        match self {
            FecFrame::Normal => 16,
            FecFrame::Short => 14,
        }
    }

    /// Primitive polynomial of the mother-code field.
    pub fn primitive_poly(&self) -> u32 {
        match self {
            FecFrame::Normal => NORMAL_PRIM_POLY,
            FecFrame::Short => SHORT_PRIM_POLY,
        }
    }
}

/// Validated DVB-S2 BCH code parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BchParams {
    n: usize,
    k: usize,
    t: usize,
    frame: FecFrame,
}

impl BchParams {
    /// Look up an (N, K) pair in the DVB-S2 outer-code table.
    ///
    /// N below 16200 selects the short FECFRAME class.
    pub fn new(n: usize, k: usize) -> Result<Self, BchError> {
        let &(_, _, t) = DVBS2_BCH_CODES
            .iter()
            .find(|&&(tn, tk, _)| tn == n && tk == k)
            .ok_or(BchError::UnsupportedCode { n, k })?;
        let frame = if n < 16200 { FecFrame::Short } else { FecFrame::Normal };
        Ok(Self { n, k, t, frame })
    }

    /// Codeword length in bits.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Message length in bits.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Guaranteed error correction capability.
    pub fn t(&self) -> usize {
        self.t
    }

    /// FECFRAME size class.
    pub fn fecframe(&self) -> FecFrame {
        self.frame
    }

    /// Number of parity bits, N - K.
    pub fn parity_bits(&self) -> usize {
        self.n - self.k
    }

    /// The full DVB-S2 (N, K, t) table.
    pub fn standard_codes() -> &'static [(usize, usize, usize)] {
        DVBS2_BCH_CODES
    }
}

/// Encoder datapath selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BchImpl {
    /// Bit-at-a-time LFSR, kept as the equivalence baseline.
    Reference,
    /// Byte-at-a-time LFSR with a precomputed remainder table.
    #[default]
    Packed,
}

/// BCH codec error.
#[derive(Error, Debug)]
pub enum BchError {
    /// The (N, K) pair is not in the DVB-S2 outer-code table.
    #[error("({n}, {k}) is not a DVB-S2 BCH code")]
    UnsupportedCode { n: usize, k: usize },

    /// The generator polynomial came out with the wrong degree.
    #[error("generator polynomial degree {got}, expected n - k = {expected}")]
    GeneratorDegree { expected: usize, got: usize },

    /// A caller-supplied buffer has the wrong length.
    #[error("buffer of {got} elements, expected {expected}")]
    BufferSize { expected: usize, got: usize },

    /// The error pattern exceeds the correction capability.
    #[error("error pattern beyond t = {t} errors, frame left uncorrected")]
    Uncorrectable { t: usize },
}

/// Parity shift register wide enough for every DVB-S2 code (N - K <= 192).
/// Limb 0 holds the low-order coefficients.
type ParityReg = [u64; 3];

const REG_LIMBS: usize = 3;

#[inline]
fn reg_bit(r: &ParityReg, i: usize) -> bool {
    (r[i / 64] >> (i % 64)) & 1 == 1
}

#[inline]
fn reg_xor(a: &mut ParityReg, b: &ParityReg) {
    for i in 0..REG_LIMBS {
        a[i] ^= b[i];
    }
}

#[inline]
fn reg_clear_high(r: &mut ParityReg, d: usize) {
    let limb = d / 64;
    if limb >= REG_LIMBS {
        return;
    }
    let off = d % 64;
    if off == 0 {
        r[limb] = 0;
    } else {
        r[limb] &= (1u64 << off) - 1;
    }
    for l in r.iter_mut().skip(limb + 1) {
        *l = 0;
    }
}

#[inline]
fn reg_shl1(r: &mut ParityReg, d: usize) {
    for i in (1..REG_LIMBS).rev() {
        r[i] = (r[i] << 1) | (r[i - 1] >> 63);
    }
    r[0] <<= 1;
    reg_clear_high(r, d);
}

#[inline]
fn reg_shl8(r: &mut ParityReg, d: usize) {
    for i in (1..REG_LIMBS).rev() {
        r[i] = (r[i] << 8) | (r[i - 1] >> 56);
    }
    r[0] <<= 8;
    reg_clear_high(r, d);
}

/// Extract the 8 bits starting at bit `lsb` (coefficient x^lsb in the LSB).
#[inline]
fn reg_byte(r: &ParityReg, lsb: usize) -> u8 {
    let limb = lsb / 64;
    let off = lsb % 64;
    let mut v = r[limb] >> off;
    if off > 56 && limb + 1 < REG_LIMBS {
        v |= r[limb + 1] << (64 - off);
    }
    v as u8
}

/// Build the byte-feedback table: entry v holds v(x) * x^d mod g(x).
fn build_feedback_table(generator: &[u8], d: usize) -> Vec<ParityReg> {
    // g(x) - x^d as a register value, one bit per coefficient.
    let mut g_low: ParityReg = [0; REG_LIMBS];
    for (j, &c) in generator.iter().take(d).enumerate() {
        if c == 1 {
            g_low[j / 64] |= 1u64 << (j % 64);
        }
    }

    let mut table = vec![[0u64; REG_LIMBS]; 256];
    for (v, entry) in table.iter_mut().enumerate() {
        // Start from v(x) * x^(d-8), then multiply by x^8 with reduction.
        let mut r: ParityReg = [0; REG_LIMBS];
        let lsb = d - 8;
        r[lsb / 64] |= (v as u64) << (lsb % 64);
        for _ in 0..8 {
            let carry = reg_bit(&r, d - 1);
            reg_shl1(&mut r, d);
            if carry {
                reg_xor(&mut r, &g_low);
            }
        }
        *entry = r;
    }
    table
}

/// Packed encoder: ingest one message byte per table lookup.
fn encode_packed(d: usize, table: &[ParityReg], msg: &[u8], parity: &mut [u8]) {
    let mut reg: ParityReg = [0; REG_LIMBS];
    for &byte in msg {
        let top = reg_byte(&reg, d - 8) ^ byte;
        reg_shl8(&mut reg, d);
        reg_xor(&mut reg, &table[top as usize]);
    }
    // Coefficient x^(d-1) is transmitted first.
    for (i, b) in parity.iter_mut().enumerate() {
        *b = reg_byte(&reg, d - 8 * (i + 1));
    }
}

/// Reference encoder: one message bit per LFSR step.
fn encode_reference(generator: &[u8], lfsr: &mut [u8], msg: &[u8], parity: &mut [u8]) {
    let d = lfsr.len();
    lfsr.fill(0);
    for i in 0..msg.len() * 8 {
        let feedback = get_bit(msg, i) ^ lfsr[d - 1];
        for j in (1..d).rev() {
            lfsr[j] = lfsr[j - 1] ^ (feedback & generator[j]);
        }
        lfsr[0] = feedback & generator[0];
    }
    parity.fill(0);
    for i in 0..d {
        if lfsr[d - 1 - i] == 1 {
            parity[i / 8] |= 0x80 >> (i % 8);
        }
    }
}

/// Generator polynomial: product over GF(2) of the minimal polynomials of
/// alpha, alpha^3, ..., alpha^(2t-1), skipping cosets already absorbed.
fn build_generator(gf: &GaloisField, t: usize, expected_degree: usize) -> Result<Vec<u8>, BchError> {
    let n = gf.order();
    let mut covered = vec![false; n];
    let mut g: Vec<u8> = vec![1];

    for i in (1..2 * t).step_by(2) {
        if covered[i] {
            continue;
        }
        // Cyclotomic coset {i * 2^j mod n}
        let mut coset = Vec::new();
        let mut s = i;
        loop {
            coset.push(s);
            covered[s] = true;
            s = (s * 2) % n;
            if s == i {
                break;
            }
        }
        // Minimal polynomial as the product of (x + alpha^s) over the
        // coset; the coefficients collapse into GF(2).
        let mut min_poly: Vec<u32> = vec![1];
        for &s in &coset {
            let root = gf.alpha_pow(s);
            min_poly.push(0);
            for j in (1..min_poly.len()).rev() {
                min_poly[j] = min_poly[j - 1] ^ gf.mul(min_poly[j], root);
            }
            min_poly[0] = gf.mul(min_poly[0], root);
        }
        debug_assert!(min_poly.iter().all(|&c| c <= 1), "minimal polynomial not binary");

        let mut prod = vec![0u8; g.len() + min_poly.len() - 1];
        for (a, &ga) in g.iter().enumerate() {
            if ga == 0 {
                continue;
            }
            for (b, &mb) in min_poly.iter().enumerate() {
                prod[a + b] ^= mb as u8;
            }
        }
        g = prod;
    }

    let degree = g.len() - 1;
    if degree != expected_degree {
        return Err(BchError::GeneratorDegree { expected: expected_degree, got: degree });
    }
    Ok(g)
}

/// DVB-S2 BCH encoder/decoder instance.
///
/// Owns its field tables, generator polynomial, encoder datapath, and all
/// decoder scratch; nothing allocates after construction. Instances move
/// freely between threads but are not meant for shared mutation.
#[derive(Debug, Clone)]
pub struct BchCodec {
    params: BchParams,
    gf: GaloisField,
    /// Generator coefficients g_0..g_(n-k), little-endian by power.
    generator: Vec<u8>,
    datapath: EncoderDatapath,
    /// Reference-encoder shift register, one coefficient per byte.
    lfsr: Vec<u8>,
    /// S_1..S_2t.
    syndromes: Vec<u32>,
    /// Error locator sigma(x) and Berlekamp-Massey working polynomials.
    sigma: Vec<u32>,
    sigma_tmp: Vec<u32>,
    prev: Vec<u32>,
    /// Chien coefficient walkers.
    chien: Vec<u32>,
    err_pos: Vec<usize>,
    /// Received/corrected word scratch.
    rx: Vec<u8>,
}

#[derive(Debug, Clone)]
enum EncoderDatapath {
    Reference,
    Packed { table: Vec<ParityReg> },
}

impl BchCodec {
    /// Build a codec with the packed encoder datapath.
    pub fn new(params: BchParams) -> Result<Self, BchError> {
        Self::with_impl(params, BchImpl::default())
    }

    /// Build a codec with an explicit encoder datapath.
    pub fn with_impl(params: BchParams, imp: BchImpl) -> Result<Self, BchError> {
        let frame = params.fecframe();
        let gf = GaloisField::new(frame.gf_degree(), frame.primitive_poly());
        let d = params.parity_bits();
        let generator = build_generator(&gf, params.t(), d)?;
        let datapath = match imp {
            BchImpl::Reference => EncoderDatapath::Reference,
            BchImpl::Packed => EncoderDatapath::Packed {
                table: build_feedback_table(&generator, d),
            },
        };
        let t = params.t();
        tracing::debug!(
            n = params.n(),
            k = params.k(),
            t,
            m = frame.gf_degree(),
            "built DVB-S2 BCH codec"
        );
        Ok(Self {
            params,
            gf,
            generator,
            datapath,
            lfsr: vec![0; d],
            syndromes: vec![0; 2 * t],
            sigma: vec![0; 2 * t + 2],
            sigma_tmp: vec![0; 2 * t + 2],
            prev: vec![0; 2 * t + 2],
            chien: vec![0; t + 1],
            err_pos: Vec::with_capacity(t),
            rx: vec![0; params.n() / 8],
        })
    }

    /// Code parameters.
    pub fn params(&self) -> &BchParams {
        &self.params
    }

    /// Generator polynomial coefficients, little-endian by power.
    pub fn generator(&self) -> &[u8] {
        &self.generator
    }

    /// Systematically encode K/8 packed message bytes into N/8 codeword
    /// bytes (message first, parity in the low-order positions).
    ///
    /// # Panics
    ///
    /// Panics on buffer length mismatch; encoding itself cannot fail.
    pub fn encode(&mut self, msg: &[u8], codeword: &mut [u8]) {
        let kb = self.params.k() / 8;
        let nb = self.params.n() / 8;
        assert_eq!(msg.len(), kb, "message must be {kb} bytes");
        assert_eq!(codeword.len(), nb, "codeword must be {nb} bytes");

        codeword[..kb].copy_from_slice(msg);
        let (sys, parity) = codeword.split_at_mut(kb);
        match &self.datapath {
            EncoderDatapath::Packed { table } => {
                encode_packed(self.params.parity_bits(), table, sys, parity)
            }
            EncoderDatapath::Reference => {
                encode_reference(&self.generator, &mut self.lfsr, sys, parity)
            }
        }
    }

    /// Decode N/8 packed hard-decision bytes into K/8 message bytes.
    ///
    /// Returns the number of corrected bit errors, or
    /// [`BchError::Uncorrectable`] when the word cannot be brought back to
    /// a codeword. `msg` is written only on success.
    pub fn decode(&mut self, rx: &[u8], msg: &mut [u8]) -> Result<usize, BchError> {
        let nb = self.params.n() / 8;
        let kb = self.params.k() / 8;
        if rx.len() != nb {
            return Err(BchError::BufferSize { expected: nb, got: rx.len() });
        }
        if msg.len() != kb {
            return Err(BchError::BufferSize { expected: kb, got: msg.len() });
        }
        self.rx.copy_from_slice(rx);
        self.decode_scratch(msg)
    }

    /// Hard-decide demapper LLRs and decode.
    ///
    /// Negative LLR means bit 1; zero maps to bit 0.
    pub fn decode_llr(&mut self, llr: &[f32], msg: &mut [u8]) -> Result<usize, BchError> {
        let n = self.params.n();
        let kb = self.params.k() / 8;
        if llr.len() != n {
            return Err(BchError::BufferSize { expected: n, got: llr.len() });
        }
        if msg.len() != kb {
            return Err(BchError::BufferSize { expected: kb, got: msg.len() });
        }
        self.rx.fill(0);
        for (i, &l) in llr.iter().enumerate() {
            if l < 0.0 {
                self.rx[i / 8] |= 0x80 >> (i % 8);
            }
        }
        self.decode_scratch(msg)
    }

    fn decode_scratch(&mut self, msg: &mut [u8]) -> Result<usize, BchError> {
        let kb = self.params.k() / 8;
        let t = self.params.t();

        if self.compute_syndromes() {
            msg.copy_from_slice(&self.rx[..kb]);
            return Ok(0);
        }

        let l = self.berlekamp_massey();
        if l == 0 || l > t {
            return Err(BchError::Uncorrectable { t });
        }

        let roots = self.chien_search(l);
        if roots != l {
            return Err(BchError::Uncorrectable { t });
        }

        for i in 0..self.err_pos.len() {
            let pos = self.err_pos[i];
            self.rx[pos / 8] ^= 0x80 >> (pos % 8);
        }

        // The corrected word must have vanishing syndromes.
        if !self.compute_syndromes() {
            return Err(BchError::Uncorrectable { t });
        }

        msg.copy_from_slice(&self.rx[..kb]);
        Ok(l)
    }

    /// Fill S_1..S_2t from the word in `self.rx`; true when all vanish.
    ///
    /// Odd syndromes are evaluated by walking the set bits of the packed
    /// word; even ones follow from S_2i = S_i^2 over GF(2).
    fn compute_syndromes(&mut self) -> bool {
        let t2 = 2 * self.params.t();
        let n_bits = self.params.n();
        let nf = self.gf.order();
        let gf = &self.gf;
        let syn = &mut self.syndromes;

        syn.fill(0);
        for (byte_idx, &b) in self.rx.iter().enumerate() {
            if b == 0 {
                continue;
            }
            for bit in 0..8 {
                if b & (0x80 >> bit) == 0 {
                    continue;
                }
                let power = n_bits - 1 - (byte_idx * 8 + bit);
                for i in (1..=t2).step_by(2) {
                    syn[i - 1] ^= gf.alpha_pow((i * power) % nf);
                }
            }
        }
        for i in (2..=t2).step_by(2) {
            let s = syn[i / 2 - 1];
            syn[i - 1] = gf.mul(s, s);
        }
        syn.iter().all(|&s| s == 0)
    }

    /// Berlekamp-Massey over the 2t syndromes; returns the locator degree L.
    fn berlekamp_massey(&mut self) -> usize {
        let t2 = 2 * self.params.t();
        let gf = &self.gf;
        let syn = &self.syndromes;
        let sigma = &mut self.sigma;
        let prev = &mut self.prev;
        let tmp = &mut self.sigma_tmp;

        sigma.fill(0);
        prev.fill(0);
        sigma[0] = 1;
        prev[0] = 1;

        let mut l = 0usize;
        let mut b = 1u32;
        let mut shift = 1usize;

        for r in 0..t2 {
            let mut d = syn[r];
            for i in 1..=l {
                if sigma[i] != 0 && syn[r - i] != 0 {
                    d ^= gf.mul(sigma[i], syn[r - i]);
                }
            }
            if d == 0 {
                shift += 1;
                continue;
            }
            let coef = gf.mul(d, gf.inv(b));
            if 2 * l <= r {
                tmp.copy_from_slice(sigma);
                for i in 0..sigma.len().saturating_sub(shift) {
                    if prev[i] != 0 {
                        sigma[i + shift] ^= gf.mul(coef, prev[i]);
                    }
                }
                prev.copy_from_slice(tmp);
                b = d;
                l = r + 1 - l;
                shift = 1;
            } else {
                for i in 0..sigma.len().saturating_sub(shift) {
                    if prev[i] != 0 {
                        sigma[i + shift] ^= gf.mul(coef, prev[i]);
                    }
                }
                shift += 1;
            }
        }
        l
    }

    /// Chien search restricted to the N shortened positions.
    ///
    /// Walks sigma(alpha^(j - (N-1))) for j in [0, N); a vanishing value
    /// marks a bit error at position j. Returns the number of roots found.
    fn chien_search(&mut self, l: usize) -> usize {
        let gf = &self.gf;
        let nf = self.gf.order();
        let n_bits = self.params.n();
        let sigma = &self.sigma;
        let chien = &mut self.chien;
        let err_pos = &mut self.err_pos;

        err_pos.clear();
        for i in 0..=l {
            if sigma[i] == 0 {
                chien[i] = 0;
            } else {
                let e = (i * (n_bits - 1)) % nf;
                chien[i] = gf.mul(sigma[i], gf.alpha_pow((nf - e) % nf));
            }
        }
        for j in 0..n_bits {
            let mut val = 0u32;
            for i in 0..=l {
                val ^= chien[i];
            }
            if val == 0 {
                err_pos.push(j);
                if err_pos.len() == l {
                    return l;
                }
            }
            for i in 1..=l {
                if chien[i] != 0 {
                    chien[i] = gf.mul(chien[i], gf.alpha_pow(i % nf));
                }
            }
        }
        err_pos.len()
    }
}
