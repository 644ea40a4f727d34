//! PLFRAME Frequency Synchronizer
//!
//! Data-aided estimation of the carrier frequency offset disturbing DVB-S2
//! PLFRAMEs. The synchronizer only estimates; an external rotator applies
//! the corrections (closed-loop operation). Phase estimates therefore
//! assume the input symbols are no longer rotating, except for the
//! open-loop option of [`FreqSync::derotate_plheader`].
//!
//! The coarse estimate accumulates lag-1 autocorrelation evidence from the
//! known PLHEADER (or SOF only, before the PLSC is decoded) over `period`
//! consecutive frames. Once the coarse estimate magnitude falls below
//! [`FINE_FOFFSET_CORR_RANGE`](crate::pl_defs::FINE_FOFFSET_CORR_RANGE),
//! the synchronizer latches the coarse-corrected state and pilot-aided
//! fine estimation becomes meaningful: the phases of the PLHEADER and of
//! every 36-symbol pilot block are estimated per frame, and their wrapped
//! differences over the known segment spacing yield the fine offset.
//!
//! All frequency offsets are normalized (cycles/symbol).
//!
//! ## Example
//!
//! ```rust
//! use dvbs2_core::freq_sync::FreqSync;
//! use dvbs2_core::pl_defs::{plheader_symbols, PLHEADER_LEN};
//! use num_complex::Complex64;
//! use std::f64::consts::TAU;
//!
//! let mut sync = FreqSync::new(2);
//! let mut header = [Complex64::default(); PLHEADER_LEN];
//! plheader_symbols(0, &mut header);
//! for (k, s) in header.iter_mut().enumerate() {
//!     *s *= Complex64::from_polar(1.0, TAU * 1e-4 * k as f64);
//! }
//! assert!(!sync.estimate_coarse(&header, true, 0));
//! assert!(sync.estimate_coarse(&header, true, 0));
//! assert!((sync.coarse_foffset() - 1e-4).abs() < 1e-9);
//! assert!(sync.is_coarse_corrected());
//! ```

use crate::pl_defs::{
    plheader_symbols, sof_symbols, FINE_FOFFSET_CORR_RANGE, MAX_PILOT_BLKS, PILOT_BLK_INTERVAL,
    PILOT_BLK_LEN, PILOT_SYMBOL, PLHEADER_LEN, SOF_LEN,
};
use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

/// Wrap a phase into (-pi, pi].
#[inline]
fn wrap_phase(mut x: f64) -> f64 {
    while x > PI {
        x -= TAU;
    }
    while x <= -PI {
        x += TAU;
    }
    x
}

/// Kay's minimum-variance weights for lag-1 phase increments of an
/// N-symbol sequence. The parabolic window sums to one, so the weighted
/// increment average is an unbiased angle estimate.
fn kay_window(n: usize) -> Vec<f64> {
    let nf = n as f64;
    (1..n)
        .map(|i| 6.0 * (i as f64) * (nf - i as f64) / (nf * (nf * nf - 1.0)))
        .collect()
}

/// Carrier frequency offset estimator for DVB-S2 PLFRAMEs.
///
/// Owns all of its accumulator buffers; nothing allocates after
/// construction. Safe to move between threads, not meant for shared
/// mutation.
#[derive(Debug, Clone)]
pub struct FreqSync {
    /// Coarse estimation periodicity in frames.
    period: u32,
    /// Frame counter within the current coarse window.
    i_frame: u32,
    coarse_foffset: f64,
    coarse_corrected: bool,
    fine_foffset: f64,
    fine_est_ready: bool,
    /// Weighted angle-difference average behind the last fine estimate.
    w_angle_avg: f64,
    /// Reference PLHEADER/SOF symbols for the frame being processed.
    ref_plheader: Vec<Complex64>,
    /// Modulation-removed received symbols.
    mod_rm: Vec<Complex64>,
    /// Lag-1 autocorrelation accumulators over the coarse window.
    pilot_corr: Vec<Complex64>,
    /// Autocorrelation angles (phase increments).
    angle_diff: Vec<f64>,
    /// Increment weights for the full 90-symbol PLHEADER.
    w_window_f: Vec<f64>,
    /// Increment weights for the 26-symbol SOF.
    w_window_s: Vec<f64>,
    /// PLHEADER phase (index 0) and pilot-block phases (1..).
    angle_pilot: Vec<f64>,
    /// Span-normalized pilot angle differences.
    angle_diff_f: Vec<f64>,
    /// De-rotated PLHEADER.
    pp_plheader: Vec<Complex64>,
}

impl FreqSync {
    /// Create a synchronizer that refreshes the coarse estimate every
    /// `period` PLFRAMEs.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(period: u32) -> Self {
        assert!(period >= 1, "estimation period must be at least one frame");
        Self {
            period,
            i_frame: 0,
            coarse_foffset: 0.0,
            coarse_corrected: false,
            fine_foffset: 0.0,
            fine_est_ready: false,
            w_angle_avg: 0.0,
            ref_plheader: vec![Complex64::default(); PLHEADER_LEN],
            mod_rm: vec![Complex64::default(); PLHEADER_LEN],
            pilot_corr: vec![Complex64::default(); PLHEADER_LEN - 1],
            angle_diff: vec![0.0; PLHEADER_LEN - 1],
            w_window_f: kay_window(PLHEADER_LEN),
            w_window_s: kay_window(SOF_LEN),
            angle_pilot: vec![0.0; 1 + MAX_PILOT_BLKS],
            angle_diff_f: vec![0.0; MAX_PILOT_BLKS],
            pp_plheader: vec![Complex64::default(); PLHEADER_LEN],
        }
    }

    /// Data-aided coarse frequency offset estimation.
    ///
    /// Accumulates one frame of autocorrelation evidence and returns true
    /// exactly on the `period`-th accumulation, when the estimate is
    /// refreshed and the frame counter wraps.
    ///
    /// With `full_plheader` unset only the 26 SOF symbols are used, so the
    /// PLSC does not need to be decoded yet; otherwise the full 90-symbol
    /// reference is rebuilt from `plsc`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is shorter than the reference in use.
    pub fn estimate_coarse(&mut self, frame: &[Complex64], full_plheader: bool, plsc: u8) -> bool {
        let n = if full_plheader { PLHEADER_LEN } else { SOF_LEN };
        assert!(frame.len() >= n, "frame slice shorter than the reference");

        if full_plheader {
            plheader_symbols(plsc, &mut self.ref_plheader);
        } else {
            sof_symbols(&mut self.ref_plheader);
        }

        // Remove the known modulation, leaving the offset sinusoid.
        for k in 0..n {
            self.mod_rm[k] = frame[k] * self.ref_plheader[k].conj();
        }
        let l = n - 1;
        for m in 0..l {
            self.pilot_corr[m] += self.mod_rm[m + 1] * self.mod_rm[m].conj();
        }

        self.i_frame += 1;
        if self.i_frame < self.period {
            return false;
        }

        for m in 0..l {
            self.angle_diff[m] = self.pilot_corr[m].arg();
        }
        let window = if full_plheader { &self.w_window_f } else { &self.w_window_s };
        let theta: f64 = window
            .iter()
            .zip(self.angle_diff.iter())
            .map(|(w, a)| w * a)
            .sum();
        self.coarse_foffset = theta / TAU;
        tracing::debug!(
            coarse_foffset = self.coarse_foffset,
            full_plheader,
            "coarse frequency offset estimate"
        );

        if !self.coarse_corrected && self.coarse_foffset.abs() < FINE_FOFFSET_CORR_RANGE {
            self.coarse_corrected = true;
            tracing::debug!("coarse frequency correction achieved");
        }

        self.i_frame = 0;
        self.pilot_corr.fill(Complex64::default());
        true
    }

    /// Average phase of the received SOF, in (-pi, pi].
    pub fn estimate_sof_phase(&mut self, sof: &[Complex64]) -> f64 {
        assert!(sof.len() >= SOF_LEN, "SOF slice too short");
        sof_symbols(&mut self.ref_plheader);
        let sum: Complex64 = sof
            .iter()
            .zip(self.ref_plheader.iter())
            .take(SOF_LEN)
            .map(|(r, p)| r * p.conj())
            .sum();
        sum.arg()
    }

    /// Average phase of the received PLHEADER, in (-pi, pi].
    ///
    /// The estimate is fully data-aided through `plsc` and is stored as
    /// the frame's segment-0 phase for the fine estimator.
    pub fn estimate_plheader_phase(&mut self, plheader: &[Complex64], plsc: u8) -> f64 {
        assert!(plheader.len() >= PLHEADER_LEN, "PLHEADER slice too short");
        plheader_symbols(plsc, &mut self.ref_plheader);
        let sum: Complex64 = plheader
            .iter()
            .zip(self.ref_plheader.iter())
            .take(PLHEADER_LEN)
            .map(|(r, p)| r * p.conj())
            .sum();
        let angle = sum.arg();
        self.angle_pilot[0] = angle;
        angle
    }

    /// Average phase of pilot block `i_blk`, in (-pi, pi].
    ///
    /// `frame` must hold the 90 PLHEADER symbols followed by the frame's
    /// pilot blocks back to back; block `i_blk` starts at offset
    /// 90 + 36 * i_blk. The estimate is stored for the fine estimator.
    ///
    /// # Panics
    ///
    /// Panics if `i_blk` is out of range or `frame` is too short.
    pub fn estimate_pilot_phase(&mut self, frame: &[Complex64], i_blk: usize) -> f64 {
        assert!(i_blk < MAX_PILOT_BLKS, "pilot block index out of range");
        let start = PLHEADER_LEN + i_blk * PILOT_BLK_LEN;
        assert!(frame.len() >= start + PILOT_BLK_LEN, "frame slice too short");

        let sum: Complex64 = frame[start..start + PILOT_BLK_LEN]
            .iter()
            .map(|s| s * PILOT_SYMBOL.conj())
            .sum();
        let angle = sum.arg();
        self.angle_pilot[i_blk + 1] = angle;
        angle
    }

    /// Pilot-aided fine frequency offset estimation.
    ///
    /// Forms the wrapped phase differences between consecutive segments
    /// (PLHEADER to pilot 0 spans 1440 + 90 symbols, pilot to pilot
    /// 1440 + 36), normalizes each by its span, and averages. Requires the
    /// coarse-corrected state and the segment phases of the current frame.
    ///
    /// # Panics
    ///
    /// Panics when called before coarse correction or with a pilot block
    /// count outside 1..=22 — both are caller-graph bugs.
    pub fn estimate_fine_pilot_mode(&mut self, n_pilot_blks: usize) {
        assert!(
            self.coarse_corrected,
            "fine estimation requires the coarse-corrected state"
        );
        assert!(
            (1..=MAX_PILOT_BLKS).contains(&n_pilot_blks),
            "pilot block count out of range"
        );

        let mut acc = 0.0;
        for i in 0..n_pilot_blks {
            let span = if i == 0 {
                (PILOT_BLK_INTERVAL + PLHEADER_LEN) as f64
            } else {
                (PILOT_BLK_INTERVAL + PILOT_BLK_LEN) as f64
            };
            let diff = wrap_phase(self.angle_pilot[i + 1] - self.angle_pilot[i]);
            self.angle_diff_f[i] = diff / span;
            acc += self.angle_diff_f[i];
        }
        self.w_angle_avg = acc / n_pilot_blks as f64;
        self.fine_foffset = self.w_angle_avg / TAU;
        self.fine_est_ready = true;
        tracing::debug!(
            fine_foffset = self.fine_foffset,
            n_pilot_blks,
            "fine frequency offset estimate"
        );
    }

    /// De-rotate the PLHEADER by the last PLHEADER phase estimate.
    ///
    /// In closed loop (`open_loop = false`) the symbols are assumed
    /// frequency-corrected already and only the constant phase is removed.
    /// In open loop the most recent coarse offset estimate is assumed
    /// still uncorrected, so each symbol is additionally counter-rotated
    /// by e^(-j 2 pi coarse k). The result is kept internally; see
    /// [`FreqSync::plheader`].
    pub fn derotate_plheader(&mut self, plheader: &[Complex64], open_loop: bool) {
        assert!(plheader.len() >= PLHEADER_LEN, "PLHEADER slice too short");
        let base = Complex64::from_polar(1.0, -self.angle_pilot[0]);
        if open_loop {
            for k in 0..PLHEADER_LEN {
                let spin = Complex64::from_polar(1.0, -TAU * self.coarse_foffset * k as f64);
                self.pp_plheader[k] = plheader[k] * base * spin;
            }
        } else {
            for k in 0..PLHEADER_LEN {
                self.pp_plheader[k] = plheader[k] * base;
            }
        }
    }

    /// Most recent normalized coarse frequency offset estimate.
    pub fn coarse_foffset(&self) -> f64 {
        self.coarse_foffset
    }

    /// Most recent normalized fine frequency offset estimate.
    pub fn fine_foffset(&self) -> f64 {
        self.fine_foffset
    }

    /// Whether the residual offset is low enough for fine estimation.
    ///
    /// Latches on the first coarse estimate whose magnitude falls below
    /// the fine-estimation ceiling and stays set until [`FreqSync::reset`].
    pub fn is_coarse_corrected(&self) -> bool {
        self.coarse_corrected
    }

    /// Whether a fine frequency offset estimate has been produced yet.
    pub fn has_fine_foffset_est(&self) -> bool {
        self.fine_est_ready
    }

    /// Last PLHEADER phase estimate, in (-pi, pi].
    pub fn plheader_phase(&self) -> f64 {
        self.angle_pilot[0]
    }

    /// Phase estimate of pilot block `i_blk`, in (-pi, pi].
    pub fn pilot_phase(&self, i_blk: usize) -> f64 {
        assert!(i_blk < MAX_PILOT_BLKS, "pilot block index out of range");
        self.angle_pilot[i_blk + 1]
    }

    /// The de-rotated PLHEADER written by [`FreqSync::derotate_plheader`].
    pub fn plheader(&self) -> &[Complex64] {
        &self.pp_plheader
    }

    /// Return to the initial state (estimates cleared, lock dropped).
    pub fn reset(&mut self) {
        self.i_frame = 0;
        self.coarse_foffset = 0.0;
        self.coarse_corrected = false;
        self.fine_foffset = 0.0;
        self.fine_est_ready = false;
        self.w_angle_avg = 0.0;
        self.pilot_corr.fill(Complex64::default());
        self.angle_pilot.fill(0.0);
        self.pp_plheader.fill(Complex64::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Seeded xorshift64 + Box-Muller AWGN for reproducible channel noise.
    struct Noise(u64);

    impl Noise {
        fn new(seed: u64) -> Self {
            Self(seed.max(1))
        }

        fn uniform(&mut self) -> f64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        fn gaussian(&mut self) -> f64 {
            let u1 = self.uniform().max(1e-300);
            let u2 = self.uniform();
            (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
        }

        /// Add complex AWGN for the given Es/N0 (unit symbol energy).
        fn add_awgn(&mut self, symbols: &mut [Complex64], esn0_db: f64) {
            let sigma = (10f64.powf(-esn0_db / 10.0) / 2.0).sqrt();
            for s in symbols.iter_mut() {
                *s += Complex64::new(sigma * self.gaussian(), sigma * self.gaussian());
            }
        }
    }

    /// PLHEADER rotated by a normalized offset and initial phase.
    fn rotated_plheader(plsc: u8, foffset: f64, phase0: f64) -> Vec<Complex64> {
        let mut header = vec![Complex64::default(); PLHEADER_LEN];
        plheader_symbols(plsc, &mut header);
        for (k, s) in header.iter_mut().enumerate() {
            *s *= Complex64::from_polar(1.0, phase0 + TAU * foffset * k as f64);
        }
        header
    }

    /// Compacted frame buffer (PLHEADER + pilot blocks back to back) with
    /// phases that follow the absolute symbol positions of a real PLFRAME.
    fn pilot_frame(plsc: u8, foffset: f64, phase0: f64, n_blks: usize) -> Vec<Complex64> {
        let mut frame = rotated_plheader(plsc, foffset, phase0);
        for blk in 0..n_blks {
            let abs_start = PLHEADER_LEN + PILOT_BLK_INTERVAL
                + blk * (PILOT_BLK_INTERVAL + PILOT_BLK_LEN);
            for j in 0..PILOT_BLK_LEN {
                let rot =
                    Complex64::from_polar(1.0, phase0 + TAU * foffset * (abs_start + j) as f64);
                frame.push(PILOT_SYMBOL * rot);
            }
        }
        frame
    }

    #[test]
    fn test_coarse_full_plheader_noiseless() {
        let mut sync = FreqSync::new(10);
        let f = 1e-3;
        for frame in 0..10 {
            let header = rotated_plheader(21, f, 0.3 * frame as f64);
            let refreshed = sync.estimate_coarse(&header, true, 21);
            assert_eq!(refreshed, frame == 9, "refresh flag wrong on frame {frame}");
        }
        assert!((sync.coarse_foffset() - f).abs() < 1e-9);
        assert!(!sync.is_coarse_corrected());
    }

    #[test]
    fn test_coarse_sof_only_noiseless() {
        let mut sync = FreqSync::new(4);
        let f = 2e-3;
        for _ in 0..3 {
            assert!(!sync.estimate_coarse(&rotated_plheader(0, f, 1.0), false, 0));
        }
        assert!(sync.estimate_coarse(&rotated_plheader(0, f, -0.5), false, 0));
        assert!((sync.coarse_foffset() - f).abs() < 1e-9);
    }

    #[test]
    fn test_coarse_refresh_period_wraps() {
        let mut sync = FreqSync::new(3);
        let header = rotated_plheader(5, 4e-4, 0.0);
        for window in 0..2 {
            for frame in 0..3 {
                let refreshed = sync.estimate_coarse(&header, true, 5);
                assert_eq!(refreshed, frame == 2, "window {window}, frame {frame}");
            }
        }
    }

    #[test]
    fn test_coarse_noisy_10db() {
        let mut sync = FreqSync::new(10);
        let mut noise = Noise::new(0xC0A12);
        let f = 5e-3;
        for frame in 0..10 {
            let mut header = rotated_plheader(60, f, 0.7 * frame as f64);
            noise.add_awgn(&mut header, 10.0);
            sync.estimate_coarse(&header, true, 60);
        }
        assert!(
            (sync.coarse_foffset() - f).abs() < 2e-4,
            "coarse estimate {} too far from {f}",
            sync.coarse_foffset()
        );
    }

    #[test]
    fn test_coarse_corrected_threshold() {
        // Below the fine-estimation ceiling the state latches...
        let mut sync = FreqSync::new(10);
        for _ in 0..10 {
            sync.estimate_coarse(&rotated_plheader(0, 2e-4, 0.0), true, 0);
        }
        assert!(sync.is_coarse_corrected());

        // ...above it, it does not.
        let mut sync = FreqSync::new(10);
        for _ in 0..10 {
            sync.estimate_coarse(&rotated_plheader(0, 1e-3, 0.0), true, 0);
        }
        assert!(!sync.is_coarse_corrected());
    }

    #[test]
    fn test_coarse_corrected_latches() {
        let mut sync = FreqSync::new(1);
        sync.estimate_coarse(&rotated_plheader(0, 1e-4, 0.0), true, 0);
        assert!(sync.is_coarse_corrected());

        // A later large estimate must not drop the lock.
        sync.estimate_coarse(&rotated_plheader(0, 1e-2, 0.0), true, 0);
        assert!((sync.coarse_foffset() - 1e-2).abs() < 1e-4);
        assert!(sync.is_coarse_corrected());
    }

    #[test]
    fn test_fine_pilot_mode_noiseless() {
        let mut sync = FreqSync::new(10);
        let f = 1e-4;
        for _ in 0..10 {
            sync.estimate_coarse(&rotated_plheader(0, f, 0.0), true, 0);
        }
        assert!(sync.is_coarse_corrected());
        assert!(!sync.has_fine_foffset_est());

        let n_blks = 22;
        let frame = pilot_frame(0, f, 0.25, n_blks);
        sync.estimate_plheader_phase(&frame, 0);
        for blk in 0..n_blks {
            sync.estimate_pilot_phase(&frame, blk);
        }
        sync.estimate_fine_pilot_mode(n_blks);

        assert!(sync.has_fine_foffset_est());
        assert!(
            (sync.fine_foffset() - f).abs() < 3e-5,
            "fine estimate {} too far from {f}",
            sync.fine_foffset()
        );
    }

    #[test]
    fn test_fine_pilot_mode_noisy_10db() {
        let mut sync = FreqSync::new(1);
        let mut noise = Noise::new(0xF13E);
        let f = -2.5e-4;
        sync.estimate_coarse(&rotated_plheader(0, f, 0.0), true, 0);
        assert!(sync.is_coarse_corrected());

        let n_blks = 10;
        let mut frame = pilot_frame(0, f, -1.1, n_blks);
        noise.add_awgn(&mut frame, 10.0);
        sync.estimate_plheader_phase(&frame, 0);
        for blk in 0..n_blks {
            sync.estimate_pilot_phase(&frame, blk);
        }
        sync.estimate_fine_pilot_mode(n_blks);

        assert!(
            (sync.fine_foffset() - f).abs() < 3e-5,
            "fine estimate {} too far from {f}",
            sync.fine_foffset()
        );
    }

    #[test]
    fn test_fine_handles_wrapping_segment_phases() {
        // Near the estimation ceiling the absolute phases wind through
        // many turns; only the wrapped differences matter.
        let mut sync = FreqSync::new(1);
        let f = 3e-4;
        sync.estimate_coarse(&rotated_plheader(0, f, 0.0), true, 0);
        assert!(sync.is_coarse_corrected());

        let n_blks = 15;
        let frame = pilot_frame(0, f, 3.0, n_blks);
        sync.estimate_plheader_phase(&frame, 0);
        for blk in 0..n_blks {
            sync.estimate_pilot_phase(&frame, blk);
        }
        sync.estimate_fine_pilot_mode(n_blks);
        assert!((sync.fine_foffset() - f).abs() < 3e-5);
    }

    #[test]
    #[should_panic(expected = "coarse-corrected")]
    fn test_fine_before_coarse_lock_panics() {
        let mut sync = FreqSync::new(10);
        sync.estimate_fine_pilot_mode(4);
    }

    #[test]
    fn test_phase_estimates_and_storage() {
        let mut sync = FreqSync::new(1);
        let phase = 0.5;
        let frame = pilot_frame(33, 0.0, phase, 3);

        let sof_phase = sync.estimate_sof_phase(&frame);
        assert!((sof_phase - phase).abs() < 1e-9);

        let hdr_phase = sync.estimate_plheader_phase(&frame, 33);
        assert!((hdr_phase - phase).abs() < 1e-9);
        assert!((sync.plheader_phase() - phase).abs() < 1e-9);

        for blk in 0..3 {
            let p = sync.estimate_pilot_phase(&frame, blk);
            assert!((p - phase).abs() < 1e-9, "pilot block {blk}");
            assert_eq!(sync.pilot_phase(blk), p);
        }
    }

    #[test]
    fn test_derotate_plheader_closed_loop() {
        let mut sync = FreqSync::new(1);
        let phase = -0.8;
        let header = rotated_plheader(7, 0.0, phase);
        sync.estimate_plheader_phase(&header, 7);
        sync.derotate_plheader(&header, false);

        let mut reference = vec![Complex64::default(); PLHEADER_LEN];
        plheader_symbols(7, &mut reference);
        for (pp, r) in sync.plheader().iter().zip(reference.iter()) {
            assert!((pp - r).norm() < 1e-9);
        }
    }

    #[test]
    fn test_derotate_plheader_open_loop() {
        let mut sync = FreqSync::new(5);
        let f = 1e-3;
        for _ in 0..5 {
            sync.estimate_coarse(&rotated_plheader(7, f, 0.0), true, 7);
        }
        assert!((sync.coarse_foffset() - f).abs() < 1e-9);

        let header = rotated_plheader(7, f, 0.0);
        sync.estimate_plheader_phase(&header, 7);
        sync.derotate_plheader(&header, true);

        // Open-loop derotation removes the progressive rotation: the
        // residual phase against the reference must be constant over the
        // header, up to numerical noise.
        let mut reference = vec![Complex64::default(); PLHEADER_LEN];
        plheader_symbols(7, &mut reference);
        let residuals: Vec<f64> = sync
            .plheader()
            .iter()
            .zip(reference.iter())
            .map(|(pp, r)| (pp * r.conj()).arg())
            .collect();
        let first = residuals[0];
        for (k, r) in residuals.iter().enumerate() {
            assert!(
                wrap_phase(r - first).abs() < 1e-6,
                "residual ramp at symbol {k}"
            );
        }
    }

    #[test]
    fn test_reset_drops_lock() {
        let mut sync = FreqSync::new(1);
        sync.estimate_coarse(&rotated_plheader(0, 1e-4, 0.0), true, 0);
        assert!(sync.is_coarse_corrected());

        sync.reset();
        assert!(!sync.is_coarse_corrected());
        assert!(!sync.has_fine_foffset_est());
        assert_eq!(sync.coarse_foffset(), 0.0);
        assert_eq!(sync.fine_foffset(), 0.0);
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(0.0)).abs() < 1e-12);
        assert!((wrap_phase(PI + 0.2) - (-PI + 0.2)).abs() < 1e-12);
        assert!((wrap_phase(-PI - 0.2) - (PI - 0.2)).abs() < 1e-12);
        assert!((wrap_phase(PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(3.0 * TAU + 0.1) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_kay_window_sums_to_one() {
        for n in [SOF_LEN, PLHEADER_LEN] {
            let sum: f64 = kay_window(n).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "window for n = {n}");
        }
    }
}
