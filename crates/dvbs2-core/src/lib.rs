//! # DVB-S2 Receiver Core DSP
//!
//! Core algorithms for a DVB-S2 satellite receiver: the outer BCH forward
//! error correction codec and the physical-layer carrier frequency
//! synchronizer. Both are pure, single-threaded computations over caller
//! buffers — no I/O, no background threads, no allocation on the hot path.
//!
//! ## Overview
//!
//! - **BCH codec** ([`bch_codec`]): systematic encoding and hard-decision
//!   algebraic decoding for every outer code in the DVB-S2 table, built on
//!   GF(2^14)/GF(2^16) log tables ([`galois`]). The packed encoder
//!   datapath ingests a message byte per table lookup instead of shifting
//!   bit by bit.
//! - **Frequency synchronizer** ([`freq_sync`]): coarse and fine
//!   normalized carrier offset estimation from PLHEADER, SOF, and pilot
//!   segments, with a latched coarse-corrected state driving the regime
//!   transition. Reference symbols come from [`pl_defs`].
//!
//! ## Signal Flow
//!
//! ```text
//! TX: message bits → BCH encode → (LDPC, modulation, ...)
//! RX: symbols → freq_sync (coarse/fine offset) → derotate → demap
//!     → hard decision → BCH decode → message bits
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dvbs2_core::prelude::*;
//!
//! let params = BchParams::new(3240, 3072).unwrap();
//! let mut codec = BchCodec::new(params).unwrap();
//!
//! let msg = vec![0x3Cu8; params.k() / 8];
//! let mut codeword = vec![0u8; params.n() / 8];
//! codec.encode(&msg, &mut codeword);
//!
//! let mut decoded = vec![0u8; params.k() / 8];
//! assert_eq!(codec.decode(&codeword, &mut decoded).unwrap(), 0);
//! assert_eq!(decoded, msg);
//! ```

pub mod bch_codec;
pub mod bit_packing;
pub mod freq_sync;
pub mod galois;
pub mod pl_defs;

pub use bch_codec::{BchCodec, BchError, BchImpl, BchParams, FecFrame};
pub use freq_sync::FreqSync;
pub use galois::GaloisField;
pub use pl_defs::FINE_FOFFSET_CORR_RANGE;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bch_codec::{BchCodec, BchError, BchImpl, BchParams, FecFrame};
    pub use crate::freq_sync::FreqSync;
    pub use crate::pl_defs::FINE_FOFFSET_CORR_RANGE;
}
