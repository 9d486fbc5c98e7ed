//! # Server Selection
//!
//! Maps a key onto one of several ordered servers. The hasher uses fixed
//! seeds so every client built over the same address list picks the same
//! server for the same key, across instances and across processes running the
//! same build.

use std::hash::BuildHasher;

use ahash::RandomState;

const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Returns the index of the server responsible for `key`.
///
/// `servers` must be non-zero; a single server always yields 0.
#[inline]
pub fn select_server(key: &[u8], servers: usize) -> usize {
    debug_assert!(servers > 0, "select_server called with no servers");
    if servers <= 1 {
        return 0;
    }
    let state = RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]);
    (state.hash_one(key) % servers as u64) as usize
}
