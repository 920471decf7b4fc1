// Copyright (C) 2023 Entropy Cryptography Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Handles the generation of a wrapping key for a [super::CipherUnit] from the user's password.
//!
//! The password and the unit's iv are hashed once with SHA-384, then the digest is re-hashed
//! `iterations - 1` more times. The first 32 bytes of the final digest are the wrapping key,
//! the next 12 bytes are the nonce used to wrap the content key.
use std::time::{Duration, Instant};

use sha2::{digest::Output, Digest, Sha384};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{
    constants::{BENCHMARK_ROUND, IV_LEN, KEY_LEN},
    result::{CipherError, CipherResult},
    secret::random_array,
};

/// Key material derived from a password. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl DerivedKey {
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

/// Derives a wrapping key and iv from `password`, a unit `iv` and a work factor.
///
/// This is a pure function of its inputs.
pub fn derive(password: &[u8], iv: &[u8], iterations: u32) -> CipherResult<DerivedKey> {
    if iterations < 1 {
        return Err(CipherError::InvalidInput("iterations must be at least 1".to_string()));
    }
    if password.is_empty() {
        return Err(CipherError::InvalidInput("password must not be empty".to_string()));
    }
    if iv.is_empty() {
        return Err(CipherError::InvalidInput("iv must not be empty".to_string()));
    }

    let mut digest = Sha384::new().chain_update(password).chain_update(iv).finalize();
    chain(&mut digest, iterations - 1);

    let mut derived = DerivedKey { key: [0u8; KEY_LEN], iv: [0u8; IV_LEN] };
    derived.key.copy_from_slice(&digest[..KEY_LEN]);
    derived.iv.copy_from_slice(&digest[KEY_LEN..KEY_LEN + IV_LEN]);
    digest.as_mut_slice().zeroize();
    Ok(derived)
}

/// Runs the chained hash on throwaway input for `duration` and returns how many rounds fit.
pub fn benchmark(duration: Duration) -> u32 {
    // the input does not matter, only the number of rounds
    let seed: [u8; 48] = random_array().unwrap_or([0x5a; 48]);
    let mut digest = Sha384::digest(seed);

    let start = Instant::now();
    let mut iterations: u64 = 0;
    while start.elapsed() < duration {
        chain(&mut digest, BENCHMARK_ROUND);
        iterations += u64::from(BENCHMARK_ROUND);
    }
    std::hint::black_box(&digest);
    u32::try_from(iterations).unwrap_or(u32::MAX)
}

/// [benchmark] for `target`, never returning less than `floor`.
pub fn calibrate(target: Duration, floor: u32) -> u32 {
    let iterations = benchmark(target).max(floor).max(1);
    tracing::debug!("Calibrated key derivation to {} iterations for {:?}", iterations, target);
    iterations
}

fn chain(digest: &mut Output<Sha384>, rounds: u32) {
    for _ in 0..rounds {
        let mut hasher = Sha384::new();
        hasher.update(&*digest);
        hasher.finalize_into(digest);
    }
}
