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

//! Constants for [cipher](crate::cipher)

/// Output length of the SHA-384 digest chained by the key derivation
pub const DIGEST_LEN: usize = 48;
/// Length of a content key and of a derived wrapping key
pub const KEY_LEN: usize = 32;
/// Length of an AES-GCM nonce, of a unit iv and of a derived wrapping iv
pub const IV_LEN: usize = 12;
/// Length of the AES-GCM authentication tag
pub const TAG_LEN: usize = 16;
/// Length of a wrapped content key: the encrypted key followed by its tag
pub const WRAPPED_KEY_LEN: usize = KEY_LEN + TAG_LEN;
/// Length of a persisted unit: wrapped key, iv and big-endian `u32` iteration count
pub const PERSISTED_UNIT_LEN: usize = WRAPPED_KEY_LEN + IV_LEN + 4;

/// Number of chained hashes computed between two clock reads while benchmarking
pub(super) const BENCHMARK_ROUND: u32 = 1024;

pub(super) const IDENTIFIER_NONCE_INFO: &[u8] = b"wallet-kvdb-identifier-nonce";
pub(super) const UNSAFE_PASSWORD: &str = "wallet_unsafe_password";
