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

//! Password-based key derivation and the [CipherUnit] lifecycle. Record values are encrypted
//! with AES-256-GCM under a random content key; the content key itself is stored wrapped under a
//! key derived from the user's password by chained SHA-384.

pub mod constants;
pub mod kdf;
mod password;
mod result;
mod secret;
mod unit;

pub use password::{Password, PasswordMethod};
pub use result::{CipherError as Error, CipherResult as Result};
pub use secret::SecretBytes;
pub use unit::{CipherUnit, UnitState, WrappedKey};

pub(crate) use secret::random_array;

#[cfg(test)]
mod tests;
