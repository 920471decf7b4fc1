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

//! Async handle around an [EncryptedStore](crate::store::EncryptedStore).
//!
//! The store is moved onto a blocking worker which serves commands using the "actor" pattern
//! ([KvManager] is the "handle"): <https://ryhl.io/blog/actors-with-tokio/>
//! See <https://tokio.rs/tokio/tutorial/channels> for tokio channels.

/// Custom error types for the handle
pub mod error;
pub mod helpers;
/// public API of the handle
mod kv;
/// commands sent to the worker
mod types;

pub use kv::KvManager;

#[cfg(test)]
mod tests;
