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

//! The encrypted wallet store.
//!
//! A store starts out plaintext. [EncryptedStore::attach_encryption] generates a master key and
//! encrypts every record; from then on the store opens locked and records can only be read or
//! written after [EncryptedStore::unlock].

mod backend;
mod config;
mod constants;
mod db;
mod dump;
mod keyring;
mod migrate;
mod result;

pub use backend::{BackendError, BackendResult, KvOp, SledKv, TransactionalKv};
pub use config::StoreConfig;
pub use db::EncryptedStore;
pub use migrate::{FailedRecord, MigrationReport, TransformOptions};
pub use result::{StoreError as Error, StoreResult as Result};
