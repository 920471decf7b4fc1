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

//! Custom error handling

use super::backend::BackendError;
use crate::{cipher, record::Table};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Cipher(#[from] cipher::Error),
    #[error("No {0} record found for the given identifier")]
    NotFound(Table),
    #[error("The {0} record is encrypted and the store is locked: unlock it first")]
    LockedRecord(Table),
    #[error("The store is encrypted and locked: unlock it with your password before writing")]
    StoreLocked,
    #[error("Encryption is not attached to this store")]
    NotEncrypted,
    #[error("Your kv store may be corrupted. Bad store metadata: {0}")]
    CorruptedMetadata(&'static str),
    #[error("Your kv store may be corrupted. Bad {table} record: {reason}")]
    Corrupted { table: Table, reason: &'static str },
    #[error("Your kv store may be corrupted. Unknown table tag: {0}")]
    UnknownTable(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Serialization error: failed to serialize the store dump")]
    Serialization,
    #[error("Deserialization error: failed to deserialize store dump bytes")]
    Deserialization,
    #[error("Key-value backend error: {0}")]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// A wrong password, a wrong master key or tampered data.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, StoreError::Cipher(cipher::Error::AuthenticationFailed))
    }

    /// Data is present but cannot be read or written until the store is unlocked.
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            StoreError::LockedRecord(_)
                | StoreError::StoreLocked
                | StoreError::Cipher(cipher::Error::NotArmed | cipher::Error::Locked)
        )
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

pub type StoreResult<Success> = Result<Success, StoreError>;
