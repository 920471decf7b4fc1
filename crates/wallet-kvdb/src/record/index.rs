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

//! The blind index: a short hash of a plaintext identifier which is stored in the clear as part
//! of every storage key, so records can be found without decrypting their identifiers.
//!
//! The hash is salted per store but not keyed by a secret, so equal identifiers within one store
//! have equal indices whether or not they are encrypted.
use blake2::{
    digest::{consts::U8, Digest},
    Blake2b,
};

use crate::cipher::{self, random_array};

pub const INDEX_LEN: usize = 8;
pub const INDEX_SALT_LEN: usize = 16;

type Blake2b64 = Blake2b<U8>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlindIndex {
    salt: [u8; INDEX_SALT_LEN],
}

impl BlindIndex {
    pub fn new(salt: [u8; INDEX_SALT_LEN]) -> Self {
        Self { salt }
    }

    pub fn random() -> cipher::Result<Self> {
        Ok(Self { salt: random_array()? })
    }

    pub fn salt(&self) -> &[u8; INDEX_SALT_LEN] {
        &self.salt
    }

    pub fn hash(&self, identifier: &[u8]) -> [u8; INDEX_LEN] {
        let digest = Blake2b64::new().chain_update(self.salt).chain_update(identifier).finalize();
        let mut index = [0u8; INDEX_LEN];
        index.copy_from_slice(&digest);
        index
    }
}
