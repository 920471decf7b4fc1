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

//! Export and import of whole stores. A dump holds the raw entries, so encrypted records stay
//! encrypted and the master keys and index salt travel with them.

use serde::{Deserialize, Serialize};

use super::{
    backend::{KvOp, SledKv, TransactionalKv},
    config::StoreConfig,
    constants::{INDEX_SALT_KEY, MAX_DUMP_LEN, METADATA_PREFIX},
    db::EncryptedStore,
    result::{StoreError, StoreResult},
};
use crate::{
    kv_manager::helpers::{deserialize, serialize},
    record::table_of,
};

const DUMP_VERSION: u8 = 1;

#[derive(Serialize, Deserialize, Debug)]
struct StoreDump {
    version: u8,
    entries: Vec<DumpEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
struct DumpEntry {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl<K: TransactionalKv> EncryptedStore<K> {
    pub fn export(&self) -> StoreResult<Vec<u8>> {
        // master keys must not change under us
        let _keyring = self.keyring.read();
        let entries = self
            .kv
            .scan_prefix(&[])?
            .into_iter()
            .map(|(key, value)| DumpEntry { key, value })
            .collect();
        serialize(&StoreDump { version: DUMP_VERSION, entries }, MAX_DUMP_LEN)
    }

    /// Fills the empty backend `kv` with a dump made by [EncryptedStore::export] and opens it.
    pub fn import(kv: K, config: StoreConfig, dump: &[u8]) -> StoreResult<Self> {
        let dump: StoreDump = deserialize(dump, MAX_DUMP_LEN)?;
        if dump.version != DUMP_VERSION {
            tracing::warn!("Unsupported store dump version {}", dump.version);
            return Err(StoreError::Deserialization);
        }
        if !kv.scan_prefix(&[])?.is_empty() {
            return Err(StoreError::InvalidInput("can only import into an empty store".to_string()));
        }

        let mut ops = Vec::with_capacity(dump.entries.len());
        for DumpEntry { key, value } in dump.entries {
            if key.starts_with(METADATA_PREFIX) {
                if key != INDEX_SALT_KEY {
                    return Err(StoreError::CorruptedMetadata("unknown metadata key in dump"));
                }
            } else {
                table_of(&key)?;
            }
            ops.push(KvOp::Insert { key, value });
        }
        kv.commit(ops)?;
        Self::with_backend(kv, config)
    }
}

impl EncryptedStore<SledKv> {
    /// [EncryptedStore::import] into a new sled database at `config.path`.
    pub fn open_from_dump(config: StoreConfig, dump: &[u8]) -> StoreResult<Self> {
        let kv = SledKv::open(&config)?;
        Self::import(kv, config, dump)
    }
}
