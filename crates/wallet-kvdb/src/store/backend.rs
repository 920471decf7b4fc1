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

//! The ordered, transactional byte store underneath the record store. We use [sled].

use sled::transaction::{ConflictableTransactionError, TransactionError};

use super::config::StoreConfig;

/// Errors from the backing engine, surfaced unchanged.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;
pub type BackendResult<Success> = Result<Success, BackendError>;

/// One write of an atomic [TransactionalKv::commit].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

/// A generic ordered byte-key/byte-value store with atomic multi-key commits.
pub trait TransactionalKv: Send + Sync {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>>;

    /// Applies every op or none of them.
    fn commit(&self, ops: Vec<KvOp>) -> BackendResult<()>;

    /// Applies every op or none of them, and only while `key` still holds `expected`. Returns
    /// whether the ops were applied.
    fn commit_if_unchanged(
        &self,
        key: &[u8],
        expected: &[u8],
        ops: Vec<KvOp>,
    ) -> BackendResult<bool>;

    /// Every entry whose key starts with `prefix`, in key order. Entries are collected eagerly,
    /// so writes made while the caller walks the result do not show up in it.
    fn scan_prefix(&self, prefix: &[u8]) -> BackendResult<Vec<(Vec<u8>, Vec<u8>)>>;

    fn flush(&self) -> BackendResult<()>;

    /// Whether the store existed before it was opened.
    fn was_recovered(&self) -> bool;
}

/// [TransactionalKv] on top of a [sled::Db].
pub struct SledKv {
    db: sled::Db,
}

impl SledKv {
    pub fn open(config: &StoreConfig) -> BackendResult<Self> {
        let db = sled::Config::new().path(&config.path).temporary(config.temporary).open()?;
        Ok(Self { db })
    }
}

impl TransactionalKv for SledKv {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    fn commit(&self, ops: Vec<KvOp>) -> BackendResult<()> {
        let mut batch = sled::Batch::default();
        for op in ops {
            match op {
                KvOp::Insert { key, value } => batch.insert(key, value),
                KvOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    fn commit_if_unchanged(
        &self,
        key: &[u8],
        expected: &[u8],
        ops: Vec<KvOp>,
    ) -> BackendResult<bool> {
        let result = self.db.transaction(|tx| {
            if tx.get(key)?.as_deref() != Some(expected) {
                return Err(ConflictableTransactionError::Abort(()));
            }
            for op in &ops {
                match op {
                    KvOp::Insert { key, value } => {
                        tx.insert(key.as_slice(), value.as_slice())?;
                    },
                    KvOp::Remove { key } => {
                        tx.remove(key.as_slice())?;
                    },
                }
            }
            Ok(())
        });
        match result {
            Ok(()) => Ok(true),
            Err(TransactionError::Abort(())) => Ok(false),
            Err(TransactionError::Storage(err)) => Err(err.into()),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> BackendResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self
            .db
            .scan_prefix(prefix)
            .map(|entry| entry.map(|(key, value)| (key.to_vec(), value.to_vec())))
            .collect::<sled::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn flush(&self) -> BackendResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }
}
