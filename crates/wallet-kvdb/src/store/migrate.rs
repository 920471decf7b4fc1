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

//! Bulk transforms between a plaintext and an encrypted store.
//!
//! A transform walks a snapshot of every encryptable table and rewrites one record per commit, so
//! an interrupted run leaves the store in a mixed state that reads tolerate and that the next run
//! picks up from. Records already in the target state are skipped. Each swap only applies while
//! the record is still what the scan saw, so a record another writer changed in the meantime is
//! left as that writer put it.

use parking_lot::{RwLockUpgradableReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

use super::{
    backend::{KvOp, TransactionalKv},
    db::EncryptedStore,
    keyring::Keyring,
    result::{StoreError, StoreResult},
};
use crate::{
    cipher::{self, CipherUnit, Password},
    record::{is_encrypted, RecordCodec, Table},
};

#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Checked between records. A cancelled transform keeps its progress.
    pub cancel: CancellationToken,
    /// Max number of records to migrate in this call
    pub limit: Option<usize>,
}

impl TransformOptions {
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A record a transform could not migrate. It is left as it was.
#[derive(Debug)]
pub struct FailedRecord {
    pub table: Table,
    pub key: Vec<u8>,
    pub error: StoreError,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub migrated: usize,
    /// Records found already in the target state
    pub skipped: usize,
    /// Records rewritten or erased by another writer between the scan and their migration. Left
    /// as that writer put them.
    pub superseded: usize,
    pub failed: Vec<FailedRecord>,
    /// Cancelled or out of budget before the end of the scan
    pub interrupted: bool,
}

impl MigrationReport {
    /// Every record of the store is in the target state.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.interrupted
    }

    /// Folds in a second pass over the same tables. Its skips are records this report already
    /// counted.
    fn merge(&mut self, other: MigrationReport) {
        self.migrated += other.migrated;
        self.superseded += other.superseded;
        self.failed.extend(other.failed);
        self.interrupted |= other.interrupted;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

impl<K: TransactionalKv> EncryptedStore<K> {
    /// Encrypts every plaintext record.
    ///
    /// On a plaintext store this generates a master key from `password`, persists it, and makes it
    /// active before any record is touched. On an encrypted store `password` must open one of the
    /// attached master keys, which makes a rerun resume an interrupted transform.
    #[tracing::instrument(skip_all)]
    pub fn attach_encryption(
        &self,
        password: &Password,
        options: &TransformOptions,
    ) -> StoreResult<MigrationReport> {
        let mut keyring = self.keyring.write();
        if !keyring.is_encrypted() {
            let unit = CipherUnit::generate(password, self.config.kdf_iterations())?;
            self.kv.commit(vec![self.master_key_insert(&unit)?])?;
            keyring.add(unit);
            tracing::info!("Generated a new master key");
        } else if !keyring.unlock(password)? {
            return Err(cipher::Error::AuthenticationFailed.into());
        }

        // Writers may run alongside; with a unit active they only ever write encrypted records.
        let keyring = RwLockWriteGuard::downgrade(keyring);
        self.transform(&keyring, Direction::Encrypt, options)
    }

    /// Decrypts every encrypted record, then erases all master keys once nothing encrypted is
    /// left. An incomplete run keeps the master keys so it can be resumed.
    #[tracing::instrument(skip_all)]
    pub fn remove_encryption(
        &self,
        password: &Password,
        options: &TransformOptions,
    ) -> StoreResult<MigrationReport> {
        let mut keyring = self.keyring.write();
        if !keyring.is_encrypted() {
            return Ok(MigrationReport::default());
        }
        if !keyring.unlock(password)? {
            return Err(cipher::Error::AuthenticationFailed.into());
        }

        let keyring = RwLockWriteGuard::downgrade_to_upgradable(keyring);
        let mut report = self.transform(&keyring, Direction::Decrypt, options)?;
        if !report.is_complete() {
            return Ok(report);
        }

        // Concurrent writers encrypt under the active unit; catch their records without them.
        let mut keyring = RwLockUpgradableReadGuard::upgrade(keyring);
        let rest = TransformOptions { cancel: options.cancel.clone(), limit: None };
        report.merge(self.transform(&keyring, Direction::Decrypt, &rest)?);
        if !report.is_complete() {
            return Ok(report);
        }

        let codec = self.codec();
        let ops = keyring
            .units()
            .iter()
            .map(|unit| {
                let key = codec.storage_key(Table::MasterKey, unit.wrapped().iv(), None)?;
                Ok(KvOp::Remove { key })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        self.kv.commit(ops)?;
        keyring.clear();
        tracing::info!("Removed encryption from the store");
        Ok(report)
    }

    fn transform(
        &self,
        keyring: &Keyring,
        direction: Direction,
        options: &TransformOptions,
    ) -> StoreResult<MigrationReport> {
        let units = keyring.armed();
        let target = match direction {
            Direction::Encrypt => Some(keyring.active().ok_or(StoreError::StoreLocked)?),
            Direction::Decrypt => None,
        };
        let codec = self.codec();
        let mut report = MigrationReport::default();

        'tables: for table in Table::ENCRYPTABLE {
            for (key, value) in self.kv.scan_prefix(table.tag())? {
                let encrypted = match is_encrypted(table, &value) {
                    Ok(encrypted) => encrypted,
                    Err(error) => {
                        tracing::warn!("Skipping unreadable {} record: {}", table, error);
                        report.failed.push(FailedRecord { table, key, error });
                        continue;
                    },
                };
                if encrypted == (direction == Direction::Encrypt) {
                    report.skipped += 1;
                    continue;
                }
                if options.cancel.is_cancelled()
                    || options.limit.is_some_and(|limit| report.migrated >= limit)
                {
                    report.interrupted = true;
                    break 'tables;
                }
                match migrate_record(&self.kv, &codec, &key, &value, &units, target) {
                    Ok(true) => report.migrated += 1,
                    Ok(false) => report.superseded += 1,
                    Err(error) => {
                        tracing::warn!("Failed to migrate {} record: {}", table, error);
                        report.failed.push(FailedRecord { table, key, error });
                    },
                }
            }
        }

        tracing::info!(
            "{:?} transform: {} migrated, {} skipped, {} superseded, {} failed{}",
            direction,
            report.migrated,
            report.skipped,
            report.superseded,
            report.failed.len(),
            if report.interrupted { ", interrupted" } else { "" },
        );
        Ok(report)
    }
}

/// Re-encodes one entry for `target` and swaps it in with a single commit. Returns false without
/// writing anything if the entry changed since `value` was read.
fn migrate_record<K: TransactionalKv>(
    kv: &K,
    codec: &RecordCodec<'_>,
    key: &[u8],
    value: &[u8],
    units: &[&CipherUnit],
    target: Option<&CipherUnit>,
) -> StoreResult<bool> {
    let decoded = codec.decode(key, value, units)?;
    let encoded =
        codec.encode(decoded.table, &decoded.identifier, decoded.payload.expose(), target)?;
    let swapped = kv.commit_if_unchanged(
        key,
        value,
        vec![
            KvOp::Remove { key: key.to_vec() },
            KvOp::Insert { key: encoded.key, value: encoded.value },
        ],
    )?;
    if !swapped {
        tracing::debug!("{} record changed during the transform, left as written", decoded.table);
    }
    Ok(swapped)
}
