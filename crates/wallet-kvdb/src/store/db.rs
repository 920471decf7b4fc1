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

//! The wallet store: typed records over a [TransactionalKv], encrypted by whichever cipher units
//! are attached and unlocked.

use parking_lot::RwLock;

use super::{
    backend::{KvOp, SledKv, TransactionalKv},
    config::StoreConfig,
    constants::INDEX_SALT_KEY,
    keyring::Keyring,
    result::{StoreError, StoreResult},
};
use crate::{
    cipher::{self, CipherUnit, Password, SecretBytes},
    record::{is_encrypted, BlindIndex, Decoded, Record, RecordCodec, Table, INDEX_SALT_LEN},
};

pub struct EncryptedStore<K = SledKv> {
    pub(super) kv: K,
    index: BlindIndex,
    pub(super) keyring: RwLock<Keyring>,
    pub(super) config: StoreConfig,
}

impl EncryptedStore<SledKv> {
    /// Opens the sled database at `config.path`, creating it if needed. Master keys found in the
    /// database are loaded locked.
    #[tracing::instrument(skip_all, fields(path = %config.path.display()))]
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let kv = SledKv::open(&config)?;
        if kv.was_recovered() {
            tracing::debug!("Found existing database");
        } else {
            tracing::debug!("No existing database found, creating a new one.");
        }
        Self::with_backend(kv, config)
    }
}

impl<K: TransactionalKv> EncryptedStore<K> {
    pub fn with_backend(kv: K, config: StoreConfig) -> StoreResult<Self> {
        let index = load_index(&kv)?;
        let codec = RecordCodec::new(&index);
        let mut units = Vec::new();
        for (key, value) in kv.scan_prefix(Table::MasterKey.tag())? {
            match codec.decode(&key, &value, &[])?.into_record()? {
                Record::MasterKey(wrapped) => units.push(CipherUnit::load(wrapped)),
                _ => return Err(unexpected(Table::MasterKey)),
            }
        }
        if !units.is_empty() {
            tracing::debug!("Loaded {} master key(s), store is locked", units.len());
        }
        Ok(Self { kv, index, keyring: RwLock::new(Keyring::new(units)), config })
    }

    pub(super) fn codec(&self) -> RecordCodec<'_> {
        RecordCodec::new(&self.index)
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether any master key is attached.
    pub fn is_encrypted(&self) -> bool {
        self.keyring.read().is_encrypted()
    }

    /// Whether new writes are encrypted, i.e. some unit is armed.
    pub fn is_unlocked(&self) -> bool {
        self.keyring.read().active().is_some()
    }

    /// Unlocks and arms every master key `password` opens. Returns false if it opens none, which
    /// is how a wrong password shows up.
    pub fn unlock(&self, password: &Password) -> StoreResult<bool> {
        let mut keyring = self.keyring.write();
        if !keyring.is_encrypted() {
            return Err(StoreError::NotEncrypted);
        }
        let opened = keyring.unlock(password)?;
        if !opened {
            tracing::warn!("Failed to unlock the store: no master key accepts this password");
        }
        Ok(opened)
    }

    /// Wipes the key material of every unit.
    pub fn lock(&self) {
        self.keyring.write().lock();
    }

    /// Wraps the active unit's content key under another password, so that either password
    /// unlocks the store.
    pub fn add_password(&self, new_password: &Password) -> StoreResult<()> {
        let iterations = self.config.kdf_iterations();
        let mut keyring = self.keyring.write();
        let unit = match keyring.active() {
            Some(active) => active.copy_wrapping(new_password, iterations)?,
            None if keyring.is_encrypted() => return Err(StoreError::StoreLocked),
            None => return Err(StoreError::NotEncrypted),
        };
        self.kv.commit(vec![self.master_key_insert(&unit)?])?;
        keyring.add(unit);
        tracing::info!("Added a password to the store");
        Ok(())
    }

    /// Replaces every master key `old` opens by a single one opened by `new`. The swap is one
    /// atomic commit.
    pub fn change_password(&self, old: &Password, new: &Password) -> StoreResult<()> {
        let iterations = self.config.kdf_iterations();
        let mut keyring = self.keyring.write();
        if !keyring.is_encrypted() {
            return Err(StoreError::NotEncrypted);
        }
        let opened = keyring.opened_by(old)?;
        let unit = match keyring.active() {
            Some(active) if !opened.is_empty() => active.copy_wrapping(new, iterations)?,
            _ => return Err(cipher::Error::AuthenticationFailed.into()),
        };

        let codec = self.codec();
        let mut ops = Vec::with_capacity(opened.len() + 1);
        for &position in &opened {
            let iv = keyring.units()[position].wrapped().iv();
            ops.push(KvOp::Remove { key: codec.storage_key(Table::MasterKey, iv, None)? });
        }
        ops.push(self.master_key_insert(&unit)?);
        self.kv.commit(ops)?;

        keyring.remove(&opened);
        keyring.add(unit);
        tracing::info!("Changed the store password, replaced {} master key(s)", opened.len());
        Ok(())
    }

    pub(super) fn master_key_insert(&self, unit: &CipherUnit) -> StoreResult<KvOp> {
        let record = Record::MasterKey(unit.wrapped().clone());
        let encoded = self.codec().encode_record(&record, None)?;
        Ok(KvOp::Insert { key: encoded.key, value: encoded.value })
    }

    /// Writes `record`, encrypted under the active unit if the store is encrypted. Older copies of
    /// the same identifier in any representation this store can compute are removed in the same
    /// commit.
    pub fn write(&self, record: &Record) -> StoreResult<()> {
        let table = record.table();
        if !table.is_encryptable() {
            return Err(master_keys_managed());
        }
        let keyring = self.keyring.read();
        let unit = match keyring.active() {
            Some(unit) => Some(unit),
            None if keyring.is_encrypted() => return Err(StoreError::StoreLocked),
            None => None,
        };
        let encoded = self.codec().encode_record(record, unit)?;

        let mut ops: Vec<KvOp> = self
            .candidate_keys(&keyring, table, record.identifier())?
            .into_iter()
            .filter(|key| *key != encoded.key)
            .map(|key| KvOp::Remove { key })
            .collect();
        ops.push(KvOp::Insert { key: encoded.key, value: encoded.value });
        self.kv.commit(ops)?;
        Ok(())
    }

    /// Reads the record of `table` identified by the plaintext `identifier`.
    pub fn read(&self, table: Table, identifier: &[u8]) -> StoreResult<Record> {
        let keyring = self.keyring.read();
        let (_, decoded) = self.find(&keyring, table, identifier)?;
        decoded.into_record()
    }

    /// Erases the record of `table` identified by `identifier`, with any stale copies of it.
    pub fn erase(&self, table: Table, identifier: &[u8]) -> StoreResult<()> {
        if !table.is_encryptable() {
            return Err(master_keys_managed());
        }
        let keyring = self.keyring.read();
        let (found, _) = self.find(&keyring, table, identifier)?;
        let mut ops = vec![KvOp::Remove { key: found.clone() }];
        for key in self.candidate_keys(&keyring, table, identifier)? {
            if key != found && self.kv.get(&key)?.is_some() {
                ops.push(KvOp::Remove { key });
            }
        }
        self.kv.commit(ops)?;
        Ok(())
    }

    /// Every record of `table`, whatever state each one is stored in.
    pub fn list(&self, table: Table) -> StoreResult<Vec<Record>> {
        let keyring = self.keyring.read();
        let units = keyring.armed();
        let codec = self.codec();
        self.kv
            .scan_prefix(table.tag())?
            .into_iter()
            .map(|(key, value)| codec.decode(&key, &value, &units)?.into_record())
            .collect()
    }

    pub fn flush(&self) -> StoreResult<()> {
        Ok(self.kv.flush()?)
    }

    /// The storage keys `identifier` may live under: plaintext first, then sealed by each armed
    /// unit.
    fn candidate_keys(
        &self,
        keyring: &Keyring,
        table: Table,
        identifier: &[u8],
    ) -> StoreResult<Vec<Vec<u8>>> {
        let codec = self.codec();
        let mut keys = vec![codec.storage_key(table, identifier, None)?];
        if table.is_encryptable() {
            for unit in keyring.armed() {
                let key = codec.storage_key(table, identifier, Some(unit))?;
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// Locates and decodes a record, returning its storage key too.
    fn find(
        &self,
        keyring: &Keyring,
        table: Table,
        identifier: &[u8],
    ) -> StoreResult<(Vec<u8>, Decoded)> {
        if identifier.is_empty() {
            return Err(StoreError::InvalidInput(format!("{table} identifier must not be empty")));
        }
        let units = keyring.armed();
        let codec = self.codec();
        for key in self.candidate_keys(keyring, table, identifier)? {
            if let Some(value) = self.kv.get(&key)? {
                let decoded = codec.decode(&key, &value, &units)?;
                return Ok((key, decoded));
            }
        }

        // No exact key matched. Anything sealed under this index that the armed units cannot open
        // tells locked and wrong-password apart from absent.
        for (key, value) in self.kv.scan_prefix(&codec.prefix(table, identifier))? {
            if !is_encrypted(table, &value)? {
                continue;
            }
            let decoded = codec.decode(&key, &value, &units)?;
            if decoded.identifier.as_slice() == identifier {
                return Ok((key, decoded));
            }
        }
        Err(StoreError::NotFound(table))
    }

    pub fn write_name(&self, address: &str, label: &str) -> StoreResult<()> {
        self.write(&Record::Name { address: address.to_string(), label: label.to_string() })
    }

    pub fn read_name(&self, address: &str) -> StoreResult<String> {
        match self.read(Table::Name, address.as_bytes())? {
            Record::Name { label, .. } => Ok(label),
            _ => Err(unexpected(Table::Name)),
        }
    }

    pub fn erase_name(&self, address: &str) -> StoreResult<()> {
        self.erase(Table::Name, address.as_bytes())
    }

    pub fn write_key(&self, address: &str, private_key: &[u8]) -> StoreResult<()> {
        self.write(&Record::Key {
            address: address.to_string(),
            private_key: SecretBytes::copy_from(private_key),
        })
    }

    pub fn read_key(&self, address: &str) -> StoreResult<SecretBytes> {
        match self.read(Table::Key, address.as_bytes())? {
            Record::Key { private_key, .. } => Ok(private_key),
            _ => Err(unexpected(Table::Key)),
        }
    }

    pub fn erase_key(&self, address: &str) -> StoreResult<()> {
        self.erase(Table::Key, address.as_bytes())
    }

    pub fn write_account(&self, name: &str, public_key: &[u8]) -> StoreResult<()> {
        self.write(&Record::Account { name: name.to_string(), public_key: public_key.to_vec() })
    }

    pub fn read_account(&self, name: &str) -> StoreResult<Vec<u8>> {
        match self.read(Table::Account, name.as_bytes())? {
            Record::Account { public_key, .. } => Ok(public_key),
            _ => Err(unexpected(Table::Account)),
        }
    }

    pub fn erase_account(&self, name: &str) -> StoreResult<()> {
        self.erase(Table::Account, name.as_bytes())
    }
}

/// Loads the blind index salt, creating it on first open.
fn load_index<K: TransactionalKv>(kv: &K) -> StoreResult<BlindIndex> {
    if let Some(salt) = kv.get(INDEX_SALT_KEY)? {
        let salt: [u8; INDEX_SALT_LEN] = salt
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::CorruptedMetadata("index salt has the wrong length"))?;
        return Ok(BlindIndex::new(salt));
    }
    for table in Table::ALL {
        if !kv.scan_prefix(table.tag())?.is_empty() {
            let reason = "records found but the index salt is missing";
            return Err(StoreError::CorruptedMetadata(reason));
        }
    }
    let index = BlindIndex::random()?;
    kv.commit(vec![KvOp::Insert { key: INDEX_SALT_KEY.to_vec(), value: index.salt().to_vec() }])?;
    Ok(index)
}

fn unexpected(table: Table) -> StoreError {
    StoreError::Corrupted { table, reason: "decoded into another record kind" }
}

fn master_keys_managed() -> StoreError {
    StoreError::InvalidInput("master key records are managed by the store".to_string())
}
