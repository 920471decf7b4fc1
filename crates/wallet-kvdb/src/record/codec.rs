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

//! Conversion between records and raw storage entries.
//!
//! ```text
//! key   = table tag (8) ‖ blind index (8) ‖ identifier (plaintext or sealed)
//! value = payload (plaintext or sealed) ‖ encrypted flag (1)
//! ```
//! Sealed identifiers use a deterministic nonce so the exact key can be rebuilt from the
//! plaintext identifier; sealed payloads use a random nonce.
use super::{
    index::{BlindIndex, INDEX_LEN},
    table::{Framing, Table, TABLE_TAG_LEN},
    Record,
};
use crate::{
    cipher::{self, CipherUnit, SecretBytes},
    store::{Error as StoreError, Result as StoreResult},
};

pub const FLAG_PLAINTEXT: u8 = 0;
pub const FLAG_ENCRYPTED: u8 = 1;
/// Length of `table tag ‖ blind index`, the part of a key shared by every representation of
/// one identifier.
pub const PREFIX_LEN: usize = TABLE_TAG_LEN + INDEX_LEN;

/// A record ready to be written.
#[derive(Debug)]
pub struct Encoded {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub encrypted: bool,
}

/// A stored entry with identifier and payload in plaintext.
#[derive(Debug)]
pub struct Decoded {
    pub table: Table,
    pub identifier: Vec<u8>,
    pub payload: SecretBytes,
    pub encrypted: bool,
}

impl Decoded {
    pub fn into_record(self) -> StoreResult<Record> {
        Record::from_parts(self.table, self.identifier, self.payload)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RecordCodec<'a> {
    index: &'a BlindIndex,
}

impl<'a> RecordCodec<'a> {
    pub fn new(index: &'a BlindIndex) -> Self {
        Self { index }
    }

    /// `table tag ‖ blind index` of a plaintext identifier.
    pub fn prefix(&self, table: Table, identifier: &[u8]) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(PREFIX_LEN + identifier.len());
        prefix.extend_from_slice(table.tag());
        prefix.extend_from_slice(&self.index.hash(identifier));
        prefix
    }

    /// The exact storage key of `identifier` when written with `unit`, or in plaintext when
    /// `unit` is `None`. Master keys are always keyed in plaintext.
    pub fn storage_key(
        &self,
        table: Table,
        identifier: &[u8],
        unit: Option<&CipherUnit>,
    ) -> StoreResult<Vec<u8>> {
        let mut key = self.prefix(table, identifier);
        match unit.filter(|_| table.is_encryptable()) {
            Some(unit) => key.extend_from_slice(&unit.encrypt_deterministic(identifier)?),
            None => key.extend_from_slice(identifier),
        }
        Ok(key)
    }

    pub fn encode(
        &self,
        table: Table,
        identifier: &[u8],
        payload: &[u8],
        unit: Option<&CipherUnit>,
    ) -> StoreResult<Encoded> {
        if identifier.is_empty() {
            return Err(StoreError::InvalidInput(format!("{table} identifier must not be empty")));
        }
        if let Framing::Fixed(width) = table.framing() {
            if payload.len() != width {
                return Err(StoreError::InvalidInput(format!(
                    "{table} payload must be {width} bytes, got {}",
                    payload.len()
                )));
            }
        }

        let unit = unit.filter(|_| table.is_encryptable());
        let key = self.storage_key(table, identifier, unit)?;
        let mut value = match unit {
            Some(unit) => unit.encrypt(payload)?,
            None => payload.to_vec(),
        };
        let encrypted = unit.is_some();
        value.push(if encrypted { FLAG_ENCRYPTED } else { FLAG_PLAINTEXT });
        Ok(Encoded { key, value, encrypted })
    }

    pub fn encode_record(
        &self,
        record: &Record,
        unit: Option<&CipherUnit>,
    ) -> StoreResult<Encoded> {
        self.encode(record.table(), record.identifier(), &record.payload(), unit)
    }

    /// Decodes a stored entry, trying each of `units` on encrypted entries.
    ///
    /// Fails with [StoreError::LockedRecord] when the entry is encrypted and `units` is empty,
    /// and with [cipher::Error::AuthenticationFailed] when none of `units` opens it.
    pub fn decode(
        &self,
        key: &[u8],
        value: &[u8],
        units: &[&CipherUnit],
    ) -> StoreResult<Decoded> {
        let table = table_of(key)?;
        if key.len() <= PREFIX_LEN {
            return Err(StoreError::Corrupted { table, reason: "storage key too short" });
        }
        let (stored_index, stored_identifier) = key[TABLE_TAG_LEN..].split_at(INDEX_LEN);

        let decoded = match stored_flag(table, value)? {
            (FLAG_PLAINTEXT, payload) => Decoded {
                table,
                identifier: stored_identifier.to_vec(),
                payload: SecretBytes::copy_from(payload),
                encrypted: false,
            },
            (_, payload) => {
                if !table.is_encryptable() {
                    let reason = "master keys are never encrypted";
                    return Err(StoreError::Corrupted { table, reason });
                }
                open(table, stored_identifier, payload, units)?
            },
        };

        if self.index.hash(&decoded.identifier).as_slice() != stored_index {
            return Err(StoreError::Corrupted { table, reason: "blind index mismatch" });
        }
        if let Framing::Fixed(width) = table.framing() {
            if decoded.payload.len() != width {
                return Err(StoreError::Corrupted { table, reason: "unexpected payload width" });
            }
        }
        Ok(decoded)
    }
}

/// Reads the table tag of a storage key.
pub fn table_of(key: &[u8]) -> StoreResult<Table> {
    key.get(..TABLE_TAG_LEN)
        .and_then(Table::from_tag)
        .ok_or_else(|| StoreError::UnknownTable(hex::encode(&key[..key.len().min(TABLE_TAG_LEN)])))
}

/// Whether a stored value carries the encrypted flag.
pub fn is_encrypted(table: Table, value: &[u8]) -> StoreResult<bool> {
    Ok(stored_flag(table, value)?.0 == FLAG_ENCRYPTED)
}

fn stored_flag(table: Table, value: &[u8]) -> StoreResult<(u8, &[u8])> {
    match value.split_last() {
        Some((&flag, payload)) if flag == FLAG_PLAINTEXT || flag == FLAG_ENCRYPTED => {
            Ok((flag, payload))
        },
        Some(_) => Err(StoreError::Corrupted { table, reason: "unknown encryption flag" }),
        None => Err(StoreError::Corrupted { table, reason: "empty value" }),
    }
}

fn open(
    table: Table,
    sealed_identifier: &[u8],
    sealed_payload: &[u8],
    units: &[&CipherUnit],
) -> StoreResult<Decoded> {
    if units.is_empty() {
        return Err(StoreError::LockedRecord(table));
    }
    for unit in units {
        let identifier = match unit.decrypt(sealed_identifier) {
            Ok(identifier) => identifier,
            // sealed by a unit with another content key
            Err(cipher::Error::AuthenticationFailed) => continue,
            Err(err) => return Err(err.into()),
        };
        let payload = unit.decrypt(sealed_payload)?;
        return Ok(Decoded {
            table,
            identifier: identifier.expose().to_vec(),
            payload,
            encrypted: true,
        });
    }
    Err(cipher::Error::AuthenticationFailed.into())
}
