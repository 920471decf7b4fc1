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

//! The records kept by the wallet store and how they map to storage keys and values.
//!
//! Every record splits into an identifier (the logical key, e.g. an address) and a payload.
//! Both may be stored encrypted; the blind index of the plaintext identifier is always stored
//! in the clear so that lookups never need to decrypt candidates.

mod codec;
mod index;
mod table;

use std::borrow::Cow;

pub use codec::{
    is_encrypted, table_of, Decoded, Encoded, RecordCodec, FLAG_ENCRYPTED, FLAG_PLAINTEXT,
    PREFIX_LEN,
};
pub use index::{BlindIndex, INDEX_LEN, INDEX_SALT_LEN};
pub use table::{Framing, Table, TABLE_TAG_LEN};

use crate::{
    cipher::{SecretBytes, WrappedKey},
    store::{Error as StoreError, Result as StoreResult},
};

/// One record of one [Table].
#[derive(Debug)]
pub enum Record {
    /// A persisted cipher unit, identified by its iv.
    MasterKey(WrappedKey),
    Name { address: String, label: String },
    Key { address: String, private_key: SecretBytes },
    Account { name: String, public_key: Vec<u8> },
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::MasterKey(_) => Table::MasterKey,
            Record::Name { .. } => Table::Name,
            Record::Key { .. } => Table::Key,
            Record::Account { .. } => Table::Account,
        }
    }

    pub fn identifier(&self) -> &[u8] {
        match self {
            Record::MasterKey(wrapped) => wrapped.iv().as_slice(),
            Record::Name { address, .. } | Record::Key { address, .. } => address.as_bytes(),
            Record::Account { name, .. } => name.as_bytes(),
        }
    }

    pub fn payload(&self) -> Cow<'_, [u8]> {
        match self {
            Record::MasterKey(wrapped) => Cow::Owned(wrapped.to_bytes().to_vec()),
            Record::Name { label, .. } => Cow::Borrowed(label.as_bytes()),
            Record::Key { private_key, .. } => Cow::Borrowed(private_key.expose()),
            Record::Account { public_key, .. } => Cow::Borrowed(public_key),
        }
    }

    /// Rebuilds a record from its decoded parts.
    pub fn from_parts(
        table: Table,
        identifier: Vec<u8>,
        payload: SecretBytes,
    ) -> StoreResult<Self> {
        let corrupted = |reason| StoreError::Corrupted { table, reason };
        Ok(match table {
            Table::MasterKey => {
                let wrapped = WrappedKey::from_bytes(payload.expose())
                    .map_err(|_| corrupted("malformed master key"))?;
                if wrapped.iv().as_slice() != identifier.as_slice() {
                    return Err(corrupted("master key identifier does not match its iv"));
                }
                Record::MasterKey(wrapped)
            },
            Table::Name => Record::Name {
                address: String::from_utf8(identifier)
                    .map_err(|_| corrupted("address is not utf-8"))?,
                label: String::from_utf8(payload.expose().to_vec())
                    .map_err(|_| corrupted("label is not utf-8"))?,
            },
            Table::Key => Record::Key {
                address: String::from_utf8(identifier)
                    .map_err(|_| corrupted("address is not utf-8"))?,
                private_key: payload,
            },
            Table::Account => Record::Account {
                name: String::from_utf8(identifier)
                    .map_err(|_| corrupted("account name is not utf-8"))?,
                public_key: payload.expose().to_vec(),
            },
        })
    }
}
