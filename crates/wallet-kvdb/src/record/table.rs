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

//! Tables and their fixed-width storage tags.
use std::fmt;

use crate::cipher::constants::{KEY_LEN, PERSISTED_UNIT_LEN};

pub const TABLE_TAG_LEN: usize = 8;

/// Every storage key starts with the tag of the table the record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Persisted [crate::cipher::CipherUnit]s. Never encrypted.
    MasterKey,
    /// Address labels.
    Name,
    /// Private keys by address.
    Key,
    /// Correspondent account public keys by account name.
    Account,
}

/// How the payload of a table is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Fixed(usize),
    Variable,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::MasterKey, Table::Name, Table::Key, Table::Account];
    /// Tables touched by the bulk transforms.
    pub const ENCRYPTABLE: [Table; 3] = [Table::Name, Table::Key, Table::Account];

    pub const fn tag(self) -> &'static [u8; TABLE_TAG_LEN] {
        match self {
            Table::MasterKey => b"mastrkey",
            Table::Name => b"nameaddr",
            Table::Key => b"privkeys",
            Table::Account => b"accounts",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Table> {
        Table::ALL.into_iter().find(|table| table.tag().as_slice() == tag)
    }

    pub const fn is_encryptable(self) -> bool {
        !matches!(self, Table::MasterKey)
    }

    pub const fn framing(self) -> Framing {
        match self {
            Table::MasterKey => Framing::Fixed(PERSISTED_UNIT_LEN),
            Table::Key => Framing::Fixed(KEY_LEN),
            Table::Name | Table::Account => Framing::Variable,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::MasterKey => "master key",
            Table::Name => "name",
            Table::Key => "private key",
            Table::Account => "account",
        };
        f.write_str(name)
    }
}
