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

//! An encrypted-at-rest record store for wallet data: address labels, private keys and
//! correspondent accounts.
//!
//! Records are kept plaintext until encryption is attached with a password. From then on every
//! record is sealed with AES-256-GCM under a random content key, which is itself wrapped by keys
//! derived from one or more passwords.
pub mod cipher;
pub mod kv_manager;
pub mod record;
pub mod store;

use std::{fs, io, path::PathBuf};

pub use cipher::{Password, PasswordMethod, SecretBytes};
pub use kv_manager::KvManager;
pub use record::{Record, Table};
pub use store::{EncryptedStore, MigrationReport, StoreConfig, TransformOptions};

/// Default database directory, created if missing.
pub fn get_db_path(testing: bool) -> io::Result<PathBuf> {
    let mut root = std::env::current_dir()?;
    root.push(".wallet");
    if testing {
        root.push("testing");
    } else {
        root.push("production");
    }
    root.push("db");
    fs::create_dir_all(&root)?;
    Ok(root)
}

pub fn clean_tests() {
    if let Ok(db_path) = get_db_path(true) {
        let _result = fs::remove_dir_all(db_path);
    }
}
