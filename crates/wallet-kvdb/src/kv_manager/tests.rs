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

use super::{error::KvError, KvManager};
use crate::{
    cipher::{Password, SecretBytes},
    record::Table,
    store::{EncryptedStore, Error as StoreError, StoreConfig, TransformOptions},
};

fn temp_config() -> StoreConfig {
    let name = format!("wallet-kvdb-manager-test-{:016x}", rand::random::<u64>());
    StoreConfig::new(std::env::temp_dir().join(name)).temporary().with_kdf_iterations(64)
}

fn password(password: &str) -> Password {
    Password::from(password)
}

#[tokio::test]
async fn test_kv_manager_serves_every_command() {
    let kv = KvManager::new(temp_config()).unwrap();
    kv.write_name("abc", "alice").await.unwrap();
    kv.write_key("abc", SecretBytes::copy_from(&[3; 32])).await.unwrap();
    kv.write_account("main", b"public key").await.unwrap();

    let report =
        kv.attach_encryption(password("one"), TransformOptions::default()).await.unwrap();
    assert_eq!(report.migrated, 3);
    assert!(report.is_complete());

    kv.lock().await.unwrap();
    let err = kv.read_name("abc").await.unwrap_err();
    assert!(matches!(err, KvError::ReadErr(StoreError::LockedRecord(Table::Name))));
    assert!(matches!(kv.write_name("def", "bob").await, Err(KvError::WriteErr(_))));

    assert!(!kv.unlock(password("wrong")).await.unwrap());
    assert!(kv.unlock(password("one")).await.unwrap());
    assert_eq!(kv.read_name("abc").await.unwrap(), "alice");
    assert_eq!(kv.read_key("abc").await.unwrap().expose(), &[3; 32]);
    assert_eq!(kv.read_account("main").await.unwrap(), b"public key");
    assert_eq!(kv.list(Table::Name).await.unwrap().len(), 1);

    kv.add_password(password("two")).await.unwrap();
    kv.change_password(password("one"), password("three")).await.unwrap();
    let err = kv.change_password(password("one"), password("four")).await.unwrap_err();
    assert!(err.store_error().unwrap().is_authentication_failure());
    assert!(!kv.export().await.unwrap().is_empty());

    kv.erase_account("main").await.unwrap();
    let err = kv.read_account("main").await.unwrap_err();
    assert!(matches!(err, KvError::ReadErr(StoreError::NotFound(Table::Account))));
    assert!(matches!(kv.erase_key("nobody").await, Err(KvError::EraseErr(_))));

    let report =
        kv.remove_encryption(password("three"), TransformOptions::default()).await.unwrap();
    assert_eq!(report.migrated, 2);
    kv.erase_name("abc").await.unwrap();
    assert!(kv.list(Table::Name).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_handles_share_one_store() {
    let store = EncryptedStore::open(temp_config()).unwrap();
    let kv = KvManager::with_store(store);

    let writers = (0..8).map(|i| {
        let kv = kv.clone();
        tokio::spawn(async move { kv.write_name(&format!("address {i}"), &format!("{i}")).await })
    });
    for writer in writers.collect::<Vec<_>>() {
        writer.await.unwrap().unwrap();
    }
    for i in 0..8 {
        assert_eq!(kv.read_name(&format!("address {i}")).await.unwrap(), format!("{i}"));
    }
}

#[tokio::test]
async fn test_init_error() {
    let name = format!("wallet-kvdb-file-{:016x}", rand::random::<u64>());
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, b"not a database").unwrap();
    let result = KvManager::new(StoreConfig::new(&path));
    assert!(matches!(result, Err(KvError::InitErr(_))));
    std::fs::remove_file(path).unwrap();
}
