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

//! Public API of the store handle
//! Errors are mapped to [crate::kv_manager::error::KvError]

use tokio::sync::{mpsc, oneshot};

use super::{
    error::{KvError::*, KvResult},
    types::{
        Command::{self, *},
        Responder,
    },
};
use crate::{
    cipher::{Password, SecretBytes},
    record::{Record, Table},
    store::{
        EncryptedStore, Error as StoreError, MigrationReport, Result as StoreResult, StoreConfig,
        TransactionalKv, TransformOptions,
    },
};

#[derive(Clone)]
pub struct KvManager {
    sender: mpsc::UnboundedSender<Command>,
}

// database functionality using the "actor" pattern (KvManager is the "handle")
impl KvManager {
    /// Opens the store at `config.path` and spawns its worker. Returns [InitErr] on failure.
    /// Must be called from within a tokio runtime.
    pub fn new(config: StoreConfig) -> KvResult<Self> {
        let store = EncryptedStore::open(config).map_err(InitErr)?;
        Ok(Self::with_store(store))
    }

    /// Moves `store` onto a blocking worker. The worker stops once every handle is dropped.
    pub fn with_store<K: TransactionalKv + 'static>(store: EncryptedStore<K>) -> Self {
        let (sender, rx) = mpsc::unbounded_channel();
        // the store does blocking disk io and slow key derivation
        tokio::task::spawn_blocking(move || kv_cmd_handler(rx, store));
        Self { sender }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Responder<T>) -> Command,
    ) -> KvResult<StoreResult<T>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.sender.send(command(resp_tx)).map_err(|err| SendErr(err.to_string()))?;
        Ok(resp_rx.await?)
    }

    /// Returns [WriteErr] or [SendErr] on failure.
    pub async fn write(&self, record: Record) -> KvResult<()> {
        self.request(|resp| Write { record, resp }).await?.map_err(WriteErr)
    }

    /// Returns [ReadErr] or [SendErr] on failure.
    pub async fn read(&self, table: Table, identifier: &[u8]) -> KvResult<Record> {
        let identifier = identifier.to_vec();
        self.request(|resp| Read { table, identifier, resp }).await?.map_err(ReadErr)
    }

    /// Returns [EraseErr] or [SendErr] on failure.
    pub async fn erase(&self, table: Table, identifier: &[u8]) -> KvResult<()> {
        let identifier = identifier.to_vec();
        self.request(|resp| Erase { table, identifier, resp }).await?.map_err(EraseErr)
    }

    pub async fn list(&self, table: Table) -> KvResult<Vec<Record>> {
        self.request(|resp| List { table, resp }).await?.map_err(ReadErr)
    }

    pub async fn write_name(&self, address: &str, label: &str) -> KvResult<()> {
        self.write(Record::Name { address: address.to_string(), label: label.to_string() }).await
    }

    pub async fn read_name(&self, address: &str) -> KvResult<String> {
        match self.read(Table::Name, address.as_bytes()).await? {
            Record::Name { label, .. } => Ok(label),
            _ => Err(ReadErr(unexpected(Table::Name))),
        }
    }

    pub async fn erase_name(&self, address: &str) -> KvResult<()> {
        self.erase(Table::Name, address.as_bytes()).await
    }

    pub async fn write_key(&self, address: &str, private_key: SecretBytes) -> KvResult<()> {
        self.write(Record::Key { address: address.to_string(), private_key }).await
    }

    pub async fn read_key(&self, address: &str) -> KvResult<SecretBytes> {
        match self.read(Table::Key, address.as_bytes()).await? {
            Record::Key { private_key, .. } => Ok(private_key),
            _ => Err(ReadErr(unexpected(Table::Key))),
        }
    }

    pub async fn erase_key(&self, address: &str) -> KvResult<()> {
        self.erase(Table::Key, address.as_bytes()).await
    }

    pub async fn write_account(&self, name: &str, public_key: &[u8]) -> KvResult<()> {
        self.write(Record::Account { name: name.to_string(), public_key: public_key.to_vec() })
            .await
    }

    pub async fn read_account(&self, name: &str) -> KvResult<Vec<u8>> {
        match self.read(Table::Account, name.as_bytes()).await? {
            Record::Account { public_key, .. } => Ok(public_key),
            _ => Err(ReadErr(unexpected(Table::Account))),
        }
    }

    pub async fn erase_account(&self, name: &str) -> KvResult<()> {
        self.erase(Table::Account, name.as_bytes()).await
    }

    /// Returns whether `password` opened any master key.
    pub async fn unlock(&self, password: Password) -> KvResult<bool> {
        self.request(|resp| Unlock { password, resp }).await?.map_err(UnlockErr)
    }

    pub async fn lock(&self) -> KvResult<()> {
        self.request(|resp| Lock { resp }).await?.map_err(UnlockErr)
    }

    pub async fn attach_encryption(
        &self,
        password: Password,
        options: TransformOptions,
    ) -> KvResult<MigrationReport> {
        self.request(|resp| AttachEncryption { password, options, resp })
            .await?
            .map_err(TransformErr)
    }

    pub async fn remove_encryption(
        &self,
        password: Password,
        options: TransformOptions,
    ) -> KvResult<MigrationReport> {
        self.request(|resp| RemoveEncryption { password, options, resp })
            .await?
            .map_err(TransformErr)
    }

    pub async fn add_password(&self, password: Password) -> KvResult<()> {
        self.request(|resp| AddPassword { password, resp }).await?.map_err(PasswordErr)
    }

    pub async fn change_password(&self, old: Password, new: Password) -> KvResult<()> {
        self.request(|resp| ChangePassword { old, new, resp }).await?.map_err(PasswordErr)
    }

    pub async fn export(&self) -> KvResult<Vec<u8>> {
        self.request(|resp| Export { resp }).await?.map_err(ExportErr)
    }
}

// private handler function to process commands as per the "actor" pattern (see above)
fn kv_cmd_handler<K: TransactionalKv>(
    mut rx: mpsc::UnboundedReceiver<Command>,
    store: EncryptedStore<K>,
) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            Write { record, resp } => handle_response(store.write(&record), resp),
            Read { table, identifier, resp } => {
                handle_response(store.read(table, &identifier), resp);
            },
            Erase { table, identifier, resp } => {
                handle_response(store.erase(table, &identifier), resp);
            },
            List { table, resp } => handle_response(store.list(table), resp),
            Unlock { password, resp } => handle_response(store.unlock(&password), resp),
            Lock { resp } => {
                store.lock();
                handle_response(Ok(()), resp);
            },
            AttachEncryption { password, options, resp } => {
                handle_response(store.attach_encryption(&password, &options), resp);
            },
            RemoveEncryption { password, options, resp } => {
                handle_response(store.remove_encryption(&password, &options), resp);
            },
            AddPassword { password, resp } => {
                handle_response(store.add_password(&password), resp);
            },
            ChangePassword { old, new, resp } => {
                handle_response(store.change_password(&old, &new), resp);
            },
            Export { resp } => handle_response(store.export(), resp),
        }
    }
    if let Err(err) = store.flush() {
        tracing::warn!("Failed to flush the store on shutdown: {}", err);
    }
    tracing::debug!("Store worker stopped");
}

fn handle_response<T>(kv_resp: StoreResult<T>, resp: Responder<T>) {
    match &kv_resp {
        Err(err @ StoreError::NotFound(_)) => tracing::debug!("{}", err),
        Err(err) => tracing::error!("Failed to handle database query with: {}", err),
        Ok(_) => {},
    }
    if resp.send(kv_resp).is_err() {
        tracing::warn!("Receiver dropped before the response was sent");
    }
}

fn unexpected(table: Table) -> StoreError {
    StoreError::Corrupted { table, reason: "decoded into another record kind" }
}
