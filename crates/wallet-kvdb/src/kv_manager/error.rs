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

//! Custom error types for [crate::kv_manager].

use crate::store::Error as StoreError;

#[allow(clippy::enum_variant_names)] // allow Err postfix
#[derive(thiserror::Error, Debug)]
pub enum KvError {
    #[error("Kv initialization Error: {0}")]
    InitErr(StoreError),
    #[error("Recv Error: {0}")] // errors receiving from "actor pattern"'s channels
    RecvErr(#[from] tokio::sync::oneshot::error::RecvError),
    #[error("Send Error: {0}")] // errors sending to "actor pattern"'s channels
    SendErr(String),
    #[error("Read Error: {0}")]
    ReadErr(StoreError),
    #[error("Write Error: {0}")]
    WriteErr(StoreError),
    #[error("Erase Error: {0}")]
    EraseErr(StoreError),
    #[error("Unlock Error: {0}")]
    UnlockErr(StoreError),
    #[error("Transform Error: {0}")]
    TransformErr(StoreError),
    #[error("Password Error: {0}")]
    PasswordErr(StoreError),
    #[error("Export Error: {0}")]
    ExportErr(StoreError),
}

impl KvError {
    /// The store error behind a failed command, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            KvError::InitErr(err)
            | KvError::ReadErr(err)
            | KvError::WriteErr(err)
            | KvError::EraseErr(err)
            | KvError::UnlockErr(err)
            | KvError::TransformErr(err)
            | KvError::PasswordErr(err)
            | KvError::ExportErr(err) => Some(err),
            KvError::RecvErr(_) | KvError::SendErr(_) => None,
        }
    }
}

pub type KvResult<Success> = Result<Success, KvError>;
