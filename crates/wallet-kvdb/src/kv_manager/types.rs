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

//! Commands served by the store worker.

use crate::{
    cipher::Password,
    record::{Record, Table},
    store::{MigrationReport, Result as StoreResult, TransformOptions},
};

// Provided by the requester and used by the worker to send the command response back to the
// requester.
pub(super) type Responder<T> = tokio::sync::oneshot::Sender<StoreResult<T>>;

#[derive(Debug)]
pub(super) enum Command {
    Write {
        record: Record,
        resp: Responder<()>,
    },
    Read {
        table: Table,
        identifier: Vec<u8>,
        resp: Responder<Record>,
    },
    Erase {
        table: Table,
        identifier: Vec<u8>,
        resp: Responder<()>,
    },
    List {
        table: Table,
        resp: Responder<Vec<Record>>,
    },
    Unlock {
        password: Password,
        resp: Responder<bool>,
    },
    Lock {
        resp: Responder<()>,
    },
    AttachEncryption {
        password: Password,
        options: TransformOptions,
        resp: Responder<MigrationReport>,
    },
    RemoveEncryption {
        password: Password,
        options: TransformOptions,
        resp: Responder<MigrationReport>,
    },
    AddPassword {
        password: Password,
        resp: Responder<()>,
    },
    ChangePassword {
        old: Password,
        new: Password,
        resp: Responder<()>,
    },
    Export {
        resp: Responder<Vec<u8>>,
    },
}
