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

//! bincode encoding of store dumps.

use bincode::{
    config::{
        BigEndian, Bounded, RejectTrailing, VarintEncoding, WithOtherEndian, WithOtherIntEncoding,
        WithOtherLimit, WithOtherTrailing,
    },
    DefaultOptions, Options,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::store::{Error as StoreError, Result as StoreResult};

/// Serialize a value using bincode, refusing anything longer than `limit` bytes.
pub fn serialize<T: ?Sized + Serialize>(value: &T, limit: u64) -> StoreResult<Vec<u8>> {
    bincoder(limit).serialize(value).map_err(|err| {
        error!("serialization failure: {}", err);
        StoreError::Serialization
    })
}

/// Deserialize bytes produced by [serialize] with the same `limit`.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8], limit: u64) -> StoreResult<T> {
    bincoder(limit).deserialize(bytes).map_err(|err| {
        warn!("deserialization failure: {}", err);
        StoreError::Deserialization
    })
}

#[allow(clippy::type_complexity)]
fn bincoder(
    limit: u64,
) -> WithOtherTrailing<
    WithOtherIntEncoding<
        WithOtherEndian<WithOtherLimit<DefaultOptions, Bounded>, BigEndian>,
        VarintEncoding,
    >,
    RejectTrailing,
> {
    DefaultOptions::new()
        .with_limit(limit)
        .with_big_endian()
        .with_varint_encoding()
        .reject_trailing_bytes()
}
