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

//! Constants for [store](crate::store)

/// Prefix of store metadata. Never collides with a table tag.
pub(super) const METADATA_PREFIX: &[u8] = b"metadata";

/// `METADATA_PREFIX ‖ "index_salt"`: the salt of the store's blind index
pub(super) const INDEX_SALT_KEY: &[u8] = b"metadataindex_salt";

/// Max length of an exported store dump
pub(super) const MAX_DUMP_LEN: u64 = 64 * 1024 * 1024;
