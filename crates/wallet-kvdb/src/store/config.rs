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

//! Configuration of an [EncryptedStore](super::EncryptedStore).

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::cipher::kdf;

const DEFAULT_KDF_TARGET_MILLIS: u64 = 500;
const DEFAULT_MIN_KDF_ITERATIONS: u32 = 10_000;

#[derive(Deserialize, Debug, Clone)]
pub struct StoreConfig {
    /// Directory of the sled database
    pub path: PathBuf,
    /// Delete the database when the store is dropped
    #[serde(default)]
    pub temporary: bool,
    /// How long deriving a wrapping key should take on this machine
    #[serde(default = "default_kdf_target_millis")]
    pub kdf_target_millis: u64,
    /// Fixed work factor, skipping calibration
    #[serde(default)]
    pub kdf_iterations: Option<u32>,
    /// Lower bound for calibrated work factors
    #[serde(default = "default_min_kdf_iterations")]
    pub min_kdf_iterations: u32,
}

fn default_kdf_target_millis() -> u64 {
    DEFAULT_KDF_TARGET_MILLIS
}

fn default_min_kdf_iterations() -> u32 {
    DEFAULT_MIN_KDF_ITERATIONS
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> StoreConfig {
        StoreConfig {
            path: path.into(),
            temporary: false,
            kdf_target_millis: DEFAULT_KDF_TARGET_MILLIS,
            kdf_iterations: None,
            min_kdf_iterations: DEFAULT_MIN_KDF_ITERATIONS,
        }
    }

    pub fn temporary(mut self) -> StoreConfig {
        self.temporary = true;
        self
    }

    pub fn with_kdf_iterations(mut self, iterations: u32) -> StoreConfig {
        self.kdf_iterations = Some(iterations);
        self
    }

    pub fn kdf_target(&self) -> Duration {
        Duration::from_millis(self.kdf_target_millis)
    }

    /// Work factor for newly generated cipher units.
    pub fn kdf_iterations(&self) -> u32 {
        match self.kdf_iterations {
            Some(iterations) => iterations.max(1),
            None => kdf::calibrate(self.kdf_target(), self.min_kdf_iterations),
        }
    }
}
