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

//! Passwords which unlock a [super::CipherUnit], and how they are obtained.
use std::fmt;

use rpassword::read_password;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{constants::UNSAFE_PASSWORD, result::CipherResult};

/// Safely store strings. Every copy is wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop, Clone)]
pub struct Password(String);

impl Password {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Password {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for Password {
    fn from(string: String) -> Self {
        Self(string)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Specifies how [Password] will be retrieved
#[derive(Clone, Debug)]
pub enum PasswordMethod {
    NoPassword,
    Prompt,
}

impl PasswordMethod {
    /// Execute the password method to retrieve a password
    pub fn execute(&self) -> CipherResult<Password> {
        Ok(match self {
            Self::NoPassword => Password(UNSAFE_PASSWORD.to_string()),
            Self::Prompt => {
                println!("Please type your wallet password:");
                Password(read_password()?)
            },
        })
    }
}
