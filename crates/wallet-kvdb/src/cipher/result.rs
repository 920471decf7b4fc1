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

//! Custom error handling

#[derive(thiserror::Error, Debug)]
pub enum CipherError {
    #[error("Cryptographic failure: {0}")]
    CryptoFailure(String),
    #[error("Authentication failed: wrong password, wrong master key or corrupted ciphertext")]
    AuthenticationFailed,
    #[error("Cipher unit is not armed: unlock and arm it before encrypting or decrypting")]
    NotArmed,
    #[error("Cipher unit is locked: unlock it with its password first")]
    Locked,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Password read error: {0}")]
    PasswordRead(#[from] std::io::Error), // rpassword::read_password() Error
}

pub type CipherResult<Success> = Result<Success, CipherError>;
