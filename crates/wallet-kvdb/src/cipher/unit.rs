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

//! A password-wrapped content key and the AES-256-GCM cipher built from it.
//!
//! A [CipherUnit] moves through three states:
//! - [UnitState::Generated]: only the persisted [WrappedKey] is known.
//! - [UnitState::Unlocked]: a wrapping key has been derived from a password.
//! - [UnitState::Armed]: the content key has been unwrapped and the cipher is ready.
//!
//! A wrong password can only be detected when unwrapping the content key, so it surfaces from
//! [CipherUnit::arm] as [CipherError::AuthenticationFailed], never from [CipherUnit::unlock].
use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::{
    constants::{
        IDENTIFIER_NONCE_INFO, IV_LEN, KEY_LEN, PERSISTED_UNIT_LEN, TAG_LEN, WRAPPED_KEY_LEN,
    },
    kdf::{self, DerivedKey},
    password::Password,
    result::{CipherError, CipherResult},
    secret::{random_array, SecretBytes},
};

/// The persisted part of a [CipherUnit]: set once when the unit is generated, never mutated.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WrappedKey {
    ciphertext: [u8; WRAPPED_KEY_LEN],
    iv: [u8; IV_LEN],
    iterations: u32,
}

impl WrappedKey {
    pub fn ciphertext(&self) -> &[u8; WRAPPED_KEY_LEN] {
        &self.ciphertext
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// `ciphertext ‖ iv ‖ iterations (u32, big endian)`
    pub fn to_bytes(&self) -> [u8; PERSISTED_UNIT_LEN] {
        let mut bytes = [0u8; PERSISTED_UNIT_LEN];
        bytes[..WRAPPED_KEY_LEN].copy_from_slice(&self.ciphertext);
        bytes[WRAPPED_KEY_LEN..WRAPPED_KEY_LEN + IV_LEN].copy_from_slice(&self.iv);
        bytes[WRAPPED_KEY_LEN + IV_LEN..].copy_from_slice(&self.iterations.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> CipherResult<Self> {
        if bytes.len() != PERSISTED_UNIT_LEN {
            return Err(CipherError::InvalidInput(format!(
                "persisted master key must be {PERSISTED_UNIT_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut ciphertext = [0u8; WRAPPED_KEY_LEN];
        ciphertext.copy_from_slice(&bytes[..WRAPPED_KEY_LEN]);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[WRAPPED_KEY_LEN..WRAPPED_KEY_LEN + IV_LEN]);
        let mut iterations = [0u8; 4];
        iterations.copy_from_slice(&bytes[WRAPPED_KEY_LEN + IV_LEN..]);
        let iterations = u32::from_be_bytes(iterations);
        if iterations < 1 {
            return Err(CipherError::InvalidInput("persisted iteration count is zero".to_string()));
        }
        Ok(Self { ciphertext, iv, iterations })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Generated,
    Unlocked,
    Armed,
}

/// Everything a unit knows beyond its [WrappedKey]. Dropping it wipes the key material.
enum Secrets {
    Unlocked(DerivedKey),
    Armed(ArmedCipher),
}

struct ArmedCipher {
    wrapping: DerivedKey,
    content_key: SecretBytes,
    cipher: Aes256Gcm,
    nonce_key: SecretBytes,
}

impl ArmedCipher {
    fn new(content_key: SecretBytes, wrapping: DerivedKey) -> CipherResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(content_key.expose())
            .map_err(|e| CipherError::CryptoFailure(e.to_string()))?;

        let mut nonce_key = [0u8; KEY_LEN];
        Hkdf::<Sha256>::new(None, content_key.expose())
            .expand(IDENTIFIER_NONCE_INFO, &mut nonce_key)
            .map_err(|e| CipherError::CryptoFailure(e.to_string()))?;
        let secret_nonce_key = SecretBytes::copy_from(&nonce_key);
        nonce_key.zeroize();

        Ok(Self { wrapping, content_key, cipher, nonce_key: secret_nonce_key })
    }

    fn seal(&self, nonce: [u8; IV_LEN], plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CipherError::CryptoFailure(e.to_string()))?;
        let mut sealed = Vec::with_capacity(IV_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }
}

/// A "master key": a content key wrapped under a password, plus its in-memory unlocked state.
pub struct CipherUnit {
    wrapped: WrappedKey,
    secrets: Option<Secrets>,
}

impl CipherUnit {
    /// Creates a fresh random content key and wraps it under `password`.
    ///
    /// The returned unit is already armed.
    pub fn generate(password: &Password, iterations: u32) -> CipherResult<Self> {
        let content_key = SecretBytes::random(KEY_LEN)?;
        let (wrapped, wrapping) = wrap(&content_key, password, iterations)?;
        let armed = ArmedCipher::new(content_key, wrapping)?;
        Ok(Self { wrapped, secrets: Some(Secrets::Armed(armed)) })
    }

    /// Rehydrates a persisted unit without knowing its content key.
    pub fn load(wrapped: WrappedKey) -> Self {
        Self { wrapped, secrets: None }
    }

    pub fn wrapped(&self) -> &WrappedKey {
        &self.wrapped
    }

    pub fn state(&self) -> UnitState {
        match self.secrets {
            None => UnitState::Generated,
            Some(Secrets::Unlocked(_)) => UnitState::Unlocked,
            Some(Secrets::Armed(_)) => UnitState::Armed,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state() == UnitState::Armed
    }

    /// Derives the wrapping key for `password`. Any previously unlocked state is discarded
    /// first.
    pub fn unlock(&mut self, password: &Password) -> CipherResult<()> {
        self.lock();
        let derived = kdf::derive(password.as_ref(), &self.wrapped.iv, self.wrapped.iterations)?;
        self.secrets = Some(Secrets::Unlocked(derived));
        Ok(())
    }

    /// Unwraps the content key and builds the cipher.
    ///
    /// On failure the unit falls back to [UnitState::Generated] with all secrets wiped.
    pub fn arm(&mut self) -> CipherResult<()> {
        match self.secrets.take() {
            None => Err(CipherError::Locked),
            Some(Secrets::Armed(armed)) => {
                self.secrets = Some(Secrets::Armed(armed));
                Ok(())
            },
            Some(Secrets::Unlocked(derived)) => {
                let content_key = unwrap(&self.wrapped, &derived)?;
                self.secrets = Some(Secrets::Armed(ArmedCipher::new(content_key, derived)?));
                Ok(())
            },
        }
    }

    /// Checks whether `password` opens this unit without changing its state.
    pub fn accepts(&self, password: &Password) -> CipherResult<bool> {
        let derived = kdf::derive(password.as_ref(), &self.wrapped.iv, self.wrapped.iterations)?;
        match unwrap(&self.wrapped, &derived) {
            Ok(_) => Ok(true),
            Err(CipherError::AuthenticationFailed) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Drops the cipher and the content key but keeps the wrapping key, so [Self::arm] works
    /// again without the password.
    pub fn disarm(&mut self) {
        if let Some(Secrets::Armed(armed)) = self.secrets.take() {
            let ArmedCipher { wrapping, .. } = armed;
            self.secrets = Some(Secrets::Unlocked(wrapping));
        }
    }

    /// Wipes the content key, the derived wrapping key and the cipher.
    pub fn lock(&mut self) {
        self.secrets = None;
    }

    /// Wraps this unit's content key under another password, producing a second unit which
    /// decrypts everything this one does.
    pub fn copy_wrapping(&self, new_password: &Password, iterations: u32) -> CipherResult<Self> {
        let armed = self.armed()?;
        let content_key = SecretBytes::copy_from(armed.content_key.expose());
        let (wrapped, wrapping) = wrap(&content_key, new_password, iterations)?;
        let armed = ArmedCipher::new(content_key, wrapping)?;
        Ok(Self { wrapped, secrets: Some(Secrets::Armed(armed)) })
    }

    /// Encrypts under a fresh random nonce. Output is `nonce ‖ ciphertext ‖ tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let armed = self.armed()?;
        armed.seal(random_array()?, plaintext)
    }

    /// Encrypts under a nonce derived from the content key and `plaintext`, so equal plaintexts
    /// give equal ciphertexts. Only used for identifiers, whose equality the blind index
    /// already reveals.
    pub fn encrypt_deterministic(&self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let armed = self.armed()?;
        let digest = Sha256::new()
            .chain_update(armed.nonce_key.expose())
            .chain_update(plaintext)
            .finalize();
        let mut nonce = [0u8; IV_LEN];
        nonce.copy_from_slice(&digest[..IV_LEN]);
        armed.seal(nonce, plaintext)
    }

    pub fn decrypt(&self, sealed: &[u8]) -> CipherResult<SecretBytes> {
        let armed = self.armed()?;
        if sealed.len() < IV_LEN + TAG_LEN {
            return Err(CipherError::AuthenticationFailed);
        }
        let (nonce, ciphertext) = sealed.split_at(IV_LEN);
        armed
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(SecretBytes::new)
            .map_err(|_| CipherError::AuthenticationFailed)
    }

    fn armed(&self) -> CipherResult<&ArmedCipher> {
        match &self.secrets {
            Some(Secrets::Armed(armed)) => Ok(armed),
            _ => Err(CipherError::NotArmed),
        }
    }
}

impl Drop for CipherUnit {
    fn drop(&mut self) {
        self.lock();
    }
}

impl fmt::Debug for CipherUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherUnit")
            .field("iv", &hex::encode(self.wrapped.iv))
            .field("iterations", &self.wrapped.iterations)
            .field("state", &self.state())
            .finish()
    }
}

fn wrap(
    content_key: &SecretBytes,
    password: &Password,
    iterations: u32,
) -> CipherResult<(WrappedKey, DerivedKey)> {
    let iv: [u8; IV_LEN] = random_array()?;
    let derived = kdf::derive(password.as_ref(), &iv, iterations)?;
    let cipher = Aes256Gcm::new_from_slice(derived.key())
        .map_err(|e| CipherError::CryptoFailure(e.to_string()))?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(derived.iv()), content_key.expose())
        .map_err(|e| CipherError::CryptoFailure(e.to_string()))?;
    let ciphertext: [u8; WRAPPED_KEY_LEN] = sealed
        .as_slice()
        .try_into()
        .map_err(|_| CipherError::CryptoFailure("unexpected wrapped key length".to_string()))?;
    Ok((WrappedKey { ciphertext, iv, iterations }, derived))
}

fn unwrap(wrapped: &WrappedKey, derived: &DerivedKey) -> CipherResult<SecretBytes> {
    let cipher = Aes256Gcm::new_from_slice(derived.key())
        .map_err(|e| CipherError::CryptoFailure(e.to_string()))?;
    let content_key = cipher
        .decrypt(Nonce::from_slice(derived.iv()), wrapped.ciphertext.as_slice())
        .map(SecretBytes::new)
        .map_err(|_| CipherError::AuthenticationFailed)?;
    if content_key.len() != KEY_LEN {
        return Err(CipherError::AuthenticationFailed);
    }
    Ok(content_key)
}
