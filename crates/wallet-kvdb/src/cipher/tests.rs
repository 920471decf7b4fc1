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

use std::time::Duration;

use super::{
    constants::{IV_LEN, KEY_LEN, PERSISTED_UNIT_LEN},
    kdf, CipherUnit, Error, Password, PasswordMethod, UnitState, WrappedKey,
};

const TEST_ITERATIONS: u32 = 64;

fn new_unit(password: &str) -> CipherUnit {
    CipherUnit::generate(&Password::from(password), TEST_ITERATIONS).unwrap()
}

#[test]
fn test_derive_is_deterministic() {
    let a = kdf::derive(b"password", &[7; IV_LEN], 10).unwrap();
    let b = kdf::derive(b"password", &[7; IV_LEN], 10).unwrap();
    assert_eq!(a.key(), b.key());
    assert_eq!(a.iv(), b.iv());

    // every input changes the output
    let other_iv = kdf::derive(b"password", &[8; IV_LEN], 10).unwrap();
    let other_iterations = kdf::derive(b"password", &[7; IV_LEN], 11).unwrap();
    let other_password = kdf::derive(b"passw0rd", &[7; IV_LEN], 10).unwrap();
    assert_ne!(a.key(), other_iv.key());
    assert_ne!(a.key(), other_iterations.key());
    assert_ne!(a.key(), other_password.key());
    assert_eq!(a.key().len(), KEY_LEN);
}

#[test]
fn test_derive_rejects_invalid_input() {
    assert!(matches!(kdf::derive(b"password", &[7; IV_LEN], 0), Err(Error::InvalidInput(_))));
    assert!(matches!(kdf::derive(b"", &[7; IV_LEN], 1), Err(Error::InvalidInput(_))));
    assert!(matches!(kdf::derive(b"password", &[], 1), Err(Error::InvalidInput(_))));
}

#[test]
fn test_benchmark_scales_with_duration() {
    // warm up so the first measurement is not penalised
    kdf::benchmark(Duration::from_millis(20));

    let short = kdf::benchmark(Duration::from_millis(100));
    let long = kdf::benchmark(Duration::from_millis(200));
    assert!(short > 0);
    assert!(
        f64::from(long) >= 1.25 * f64::from(short),
        "expected roughly twice as many iterations, got {short} and {long}"
    );
}

#[test]
fn test_calibrate_applies_floor() {
    assert_eq!(kdf::calibrate(Duration::ZERO, 5000), 5000);
}

#[test]
fn test_round_trip() {
    let unit = new_unit("testingpassword123!");
    assert_eq!(unit.state(), UnitState::Armed);

    let payloads: [&[u8]; 4] = [b"", b"a", b"correct horse battery staple", &[0xff; 4096]];
    for payload in payloads {
        let ciphertext = unit.encrypt(payload).unwrap();
        assert_ne!(&ciphertext[..], payload);
        assert_eq!(unit.decrypt(&ciphertext).unwrap().expose(), payload);
    }
}

#[test]
fn test_encryption_is_randomized() {
    let unit = new_unit("testingpassword123!");
    assert_ne!(unit.encrypt(b"value").unwrap(), unit.encrypt(b"value").unwrap());

    // identifiers must map to one storage key
    assert_eq!(
        unit.encrypt_deterministic(b"address").unwrap(),
        unit.encrypt_deterministic(b"address").unwrap()
    );
    assert_ne!(
        unit.encrypt_deterministic(b"address").unwrap(),
        unit.encrypt_deterministic(b"address2").unwrap()
    );
}

#[test]
fn test_wrong_unit_rejected() {
    let unit = new_unit("testingpassword123!");
    let other = new_unit("another password");

    let ciphertext = unit.encrypt(b"secret").unwrap();
    assert!(matches!(other.decrypt(&ciphertext), Err(Error::AuthenticationFailed)));

    let mut tampered = ciphertext.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 1;
    assert!(matches!(unit.decrypt(&tampered), Err(Error::AuthenticationFailed)));
    assert!(matches!(unit.decrypt(&[1, 2, 3]), Err(Error::AuthenticationFailed)));
}

#[test]
fn test_state_machine() {
    let password = Password::from("testingpassword123!");
    let generated = new_unit("testingpassword123!");
    let ciphertext = generated.encrypt(b"payload").unwrap();

    let mut unit = CipherUnit::load(generated.wrapped().clone());
    assert_eq!(unit.state(), UnitState::Generated);
    assert!(matches!(unit.encrypt(b"x"), Err(Error::NotArmed)));
    assert!(matches!(unit.decrypt(&ciphertext), Err(Error::NotArmed)));
    assert!(matches!(unit.arm(), Err(Error::Locked)));

    unit.unlock(&password).unwrap();
    assert_eq!(unit.state(), UnitState::Unlocked);
    assert!(matches!(unit.decrypt(&ciphertext), Err(Error::NotArmed)));

    unit.arm().unwrap();
    assert_eq!(unit.state(), UnitState::Armed);
    assert_eq!(unit.decrypt(&ciphertext).unwrap().expose(), b"payload");

    // arming twice is a no-op
    unit.arm().unwrap();
    assert!(unit.is_armed());

    // disarming keeps the wrapping key
    unit.disarm();
    assert_eq!(unit.state(), UnitState::Unlocked);
    assert!(matches!(unit.encrypt(b"x"), Err(Error::NotArmed)));
    unit.arm().unwrap();
    assert_eq!(unit.decrypt(&ciphertext).unwrap().expose(), b"payload");

    unit.lock();
    assert_eq!(unit.state(), UnitState::Generated);
    assert!(matches!(unit.decrypt(&ciphertext), Err(Error::NotArmed)));

    // the persisted part survives locking, so the unit can be unlocked again
    unit.unlock(&password).unwrap();
    unit.arm().unwrap();
    assert_eq!(unit.decrypt(&ciphertext).unwrap().expose(), b"payload");
}

#[test]
fn test_wrong_password_fails_at_arm() {
    let generated = new_unit("testingpassword123!");
    let mut unit = CipherUnit::load(generated.wrapped().clone());

    // unlock cannot tell the password is wrong
    unit.unlock(&Password::from("wrong")).unwrap();
    assert_eq!(unit.state(), UnitState::Unlocked);

    assert!(matches!(unit.arm(), Err(Error::AuthenticationFailed)));
    assert_eq!(unit.state(), UnitState::Generated);
}

#[test]
fn test_accepts() {
    let unit = new_unit("testingpassword123!");
    let loaded = CipherUnit::load(unit.wrapped().clone());
    assert!(loaded.accepts(&Password::from("testingpassword123!")).unwrap());
    assert!(!loaded.accepts(&Password::from("wrong")).unwrap());
    assert_eq!(loaded.state(), UnitState::Generated);
}

#[test]
fn test_copy_wrapping_shares_content_key() {
    let first = new_unit("first password");
    let second = first.copy_wrapping(&Password::from("second password"), TEST_ITERATIONS).unwrap();
    assert_ne!(first.wrapped(), second.wrapped());

    let from_first = first.encrypt(b"shared").unwrap();
    let from_second = second.encrypt(b"shared").unwrap();
    assert_eq!(second.decrypt(&from_first).unwrap().expose(), b"shared");
    assert_eq!(first.decrypt(&from_second).unwrap().expose(), b"shared");

    // the copy opens with its own password only
    let mut reloaded = CipherUnit::load(second.wrapped().clone());
    reloaded.unlock(&Password::from("first password")).unwrap();
    assert!(matches!(reloaded.arm(), Err(Error::AuthenticationFailed)));
    reloaded.unlock(&Password::from("second password")).unwrap();
    reloaded.arm().unwrap();
    assert_eq!(reloaded.decrypt(&from_first).unwrap().expose(), b"shared");

    let locked = CipherUnit::load(first.wrapped().clone());
    assert!(matches!(
        locked.copy_wrapping(&Password::from("third"), TEST_ITERATIONS),
        Err(Error::NotArmed)
    ));
}

#[test]
fn test_wrapped_key_bytes() {
    let unit = new_unit("testingpassword123!");
    let bytes = unit.wrapped().to_bytes();
    assert_eq!(bytes.len(), PERSISTED_UNIT_LEN);
    assert_eq!(&bytes[48..60], unit.wrapped().iv());
    assert_eq!(WrappedKey::from_bytes(&bytes).unwrap(), *unit.wrapped());

    assert!(matches!(WrappedKey::from_bytes(&bytes[1..]), Err(Error::InvalidInput(_))));
    let mut zero_iterations = bytes;
    zero_iterations[60..].copy_from_slice(&[0; 4]);
    assert!(matches!(WrappedKey::from_bytes(&zero_iterations), Err(Error::InvalidInput(_))));
}

#[test]
fn test_generate_rejects_empty_password() {
    assert!(matches!(
        CipherUnit::generate(&Password::from(""), TEST_ITERATIONS),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_no_password_method() {
    let password = PasswordMethod::NoPassword.execute().unwrap();
    assert!(!password.is_empty());
    assert_eq!(format!("{password:?}"), "Password([REDACTED])");
}
