//! Salted scrypt password hashing.
//!
//! Stored form is `hex(salt):hex(key)` with a random 16-byte salt and a
//! 64-byte derived key (N = 2^14, r = 16, p = 1). Verification compares keys
//! in constant time.

use std::fmt;

use rand::RngCore;
use scrypt::{Params, scrypt};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;
const LOG_N: u8 = 14;
const R: u32 = 16;
const P: u32 = 1;

/// Errors raised while hashing a password.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    /// The scrypt parameters or output length were rejected.
    #[error("password hashing failed: {message}")]
    Hashing { message: String },
}

/// Stored password hash. `Debug` never prints the hash itself.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash read back from storage.
    #[must_use]
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The encoded `salt:key` form for persistence.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Hash `password` with a fresh random salt.
///
/// # Examples
/// ```
/// use siteulation::domain::password::{hash_password, verify_password};
///
/// let hash = hash_password("correct horse").expect("hash");
/// assert!(verify_password("correct horse", &hash));
/// assert!(!verify_password("battery staple", &hash));
/// ```
pub fn hash_password(password: &str) -> Result<PasswordHash, PasswordError> {
    let mut salt = [0_u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let key = derive_key(password, &salt_hex)?;
    Ok(PasswordHash(format!("{salt_hex}:{}", hex::encode(key.as_slice()))))
}

/// Check `password` against a stored hash.
///
/// Malformed stored hashes never verify.
#[must_use]
pub fn verify_password(password: &str, hash: &PasswordHash) -> bool {
    let Some((salt_hex, key_hex)) = hash.as_str().split_once(':') else {
        return false;
    };
    let Ok(expected) = hex::decode(key_hex) else {
        return false;
    };
    match derive_key(password, salt_hex) {
        Ok(derived) => constant_time_equal(derived.as_slice(), &expected),
        Err(_) => false,
    }
}

fn derive_key(password: &str, salt: &str) -> Result<Zeroizing<Vec<u8>>, PasswordError> {
    let params = Params::new(LOG_N, R, P, KEY_LEN).map_err(|err| PasswordError::Hashing {
        message: err.to_string(),
    })?;
    let mut output = Zeroizing::new(vec![0_u8; KEY_LEN]);
    scrypt(password.as_bytes(), salt.as_bytes(), &params, output.as_mut_slice()).map_err(|err| {
        PasswordError::Hashing {
            message: err.to_string(),
        }
    })?;
    Ok(output)
}

fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
