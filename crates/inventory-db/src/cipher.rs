//! # Cipher
//!
//! Key derivation and authenticated encryption shared by the store, the
//! import/export files and the preferences file.
//!
//! ## Key Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  store passphrase ──Argon2id(salt from store_keyring)──► store key     │
//! │                                                      (rows, key check) │
//! │                                                                         │
//! │  device master key ──HKDF-SHA256(per-file salt)──────► export key      │
//! │                    └─HKDF-SHA256("preferences")──────► prefs key       │
//! │                                                                         │
//! │  sealed blob = nonce (12 bytes) ‖ AES-256-GCM ciphertext + tag         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{DbError, DbResult};

/// Length of every symmetric key, in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// Argon2 salt length stored in the keyring.
pub const SALT_LEN: usize = 16;

/// Label recorded in `store_keyring.cipher`.
pub const STORE_CIPHER: &str = "aes-256-gcm+argon2id";

// =============================================================================
// Secrets
// =============================================================================

/// A 256-bit symmetric key, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        SecretKey(bytes)
    }

    /// Parses key bytes read from disk.
    pub fn from_slice(bytes: &[u8]) -> DbResult<Self> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| DbError::Decryption(format!("key must be {} bytes", KEY_LEN)))?;
        Ok(SecretKey(array))
    }

    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        SecretKey(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Derives a purpose-bound sub-key with HKDF-SHA256.
    pub fn derive_subkey(&self, salt: Option<&[u8]>, info: &[u8]) -> DbResult<SecretKey> {
        let hk = Hkdf::<Sha256>::new(salt, &self.0);
        let mut okm = [0u8; KEY_LEN];
        hk.expand(info, &mut okm)
            .map_err(|e| DbError::Encryption(format!("HKDF expand failed: {}", e)))?;
        Ok(SecretKey(okm))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// The store passphrase, wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Passphrase(value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(..)")
    }
}

// =============================================================================
// Key Derivation
// =============================================================================

/// Argon2id cost parameters.
///
/// The parameters a store was created with are recorded in its keyring, so
/// changing the configured values only affects stores created afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl KdfParams {
    pub const fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Self {
        KdfParams {
            m_cost,
            t_cost,
            p_cost,
        }
    }
}

impl Default for KdfParams {
    /// Argon2's recommended defaults (19 MiB, 2 passes, 1 lane).
    fn default() -> Self {
        KdfParams::new(
            Params::DEFAULT_M_COST,
            Params::DEFAULT_T_COST,
            Params::DEFAULT_P_COST,
        )
    }
}

/// Derives the store key from the passphrase.
pub fn derive_store_key(
    passphrase: &Passphrase,
    salt: &[u8],
    params: KdfParams,
) -> DbResult<SecretKey> {
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN))
        .map_err(|e| DbError::Encryption(format!("invalid KDF parameters: {}", e)))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; KEY_LEN];
    argon
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| DbError::Encryption(format!("key derivation failed: {}", e)))?;

    Ok(SecretKey(key))
}

/// Random bytes for salts.
pub fn random_salt<const N: usize>() -> [u8; N] {
    let mut salt = [0u8; N];
    OsRng.fill_bytes(&mut salt);
    salt
}

// =============================================================================
// Sealing
// =============================================================================

/// Encrypts `plaintext`, returning `nonce ‖ ciphertext`.
pub fn seal(key: &SecretKey, plaintext: &[u8]) -> DbResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| DbError::Encryption(format!("failed to create cipher: {}", e)))?;

    let nonce_bytes: [u8; NONCE_LEN] = random_salt();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| DbError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypts a blob produced by [`seal`].
pub fn open(key: &SecretKey, sealed: &[u8]) -> DbResult<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(DbError::Decryption("sealed blob too short".to_string()));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| DbError::Decryption(format!("failed to create cipher: {}", e)))?;

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| DbError::Decryption("authentication tag mismatch".to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================
