use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pwhash::md5_crypt;
use pwhash::HashSetup;
use rand::Rng;
use sha2::{Digest, Sha256};

const AES_BLOCK_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The MD5-crypt implementation rejected the salt
    Digest(String),
    /// Ciphertext was not valid base64
    Base64,
    /// Ciphertext is not a whole number of AES blocks
    BlockLength,
    /// Decrypted payload is not valid UTF-8
    Utf8,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::Digest(msg) => write!(f, "digest error: {msg}"),
            CryptoError::Base64 => write!(f, "ciphertext is not valid base64"),
            CryptoError::BlockLength => write!(f, "ciphertext length is not a multiple of 16"),
            CryptoError::Utf8 => write!(f, "decrypted payload is not valid UTF-8"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Hash portion (third `$`-delimited field) of the MD5-crypt digest
/// `$1$<salt>$<hash>` of `word`.
pub fn md5_crypt_hash(word: &str, salt: &str) -> Result<String, CryptoError> {
    let setup = HashSetup {
        salt: Some(salt),
        rounds: None,
    };
    let digest =
        md5_crypt::hash_with(setup, word).map_err(|err| CryptoError::Digest(err.to_string()))?;
    digest
        .split('$')
        .nth(3)
        .map(str::to_owned)
        .ok_or_else(|| CryptoError::Digest(String::from("unexpected digest format")))
}

/// AES key for the encrypted dialect: the SHA-256 hex digest of the salted
/// password hash, hex-decoded back to raw bytes.
pub fn derive_aes_key(md5_pwd: &str) -> [u8; 32] {
    Sha256::digest(md5_pwd.as_bytes()).into()
}

/// AES-256-ECB over the UTF-8 text, right-padded with null bytes to a whole
/// number of blocks, then base64. The weak mode and padding are the device's
/// wire format and must stay as they are.
pub fn aes_ecb_encrypt(key: &[u8; 32], plaintext: &str) -> String {
    let cipher = Aes256::new(key.into());
    let mut data = plaintext.as_bytes().to_vec();
    data.resize(data.len().next_multiple_of(AES_BLOCK_SIZE), 0);
    for block in data.chunks_mut(AES_BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    STANDARD.encode(data)
}

/// Inverse of [`aes_ecb_encrypt`]: base64-decode, decrypt block-wise, strip
/// the trailing null padding.
pub fn aes_ecb_decrypt(key: &[u8; 32], ciphertext: &str) -> Result<String, CryptoError> {
    let mut data = STANDARD
        .decode(ciphertext)
        .map_err(|_| CryptoError::Base64)?;
    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::BlockLength);
    }
    let cipher = Aes256::new(key.into());
    for block in data.chunks_mut(AES_BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    while data.last() == Some(&0) {
        data.pop();
    }
    String::from_utf8(data).map_err(|_| CryptoError::Utf8)
}

/// Authentication material for one simulated device. Salts and the derived
/// digests are fixed for the device's lifetime; there is no session state
/// beyond re-checking the same token on every encrypted request.
pub struct AuthSecrets {
    salt: String,
    newsalt: String,
    salt_time: String,
    host_sign: String,
    aes_key: [u8; 32],
}

impl AuthSecrets {
    /// Fresh material: two independent random 8-byte-hex salts and the
    /// truncated-decimal creation timestamp.
    pub fn generate(password: &str) -> Result<Self, CryptoError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_secs_f64();
        let stamp = format!("{now:.6}");
        let salt_time = stamp[..stamp.len() - 4].to_string();
        Self::with_material(password, random_salt(), random_salt(), salt_time)
    }

    /// Build from fixed material; [`generate`](Self::generate) is the normal
    /// entry point.
    pub fn with_material(
        password: &str,
        salt: String,
        newsalt: String,
        salt_time: String,
    ) -> Result<Self, CryptoError> {
        let md5_pwd = md5_crypt_hash(password, &salt)?;
        let host_sign = md5_crypt_hash(&format!("{md5_pwd}{salt_time}"), &newsalt)?;
        let aes_key = derive_aes_key(&md5_pwd);
        Ok(AuthSecrets {
            salt,
            newsalt,
            salt_time,
            host_sign,
            aes_key,
        })
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn newsalt(&self) -> &str {
        &self.newsalt
    }

    pub fn salt_time(&self) -> &str {
        &self.salt_time
    }

    /// The token a client must present with every encrypted request.
    pub fn host_sign(&self) -> &str {
        &self.host_sign
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        aes_ecb_encrypt(&self.aes_key, plaintext)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        aes_ecb_decrypt(&self.aes_key, ciphertext)
    }
}

fn random_salt() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    hex::encode(bytes)
}
