//! Stored OAuth token access: encryption at rest and expiry checks.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::db::{DbStoredToken, TokenUpsert};
use crate::error::ApertureError;

const NONCE_LEN: usize = 24;

/// Seals tokens with XChaCha20-Poly1305 under a key derived from a configured secret.
///
/// Without a secret the cipher is a passthrough and tokens are stored as plaintext.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Option<XChaCha20Poly1305>,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("enabled", &self.cipher.is_some())
            .finish()
    }
}

impl TokenCipher {
    pub fn from_secret(secret: &str) -> Self {
        let secret = secret.trim();
        if secret.is_empty() {
            return Self::plaintext();
        }
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Some(XChaCha20Poly1305::new(&key)),
        }
    }

    pub fn plaintext() -> Self {
        Self { cipher: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Returns the stored form of `plain` and whether it is encrypted.
    pub fn seal(&self, plain: &str) -> Result<(String, bool), ApertureError> {
        let Some(cipher) = &self.cipher else {
            return Ok((plain.to_string(), false));
        };

        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|e| ApertureError::Crypto(format!("encrypt failed: {e}")))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok((STANDARD.encode(sealed), true))
    }

    /// Decrypts a value produced by [`TokenCipher::seal`] with encryption enabled.
    pub fn open(&self, sealed: &str) -> Result<String, ApertureError> {
        let cipher = self.cipher.as_ref().ok_or_else(|| {
            ApertureError::Crypto(
                "stored token is encrypted but no token_encryption_key is configured".to_string(),
            )
        })?;

        let raw = STANDARD
            .decode(sealed.trim())
            .map_err(|e| ApertureError::Crypto(format!("invalid base64: {e}")))?;
        if raw.len() <= NONCE_LEN {
            return Err(ApertureError::Crypto("ciphertext too short".to_string()));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plain = cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|e| ApertureError::Crypto(format!("decrypt failed: {e}")))?;

        String::from_utf8(plain)
            .map_err(|e| ApertureError::Crypto(format!("decrypted token is not UTF-8: {e}")))
    }

    /// Builds the row written for a freshly obtained token.
    ///
    /// The encrypted flag covers both the access and the refresh token columns.
    pub fn token_upsert(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<TokenUpsert, ApertureError> {
        let (access_token, encrypted) = self.seal(access_token)?;
        let refresh_token = refresh_token
            .map(|rt| self.seal(rt).map(|(sealed, _)| sealed))
            .transpose()?;

        Ok(TokenUpsert {
            access_token,
            access_token_encrypted: encrypted,
            refresh_token,
            expires_at,
        })
    }
}

/// Plaintext access token of a stored row.
pub fn access_token(token: &DbStoredToken, cipher: &TokenCipher) -> Result<String, ApertureError> {
    if token.access_token_encrypted {
        cipher.open(&token.access_token)
    } else {
        Ok(token.access_token.clone())
    }
}

pub fn is_expired(token: &DbStoredToken, now: DateTime<Utc>) -> bool {
    token.expires_at <= now
}

/// Token usable for a sync run, or the precondition failure that prevents one.
pub fn usable_access_token(
    token: Option<DbStoredToken>,
    cipher: &TokenCipher,
    now: DateTime<Utc>,
) -> Result<String, ApertureError> {
    let token = token.ok_or(ApertureError::NotAuthenticated)?;
    if is_expired(&token, now) {
        return Err(ApertureError::TokenExpired(token.expires_at));
    }
    access_token(&token, cipher)
}
