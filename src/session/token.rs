//! Session identifiers and signed cookie values.
//!
//! A cookie value has the form `<id>.<signature>` where `signature` is the
//! base64url HMAC-SHA256 of `id` under the current secret. Retired secrets
//! still verify so a rotation does not log every client out.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes behind every session id.
const ID_BYTES: usize = 24;

/// Opaque, unguessable session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept an identifier read back from a store or cookie.
    ///
    /// Returns `None` unless it has the shape `generate` produces.
    pub fn parse(raw: &str) -> Option<Self> {
        let well_formed = raw.len() == encoded_len()
            && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

const fn encoded_len() -> usize {
    // 24 bytes → 32 base64 characters, no padding needed
    ID_BYTES / 3 * 4
}

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct SessionSigner {
    current: Vec<u8>,
    previous: Vec<Vec<u8>>,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("previous_secrets", &self.previous.len())
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    pub fn new(secret: &str, previous: &[String]) -> Self {
        Self {
            current: secret.as_bytes().to_vec(),
            previous: previous.iter().map(|s| s.as_bytes().to_vec()).collect(),
        }
    }

    /// Produce the cookie value for `id`.
    pub fn sign(&self, id: &SessionId) -> String {
        let tag = mac(&self.current, id).finalize().into_bytes();
        format!("{}.{}", id, URL_SAFE_NO_PAD.encode(tag))
    }

    /// Recover the id from a cookie value, or `None` if it was not signed by us.
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (raw_id, signature) = value.rsplit_once('.')?;
        let id = SessionId::parse(raw_id)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        std::iter::once(&self.current)
            .chain(self.previous.iter())
            .any(|key| mac(key, &id).verify_slice(&signature).is_ok())
            .then_some(id)
    }
}

fn mac(key: &[u8], id: &SessionId) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(id.as_str().as_bytes());
    mac
}
