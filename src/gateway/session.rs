//! Stateless signed session tokens.
//!
//! A token is `header.body.signature`, each segment URL-safe base64 without
//! padding. The header is the fixed `{"alg":"HS256","typ":"JWT"}`, the body
//! is the JSON-serialised [`SessionPayload`], and the signature is
//! HMAC-SHA256 over the ASCII string `header.body`.
//!
//! Verification fails closed: any split, decode, signature or parse problem
//! yields `None`, never a partial payload. The codec does not check expiry;
//! the cookie max-age is the only lifetime bound.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize)]
struct TokenHeader {
    alg: &'static str,
    typ: &'static str,
}

const HEADER: TokenHeader = TokenHeader {
    alg: "HS256",
    typ: "JWT",
};

/// Identity fields captured at OAuth callback time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub github_id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The signed body: identity plus the server-side issued-at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(flatten)]
    pub identity: SessionIdentity,
    /// Seconds since the Unix epoch, set when the token was signed.
    pub iat: i64,
}

/// HMAC-SHA256 token signer/verifier bound to one secret.
#[derive(Clone)]
pub struct SessionCodec {
    secret: Vec<u8>,
}

impl SessionCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Sign `identity` with `iat` set to the current time.
    pub fn sign(&self, identity: &SessionIdentity) -> String {
        self.sign_at(identity, chrono::Utc::now().timestamp())
    }

    /// Sign `identity` with an explicit issued-at. Deterministic.
    pub fn sign_at(&self, identity: &SessionIdentity, iat: i64) -> String {
        let payload = SessionPayload {
            identity: identity.clone(),
            iat,
        };
        // Serialising plain structs of strings and integers cannot fail.
        let header_json = serde_json::to_vec(&HEADER).unwrap_or_default();
        let body_json = serde_json::to_vec(&payload).unwrap_or_default();

        let header = URL_SAFE_NO_PAD.encode(header_json);
        let body = URL_SAFE_NO_PAD.encode(body_json);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&header, &body).finalize().into_bytes());

        format!("{}.{}.{}", header, body, signature)
    }

    /// Recover the payload, or `None` if the token is not one we signed.
    pub fn verify(&self, token: &str) -> Option<SessionPayload> {
        let mut segments = token.split('.');
        let (header, body, signature) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some()
            || header.is_empty()
            || body.is_empty()
            || signature.is_empty()
        {
            return None;
        }

        // Strict decoding rejects non-canonical encodings, so a one-character
        // change to the signature segment never decodes to the same digest.
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        self.mac(header, body).verify_slice(&signature).ok()?;

        let body = URL_SAFE_NO_PAD.decode(body).ok()?;
        serde_json::from_slice(&body).ok()
    }

    fn mac(&self, header: &str, body: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        mac
    }
}
