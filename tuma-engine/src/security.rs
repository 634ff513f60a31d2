//! Sealing of one-time withdrawal verification codes.

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix for withdrawal verification keys handed to the worker.
pub const SECRET_KEY_PREFIX: &str = "wvk_";

/// Generates an unguessable secret-store key.
pub fn generate_secret_key() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("{SECRET_KEY_PREFIX}{suffix}")
}

/// Seals a verification code under the service secret using HMAC-SHA256.
///
/// The plaintext code never reaches the secret store or any event
/// payload; only this sealed form is stored.
pub fn seal_code(code: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(code.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a presented code against a sealed one using constant-time
/// comparison.
pub fn verify_code(code: &str, sealed: &str, secret: &str) -> bool {
    let expected = seal_code(code, secret);
    expected.as_bytes().ct_eq(sealed.as_bytes()).into()
}
