//! Password hashing and verification.
//!
//! New hashes are always bcrypt. Verification walks an ordered chain of
//! schemes so accounts imported with legacy phpass ("portable") hashes keep
//! working until their next password change.

use crate::error::OAuthError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// bcrypt work factor for newly stored hashes.
pub const HASH_COST: u32 = 10;

/// One password hashing scheme able to check a candidate against a stored hash.
pub trait PasswordScheme: Send + Sync {
    fn name(&self) -> &'static str;

    /// `false` for a mismatch and for hashes this scheme cannot parse.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

pub struct Bcrypt;

impl PasswordScheme for Bcrypt {
    fn name(&self) -> &'static str {
        "bcrypt"
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

/// phpass portable hashes (`$P$` / `$H$`), as written by WordPress and friends.
pub struct Phpass;

const ITOA64: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

impl Phpass {
    /// Recomputes the hash for `password` using the setting (prefix, cost and
    /// salt) of `stored`. Returns `None` for malformed settings.
    pub(crate) fn crypt(password: &str, stored: &str) -> Option<String> {
        let setting = stored.get(..12)?;
        if !(setting.starts_with("$P$") || setting.starts_with("$H$")) {
            return None;
        }
        let count_log2 = ITOA64.iter().position(|&c| c == setting.as_bytes()[3])?;
        if !(7..=30).contains(&count_log2) {
            return None;
        }
        let salt = &setting[4..12];

        let mut input = Vec::with_capacity(salt.len() + password.len());
        input.extend_from_slice(salt.as_bytes());
        input.extend_from_slice(password.as_bytes());
        let mut digest = md5::compute(&input).0;
        for _ in 0..(1u32 << count_log2) {
            let mut round = Vec::with_capacity(16 + password.len());
            round.extend_from_slice(&digest);
            round.extend_from_slice(password.as_bytes());
            digest = md5::compute(&round).0;
        }

        let mut out = String::with_capacity(34);
        out.push_str(setting);
        out.push_str(&encode64(&digest));
        Some(out)
    }
}

impl PasswordScheme for Phpass {
    fn name(&self) -> &'static str {
        "phpass"
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match Phpass::crypt(password, hash) {
            Some(computed) => computed.as_bytes().ct_eq(hash.as_bytes()).into(),
            None => false,
        }
    }
}

// phpass's little-endian base64 variant
fn encode64(input: &[u8]) -> String {
    let count = input.len();
    let mut out = String::with_capacity(22);
    let mut i = 0;
    loop {
        let mut value = u32::from(input[i]);
        i += 1;
        out.push(ITOA64[(value & 0x3f) as usize] as char);
        if i < count {
            value |= u32::from(input[i]) << 8;
        }
        out.push(ITOA64[((value >> 6) & 0x3f) as usize] as char);
        if i >= count {
            break;
        }
        i += 1;
        if i < count {
            value |= u32::from(input[i]) << 16;
        }
        out.push(ITOA64[((value >> 12) & 0x3f) as usize] as char);
        if i >= count {
            break;
        }
        i += 1;
        out.push(ITOA64[((value >> 18) & 0x3f) as usize] as char);
        if i >= count {
            break;
        }
    }
    out
}

/// Ordered list of schemes; a password is accepted if any scheme accepts it.
pub struct PasswordVerifier {
    schemes: Vec<Box<dyn PasswordScheme>>,
}

impl Default for PasswordVerifier {
    fn default() -> Self {
        Self {
            schemes: vec![Box::new(Bcrypt), Box::new(Phpass)],
        }
    }
}

impl PasswordVerifier {
    pub fn new(schemes: Vec<Box<dyn PasswordScheme>>) -> Self {
        Self { schemes }
    }

    /// Name of the first scheme accepting the password.
    pub fn matching_scheme(&self, password: &str, hash: &str) -> Option<&'static str> {
        self.schemes
            .iter()
            .find(|scheme| scheme.verify(password, hash))
            .map(|scheme| scheme.name())
    }

    pub fn verify(&self, password: &str, hash: &str) -> bool {
        self.matching_scheme(password, hash).is_some()
    }

    /// [`PasswordVerifier::verify`] on the blocking pool.
    pub async fn verify_blocking(
        self: Arc<Self>,
        password: &str,
        hash: &str,
    ) -> Result<bool, OAuthError> {
        let (password, hash) = (password.to_owned(), hash.to_owned());
        on_blocking_pool(move || self.verify(&password, &hash)).await
    }
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, OAuthError> {
    bcrypt::hash(password, HASH_COST).map_err(|e| OAuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash with the default scheme chain.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordVerifier::default().verify(password, hash)
}

/// [`hash_password`] on the blocking pool; bcrypt is slow.
pub async fn hash_password_blocking(password: &str) -> Result<String, OAuthError> {
    let password = password.to_owned();
    on_blocking_pool(move || hash_password(&password)).await?
}

/// A job that panics or is cancelled surfaces as [`OAuthError::PasswordHash`].
async fn on_blocking_pool<F, R>(job: F) -> Result<R, OAuthError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| OAuthError::PasswordHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHPASS_SAMPLE: &str = "$P$9IQRaTwmfeRo7ud9Fh4E2PdI0S3r.L0";

    #[test]
    fn test_hash_and_verify_password() {
        let password = "my-secure-password-123!";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(hash.starts_with("$2"));
        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_hash_produces_different_salts() {
        let hash1 = hash_password("same-password").expect("Failed to hash");
        let hash2 = hash_password("same-password").expect("Failed to hash");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_phpass_known_hash() {
        assert!(Phpass.verify("test12345", PHPASS_SAMPLE));
        assert!(!Phpass.verify("test12346", PHPASS_SAMPLE));
    }

    #[test]
    fn test_chain_falls_back_to_phpass() {
        let verifier = PasswordVerifier::default();
        assert_eq!(
            verifier.matching_scheme("test12345", PHPASS_SAMPLE),
            Some("phpass")
        );

        let bcrypt_hash = hash_password("test12345").expect("hash");
        assert_eq!(
            verifier.matching_scheme("test12345", &bcrypt_hash),
            Some("bcrypt")
        );
    }

    #[test]
    fn test_chain_rejects_when_every_scheme_rejects() {
        let verifier = PasswordVerifier::default();
        assert!(!verifier.verify("wrong", PHPASS_SAMPLE));
        assert!(!verifier.verify("password", ""));
        assert!(!verifier.verify("password", "$invalid$hash$format"));
    }

    #[test]
    fn test_chain_order_is_respected() {
        let bcrypt_only = PasswordVerifier::new(vec![Box::new(Bcrypt)]);
        assert!(!bcrypt_only.verify("test12345", PHPASS_SAMPLE));
    }

    #[test]
    fn test_phpass_rejects_altered_hash() {
        let altered = PHPASS_SAMPLE.replace("L0", "L1");
        assert!(!Phpass.verify("test12345", &altered));
        assert!(!Phpass.verify("test12345", &format!("{PHPASS_SAMPLE}x")));
        assert!(Phpass.verify("test12345", PHPASS_SAMPLE));
    }

    #[test]
    fn test_phpass_rejects_bad_cost() {
        // '/' encodes a cost of 1, below the accepted range
        assert!(Phpass::crypt("x", "$P$/IQRaTwmfeRo7ud9Fh4E2PdI0S3r.L0").is_none());
    }

    #[tokio::test]
    async fn test_panicking_job_is_a_hash_error() {
        let result = on_blocking_pool(|| -> bool { panic!("scheme blew up") }).await;
        assert!(matches!(result, Err(OAuthError::PasswordHash(_))));
    }

    #[tokio::test]
    async fn test_verify_blocking() {
        let verifier = Arc::new(PasswordVerifier::default());
        assert!(verifier.clone().verify_blocking("test12345", PHPASS_SAMPLE).await.unwrap());
        assert!(!verifier.verify_blocking("wrong", PHPASS_SAMPLE).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_on_blocking_pool() {
        let hash = hash_password_blocking("secret-pass").await.expect("hash");
        assert!(verify_password("secret-pass", &hash));
        assert!(!verify_password("other-pass", &hash));
    }
}
