//! services/api/src/password.rs
//!
//! Checks passwords against the hashes stored in the credentials file.
//!
//! `hash_password` writes Argon2 PHC strings. bcrypt hashes (`$2a$`, `$2b$`,
//! `$2y$`) from older credential files are accepted as well.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Checked in place of a real hash when the username is unknown, so both login
/// paths pay for one Argon2 verification with the default parameters.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$0uk7Vb7XkJ4s7hkiJ0E0yX6cOjwT6Y7OMN8a6N8OWMc";

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("malformed bcrypt hash: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("malformed Argon2 hash: {0}")]
    Argon2(String),
}

fn is_bcrypt(stored: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|prefix| stored.starts_with(prefix))
}

fn parse_argon2(stored: &str) -> Result<PasswordHash<'_>, HashError> {
    PasswordHash::new(stored).map_err(|e| HashError::Argon2(e.to_string()))
}

/// Fails when `stored` is neither a bcrypt hash nor an Argon2 PHC string.
pub fn check_format(stored: &str) -> Result<(), HashError> {
    if is_bcrypt(stored) {
        // bcrypt has no parse-only entry point; a throwaway verify parses the hash.
        bcrypt::verify("", stored)?;
    } else {
        parse_argon2(stored)?;
    }
    Ok(())
}

/// Whether `password` matches `stored`. Both verifiers compare in constant time.
pub fn verify(password: &str, stored: &str) -> Result<bool, HashError> {
    if is_bcrypt(stored) {
        return Ok(bcrypt::verify(password, stored)?);
    }
    let parsed = parse_argon2(stored)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
