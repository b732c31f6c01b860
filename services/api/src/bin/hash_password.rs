//! services/api/src/bin/hash_password.rs
//!
//! Prints Argon2 PHC hashes for the `password` entries of `config.yaml`.
//!
//! Usage: `hash_password <password>...`, or pipe one password per line on stdin.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand_core::OsRng;
use std::io::{self, BufRead};

fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut passwords: Vec<String> = std::env::args().skip(1).collect();
    if passwords.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if !line.is_empty() {
                passwords.push(line);
            }
        }
    }
    if passwords.is_empty() {
        return Err("usage: hash_password <password>... (or one password per line on stdin)".into());
    }

    for password in &passwords {
        println!("{}", hash(password).map_err(|e| e.to_string())?);
    }
    Ok(())
}
