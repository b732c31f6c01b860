//! services/api/src/adapters/credentials.rs
//!
//! The `CredentialStore` backed by the users listed in the YAML auth config.

use crate::config::AuthConfig;
use coursegen_core::domain::UserCredentials;
use coursegen_core::ports::{CredentialStore, PortError, PortResult};
use std::collections::HashMap;

/// Read-only credential lookup built once at startup.
#[derive(Clone, Debug)]
pub struct YamlCredentialStore {
    users: HashMap<String, UserCredentials>,
}

impl YamlCredentialStore {
    pub fn from_config(config: &AuthConfig) -> Self {
        let users = config
            .credentials
            .usernames
            .iter()
            .map(|(username, entry)| {
                (
                    username.clone(),
                    UserCredentials {
                        username: username.clone(),
                        display_name: entry.name.clone(),
                        hashed_password: entry.password.clone(),
                    },
                )
            })
            .collect();
        Self { users }
    }
}

impl CredentialStore for YamlCredentialStore {
    fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }
}
