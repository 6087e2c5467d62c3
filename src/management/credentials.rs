use std::path::{Path, PathBuf};

use crate::{Res, config, types::Credentials};

/// Loads the client id and secret used for the client-credential exchange.
///
/// A missing file or missing fields are tolerated here; the Token Manager
/// turns them into a fatal error on the first authentication attempt.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_config() -> Self {
        Self::new(config::credentials_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the credential file, filling gaps from the environment.
    ///
    /// # Errors
    ///
    /// Fails only when the file exists but is not valid JSON.
    pub async fn load(&self) -> Res<Credentials> {
        let mut credentials = if self.path.is_file() {
            let content = async_fs::read_to_string(&self.path).await?;
            serde_json::from_str::<Credentials>(&content)?
        } else {
            log::warn!("Credentials file {} not found", self.path.display());
            Credentials::default()
        };

        if credentials.client_id.is_none() {
            credentials.client_id = config::spotify_client_id();
        }
        if credentials.client_secret.is_none() {
            credentials.client_secret = config::spotify_client_secret();
        }
        Ok(credentials)
    }
}
