//! Signing credential sources.
//!
//! A source yields descriptors in preference order. Sources are asked again
//! on every lookup, so keys added to a directory or rotated by the embedding
//! application are picked up without a restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::config::{SigningKeyConfig, parse_algorithm};
use crate::error::AuthError;
use crate::signing::descriptor::{NEVER_EXPIRES, SigningCredentialsDescriptor};
use crate::token::jwt::{PemKeyPair, SigningAlgorithm, SigningKeyPair};

/// Subject of the development key pair.
pub const DEVELOPMENT_SUBJECT: &str = "idsvc.development";

const PRIVATE_KEY_SUFFIX: &str = ".key.pem";
const PUBLIC_KEY_SUFFIX: &str = ".pub.pem";

/// Lifetime of a development key, counted from its file modification time.
const DEVELOPMENT_KEY_LIFETIME: Duration = Duration::days(365);

/// Owner read/write only.
const PRIVATE_KEY_MODE: u32 = 0o600;
const PUBLIC_KEY_MODE: u32 = 0o644;

/// A provider of signing credentials.
#[async_trait]
pub trait SigningCredentialsSource: Send + Sync {
    /// Returns the descriptors of this source, most preferred first.
    ///
    /// # Errors
    ///
    /// Returns an error if key material cannot be read.
    async fn credentials(&self) -> AuthResult<Vec<SigningCredentialsDescriptor>>;
}

// =============================================================================
// Static source
// =============================================================================

/// A fixed list of descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialsSource {
    descriptors: Vec<SigningCredentialsDescriptor>,
}

impl StaticCredentialsSource {
    /// Creates a source from prepared descriptors.
    #[must_use]
    pub fn new(descriptors: Vec<SigningCredentialsDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Loads configured PEM key files.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or holds an invalid key.
    pub async fn load(configs: &[SigningKeyConfig]) -> AuthResult<Self> {
        let mut descriptors = Vec::with_capacity(configs.len());

        for config in configs {
            let algorithm = parse_algorithm(&config.algorithm)?;
            let private_pem = read_pem(&config.private_key_path).await?;
            let public_pem = read_pem(&config.public_key_path).await?;
            let key = SigningKeyPair::from_pem(&config.kid, algorithm, &private_pem, &public_pem)?;

            let descriptor = SigningCredentialsDescriptor::new(
                Arc::new(key),
                config.not_before.unwrap_or(OffsetDateTime::UNIX_EPOCH),
                config.expires.unwrap_or(NEVER_EXPIRES),
            );

            tracing::debug!(kid = %config.kid, algorithm = %algorithm, "Loaded signing key");
            descriptors.push(descriptor);
        }

        Ok(Self { descriptors })
    }
}

#[async_trait]
impl SigningCredentialsSource for StaticCredentialsSource {
    async fn credentials(&self) -> AuthResult<Vec<SigningCredentialsDescriptor>> {
        Ok(self.descriptors.clone())
    }
}

// =============================================================================
// Development source
// =============================================================================

/// Reads the development key pair from a directory.
///
/// The directory is scanned for `<subject>.key.pem` files; the pair whose
/// subject is [`DEVELOPMENT_SUBJECT`] is used, valid from the private key
/// file's modification time for one year.
#[derive(Debug, Clone)]
pub struct DevelopmentCredentialsSource {
    directory: PathBuf,
    algorithm: SigningAlgorithm,
}

impl DevelopmentCredentialsSource {
    /// Creates a source reading `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, algorithm: SigningAlgorithm) -> Self {
        Self {
            directory: directory.into(),
            algorithm,
        }
    }

    /// Path of the development private key.
    #[must_use]
    pub fn private_key_path(&self) -> PathBuf {
        self.directory
            .join(format!("{DEVELOPMENT_SUBJECT}{PRIVATE_KEY_SUFFIX}"))
    }

    /// Path of the development public key.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.directory
            .join(format!("{DEVELOPMENT_SUBJECT}{PUBLIC_KEY_SUFFIX}"))
    }

    /// Generates the development key pair unless one already exists.
    ///
    /// Returns `true` if a key pair was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be generated or written.
    pub async fn ensure_credentials(&self) -> AuthResult<bool> {
        let private_path = self.private_key_path();
        if tokio::fs::try_exists(&private_path)
            .await
            .map_err(|e| AuthError::signing(format!("{}: {e}", private_path.display())))?
        {
            return Ok(false);
        }

        let pem = PemKeyPair::generate(self.algorithm)?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| AuthError::signing(format!("{}: {e}", self.directory.display())))?;
        write_pem(&private_path, &pem.private_pem, PRIVATE_KEY_MODE).await?;
        write_pem(&self.public_key_path(), &pem.public_pem, PUBLIC_KEY_MODE).await?;

        tracing::info!(
            directory = %self.directory.display(),
            algorithm = %self.algorithm,
            "Generated development signing key"
        );
        Ok(true)
    }

    async fn load(&self, private_path: &Path, subject: &str) -> AuthResult<SigningCredentialsDescriptor> {
        let public_path = self.directory.join(format!("{subject}{PUBLIC_KEY_SUFFIX}"));
        let private_pem = read_pem(private_path).await?;
        let public_pem = read_pem(&public_path).await?;

        let modified = tokio::fs::metadata(private_path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| AuthError::signing(format!("{}: {e}", private_path.display())))?;
        let not_before = OffsetDateTime::from(modified);

        let kid = key_id(&public_pem);
        let key = SigningKeyPair::from_pem(kid, self.algorithm, &private_pem, &public_pem)?;

        Ok(SigningCredentialsDescriptor::new(
            Arc::new(key),
            not_before,
            not_before + DEVELOPMENT_KEY_LIFETIME,
        ))
    }
}

#[async_trait]
impl SigningCredentialsSource for DevelopmentCredentialsSource {
    async fn credentials(&self) -> AuthResult<Vec<SigningCredentialsDescriptor>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    directory = %self.directory.display(),
                    "Development key directory does not exist"
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AuthError::signing(format!(
                    "{}: {e}",
                    self.directory.display()
                )));
            }
        };

        let mut descriptors = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AuthError::signing(e.to_string()))?
        {
            let file_name = entry.file_name();
            let Some(subject) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(PRIVATE_KEY_SUFFIX))
            else {
                continue;
            };
            if subject != DEVELOPMENT_SUBJECT {
                continue;
            }
            descriptors.push(self.load(&entry.path(), subject).await?);
        }

        Ok(descriptors)
    }
}

/// Key ID derived from the public key: the first 8 bytes of its SHA-256, in hex.
fn key_id(public_pem: &str) -> String {
    let digest = Sha256::digest(public_pem.trim().as_bytes());
    hex::encode(&digest[..8])
}

async fn read_pem(path: &Path) -> AuthResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AuthError::signing(format!("{}: {e}", path.display())))
}

#[cfg_attr(not(unix), allow(unused_variables))]
async fn write_pem(path: &Path, contents: &str, mode: u32) -> AuthResult<()> {
    use tokio::io::AsyncWriteExt;

    let io_error = |e: std::io::Error| AuthError::signing(format!("{}: {e}", path.display()));

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);

    let mut file = options.open(path).await.map_err(io_error)?;
    file.write_all(contents.as_bytes()).await.map_err(io_error)?;
    file.flush().await.map_err(io_error)
}
