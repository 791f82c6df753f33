//! Saved login profiles.
//!
//! Each profile is one TOML file in the credentials directory:
//! `spotify.toml` for `default`, `spotify.<profile>.toml` otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::Token;

const FILE_PREFIX: &str = "spotify";
const FILE_VERSION: u32 = 1;
const DEFAULT_PROFILE: &str = "default";

/// Where login profiles live between runs.
pub trait CredentialStore: Send + Sync {
    fn load(&self, profile: &str) -> Result<Option<Token>, AuthError>;
    fn save(&self, profile: &str, token: &Token) -> Result<(), AuthError>;
    fn clear(&self, profile: &str) -> Result<(), AuthError>;
}

/// Profiles stored as owner-only TOML files.
///
/// # Example
/// ```no_run
/// use chrono::{Duration, Utc};
/// use playdeck::auth::{CredentialStore, FileCredentialStore, Token};
///
/// let store = FileCredentialStore::new_default();
/// let token = Token::new("access", Some("refresh".to_string()), Utc::now() + Duration::hours(1));
/// store.save("default", &token)?;
/// # Ok::<(), playdeck::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn new_default() -> Self {
        Self::new(default_credentials_dir())
    }

    /// `dir` when configured, the per-user config directory otherwise.
    pub fn in_dir(dir: Option<PathBuf>) -> Self {
        dir.map(Self::new).unwrap_or_else(Self::new_default)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Names of the profiles with a saved login, sorted.
    pub fn profiles(&self) -> Result<Vec<String>, AuthError> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut profiles: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| profile_from_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        profiles.sort();
        profiles.dedup();
        Ok(profiles)
    }

    fn profile_path(&self, profile: &str) -> PathBuf {
        let profile = profile_slug(profile);
        let name = if profile == DEFAULT_PROFILE {
            format!("{FILE_PREFIX}.toml")
        } else {
            format!("{FILE_PREFIX}.{profile}.toml")
        };
        self.base_dir.join(name)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, profile: &str) -> Result<Option<Token>, AuthError> {
        let path = self.profile_path(profile);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let saved: SavedLogin = toml::from_str(&raw)?;
        if saved.version != FILE_VERSION {
            return Err(AuthError::Serialization(format!(
                "{} has unsupported version {}",
                path.display(),
                saved.version
            )));
        }
        Ok(Some(saved.token))
    }

    /// Written to a sibling temp file first, then renamed over the profile,
    /// so a crash never leaves a half-written login behind.
    fn save(&self, profile: &str, token: &Token) -> Result<(), AuthError> {
        fs::create_dir_all(&self.base_dir)?;
        let path = self.profile_path(profile);
        let saved = SavedLogin {
            version: FILE_VERSION,
            profile: profile_slug(profile),
            saved_at: Utc::now(),
            token: token.clone(),
        };

        let staging = path.with_extension("toml.tmp");
        fs::write(&staging, toml::to_string(&saved)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&staging, &path)?;

        tracing::debug!(profile = %saved.profile, path = %path.display(), "Login saved");
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        match fs::remove_file(self.profile_path(profile)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedLogin {
    version: u32,
    profile: String,
    saved_at: DateTime<Utc>,
    token: Token,
}

fn default_credentials_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "playdeck")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".playdeck")))
        .unwrap_or_else(|| PathBuf::from(".playdeck"))
}

/// Lowercase, `[a-z0-9-]` only; blank or symbol-only names mean `default`.
fn profile_slug(profile: &str) -> String {
    let slug: String = profile
        .trim()
        .chars()
        .map(|ch| match ch.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '-') => c,
            _ => '-',
        })
        .collect();
    if slug.trim_matches('-').is_empty() {
        DEFAULT_PROFILE.to_string()
    } else {
        slug
    }
}

fn profile_from_file_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".toml")?;
    if stem == FILE_PREFIX {
        return Some(DEFAULT_PROFILE.to_string());
    }
    stem.strip_prefix(FILE_PREFIX)?
        .strip_prefix('.')
        .filter(|profile| !profile.is_empty())
        .map(str::to_string)
}
