//! Session state
//!
//! The signed-in user and the selected camp. Both are explicit values handed
//! to the store rather than process-wide state.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::atomic_write;

/// What a session may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sees every camp
    Admin,
    /// Sees owned and shared camps
    Member,
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
        }
    }

    /// Build the session for the user named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let (Some(user_id), Some(email)) = (&config.user_id, &config.user_email) else {
            bail!("No user configured. Run `camptrack user register <email>` first.");
        };

        let role = if config.is_admin(email) {
            Role::Admin
        } else {
            Role::Member
        };
        Ok(Self::new(user_id.clone(), email.clone(), role))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Pointer to the camp the user is working in
///
/// Persisted as a single id in the data directory so it survives restarts.
#[derive(Debug)]
pub struct CampSelection {
    path: Option<PathBuf>,
    current: Option<Uuid>,
}

impl CampSelection {
    /// Read the pointer from `config.current_camp_path()`
    pub fn load(config: &Config) -> Self {
        Self::with_path(config.current_camp_path())
    }

    /// Read the pointer from a specific file
    ///
    /// A missing or unreadable file means no selection.
    pub fn with_path(path: PathBuf) -> Self {
        let current = match fs::read_to_string(&path) {
            Ok(content) => match Uuid::parse_str(content.trim()) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Ignoring invalid camp selection in {:?}: {}", path, e);
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            path: Some(path),
            current,
        }
    }

    /// Selection that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Uuid> {
        self.current
    }

    /// Select a camp and persist the choice
    pub fn select(&mut self, camp_id: Uuid) -> Result<()> {
        if let Some(path) = &self.path {
            atomic_write(path, camp_id.to_string().as_bytes())
                .with_context(|| format!("Failed to save camp selection to {:?}", path))?;
        }
        debug!("Selected camp {}", camp_id);
        self.current = Some(camp_id);
        Ok(())
    }

    /// Forget the selection
    pub fn clear(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove camp selection {:?}", path))?;
            }
        }
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_from_config() {
        let config = Config {
            user_id: Some("u1".to_string()),
            user_email: Some("Director@camp.org".to_string()),
            admin_emails: vec!["director@camp.org".to_string()],
            ..Config::default()
        };
        let session = Session::from_config(&config).unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(session.is_admin());

        let config = Config {
            admin_emails: Vec::new(),
            ..config
        };
        assert_eq!(Session::from_config(&config).unwrap().role, Role::Member);
    }

    #[test]
    fn test_session_requires_user() {
        let config = Config {
            user_email: Some("coach@camp.org".to_string()),
            ..Config::default()
        };
        assert!(Session::from_config(&config).is_err());
    }

    #[test]
    fn test_selection_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("current_camp");
        let camp_id = Uuid::new_v4();

        let mut selection = CampSelection::with_path(path.clone());
        assert_eq!(selection.current(), None);
        selection.select(camp_id).unwrap();

        let reloaded = CampSelection::with_path(path.clone());
        assert_eq!(reloaded.current(), Some(camp_id));

        let mut reloaded = reloaded;
        reloaded.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(CampSelection::with_path(path).current(), None);
    }

    #[test]
    fn test_selection_ignores_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("current_camp");
        fs::write(&path, "not-a-uuid").unwrap();

        assert_eq!(CampSelection::with_path(path).current(), None);
    }

    #[test]
    fn test_in_memory_selection() {
        let mut selection = CampSelection::in_memory();
        let camp_id = Uuid::new_v4();
        selection.select(camp_id).unwrap();
        assert_eq!(selection.current(), Some(camp_id));
        selection.clear().unwrap();
        assert_eq!(selection.current(), None);
    }
}
