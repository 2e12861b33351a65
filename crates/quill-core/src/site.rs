//! Site profile store
//!
//! One `SiteProfile` record mirrored to a JSON object on disk. The first open
//! without a persisted document writes the default profile. Updates replace
//! the whole record; there is no field-level merge.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::models::SiteProfile;
use crate::storage::{atomic_write, StorageError, StorageResult};

/// Store for the single site-wide profile
pub struct SiteStore {
    path: PathBuf,
    profile: RwLock<SiteProfile>,
}

impl SiteStore {
    /// Load the profile at `path`, creating the default one if absent or empty
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let profile = match load_profile(&path)? {
            Some(profile) => profile,
            None => {
                let profile = SiteProfile::default_profile();
                save_profile(&path, &profile)?;
                info!("Wrote default site profile to {:?}", path);
                profile
            }
        };

        Ok(Self {
            path,
            profile: RwLock::new(profile),
        })
    }

    /// Path of the backing JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current profile
    pub fn get(&self) -> SiteProfile {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole profile and persist it
    pub fn update(&self, profile: SiteProfile) -> StorageResult<()> {
        let mut guard = self.profile.write().unwrap_or_else(PoisonError::into_inner);
        save_profile(&self.path, &profile)?;
        *guard = profile;
        Ok(())
    }
}

fn load_profile(path: &Path) -> StorageResult<Option<SiteProfile>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::from_read(e, path.to_path_buf())),
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| StorageError::InvalidFormat {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
}

fn save_profile(path: &Path, profile: &SiteProfile) -> StorageResult<()> {
    let mut data = serde_json::to_vec_pretty(profile)?;
    data.push(b'\n');
    atomic_write(path, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_open_persists_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("site.json");

        let store = SiteStore::open(&path).unwrap();
        assert_eq!(store.get(), SiteProfile::default_profile());
        assert!(path.exists());

        let on_disk: SiteProfile =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, SiteProfile::default_profile());
    }

    #[test]
    fn test_empty_document_is_replaced_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("site.json");
        fs::write(&path, "").unwrap();

        let store = SiteStore::open(&path).unwrap();
        assert_eq!(store.get().title, SiteProfile::default_profile().title);
    }

    #[test]
    fn test_existing_document_is_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("site.json");
        fs::write(&path, r#"{"title": "Custom", "current_focus": ["one"]}"#).unwrap();

        let store = SiteStore::open(&path).unwrap();
        let profile = store.get();
        assert_eq!(profile.title, "Custom");
        assert_eq!(profile.current_focus, vec!["one"]);
        assert!(profile.tagline.is_empty());
    }

    #[test]
    fn test_null_lists_are_loaded_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("site.json");
        fs::write(
            &path,
            r#"{"title":"T","skills":null,"current_focus":null,"social_links":null}"#,
        )
        .unwrap();

        let profile = SiteStore::open(&path).unwrap().get();
        assert_eq!(profile.title, "T");
        assert!(profile.skills.is_empty());
        assert!(profile.current_focus.is_empty());
        assert!(profile.social_links.is_empty());
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("site.json");
        let store = SiteStore::open(&path).unwrap();

        let replacement = SiteProfile {
            title: "Only a title".to_string(),
            ..SiteProfile::default()
        };
        store.update(replacement.clone()).unwrap();

        let profile = store.get();
        assert_eq!(profile, replacement);
        // Omitted fields are wiped, not merged
        assert!(profile.email.is_empty());
        assert!(profile.current_focus.is_empty());

        let reopened = SiteStore::open(&path).unwrap();
        assert_eq!(reopened.get(), replacement);
    }

    #[test]
    fn test_corrupt_document_fails_to_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("site.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SiteStore::open(&path),
            Err(StorageError::InvalidFormat { .. })
        ));
        // The bad document is left for the operator to inspect
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
