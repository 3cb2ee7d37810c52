//! JSON flat-file implementations of the storage ports.
//!
//! Files are small (a target list and one settings record), so plain
//! read/write of the whole document is fine. A missing file means "no prior
//! record"; parse errors surface to the caller, which substitutes defaults.

use std::{fs, path::PathBuf};

use async_trait::async_trait;

use crate::{
    domain::Target,
    ports::{SettingsStore, TargetStore},
    settings::MailingSettings,
    Error, Result,
};

#[derive(Clone, Debug)]
pub struct JsonTargetStore {
    path: PathBuf,
}

impl JsonTargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TargetStore for JsonTargetStore {
    async fn load(&self) -> Result<Vec<Target>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn save(&self, targets: &[Target]) -> Result<()> {
        let text = serde_json::to_string(targets)?;
        fs::write(&self.path, text)
            .map_err(|e| Error::Persistence(format!("{}: {e}", self.path.display())))
    }
}

#[derive(Clone, Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> Result<Option<MailingSettings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn save(&self, settings: &MailingSettings) -> Result<()> {
        let text = serde_json::to_string(settings)?;
        fs::write(&self.path, text)
            .map_err(|e| Error::Persistence(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::TargetId;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    #[tokio::test]
    async fn missing_files_mean_empty_and_none() {
        let targets = JsonTargetStore::new(tmp_file("tgblast-missing-targets"));
        assert!(targets.load().await.unwrap().is_empty());

        let settings = JsonSettingsStore::new(tmp_file("tgblast-missing-settings"));
        assert!(settings.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn targets_round_trip() {
        let path = tmp_file("tgblast-targets");
        let store = JsonTargetStore::new(path.clone());

        let targets = vec![
            Target {
                id: TargetId(-1001),
                title: "Group One".to_string(),
                username: Some("groupone".to_string()),
            },
            Target {
                id: TargetId(42),
                title: "Second".to_string(),
                username: None,
            },
        ];
        store.save(&targets).await.unwrap();
        assert_eq!(store.load().await.unwrap(), targets);

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn settings_persist_then_load_is_idempotent() {
        let path = tmp_file("tgblast-settings");
        let store = JsonSettingsStore::new(path.clone());

        let settings = MailingSettings {
            delay_seconds: 300,
            repeat_count: 7,
            ..MailingSettings::default()
        };
        store.save(&settings).await.unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, settings);

        // Saving what was loaded must not change the stored representation.
        store.save(&loaded).await.unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn corrupt_settings_file_surfaces_an_error() {
        let path = tmp_file("tgblast-corrupt");
        fs::write(&path, "{not json").unwrap();

        let store = JsonSettingsStore::new(path.clone());
        assert!(store.load().await.is_err());

        let _ = fs::remove_file(&path);
    }
}
