//! Configured file and folder paths, stored as settings.json in the config directory

use crate::error::{AdminError, AdminResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SETTINGS_FILE: &str = "settings.json";

/// Env var overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "SELARL_CONFIG_DIR";

/// Whether a configured path points at a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// The paths the application needs configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKey {
    ExcelMar,
    ExcelIade,
    WordMar,
    WordIade,
    PdfMar,
    PdfIade,
    BulletinsSalaire,
    DossierFactures,
    ExcelSalaries,
}

impl PathKey {
    pub const ALL: [PathKey; 9] = [
        PathKey::ExcelMar,
        PathKey::ExcelIade,
        PathKey::WordMar,
        PathKey::WordIade,
        PathKey::PdfMar,
        PathKey::PdfIade,
        PathKey::BulletinsSalaire,
        PathKey::DossierFactures,
        PathKey::ExcelSalaries,
    ];

    /// Key used in settings.json
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKey::ExcelMar => "excel_mar",
            PathKey::ExcelIade => "excel_iade",
            PathKey::WordMar => "word_mar",
            PathKey::WordIade => "word_iade",
            PathKey::PdfMar => "pdf_mar",
            PathKey::PdfIade => "pdf_iade",
            PathKey::BulletinsSalaire => "bulletins_salaire",
            PathKey::DossierFactures => "dossier_factures",
            PathKey::ExcelSalaries => "excel_salaries",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PathKey::ExcelMar => "Fichier Excel MAR",
            PathKey::ExcelIade => "Fichier Excel IADE",
            PathKey::WordMar => "Modèle Word MAR",
            PathKey::WordIade => "Modèle Word IADE",
            PathKey::PdfMar => "Dossier PDF Contrats MAR",
            PathKey::PdfIade => "Dossier PDF Contrats IADE",
            PathKey::BulletinsSalaire => "Dossier des bulletins de salaire",
            PathKey::DossierFactures => "Dossier des factures",
            PathKey::ExcelSalaries => "Fichier Excel Salariés",
        }
    }

    pub fn kind(&self) -> PathKind {
        match self {
            PathKey::PdfMar
            | PathKey::PdfIade
            | PathKey::BulletinsSalaire
            | PathKey::DossierFactures => PathKind::Directory,
            _ => PathKind::File,
        }
    }

    pub fn parse(key: &str) -> AdminResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                AdminError::Validation(format!(
                    "unknown path key '{}' (expected one of: {})",
                    key,
                    known.join(", ")
                ))
            })
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `null` or a non-string value for a path key counts as unset
fn lenient_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_path")]
    pub excel_mar: String,
    #[serde(deserialize_with = "lenient_path")]
    pub excel_iade: String,
    #[serde(deserialize_with = "lenient_path")]
    pub word_mar: String,
    #[serde(deserialize_with = "lenient_path")]
    pub word_iade: String,
    #[serde(deserialize_with = "lenient_path")]
    pub pdf_mar: String,
    #[serde(deserialize_with = "lenient_path")]
    pub pdf_iade: String,
    #[serde(deserialize_with = "lenient_path")]
    pub bulletins_salaire: String,
    #[serde(deserialize_with = "lenient_path")]
    pub dossier_factures: String,
    #[serde(deserialize_with = "lenient_path")]
    pub excel_salaries: String,

    // Keys written by other tools are carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Settings {
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    /// Write settings.json. An existing file that is not a JSON object is
    /// left alone and reported, so keys `load` could not read are not lost.
    pub fn save(&self, config_dir: &Path) -> AdminResult<()> {
        std::fs::create_dir_all(config_dir)?;
        let path = config_dir.join(SETTINGS_FILE);
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if !raw.trim().is_empty()
                && serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw).is_err()
            {
                return Err(AdminError::Validation(format!(
                    "{} is not valid JSON; fix or remove it before saving settings",
                    path.display()
                )));
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    fn slot(&self, key: PathKey) -> &String {
        match key {
            PathKey::ExcelMar => &self.excel_mar,
            PathKey::ExcelIade => &self.excel_iade,
            PathKey::WordMar => &self.word_mar,
            PathKey::WordIade => &self.word_iade,
            PathKey::PdfMar => &self.pdf_mar,
            PathKey::PdfIade => &self.pdf_iade,
            PathKey::BulletinsSalaire => &self.bulletins_salaire,
            PathKey::DossierFactures => &self.dossier_factures,
            PathKey::ExcelSalaries => &self.excel_salaries,
        }
    }

    fn slot_mut(&mut self, key: PathKey) -> &mut String {
        match key {
            PathKey::ExcelMar => &mut self.excel_mar,
            PathKey::ExcelIade => &mut self.excel_iade,
            PathKey::WordMar => &mut self.word_mar,
            PathKey::WordIade => &mut self.word_iade,
            PathKey::PdfMar => &mut self.pdf_mar,
            PathKey::PdfIade => &mut self.pdf_iade,
            PathKey::BulletinsSalaire => &mut self.bulletins_salaire,
            PathKey::DossierFactures => &mut self.dossier_factures,
            PathKey::ExcelSalaries => &mut self.excel_salaries,
        }
    }

    /// Configured value, `None` when unset or blank
    pub fn get(&self, key: PathKey) -> Option<&str> {
        let value = self.slot(key).trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn set(&mut self, key: PathKey, value: impl Into<String>) {
        *self.slot_mut(key) = value.into();
    }

    /// Paths that still need configuring
    pub fn missing_paths(&self) -> Vec<PathKey> {
        PathKey::ALL
            .iter()
            .copied()
            .filter(|k| self.get(*k).is_none())
            .collect()
    }

    /// Resolve a configured path, optionally requiring it to exist on disk
    pub fn file_path(&self, key: PathKey, verify_exists: bool) -> AdminResult<PathBuf> {
        let value = self.get(key).ok_or_else(|| {
            AdminError::NotConfigured(format!("{} ({})", key.description(), key))
        })?;
        let path = PathBuf::from(value);

        if verify_exists {
            let ok = match key.kind() {
                PathKind::File => path.is_file(),
                PathKind::Directory => path.is_dir(),
            };
            if !ok {
                return Err(AdminError::NotFound(format!(
                    "{}: {}",
                    key.description(),
                    path.display()
                )));
            }
        }

        Ok(path)
    }
}

/// Resolve the configuration directory: explicit flag, env var, then platform default
pub fn config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("selarl-admin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.missing_paths().len(), 9);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        let settings = Settings::load(dir.path());
        assert!(settings.get(PathKey::ExcelMar).is_none());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"excel_mar": "/data/mar.xlsx", "theme": "dark"}"#,
        )
        .unwrap();

        let mut settings = Settings::load(dir.path());
        settings.set(PathKey::ExcelIade, "/data/iade.xlsx");
        settings.save(dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["excel_mar"], "/data/mar.xlsx");
        assert_eq!(json["excel_iade"], "/data/iade.xlsx");
    }

    #[test]
    fn test_null_path_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"excel_mar": "/data/mar.xlsx", "excel_iade": null, "pdf_mar": 3, "theme": "dark"}"#,
        )
        .unwrap();

        let mut settings = Settings::load(dir.path());
        assert_eq!(settings.get(PathKey::ExcelMar), Some("/data/mar.xlsx"));
        assert!(settings.get(PathKey::ExcelIade).is_none());
        assert!(settings.get(PathKey::PdfMar).is_none());

        settings.set(PathKey::WordMar, "/data/mar.docx");
        settings.save(dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["excel_mar"], "/data/mar.xlsx");
        assert_eq!(json["word_mar"], "/data/mar.docx");
        assert_eq!(json["theme"], "dark");
    }

    #[test]
    fn test_save_refuses_to_replace_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ \"excel_mar\": \"/data/mar.xlsx\",").unwrap();

        let mut settings = Settings::load(dir.path());
        settings.set(PathKey::WordMar, "/data/mar.docx");
        assert!(matches!(
            settings.save(dir.path()),
            Err(AdminError::Validation(_))
        ));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{ \"excel_mar\": \"/data/mar.xlsx\","
        );
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut settings = Settings::default();
        settings.set(PathKey::WordMar, "   ");
        assert!(settings.missing_paths().contains(&PathKey::WordMar));
    }

    #[test]
    fn test_file_path_not_configured() {
        let settings = Settings::default();
        let err = settings.file_path(PathKey::ExcelMar, false).unwrap_err();
        assert!(matches!(err, AdminError::NotConfigured(_)));
    }

    #[test]
    fn test_file_path_verify_kind() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.set(PathKey::DossierFactures, dir.path().to_string_lossy());
        settings.set(PathKey::ExcelMar, dir.path().to_string_lossy());

        assert!(settings.file_path(PathKey::DossierFactures, true).is_ok());
        // A directory does not satisfy a file key
        assert!(matches!(
            settings.file_path(PathKey::ExcelMar, true),
            Err(AdminError::NotFound(_))
        ));
        assert!(settings.file_path(PathKey::ExcelMar, false).is_ok());
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(PathKey::parse("excel_salaries").unwrap(), PathKey::ExcelSalaries);
        assert!(PathKey::parse("excel").is_err());
    }
}
