use std::path::PathBuf;
use thiserror::Error;

pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("File is open in another program: {}", .0.display())]
    Locked(PathBuf),

    #[error("Path not configured: {0}")]
    NotConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Backup {} is left from an earlier failed save; recover or remove it first", .0.display())]
    BackupExists(PathBuf),

    #[error("Failed to save {}: {reason} (backup restored: {restored})", .path.display())]
    SaveFailed {
        path: PathBuf,
        reason: String,
        restored: bool,
    },
}

impl From<calamine::XlsxError> for AdminError {
    fn from(e: calamine::XlsxError) -> Self {
        AdminError::Excel(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AdminError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AdminError::Excel(e.to_string())
    }
}

impl From<zip::result::ZipError> for AdminError {
    fn from(e: zip::result::ZipError) -> Self {
        AdminError::Template(e.to_string())
    }
}

/// Context for an unknown column name, with a close match when one exists
#[derive(Debug, Clone)]
pub struct ColumnErrorContext {
    pub column: String,
    pub sheet: String,
    pub suggestion: Option<String>,
    pub available_columns: Vec<String>,
}

impl ColumnErrorContext {
    pub fn new(column: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sheet: sheet.into(),
            suggestion: None,
            available_columns: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_available_columns(mut self, columns: Vec<String>) -> Self {
        self.available_columns = columns;
        self
    }

    /// Case-insensitive exact match, then prefix, then substring
    pub fn find_similar(&self, name: &str) -> Option<String> {
        let needle = name.to_lowercase();

        if let Some(col) = self
            .available_columns
            .iter()
            .find(|c| c.to_lowercase() == needle)
        {
            return Some(col.clone());
        }

        if let Some(col) = self
            .available_columns
            .iter()
            .find(|c| c.to_lowercase().starts_with(&needle))
        {
            return Some(col.clone());
        }

        self.available_columns
            .iter()
            .find(|c| c.to_lowercase().contains(&needle))
            .cloned()
    }

    pub fn into_error(self) -> AdminError {
        let hint = self
            .suggestion
            .clone()
            .or_else(|| self.find_similar(&self.column));

        let mut msg = format!("unknown column '{}' in sheet '{}'", self.column, self.sheet);
        if let Some(h) = hint {
            msg.push_str(&format!(" (did you mean '{}'?)", h));
        } else if !self.available_columns.is_empty() {
            msg.push_str(&format!(
                " (available: {})",
                self.available_columns.join(", ")
            ));
        }
        AdminError::Validation(msg)
    }
}
