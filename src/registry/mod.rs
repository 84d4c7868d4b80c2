//! Personnel registries backed by one Excel sheet each
//!
//! Every mutation rewrites the workbook through
//! [`save_excel_with_updated_sheet`], so other sheets in the same file
//! (the two MAR registries share one workbook) are kept.

mod schema;

pub use schema::{ColumnKind, ColumnSpec, RegistryKind, COL_NOM, COL_PRENOM};

use crate::error::{AdminError, AdminResult, ColumnErrorContext};
use crate::excel::{read_sheet, save_excel_with_updated_sheet, CellValue, Sheet};
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One registry row
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    /// Zero-based row index in the sheet
    pub index: usize,
    pub fields: Vec<(String, CellValue)>,
}

impl Person {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        let wanted = column.to_lowercase();
        self.fields
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, v)| v)
    }

    pub fn text(&self, column: &str) -> String {
        self.get(column)
            .map(|v| v.to_string().trim().to_string())
            .unwrap_or_default()
    }

    pub fn nom(&self) -> String {
        self.text(COL_NOM)
    }

    pub fn prenom(&self) -> String {
        self.text(COL_PRENOM)
    }

    /// "NOM Prénom"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.nom().to_uppercase(), self.prenom())
            .trim()
            .to_string()
    }
}

/// Case-insensitive (Unicode) comparison of trimmed names
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct Registry {
    kind: RegistryKind,
    path: PathBuf,
    sheet: Sheet,
}

impl Registry {
    /// Load the registry sheet; a missing file or sheet gives an empty registry
    pub fn open(kind: RegistryKind, path: impl AsRef<Path>) -> AdminResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut sheet = if path.exists() {
            match read_sheet(&path, kind.sheet_name()) {
                Ok(sheet) => sheet,
                Err(AdminError::NotFound(_)) => {
                    debug!(sheet = kind.sheet_name(), "Sheet absent, starting empty");
                    Sheet::new(kind.sheet_name(), Vec::new())
                }
                Err(e) => return Err(e),
            }
        } else {
            Sheet::new(kind.sheet_name(), Vec::new())
        };

        for spec in kind.columns() {
            sheet.ensure_column(spec.name);
        }

        debug!(registry = %kind, rows = sheet.rows.len(), "Registry loaded");
        Ok(Self { kind, path, sheet })
    }

    /// Open using the workbook configured for this kind
    pub fn from_settings(kind: RegistryKind, settings: &Settings) -> AdminResult<Self> {
        let path = settings.file_path(kind.workbook_key(), false)?;
        Self::open(kind, path)
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.sheet.headers
    }

    pub fn len(&self) -> usize {
        self.sheet.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheet.rows.is_empty()
    }

    fn person_at(&self, index: usize) -> Option<Person> {
        let row = self.sheet.rows.get(index)?;
        Some(Person {
            index,
            fields: self
                .sheet
                .headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        })
    }

    pub fn list(&self) -> Vec<Person> {
        (0..self.sheet.rows.len())
            .filter_map(|i| self.person_at(i))
            .collect()
    }

    pub fn get(&self, index: usize) -> AdminResult<Person> {
        self.person_at(index).ok_or_else(|| {
            AdminError::NotFound(format!(
                "row {} in {} ({} rows)",
                index + 1,
                self.kind,
                self.len()
            ))
        })
    }

    pub fn find_by_name(&self, nom: &str, prenom: &str) -> Option<Person> {
        self.list()
            .into_iter()
            .find(|p| same_name(&p.nom(), nom) && same_name(&p.prenom(), prenom))
    }

    /// Case-insensitive substring match on name and first name
    pub fn search(&self, query: &str) -> Vec<Person> {
        let q = query.trim().to_lowercase();
        self.list()
            .into_iter()
            .filter(|p| {
                q.is_empty()
                    || p.nom().to_lowercase().contains(&q)
                    || p.prenom().to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Add a row, returning its index
    pub fn add(&mut self, fields: &[(String, String)]) -> AdminResult<usize> {
        let mut row = vec![CellValue::Empty; self.sheet.headers.len()];
        for (col, value) in self.resolve_fields(fields)? {
            row[col] = value;
        }
        self.check_required(&row)?;
        self.check_unique(&row, None)?;

        let mut sheet = self.sheet.clone();
        sheet.push_row(row);
        self.commit(sheet)?;

        let index = self.sheet.rows.len() - 1;
        info!(registry = %self.kind, row = index + 1, "Row added");
        Ok(index)
    }

    /// Overwrite the given columns of a row; other columns keep their value
    pub fn update(&mut self, index: usize, fields: &[(String, String)]) -> AdminResult<()> {
        self.get(index)?;
        let mut row = self.sheet.rows[index].clone();
        for (col, value) in self.resolve_fields(fields)? {
            row[col] = value;
        }
        self.check_required(&row)?;
        self.check_unique(&row, Some(index))?;

        let mut sheet = self.sheet.clone();
        sheet.rows[index] = row;
        self.commit(sheet)?;

        info!(registry = %self.kind, row = index + 1, "Row updated");
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> AdminResult<Person> {
        let removed = self.get(index)?;

        let mut sheet = self.sheet.clone();
        sheet.rows.remove(index);
        self.commit(sheet)?;

        info!(registry = %self.kind, row = index + 1, name = %removed.display_name(), "Row deleted");
        Ok(removed)
    }

    /// Persist first, then swap the in-memory sheet
    fn commit(&mut self, sheet: Sheet) -> AdminResult<()> {
        save_excel_with_updated_sheet(&self.path, &sheet)?;
        self.sheet = sheet;
        Ok(())
    }

    fn resolve_fields(&self, fields: &[(String, String)]) -> AdminResult<Vec<(usize, CellValue)>> {
        fields
            .iter()
            .map(|(name, raw)| -> AdminResult<(usize, CellValue)> {
                let col = self.sheet.column_index(name).ok_or_else(|| {
                    ColumnErrorContext::new(name.clone(), self.kind.sheet_name())
                        .with_available_columns(self.sheet.headers.clone())
                        .into_error()
                })?;
                let value = self.kind.column_kind(name).coerce(name, raw)?;
                Ok((col, value))
            })
            .collect()
    }

    fn check_required(&self, row: &[CellValue]) -> AdminResult<()> {
        let missing: Vec<&str> = self
            .kind
            .required_columns()
            .filter(|name| {
                self.sheet
                    .column_index(name)
                    .and_then(|i| row.get(i))
                    .map(CellValue::is_empty)
                    .unwrap_or(true)
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AdminError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    fn check_unique(&self, row: &[CellValue], skip: Option<usize>) -> AdminResult<()> {
        let text = |col: &str| {
            self.sheet
                .column_index(col)
                .and_then(|i| row.get(i))
                .map(|v| v.to_string())
                .unwrap_or_default()
        };
        let (nom, prenom) = (text(COL_NOM), text(COL_PRENOM));

        if let Some(existing) = self.find_by_name(&nom, &prenom) {
            if Some(existing.index) != skip {
                return Err(AdminError::Validation(format!(
                    "{} already exists in {} (row {})",
                    existing.display_name(),
                    self.kind,
                    existing.index + 1
                )));
            }
        }
        Ok(())
    }
}
