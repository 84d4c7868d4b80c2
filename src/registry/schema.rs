//! Registry kinds and their sheet layouts

use crate::error::{AdminError, AdminResult};
use crate::excel::CellValue;
use crate::settings::PathKey;
use std::fmt;

pub const COL_NOM: &str = "NOM";
pub const COL_PRENOM: &str = "PRENOM";

/// How typed input is stored in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    /// Kept verbatim (identifiers, phone numbers, postcodes)
    #[default]
    Text,
    /// dd/mm/yyyy or yyyy-mm-dd, stored as an Excel date
    Date,
}

impl ColumnKind {
    /// Convert command-line input for a column of this kind; blank input clears the cell
    pub fn coerce(&self, column: &str, raw: &str) -> AdminResult<CellValue> {
        let s = raw.trim();
        if s.is_empty() {
            return Ok(CellValue::Empty);
        }
        let text = CellValue::Text(s.to_string());
        match self {
            ColumnKind::Text => Ok(text),
            ColumnKind::Date => text.as_date().map(CellValue::Date).ok_or_else(|| {
                AdminError::Validation(format!(
                    "{}: invalid date '{}' (expected dd/mm/yyyy or yyyy-mm-dd)",
                    column, s
                ))
            }),
        }
    }
}

/// A column the registry expects in its sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    const fn date(self) -> Self {
        ColumnSpec {
            kind: ColumnKind::Date,
            ..self
        }
    }
}

const fn required(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        required: true,
        kind: ColumnKind::Text,
    }
}

const fn optional(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        required: false,
        kind: ColumnKind::Text,
    }
}

const MAR_TITULAIRES: &[ColumnSpec] = &[
    required(COL_NOM),
    required(COL_PRENOM),
    optional("EMAIL"),
    optional("TELEPHONE"),
    optional("N_ORDRE"),
    optional("ADRESSE"),
];

const MAR_REMPLACANTS: &[ColumnSpec] = &[
    required(COL_NOM),
    required(COL_PRENOM),
    optional("EMAIL"),
    optional("TELEPHONE"),
    optional("N_ORDRE"),
    optional("URSSAF"),
    optional("ADRESSE"),
];

const IADE_REMPLACANTS: &[ColumnSpec] = &[
    required(COL_NOM),
    required(COL_PRENOM),
    optional("EMAIL"),
    optional("TELEPHONE"),
    optional("DATE_NAISSANCE").date(),
    optional("N_SECU"),
    optional("ADRESSE"),
];

const SALARIES: &[ColumnSpec] = &[
    required(COL_NOM),
    required(COL_PRENOM),
    optional("EMAIL"),
    optional("POSTE"),
    optional("DATE_ENTREE").date(),
];

/// The personnel registries kept in Excel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    MarTitulaires,
    MarRemplacants,
    IadeRemplacants,
    Salaries,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 4] = [
        RegistryKind::MarTitulaires,
        RegistryKind::MarRemplacants,
        RegistryKind::IadeRemplacants,
        RegistryKind::Salaries,
    ];

    /// Command-line name
    pub fn slug(&self) -> &'static str {
        match self {
            RegistryKind::MarTitulaires => "mar-titulaires",
            RegistryKind::MarRemplacants => "mar-remplacants",
            RegistryKind::IadeRemplacants => "iade-remplacants",
            RegistryKind::Salaries => "salaries",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegistryKind::MarTitulaires => "MAR titulaires",
            RegistryKind::MarRemplacants => "MAR remplaçants",
            RegistryKind::IadeRemplacants => "IADE remplaçants",
            RegistryKind::Salaries => "Salariés",
        }
    }

    /// Workbook setting holding this registry
    pub fn workbook_key(&self) -> PathKey {
        match self {
            RegistryKind::MarTitulaires | RegistryKind::MarRemplacants => PathKey::ExcelMar,
            RegistryKind::IadeRemplacants => PathKey::ExcelIade,
            RegistryKind::Salaries => PathKey::ExcelSalaries,
        }
    }

    pub fn sheet_name(&self) -> &'static str {
        self.label()
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            RegistryKind::MarTitulaires => MAR_TITULAIRES,
            RegistryKind::MarRemplacants => MAR_REMPLACANTS,
            RegistryKind::IadeRemplacants => IADE_REMPLACANTS,
            RegistryKind::Salaries => SALARIES,
        }
    }

    /// Kind of a column; columns outside the schema are text
    pub fn column_kind(&self, name: &str) -> ColumnKind {
        self.columns()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .map(|c| c.kind)
            .unwrap_or_default()
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &'static str> {
        self.columns().iter().filter(|c| c.required).map(|c| c.name)
    }

    pub fn parse(s: &str) -> AdminResult<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.slug() == wanted || k.label().to_lowercase() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.slug()).collect();
                AdminError::Validation(format!(
                    "unknown registry '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_requires_name() {
        for kind in RegistryKind::ALL {
            let req: Vec<&str> = kind.required_columns().collect();
            assert_eq!(req, vec![COL_NOM, COL_PRENOM], "{}", kind);
        }
    }

    #[test]
    fn test_mar_registries_share_workbook() {
        assert_eq!(
            RegistryKind::MarTitulaires.workbook_key(),
            RegistryKind::MarRemplacants.workbook_key()
        );
        assert_ne!(
            RegistryKind::MarTitulaires.sheet_name(),
            RegistryKind::MarRemplacants.sheet_name()
        );
    }

    #[test]
    fn test_column_kinds() {
        let iade = RegistryKind::IadeRemplacants;
        assert_eq!(iade.column_kind("date_naissance"), ColumnKind::Date);
        assert_eq!(iade.column_kind("N_SECU"), ColumnKind::Text);
        assert_eq!(iade.column_kind("COMMENTAIRE"), ColumnKind::Text);
        assert_eq!(
            RegistryKind::Salaries.column_kind("DATE_ENTREE"),
            ColumnKind::Date
        );
    }

    #[test]
    fn test_coerce_keeps_identifiers_as_text() {
        assert_eq!(
            ColumnKind::Text.coerce("N_SECU", "12345678901234567890").unwrap(),
            CellValue::Text("12345678901234567890".into())
        );
        assert_eq!(
            ColumnKind::Text.coerce("TELEPHONE", " 0612345678 ").unwrap(),
            CellValue::Text("0612345678".into())
        );
        assert_eq!(ColumnKind::Text.coerce("EMAIL", "  ").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_coerce_dates() {
        let expected = CellValue::Date(chrono::NaiveDate::from_ymd_opt(1985, 2, 3).unwrap());
        assert_eq!(ColumnKind::Date.coerce("DATE_NAISSANCE", "03/02/1985").unwrap(), expected);
        assert_eq!(ColumnKind::Date.coerce("DATE_NAISSANCE", "1985-02-03").unwrap(), expected);
        assert!(matches!(
            ColumnKind::Date.coerce("DATE_NAISSANCE", "31/02/1985"),
            Err(AdminError::Validation(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            RegistryKind::parse("iade-remplacants").unwrap(),
            RegistryKind::IadeRemplacants
        );
        assert_eq!(RegistryKind::parse("Salariés").unwrap(), RegistryKind::Salaries);
        assert!(RegistryKind::parse("interims").is_err());
    }
}
