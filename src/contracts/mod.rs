//! Locum contracts for MAR and IADE
//!
//! Creating a contract:
//! 1. resolve the people in their registries
//! 2. fill the configured Word template into the contract folder
//! 3. append a line to the `Contrats` sheet of the kind's workbook
//!
//! The generated document is removed again when the register cannot be saved.

mod template;

pub use template::{fill_template, fill_xml, xml_escape, FillReport};

use crate::error::{AdminError, AdminResult};
use crate::excel::{read_sheet, save_excel_with_updated_sheet, CellValue, Sheet};
use crate::registry::{same_name, Person, Registry, RegistryKind};
use crate::settings::{PathKey, Settings};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const REGISTER_SHEET: &str = "Contrats";

const REGISTER_COLUMNS: [&str; 10] = [
    "NUMERO",
    "DATE_CREATION",
    "REMPLACANT",
    "REMPLACE",
    "DATE_DEBUT",
    "DATE_FIN",
    "NB_JOURS",
    "RETROCESSION",
    "MOTIF",
    "FICHIER",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Mar,
    Iade,
}

impl ContractKind {
    pub fn code(&self) -> &'static str {
        match self {
            ContractKind::Mar => "MAR",
            ContractKind::Iade => "IADE",
        }
    }

    pub fn workbook_key(&self) -> PathKey {
        match self {
            ContractKind::Mar => PathKey::ExcelMar,
            ContractKind::Iade => PathKey::ExcelIade,
        }
    }

    pub fn template_key(&self) -> PathKey {
        match self {
            ContractKind::Mar => PathKey::WordMar,
            ContractKind::Iade => PathKey::WordIade,
        }
    }

    pub fn output_key(&self) -> PathKey {
        match self {
            ContractKind::Mar => PathKey::PdfMar,
            ContractKind::Iade => PathKey::PdfIade,
        }
    }

    /// Registry the substitute is picked from
    pub fn substitute_registry(&self) -> RegistryKind {
        match self {
            ContractKind::Mar => RegistryKind::MarRemplacants,
            ContractKind::Iade => RegistryKind::IadeRemplacants,
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A person designated by name and first name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRef {
    pub nom: String,
    pub prenom: String,
}

impl PersonRef {
    pub fn new(nom: impl Into<String>, prenom: impl Into<String>) -> Self {
        Self {
            nom: nom.into(),
            prenom: prenom.into(),
        }
    }
}

impl fmt::Display for PersonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.nom.to_uppercase(), self.prenom)
    }
}

#[derive(Debug, Clone)]
pub struct ContractRequest {
    pub kind: ContractKind,
    pub remplacant: PersonRef,
    /// Titular MAR being replaced; for IADE, the absent colleague if any
    pub remplace: Option<PersonRef>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Share of fees paid back to the replaced MAR, in percent
    pub retrocession: Option<f64>,
    pub motif: Option<String>,
}

impl ContractRequest {
    pub fn validate(&self) -> AdminResult<()> {
        if self.end < self.start {
            return Err(AdminError::Validation(format!(
                "end date {} is before start date {}",
                self.end.format("%d/%m/%Y"),
                self.start.format("%d/%m/%Y")
            )));
        }
        if self.remplacant.nom.trim().is_empty() || self.remplacant.prenom.trim().is_empty() {
            return Err(AdminError::Validation(
                "substitute name and first name are required".into(),
            ));
        }

        match self.kind {
            ContractKind::Mar => {
                let remplace = self.remplace.as_ref().ok_or_else(|| {
                    AdminError::Validation("a MAR contract needs the replaced titulaire".into())
                })?;
                if same_name(&remplace.nom, &self.remplacant.nom)
                    && same_name(&remplace.prenom, &self.remplacant.prenom)
                {
                    return Err(AdminError::Validation(
                        "substitute and replaced physician must differ".into(),
                    ));
                }
                if let Some(pct) = self.retrocession {
                    if !(0.0..=100.0).contains(&pct) {
                        return Err(AdminError::Validation(format!(
                            "retrocession must be between 0 and 100, got {}",
                            pct
                        )));
                    }
                }
            }
            ContractKind::Iade => {
                if self.retrocession.is_some() {
                    return Err(AdminError::Validation(
                        "retrocession only applies to MAR contracts".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Inclusive number of days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A contract ready to be written
#[derive(Debug, Clone)]
pub struct Contract {
    pub number: String,
    pub kind: ContractKind,
    pub created: NaiveDate,
    pub remplacant: Person,
    /// Registry entry when the replaced person is registered
    pub remplace: Option<Person>,
    pub remplace_name: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub retrocession: Option<f64>,
    pub motif: Option<String>,
}

impl Contract {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// `Contrat_MAR_DUPONT_Jean_20250301.docx`
    pub fn file_name(&self) -> String {
        format!(
            "Contrat_{}_{}_{}_{}.docx",
            self.kind.code(),
            sanitize_file_part(&self.remplacant.nom().to_uppercase()),
            sanitize_file_part(&self.remplacant.prenom()),
            self.start.format("%Y%m%d")
        )
    }

    /// Values for the template markers
    pub fn placeholders(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        values.insert("NUMERO".into(), self.number.clone());
        values.insert("TYPE".into(), self.kind.code().into());
        values.insert(
            "DATE_CONTRAT".into(),
            self.created.format("%d/%m/%Y").to_string(),
        );
        values.insert("DATE_DEBUT".into(), self.start.format("%d/%m/%Y").to_string());
        values.insert("DATE_FIN".into(), self.end.format("%d/%m/%Y").to_string());
        values.insert("NB_JOURS".into(), self.days().to_string());
        values.insert(
            "RETROCESSION".into(),
            self.retrocession.map(format_percent).unwrap_or_default(),
        );
        values.insert("MOTIF".into(), self.motif.clone().unwrap_or_default());

        add_person_values(&mut values, "REMPLACANT", &self.remplacant);
        values.insert("REMPLACANT".into(), self.remplacant.display_name());

        if let Some(p) = &self.remplace {
            add_person_values(&mut values, "REMPLACE", p);
        }
        values.insert(
            "REMPLACE".into(),
            self.remplace_name.clone().unwrap_or_default(),
        );

        values
    }

    fn register_row(&self, sheet: &Sheet, document: &Path) -> Vec<CellValue> {
        let mut row = vec![CellValue::Empty; sheet.headers.len()];
        let mut set = |col: &str, value: CellValue| {
            if let Some(idx) = sheet.column_index(col) {
                row[idx] = value;
            }
        };
        set("NUMERO", self.number.clone().into());
        set("DATE_CREATION", self.created.into());
        set("REMPLACANT", self.remplacant.display_name().into());
        set(
            "REMPLACE",
            self.remplace_name
                .clone()
                .map(CellValue::Text)
                .unwrap_or_default(),
        );
        set("DATE_DEBUT", self.start.into());
        set("DATE_FIN", self.end.into());
        set("NB_JOURS", (self.days() as f64).into());
        set(
            "RETROCESSION",
            self.retrocession.map(CellValue::Number).unwrap_or_default(),
        );
        set(
            "MOTIF",
            self.motif.clone().map(CellValue::Text).unwrap_or_default(),
        );
        set("FICHIER", document.display().to_string().into());
        row
    }
}

fn format_percent(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{}", pct as i64)
    } else {
        format!("{:.2}", pct).replace('.', ",")
    }
}

fn add_person_values(values: &mut BTreeMap<String, String>, prefix: &str, person: &Person) {
    for (column, value) in &person.fields {
        let key = format!("{}_{}", prefix, column.trim().to_uppercase().replace(' ', "_"));
        values.insert(key, value.to_string());
    }
}

/// Keep letters, digits and dashes; everything else becomes `_`
fn sanitize_file_part(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// `MAR-20250301-1A2B3C4D`
pub fn contract_number(kind: ContractKind, created: NaiveDate) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        kind.code(),
        created.format("%Y%m%d"),
        id[..8].to_uppercase()
    )
}

fn lookup(registry: &Registry, person: &PersonRef) -> AdminResult<Person> {
    registry
        .find_by_name(&person.nom, &person.prenom)
        .ok_or_else(|| AdminError::NotFound(format!("{} in {}", person, registry.kind())))
}

/// Resolve a request against the registries, without writing anything
pub fn prepare_contract(
    settings: &Settings,
    request: &ContractRequest,
    created: NaiveDate,
) -> AdminResult<Contract> {
    request.validate()?;

    let substitutes = Registry::from_settings(request.kind.substitute_registry(), settings)?;
    let remplacant = lookup(&substitutes, &request.remplacant)?;

    let (remplace, remplace_name) = match (request.kind, &request.remplace) {
        (ContractKind::Mar, Some(r)) => {
            let titulaires = Registry::from_settings(RegistryKind::MarTitulaires, settings)?;
            let person = lookup(&titulaires, r)?;
            let name = person.display_name();
            (Some(person), Some(name))
        }
        (_, Some(r)) => (None, Some(r.to_string())),
        (_, None) => (None, None),
    };

    Ok(Contract {
        number: contract_number(request.kind, created),
        kind: request.kind,
        created,
        remplacant,
        remplace,
        remplace_name,
        start: request.start,
        end: request.end,
        retrocession: request.retrocession,
        motif: request.motif.clone().filter(|m| !m.trim().is_empty()),
    })
}

/// Result of a successful contract creation
#[derive(Debug, Clone)]
pub struct CreatedContract {
    pub contract: Contract,
    pub document: PathBuf,
    pub report: FillReport,
}

/// Generate the document and record the contract in the register
pub fn create_contract(
    settings: &Settings,
    request: &ContractRequest,
    created: NaiveDate,
) -> AdminResult<CreatedContract> {
    let contract = prepare_contract(settings, request, created)?;

    let template = settings.file_path(request.kind.template_key(), true)?;
    let workbook = settings.file_path(request.kind.workbook_key(), false)?;
    let out_dir = settings.file_path(request.kind.output_key(), false)?;
    std::fs::create_dir_all(&out_dir)?;

    let document = out_dir.join(contract.file_name());
    let report = fill_template(&template, &document, &contract.placeholders())?;

    if let Err(e) = append_to_register(&workbook, &contract, &document) {
        warn!(document = %document.display(), "Register update failed, removing document");
        let _ = std::fs::remove_file(&document);
        return Err(e);
    }

    info!(
        number = %contract.number,
        kind = %contract.kind,
        document = %document.display(),
        "Contract created"
    );

    Ok(CreatedContract {
        contract,
        document,
        report,
    })
}

fn load_register(workbook: &Path) -> AdminResult<Sheet> {
    let mut sheet = if workbook.exists() {
        match read_sheet(workbook, REGISTER_SHEET) {
            Ok(sheet) => sheet,
            Err(AdminError::NotFound(_)) => Sheet::new(REGISTER_SHEET, Vec::new()),
            Err(e) => return Err(e),
        }
    } else {
        Sheet::new(REGISTER_SHEET, Vec::new())
    };
    for col in REGISTER_COLUMNS {
        sheet.ensure_column(col);
    }
    Ok(sheet)
}

fn append_to_register(workbook: &Path, contract: &Contract, document: &Path) -> AdminResult<()> {
    let mut sheet = load_register(workbook)?;
    let row = contract.register_row(&sheet, document);
    sheet.push_row(row);
    save_excel_with_updated_sheet(workbook, &sheet)
}

/// One line of the contract register
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRecord {
    pub number: String,
    pub created: Option<NaiveDate>,
    pub remplacant: String,
    pub remplace: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub document: String,
}

/// Contracts recorded for a kind, oldest first
pub fn list_contracts(settings: &Settings, kind: ContractKind) -> AdminResult<Vec<ContractRecord>> {
    let workbook = settings.file_path(kind.workbook_key(), false)?;
    let sheet = load_register(&workbook)?;

    let text = |row: usize, col: &str| {
        sheet
            .cell(row, col)
            .map(|v| v.to_string())
            .unwrap_or_default()
    };
    let date = |row: usize, col: &str| sheet.cell(row, col).and_then(CellValue::as_date);

    Ok((0..sheet.rows.len())
        .map(|i| ContractRecord {
            number: text(i, "NUMERO"),
            created: date(i, "DATE_CREATION"),
            remplacant: text(i, "REMPLACANT"),
            remplace: text(i, "REMPLACE"),
            start: date(i, "DATE_DEBUT"),
            end: date(i, "DATE_FIN"),
            document: text(i, "FICHIER"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mar_request() -> ContractRequest {
        ContractRequest {
            kind: ContractKind::Mar,
            remplacant: PersonRef::new("Durand", "Paul"),
            remplace: Some(PersonRef::new("Martin", "Claire")),
            start: date(2025, 3, 1),
            end: date(2025, 3, 7),
            retrocession: Some(70.0),
            motif: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        let req = mar_request();
        assert!(req.validate().is_ok());
        assert_eq!(req.days(), 7);
    }

    #[test]
    fn test_validate_dates() {
        let mut req = mar_request();
        req.end = date(2025, 2, 28);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_same_person() {
        let mut req = mar_request();
        req.remplace = Some(PersonRef::new("DURAND", "paul"));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_same_person_accented() {
        let mut req = mar_request();
        req.remplacant = PersonRef::new("Éric", "Lefèvre");
        req.remplace = Some(PersonRef::new("ÉRIC", " LEFÈVRE "));
        assert!(matches!(req.validate(), Err(AdminError::Validation(_))));
    }

    #[test]
    fn test_validate_mar_needs_titulaire() {
        let mut req = mar_request();
        req.remplace = None;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_retrocession_range() {
        let mut req = mar_request();
        req.retrocession = Some(120.0);
        assert!(req.validate().is_err());

        let mut iade = mar_request();
        iade.kind = ContractKind::Iade;
        assert!(iade.validate().is_err());
        iade.retrocession = None;
        iade.remplace = None;
        assert!(iade.validate().is_ok());
    }

    #[test]
    fn test_contract_number_shape() {
        let n = contract_number(ContractKind::Iade, date(2025, 1, 9));
        assert!(n.starts_with("IADE-20250109-"));
        assert_eq!(n.len(), "IADE-20250109-".len() + 8);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(70.0), "70");
        assert_eq!(format_percent(62.5), "62,50");
    }

    #[test]
    fn test_sanitize_file_part() {
        assert_eq!(sanitize_file_part("Le Gall"), "Le_Gall");
        assert_eq!(sanitize_file_part("Jean-Éric"), "Jean-Éric");
        assert_eq!(sanitize_file_part("O'Neil/2"), "O_Neil_2");
    }
}
