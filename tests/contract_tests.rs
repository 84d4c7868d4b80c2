//! Contract creation tests: template filling and the Contrats register

use chrono::NaiveDate;
use selarl_admin::contracts::{
    create_contract, list_contracts, prepare_contract, ContractKind, ContractRequest, PersonRef,
    REGISTER_SHEET,
};
use selarl_admin::error::AdminError;
use selarl_admin::excel::read_workbook;
use selarl_admin::registry::{Registry, RegistryKind};
use selarl_admin::settings::{PathKey, Settings};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document><w:body>
<w:p><w:t>Contrat {{NUMERO}}</w:t></w:p>
<w:p><w:t>Remplaçant : {{REMPLACANT}} ({{REMPLACANT_EMAIL}})</w:t></w:p>
<w:p><w:t>Remplacé : {{REMPLACE}}</w:t></w:p>
<w:p><w:t>Du {{DATE_DEBUT}} au {{DATE_FIN}} ({{NB_JOURS}} jours)</w:t></w:p>
<w:p><w:t>Rétrocession : {{RETROCESSION}} %</w:t></w:p>
</w:body></w:document>"#;

fn write_template(path: &Path) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = FileOptions::<()>::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(b"<Types/>").unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(DOCUMENT.as_bytes()).unwrap();
    zip.finish().unwrap();
}

fn document_xml(path: &Path) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add(registry: &mut Registry, pairs: &[(&str, &str)]) {
    let fields: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    registry.add(&fields).unwrap();
}

/// Settings pointing into a temp dir, with one titulaire and one remplaçant
fn setup(dir: &Path) -> Settings {
    let workbook = dir.join("MAR.xlsx");
    let template = dir.join("modele_mar.docx");
    write_template(&template);

    let mut settings = Settings::default();
    settings.set(PathKey::ExcelMar, workbook.display().to_string());
    settings.set(PathKey::WordMar, template.display().to_string());
    settings.set(PathKey::PdfMar, dir.join("contrats").display().to_string());
    settings.set(PathKey::ExcelIade, dir.join("IADE.xlsx").display().to_string());

    let mut titulaires = Registry::open(RegistryKind::MarTitulaires, &workbook).unwrap();
    add(&mut titulaires, &[("NOM", "Martin"), ("PRENOM", "Claire")]);
    let mut remplacants = Registry::open(RegistryKind::MarRemplacants, &workbook).unwrap();
    add(
        &mut remplacants,
        &[
            ("NOM", "Durand"),
            ("PRENOM", "Paul"),
            ("EMAIL", "paul.durand@example.fr"),
        ],
    );

    settings
}

fn mar_request() -> ContractRequest {
    ContractRequest {
        kind: ContractKind::Mar,
        remplacant: PersonRef::new("Durand", "Paul"),
        remplace: Some(PersonRef::new("Martin", "Claire")),
        start: date(2025, 3, 1),
        end: date(2025, 3, 7),
        retrocession: Some(70.0),
        motif: Some("Congés".into()),
    }
}

#[test]
fn test_create_mar_contract_end_to_end() {
    let dir = TempDir::new().unwrap();
    let settings = setup(dir.path());

    let created = create_contract(&settings, &mar_request(), date(2025, 2, 20)).unwrap();

    assert_eq!(
        created.document,
        dir.path()
            .join("contrats")
            .join("Contrat_MAR_DURAND_Paul_20250301.docx")
    );
    assert!(created.report.unresolved.is_empty());

    let xml = document_xml(&created.document);
    assert!(xml.contains(&created.contract.number));
    assert!(xml.contains("paul.durand@example.fr"));
    assert!(xml.contains("Du 01/03/2025 au 07/03/2025 (7 jours)"));
    assert!(xml.contains("Rétrocession : 70 %"));
    assert!(!xml.contains("{{"));

    // Register sits next to the registries in the same workbook
    let names: Vec<String> = read_workbook(&dir.path().join("MAR.xlsx"))
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        vec!["MAR titulaires", "MAR remplaçants", REGISTER_SHEET]
    );

    let records = list_contracts(&settings, ContractKind::Mar).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].number, created.contract.number);
    assert_eq!(records[0].start, Some(date(2025, 3, 1)));
    assert_eq!(records[0].end, Some(date(2025, 3, 7)));
    assert!(records[0].remplacant.contains("Paul"));
}

#[test]
fn test_existing_document_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let settings = setup(dir.path());

    create_contract(&settings, &mar_request(), date(2025, 2, 20)).unwrap();
    let err = create_contract(&settings, &mar_request(), date(2025, 2, 21)).unwrap_err();

    assert!(matches!(err, AdminError::Validation(_)));
    assert_eq!(list_contracts(&settings, ContractKind::Mar).unwrap().len(), 1);
}

#[test]
fn test_prepare_contract_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let settings = setup(dir.path());

    let contract = prepare_contract(&settings, &mar_request(), date(2025, 2, 20)).unwrap();
    assert!(contract.number.starts_with("MAR-20250220-"));
    assert_eq!(contract.days(), 7);
    assert!(!dir.path().join("contrats").exists());
    assert!(list_contracts(&settings, ContractKind::Mar).unwrap().is_empty());
}

#[test]
fn test_unknown_substitute_is_not_found() {
    let dir = TempDir::new().unwrap();
    let settings = setup(dir.path());

    let mut request = mar_request();
    request.remplacant = PersonRef::new("Inconnu", "Jean");
    let err = create_contract(&settings, &request, date(2025, 2, 20)).unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));
}

#[test]
fn test_unregistered_titulaire_is_not_found() {
    let dir = TempDir::new().unwrap();
    let settings = setup(dir.path());

    let mut request = mar_request();
    request.remplace = Some(PersonRef::new("Absent", "Luc"));
    assert!(matches!(
        prepare_contract(&settings, &request, date(2025, 2, 20)),
        Err(AdminError::NotFound(_))
    ));
}

#[test]
fn test_missing_template_path_is_not_configured() {
    let dir = TempDir::new().unwrap();
    let mut settings = setup(dir.path());
    settings.set(PathKey::WordMar, "");

    let err = create_contract(&settings, &mar_request(), date(2025, 2, 20)).unwrap_err();
    assert!(matches!(err, AdminError::NotConfigured(_)));
}

#[test]
fn test_iade_contract_without_replaced_person() {
    let dir = TempDir::new().unwrap();
    let settings = setup(dir.path());

    let mut iade = Registry::from_settings(RegistryKind::IadeRemplacants, &settings).unwrap();
    add(&mut iade, &[("NOM", "Petit"), ("PRENOM", "Anne")]);

    let request = ContractRequest {
        kind: ContractKind::Iade,
        remplacant: PersonRef::new("Petit", "Anne"),
        remplace: None,
        start: date(2025, 4, 1),
        end: date(2025, 4, 2),
        retrocession: None,
        motif: None,
    };
    let contract = prepare_contract(&settings, &request, date(2025, 3, 15)).unwrap();
    assert_eq!(contract.file_name(), "Contrat_IADE_PETIT_Anne_20250401.docx");
    assert_eq!(contract.placeholders()["REMPLACE"], "");
}
