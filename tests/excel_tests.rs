//! Workbook read/write and sheet-preserving save tests

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use selarl_admin::error::AdminError;
use selarl_admin::excel::{
    backup_path, read_sheet, read_workbook, save_excel_with_updated_sheet, write_workbook,
    CellValue, Sheet,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn titulaires() -> Sheet {
    let mut sheet = Sheet::new("MAR titulaires", headers(&["NOM", "PRENOM", "EMAIL"]));
    sheet.push_row(vec!["MARTIN".into(), "Claire".into(), "c.martin@selarl.fr".into()]);
    sheet
}

fn autre() -> Sheet {
    let mut sheet = Sheet::new("Notes", headers(&["SUJET", "MONTANT"]));
    sheet.push_row(vec!["Loyer".into(), 1200.0.into()]);
    sheet.push_row(vec!["Ménage".into(), 350.5.into()]);
    sheet
}

fn seed(path: &Path) {
    write_workbook(path, &[titulaires(), autre()]).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// READ / WRITE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_write_then_read_keeps_sheet_order_and_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.xlsx");
    seed(&path);

    let sheets = read_workbook(&path).unwrap();
    assert_eq!(sheets.len(), 2);
    assert_eq!(sheets[0], titulaires());
    assert_eq!(sheets[1], autre());
}

#[test]
fn test_dates_are_read_back_as_dates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dates.xlsx");
    let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let mut sheet = Sheet::new("Salariés", headers(&["NOM", "DATE_ENTREE"]));
    sheet.push_row(vec!["BERNARD".into(), day.into()]);
    write_workbook(&path, &[sheet]).unwrap();

    let read = read_sheet(&path, "Salariés").unwrap();
    assert_eq!(read.cell(0, "DATE_ENTREE").and_then(CellValue::as_date), Some(day));
}

#[test]
fn test_read_missing_sheet_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.xlsx");
    seed(&path);

    let err = read_sheet(&path, "IADE remplaçants").unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// SAFE SAVE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_save_replaces_sheet_and_keeps_others() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MAR.xlsx");
    seed(&path);

    let mut updated = titulaires();
    updated.push_row(vec!["DUPONT".into(), "Jean".into(), CellValue::Empty]);
    save_excel_with_updated_sheet(&path, &updated).unwrap();

    let sheets = read_workbook(&path).unwrap();
    assert_eq!(sheets.len(), 2);
    assert_eq!(sheets[0].name, "MAR titulaires");
    assert_eq!(sheets[0].len(), 2);
    assert_eq!(sheets[1], autre());
    assert!(!backup_path(&path).exists());
}

#[test]
fn test_save_appends_new_sheet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MAR.xlsx");
    seed(&path);

    let mut contrats = Sheet::new("Contrats", headers(&["NUMERO"]));
    contrats.push_row(vec!["MAR-20250301-0000ABCD".into()]);
    save_excel_with_updated_sheet(&path, &contrats).unwrap();

    let names: Vec<String> = read_workbook(&path)
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["MAR titulaires", "Notes", "Contrats"]);
}

#[test]
fn test_save_creates_missing_workbook() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nouveau").join("IADE.xlsx");

    save_excel_with_updated_sheet(&path, &titulaires()).unwrap();

    assert!(path.exists());
    assert_eq!(read_sheet(&path, "MAR titulaires").unwrap(), titulaires());
}

#[test]
fn test_invalid_sheet_name_leaves_workbook_intact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MAR.xlsx");
    seed(&path);
    let before = fs::read(&path).unwrap();

    // Excel refuses '[' in sheet names, so the rewrite fails
    let bad = Sheet::new("Bad[name]", headers(&["NOM"]));
    let err = save_excel_with_updated_sheet(&path, &bad).unwrap_err();

    match err {
        AdminError::SaveFailed { restored, .. } => assert!(restored),
        other => panic!("expected SaveFailed, got {:?}", other),
    }
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(!backup_path(&path).exists());
}

#[test]
fn test_save_keeps_leftover_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MAR.xlsx");
    seed(&path);
    let before = fs::read(&path).unwrap();
    let backup = backup_path(&path);
    fs::write(&backup, b"previous workbook").unwrap();

    let err = save_excel_with_updated_sheet(&path, &titulaires()).unwrap_err();

    assert!(matches!(err, AdminError::BackupExists(_)));
    assert_eq!(fs::read(&backup).unwrap(), b"previous workbook");
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_save_refuses_workbook_open_in_excel() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MAR.xlsx");
    seed(&path);
    fs::write(dir.path().join("~$MAR.xlsx"), b"owner").unwrap();

    let err = save_excel_with_updated_sheet(&path, &titulaires()).unwrap_err();
    assert!(matches!(err, AdminError::Locked(_)));
    assert!(!backup_path(&path).exists());
}

#[test]
fn test_save_refuses_workbook_open_in_libreoffice() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MAR.xlsx");
    seed(&path);
    fs::write(dir.path().join(".~lock.MAR.xlsx#"), b"owner").unwrap();

    let err = save_excel_with_updated_sheet(&path, &titulaires()).unwrap_err();
    assert!(matches!(err, AdminError::Locked(_)));
}
