//! Sheet-preserving workbook save
//!
//! Replacing one sheet means rewriting the whole workbook, so the file is
//! copied to a `.bak` sidecar first and put back if anything goes wrong.

use crate::error::{AdminError, AdminResult};
use crate::excel::reader::{read_sheet, read_workbook};
use crate::excel::sheet::{CellValue, Sheet};
use crate::excel::writer::write_workbook;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Windows ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
const SHARING_VIOLATION: i32 = 32;
const LOCK_VIOLATION: i32 = 33;

/// `<path>.bak`, next to the workbook
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Owner files Excel and LibreOffice drop next to an open workbook
fn owner_lock_files(path: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Vec::new();
    };
    let file_name = file_name.to_string_lossy();
    vec![
        dir.join(format!("~${}", file_name)),
        dir.join(format!(".~lock.{}#", file_name)),
    ]
}

/// Fail with [`AdminError::Locked`] when another program holds the workbook
pub fn ensure_not_locked(path: &Path) -> AdminResult<()> {
    if let Some(lock) = owner_lock_files(path).into_iter().find(|p| p.exists()) {
        debug!(lock = %lock.display(), "Owner lock file present");
        return Err(AdminError::Locked(path.to_path_buf()));
    }

    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
    }

    match options.open(path) {
        Ok(_) => Ok(()),
        Err(e)
            if e.kind() == std::io::ErrorKind::PermissionDenied
                || matches!(e.raw_os_error(), Some(SHARING_VIOLATION) | Some(LOCK_VIOLATION)) =>
        {
            Err(AdminError::Locked(path.to_path_buf()))
        }
        Err(e) => Err(AdminError::Io(e)),
    }
}

/// Replace (or append) `sheet` in the workbook at `path`, keeping every other sheet.
///
/// A workbook that does not exist yet is created with just this sheet.
pub fn save_excel_with_updated_sheet(path: &Path, sheet: &Sheet) -> AdminResult<()> {
    save_with_check(path, sheet, verify_row_count)
}

/// The save sequence, with the read-back check passed in
fn save_with_check<F>(path: &Path, sheet: &Sheet, check: F) -> AdminResult<()>
where
    F: Fn(&Path, &Sheet) -> AdminResult<()>,
{
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_workbook(path, std::slice::from_ref(sheet))?;
        info!(path = %path.display(), sheet = %sheet.name, "Workbook created");
        return Ok(());
    }

    ensure_not_locked(path)?;

    // A .bak still present may be the only good copy
    let backup = backup_path(path);
    if backup.exists() {
        return Err(AdminError::BackupExists(backup));
    }
    fs::copy(path, &backup)?;
    debug!(backup = %backup.display(), "Backup written");

    match rewrite_with_sheet(path, sheet, &check) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(&backup) {
                warn!(error = %e, backup = %backup.display(), "Could not remove backup");
            }
            info!(
                path = %path.display(),
                sheet = %sheet.name,
                rows = sheet.rows.len(),
                "Workbook saved"
            );
            Ok(())
        }
        Err(e) => {
            let restored = match fs::copy(&backup, path) {
                Ok(_) => {
                    let _ = fs::remove_file(&backup);
                    true
                }
                Err(restore_err) => {
                    // Leave the .bak in place so the user can recover by hand
                    error!(error = %restore_err, backup = %backup.display(), "Backup restore failed");
                    false
                }
            };
            error!(path = %path.display(), error = %e, restored, "Workbook save failed");
            Err(AdminError::SaveFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
                restored,
            })
        }
    }
}

fn rewrite_with_sheet<F>(path: &Path, sheet: &Sheet, check: &F) -> AdminResult<()>
where
    F: Fn(&Path, &Sheet) -> AdminResult<()>,
{
    let mut sheets = read_workbook(path)?;

    match sheets.iter_mut().find(|s| s.name == sheet.name) {
        Some(existing) => *existing = sheet.clone(),
        None => sheets.push(sheet.clone()),
    }

    write_workbook(path, &sheets)?;
    check(path, sheet)
}

/// Read back the sheet just written and compare row counts
fn verify_row_count(path: &Path, sheet: &Sheet) -> AdminResult<()> {
    let written = read_sheet(path, &sheet.name)?;
    let expected = sheet.rows.len()
        - sheet
            .rows
            .iter()
            .rev()
            .take_while(|r| r.iter().all(CellValue::is_empty))
            .count();
    if written.rows.len() != expected {
        return Err(AdminError::Excel(format!(
            "sheet '{}' has {} rows after save, expected {}",
            sheet.name,
            written.rows.len(),
            expected
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/data/MAR.xlsx")),
            PathBuf::from("/data/MAR.xlsx.bak")
        );
    }

    fn sample(name: &str, rows: &[&str]) -> Sheet {
        let mut sheet = Sheet::new(name, vec!["NOM".to_string()]);
        for r in rows {
            sheet.push_row(vec![(*r).into()]);
        }
        sheet
    }

    #[test]
    fn test_failed_check_restores_rewritten_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("MAR.xlsx");
        write_workbook(&path, &[sample("MAR titulaires", &["MARTIN"]), sample("Notes", &["x"])])
            .unwrap();
        let before = fs::read(&path).unwrap();

        let updated = sample("MAR titulaires", &["MARTIN", "DUPONT", "LEROY"]);
        let err = save_with_check(&path, &updated, |p, _| {
            // The workbook really was rewritten before the check fails
            let written = read_sheet(p, "MAR titulaires")?;
            assert_eq!(written.len(), 3);
            Err(AdminError::Excel("read-back mismatch".into()))
        })
        .unwrap_err();

        match err {
            AdminError::SaveFailed { restored, reason, .. } => {
                assert!(restored);
                assert!(reason.contains("read-back mismatch"));
            }
            other => panic!("expected SaveFailed, got {:?}", other),
        }
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(read_sheet(&path, "MAR titulaires").unwrap().len(), 1);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_verify_row_count_ignores_trailing_blank_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("S.xlsx");
        let mut sheet = sample("Salariés", &["BERNARD"]);
        sheet.push_row(vec![CellValue::Empty]);
        write_workbook(&path, std::slice::from_ref(&sheet)).unwrap();
        assert!(verify_row_count(&path, &sheet).is_ok());
    }

    #[test]
    fn test_owner_lock_files() {
        let locks = owner_lock_files(Path::new("/data/MAR.xlsx"));
        assert_eq!(locks[0], PathBuf::from("/data/~$MAR.xlsx"));
        assert_eq!(locks[1], PathBuf::from("/data/.~lock.MAR.xlsx#"));
    }
}
