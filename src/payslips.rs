//! Payslip archive: filing scanned PDFs and consulting them
//!
//! Layout: `<root>/<YYYY>/<NOM>_<PRENOM>_<YYYY-MM>.pdf`. Listing searches the
//! whole tree, so files sorted by hand into other folders are found too.

use crate::error::{AdminError, AdminResult};
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Pay period, `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn parse(s: &str) -> AdminResult<Self> {
        let invalid = || AdminError::Validation(format!("invalid period '{}', expected YYYY-MM", s));
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payslip {
    pub nom: String,
    pub prenom: String,
    pub period: Period,
    pub path: PathBuf,
}

impl Payslip {
    pub fn employee(&self) -> String {
        format!("{} {}", self.nom, self.prenom)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PayslipFilter {
    /// Case-insensitive substring of "NOM Prénom"
    pub employee: Option<String>,
    pub year: Option<i32>,
}

impl PayslipFilter {
    fn matches(&self, p: &Payslip) -> bool {
        let employee_ok = self
            .employee
            .as_ref()
            .map(|q| p.employee().to_lowercase().contains(&q.trim().to_lowercase()))
            .unwrap_or(true);
        let year_ok = self.year.map(|y| p.period.year == y).unwrap_or(true);
        employee_ok && year_ok
    }
}

/// `NOM_PRENOM` part of a file name; spaces inside a name become `-`
fn name_part(s: &str) -> String {
    s.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

pub struct PayslipArchive {
    root: PathBuf,
    pattern: Regex,
}

impl PayslipArchive {
    pub fn new<P: AsRef<Path>>(root: P) -> AdminResult<Self> {
        let pattern = Regex::new(r"^(?P<nom>[^_]+)_(?P<prenom>[^_]+)_(?P<period>\d{4}-\d{2})$")
            .map_err(|e| AdminError::Validation(format!("Regex error: {}", e)))?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            pattern,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a payslip for this employee and period is filed
    pub fn target_path(&self, nom: &str, prenom: &str, period: Period) -> PathBuf {
        self.root.join(format!("{:04}", period.year)).join(format!(
            "{}_{}_{}.pdf",
            name_part(nom).to_uppercase(),
            name_part(prenom),
            period
        ))
    }

    fn parse_file(&self, path: &Path) -> Option<Payslip> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if ext != "pdf" {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy().to_string();
        let caps = self.pattern.captures(&stem)?;
        let period = Period::parse(&caps["period"]).ok()?;
        Some(Payslip {
            nom: caps["nom"].to_string(),
            prenom: caps["prenom"].to_string(),
            period,
            path: path.to_path_buf(),
        })
    }

    /// Payslips sorted by period, then name
    pub fn list(&self, filter: &PayslipFilter) -> AdminResult<Vec<Payslip>> {
        if !self.root.is_dir() {
            return Err(AdminError::NotFound(format!(
                "payslip folder {}",
                self.root.display()
            )));
        }

        let mut slips: Vec<Payslip> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable payslip entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.parse_file(e.path()))
            .filter(|p| filter.matches(p))
            .collect();

        slips.sort_by(|a, b| {
            a.period
                .cmp(&b.period)
                .then_with(|| a.nom.cmp(&b.nom))
                .then_with(|| a.prenom.cmp(&b.prenom))
        });
        debug!(count = slips.len(), "Payslips listed");
        Ok(slips)
    }

    /// File a scanned PDF under the archive; refuses to replace an existing
    /// payslip unless `overwrite` is set
    pub fn file_scan(
        &self,
        source: &Path,
        nom: &str,
        prenom: &str,
        period: Period,
        overwrite: bool,
    ) -> AdminResult<PathBuf> {
        if name_part(nom).is_empty() || name_part(prenom).is_empty() {
            return Err(AdminError::Validation(
                "employee name and first name are required".into(),
            ));
        }
        if !is_pdf(source)? {
            return Err(AdminError::Validation(format!(
                "{} is not a PDF file",
                source.display()
            )));
        }

        let target = self.target_path(nom, prenom, period);
        if target.exists() {
            if fs::canonicalize(source)? == fs::canonicalize(&target)? {
                info!(target = %target.display(), "Payslip already filed");
                return Ok(target);
            }
            if !overwrite {
                return Err(AdminError::Validation(format!(
                    "{} already exists (use --overwrite to replace it)",
                    target.display()
                )));
            }
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        // Copy beside the target, then rename over it
        let partial = target.with_extension("pdf.part");
        if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, &target)) {
            let _ = fs::remove_file(&partial);
            return Err(AdminError::Io(e));
        }
        info!(source = %source.display(), target = %target.display(), "Payslip filed");
        Ok(target)
    }
}

fn is_pdf(path: &Path) -> AdminResult<bool> {
    let mut file = fs::File::open(path)?;
    let mut head = [0u8; 5];
    match file.read_exact(&mut head) {
        Ok(()) => Ok(head == PDF_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(AdminError::Io(e)),
    }
}
