//! Expense-invoice analysis over the invoices folder
//!
//! Files are expected to be named `YYYY-MM-DD_<supplier>_<amount>.<ext>`,
//! e.g. `2025-01-14_Orange_39,99.pdf`. When the name contains `_`, the amount
//! is everything after the last `_` and may group thousands (`1 234,56`).
//! Names without `_` are split on spaces. The first sub-folder below the root
//! is used as the expense category.

use crate::error::{AdminError, AdminResult};
use crate::excel::{write_workbook, CellValue, Sheet};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const INVOICE_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Files directly under the root have no category
pub const UNCATEGORIZED: &str = "(sans catégorie)";

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub supplier: String,
    pub amount: f64,
    pub category: String,
}

impl Invoice {
    /// `YYYY-MM`
    pub fn month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceReport {
    pub invoices: Vec<Invoice>,
    /// Invoice-looking files whose name does not follow the convention
    pub unrecognized: Vec<PathBuf>,
    pub by_month: BTreeMap<String, f64>,
    pub by_supplier: BTreeMap<String, f64>,
    pub by_category: BTreeMap<String, f64>,
    pub total: f64,
}

impl InvoiceReport {
    fn from_invoices(invoices: Vec<Invoice>, unrecognized: Vec<PathBuf>) -> Self {
        let mut report = InvoiceReport {
            unrecognized,
            ..Default::default()
        };
        for inv in &invoices {
            *report.by_month.entry(inv.month()).or_insert(0.0) += inv.amount;
            *report.by_supplier.entry(inv.supplier.clone()).or_insert(0.0) += inv.amount;
            *report.by_category.entry(inv.category.clone()).or_insert(0.0) += inv.amount;
            report.total += inv.amount;
        }
        report.invoices = invoices;
        report
    }
}

pub struct InvoiceAnalyzer {
    root: PathBuf,
    spaced: Regex,
    amount: Regex,
}

impl InvoiceAnalyzer {
    pub fn new<P: AsRef<Path>>(root: P) -> AdminResult<Self> {
        let spaced = Regex::new(
            r"^(?P<date>\d{4}-\d{2}-\d{2}) +(?P<supplier>.+?) +(?P<amount>\d+(?:[.,]\d{1,2})?\s*(?:€|EUR|eur)?)$",
        )
        .map_err(|e| AdminError::Validation(format!("Regex error: {}", e)))?;
        let amount = Regex::new(
            r"^(?P<int>\d{1,3}(?:[ \x{a0}.]\d{3})+|\d+)(?:[.,](?P<dec>\d{1,2}))?\s*(?:€|EUR|eur)?$",
        )
        .map_err(|e| AdminError::Validation(format!("Regex error: {}", e)))?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            spaced,
            amount,
        })
    }

    /// `39,99`, `120.5`, `1 234,56`, `1.234,56 €`
    fn parse_amount(&self, raw: &str) -> Option<f64> {
        let caps = self.amount.captures(raw.trim())?;
        let int: String = caps["int"].chars().filter(char::is_ascii_digit).collect();
        let dec = caps.name("dec").map(|m| m.as_str()).unwrap_or("0");
        format!("{}.{}", int, dec).parse().ok()
    }

    /// Parse a file stem following the naming convention
    pub fn parse_name(&self, stem: &str) -> Option<(NaiveDate, String, f64)> {
        let stem = stem.trim();
        let (date, supplier, amount) = if stem.contains('_') {
            let parts: Vec<&str> = stem
                .split('_')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 {
                return None;
            }
            let last = parts.len() - 1;
            (parts[0], parts[1..last].join(" "), parts[last])
        } else {
            let caps = self.spaced.captures(stem)?;
            let date = caps.name("date")?.as_str();
            let amount = caps.name("amount")?.as_str();
            (date, caps["supplier"].trim().to_string(), amount)
        };

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let amount = self.parse_amount(amount)?;
        if supplier.is_empty() {
            return None;
        }
        Some((date, supplier, amount))
    }

    fn category_of(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .ok()
            .and_then(|rel| {
                let mut parts = rel.components();
                let first = parts.next()?;
                // Only a folder counts, not the file itself
                parts.next()?;
                Some(first.as_os_str().to_string_lossy().to_string())
            })
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }

    /// Walk the folder; `year` keeps only invoices dated that year
    pub fn analyze(&self, year: Option<i32>) -> AdminResult<InvoiceReport> {
        if !self.root.is_dir() {
            return Err(AdminError::NotFound(format!(
                "invoices folder {}",
                self.root.display()
            )));
        }

        let mut invoices = Vec::new();
        let mut unrecognized = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable invoice entry");
                    None
                }
            })
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !INVOICE_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            match self.parse_name(&stem) {
                Some((date, supplier, amount)) => {
                    if year.map(|y| date.year() == y).unwrap_or(true) {
                        invoices.push(Invoice {
                            path: path.to_path_buf(),
                            date,
                            supplier,
                            amount,
                            category: self.category_of(path),
                        });
                    }
                }
                None => {
                    debug!(file = %path.display(), "Invoice name not recognized");
                    unrecognized.push(path.to_path_buf());
                }
            }
        }

        invoices.sort_by(|a, b| a.date.cmp(&b.date).then(a.supplier.cmp(&b.supplier)));

        let report = InvoiceReport::from_invoices(invoices, unrecognized);
        info!(
            folder = %self.root.display(),
            invoices = report.invoices.len(),
            unrecognized = report.unrecognized.len(),
            total = report.total,
            "Invoices analyzed"
        );
        Ok(report)
    }
}

fn totals_sheet(name: &str, key_header: &str, totals: &BTreeMap<String, f64>) -> Sheet {
    let mut sheet = Sheet::new(name, vec![key_header.to_string(), "TOTAL".to_string()]);
    for (key, total) in totals {
        sheet.push_row(vec![key.clone().into(), round_cents(*total).into()]);
    }
    sheet
}

fn round_cents(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Write the report as a workbook with one sheet per view
pub fn export_report(report: &InvoiceReport, path: &Path) -> AdminResult<()> {
    let mut detail = Sheet::new(
        "Factures",
        ["DATE", "FOURNISSEUR", "CATEGORIE", "MONTANT", "FICHIER"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    for inv in &report.invoices {
        detail.push_row(vec![
            CellValue::Date(inv.date),
            inv.supplier.clone().into(),
            inv.category.clone().into(),
            inv.amount.into(),
            inv.path.display().to_string().into(),
        ]);
    }

    let sheets = vec![
        detail,
        totals_sheet("Par mois", "MOIS", &report.by_month),
        totals_sheet("Par fournisseur", "FOURNISSEUR", &report.by_supplier),
        totals_sheet("Par catégorie", "CATEGORIE", &report.by_category),
    ];
    write_workbook(path, &sheets)?;
    info!(path = %path.display(), "Invoice report exported");
    Ok(())
}
