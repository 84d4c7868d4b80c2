use crate::contracts::{self, ContractKind, ContractRequest, PersonRef};
use crate::docusign::DocuSignConfig;
use crate::error::{AdminError, AdminResult};
use crate::invoices::{export_report, InvoiceAnalyzer};
use crate::payslips::{PayslipArchive, PayslipFilter, Period};
use crate::registry::{Person, Registry, RegistryKind};
use crate::settings::{PathKey, PathKind, Settings};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Format an amount in euros with two decimals
fn format_amount(n: f64) -> String {
    format!("{:.2} €", n)
}

/// Accept `dd/mm/yyyy` or `yyyy-mm-dd`
fn parse_date(s: &str) -> AdminResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
        .map_err(|_| {
            AdminError::Validation(format!(
                "invalid date '{}', expected dd/mm/yyyy or yyyy-mm-dd",
                s
            ))
        })
}

/// `COLUMN=VALUE`
fn parse_field(s: &str) -> AdminResult<(String, String)> {
    let (key, value) = s.split_once('=').ok_or_else(|| {
        AdminError::Validation(format!("invalid field '{}', expected COLUMN=VALUE", s))
    })?;
    if key.trim().is_empty() {
        return Err(AdminError::Validation(format!(
            "invalid field '{}', column name is empty",
            s
        )));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_fields(raw: &[String]) -> AdminResult<Vec<(String, String)>> {
    raw.iter().map(|s| parse_field(s)).collect()
}

/// One-based row number from the command line to a zero-based index
fn row_index(row: usize) -> AdminResult<usize> {
    row.checked_sub(1)
        .ok_or_else(|| AdminError::Validation("row numbers start at 1".into()))
}

/// Print the "configuration incomplete" warning shown at start-up
pub fn warn_missing_paths(config_dir: &Path) {
    let missing = Settings::load(config_dir).missing_paths();
    if missing.is_empty() {
        return;
    }
    eprintln!(
        "{}",
        "⚠️  Some file paths are not configured:".yellow().bold()
    );
    for key in &missing {
        eprintln!("   - {} ({})", key.description(), key.as_str().dimmed());
    }
    eprintln!(
        "{}",
        "   Configure them with 'selarl paths set <key> <path>'.\n".yellow()
    );
}

/// Execute the check command - configured paths and whether they exist
pub fn check(config_dir: &Path) -> AdminResult<()> {
    println!("{}", "🔎 Configuration check".bold().green());
    println!("   Config dir: {}\n", config_dir.display());

    let settings = Settings::load(config_dir);
    let mut problems = 0;

    for key in PathKey::ALL {
        match settings.file_path(key, true) {
            Ok(path) => println!(
                "   {} {:<34} {}",
                "✅".green(),
                key.description(),
                path.display()
            ),
            Err(AdminError::NotConfigured(_)) => {
                problems += 1;
                println!(
                    "   {} {:<34} {}",
                    "⚠️".yellow(),
                    key.description(),
                    "not configured".yellow()
                );
            }
            Err(_) => {
                problems += 1;
                println!(
                    "   {} {:<34} {} {}",
                    "❌".red(),
                    key.description(),
                    settings.get(key).unwrap_or_default(),
                    "(missing on disk)".red()
                );
            }
        }
    }

    println!();
    if problems == 0 {
        println!("{}", "✅ All paths configured".bold().green());
    } else {
        println!(
            "{}",
            format!("⚠️  {} path(s) need attention", problems).yellow().bold()
        );
    }
    Ok(())
}

/// Execute the paths show command
pub fn paths_show(config_dir: &Path) -> AdminResult<()> {
    let settings = Settings::load(config_dir);
    println!("{}", "📁 Configured paths".bold().green());
    for key in PathKey::ALL {
        let value = settings
            .get(key)
            .map(|v| v.normal())
            .unwrap_or_else(|| "(not set)".dimmed());
        println!("   {:<18} {}", key.as_str().cyan(), value);
    }
    Ok(())
}

/// Execute the paths set command
pub fn paths_set(config_dir: &Path, key: String, value: PathBuf) -> AdminResult<()> {
    let key = PathKey::parse(&key)?;
    let mut settings = Settings::load(config_dir);

    let exists = match key.kind() {
        PathKind::File => value.is_file(),
        PathKind::Directory => value.is_dir(),
    };
    if !exists {
        println!(
            "{}",
            format!(
                "⚠️  {} does not exist yet ({} expected)",
                value.display(),
                match key.kind() {
                    PathKind::File => "file",
                    PathKind::Directory => "directory",
                }
            )
            .yellow()
        );
    }

    settings.set(key, value.display().to_string());
    settings.save(config_dir)?;
    println!(
        "{} {} = {}",
        "✅ Saved".bold().green(),
        key.as_str().cyan(),
        value.display()
    );
    Ok(())
}

/// Execute the docusign show command
pub fn docusign_show(config_dir: &Path) -> AdminResult<()> {
    let config = DocuSignConfig::load(config_dir)?;
    println!("{}", "✍️  DocuSign".bold().green());
    for line in config.to_string().lines() {
        println!("   {}", line);
    }
    Ok(())
}

/// Execute the docusign set command
pub fn docusign_set(
    config_dir: &Path,
    login_page: Option<String>,
    email: Option<String>,
    password: Option<String>,
    clear_password: bool,
) -> AdminResult<()> {
    let mut config = DocuSignConfig::load(config_dir)?;
    if let Some(page) = login_page {
        config.login_page = page;
    }
    if let Some(email) = email {
        config.email = email;
    }
    if clear_password {
        config.password = None;
    } else if let Some(pw) = password {
        config.password = Some(pw).filter(|p| !p.is_empty());
    }
    config.save(config_dir)?;
    println!("{}", "✅ DocuSign settings saved".bold().green());
    Ok(())
}

fn print_people(registry: &Registry, people: &[Person]) {
    let headers = registry.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for p in people {
        for (i, (_, v)) in p.fields.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(v.to_string().chars().count()).min(40);
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    println!("   {:>4}  {}", "#", header_line.join("  ").bold());

    for p in people {
        let cells: Vec<String> = p
            .fields
            .iter()
            .zip(&widths)
            .map(|((_, v), w)| {
                let text: String = v.to_string().chars().take(*w).collect();
                format!("{:<w$}", text, w = *w)
            })
            .collect();
        println!("   {:>4}  {}", p.index + 1, cells.join("  "));
    }
}

fn open_registry(config_dir: &Path, kind: &str) -> AdminResult<Registry> {
    let kind = RegistryKind::parse(kind)?;
    let settings = Settings::load(config_dir);
    Registry::from_settings(kind, &settings)
}

/// Execute the registry list command
pub fn registry_list(config_dir: &Path, kind: String, search: Option<String>) -> AdminResult<()> {
    let registry = open_registry(config_dir, &kind)?;
    let people = registry.search(search.as_deref().unwrap_or(""));

    println!("{}", format!("👥 {}", registry.kind()).bold().green());
    println!("   File: {}", registry.path().display());
    println!();

    if people.is_empty() {
        println!("   {}", "No entries".dimmed());
    } else {
        print_people(&registry, &people);
    }
    println!();
    println!("   {} of {} entries", people.len(), registry.len());
    Ok(())
}

/// Execute the registry add command
pub fn registry_add(config_dir: &Path, kind: String, fields: Vec<String>) -> AdminResult<()> {
    let mut registry = open_registry(config_dir, &kind)?;
    let fields = parse_fields(&fields)?;
    let index = registry.add(&fields)?;
    let person = registry.get(index)?;
    println!(
        "{} {} (row {}) to {}",
        "✅ Added".bold().green(),
        person.display_name().bright_blue(),
        index + 1,
        registry.kind()
    );
    Ok(())
}

/// Execute the registry update command
pub fn registry_update(
    config_dir: &Path,
    kind: String,
    row: usize,
    fields: Vec<String>,
) -> AdminResult<()> {
    let mut registry = open_registry(config_dir, &kind)?;
    let fields = parse_fields(&fields)?;
    if fields.is_empty() {
        return Err(AdminError::Validation(
            "nothing to update, pass at least one --field COLUMN=VALUE".into(),
        ));
    }
    let index = row_index(row)?;
    registry.update(index, &fields)?;
    let person = registry.get(index)?;
    println!(
        "{} {} (row {})",
        "✅ Updated".bold().green(),
        person.display_name().bright_blue(),
        row
    );
    Ok(())
}

/// Execute the registry delete command
pub fn registry_delete(config_dir: &Path, kind: String, row: usize) -> AdminResult<()> {
    let mut registry = open_registry(config_dir, &kind)?;
    let removed = registry.delete(row_index(row)?)?;
    println!(
        "{} {} from {}",
        "🗑️  Deleted".bold().green(),
        removed.display_name().bright_blue(),
        registry.kind()
    );
    Ok(())
}

/// Arguments of the contract new command
#[derive(Debug, Clone)]
pub struct NewContractArgs {
    pub remplacant_nom: String,
    pub remplacant_prenom: String,
    pub remplace_nom: Option<String>,
    pub remplace_prenom: Option<String>,
    pub debut: String,
    pub fin: String,
    pub retrocession: Option<f64>,
    pub motif: Option<String>,
    pub dry_run: bool,
}

impl NewContractArgs {
    fn into_request(self, kind: ContractKind) -> AdminResult<ContractRequest> {
        let remplace = match (self.remplace_nom, self.remplace_prenom) {
            (Some(nom), Some(prenom)) => Some(PersonRef::new(nom, prenom)),
            (None, None) => None,
            _ => {
                return Err(AdminError::Validation(
                    "give both --remplace-nom and --remplace-prenom".into(),
                ))
            }
        };
        Ok(ContractRequest {
            kind,
            remplacant: PersonRef::new(self.remplacant_nom, self.remplacant_prenom),
            remplace,
            start: parse_date(&self.debut)?,
            end: parse_date(&self.fin)?,
            retrocession: self.retrocession,
            motif: self.motif,
        })
    }
}

/// Execute the contract new command
pub fn contract_new(config_dir: &Path, kind: ContractKind, args: NewContractArgs) -> AdminResult<()> {
    println!(
        "{}",
        format!("📝 New {} contract", kind.code()).bold().green()
    );
    let dry_run = args.dry_run;
    let request = args.into_request(kind)?;
    let settings = Settings::load(config_dir);
    let today = Local::now().date_naive();

    if dry_run {
        println!(
            "{}",
            "📋 DRY RUN MODE - No document or register change\n".yellow()
        );
        let contract = contracts::prepare_contract(&settings, &request, today)?;
        println!("   Number:   {}", contract.number.bright_blue());
        println!("   Document: {}", contract.file_name());
        println!("\n   {}", "Template values:".cyan());
        for (key, value) in contract.placeholders() {
            println!("      {{{{{}}}}} = {}", key, value);
        }
        return Ok(());
    }

    let created = contracts::create_contract(&settings, &request, today)?;
    println!(
        "   Number:     {}",
        created.contract.number.bright_blue().bold()
    );
    println!("   Substitute: {}", created.contract.remplacant.display_name());
    if let Some(name) = &created.contract.remplace_name {
        println!("   Replacing:  {}", name);
    }
    println!(
        "   Period:     {} → {} ({} days)",
        created.contract.start.format("%d/%m/%Y"),
        created.contract.end.format("%d/%m/%Y"),
        created.contract.days()
    );
    println!("   Document:   {}", created.document.display());

    if !created.report.unresolved.is_empty() {
        let names: Vec<&str> = created.report.unresolved.iter().map(String::as_str).collect();
        println!(
            "{}",
            format!("⚠️  Unresolved template fields: {}", names.join(", ")).yellow()
        );
    }
    println!("{}", "✅ Contract created and registered".bold().green());
    Ok(())
}

/// Execute the contract list command
pub fn contract_list(config_dir: &Path, kind: ContractKind) -> AdminResult<()> {
    let settings = Settings::load(config_dir);
    let records = contracts::list_contracts(&settings, kind)?;

    println!(
        "{}",
        format!("📚 {} contracts", kind.code()).bold().green()
    );
    if records.is_empty() {
        println!("   {}", "No contracts recorded".dimmed());
        return Ok(());
    }

    let date = |d: Option<NaiveDate>| {
        d.map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "?".into())
    };
    for r in &records {
        println!(
            "   {}  {} → {}  {}{}",
            r.number.bright_blue(),
            date(r.start),
            date(r.end),
            r.remplacant,
            if r.remplace.is_empty() {
                String::new()
            } else {
                format!(" (remplace {})", r.remplace)
            }
        );
    }
    println!("\n   {} contract(s)", records.len());
    Ok(())
}

/// Execute the invoices analyze command
pub fn invoices_analyze(
    config_dir: &Path,
    folder: Option<PathBuf>,
    year: Option<i32>,
    export: Option<PathBuf>,
    verbose: bool,
) -> AdminResult<()> {
    let folder = match folder {
        Some(f) => f,
        None => Settings::load(config_dir).file_path(PathKey::DossierFactures, true)?,
    };

    println!("{}", "🧾 Invoice analysis".bold().green());
    println!("   Folder: {}", folder.display());
    if let Some(y) = year {
        println!("   Year:   {}", y);
    }
    println!();

    let report = InvoiceAnalyzer::new(&folder)?.analyze(year)?;

    if verbose {
        for inv in &report.invoices {
            println!(
                "   {}  {:<30} {:>12}  {}",
                inv.date.format("%d/%m/%Y"),
                inv.supplier,
                format_amount(inv.amount),
                inv.category.dimmed()
            );
        }
        println!();
    }

    println!("   {}", "By month:".cyan());
    for (month, total) in &report.by_month {
        println!("      {}  {:>12}", month, format_amount(*total));
    }
    println!("   {}", "By supplier:".cyan());
    for (supplier, total) in &report.by_supplier {
        println!("      {:<30} {:>12}", supplier, format_amount(*total));
    }
    println!("   {}", "By category:".cyan());
    for (category, total) in &report.by_category {
        println!("      {:<30} {:>12}", category, format_amount(*total));
    }
    println!();
    println!(
        "   {} invoice(s), total {}",
        report.invoices.len(),
        format_amount(report.total).bold()
    );

    if !report.unrecognized.is_empty() {
        println!(
            "{}",
            format!(
                "⚠️  {} file(s) not named YYYY-MM-DD_supplier_amount:",
                report.unrecognized.len()
            )
            .yellow()
        );
        for path in &report.unrecognized {
            println!("      {}", path.display());
        }
    }

    if let Some(out) = export {
        export_report(&report, &out)?;
        println!("{} {}", "✅ Report exported to".bold().green(), out.display());
    }
    Ok(())
}

fn payslip_archive(config_dir: &Path) -> AdminResult<PayslipArchive> {
    let root = Settings::load(config_dir).file_path(PathKey::BulletinsSalaire, false)?;
    PayslipArchive::new(root)
}

/// Execute the payslips list command
pub fn payslips_list(
    config_dir: &Path,
    employee: Option<String>,
    year: Option<i32>,
) -> AdminResult<()> {
    let archive = payslip_archive(config_dir)?;
    let slips = archive.list(&PayslipFilter { employee, year })?;

    println!("{}", "💶 Payslips".bold().green());
    println!("   Folder: {}\n", archive.root().display());
    if slips.is_empty() {
        println!("   {}", "No payslips found".dimmed());
        return Ok(());
    }
    for slip in &slips {
        println!(
            "   {}  {:<30} {}",
            slip.period.to_string().bright_blue(),
            slip.employee(),
            slip.path.display().to_string().dimmed()
        );
    }
    println!("\n   {} payslip(s)", slips.len());
    Ok(())
}

/// Execute the payslips scan command - file a newly scanned PDF
pub fn payslips_scan(
    config_dir: &Path,
    file: PathBuf,
    nom: String,
    prenom: String,
    period: String,
    overwrite: bool,
) -> AdminResult<()> {
    let settings = Settings::load(config_dir);
    let archive = payslip_archive(config_dir)?;
    let period = Period::parse(&period)?;

    // Only a warning: payslips for people who left are still filed
    if let Ok(registry) = Registry::from_settings(RegistryKind::Salaries, &settings) {
        if registry.find_by_name(&nom, &prenom).is_none() {
            println!(
                "{}",
                format!("⚠️  {} {} is not in the Salariés registry", nom, prenom).yellow()
            );
        }
    }

    let target = archive.file_scan(&file, &nom, &prenom, period, overwrite)?;
    println!("{} {}", "✅ Payslip filed as".bold().green(), target.display());
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
