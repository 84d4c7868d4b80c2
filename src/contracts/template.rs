//! `.docx` template filling
//!
//! A .docx is a zip package; `{{PLACEHOLDER}}` markers inside the `word/*.xml`
//! parts are replaced and every other entry is copied unchanged. Word can split
//! a marker across formatting runs, in which case it is left as is and reported
//! as unresolved.

use crate::error::{AdminError, AdminResult};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn placeholder_pattern() -> AdminResult<Regex> {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}")
        .map_err(|e| AdminError::Template(format!("Regex error: {}", e)))
}

/// What happened to the placeholders while filling a template
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FillReport {
    /// Placeholder → number of replacements
    pub replaced: BTreeMap<String, usize>,
    /// Markers found in the document with no value supplied
    pub unresolved: BTreeSet<String>,
}

pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace known markers in one XML part
pub fn fill_xml(
    xml: &str,
    pattern: &Regex,
    values: &BTreeMap<String, String>,
    report: &mut FillReport,
) -> String {
    pattern
        .replace_all(xml, |caps: &regex::Captures| {
            let key = caps[1].to_uppercase();
            match values.get(&key) {
                Some(v) => {
                    *report.replaced.entry(key).or_insert(0) += 1;
                    xml_escape(v)
                }
                None => {
                    report.unresolved.insert(key);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn is_document_part(name: &str) -> bool {
    name.starts_with("word/") && name.ends_with(".xml")
}

/// Fill `template` into a new file at `output`. Never overwrites `output`.
pub fn fill_template(
    template: &Path,
    output: &Path,
    values: &BTreeMap<String, String>,
) -> AdminResult<FillReport> {
    let source = File::open(template)?;
    let mut archive = ZipArchive::new(source).map_err(|e| {
        AdminError::Template(format!("{} is not a .docx package: {}", template.display(), e))
    })?;

    let target = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                AdminError::Validation(format!("{} already exists", output.display()))
            }
            _ => AdminError::Io(e),
        })?;

    let pattern = placeholder_pattern()?;
    let result = copy_filled(&mut archive, target, &pattern, values);
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    let report = result?;

    if !report.unresolved.is_empty() {
        warn!(
            template = %template.display(),
            unresolved = ?report.unresolved,
            "Template placeholders left unresolved"
        );
    }
    debug!(output = %output.display(), replaced = report.replaced.len(), "Template filled");
    Ok(report)
}

fn copy_filled(
    archive: &mut ZipArchive<File>,
    target: File,
    pattern: &Regex,
    values: &BTreeMap<String, String>,
) -> AdminResult<FillReport> {
    let mut writer = ZipWriter::new(target);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    let mut report = FillReport::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;

        if is_document_part(&name) {
            let xml = String::from_utf8(buf)
                .map_err(|e| AdminError::Template(format!("{} is not UTF-8: {}", name, e)))?;
            buf = fill_xml(&xml, pattern, values, &mut report).into_bytes();
        }

        writer.start_file(name, options)?;
        writer.write_all(&buf)?;
    }

    writer.finish()?;
    Ok(report)
}
