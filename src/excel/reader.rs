//! Workbook reader - .xlsx → [`Sheet`]s

use crate::error::{AdminError, AdminResult};
use crate::excel::sheet::{CellValue, Sheet};
use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use std::path::Path;
use tracing::debug;

/// Read every sheet of a workbook, in workbook order
pub fn read_workbook(path: &Path) -> AdminResult<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e: calamine::XlsxError| {
        AdminError::Excel(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in sheet_names {
        let range = workbook.worksheet_range(&name)?;
        sheets.push(range_to_sheet(&name, &range));
    }

    debug!(path = %path.display(), sheets = sheets.len(), "Workbook read");
    Ok(sheets)
}

/// Read one named sheet
pub fn read_sheet(path: &Path, sheet_name: &str) -> AdminResult<Sheet> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e: calamine::XlsxError| {
        AdminError::Excel(format!("Failed to open {}: {}", path.display(), e))
    })?;

    if !workbook.sheet_names().iter().any(|n| n == sheet_name) {
        return Err(AdminError::NotFound(format!(
            "sheet '{}' in {}",
            sheet_name,
            path.display()
        )));
    }

    let range = workbook.worksheet_range(sheet_name)?;
    Ok(range_to_sheet(sheet_name, &range))
}

/// First row is the header row, the rest are data rows
fn range_to_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name, Vec::new());
    if range.is_empty() {
        return sheet;
    }

    // Used ranges that do not start in column A are shifted back into place
    let left_pad = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let mut rows = range.rows();
    if let Some(header_row) = rows.next() {
        let mut headers: Vec<String> = (0..left_pad).map(|i| format!("col_{}", i)).collect();
        for (idx, cell) in header_row.iter().enumerate() {
            let text = cell.to_string().trim().to_string();
            if text.is_empty() {
                headers.push(format!("col_{}", left_pad + idx));
            } else {
                headers.push(text);
            }
        }
        sheet.headers = headers;
    }

    for row in rows {
        let mut values: Vec<CellValue> = vec![CellValue::Empty; left_pad];
        values.extend(row.iter().map(convert_cell));
        sheet.push_row(values);
    }

    while sheet
        .rows
        .last()
        .map(|r| r.iter().all(CellValue::is_empty))
        .unwrap_or(false)
    {
        sheet.rows.pop();
    }

    sheet
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(d) => CellValue::Date(d),
            None => CellValue::Text(cell.to_string()),
        },
        _ => CellValue::Text(cell.to_string()),
    }
}
