//! Workbook writer - [`Sheet`]s → .xlsx

use crate::error::{AdminError, AdminResult};
use crate::excel::sheet::{CellValue, Sheet};
use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use std::path::Path;

pub const DATE_FORMAT: &str = "dd/mm/yyyy";

/// Write all sheets into a fresh workbook at `path`, replacing any existing file
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> AdminResult<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(|e| {
            AdminError::Excel(format!("Invalid sheet name '{}': {}", sheet.name, e))
        })?;
        write_sheet(worksheet, sheet, &header_format, &date_format)?;
    }

    workbook
        .save(path)
        .map_err(|e| AdminError::Excel(format!("Failed to save {}: {}", path.display(), e)))?;

    Ok(())
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    header_format: &Format,
    date_format: &Format,
) -> AdminResult<()> {
    for (col_idx, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, header, header_format)?;
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32; // row 0 is the header
        for (col_idx, value) in row.iter().enumerate() {
            write_cell(worksheet, excel_row, col_idx as u16, value, date_format)?;
        }
    }

    if !sheet.headers.is_empty() {
        worksheet.autofit();
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    date_format: &Format,
) -> AdminResult<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Date(d) => {
            let datetime =
                ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
            worksheet.write_datetime_with_format(row, col, &datetime, date_format)?;
        }
    }
    Ok(())
}
