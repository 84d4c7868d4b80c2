//! Excel workbook access
//!
//! - Read: .xlsx → [`Sheet`] (header row + data rows)
//! - Write: [`Sheet`]s → .xlsx
//! - Safe save: replace one sheet, keep the others, back up and restore on failure

mod reader;
mod safe_save;
mod sheet;
mod writer;

pub use reader::{read_sheet, read_workbook};
pub use safe_save::{backup_path, ensure_not_locked, save_excel_with_updated_sheet};
pub use sheet::{CellValue, Sheet};
pub use writer::{write_workbook, DATE_FORMAT};
