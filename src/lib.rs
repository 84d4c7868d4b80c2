//! SELARL admin - personnel registries, contracts, invoices and payslips
//!
//! Every registry lives in a named sheet of an Excel workbook. Screens load the
//! sheet into memory, change rows, and persist the whole workbook back with
//! [`excel::save_excel_with_updated_sheet`], which keeps the other sheets and
//! restores a `.bak` copy if the rewrite fails.
//!
//! # Example
//!
//! ```no_run
//! use selarl_admin::registry::{Registry, RegistryKind};
//!
//! let mut registry = Registry::open(RegistryKind::MarRemplacants, "MAR.xlsx")?;
//! registry.add(&[
//!     ("NOM".to_string(), "Durand".to_string()),
//!     ("PRENOM".to_string(), "Paul".to_string()),
//! ])?;
//! println!("{} remplaçants", registry.len());
//! # Ok::<(), selarl_admin::error::AdminError>(())
//! ```

pub mod cli;
pub mod contracts;
pub mod docusign;
pub mod error;
pub mod excel;
pub mod invoices;
pub mod payslips;
pub mod registry;
pub mod settings;

// Re-export commonly used types
pub use error::{AdminError, AdminResult};
pub use excel::{CellValue, Sheet};
pub use registry::{Person, Registry, RegistryKind};
pub use settings::{PathKey, Settings};
