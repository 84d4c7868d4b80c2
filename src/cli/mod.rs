//! CLI command handlers

pub mod commands;

pub use commands::{
    check, contract_list, contract_new, docusign_set, docusign_show, invoices_analyze,
    paths_set, paths_show, payslips_list, payslips_scan, registry_add, registry_delete,
    registry_list, registry_update, warn_missing_paths, NewContractArgs,
};
