use clap::{Parser, Subcommand};
use selarl_admin::cli::{self, NewContractArgs};
use selarl_admin::contracts::ContractKind;
use selarl_admin::settings;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "selarl")]
#[command(about = "SELARL administration: registries, contracts, invoices and payslips.")]
#[command(long_about = "SELARL admin - Excel-backed practice administration

Personnel registries live in Excel workbooks. Every change rewrites the
workbook with the other sheets intact, keeping a .bak copy until the new
file has been read back.

COMMANDS:
  check      - Verify configured paths and workbooks
  paths      - Show or set configured files and folders
  docusign   - Show or set DocuSign login settings
  registry   - List, add, update, delete registry rows
  contract   - Create and list MAR / IADE replacement contracts
  invoices   - Analyze the expense invoices folder
  payslips   - List archived payslips, file new scans

EXAMPLES:
  selarl paths set excel_mar ~/Admin/MAR.xlsx
  selarl registry mar-remplacants list --search durand
  selarl registry salaries add --field NOM=Bernard --field PRENOM=Lucie
  selarl contract mar new --remplacant-nom Durand --remplacant-prenom Paul \\
      --remplace-nom Martin --remplace-prenom Claire \\
      --debut 01/03/2025 --fin 07/03/2025
  selarl invoices analyze --year 2025 --export factures_2025.xlsx

Logging: set RUST_LOG (e.g. RUST_LOG=selarl_admin=debug).")]
#[command(version)]
struct Cli {
    /// Configuration directory (settings.json, config.json)
    #[arg(long, global = true, env = "SELARL_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify configured paths and workbooks
    Check,

    /// Show or set configured files and folders
    Paths {
        #[command(subcommand)]
        action: PathsAction,
    },

    /// Show or set DocuSign login settings
    Docusign {
        #[command(subcommand)]
        action: DocusignAction,
    },

    #[command(long_about = "List and edit a personnel registry.

REGISTRIES:
  mar-titulaires    MAR titulaires      (excel_mar)
  mar-remplacants   MAR remplaçants     (excel_mar)
  iade-remplacants  IADE remplaçants    (excel_iade)
  salaries          Salariés            (excel_salaries)

Fields are given as COLUMN=VALUE. Dates accept dd/mm/yyyy or yyyy-mm-dd.
Rows are numbered from 1 as shown by 'list'.

EXAMPLES:
  selarl registry iade-remplacants list
  selarl registry mar-titulaires add --field NOM=Martin --field PRENOM=Claire
  selarl registry salaries update 3 --field POSTE=Comptable
  selarl registry salaries delete 3")]
    /// List and edit a personnel registry
    Registry {
        /// Registry: mar-titulaires, mar-remplacants, iade-remplacants, salaries
        kind: String,

        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Create and list replacement contracts
    Contract {
        #[command(subcommand)]
        kind: ContractCommand,
    },

    /// Analyze the expense invoices folder
    Invoices {
        #[command(subcommand)]
        action: InvoicesAction,
    },

    /// List archived payslips, file new scans
    Payslips {
        #[command(subcommand)]
        action: PayslipsAction,
    },
}

#[derive(Subcommand)]
enum PathsAction {
    /// Show every configured path
    Show,

    /// Set a configured path
    Set {
        /// Key, e.g. excel_mar, dossier_factures
        key: String,

        /// File or folder
        value: PathBuf,
    },
}

#[derive(Subcommand)]
enum DocusignAction {
    /// Show the DocuSign settings (password masked)
    Show,

    /// Update DocuSign settings
    Set {
        /// Login page URL
        #[arg(long)]
        login_page: Option<String>,

        /// Account email
        #[arg(long)]
        email: Option<String>,

        /// Account password (stored in config.json)
        #[arg(long, conflicts_with = "clear_password")]
        password: Option<String>,

        /// Remove the stored password
        #[arg(long)]
        clear_password: bool,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List rows
    List {
        /// Case-insensitive search on name or first name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Add a row
    Add {
        /// COLUMN=VALUE (repeatable)
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
    },

    /// Update a row
    Update {
        /// Row number as shown by 'list'
        row: usize,

        /// COLUMN=VALUE (repeatable); an empty value clears the cell
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    /// Delete a row
    Delete {
        /// Row number as shown by 'list'
        row: usize,
    },
}

#[derive(Subcommand)]
enum ContractCommand {
    /// MAR replacement contracts
    Mar {
        #[command(subcommand)]
        action: ContractAction,
    },

    /// IADE replacement contracts
    Iade {
        #[command(subcommand)]
        action: ContractAction,
    },
}

#[derive(Subcommand)]
enum ContractAction {
    #[command(long_about = "Create a replacement contract.

The substitute must exist in the remplaçants registry of the same workbook.
The contract document is filled from the configured template ({{PLACEHOLDER}}
fields) and recorded in the 'Contrats' sheet.

EXAMPLES:
  selarl contract mar new --remplacant-nom Durand --remplacant-prenom Paul \\
      --remplace-nom Martin --remplace-prenom Claire \\
      --debut 01/03/2025 --fin 07/03/2025 --retrocession 70
  selarl contract iade new --remplacant-nom Petit --remplacant-prenom Anne \\
      --debut 2025-04-01 --fin 2025-04-02 --dry-run")]
    /// Create a replacement contract
    New {
        /// Substitute last name
        #[arg(long)]
        remplacant_nom: String,

        /// Substitute first name
        #[arg(long)]
        remplacant_prenom: String,

        /// Replaced practitioner last name
        #[arg(long)]
        remplace_nom: Option<String>,

        /// Replaced practitioner first name
        #[arg(long)]
        remplace_prenom: Option<String>,

        /// First day (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long)]
        debut: String,

        /// Last day (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long)]
        fin: String,

        /// Retrocession percentage
        #[arg(long)]
        retrocession: Option<f64>,

        /// Reason for the replacement
        #[arg(long)]
        motif: Option<String>,

        /// Preview the contract without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// List recorded contracts
    List,
}

#[derive(Subcommand)]
enum InvoicesAction {
    #[command(long_about = "Analyze expense invoices.

Invoice files are named YYYY-MM-DD_<supplier>_<amount>.<pdf|jpg|png>.
The first sub-folder is the expense category. Totals are shown per
category, month and supplier.

EXAMPLES:
  selarl invoices analyze
  selarl invoices analyze --year 2025 --export factures_2025.xlsx")]
    /// Analyze the invoices folder
    Analyze {
        /// Folder to analyze (default: configured dossier_factures)
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Only invoices dated this year
        #[arg(short, long)]
        year: Option<i32>,

        /// Export the report to an Excel file (.xlsx)
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// List every invoice
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Subcommand)]
enum PayslipsAction {
    /// List archived payslips
    List {
        /// Filter on "NOM Prénom"
        #[arg(short, long)]
        employee: Option<String>,

        /// Filter on year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// File a scanned payslip PDF into the archive
    Scan {
        /// Scanned PDF
        file: PathBuf,

        /// Employee last name
        #[arg(long)]
        nom: String,

        /// Employee first name
        #[arg(long)]
        prenom: String,

        /// Pay period (YYYY-MM)
        #[arg(long)]
        period: String,

        /// Replace an existing payslip for the same period
        #[arg(long)]
        overwrite: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "selarl_admin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = settings::config_dir(cli.config_dir.as_deref());
    info!(config_dir = %config_dir.display(), "Application started");

    if !matches!(cli.command, Commands::Paths { .. } | Commands::Check) {
        cli::warn_missing_paths(&config_dir);
    }

    match cli.command {
        Commands::Check => cli::check(&config_dir)?,

        Commands::Paths { action } => match action {
            PathsAction::Show => cli::paths_show(&config_dir)?,
            PathsAction::Set { key, value } => cli::paths_set(&config_dir, key, value)?,
        },

        Commands::Docusign { action } => match action {
            DocusignAction::Show => cli::docusign_show(&config_dir)?,
            DocusignAction::Set {
                login_page,
                email,
                password,
                clear_password,
            } => cli::docusign_set(&config_dir, login_page, email, password, clear_password)?,
        },

        Commands::Registry { kind, action } => match action {
            RegistryAction::List { search } => cli::registry_list(&config_dir, kind, search)?,
            RegistryAction::Add { fields } => cli::registry_add(&config_dir, kind, fields)?,
            RegistryAction::Update { row, fields } => {
                cli::registry_update(&config_dir, kind, row, fields)?
            }
            RegistryAction::Delete { row } => cli::registry_delete(&config_dir, kind, row)?,
        },

        Commands::Contract { kind } => {
            let (kind, action) = match kind {
                ContractCommand::Mar { action } => (ContractKind::Mar, action),
                ContractCommand::Iade { action } => (ContractKind::Iade, action),
            };
            match action {
                ContractAction::New {
                    remplacant_nom,
                    remplacant_prenom,
                    remplace_nom,
                    remplace_prenom,
                    debut,
                    fin,
                    retrocession,
                    motif,
                    dry_run,
                } => cli::contract_new(
                    &config_dir,
                    kind,
                    NewContractArgs {
                        remplacant_nom,
                        remplacant_prenom,
                        remplace_nom,
                        remplace_prenom,
                        debut,
                        fin,
                        retrocession,
                        motif,
                        dry_run,
                    },
                )?,
                ContractAction::List => cli::contract_list(&config_dir, kind)?,
            }
        }

        Commands::Invoices { action } => match action {
            InvoicesAction::Analyze {
                folder,
                year,
                export,
                verbose,
            } => cli::invoices_analyze(&config_dir, folder, year, export, verbose)?,
        },

        Commands::Payslips { action } => match action {
            PayslipsAction::List { employee, year } => {
                cli::payslips_list(&config_dir, employee, year)?
            }
            PayslipsAction::Scan {
                file,
                nom,
                prenom,
                period,
                overwrite,
            } => cli::payslips_scan(&config_dir, file, nom, prenom, period, overwrite)?,
        },
    }

    Ok(())
}
