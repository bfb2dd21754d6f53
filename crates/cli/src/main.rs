// ratebook CLI - upload rate sheets and track how they change between submissions

mod exit_codes;
mod render;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use exit_codes::{
    EXIT_CONFLICT, EXIT_DECODE, EXIT_ERROR, EXIT_NOT_FOUND, EXIT_STORAGE, EXIT_SUCCESS, EXIT_USAGE,
};
use ratebook_config::{ConfigError, Settings};
use ratebook_io::{upload_file, SqliteStore};
use ratebook_recon::ingest::{delete_dataset, get_dataset, list_datasets, update_record};
use ratebook_recon::report::discrepancies;
use ratebook_recon::{DatasetDocument, Field, ReconError, ReconOutcome, RecordPatch, StoreError};
use render::{format_change, format_number, format_timestamp, value_with_change, Table};

#[derive(Parser)]
#[command(name = "ratebook")]
#[command(about = "Reconcile repeated rate-sheet uploads and annotate what changed")]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides settings and $RATEBOOK_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Settings file (default: $RATEBOOK_CONFIG or the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG wins if set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an Excel or CSV sheet, creating or reconciling a dataset
    #[command(after_help = "\
Examples:
  ratebook upload acme.xlsx              # dataset \"acme\"
  ratebook upload acme.2026-03.xlsx      # still dataset \"acme\"
  ratebook upload rates.csv --name Acme")]
    Upload {
        /// Spreadsheet file (.xlsx, .xls, .xlsb, .ods, .csv, .tsv)
        file: PathBuf,

        /// Dataset name (default: file name up to its first '.')
        #[arg(long)]
        name: Option<String>,

        /// Print the reconciliation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List datasets, optionally filtered by a name pattern
    #[command(after_help = "\
Examples:
  ratebook list
  ratebook list acme
  ratebook list '^a.*ltd$' --json")]
    List {
        /// Regular expression matched anywhere in the name, case-insensitive
        search: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show every record of one dataset with its change annotations
    Show {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete a dataset
    Delete { name: String },

    /// Correct one record, located by serial number
    #[command(after_help = "\
Examples:
  ratebook update Acme --sno 3 --rate 52.5
  ratebook update Acme --sno 3 --rate-change ''   # clear the annotation")]
    Update {
        name: String,

        /// Serial number of the record to edit (first match wins)
        #[arg(long)]
        sno: i64,

        /// New serial number
        #[arg(long)]
        new_sno: Option<i64>,

        #[arg(long)]
        material: Option<String>,

        #[arg(long)]
        unit: Option<String>,

        #[arg(long)]
        quantity: Option<f64>,

        #[arg(long)]
        rate: Option<f64>,

        #[arg(long)]
        amount: Option<f64>,

        /// Percentage string; empty clears it
        #[arg(long)]
        quantity_change: Option<String>,

        #[arg(long)]
        rate_change: Option<String>,

        #[arg(long)]
        amount_change: Option<String>,
    },

    /// List records whose value moved on the last upload
    #[command(after_help = "\
Examples:
  ratebook discrepancies
  ratebook discrepancies acme --field amount --json")]
    Discrepancies {
        /// Dataset name pattern (as for `list`)
        search: Option<String>,

        #[arg(long, value_enum, default_value = "rate")]
        field: WatchedField,

        #[arg(long)]
        json: bool,
    },

    /// Settings file helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file path and effective database path
    Path,
    /// Write a commented default settings file
    Init,
}

#[derive(Clone, Copy, ValueEnum)]
enum WatchedField {
    Quantity,
    Rate,
    Amount,
}

impl From<WatchedField> for Field {
    fn from(f: WatchedField) -> Self {
        match f {
            WatchedField::Quantity => Field::Quantity,
            WatchedField::Rate => Field::Rate,
            WatchedField::Amount => Field::Amount,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::new(cli.db, cli.config)?;

    match cli.command {
        Commands::Upload { file, name, json } => cmd_upload(&ctx, file, name, json),
        Commands::List { search, json } => cmd_list(&ctx, search, json),
        Commands::Show { name, json } => cmd_show(&ctx, name, json),
        Commands::Delete { name } => cmd_delete(&ctx, name),
        Commands::Update {
            name,
            sno,
            new_sno,
            material,
            unit,
            quantity,
            rate,
            amount,
            quantity_change,
            rate_change,
            amount_change,
        } => {
            let patch = RecordPatch {
                serial_number: new_sno,
                material,
                unit,
                quantity,
                rate,
                amount,
                quantity_change,
                rate_change,
                amount_change,
            };
            cmd_update(&ctx, name, sno, patch)
        }
        Commands::Discrepancies { search, field, json } => cmd_discrepancies(&ctx, search, field.into(), json),
        Commands::Config(ConfigCommands::Path) => cmd_config_path(&ctx),
        Commands::Config(ConfigCommands::Init) => cmd_config_init(&ctx),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { code: EXIT_NOT_FOUND, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        Self::args(err.to_string()).with_hint("fix the file or run `ratebook config init` on a new path")
    }

    pub fn store(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self {
                code: EXIT_CONFLICT,
                message: err.to_string(),
                hint: Some("another write landed first; re-run the command".to_string()),
            },
            StoreError::Backend(_) | StoreError::Corrupt(_) => Self {
                code: EXIT_STORAGE,
                message: err.to_string(),
                hint: None,
            },
        }
    }

    /// Create error from a reconciliation failure with the matching exit code.
    pub fn recon(err: ReconError) -> Self {
        match err {
            ReconError::Decode(_) => Self {
                code: EXIT_DECODE,
                message: err.to_string(),
                hint: Some("upload an .xlsx/.xls/.ods workbook or a delimited text file".to_string()),
            },
            ReconError::Storage(e) => Self::store(e),
            ReconError::Policy(_) => Self::args(err.to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Context
// ============================================================================

/// Settings resolved once per invocation. The store is opened lazily so
/// `config` subcommands work without a database.
struct Context {
    settings: Settings,
    config_path: PathBuf,
    db_path: PathBuf,
}

impl Context {
    fn new(db: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self, CliError> {
        let (settings, config_path) = match config {
            // An explicit --config that exists must parse
            Some(path) if path.exists() => (Settings::load_from(&path).map_err(CliError::config)?, path),
            Some(path) => {
                log::warn!("settings file {} does not exist, using defaults", path.display());
                (Settings::default(), path)
            }
            None => (Settings::load(), Settings::config_path()),
        };
        let db_path = db.unwrap_or_else(|| settings.database_path());
        log::debug!("settings {} / database {}", config_path.display(), db_path.display());
        Ok(Self { settings, config_path, db_path })
    }

    fn open_store(&self) -> Result<SqliteStore, CliError> {
        SqliteStore::open(&self.db_path)
            .map_err(|e| CliError::store(e).with_hint(format!("database: {}", self.db_path.display())))
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let s = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", s);
    Ok(())
}

fn print_text(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(text.as_bytes()).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// upload
// ============================================================================

fn cmd_upload(ctx: &Context, file: PathBuf, name: Option<String>, json: bool) -> Result<(), CliError> {
    if !file.is_file() {
        return Err(CliError::args(format!("no such file: {}", file.display())));
    }
    if let Some(n) = &name {
        if n.trim().is_empty() {
            return Err(CliError::args("--name must not be empty"));
        }
    }

    let mut store = ctx.open_store()?;
    let result = upload_file(&mut store, &file, name.as_deref(), &ctx.settings.recon).map_err(CliError::recon)?;

    if json {
        return print_json(&result);
    }

    let doc = &result.document;
    let s = &result.summary;
    let mut out = format!(
        "{} dataset '{}' (revision {}, {} record(s))\n",
        result.outcome,
        doc.name,
        doc.revision,
        doc.records.len()
    );
    if result.outcome == ReconOutcome::Merged {
        out.push_str(&format!(
            "  matched {}, changed {}, carried {}, dropped {}, appended {}\n",
            s.matched, s.changed, s.carried, s.dropped, s.appended
        ));
    }
    if s.duplicate_incoming_keys > 0 || s.duplicate_prior_keys > 0 {
        out.push_str(&format!(
            "  warning: {} duplicate Material/Unit key(s) in the upload, {} in the stored dataset (the first matching upload row is used)\n",
            s.duplicate_incoming_keys, s.duplicate_prior_keys
        ));
    }
    print_text(&out)
}

// ============================================================================
// list
// ============================================================================

fn cmd_list(ctx: &Context, search: Option<String>, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let docs = list_datasets(&store, search.as_deref().unwrap_or("")).map_err(CliError::recon)?;

    if json {
        return print_json(&docs);
    }
    if docs.is_empty() {
        eprintln!("no datasets");
        return Ok(());
    }

    let mut table = Table::new(&["Name", "Records", "Revision", "Updated"]).right_align(&[1, 2]);
    for doc in &docs {
        table.push(vec![
            doc.name.clone(),
            doc.records.len().to_string(),
            doc.revision.to_string(),
            format_timestamp(&doc.timestamp),
        ]);
    }
    print_text(&table.render())
}

// ============================================================================
// show
// ============================================================================

fn cmd_show(ctx: &Context, name: String, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let doc = get_dataset(&store, &name)
        .map_err(CliError::recon)?
        .ok_or_else(|| not_found_dataset(&name))?;

    if json {
        return print_json(&doc);
    }
    print_text(&render_document(&doc))
}

fn render_document(doc: &DatasetDocument) -> String {
    let mut out = format!(
        "{}  (revision {}, updated {}, {} record(s))\n\n",
        doc.name,
        doc.revision,
        format_timestamp(&doc.timestamp),
        doc.records.len()
    );
    let mut table = Table::new(&["S No", "Material", "Unit", "Quantity", "Rate", "Amount"]).right_align(&[0, 3, 4, 5]);
    for rec in &doc.records {
        table.push(vec![
            rec.serial_number.map(|n| n.to_string()).unwrap_or_default(),
            rec.material.clone().unwrap_or_default(),
            rec.unit.clone(),
            value_with_change(rec.quantity, rec.change.quantity.as_deref()),
            value_with_change(rec.rate, rec.change.rate.as_deref()),
            value_with_change(rec.amount, rec.change.amount.as_deref()),
        ]);
    }
    out.push_str(&table.render());
    out
}

fn not_found_dataset(name: &str) -> CliError {
    CliError::not_found(format!("no dataset named '{}'", name)).with_hint("run `ratebook list` to see dataset names")
}

// ============================================================================
// delete
// ============================================================================

fn cmd_delete(ctx: &Context, name: String) -> Result<(), CliError> {
    let mut store = ctx.open_store()?;
    if !delete_dataset(&mut store, &name).map_err(CliError::recon)? {
        return Err(not_found_dataset(&name));
    }
    println!("deleted '{}'", name);
    Ok(())
}

// ============================================================================
// update
// ============================================================================

fn cmd_update(ctx: &Context, name: String, sno: i64, patch: RecordPatch) -> Result<(), CliError> {
    if patch.is_empty() {
        return Err(CliError::args("nothing to update")
            .with_hint("pass at least one of --material, --unit, --quantity, --rate, --amount or a --*-change flag"));
    }
    for (flag, value) in [("--quantity", patch.quantity), ("--rate", patch.rate), ("--amount", patch.amount)] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(CliError::args(format!("{flag} must be a finite number")));
        }
    }

    let mut store = ctx.open_store()?;
    if !update_record(&mut store, &name, sno, &patch).map_err(CliError::recon)? {
        return Err(CliError::not_found(format!("no record with S No {} in dataset '{}'", sno, name)));
    }
    println!("updated record {} in '{}'", sno, name);
    Ok(())
}

// ============================================================================
// discrepancies
// ============================================================================

fn cmd_discrepancies(ctx: &Context, search: Option<String>, field: Field, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let docs = list_datasets(&store, search.as_deref().unwrap_or("")).map_err(CliError::recon)?;
    let found = discrepancies(&docs, field);

    if json {
        return print_json(&found);
    }
    if found.is_empty() {
        eprintln!("no {} changes", field.name().to_lowercase());
        return Ok(());
    }

    let mut table = Table::new(&["Dataset", "S No", "Material", "Unit", field.name(), "Change"]).right_align(&[1, 4, 5]);
    for d in &found {
        table.push(vec![
            d.dataset.clone(),
            d.serial_number.map(|n| n.to_string()).unwrap_or_default(),
            d.material.clone().unwrap_or_default(),
            d.unit.clone(),
            format_number(d.current),
            format_change(Some(&d.change)).unwrap_or_default(),
        ]);
    }
    print_text(&table.render())
}

// ============================================================================
// config
// ============================================================================

fn cmd_config_path(ctx: &Context) -> Result<(), CliError> {
    println!("settings: {}", ctx.config_path.display());
    println!("database: {}", ctx.db_path.display());
    Ok(())
}

fn cmd_config_init(ctx: &Context) -> Result<(), CliError> {
    Settings::write_default(&ctx.config_path).map_err(|e| CliError::io(e.to_string()))?;
    println!("wrote {}", ctx.config_path.display());
    Ok(())
}
