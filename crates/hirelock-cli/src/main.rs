use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hirelock_core::audit::AuditLog;
use hirelock_core::{CandidateRecord, CandidateStore, StoreConfig, DEFAULT_RETENTION_DAYS};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hirelock-cli")]
#[command(about = "CLI for the Hirelock candidate store", long_about = None)]
struct Cli {
    /// Encrypted backing store file
    #[arg(long)]
    store: PathBuf,

    /// File holding the raw symmetric key bytes
    #[arg(long)]
    key_file: PathBuf,

    /// Retention window in days for `purge`
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    retention_days: u32,

    /// Append privacy-relevant operations to this audit log
    #[arg(long)]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a candidate record (requires explicit consent)
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// CV or reference text
        #[arg(long)]
        document: Option<String>,
        /// Affirmative consent to store the data
        #[arg(long)]
        consent: bool,
    },

    /// Print one record
    Get { id: String },

    /// Print all records
    List,

    /// Null the identifying fields of a record, irreversibly
    Anonymize { id: String },

    /// Remove a record entirely
    Delete { id: String },

    /// Remove records older than the retention window
    Purge,

    /// Write the encrypted payload for one record
    Export {
        id: String,
        /// Destination file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Insert a record from an encrypted payload
    Import { file: PathBuf },

    /// Show recent audit entries
    Audit {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Check the audit chain end to end
    AuditVerify,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let key = fs::read(&cli.key_file)
        .with_context(|| format!("read key file {}", cli.key_file.display()))?;
    let mut config = StoreConfig::new(&cli.store, &key);
    config.retention_days = cli.retention_days;
    let mut store = CandidateStore::open(config)?;

    let mut audit = match &cli.audit_log {
        Some(path) => Some(AuditLog::new(path)?),
        None => None,
    };

    match cli.command {
        Commands::Add {
            id,
            name,
            email,
            document,
            consent,
        } => {
            let mut record = CandidateRecord::new(id.clone(), consent);
            record.name = name;
            record.email = email;
            record.document = document;
            store.add(record)?;
            record_audit(&mut audit, "RECORD_ADDED", serde_json::json!({ "id": id }))?;
            let stored = store
                .get(&id)
                .ok_or_else(|| anyhow!("record missing after add"))?;
            println!("{}", serde_json::to_string_pretty(stored)?);
        }

        Commands::Get { id } => match store.get(&id) {
            Some(record) => println!("{}", serde_json::to_string_pretty(record)?),
            None => return Err(anyhow!("no record with id {id}")),
        },

        Commands::List => {
            println!("{}", serde_json::to_string_pretty(&store.list())?);
        }

        Commands::Anonymize { id } => {
            if store.anonymize(&id)? {
                record_audit(&mut audit, "RECORD_ANONYMIZED", serde_json::json!({ "id": id }))?;
                println!("anonymized {id}");
            } else {
                println!("no record with id {id}");
            }
        }

        Commands::Delete { id } => {
            if store.delete(&id)? {
                record_audit(&mut audit, "RECORD_DELETED", serde_json::json!({ "id": id }))?;
                println!("deleted {id}");
            } else {
                println!("no record with id {id}");
            }
        }

        Commands::Purge => {
            let removed = store.purge_expired()?;
            record_audit(
                &mut audit,
                "RETENTION_PURGE",
                serde_json::json!({ "removed": removed }),
            )?;
            println!("purged {removed} records");
        }

        Commands::Export { id, out } => {
            let payload = store
                .export_encrypted(&id)?
                .ok_or_else(|| anyhow!("no record with id {id}"))?;
            record_audit(&mut audit, "RECORD_EXPORTED", serde_json::json!({ "id": id }))?;
            match out {
                Some(path) => {
                    fs::write(&path, &payload)
                        .with_context(|| format!("write payload to {}", path.display()))?;
                    println!("exported {} to {}", id, path.display());
                }
                None => println!("{}", String::from_utf8_lossy(&payload)),
            }
        }

        Commands::Import { file } => {
            let payload =
                fs::read(&file).with_context(|| format!("read payload {}", file.display()))?;
            let record = store.import_encrypted(&payload)?;
            record_audit(
                &mut audit,
                "RECORD_IMPORTED",
                serde_json::json!({ "id": record.id }),
            )?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Audit { limit } => {
            let log = audit
                .as_ref()
                .ok_or_else(|| anyhow!("--audit-log is required for this command"))?;
            let entries = log.read_recent(Some(limit))?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }

        Commands::AuditVerify => {
            let log = audit
                .as_ref()
                .ok_or_else(|| anyhow!("--audit-log is required for this command"))?;
            let verified = log.verify()?;
            println!("audit chain ok ({verified} entries)");
        }
    }

    Ok(())
}

fn record_audit(
    audit: &mut Option<AuditLog>,
    action: &str,
    data: serde_json::Value,
) -> Result<()> {
    if let Some(log) = audit.as_mut() {
        log.append(action, data)?;
    }
    Ok(())
}
