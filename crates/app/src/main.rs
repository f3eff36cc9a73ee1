use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use feetrack::{SearchField, StatementSource, Tracker, TrackerConfig};
use feetrack_core::{Category, Transaction, TransactionId, TransactionPatch};
use feetrack_import::{is_workbook_path, MappingSource};

/// Match bank-statement credits to payers and fee categories.
#[derive(Parser, Debug)]
#[command(name = "feetrack", version)]
struct Cli {
    /// Where categories, name mappings and saved edits live.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the credits of a statement
    Show {
        #[command(flatten)]
        statement: StatementArgs,
        /// Only show transactions matching this text
        #[arg(long)]
        search: Option<String>,
        /// all, name, amount, category or description
        #[arg(long, default_value = "all")]
        field: SearchField,
    },

    /// Print (or write) the per-category fee summary
    Summary {
        #[command(flatten)]
        statement: StatementArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List payer short names that have no mapping yet
    Unmapped {
        #[command(flatten)]
        statement: StatementArgs,
    },

    /// Change one transaction and save the statement's edits
    Edit {
        #[command(flatten)]
        statement: StatementArgs,
        id: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        short_name: Option<String>,
    },

    /// Remove one transaction and save the statement's edits
    Delete {
        #[command(flatten)]
        statement: StatementArgs,
        id: String,
    },

    /// Copy one transaction and save the statement's edits
    Duplicate {
        #[command(flatten)]
        statement: StatementArgs,
        id: String,
    },

    /// Forget the saved edits of a statement
    Discard {
        file: PathBuf,
    },

    /// Manage fee categories
    #[command(subcommand)]
    Categories(CategoryCommand),

    /// Manage short-name to full-name mappings
    #[command(subcommand)]
    Names(NameCommand),
}

#[derive(Debug, Args)]
struct StatementArgs {
    /// Statement exported from the bank (CSV or workbook)
    file: PathBuf,
    /// Ignore saved edits for this statement
    #[arg(long)]
    fresh: bool,
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
    List,
    /// Add a category; without --fee it takes any amount
    Add {
        name: String,
        #[arg(long)]
        fee: Option<Decimal>,
    },
    Edit {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long, conflicts_with = "any_amount")]
        fee: Option<Decimal>,
        #[arg(long)]
        any_amount: bool,
    },
    Remove {
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum NameCommand {
    List,
    Add { short_name: String, full_name: String },
    Edit { short_name: String, full_name: String },
    Rename { short_name: String, new_short_name: String },
    Remove { short_name: String },
    /// Merge a two-column CSV or workbook (short name, full name)
    Import { file: PathBuf },
    /// Write all mappings as a two-column workbook (.xlsx) or CSV
    Export { file: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => directories::ProjectDirs::from("com", "feetrack", "FeeTrack")
            .context("Failed to get app directory")?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let config = TrackerConfig::load(&data_dir)?;
    let mut tracker = Tracker::open(&data_dir, &config)?;
    run(&mut tracker, cli.command)
}

fn run(tracker: &mut Tracker, command: Command) -> Result<()> {
    match command {
        Command::Show {
            statement,
            search,
            field,
        } => {
            open(tracker, &statement)?;
            let shown: Vec<&Transaction> = match search {
                Some(query) => tracker.session().search(&query, field),
                None => tracker.transactions().iter().collect(),
            };
            print_transactions(&shown);
            println!("Total: {}", tracker.session().total());
        }
        Command::Summary { statement, output } => {
            open(tracker, &statement)?;
            let text = tracker.summary();
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Summary written to {}", path.display());
                }
                None => print!("{text}"),
            }
        }
        Command::Unmapped { statement } => {
            open(tracker, &statement)?;
            for short_name in tracker.unmapped_short_names() {
                println!("{short_name}");
            }
        }
        Command::Edit {
            statement,
            id,
            date,
            description,
            amount,
            category,
            short_name,
        } => {
            let patch = TransactionPatch {
                date,
                description,
                amount,
                category,
                raw_short_name: short_name,
            };
            if patch.is_empty() {
                bail!("Nothing to change");
            }
            open(tracker, &statement)?;
            let tx = tracker.edit_transaction(&TransactionId(id), patch)?.clone();
            print_transactions(&[&tx]);
            save(tracker)?;
        }
        Command::Delete { statement, id } => {
            open(tracker, &statement)?;
            let removed = tracker.delete_transaction(&TransactionId(id))?;
            println!("Deleted {} ({})", removed.id, removed.resolved_name);
            save(tracker)?;
        }
        Command::Duplicate { statement, id } => {
            open(tracker, &statement)?;
            let copy = tracker.duplicate_transaction(&TransactionId(id))?.clone();
            print_transactions(&[&copy]);
            save(tracker)?;
        }
        Command::Discard { file } => {
            let source = read_statement(&file)?;
            tracker.open_statement(&source)?;
            if tracker.discard_saved_edits()? {
                println!("Discarded saved edits for {}", source.file_name);
            } else {
                println!("No saved edits for {}", source.file_name);
            }
        }
        Command::Categories(command) => run_categories(tracker, command)?,
        Command::Names(command) => run_names(tracker, command)?,
    }
    Ok(())
}

fn run_categories(tracker: &mut Tracker, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::List => {
            for category in tracker.categories().iter() {
                println!("{category}");
            }
        }
        CategoryCommand::Add { name, fee } => {
            tracker.add_category(Category::new(&name, fee))?;
            println!("Added category {name}");
        }
        CategoryCommand::Edit {
            name,
            rename,
            fee,
            any_amount,
        } => {
            let current_fee = tracker.categories().get(&name).and_then(|c| c.fee);
            let fee = if any_amount { None } else { fee.or(current_fee) };
            let new_name = rename.unwrap_or_else(|| name.clone());
            tracker.edit_category(&name, Category::new(&new_name, fee))?;
            println!("Updated category {new_name}");
        }
        CategoryCommand::Remove { name } => {
            tracker.remove_category(&name)?;
            println!("Removed category {name}");
        }
    }
    Ok(())
}

fn run_names(tracker: &mut Tracker, command: NameCommand) -> Result<()> {
    match command {
        NameCommand::List => {
            for mapping in tracker.names().iter() {
                println!("{} -> {}", mapping.short_name, mapping.full_name);
            }
        }
        NameCommand::Add {
            short_name,
            full_name,
        } => tracker.add_mapping(&short_name, &full_name)?,
        NameCommand::Edit {
            short_name,
            full_name,
        } => tracker.edit_mapping(&short_name, &full_name)?,
        NameCommand::Rename {
            short_name,
            new_short_name,
        } => tracker.rename_mapping(&short_name, &new_short_name)?,
        NameCommand::Remove { short_name } => {
            tracker.remove_mapping(&short_name)?;
        }
        NameCommand::Import { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let source = if is_workbook_path(&file) {
                MappingSource::Workbook(bytes)
            } else {
                MappingSource::Csv(bytes)
            };
            let report = tracker.import_mappings(&source)?;
            println!(
                "Added {}, updated {}, unchanged {}, skipped {}",
                report.added, report.updated, report.unchanged, report.skipped
            );
        }
        NameCommand::Export { file } => {
            if is_workbook_path(&file) {
                let bytes = tracker.export_mappings_workbook()?;
                std::fs::write(&file, bytes)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
            } else {
                let out = File::create(&file)
                    .with_context(|| format!("Failed to create {}", file.display()))?;
                tracker.export_mappings(out)?;
            }
            println!("Exported {} mappings to {}", tracker.names().len(), file.display());
        }
    }
    Ok(())
}

fn read_statement(path: &Path) -> Result<StatementSource> {
    Ok(StatementSource::read(path)?)
}

/// Ingest a statement and, unless `--fresh`, bring back its saved edits.
fn open(tracker: &mut Tracker, args: &StatementArgs) -> Result<()> {
    let source = read_statement(&args.file)?;
    let report = tracker.open_statement(&source)?;
    if let (Some(saved_at), false) = (report.saved_edits, args.fresh) {
        let restored = tracker.restore_saved_edits()?;
        eprintln!(
            "Restored edits saved {} ({} kept, {} new rows)",
            saved_at.format("%Y-%m-%d %H:%M"),
            restored.restored,
            restored.added
        );
        for orphan in &restored.orphaned {
            eprintln!(
                "  no longer in statement: {} {} {}",
                orphan.date, orphan.resolved_name, orphan.amount
            );
        }
    }
    Ok(())
}

fn save(tracker: &mut Tracker) -> Result<()> {
    let path = tracker.save_edits()?;
    eprintln!("Saved edits to {}", path.display());
    Ok(())
}

fn print_transactions(transactions: &[&Transaction]) {
    for tx in transactions {
        println!(
            "{:<16}  {:<10}  {:<28}  {:>12}  {}",
            tx.id.as_str(),
            tx.date,
            tx.resolved_name,
            tx.money().to_string(),
            tx.category
        );
    }
}
