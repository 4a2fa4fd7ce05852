//! Command-line client for the loresmith reconciliation pipeline.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::info;
use loresmith_config::{LoadOptions, LoresmithConfig, default_preset_path, load_config};
use loresmith_core::{AppliedChange, LorePipeline, ReconcileFailure, ReconcileMode, SubmitParams};
use loresmith_store::{
    BookSettings, FilePresetStore, HttpCompletionClient, HttpLorebookStore, LorebookStore, Preset,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the loresmith client.
#[derive(Parser)]
#[command(name = "loresmith", version)]
struct Cli {
    /// Optional path to a loresmith.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the store's books, marking the enabled ones
    Books,
    /// Enable books by file identifier
    Enable {
        /// Book file identifiers to enable
        books: Vec<String>,
    },
    /// Disable books by file identifier
    Disable {
        /// Book file identifiers to disable
        books: Vec<String>,
        /// Disable every currently enabled book
        #[arg(long)]
        all: bool,
    },
    /// Print a book's entries
    Entries {
        /// Book file identifier
        book: String,
        /// Print the raw JSON payload instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// AI-patch a single entry of a book
    PatchEntry {
        /// Book file identifier
        book: String,
        /// Target entry uid
        uid: u32,
        /// Instruction for the model
        instruction: String,
    },
    /// AI-rewrite a whole book
    PatchBook {
        /// Book file identifier
        book: String,
        /// Instruction for the model
        instruction: String,
        /// Confirm the destructive whole-book replace
        #[arg(long)]
        yes: bool,
    },
    /// Generate and append new entries (open-ended worldbuilding)
    Generate {
        /// Book file identifier
        book: String,
        /// Instruction for the model
        instruction: String,
    },
    /// Generate and append new entries (narrative design)
    Design {
        /// Book file identifier
        book: String,
        /// Story concept for the model
        instruction: String,
    },
    /// Delete entries of a book by uid
    DeleteEntries {
        /// Book file identifier
        book: String,
        /// Entry uids to delete
        uids: Vec<u32>,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Delete a whole book
    DeleteBook {
        /// Book file identifier
        book: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Manage named presets of enabled books
    Preset {
        #[command(subcommand)]
        command: PresetCommand,
    },
}

#[derive(Subcommand)]
enum PresetCommand {
    /// Save the currently enabled books under a name
    Save {
        /// Preset name
        name: String,
    },
    /// List saved presets
    List,
    /// Enable exactly the books of a preset
    Load {
        /// Preset name
        name: String,
    },
    /// Delete a preset by name
    Delete {
        /// Preset name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let config = load_config(&LoadOptions {
        explicit_path: cli.config.clone(),
        cwd: None,
    })
    .context("failed to load config")?;

    match cli.command {
        Command::Books => list_books(&config).await,
        Command::Enable { books } => enable_books(&config, books).await,
        Command::Disable { books, all } => disable_books(&config, books, all).await,
        Command::Entries { book, json } => list_entries(&config, &book, json).await,
        Command::PatchEntry {
            book,
            uid,
            instruction,
        } => {
            run_pipeline(
                &config,
                SubmitParams {
                    mode: ReconcileMode::EntryPatch,
                    book,
                    target_uid: Some(uid),
                    instruction,
                },
            )
            .await
        }
        Command::PatchBook {
            book,
            instruction,
            yes,
        } => {
            require_yes(yes, "replacing the whole book")?;
            run_pipeline(
                &config,
                SubmitParams {
                    mode: ReconcileMode::BookPatch,
                    book,
                    target_uid: None,
                    instruction,
                },
            )
            .await
        }
        Command::Generate { book, instruction } => {
            run_pipeline(
                &config,
                SubmitParams {
                    mode: ReconcileMode::WorldGenerator,
                    book,
                    target_uid: None,
                    instruction,
                },
            )
            .await
        }
        Command::Design { book, instruction } => {
            run_pipeline(
                &config,
                SubmitParams {
                    mode: ReconcileMode::StoryDesigner,
                    book,
                    target_uid: None,
                    instruction,
                },
            )
            .await
        }
        Command::DeleteEntries { book, uids, yes } => {
            require_yes(yes, "deleting entries")?;
            delete_entries(&config, &book, &uids).await
        }
        Command::DeleteBook { book, yes } => {
            require_yes(yes, "deleting the book")?;
            delete_book(&config, &book).await
        }
        Command::Preset { command } => run_preset(&config, command).await,
    }
}

fn store(config: &LoresmithConfig) -> HttpLorebookStore {
    HttpLorebookStore::new(&config.store.base_url, config.store.api_key.clone())
}

fn preset_store(config: &LoresmithConfig) -> anyhow::Result<FilePresetStore> {
    let path = match &config.presets.path {
        Some(path) => path.clone(),
        None => default_preset_path().context("no home directory for the preset file")?,
    };
    Ok(FilePresetStore::new(path)?)
}

fn require_yes(yes: bool, action: &str) -> anyhow::Result<()> {
    if !yes {
        bail!("{action} cannot be undone; pass --yes to proceed");
    }
    Ok(())
}

/// Drive one reconciliation operation and report the outcome.
async fn run_pipeline(config: &LoresmithConfig, params: SubmitParams) -> anyhow::Result<()> {
    let store: Arc<dyn LorebookStore> = Arc::new(store(config));
    let completion = Arc::new(HttpCompletionClient::new(
        &config.store.base_url,
        config.store.api_key.clone(),
    ));
    let pipeline = LorePipeline::new(store, completion, config);

    match pipeline.submit(params).await {
        Ok(report) => {
            match &report.change {
                AppliedChange::Replaced { entries } => {
                    println!("replaced {} ({entries} entries)", report.book);
                }
                AppliedChange::Created { uids } => {
                    let uids = uids
                        .iter()
                        .map(|uid| uid.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!("created entries in {}: {uids}", report.book);
                }
            }
            Ok(())
        }
        Err(failure) => {
            print_failure(&failure);
            Err(anyhow::Error::new(failure))
        }
    }
}

/// Print what the model actually sent so failures stay debuggable.
fn print_failure(failure: &ReconcileFailure) {
    eprintln!("stage: {}", failure.phase);
    eprintln!("error: {}", failure.error);
    if failure.created > 0 {
        eprintln!("entries created before the abort: {}", failure.created);
    }
    if let Some(raw) = &failure.raw_response {
        eprintln!("--- raw model output ---\n{raw}");
    }
    if let Some(extracted) = &failure.extracted {
        eprintln!("--- extracted fragment ---\n{extracted}");
    }
}

async fn list_books(config: &LoresmithConfig) -> anyhow::Result<()> {
    let store = store(config);
    let books = store.list_books().await?;
    let settings = store.settings().await?;
    if books.is_empty() {
        println!("no books in the store");
        return Ok(());
    }
    for book in books {
        let marker = if settings.enabled.contains(&book.file_name) {
            "*"
        } else {
            " "
        };
        println!("{marker} {} ({})", book.name, book.file_name);
    }
    Ok(())
}

async fn enable_books(config: &LoresmithConfig, books: Vec<String>) -> anyhow::Result<()> {
    if books.is_empty() {
        bail!("no books given");
    }
    let store = store(config);
    let known = store.list_books().await?;
    for book in &books {
        if !known.iter().any(|info| &info.file_name == book) {
            bail!("unknown book: {book}");
        }
    }
    let mut settings = store.settings().await?;
    for book in books {
        if !settings.enabled.contains(&book) {
            settings.enabled.push(book);
        }
    }
    store.set_settings(&settings).await?;
    info!("enabled books (count={})", settings.enabled.len());
    println!("enabled: {}", settings.enabled.join(", "));
    Ok(())
}

async fn disable_books(
    config: &LoresmithConfig,
    books: Vec<String>,
    all: bool,
) -> anyhow::Result<()> {
    if books.is_empty() && !all {
        bail!("no books given; use --all to disable everything");
    }
    let store = store(config);
    let mut settings = store.settings().await?;
    if all {
        settings.enabled.clear();
    } else {
        settings.enabled.retain(|book| !books.contains(book));
    }
    store.set_settings(&settings).await?;
    if settings.enabled.is_empty() {
        println!("no books enabled");
    } else {
        println!("enabled: {}", settings.enabled.join(", "));
    }
    Ok(())
}

async fn list_entries(config: &LoresmithConfig, book: &str, json: bool) -> anyhow::Result<()> {
    let entries = store(config).entries(book).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("{book} is empty");
        return Ok(());
    }
    for entry in &entries {
        let uid = entry
            .uid
            .map(|uid| uid.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{uid:>6}  {}", entry.display_name());
    }
    Ok(())
}

async fn delete_entries(config: &LoresmithConfig, book: &str, uids: &[u32]) -> anyhow::Result<()> {
    if uids.is_empty() {
        bail!("no uids given");
    }
    store(config).delete_entries(book, uids).await?;
    println!("deleted {} entries from {book}", uids.len());
    Ok(())
}

async fn delete_book(config: &LoresmithConfig, book: &str) -> anyhow::Result<()> {
    store(config).delete_book(book).await?;
    println!("deleted {book}");
    Ok(())
}

async fn run_preset(config: &LoresmithConfig, command: PresetCommand) -> anyhow::Result<()> {
    let presets = preset_store(config)?;
    match command {
        PresetCommand::Save { name } => {
            let settings = store(config).settings().await?;
            presets.save(Preset {
                name: name.clone(),
                books: settings.enabled.clone(),
            })?;
            println!("saved preset {name} ({} books)", settings.enabled.len());
        }
        PresetCommand::List => {
            let presets = presets.list()?;
            if presets.is_empty() {
                println!("no presets saved");
            }
            for preset in presets {
                println!("{}: {}", preset.name, preset.books.join(", "));
            }
        }
        PresetCommand::Load { name } => {
            let Some(preset) = presets.get(&name)? else {
                bail!("unknown preset: {name}");
            };
            store(config)
                .set_settings(&BookSettings {
                    enabled: preset.books.clone(),
                })
                .await?;
            println!("enabled: {}", preset.books.join(", "));
        }
        PresetCommand::Delete { name } => {
            if !presets.delete(&name)? {
                bail!("unknown preset: {name}");
            }
            println!("deleted preset {name}");
        }
    }
    Ok(())
}
