use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};
use redline_annotate::annotate;
use redline_check::CheckerClient;
use redline_engine::{CheckOrchestrator, Config, FileStore};

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Redline - Grammar checking for markdown documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a markdown file and print the issues found
    Check {
        /// Path to the markdown file
        file: PathBuf,
    },
    /// Print the annotated form of a markdown file
    Flatten {
        /// Path to the markdown file
        file: PathBuf,

        /// Print the interpreted text stream instead of annotation JSON
        #[arg(long)]
        stream: bool,
    },
    /// Manage the personal dictionary
    Words {
        #[command(subcommand)]
        command: WordsCommand,
    },
}

#[derive(Subcommand)]
enum WordsCommand {
    /// List dictionary words
    List,
    /// Add a word to the dictionary
    Add { word: String },
    /// Remove a word from the dictionary
    Delete { word: String },
    /// Reconcile the dictionary with the checker account
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();
    let store = FileStore::new(cli.config.unwrap_or_else(default_config_path));
    let config = Config::load(&store).await?;

    match cli.command {
        Commands::Check { file } => check_file(config, file).await?,
        Commands::Flatten { file, stream } => flatten_file(file, stream)?,
        Commands::Words { command } => words(config, &store, command).await?,
    }

    Ok(())
}

async fn check_file(config: Config, file: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&file).into_diagnostic()?;
    let mut orchestrator = CheckOrchestrator::new(config)?;
    orchestrator.open(&text);
    let found = orchestrator.check_all().await?;

    if found == 0 {
        println!("{}: no issues found", file.display());
        return Ok(());
    }
    for underline in orchestrator.store().underlines() {
        let m = &underline.inner;
        println!(
            "{}..{} [{}] {}",
            m.range.start, m.range.end, m.rule_id, m.message
        );
        println!("  text: {:?}", m.text);
        if !m.replacements.is_empty() {
            println!("  suggestions: {}", m.replacements.join(", "));
        }
    }
    println!("{found} issue(s) in {}", file.display());
    Ok(())
}

fn flatten_file(file: PathBuf, stream: bool) -> Result<()> {
    let text = std::fs::read_to_string(&file).into_diagnostic()?;
    let annotated = annotate(&text).into_diagnostic()?;
    if stream {
        print!("{}", annotated.interpreted());
    } else {
        println!("{}", annotated.stringify());
    }
    Ok(())
}

async fn words(mut config: Config, store: &FileStore, command: WordsCommand) -> Result<()> {
    match command {
        WordsCommand::List => {
            for word in &config.dictionary {
                println!("{word}");
            }
        }
        WordsCommand::Add { word } => {
            if config.dictionary.insert(word.to_lowercase()) {
                config.save(store).await?;
                println!("added {word:?}");
            } else {
                println!("{word:?} is already in the dictionary");
            }
        }
        WordsCommand::Delete { word } => {
            if config.dictionary.remove(&word.to_lowercase()) {
                config.save(store).await?;
                println!("removed {word:?}");
            } else {
                println!("{word:?} is not in the dictionary");
            }
        }
        WordsCommand::Sync => {
            let client = CheckerClient::new(&config.endpoint)
                .map_err(redline_engine::EngineError::Check)?
                .with_credentials(config.credentials.clone());
            let outcome = redline_engine::dictionary::reconcile(
                &client,
                &config.last_synced,
                &config.dictionary,
            )
            .await?;
            config.dictionary = outcome.merged.clone();
            config.last_synced = outcome.merged;
            config.save(store).await?;
            if outcome.changed {
                println!("dictionary synced ({} words)", config.dictionary.len());
            } else {
                println!("dictionary already in sync");
            }
        }
    }
    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redline")
        .join("config.json")
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
