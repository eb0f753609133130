use booknote::provider::{NlBooksApi, resolve_query};
use booknote::{FsVault, HttpCoverFetcher, Record, Settings, SystemClock, logging};
use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_SETTINGS_FILE: &str = "booknote.yaml";

/// Look up a book and write it as a Markdown note.
#[derive(Debug, Parser)]
#[command(name = "booknote", version, about)]
struct Cli {
    /// Title, keywords or ISBN to search the catalog for.
    #[arg(required_unless_present = "book")]
    query: Option<String>,

    /// Read the book record from a JSON file instead of querying the catalog.
    #[arg(long, value_name = "FILE", conflicts_with = "query")]
    book: Option<PathBuf>,

    /// Settings file (YAML). Defaults to `booknote.yaml` in the vault, if present.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Vault root directory notes are created in.
    #[arg(long, value_name = "DIR", default_value = ".")]
    vault: PathBuf,

    /// Print the rendered note to stdout instead of creating it.
    #[arg(long)]
    print: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("booknote: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(cli.settings.as_deref(), &cli.vault)?;
    let record = match (&cli.book, &cli.query) {
        (Some(path), _) => read_record(path)?,
        (None, Some(query)) => {
            let api = NlBooksApi::new(settings.nl_api_key.clone());
            resolve_query(&api, query, settings.locale())?.to_record()
        }
        (None, None) => return Err("either a query or --book is required".into()),
    };

    let vault = FsVault::new(&cli.vault);
    if cli.print {
        let note = booknote::render_book_note(&settings, &record, &SystemClock, &vault)?;
        println!("{}", note.contents);
        return Ok(());
    }

    let (path, _note) =
        booknote::create_book_note(&settings, &record, &SystemClock, &vault, &HttpCoverFetcher)?;
    println!("{}", path.display());
    Ok(())
}

fn load_settings(explicit: Option<&Path>, vault: &Path) -> Result<Settings, Box<dyn Error>> {
    if let Some(path) = explicit {
        return Ok(Settings::load(path)?);
    }
    let fallback = vault.join(DEFAULT_SETTINGS_FILE);
    if fallback.is_file() {
        return Ok(Settings::load(&fallback)?);
    }
    Ok(Settings::default())
}

fn read_record(path: &Path) -> Result<Record, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let record: Record = serde_json::from_str(&text)?;
    if record.text("title").trim().is_empty() {
        return Err(format!("{}: book record has no title", path.display()).into());
    }
    Ok(record)
}
