use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use markup5ever_rcdom::{Handle, RcDom};
use tracing_subscriber::EnvFilter;

use pagelocale::env::{core::LogLevel, core::NoColor, EnvVar};
use pagelocale::localization::config::constants;
use pagelocale::localization::error::{helpers, LocalizationError, LocalizationResult};
use pagelocale::localization::{
    ChangeOutcome, ConfigManager, DeepLxProvider, LanguageContext, LocalizationConfig,
    MemoryPreferenceStore, PassSettings, PreferenceStore, RcDomTree, RedbPreferenceStore,
};
use pagelocale::parsers::html::{find_first_element, get_charset, html_to_dom, serialize_document};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";
const DEFAULT_ENCODING: &str = "utf-8";
const STDIO_PATH: &str = "-";

#[derive(Parser, Debug)]
#[command(
    name = "pagelocale",
    version,
    about = "Localize rendered HTML documents in place"
)]
struct Cli {
    /// Path to a TOML or JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a document, or restore it to the source language
    Translate(TranslateArgs),
    /// List the available languages
    Languages,
    /// Print the stored language preference
    Current,
    /// Write an example config file
    InitConfig {
        #[arg(default_value = "pagelocale.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Describe the supported environment variables
    Env,
}

#[derive(clap::Args, Debug)]
struct TranslateArgs {
    /// Input document, `-` for stdin
    input: String,

    /// Target language code; defaults to the stored preference
    #[arg(short, long, value_name = "CODE")]
    lang: Option<String>,

    /// Output file, `-` for stdout
    #[arg(short, long, value_name = "FILE", default_value = STDIO_PATH)]
    output: String,

    /// Element whose subtree is localized
    #[arg(long, value_name = "TAG")]
    root: Option<String>,

    /// Translation API endpoint
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Number of texts translated concurrently
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Document charset; detected from the document when omitted
    #[arg(short, long, value_name = "CHARSET")]
    encoding: Option<String>,

    /// Do not read or write the stored language preference
    #[arg(long)]
    no_persist: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(e) = run(cli) {
        print_error_message(&e.to_string());
        process::exit(1);
    }
}

fn run(cli: Cli) -> LocalizationResult<()> {
    match cli.command {
        Command::Translate(args) => {
            let config = load_config(cli.config.as_deref(), Some(&args))?;
            translate(&config, args)
        }
        Command::Languages => {
            let config = load_config(cli.config.as_deref(), None)?;
            list_languages(&config)
        }
        Command::Current => {
            let config = load_config(cli.config.as_deref(), None)?;
            print_current(&config)
        }
        Command::InitConfig { path, force } => init_config(&path, force),
        Command::Env => {
            print!("{}", pagelocale::env::generate_env_docs());
            Ok(())
        }
    }
}

fn init_logging(level: Option<&str>) {
    let level = match level {
        Some(level) => level.to_lowercase(),
        None => LogLevel::get().unwrap_or_else(|_| "info".to_string()),
    };

    let filter = EnvFilter::try_new(format!("pagelocale={}", level))
        .unwrap_or_else(|_| EnvFilter::new("pagelocale=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(use_color())
        .with_target(false)
        .init();
}

fn use_color() -> bool {
    atty::is(atty::Stream::Stderr) && !NoColor::get().unwrap_or(false)
}

/// Prints an error message to stderr
fn print_error_message(msg: &str) {
    if use_color() {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    } else {
        eprintln!("{msg}");
    }
}

fn load_config(
    path: Option<&str>,
    overrides: Option<&TranslateArgs>,
) -> LocalizationResult<LocalizationConfig> {
    let manager = match path {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.into_config();

    if let Some(args) = overrides {
        if let Some(root) = &args.root {
            config.root_element = root.clone();
        }
        if let Some(api_url) = &args.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(batch_size) = args.batch_size {
            config.batch_size = batch_size;
        }
        config.validate()?;
    }

    Ok(config)
}

fn translate(config: &LocalizationConfig, args: TranslateArgs) -> LocalizationResult<()> {
    let data = read_input(&args.input)?;

    let encoding = match &args.encoding {
        Some(label) => {
            if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
                return Err(helpers::config_error(format!("unknown charset: {}", label)));
            }
            label.clone()
        }
        None => detect_encoding(&data)?,
    };

    let dom = html_to_dom(&data, &encoding)?;
    let root = select_root(&dom, &config.root_element);

    let catalog = config.catalog()?;
    let provider = DeepLxProvider::from_config(config)?;
    let memory_store = MemoryPreferenceStore::new();
    let redb_store;
    let store: &dyn PreferenceStore = if args.no_persist {
        &memory_store
    } else {
        redb_store = RedbPreferenceStore::open(config.preference_path());
        &redb_store
    };

    let context = LanguageContext::new(
        catalog,
        RcDomTree,
        root,
        provider,
        store,
        PassSettings::from(config),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| LocalizationError::InternalError(format!("failed to start runtime: {}", e)))?;

    let requested = match args.lang.as_deref() {
        Some(code) => Some(context.catalog().resolve(code)?.code.clone()),
        None => None,
    };

    // 载入的文档不一定显示当前语言，相同时也要重新应用
    let outcome = runtime.block_on(async {
        match requested {
            Some(language) if language != context.current_language() => {
                context.change_language(&language).await
            }
            _ => context.refresh().await,
        }
    })?;

    match &outcome {
        ChangeOutcome::Translated(report) => tracing::info!(
            "{}: {} translated, {} failed, {} batches",
            report.target,
            report.nodes_translated,
            report.nodes_failed,
            report.batches_dispatched()
        ),
        ChangeOutcome::Restored(report) => tracing::info!(
            "{}: {} restored of {} scanned",
            report.target,
            report.nodes_restored,
            report.nodes_scanned
        ),
        ChangeOutcome::Unchanged => {}
    }

    let output = serialize_document(&dom, &encoding)?;
    write_output(&args.output, &output)
}

fn read_input(input: &str) -> LocalizationResult<Vec<u8>> {
    if input == STDIO_PATH {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(input).map_err(|e| helpers::config_error(format!("cannot read {}: {}", input, e)))
    }
}

fn write_output(output: &str, data: &[u8]) -> LocalizationResult<()> {
    if output == STDIO_PATH {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data)?;
        stdout.flush()?;
        Ok(())
    } else {
        fs::write(output, data)
            .map_err(|e| helpers::config_error(format!("cannot write {}: {}", output, e)))
    }
}

/// Reads the charset declared by the document, if any
fn detect_encoding(data: &[u8]) -> LocalizationResult<String> {
    let probe = html_to_dom(data, DEFAULT_ENCODING)?;
    Ok(get_charset(&probe.document)
        .filter(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()).is_some())
        .unwrap_or_else(|| DEFAULT_ENCODING.to_string()))
}

/// Configured root element, then `body`, then the whole document
fn select_root(dom: &RcDom, root_element: &str) -> Handle {
    find_first_element(&dom.document, root_element)
        .or_else(|| {
            tracing::debug!(
                "<{}> not found, falling back to <{}>",
                root_element,
                constants::ROOT_FALLBACK_ELEMENT
            );
            find_first_element(&dom.document, constants::ROOT_FALLBACK_ELEMENT)
        })
        .unwrap_or_else(|| dom.document.clone())
}

fn list_languages(config: &LocalizationConfig) -> LocalizationResult<()> {
    let catalog = config.catalog()?;
    let store = RedbPreferenceStore::open(config.preference_path());
    let current = store
        .load()
        .filter(|code| catalog.contains(code))
        .unwrap_or_else(|| catalog.source().to_string());

    for language in catalog.languages() {
        let marker = if language.code == current { "*" } else { " " };
        let source = if catalog.is_source(&language.code) {
            " (source)"
        } else {
            ""
        };
        println!(
            "{} {:<6} {} / {}{}",
            marker, language.code, language.name, language.native_name, source
        );
    }

    Ok(())
}

fn print_current(config: &LocalizationConfig) -> LocalizationResult<()> {
    let catalog = config.catalog()?;
    let store = RedbPreferenceStore::open(config.preference_path());
    let current = store
        .load()
        .filter(|code| catalog.contains(code))
        .unwrap_or_else(|| catalog.source().to_string());

    println!("{}", current);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> LocalizationResult<()> {
    if path.exists() && !force {
        return Err(helpers::config_error(format!(
            "{} already exists, use --force to overwrite",
            path.display()
        )));
    }

    ConfigManager::generate_example_config(&path.to_string_lossy())?;
    println!("Wrote {}", path.display());
    Ok(())
}
