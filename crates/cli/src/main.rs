mod config;
mod host;
mod report;

use config::Config;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use colored::{control::set_override, Colorize};
use savefmt_core::{
    Document, FormatEngineBinding, FormatOrchestrator, FormatOutcome, LibraryEngine, OptionsTable,
    SaveInterceptor,
};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::host::FileHost;
use crate::report::{FileReport, Summary};

const LONG_ABOUT: &str = r##"
savefmt formats source files with Artistic Style exactly the way an editor
does when you save: each file is opened as a document, a before-save
notification runs the formatter over it, and the result is written back.

Files are only rewritten when formatting changed them. Read-only files,
empty files and languages without configured options are left alone.

LANGUAGES:
  C/C++   .c .cc .cpp .cxx .h .hh .hpp .hxx .inl .ino   (formatted by default)
  C#      .cs                                           (off unless configured)
  Java    .java                                         (off unless configured)

EXAMPLES:
  savefmt src/main.cpp                 Format one file in place
  savefmt --check src/*.cpp            Report files that would change (exit 1)
  savefmt --json include/*.h           Machine-readable report
  savefmt --engine-version             Show the Artistic Style version

ENGINE:
  The Artistic Style shared library is loaded at runtime.
  Precedence: --library > SAVEFMT_LIBRARY > config file > platform default
  (libastyle.so, libastyle.dylib or astyle.dll on the library search path).

CONFIGURATION:
  Config file location: savefmt --config-path
  Generate default config: savefmt --config-init
  Per-language options go in the [options] table; an empty string disables
  formatting for that language."##;

#[derive(Parser)]
#[command(name = "savefmt")]
#[command(version)]
#[command(about = "Format source files with Artistic Style, the way an editor does on save")]
#[command(long_about = LONG_ABOUT)]
struct Cli {
    /// Files to format
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Don't write anything; exit with 1 if any file would change
    #[arg(long)]
    check: bool,

    /// Output results as JSON (for scripting)
    #[arg(long, short = 'j')]
    json: bool,

    /// Path to the Artistic Style shared library
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,

    /// Print the engine version and exit
    #[arg(long)]
    engine_version: bool,

    /// Print the options used for each language and exit
    #[arg(long)]
    languages: bool,

    /// Disable colored output
    #[arg(long, short = 'C')]
    no_color: bool,

    /// Enable verbose logging (use multiple times for more detail)
    ///
    /// -v shows debug messages, -vv shows trace messages.
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Show config file path
    #[arg(long)]
    config_path: bool,

    /// Generate default config file (see --config-path for location)
    #[arg(long)]
    config_init: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    if level != LevelFilter::OFF {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal() {
        set_override(false);
    }

    if cli.config_path {
        match Config::path() {
            Some(path) => println!("{}", path.display()),
            None => {
                eprintln!("Error: cannot determine config directory");
                return ExitCode::from(2);
            }
        }
        return ExitCode::SUCCESS;
    }

    if cli.config_init {
        return match config::init_config() {
            Ok(path) => {
                println!("Created config file: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::from(2)
            }
        };
    }

    // Precedence: CLI args > Environment vars > Config file > Defaults
    let file_config = Config::load();
    if let Some(path) = Config::path() {
        if path.exists() {
            tracing::debug!("Loaded config from: {}", path.display());
        } else {
            tracing::trace!("No config file at: {}", path.display());
        }
    }
    let options = file_config.options();

    if cli.languages {
        print_languages(&options);
        return ExitCode::SUCCESS;
    }

    let library = cli.library.clone().or_else(|| file_config.library());
    let engine = match &library {
        Some(path) => LibraryEngine::load(path),
        None => LibraryEngine::load_default(),
    };
    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            eprintln!("Use --library or SAVEFMT_LIBRARY to point at libastyle.");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(path = %engine.path().display(), "using engine");

    let mut binding = FormatEngineBinding::new(engine);
    let engine_errors = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&engine_errors);
    binding.errors_mut().subscribe(move |error| {
        counter.set(counter.get() + 1);
        eprintln!("{} {error}", "AStyle formatter error:".red().bold());
    });

    if cli.engine_version {
        let version = binding.version();
        if version.is_empty() {
            eprintln!("Error: engine did not report a version");
            return ExitCode::from(2);
        }
        println!("{version}");
        return ExitCode::SUCCESS;
    }

    if cli.files.is_empty() {
        eprintln!("Error: no input files (see savefmt --help)");
        return ExitCode::from(2);
    }

    run(&cli, binding, options, &engine_errors)
}

/// Open every file, fire one before-save notification per document, then save.
fn run(
    cli: &Cli,
    binding: FormatEngineBinding<LibraryEngine>,
    options: OptionsTable,
    engine_errors: &Rc<Cell<usize>>,
) -> ExitCode {
    let mut host = FileHost::new();
    let mut opened = Vec::new();
    let mut reports = Vec::new();
    for path in &cli.files {
        match host.open(path) {
            Ok(cookie) if opened.contains(&cookie) => {
                tracing::debug!(path = %path.display(), "skipping duplicate file");
            }
            Ok(cookie) => opened.push(cookie),
            Err(e) => reports.push(FileReport::failed(path.display().to_string(), e.to_string())),
        }
    }

    let outcomes: Rc<RefCell<HashMap<String, FormatOutcome>>> = Rc::default();
    let sink = Rc::clone(&outcomes);
    let orchestrator = FormatOrchestrator::new(binding, options);

    let mut interceptor = SaveInterceptor::new(host);
    interceptor.on_before_save(move |document| {
        let outcome = orchestrator.on_before_save(document);
        sink.borrow_mut()
            .insert(document.full_name().to_string(), outcome);
    });
    if let Err(e) = interceptor.register() {
        eprintln!("{} {e}", "Error:".red().bold());
        return ExitCode::from(2);
    }
    debug_assert!(interceptor.host().is_advised());

    for cookie in opened {
        interceptor.notify_before_save(cookie);

        let Some(document) = interceptor.host().document(cookie) else {
            continue;
        };
        let path = document.full_name().to_string();
        let language = document.language().to_string();
        let changed = document.is_modified();

        let (written, error) = if cli.check {
            (false, None)
        } else {
            match interceptor.host_mut().save(cookie) {
                Ok(written) => (written, None),
                Err(e) => (false, Some(e.to_string())),
            }
        };

        reports.push(FileReport {
            outcome: outcomes.borrow().get(&path).copied(),
            path,
            language: Some(language),
            changed,
            written,
            error,
        });
    }

    if let Err(e) = interceptor.release() {
        tracing::warn!(error = %e, "failed to release before-save subscription");
    }

    let summary = Summary::of(&reports, engine_errors.get());
    if cli.json {
        report::print_json(&reports, &summary);
    } else {
        report::print_human(&reports, &summary);
    }

    if summary.errors > 0 || (cli.check && summary.changed > 0) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_languages(options: &OptionsTable) {
    let table: HashMap<_, _> = options.iter().collect();
    for language in savefmt_core::Language::ALL {
        match table.get(&language) {
            Some(opts) if !opts.is_empty() => {
                println!("{:<7} {}", language.to_string().bold(), opts);
            }
            _ => println!("{:<7} {}", language.to_string().bold(), "(not formatted)".dimmed()),
        }
    }
}
