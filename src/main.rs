// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use log::{info, warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use subshift::app_config::{Config, LogLevel};
use subshift::app_controller::{Controller, Operation};

/// `--log-level` values
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shift every timestamp of a subtitle file by a fixed offset
    #[command(alias = "adjust")]
    Shift(ShiftArgs),

    /// Translate the text of a subtitle file
    Translate(TranslateArgs),

    /// Generate shell completions for subshift
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ShiftArgs {
    /// Input .srt file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Offset in seconds, fractional and negative values allowed (e.g. 1.5, -10)
    #[arg(short = 'd', long, allow_negative_numbers = true)]
    offset: Option<f64>,

    /// Directory for the adjusted file (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Replace an existing output file instead of skipping it
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input .srt file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Language of the subtitle text, overrides the config
    #[arg(short, long)]
    source_language: Option<String>,

    /// Language to translate into, overrides the config
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation service URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Directory for the translated file (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Replace an existing output file instead of skipping it
    #[arg(short, long)]
    force_overwrite: bool,
}

/// subshift - SubRip subtitle timing and translation tool
#[derive(Parser, Debug)]
#[command(name = "subshift")]
#[command(version)]
#[command(about = "Shift or translate SubRip (.srt) subtitles")]
#[command(long_about = "subshift rewrites SubRip subtitle files: it moves every timestamp by a fixed offset, \
or translates the subtitle text through a LibreTranslate-compatible service.

EXAMPLES:
    subshift shift movie.srt --offset 1.5          # Delay subtitles by 1.5 seconds
    subshift shift movie.srt --offset -10          # Show subtitles 10 seconds earlier
    subshift shift /subs/ --offset 0.25 -f         # Shift every .srt below a directory
    subshift translate movie.srt -s en -t ru       # Translate English to Russian
    subshift completions bash > subshift.bash      # Generate bash completions

Shifted files are written as adjusted_<name>, translated files as translated_<name>.

SETTINGS:
    Settings are read from conf.json unless --config-path points elsewhere.
    A missing file is created with default settings on first run.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Path of the JSON settings file
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Log verbosity, overrides the config
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Colored stderr logger, filtered by `log::max_level()`
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and label for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let (color, label) = Self::style_for_level(record.level());
        let _ = writeln!(
            std::io::stderr(),
            "\x1B[{}m{} {} {}\x1B[0m",
            color, now, label, record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(cmd_log_level) = cli.log_level {
        log::set_max_level(LogLevel::from(cmd_log_level).to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subshift", &mut std::io::stdout());
            Ok(())
        }
        Commands::Shift(args) => {
            let config = load_config(&cli.config_path, cli.log_level)?;
            config.validate_shift()?;
            let offset_secs = args.offset.unwrap_or(config.shift.default_offset_secs);
            let controller = Controller::with_config(config)?;

            run_operation(
                &controller,
                &args.input_path,
                args.output_dir.as_deref(),
                &Operation::Shift { offset_secs },
                args.force_overwrite,
            ).await
        }
        Commands::Translate(args) => {
            let mut config = load_config(&cli.config_path, cli.log_level)?;

            // Override config with CLI options if provided
            if let Some(source_lang) = args.source_language {
                config.source_language = source_lang;
            }
            if let Some(target_lang) = args.target_language {
                config.target_language = target_lang;
            }
            if let Some(endpoint) = args.endpoint {
                config.translation.endpoint = endpoint;
            }
            config.validate_translation()?;

            let controller = Controller::with_config(config)?;
            run_operation(
                &controller,
                &args.input_path,
                args.output_dir.as_deref(),
                &Operation::Translate,
                args.force_overwrite,
            ).await
        }
    }
}

/// Load the configuration and apply its log level unless one was given on the command line
fn load_config(config_path: &str, cli_log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = Config::load_or_create(config_path)?;

    match cli_log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

async fn run_operation(
    controller: &Controller,
    input_path: &Path,
    output_dir: Option<&Path>,
    operation: &Operation,
    force_overwrite: bool,
) -> Result<()> {
    if input_path.is_file() {
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| match input_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            });

        if let Some(output_path) = controller.run(input_path, &output_dir, operation, force_overwrite).await? {
            info!("Success: {:?}", output_path);
        }
    } else if input_path.is_dir() {
        if output_dir.is_some() {
            warn!("--output-dir is ignored for directories; outputs are written next to each input");
        }
        controller.run_folder(input_path, operation, force_overwrite).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
