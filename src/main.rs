// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pdftrans::app_config::{self, Config, EnvCredentialSource, MAX_THREADS, MIN_THREADS};
use pdftrans::engine::mock::MockEngine;
use pdftrans::engine::remote::RemoteEngine;
use pdftrans::engine::{LayoutModel, TranslationAdapter, TranslationEngine};
use pdftrans::fonts::{FontResolver, NoFontResolver, RemoteFontResolver, ResourceResolver};
use pdftrans::language_utils::{self, LANGUAGE_OPTIONS};
use pdftrans::orchestrator::{CachePolicy, JobConfig, JobController, JobState, Upload};

/// Steps of the progress bar; job progress is a value in [0, 1]
const PROGRESS_STEPS: u64 = 1000;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Which translation engine runs the job
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum CliEngine {
    /// Remote engine task service from the configuration
    #[default]
    Remote,
    /// Offline engine that echoes the document, for trying out the pipeline
    Mock,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a PDF document (default command)
    Translate(TranslateArgs),

    /// List the languages offered for translation
    Languages,

    /// Generate shell completions for pdftrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// PDF document to translate
    #[arg(value_name = "INPUT_PDF")]
    input_pdf: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(Args, Debug, Clone)]
struct TranslateOptions {
    /// Source language code (e.g., 'en', 'fr', 'zh-CN')
    #[arg(short, long, value_parser = parse_language)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh-CN', 'ja', 'de')
    #[arg(short, long, value_parser = parse_language)]
    target_language: Option<String>,

    /// Number of engine worker threads
    #[arg(long, value_parser = clap::value_parser!(u8).range(MIN_THREADS as i64..=MAX_THREADS as i64))]
    threads: Option<u8>,

    /// Skip font subsetting in the produced documents
    #[arg(long)]
    skip_font_subsetting: bool,

    /// Ask the engine to bypass its translation cache
    #[arg(long)]
    ignore_cache: bool,

    /// Directory for the translated documents
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Translation engine to use
    #[arg(long, value_enum, default_value_t = CliEngine::Remote)]
    engine: CliEngine,

    /// Do not download target-language fonts
    #[arg(long)]
    no_font_download: bool,

    /// Passphrase attempt, checked against the one in the config file
    #[arg(long, env = "PDFTRANS_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,
}

/// pdftrans - layout-preserving PDF translation
///
/// Submits a PDF document to a layout-preserving translation engine and
/// writes a translated document and a side-by-side bilingual document.
#[derive(Parser, Debug)]
#[command(name = "pdftrans")]
#[command(version)]
#[command(about = "Layout-preserving PDF translation")]
#[command(long_about = "pdftrans sends a PDF document to a layout-preserving translation engine and saves
the translated ({name}-mono.pdf) and bilingual ({name}-dual.pdf) documents.

EXAMPLES:
    pdftrans report.pdf                          # Translate using default config (en -> zh-CN)
    pdftrans -s en -t ja report.pdf              # Translate from English to Japanese
    pdftrans --threads 8 -o out/ report.pdf      # More engine workers, custom output dir
    pdftrans -f --ignore-cache report.pdf        # Retranslate and overwrite existing output
    pdftrans --engine mock report.pdf            # Try the pipeline without an engine service
    pdftrans languages                           # List the offered languages
    pdftrans completions bash > pdftrans.bash    # Generate bash completions

CREDENTIALS:
    Read from the environment on every run:
    AZURE_OPENAI_BASE_URL (or AZURE_OPENAI_ENDPOINT), AZURE_OPENAI_API_KEY,
    AZURE_OPENAI_DEPLOYMENT_NAME (default gpt-4o-mini),
    AZURE_OPENAI_API_VERSION (default 2024-06-01).

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// PDF document to translate
    #[arg(value_name = "INPUT_PDF")]
    input_pdf: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
}

fn parse_language(code: &str) -> Result<String, String> {
    language_utils::validate_language_tag(code)
        .map(|_| code.trim().to_string())
        .map_err(|e| e.to_string())
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for a log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌"),
            Level::Warn => ("1;33", "🚧"),
            Level::Info => ("1;32", ""),
            Level::Debug => ("1;36", "🔍"),
            Level::Trace => ("1;35", "📋"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "pdftrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Languages) => {
            for option in LANGUAGE_OPTIONS {
                println!("{:<8} {}", option.code, option.label);
            }
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            let input_pdf = cli
                .input_pdf
                .ok_or_else(|| anyhow!("INPUT_PDF is required when no subcommand is specified"))?;
            run_translate(TranslateArgs {
                input_pdf,
                options: cli.options,
            })
            .await
        }
    }
}

/// Load the configuration file, or write a default one, then apply CLI overrides
fn load_config(options: &TranslateOptions) -> Result<Config> {
    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        serde_json::from_reader(BufReader::new(file))
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(threads) = options.threads {
        config.threads = threads;
    }
    if let Some(output_dir) = &options.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    config.skip_font_subsetting |= options.skip_font_subsetting;
    config.ignore_cache |= options.ignore_cache;
    if options.no_font_download {
        config.fonts.enabled = false;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Assemble the controller for the chosen engine
async fn build_controller(config: &Config, engine: CliEngine) -> Result<JobController> {
    let (engine, model): (Arc<dyn TranslationEngine>, LayoutModel) = match engine {
        CliEngine::Remote => {
            // The engine cannot lay out pages without the model
            let model = LayoutModel::load_available(&config.model)
                .await
                .context("Failed to load the layout model")?;
            let engine = RemoteEngine::new(&config.engine).context("Failed to create the engine client")?;
            (Arc::new(engine), model)
        }
        CliEngine::Mock => {
            let model = LayoutModel::from_bytes("mock-layout-model", b"mock layout model")?;
            (Arc::new(MockEngine::working()), model)
        }
    };
    info!("Layout model {} ({})", model.name(), model.short_fingerprint());

    let fonts: Arc<dyn FontResolver> = if config.fonts.enabled {
        Arc::new(RemoteFontResolver::new(&config.fonts)?)
    } else {
        Arc::new(NoFontResolver)
    };

    let controller = JobController::new(
        TranslationAdapter::new(engine, Arc::new(model)),
        ResourceResolver::new(fonts),
        Arc::new(EnvCredentialSource),
    )
    .with_access_gate(config.access_gate());
    Ok(controller)
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(PROGRESS_STEPS);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {percent}% {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("█▓▒░"));
    bar
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let options = args.options;
    if let Some(log_level) = &options.log_level {
        log::set_max_level(level_filter(&log_level.clone().into()));
    }

    let config = load_config(&options)?;
    log::set_max_level(level_filter(&config.log_level));

    if !args.input_pdf.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", args.input_pdf));
    }

    let controller = Arc::new(build_controller(&config, options.engine).await?);
    if !controller.unlock(options.passphrase.as_deref()) {
        return Err(anyhow!("Translation is locked: wrong or missing passphrase"));
    }

    let job_config = JobConfig::new(
        config.source_language.clone(),
        config.target_language.clone(),
        config.threads,
        config.skip_font_subsetting,
        CachePolicy::from_ignore_flag(config.ignore_cache),
    )?;
    info!(
        "Translating {:?} from {} to {} with {} ({} threads)",
        args.input_pdf,
        language_utils::get_language_name(&job_config.source_language),
        language_utils::get_language_name(&job_config.target_language),
        controller.engine_name(),
        job_config.threads
    );

    let bar = progress_bar();
    let ticker = {
        let controller = Arc::clone(&controller);
        let bar = bar.clone();
        tokio::spawn(async move {
            loop {
                let snapshot = controller.snapshot();
                bar.set_position((snapshot.progress * PROGRESS_STEPS as f64) as u64);
                bar.set_message(snapshot.status);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
    };

    let outcome = controller.submit(Some(Upload::from_path(&args.input_pdf)), job_config).await;
    ticker.abort();

    let snapshot = match outcome {
        Ok(snapshot) => snapshot,
        Err(e) => {
            bar.finish_and_clear();
            return Err(e.into());
        }
    };
    bar.set_position((snapshot.progress * PROGRESS_STEPS as f64) as u64);
    bar.finish_with_message(snapshot.status.clone());

    match snapshot.state {
        JobState::Completed => {
            let result = controller
                .result()
                .ok_or_else(|| anyhow!("Translation finished without output documents"))?;
            let written = result.save_to(&config.output_dir, options.force_overwrite)?;
            for path in written {
                info!("Success: {:?}", path);
            }
            if let Some(original) = controller.original() {
                debug!("Original document {} ({} bytes)", original.file_name, original.len());
            }
            Ok(())
        }
        state => {
            error!("{}", snapshot.status);
            Err(anyhow!("Translation {}: {}", state, snapshot.status))
        }
    }
}
