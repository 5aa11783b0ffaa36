use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "divzero")]
#[command(about = "divzero - find integer divisions in LLVM IR that may divide by zero")]
#[command(version = "0.1.0")]
#[command(author = "Gianluca Brigandi <gbrigand@gmail.com>")]
struct Cli {
    /// Print analysis progress (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze .ll files (directories are searched recursively) and report flagged divisions.
    Check {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Overrides the mode of --config.
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        #[arg(long, default_value = "text")]
        format: divzero_emit::OutputFormat,

        #[arg(long)]
        function: Option<String>,

        /// JSON analysis configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fail when any division is flagged.
        #[arg(long)]
        deny: bool,
    },

    /// Print functions annotated with the abstract memory around every instruction.
    Dump {
        input: PathBuf,

        #[arg(long)]
        function: Option<String>,

        #[arg(long, value_enum, default_value = "pointer")]
        mode: Mode,
    },

    /// Parse a .ll file without analyzing it.
    Validate { input: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Basic,
    Pointer,
}

impl From<Mode> for divzero_core::AnalysisMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Basic => divzero_core::AnalysisMode::Basic,
            Mode::Pointer => divzero_core::AnalysisMode::PointerAware,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let emitter_config = emitter_config(cli.verbose, cli.no_color);
    match cli.command {
        Commands::Check {
            inputs,
            mode,
            format,
            function,
            config,
            deny,
        } => cmd_check(
            &inputs,
            mode,
            format,
            function.as_deref(),
            config.as_deref(),
            deny,
            emitter_config,
        ),
        Commands::Dump {
            input,
            function,
            mode,
        } => cmd_dump(&input, function.as_deref(), mode, emitter_config),
        Commands::Validate { input } => cmd_validate(&input, cli.verbose),
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn emitter_config(verbose: bool, no_color: bool) -> divzero_emit::EmitterConfig {
    use divzero_emit::{EmitterConfig, VerbosityLevel};

    let config = if no_color {
        EmitterConfig::plain()
    } else {
        EmitterConfig::default()
    };
    if verbose {
        config.with_verbosity(VerbosityLevel::Verbose)
    } else {
        config
    }
}

fn load_config(path: Option<&Path>, mode: Option<Mode>) -> Result<divzero_core::AnalysisConfig> {
    let config = match path {
        Some(path) => divzero_core::AnalysisConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => divzero_core::AnalysisConfig::default(),
    };
    Ok(match mode {
        Some(mode) => config.with_mode(mode.into()),
        None => config,
    })
}

fn cmd_check(
    inputs: &[PathBuf],
    mode: Option<Mode>,
    format: divzero_emit::OutputFormat,
    function: Option<&str>,
    config_path: Option<&Path>,
    deny: bool,
    emitter_config: divzero_emit::EmitterConfig,
) -> Result<()> {
    use colored::*;
    use divzero_emit::{Emitter, FileReport, JsonReportEmitter, OutputFormat, TextReportEmitter};

    let config = load_config(config_path, mode)?;
    let verbose = emitter_config.verbosity.should_print_summary();
    if verbose && format == OutputFormat::Text {
        println!("{}", " divzero check".bright_blue().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Config: {}", serde_json::to_string(&config)?);
        println!();
    }

    let files: Vec<PathBuf> = inputs
        .iter()
        .flat_map(divzero_parser::find_ir_files)
        .collect();
    if files.is_empty() {
        bail!("no .ll files found");
    }

    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        let name = path.display().to_string();
        let module = divzero_parser::parse_file(path)
            .with_context(|| format!("failed to parse {}", name))?;

        let report = match function {
            Some(wanted) => {
                let mut report = FileReport::new(&name);
                if let Some(func) = module.functions.get(wanted) {
                    let result = divzero_core::analyze_function(func, &config)?;
                    report.push(func, result);
                }
                report
            }
            None => divzero::analyze_module(&name, &module, &config)?,
        };
        reports.push(report);
    }

    if let Some(wanted) = function {
        if reports.iter().all(|r| r.functions.is_empty()) {
            bail!("function @{} not found in any input", wanted);
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => {
            let emitter = TextReportEmitter::new(emitter_config);
            emitter.emit(&reports, &mut out, &mut emitter.context())?;
        }
        OutputFormat::Json => {
            let emitter = JsonReportEmitter;
            emitter.emit(&reports, &mut out, &mut emitter.context())?;
        }
    }
    out.flush()?;

    let flagged: usize = reports.iter().map(FileReport::flagged_count).sum();
    if deny && flagged > 0 {
        bail!("{} division(s) may divide by zero", flagged);
    }
    Ok(())
}

fn cmd_dump(
    input: &Path,
    function: Option<&str>,
    mode: Mode,
    emitter_config: divzero_emit::EmitterConfig,
) -> Result<()> {
    use divzero_emit::{AnnotatedIREmitter, Emitter};

    let config = divzero_core::AnalysisConfig::default().with_mode(mode.into());
    let module = divzero_parser::parse_file(input)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    let functions = match function {
        Some(name) => vec![module.function(name)?],
        None => module.functions.values().collect(),
    };
    if functions.is_empty() {
        println!("  No functions defined in {}", input.display());
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (position, func) in functions.into_iter().enumerate() {
        if position > 0 {
            writeln!(out)?;
        }
        let result = divzero_core::analyze_function(func, &config)?;
        let emitter = AnnotatedIREmitter::new(&result).with_config(emitter_config.clone());
        emitter.emit(func, &mut out, &mut emitter.context())?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_validate(input: &Path, verbose: bool) -> Result<()> {
    use colored::*;

    if verbose {
        println!("{}", " Validating LLVM IR".bright_cyan().bold());
        println!("{}", "=".repeat(50).bright_cyan());
        println!(" Input: {}", input.display());
        println!();
    }

    match divzero_parser::parse_file(input) {
        Ok(module) => {
            println!("{}", " VALID".bright_green().bold());
            if verbose {
                println!(
                    "   {} functions, {} declarations, {} globals",
                    module.functions.len(),
                    module.declarations.len(),
                    module.globals.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", " INVALID".bright_red().bold());
            println!("\n{}", "Parse Error:".bright_red());
            println!("{}", e);
            Err(anyhow::anyhow!("Validation failed"))
        }
    }
}
