use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use dashboard_assemble_config::{Config, LoadOptions};
use dashboard_assemble_core::{
    assemble, check_payload, ensure_bank_rules, load_payload, parse_payload, write_atomic,
    AssembleError, AssembleOptions, ExitCode, Payload, PayloadChecks, PayloadSource,
};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about = "Marker-based dashboard HTML assembler", long_about = None)]
struct Cli {
    /// Payload JSON file (use '-' for stdin)
    #[arg(value_name = "PAYLOAD")]
    payload: Option<PathBuf>,

    /// Inline payload JSON
    #[arg(long = "payload-string", value_name = "JSON", allow_hyphen_values = true)]
    payload_string: Option<String>,

    /// Shell asset path (overrides config)
    #[arg(long, value_name = "PATH")]
    shell: Option<PathBuf>,

    /// Engine asset path (overrides config)
    #[arg(long, value_name = "PATH")]
    engine: Option<PathBuf>,

    /// Injection marker (overrides config)
    #[arg(long, value_name = "TEXT")]
    marker: Option<String>,

    /// Output path (overrides config)
    #[arg(short = 'o', long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Indentation for injected lines (overrides config)
    #[arg(long, value_name = "N")]
    indent: Option<usize>,

    /// Preserve shell text after the marker
    #[arg(long = "keep-suffix")]
    keep_suffix: bool,

    /// Fallback bank-rules document (overrides config)
    #[arg(long = "bank-rules", value_name = "PATH")]
    bank_rules: Option<PathBuf>,

    /// Skip required-key payload checks
    #[arg(long = "skip-checks")]
    skip_checks: bool,

    /// Print the assembled document instead of writing it
    #[arg(long)]
    stdout: bool,

    /// Assemble and report without writing the output file
    #[arg(long = "dry-run", conflicts_with = "stdout")]
    dry_run: bool,

    /// Force creation of backup (default behaviour)
    #[arg(long = "backup")]
    backup: bool,

    /// Disable backup creation
    #[arg(long = "no-backup", conflicts_with = "backup")]
    no_backup: bool,

    /// Explicit config file
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress informational output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(exit) | Err(exit) => std::process::ExitCode::from(exit as u8),
    }
}

fn run(cli: Cli) -> Result<ExitCode, ExitCode> {
    let config = load_config(&cli)?;

    let marker = cli
        .marker
        .clone()
        .unwrap_or_else(|| config.inject.marker.clone());
    let shell_path = cli.shell.clone().unwrap_or_else(|| config.assets.shell.clone());
    let engine_path = cli
        .engine
        .clone()
        .unwrap_or_else(|| config.assets.engine.clone());

    let shell = read_asset(&shell_path, "shell")?;
    let engine = read_asset(&engine_path, "engine")?;

    let raw = load_payload(payload_source(&cli)?).map_err(report)?;
    let mut payload = parse_payload(&raw).map_err(report)?;

    if !cli.skip_checks {
        run_checks(&payload, &config)?;
    }

    let fallback = load_bank_rules(&cli, &config)?;
    ensure_bank_rules(&mut payload, fallback.as_ref());

    let options = AssembleOptions {
        keep_suffix: cli.keep_suffix || config.inject.keep_suffix,
        indent: cli.indent.unwrap_or(config.inject.indent),
    };

    let document = assemble(&shell, &marker, &payload, &engine, &options).map_err(report)?;

    if cli.stdout {
        print!("{document}");
        io::stdout().flush().ok();
        return Ok(ExitCode::Success);
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output.file.clone());

    if cli.dry_run {
        if !cli.quiet {
            println!(
                "Assembled {} bytes from {} payload fields (dry run, {} not written)",
                document.len(),
                payload.len(),
                output_path.display()
            );
        }
        return Ok(ExitCode::Success);
    }

    let backup = match (cli.backup, cli.no_backup) {
        (_, true) => false,
        (true, false) => true,
        (false, false) => config.output.backup,
    };

    write_atomic(&output_path, &document, backup).map_err(report)?;

    if !cli.quiet {
        println!(
            "Assembled {} ({} payload fields injected)",
            output_path.display(),
            payload.len()
        );
    }

    Ok(ExitCode::Success)
}

fn load_config(cli: &Cli) -> Result<Config, ExitCode> {
    let mut options = LoadOptions::default();
    if let Some(path) = &cli.config {
        options = options.with_override_path(path);
    }

    Config::load(options).map_err(|err| {
        eprintln!("{err}");
        ExitCode::InvalidArguments
    })
}

fn read_asset(path: &Path, what: &str) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|err| {
        eprintln!("Failed to read {what} asset '{}': {err}", path.display());
        ExitCode::Io
    })
}

fn payload_source(cli: &Cli) -> Result<PayloadSource, ExitCode> {
    match (&cli.payload, &cli.payload_string) {
        (Some(_), Some(_)) => {
            eprintln!("PAYLOAD and --payload-string cannot be used together");
            Err(ExitCode::InvalidArguments)
        }
        (Some(path), None) => {
            if path == Path::new("-") {
                Ok(PayloadSource::Stdin)
            } else {
                Ok(PayloadSource::File(path.clone()))
            }
        }
        (None, Some(text)) => Ok(PayloadSource::Inline(text.clone())),
        (None, None) => {
            eprintln!("Provide a payload file (or '-' for stdin) or --payload-string");
            Err(ExitCode::InvalidArguments)
        }
    }
}

fn run_checks(payload: &Payload, config: &Config) -> Result<(), ExitCode> {
    let checks = PayloadChecks {
        required: config.payload.required.clone(),
        non_empty: config.payload.non_empty.clone(),
    };

    let issues = check_payload(payload, &checks);
    if issues.is_empty() {
        return Ok(());
    }

    eprintln!("Payload checks failed:");
    for issue in &issues {
        eprintln!("  - {issue}");
    }
    eprintln!("Use --skip-checks to assemble anyway.");
    Err(ExitCode::Validation)
}

fn load_bank_rules(cli: &Cli, config: &Config) -> Result<Option<Value>, ExitCode> {
    let path = cli
        .bank_rules
        .clone()
        .or_else(|| config.payload.bank_rules.clone());

    let Some(path) = path else {
        return Ok(None);
    };

    // The configured fallback document is optional; only an unreadable or
    // malformed file is an error.
    if !path.exists() {
        if cli.bank_rules.is_some() {
            eprintln!("Bank-rules document '{}' not found", path.display());
            return Err(ExitCode::InvalidArguments);
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(&path).map_err(|err| {
        eprintln!(
            "Failed to read bank-rules document '{}': {err}",
            path.display()
        );
        ExitCode::Io
    })?;

    let value = serde_json::from_str(&contents).map_err(|err| {
        eprintln!(
            "Failed to parse bank-rules document '{}': {err}",
            path.display()
        );
        ExitCode::Validation
    })?;

    Ok(Some(value))
}

fn report(err: AssembleError) -> ExitCode {
    match &err {
        AssembleError::MarkerNotFound {
            marker,
            occurrences,
        } => {
            if *occurrences == 0 {
                eprintln!("Injection marker '{marker}' not found in shell asset.");
            } else {
                eprintln!(
                    "Injection marker '{marker}' appears {occurrences} times in shell asset (expected exactly one)."
                );
            }
        }
        AssembleError::Io(io_err) => eprintln!("I/O error: {io_err}"),
        other => eprintln!("{other}"),
    }
    err.exit_code()
}
