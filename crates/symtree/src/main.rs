use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, process};

use clap::{Args, Parser, Subcommand, ValueEnum};
use symtree_core::prelude::*;
use symtree_protocol::{PayloadManager, SharedSubscriber};
use symtree_utils::{LogFormat, LogLevel, LoggingConfig, debug, info, init_logging_with};
use uuid::Uuid;

mod render;
mod subscriber;

use subscriber::Symbolicator;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Symbolicate sampled call-stack diagnostics.
#[derive(Parser, Debug)]
#[command(name = "symtree")]
#[command(version)]
#[command(about = "Symbolicate crash, hang, CPU and disk-write exception diagnostics", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// How frames store their binary offset
    #[arg(long, global = true, value_enum, default_value_t = Addressing::Auto)]
    addressing: Addressing,

    /// Last release that stores load addresses, e.g. `ios=15.7` (repeatable)
    #[arg(long = "legacy-through", global = true, value_name = "PLATFORM=MAJOR.MINOR", value_parser = parse_breakpoint)]
    legacy_through: Vec<(Platform, OsVersion)>,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides SYMTREE_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Attach symbols to every frame of one or more payloads
    Symbolicate
    {
        /// Payload JSON files
        #[arg(required = true)]
        payloads: Vec<PathBuf>,
        #[command(flatten)]
        binaries: BinaryArgs,
        /// Indent the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
        /// Write `<name>.symbolicated.json` files here instead of stdout
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// List the binary images referenced by each diagnostic
    Images
    {
        /// Payload JSON file
        payload: PathBuf,
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print every call stack of a payload
    Trace
    {
        /// Payload JSON file
        payload: PathBuf,
        #[command(flatten)]
        binaries: BinaryArgs,
    },
}

#[derive(Args, Debug)]
struct BinaryArgs
{
    /// Image or dSYM to symbolicate against, identified by its embedded UUID (repeatable)
    #[arg(long = "binary", value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Image registered under an explicit UUID (repeatable)
    #[arg(long = "binary-id", value_name = "UUID=PATH", value_parser = parse_binary_id)]
    with_ids: Vec<(Uuid, PathBuf)>,
}

impl BinaryArgs
{
    fn is_empty(&self) -> bool
    {
        self.paths.is_empty() && self.with_ids.is_empty()
    }

    fn resolver(&self) -> symtree_core::Result<DwarfResolver>
    {
        let mut resolver = DwarfResolver::new();
        for path in &self.paths {
            let id = resolver.add_image(path)?;
            info!("Loaded {} ({})", path.display(), id);
        }
        for (id, path) in &self.with_ids {
            resolver.add_image_with_id(path, *id)?;
            info!("Loaded {} as {}", path.display(), id);
        }
        Ok(resolver)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Addressing
{
    /// Decide per diagnostic from its OS version
    Auto,
    /// Stored offsets are load addresses
    Legacy,
    /// Stored offsets are true offsets
    Offset,
}

impl Cli
{
    fn policy(&self) -> ReconciliationPolicy
    {
        let policy = match self.addressing {
            Addressing::Auto => ReconciliationPolicy::default(),
            Addressing::Legacy => ReconciliationPolicy::forced(AddressingMode::LoadAddress),
            Addressing::Offset => ReconciliationPolicy::forced(AddressingMode::Offset),
        };
        self.legacy_through
            .iter()
            .fold(policy, |policy, (platform, version)| policy.with_last_legacy(*platform, *version))
    }

    fn logging(&self) -> LoggingConfig
    {
        let mut config = LoggingConfig::from_env();
        if let Some(level) = self.log_level {
            config = config.with_level(level);
        }
        if let Some(format) = self.log_format {
            config = config.with_format(format);
        }
        config
    }
}

fn parse_breakpoint(value: &str) -> std::result::Result<(Platform, OsVersion), String>
{
    let (platform, version) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PLATFORM=MAJOR.MINOR, got {value}"))?;
    let platform = platform.parse::<Platform>().map_err(|e| e.to_string())?;
    let version = version.parse::<OsVersion>().map_err(|e| e.to_string())?;
    Ok((platform, version))
}

fn parse_binary_id(value: &str) -> std::result::Result<(Uuid, PathBuf), String>
{
    let (id, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected UUID=PATH, got {value}"))?;
    let id = Uuid::parse_str(id.trim()).map_err(|e| format!("invalid UUID {id}: {e}"))?;
    if path.is_empty() {
        return Err(format!("missing path in {value}"));
    }
    Ok((id, PathBuf::from(path)))
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match init_logging_with(&cli.logging()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> CliResult<()>
{
    let policy = cli.policy();
    debug!(?policy, "Reconciliation policy");

    match cli.command {
        Commands::Symbolicate {
            payloads,
            binaries,
            pretty,
            out_dir,
        } => symbolicate(&payloads, &binaries, policy, pretty, out_dir.as_deref()),
        Commands::Images { payload, json } => {
            let payload = read_payload(&payload)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&render::image_listing(&payload, &policy))?);
            } else {
                print!("{}", render::images(&payload, &policy));
            }
            Ok(())
        }
        Commands::Trace { payload, binaries } => {
            let mut payload = read_payload(&payload)?;
            if !binaries.is_empty() {
                let engine = SymbolicationEngine::with_policy(binaries.resolver()?, policy.clone());
                payload = engine.symbolicate_payload(&payload);
            }
            print!("{}", render::trace(&payload, &policy));
            Ok(())
        }
    }
}

fn read_payload(path: &Path) -> CliResult<DiagnosticPayload>
{
    let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let payload = DiagnosticPayload::from_json(&bytes).map_err(|e| format!("{}: {e}", path.display()))?;
    debug!(path = %path.display(), diagnostics = payload.len(), "Decoded payload");
    Ok(payload)
}

fn symbolicate(
    paths: &[PathBuf],
    binaries: &BinaryArgs,
    policy: ReconciliationPolicy,
    pretty: bool,
    out_dir: Option<&Path>,
) -> CliResult<()>
{
    let payloads = paths.iter().map(|path| read_payload(path)).collect::<CliResult<Vec<_>>>()?;

    let engine = SymbolicationEngine::with_policy(binaries.resolver()?, policy);
    let symbolicator = Arc::new(Symbolicator::new(engine));
    let subscriber: SharedSubscriber = symbolicator.clone();

    let manager = PayloadManager::new();
    manager.add(subscriber.clone())?;
    manager.deliver(payloads)?;
    manager.flush()?;
    manager.remove(&subscriber)?;

    let results = symbolicator.take_results();
    if results.len() != paths.len() {
        return Err(format!("expected {} symbolicated payloads, got {}", paths.len(), results.len()).into());
    }

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)?;
    }

    for (path, payload) in paths.iter().zip(results) {
        let json = if pretty { payload.to_json_pretty()? } else { payload.to_json()? };
        match out_dir {
            Some(dir) => {
                let output = dir.join(output_name(path));
                fs::write(&output, &json)?;
                info!("Wrote {}", output.display());
            }
            None => println!("{}", String::from_utf8_lossy(&json)),
        }
    }

    Ok(())
}

fn output_name(input: &Path) -> String
{
    let stem = input.file_stem().map_or_else(|| "payload".into(), |stem| stem.to_string_lossy());
    format!("{stem}.symbolicated.json")
}
