use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use jbp_config::{ConfigDiagnostics, JbpConfig, LoggingConfig};
use jbp_jre::{Component, ComponentContext, OpenJdk, JAVA_HOME_DIR, MEMORY_SETTINGS_FILE};
use jbp_memory::{
    parse_byte_size, MemoryHeuristic, MemoryLimitSource, MemorySettings,
    WeightBalancingMemoryHeuristic,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jbp", version, about = "Java buildpack JRE component (detect, compile, release, memcalc)")]
struct Cli {
    /// Buildpack config file (defaults to $JBP_CONFIG_PATH, then jbp.toml in the buildpack directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the component id and JRE version
    Detect(AppArgs),
    /// Install the JRE into <APP_DIR>/.openjdk
    Compile(AppArgs),
    /// Print JAVA_HOME and JAVA_OPTS for launch
    Release(ReleaseArgs),
    /// Print JVM memory flags for the current memory limit
    Memcalc(MemcalcArgs),
}

#[derive(Args)]
struct AppArgs {
    /// Application directory
    app_dir: PathBuf,
}

#[derive(Args)]
struct ReleaseArgs {
    /// Application directory
    app_dir: PathBuf,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MemcalcArgs {
    /// Application directory; its persisted memory settings are used when present
    app_dir: Option<PathBuf>,
    /// Memory settings JSON written during compile
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Memory limit to use instead of $MEMORY_LIMIT / the cgroup limit (e.g. `1G`)
    #[arg(long)]
    memory_limit: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Detect(args) => {
            let config = load_config(cli.config.as_deref(), None)?;
            let mut ctx = ComponentContext::new(&args.app_dir);
            let component = OpenJdk::from_config(&mut ctx, &config)?;
            match component.detect() {
                Some(id) => {
                    println!("{id}");
                    Ok(0)
                }
                None => Ok(1),
            }
        }
        Command::Compile(args) => {
            let config = load_config(cli.config.as_deref(), Some(&args.app_dir))?;
            let mut ctx = ComponentContext::new(&args.app_dir);
            let mut component = OpenJdk::from_config(&mut ctx, &config)?;
            match std::env::current_exe() {
                Ok(exe) => component = component.memcalc_executable(exe),
                Err(err) => tracing::warn!(
                    target: "jbp.cli",
                    error = %err,
                    "cannot locate the jbp executable; memcalc will need jbp on its own"
                ),
            }
            component
                .compile(&ctx)
                .with_context(|| format!("failed to compile {}", args.app_dir.display()))?;
            Ok(0)
        }
        Command::Release(args) => {
            let config = load_config(cli.config.as_deref(), None)?;
            let mut ctx = ComponentContext::new(&args.app_dir);
            let component = OpenJdk::from_config(&mut ctx, &config)?;
            component.release(&mut ctx)?;
            print_release(&ctx, args.json)?;
            Ok(0)
        }
        Command::Memcalc(args) => {
            let settings = memcalc_settings(cli.config.as_deref(), &args)?;
            let limit = match args.memory_limit.as_deref() {
                Some(raw) => MemoryLimitSource::Fixed(
                    parse_byte_size(raw)
                        .with_context(|| format!("invalid --memory-limit {raw:?}"))?,
                ),
                None => MemoryLimitSource::Environment,
            };
            let flags =
                WeightBalancingMemoryHeuristic::with_limit_source(settings, limit).resolve()?;
            println!("{}", flags.join(" "));
            Ok(0)
        }
    }
}

/// Load the buildpack config and install logging from it.
///
/// With `app_dir`, logs also go to the application's diagnostics log unless
/// the config names a file.
fn load_config(explicit: Option<&Path>, app_dir: Option<&Path>) -> Result<JbpConfig> {
    let (config, path, diagnostics) = match explicit {
        Some(path) => {
            let (config, diagnostics) = JbpConfig::load_from_path_with_diagnostics(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            (config, Some(path.to_path_buf()), diagnostics)
        }
        None => jbp_config::load_for_buildpack(&buildpack_root())?,
    };

    let mut logging = config.logging.clone();
    if logging.file.is_none() {
        logging.file = app_dir.map(jbp_jre::diagnostics_log_path);
    }
    jbp_config::init_tracing(&logging);

    if let Some(path) = &path {
        tracing::debug!(target: "jbp.cli", path = %path.display(), "loaded config");
    }
    report_diagnostics(&diagnostics)?;
    Ok(config)
}

fn report_diagnostics(diagnostics: &ConfigDiagnostics) -> Result<()> {
    for key in &diagnostics.unknown_keys {
        tracing::warn!(target: "jbp.cli", key = %key, "unknown config key");
    }
    for warning in &diagnostics.warnings {
        tracing::warn!(target: "jbp.cli", "{warning}");
    }
    if diagnostics.is_ok() {
        return Ok(());
    }

    let errors: Vec<String> = diagnostics.errors.iter().map(ToString::to_string).collect();
    bail!("invalid config:\n  {}", errors.join("\n  "))
}

/// The buildpack directory: the parent of the `bin/` directory holding this executable.
fn buildpack_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn memcalc_settings(config: Option<&Path>, args: &MemcalcArgs) -> Result<MemorySettings> {
    let persisted = args.settings.clone().or_else(|| {
        args.app_dir
            .as_ref()
            .map(|app_dir| app_dir.join(JAVA_HOME_DIR).join(MEMORY_SETTINGS_FILE))
            .filter(|path| path.is_file())
    });

    let Some(path) = persisted else {
        return Ok(load_config(config, args.app_dir.as_deref())?.memory_settings());
    };

    jbp_config::init_tracing(&LoggingConfig {
        file: args.app_dir.as_deref().map(jbp_jre::diagnostics_log_path),
        ..LoggingConfig::default()
    });
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read memory settings {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid memory settings {}", path.display()))
}

#[derive(Serialize)]
struct ReleaseOutput<'a> {
    java_home: Option<&'a str>,
    java_opts: Vec<&'a str>,
}

fn print_release(ctx: &ComponentContext, json: bool) -> Result<()> {
    if json {
        let output = ReleaseOutput {
            java_home: ctx.java_home.as_deref(),
            java_opts: ctx.java_opts.iter().collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(java_home) = &ctx.java_home {
        println!("JAVA_HOME={java_home}");
    }
    println!("JAVA_OPTS={}", ctx.java_opts.to_env_value());
    Ok(())
}
