use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use time::OffsetDateTime;

use crate::color::WcagLevel;
use crate::config::EffectiveConfig;
use crate::engine::{Engine, EngineOptions};
use crate::suppress::{DroppedRule, RuleSet};
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "a11ysweep",
    version,
    about = "Audit captured web page snapshots for WCAG accessibility issues"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Do not write a run log under ~/.config/a11ysweep/logs.
    #[arg(long = "no-log", global = true)]
    pub no_log: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Audit snapshot files or directories of snapshots.
    Audit(AuditArgs),
    /// Inspect the ignore-rule store.
    Rules(RulesArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    #[arg(long)]
    pub wcag_level: Option<WcagLevel>,
    #[arg(long)]
    pub skip_contrast: bool,
    #[arg(long)]
    pub skip_images: bool,
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,
    #[arg(long)]
    pub exclude: Vec<String>,
    #[arg(long, default_value_t = 10)]
    pub top: usize,
    /// Exit with status 1 when any page has active critical findings.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    Check {
        #[arg(long)]
        ignore_file: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = effective_home_dir()?;

    let env_config_path = std::env::var_os(crate::config::CONFIG_ENV).map(PathBuf::from);
    let mut cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Audit(args) => {
            if let Some(level) = args.wcag_level {
                cfg.audit.wcag_level = level;
            }
            cfg.audit.skip_contrast |= args.skip_contrast;
            cfg.audit.skip_images |= args.skip_images;
            if let Some(ignore_file) = args.ignore_file {
                cfg.rules.ignore_file = Some(ignore_file);
            }
            let mut exclude = cfg.discover.exclude.clone();
            exclude.extend(args.exclude);
            exclude.sort();
            exclude.dedup();
            crate::discover::validate_excludes(&exclude).map_err(crate::exit::invalid_args_err)?;

            let started_at = OffsetDateTime::now_utc();
            let rules = match cfg.rules.ignore_file.as_deref() {
                Some(path) => RuleSet::load(path),
                None => RuleSet::empty(),
            };
            let active_rules = rules.len();
            let engine = Engine::new(
                EngineOptions {
                    audit: cfg.audit_options(),
                    exclude,
                    show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json,
                },
                rules,
            );
            let report = engine.run(&args.paths)?;
            let finished_at = OffsetDateTime::now_utc();

            if !cli.no_log {
                let written = crate::logs::write_audit_log(
                    &home_dir,
                    started_at,
                    finished_at,
                    &report,
                    crate::logs::RulesInfo {
                        ignore_file: cfg.rules.ignore_file.as_deref(),
                        active_rules,
                    },
                );
                match written {
                    Ok(path) if ui_cfg.verbose && !ui_cfg.quiet => {
                        eprintln!("log: {}", path.display());
                    }
                    Ok(_) => {}
                    Err(err) if !ui_cfg.quiet => {
                        eprintln!("warning: run log not written: {err:#}");
                    }
                    Err(_) => {}
                }
            }

            if cli.json {
                write_json(&report)?;
            } else {
                crate::ui::print_audit(&report, &ui_cfg, args.top);
            }

            if report.pages.is_empty() {
                return Err(anyhow!(
                    "no snapshot could be audited ({} load error(s))",
                    report.load_errors.len()
                ));
            }
            if args.strict && report.summary.critical_issues > 0 {
                return Err(crate::exit::critical_findings(
                    report.summary.critical_issues,
                ));
            }
        }
        Commands::Rules(args) => match args.command {
            RulesCommand::Check { ignore_file } => {
                let path = ignore_file.or(cfg.rules.ignore_file.clone()).ok_or_else(|| {
                    crate::exit::invalid_args(
                        "no ignore file configured (use --ignore-file or [rules] ignore_file)",
                    )
                })?;
                rules_check(&path, cli.json, &ui_cfg)?;
            }
        },
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "a11ysweep", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                show_config(&cfg, cli.json)?;
            } else if !ui_cfg.quiet {
                eprintln!("config: use `a11ysweep config --show`");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RulesCheckOutput<'a> {
    ignore_file: String,
    found: bool,
    rules: usize,
    active: usize,
    expired: usize,
    dropped: &'a [DroppedRule],
}

fn rules_check(path: &Path, json: bool, ui_cfg: &UiConfig) -> Result<()> {
    let rules = if path.exists() {
        RuleSet::read(path).map_err(crate::exit::invalid_args_err)?
    } else {
        RuleSet::empty()
    };
    let expired = rules.expired(OffsetDateTime::now_utc()).len();

    if json {
        return write_json(&RulesCheckOutput {
            ignore_file: path.display().to_string(),
            found: path.exists(),
            rules: rules.len(),
            active: rules.len().saturating_sub(expired),
            expired,
            dropped: &rules.dropped,
        });
    }
    if !path.exists() && !ui_cfg.quiet {
        eprintln!("warning: ignore file not found: {}", path.display());
    }
    crate::ui::print_rules_check(&rules, expired, ui_cfg);
    Ok(())
}

fn show_config(cfg: &EffectiveConfig, json: bool) -> Result<()> {
    if json {
        write_json(cfg)
    } else {
        println!("{}", toml::to_string_pretty(cfg)?);
        Ok(())
    }
}

fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set"))
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
