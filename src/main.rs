//! Command-line front end for secret-scout.
//!
//! Thin by design: argument parsing, config/rule loading, output rendering,
//! and exit-code mapping. All scanning behavior lives in the library.

use std::path::PathBuf;
use std::process::ExitCode as ProcessExit;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use comfy_table::{Cell, ContentArrangement, Table, presets};
use tracing_subscriber::EnvFilter;

use secret_scout::config::{ScanOverlay, load_scan_config};
use secret_scout::engine::{ScanContext, run_scan};
use secret_scout::errors::{ExitCode, ScoutError};
use secret_scout::model::{Finding, ScanError, ScanResult, ScanTarget, Severity, TargetKind};
use secret_scout::policy::StructuredParsers;
use secret_scout::rules::loader::load_ruleset;
use secret_scout::scanners::fs::{read_text_candidate, scan_path};
use secret_scout::scanners::git::scan_git_repo;
use secret_scout::scanners::github::{
    GitHubClient, GitHubScanOptions, RepoFilter, ScanEvent, scan_github,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(
    name = "scout",
    version,
    about = "Scan repositories for leaked secrets and risky files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a local path (auto-detects git repositories).
    Scan(ScanArgs),
    /// Clone and scan repositories of a GitHub org or user.
    Github(GithubArgs),
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Path to scan (repo root or any folder).
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Additional rule pack files (repeatable, highest precedence).
    #[arg(long = "rules")]
    rules: Vec<PathBuf>,

    /// Builtin rule pack name.
    #[arg(long, default_value = "default")]
    builtin: String,

    /// Glob(s) to ignore, applied to relative paths (repeatable).
    #[arg(long = "ignore")]
    ignore: Vec<String>,

    /// Include gitignored files (overrides config).
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    include_ignored: Option<bool>,

    /// Include untracked files in git mode.
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", default_value_t = true)]
    include_untracked: bool,

    /// Do not exit 1 when findings are present.
    #[arg(long)]
    no_fail: bool,

    /// Exit 0/1 even if some files errored.
    #[arg(long)]
    ignore_errors: bool,

    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Print config/rule sources and the scan summary.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
struct GithubArgs {
    /// Organization to scan.
    #[arg(long, conflicts_with = "user")]
    org: Option<String>,

    /// User to scan.
    #[arg(long)]
    user: Option<String>,

    /// GitHub token (defaults to the GITHUB_TOKEN environment variable).
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Explicit repository allow list (owner/name, repeatable).
    #[arg(long = "repo")]
    repos: Vec<String>,

    /// Full-name include globs (repeatable).
    #[arg(long = "include")]
    include: Vec<String>,

    /// Full-name exclude globs (repeatable).
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    #[arg(long)]
    include_archived: bool,

    #[arg(long)]
    include_forks: bool,

    #[arg(long)]
    include_disabled: bool,

    /// Stop after this many repositories.
    #[arg(long)]
    max_repos: Option<usize>,

    /// Only scan public repositories.
    #[arg(long)]
    public_only: bool,

    /// Full-depth clones instead of --depth 1.
    #[arg(long)]
    no_shallow: bool,

    /// Disable --filter=blob:none.
    #[arg(long)]
    no_blobless: bool,

    /// Parallel clone+scan lanes.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Reuse this directory for clones instead of a temp dir.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Keep clones on disk after the run.
    #[arg(long)]
    keep_clones: bool,

    /// Additional rule pack files (repeatable, highest precedence).
    #[arg(long = "rules")]
    rules: Vec<PathBuf>,

    /// Builtin rule pack name.
    #[arg(long, default_value = "default")]
    builtin: String,

    /// Glob(s) to ignore, applied to relative paths (repeatable).
    #[arg(long = "ignore")]
    ignore: Vec<String>,

    /// Include gitignored files (overrides per-repo config).
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    include_ignored: Option<bool>,

    /// Include untracked files.
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", default_value_t = true)]
    include_untracked: bool,

    /// Do not exit 1 when findings are present.
    #[arg(long)]
    no_fail: bool,

    /// Exit 0/1 even if some repositories errored.
    #[arg(long)]
    ignore_errors: bool,

    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Print progress events and the scan summary.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ProcessExit {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("SCOUT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Scan(args) => cmd_scan(&args),
        Commands::Github(args) => cmd_github(&args),
    };

    match outcome {
        Ok(code) => ProcessExit::from(code.code() as u8),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            if let Some(detail) = e.detail() {
                eprintln!("  {detail}");
            }
            ProcessExit::from(e.exit_code().code() as u8)
        }
    }
}

fn cmd_scan(args: &ScanArgs) -> Result<ExitCode, ScoutError> {
    let scan_root = args
        .path
        .canonicalize()
        .map_err(|e| ScoutError::config_with(format!("Cannot scan {}", args.path.display()), e.to_string()))?;

    let overrides = ScanOverlay {
        include_ignored: args.include_ignored,
        ..ScanOverlay::default()
    };
    let loaded_cfg = load_scan_config(&scan_root, &overrides)?;
    let loaded_rules = load_ruleset(&scan_root, &args.builtin, &args.rules)?;
    let config = loaded_cfg.config;

    if args.verbose {
        eprintln!("Config sources:");
        eprintln!(
            "  global: {}",
            loaded_cfg.global_path.as_deref().map_or("-".into(), |p| p.display().to_string())
        );
        eprintln!(
            "  repo:   {}",
            loaded_cfg.repo_path.as_deref().map_or("-".into(), |p| p.display().to_string())
        );
        eprintln!("Rule sources:");
        for source in &loaded_rules.sources {
            eprintln!("  - {source}");
        }
    }

    let parsers = StructuredParsers::defaults();
    let read_text = |c: &secret_scout::model::FileCandidate| read_text_candidate(c, &config);
    let ctx = ScanContext {
        ruleset: &loaded_rules.ruleset,
        config: &config,
        read_text: &read_text,
        baseline: None,
        structured_parsers: Some(&parsers),
        dedupe: true,
    };

    // Prefer the git enumerator; fall back to the plain filesystem walk.
    let result = match scan_git_repo(
        &scan_root,
        &config,
        args.include_untracked,
        args.include_ignored,
        &args.ignore,
    ) {
        Ok((git_root, candidates)) => {
            let mut target = ScanTarget::new(
                git_root.display().to_string(),
                TargetKind::Local,
                git_root.display().to_string(),
            );
            target
                .meta
                .insert("scanner".into(), serde_json::Value::from("git"));
            run_scan(target, candidates, &ctx)
        }
        Err(e) => {
            tracing::debug!(error = %e, "git enumeration unavailable, walking filesystem");
            let mut target = ScanTarget::new(
                scan_root.display().to_string(),
                TargetKind::Local,
                scan_root.display().to_string(),
            );
            target
                .meta
                .insert("scanner".into(), serde_json::Value::from("fs"));
            let candidates = scan_path(&scan_root, &config, &args.ignore, false);
            run_scan(target, candidates, &ctx)
        }
    };

    render_single(&result, args.format, args.verbose)?;
    Ok(exit_code_for(
        &result.findings,
        &result.errors,
        args.no_fail,
        args.ignore_errors,
    ))
}

fn cmd_github(args: &GithubArgs) -> Result<ExitCode, ScoutError> {
    let client = GitHubClient::new(args.token.clone());
    let filter = RepoFilter {
        include: args.include.clone(),
        exclude: args.exclude.clone(),
        repos: args.repos.clone(),
        include_archived: args.include_archived,
        include_forks: args.include_forks,
        include_disabled: args.include_disabled,
        max_repos: args.max_repos,
    };
    let opts = GitHubScanOptions {
        org: args.org.clone(),
        user: args.user.clone(),
        include_private: !args.public_only,
        include_untracked: args.include_untracked,
        include_ignored: args.include_ignored,
        shallow: !args.no_shallow,
        blobless: !args.no_blobless,
        concurrency: args.concurrency,
        workspace: args.workspace.clone(),
        keep_clones: args.keep_clones,
    };

    let verbose = args.verbose;
    let on_event = move |event: &ScanEvent<'_>| {
        if !verbose {
            return;
        }
        match event {
            ScanEvent::CloneStart { repo } => eprintln!("  cloning {repo}"),
            ScanEvent::CloneDone { repo, elapsed_ms } => {
                eprintln!("  cloned {repo} ({elapsed_ms} ms)");
            }
            ScanEvent::ScanStart { repo } => eprintln!("  scanning {repo}"),
            ScanEvent::ScanDone {
                repo,
                findings,
                elapsed_ms,
            } => eprintln!("  scanned {repo}: {findings} findings ({elapsed_ms} ms)"),
            ScanEvent::RepoError { repo, message } => {
                eprintln!("  {} {repo}: {message}", "failed".red());
            }
        }
    };

    let (mut results, workspace) = scan_github(
        &client,
        &filter,
        &opts,
        &args.builtin,
        &args.rules,
        &args.ignore,
        Some(&on_event),
    )?;

    // Completion order is unspecified; sort for stable output.
    results.sort_by(|a, b| a.target_name().cmp(b.target_name()));

    if args.keep_clones || args.workspace.is_some() {
        eprintln!("workspace: {}", workspace.path().display());
    }

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&results)
                .map_err(|e| ScoutError::scan_with("Failed encoding results", e.to_string()))?;
            println!("{json}");
        }
        OutputFormat::Table => {
            let findings: Vec<&Finding> = results.iter().flat_map(|r| &r.findings).collect();
            let errors: Vec<&ScanError> = results.iter().flat_map(|r| &r.errors).collect();
            print_findings_table(&findings);
            print_errors(&errors);
            if args.verbose {
                for result in &results {
                    print_summary(result);
                }
            }
        }
    }

    let findings: Vec<Finding> = results.iter().flat_map(|r| r.findings.clone()).collect();
    let errors: Vec<ScanError> = results.iter().flat_map(|r| r.errors.clone()).collect();
    Ok(exit_code_for(&findings, &errors, args.no_fail, args.ignore_errors))
}

fn exit_code_for(
    findings: &[Finding],
    errors: &[ScanError],
    no_fail: bool,
    ignore_errors: bool,
) -> ExitCode {
    if !errors.is_empty() && !ignore_errors {
        return ExitCode::Error;
    }
    if !findings.is_empty() && !no_fail {
        return ExitCode::Findings;
    }
    ExitCode::Ok
}

fn render_single(result: &ScanResult, format: OutputFormat, verbose: bool) -> Result<(), ScoutError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(result)
                .map_err(|e| ScoutError::scan_with("Failed encoding result", e.to_string()))?;
            println!("{json}");
        }
        OutputFormat::Table => {
            let findings: Vec<&Finding> = result.findings.iter().collect();
            let errors: Vec<&ScanError> = result.errors.iter().collect();
            print_findings_table(&findings);
            print_errors(&errors);
            if verbose {
                print_summary(result);
            }
        }
    }
    Ok(())
}

fn severity_cell(severity: Severity) -> Cell {
    let label = severity.as_str();
    let colored = match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::High => label.red().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.blue().to_string(),
    };
    Cell::new(colored)
}

fn print_findings_table(findings: &[&Finding]) {
    if findings.is_empty() {
        println!("{}", "No findings.".green());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["severity", "rule", "file", "line", "detail"]);

    for f in findings {
        let line = f.line.map(|l| l.to_string()).unwrap_or_default();
        let detail = f
            .sample
            .as_deref()
            .or(f.value_hint.as_deref())
            .or(f.key.as_deref())
            .unwrap_or("");
        table.add_row(vec![
            severity_cell(f.severity),
            Cell::new(&f.rule_id),
            Cell::new(&f.file),
            Cell::new(line),
            Cell::new(detail),
        ]);
    }

    println!("{table}");
    println!("{} finding(s)", findings.len());
}

fn print_errors(errors: &[&ScanError]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("{}", format!("{} error(s):", errors.len()).yellow());
    for e in errors {
        match &e.detail {
            Some(detail) => eprintln!("  [{}] {}: {detail}", e.target, e.message),
            None => eprintln!("  [{}] {}", e.target, e.message),
        }
    }
}

fn print_summary(result: &ScanResult) {
    let s = &result.stats;
    eprintln!(
        "{}: considered {} | scanned {} | binary {} | too large {} | findings {} | {} ms",
        result.target_name(),
        s.files_considered,
        s.files_scanned,
        s.files_skipped_binary,
        s.files_skipped_too_large,
        s.findings,
        s.duration_ms
    );
}
