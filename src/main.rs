use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use sediment_core::{
    AnalysisProgress, AnalysisResult, FileScore, OutputFormat, SedimentConfig, SupervisionStatus,
    WeightKey,
};
use sediment_engine::clusters::detect_clusters;
use sediment_engine::forecast::{forecast_trend, Forecast, FORECAST_WINDOW, MIN_SNAPSHOTS};
use sediment_engine::heatmap::{build_heatmap, HeatmapNode};
use sediment_engine::roi::remediation_targets;
use sediment_engine::DebtEngine;
use sediment_store::{default_db_path, StateStore};

#[derive(Parser)]
#[command(
    name = "sediment",
    version,
    about = "Technical debt scoring for git repositories",
    long_about = "Sediment scores every file in a git repository for technical debt: churn,\n\
                   code smells, coupling, test gaps, and knowledge risk folded into one\n\
                   0-100 number per file.\n\n\
                   Scores persist in .sediment/state.db, so acknowledgements, snapshots,\n\
                   and trend forecasts carry across runs.\n\n\
                   Examples:\n  \
                     sediment scan                   Score every file in the workspace\n  \
                     sediment file src/main.rs       Component breakdown for one file\n  \
                     sediment couplings              File pairs that change together\n  \
                     sediment snapshot               Record the current debt level\n  \
                     sediment trend                  Forecast the next four weeks\n  \
                     sediment doctor                 Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .sediment.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Score every file in the workspace
    #[command(
        long_about = "Score every file in the workspace.\n\n\
        Mines git history for churn, co-change, and author data, walks the file\n\
        tree, and scores each source file on eight weighted components. The\n\
        result is saved to .sediment/state.db for the other subcommands.\n\n\
        Examples:\n  sediment scan\n  sediment scan --format json\n  sediment scan --verbose"
    )]
    Scan,
    /// Re-score a single file against the stored result
    #[command(
        long_about = "Re-score a single file against the stored result.\n\n\
        Recomputes the file's components and merges the new score into the\n\
        stored result; workspace aggregates are recomputed from the full file\n\
        list. A file whose mtime is unchanged keeps its existing score.\n\n\
        Examples:\n  sediment rescore src/main.rs"
    )]
    Rescore {
        /// File to re-score (absolute or workspace-relative)
        file: PathBuf,
    },
    /// Show the component breakdown for one file
    #[command(
        long_about = "Show the component breakdown for one file.\n\n\
        Reads the stored result and prints the file's eight components ordered\n\
        by contribution, with the evidence behind each score.\n\n\
        Examples:\n  sediment file src/api/handlers.rs\n  sediment file src/main.rs --format json"
    )]
    File {
        /// File to inspect (workspace-relative)
        path: PathBuf,
    },
    /// List file pairs that change together
    #[command(
        long_about = "List file pairs that change together.\n\n\
        Reports pairs whose co-change ratio meets the threshold, annotated with\n\
        whether a static import connects them. Pairs without an import link are\n\
        hidden coupling: files that move together with no visible dependency.\n\n\
        Examples:\n  sediment couplings\n  sediment couplings --threshold 0.5"
    )]
    Couplings {
        /// Minimum coupling ratio to report
        #[arg(long, default_value = "0.7")]
        threshold: f64,
    },
    /// Find clusters of hidden coupling
    #[command(
        long_about = "Find clusters of hidden coupling.\n\n\
        Builds a graph from coupled pairs that lack an import link and reports\n\
        its connected components, largest first. Each cluster is a group of\n\
        files that change together without any visible dependency.\n\n\
        Examples:\n  sediment clusters\n  sediment clusters --threshold 0.5"
    )]
    Clusters {
        /// Minimum coupling ratio for cluster edges
        #[arg(long, default_value = "0.7")]
        threshold: f64,
    },
    /// Show debt aggregated by directory
    #[command(
        long_about = "Show debt aggregated by directory.\n\n\
        Folds the stored per-file scores into a directory tree, each node\n\
        carrying the mean score of the files beneath it, hottest first.\n\n\
        Examples:\n  sediment heatmap\n  sediment heatmap --format json"
    )]
    Heatmap,
    /// Record the current debt level
    #[command(
        long_about = "Record the current debt level.\n\n\
        Captures the stored workspace aggregates plus the week's commit count\n\
        as a snapshot row. Snapshots are the input to 'sediment trend'; take\n\
        one after each scan to build history.\n\n\
        Examples:\n  sediment snapshot"
    )]
    Snapshot,
    /// Forecast debt over the next four weeks
    #[command(
        long_about = "Forecast debt over the next four weeks.\n\n\
        Fits a line through the recent snapshots and projects the workspace\n\
        score forward, labelling the direction and outlook. Needs at least\n\
        three snapshots.\n\n\
        Examples:\n  sediment trend\n  sediment trend --format json"
    )]
    Trend,
    /// Acknowledge a file's debt as acceptable
    #[command(
        long_about = "Acknowledge a file's debt as acceptable.\n\n\
        Marks the file so it stops counting as a remediation target. If a later\n\
        scan finds the score has worsened past the drift allowance, the file\n\
        comes back flagged as regressed. --clear removes the acknowledgement.\n\n\
        Examples:\n  sediment ack src/legacy/parser.rs\n  sediment ack src/legacy/parser.rs --clear"
    )]
    Ack {
        /// File to acknowledge (workspace-relative)
        file: PathBuf,
        /// Clear a previous acknowledgement
        #[arg(long)]
        clear: bool,
    },
    /// Inspect or adjust component weights
    #[command(
        long_about = "Inspect or adjust component weights.\n\n\
        The eight component weights always sum to 1.0: setting one rescales the\n\
        others proportionally. Changes are written back to the config file.\n\n\
        Examples:\n  sediment weights show\n  sediment weights set churn_rate 0.3\n  sediment weights reset"
    )]
    Weights {
        #[command(subcommand)]
        action: WeightsAction,
    },
    /// Create a default .sediment.toml configuration file
    #[command(
        long_about = "Create a default .sediment.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .sediment.toml already exists."
    )]
    Init,
    /// Check your Sediment setup and environment
    #[command(
        long_about = "Check your Sediment setup and environment.\n\n\
        Runs diagnostics for git repo, config file, component weights, language\n\
        parsers, the state database, and git history depth. Use --format json\n\
        for machine-readable output."
    )]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum WeightsAction {
    /// Show the current weights
    Show,
    /// Set one weight, rescaling the others to keep the sum at 1.0
    Set {
        /// Component key, e.g. churn_rate
        key: String,
        /// New weight in [0, 1]
        value: f64,
    },
    /// Restore the default weights
    Reset,
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        // Bold/bright header
        println!("\x1b[1m\x1b[33m▒\x1b[0m \x1b[1msediment\x1b[0m v{version} — find the files that hurt before they bite\n");

        println!("Quick start:");
        println!("  \x1b[36msediment init\x1b[0m                 Create a .sediment.toml config file");
        println!("  \x1b[36msediment scan\x1b[0m                 Score every file in the workspace");
        println!("  \x1b[36msediment file <path>\x1b[0m          See why one file scores high\n");

        println!("All commands:");
        println!("  \x1b[32mscan\x1b[0m       Score every file and save the result");
        println!("  \x1b[32mrescore\x1b[0m    Re-score a single file");
        println!("  \x1b[32mfile\x1b[0m       Component breakdown for one file");
        println!("  \x1b[32mcouplings\x1b[0m  File pairs that change together");
        println!("  \x1b[32mclusters\x1b[0m   Hidden-coupling clusters");
        println!("  \x1b[32mheatmap\x1b[0m    Debt aggregated by directory");
        println!("  \x1b[32msnapshot\x1b[0m   Record the current debt level");
        println!("  \x1b[32mtrend\x1b[0m      Four-week debt forecast");
        println!("  \x1b[32mack\x1b[0m        Acknowledge a file's debt");
        println!("  \x1b[32mweights\x1b[0m    Inspect or adjust component weights");
        println!("  \x1b[32mdoctor\x1b[0m     Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m       Create default configuration\n");
    } else {
        println!("sediment v{version} — find the files that hurt before they bite\n");

        println!("Quick start:");
        println!("  sediment init                 Create a .sediment.toml config file");
        println!("  sediment scan                 Score every file in the workspace");
        println!("  sediment file <path>          See why one file scores high\n");

        println!("All commands:");
        println!("  scan       Score every file and save the result");
        println!("  rescore    Re-score a single file");
        println!("  file       Component breakdown for one file");
        println!("  couplings  File pairs that change together");
        println!("  clusters   Hidden-coupling clusters");
        println!("  heatmap    Debt aggregated by directory");
        println!("  snapshot   Record the current debt level");
        println!("  trend      Four-week debt forecast");
        println!("  ack        Acknowledge a file's debt");
        println!("  weights    Inspect or adjust component weights");
        println!("  doctor     Check your setup and environment");
        println!("  init       Create default configuration\n");
    }

    println!("Run 'sediment <command> --help' for details.");
}

/// Normalize a user-supplied path to the workspace-relative form scores
/// are keyed by.
fn to_relative(workspace: &Path, input: &Path) -> String {
    input
        .strip_prefix(workspace)
        .unwrap_or(input)
        .to_string_lossy()
        .replace('\\', "/")
}

fn ensure_git_workspace(workspace: &Path) -> Result<()> {
    if !workspace.join(".git").exists() && git2::Repository::discover(workspace).is_err() {
        miette::bail!(miette::miette!(
            help = "Run sediment from inside a git repository",
            "Not a git repository: {}",
            workspace.display()
        ));
    }
    Ok(())
}

fn load_stored(store: &StateStore, warning: f64) -> Result<AnalysisResult> {
    match store.load_result(warning)? {
        Some(result) => Ok(result),
        None => miette::bail!(miette::miette!(
            help = "Run 'sediment scan' to score the workspace first",
            "No stored analysis result"
        )),
    }
}

fn render_file_detail(score: &FileScore, format: OutputFormat) -> Result<()> {
    let breakdown = score.breakdown();
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&breakdown).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => {
            println!("## `{}`\n", breakdown.relative_path);
            println!("**Score:** {:.1} / 100", breakdown.composite_score);
            println!("**Status:** {}\n", score.supervision_status);
            println!("| Component | Raw | Weight | Contribution |");
            println!("|-----------|-----|--------|--------------|");
            for c in &breakdown.components {
                println!(
                    "| {} | {:.1} | {:.2} | {:.1} |",
                    c.name, c.raw_score, c.weight, c.contribution,
                );
            }
            let evidence: Vec<&String> = breakdown
                .components
                .iter()
                .flat_map(|c| c.details.iter())
                .collect();
            if !evidence.is_empty() {
                println!("\n**Evidence:**");
                for detail in evidence {
                    println!("- {detail}");
                }
            }
        }
        OutputFormat::Text => {
            println!(
                "{}  score={:.1}  status={}",
                breakdown.relative_path, breakdown.composite_score, score.supervision_status,
            );
            println!("{:-<72}", "");
            for c in &breakdown.components {
                println!(
                    "  {:<24} raw={:>5.1}  weight={:.2}  contributes {:.1}",
                    c.name, c.raw_score, c.weight, c.contribution,
                );
                for detail in &c.details {
                    println!("      {detail}");
                }
            }
        }
    }
    Ok(())
}

fn print_heatmap_node(node: &HeatmapNode, depth: usize) {
    let indent = "  ".repeat(depth);
    if node.children.is_empty() {
        println!("{indent}{}  {:.1}", node.name, node.score);
    } else {
        println!(
            "{indent}{}/  {:.1}  ({} files)",
            node.name, node.score, node.file_count,
        );
        for child in &node.children {
            print_heatmap_node(child, depth + 1);
        }
    }
}

fn collect_dirs<'a>(node: &'a HeatmapNode, out: &mut Vec<&'a HeatmapNode>) {
    out.push(node);
    for child in &node.children {
        if !child.children.is_empty() {
            collect_dirs(child, out);
        }
    }
}

fn snapshot_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(config: &SedimentConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Git repository
    let mut git_root = None;
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut dir = cwd.as_path();
    loop {
        if dir.join(".git").exists() {
            git_root = Some(dir.to_path_buf());
            break;
        }
        let Some(parent) = dir.parent() else {
            break;
        };
        dir = parent;
    }
    match &git_root {
        Some(root) => checks.push(CheckResult::pass(
            "git_repository",
            format!("detected at {}", root.display()),
        )),
        None => checks.push(CheckResult::fail(
            "git_repository",
            "not a git repository",
            "run sediment from inside a git repository",
        )),
    }

    // 2. Config file
    let config_path = std::path::Path::new(".sediment.toml");
    if config_path.exists() {
        let excluded = config.analysis.exclude.len();
        let detail = if excluded > 0 {
            format!(".sediment.toml found ({excluded} exclude patterns)")
        } else {
            ".sediment.toml found".into()
        };
        checks.push(CheckResult::pass("config_file", detail));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            ".sediment.toml not found",
            "run 'sediment init' to create a default config",
        ));
    }

    // 3. Component weights
    checks.push(CheckResult::pass(
        "weights",
        format!(
            "{} components, sum {:.2}",
            WeightKey::ALL.len(),
            config.weights.sum(),
        ),
    ));

    // 4. Language parsers
    let loaded = sediment_source::walker::loadable_languages();
    let total = sediment_source::walker::Language::ALL.len();
    if loaded.len() == total {
        checks.push(CheckResult::pass(
            "language_parsers",
            format!("{total} grammars load"),
        ));
    } else {
        let missing: Vec<&str> = sediment_source::walker::Language::ALL
            .iter()
            .filter(|l| !loaded.contains(l))
            .map(|l| l.name())
            .collect();
        checks.push(CheckResult::fail(
            "language_parsers",
            format!("{} of {total} grammars load", loaded.len()),
            format!("rebuild sediment; broken grammars: {}", missing.join(", ")),
        ));
    }

    // 5. State database
    let db_path = default_db_path(&cwd);
    if db_path.exists() {
        let detail = match rusqlite::Connection::open_with_flags(
            &db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        ) {
            Ok(conn) => {
                let files: i64 = conn
                    .query_row("SELECT COUNT(*) FROM file_scores", [], |r| r.get(0))
                    .unwrap_or(0);
                let snapshots: i64 = conn
                    .query_row("SELECT COUNT(*) FROM debt_snapshots", [], |r| r.get(0))
                    .unwrap_or(0);
                format!("exists ({files} files, {snapshots} snapshots)")
            }
            Err(_) => "exists".into(),
        };
        checks.push(CheckResult::pass("state_database", detail));
    } else {
        checks.push(CheckResult::info(
            "state_database",
            "not found (run 'sediment scan' to create)",
        ));
    }

    // 6. Git history depth
    if git_root.is_some() {
        match git2::Repository::discover(&cwd) {
            Ok(repo) => {
                let mut revwalk = repo.revwalk().into_diagnostic()?;
                revwalk.push_head().into_diagnostic()?;
                let days = config.analysis.history_days;
                let since = (Utc::now() - chrono::Duration::days(days as i64)).timestamp();
                let mut count = 0u64;
                for oid in revwalk {
                    let Ok(oid) = oid else { break };
                    let Ok(commit) = repo.find_commit(oid) else {
                        break;
                    };
                    if commit.time().seconds() < since {
                        break;
                    }
                    count += 1;
                }
                checks.push(CheckResult::info(
                    "git_history",
                    format!("{count} commits in last {days} days"),
                ));
            }
            Err(_) => {
                checks.push(CheckResult::info(
                    "git_history",
                    "unable to read git history",
                ));
            }
        }
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("Sediment v{version} — Environment Check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                // Pad the name for alignment
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Sediment Configuration
# See: https://github.com/therrera-dev/sediment

[analysis]
# history_days = 90
# churn_percentile = 90
# max_files_per_commit = 25
# max_workers = 8
# exclude = ["vendor/**", "*.min.js"]

[thresholds]
# warning = 65.0
# critical = 80.0
# bus_factor = 70

# Component weights; values are renormalized to sum to 1.0 on load.
[weights]
# churn_rate = 0.22
# code_smell_density = 0.20
# coupling_index = 0.18
# change_coupling = 0.12
# test_coverage_gap = 0.12
# knowledge_concentration = 0.08
# cyclomatic_complexity = 0.05
# decision_staleness = 0.03
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SedimentConfig::from_file(path)?,
        None => {
            let default_path = std::path::Path::new(".sediment.toml");
            if default_path.exists() {
                SedimentConfig::from_file(default_path)?
            } else {
                SedimentConfig::default()
            }
        }
    };

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!(
            "history window: {} days, workers: {}",
            config.analysis.history_days, config.analysis.max_workers,
        );
        if !config.analysis.exclude.is_empty() {
            eprintln!("exclude patterns: {}", config.analysis.exclude.join(", "));
        }
    }

    let cwd = std::env::current_dir().into_diagnostic()?;

    match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Scan) => {
            ensure_git_workspace(&cwd)?;
            let engine = DebtEngine::new(cwd.clone(), config.clone());
            let mut store = StateStore::open(&default_db_path(&cwd))?;

            let is_tty = std::io::stderr().is_terminal();
            let spinner = if is_tty {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .unwrap(),
                );
                pb.set_message("Scoring workspace...");
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let progress = spinner.clone();
            let result = engine
                .run_full(move |p: AnalysisProgress| {
                    if let Some(pb) = &progress {
                        pb.set_message(format!("{}/{} {}", p.current, p.total, p.current_file));
                    }
                })
                .await
                .inspect_err(|_e| {
                    if let Some(pb) = &spinner {
                        pb.finish_with_message("Failed");
                    }
                })?;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            store.save_result(&result)?;

            let warning = config.thresholds.warning;
            let targets = remediation_targets(&result, 10);
            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&result).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    println!("# Debt Report\n");
                    println!("**Workspace score:** {:.1} / 100", result.workspace_score);
                    println!("**Files scored:** {}", result.file_count);
                    println!(
                        "**High debt files:** {} (threshold {:.0})",
                        result.high_debt_count, warning,
                    );
                    println!("**Elapsed:** {} ms\n", result.duration_ms);

                    println!("## Remediation Targets\n");
                    if targets.is_empty() {
                        println!("Nothing above the acknowledgement line.");
                    } else {
                        println!("| Rank | File | Score | ROI | Drivers |");
                        println!("|------|------|-------|-----|---------|");
                        for (i, t) in targets.iter().enumerate() {
                            println!(
                                "| {} | `{}` | {:.1} | {:.1} | {} |",
                                i + 1,
                                t.relative_path,
                                t.composite_score,
                                t.roi,
                                t.drivers.join(", "),
                            );
                        }
                    }
                }
                OutputFormat::Text => {
                    println!(
                        "Workspace debt: {:.1} / 100  ({} files, {} high debt, {} ms)",
                        result.workspace_score,
                        result.file_count,
                        result.high_debt_count,
                        result.duration_ms,
                    );
                    println!();
                    println!("Remediation targets (top {}):", targets.len());
                    println!("{:-<72}", "");
                    if targets.is_empty() {
                        println!("  Nothing above the acknowledgement line.");
                    } else {
                        for (i, t) in targets.iter().enumerate() {
                            println!(
                                "{:>2}. {:<40} score={:>5.1}  roi={:>5.1}  {}",
                                i + 1,
                                t.relative_path,
                                t.composite_score,
                                t.roi,
                                t.drivers.join(", "),
                            );
                        }
                    }
                }
            }
        }
        Some(Command::Rescore { ref file }) => {
            ensure_git_workspace(&cwd)?;
            let engine = DebtEngine::new(cwd.clone(), config.clone());
            let store = StateStore::open(&default_db_path(&cwd))?;
            if let Some(stored) = store.load_result(config.thresholds.warning)? {
                engine.restore(stored).await;
            }

            let relative = to_relative(&cwd, file);
            match engine.rescore_file(&relative).await? {
                Some(score) => {
                    store.save_file(&score)?;
                    render_file_detail(&score, cli.format)?;
                }
                None => {
                    println!("{relative} is not a scoreable file; stored scores unchanged.");
                }
            }
        }
        Some(Command::File { ref path }) => {
            let store = StateStore::open(&default_db_path(&cwd))?;
            let result = load_stored(&store, config.thresholds.warning)?;
            let relative = to_relative(&cwd, path);
            let Some(score) = result.files.iter().find(|f| f.relative_path == relative) else {
                miette::bail!(miette::miette!(
                    help = "Paths are workspace-relative; check against 'sediment scan' output",
                    "No stored score for {relative}"
                ));
            };
            render_file_detail(score, cli.format)?;
        }
        Some(Command::Couplings { threshold }) => {
            ensure_git_workspace(&cwd)?;
            let engine = DebtEngine::new(cwd.clone(), config.clone());
            eprintln!(
                "Mining git history at {} (last {} days)...",
                cwd.display(),
                config.analysis.history_days,
            );
            let pairs = engine.change_couplings(threshold).await?;

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&pairs).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Change Coupling\n");
                    if pairs.is_empty() {
                        println!("No coupled pairs at ratio {threshold} or above.");
                    } else {
                        println!("| File A | File B | Ratio | Co-changes | Import link |");
                        println!("|--------|--------|-------|------------|-------------|");
                        for p in &pairs {
                            let link = if p.has_import_link { "yes" } else { "no" };
                            println!(
                                "| `{}` | `{}` | {:.2} | {} | {link} |",
                                p.file_a, p.file_b, p.coupling_ratio, p.co_change_count,
                            );
                        }
                    }
                }
                OutputFormat::Text => {
                    println!("Change coupling (ratio >= {threshold}):");
                    println!("{:-<72}", "");
                    if pairs.is_empty() {
                        println!("  No coupled pairs above the threshold.");
                    } else {
                        for p in &pairs {
                            let marker = if p.has_import_link {
                                ""
                            } else {
                                "  [no import link]"
                            };
                            println!(
                                "  {} <-> {} (ratio={:.2}, co-changes={}){marker}",
                                p.file_a, p.file_b, p.coupling_ratio, p.co_change_count,
                            );
                        }
                    }
                }
            }
        }
        Some(Command::Clusters { threshold }) => {
            ensure_git_workspace(&cwd)?;
            let engine = DebtEngine::new(cwd.clone(), config.clone());
            eprintln!(
                "Mining git history at {} (last {} days)...",
                cwd.display(),
                config.analysis.history_days,
            );
            let pairs = engine.change_couplings(threshold).await?;
            let clusters = detect_clusters(&pairs);

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&clusters).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    println!("# Hidden Coupling Clusters\n");
                    if clusters.is_empty() {
                        println!("No hidden-coupling clusters detected.");
                    }
                    for (i, cluster) in clusters.iter().enumerate() {
                        println!(
                            "## Cluster {} (avg ratio {:.2})\n",
                            i + 1,
                            cluster.avg_ratio,
                        );
                        for file in &cluster.files {
                            println!("- `{file}`");
                        }
                        println!();
                    }
                }
                OutputFormat::Text => {
                    if clusters.is_empty() {
                        println!("No hidden-coupling clusters detected.");
                    }
                    for (i, cluster) in clusters.iter().enumerate() {
                        println!("Cluster {} (avg ratio {:.2}):", i + 1, cluster.avg_ratio);
                        for file in &cluster.files {
                            println!("  {file}");
                        }
                        println!();
                    }
                }
            }
        }
        Some(Command::Heatmap) => {
            let store = StateStore::open(&default_db_path(&cwd))?;
            let result = load_stored(&store, config.thresholds.warning)?;
            let tree = build_heatmap(&result.files);

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&tree).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Debt Heatmap\n");
                    println!("| Directory | Score | Files |");
                    println!("|-----------|-------|-------|");
                    let mut dirs = Vec::new();
                    collect_dirs(&tree, &mut dirs);
                    for dir in dirs {
                        let label = if dir.path.is_empty() { "." } else { &dir.path };
                        println!("| `{label}` | {:.1} | {} |", dir.score, dir.file_count);
                    }
                }
                OutputFormat::Text => {
                    println!("Debt by directory (hottest first):");
                    println!("{:-<72}", "");
                    print_heatmap_node(&tree, 0);
                }
            }
        }
        Some(Command::Snapshot) => {
            ensure_git_workspace(&cwd)?;
            let store = StateStore::open(&default_db_path(&cwd))?;
            let result = load_stored(&store, config.thresholds.warning)?;

            let engine = DebtEngine::new(cwd.clone(), config.clone());
            eprintln!(
                "Mining git history at {} (last {} days)...",
                cwd.display(),
                config.analysis.history_days,
            );
            let context = engine.context().await?;
            eprintln!("Analyzed {} commits.", context.history().commit_count());

            let top: Vec<serde_json::Value> = result
                .top_files(10)
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "path": f.relative_path.as_str(),
                        "score": f.composite_score,
                    })
                })
                .collect();
            let metadata = serde_json::to_string(&top).into_diagnostic()?;
            let snapshot = store.take_snapshot(
                &result,
                context.history().commit_count_week(),
                Some(metadata),
            )?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&snapshot).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    println!("# Snapshot {}\n", snapshot.id);
                    println!("- **Workspace score:** {:.1}", snapshot.composite_score);
                    println!("- **Files scored:** {}", snapshot.file_count);
                    println!("- **High debt files:** {}", snapshot.high_debt_count);
                    println!("- **Commits this week:** {}", snapshot.commit_count_week);
                }
                OutputFormat::Text => {
                    println!("Snapshot #{} recorded", snapshot.id);
                    println!("  workspace score:   {:.1}", snapshot.composite_score);
                    println!("  files scored:      {}", snapshot.file_count);
                    println!("  high debt files:   {}", snapshot.high_debt_count);
                    println!("  commits this week: {}", snapshot.commit_count_week);
                }
            }
        }
        Some(Command::Trend) => {
            let store = StateStore::open(&default_db_path(&cwd))?;
            let snapshots = store.recent_snapshots(FORECAST_WINDOW)?;
            let forecast = forecast_trend(
                &snapshots,
                config.thresholds.warning,
                config.thresholds.critical,
            );

            match &forecast {
                Forecast::InsufficientData { available } => match cli.format {
                    OutputFormat::Json => {
                        let json = serde_json::json!({
                            "history": snapshots,
                            "required": MIN_SNAPSHOTS,
                            "projection": null,
                        });
                        println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                    }
                    _ => {
                        println!(
                            "Not enough snapshots to forecast ({available} of {MIN_SNAPSHOTS} needed)."
                        );
                        println!("Run 'sediment snapshot' after each scan to build history.");
                    }
                },
                Forecast::Projection(p) => match cli.format {
                    OutputFormat::Json => {
                        let json = serde_json::json!({
                            "history": snapshots,
                            "projection": p,
                        });
                        println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                    }
                    OutputFormat::Markdown => {
                        println!("# Debt Trend\n");
                        println!("| Date | Score | Files | High debt |");
                        println!("|------|-------|-------|-----------|");
                        for s in &snapshots {
                            println!(
                                "| {} | {:.1} | {} | {} |",
                                snapshot_date(s.timestamp),
                                s.composite_score,
                                s.file_count,
                                s.high_debt_count,
                            );
                        }
                        println!();
                        println!("**Velocity:** {:+.2} points/week", p.velocity);
                        println!("**Direction:** {}", p.direction);
                        println!("**Outlook:** {}\n", p.outlook);
                        let projected: Vec<String> = p
                            .projected
                            .iter()
                            .enumerate()
                            .map(|(i, v)| format!("week {} = {:.1}", i + 1, v))
                            .collect();
                        println!("**Projected:** {}", projected.join(", "));
                    }
                    OutputFormat::Text => {
                        println!("Debt trend ({} snapshots):", snapshots.len());
                        println!("{:-<72}", "");
                        for s in &snapshots {
                            println!(
                                "  {}  score={:>5.1}  files={}  high={}",
                                snapshot_date(s.timestamp),
                                s.composite_score,
                                s.file_count,
                                s.high_debt_count,
                            );
                        }
                        println!();
                        println!(
                            "Velocity: {:+.2} points/week  direction: {}  outlook: {}",
                            p.velocity, p.direction, p.outlook,
                        );
                        let projected: Vec<String> = p
                            .projected
                            .iter()
                            .enumerate()
                            .map(|(i, v)| format!("wk{}={:.1}", i + 1, v))
                            .collect();
                        println!("Projected: {}", projected.join("  "));
                    }
                },
            }
        }
        Some(Command::Ack { ref file, clear }) => {
            let store = StateStore::open(&default_db_path(&cwd))?;
            let result = load_stored(&store, config.thresholds.warning)?;
            let engine = DebtEngine::new(cwd.clone(), config.clone());
            engine.restore(result).await;

            let relative = to_relative(&cwd, file);
            let status = if clear {
                SupervisionStatus::None
            } else {
                SupervisionStatus::Acceptable
            };
            match engine.set_supervision(&relative, status).await {
                Some(score) => {
                    store.save_file(&score)?;
                    match cli.format {
                        OutputFormat::Json => {
                            println!(
                                "{}",
                                serde_json::to_string_pretty(&score).into_diagnostic()?
                            );
                        }
                        _ => {
                            let verb = if clear { "Cleared" } else { "Acknowledged" };
                            println!(
                                "{verb}: {} (score {:.1})",
                                score.relative_path, score.composite_score,
                            );
                        }
                    }
                }
                None => miette::bail!(miette::miette!(
                    help = "Paths are workspace-relative; check against 'sediment scan' output",
                    "No stored score for {relative}"
                )),
            }
        }
        Some(Command::Weights { ref action }) => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(".sediment.toml"));
            match action {
                WeightsAction::Show => match cli.format {
                    OutputFormat::Json => {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&config.weights).into_diagnostic()?
                        );
                    }
                    OutputFormat::Markdown => {
                        println!("| Component | Weight |");
                        println!("|-----------|--------|");
                        for key in WeightKey::ALL {
                            println!("| {key} | {:.3} |", config.weights.get(key));
                        }
                        println!("| **sum** | {:.3} |", config.weights.sum());
                    }
                    OutputFormat::Text => {
                        println!("Component weights:");
                        println!("{:-<40}", "");
                        for key in WeightKey::ALL {
                            println!("  {:<26} {:.3}", key.to_string(), config.weights.get(key));
                        }
                        println!("  {:<26} {:.3}", "sum", config.weights.sum());
                    }
                },
                WeightsAction::Set { key, value } => {
                    let key: WeightKey = key.parse().map_err(|e: String| {
                        miette::miette!(
                            help = "Valid keys: churn_rate, code_smell_density, coupling_index, change_coupling, test_coverage_gap, knowledge_concentration, cyclomatic_complexity, decision_staleness",
                            "{e}"
                        )
                    })?;
                    let mut updated = config.clone();
                    updated.weights.set(key, *value);
                    std::fs::write(&config_path, updated.to_toml()?).into_diagnostic()?;
                    println!(
                        "Set {key} = {:.3}; other weights rescaled (sum {:.3})",
                        updated.weights.get(key),
                        updated.weights.sum(),
                    );
                    println!("Wrote {}", config_path.display());
                }
                WeightsAction::Reset => {
                    let mut updated = config.clone();
                    updated.weights.reset();
                    std::fs::write(&config_path, updated.to_toml()?).into_diagnostic()?;
                    println!("Weights restored to defaults");
                    println!("Wrote {}", config_path.display());
                }
            }
        }
        Some(Command::Init) => {
            let path = std::path::Path::new(".sediment.toml");
            if path.exists() {
                miette::bail!(".sediment.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .sediment.toml with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sediment", &mut std::io::stdout());
        }
    }

    Ok(())
}
