//! `auditmysite` — thin CLI boundary over the [`audit_engine`] facade
//! (spec §6). Sitemap discovery and report serialization proper are
//! out of scope for the core (spec §1); this binary wires a minimal
//! default [`HttpSitemapSource`] and a JSON writer so the engine is
//! runnable end to end without a caller supplying their own.

use anyhow::Result;
use audit_engine::{BudgetTemplateArg, EngineFacade, EngineOptions};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "auditmysite")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Website audit crawler: discovers URLs from a sitemap and audits each page", long_about = None)]
struct Cli {
    /// Sitemap URL to discover pages from.
    sitemap_url: String,

    /// Upper bound on how many discovered URLs to audit.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Output format for the result record.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Directory to write the result record into.
    #[arg(long, default_value = "./audit-results")]
    output_dir: PathBuf,

    /// Content/performance threshold template.
    #[arg(long, value_enum, default_value = "default")]
    budget: BudgetTemplateArg,

    /// Enables extended diagnostics (desktop + mobile screenshot capture).
    #[arg(long)]
    expert: bool,

    /// Disables any interactive prompting (no-op: this binary never prompts).
    #[arg(long)]
    #[allow(dead_code)]
    non_interactive: bool,

    /// Silences the one-time legacy-callback deprecation notice.
    #[arg(long)]
    quiet_deprecations: bool,

    /// Verbose logging.
    #[arg(long, short = 'v')]
    verbose: bool,

    #[arg(long = "no-performance")]
    no_performance: bool,
    #[arg(long = "no-seo")]
    no_seo: bool,
    #[arg(long = "no-content-weight")]
    no_content_weight: bool,
    #[arg(long = "no-mobile")]
    no_mobile: bool,

    /// Resume a previously saved run. Not supported: resumable job
    /// persistence beyond the in-memory queue is an explicit Non-goal
    /// (spec §1).
    #[arg(long)]
    resume: Option<String>,

    /// Save run state for later resumption. Same Non-goal as `--resume`.
    #[arg(long)]
    save_state: bool,

    /// List saved run states. Same Non-goal as `--resume`.
    #[arg(long)]
    list_states: bool,

    /// Worker concurrency.
    #[arg(long, default_value_t = 4)]
    max_concurrent: usize,

    /// Per-URL timeout in milliseconds.
    #[arg(long, default_value_t = 75_000)]
    timeout_ms: u64,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Html,
    Json,
}

/// Exit codes (spec §6): 0 on success including accessibility
/// failures, 1 if any page crashed technically, 1 on fatal engine
/// error.
const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.quiet_deprecations {
        std::env::set_var("AUDITMYSITE_SUPPRESS_DEPRECATIONS", "1");
    }

    // Resumable job persistence is out of scope (spec §1 Non-goals);
    // these three flags are parsed for CLI-surface compatibility but
    // have no backing store to act on.
    if cli.resume.is_some() || cli.save_state || cli.list_states {
        eprintln!(
            "note: --resume/--save-state/--list-states are not supported by this build \
             (resumable job persistence is out of scope for the audit engine core)"
        );
    }

    let options = EngineOptions {
        max_pages: cli.max_pages,
        max_concurrent: cli.max_concurrent,
        timeout_ms: cli.timeout_ms,
        enable_performance: !cli.no_performance,
        enable_seo: !cli.no_seo,
        enable_content_weight: !cli.no_content_weight,
        enable_mobile: !cli.no_mobile,
        budget_template: cli.budget.into(),
        capture_screenshots: cli.expert,
        ..EngineOptions::default()
    };

    let facade = EngineFacade::new();
    facade.subscribe_fn(move |event| {
        tracing::info!(kind = event.payload.kind(), "event");
    });

    let sitemap = Arc::new(audit_engine::HttpSitemapSource::new(&cli.sitemap_url));
    let result = facade.run(sitemap, options).await?;

    std::fs::create_dir_all(&cli.output_dir)?;
    write_report(&cli.output_dir, cli.format, &result)?;

    let any_crashed = result.pages.iter().any(|p| p.status == audit_types::PageStatus::Crashed);
    Ok(if any_crashed { EXIT_FAILURE } else { EXIT_SUCCESS })
}

fn write_report(dir: &std::path::Path, format: OutputFormat, result: &audit_engine::RunResult) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let path = dir.join("results.json");
            std::fs::write(&path, serde_json::to_string_pretty(result)?)?;
            println!("wrote {}", path.display());
        }
        OutputFormat::Html => {
            // HTML report rendering is an external collaborator (spec
            // §1 Out of scope): fall back to the JSON record plus a
            // pointer, rather than hand-rolling a templating layer here.
            let path = dir.join("results.json");
            std::fs::write(&path, serde_json::to_string_pretty(result)?)?;
            println!(
                "HTML rendering is outside this engine's core; wrote the result record as JSON to {}",
                path.display()
            );
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::parse_from(["auditmysite", "https://example.com/sitemap.xml"]);
        assert_eq!(cli.sitemap_url, "https://example.com/sitemap.xml");
        assert_eq!(cli.max_concurrent, 4);
        assert!(!cli.no_performance);
    }

    #[test]
    fn parses_analyzer_disable_flags() {
        let cli = Cli::parse_from([
            "auditmysite",
            "https://example.com/sitemap.xml",
            "--no-performance",
            "--no-mobile",
        ]);
        assert!(cli.no_performance);
        assert!(cli.no_mobile);
        assert!(!cli.no_seo);
    }
}
