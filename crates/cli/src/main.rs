use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use syndic_core::sources::{SOURCE_NAMES, source_by_name};
use syndic_core::{
    AssignmentPattern, DecodedDocument, FetchConfig, JitterRange, LiteralStrategy, MediaProxy, Orchestrator,
    OutputFormat, PipelineConfig, RawContentFragment, RenderContext, ReqwestGateway, SanitizeConfig,
    SourceHints, decode, detect, fetch_file, fetch_stdin, format_feed, parse_url, render, sanitize_html,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod echo;

use config::FileConfig;
use echo::{format_size, print_banner, print_error, print_info, print_report, print_step, print_success, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Feed output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Rss,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Rss => OutputFormat::Rss,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Build full-content feeds from article sources that hide their bodies
#[derive(Parser, Debug)]
#[command(name = "syndic")]
#[command(author = "Syndic Contributors")]
#[command(version)]
#[command(about = "Build full-content syndication feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Args, Debug, Clone)]
struct SharedArgs {
    /// Articles processed concurrently per batch
    #[arg(long, global = true, value_name = "NUM")]
    concurrency: Option<usize>,

    /// Delay between batches in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pacing_ms: Option<u64>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Image proxy prefix for hotlink-protected hosts
    #[arg(long, global = true, value_name = "PREFIX")]
    proxy: Option<String>,

    /// Configuration file (default: $CONFIG_DIR/syndic/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a feed from a built-in source
    Feed {
        /// Source name (aliyun-blog, infoq-topic, wordpress)
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Source argument: topic id or alias, posts API URL
        #[arg(value_name = "ARG")]
        arg: Option<String>,

        /// Maximum number of articles
        #[arg(short, long, value_name = "N")]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "rss")]
        format: FormatArg,

        /// Pretty print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Detect, decode, render and sanitize a local payload
    Decode {
        /// Local file, or "-" for stdin
        #[arg(value_name = "INPUT")]
        input: String,

        /// Assignment carrying the body, as OBJECT.FIELD
        #[arg(long, value_name = "OBJ.FIELD")]
        assignment: Option<String>,

        /// JSON pointer of the content field, e.g. /data/content
        #[arg(long, value_name = "PTR")]
        field: Option<String>,

        /// CSS selector of the container holding the body
        #[arg(long, value_name = "SELECTOR")]
        container: Option<String>,

        /// Base URL for resolving relative links
        #[arg(long, value_name = "URL")]
        base: Option<String>,

        /// Unescape literals by re-parsing them as JSON strings
        #[arg(long)]
        json_rewrap: bool,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "syndic_core=debug,syndic=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn media_proxy(shared: &SharedArgs, file: &FileConfig) -> MediaProxy {
    let prefix = shared.proxy.clone().or_else(|| file.media.proxy.clone()).filter(|p| !p.trim().is_empty());
    MediaProxy { prefix, protected_hosts: Vec::new() }.protect(file.media.protected_hosts.iter().cloned())
}

fn pipeline_config(shared: &SharedArgs, file: &FileConfig) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    let jitter = match (file.pipeline.jitter_min_ms, file.pipeline.jitter_max_ms) {
        (None, None) => defaults.jitter,
        (min, max) => JitterRange::new(
            min.map(Duration::from_millis).unwrap_or(defaults.jitter.min),
            max.map(Duration::from_millis).unwrap_or(defaults.jitter.max),
        ),
    };
    let pacing = shared.pacing_ms.or(file.pipeline.pacing_ms).map(Duration::from_millis);

    PipelineConfig::builder()
        .concurrency(shared.concurrency.or(file.pipeline.concurrency).unwrap_or(defaults.concurrency))
        .batch_pacing(pacing.unwrap_or(defaults.batch_pacing))
        .jitter(jitter)
        .fetch_timeout(
            shared.timeout.or(file.fetch.timeout).map(Duration::from_secs).unwrap_or(defaults.fetch_timeout),
        )
        .cache_failures(file.pipeline.cache_failures.unwrap_or(defaults.cache_failures))
        .build()
}

fn fetch_config(shared: &SharedArgs, file: &FileConfig) -> FetchConfig {
    let defaults = FetchConfig::default();
    FetchConfig {
        timeout: shared.timeout.or(file.fetch.timeout).unwrap_or(defaults.timeout),
        user_agent: shared.user_agent.clone().or_else(|| file.fetch.user_agent.clone()).unwrap_or(defaults.user_agent),
        headers: defaults.headers,
    }
}

fn write_output(output: Option<&PathBuf>, content: &str, verbose: bool) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            if verbose {
                print_success(&format!(
                    "Output written to {} ({})",
                    path.display().bright_white(),
                    format_size(content.len())
                ));
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_feed(
    shared: &SharedArgs, file: &FileConfig, source: &str, arg: Option<&str>, limit: Option<usize>, format: FormatArg,
    pretty: bool, output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let source = source_by_name(source, arg)
        .with_context(|| format!("Unknown or incomplete source (known: {})", SOURCE_NAMES.join(", ")))?;
    let config = pipeline_config(shared, file);

    if shared.verbose {
        print_step(1, 3, &format!("Listing {}", source.name().bright_white()));
        eprintln!(
            "  {} {}  {} {}ms",
            "Concurrency:".dimmed(),
            config.concurrency.to_string().bright_white(),
            "Pacing:".dimmed(),
            config.batch_pacing.as_millis()
        );
    }

    let gateway = Arc::new(ReqwestGateway::new(fetch_config(shared, file)).context("Failed to build HTTP client")?);
    let sanitize = SanitizeConfig { media: media_proxy(shared, file), ..Default::default() };
    let orchestrator = Orchestrator::new(gateway, config).with_sanitize_config(sanitize);

    let started = Instant::now();
    let (feed, report) = orchestrator.run_with_report(source.as_ref(), limit).await.context("Failed to build feed")?;
    orchestrator.shutdown().await.context("Failed to shut down renderer")?;

    if shared.verbose {
        print_step(2, 3, "Processed articles");
        print_report(&report, started.elapsed());
        if report.fallbacks > 0 {
            print_warning(&format!("{} article(s) kept their teaser; rerun with RUST_LOG=debug for details", report.fallbacks));
        }
        print_step(3, 3, "Writing output");
    }

    let rendered = format_feed(&feed, format.into(), pretty).context("Failed to serialize feed")?;
    write_output(output, &rendered, shared.verbose)
}

#[allow(clippy::too_many_arguments)]
fn run_decode(
    shared: &SharedArgs, file: &FileConfig, input: &str, assignment: Option<&str>, field: Option<&str>,
    container: Option<&str>, base: Option<&str>, json_rewrap: bool, output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let body = if input == "-" {
        fetch_stdin().context("Failed to read from stdin")?
    } else {
        fetch_file(input).with_context(|| format!("Failed to read file: {}", input))?
    };
    if shared.verbose {
        print_step(1, 3, &format!("Read {}", format_size(body.len())));
    }

    let mut hints = SourceHints::default().without_external();
    if let Some(assignment) = assignment {
        let pattern = AssignmentPattern::parse(assignment)
            .with_context(|| format!("Invalid assignment '{}', expected OBJECT.FIELD", assignment))?;
        hints = hints.assignment(pattern);
    }
    if let Some(field) = field {
        hints = hints.content_field(field);
    }
    if let Some(container) = container {
        hints = hints.container(container);
    }
    let base = base.map(parse_url).transpose().context("Invalid base URL")?;

    let fragment = RawContentFragment::from_body(body, None);
    let shape = detect(&fragment, &hints);
    if shared.verbose {
        print_step(2, 3, &format!("Detected {}", shape.tag().bright_white()));
    }

    let strategy = if json_rewrap { LiteralStrategy::JsonRewrap } else { LiteralStrategy::Grammar };
    let document = decode(&shape, strategy)
        .context("Failed to decode payload")?
        .with_context(|| format!("No decodable content found (shape: {})", shape.tag()))?;

    let sanitize = SanitizeConfig { media: media_proxy(shared, file), base_url: base, ..Default::default() };
    let html = match document {
        DecodedDocument::Html(html) => html,
        DecodedDocument::Tree(tree) => render(&tree, &RenderContext::new(&sanitize.media, sanitize.base_url.as_ref())),
    };
    let cleaned = sanitize_html(&html, &sanitize).context("Failed to sanitize HTML")?;

    if shared.verbose {
        print_step(3, 3, "Writing output");
    }
    write_output(output, &cleaned, shared.verbose)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = FileConfig::load(cli.shared.config.as_deref())?;
    let shared = &cli.shared;

    match &cli.command {
        Command::Feed { source, arg, limit, format, pretty, output } => {
            run_feed(shared, &file, source, arg.as_deref(), *limit, *format, *pretty, output.as_ref()).await
        }
        Command::Decode { input, assignment, field, container, base, json_rewrap, output } => run_decode(
            shared,
            &file,
            input,
            assignment.as_deref(),
            field.as_deref(),
            container.as_deref(),
            base.as_deref(),
            *json_rewrap,
            output.as_ref(),
        ),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.shared.verbose);

    if cli.shared.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
