//! PuppetDB Browser
//!
//! Command-line front end for browsing a PuppetDB inventory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};

use puppetdb_browser::config::{self, AppConfig, LogFormat};
use puppetdb_browser::models::{display_fact_value, Fact, Node, NodeFacts, Report};
use puppetdb_browser::services::{
    filter_text, load_dashboard, AdhocQueryRunner, DashboardSummary, SearchFilter, StatusFilter,
    EXAMPLE_QUERIES,
};
use puppetdb_browser::PuppetDbClient;

#[derive(Parser)]
#[command(
    name = "puppetdb-browser",
    version,
    about = "Browse nodes, reports and facts stored in PuppetDB"
)]
struct Cli {
    /// PuppetDB base URL (overrides config and PUPPETDB_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Node counts by status plus the most recent nodes and reports
    Dashboard,

    /// List nodes
    Nodes {
        /// Case-insensitive substring of certname or environment
        #[arg(long, default_value = "")]
        search: String,

        /// Latest report status (all, changed, unchanged, failed)
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Show a single node
    Node {
        certname: String,
    },

    /// List the most recent reports
    Reports {
        /// Maximum number of reports to fetch
        #[arg(long, default_value_t = 50)]
        limit: u32,

        /// Only reports submitted by this node
        #[arg(long)]
        certname: Option<String>,

        /// Case-insensitive substring of certname or environment
        #[arg(long, default_value = "")]
        search: String,

        /// Report status (all, changed, unchanged, failed)
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Show a single report
    Report {
        hash: String,
    },

    /// List fact instances
    Facts {
        /// Only facts of this node
        #[arg(long)]
        certname: Option<String>,

        /// Case-insensitive substring of certname or serialized value
        #[arg(long, default_value = "")]
        search: String,
    },

    /// All facts of one node as a name/value map
    NodeFacts {
        certname: String,
    },

    /// List every distinct fact name
    FactNames,

    /// Find fact instances by name and optional value regex
    SearchFacts {
        name: String,

        /// Regular expression the value must match
        #[arg(long)]
        value: Option<String>,
    },

    /// Run a raw query AST against the nodes endpoint
    Query {
        /// Query text, e.g. '["=", "certname", "web1"]'
        text: Option<String>,

        /// Print the example queries instead of running one
        #[arg(long)]
        examples: bool,
    },

    /// List environments known to PuppetDB
    Environments,

    /// Dump the PuppetDB metrics MBean listing
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(url) = cli.url.clone() {
        config.puppetdb.url_override = Some(url);
        config.validate()?;
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config);

    info!(
        url = config.puppetdb.effective_url(),
        "Starting PuppetDB browser v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = PuppetDbClient::from_config(&config.puppetdb)
        .context("Failed to create PuppetDB client")?;

    run(&client, cli.command, cli.format).await
}

async fn run(client: &PuppetDbClient, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Dashboard => {
            let summary = load_dashboard(client).await?;
            emit(format, &summary, print_dashboard)
        }
        Commands::Nodes { search, status } => {
            let nodes = client.list_nodes().await?;
            let shown = SearchFilter::new(search, status).apply(&nodes);
            debug!(fetched = nodes.len(), shown = shown.len(), "Filtered nodes");
            emit(format, &shown, |nodes| print_nodes(nodes))
        }
        Commands::Node { certname } => {
            let node = client.get_node(&certname).await?;
            emit(format, &node, print_node)
        }
        Commands::Reports {
            limit,
            certname,
            search,
            status,
        } => {
            let reports = match certname {
                Some(ref certname) => client.list_node_reports(certname, limit).await?,
                None => client.list_reports(limit).await?,
            };
            let shown = SearchFilter::new(search, status).apply(&reports);
            emit(format, &shown, |reports| print_reports(reports))
        }
        Commands::Report { hash } => {
            let report = client.get_report(&hash).await?;
            emit(format, &report, print_report)
        }
        Commands::Facts { certname, search } => {
            let facts = client.list_facts(certname.as_deref()).await?;
            let shown = filter_text(&facts, &search);
            emit(format, &shown, |facts| print_facts(facts))
        }
        Commands::NodeFacts { certname } => {
            let facts = client.get_node_facts(&certname).await?;
            emit(format, &facts, print_node_facts)
        }
        Commands::FactNames => {
            let names = client.list_fact_names().await?;
            emit(format, &names, |names| print_lines(names))
        }
        Commands::SearchFacts { name, value } => {
            let facts = client.search_facts(&name, value.as_deref()).await?;
            emit(format, &facts, |facts| print_facts(facts))
        }
        Commands::Query { text, examples } => {
            if examples {
                return emit(format, EXAMPLE_QUERIES, |examples| {
                    for example in examples {
                        println!("{}\n  {}\n  {}\n", example.title, example.description, example.query);
                    }
                });
            }
            let runner = AdhocQueryRunner::new(client);
            let result = runner.run(text.as_deref().unwrap_or_default()).await?;
            emit(format, &result, |result| {
                if let Some(count) = result.count {
                    println!("{} result(s)", count);
                }
                print_json(&result.results);
            })
        }
        Commands::Environments => {
            let environments = client.list_environments().await?;
            emit(format, &environments, |environments| print_lines(environments))
        }
        Commands::Metrics => {
            let metrics = client.get_metrics().await?;
            emit(format, &metrics, |metrics| {
                for name in metrics.keys() {
                    println!("{}", name);
                }
            })
        }
    }
}

/// Print `value` as JSON or through `text`
fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
            println!("{}", out);
        }
        OutputFormat::Text => text(value),
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("Failed to render value: {}", e),
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_dashboard(summary: &DashboardSummary) {
    let stats = &summary.stats;
    println!("Nodes:      {} ({} active, {} inactive)", stats.total, stats.active, stats.inactive());
    println!(
        "Status:     {} changed, {} unchanged, {} failed, {} unknown",
        stats.changed, stats.unchanged, stats.failed, stats.unknown
    );
    println!("Reports:    {} recent", stats.recent_reports);
    println!();
    println!("Recent nodes");
    print_nodes(&summary.recent_nodes);
    println!();
    println!("Recent reports");
    print_reports(&summary.recent_reports);
}

fn print_nodes(nodes: &[Node]) {
    for node in nodes {
        println!(
            "{:<40} {:<15} {:<10} {}",
            node.certname,
            or_dash(node.catalog_environment.as_deref()),
            or_dash(node.latest_report_status),
            or_dash(node.report_timestamp)
        );
    }
}

fn print_node(node: &Node) {
    println!("Certname:           {}", node.certname);
    println!("Active:             {}", node.is_active());
    println!("Catalog env:        {}", or_dash(node.catalog_environment.as_deref()));
    println!("Facts env:          {}", or_dash(node.facts_environment.as_deref()));
    println!("Latest status:      {}", or_dash(node.latest_report_status));
    println!("Latest report:      {}", or_dash(node.latest_report_hash.as_deref()));
    println!("Report timestamp:   {}", or_dash(node.report_timestamp));
    println!("Catalog timestamp:  {}", or_dash(node.catalog_timestamp));
    println!("Facts timestamp:    {}", or_dash(node.facts_timestamp));
}

fn print_reports(reports: &[Report]) {
    for report in reports {
        println!(
            "{:<40} {:<15} {:<10} {}",
            report.certname,
            or_dash(report.environment.as_deref()),
            or_dash(report.status),
            or_dash(report.producer_timestamp)
        );
    }
}

fn print_report(report: &Report) {
    println!("Hash:          {}", report.hash);
    println!("Certname:      {}", report.certname);
    println!("Environment:   {}", or_dash(report.environment.as_deref()));
    println!("Status:        {}", or_dash(report.status));
    println!("Noop:          {}", or_dash(report.noop));
    println!("Puppet:        {}", or_dash(report.puppet_version.as_deref()));
    println!("Config:        {}", or_dash(report.configuration_version.as_deref()));
    println!("Started:       {}", or_dash(report.start_time));
    println!(
        "Duration:      {}",
        or_dash(report.duration().map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0)))
    );

    if let Some(ref resources) = report.resources {
        println!("Resources:     {}", resources.len());
    }

    let logs = report.log_entries();
    if !logs.is_empty() {
        println!();
        for log in logs {
            println!("[{}] {}: {}", log.level, or_dash(log.source.as_deref()), log.message);
        }
    }
}

fn print_facts(facts: &[Fact]) {
    for fact in facts {
        println!("{:<40} {:<30} {}", fact.certname, fact.name, fact.display_value());
    }
}

fn print_node_facts(facts: &NodeFacts) {
    println!("Certname:     {}", facts.certname);
    println!("Environment:  {}", or_dash(facts.environment.as_deref()));
    println!("Timestamp:    {}", or_dash(facts.timestamp));
    println!();
    for (name, value) in &facts.values {
        println!("{:<30} {}", name, display_fact_value(value));
    }
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Console logging goes to stderr; stdout carries command output
fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true).with_ansi(false).with_writer(writer))
                .init();
        }
    }
}

fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
                .with(fmt::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(fmt::layer().with_target(true).with_ansi(false).with_writer(writer))
                .init();
        }
    }
}
