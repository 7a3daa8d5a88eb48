//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write as _};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use leadscout_export::{DocumentSink, HttpDocumentSink, SpreadsheetClient};
use leadscout_llm::{ChatClient, draft_outreach, draft_reply};
use leadscout_outreach::{
    Action, EmailTransport, OutboundEmail, OutreachFlow, ReplyAction, ReplyFlow,
    recipients_from_table, send_batch,
};
use leadscout_pipeline::{
    ExportTargets, LeadSearchConfig, LeadSearchOutcome, ProgressReporter, SearchClients,
    run_lead_search,
};
use leadscout_shared::{AppConfig, LeadScoutError, init_config, load_config, resolve_api_key};
use leadscout_sources::{MapsClient, ReviewSiteClient};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout — find companies and reach out to them.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Scrape business listings into a leads table and send personalized outreach.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Search both sources for a business query and export the results.
    Search {
        /// Free-text business query, e.g. "dentists in Austin".
        query: String,

        /// Path for the local CSV copy (defaults to the configured output dir).
        #[arg(short, long)]
        out: Option<String>,

        /// Skip the spreadsheet export.
        #[arg(long)]
        no_sheet: bool,

        /// Skip the document-sink delivery.
        #[arg(long)]
        no_sink: bool,
    },

    /// Draft and send personalized outreach emails to an exported table.
    Outreach {
        /// Path to an exported companies table (asked interactively if omitted).
        #[arg(long)]
        table: Option<String>,
    },

    /// Draft and send a reply to an inbound inquiry.
    Reply {
        /// Recipient email address (asked interactively if omitted).
        #[arg(long)]
        to: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search {
            query,
            out,
            no_sheet,
            no_sink,
        } => cmd_search(&query, out.as_deref(), no_sheet, no_sink).await,
        Command::Outreach { table } => cmd_outreach(table.as_deref()).await,
        Command::Reply { to } => cmd_reply(to.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

async fn cmd_search(query: &str, out: Option<&str>, no_sheet: bool, no_sink: bool) -> Result<()> {
    let config = load_config()?;
    let llm_key = resolve_api_key(&config.llm.api_key_env)?;
    let maps_key = resolve_api_key(&config.maps.api_key_env)?;

    let chat = ChatClient::new(config.llm.base_url.as_str(), llm_key, config.llm.model.as_str())?;
    let maps = MapsClient::new(&config.maps, maps_key)?;
    let reviews = ReviewSiteClient::new(&config.reviews)?;

    // Optional export surfaces: a missing token or endpoint disables the
    // surface with a warning instead of failing the search.
    let spreadsheet = if no_sheet {
        None
    } else {
        match resolve_api_key(&config.spreadsheet.token_env) {
            Ok(token) => Some(SpreadsheetClient::new(&config.spreadsheet, token)?),
            Err(e) => {
                warn!(error = %e, "spreadsheet export disabled");
                None
            }
        }
    };

    let sink = if no_sink {
        None
    } else {
        config
            .sink
            .endpoint
            .as_ref()
            .map(|endpoint| HttpDocumentSink::new(reqwest::Client::new(), endpoint.clone()))
    };

    let filename = format!(
        "companies_results_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );

    let search_config = LeadSearchConfig {
        query: query.to_string(),
        query_count: config.defaults.query_count,
        export: ExportTargets {
            csv_filename: filename.clone(),
            collaborator_email: config.spreadsheet.collaborator_email.clone(),
        },
    };

    info!(query, "starting lead search");
    let reporter = CliProgress::new();

    let outcome = run_lead_search(
        &SearchClients {
            chat: &chat,
            maps: &maps,
            reviews: &reviews,
            spreadsheet: spreadsheet.as_ref(),
            sink: sink.as_ref().map(|s| s as &dyn DocumentSink),
        },
        &search_config,
        &reporter,
    )
    .await?;

    match outcome {
        LeadSearchOutcome::NoResults { elapsed } => {
            println!();
            println!("  No companies found for \"{query}\".");
            println!("  Time: {:.1}s", elapsed.as_secs_f64());
            println!();
        }
        LeadSearchOutcome::Found(report) => {
            let out_path = match out {
                Some(p) => PathBuf::from(p),
                None => expand_tilde(&config.defaults.output_dir).join(&filename),
            };
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| eyre!("cannot create {}: {e}", parent.display()))?;
            }
            std::fs::write(&out_path, report.csv.as_bytes())
                .map_err(|e| eyre!("cannot write {}: {e}", out_path.display()))?;

            println!();
            println!("  Search complete!");
            println!("  Maps rows:    {}", report.maps_count);
            println!("  Review rows:  {}", report.review_count);
            println!("  CSV:          {}", out_path.display());
            match &report.spreadsheet_id {
                Some(id) => println!("  Spreadsheet:  {id}"),
                None => println!("  Spreadsheet:  skipped"),
            }
            println!("  Time:         {:.1}s", report.elapsed.as_secs_f64());
            for error in &report.export_errors {
                println!("  Warning:      {error}");
            }
            println!();
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn query_searched(&self, query: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Searching [{current}/{total}] {query}"));
    }

    fn done(&self, _outcome: &LeadSearchOutcome) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// outreach
// ---------------------------------------------------------------------------

async fn cmd_outreach(table: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let llm_key = resolve_api_key(&config.llm.api_key_env)?;
    let chat = ChatClient::new(config.llm.base_url.as_str(), llm_key, config.llm.model.as_str())?;

    let outbox_dir = expand_tilde(&config.defaults.output_dir).join("outbox");
    let mut table_flag = table.map(String::from);

    let mut flow = OutreachFlow::new();
    let mut step = flow.start();

    loop {
        match step.action.take() {
            Some(Action::GenerateDraft { theme }) => {
                println!("{}", step.prompt);
                let sender = flow
                    .sender()
                    .ok_or_else(|| eyre!("draft requested before sender was collected"))?;
                let (email, phone) = (sender.email.clone(), sender.phone.clone());

                step = match draft_outreach(&chat, &theme, &email, &phone).await {
                    Ok(draft) => flow.draft_ready(draft),
                    Err(e) => {
                        warn!(error = %e, "draft generation failed");
                        flow.draft_failed()
                    }
                };
            }

            Some(Action::SendBatch { table }) => {
                println!("{}", step.prompt);
                let csv = std::fs::read_to_string(&table)
                    .map_err(|e| eyre!("cannot read table '{table}': {e}"))?;
                let recipients = recipients_from_table(&csv);
                if recipients.is_empty() {
                    println!("The table contains no sendable recipients.");
                    return Ok(());
                }

                let draft = flow.draft().ok_or_else(|| eyre!("no approved draft"))?;
                let transport = OutboxTransport::new(&outbox_dir)?;
                let report = send_batch(&transport, draft, &recipients).await;

                println!();
                println!("  Outreach complete!");
                println!("  Sent:    {}", report.sent);
                println!("  Failed:  {}", report.failed);
                println!("  Outbox:  {}", outbox_dir.display());
                println!();
                return Ok(());
            }

            None => {
                println!("{}", step.prompt);
                let input = if flow.awaiting_recipients() && table_flag.is_some() {
                    let path = table_flag.take().unwrap_or_default();
                    println!("> {path}");
                    path
                } else {
                    read_line()?
                };
                step = flow.advance(&input);
            }
        }
    }
}

async fn cmd_reply(to: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let llm_key = resolve_api_key(&config.llm.api_key_env)?;
    let chat = ChatClient::new(config.llm.base_url.as_str(), llm_key, config.llm.model.as_str())?;

    let outbox_dir = expand_tilde(&config.defaults.output_dir).join("outbox");
    let mut to_flag = to.map(String::from);

    let mut flow = ReplyFlow::new();
    let mut step = flow.start();

    loop {
        match step.action.take() {
            Some(ReplyAction::GenerateReply { inquiry }) => {
                println!("{}", step.prompt);
                step = match draft_reply(&chat, &inquiry).await {
                    Ok(reply) => flow.reply_ready(reply),
                    Err(e) => {
                        warn!(error = %e, "reply generation failed");
                        flow.reply_failed()
                    }
                };
            }

            Some(ReplyAction::SendReply { to }) => {
                println!("{}", step.prompt);
                let reply = flow.reply().ok_or_else(|| eyre!("no approved reply"))?;
                let transport = OutboxTransport::new(&outbox_dir)?;
                let email = OutboundEmail {
                    to: to.clone(),
                    subject: "Re: your inquiry".into(),
                    html: reply.to_string(),
                };
                transport.send(&email).await?;

                println!();
                println!("  Reply sent to {to}.");
                println!("  Outbox: {}", outbox_dir.display());
                println!();
                return Ok(());
            }

            None => {
                println!("{}", step.prompt);
                let input = if flow.awaiting_recipient() && to_flag.is_some() {
                    let addr = to_flag.take().unwrap_or_default();
                    println!("> {addr}");
                    addr
                } else {
                    read_line()?
                };
                step = flow.advance(&input);
            }
        }
    }
}

/// Read one trimmed line from stdin.
fn read_line() -> Result<String> {
    print!("> ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| eyre!("stdin read failed: {e}"))?;
    Ok(line.trim().to_string())
}

/// File-outbox mail transport: each personalized email is written as an
/// RFC-822-shaped `.eml` file for the operator's mail relay to pick up.
/// Actual SMTP delivery stays outside the tool.
struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| eyre!("cannot create outbox {}: {e}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

#[async_trait::async_trait]
impl EmailTransport for OutboxTransport {
    async fn send(&self, email: &OutboundEmail) -> leadscout_shared::Result<()> {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
        let recipient = email.to.replace(['@', '.'], "_");
        let path = self.dir.join(format!("{stamp}_{recipient}.eml"));

        let payload = format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}",
            email.to, email.subject, email.html
        );
        std::fs::write(&path, payload).map_err(|e| LeadScoutError::io(&path, e))
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~/` against the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
