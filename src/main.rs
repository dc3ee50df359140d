//! ESGScore - command-line client for ESG report scoring
//!
//! Uploads reports to the scoring API, evaluates every category
//! concurrently with retries, and browses, edits and administers the
//! stored evaluations.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, upload failure, all categories failed, etc.)
//!   2 - Some categories failed and --fail-on-partial was given

mod progress;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use esgscore::access::{self, Decision, Session, PENDING_APPROVAL_ROUTE};
use esgscore::analysis::{run_analysis, DocumentInput};
use esgscore::api::{EsgApiClient, RetryPolicy};
use esgscore::cli::{AnalyzeArgs, Args, Command, HistoryArgs, OutputFormat};
use esgscore::config::{Config, CONFIG_FILE_NAME};
use esgscore::identity::{handle_webhook, Admin, IdentityClient, WebhookEvent, WebhookOutcome};
use esgscore::models::{AnalysisReport, HistoryQuery, IndicatorUpdate, ReportMetadata, UserSummary};
use esgscore::report;
use progress::CategoryProgress;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Config is read before logging so `[general] verbose` can raise the level
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("ESGScore v{}", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
    }
    debug!("Arguments: {:?}", args.command);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .esgscore.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the API URL, retry policy and categories.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one command. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let identity = identity_client(&config)?;
    let session = load_session(identity.as_ref(), &config).await?;

    let route = args.command.route();
    if let Decision::Redirect(target) = access::gate(&session, &route) {
        if target == PENDING_APPROVAL_ROUTE {
            bail!("Your account is awaiting approval by an administrator");
        }
        bail!("This command requires the admin role");
    }

    match &args.command {
        Command::Analyze(analyze) => run_analyze(analyze, &config, args.quiet).await,
        Command::History(history) => run_history(history, &config).await,
        Command::Show {
            id,
            indicator_type,
            format,
        } => {
            let api = api_client(&config)?;
            let document = api
                .get_document(*id)
                .await
                .with_context(|| format!("Failed to load document {}", id))?;
            let output = match format.unwrap_or(config.general.format) {
                OutputFormat::Json => report::generate_json_report(&document)?,
                OutputFormat::Markdown => {
                    report::generate_document_markdown(&document, indicator_type.as_deref())
                }
            };
            println!("{}", output);
            Ok(0)
        }
        Command::Pdf { id } => {
            let api = api_client(&config)?;
            let url = api
                .pdf_url(*id)
                .await
                .with_context(|| format!("Failed to get PDF link for document {}", id))?;
            println!("{}", url);
            Ok(0)
        }
        Command::Edit {
            id,
            key,
            score,
            reasoning,
        } => run_edit(*id, key, *score, reasoning, &config).await,
        Command::Users { search } => {
            let admin = admin(identity, &config)?;
            let users: Vec<UserSummary> = match search {
                Some(query) => admin
                    .search_users(Some(query.as_str()))
                    .await?
                    .iter()
                    .map(UserSummary::from)
                    .collect(),
                None => admin.list_users().await?,
            };
            println!("{}", report::generate_users_markdown(&users));
            Ok(0)
        }
        Command::SetRole { user_id, role } => {
            let user = admin(identity, &config)?.set_role(user_id, *role).await?;
            println!("✅ {} is now {}", user.display_name(), role);
            Ok(0)
        }
        Command::RemoveRole { user_id } => {
            let removal = admin(identity, &config)?.remove_role(user_id).await?;
            println!("✅ Removed role from {}", removal.user.display_name());
            if removal.self_demotion {
                println!("   You removed your own admin role; admin commands are no longer available.");
            }
            Ok(0)
        }
        Command::Approve { user_id } => {
            let user = admin(identity, &config)?.approve_user(user_id).await?;
            println!("✅ Approved {}", user.display_name());
            Ok(0)
        }
        Command::Webhook { event } => {
            let identity = identity.context("Identity provider is not configured")?;
            let content = std::fs::read_to_string(event)
                .with_context(|| format!("Failed to read {}", event.display()))?;
            let event: WebhookEvent =
                serde_json::from_str(&content).context("Failed to parse webhook event")?;
            match handle_webhook(&identity, &event).await? {
                WebhookOutcome::MarkedPending(user_id) => {
                    println!("✅ User {} created with approval status: pending", user_id)
                }
                WebhookOutcome::Ignored(kind) => println!("Ignored event {}", kind),
            }
            Ok(0)
        }
        Command::InitConfig => {
            handle_init_config()?;
            Ok(0)
        }
    }
}

/// Upload, score every category and write the report.
async fn run_analyze(analyze: &AnalyzeArgs, config: &Config, quiet: bool) -> Result<i32> {
    let start_time = Instant::now();
    let api = Arc::new(api_client(config)?);

    let documents: Vec<DocumentInput> = analyze
        .files
        .iter()
        .cloned()
        .zip(analyze.document_types(config.analysis.document_type))
        .map(|(path, document_type)| DocumentInput {
            path,
            document_type,
        })
        .collect();

    let categories = if analyze.categories.is_empty() {
        config.analysis.categories.clone()
    } else {
        analyze.categories.clone()
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding requests");
            on_interrupt.cancel();
        }
    });

    if !quiet {
        println!("🔬 Analyzing {} document(s) with {}", documents.len(), api.base_url());
    }

    let progress = CategoryProgress::new(&categories, quiet);
    let result = run_analysis(
        Arc::clone(&api),
        &documents,
        RetryPolicy::from(&config.retry),
        &categories,
        cancel,
        |event, state| progress.update(event, state),
    )
    .await;
    progress.finish();
    let outcome = result?;

    let state = &outcome.state;
    let report = AnalysisReport {
        metadata: ReportMetadata {
            files: outcome.uploads.iter().map(|u| u.display_name.clone()).collect(),
            document_types: documents.iter().map(|d| d.document_type).collect(),
            analysis_date: Utc::now(),
            api_url: api.base_url().to_string(),
            document_ids: state.document_ids().clone(),
            categories_finished: state.finished(),
            categories_failed: state.failed(),
            total_indicators: state.indicators().len(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        spdi_index: state.total_index(),
        indicators: state.indicators().to_vec(),
        warning: outcome.warning.clone(),
    };

    let format = analyze.format.unwrap_or(config.general.format);
    let output_path = analyze
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.output));
    let output = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };
    report::write_report(&output, &output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Analysis Summary:");
    println!("   SPDI index: {}", report::format_index(Some(report.spdi_index)));
    println!("   Indicators: {}", report.metadata.total_indicators);
    if !state.document_ids().is_empty() {
        println!(
            "   Document IDs: {}",
            report::format_document_ids(state.document_ids())
        );
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Report saved to: {}", output_path.display());

    if let Some(ref warning) = outcome.warning {
        eprintln!("\n⚠️  {}", warning);
        if analyze.fail_on_partial {
            return Ok(2);
        }
    }

    Ok(0)
}

async fn run_history(history: &HistoryArgs, config: &Config) -> Result<i32> {
    let api = api_client(config)?;
    let query = HistoryQuery {
        page: history.page,
        page_size: history.page_size.unwrap_or(config.history.page_size),
        start_date: history.start_date,
        end_date: history.end_date,
        min_score: history.min_score,
        max_score: history.max_score,
        sort_by: history.sort_by,
        sort_order: history.sort_order,
    };

    let page = api
        .list_documents(&query)
        .await
        .context("Failed to load document history")?;

    let output = match history.format.unwrap_or(config.general.format) {
        OutputFormat::Json => report::generate_json_report(&page)?,
        OutputFormat::Markdown => report::generate_history_markdown(&page, &query),
    };
    println!("{}", output);
    Ok(0)
}

async fn run_edit(id: i64, key: &str, score: u8, reasoning: &str, config: &Config) -> Result<i32> {
    let api = api_client(config)?;
    let mut document = api
        .get_document(id)
        .await
        .with_context(|| format!("Failed to load document {}", id))?;
    if !document.indicators.contains_key(key) {
        bail!("Document {} has no indicator {}", id, key);
    }

    let update = IndicatorUpdate {
        score,
        reasoning: reasoning.to_string(),
    };
    let response = api
        .update_indicator(id, key, &update)
        .await
        .with_context(|| format!("Failed to update indicator {}", key))?;
    document.apply_update(key, &update, response.updated_spdi_index);

    println!("✅ Updated {} on document {} to {}/4", key, id, score);
    println!(
        "   SPDI index: {}",
        report::format_index(document.spdi_index())
    );
    Ok(0)
}

fn api_client(config: &Config) -> Result<EsgApiClient> {
    EsgApiClient::new(&config.api.base_url, config.api.timeout())
        .with_context(|| format!("Invalid API URL: {}", config.api.base_url))
}

fn identity_client(config: &Config) -> Result<Option<IdentityClient>> {
    let Some(ref secret_key) = config.identity.secret_key else {
        return Ok(None);
    };
    let client = IdentityClient::new(
        &config.identity.base_url,
        secret_key.clone(),
        config.api.timeout(),
    )
    .with_context(|| format!("Invalid identity URL: {}", config.identity.base_url))?;
    Ok(Some(client))
}

fn admin(identity: Option<IdentityClient>, config: &Config) -> Result<Admin> {
    let identity =
        identity.context("Identity provider is not configured (set CLERK_SECRET_KEY)")?;
    Ok(Admin::new(identity, config.identity.user_id.clone()))
}

/// Resolve the signed-in account, anonymous when none is configured.
async fn load_session(identity: Option<&IdentityClient>, config: &Config) -> Result<Session> {
    let Some(user_id) = config.identity.user_id.as_deref() else {
        return Ok(Session::anonymous());
    };
    let Some(identity) = identity else {
        warn!("ESG_USER_ID is set but no identity secret key is configured; continuing anonymously");
        return Ok(Session::anonymous());
    };

    let user = identity
        .get_user(user_id)
        .await
        .with_context(|| format!("Failed to load account {}", user_id))?;
    debug!("Signed in as {}", user.display_name());
    Ok(Session::for_user(&user))
}

/// Where the effective configuration came from.
enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems with the default
/// location are reported on stderr.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), ConfigSource::Defaults))
        }
    }
}
