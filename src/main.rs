use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;

use cli::Cli;
use cli::commands::{Commands, ContextArgs};
use lti_resolver::config::Config;
use lti_resolver::domain::Placement;
use lti_resolver::history::{HistoryRequest, MessageHistory, Permission, Requester};
use lti_resolver::store::{Fixture, SqliteStore};
use lti_resolver::{Error, ToolResolver};

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lti-resolver")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("lti-resolver.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_store(cli: &Cli, config: &Config) -> Result<SqliteStore> {
    let path = cli.database.as_ref().unwrap_or(&config.storage.database_path);
    if cli.is_verbose() {
        println!("{} {}", "Database:".yellow(), path.display());
    }
    SqliteStore::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Import { path } => handle_import_command(path, cli, config),
        Commands::Resolve {
            vendor,
            product,
            resource_type,
            message_type,
            context,
        } => handle_resolve_command(vendor, product, resource_type, message_type.as_deref(), context, cli, config),
        Commands::Tabs {
            context,
            placements,
            args,
        } => handle_tabs_command(context, placements, args, cli, config),
        Commands::CheckUrl { handler, url } => handle_check_url_command(*handler, url, cli, config),
        Commands::History {
            user,
            domain_root_account,
            requester,
            site_admin,
            permissions,
            start,
            end,
            page,
            per_page,
        } => {
            let mut who = Requester::new(*requester);
            if *site_admin {
                who = who.site_admin();
            }
            for permission in permissions {
                who = who.granted(*permission);
            }
            let request = HistoryRequest {
                user_id: *user,
                domain_root_account_id: *domain_root_account,
                start_time: start.clone(),
                end_time: end.clone(),
                page: page.clone(),
                per_page: per_page.clone(),
            };
            handle_history_command(&who, &request, cli, config)
        }
    }
}

fn handle_import_command(path: &Path, cli: &Cli, config: &Config) -> Result<()> {
    info!("Importing fixture: {}", path.display());
    let fixture = Fixture::load(path).with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let mut store = open_store(cli, config)?;
    let summary = fixture.apply(&mut store).context("Failed to import fixture")?;

    println!(
        "{} {} tool proxies, {} message handlers, {} messages",
        "Imported:".green(),
        summary.tool_proxies,
        summary.message_handlers,
        summary.messages
    );
    if cli.is_verbose() {
        print_json(&summary)?;
    }
    Ok(())
}

fn handle_resolve_command(
    vendor: &str,
    product: &str,
    resource_type: &str,
    message_type: Option<&str>,
    context: &ContextArgs,
    cli: &Cli,
    config: &Config,
) -> Result<()> {
    let context = context.context()?;
    info!("Resolving {}/{}/{} from {}", vendor, product, resource_type, context);

    let store = open_store(cli, config)?;
    let resolver = ToolResolver::from_config(&store, config);
    let found = match message_type {
        Some(message_type) => {
            resolver.find_handler_for_message_type(vendor, product, resource_type, context, message_type)?
        }
        None => resolver.find_handler(vendor, product, resource_type, context)?,
    };

    match found {
        Some(handler) => {
            println!("{} message handler {}", "Found:".green(), handler.id);
            print_json(&handler)
        }
        None => {
            println!("{} no handler for {}/{}/{} from {}", "Not found:".red(), vendor, product, resource_type, context);
            Ok(())
        }
    }
}

fn handle_tabs_command(
    context: &ContextArgs,
    placements: &[Placement],
    args: &[(String, String)],
    cli: &Cli,
    config: &Config,
) -> Result<()> {
    let context = context.context()?;
    info!("Listing tabs for {} with placements {:?}", context, placements);

    let extra_args: BTreeMap<String, serde_json::Value> = args
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::from(v.as_str())))
        .collect();

    let store = open_store(cli, config)?;
    let tabs = ToolResolver::from_config(&store, config).list_ui_tabs(context, placements, &extra_args)?;
    print_json(&tabs)
}

fn handle_check_url_command(handler: i64, url: &str, cli: &Cli, config: &Config) -> Result<()> {
    info!("Checking {} against message handler {}", url, handler);
    let store = open_store(cli, config)?;

    if ToolResolver::from_config(&store, config).valid_resource_url(handler, url)? {
        println!("{} {}", "Valid:".green(), url);
    } else {
        println!("{} {}", "Invalid:".red(), url);
    }
    Ok(())
}

fn handle_history_command(requester: &Requester, request: &HistoryRequest, cli: &Cli, config: &Config) -> Result<()> {
    info!(
        "Listing messages for user {} (requester {}, permissions {:?})",
        request.user_id,
        requester.user_id,
        requester.account_grants.iter().map(Permission::as_str).collect::<Vec<_>>()
    );
    let store = open_store(cli, config)?;

    match MessageHistory::new(&store, config.history.clone()).list(requester, request) {
        Ok(page) => print_json(&page),
        Err(Error::Forbidden(reason)) => {
            println!("{} {}", "Forbidden:".red(), reason);
            eyre::bail!("not authorized to view messages for user {}", request.user_id)
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the configured level is known
    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
