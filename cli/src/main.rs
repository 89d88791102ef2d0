mod chat;
mod render;

use clap::{Args, Parser, Subcommand};
use client::config::{ConfigError, parse_auth_mode};
use client::{ApiClient, ApiError, StudioConfig};
use frames::AuthMode;
use futures::StreamExt;
use records::{
    LogFilter, default_agents, filter_log_events, format_log_event, sort_deployments_by_timestamp,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credentials rejected: {0}")]
    AuthRejected(String),
}

#[derive(Parser, Debug)]
#[command(name = "studio", about = "HiveMind Studio terminal client")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

/// Overrides applied on top of the `HIVEMIND_*` environment.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    #[arg(long, global = true, env = "HIVEMIND_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_WS_URL")]
    ws_url: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_AGENT")]
    agent: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_AUTH_MODE", value_parser = parse_auth_mode)]
    auth_mode: Option<AuthMode>,

    #[arg(long, global = true, env = "HIVEMIND_REGION")]
    region: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_PROFILE")]
    profile: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    #[arg(long, global = true, env = "HIVEMIND_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with an agent; falls back to canned replies while offline.
    Chat,
    /// List the agent roster.
    Agents,
    Deployments(DeploymentsCommand),
    Logs(LogsCommand),
    Auth(AuthCommand),
}

#[derive(Args, Debug)]
struct DeploymentsCommand {
    #[command(subcommand)]
    command: DeploymentsSubcommand,
}

#[derive(Subcommand, Debug)]
enum DeploymentsSubcommand {
    /// Deployments, newest first.
    List,
    /// Recorded resource events of one deployment.
    Events { deployment_id: String },
    /// Follow live events until the stack settles.
    Watch { deployment_id: String },
}

#[derive(Args, Debug)]
struct LogsCommand {
    #[command(subcommand)]
    command: LogsSubcommand,
}

#[derive(Subcommand, Debug)]
enum LogsSubcommand {
    Groups {
        #[arg(long)]
        region: Option<String>,
    },
    Events(LogQueryArgs),
    /// Follow a log group live.
    Tail(LogQueryArgs),
}

#[derive(Args, Debug)]
struct LogQueryArgs {
    group: String,

    /// Case-insensitive substring match on the message.
    #[arg(long, default_value = "")]
    keyword: String,

    /// Inclusive lower bound, epoch milliseconds.
    #[arg(long)]
    start: Option<i64>,

    /// Inclusive upper bound, epoch milliseconds.
    #[arg(long)]
    end: Option<i64>,
}

impl LogQueryArgs {
    fn filter(&self) -> LogFilter {
        LogFilter {
            keyword: self.keyword.clone(),
            start_time: self.start,
            end_time: self.end,
            log_group_name: self.group.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
enum AuthSubcommand {
    /// Check the configured credentials against the backend.
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = apply_overrides(StudioConfig::from_env()?, cli.connection)?;

    match cli.command {
        Command::Chat => chat::run_chat(&config).await,
        Command::Agents => run_agents(&config).await,
        Command::Deployments(deployments) => run_deployments(&config, deployments).await,
        Command::Logs(logs) => run_logs(&config, logs).await,
        Command::Auth(auth) => run_auth(&config, auth).await,
    }
}

/// Layer explicit flags over the environment-derived config.
fn apply_overrides(
    mut config: StudioConfig,
    args: ConnectionArgs,
) -> Result<StudioConfig, ConfigError> {
    if let Some(base_url) = args.base_url {
        let rebased = StudioConfig::new(&base_url)?;
        config.base_url = rebased.base_url;
        config.chat_url = rebased.chat_url;
    }
    if let Some(ws_url) = args.ws_url {
        config.chat_url = ws_url;
    }
    if let Some(agent) = args.agent {
        config.agent_id = agent;
    }
    if let Some(mode) = args.auth_mode {
        config.auth.auth_mode = mode;
    }
    if let Some(region) = args.region {
        config.auth.region = region;
    }
    if args.profile.is_some() {
        config.auth.profile = args.profile;
    }
    if args.access_key_id.is_some() {
        config.auth.access_key_id = args.access_key_id;
    }
    if args.secret_access_key.is_some() {
        config.auth.secret_access_key = args.secret_access_key;
    }
    if args.session_token.is_some() {
        config.auth.session_token = args.session_token;
    }
    Ok(config)
}

async fn run_agents(config: &StudioConfig) -> Result<(), CliError> {
    let api = ApiClient::new(&config.base_url)?;
    let agents = match api.fetch_agents().await {
        Ok(agents) => agents,
        Err(e) => {
            tracing::warn!(error = %e, "agent directory unavailable; showing built-in roster");
            default_agents()
        }
    };
    for agent in &agents {
        println!("{}", render::agent_line(agent));
    }
    Ok(())
}

async fn run_deployments(
    config: &StudioConfig,
    deployments: DeploymentsCommand,
) -> Result<(), CliError> {
    let api = ApiClient::new(&config.base_url)?;
    match deployments.command {
        DeploymentsSubcommand::List => {
            let records = api.fetch_deployments().await?;
            for record in sort_deployments_by_timestamp(&records) {
                println!("{}", render::deployment_line(&record));
            }
        }
        DeploymentsSubcommand::Events { deployment_id } => {
            for event in api.fetch_deployment_events(&deployment_id).await? {
                println!("{}", render::deployment_event_line(&event));
            }
        }
        DeploymentsSubcommand::Watch { deployment_id } => {
            let mut feed = api.subscribe_deployment_events(&deployment_id).await?;
            while let Some(event) = feed.next().await {
                println!("{}", render::deployment_event_line(&event));
                if event.ends_stack() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn run_logs(config: &StudioConfig, logs: LogsCommand) -> Result<(), CliError> {
    let api = ApiClient::new(&config.base_url)?;
    match logs.command {
        LogsSubcommand::Groups { region } => {
            let region = region.unwrap_or_else(|| config.auth.region.clone());
            for group in api.fetch_log_groups(Some(region.as_str())).await? {
                println!("{}", render::log_group_line(&group));
            }
        }
        LogsSubcommand::Events(query) => {
            let filter = query.filter();
            let events = api.fetch_log_events(&filter).await?;
            for event in filter_log_events(&events, &filter) {
                println!("{}", format_log_event(event));
            }
        }
        LogsSubcommand::Tail(query) => {
            let filter = query.filter();
            let mut feed = api.subscribe_log_stream(&filter.log_group_name).await?;
            while let Some(event) = feed.next().await {
                if filter.matches(&event) {
                    println!("{}", format_log_event(&event));
                }
            }
            tracing::info!(group = %filter.log_group_name, "log stream closed");
        }
    }
    Ok(())
}

async fn run_auth(config: &StudioConfig, auth: AuthCommand) -> Result<(), CliError> {
    match auth.command {
        AuthSubcommand::Validate => {
            let api = ApiClient::new(&config.base_url)?;
            let validation = api.validate_auth(&config.auth).await?;
            if !validation.ok {
                return Err(CliError::AuthRejected(validation.message));
            }
            println!("ok: {}", validation.message);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;
