use anyhow::{Result, anyhow};
use clap::Parser;
use mta_client::clients::base::{
    CachingTokenFactory, CfCliTokenSource, Connection, StaticTokenFactory, TokenFactory,
};
use mta_client::clients::{ClientFactory, DefaultClientFactory};
use mta_client::commands;
use mta_client::config::{Snapshot, deploy_service_url};
use mta_client::http::CsrfTransport;
use mta_client::runtime::{RealRuntime, Runtime};
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;

/// mta-client - talk to the MultiApps deploy service
///
/// Lists deployed multi-target apps and their operations, reads operation
/// logs and drives running operations.
///
/// Without --token the access token is taken from `cf oauth-token`.
///
/// Examples:
///   mta-client --cf-api https://api.cf.example.com --space-guid <GUID> mtas
///   mta-client -u deploy-service.cf.example.com --org o --space s purge-mta-config
#[derive(Parser, Debug)]
#[command(name = "mta-client", author, version = env!("MTA_CLIENT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Deploy service URL (also via MULTIAPPS_CONTROLLER_URL; defaults to deploy-service.<domain of --cf-api>)
    #[arg(short = 'u', long = "url", value_name = "URL", global = true)]
    pub url: Option<String>,

    /// Cloud Foundry API URL the deploy service URL is derived from
    #[arg(long = "cf-api", value_name = "URL", global = true)]
    pub cf_api: Option<String>,

    /// Organization name
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Space name
    #[arg(long, global = true)]
    pub space: Option<String>,

    /// Space GUID
    #[arg(long = "space-guid", value_name = "GUID", global = true)]
    pub space_guid: Option<String>,

    /// Access token sent as a bearer token
    #[arg(
        long,
        env = "MULTIAPPS_ACCESS_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub token: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Purge configuration entries of deleted applications (needs --org and --space)
    PurgeMtaConfig,

    /// List deployed multi-target apps (needs --space-guid)
    Mtas,

    /// Show one deployed multi-target app (needs --space-guid)
    Mta(MtaArgs),

    /// List multi-target app operations (needs --space-guid)
    MtaOps(MtaOpsArgs),

    /// Print the logs of an operation (needs --space-guid)
    MtaOpLogs(MtaOpLogsArgs),

    /// Execute an action on an operation (needs --space-guid)
    Action(ActionArgs),

    /// Show deploy service information
    Info,
}

#[derive(clap::Args, Debug)]
pub struct MtaArgs {
    /// Multi-target app ID
    #[arg(value_name = "MTA_ID")]
    pub mta_id: String,

    /// Namespace the multi-target app was deployed with
    #[arg(long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct MtaOpsArgs {
    /// Only operations of this multi-target app
    #[arg(long = "mta", value_name = "MTA_ID")]
    pub mta_id: Option<String>,

    /// The last N operations in any state
    #[arg(long, value_name = "N")]
    pub last: Option<u32>,

    /// All operations in any state
    #[arg(long, conflicts_with = "last")]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct MtaOpLogsArgs {
    /// Operation ID
    #[arg(short = 'i', long = "operation-id", value_name = "ID")]
    pub operation_id: String,

    /// Print only this log
    #[arg(long, value_name = "LOG_ID")]
    pub log: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ActionArgs {
    /// Operation ID
    #[arg(short = 'i', long = "operation-id", value_name = "ID")]
    pub operation_id: String,

    /// Action to execute (abort, retry, resume)
    #[arg(short = 'a', long = "action", value_name = "ACTION")]
    pub action: String,
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("--{} is required for this command", flag))
}

fn log_filter() -> &'static str {
    match std::env::var("DEBUG").as_deref() {
        Ok("1") => "trace",
        _ => "warn",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter()))
        .init();
    let cli = Cli::parse();
    let runtime: Arc<dyn Runtime> = Arc::new(RealRuntime);

    let snapshot = Snapshot::load(runtime.as_ref());
    let host = deploy_service_url(cli.url.as_deref(), &snapshot, cli.cf_api.as_deref())?;

    let token_factory: Arc<dyn TokenFactory> = match &cli.token {
        Some(token) => Arc::new(StaticTokenFactory::new(token.clone())),
        None => Arc::new(CachingTokenFactory::new(CfCliTokenSource::new(
            Arc::clone(&runtime),
        ))),
    };

    // The CSRF session cookies and the API calls share one jar
    let jar: Arc<dyn CookieStore> = Arc::new(Jar::default());
    let csrf = CsrfTransport::new(None, Some(Arc::clone(&jar)));
    let connection = Connection::new(host, token_factory)
        .with_round_tripper(Arc::new(csrf))
        .with_jar(jar)
        .with_user_agent(snapshot.user_agent());
    let factory = DefaultClientFactory::new();

    match &cli.command {
        Commands::PurgeMtaConfig => {
            let org = required(&cli.org, "org")?;
            let space = required(&cli.space, "space")?;
            let client = factory.new_rest_client(&connection, org, space);
            commands::purge_mta_config(client.as_ref(), org, space).await?
        }
        Commands::Mtas => {
            let client =
                factory.new_mta_v2_client(&connection, required(&cli.space_guid, "space-guid")?);
            commands::mtas(client.as_ref()).await?
        }
        Commands::Mta(args) => {
            let client =
                factory.new_mta_v2_client(&connection, required(&cli.space_guid, "space-guid")?);
            let namespace = args.namespace.as_deref().filter(|ns| !ns.is_empty());
            commands::mta(client.as_ref(), &args.mta_id, namespace).await?
        }
        Commands::MtaOps(args) => {
            let client = factory.new_mta_client(&connection, required(&cli.space_guid, "space-guid")?);
            commands::mta_ops(client.as_ref(), args.mta_id.clone(), args.last, args.all).await?
        }
        Commands::MtaOpLogs(args) => {
            let client = factory.new_mta_client(&connection, required(&cli.space_guid, "space-guid")?);
            commands::mta_op_logs(client.as_ref(), &args.operation_id, args.log.as_deref())
                .await?
        }
        Commands::Action(args) => {
            let client = factory.new_mta_client(&connection, required(&cli.space_guid, "space-guid")?);
            commands::action(client.as_ref(), &args.operation_id, &args.action).await?
        }
        Commands::Info => {
            let client = factory.new_management_mta_client(&connection);
            commands::info(client.as_ref()).await?
        }
    }
    Ok(())
}
