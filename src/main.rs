use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{debug, warn};

use c3po::commands::{self, GetOptions, GetPlan};
use c3po::config::Config;
use c3po::keystone::KeystoneClient;
use c3po::security::{TokenManager, TokenSource};
use c3po::transport::HttpTransport;
use c3po::utils;

#[derive(Parser)]
#[command(name = "c3po", version, about = "Keystone role and group lookup client")]
struct AppCli {
    /// Verbose diagnostics (credentials stay masked)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file path (JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Token cache file
    #[arg(long, global = true)]
    token_cache: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up roles or groups
    Get(GetArgs),
}

#[derive(Args)]
struct GetArgs {
    /// Role/Studio Name. Without 'C3PO - '
    #[arg(short, long)]
    role: Option<String>,

    /// Group Name, without the 'C3PO - ' prefix
    #[arg(short, long)]
    group: Option<String>,

    /// Nimbus Folder Name which is known as application name
    #[arg(short, long = "nimbusfolder")]
    nimbusfolder: Option<String>,

    /// HUBID
    #[arg(short, long = "userid")]
    userid: Option<String>,

    /// Groups where I am an approval manager or just a member
    #[arg(long = "mygroup")]
    mygroup: bool,

    /// Whole-name match instead of first substring match
    #[arg(long)]
    exact: bool,

    /// Sort results by display name
    #[arg(long)]
    sort: bool,

    /// Include each role's functional abilities
    #[arg(long)]
    abilities: bool,
}

impl From<GetArgs> for GetOptions {
    fn from(args: GetArgs) -> Self {
        GetOptions {
            role: args.role,
            group: args.group,
            nimbus_folder: args.nimbusfolder,
            user_id: args.userid,
            my_group: args.mygroup,
            exact: args.exact,
            sort: args.sort,
            abilities: args.abilities,
        }
    }
}

fn load_config(args: &AppCli) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if args.insecure {
        config.insecure_skip_verify = true;
    }
    if let Some(path) = &args.token_cache {
        config.token_cache_path = path.clone();
    }
    Ok(config)
}

fn run_get(config: Config, opts: GetOptions) -> Result<()> {
    if opts.plan()? == GetPlan::Nothing {
        println!("No RoleName!");
        return Ok(());
    }

    let transport = HttpTransport::from_config(&config).context("creating keystone transport")?;
    let manager = TokenManager::new(&transport, &config);

    let auth = manager
        .ensure_token(commands::credentials::resolve)
        .context("keystone authentication")?;
    for warning in &auth.warnings {
        warn!("{warning}");
    }
    match auth.source {
        TokenSource::Cache => {
            let at = auth
                .cached_at
                .map(|t| format!(" ({})", t.format("%Y-%m-%d %H:%M:%S UTC")))
                .unwrap_or_default();
            println!(
                "Last authenticated : {} minute(s) ago{at}",
                auth.cached_minutes_ago.unwrap_or(0)
            );
        }
        TokenSource::Handshake => debug!(token = %auth.token, "new access token"),
    }

    let client = KeystoneClient::new(&transport, config).with_token(auth.token);
    let stdout = std::io::stdout();
    commands::get::run(&client, &opts, &mut stdout.lock())
}

fn main() -> Result<()> {
    let args = AppCli::parse();
    utils::logging::init(args.debug);

    let config = load_config(&args)?;
    debug!(base_url = %config.base_url, version = c3po::VERSION, "configuration loaded");

    match args.command {
        Some(Commands::Get(get)) => run_get(config, get.into())?,
        None => AppCli::command().print_help()?,
    }

    Ok(())
}
