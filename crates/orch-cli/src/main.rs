use anyhow::Result;
use clap::{Parser, Subcommand};

use orch_cli::commands::{self, db, repo, run};

#[derive(Parser)]
#[command(name = "orch")]
#[command(about = "Durable run orchestrator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Repository registration and listing
    Repo {
        #[command(subcommand)]
        cmd: RepoCmd,
    },

    /// Run submission and inspection
    Run {
        #[command(subcommand)]
        cmd: RunCmd,
    },

    /// Print aggregate run counts by status
    Stats,
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    Migrate,
}

#[derive(Subcommand)]
enum RepoCmd {
    /// Register a new repo with the control plane
    Register {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        #[arg(long = "default-branch")]
        default_branch: Option<String>,
        #[arg(long = "config-path")]
        config_path: Option<String>,
    },
    /// List registered repos
    List,
}

#[derive(Subcommand)]
enum RunCmd {
    /// Submit a run for an issue in a registered repo
    Submit {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        issue: i64,
        #[arg(long)]
        requestor: String,
        #[arg(long = "pr-mode", default_value = "draft")]
        pr_mode: String,
        #[arg(long)]
        goal: Option<String>,
        /// Idempotency key; a fresh one is generated when omitted
        #[arg(long = "idempotency-key")]
        idempotency_key: Option<String>,
    },
    /// Fetch a run by id
    Get {
        id: String,
    },
    /// List runs, optionally filtered
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    orch_config::bootstrap_dotenv();
    init_tracing();

    let cli = Cli::parse();
    let client = commands::CliClient::from_env()?;

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => db::status().await?,
            DbCmd::Migrate => db::migrate().await?,
        },
        Commands::Repo { cmd } => match cmd {
            RepoCmd::Register {
                owner,
                name,
                default_branch,
                config_path,
            } => repo::register(&client, owner, name, default_branch, config_path).await?,
            RepoCmd::List => repo::list(&client).await?,
        },
        Commands::Run { cmd } => match cmd {
            RunCmd::Submit {
                owner,
                name,
                issue,
                requestor,
                pr_mode,
                goal,
                idempotency_key,
            } => run::submit(&client, owner, name, issue, requestor, pr_mode, goal, idempotency_key).await?,
            RunCmd::Get { id } => run::get(&client, &id).await?,
            RunCmd::List { status, repo, limit } => run::list(&client, status, repo, limit).await?,
        },
        Commands::Stats => run::stats(&client).await?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
}
