//! Git commit automation CLI.
//!
//! Creates commits that touch a marker file and pushes them to `origin`,
//! manages the persisted configuration and reports contribution statistics
//! from local history or the GitHub API.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use autocommit::commit::{CommitOrchestrator, ThreadSleeper};
use autocommit::core::plan::CommitPlan;
use autocommit::core::schedule::{Distribution, Frequency, plan_bulk, plan_schedule};
use autocommit::exit_codes;
use autocommit::io::config::ConfigStore;
use autocommit::io::git::Git;
use autocommit::io::github::{GitHubClient, resolve_credentials};
use autocommit::logging;
use autocommit::render;
use autocommit::report::ConsoleReporter;
use autocommit::stats::{local_stats, remote_stats};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "autocommit",
    version,
    about = "Automated commits with push recovery and contribution stats"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store GitHub credentials in the config file.
    Setup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        token: String,
    },
    /// Create and push commits on the current branch.
    QuickCommit(QuickCommitArgs),
    /// Show, back up, restore or reset the configuration.
    Config(ConfigArgs),
    /// Manage the pool of random commit messages.
    CustomizeMessages(MessageArgs),
    /// Commit statistics from local history or GitHub.
    Stats {
        /// Trailing window in days.
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Aggregate across all repositories of the configured GitHub user.
        #[arg(long)]
        remote: bool,
        /// Repository for local stats (defaults to the current directory).
        #[arg(long, value_name = "PATH")]
        repo: Option<PathBuf>,
    },
    /// Describe a recurring commit schedule as a cron expression.
    Schedule {
        #[arg(long, value_enum)]
        frequency: FrequencyArg,
        /// Cron expression, required with `--frequency custom`.
        #[arg(long, required_if_eq("frequency", "custom"))]
        cron: Option<String>,
        /// Commits per scheduled run.
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Describe how a number of commits would be spread over days.
    Bulk {
        #[arg(long)]
        total: u32,
        #[arg(long)]
        days: u32,
        #[arg(long, value_enum, default_value_t = PatternArg::Even)]
        pattern: PatternArg,
    },
}

#[derive(Args)]
struct QuickCommitArgs {
    /// Number of commit+push cycles.
    #[arg(long, default_value_t = 1, conflicts_with = "pattern")]
    count: u32,
    /// Seconds to wait between cycles.
    #[arg(long, default_value_t = 0)]
    delay: u64,
    /// Use this message for every commit instead of a random one.
    #[arg(long)]
    message: Option<String>,
    /// Show what would be committed without touching the repository.
    #[arg(long)]
    dry_run: bool,
    /// Take the commit count from a named range in `commit_patterns`.
    #[arg(long, value_name = "NAME")]
    pattern: Option<String>,
    /// Repository to commit in (defaults to the current directory).
    #[arg(long, value_name = "PATH")]
    repo: Option<PathBuf>,
}

#[derive(Args)]
#[group(multiple = false)]
struct ConfigArgs {
    /// Print the configuration with the token masked (default).
    #[arg(long)]
    show: bool,
    /// Write a timestamped backup next to the config file.
    #[arg(long)]
    backup: bool,
    /// Replace the configuration with a backup file.
    #[arg(long, value_name = "PATH")]
    restore: Option<PathBuf>,
    /// Recreate the configuration with defaults.
    #[arg(long)]
    reset: bool,
    /// List backup files, newest first.
    #[arg(long)]
    list_backups: bool,
    /// Print the raw JSON value of one key.
    #[arg(long, value_name = "KEY")]
    get: Option<String>,
    /// Set one key; VALUE is parsed as JSON, falling back to a plain string.
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
    set: Option<Vec<String>>,
}

#[derive(Args)]
#[group(multiple = false)]
struct MessageArgs {
    /// Print the numbered message pool (default).
    #[arg(long)]
    list: bool,
    #[arg(long, value_name = "MESSAGE")]
    add: Option<String>,
    /// Replace the message at a 1-based position.
    #[arg(long, num_args = 2, value_names = ["POSITION", "MESSAGE"])]
    edit: Option<Vec<String>>,
    /// Remove the message at a 1-based position.
    #[arg(long, value_name = "POSITION")]
    remove: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FrequencyArg {
    Hourly,
    Daily,
    Weekly,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PatternArg {
    Even,
    Random,
    FrontLoaded,
    BackLoaded,
}

impl From<PatternArg> for Distribution {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Even => Distribution::Even,
            PatternArg::Random => Distribution::Random,
            PatternArg::FrontLoaded => Distribution::FrontLoaded,
            PatternArg::BackLoaded => Distribution::BackLoaded,
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = ConfigStore::from_env()?;
    match cli.command {
        Command::Setup { username, token } => cmd_setup(&store, &username, &token),
        Command::QuickCommit(args) => cmd_quick_commit(&store, args),
        Command::Config(args) => cmd_config(&store, args),
        Command::CustomizeMessages(args) => cmd_messages(&store, args),
        Command::Stats { days, remote, repo } => cmd_stats(&store, days, remote, repo.as_deref()),
        Command::Schedule {
            frequency,
            cron,
            count,
        } => cmd_schedule(&store, frequency, cron, count),
        Command::Bulk {
            total,
            days,
            pattern,
        } => cmd_bulk(total, days, pattern),
    }
}

fn cmd_setup(store: &ConfigStore, username: &str, token: &str) -> Result<()> {
    store.set_credentials(username, token)?;
    println!("credentials saved to {}", store.path().display());
    Ok(())
}

fn cmd_quick_commit(store: &ConfigStore, args: QuickCommitArgs) -> Result<()> {
    let config = store.load();
    let mut rng = rand::thread_rng();
    let count = match &args.pattern {
        Some(name) => {
            let pattern = config
                .commit_patterns
                .get(name)
                .with_context(|| format!("no commit pattern named {name:?} in config"))?;
            pattern.validate(name)?;
            pattern.sample(&mut rng)
        }
        None => args.count,
    };
    let plan = CommitPlan {
        count,
        delay_secs: args.delay,
        message: args.message,
        dry_run: args.dry_run,
    };
    let git = open_repo(args.repo.as_deref())?;
    CommitOrchestrator::new(&git).run(
        &config,
        &plan,
        &mut ConsoleReporter,
        &ThreadSleeper,
        &mut rng,
    )?;
    Ok(())
}

fn cmd_config(store: &ConfigStore, args: ConfigArgs) -> Result<()> {
    if args.backup {
        let path = store.backup()?;
        println!("backup written to {}", path.display());
    } else if let Some(path) = args.restore {
        store.restore(&path)?;
        println!("configuration restored from {}", path.display());
    } else if args.reset {
        store.reset()?;
        println!("configuration reset to defaults");
    } else if args.list_backups {
        print!("{}", render::render_backups(&store.list_backups()?));
    } else if let Some(key) = args.get {
        let value = store
            .get(&key)
            .ok_or_else(|| anyhow!("no config key named {key:?}"))?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if let Some(pair) = args.set {
        let [key, raw] = pair.as_slice() else {
            bail!("--set expects KEY VALUE");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        store.set(key, value)?;
        println!("{key} updated");
    } else {
        print!("{}", render::render_config(&store.load()));
    }
    Ok(())
}

fn cmd_messages(store: &ConfigStore, args: MessageArgs) -> Result<()> {
    if let Some(text) = args.add {
        store.add_message(&text)?;
        println!("message added ({} total)", store.messages().len());
    } else if let Some(pair) = args.edit {
        let [position, text] = pair.as_slice() else {
            bail!("--edit expects POSITION MESSAGE");
        };
        let position: usize = position
            .parse()
            .with_context(|| format!("invalid position {position:?}"))?;
        let old = store.edit_message(position, text)?;
        println!("message {position} changed from {old:?}");
    } else if let Some(position) = args.remove {
        let removed = store.remove_message(position)?;
        println!("removed message {position}: {removed}");
    } else {
        print!("{}", render::render_messages(&store.messages()));
    }
    Ok(())
}

fn cmd_stats(store: &ConfigStore, days: u32, remote: bool, repo: Option<&Path>) -> Result<()> {
    if remote {
        let creds = resolve_credentials(&store.load()).context(
            "GitHub credentials not configured (run `autocommit setup` or set GITHUB_USERNAME and GITHUB_TOKEN)",
        )?;
        let client = GitHubClient::new(creds.token);
        let stats = remote_stats(&client, &creds.username, days, Utc::now(), &mut ConsoleReporter)?;
        print!(
            "{}",
            render::render_remote_stats(&stats, Local::now().date_naive())
        );
    } else {
        let git = open_repo(repo)?;
        let stats = local_stats(&git, days, &Local::now())?;
        print!("{}", render::render_local_stats(&stats));
    }
    Ok(())
}

fn cmd_schedule(
    store: &ConfigStore,
    frequency: FrequencyArg,
    cron: Option<String>,
    count: u32,
) -> Result<()> {
    let frequency = match frequency {
        FrequencyArg::Hourly => Frequency::Hourly,
        FrequencyArg::Daily => Frequency::Daily,
        FrequencyArg::Weekly => Frequency::Weekly,
        FrequencyArg::Custom => Frequency::Custom(cron.context("--cron is required")?),
    };
    let config = store.load();
    let plan = plan_schedule(&frequency, config.schedule.as_ref(), count)?;
    print!("{}", render::render_schedule(&plan));
    Ok(())
}

fn cmd_bulk(total: u32, days: u32, pattern: PatternArg) -> Result<()> {
    let plan = plan_bulk(total, days, pattern.into(), &mut rand::thread_rng())?;
    print!("{}", render::render_bulk(&plan));
    Ok(())
}

fn open_repo(repo: Option<&Path>) -> Result<Git> {
    match repo {
        Some(path) => Git::open(path),
        None => Git::open(std::env::current_dir().context("resolve current directory")?),
    }
}
