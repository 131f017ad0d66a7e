use anyhow::Result;
use clap::{Parser, Subcommand};
use jira_git_helper::commands::{self, shell::Shell, Context, Exit, DEFAULT_MAX_RESULTS};

#[derive(Parser, Debug)]
#[command(name = "jg")]
#[command(about = "Manage JIRA ticket context for git workflows")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the current JIRA ticket, or browse interactively if no ticket given
    Set {
        ticket: Option<String>,

        /// Raw JQL override; bypasses all filters and project config for this run
        #[arg(long)]
        jql: Option<String>,

        /// Max results to fetch
        #[arg(long = "max", default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },

    /// Clear the current JIRA ticket
    Clear,

    /// Print the version
    Version,

    /// Switch to a ticket branch interactively, or create one with the given name
    Branch {
        name: Option<String>,

        /// Browse all branches for the configured projects and set the active ticket
        #[arg(long)]
        all: bool,
    },

    /// Interactively stage and unstage files
    Add,

    /// Run configured formatters against changed files, or manage them
    Fmt {
        #[command(subcommand)]
        command: Option<FmtCommand>,
    },

    /// Push the current branch and open any linked open PR in the browser
    Push,

    /// Switch to the default branch and pull latest from origin
    Reset,

    /// Rebase the current branch onto the latest default branch from origin
    Sync,

    /// Interactively prune local branches with no remote
    Prune,

    /// Commit with the message prefixed by the current ticket
    Commit {
        message: String,

        /// Extra arguments passed to git commit
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        git_args: Vec<String>,
    },

    /// Dump the non-empty raw fields of a ticket
    Debug { ticket: String },

    /// Show details for the current (or given) ticket
    Info { ticket: Option<String> },

    /// Open the current (or given) ticket in the browser
    Open { ticket: Option<String> },

    /// Browse pull requests linked to the current (or given) ticket
    Prs { ticket: Option<String> },

    /// Get and set configuration values
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Print the shell hook that sets JG_TICKET in the current shell
    Hook {
        #[arg(long, value_enum, default_value_t = Shell::Fish)]
        shell: Shell,
    },

    /// Configure fish/tide prompt integration
    Setup,
}

#[derive(Subcommand, Debug)]
enum FmtCommand {
    /// Add a new formatter (prompts for glob and command)
    Add { name: Option<String> },
    /// List all configured formatters
    List,
    /// Delete a formatter by name
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values, named filters and formatters
    List,
}

async fn run(command: Option<Command>) -> Result<()> {
    let mut ctx = Context::load()?;
    let Some(command) = command else {
        return commands::ticket::show(&ctx);
    };

    match command {
        Command::Set {
            ticket,
            jql,
            max_results,
        } => commands::ticket::set(&mut ctx, ticket, jql, max_results).await,
        Command::Clear => commands::ticket::clear(&ctx),
        Command::Version => {
            println!("jg {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Branch { name, all } => commands::branch::run(&mut ctx, name, all).await,
        Command::Add => commands::stage::add(&mut ctx).await,
        Command::Fmt { command } => match command {
            None => commands::fmt::run(&ctx),
            Some(FmtCommand::Add { name }) => commands::fmt::add(&mut ctx, name),
            Some(FmtCommand::List) => commands::fmt::list(&ctx),
            Some(FmtCommand::Delete { name }) => commands::fmt::delete(&mut ctx, &name),
        },
        Command::Push => commands::stage::push(&mut ctx).await,
        Command::Reset => commands::sync::reset(&ctx),
        Command::Sync => commands::sync::sync(&ctx),
        Command::Prune => commands::sync::prune(&ctx).await,
        Command::Commit { message, git_args } => {
            commands::stage::commit_with_ticket(&ctx, &message, &git_args)
        }
        Command::Debug { ticket } => commands::ticket::debug(&ctx, &ticket).await,
        Command::Info { ticket } => commands::ticket::info(&ctx, ticket).await,
        Command::Open { ticket } => commands::ticket::open(&ctx, ticket),
        Command::Prs { ticket } => commands::ticket::prs(&mut ctx, ticket).await,
        Command::Config { command } => match command {
            ConfigCommand::Get { key } => commands::config::get(&ctx, &key),
            ConfigCommand::Set { key, value } => commands::config::set(&mut ctx, &key, &value),
            ConfigCommand::List => commands::config::list(&ctx),
        },
        Command::Hook { shell } => commands::shell::hook(&ctx, shell),
        Command::Setup => commands::shell::setup(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries command output (`jg` prints the bare ticket), so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jira_git_helper=warn".parse()?),
        )
        .init();

    if let Err(err) = run(args.command).await {
        match err.downcast_ref::<Exit>() {
            Some(Exit(message)) if message.is_empty() => {}
            Some(Exit(message)) => eprintln!("{message}"),
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
    Ok(())
}
