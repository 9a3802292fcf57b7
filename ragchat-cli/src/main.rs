//! CLI entry point for ragchat

mod catalog;
mod chat;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, Password};
use ragchat_core::config::{Config, ConfigLoader, SelectionConfig};
use ragchat_core::logging::init_logging;
use ragchat_core::models::Role;
use ragchat_session::{SessionStore, StoreError};
use std::path::{Path, PathBuf};
use tracing::info;

use catalog::{ScenarioArgs, SourceArgs};
use chat::ChatOptions;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Terminal client for the ragchat retrieval chat backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the token in the config file
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Remove the stored token
    Logout,
    /// Manage chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Browse and create domains
    Domains {
        #[command(subcommand)]
        command: DomainCommands,
    },
    /// Browse and create sources
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// Browse and create scenarios
    Scenarios {
        #[command(subcommand)]
        command: ScenarioCommands,
    },
    /// Chat interactively, streaming answers as they arrive
    Chat {
        /// Continue an existing session instead of creating one
        #[arg(short, long)]
        session: Option<String>,
        /// Domain to query; its first scenario is selected automatically
        #[arg(short, long)]
        domain: Option<i64>,
        /// Scenario to use instead of the domain's first one
        #[arg(long)]
        scenario: Option<i64>,
    },
    /// Show configuration and login status
    Status,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List sessions
    List,
    /// Create an empty session
    New,
    /// Rename a session
    Rename { id: String, title: String },
    /// Delete a session
    Delete {
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Print a session's history
    Show { id: String },
}

#[derive(Subcommand)]
enum DomainCommands {
    /// List domains
    List {
        /// Fetch every page
        #[arg(short, long)]
        all: bool,
    },
    /// Show one domain
    Show { id: i64 },
    /// Create a domain over existing sources
    Create {
        title: String,
        /// Source id; repeat for several
        #[arg(short, long = "source", required = true)]
        sources: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum SourceCommands {
    /// List sources
    List,
    /// Create a source
    Create(SourceArgs),
}

#[derive(Subcommand)]
enum ScenarioCommands {
    /// List scenarios
    List {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Defaults to the configured page size
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one scenario
    Show { id: i64 },
    /// Create a scenario for a domain
    Create(ScenarioArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load().context("Failed to load configuration")?;

    config.logging.dir = resolve_log_dir(loader.config_dir(), &config.logging.dir);
    if matches!(cli.command, Commands::Chat { .. }) {
        // chat output owns the terminal; logs still go to the file
        config.logging.console = false;
    }
    let _log_guard = init_logging(&config.logging);

    let result = dispatch(cli.command, &loader, &config).await;
    if let Err(err) = &result {
        if err
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::needs_login)
        {
            eprintln!(
                "{} Run {} to sign in again.",
                style("Not authorized.").red().bold(),
                style("ragchat login").cyan()
            );
        }
    }
    result
}

async fn dispatch(command: Commands, loader: &ConfigLoader, config: &Config) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            info!("Running login command");
            run_login(loader, config, email, password).await
        }
        Commands::Logout => run_logout(loader, config).await,
        Commands::Sessions { command } => {
            let store = session_store(config)?;
            match command {
                SessionCommands::List => run_sessions_list(&store).await,
                SessionCommands::New => {
                    let id = store.create_session().await?;
                    store.disconnect().await;
                    println!("{} Created session {}", style("✓").green().bold(), id);
                    Ok(())
                }
                SessionCommands::Rename { id, title } => {
                    store.rename_session(&id, &title).await?;
                    println!("{} Renamed session {}", style("✓").green().bold(), id);
                    Ok(())
                }
                SessionCommands::Delete { id, yes } => run_sessions_delete(&store, &id, yes).await,
                SessionCommands::Show { id } => run_sessions_show(&store, &id).await,
            }
        }
        Commands::Domains { command } => {
            let store = session_store(config)?;
            match command {
                DomainCommands::List { all } => catalog::domains_list(&store, all).await,
                DomainCommands::Show { id } => catalog::domains_show(&store, id).await,
                DomainCommands::Create { title, sources } => {
                    catalog::domains_create(&store, title, sources).await
                }
            }
        }
        Commands::Sources { command } => {
            let store = session_store(config)?;
            match command {
                SourceCommands::List => catalog::sources_list(&store).await,
                SourceCommands::Create(args) => catalog::sources_create(&store, args).await,
            }
        }
        Commands::Scenarios { command } => {
            let store = session_store(config)?;
            match command {
                ScenarioCommands::List { offset, limit } => {
                    let limit = limit.unwrap_or(config.pagination.domains_limit);
                    catalog::scenarios_list(&store, offset, limit).await
                }
                ScenarioCommands::Show { id } => catalog::scenarios_show(&store, id).await,
                ScenarioCommands::Create(args) => {
                    let select = args.select;
                    catalog::scenarios_create(&store, args).await?;
                    if select {
                        let selection = store.selection().await;
                        persist_selection(
                            loader,
                            SelectionConfig {
                                domain_id: selection.domain_id,
                                scenario_id: selection.scenario_id,
                            },
                        )?;
                        println!("Selection saved; {} will use it", style("ragchat chat").cyan());
                    }
                    Ok(())
                }
            }
        }
        Commands::Chat {
            session,
            domain,
            scenario,
        } => {
            let store = session_store(config)?;
            let (domain, scenario) = resolve_selection(domain, scenario, &config.selection);
            info!("Starting chat");
            chat::run(
                store,
                ChatOptions {
                    session,
                    domain,
                    scenario,
                },
            )
            .await
        }
        Commands::Status => {
            run_status(loader, config);
            Ok(())
        }
    }
}

/// Relative log directories live under the config directory
fn resolve_log_dir(config_dir: &Path, dir: &str) -> String {
    let path = Path::new(dir);
    if path.is_absolute() {
        dir.to_string()
    } else {
        config_dir.join(path).to_string_lossy().into_owned()
    }
}

/// An explicit domain drops the remembered scenario, which belongs to another domain
fn resolve_selection(
    domain: Option<i64>,
    scenario: Option<i64>,
    saved: &SelectionConfig,
) -> (Option<i64>, Option<i64>) {
    match domain {
        Some(domain) => (Some(domain), scenario),
        None => (saved.domain_id, scenario.or(saved.scenario_id)),
    }
}

fn require_token(config: &Config) -> Result<&str> {
    match config.auth.token() {
        Some(token) => Ok(token),
        None => bail!("Not logged in. Run `ragchat login` or set RAGCHAT_TOKEN."),
    }
}

fn session_store(config: &Config) -> Result<SessionStore> {
    require_token(config)?;
    Ok(SessionStore::from_config(config)?)
}

/// Write the token and email into the on-disk config
fn persist_login(loader: &ConfigLoader, email: &str, token: &str) -> Result<()> {
    loader.update(|config| {
        config.auth.email = email.to_string();
        config.auth.token = token.to_string();
    })?;
    Ok(())
}

fn persist_selection(loader: &ConfigLoader, selection: SelectionConfig) -> Result<()> {
    loader.update(|config| config.selection = selection)?;
    Ok(())
}

async fn run_login(
    loader: &ConfigLoader,
    config: &Config,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => {
            let mut input = Input::<String>::new().with_prompt("Email");
            if !config.auth.email.is_empty() {
                input = input.default(config.auth.email.clone());
            }
            input.interact_text()?
        }
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let store = SessionStore::from_config(config)?;
    let resp = store.login(&email, &password).await?;
    persist_login(loader, &email, &resp.token)?;

    println!("{} Logged in as {}", style("✓").green().bold(), style(&email).bold());
    if let Some(meta) = resp.meta {
        let roles: Vec<&str> = meta
            .roles
            .iter()
            .map(|role| match role {
                Role::Admin => "admin",
                Role::Analyst => "analyst",
                Role::Buyer => "buyer",
                Role::Unknown => "unknown",
            })
            .collect();
        println!("  User id: {}", meta.user_id);
        if !roles.is_empty() {
            println!("  Roles: {}", roles.join(", "));
        }
    }
    println!(
        "Token saved to {}",
        loader.config_path().display()
    );
    Ok(())
}

async fn run_logout(loader: &ConfigLoader, config: &Config) -> Result<()> {
    let store = SessionStore::from_config(config)?;
    store.logout().await;
    loader.update(|config| config.auth.token.clear())?;

    println!("{} Logged out", style("✓").green().bold());
    if std::env::var("RAGCHAT_TOKEN").is_ok() {
        println!("RAGCHAT_TOKEN is still set in the environment.");
    }
    Ok(())
}

async fn run_sessions_list(store: &SessionStore) -> Result<()> {
    let sessions = store.get_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    println!("{}", style("Sessions").bold().cyan());
    println!();
    for session in sessions {
        let title = if session.title.is_empty() {
            style("(untitled)".to_string()).dim()
        } else {
            style(session.title.clone()).bold()
        };
        println!("  {} ({})", title, session.id);
        println!("    Updated: {}", session.updated_at.display());
    }
    Ok(())
}

async fn run_sessions_delete(store: &SessionStore, id: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete session {}?", id))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Delete cancelled.");
            return Ok(());
        }
    }

    store.delete_session(id).await?;
    println!("{} Deleted session {}", style("✓").green().bold(), id);
    Ok(())
}

async fn run_sessions_show(store: &SessionStore, id: &str) -> Result<()> {
    let session = store.get_session(id).await?;
    store.disconnect().await;

    let title = if session.title.is_empty() {
        "(untitled)"
    } else {
        session.title.as_str()
    };

    println!("{}", style(title).bold().cyan());
    println!("Created: {}", session.created_at.display());
    println!();
    if session.content.is_empty() {
        println!("No messages yet.");
    }
    for pair in &session.content {
        println!("{} {}", style(">").cyan().bold(), pair.query.content);
        println!("{} {}", style("bot>").magenta().bold(), pair.response.content);
        println!();
    }
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("ragchat Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  API: {}", config.api.base_url);
    println!("  Chat socket: {}", config.api.ws_url);
    println!("  Timeout: {}s", config.api.timeout_secs);
    println!("  Domains page size: {}", config.pagination.domains_limit);
    println!(
        "  Default selection: domain {}  scenario {}",
        config.selection.domain_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        config.selection.scenario_id.map_or_else(|| "-".to_string(), |id| id.to_string())
    );
    println!("  Log directory: {}", config.logging.dir);
    println!();

    println!("{}", style("Auth:").bold());
    let status = if config.auth.token().is_some() {
        style("logged in").green()
    } else {
        style("not logged in").red()
    };
    println!("  Status: {}", status);
    if !config.auth.email.is_empty() {
        println!("  Email: {}", config.auth.email);
    }
    println!();

    let reconnect = &config.reconnect;
    println!("{}", style("Reconnect:").bold());
    println!(
        "  Attempts: {}  Initial delay: {}ms  Max delay: {}ms  Multiplier: {}",
        reconnect.max_attempts,
        reconnect.initial_delay_ms,
        reconnect.max_delay_ms,
        reconnect.multiplier
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_flags() {
        let cli = Cli::try_parse_from([
            "ragchat", "chat", "--session", "abc", "--domain", "4", "--scenario", "9",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat {
                session,
                domain,
                scenario,
            } => {
                assert_eq!(session.as_deref(), Some("abc"));
                assert_eq!(domain, Some(4));
                assert_eq!(scenario, Some(9));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_parse_nested_commands() {
        let cli = Cli::try_parse_from(["ragchat", "-c", "/tmp/rc", "domains", "list", "--all"]).unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/rc")));
        assert!(matches!(
            cli.command,
            Commands::Domains {
                command: DomainCommands::List { all: true }
            }
        ));

        let cli = Cli::try_parse_from(["ragchat", "sessions", "rename", "s1", "New title"]).unwrap();
        match cli.command {
            Commands::Sessions {
                command: SessionCommands::Rename { id, title },
            } => {
                assert_eq!(id, "s1");
                assert_eq!(title, "New title");
            }
            _ => panic!("expected sessions rename"),
        }
    }

    #[test]
    fn test_resolve_log_dir() {
        let base = Path::new("/home/u/.ragchat");
        assert_eq!(resolve_log_dir(base, "logs"), "/home/u/.ragchat/logs");
        assert_eq!(resolve_log_dir(base, "/var/log/ragchat"), "/var/log/ragchat");
    }

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_persist_login_writes_token() {
        let _lock = lock_env();
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_dir(dir.path());

        persist_login(&loader, "user@example.com", "jwt-token").unwrap();

        assert!(loader.config_path().exists());
        let saved = loader.load_file().unwrap();
        assert_eq!(saved.auth.email, "user@example.com");
        assert_eq!(saved.auth.token, "jwt-token");
    }

    #[test]
    fn test_persist_login_keeps_env_overrides_out_of_the_file() {
        let _lock = lock_env();
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_dir(dir.path());

        let original = std::env::var("RAGCHAT_API_URL").ok();
        // SAFETY: tests serialize env mutations with ENV_LOCK.
        unsafe { std::env::set_var("RAGCHAT_API_URL", "https://staging.example") };
        let result = persist_login(&loader, "user@example.com", "jwt-token");
        // SAFETY: tests serialize env mutations with ENV_LOCK.
        unsafe {
            match &original {
                Some(value) => std::env::set_var("RAGCHAT_API_URL", value),
                None => std::env::remove_var("RAGCHAT_API_URL"),
            }
        }
        result.unwrap();

        let raw = std::fs::read_to_string(loader.config_path()).unwrap();
        assert!(!raw.contains("staging.example"));
        let saved = loader.load_file().unwrap();
        assert_eq!(saved.api.base_url, Config::default().api.base_url);
        assert_eq!(saved.auth.token, "jwt-token");
    }

    #[test]
    fn test_persist_selection_keeps_token() {
        let _lock = lock_env();
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_dir(dir.path());
        persist_login(&loader, "user@example.com", "jwt-token").unwrap();

        persist_selection(
            &loader,
            SelectionConfig {
                domain_id: Some(3),
                scenario_id: Some(12),
            },
        )
        .unwrap();

        let saved = loader.load_file().unwrap();
        assert_eq!(saved.selection.domain_id, Some(3));
        assert_eq!(saved.selection.scenario_id, Some(12));
        assert_eq!(saved.auth.token, "jwt-token");
    }

    #[test]
    fn test_resolve_selection() {
        let saved = SelectionConfig {
            domain_id: Some(3),
            scenario_id: Some(12),
        };
        assert_eq!(resolve_selection(None, None, &saved), (Some(3), Some(12)));
        assert_eq!(resolve_selection(Some(7), None, &saved), (Some(7), None));
        assert_eq!(resolve_selection(None, Some(4), &saved), (Some(3), Some(4)));
        assert_eq!(
            resolve_selection(None, None, &SelectionConfig::default()),
            (None, None)
        );
    }

    #[test]
    fn test_parse_create_commands() {
        let cli = Cli::try_parse_from([
            "ragchat", "domains", "create", "Docs", "--source", "1", "--source", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Domains {
                command: DomainCommands::Create { title, sources },
            } => {
                assert_eq!(title, "Docs");
                assert_eq!(sources, vec![1, 2]);
            }
            _ => panic!("expected domains create"),
        }

        let cli = Cli::try_parse_from([
            "ragchat", "scenarios", "create", "--domain", "3", "--model", "llama3", "--select",
        ])
        .unwrap();
        match cli.command {
            Commands::Scenarios {
                command: ScenarioCommands::Create(args),
            } => {
                assert_eq!(args.domain, 3);
                assert_eq!(args.model, "llama3");
                assert!(args.select);
            }
            _ => panic!("expected scenarios create"),
        }

        assert!(Cli::try_parse_from(["ragchat", "domains", "create", "Docs"]).is_err());
    }
}
