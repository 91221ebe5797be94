use std::path::PathBuf;
use std::process::ExitCode;

use campus_client::SessionError;
use campus_client::config::ClientConfig;
use campus_client::net::api::HttpAuthApi;
use campus_client::net::types::{Profile, ProfileUpdate, Registration};
use campus_client::router::{Navigation, Router};
use campus_client::session::SessionStore;
use campus_client::storage::FileTokenStore;
use clap::{Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not logged in; run `campus login` first")]
    NotLoggedIn,
    #[error("nothing to update; pass at least one field in --data")]
    EmptyUpdate,
}

#[derive(Parser, Debug)]
#[command(name = "campus", about = "Campus e-learning session client")]
struct Cli {
    #[arg(long, env = "CAMPUS_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "CAMPUS_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange credentials for a token and load the profile.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account from a JSON registration form.
    Register {
        #[arg(long)]
        data: String,
    },
    /// Forget the stored token.
    Logout,
    /// Restore the stored session and print the current user.
    Whoami,
    /// Print another user's public profile.
    Profile { user_id: i64 },
    /// Update the current user's profile from a JSON object of fields.
    Update {
        #[arg(long)]
        data: String,
    },
    /// Check whether navigating to a page path would be allowed.
    Navigate { path: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = &cli.token_file {
        config.token_path.clone_from(path);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let storage = FileTokenStore::new(config.token_path.clone());

    if let Command::Navigate { path } = &cli.command {
        return run_navigate(path, &storage);
    }

    let api = HttpAuthApi::new(config.api_url.clone())?;
    let mut session = SessionStore::restore(api, storage);

    match cli.command {
        Command::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            print_profile(&user)
        }
        Command::Register { data } => {
            let form: Registration = serde_json::from_str(&data)?;
            let profile = session.register(&form).await?;
            print_profile(&profile)
        }
        Command::Logout => {
            session.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = session.check_and_restore_auth().await.ok_or(CliError::NotLoggedIn)?;
            print_profile(&user)
        }
        Command::Profile { user_id } => {
            let profile = session.public_profile(user_id).await?;
            print_profile(&profile)
        }
        Command::Update { data } => {
            let update: ProfileUpdate = serde_json::from_str(&data)?;
            if update.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            if session.check_and_restore_auth().await.is_none() {
                return Err(CliError::NotLoggedIn);
            }
            let user = session.update_profile(&update).await?;
            print_profile(&user)
        }
        Command::Navigate { .. } => Ok(()),
    }
}

fn run_navigate(path: &str, storage: &FileTokenStore) -> Result<(), CliError> {
    let router = Router::campus();
    let page = router
        .resolve(path)
        .and_then(|m| m.name().map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_owned());
    match router.before_each(path, storage) {
        Navigation::Proceed => println!("proceed: {path} ({page})"),
        Navigation::Redirect(to) => println!("redirect: {path} -> {to}"),
    }
    Ok(())
}

fn print_profile(profile: &Profile) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(profile)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
