mod config;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use config::Settings;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userhub_client::config::env_value;
use userhub_client::validation::{validate_login, validate_registration, validate_user_form};
use userhub_client::{
    ApiClient, ApiError, ClientConfig, Credentials, Navigator, PredictInput, RouteGuard,
    SessionUser, UserFormData, View,
};

const LOGIN_PROMPT: &str = "Please sign in: run 'userhub login'.";

#[derive(Parser)]
#[command(name = "userhub")]
#[command(version, about = "Userhub Command Line Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides USERHUB_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides USERHUB_SESSION_FILE and the config file)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Emit only JSON
    #[arg(short, long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    /// Example:
    ///     userhub login --email a@b.com --password secret1
    #[command(verbatim_doc_comment)]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in with it
    /// Example:
    ///     userhub register --email a@b.com --password Secret1 --confirm-password Secret1
    #[command(verbatim_doc_comment)]
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the identity cached with the session (no network call)
    Whoami,
    /// Ask the server who the session belongs to
    Me,
    /// Manage user records
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Request a prediction
    /// Examples:
    ///     userhub predict --age 41 --weight 82.5 --smoker --city Pune
    ///     userhub predict --payload '{"age": 41, "city": "Pune"}'
    ///     userhub predict --input features.json
    #[command(verbatim_doc_comment)]
    Predict {
        #[arg(long, default_value_t = 30)]
        age: u32,
        /// Weight in kg
        #[arg(long, default_value_t = 70.0)]
        weight: f64,
        /// Height in metres
        #[arg(long, default_value_t = 1.75)]
        height: f64,
        /// Yearly income in lakh rupees
        #[arg(long, default_value_t = 5.0)]
        income_lpa: f64,
        #[arg(long)]
        smoker: bool,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        occupation: String,
        /// Raw JSON payload, sent as is instead of the typed flags
        #[arg(long, value_name = "JSON", conflicts_with = "input")]
        payload: Option<String>,
        /// Path to a JSON file sent as the payload
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Show or change CLI settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List all users
    List,
    /// Show one user
    Get { id: i64 },
    /// Add a user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Replace a user's email and password
    Update {
        id: i64,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Delete a user (asks for confirmation unless --yes)
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective settings
    Show,
    /// Store the API base URL
    /// Example:
    ///     userhub config set-api-url http://localhost:8000
    #[command(verbatim_doc_comment)]
    SetApiUrl { url: String },
    /// Store the session file location
    SetSessionFile { path: PathBuf },
}

/// Reports view changes on the terminal.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, view: View) {
        tracing::debug!(view = %view, "Navigating");
        if view == View::Login {
            eprintln!("{}", LOGIN_PROMPT);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,userhub=info,userhub_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let env_set = |key: &str| env_value(key).is_some();
    let mut client_config = settings.apply(ClientConfig::from_env()?, &env_set);
    if let Some(url) = cli.api_url.clone() {
        client_config = client_config.with_api_url(url);
    }
    if let Some(path) = cli.session_file.clone() {
        client_config = client_config.with_session_file(path);
    }

    tracing::debug!(api_url = %client_config.api_url, "Client configuration loaded");

    let navigator: Arc<dyn Navigator> = Arc::new(TerminalNavigator);
    let api = ApiClient::from_config(&client_config, navigator.clone())
        .context("Failed to initialize API client")?;
    let guard = RouteGuard::new(api.session().clone());
    let json = cli.json;

    match cli.command {
        Commands::Login { email, password } => {
            let credentials = Credentials::new(email, password);
            validate_login(&credentials).map_err(ApiError::from)?;
            let auth = api
                .login(&credentials)
                .await
                .map_err(|e| failed("Login failed", e))?;
            if json {
                print_json(&auth)?;
            } else {
                println!("Login successful! Signed in as {} (id {}).", auth.email, auth.user_id);
            }
            navigator.navigate(View::HOME);
        }
        Commands::Register {
            email,
            password,
            confirm_password,
        } => {
            let credentials = Credentials::new(email, password);
            validate_registration(&credentials, &confirm_password).map_err(ApiError::from)?;
            let auth = api
                .register(&credentials)
                .await
                .map_err(|e| failed("Registration failed", e))?;
            if json {
                print_json(&auth)?;
            } else {
                println!("Registration successful! Welcome aboard, {}.", auth.email);
            }
            navigator.navigate(View::HOME);
        }
        Commands::Logout => {
            api.logout()?;
        }
        Commands::Whoami => {
            let session = api.session();
            match (session.is_authenticated(), session.user()) {
                (true, Some(user)) if json => print_json(&user)?,
                (authenticated, user) => println!("{}", whoami_line(authenticated, user.as_ref())),
            }
        }
        Commands::Me => {
            require(&guard, View::HOME, navigator.as_ref())?;
            let me = api
                .current_user()
                .await
                .map_err(|e| failed("Failed to load current user", e))?;
            if json {
                print_json(&me)?;
            } else {
                println!("{} (id {})", me.email, me.user_id);
            }
        }
        Commands::Users { command } => {
            handle_users_command(&api, &guard, navigator.as_ref(), command, json).await?;
        }
        Commands::Predict {
            age,
            weight,
            height,
            income_lpa,
            smoker,
            city,
            occupation,
            payload,
            input,
        } => {
            require(&guard, View::Predict, navigator.as_ref())?;
            let payload = if let Some(raw) = payload {
                serde_json::from_str::<serde_json::Value>(&raw).context("Failed to parse payload JSON")?
            } else if let Some(path) = input {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read input file: {}", path.display()))?;
                serde_json::from_str(&content).context("Failed to parse input JSON")?
            } else {
                PredictInput {
                    age,
                    weight,
                    height,
                    income_lpa,
                    smoker,
                    city,
                    occupation,
                }
                .into_payload()
            };
            let result = api
                .predict(&payload)
                .await
                .map_err(|e| failed("Prediction failed", e))?;
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("Result:");
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Config { command } => {
            handle_config_command(&mut settings, &client_config, command)?;
        }
    }

    Ok(())
}

async fn handle_users_command(
    api: &ApiClient,
    guard: &RouteGuard,
    navigator: &dyn Navigator,
    command: UsersCommand,
    json: bool,
) -> Result<()> {
    match command {
        UsersCommand::List => {
            require(guard, View::Users, navigator)?;
            let users = api
                .list_users()
                .await
                .map_err(|e| failed("Error loading users", e))?;
            if json {
                print_json(&users)?;
            } else if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<8} {:<40}", "ID", "EMAIL");
                for user in &users {
                    println!("{:<8} {:<40}", user.user_id, user.email);
                }
            }
        }
        UsersCommand::Get { id } => {
            require(guard, View::EditUser(id), navigator)?;
            let user = api
                .get_user(id)
                .await
                .map_err(|e| failed("Failed to load user", e))?;
            if json {
                print_json(&user)?;
            } else {
                println!("ID:    {}", user.user_id);
                println!("Email: {}", user.email);
            }
        }
        UsersCommand::Create { email, password } => {
            require(guard, View::AddUser, navigator)?;
            let form = UserFormData::new(email, password);
            validate_user_form(&form).map_err(ApiError::from)?;
            let user = api
                .create_user(&form)
                .await
                .map_err(|e| failed("Failed to create user", e))?;
            if json {
                print_json(&user)?;
            } else {
                println!("User created successfully! (id {})", user.user_id);
            }
            navigator.navigate(View::Users);
        }
        UsersCommand::Update { id, email, password } => {
            require(guard, View::EditUser(id), navigator)?;
            let form = UserFormData::new(email, password);
            validate_user_form(&form).map_err(ApiError::from)?;
            let user = api
                .update_user(id, &form)
                .await
                .map_err(|e| failed("Failed to update user", e))?;
            if json {
                print_json(&user)?;
            } else {
                println!("User updated successfully! ({})", user.email);
            }
            navigator.navigate(View::Users);
        }
        UsersCommand::Delete { id, yes } => {
            require(guard, View::Users, navigator)?;
            if !yes && !confirm("Are you sure you want to delete this user?")? {
                println!("Delete cancelled.");
                return Ok(());
            }
            api.delete_user(id)
                .await
                .map_err(|e| failed("Failed to delete user", e))?;
            if !json {
                println!("User deleted successfully!");
            }
        }
    }
    Ok(())
}

fn handle_config_command(
    settings: &mut Settings,
    effective: &ClientConfig,
    command: ConfigCommand,
) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("Config file:  {}", Settings::get_config_path()?.display());
            println!("API URL:      {}", effective.api_url);
            match &effective.session_file {
                Some(path) => println!("Session file: {}", path.display()),
                None => println!("Session file: (in memory)"),
            }
            println!("Timeout:      {}s", effective.timeout.as_secs());
        }
        ConfigCommand::SetApiUrl { url } => {
            settings.api_url = Some(url.trim_end_matches('/').to_string());
            settings.save()?;
            println!("API URL set to '{}'.", url);
        }
        ConfigCommand::SetSessionFile { path } => {
            println!("Session file set to '{}'.", path.display());
            settings.session_file = Some(path);
            settings.save()?;
        }
    }
    Ok(())
}

/// Token presence decides; the cached user is only for display.
fn whoami_line(authenticated: bool, user: Option<&SessionUser>) -> String {
    match (authenticated, user) {
        (true, Some(user)) => format!("{} (id {})", user.email, user.user_id),
        (true, None) => "Signed in (identity not cached).".to_string(),
        (false, _) => "Not signed in.".to_string(),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_confirmed(&answer))
}

fn is_confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Run the route guard for `view`; anonymous callers are turned away.
fn require(guard: &RouteGuard, view: View, navigator: &dyn Navigator) -> Result<()> {
    if guard.enter(view, navigator) {
        Ok(())
    } else {
        Err(anyhow!("Not signed in. Run 'userhub login' first."))
    }
}

fn failed(action: &str, err: ApiError) -> anyhow::Error {
    anyhow!("{}: {}", action, err.user_message())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_predict_defaults() {
        let cli = Cli::try_parse_from(["userhub", "predict", "--smoker", "--city", "Pune"]).unwrap();
        match cli.command {
            Commands::Predict { age, smoker, city, payload, .. } => {
                assert_eq!(age, 30);
                assert!(smoker);
                assert_eq!(city, "Pune");
                assert!(payload.is_none());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_payload_conflicts_with_input() {
        let res = Cli::try_parse_from([
            "userhub", "predict", "--payload", "{}", "--input", "x.json",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "userhub", "users", "get", "7", "--api-url", "http://api:9000", "--json",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://api:9000"));
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Users { command: UsersCommand::Get { id: 7 } }
        ));
    }

    #[test]
    fn test_delete_confirmation_answers() {
        assert!(is_confirmed("y\n"));
        assert!(is_confirmed(" YES \n"));
        assert!(!is_confirmed("\n"));
        assert!(!is_confirmed("n"));
        assert!(!is_confirmed("yep"));
        assert!(!is_confirmed(""));
    }

    #[test]
    fn test_delete_yes_flag() {
        let cli = Cli::try_parse_from(["userhub", "users", "delete", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Users { command: UsersCommand::Delete { id: 3, yes: false } }
        ));
        let cli = Cli::try_parse_from(["userhub", "users", "delete", "3", "-y"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Users { command: UsersCommand::Delete { id: 3, yes: true } }
        ));
    }

    #[test]
    fn test_whoami_token_without_cached_user() {
        let user = SessionUser::new(4, "a@b.com");
        assert_eq!(whoami_line(true, Some(&user)), "a@b.com (id 4)");
        assert_eq!(whoami_line(true, None), "Signed in (identity not cached).");
        assert_eq!(whoami_line(false, Some(&user)), "Not signed in.");
        assert_eq!(whoami_line(false, None), "Not signed in.");
    }

    #[test]
    fn test_login_prompt_does_not_assume_prior_session() {
        assert!(!LOGIN_PROMPT.contains("signed out"));
        assert!(LOGIN_PROMPT.contains("userhub login"));
    }

    #[test]
    fn test_config_command_parses() {
        let cli = Cli::try_parse_from(["userhub", "config", "set-api-url", "http://api:9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { command: ConfigCommand::SetApiUrl { ref url } } if url == "http://api:9000"
        ));
    }

    #[test]
    fn test_failed_uses_server_message() {
        let err = failed(
            "Failed to update user",
            ApiError::Server {
                status: userhub_client::error::StatusCode::NOT_FOUND,
                message: "User not found".to_string(),
            },
        );
        assert_eq!(err.to_string(), "Failed to update user: User not found");
    }
}
