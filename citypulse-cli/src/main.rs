//! Developer CLI for the CityPulse core.
//!
//! Drives the session layer against file-backed stores under the platform
//! data directory, so flows can be exercised without a device build. Run
//! `citypulse status` to see where the state lives.

mod host;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, Result};

use citypulse_core::catalog::{Event, EventCatalog, SearchParams};
use citypulse_core::platform::{BiometricCapability, BiometricOutcome, BiometricPrompt};
use citypulse_core::{Language, SessionContext};

use host::{CliHost, FileStore, TerminalBiometricPrompt};

#[derive(Parser)]
#[command(name = "citypulse", about = "CityPulse developer CLI", version)]
struct Cli {
    /// Override the data directory (defaults to the platform data dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Ticketmaster Discovery API key, for `search` and `event`.
    #[arg(long, env = "TICKETMASTER_API_KEY", global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register (or re-register) a local account and sign in.
    Register {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Email address; normalized before use.
        #[arg(long)]
        email: String,
        /// Password (stored in plaintext — mock scheme).
        #[arg(long)]
        password: String,
    },
    /// Sign in with email and password.
    Login {
        /// Email address.
        #[arg(long)]
        email: String,
        /// Password.
        #[arg(long)]
        password: String,
    },
    /// Sign out.
    Logout,
    /// Show session status and storage location.
    Status,
    /// Set the UI language (en or ar).
    Language {
        /// Language code.
        language: String,
    },
    /// Manage favorites of the active identity.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
    /// Manage the biometric fast-login link.
    Biometrics {
        #[command(subcommand)]
        action: BiometricsCommand,
    },
    /// Search the event catalog.
    Search {
        /// Keyword filter.
        #[arg(long)]
        keyword: Option<String>,
        /// City filter.
        #[arg(long)]
        city: Option<String>,
        /// Zero-based page number.
        #[arg(long)]
        page: Option<u32>,
        /// Page size.
        #[arg(long)]
        size: Option<u32>,
    },
    /// Look up one event by id.
    Event {
        /// Event id.
        id: String,
    },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// List the active identity's favorite event ids.
    List,
    /// Add or remove an event id.
    Toggle {
        /// Event id.
        event_id: String,
    },
}

#[derive(Subcommand)]
enum BiometricsCommand {
    /// Link the signed-in account for biometric login.
    Enable,
    /// Remove the device's link.
    Disable,
    /// Sign in through the link.
    Login,
    /// Show link status for the signed-in account.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("citypulse")))
        .ok_or_else(|| eyre!("no data directory available; pass --data-dir"))?;

    let session = SessionContext::new(
        Arc::new(FileStore::new(data_dir.join("storage.json"))),
        Arc::new(FileStore::new(data_dir.join("secure.json"))),
        Arc::new(CliHost),
    );
    session.load_from_storage().await;

    match cli.command {
        Command::Register {
            name,
            email,
            password,
        } => {
            session.register_user(&name, &email, &password).await;
            let state = session.state();
            let email = state
                .profile
                .map_or_else(|| "<unknown>".to_string(), |profile| profile.email);
            println!("registered and signed in as {email}");
        }
        Command::Login { email, password } => {
            if session.login_user(&email, &password).await {
                println!("signed in");
            } else {
                return Err(eyre!("invalid credentials"));
            }
        }
        Command::Logout => {
            session.logout().await;
            println!("signed out");
        }
        Command::Status => {
            let state = session.state();
            println!("data dir:  {}", data_dir.display());
            println!("language:  {}", state.language);
            match state.profile {
                Some(profile) => {
                    println!("signed in: {} <{}> ({})", profile.name, profile.email, profile.id);
                }
                None => println!("signed in: no"),
            }
            println!("favorites: {}", state.favorites.len());
        }
        Command::Language { language } => {
            let language: Language = language
                .parse()
                .map_err(|_| eyre!("unsupported language (expected en or ar)"))?;
            session.set_language(language).await;
            println!("language set to {language}");
        }
        Command::Favorites { action } => match action {
            FavoritesCommand::List => {
                for id in session.state().favorites {
                    println!("{id}");
                }
            }
            FavoritesCommand::Toggle { event_id } => {
                session.toggle_favorite(&event_id).await;
                let state = session.state();
                if state.favorites.iter().any(|id| id == &event_id) {
                    println!("added {event_id}");
                } else {
                    println!("removed {event_id}");
                }
            }
        },
        Command::Biometrics { action } => {
            handle_biometrics(&session, action).await?;
        }
        Command::Search {
            keyword,
            city,
            page,
            size,
        } => {
            let catalog = EventCatalog::new(cli.api_key);
            let events = catalog
                .search_events(&SearchParams {
                    keyword,
                    city,
                    page,
                    size,
                })
                .await?;
            if events.is_empty() {
                println!("no events found");
            }
            for event in events {
                print_event_line(&event);
            }
        }
        Command::Event { id } => {
            let catalog = EventCatalog::new(cli.api_key);
            match catalog.event_by_id(&id).await? {
                Some(event) => {
                    print_event_line(&event);
                    if let Some(info) = &event.info {
                        println!("  {info}");
                    }
                    if let Some(note) = &event.please_note {
                        println!("  note: {note}");
                    }
                }
                None => println!("event {id} not found"),
            }
        }
    }

    Ok(())
}

async fn handle_biometrics(session: &SessionContext, action: BiometricsCommand) -> Result<()> {
    let prompt = TerminalBiometricPrompt;
    match action {
        BiometricsCommand::Enable => {
            match prompt.capability().await {
                BiometricCapability::Available => {}
                BiometricCapability::NoHardware => {
                    return Err(eyre!("biometric hardware not available"));
                }
                BiometricCapability::NotEnrolled => {
                    return Err(eyre!("no biometrics enrolled on this device"));
                }
            }
            match prompt.authenticate("Enable biometrics").await {
                BiometricOutcome::Success => {}
                BiometricOutcome::Canceled => return Err(eyre!("canceled")),
                BiometricOutcome::Unavailable { reason } => return Err(eyre!(reason)),
            }
            if session.enable_biometrics_for_current_user().await {
                println!("biometric login enabled for this account");
            } else {
                return Err(eyre!(
                    "failed to enable biometrics; sign in first and try again"
                ));
            }
        }
        BiometricsCommand::Disable => {
            session.disable_biometrics().await;
            println!("biometric link removed");
        }
        BiometricsCommand::Login => {
            match prompt.authenticate("Login with biometrics").await {
                BiometricOutcome::Success => {}
                BiometricOutcome::Canceled => return Err(eyre!("canceled")),
                BiometricOutcome::Unavailable { reason } => return Err(eyre!(reason)),
            }
            if session.login_from_biometric_link().await {
                println!("signed in through the biometric link");
            } else {
                return Err(eyre!(
                    "no account linked to biometrics; link one with `citypulse biometrics enable`"
                ));
            }
        }
        BiometricsCommand::Status => {
            if session.is_biometrics_linked_for_current_user().await {
                println!("this account is linked for biometric login");
            } else {
                match session.biometric_linked_email().await {
                    Some(email) => println!("linked account: {email} (not the current one)"),
                    None => println!("no account is linked on this device"),
                }
            }
        }
    }
    Ok(())
}

fn print_event_line(event: &Event) {
    let city = event.venue_city().unwrap_or("-");
    let date = event
        .dates
        .as_ref()
        .and_then(|dates| dates.start.as_ref())
        .and_then(|start| start.local_date.as_deref())
        .unwrap_or("-");
    println!("{}  {}  {}  {}", event.id, date, city, event.name);
}
