//! services/client/src/bin/nutripet.rs

use clap::{Parser, Subcommand};
use client_lib::{
    adapters::{FileTokenStore, HttpGateway, JpegNormalizer},
    config::Config,
    error::ClientError,
    state::AppState,
    tasks::{detection, session, stats},
};
use nutripet_core::domain::{CharacterCondition, Registration, StatsSnapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "nutripet",
    about = "Food-tracking client: photograph meals, feed your character"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session tokens
    Login { username: String, password: String },
    /// Log out and clear the persisted tokens
    Logout,
    /// Create a new account (does not log in)
    Register {
        username: String,
        full_name: String,
        email: String,
        password: String,
    },
    /// Show the logged-in profile
    Profile,
    /// Detect the food on a photo; --confirm feeds it to your character
    Detect {
        image: PathBuf,
        #[arg(long)]
        confirm: bool,
    },
    /// Show aggregate nutrition and character stats
    Stats {
        /// Force a refetch instead of serving the cached snapshot
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 2. Initialize Adapters & Shared State ---
    let tokens = Arc::new(FileTokenStore::new(config.token_path.clone()));
    let gateway = HttpGateway::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
        tokens.clone(),
    )?;
    let app = AppState::new(
        config.clone(),
        Arc::new(gateway),
        tokens,
        Arc::new(JpegNormalizer::new()),
    );

    // --- 3. Restore a Persisted Session, Then Dispatch ---
    let needs_session = matches!(
        cli.command,
        Command::Profile | Command::Detect { .. } | Command::Stats { .. }
    );
    if needs_session {
        session::restore(&app).await?;
        if !app.session.lock().await.is_authenticated() {
            eprintln!("Not logged in. Run `nutripet login <username> <password>` first.");
            std::process::exit(2);
        }
    }

    match cli.command {
        Command::Login { username, password } => {
            // The store does not validate credentials; the caller does.
            if username.trim().is_empty() || password.is_empty() {
                eprintln!("Username and password must not be empty.");
                std::process::exit(2);
            }
            match session::login(&app, &username, &password).await {
                Ok(profile) => {
                    println!("Logged in as {} (id {}).", profile.username, profile.id);
                }
                Err(_) => {
                    let session = app.session.lock().await;
                    eprintln!(
                        "Login failed: {}",
                        session.last_error().unwrap_or("unknown error")
                    );
                    std::process::exit(1);
                }
            }
        }

        Command::Logout => {
            session::logout(&app).await;
            println!("Logged out.");
        }

        Command::Register {
            username,
            full_name,
            email,
            password,
        } => {
            if username.trim().is_empty() || password.is_empty() {
                eprintln!("Username and password must not be empty.");
                std::process::exit(2);
            }
            let registration = Registration {
                username,
                full_name,
                email,
                password,
            };
            match session::register(&app, registration).await {
                Ok(profile) => {
                    println!(
                        "Account '{}' created (id {}). You can now log in.",
                        profile.username, profile.id
                    );
                }
                Err(err) => {
                    eprintln!("Registration failed: {}", err);
                    std::process::exit(1);
                }
            }
        }

        Command::Profile => match session::refresh_profile(&app).await {
            Ok(profile) => {
                println!("{} (id {})", profile.username, profile.id);
                if let Some(full_name) = profile.full_name {
                    println!("  name:  {}", full_name);
                }
                if let Some(email) = profile.email {
                    println!("  email: {}", email);
                }
            }
            Err(err) => {
                eprintln!("Could not fetch the profile: {}", err);
                std::process::exit(1);
            }
        },

        Command::Detect { image, confirm } => {
            let uri = image.display().to_string();
            let mime_type = mime_guess::from_path(&image)
                .first_or_octet_stream()
                .to_string();
            detection::select_image(&app, &uri, &mime_type).await;

            match detection::upload(&app).await {
                Ok(Some(prediction)) => {
                    println!("Detected: {}", prediction.predicted_food);
                    println!("  calories:     {:.1} kcal", prediction.nutrition.calories);
                    println!("  protein:      {:.1} g", prediction.nutrition.protein);
                    println!(
                        "  carbohydrate: {:.1} g",
                        prediction.nutrition.carbohydrate
                    );
                    println!("  fat:          {:.1} g", prediction.nutrition.fat);
                }
                Ok(None) => return Ok(()),
                Err(_) => {
                    print_workflow_failure(&app).await;
                    std::process::exit(1);
                }
            }

            if confirm {
                match detection::confirm(&app).await {
                    Ok(Some(confirmation)) => {
                        let character = &confirmation.character;
                        println!("Fed to your character!");
                        println!(
                            "  level {} ({}), HP {:.0}, XP {:.0}/{:.0}",
                            character.level,
                            character.status_name,
                            character.health_point,
                            character.xp_point,
                            character.xp_to_next_level
                        );
                    }
                    Ok(None) => {}
                    Err(_) => {
                        print_workflow_failure(&app).await;
                        std::process::exit(1);
                    }
                }
            }
        }

        Command::Stats { refresh } => {
            if refresh {
                stats::invalidate(&app).await;
            }
            match stats::fetch(&app).await {
                Ok(Some(snapshot)) => print_stats(&snapshot),
                Ok(None) => {}
                Err(err) => {
                    // Stale-but-available: show the old snapshot next to the error.
                    let store = app.stats.lock().await;
                    match store.snapshot() {
                        Some(snapshot) => {
                            eprintln!("Refresh failed ({}); showing the last snapshot.", err);
                            print_stats(snapshot);
                        }
                        None => {
                            eprintln!("Could not fetch stats: {}", err);
                            std::process::exit(1);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

async fn print_workflow_failure(app: &AppState) {
    let workflow = app.detection.lock().await;
    match workflow.error() {
        Some(err) => eprintln!("Detection failed: {}", err),
        None => eprintln!("Detection failed."),
    }
}

fn print_stats(snapshot: &StatsSnapshot) {
    let character = &snapshot.character;
    println!(
        "Last {} days ({} – {})",
        snapshot.period.days, snapshot.period.start_date, snapshot.period.end_date
    );
    println!(
        "  {} meals, {:.0} kcal total ({:.0} kcal/day)",
        snapshot.summary.total_entries, snapshot.summary.total_calories, snapshot.averages.calories
    );
    println!(
        "  health score: {:.0} ({})",
        snapshot.health.weekly_score, snapshot.health.status
    );
    println!(
        "  character: level {} ({}), HP {:.0}, XP {:.0}/{:.0}",
        character.level,
        character.status_name,
        character.health_point,
        character.xp_point,
        character.xp_to_next_level
    );
    if character.condition() == CharacterCondition::Unhealthy {
        println!("  your character could use some healthier meals!");
    }
    for tip in snapshot
        .nutrition_recommendations
        .iter()
        .chain(snapshot.health_recommendations.iter())
    {
        println!("  tip: {}", tip);
    }
}
