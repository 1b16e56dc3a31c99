use std::path::{Path, PathBuf};

use prosody_core::analysis::ScenarioDomain;
use prosody_core::model::sections::NumericEquivalenceState;
use services::import_export::EXPORT_FILE_NAME;
use services::{AppConfig, AppServices, Clock, Session, SyncError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod args;
mod report;

use args::{Args, ArgsError, Command, PhaseMove, print_usage};

const ENV_EMAIL: &str = "PROSODY_EMAIL";
const ENV_PASSWORD: &str = "PROSODY_PASSWORD";

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    let mut config = AppConfig::from_env()?;
    if let Some(db_url) = parsed.db_url {
        config.db_url = db_url;
    } else {
        config.db_url = args::normalize_sqlite_url(config.db_url);
    }
    if let Some(key) = parsed.storage_key {
        config.storage_key = key;
    }

    // Open + migrate SQLite here so core/services stay free of filesystem setup.
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config, Clock::default_clock()).await?;

    match parsed.command {
        Command::Status => {
            let document = services.autosave().document();
            print!(
                "{}",
                report::status(
                    &document,
                    services.phase(),
                    services.cloud_enabled(),
                    &services.sync_status()
                )
            );
        }
        Command::Export { out, stdout } => {
            if stdout {
                println!("{}", services.export_data().await);
            } else {
                let path = out.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
                services.export_file(&path).await?;
                println!("Exported to {}", path.display());
            }
        }
        Command::Import { path } => {
            let document = services.import_file(&path).await?;
            println!(
                "Imported {} section(s) from {}",
                document.len(),
                path.display()
            );
        }
        Command::Clear { confirmed } => {
            if !confirmed {
                eprintln!("clear removes all local data; re-run with --yes to confirm");
                return Err(ArgsError::MissingArgument {
                    what: "--yes confirmation",
                }
                .into());
            }
            services.clear().await;
            println!("Local data cleared");
        }
        Command::Phase(movement) => {
            let current = services.phase();
            let target = match movement {
                PhaseMove::Show => None,
                PhaseMove::Next => current.next(),
                PhaseMove::Previous => current.previous(),
                PhaseMove::Set(phase) => Some(phase),
            };
            if let Some(phase) = target {
                services.set_phase(phase);
                services.flush().await;
            }
            let phase = services.phase();
            println!("{} ({phase})", phase.title());
        }
        Command::Sync {
            email,
            password,
            sign_up,
        } => {
            let session = sign_in(&services, email, password, sign_up).await?;
            services.begin_session(&session);
            let outcome = services.sync_now(&session.user_id).await;
            println!("{}", services.sync_status());
            if let Some(auth) = services.auth() {
                if let Err(err) = auth.sign_out(&session).await {
                    tracing::warn!(error = %err, "sign-out failed");
                }
            }
            services.end_session();
            outcome?;
        }
        Command::Equivalence { domain } => {
            let document = services.autosave().document();
            let state = document
                .numeric_equivalence()
                .cloned()
                .unwrap_or_default();
            let domains = match domain {
                Some(domain) => vec![domain],
                None => ScenarioDomain::ALL.to_vec(),
            };
            print_equivalence(&state, &domains);
        }
        Command::Balance { texts } => match texts {
            Some((option_a, option_b)) => {
                let comparison = prosody_core::analysis::text::compare_texts(&option_a, &option_b);
                print!("{}", report::balance("custom", &comparison));
            }
            None => {
                let document = services.autosave().document();
                let scenarios = document
                    .sentence_structure()
                    .map(|state| state.scenarios().to_vec())
                    .unwrap_or_default();
                if scenarios.is_empty() {
                    println!("No generated scenarios; pass --a and --b to compare texts.");
                }
                for (index, scenario) in scenarios.iter().enumerate() {
                    let label = format!("#{} {}", index + 1, scenario.domain);
                    print!("{}", report::balance(&label, &scenario.balance()));
                }
            }
        },
        Command::Checklist => {
            let document = services.autosave().document();
            let state = document.quality_checklist().cloned().unwrap_or_default();
            print!("{}", report::checklist(&state));
        }
    }

    services.flush().await;
    Ok(())
}

fn print_equivalence(state: &NumericEquivalenceState, domains: &[ScenarioDomain]) {
    for domain in domains {
        println!("{}", report::equivalence(*domain, &state.analyze(*domain)));
    }
}

async fn sign_in(
    services: &AppServices,
    email: Option<String>,
    password: Option<String>,
    sign_up: bool,
) -> Result<Session, Box<dyn std::error::Error>> {
    let auth = services.auth().ok_or(SyncError::Disabled)?;
    let email = email
        .or_else(|| std::env::var(ENV_EMAIL).ok())
        .ok_or(ArgsError::MissingValue { flag: "--email" })?;
    let password = password
        .or_else(|| std::env::var(ENV_PASSWORD).ok())
        .ok_or(ArgsError::MissingValue { flag: "--password" })?;
    let session = if sign_up {
        auth.sign_up(&email, &password).await?
    } else {
        auth.sign_in(&email, &password).await?
    };
    Ok(session)
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
