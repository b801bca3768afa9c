//! services/studio/src/bin/studio.rs

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use podcast_core::{
    catalog, parse_interests, AcademicLevel, BackendClient, BalanceLedger, ContentFormat, CredentialProvider,
    FlowError, GenerationRequest, HistoryCache, JobStateMachine, ProfileBook,
};
use std::sync::Arc;
use studio_lib::{
    adapters::{HttpRemoteCaller, StaticTokenProvider, TokenFileProvider},
    config::{Config, CredentialSource},
    error::AppError,
    payment::{PaymentOutcome, PaymentReturn},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "studio")]
#[command(version, about = "Create personalized podcasts for your kids from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show your Hoot balance
    Balance,

    /// Manage saved child profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Generate a script, review it, and turn it into audio
    Create {
        /// What the podcast should be about
        #[arg(short, long)]
        topic: String,

        /// Child profile id to personalize for (repeatable)
        #[arg(short, long = "child", value_name = "ID")]
        children: Vec<String>,

        /// Do not personalize with child profiles
        #[arg(long)]
        anonymous: bool,

        /// Reading level: k-1, 2-3, 4-5, 6-7, 8-9, 10-11, 12+
        #[arg(short, long, default_value = "k-1")]
        level: AcademicLevel,

        /// Voice name (see `studio voices`) or provider voice id
        #[arg(short, long)]
        voice: Option<String>,

        /// podcast, story or poem
        #[arg(short, long, default_value = "podcast")]
        format: ContentFormat,

        /// Approve the script without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// List your podcasts, newest first
    History,

    /// Delete a podcast from your history
    Delete { job_id: String },

    /// Show where to listen to a finished podcast
    Play { job_id: String },

    /// List the available narrator voices
    Voices,

    /// List the Hoot packs for sale
    Packs,

    /// Start a checkout for a Hoot pack
    Buy {
        /// Number of Hoots in the pack (5, 15, 20 or 30)
        hoots: u32,
    },

    /// Handle the URL the checkout page sent you back to
    PaymentReturn { url: String },
}

#[derive(Subcommand)]
enum ProfileAction {
    List,
    Add {
        #[arg(short, long)]
        name: String,
        /// YYYY-MM-DD
        #[arg(short, long)]
        birthdate: NaiveDate,
        /// Comma-separated, e.g. "Minecraft, Dragons"
        #[arg(short, long, default_value = "")]
        interests: String,
    },
    Remove { id: String },
}

/// Everything a command needs, wired once from the configuration.
struct App {
    config: Config,
    backend: BackendClient,
    ledger: BalanceLedger,
    profiles: ProfileBook,
    history: HistoryCache,
}

impl App {
    fn build(config: Config) -> Result<Self, AppError> {
        let credentials: Arc<dyn CredentialProvider> = match &config.credentials {
            CredentialSource::Token(token) => Arc::new(StaticTokenProvider::new(token.clone())),
            CredentialSource::TokenFile(path) => Arc::new(TokenFileProvider::new(path.clone())),
        };
        let caller = HttpRemoteCaller::with_timeout(&config.api_base_url, credentials, config.request_timeout)?;
        let backend = BackendClient::new(Arc::new(caller), config.user_id.clone());
        let ledger = BalanceLedger::default();
        let profiles = ProfileBook::new(backend.clone(), ledger.clone());
        let history = HistoryCache::new(backend.clone());
        Ok(Self {
            config,
            backend,
            ledger,
            profiles,
            history,
        })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded for user {}", config.user_id);

    // --- 2. Wire the adapters ---
    let app = App::build(config)?;

    // --- 3. Dispatch ---
    match cli.command {
        Commands::Balance => {
            let profile = app.profiles.refresh().await?;
            println!("You have {} Hoots.", profile.balance);
        }
        Commands::Profiles { action } => profiles(&app, action).await?,
        Commands::Create {
            topic,
            children,
            anonymous,
            level,
            voice,
            format,
            yes,
        } => {
            app.profiles.refresh().await?;
            let subject_profiles = if anonymous {
                Vec::new()
            } else {
                app.profiles.select(&children).await?
            };
            let voice = match voice {
                Some(v) => catalog::find_voice(&v)
                    .ok_or_else(|| AppError::Internal(format!("Unknown voice '{}'. Try `studio voices`.", v)))?,
                None => catalog::default_voice(),
            };
            let request = GenerationRequest {
                topic,
                subject_profiles,
                anonymize: anonymous,
                academic_level: level,
                voice_id: voice.voice_id.to_string(),
                content_format: format,
            };
            create(&app, request, yes).await?;
        }
        Commands::History => {
            let jobs = app.history.refresh().await?;
            if jobs.is_empty() {
                println!("No podcasts yet.");
            }
            for job in jobs {
                let when = job
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let title = if job.title.is_empty() { "(untitled)" } else { job.title.as_str() };
                println!("{}  {:<16}  {:<10}  {}", job.job_id, when, job.status, title);
            }
        }
        Commands::Delete { job_id } => {
            app.history.refresh().await?;
            app.history.delete(&job_id).await?;
            println!("Deleted {}.", job_id);
        }
        Commands::Play { job_id } => {
            app.history.refresh().await?;
            let podcast = app.history.replay(&job_id).await?;
            println!("{}\n{}", podcast.title, podcast.audio_url);
        }
        Commands::Voices => {
            for voice in catalog::VOICES {
                println!("{:<20} {}", voice.name, voice.voice_id);
            }
        }
        Commands::Packs => {
            for pack in catalog::HOOT_PACKS {
                println!("{:>3} Hoots  {}", pack.hoots, pack.price_label());
            }
        }
        Commands::Buy { hoots } => {
            let pack = catalog::find_pack(hoots).ok_or_else(|| {
                AppError::Internal(format!("There is no {}-Hoot pack. Try `studio packs`.", hoots))
            })?;
            let url = app.backend.create_payment_session(pack.price_id).await?;
            println!("Complete your purchase of {} Hoots ({}) at:\n{}", pack.hoots, pack.price_label(), url);
        }
        Commands::PaymentReturn { url } => {
            let ret = PaymentReturn::parse(&url)?;
            match ret.outcome {
                Some(PaymentOutcome::Success) => {
                    let profile = app.profiles.refresh().await?;
                    println!("Payment successful! You now have {} Hoots.", profile.balance);
                }
                Some(PaymentOutcome::Cancelled) => println!("Payment was cancelled. No Hoots were charged."),
                None => println!("No payment result in that URL."),
            }
            println!("{}", ret.cleaned);
        }
    }
    Ok(())
}

async fn profiles(app: &App, action: ProfileAction) -> Result<(), AppError> {
    app.profiles.refresh().await?;
    match action {
        ProfileAction::List => {
            let children = app.profiles.children().await;
            if children.is_empty() {
                println!("No saved children yet.");
            }
            for child in children {
                let interests: Vec<&str> = child.interests.iter().map(String::as_str).collect();
                let born = child
                    .birthdate
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}  {:<12} {:<10}  {}", child.id, child.name, born, interests.join(", "));
            }
        }
        ProfileAction::Add {
            name,
            birthdate,
            interests,
        } => {
            let child = app
                .profiles
                .add_child(&name, birthdate, parse_interests(&interests))
                .await?;
            println!("Added {} ({}).", child.name, child.id);
        }
        ProfileAction::Remove { id } => {
            app.profiles.remove_child(&id).await?;
            println!("Removed {}.", id);
        }
    }
    Ok(())
}

async fn create(app: &App, request: GenerationRequest, yes: bool) -> Result<(), AppError> {
    let mut machine = JobStateMachine::new(app.backend.clone(), app.ledger.clone(), app.config.poll_policy)
        .with_profiles(app.profiles.clone())
        .with_history(app.history.clone());

    let cancel = machine.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping");
            cancel.cancel();
        }
    });

    let result = drive(&mut machine, request, yes).await;
    machine.shutdown();
    ctrl_c.abort();
    result
}

async fn drive(machine: &mut JobStateMachine, request: GenerationRequest, yes: bool) -> Result<(), AppError> {
    let voice_id = request.voice_id.clone();
    println!("Writing your script...");
    let script = machine.generate_script(request).await?;
    println!("\n{}\n", script);

    let cancel = machine.cancellation_token();
    let approved = yes
        || tokio::select! {
            _ = cancel.cancelled() => return Err(FlowError::Cancelled.into()),
            answer = confirm("Turn this script into audio for 1 Hoot? [y/N] ") => answer?,
        };
    if !approved {
        machine.disapprove()?;
        println!("Script discarded. No Hoot was used.");
        return Ok(());
    }

    let job_id = machine.approve(&script, &voice_id).await?;
    println!("Audio job {} started. You have {} Hoots left.", job_id, machine.ledger().get());

    let podcast = machine
        .wait_for_completion(|_, status| println!("Creating audio... (Status: {})", status.unwrap_or("PENDING")))
        .await?;
    println!("\n{}\n{}", podcast.title, podcast.audio_url);
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool, AppError> {
    eprint!("{}", prompt);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
