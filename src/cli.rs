use std::{
    io::{IsTerminal, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    config::AppConfig,
    dispatch::{
        project, ControllerSettings, DispatchEvent, FallbackPolicy, SessionController,
        SessionSnapshot,
    },
    location::{FixedLocation, LocationProvider, NoLocation},
    models::{Coordinates, DispatchRecord, Priority, RecordSource, TriageResponse, UserProfile},
    render::{render_dashboard, render_projection},
    settings::ProfileStore,
    triage::GeminiClassifier,
};

#[derive(Parser, Debug)]
#[command(
    name = "resq",
    version,
    about = "Simulated emergency dispatch with AI triage. For demonstration only: in a real emergency, dial 911."
)]
pub struct Cli {
    /// Profile file (defaults to RESQ_PROFILE_PATH or ./resq-profile.json)
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Describe an emergency and follow the simulated dispatch until arrival.
    Request(RequestArgs),
    /// Print the dashboard projection for a given ETA and elapsed time.
    Project {
        #[arg(long)]
        eta_minutes: i64,
        #[arg(long, default_value_t = 0)]
        elapsed: u64,
        #[arg(long, default_value = "Standard Ambulance")]
        vehicle: String,
    },
    /// Show or edit the caller profile.
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Free-text description of the emergency
    #[arg(required = true, num_args = 1..)]
    pub description: Vec<String>,
    /// Caller name; overrides the profile name
    #[arg(long)]
    pub name: Option<String>,
    /// Report triage failures instead of dispatching the standard fallback unit
    #[arg(long)]
    pub no_fallback: bool,
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
    /// Simulated seconds per tick
    #[arg(long)]
    pub seconds_per_tick: Option<u64>,
    /// Real milliseconds between ticks
    #[arg(long)]
    pub tick_ms: Option<u64>,
    /// Emit one JSON snapshot per tick instead of the text dashboard
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        contact_name: Option<String>,
        #[arg(long)]
        contact_phone: Option<String>,
        #[arg(long)]
        medical_info: Option<String>,
    },
    Clear,
}

pub async fn execute(cli: Cli, mut config: AppConfig) -> Result<()> {
    if let Some(path) = cli.profile {
        config.profile_path = path;
    }

    match cli.command {
        Command::Request(args) => request(args, config).await,
        Command::Project {
            eta_minutes,
            elapsed,
            vehicle,
        } => project_once(eta_minutes, elapsed, vehicle),
        Command::Profile(command) => profile(command, &config),
    }
}

async fn request(args: RequestArgs, mut config: AppConfig) -> Result<()> {
    config.fallback = if args.no_fallback {
        FallbackPolicy::Surface
    } else {
        FallbackPolicy::Substitute
    };
    if let Some(secs) = args.seconds_per_tick {
        config.seconds_per_tick = secs.max(1);
    }
    if let Some(ms) = args.tick_ms {
        config.tick_interval = Duration::from_millis(ms.max(10));
    }
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; triage requests will fail");
    }

    let profiles = Arc::new(ProfileStore::open(&config.profile_path)?);
    let classifier = Arc::new(GeminiClassifier::from_config(&config)?);
    let location: Arc<dyn LocationProvider> = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Arc::new(FixedLocation(Coordinates { lat, lng })),
        _ => Arc::new(NoLocation),
    };

    let controller = SessionController::new(
        classifier,
        location,
        profiles.clone(),
        ControllerSettings::from(&config),
    );
    let profile = profiles.profile();
    let mut events = controller.subscribe();
    let description = args.description.join(" ");

    let request = controller.request_help(&description, args.name.clone());
    tokio::pin!(request);
    let record = loop {
        tokio::select! {
            result = &mut request => break result,
            event = events.recv() => {
                if let Ok(DispatchEvent::StateChanged { .. }) = event {
                    show(&controller.snapshot().await?, &profile, args.json)?;
                }
            }
        }
    };

    let record = match record {
        Ok(record) => record,
        Err(err) => {
            eprintln!("System failed to connect. Please dial 911 immediately.");
            return Err(err).context("emergency request failed");
        }
    };
    info!(
        "Dispatched {} ({}) with ETA {} min",
        record.vehicle_type,
        record.priority,
        record.eta_minutes()
    );

    show(&controller.snapshot().await?, &profile, args.json)?;
    controller.start_ticker().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(DispatchEvent::Tick(snapshot)) => show(&snapshot, &profile, args.json)?,
                Ok(DispatchEvent::Arrived { .. }) => break,
                Ok(DispatchEvent::StateChanged { .. }) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Dashboard skipped {skipped} updates"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; resetting session");
                break;
            }
        }
    }

    controller.reset().await;
    Ok(())
}

fn show(snapshot: &SessionSnapshot, profile: &UserProfile, json: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string(snapshot)?)?;
    } else {
        if stdout.is_terminal() {
            write!(stdout, "\x1b[2J\x1b[H")?;
        }
        write!(stdout, "{}", render_dashboard(snapshot, profile))?;
    }
    stdout.flush()?;
    Ok(())
}

fn project_once(eta_minutes: i64, elapsed: u64, vehicle: String) -> Result<()> {
    let response = TriageResponse {
        priority: Priority::Medium,
        eta_minutes,
        vehicle_type: vehicle,
        recommended_action: String::new(),
        summary: String::new(),
        assistant_name: String::new(),
        contact_notification_message: String::new(),
    };
    let record =
        DispatchRecord::from_triage(response, "preview".into(), None, RecordSource::Classifier)?;
    let projection = project(&record, elapsed)?;
    print!("{}", render_projection(&projection, None));
    Ok(())
}

fn profile(command: ProfileCommand, config: &AppConfig) -> Result<()> {
    let store = ProfileStore::open(&config.profile_path)?;
    match command {
        ProfileCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&store.profile())?);
        }
        ProfileCommand::Set {
            name,
            phone,
            contact_name,
            contact_phone,
            medical_info,
        } => {
            if name.is_none()
                && phone.is_none()
                && contact_name.is_none()
                && contact_phone.is_none()
                && medical_info.is_none()
            {
                bail!("nothing to update; pass at least one field");
            }
            let mut profile = store.profile();
            let fields = [
                (name, &mut profile.name),
                (phone, &mut profile.phone),
                (contact_name, &mut profile.emergency_contact_name),
                (contact_phone, &mut profile.emergency_contact_phone),
                (medical_info, &mut profile.medical_info),
            ];
            for (value, field) in fields {
                if let Some(value) = value {
                    *field = value.trim().to_string();
                }
            }
            store.update(profile)?;
            println!("Profile saved to {}", config.profile_path.display());
        }
        ProfileCommand::Clear => {
            store.update(UserProfile::default())?;
            println!("Profile cleared");
        }
    }
    Ok(())
}
