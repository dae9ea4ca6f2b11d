use faceid::device::{ask, is_eof, TerminalDevice};
use faceid::{
    Capability, CaptureDevice, Config, FlowError, LoginFlow, Navigation, Notice,
    RegistrationFlow, Screen, SubmissionClient, Transition,
};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "faceid")]
#[command(about = "Enroll or log in with your face against a recognition service")]
struct Cli {
    /// Config file (default: per-user faceid.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging with file and line numbers
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer yes to every permission prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[command(flatten)]
        source: PhotoSource,
    },
    /// Log in by recognizing your face
    Login {
        #[command(flatten)]
        source: PhotoSource,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PhotoSource {
    /// Use an existing photo
    #[arg(long)]
    photo: Option<PathBuf>,
    /// Take a photo with the configured capture command
    #[arg(long)]
    camera: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let client = SubmissionClient::new(&config.service)?;

    let camera = match &cli.command {
        Commands::Register { source, .. } | Commands::Login { source } => source.camera,
    };
    if camera && config.capture.command.is_none() {
        bail!("--camera needs capture.command in the config file, e.g. \"fswebcam --no-banner {{output}}\"");
    }

    let succeeded = match cli.command {
        Commands::Register { name, email, source } => {
            let device = Arc::new(TerminalDevice::new(source.photo, config.capture.clone(), cli.yes));
            let flow = RegistrationFlow::new(device, client);
            if config.permissions.prompt_on_open {
                flow.screen().prime_permissions().await;
            }
            for (field, transition) in [("name", flow.set_name(&name)), ("email", flow.set_email(&email))] {
                if transition != Transition::Applied {
                    bail!("Could not set {}: {:?}", field, transition);
                }
            }

            if acquire(flow.screen(), source.camera).await? {
                let transition = flow.submit().await;
                settle(flow.screen(), transition)
            } else {
                false
            }
        }
        Commands::Login { source } => {
            let device = Arc::new(TerminalDevice::new(source.photo, config.capture.clone(), cli.yes));
            let flow = LoginFlow::new(device, client);
            if config.permissions.prompt_on_open {
                flow.screen().prime_permissions().await;
            }

            if acquire(flow.screen(), source.camera).await? {
                let transition = flow.submit().await;
                settle(flow.screen(), transition)
            } else {
                false
            }
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Drive the screen until it holds an image. `false` if the user gave up.
async fn acquire<D: CaptureDevice>(screen: &Screen<D>, use_camera: bool) -> Result<bool> {
    let capability = if use_camera { Capability::Camera } else { Capability::Gallery };
    let mut transition = if use_camera {
        screen.open_camera().await
    } else {
        screen.pick_from_gallery().await
    };

    if let Transition::Failed(FlowError::PermissionDenied(_)) = transition {
        show(screen.notice());
        let answer = match ask(&format!("Ask for {} access again? [y/N] ", capability)).await {
            Ok(answer) => answer,
            Err(e) if is_eof(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if !answer.eq_ignore_ascii_case("y") {
            return Ok(false);
        }
        transition = screen.request_access(capability).await;
    }

    match transition {
        Transition::Applied => {}
        Transition::Cancelled => {
            println!("No photo selected");
            return Ok(false);
        }
        _ => {
            show(screen.notice());
            return Ok(false);
        }
    }

    if !use_camera {
        return Ok(screen.image().is_some());
    }

    loop {
        let answer = match ask("Press Enter to take the picture (c to cancel): ").await {
            Ok(answer) => answer,
            Err(e) if is_eof(&e) => String::from("c"),
            Err(e) => return Err(e.into()),
        };
        if answer.eq_ignore_ascii_case("c") {
            match screen.cancel_camera() {
                Transition::Cancelled => println!("Camera closed"),
                other => debug!("Camera was not open: {:?}", other),
            }
            return Ok(false);
        }
        match screen.capture_photo().await {
            Transition::Applied => return Ok(true),
            Transition::Failed(_) => show(screen.notice()),
            _ => return Ok(false),
        }
    }
}

fn settle<D: CaptureDevice>(screen: &Screen<D>, transition: Transition) -> bool {
    show(screen.notice());
    match transition {
        Transition::Applied => {
            if let Some(Navigation::BackToEntry) = screen.acknowledge() {
                println!("Done.");
            }
            true
        }
        _ => false,
    }
}

fn show(notice: Option<Notice>) {
    if let Some(notice) = notice {
        if notice.is_success() {
            println!("✅ {} {}", notice.title, notice.message);
        } else {
            eprintln!("❌ {} {}", notice.title, notice.message);
        }
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
    }
}
