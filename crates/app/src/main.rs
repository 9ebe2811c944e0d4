use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use services::{AppServices, Clock, ObservationLoopService, RemoteKind};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use ui::{App, UiApp, build_app_context};

const DEFAULT_EXPORT_DIR: &str = "exports";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidRemote { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidRemote { raw } => {
                write!(f, "invalid --remote value: {raw} (expected none, sheets or drive)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    observation: Arc<ObservationLoopService>,
    export_dir: PathBuf,
}

impl UiApp for DesktopApp {
    fn observation(&self) -> Arc<ObservationLoopService> {
        Arc::clone(&self.observation)
    }

    fn export_dir(&self) -> PathBuf {
        self.export_dir.clone()
    }
}

#[derive(Debug, PartialEq)]
struct Args {
    db_url: Option<String>,
    export_dir: PathBuf,
    remote: RemoteKind,
    session_tokens: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- [--db <sqlite_url>] [--export-dir <dir>] [--remote none|sheets|drive] [--session-tokens]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  in-memory journal, --export-dir {DEFAULT_EXPORT_DIR}, --remote none");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  USABILITY_DB_URL, USABILITY_EXPORT_DIR, USABILITY_REMOTE, USABILITY_SESSION_TOKENS");
    eprintln!("  USABILITY_SHEETS_ID, USABILITY_SHEETS_RANGE, USABILITY_SHEETS_TOKEN, USABILITY_SHEETS_BASE_URL");
    eprintln!("  USABILITY_DRIVE_FOLDER_ID, USABILITY_DRIVE_TOKEN, USABILITY_DRIVE_BASE_URL");
    eprintln!("  RUST_LOG, USABILITY_LOG_JSON");
}

fn env_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn parse_remote(raw: String) -> Result<RemoteKind, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidRemote { raw })
}

impl Args {
    /// Flags win over environment variables.
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("USABILITY_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map(normalize_sqlite_url);
        let mut export_dir = env("USABILITY_EXPORT_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR), PathBuf::from);
        let mut remote = env("USABILITY_REMOTE")
            .map(parse_remote)
            .transpose()?
            .unwrap_or_default();
        let mut session_tokens = env_bool(env("USABILITY_SESSION_TOKENS").as_deref());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(normalize_sqlite_url(value));
                }
                "--export-dir" => {
                    export_dir = PathBuf::from(require_value(args, "--export-dir")?);
                }
                "--remote" => {
                    remote = parse_remote(require_value(args, "--remote")?)?;
                }
                "--session-tokens" => session_tokens = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            export_dir,
            remote,
            session_tokens,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
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

    let path = std::path::Path::new(path);
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool(std::env::var("USABILITY_LOG_JSON").ok().as_deref()) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&mut argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = Clock::default_clock();
    let services = match parsed.db_url.as_deref() {
        Some(db_url) => {
            // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url, clock, parsed.remote, parsed.session_tokens).await?
        }
        None => AppServices::new_in_memory(clock, parsed.remote, parsed.session_tokens)?,
    };
    tracing::info!(
        export_dir = %parsed.export_dir.display(),
        remote = %parsed.remote,
        "starting usability logger"
    );

    let app: Arc<dyn UiApp> = Arc::new(DesktopApp {
        observation: services.observation(),
        export_dir: parsed.export_dir,
    });
    let context = build_app_context(&app);

    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title("Usability Logger")
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
