use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use plantguard_core::{
    init, render, AppError, AuthError, Config, FsPicker, PlantGuard, Settings,
    UploadSession,
};
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use termimad::crossterm::style::Color;
use termimad::MadSkin;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plant disease detection client", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a leaf photo and show the predicted disease
    Predict {
        /// Image to upload; prompts for one when omitted
        image: Option<PathBuf>,

        /// Override the prediction endpoint
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Export the result as a report afterwards
        #[arg(long, default_value_t = false)]
        export: bool,
    },
    /// Sign in with an email or username
    Login {
        /// Email or username; prompts when omitted
        identifier: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    /// Show or change persisted settings
    Settings {
        /// Persist a prediction endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Persist a report directory
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Forget all persisted settings
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    match args.command {
        Command::Predict { image, endpoint, export } => {
            let mut config = Config::load().context("Failed to load configuration")?;
            if let Some(e) = endpoint {
                config.set_endpoint(&e).context("Invalid --endpoint")?;
            }
            predict(PlantGuard::with_config(config), image, export).await
        }
        Command::Login { identifier } => {
            let app = PlantGuard::new().context("Failed to load configuration")?;
            let identifier = match identifier {
                Some(i) => i,
                None => prompt("Email or Username: ")?,
            };
            let password = prompt_password("Password: ")?;
            match app.auth() {
                Ok(auth) => match auth.login(&identifier, &password).await {
                    Ok(account) => println!("Logged in as {}", account.email),
                    Err(e) => auth_alert("Login Error", &e),
                },
                Err(e) => alert(&e),
            }
            Ok(())
        }
        Command::Signup { email, username } => {
            let app = PlantGuard::new().context("Failed to load configuration")?;
            let email = match email {
                Some(e) => e,
                None => prompt("Email: ")?,
            };
            let username = match username {
                Some(u) => u,
                None => prompt("Username: ")?,
            };
            let password = prompt_password("Password: ")?;
            match app.auth() {
                Ok(auth) => match auth.signup(&email, &username, &password).await {
                    Ok(account) => println!("Account created for {}", account.email),
                    Err(e) => auth_alert("Signup Error", &e),
                },
                Err(e) => alert(&e),
            }
            Ok(())
        }
        Command::Settings { endpoint, report_dir, clear } => {
            update_settings(endpoint, report_dir, clear)
        }
    }
}

async fn predict(app: PlantGuard, image: Option<PathBuf>, export: bool) -> Result<()> {
    let mut session = UploadSession::new();

    // Pick
    let picked = match image {
        Some(path) => session.pick_image(&FsPicker::with_path(path)),
        None => session.pick_image(&app.interactive_picker()),
    };
    match picked {
        Ok(true) => {}
        Ok(false) => {
            println!("Selection cancelled");
            return Ok(());
        }
        Err(e) => {
            alert(&e);
            return Ok(());
        }
    }

    // Upload
    let client = match app.prediction_client() {
        Ok(c) => c,
        Err(e) => {
            alert(&e);
            return Ok(());
        }
    };
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Predicting disease via {}...", client.endpoint()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = session.predict(&client).await.map(|_| ());
    spinner.finish_and_clear();

    if let Err(e) = outcome {
        alert(&e);
        return Ok(());
    }
    debug!("session state: {:?}", session.state());

    // Show
    if let Some(view) = render(session.prediction()) {
        print_markdown(&view.to_markdown());
    }

    // Export
    if export {
        match app.report_exporter().export(session.prediction(), session.image()) {
            Ok(outcome) => {
                println!("{}", report_notice(&outcome.document));
                if outcome.shared {
                    println!("(Report path copied to clipboard)");
                }
                for warning in &outcome.warnings {
                    eprintln!("Warning: {}", warning);
                }
            }
            Err(e) => alert(&e),
        }
    }

    Ok(())
}

fn update_settings(endpoint: Option<String>, report_dir: Option<PathBuf>, clear: bool) -> Result<()> {
    let mut settings = if clear { Settings::default() } else { Settings::load() };
    let changed = clear || endpoint.is_some() || report_dir.is_some();

    if let Some(e) = endpoint {
        plantguard_core::config::parse_endpoint(&e).context("Invalid --endpoint")?;
        settings.endpoint = Some(e);
    }
    if let Some(dir) = report_dir {
        settings.report_dir = Some(dir);
    }
    if changed {
        settings.save().context("Failed to save settings")?;
    }

    let config = Config::load().context("Failed to load configuration")?;
    if let Some(path) = Settings::config_path() {
        println!("Settings file: {}", path.display());
    }
    println!("Endpoint:      {}", config.endpoint);
    println!("Report dir:    {}", config.report_dir.display());
    println!("Media dir:     {}", config.media_dir.display());
    println!(
        "Accounts:      {}",
        if config.firebase.is_some() { "configured" } else { "not configured" }
    );
    Ok(())
}

fn report_notice(document: &Path) -> String {
    format!("HTML report saved to {}", document.display())
}

/// Blocking notice for a failed action.
fn alert(err: &AppError) {
    eprintln!("{}: {}", err.title(), err);
}

fn auth_alert(title: &str, err: &AuthError) {
    eprintln!("{}: {}", title, err);
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Like [`prompt`] but without echoing what is typed.
fn prompt_password(label: &str) -> Result<String> {
    rpassword::prompt_password(label).context("Failed to read password")
}

/// Helper to print markdown
fn print_markdown(text: &str) {
    let mut skin = MadSkin::default();
    skin.bold.set_fg(Color::Yellow);
    skin.headers[1].set_fg(Color::Green);
    skin.bullet.set_fg(Color::Green);

    skin.print_text(text);
}
