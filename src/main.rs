use anyhow::Result;
use clap::Parser;
use outfit_tryon::app::App;
use outfit_tryon::models::Config;
use outfit_tryon::session::Slot;
use outfit_tryon::{tui, view};
use ratatui::{backend::CrosstermBackend, Terminal, TerminalOptions, Viewport};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "outfit-tryon")]
#[command(about = "Virtual outfit try-on: dress a person photo in an outfit photo")]
struct CliArgs {
    /// Photo of the person to dress.
    #[arg(long, value_name = "PATH")]
    person: Option<PathBuf>,

    /// Photo of the outfit to put on.
    #[arg(long, value_name = "PATH")]
    outfit: Option<PathBuf>,

    /// Directory that downloaded results are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Stay in the interactive session even when both photos are given.
    #[arg(short, long)]
    interactive: bool,

    /// Where logs go while the interactive screen owns the terminal.
    #[arg(long, value_name = "PATH", default_value = "outfit-tryon.log")]
    log_file: PathBuf,
}

impl CliArgs {
    /// Both photos on the command line and no request for a session.
    fn one_shot(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.person, &self.outfit, self.interactive) {
            (Some(person), Some(outfit), false) => Some((person, outfit)),
            _ => None,
        }
    }
}

/// Logs go to stderr, or to `log_file` when the screen is in use.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "outfit_tryon=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let one_shot = args.one_shot();

    init_tracing(one_shot.is_none().then_some(args.log_file.as_path()))?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            eprintln!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting outfit-tryon");
    let mut app = App::from_config(&config, args.output_dir.clone());

    if let Some((person, outfit)) = one_shot {
        let mut terminal = Terminal::with_options(
            CrosstermBackend::new(std::io::stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(view::SCREEN_HEIGHT),
            },
        )?;
        let outcome = app.run_once(person, outfit, &mut terminal).await;
        println!();
        return match outcome {
            Ok(path) => {
                info!("Try-on saved to {}", path.display());
                Ok(())
            }
            Err(e) => {
                error!("Try-on failed: {}", e);
                std::process::exit(1);
            }
        };
    }

    // Preselect whatever was passed on the command line.
    if let Some(person) = &args.person {
        app.select_path(Slot::Person, person).await;
    }
    if let Some(outfit) = &args.outfit {
        app.select_path(Slot::Outfit, outfit).await;
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let outcome = app.run_interactive(&mut terminal, tui::events()).await;
    tui::restore()?;
    outcome?;

    info!("Session ended");
    Ok(())
}
