use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dost::{
    save_location, ChatController, Config, HttpBackend, JsonFileStore, MemoryStore,
    PreferenceStore, Sender, Widgets, LOCATION_KEY,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "dost")]
#[command(about = "Terminal chat client for the Dost wellbeing assistant")]
struct Cli {
    /// Backend base URL (overrides config and DOST_ENDPOINT)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// Your message
        message: String,
        /// Allow the conversation to be used for research
        #[arg(long)]
        consent: bool,
    },
    /// Show or change the saved location
    Location {
        #[command(subcommand)]
        action: LocationAction,
    },
    /// Write the default config file
    InitConfig,
}

#[derive(Subcommand)]
enum LocationAction {
    Show,
    Set { value: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|_| Config::new());
    let endpoint = cli.endpoint.clone().unwrap_or_else(|| config.endpoint());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            init_logging(true)?;
            run_chat(&config, endpoint).await
        }
        Commands::Ask { message, consent } => {
            init_logging(false)?;
            ask_once(&endpoint, &message, consent).await
        }
        Commands::Location { action } => {
            init_logging(false)?;
            manage_location(action)
        }
        Commands::InitConfig => {
            init_logging(false)?;
            Config::new().save()?;
            println!("Wrote {}", Config::get_config_path()?.display());
            Ok(())
        }
    }
}

/// The chat UI owns the terminal, so interactive logs go to a file.
fn init_logging(to_file: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "dost=info".into()),
    );

    if to_file {
        let dir = Config::config_dir()?;
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("dost.log"))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn open_store() -> Box<dyn PreferenceStore> {
    match JsonFileStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "Preferences unavailable, keeping them in memory");
            Box::new(MemoryStore::new())
        }
    }
}

async fn run_chat(config: &Config, endpoint: String) -> Result<()> {
    let widgets = Widgets {
        preset_prompts: Some(config.preset_prompts()).filter(|p| !p.is_empty()),
        consent_toggle: config.research_consent.unwrap_or(true),
        settings: config.settings.unwrap_or(true),
        mood_gauge: config.mood_gauge.unwrap_or(true),
    };
    let controller = ChatController::new(
        Arc::new(HttpBackend::new(&endpoint)),
        open_store(),
        widgets,
    );
    tracing::info!(%endpoint, "Starting chat");

    let mut app = App::new(controller, endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            if let Some(event) = events.next().await {
                handler::handle_event(&mut app, event).await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask_once(endpoint: &str, message: &str, consent: bool) -> Result<()> {
    let mut controller = ChatController::new(
        Arc::new(HttpBackend::new(endpoint)),
        open_store(),
        Widgets {
            preset_prompts: None,
            consent_toggle: true,
            settings: false,
            mood_gauge: true,
        },
    );
    if consent {
        controller.toggle_consent();
    }

    controller.send_message(Some(message)).await;

    for reply in controller
        .transcript()
        .messages()
        .filter(|m| m.sender == Sender::Bot)
    {
        println!("{}", reply.text);
    }

    if let Some(tier) = controller.mood_gauge().and_then(|g| g.tier()) {
        println!("\nMood: {}", tier.display_name());
    }

    if let Some(alert) = controller.crisis() {
        println!("\nYou are not alone. Please reach out for help now.");
        if let Some(helpline) = &alert.helpline {
            println!("Helpline: {}", helpline);
        }
    }

    Ok(())
}

fn manage_location(action: LocationAction) -> Result<()> {
    let mut store = JsonFileStore::open_default()?;

    match action {
        LocationAction::Show => match store.get(LOCATION_KEY) {
            Some(location) => println!("{}", location),
            None => println!("No location saved"),
        },
        LocationAction::Set { value } => match save_location(&mut store, &value)? {
            Some(location) => println!("Location saved: {}", location),
            None => println!("Location cleared"),
        },
        LocationAction::Clear => {
            save_location(&mut store, "")?;
            println!("Location cleared");
        }
    }

    Ok(())
}
