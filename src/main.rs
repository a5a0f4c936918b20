use anyhow::Result;
use clap::{Parser, Subcommand};

use askbot_core::config::{self, Config};

#[derive(Parser)]
#[command(
    name = "askbot",
    about = format!("{} askbot - Telegram assistant backed by Gemini and SerpAPI", askbot_core::LOGO),
    version = askbot_core::VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start polling Telegram and answering messages (default)
    Gateway,
    /// Show which credentials and storage are configured
    Status,
    /// Write a default config file to ~/.askbot/config.json
    Onboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("askbot=info".parse()?)
                .add_directive("askbot_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Gateway) {
        Commands::Gateway => cmd_gateway().await?,
        Commands::Status => cmd_status()?,
        Commands::Onboard => cmd_onboard()?,
    }

    Ok(())
}

async fn cmd_gateway() -> Result<()> {
    let cfg = config::load_config_from_env();
    println!("{} Starting askbot gateway...", askbot_core::LOGO);
    askbot_core::service::gateway::run_gateway(cfg).await
}

fn cmd_status() -> Result<()> {
    let config_path = config::get_config_path();
    let cfg = config::load_config_from_env();

    println!("{} askbot Status\n", askbot_core::LOGO);
    println!(
        "Config: {} {}",
        config_path.display(),
        if config_path.exists() { "✓" } else { "✗" }
    );

    let mark = |value: &str| if value.is_empty() { "not set" } else { "✓" };
    println!("Telegram token: {}", mark(&cfg.channels.telegram.token));
    println!("Gemini API: {}", mark(&cfg.providers.gemini.api_key));
    println!("SerpAPI: {}", mark(&cfg.tools.web_search.api_key));

    println!("Text model: {}", cfg.providers.gemini.text_model);
    println!("Vision model: {}", cfg.providers.gemini.vision_model);

    match cfg.storage_backend() {
        Ok(backend) => println!(
            "Storage: {:?} (database '{}')",
            backend, cfg.storage.database
        ),
        Err(e) => println!("Storage: {}", e),
    }

    if cfg.channels.telegram.allow_from.is_empty() {
        println!("Allow list: everyone");
    } else {
        println!("Allow list: {} entries", cfg.channels.telegram.allow_from.len());
    }

    Ok(())
}

fn cmd_onboard() -> Result<()> {
    let config_path = config::get_config_path();

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        println!("Delete it first to re-onboard.");
        return Ok(());
    }

    config::save_config(&Config::default(), None)?;
    println!("{} Created config at {}", askbot_core::LOGO, config_path.display());

    println!("\nNext steps:");
    println!("  1. Set TELEGRAM_BOT_TOKEN, GEMINI_API_KEY and SERPAPI_KEY (or edit the config)");
    println!("  2. Start MongoDB, or set ASKBOT_STORAGE=memory");
    println!("  3. Run: askbot gateway");
    Ok(())
}
