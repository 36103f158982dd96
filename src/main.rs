use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gptbot::{BASE_URL, CONFIG_FILE, load_config_or_exit};

/// GPT chat bot
#[derive(Parser, Debug)]
#[command(name = "gptbot", version)]
#[command(about = "GPT chat bot, configured from ./config.json")]
struct Args {}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_timer(ChronoLocal::rfc_3339()))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("gptbot=info".parse()?))
        .init();

    let _args = Args::parse();

    let config = load_config_or_exit();

    info!("Loaded configuration from {}", CONFIG_FILE);
    info!("API endpoint: {}", BASE_URL);
    info!("Proxy: {}", config.proxy().unwrap_or("none"));
    info!("Auto pass: {}", config.auto_pass);
    info!(
        "Chat context: max {} records, kept {} minutes",
        config.chat_max_context, config.chat_ttl_time
    );
    info!(
        "GPT timeout: {}s, limit {} requests per minute",
        config.gpt_time_out, config.gpt_limit_per_minute
    );
    info!(
        "Keywords: image={} text_edit={} separator={} variation={} (within {}s)",
        config.generate_image_keyword,
        config.text_edit_keyword,
        config.text_edit_separator,
        config.image_variation_keyword,
        config.image_variation_chat_ttl
    );
    if config.api_key.trim().is_empty() {
        warn!("api_key is empty, GPT requests will be rejected");
    }

    Ok(())
}
