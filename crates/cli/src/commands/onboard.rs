//! `concierge onboard` — First-time setup.

use concierge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Concierge — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !config_path.exists() {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config file: {}", config_path.display());
    } else {
        println!("  Config file exists: {}", config_path.display());
    }

    println!("\nNext steps:");
    println!("  1. Set your API key:   export OPENAI_API_KEY='sk-...'");
    println!("  2. Set the endpoint:   export CONCIERGE_BASE_URL='https://api.openai.com'");
    println!("  3. Start chatting:     concierge chat");

    Ok(())
}
