//! `supportline onboard`: first-time setup.

use supportline_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Supportline: First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config file already present, left untouched: {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Wrote default config: {}", config_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("    1. Set api_key in {} or export GOOGLE_API_KEY", config_path.display());
    println!("    2. Run `supportline doctor` to check the setup");
    println!("    3. Run `supportline serve` to start the API");

    Ok(())
}
