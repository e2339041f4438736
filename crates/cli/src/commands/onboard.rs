//! `zoogent onboard`: First-time setup.

use zoogent_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("ZooGent — First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Export AWS_BEARER_TOKEN_BEDROCK (or set api_key in the config)");
    println!("   2. Export GOOGLE_API_KEY and GOOGLE_CX for Custom Search");
    println!("   3. Adjust [domains] and [pipeline] if needed");
    println!("   4. Run: zoogent doctor, then zoogent chat\n");

    Ok(())
}
