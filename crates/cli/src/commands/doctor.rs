//! `zoogent doctor`: Diagnose configuration and connectivity.

use zoogent_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("ZooGent Doctor — Diagnostics");
    println!("============================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — defaults and environment only (`zoogent onboard` writes one)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the config and re-run.");
            return Ok(());
        }
    };

    println!("     provider: {}  model: {}", config.default_provider, config.default_model);
    println!("     variant:  {:?}", config.pipeline.variant);

    if config.has_api_key() {
        println!("  ✅ LLM API key configured");
    } else {
        println!("  ⚠️  No LLM API key — set AWS_BEARER_TOKEN_BEDROCK or ZOOGENT_API_KEY");
        issues += 1;
    }

    if config.has_search_credentials() {
        println!("  ✅ Search credentials configured");
    } else {
        println!("  ⚠️  Missing search credentials — set GOOGLE_API_KEY and GOOGLE_CX");
        issues += 1;
    }

    println!(
        "     domains: {} forum, {} B2C marketplace, {} B2B marketplace",
        config.domains.forum.len(),
        config.domains.marketplace_b2c.len(),
        config.domains.marketplace_b2b.len()
    );

    match zoogent_providers::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' answered with an error status", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Provider not usable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
