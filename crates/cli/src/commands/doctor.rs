//! `supportline doctor`: diagnose configuration.

use supportline_config::AppConfig;
use supportline_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Supportline Doctor");
    println!("==================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [warn] No config file, using defaults. Run `supportline onboard`");
        issues += 1;
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config valid");
            println!(
                "  [ok]   Provider {} with model {}",
                config.default_provider, config.default_model
            );
            println!("  [ok]   Embedding model {}", config.retrieval.embedding_model);

            if config.has_api_key() {
                println!("  [ok]   API key configured");
            } else {
                println!(
                    "  [warn] No API key. Add api_key to config.toml or export GOOGLE_API_KEY"
                );
                issues += 1;
            }

            let router = supportline_providers::build_from_config(&config);
            if let Some(provider) = router.default() {
                println!("  [ok]   Providers registered: {}", router.list().join(", "));
                let (reachable, line) = provider_reachability(provider.as_ref()).await;
                println!("  {line}");
                if !reachable {
                    issues += 1;
                }
            } else {
                println!(
                    "  [fail] Default provider '{}' is not registered",
                    config.default_provider
                );
                issues += 1;
            }
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ask the provider's health endpoint and render one report line.
async fn provider_reachability(provider: &dyn Provider) -> (bool, String) {
    match provider.health_check().await {
        Ok(true) => (true, format!("[ok]   Provider {} reachable", provider.name())),
        Ok(false) => (
            false,
            format!(
                "[warn] Provider {} answered but rejected the health check (check the API key)",
                provider.name()
            ),
        ),
        Err(e) => (
            false,
            format!("[fail] Provider {} unreachable: {e}", provider.name()),
        ),
    }
}
