use anyhow::Result;

use crate::config::{Config, Environment};

/// Print the endpoint tables, marking the active environment.
pub fn list_endpoints(config: &Config) -> Result<()> {
    println!(
        "{:<14} {:<8} {:<40} {:<40} NOID",
        "ENVIRONMENT", "ACTIVE", "APP", "FILES"
    );

    for env in [Environment::Production, Environment::Development] {
        let active = if env == config.environment { "*" } else { "" };
        match config.endpoints.get(env) {
            Some(e) => println!(
                "{:<14} {:<8} {:<40} {:<40} {}",
                env, active, e.app_url, e.file_server_url, e.noid_url
            ),
            None => println!("{:<14} {:<8} NOT CONFIGURED", env, active),
        }
    }

    println!();
    println!("mint url:  {}", config.endpoints()?.mint_url());
    println!(
        "bind:      field '{}' -> {}<ark>{}",
        config.bind.field,
        config.bind_base_url()?,
        if config.bind.enabled { "" } else { "  (disabled)" }
    );
    println!(
        "http:      timeout {}s, {} retries",
        config.http.timeout_secs, config.http.max_retries
    );

    Ok(())
}
