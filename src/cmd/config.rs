//! Configuration view and validation commands — `flowgate config`.

use anyhow::{Context, Result, bail};

use flowgate::config::{GatewayConfig, missing_vars};

use super::super::ConfigCommands;

pub fn cmd_config(command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config = GatewayConfig::from_env().context("Configuration is incomplete")?;
            let gh = &config.github;
            println!();
            println!("Flowgate Configuration");
            println!("======================");
            println!();
            println!("  session_secret           = <redacted>");
            println!("  github_api_url           = {}", gh.api_url);
            println!("  github_web_url           = {}", gh.web_url);
            println!("  github_app_id            = {}", shown(gh.app_id.as_deref()));
            println!("  github_app_private_key   = {}", redacted(gh.private_key.is_some()));
            println!("  github_client_id         = {}", shown(gh.client_id.as_deref()));
            println!("  github_client_secret     = {}", redacted(gh.client_secret.is_some()));
            println!("  github_redirect_url      = {}", shown(gh.redirect_url.as_deref()));
            println!("  frontend_url             = {}", config.frontend_url);
            println!("  secure_cookies           = {}", config.secure_cookies);
            println!("  installation_token_cache = {}", config.token_cache_enabled);
            println!("  upstream_timeout_secs    = {}", config.upstream_timeout.as_secs());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let missing = missing_vars(|name| std::env::var(name).ok());
            if missing.is_empty() {
                // Present values can still be malformed.
                GatewayConfig::from_env()?;
                println!("Configuration is valid.");
                return Ok(());
            }
            println!("Missing configuration:");
            for name in &missing {
                println!("  - {}", name);
            }
            bail!("{} required variable(s) not set", missing.len());
        }
    }

    Ok(())
}

fn shown(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

fn redacted(present: bool) -> &'static str {
    if present { "<redacted>" } else { "(not set)" }
}
