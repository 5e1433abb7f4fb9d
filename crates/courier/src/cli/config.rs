//! `courier config` handler.

use courier_error::{ConfigError, CourierResult};
use courier_rate_limit::CourierConfig;
use std::path::Path;
use tracing::{debug, instrument};

fn to_toml<T: serde::Serialize>(value: &T) -> CourierResult<String> {
    toml::to_string_pretty(value)
        .map_err(|e| ConfigError::new(format!("Failed to format configuration: {}", e)).into())
}

/// Describe the configuration of one platform tier, or every platform.
pub fn describe_config(
    config: &CourierConfig,
    platform: Option<&str>,
    tier: Option<&str>,
) -> CourierResult<String> {
    let Some(platform) = platform else {
        let mut names: Vec<&String> = config.platforms.keys().collect();
        names.sort();

        let mut out = String::new();
        for name in names {
            let platform_config = &config.platforms[name];
            let mut tiers: Vec<&String> = platform_config.tiers.keys().collect();
            tiers.sort();
            let tiers: Vec<&str> = tiers.into_iter().map(String::as_str).collect();
            out.push_str(&format!(
                "{}: default tier '{}', tiers [{}]\n",
                name,
                platform_config.default_tier,
                tiers.join(", ")
            ));
        }
        out.push_str("\n[dispatch]\n");
        out.push_str(&to_toml(&config.dispatch)?);
        return Ok(out);
    };

    let tier_config = config.get_tier(platform, tier).ok_or_else(|| {
        ConfigError::new(format!(
            "No tier '{}' configured for platform '{}'",
            tier.unwrap_or("<default>"),
            platform
        ))
    })?;

    let mut out = format!("# platform: {}\n", platform);
    if let Some(api_base) = config.api_base(platform) {
        out.push_str(&format!("# api_base: {}\n", api_base));
    }
    out.push_str(&to_toml(&tier_config)?);
    Ok(out)
}

/// Load the configuration and print it.
#[instrument(skip_all, fields(platform = ?platform, tier = ?tier))]
pub fn handle_config_command(
    file: Option<&Path>,
    platform: Option<&str>,
    tier: Option<&str>,
) -> CourierResult<()> {
    let config = match file {
        Some(path) => CourierConfig::from_file(path)?,
        None => CourierConfig::load()?,
    };
    debug!(platforms = config.platforms.len(), "Loaded configuration");

    print!("{}", describe_config(&config, platform, tier)?);
    Ok(())
}
