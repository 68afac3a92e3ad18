//! Planning oracle adapters for toolpilot.
//!
//! All adapters implement the `toolpilot_core::PlanningOracle` trait.
//! [`oracle_from_config`] selects and configures one from `[planner]`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatOracle;

use toolpilot_config::PlannerConfig;
use toolpilot_core::error::OracleError;

/// Build the planning oracle described by the configuration.
pub fn oracle_from_config(config: &PlannerConfig) -> Result<OpenAiCompatOracle, OracleError> {
    let require_key = || {
        config
            .api_key
            .clone()
            .ok_or_else(|| OracleError::NotConfigured(format!("{} requires an API key", config.provider)))
    };

    let oracle = match config.provider.as_str() {
        "ollama" => OpenAiCompatOracle::ollama(config.base_url.as_deref(), config.model.as_str()),
        "openai" => OpenAiCompatOracle::openai(require_key()?, config.model.as_str()),
        "openrouter" => OpenAiCompatOracle::openrouter(require_key()?, config.model.as_str()),
        "custom" => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| OracleError::NotConfigured("custom provider requires base_url".into()))?;
            OpenAiCompatOracle::new(
                "custom",
                base_url,
                config.api_key.clone().unwrap_or_default(),
                config.model.as_str(),
            )
        }
        other => return Err(OracleError::NotConfigured(format!("unknown provider '{other}'"))),
    };

    // A base_url override applies to every provider.
    let oracle = match (&config.base_url, config.provider.as_str()) {
        (Some(url), "openai" | "openrouter") => OpenAiCompatOracle::new(
            config.provider.as_str(),
            url.as_str(),
            config.api_key.clone().unwrap_or_default(),
            config.model.as_str(),
        ),
        _ => oracle,
    };

    tracing::info!(provider = %config.provider, model = %config.model, "Planning oracle configured");

    let oracle = oracle
        .with_temperature(config.temperature)
        .with_timeout(config.timeout_secs);
    Ok(match config.max_tokens {
        Some(max) => oracle.with_max_tokens(max),
        None => oracle,
    })
}
