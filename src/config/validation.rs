use crate::config::types::{
    BackupConfig, Config, OutputConfig, RecoveryConfig, SelectorConfig, SiteConfig,
};
use crate::locale::Locale;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_recovery_config(&config.recovery)?;
    validate_output_config(&config.output)?;
    validate_backup_config(&config.backup)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates the target site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.index_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "index-path must start with '/', got '{}'",
            config.index_path
        )));
    }

    if config.locales.is_empty() {
        return Err(ConfigError::Validation(
            "locales cannot be empty".to_string(),
        ));
    }

    for code in &config.locales {
        if Locale::from_code(code).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unsupported locale '{}' (expected one of en, de, fr, it)",
                code
            )));
        }
    }

    if Locale::from_code(&config.default_language).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unsupported default-language '{}'",
            config.default_language
        )));
    }

    if !config
        .locales
        .iter()
        .any(|code| code.eq_ignore_ascii_case(&config.default_language))
    {
        return Err(ConfigError::Validation(format!(
            "default-language '{}' must be listed in locales",
            config.default_language
        )));
    }

    Ok(())
}

/// Validates the crash recovery policy
fn validate_recovery_config(config: &RecoveryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.signatures.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "crash signatures cannot be blank".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "file-prefix cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "file-prefix must be a bare file name, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}

/// Validates the backup schedule
fn validate_backup_config(config: &BackupConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(
            "backup interval-secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates that every selector is well-formed CSS
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (field, selector) in config.entries() {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                field: field.to_string(),
                selector: selector.to_string(),
            });
        }
    }
    Ok(())
}
