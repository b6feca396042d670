//! Config command handler

use portero::SuiteConfig;

use crate::commands::{ConfigArgs, ConfigFormat};
use crate::config;
use crate::error::CliResult;

/// Effective configuration in the requested format
pub fn render_config(config: &SuiteConfig, format: ConfigFormat) -> CliResult<String> {
    Ok(match format {
        ConfigFormat::Yaml => config.to_yaml()?,
        ConfigFormat::Json => {
            let mut json = serde_json::to_string_pretty(config)?;
            json.push('\n');
            json
        }
    })
}

/// Execute the config command
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    let config = config::suite_config(&args.suite)?;
    print!("{}", render_config(&config, args.format)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trips() {
        let config = SuiteConfig::default();
        let yaml = render_config(&config, ConfigFormat::Yaml).unwrap();
        assert_eq!(SuiteConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_json_has_base_url() {
        let json = render_config(&SuiteConfig::default(), ConfigFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["base_url"], portero::config::DEFAULT_BASE_URL);
    }
}
