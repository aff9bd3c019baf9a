//! `promethium config ...`

use anyhow::Result;
use console::style;

use promethium::config::{
    API_KEY_KEY, BASE_URL_KEY, CONNECTION_SECTION, CREDENTIALS_SECTION, read_config,
    write_config_value,
};

use super::common::print_json;
use crate::cli::ConfigCommand;

/// Execute a config subcommand.
pub fn execute(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Read => {
            let values = read_config(None)?;
            if values.is_empty() {
                println!("No config found.");
                return Ok(());
            }
            print_json(&values)
        }
        ConfigCommand::Credentials { api_key } => {
            let path = write_config_value(CREDENTIALS_SECTION, API_KEY_KEY, api_key.trim(), None)?;
            eprintln!(
                "{} Saved API key to {}",
                style("✓").green().bold(),
                path.display()
            );
            Ok(())
        }
        ConfigCommand::BaseUrl { url } => {
            let path = write_config_value(CONNECTION_SECTION, BASE_URL_KEY, url.trim(), None)?;
            eprintln!(
                "{} Saved base URL to {}",
                style("✓").green().bold(),
                path.display()
            );
            Ok(())
        }
    }
}
