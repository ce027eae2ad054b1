//! `ctxforge config`: Print the effective configuration.

use ctxforge_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_dir().join("config.toml");
    match AppConfig::load() {
        Ok(config) => {
            println!("# {}", path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Err(e) => {
            eprintln!("❌ Config error: {e}");
            eprintln!();
            eprintln!("Defaults for reference:");
            eprintln!("{}", AppConfig::default_toml());
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn default_toml_round_trips() {
        let text = ctxforge_config::AppConfig::default_toml();
        let parsed: ctxforge_config::AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.memory.backend, "file");
    }
}
