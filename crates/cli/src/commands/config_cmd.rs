//! `agora config`: configuration management commands.

use std::path::{Path, PathBuf};

use agora_config::AppConfig;

use super::load_config;

fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let mut shown = config.clone();
    shown.api_key = shown.api_key.map(|_| "***".into());
    for provider in shown.providers.values_mut() {
        provider.api_key = provider.api_key.take().map(|_| "***".into());
    }
    println!("# {}", config_file(config_path).display());
    println!("{}", toml::to_string_pretty(&shown)?);
    if !config.has_api_key() {
        println!("# No API key set (AGORA_API_KEY, OPENAI_API_KEY or GOOGLE_API_KEY)");
    }
    Ok(())
}

pub fn init(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_file(config_path);

    if path.exists() && !force {
        println!("Config already exists at: {}", path.display());
        println!("   Edit it manually or re-run with --force.");
        return Ok(());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Created {}", path.display());
    println!("   Next: set your API key in the file or in .env, then run `agora research`.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_a_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(Some(&path), false).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.default_model, AppConfig::default().default_model);
    }

    #[test]
    fn init_keeps_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = \"custom\"\n").unwrap();

        init(Some(&path), false).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("custom"));

        init(Some(&path), true).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("custom"));
    }

    #[test]
    fn default_path_is_under_config_dir() {
        assert!(config_file(None).ends_with(".agora/config.toml"));
    }
}
