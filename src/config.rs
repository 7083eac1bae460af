use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::client::DEFAULT_BASE_URL;
use crate::workflow::DEFAULT_FOLDER;

pub const KEYRING_SERVICE: &str = "gcup-api-key";
pub const KEYRING_USER: &str = "GISCloud";
const ENV_PREFIX: &str = "GISCLOUD_";

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    pub base_url: Option<Url>,
    pub default_folder: Option<String>,
    pub accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    base_url: Option<Url>,
    api_key: Option<String>,
    default_folder: Option<String>,
    accept_invalid_certs: Option<bool>,
}

pub struct Config {
    pub base_url: Url,
    pub api_key: String,
    pub default_folder: String,
    pub accept_invalid_certs: bool,
}

fn merge_config(
    base: ConfigFile,
    override_config: ConfigEnv,
    keyring_key: impl FnOnce() -> Result<String>,
) -> Result<Config> {
    let base_url = match override_config.base_url.or(base.base_url) {
        Some(url) => url,
        None => Url::parse(DEFAULT_BASE_URL)?,
    };

    let default_folder = override_config
        .default_folder
        .or(base.default_folder)
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string());

    let accept_invalid_certs = override_config
        .accept_invalid_certs
        .or(base.accept_invalid_certs)
        .unwrap_or(false);

    let api_key = match override_config.api_key {
        Some(api_key) => api_key,
        None => keyring_key()?,
    };

    Ok(Config {
        base_url,
        api_key,
        default_folder,
        accept_invalid_certs,
    })
}

fn keyring_api_key() -> Result<String> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    let api_key = entry
        .get_secret()
        .context("API key not specified via environment variable nor present in OS keyring")?;
    Ok(String::from_utf8(api_key)?)
}

fn config_file_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("com", "giscloud", "gcup")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    Ok(project_dirs.config_dir().join("config.toml"))
}

pub fn read_config_file() -> Result<ConfigFile> {
    let config_file = config_file_path()?;
    match fs::read_to_string(&config_file) {
        Ok(config) => toml::from_str(&config)
            .with_context(|| format!("Invalid config file {}", config_file.display())),
        Err(_) => {
            debug!("No config file at {}", config_file.display());
            Ok(ConfigFile::default())
        }
    }
}

/// Reads `GISCLOUD_*` variables; a malformed variable discards them all.
fn env_config<I>(vars: I) -> ConfigEnv
where
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX)
        .from_iter::<_, ConfigEnv>(vars)
        .unwrap_or_else(|err| {
            warn!("Ignoring {}* environment variables: {}", ENV_PREFIX, err);
            ConfigEnv::default()
        })
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    merge_config(
        read_config_file()?,
        env_config(std::env::vars()),
        keyring_api_key,
    )
}

pub fn write_config(config: ConfigFile) -> Result<()> {
    let config_file = config_file_path()?;
    if let Some(parent) = config_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_file, toml::to_string_pretty(&config)?)
        .with_context(|| format!("Unable to write {}", config_file.display()))?;
    Ok(())
}

pub fn set_api_key_keyring(api_key: String) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_secret(api_key.as_bytes())?;
    println!("API key set for use with gcup");
    Ok(())
}
