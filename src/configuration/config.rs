#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

/// Environment variable consulted for the provider credential when no token is
/// configured. Read on every upstream call, never cached.
pub const PROVIDER_TOKEN_ENV: &str = "CODESTRAL_API_KEY";

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    AccessToken,
    ConfigFile,
    DataDir,
    Language,
    ListenAddr,
    LogDir,
    Model,
    ProviderToken,
    ProviderURL,
    ProxyToken,
    ProxyURL,
    UpstreamTimeout,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    fn base_dir(sub: &str) -> path::PathBuf {
        #[cfg(not(target_os = "macos"))]
        let base = dirs::config_dir();
        #[cfg(target_os = "macos")]
        let base = dirs::home_dir().map(|home| return home.join(".config"));

        return base
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("codeaction")
            .join(sub);
    }

    pub fn default(key: ConfigKey) -> String {
        let config_path = Config::base_dir("config.toml");
        let data_path = dirs::data_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("codeaction/store");

        let res = match key {
            ConfigKey::Language => "JavaScript",
            ConfigKey::ListenAddr => "127.0.0.1:8787",
            ConfigKey::Model => "codestral-2501",
            ConfigKey::ProviderURL => "https://codestral.mistral.ai",
            ConfigKey::ProxyURL => "http://127.0.0.1:8787",
            ConfigKey::UpstreamTimeout => "60000",

            // Special
            ConfigKey::AccessToken => "",
            ConfigKey::ConfigFile => config_path.to_str().unwrap_or_default(),
            ConfigKey::DataDir => data_path.to_str().unwrap_or_default(),
            ConfigKey::LogDir => "",
            ConfigKey::ProviderToken => "",
            ConfigKey::ProxyToken => "",
        };

        return res.to_string();
    }

    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    if !cmd
                        .get_arguments()
                        .any(|e| return e.get_long() == Some(key.to_string().as_str()))
                    {
                        bail!(format!("config.toml contains unsupported key '{key}'"));
                    }

                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        Config::set(key, val_str);
                    } else {
                        bail!(format!(
                            "config.toml has an invalid value for key '{key}': expected a string or integer"
                        ));
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        if Config::get(ConfigKey::UpstreamTimeout).parse::<u64>().is_err() {
            bail!(format!(
                "upstream-timeout must be a whole number of milliseconds, got '{}'",
                Config::get(ConfigKey::UpstreamTimeout)
            ));
        }

        tracing::debug!(
            listen_addr = Config::get(ConfigKey::ListenAddr),
            proxy_url = Config::get(ConfigKey::ProxyURL),
            provider_url = Config::get(ConfigKey::ProviderURL),
            model = Config::get(ConfigKey::Model),
            data_dir = Config::get(ConfigKey::DataDir),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default()
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i64>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{}\"", val.replace('\\', "\\\\"));
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
