#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
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

use crate::domain::models::StorageName;
use crate::domain::services::DEFAULT_KEY_PREFIX;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ChatID,
    ConfigFile,
    KeyPrefix,
    ReplyDelay,
    Storage,
    StorageDir,
    Url,
}

pub struct Config {}

fn app_dir(base: Option<path::PathBuf>) -> path::PathBuf {
    return base.unwrap_or_else(env::temp_dir).join("chatkeep");
}

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

    pub fn default(key: ConfigKey) -> String {
        let config_path = app_dir(dirs::config_dir()).join("config.toml");
        let storage_dir = app_dir(dirs::data_dir()).join("chats");
        let default_storage = StorageName::File.to_string();

        let res = match key {
            ConfigKey::KeyPrefix => DEFAULT_KEY_PREFIX,
            ConfigKey::ReplyDelay => "1500",
            ConfigKey::Storage => default_storage.as_str(),
            ConfigKey::Url => "http://localhost/chat",

            // Special
            ConfigKey::ChatID => "",
            ConfigKey::ConfigFile => return config_path.to_string_lossy().to_string(),
            ConfigKey::StorageDir => return storage_dir.to_string_lossy().to_string(),
        };

        return res.to_string();
    }

    /// Reads every known key out of a TOML document, checking values against
    /// the CLI's possible values where it declares them.
    pub fn parse_toml(cmd: &Command, toml_str: &str) -> Result<Vec<(ConfigKey, String)>> {
        let doc = toml_str.parse::<toml_edit::Document>()?;
        let mut values: Vec<(ConfigKey, String)> = vec![];

        for key in ConfigKey::iter() {
            let Some(val) = doc.get(&key.to_string()) else {
                continue;
            };

            // Use clap value parsers to do validation.
            let mut possible_values = vec![];
            if let Some(arg) = cmd
                .get_arguments()
                .find(|e| return e.get_long() == Some(key.to_string().as_str()))
            {
                possible_values = arg
                    .get_possible_values()
                    .iter()
                    .map(|e| return e.get_name().to_string())
                    .collect::<Vec<String>>();
            }

            if let Some(val_int) = val.as_integer() {
                values.push((key, val_int.to_string()));
            } else if let Some(val_str) = val.as_str() {
                if val_str.is_empty() {
                    continue;
                }
                if !possible_values.is_empty() && !possible_values.contains(&val_str.to_string()) {
                    bail!(format!(
                        "config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}",
                        possible_values.join(", ")
                    ));
                }
                values.push((key, val_str.to_string()));
            } else {
                bail!(format!(
                    "config.toml has an unsupported value type for key '{key}'"
                ));
            }
        }

        return Ok(values);
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
            for (key, val) in Config::parse_toml(&cmd, &toml_str)? {
                Config::set(key, &val);
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

        tracing::debug!(
            storage = %Config::get(ConfigKey::Storage),
            storage_dir = %Config::get(ConfigKey::StorageDir),
            key_prefix = %Config::get(ConfigKey::KeyPrefix),
            reply_delay = %Config::get(ConfigKey::ReplyDelay),
            url = %Config::get(ConfigKey::Url),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ChatID || key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !arg.get_possible_values().is_empty() {
                    let possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name().to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    description = format!("{description} [possible values: {possible_values}]");
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i32>().is_ok() {
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
