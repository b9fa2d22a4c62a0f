use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    currency::CurrencyFormat,
    errors::LedgerError,
    ledger::{summary::is_valid_date_format, EngineSettings},
    utils::{app_data_dir, config_file_in, ensure_dir},
};

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub currency_code: String,
    #[serde(flatten)]
    pub engine: EngineSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_sheet: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency_code: "USD".into(),
            engine: EngineSettings::default(),
            last_opened_sheet: None,
        }
    }
}

impl Config {
    /// Applies a `key value` pair from the CLI.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), LedgerError> {
        match key {
            "currency" => {
                self.currency_code = value.to_uppercase();
                self.engine.currency = CurrencyFormat {
                    decimal_separator: self.engine.currency.decimal_separator,
                    grouping_separator: self.engine.currency.grouping_separator,
                    ..CurrencyFormat::for_code(value)
                };
            }
            "symbol" => self.engine.currency.symbol = value.to_string(),
            "decimal_separator" => self.engine.currency.decimal_separator = single_char(key, value)?,
            "grouping_separator" => {
                self.engine.currency.grouping_separator = single_char(key, value)?
            }
            "breakdown_separator" => self.engine.breakdown_separator = unescape(value),
            "summary_separator" => self.engine.summary_separator = unescape(value),
            "due_day" => {
                let day: u32 = value
                    .parse()
                    .ok()
                    .filter(|day| (1..=31).contains(day))
                    .ok_or_else(|| {
                        LedgerError::Config(format!("`{}` is not a day of the month", value))
                    })?;
                self.engine.due.day_of_month = day;
            }
            "due_format" => {
                if !is_valid_date_format(value) {
                    return Err(LedgerError::Config(format!(
                        "`{}` is not a valid date format",
                        value
                    )));
                }
                self.engine.due.date_format = value.to_string();
            }
            "clear_stale" => {
                self.engine.clear_stale_summaries = parse_flag(value).ok_or_else(|| {
                    LedgerError::Config(format!("`{}` is not on/off", value))
                })?
            }
            other => {
                return Err(LedgerError::Config(format!(
                    "unknown setting `{}`",
                    other
                )))
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let engine = &self.engine;
        vec![
            ("currency", self.currency_code.clone()),
            ("symbol", engine.currency.symbol.clone()),
            (
                "decimal_separator",
                engine.currency.decimal_separator.to_string(),
            ),
            (
                "grouping_separator",
                engine.currency.grouping_separator.to_string(),
            ),
            ("breakdown_separator", format!("{:?}", engine.breakdown_separator)),
            ("summary_separator", format!("{:?}", engine.summary_separator)),
            ("due_day", engine.due.day_of_month.to_string()),
            ("due_format", engine.due.date_format.clone()),
            (
                "clear_stale",
                if engine.clear_stale_summaries { "on" } else { "off" }.to_string(),
            ),
        ]
    }
}

fn single_char(key: &str, value: &str) -> Result<char, LedgerError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(LedgerError::Config(format!(
            "`{}` expects a single character",
            key
        ))),
    }
}

fn unescape(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\t", "\t")
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, LedgerError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, LedgerError> {
        let path = config_file_in(&base);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        Ok(Self { path })
    }

    pub fn load(&self) -> Result<Config, LedgerError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), LedgerError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
