use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const BASE_URL: &str = "https://api.openai.com/v1/";

pub const DEFAULT_IMAGE_KEYWORD: &str = "[P]";
pub const DEFAULT_TEXT_EDIT_KEYWORD: &str = "[TE]";
pub const DEFAULT_TEXT_EDIT_SEPARATOR: &str = "[TES]";
pub const DEFAULT_GPT_LIMIT_PER_MINUTE: i64 = 3;
pub const DEFAULT_IMAGE_VARIATION_KEYWORD: &str = "[PV]";
pub const DEFAULT_IMAGE_VARIATION_CHAT_TTL: i64 = 60;
pub const DEFAULT_CHAT_TTL_TIME: i64 = 10;
pub const DEFAULT_CHAT_MAX_CONTEXT: i64 = 2;
pub const DEFAULT_GPT_TIME_OUT: i64 = 60;

/// Bot settings read from `config.json`.
///
/// Every key is optional in the file. `Default` is the all-zero record the
/// decoder starts from; the numeric and keyword fields are backfilled after
/// decoding, see [`Configuration::apply_defaults`].
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// GPT api key
    #[serde(deserialize_with = "nullable")]
    pub api_key: String,
    /// Accept friend requests automatically
    #[serde(deserialize_with = "nullable")]
    pub auto_pass: bool,
    /// http(s)://host:port, empty for a direct connection
    #[serde(deserialize_with = "nullable")]
    pub proxy: String,
    /// Max chat context records kept per conversation
    #[serde(deserialize_with = "nullable")]
    pub chat_max_context: i64,
    /// Minutes a chat context is kept
    #[serde(deserialize_with = "nullable")]
    pub chat_ttl_time: i64,
    /// Seconds before a GPT request times out
    #[serde(deserialize_with = "nullable")]
    pub gpt_time_out: i64,
    /// Chat keyword that triggers image generation
    #[serde(deserialize_with = "nullable")]
    pub generate_image_keyword: String,
    #[serde(deserialize_with = "nullable")]
    pub text_edit_keyword: String,
    /// Splits the text to edit from the edit instruction
    #[serde(deserialize_with = "nullable")]
    pub text_edit_separator: String,
    /// Chat requests allowed per minute
    #[serde(deserialize_with = "nullable")]
    pub gpt_limit_per_minute: i64,
    #[serde(deserialize_with = "nullable")]
    pub image_variation_keyword: String,
    /// Max seconds between the source image and the image variation keyword
    #[serde(deserialize_with = "nullable")]
    pub image_variation_chat_ttl: i64,
}

// a JSON null leaves the field at its zero value
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Configuration {
    /// Read, decode and backfill the file at `path`. Nothing is cached.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(BufReader::new(file), path)
    }

    /// Decode the first JSON value of `reader`; anything after it is ignored.
    fn decode<R: Read>(reader: R, path: &Path) -> Result<Self> {
        let decode_err = |source: serde_json::Error| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let mut stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
        let value = match stream.next() {
            Some(value) => value.map_err(decode_err)?,
            None => return Err(ConfigError::Empty { path: path.to_path_buf() }),
        };
        let mut config = match value {
            Value::Null => Configuration::default(),
            Value::Object(map) => serde_json::from_value(Value::Object(fold_keys(map))).map_err(decode_err)?,
            other => {
                return Err(decode_err(serde::de::Error::custom(format!(
                    "expected a JSON object, found {other}"
                ))));
            }
        };
        config.apply_defaults();
        Ok(config)
    }

    /// Replace blank keywords and non-positive numbers with their defaults.
    pub fn apply_defaults(&mut self) {
        fill_text(&mut self.generate_image_keyword, DEFAULT_IMAGE_KEYWORD, "generate_image_keyword");
        fill_text(&mut self.text_edit_keyword, DEFAULT_TEXT_EDIT_KEYWORD, "text_edit_keyword");
        fill_text(&mut self.text_edit_separator, DEFAULT_TEXT_EDIT_SEPARATOR, "text_edit_separator");
        fill_positive(&mut self.gpt_limit_per_minute, DEFAULT_GPT_LIMIT_PER_MINUTE, "gpt_limit_per_minute");
        fill_text(&mut self.image_variation_keyword, DEFAULT_IMAGE_VARIATION_KEYWORD, "image_variation_keyword");
        fill_positive(&mut self.chat_max_context, DEFAULT_CHAT_MAX_CONTEXT, "chat_max_context");
        fill_positive(&mut self.chat_ttl_time, DEFAULT_CHAT_TTL_TIME, "chat_ttl_time");
        fill_positive(&mut self.image_variation_chat_ttl, DEFAULT_IMAGE_VARIATION_CHAT_TTL, "image_variation_chat_ttl");
        fill_positive(&mut self.gpt_time_out, DEFAULT_GPT_TIME_OUT, "gpt_time_out");
    }

    pub fn proxy(&self) -> Option<&str> {
        let proxy = self.proxy.trim();
        if proxy.is_empty() { None } else { Some(proxy) }
    }

    pub fn chat_ttl(&self) -> Duration {
        Duration::from_secs(seconds(self.chat_ttl_time).saturating_mul(60))
    }

    pub fn gpt_timeout(&self) -> Duration {
        Duration::from_secs(seconds(self.gpt_time_out))
    }

    pub fn image_variation_chat_ttl(&self) -> Duration {
        Duration::from_secs(seconds(self.image_variation_chat_ttl))
    }
}

/// Keys match the field names case-insensitively. An exact (lowercase) key
/// wins over any differently-cased spelling of the same key.
fn fold_keys(map: Map<String, Value>) -> Map<String, Value> {
    let mut folded = Map::new();
    let mut exact = Vec::new();
    for (key, value) in map {
        let lower = key.to_ascii_lowercase();
        if lower == key {
            exact.push((key, value));
        } else {
            folded.insert(lower, value);
        }
    }
    folded.extend(exact);
    folded
}

fn fill_text(value: &mut String, default: &str, key: &str) {
    if value.trim().is_empty() {
        debug!("config {key} is blank, using default {default:?}");
        *value = default.to_string();
    }
}

fn fill_positive(value: &mut i64, default: i64, key: &str) {
    if *value <= 0 {
        debug!("config {key}={value} is not positive, using default {default}");
        *value = default;
    }
}

fn seconds(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { "***" };
        f.debug_struct("Configuration")
            .field("api_key", &api_key)
            .field("auto_pass", &self.auto_pass)
            .field("proxy", &self.proxy)
            .field("chat_max_context", &self.chat_max_context)
            .field("chat_ttl_time", &self.chat_ttl_time)
            .field("gpt_time_out", &self.gpt_time_out)
            .field("generate_image_keyword", &self.generate_image_keyword)
            .field("text_edit_keyword", &self.text_edit_keyword)
            .field("text_edit_separator", &self.text_edit_separator)
            .field("gpt_limit_per_minute", &self.gpt_limit_per_minute)
            .field("image_variation_keyword", &self.image_variation_keyword)
            .field("image_variation_chat_ttl", &self.image_variation_chat_ttl)
            .finish()
    }
}
