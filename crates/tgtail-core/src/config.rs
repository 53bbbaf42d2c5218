use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

const DEFAULT_TDLIB_DIR: &str = ".tdlib";
const DEFAULT_LOG_VERBOSITY: i32 = 1;

/// Typed configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub tdlib: TdlibParameters,
    /// Verbosity of TDLib's own internal log (0 = fatal only, 1 = errors, ...).
    pub log_verbosity: i32,
}

/// Parameters handed to TDLib while it waits for `setTdlibParameters`.
///
/// Field names follow the TDLib API; the adapter copies them one to one.
#[derive(Clone, Debug, PartialEq)]
pub struct TdlibParameters {
    pub use_test_dc: bool,
    pub database_directory: PathBuf,
    pub files_directory: PathBuf,
    pub use_file_database: bool,
    pub use_chat_info_database: bool,
    pub use_message_database: bool,
    pub use_secret_chats: bool,
    pub api_id: i32,
    pub api_hash: String,
    pub system_language_code: String,
    pub device_model: String,
    pub system_version: String,
    pub application_version: String,
    pub enable_storage_optimizer: bool,
    pub ignore_file_names: bool,
}

impl TdlibParameters {
    /// Deployment defaults for a server-side client rooted at `root`.
    pub fn new(api_id: i32, api_hash: String, root: &Path) -> Self {
        Self {
            use_test_dc: false,
            database_directory: root.join("database"),
            files_directory: root.join("files"),
            use_file_database: true,
            use_chat_info_database: true,
            use_message_database: true,
            use_secret_chats: false,
            api_id,
            api_hash,
            system_language_code: "en".to_string(),
            device_model: "Server".to_string(),
            system_version: "1.0.0".to_string(),
            application_version: "1.0.0".to_string(),
            enable_storage_optimizer: true,
            ignore_file_names: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_api_id = lookup("API_ID")
            .ok_or_else(|| Error::Config("API_ID environment variable is required".to_string()))?;
        let api_id = parse_api_id(&raw_api_id)?;

        let api_hash = lookup("API_HASH").unwrap_or_default();
        if api_hash.trim().is_empty() {
            return Err(Error::Config(
                "API_HASH environment variable is required".to_string(),
            ));
        }

        let root = var_path(&lookup, "TDLIB_DIR")
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TDLIB_DIR));
        let log_verbosity =
            var_i32(&lookup, "TDLIB_LOG_VERBOSITY")?.unwrap_or(DEFAULT_LOG_VERBOSITY);

        Ok(Self {
            tdlib: TdlibParameters::new(api_id, api_hash, &root),
            log_verbosity,
        })
    }
}

/// Parse the numeric application id. Anything that is not a decimal int32 is fatal.
pub fn parse_api_id(raw: &str) -> Result<i32> {
    raw.parse::<i32>()
        .map_err(|e| Error::Config(format!("API_ID must be a 32-bit integer ({raw:?}): {e}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn var_str(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).and_then(non_empty)
}

fn var_path(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<PathBuf> {
    var_str(lookup, key).map(PathBuf::from)
}

fn var_i32(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<i32>> {
    var_str(lookup, key)
        .map(|v| {
            v.trim()
                .parse::<i32>()
                .map_err(|e| Error::Config(format!("{key} must be an integer: {e}")))
        })
        .transpose()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
