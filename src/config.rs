use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cdp::{CdpConfig, DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT, Remediation};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DIA_CONTROL_CONFIG";

const LOCAL_FILE_NAME: &str = ".dia-control.toml";
const APP_DIR_NAME: &str = "dia-control";

const DEFAULT_BROWSER_NAME: &str = "Dia Browser";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Commented template written by `config init`.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# dia-browser-control configuration

# Remote debugging endpoint
# [connection]
# host = "127.0.0.1"
# port = 9222
# command_timeout_ms = 10000

# Shown when the browser cannot be reached
# [browser]
# name = "Dia Browser"
# executable = "/Applications/Dia.app/Contents/MacOS/Dia"

# Log verbosity on stderr (error, warn, info, debug, trace)
# [log]
# level = "info"
"#;

// ---------------------------------------------------------------------------
// File structs
// ---------------------------------------------------------------------------

/// The parsed TOML file. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigFile {
    pub connection: ConnectionSection,
    pub browser: BrowserSection,
    pub log: LogSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub command_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserSection {
    pub name: Option<String>,
    pub executable: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
}

/// Mirror of [`ConfigFile`] that rejects unknown keys.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictConfigFile {
    #[serde(default)]
    connection: StrictConnection,
    #[serde(default)]
    browser: StrictBrowser,
    #[serde(default)]
    log: StrictLog,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictConnection {
    host: Option<String>,
    port: Option<u16>,
    command_timeout_ms: Option<u64>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictBrowser {
    name: Option<String>,
    executable: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictLog {
    level: Option<String>,
}

impl From<StrictConfigFile> for ConfigFile {
    fn from(s: StrictConfigFile) -> Self {
        Self {
            connection: ConnectionSection {
                host: s.connection.host,
                port: s.connection.port,
                command_timeout_ms: s.connection.command_timeout_ms,
            },
            browser: BrowserSection {
                name: s.browser.name,
                executable: s.browser.executable,
            },
            log: LogSection {
                level: s.log.level,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("could not determine config directory")]
    NoConfigDir,
}

// ---------------------------------------------------------------------------
// Search and load
// ---------------------------------------------------------------------------

/// First existing config file, in priority order:
///
/// 1. `explicit_path` (`--config`)
/// 2. `$DIA_CONTROL_CONFIG`
/// 3. `./.dia-control.toml`
/// 4. `<config_dir>/dia-control/config.toml`
/// 5. `~/.dia-control.toml`
#[must_use]
pub fn find_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    find_config_file_with(explicit_path, std::env::var(CONFIG_ENV).ok())
}

/// [`find_config_file`] with the environment value passed in.
#[must_use]
pub fn find_config_file_with(
    explicit_path: Option<&Path>,
    env_config: Option<String>,
) -> Option<PathBuf> {
    let candidates = [
        explicit_path.map(Path::to_path_buf),
        env_config.map(PathBuf::from),
        Some(PathBuf::from(LOCAL_FILE_NAME)),
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml")),
        dirs::home_dir().map(|h| h.join(LOCAL_FILE_NAME)),
    ];
    candidates.into_iter().flatten().find(|p| p.exists())
}

/// A parsed config file plus anything worth warning about.
///
/// Warnings are returned rather than logged because loading happens
/// before the subscriber exists.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub file: ConfigFile,
    pub warnings: Vec<String>,
}

/// Locate and parse the config file; a missing file yields defaults.
#[must_use]
pub fn load_config(explicit_path: Option<&Path>) -> LoadedConfig {
    match find_config_file(explicit_path) {
        Some(path) => load_config_from(&path),
        None => LoadedConfig::default(),
    }
}

/// Parse the file at `path`; unreadable or invalid files yield defaults.
#[must_use]
pub fn load_config_from(path: &Path) -> LoadedConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let (file, warnings) = parse_config(&contents, path);
            LoadedConfig {
                path: Some(path.to_path_buf()),
                file,
                warnings,
            }
        }
        Err(e) => LoadedConfig {
            path: None,
            file: ConfigFile::default(),
            warnings: vec![format!(
                "could not read config file {}: {e}",
                path.display()
            )],
        },
    }
}

/// Strict parse first to spot unknown keys, then a lenient parse.
#[must_use]
pub fn parse_config(contents: &str, path: &Path) -> (ConfigFile, Vec<String>) {
    match toml::from_str::<StrictConfigFile>(contents) {
        Ok(strict) => (strict.into(), Vec::new()),
        Err(strict_err) => match toml::from_str::<ConfigFile>(contents) {
            Ok(config) => (
                config,
                vec![format!(
                    "unknown keys in config file {}: {strict_err}",
                    path.display()
                )],
            ),
            Err(parse_err) => (
                ConfigFile::default(),
                vec![format!(
                    "could not parse config file {}: {parse_err}",
                    path.display()
                )],
            ),
        },
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Values from the command line or environment, which beat the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub command_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

/// Configuration with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub connection: ResolvedConnection,
    pub browser: ResolvedBrowser,
    pub log: ResolvedLog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConnection {
    pub host: String,
    pub port: u16,
    pub command_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBrowser {
    pub name: String,
    pub executable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLog {
    pub level: String,
}

/// Known install location of Dia on this platform.
fn default_executable() -> Option<String> {
    if cfg!(target_os = "macos") {
        Some("/Applications/Dia.app/Contents/MacOS/Dia".to_owned())
    } else {
        None
    }
}

/// Merge overrides over the file over built-in defaults.
#[must_use]
pub fn resolve_config(
    file: &ConfigFile,
    config_path: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let port = overrides
        .port
        .or(file.connection.port)
        .filter(|p| *p != 0)
        .unwrap_or(DEFAULT_PORT);
    let command_timeout_ms = overrides
        .command_timeout_ms
        .or(file.connection.command_timeout_ms)
        .filter(|t| *t != 0)
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS);

    ResolvedConfig {
        config_path,
        connection: ResolvedConnection {
            host: overrides
                .host
                .clone()
                .or_else(|| file.connection.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port,
            command_timeout_ms,
        },
        browser: ResolvedBrowser {
            name: file
                .browser
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_BROWSER_NAME.to_owned()),
            executable: file.browser.executable.clone().or_else(default_executable),
        },
        log: ResolvedLog {
            level: overrides
                .log_level
                .clone()
                .or_else(|| file.log.level.clone())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
        },
    }
}

impl ResolvedConfig {
    #[must_use]
    pub fn cdp_config(&self) -> CdpConfig {
        CdpConfig {
            host: self.connection.host.clone(),
            port: self.connection.port,
            command_timeout: Duration::from_millis(self.connection.command_timeout_ms),
        }
    }

    #[must_use]
    pub fn remediation(&self) -> Remediation {
        Remediation {
            browser_name: self.browser.name.clone(),
            executable: self.browser.executable.clone(),
            port: self.connection.port,
        }
    }
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// `<config_dir>/dia-control/config.toml`.
///
/// # Errors
///
/// Returns `ConfigError::NoConfigDir` if the platform config directory is unknown.
pub fn default_init_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Write the template to `target_path`, or the default location.
///
/// # Errors
///
/// - `ConfigError::AlreadyExists` if the file already exists
/// - `ConfigError::Io` on I/O failure
/// - `ConfigError::NoConfigDir` if no path is given and the platform config dir is unknown
pub fn init_config(target_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = match target_path {
        Some(p) => p.to_path_buf(),
        None => default_init_path()?,
    };
    init_config_to(&path)
}

/// Write the template to exactly `path`.
///
/// # Errors
///
/// - `ConfigError::AlreadyExists` if the file already exists
/// - `ConfigError::Io` on I/O failure
pub fn init_config_to(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(path.to_path_buf())
}
