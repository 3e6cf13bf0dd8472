use crate::utils::app_paths::AppPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Public autocomplete function the search box talks to by default
pub const DEFAULT_ENDPOINT: &str = "https://functions.poehali.dev/8f090354-2018-4844-a0e6-010d048a0143";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub messages: MessagesConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL; the query is appended as `?query=<text>`
    pub url: String,

    /// Transport timeout in seconds. Unset means the HTTP client's own default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Honour HTTP_PROXY / HTTPS_PROXY from the environment
    pub use_system_proxy: bool,
}

/// User-facing texts for every failure the search box can show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MessagesConfig {
    pub empty_query: String,
    pub connection_error: String,
    pub fetch_error: String,
    pub invalid_response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs for status icons
    pub use_glyphs: bool,

    /// Show the log panel on startup (F5 toggles it)
    pub show_log_panel: bool,

    /// Show the match count above the suggestion list
    pub show_count: bool,

    pub icons: IconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub search: String,
    pub loading: String,
    pub error: String,
    pub success: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: None,
            use_system_proxy: true,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            empty_query: "Введите имя для поиска".to_string(),
            connection_error: "Ошибка соединения с сервером".to_string(),
            fetch_error: "Ошибка при получении данных".to_string(),
            invalid_response: "Некорректный ответ сервера".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true,
            show_log_panel: false,
            show_count: true,
            icons: IconConfig::default(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            search: "🔍".to_string(),
            loading: "⏳".to_string(),
            error: "❌".to_string(),
            success: "✅".to_string(),
        }
    }
}

impl IconConfig {
    /// ASCII alternatives for terminals without glyph support
    pub fn simple() -> Self {
        Self {
            search: "[?]".to_string(),
            loading: "[..]".to_string(),
            error: "[X]".to_string(),
            success: "[OK]".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit file; missing keys take their defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if !config.display.use_glyphs {
            config.display.icons = IconConfig::simple();
        }

        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(AppPaths::config_dir()?.join("config.toml"))
    }

    /// Apply command line overrides on top of the loaded file
    pub fn with_overrides(mut self, endpoint: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(url) = endpoint {
            self.endpoint.url = url;
        }
        if timeout_secs.is_some() {
            self.endpoint.timeout_secs = timeout_secs;
        }
        self
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# name-search configuration file
# Location: ~/.config/name-search/config.toml (Linux)
#           ~/Library/Application Support/name-search/config.toml (macOS)
#           %APPDATA%\name-search\config.toml (Windows)

[endpoint]
# Autocomplete service; requests are sent as GET <url>?query=<text>
url = "{DEFAULT_ENDPOINT}"

# Give up on a request after this many seconds (leave commented for no limit)
# timeout_secs = 10

# Route requests through HTTP_PROXY / HTTPS_PROXY when they are set
use_system_proxy = true

[messages]
# Shown when the search box is empty or only whitespace
empty_query = "Введите имя для поиска"

# Shown when no response could be received at all
connection_error = "Ошибка соединения с сервером"

# Shown when the service fails without an error text of its own
fetch_error = "Ошибка при получении данных"

# Shown when the service answers successfully with an unreadable body
invalid_response = "Некорректный ответ сервера"

[display]
# Use Unicode glyphs for status icons; false switches to ASCII
use_glyphs = true

# Open the log panel on startup (F5 toggles it)
show_log_panel = false

# Show "Найдено совпадений: N" above the results
show_count = true
"#
        )
    }
}
