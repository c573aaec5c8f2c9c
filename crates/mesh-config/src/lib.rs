//! Configuration management for Mesh.
//!
//! Parses `mesh.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Expansion
//!
//! `server.host` supports `${VAR}` and `${VAR:-default}`. Directory settings
//! (`site.source_dir`, `cache.dir`) additionally expand a leading `~`.
//! Relative directories resolve against the directory holding the config
//! file.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override site source directory.
    pub source_dir: Option<PathBuf>,
    /// Override cache mode.
    pub cache_mode: Option<CacheMode>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mesh.toml";

/// Project directory holding the default cache location.
const PROJECT_DIR: &str = ".mesh";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Site content configuration.
    pub site: SiteConfig,
    /// Index rebuild and statistics configuration.
    pub index: IndexConfig,
    /// Response cache configuration.
    pub cache: CacheConfig,
    /// Request handling policy.
    pub requests: RequestsConfig,
    /// Explicit ranking scores keyed by site path.
    pub scores: BTreeMap<String, i32>,

    /// Resolved directories (set after loading).
    #[serde(skip)]
    pub paths: ResolvedPaths,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

/// Site content configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Content directory as written in the file.
    source_dir: Option<String>,
    /// Welcome file names, in lookup order.
    pub welcome_files: Vec<String>,
    /// Extensions (without dot) of files indexed as pages.
    pub page_extensions: Vec<String>,
    /// Extensions (without dot) of pages eligible for response caching.
    pub visual_extensions: Vec<String>,
    /// Maximum excerpt length in characters.
    pub excerpt_length: usize,
    /// First-level directories never indexed or served.
    pub system_dirs: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            welcome_files: vec!["index.html".to_owned(), "index.htm".to_owned()],
            page_extensions: vec!["html".to_owned(), "htm".to_owned()],
            visual_extensions: vec!["html".to_owned(), "htm".to_owned()],
            excerpt_length: 300,
            system_dirs: ["WEB-INF", "META-INF", "cgi-bin", "admin", "private"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// Index rebuild and statistics configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Minimum age of the current index before a background rebuild.
    pub rebuild_interval_ms: u64,
    /// Length of the per-page hit statistics window.
    pub retention_days: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            rebuild_interval_ms: 300_000,
            retention_days: 30,
        }
    }
}

/// Response cache mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// No response caching.
    #[default]
    None,
    /// Process memory, dropped with each index rebuild.
    Memory,
    /// Gzip files under the cache directory.
    Disk,
    /// Disk files with a bounded in-memory front.
    Hybrid,
}

impl FromStr for CacheMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ConfigError::Validation(format!(
                "unknown cache mode '{other}' (expected none, memory, disk or hybrid)"
            ))),
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache mode.
    pub mode: CacheMode,
    /// Cache directory as written in the file.
    dir: Option<String>,
    /// Entries kept in memory in hybrid mode.
    pub hybrid_capacity: usize,
    /// Age after which the janitor removes cache and temporary files.
    pub janitor_max_age_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::None,
            dir: None,
            hybrid_capacity: 256,
            janitor_max_age_hours: 168,
        }
    }
}

/// Request handling policy.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RequestsConfig {
    /// Redirect directory requests to their welcome file instead of listing.
    pub deny_directory_listings: bool,
    /// Redirect requests for missing pages to the closest indexed page.
    pub search_moved_pages: bool,
    /// Include error details in 500 responses.
    pub show_errors: bool,
    /// Send anonymous visitors of the site root to their preferred language.
    pub redirect_root: bool,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            deny_directory_listings: true,
            search_moved_pages: true,
            show_errors: false,
            redirect_root: false,
        }
    }
}

/// Directories resolved to absolute locations.
#[derive(Debug, Default)]
pub struct ResolvedPaths {
    /// Site content directory.
    pub source_dir: PathBuf,
    /// Response cache directory.
    pub cache_dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`cache.dir`").
        field: String,
        /// Error message.
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a list of extensions to be non-empty and dot-free.
fn require_extensions(values: &[String], field: &str) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    if let Some(bad) = values.iter().find(|ext| ext.is_empty() || ext.starts_with('.')) {
        return Err(ConfigError::Validation(format!(
            "{field} entries must be non-empty and written without a leading dot (got '{bad}')"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mesh.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(source_dir) = &settings.source_dir {
            self.paths.source_dir.clone_from(source_dir);
        }
        if let Some(mode) = settings.cache_mode {
            self.cache.mode = mode;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            site: SiteConfig::default(),
            index: IndexConfig::default(),
            cache: CacheConfig::default(),
            requests: RequestsConfig::default(),
            scores: BTreeMap::new(),
            paths: ResolvedPaths {
                source_dir: base.join("site"),
                cache_dir: base.join(PROJECT_DIR).join("cache"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_site()?;
        self.validate_index()?;
        self.validate_cache()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        if self.site.welcome_files.is_empty() {
            return Err(ConfigError::Validation(
                "site.welcome_files cannot be empty".to_owned(),
            ));
        }
        for name in &self.site.welcome_files {
            require_non_empty(name, "site.welcome_files")?;
            if name.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "site.welcome_files entries must be plain file names (got '{name}')"
                )));
            }
        }
        require_extensions(&self.site.page_extensions, "site.page_extensions")?;
        Ok(())
    }

    fn validate_index(&self) -> Result<(), ConfigError> {
        if self.index.retention_days == 0 {
            return Err(ConfigError::Validation(
                "index.retention_days must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        if self.cache.mode == CacheMode::Hybrid && self.cache.hybrid_capacity == 0 {
            return Err(ConfigError::Validation(
                "cache.hybrid_capacity must be at least 1 in hybrid mode".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref dir) = self.site.source_dir {
            self.site.source_dir = Some(expand::expand_path(dir, "site.source_dir")?);
        }
        if let Some(ref dir) = self.cache.dir {
            self.cache.dir = Some(expand::expand_path(dir, "cache.dir")?);
        }

        Ok(())
    }

    /// Resolve relative directories against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths = ResolvedPaths {
            source_dir: resolve(self.site.source_dir.as_deref(), "site"),
            cache_dir: match self.cache.dir.as_deref() {
                Some(dir) => config_dir.join(dir),
                None => config_dir.join(PROJECT_DIR).join("cache"),
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.paths.source_dir, PathBuf::from("/test/site"));
        assert_eq!(config.paths.cache_dir, PathBuf::from("/test/.mesh/cache"));
        assert_eq!(config.cache.mode, CacheMode::None);
        assert_eq!(config.index.retention_days, 30);
        assert_eq!(config.site.welcome_files, vec!["index.html", "index.htm"]);
        assert!(config.requests.deny_directory_listings);
        assert!(!config.requests.show_errors);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.page_extensions, vec!["html", "htm"]);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000

[site]
welcome_files = ["index.html"]
page_extensions = ["html"]
excerpt_length = 120

[index]
rebuild_interval_ms = 1000
retention_days = 7

[cache]
mode = "hybrid"
hybrid_capacity = 16

[requests]
search_moved_pages = false
show_errors = true
redirect_root = true

[scores]
"news" = 10
"about/team" = -2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.site.welcome_files, vec!["index.html"]);
        assert_eq!(config.site.excerpt_length, 120);
        assert_eq!(config.index.rebuild_interval_ms, 1000);
        assert_eq!(config.index.retention_days, 7);
        assert_eq!(config.cache.mode, CacheMode::Hybrid);
        assert_eq!(config.cache.hybrid_capacity, 16);
        assert!(!config.requests.search_moved_pages);
        assert!(config.requests.deny_directory_listings);
        assert!(config.requests.show_errors);
        assert!(config.requests.redirect_root);
        assert_eq!(config.scores.get("news"), Some(&10));
        assert_eq!(config.scores.get("about/team"), Some(&-2));
    }

    #[test]
    fn test_parse_unknown_cache_mode_fails() {
        let result: Result<Config, _> = toml::from_str("[cache]\nmode = \"tape\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_mode_from_str() {
        assert_eq!("Disk".parse::<CacheMode>().unwrap(), CacheMode::Disk);
        assert_eq!("memory".parse::<CacheMode>().unwrap(), CacheMode::Memory);
        assert!(matches!(
            "tape".parse::<CacheMode>(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[site]
source_dir = "content"

[cache]
dir = "/var/cache/mesh"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.paths.source_dir, PathBuf::from("/project/content"));
        assert_eq!(config.paths.cache_dir, PathBuf::from("/var/cache/mesh"));
    }

    #[test]
    fn test_resolve_paths_defaults() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.paths.source_dir, PathBuf::from("/project/site"));
        assert_eq!(config.paths.cache_dir, PathBuf::from("/project/.mesh/cache"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[site]\nsource_dir = \"pages\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.paths.source_dir, dir.path().join("pages"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/mesh.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[index]\nretention_days = 0\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("retention_days"));
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(3000),
            source_dir: Some(PathBuf::from("/custom/site")),
            cache_mode: Some(CacheMode::Disk),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.paths.source_dir, PathBuf::from("/custom/site"));
        assert_eq!(config.cache.mode, CacheMode::Disk);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.mode, CacheMode::None);
    }

    #[test]
    fn test_expand_env_vars_server_host() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MESH_TEST_HOST", "0.0.0.0");
        }

        let mut config: Config = toml::from_str("[server]\nhost = \"${MESH_TEST_HOST}\"\n").unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.server.host, "0.0.0.0");

        unsafe {
            std::env::remove_var("MESH_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MESH_MISSING_CACHE_DIR");
        }

        let mut config: Config =
            toml::from_str("[cache]\ndir = \"${MESH_MISSING_CACHE_DIR}\"\n").unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("cache.dir"));
    }

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_server_port_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        assert_validation_error(&config, &["server.port"]);
    }

    #[test]
    fn test_validate_extension_with_dot() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.page_extensions = vec![".html".to_owned()];
        assert_validation_error(&config, &["site.page_extensions", ".html"]);
    }

    #[test]
    fn test_validate_empty_welcome_files() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.welcome_files.clear();
        assert_validation_error(&config, &["site.welcome_files"]);
    }

    #[test]
    fn test_validate_welcome_file_with_separator() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.welcome_files = vec!["home/index.html".to_owned()];
        assert_validation_error(&config, &["plain file names"]);
    }

    #[test]
    fn test_validate_hybrid_capacity_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.cache.mode = CacheMode::Hybrid;
        config.cache.hybrid_capacity = 0;
        assert_validation_error(&config, &["hybrid_capacity"]);
    }
}
