//! Engine configuration types.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the engine executable, relative to the working directory
pub const DEFAULT_ENGINE_PATH: &str = "bin/cerberus";

/// Suffix the engine appends to its input path when writing the report
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".analysis.json";

/// Default time budget for one engine run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Environment variable carrying the "include strings" toggle
pub const ENV_INCLUDE_STRINGS: &str = "CERBERUS_INCLUDE_STRINGS";

/// Environment variable carrying the "disassemble" toggle
pub const ENV_DISASSEMBLE: &str = "CERBERUS_DISASSEMBLE";

/// Environment variable carrying the engine log level
pub const ENV_LOG_LEVEL: &str = "CERBERUS_LOG_LEVEL";

/// Engine feature toggles
///
/// These are handed to the engine untouched as environment variables; the
/// pipeline neither validates them nor knows whether the engine honours them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Extract and analyse string references
    pub include_strings: Option<bool>,

    /// Run full disassembly
    pub disassemble: Option<bool>,

    /// Engine log level (`info`, `debug`, ...)
    pub log_level: Option<String>,

    /// Additional variables set verbatim
    pub extra_env: BTreeMap<String, String>,
}

impl EngineOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the include-strings toggle
    #[must_use]
    pub fn include_strings(mut self, enabled: bool) -> Self {
        self.include_strings = Some(enabled);
        self
    }

    /// Set the disassemble toggle
    #[must_use]
    pub fn disassemble(mut self, enabled: bool) -> Self {
        self.disassemble = Some(enabled);
        self
    }

    /// Set the engine log level
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Add an arbitrary environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }

    /// Variables to set on the engine process
    #[must_use]
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        if let Some(enabled) = self.include_strings {
            vars.push((ENV_INCLUDE_STRINGS.to_string(), enabled.to_string()));
        }
        if let Some(enabled) = self.disassemble {
            vars.push((ENV_DISASSEMBLE.to_string(), enabled.to_string()));
        }
        if let Some(level) = &self.log_level {
            vars.push((ENV_LOG_LEVEL.to_string(), level.clone()));
        }
        vars.extend(
            self.extra_env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        vars
    }
}

/// How to run the external analysis engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine executable
    pub executable: PathBuf,

    /// Time budget for one run; the engine is killed when it elapses
    pub timeout: Duration,

    /// Suffix appended to the input path to locate the report
    pub output_suffix: String,

    /// Let the engine write to our stdout/stderr instead of discarding them
    pub inherit_stdio: bool,

    /// Feature toggles passed through to the engine
    pub options: EngineOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_PATH)
    }
}

impl EngineConfig {
    /// Create a configuration for the given executable with default settings
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: DEFAULT_TIMEOUT,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            inherit_stdio: false,
            options: EngineOptions::default(),
        }
    }

    /// Set the time budget
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the report suffix
    #[must_use]
    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Inherit or discard the engine's standard streams
    #[must_use]
    pub fn inherit_stdio(mut self, inherit: bool) -> Self {
        self.inherit_stdio = inherit;
        self
    }

    /// Set the feature toggles
    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Report path the engine writes for `input`
    #[must_use]
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let mut path = OsString::from(input.as_os_str());
        path.push(&self.output_suffix);
        PathBuf::from(path)
    }
}
