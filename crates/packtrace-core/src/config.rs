//! Configuration loading and management
//!
//! # Configuration Hierarchy
//!
//! 1. Built-in defaults
//! 2. Global config: `<config dir>/packtrace/config.toml`
//! 3. Project config: `.packtrace/config.toml`
//! 4. Environment variables: `PACKTRACE_*`
//!
//! Later sources override earlier ones; the result is validated last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{gs1::sscc::SERIAL_MAX, Error, Result};

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG STRUCTS
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub simulator: SimulatorConfig,
    pub aggregation: AggregationConfig,
    pub runs: RunsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Fixed seed for reproducible simulations; entropy when absent.
    pub seed: Option<u64>,
    pub printer: DeviceProfile,
    pub verifier: DeviceProfile,
}

/// Outcome and latency model of one simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub success_probability: f64,
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// First counter value of the pallet identifier range. Box counters use
    /// everything below it.
    pub pallet_serial_base: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunsConfig {
    /// Zero-padding width of unit sequence numbers.
    pub serial_width: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// DEFAULT IMPLEMENTATIONS
// ═══════════════════════════════════════════════════════════════════════════

pub const DEFAULT_DATABASE_URL: &str = "sqlite:.packtrace/packtrace.db?mode=rwc";
pub const DEFAULT_PALLET_SERIAL_BASE: u64 = 500_000_000;
pub const DEFAULT_SERIAL_WIDTH: usize = 10;

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            printer: DeviceProfile::printer(),
            verifier: DeviceProfile::verifier(),
        }
    }
}

impl DeviceProfile {
    pub const fn printer() -> Self {
        Self {
            success_probability: 0.98,
            latency_min_ms: 50,
            latency_max_ms: 150,
        }
    }

    pub const fn verifier() -> Self {
        Self {
            success_probability: 0.95,
            latency_min_ms: 30,
            latency_max_ms: 100,
        }
    }

    /// Zero-latency profile with a fixed success probability.
    pub const fn instant(success_probability: f64) -> Self {
        Self {
            success_probability,
            latency_min_ms: 0,
            latency_max_ms: 0,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.success_probability) {
            return Err(Error::InvalidConfig(format!(
                "{name}.success_probability must be within [0, 1], got {}",
                self.success_probability
            )));
        }
        if self.latency_min_ms > self.latency_max_ms {
            return Err(Error::InvalidConfig(format!(
                "{name}.latency_min_ms ({}) exceeds latency_max_ms ({})",
                self.latency_min_ms, self.latency_max_ms
            )));
        }
        Ok(())
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            pallet_serial_base: DEFAULT_PALLET_SERIAL_BASE,
        }
    }
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            serial_width: DEFAULT_SERIAL_WIDTH,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration from all sources with hierarchy
///
/// # Errors
///
/// Returns error if a config file is malformed TOML, an environment override
/// does not parse, or the merged values fail validation.
pub async fn load_config() -> Result<Config> {
    let global = global_config_path().ok();
    let project = project_config_path().ok();
    let mut config = load_files(global.as_deref(), project.as_deref()).await?;
    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// Merges defaults with whichever of the given files exist, without
/// consulting the environment.
pub async fn load_files(global: Option<&Path>, project: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();
    for path in [global, project].into_iter().flatten() {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            let layer = load_toml_file(path).await?;
            config.merge(layer);
        }
    }
    Ok(config)
}

fn project_config_path() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|dir| dir.join(".packtrace/config.toml"))
        .map_err(|e| Error::Io(format!("Failed to get current directory: {e}")))
}

fn global_config_path() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "packtrace")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or_else(|| Error::Io("Failed to determine global config directory".to_string()))
}

async fn load_toml_file(path: &Path) -> Result<Config> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Io(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Parse(format!("Failed to parse config: {}: {e}", path.display())))
}

// ═══════════════════════════════════════════════════════════════════════════
// MERGE / OVERRIDES / VALIDATION
// ═══════════════════════════════════════════════════════════════════════════

impl Config {
    /// Overlays `other`, taking every value that differs from the default.
    pub fn merge(&mut self, other: Self) {
        if other.database.url != DEFAULT_DATABASE_URL {
            self.database.url = other.database.url;
        }
        self.simulator.merge(other.simulator);
        if other.aggregation.pallet_serial_base != DEFAULT_PALLET_SERIAL_BASE {
            self.aggregation.pallet_serial_base = other.aggregation.pallet_serial_base;
        }
        if other.runs.serial_width != DEFAULT_SERIAL_WIDTH {
            self.runs.serial_width = other.runs.serial_width;
        }
    }

    fn apply_env_vars(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `PACKTRACE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("PACKTRACE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = lookup("PACKTRACE_SEED") {
            self.simulator.seed = Some(parse_env("PACKTRACE_SEED", &value)?);
        }
        if let Some(value) = lookup("PACKTRACE_PRINTER_SUCCESS") {
            self.simulator.printer.success_probability =
                parse_env("PACKTRACE_PRINTER_SUCCESS", &value)?;
        }
        if let Some(value) = lookup("PACKTRACE_VERIFIER_SUCCESS") {
            self.simulator.verifier.success_probability =
                parse_env("PACKTRACE_VERIFIER_SUCCESS", &value)?;
        }
        if let Some(value) = lookup("PACKTRACE_PALLET_SERIAL_BASE") {
            self.aggregation.pallet_serial_base =
                parse_env("PACKTRACE_PALLET_SERIAL_BASE", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.simulator.printer.validate("simulator.printer")?;
        self.simulator.verifier.validate("simulator.verifier")?;

        let base = self.aggregation.pallet_serial_base;
        if base <= 1 || base > SERIAL_MAX {
            return Err(Error::InvalidConfig(format!(
                "aggregation.pallet_serial_base must be within 2..={SERIAL_MAX}, got {base}"
            )));
        }
        if !(1..=20).contains(&self.runs.serial_width) {
            return Err(Error::InvalidConfig(format!(
                "runs.serial_width must be within 1..=20, got {}",
                self.runs.serial_width
            )));
        }
        Ok(())
    }
}

impl SimulatorConfig {
    fn merge(&mut self, other: Self) {
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.printer != DeviceProfile::printer() {
            self.printer = other.printer;
        }
        if other.verifier != DeviceProfile::verifier() {
            self.verifier = other.verifier;
        }
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("Invalid {key} value '{value}': {e}")))
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
