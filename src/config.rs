use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::storage::SnapshotFormat;

/// Which password digest scheme new digests are produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestScheme {
    /// Unsalted hex SHA-256; deterministic, compatible with existing snapshots.
    #[default]
    Sha256,
    /// Salted Argon2 PHC strings.
    Argon2,
}

/// How new record identifiers are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    #[default]
    Uuid,
    /// Monotonic counter persisted in the `seq` slot.
    Counter,
}

/// Portal settings. Unspecified fields in a config file fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Prefix for every storage slot
    pub namespace: String,
    pub min_password_len: usize,
    /// Shared password of the seeded demo accounts
    pub demo_password: String,
    /// Seed the four demo accounts on first bootstrap
    pub seed_demo: bool,
    pub digest: DigestScheme,
    pub ids: IdScheme,
    pub snapshot_format: SnapshotFormat,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            namespace: "civic_connect".to_string(),
            min_password_len: 6,
            demo_password: "demo123".to_string(),
            seed_demo: true,
            digest: DigestScheme::Sha256,
            ids: IdScheme::Uuid,
            snapshot_format: SnapshotFormat::Json,
        }
    }
}

impl PortalConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        serde_json::from_slice::<PortalConfig>(&bytes)
            .map_err(|e| AppError::user("bad_config".to_string(), format!("{}: {}", path.display(), e)))
    }

    /// Defaults, then `CIVIC_CONFIG` (or `file`), then env overrides.
    pub fn load(file: Option<&Path>) -> AppResult<Self> {
        let env_file = std::env::var("CIVIC_CONFIG").ok();
        let mut cfg = match file.map(|p| p.to_path_buf()).or(env_file.map(Into::into)) {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        debug!(target: "civic::config", "config loaded namespace='{}' digest={:?} ids={:?}", cfg.namespace, cfg.digest, cfg.ids);
        Ok(cfg)
    }

    /// Apply `CIVIC_*` overrides from a lookup function (env in production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ns) = lookup("CIVIC_NAMESPACE") {
            if !ns.trim().is_empty() { self.namespace = ns.trim().to_string(); }
        }
        if let Some(v) = lookup("CIVIC_MIN_PASSWORD_LEN") {
            self.min_password_len = v.trim().parse::<usize>()
                .map_err(|_| AppError::user("bad_config".to_string(), format!("CIVIC_MIN_PASSWORD_LEN: not a number: '{}'", v)))?;
        }
        if let Some(v) = lookup("CIVIC_SEED_DEMO") {
            self.seed_demo = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("CIVIC_DIGEST") {
            self.digest = match v.trim().to_ascii_lowercase().as_str() {
                "sha256" => DigestScheme::Sha256,
                "argon2" => DigestScheme::Argon2,
                other => return Err(AppError::user("bad_config".to_string(), format!("CIVIC_DIGEST: unknown scheme '{}'", other))),
            };
        }
        if let Some(v) = lookup("CIVIC_IDS") {
            self.ids = match v.trim().to_ascii_lowercase().as_str() {
                "uuid" => IdScheme::Uuid,
                "counter" => IdScheme::Counter,
                other => return Err(AppError::user("bad_config".to_string(), format!("CIVIC_IDS: unknown scheme '{}'", other))),
            };
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
