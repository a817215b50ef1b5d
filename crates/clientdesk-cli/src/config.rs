// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use clientdesk_app::{DEFAULT_PAGE_SIZE, FormTiming, StaticAuth, UserId};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "clientdesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: &str = "5s";
const DEFAULT_SUBMIT_LATENCY: &str = "600ms";
const DEFAULT_FEEDBACK_RESET: &str = "1500ms";
pub const CONFIG_PATH_ENV: &str = "CLIENTDESK_CONFIG_PATH";
pub const TOKEN_ENV: &str = "CLIENTDESK_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            remote: Remote::default(),
            auth: Auth::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Remote {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
    pub token: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<usize>,
    pub submit_latency: Option<String>,
    pub feedback_reset: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(DEFAULT_PAGE_SIZE),
            submit_latency: Some(DEFAULT_SUBMIT_LATENCY.to_owned()),
            feedback_reset: Some(DEFAULT_FEEDBACK_RESET.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [remote], [auth], and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config {} has version {}; expected 1",
                path.display(),
                self.version
            );
        }

        if let Some(base_url) = &self.remote.base_url {
            clientdesk_remote::validate_base_url(base_url)
                .with_context(|| format!("invalid [remote] in {}", path.display()))?;
        }

        if let Some(timeout) = &self.remote.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "remote.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(user_id) = self.auth.user_id
            && user_id <= 0
        {
            bail!(
                "auth.user_id in {} must be positive, got {}",
                path.display(),
                user_id
            );
        }

        if self.ui.page_size == Some(0) {
            bail!(
                "ui.page_size in {} must be positive, got 0",
                path.display()
            );
        }

        for (key, value) in [
            ("ui.submit_latency", &self.ui.submit_latency),
            ("ui.feedback_reset", &self.ui.feedback_reset),
        ] {
            if let Some(value) = value {
                parse_duration(value)
                    .with_context(|| format!("{key} in {}", path.display()))?;
            }
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.remote
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.remote.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_size(&self) -> usize {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn form_timing(&self) -> Result<FormTiming> {
        Ok(FormTiming {
            latency: parse_duration(
                self.ui
                    .submit_latency
                    .as_deref()
                    .unwrap_or(DEFAULT_SUBMIT_LATENCY),
            )?,
            reset_after: parse_duration(
                self.ui
                    .feedback_reset
                    .as_deref()
                    .unwrap_or(DEFAULT_FEEDBACK_RESET),
            )?,
        })
    }

    /// Token from the environment, else from `[auth]`. Blank means none.
    pub fn token(&self) -> Option<String> {
        let present = |token: &String| !token.trim().is_empty();
        env::var(TOKEN_ENV)
            .ok()
            .filter(present)
            .or_else(|| self.auth.token.clone().filter(present))
    }

    /// Session for the configured user. No token yields a signed-out session,
    /// so every remote call fails as expired until one is configured.
    pub fn auth(&self) -> Result<StaticAuth> {
        let Some(token) = self.token() else {
            return Ok(StaticAuth::signed_out());
        };
        let user_id = self.auth.user_id.ok_or_else(|| {
            anyhow!("auth.user_id is required when a token is set -- add it under [auth]")
        })?;
        Ok(StaticAuth::new(token, UserId::new(user_id)))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# clientdesk config\n# Place this file at: {}\n\nversion = 1\n\n[remote]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[auth]\n# {} overrides the token below.\n# token = \"paste-your-api-token\"\n# user_id = 1\n\n[ui]\npage_size = {}\nsubmit_latency = \"{}\"\nfeedback_reset = \"{}\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            TOKEN_ENV,
            DEFAULT_PAGE_SIZE,
            DEFAULT_SUBMIT_LATENCY,
            DEFAULT_FEEDBACK_RESET,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 600ms or 5s)")
}
