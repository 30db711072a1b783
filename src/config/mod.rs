use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::WcagLevel;
use crate::core::AuditOptions;

pub const CONFIG_ENV: &str = "A11YSWEEP_CONFIG";

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub audit: AuditConfig,
    pub rules: RulesConfig,
    pub ui: UiConfig,
    pub discover: DiscoverConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditConfig {
    pub wcag_level: WcagLevel,
    pub skip_contrast: bool,
    pub skip_images: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RulesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverConfig {
    pub exclude: Vec<String>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            audit: AuditConfig {
                wcag_level: WcagLevel::AA,
                skip_contrast: false,
                skip_images: false,
            },
            rules: RulesConfig { ignore_file: None },
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            discover: DiscoverConfig {
                exclude: Vec::new(),
            },
            config_path: None,
        }
    }
}

impl EffectiveConfig {
    pub fn audit_options(&self) -> AuditOptions {
        AuditOptions {
            wcag_level: self.audit.wcag_level,
            skip_contrast: self.audit.skip_contrast,
            skip_images: self.audit.skip_images,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    audit: Option<RawAuditConfig>,
    rules: Option<RawRulesConfig>,
    ui: Option<RawUiConfig>,
    discover: Option<RawDiscoverConfig>,
}

#[derive(Debug, Deserialize)]
struct RawAuditConfig {
    wcag_level: Option<String>,
    skip_contrast: Option<bool>,
    skip_images: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawRulesConfig {
    ignore_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawDiscoverConfig {
    exclude: Option<Vec<String>>,
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/a11ysweep/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s)
            .with_context(|| format!("failed to parse config file (TOML): {}", path.display()))?;
        apply_raw_config(&mut cfg, raw)?;
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) -> Result<()> {
    if let Some(audit) = raw.audit {
        if let Some(level) = audit.wcag_level {
            cfg.audit.wcag_level = parse_level(&level).context("audit.wcag_level")?;
        }
        if let Some(skip_contrast) = audit.skip_contrast {
            cfg.audit.skip_contrast = skip_contrast;
        }
        if let Some(skip_images) = audit.skip_images {
            cfg.audit.skip_images = skip_images;
        }
    }

    if let Some(rules) = raw.rules {
        if let Some(ignore_file) = rules.ignore_file {
            cfg.rules.ignore_file = Some(ignore_file);
        }
    }

    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(discover) = raw.discover {
        if let Some(exclude) = discover.exclude {
            cfg.discover.exclude = exclude;
        }
    }

    Ok(())
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("A11YSWEEP_AUDIT_WCAG_LEVEL") {
        cfg.audit.wcag_level = parse_level(&v).context("A11YSWEEP_AUDIT_WCAG_LEVEL")?;
    }
    if let Ok(v) = std::env::var("A11YSWEEP_AUDIT_SKIP_CONTRAST") {
        cfg.audit.skip_contrast = parse_bool(&v).context("A11YSWEEP_AUDIT_SKIP_CONTRAST")?;
    }
    if let Ok(v) = std::env::var("A11YSWEEP_AUDIT_SKIP_IMAGES") {
        cfg.audit.skip_images = parse_bool(&v).context("A11YSWEEP_AUDIT_SKIP_IMAGES")?;
    }
    if let Ok(v) = std::env::var("A11YSWEEP_RULES_IGNORE_FILE") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.rules.ignore_file = Some(PathBuf::from(v));
        }
    }
    if let Ok(v) = std::env::var("A11YSWEEP_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).context("A11YSWEEP_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("A11YSWEEP_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .context("A11YSWEEP_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("A11YSWEEP_DISCOVER_EXCLUDE") {
        let parts: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if !parts.is_empty() {
            cfg.discover.exclude = parts;
        }
    }

    Ok(())
}

fn parse_level(s: &str) -> Result<WcagLevel> {
    s.parse::<WcagLevel>().map_err(anyhow::Error::msg)
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
