//! Saved defaults: a global rc file plus a `.merditrc` in the working
//! directory, each holding command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::state::Theme;

const APP_DIR: &str = "merdit";
const LOCAL_RC: &str = ".merditrc";

/// Where shareable links point unless `--base-url` says otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub theme: Option<Theme>,
    pub templates: Option<PathBuf>,
    pub base_url: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub ephemeral: bool,
    pub no_images: bool,
    pub force_half_cell: bool,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: booleans OR together, options from
    /// `other` win when set.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            theme: other.theme.or(self.theme),
            templates: other.templates.clone().or_else(|| self.templates.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            storage_dir: other
                .storage_dir
                .clone()
                .or_else(|| self.storage_dir.clone()),
            ephemeral: self.ephemeral || other.ephemeral,
            no_images: self.no_images || other.no_images,
            force_half_cell: self.force_half_cell || other.force_half_cell,
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(theme) = self.theme {
            lines.push(format!("--theme {theme}"));
        }
        if let Some(dir) = &self.templates {
            lines.push(format!("--templates {}", dir.display()));
        }
        if let Some(url) = &self.base_url {
            lines.push(format!("--base-url {url}"));
        }
        if let Some(dir) = &self.storage_dir {
            lines.push(format!("--storage-dir {}", dir.display()));
        }
        for (on, flag) in [
            (self.ephemeral, "--ephemeral"),
            (self.no_images, "--no-images"),
            (self.force_half_cell, "--force-half-cell"),
            (self.perf, "--perf"),
        ] {
            if on {
                lines.push(flag.to_string());
            }
        }
        if let Some(path) = &self.render_debug_log {
            lines.push(format!("--render-debug-log {}", path.display()));
        }
        lines
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR).join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_DIR)
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        if let Some(base) = base {
            return base.join(APP_DIR).join("config");
        }
    }

    PathBuf::from(LOCAL_RC)
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_RC)
}

/// Read flags from an rc file. A missing file yields no flags.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(ToOwned::to_owned)
        .collect();
    Ok(parse_flag_tokens(&tokens))
}

/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# merdit defaults (saved with --save)".to_string()];
    lines.extend(flags.to_lines());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// # Errors
///
/// Returns an error if the file exists and cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags merdit understands out of raw arguments, ignoring the rest.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let mut value = || {
            inline.or_else(|| {
                let next = tokens.get(i + 1)?;
                i += 1;
                Some(next.as_str())
            })
        };
        match name {
            "--ephemeral" => flags.ephemeral = true,
            "--no-images" => flags.no_images = true,
            "--force-half-cell" => flags.force_half_cell = true,
            "--perf" => flags.perf = true,
            "--theme" => flags.theme = value().and_then(|v| v.parse().ok()),
            "--templates" => flags.templates = value().map(PathBuf::from),
            "--base-url" => flags.base_url = value().map(ToOwned::to_owned),
            "--storage-dir" => flags.storage_dir = value().map(PathBuf::from),
            "--render-debug-log" => flags.render_debug_log = value().map(PathBuf::from),
            _ => {}
        }
        i += 1;
    }
    flags
}
