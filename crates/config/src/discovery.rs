//! Discovery of the mise configuration files that apply to a project.
//!
//! When `mise config --tracked-configs` is available its answer wins;
//! otherwise the known layout is probed in mise's load order. Results are
//! snapshotted per `base_dir:env` until the next config or settings change.

use crate::toml_file::MiseTomlFile;
use dashmap::DashMap;
use globset::Glob;
use misebridge_core::MISE_ENV_FILE_VAR;
use misebridge_utils::{expand_user_path, normalize_path, relative_to};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

static ENV_SPECIFIC_CONFIG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\.config/mise|\.?mise)\.[^/]+\.toml$").expect("valid config file pattern")
});

/// Whether a project-relative path names a mise config file.
pub fn is_mise_config_path(relative: &str) -> bool {
    let relative = relative.replace('\\', "/");
    match relative.as_str() {
        "mise.toml" | ".mise.toml" | "mise.local.toml" | ".mise.local.toml" => true,
        "mise/config.toml" | ".mise/config.toml" => true,
        ".config/mise.toml" | ".config/mise/config.toml" => true,
        path if path.starts_with(".config/mise/conf.d/") && path.ends_with(".toml") => {
            !path[".config/mise/conf.d/".len()..].contains('/')
        }
        path => ENV_SPECIFIC_CONFIG.is_match(path),
    }
}

/// Whether `path` is a mise config file of the project at `base_dir`.
pub fn is_mise_config_file(base_dir: &Path, path: &Path) -> bool {
    relative_to(base_dir, path)
        .map(|relative| is_mise_config_path(&relative))
        .unwrap_or(false)
}

/// Candidate config files in mise's load order, existing or not.
pub fn fallback_config_paths(base_dir: &Path, config_environment: Option<&str>) -> Vec<PathBuf> {
    let mut paths = vec![
        base_dir.join("mise/config.toml"),
        base_dir.join(".mise/config.toml"),
        base_dir.join(".config/mise.toml"),
        base_dir.join(".config/mise/config.toml"),
    ];
    paths.extend(conf_d_files(&base_dir.join(".config/mise/conf.d")));

    let environments = config_environment
        .map(|envs| {
            envs.split(',')
                .map(str::trim)
                .filter(|env| !env.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    for env in environments {
        paths.push(base_dir.join(format!(".config/mise.{env}.toml")));
        paths.push(base_dir.join(format!(".mise.{env}.toml")));
        paths.push(base_dir.join(format!("mise.{env}.toml")));
    }

    paths.extend([
        base_dir.join("mise.local.toml"),
        base_dir.join("mise.toml"),
        base_dir.join(".mise.local.toml"),
        base_dir.join(".mise.toml"),
    ]);
    paths
}

fn conf_d_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(glob) = Glob::new("*.toml") else {
        return Vec::new();
    };
    let matcher = glob.compile_matcher();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.file_name().map(|n| matcher.is_match(n)).unwrap_or(false))
        .collect();
    files.sort();
    files
}

/// Directory that relative paths inside `config_path` resolve against.
///
/// `mise/config.toml`, `.config/mise.toml` and
/// `.config/mise/conf.d/x.toml` all resolve against the project root.
pub fn config_root(config_path: &Path) -> PathBuf {
    fn named(dir: &Path, name: &str) -> bool {
        dir.file_name().map(|n| n == name).unwrap_or(false)
    }
    fn up(dir: PathBuf) -> PathBuf {
        dir.parent().map(Path::to_path_buf).unwrap_or(dir)
    }

    let Some(parent) = config_path.parent() else {
        return PathBuf::from(".");
    };
    let mut dir = parent.to_path_buf();
    let is_config_toml = config_path
        .file_name()
        .map(|n| n == "config.toml")
        .unwrap_or(false);

    if named(&dir, "conf.d") {
        dir = up(dir);
        if named(&dir, "mise") {
            dir = up(dir);
        }
    } else if is_config_toml && (named(&dir, "mise") || named(&dir, ".mise")) {
        dir = up(dir);
    }
    if named(&dir, ".config") {
        dir = up(dir);
    }
    dir
}

/// Snapshot cache of resolved config files.
#[derive(Default)]
pub struct ConfigFileResolver {
    snapshots: DashMap<String, Arc<Vec<PathBuf>>>,
}

impl ConfigFileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config files for `base_dir`, in load order.
    ///
    /// `tracked` is the output of `mise config --tracked-configs` when
    /// available. Files outside `base_dir` (global config) are kept only with
    /// `include_external`.
    pub fn resolve(
        &self,
        base_dir: &Path,
        config_environment: Option<&str>,
        tracked: Option<&[String]>,
        include_external: bool,
    ) -> Arc<Vec<PathBuf>> {
        let key = format!(
            "{}:{}:{}:{}",
            normalize_path(base_dir),
            config_environment.unwrap_or("null"),
            include_external,
            tracked.is_some()
        );
        if let Some(snapshot) = self.snapshots.get(&key) {
            trace!(key = %key, "Config file snapshot hit");
            return Arc::clone(snapshot.value());
        }

        let files = Arc::new(compute_config_files(
            base_dir,
            config_environment,
            tracked,
            include_external,
        ));
        debug!(key = %key, count = files.len(), "Resolved mise config files");
        self.snapshots.insert(key, Arc::clone(&files));
        files
    }

    /// Forget every snapshot.
    pub fn clear(&self) {
        self.snapshots.clear();
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}

fn compute_config_files(
    base_dir: &Path,
    config_environment: Option<&str>,
    tracked: Option<&[String]>,
    include_external: bool,
) -> Vec<PathBuf> {
    let candidates: Vec<PathBuf> = match tracked {
        Some(tracked) if !tracked.is_empty() => tracked
            .iter()
            .map(|line| PathBuf::from(line.trim()))
            .filter(|path| include_external || relative_to(base_dir, path).is_some())
            .collect(),
        _ => fallback_config_paths(base_dir, config_environment),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| seen.insert(normalize_path(path)))
        .collect()
}

/// Files loaded by mise that are not TOML configs: dotenv files and
/// sourced scripts named in the configs, plus `MISE_ENV_FILE`.
pub fn external_tracked_files(base_dir: &Path, config_files: &[PathBuf]) -> Vec<PathBuf> {
    let mut resolved = Vec::new();
    for config in config_files {
        let file = match MiseTomlFile::read(config) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %config.display(), error = %e, "Skipping unreadable config");
                continue;
            }
        };
        let root = config_root(config);
        resolved.extend(
            file.external_files
                .iter()
                .filter_map(|raw| resolve_external_path(raw, &root)),
        );
    }

    if let Ok(env_file) = std::env::var(MISE_ENV_FILE_VAR) {
        let root = config_files
            .first()
            .map(|config| config_root(config))
            .unwrap_or_else(|| base_dir.to_path_buf());
        resolved.extend(resolve_external_path(&env_file, &root));
    }

    let mut seen = HashSet::new();
    resolved
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| seen.insert(normalize_path(path)))
        .collect()
}

fn resolve_external_path(raw: &str, root: &Path) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = PathBuf::from(expand_user_path(trimmed));
    if expanded.is_absolute() {
        Some(expanded)
    } else {
        Some(root.join(expanded))
    }
}
