use std::path::{Path, PathBuf};

/// Forward-slash form of a path, used for comparisons and cache keys.
pub fn normalize_path(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Current user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand a leading home abbreviation against `home`.
///
/// Handles `~`, `~/`, `~\`, `$HOME/`, `${HOME}/` and `%USERPROFILE%\`. Other
/// text is returned unchanged.
pub fn expand_home(text: &str, home: &Path) -> String {
    let home = home.to_string_lossy();
    if text == "~" || text == "$HOME" || text == "${HOME}" {
        return home.into_owned();
    }
    const PREFIXES: [&str; 8] = [
        "~/",
        "~\\",
        "$HOME/",
        "$HOME\\",
        "${HOME}/",
        "${HOME}\\",
        "%USERPROFILE%\\",
        "%USERPROFILE%/",
    ];
    for prefix in PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            let separator = &prefix[prefix.len() - 1..];
            let trimmed = home.trim_end_matches(['/', '\\']);
            return format!("{trimmed}{separator}{rest}");
        }
    }
    text.to_string()
}

/// `~`-style expansion against the real home directory.
pub fn expand_user_path(text: &str) -> String {
    shellexpand::tilde(text).into_owned()
}

/// Whether `path` is a file the current user may execute.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Path of `path` relative to `base`, forward slashes, if it is inside it.
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let base = normalize_path(base);
    let base = base.trim_end_matches('/');
    let path = normalize_path(path);
    let rest = path.strip_prefix(base)?.strip_prefix('/')?;
    (!rest.is_empty()).then(|| rest.to_string())
}
