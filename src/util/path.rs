use std::env::VarError;
use std::path::{Path, PathBuf};

use shellexpand::LookupError;

/// Expand `~`, `$VAR` and `${VAR}` in `raw` and anchor a relative result at `base`.
pub fn resolve_against(base: &Path, raw: &str) -> Result<PathBuf, LookupError<VarError>> {
    let expanded = PathBuf::from(shellexpand::full(raw)?.into_owned());
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

/// `path` relative to `base` when possible, for shorter messages.
pub fn display_relative(path: &Path, base: &Path) -> String {
    match pathdiff::diff_paths(path, base) {
        Some(rel) if !rel.as_os_str().is_empty() && !rel.starts_with("..") => {
            rel.display().to_string()
        }
        _ => path.display().to_string(),
    }
}
