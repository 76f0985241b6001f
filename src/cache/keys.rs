/// Cache key derivation
///
/// An entry is keyed by the input file's base name with the final extension
/// stripped: `/media/show/ep01.mkv` -> `ep01`. The worker writes its
/// intermediate files under `<cache root>/<key>/`.
use std::path::{Component, Path};

use super::error::{CacheError, Result};

/// Derive the cache key for an input path
pub fn key_for(target: &Path) -> Option<String> {
    target
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Reject keys that would resolve outside the cache root
///
/// A key must be exactly one normal path component. Separators and `:` are
/// refused on every platform, since `root.join("C:")` replaces the root on
/// Windows.
pub fn validate_key(key: &str) -> Result<()> {
    let mut components = Path::new(key).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == key
    );
    let invalid = !single_normal || key.contains(['/', '\\', ':', '\0']);

    if invalid {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
