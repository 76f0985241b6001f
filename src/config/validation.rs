use super::models::Config;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Path '{field}' must not be empty")]
    EmptyPath { field: &'static str },

    #[error("Cache directory '{cache}' would contain '{field}' ({path}); clearing the cache would delete it")]
    InsideCacheDir {
        field: &'static str,
        cache: String,
        path: String,
    },

    #[error("Path '{field}' cannot be made absolute: {source}")]
    Unresolvable {
        field: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_non_empty(config)?;
    validate_cache_isolation(config)?;
    Ok(())
}

fn validate_non_empty(config: &Config) -> Result<(), ValidationError> {
    let fields: [(&'static str, &Path); 10] = [
        ("paths.core_dir", config.paths.core_dir.as_path()),
        ("paths.cache_dir", config.paths.cache_dir.as_path()),
        ("paths.settings_file", config.paths.settings_file.as_path()),
        ("worker.executable", config.worker.executable.as_path()),
        ("worker.scripts_dir", config.worker.scripts_dir.as_path()),
        ("worker.entry_script", config.worker.entry_script.as_path()),
        ("worker.utility_script", config.worker.utility_script.as_path()),
        ("worker.tool_root", config.worker.tool_root.as_path()),
        ("worker.codec_dir", config.worker.codec_dir.as_path()),
        ("worker.runtime_dir", config.worker.runtime_dir.as_path()),
    ];

    for (field, path) in fields {
        if path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyPath { field });
        }
    }
    Ok(())
}

/// `clear()` removes the cache root recursively, so nothing the application
/// needs may live under it. Both sides are compared in absolute form.
fn validate_cache_isolation(config: &Config) -> Result<(), ValidationError> {
    let cache = resolve("paths.cache_dir", &config.paths.cache_dir)?;
    let protected: [(&'static str, &Path); 5] = [
        ("paths.core_dir", config.paths.core_dir.as_path()),
        ("paths.settings_file", config.paths.settings_file.as_path()),
        ("worker.executable", config.worker.executable.as_path()),
        ("worker.scripts_dir", config.worker.scripts_dir.as_path()),
        ("worker.tool_root", config.worker.tool_root.as_path()),
    ];

    for (field, path) in protected {
        let path = resolve(field, path)?;
        if path.starts_with(&cache) {
            return Err(ValidationError::InsideCacheDir {
                field,
                cache: cache.display().to_string(),
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` folded lexically
fn resolve(field: &'static str, path: &Path) -> Result<PathBuf, ValidationError> {
    let absolute =
        std::path::absolute(path).map_err(|source| ValidationError::Unresolvable { field, source })?;

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut config = Config::default();
        config.worker.entry_script = PathBuf::new();

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::EmptyPath {
                field: "worker.entry_script"
            })
        ));
    }

    #[test]
    fn test_cache_dir_containing_core_rejected() {
        let mut config = Config::default();
        config.paths.cache_dir = PathBuf::from("core");

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InsideCacheDir {
                field: "paths.core_dir",
                ..
            })
        ));
    }

    #[test]
    fn test_settings_file_inside_cache_rejected() {
        let mut config = Config::default();
        config.paths.cache_dir = PathBuf::from("/data/cache");
        config.paths.settings_file = PathBuf::from("/data/cache/config.json");

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::InsideCacheDir {
                field: "paths.settings_file",
                ..
            })
        ));
    }

    #[test]
    fn test_sibling_prefix_is_not_inside() {
        let mut config = Config::default();
        config.paths.cache_dir = PathBuf::from("core/cache");
        config.paths.settings_file = PathBuf::from("core/cache-settings.json");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_cache_dir_at_working_directory_rejected() {
        let cwd = std::env::current_dir().unwrap();
        for cache in [PathBuf::from("."), PathBuf::from("./"), cwd] {
            let mut config = Config::default();
            config.paths.cache_dir = cache.clone();

            let result = validate(&config);
            assert!(
                matches!(
                    result,
                    Err(ValidationError::InsideCacheDir {
                        field: "paths.core_dir",
                        ..
                    })
                ),
                "accepted cache_dir {}",
                cache.display()
            );
        }
    }

    #[test]
    fn test_parent_components_are_folded() {
        let mut config = Config::default();
        config.paths.cache_dir = PathBuf::from("core/cache/..");
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InsideCacheDir {
                field: "paths.core_dir",
                ..
            })
        ));
    }

    #[test]
    fn test_absolute_cache_next_to_relative_core_accepted() {
        let mut config = Config::default();
        config.paths.cache_dir = std::env::current_dir().unwrap().join("core/cache");
        assert!(validate(&config).is_ok());
    }
}
