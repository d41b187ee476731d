use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Ingestion read concurrency is not 0
/// - Media source ids are unique
/// - Media source roots are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.ingestion.max_parallel_reads == 0 {
        return Err(ConfigError::ValidationError(
            "ingestion.max_parallel_reads cannot be 0".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for source in &config.media_sources {
        if !seen.insert(source.id) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate media source id {}",
                source.id
            )));
        }
        if source.root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "media source {} has an empty root",
                source.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediaSourceEntry, MediaSourceKind};
    use std::path::PathBuf;

    fn source(id: i64, root: &str) -> MediaSourceEntry {
        MediaSourceEntry {
            id,
            name: format!("source-{}", id),
            kind: MediaSourceKind::Filesystem,
            root: PathBuf::from(root),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config {
            media_sources: vec![source(1, "/a"), source(2, "/b")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_parallel_reads_fails() {
        let mut config = Config::default();
        config.ingestion.max_parallel_reads = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_duplicate_source_ids_fails() {
        let config = Config {
            media_sources: vec![source(1, "/a"), source(1, "/b")],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate media source id 1"));
    }

    #[test]
    fn test_validate_empty_root_fails() {
        let config = Config {
            media_sources: vec![source(3, "")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
