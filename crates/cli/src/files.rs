use crate::error::CliError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    debug!(?path, "Reading input");
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` to `path`, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let encoded = serde_json::to_vec_pretty(value).map_err(|source| CliError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    let write = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write)?;
    }
    std::fs::write(path, encoded).map_err(write)?;
    debug!(?path, "Wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let value = BTreeMap::from([("a".to_owned(), 1_u64)]);

        write_json(&path, &value).unwrap();
        let read: BTreeMap<String, u64> = read_json(&path).unwrap();

        assert_eq!(read, value);
    }

    #[test]
    fn test_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_matches!(read_json::<u64>(&missing), Err(CliError::Read { .. }));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{").unwrap();
        assert_matches!(read_json::<u64>(&garbage), Err(CliError::Parse { .. }));
    }
}
