use crate::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the externally owned version manifest. The file is passed
/// through the ingest response as-is apart from the bookkeeping fields the
/// handler injects.
#[derive(Clone)]
pub struct ManifestConf {
    pub path: PathBuf,
}

impl ManifestConf {
    pub fn from_env() -> Self {
        let path = std::env::var("VERSION_FILE").unwrap_or_else(|_| "version.json".to_owned());
        ManifestConf { path: path.into() }
    }
}

/// Ok(None) when the file is absent, Err when it exists but doesn't hold a
/// JSON object. The two cases surface as 404 and 500 respectively.
pub fn load(path: &Path) -> Result<Option<Map<String, Value>>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    let manifest: Map<String, Value> = serde_json::from_str(&data)?;
    Ok(Some(manifest))
}

#[cfg(test)]
mod test {
    use super::load;
    use crate::Result;
    use std::path::Path;

    #[test]
    fn absent_file_is_none() -> Result<()> {
        assert!(load(Path::new("/definitely/not/there/version.json"))?.is_none());
        Ok(())
    }

    #[test]
    fn valid_manifest_loads() -> Result<()> {
        let path = crate::test::write_manifest(r#"{"version": "1.2.3", "channel": "stable"}"#);
        let manifest = load(&path)?.unwrap();
        assert_eq!("1.2.3", manifest["version"]);
        Ok(())
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let path = crate::test::write_manifest("not json at all");
        assert!(load(&path).is_err());
    }
}
