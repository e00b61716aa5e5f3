//! Threagile YAML output.

use crate::domain::{ConversionError, ErrorKind, Result, ThreagileModel};
use std::path::Path;

pub fn to_yaml(model: &ThreagileModel) -> Result<String> {
    serde_yaml::to_string(model).map_err(|err| {
        ConversionError::new(
            ErrorKind::InvalidModel,
            format!("cannot serialize model: {err}"),
        )
        .with_cause(err)
    })
}

/// Parse a Threagile model, e.g. one written by an earlier run.
pub fn from_yaml(input: &str) -> Result<ThreagileModel> {
    serde_yaml::from_str(input).map_err(|err| {
        ConversionError::new(ErrorKind::InvalidModel, format!("invalid model YAML: {err}"))
            .with_cause(err)
    })
}

/// Read and parse a model file.
pub fn read_model(path: &Path) -> Result<ThreagileModel> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        ConversionError::new(
            ErrorKind::FileNotFound,
            format!("cannot read {}: {err}", path.display()),
        )
        .with_cause(err)
    })?;
    from_yaml(&contents)
}

/// Serialize and write `model` to `path`.
pub fn write_model(model: &ThreagileModel, path: &Path) -> Result<()> {
    let yaml = to_yaml(model)?;
    write_atomic(path, &yaml)
}

/// Write through a sibling temp file so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let access_denied = |err: std::io::Error| {
        ConversionError::new(
            ErrorKind::AccessDenied,
            format!("cannot write {}: {err}", path.display()),
        )
        .with_cause(err)
    };

    let written = std::fs::write(tmp, contents).and_then(|()| std::fs::rename(tmp, path));
    if let Err(err) = written {
        let _ = std::fs::remove_file(tmp);
        return Err(access_denied(err));
    }
    log::debug!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommunicationLink, TechnicalAsset};

    fn model() -> ThreagileModel {
        ThreagileModel {
            title: "Shop".into(),
            technical_assets: vec![TechnicalAsset {
                id: "db".into(),
                asset_type: "database".into(),
                ..Default::default()
            }],
            communication_links: vec![CommunicationLink {
                id: "e".into(),
                source_id: "web".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_yaml_uses_camel_case_keys() {
        let yaml = to_yaml(&model()).unwrap();
        assert!(yaml.contains("title: Shop"));
        assert!(yaml.contains("technicalAssets:"));
        assert!(yaml.contains("type: database"));
        assert!(yaml.contains("sourceId: web"));
        assert!(yaml.contains("communicationLinks:"));
    }

    #[test]
    fn test_yaml_reads_back() {
        let original = model();
        let parsed = from_yaml(&to_yaml(&original).unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_writes_file_and_reports_denied_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.yaml");
        write_model(&model(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("technicalAssets:"));
        assert!(!dir.path().join("model.yaml.tmp").exists());

        let missing_dir = dir.path().join("no-such-dir").join("model.yaml");
        let err = write_model(&model(), &missing_dir).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
        assert!(!missing_dir.exists());
    }

    #[test]
    fn test_reads_written_model_and_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.yaml");
        write_model(&model(), &path).unwrap();
        assert_eq!(read_model(&path).unwrap(), model());

        std::fs::write(&path, "technicalAssets: 42").unwrap();
        assert_eq!(read_model(&path).unwrap_err().kind, ErrorKind::InvalidModel);
        let missing = dir.path().join("absent.yaml");
        assert_eq!(read_model(&missing).unwrap_err().kind, ErrorKind::FileNotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.yaml");
        let tmp = dir.path().join("model.yaml.tmp");
        // The temp entry exists but cannot be written through.
        std::os::unix::fs::symlink(dir.path().join("gone").join("x"), &tmp).unwrap();

        let err = write_atomic(&path, "title: Shop\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
        assert!(tmp.symlink_metadata().is_err());
        assert!(!path.exists());
    }
}
