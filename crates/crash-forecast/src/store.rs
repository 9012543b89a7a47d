//! Durable model artifacts.
//!
//! A model is stored as one JSON document tagged with its `kind` and a
//! format version. Writes go through a sibling `.tmp` file and a rename.

use std::fs;
use std::path::{Path, PathBuf};

use crash_domain::YearlyCount;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arima::{ArimaModel, ForecastModel, ModelMetadata};
use crate::error::{ForecastError, Result};

/// Version written into every artifact; any other version is rejected.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelArtifact {
    Arima(ArimaArtifact),
}

#[derive(Debug, Serialize, Deserialize)]
struct ArimaArtifact {
    format_version: u32,
    metadata: ModelMetadata,
    phi: f64,
    theta: f64,
    history: Vec<YearlyCount>,
}

impl From<&ArimaModel> for ModelArtifact {
    fn from(model: &ArimaModel) -> Self {
        Self::Arima(ArimaArtifact {
            format_version: FORMAT_VERSION,
            metadata: model.metadata().clone(),
            phi: model.phi(),
            theta: model.theta(),
            history: model.history().to_vec(),
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist a fitted model, replacing any previous artifact atomically.
pub fn save_model(path: &Path, model: &ArimaModel) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ForecastError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(&ModelArtifact::from(model)).map_err(|source| {
        ForecastError::Serialization {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let tmp = tmp_path(path);
    if let Err(source) = fs::write(&tmp, json) {
        let _ = fs::remove_file(&tmp);
        return Err(ForecastError::Io { path: tmp, source });
    }
    fs::rename(&tmp, path).map_err(|source| ForecastError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        model_id = %model.metadata().model_id,
        "Model persisted"
    );
    Ok(())
}

/// Load an ARIMA model, validating every field.
///
/// # Errors
///
/// `ModelMissing` if the file cannot be read; `InvalidModel` if it is not a
/// well-formed artifact of a supported kind and version.
pub fn load_arima(path: &Path) -> Result<ArimaModel> {
    let invalid = |reason: String| ForecastError::InvalidModel {
        path: path.to_path_buf(),
        reason,
    };

    let json = fs::read_to_string(path).map_err(|source| ForecastError::ModelMissing {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ModelArtifact =
        serde_json::from_str(&json).map_err(|e| invalid(e.to_string()))?;

    let ModelArtifact::Arima(artifact) = artifact;
    if artifact.format_version != FORMAT_VERSION {
        return Err(invalid(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            artifact.format_version
        )));
    }

    let model = ArimaModel::from_parts(
        artifact.metadata,
        artifact.phi,
        artifact.theta,
        artifact.history,
    )
    .map_err(invalid)?;

    debug!(
        path = %path.display(),
        model_id = %model.metadata().model_id,
        "Model loaded"
    );
    Ok(model)
}

/// Load any supported model as a forecasting trait object.
pub fn load_model(path: &Path) -> Result<Box<dyn ForecastModel>> {
    Ok(Box::new(load_arima(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arima::forecast_points;
    use crate::arima::tests::synthetic_series;
    use tempfile::TempDir;

    fn saved_model(dir: &TempDir) -> (PathBuf, ArimaModel) {
        let path = dir.path().join("models").join("crashes_predictor_model.json");
        let model = ArimaModel::fit(&synthetic_series(30)).unwrap();
        save_model(&path, &model).unwrap();
        (path, model)
    }

    fn rewrite(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        edit(&mut value);
        fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let (path, model) = saved_model(&dir);

        assert!(!tmp_path(&path).exists());
        let loaded = load_arima(&path).unwrap();
        assert_eq!(loaded.metadata().model_id, model.metadata().model_id);
        assert_eq!(loaded.metadata().order, [1, 1, 1]);
        assert_eq!(loaded.history(), model.history());
        assert!((loaded.phi() - model.phi()).abs() < 1e-12);
        assert!((loaded.theta() - model.theta()).abs() < 1e-12);
    }

    #[test]
    fn test_loaded_model_forecasts_deterministically() {
        let dir = TempDir::new().unwrap();
        let (path, model) = saved_model(&dir);

        let loaded = load_model(&path).unwrap();
        let first = forecast_points(loaded.as_ref(), 10).unwrap();
        let second = forecast_points(loaded.as_ref(), 10).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].year, 2000);

        let fresh = forecast_points(&model, 10).unwrap();
        for (a, b) in first.iter().zip(&fresh) {
            assert_eq!(a.year, b.year);
            assert!((a.estimate - b.estimate).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let err = load_model(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ForecastError::ModelMissing { .. }));
    }

    #[test]
    fn test_corrupt_artifact_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_model(&path).unwrap_err(),
            ForecastError::InvalidModel { .. }
        ));
    }

    #[test]
    fn test_unknown_kind_is_invalid() {
        let dir = TempDir::new().unwrap();
        let (path, _) = saved_model(&dir);
        rewrite(&path, |v| v["kind"] = "linear_regression".into());
        assert!(matches!(
            load_model(&path).unwrap_err(),
            ForecastError::InvalidModel { .. }
        ));
    }

    #[test]
    fn test_wrong_version_is_invalid() {
        let dir = TempDir::new().unwrap();
        let (path, _) = saved_model(&dir);
        rewrite(&path, |v| v["format_version"] = 99.into());
        let err = load_model(&path).unwrap_err();
        assert!(err.to_string().contains("format version 99"));
    }

    #[test]
    fn test_empty_history_is_invalid() {
        let dir = TempDir::new().unwrap();
        let (path, _) = saved_model(&dir);
        rewrite(&path, |v| v["history"] = serde_json::Value::Array(Vec::new()));
        assert!(matches!(
            load_model(&path).unwrap_err(),
            ForecastError::InvalidModel { .. }
        ));
    }
}
