// Application configuration
// JSON settings file in the app data directory; missing sections fall back to defaults

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::judge::JudgeConfig;
use crate::render::RenderOptions;
use crate::state::{get_config_path, StorageError};
use crate::trace::{ShapeError, ShapeLibrary, Tolerance, ValidatorConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid shape file: {0}")]
    Shapes(#[from] ShapeError),

    #[error("Invalid canvas size: {0}")]
    InvalidCanvasSize(f32),

    #[error("Invalid tolerance: {0:?}")]
    InvalidTolerance(Tolerance),
}

/// Trace widget and proximity settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Side length of the square drawing surface in pixels
    pub canvas_size: f32,

    pub tolerance: Tolerance,

    /// Optional JSON shape file layered over the built-in glyphs
    pub shapes_path: Option<PathBuf>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            canvas_size: 300.0,
            tolerance: Tolerance::default(),
            shapes_path: None,
        }
    }
}

impl TraceConfig {
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            tolerance: self.tolerance,
        }
    }

    /// Built-in glyphs, overridden per letter by `shapes_path` when set
    pub fn load_shapes(&self) -> Result<ShapeLibrary, ConfigError> {
        let mut library = ShapeLibrary::builtin();

        if let Some(path) = &self.shapes_path {
            let custom = ShapeLibrary::from_json_bytes(&fs::read(path)?)?;
            log::info!("Loaded {} custom shapes from {}", custom.len(), path.display());
            library.merge(custom);
        }

        Ok(library)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trace: TraceConfig,
    pub judge: JudgeConfig,
    pub render: RenderOptions,
}

impl AppConfig {
    /// Load from a file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = fs::read(path)?;
        let config: AppConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the app data directory
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&get_config_path()?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.trace.canvas_size;
        if !size.is_finite() || size <= 0.0 {
            return Err(ConfigError::InvalidCanvasSize(size));
        }

        let value = match self.trace.tolerance {
            Tolerance::Pixels(px) => px,
            Tolerance::CanvasFraction(fraction) => fraction,
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidTolerance(self.trace.tolerance));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{LetterShapeDefinition, Waypoint};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.trace.canvas_size, 300.0);
        assert!(!config.judge.enabled);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings").join("config.json");

        let mut config = AppConfig::default();
        config.trace.tolerance = Tolerance::Pixels(30.0);
        config.judge.enabled = true;
        config.render.image_size = 128;
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"trace": {"tolerance": {"mode": "pixels", "value": 25.0}}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.trace.tolerance, Tolerance::Pixels(25.0));
        assert_eq!(config.trace.canvas_size, 300.0);
        assert_eq!(config.judge, JudgeConfig::default());
    }

    #[test]
    fn test_rejects_bad_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse(_))));

        fs::write(&path, r#"{"trace": {"canvas_size": 0.0}}"#).unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidCanvasSize(_))
        ));
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        for tolerance in [
            Tolerance::Pixels(-25.0),
            Tolerance::Pixels(0.0),
            Tolerance::CanvasFraction(f32::NAN),
            Tolerance::CanvasFraction(f32::INFINITY),
        ] {
            let mut config = AppConfig::default();
            config.trace.tolerance = tolerance;
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidTolerance(_))),
                "{:?} should be rejected",
                tolerance
            );
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"trace": {"tolerance": {"mode": "pixels", "value": -25.0}}}"#,
        )
        .unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidTolerance(Tolerance::Pixels(_)))
        ));
    }

    #[test]
    fn test_zero_judge_retries_means_single_attempt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"judge": {"enabled": true, "max_retries": 0}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.judge.max_retries, 0);
        assert!(config.judge.enabled);
        assert_eq!(AppConfig::default().judge.max_retries, 1);
    }

    #[test]
    fn test_custom_shapes_override_builtin() {
        let dir = TempDir::new().unwrap();
        let shapes_path = dir.path().join("shapes.json");

        let mut custom = ShapeLibrary::new();
        custom.insert(
            LetterShapeDefinition::from_raw(
                'l',
                vec![Waypoint::new(0.2, 0.2, 1), Waypoint::new(0.8, 0.8, 2)],
            )
            .unwrap(),
        );
        fs::write(&shapes_path, custom.to_json_bytes().unwrap()).unwrap();

        let trace = TraceConfig {
            shapes_path: Some(shapes_path),
            ..TraceConfig::default()
        };
        let library = trace.load_shapes().unwrap();

        assert_eq!(library.len(), ShapeLibrary::builtin().len());
        let l = library.get_shape_for('l').unwrap();
        assert_eq!(l.waypoints()[0].x, 0.2);
    }
}
