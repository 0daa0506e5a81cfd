//! Writing the current diagram to disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::render::Artifact;
use crate::render::mermaid::{rasterize_svg, svg_width};

pub const SVG_FILE_NAME: &str = "diagram.svg";
pub const PNG_FILE_NAME: &str = "diagram.png";

/// PNG exports are rasterized at this multiple of the SVG's natural width.
pub const PNG_SCALE: f32 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no diagram to export")]
    NoDiagram,
    #[error("failed to rasterize diagram: {0}")]
    Rasterize(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Write the artifact's SVG to `path`.
///
/// # Errors
///
/// Returns [`ExportError::NoDiagram`] without an artifact, or
/// [`ExportError::Io`] if the file cannot be written.
pub fn export_svg(artifact: Option<&Artifact>, path: &Path) -> Result<PathBuf, ExportError> {
    let artifact = artifact.ok_or(ExportError::NoDiagram)?;
    fs::write(path, artifact.svg()).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "exported svg");
    Ok(path.to_path_buf())
}

/// Rasterize the artifact at [`PNG_SCALE`] and write it to `path` as PNG.
///
/// # Errors
///
/// Returns an [`ExportError`] if there is no artifact, rasterizing fails, or
/// the file cannot be written.
pub fn export_png(artifact: Option<&Artifact>, path: &Path) -> Result<PathBuf, ExportError> {
    let artifact = artifact.ok_or(ExportError::NoDiagram)?;
    let natural = svg_width(artifact.svg()).map_err(|e| ExportError::Rasterize(e.to_string()))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let target = (natural * PNG_SCALE).ceil().max(1.0) as u32;

    let image =
        rasterize_svg(artifact.svg(), target).map_err(|e| ExportError::Rasterize(e.to_string()))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| ExportError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), width = target, "exported png");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="red"/></svg>"#;

    #[test]
    fn test_export_requires_artifact() {
        let dir = TempDir::new().unwrap();
        let err = export_svg(None, &dir.path().join(SVG_FILE_NAME)).unwrap_err();
        assert!(matches!(err, ExportError::NoDiagram));
        assert!(!dir.path().join(SVG_FILE_NAME).exists());
    }

    #[test]
    fn test_export_svg_writes_markup() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new("diagram", SVG);
        let path = export_svg(Some(&artifact), &dir.path().join(SVG_FILE_NAME)).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), SVG);
    }

    #[test]
    fn test_export_png_doubles_width() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new("diagram", SVG);
        let path = export_png(Some(&artifact), &dir.path().join(PNG_FILE_NAME)).unwrap();
        let img = image::open(path).unwrap();
        assert_eq!(img.width(), 80);
        assert_eq!(img.height(), 40);
    }

    #[test]
    fn test_export_png_rejects_bad_svg() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new("diagram", "not svg");
        let err = export_png(Some(&artifact), &dir.path().join(PNG_FILE_NAME)).unwrap_err();
        assert!(matches!(err, ExportError::Rasterize(_)));
    }
}
