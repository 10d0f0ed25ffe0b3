//! Catalog loading.

use std::path::Path;
use tracing::info;

use fitclip_models::{Catalog, CatalogError};

/// Load and validate the exercise catalog from a JSON file.
///
/// Loading happens once at process start; any failure here (missing
/// file, bad JSON, invalid media URL) is fatal before any segment is
/// processed. The loaded catalog is shared read-only for the process
/// lifetime.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    let catalog = Catalog::from_json_str(&raw)?;
    info!(
        path = %path.display(),
        exercises = catalog.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitclip_models::{Category, DifficultyTier};
    use std::io::Write;

    #[test]
    fn test_load_valid_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "core": {{
                    "low": [
                        {{"name": "squat", "media_url": "https://cdn.example.com/squat.mp4",
                         "narration_text": "Keep your back straight"}}
                    ]
                }}
            }}"#
        )
        .unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        let list = catalog
            .exercises(Category::Core, DifficultyTier::Low)
            .unwrap();
        assert_eq!(list[0].name, "squat");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_catalog(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Unreadable(_)));
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_catalog(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }
}
