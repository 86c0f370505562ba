use std::path::PathBuf;

use crate::{
    catalog::{Catalog, CatalogDocument, CatalogSource},
    error::{AppError, AppResult},
};

/// Reads the catalog from a JSON file on every fetch
///
/// The file holds either the full `{ chords, songs }` payload or a bare array
/// of songs.
#[derive(Debug, Clone)]
pub struct JsonFileCatalogSource {
    path: PathBuf,
}

impl JsonFileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CatalogSource for JsonFileCatalogSource {
    async fn fetch_catalog(&self) -> AppResult<Catalog> {
        let raw = tokio::fs::read_to_string(&self.path).await?;

        let document: CatalogDocument = serde_json::from_str(&raw).map_err(|e| {
            AppError::ExternalApi(format!(
                "Invalid catalog file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let catalog = Catalog::from(document);

        tracing::info!(
            path = %self.path.display(),
            chords = catalog.chords.len(),
            songs = catalog.songs.len(),
            source = "file",
            "Catalog loaded"
        );

        Ok(catalog)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_song_list_file() {
        let file = write_catalog(
            r#"[
                { "id": "1", "title": "Four Chord Journey", "chords": ["C", "G", "Am", "F"], "difficulty": 1 },
                { "id": "2", "title": "Sunrise Groove", "chords": ["G", "C", "D"] }
            ]"#,
        );

        let source = JsonFileCatalogSource::new(file.path());
        let catalog = source.fetch_catalog().await.unwrap();

        assert_eq!(catalog.songs.len(), 2);
        assert_eq!(catalog.songs[0].title, "Four Chord Journey");
        assert_eq!(catalog.chords.len(), 5);
    }

    #[tokio::test]
    async fn test_song_list_genre_comes_from_tags() {
        let file = write_catalog(
            r#"[
                { "id": "1", "title": "Four Chord Journey", "chords": ["C", "G", "Am", "F"], "tags": ["pop", "beginner"], "source": "curated" },
                { "id": "2", "title": "Night Drive", "chords": ["Em", "C"], "tags": ["decade:1980", "genre:rock"] },
                { "id": "3", "title": "Untagged", "chords": ["G"] },
                { "id": "4", "title": "Explicit", "chords": ["D"], "genre": "folk", "tags": ["pop"] }
            ]"#,
        );

        let catalog = JsonFileCatalogSource::new(file.path())
            .fetch_catalog()
            .await
            .unwrap();
        let genres: Vec<Option<&str>> = catalog.songs.iter().map(|s| s.genre.as_deref()).collect();
        assert_eq!(genres, vec![Some("pop"), Some("rock"), None, Some("folk")]);

        let filter = crate::services::GenreFilter::from_genres(["Rock"]).unwrap();
        assert!(filter.matches(&catalog.songs[1]));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = JsonFileCatalogSource::new("/definitely/not/here/catalog.json");
        let err = source.fetch_catalog().await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_malformed_file_is_rejected() {
        let file = write_catalog("{ not json");

        let source = JsonFileCatalogSource::new(file.path());
        let err = source.fetch_catalog().await.unwrap_err();
        assert!(err.to_string().contains("Invalid catalog file"));
    }
}
