use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Stores uploaded photos on the local filesystem under `<root>/<user_id>/`
#[derive(Debug, Clone)]
pub struct ImageStorageService {
    root: PathBuf,
}

impl ImageStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the image and return the path it was stored at
    pub async fn store_image(
        &self,
        user_id: Uuid,
        image_id: Uuid,
        data: &[u8],
        content_type: &str,
    ) -> Result<PathBuf> {
        let dir = self.root.join(user_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let path = dir.join(format!("{}.{}", image_id, Self::extension_for(content_type)));
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write image {}", path.display()))?;

        info!(path = %path.display(), size = data.len(), "Stored uploaded image");
        Ok(path)
    }

    /// Remove a stored image. A file that is already gone is not an error.
    pub async fn delete_image(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!(path = %path.display(), "Deleted image");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Image already removed");
                Ok(())
            }
            Err(err) => Err(err).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn extension_for(content_type: &str) -> &'static str {
        match content_type.parse::<mime::Mime>() {
            Ok(m) if m == mime::IMAGE_PNG => "png",
            Ok(m) if m.subtype().as_str() == "webp" => "webp",
            _ => "jpg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(ImageStorageService::extension_for("image/png"), "png");
        assert_eq!(ImageStorageService::extension_for("image/jpeg"), "jpg");
    }

    #[tokio::test]
    async fn test_store_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ImageStorageService::new(dir.path());
        let user_id = Uuid::new_v4();

        let path = storage
            .store_image(user_id, Uuid::new_v4(), b"fake", "image/png")
            .await
            .unwrap();

        assert!(path.starts_with(dir.path().join(user_id.to_string())));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"fake");

        storage.delete_image(&path).await.unwrap();
        assert!(!path.exists());
        // second delete is a no-op
        storage.delete_image(&path).await.unwrap();
    }
}
