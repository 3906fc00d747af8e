use image::DynamicImage;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::db::{DbPool, NewPhoto, Photo};
use crate::storage::Storage;
use crate::upload::naming;
use crate::upload::renditions::{self, Rendition};
use crate::upload::{StagedFile, UploadResult};

/// What the probe and decode steps learned about the staged original.
struct Source {
    dimensions: Option<(u32, u32)>,
    image: Arc<DynamicImage>,
}

/// Where the two renditions landed and how big they are on disk.
#[derive(Debug, Clone)]
struct WrittenRenditions {
    large_file: String,
    thumb_file: String,
    large_path: PathBuf,
    thumb_path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
struct RenditionSizes {
    large_bytes: u64,
    thumb_bytes: u64,
}

/// Turns a staged original into two renditions and one stored [`Photo`].
///
/// Steps run in order: probe + decode, both renditions (concurrently), detached
/// removal of the original, size accounting, persistence. The record is only
/// written once both renditions are on disk; any earlier failure leaves no record.
pub async fn ingest(
    pool: &DbPool,
    storage: &Storage,
    title: String,
    description: String,
    staged: StagedFile,
) -> UploadResult<Photo> {
    let stamp = naming::timestamp_millis();
    debug!(
        "Ingesting {:?} ({}) as stamp {}",
        staged.original_name, staged.content_type, stamp
    );

    let source = match load_source(&staged.path).await {
        Ok(source) => source,
        Err(e) => {
            staged.discard().await;
            return Err(e);
        }
    };

    let written = match write_renditions(storage, stamp, source.image).await {
        Ok(written) => written,
        Err(e) => {
            staged.discard().await;
            return Err(e);
        }
    };

    spawn_original_cleanup(staged.path.clone());

    let sizes = match measure(&written).await {
        Ok(sizes) => sizes,
        Err(e) => {
            remove_renditions(&written).await;
            return Err(e);
        }
    };

    let new_photo = NewPhoto {
        title,
        description,
        original_name: staged.original_name,
        original_file: staged.stored_name,
        thumb_file: written.thumb_file.clone(),
        large_file: written.large_file.clone(),
        width: source.dimensions.map(|(w, _)| i64::from(w)),
        height: source.dimensions.map(|(_, h)| i64::from(h)),
        original_bytes: Some(staged.size as i64),
        thumb_bytes: Some(sizes.thumb_bytes as i64),
        large_bytes: Some(sizes.large_bytes as i64),
    };

    match Photo::create(pool, new_photo).await {
        Ok(photo) => Ok(photo),
        Err(e) => {
            remove_renditions(&written).await;
            Err(e.into())
        }
    }
}

/// Reads the staged file, probes its header dimensions and decodes it upright.
///
/// An unreadable header only leaves the dimensions unset; an undecodable body fails.
async fn load_source(path: &Path) -> UploadResult<Source> {
    let bytes = fs::read(path).await?;

    let (dimensions, image) = tokio::task::spawn_blocking(move || {
        let dimensions = renditions::probe_dimensions(&bytes);
        renditions::decode_oriented(&bytes).map(|image| (dimensions, image))
    })
    .await??;

    debug!(
        "Decoded {:?}: header {:?}, oriented {}x{}",
        path,
        dimensions,
        image.width(),
        image.height()
    );

    Ok(Source {
        dimensions,
        image: Arc::new(image),
    })
}

async fn write_renditions(
    storage: &Storage,
    stamp: i64,
    image: Arc<DynamicImage>,
) -> UploadResult<WrittenRenditions> {
    let large_file = Rendition::Large.filename(stamp);
    let thumb_file = Rendition::Thumb.filename(stamp);
    let written = WrittenRenditions {
        large_path: storage.path(Rendition::Large.area(), &large_file),
        thumb_path: storage.path(Rendition::Thumb.area(), &thumb_file),
        large_file,
        thumb_file,
    };

    let result = tokio::try_join!(
        write_rendition(Rendition::Large, image.clone(), &written.large_path),
        write_rendition(Rendition::Thumb, image, &written.thumb_path),
    );

    if let Err(e) = result {
        remove_renditions(&written).await;
        return Err(e);
    }

    Ok(written)
}

async fn write_rendition(
    rendition: Rendition,
    image: Arc<DynamicImage>,
    path: &Path,
) -> UploadResult<()> {
    let encoded = tokio::task::spawn_blocking(move || rendition.render(&image)).await??;
    fs::write(path, &encoded).await?;
    debug!("Wrote {} rendition to {:?}", rendition.as_str(), path);
    Ok(())
}

/// Deletes the staged original in the background; the outcome is only logged.
fn spawn_original_cleanup(path: PathBuf) {
    tokio::spawn(async move {
        match fs::remove_file(&path).await {
            Ok(()) => debug!("Deleted original {:?}", path),
            Err(e) => warn!("Could not delete original file {:?}: {}", path, e),
        }
    });
}

async fn measure(written: &WrittenRenditions) -> UploadResult<RenditionSizes> {
    let (large, thumb) = tokio::try_join!(
        fs::metadata(&written.large_path),
        fs::metadata(&written.thumb_path),
    )?;

    Ok(RenditionSizes {
        large_bytes: large.len(),
        thumb_bytes: thumb.len(),
    })
}

async fn remove_renditions(written: &WrittenRenditions) {
    for path in [&written.large_path, &written.thumb_path] {
        if let Err(e) = fs::remove_file(path).await {
            debug!("Rendition {:?} not removed: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_in_memory_pool;
    use crate::storage::StorageArea;
    use crate::upload::UploadError;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup() -> (DbPool, Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("uploads"));
        storage.prepare().await.unwrap();
        let pool = create_in_memory_pool().await.unwrap();
        (pool, storage, temp_dir)
    }

    async fn stage(storage: &Storage, name: &str, bytes: &[u8]) -> StagedFile {
        let stored_name = naming::original_filename(naming::timestamp_millis(), name);
        let path = storage.path(StorageArea::Originals, &stored_name);
        fs::write(&path, bytes).await.unwrap();
        StagedFile {
            original_name: name.to_string(),
            stored_name,
            path,
            content_type: "image/jpeg".to_string(),
            size: bytes.len() as u64,
        }
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        buffer.into_inner()
    }

    async fn wait_for_removal(path: &Path) {
        for _ in 0..50 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{:?} was not removed", path);
    }

    #[tokio::test]
    async fn test_ingest_sunset_scenario() {
        let (pool, storage, _temp_dir) = setup().await;
        let bytes = jpeg(2000, 1000);
        let staged = stage(&storage, "Sunset.JPG", &bytes).await;
        let staged_path = staged.path.clone();

        let photo = ingest(&pool, &storage, "Sunset".into(), "".into(), staged)
            .await
            .unwrap();

        assert_eq!(photo.title, "Sunset");
        assert_eq!(photo.original_name, "Sunset.JPG");
        assert!(photo.original_file.ends_with("-sunset.jpg"));
        assert_eq!((photo.width, photo.height), (Some(2000), Some(1000)));
        assert_eq!(photo.original_bytes, Some(bytes.len() as i64));

        let large_path = storage.path(StorageArea::Large, &photo.large_file);
        let thumb_path = storage.path(StorageArea::Thumbs, &photo.thumb_file);
        assert_eq!(
            photo.large_bytes,
            Some(std::fs::metadata(&large_path).unwrap().len() as i64)
        );
        assert_eq!(
            photo.thumb_bytes,
            Some(std::fs::metadata(&thumb_path).unwrap().len() as i64)
        );

        let large = image::open(&large_path).unwrap();
        assert_eq!((large.width(), large.height()), (1200, 600));
        let thumb = image::open(&thumb_path).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (260, 260));

        // Derived names share one stamp
        let large_stamp = photo.large_file.trim_end_matches("-large.jpg");
        let thumb_stamp = photo.thumb_file.trim_end_matches("-thumb.jpg");
        assert_eq!(large_stamp, thumb_stamp);

        wait_for_removal(&staged_path).await;
    }

    #[tokio::test]
    async fn test_ingest_undecodable_upload_creates_nothing() {
        let (pool, storage, _temp_dir) = setup().await;
        let staged = stage(&storage, "broken.jpg", b"not really a jpeg").await;
        let staged_path = staged.path.clone();

        let result = ingest(&pool, &storage, "".into(), "".into(), staged).await;

        assert!(matches!(result, Err(UploadError::Image(_))));
        assert!(Photo::list_all(&pool).await.unwrap().is_empty());
        assert!(!staged_path.exists());
        assert_eq!(
            std::fs::read_dir(storage.area_dir(StorageArea::Large))
                .unwrap()
                .count(),
            0
        );
        assert_eq!(
            std::fs::read_dir(storage.area_dir(StorageArea::Thumbs))
                .unwrap()
                .count(),
            0
        );
    }

    #[tokio::test]
    async fn test_ingest_small_image_is_not_upscaled() {
        let (pool, storage, _temp_dir) = setup().await;
        let staged = stage(&storage, "tiny.jpg", &jpeg(120, 80)).await;

        let photo = ingest(&pool, &storage, "".into(), "".into(), staged)
            .await
            .unwrap();

        let large = image::open(storage.path(StorageArea::Large, &photo.large_file)).unwrap();
        assert_eq!((large.width(), large.height()), (120, 80));
        let thumb = image::open(storage.path(StorageArea::Thumbs, &photo.thumb_file)).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (260, 260));
    }
}
