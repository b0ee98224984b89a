use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StorageError;

pub const DEFAULT_STORAGE_DIR: &str = "images";
pub const DEFAULT_PREFIX: &str = "stability";
pub const METADATA_SUFFIX: &str = "_metadata";

const WRITE_PROBE: &str = ".write_test";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub file_size: u64,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageStats {
    pub storage_path: PathBuf,
    pub total_files: u64,
    pub image_files: u64,
    pub metadata_files: u64,
    pub total_size_bytes: u64,
}

impl StorageStats {
    pub fn total_size_mb(&self) -> f64 {
        let mb = self.total_size_bytes as f64 / 1024.0 / 1024.0;
        (mb * 100.0).round() / 100.0
    }
}

/// Owns the on-disk layout: `{root}/{prefix}_{YYYYMMDD_HHMMSS}_{seed}.{ext}`
/// next to `{root}/{stem}_metadata.json`.
#[derive(Debug, Clone)]
pub struct StorageManager {
    configured_root: Option<PathBuf>,
}

impl StorageManager {
    pub fn new(configured_root: Option<PathBuf>) -> Self {
        Self { configured_root }
    }

    /// Creates the root if needed and proves it is writable with a throwaway
    /// probe file. Safe to call repeatedly.
    pub fn resolve_root(&self) -> Result<PathBuf, StorageError> {
        let root = match &self.configured_root {
            Some(path) => absolute(&expand_home(path))?,
            None => env::current_dir()
                .map_err(|source| StorageError::Unavailable {
                    path: PathBuf::from(DEFAULT_STORAGE_DIR),
                    source,
                })?
                .join(DEFAULT_STORAGE_DIR),
        };

        fs::create_dir_all(&root).map_err(|source| StorageError::Unavailable {
            path: root.clone(),
            source,
        })?;

        let probe = root.join(WRITE_PROBE);
        let probed = fs::File::create(&probe).and_then(|file| {
            drop(file);
            fs::remove_file(&probe)
        });
        if let Err(source) = probed {
            return Err(if source.kind() == ErrorKind::PermissionDenied {
                StorageError::NotWritable { path: root, source }
            } else {
                StorageError::Unavailable { path: root, source }
            });
        }

        Ok(root)
    }

    pub fn persist(
        &self,
        image: &[u8],
        metadata: Map<String, Value>,
    ) -> Result<StoredArtifact, StorageError> {
        self.persist_named(image, metadata, None)
    }

    /// Writes the image, then its metadata sidecar. If the sidecar cannot be
    /// written the image is removed again so no unpaired file is left behind.
    pub fn persist_named(
        &self,
        image: &[u8],
        metadata: Map<String, Value>,
        filename: Option<&str>,
    ) -> Result<StoredArtifact, StorageError> {
        let root = self.resolve_root()?;
        let filename = match filename {
            Some(name) => name.to_string(),
            None => {
                let seed = metadata.get("seed").and_then(Value::as_u64).unwrap_or(0);
                let ext = metadata
                    .get("output_format")
                    .and_then(Value::as_str)
                    .unwrap_or("png");
                artifact_filename(DEFAULT_PREFIX, &Local::now(), seed, ext)
            }
        };

        let image_path = root.join(&filename);
        fs::write(&image_path, image).map_err(|err| {
            StorageError::Save(format!("failed to write {}: {err}", image_path.display()))
        })?;

        let metadata_path = metadata_path_for(&image_path);
        let generated_at = Local::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        let mut record = metadata;
        record.insert(
            "file_path".to_string(),
            Value::String(image_path.to_string_lossy().to_string()),
        );
        record.insert(
            "file_size".to_string(),
            Value::Number((image.len() as u64).into()),
        );
        record.insert(
            "generated_at".to_string(),
            Value::String(generated_at.clone()),
        );
        record.insert(
            "storage_directory".to_string(),
            Value::String(root.to_string_lossy().to_string()),
        );

        if let Err(err) = write_json_object(&metadata_path, &record) {
            if let Err(cleanup) = fs::remove_file(&image_path) {
                tracing::error!(
                    path = %image_path.display(),
                    error = %cleanup,
                    "failed to remove image after metadata write failure"
                );
            }
            return Err(StorageError::Save(format!(
                "failed to write {}: {err}",
                metadata_path.display()
            )));
        }

        tracing::info!(path = %image_path.display(), "Saved image");
        tracing::info!(path = %metadata_path.display(), "Saved metadata");

        Ok(StoredArtifact {
            image_path,
            metadata_path,
            file_size: image.len() as u64,
            generated_at,
        })
    }

    /// Deletes the oldest images (by modification time) beyond `max_files`,
    /// together with their sidecars. Per-file failures are logged and skipped.
    pub fn prune_oldest(&self, max_files: usize) -> Result<usize, StorageError> {
        let root = self.resolve_root()?;
        let mut images = list_files(&root)?
            .into_iter()
            .filter(|path| is_image_file(path))
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect::<Vec<_>>();
        if images.len() <= max_files {
            return Ok(0);
        }
        images.sort_by(|left, right| left.0.cmp(&right.0));

        let surplus = images.len() - max_files;
        let mut removed = 0;
        for (_, path) in images.into_iter().take(surplus) {
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %err, "Failed to remove file");
                continue;
            }
            let metadata_path = metadata_path_for(&path);
            if metadata_path.exists() {
                if let Err(err) = fs::remove_file(&metadata_path) {
                    tracing::warn!(
                        path = %metadata_path.display(),
                        error = %err,
                        "Failed to remove metadata file"
                    );
                }
            }
            removed += 1;
            tracing::info!(path = %path.display(), "Removed old file");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let root = self.resolve_root()?;
        let mut stats = StorageStats {
            storage_path: root.clone(),
            total_files: 0,
            image_files: 0,
            metadata_files: 0,
            total_size_bytes: 0,
        };
        for path in list_files(&root)? {
            stats.total_files += 1;
            stats.total_size_bytes += fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
            if is_image_file(&path) {
                stats.image_files += 1;
            } else if extension_lower(&path).as_deref() == Some("json") {
                stats.metadata_files += 1;
            }
        }
        Ok(stats)
    }
}

pub fn artifact_filename(prefix: &str, at: &DateTime<Local>, seed: u64, ext: &str) -> String {
    format!("{prefix}_{}_{seed}.{ext}", at.format("%Y%m%d_%H%M%S"))
}

pub fn metadata_path_for(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_default();
    image_path.with_file_name(format!("{stem}{METADATA_SUFFIX}.json"))
}

fn list_files(root: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let scan_error = |source| StorageError::Scan {
        path: root.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(scan_error)? {
        let path = entry.map_err(scan_error)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    extension_lower(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")) {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, StorageError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| StorageError::Unavailable {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use chrono::{Local, TimeZone};
    use filetime::{set_file_mtime, FileTime};
    use serde_json::{json, Map, Value};

    use super::{artifact_filename, metadata_path_for, StorageManager};

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn write_pair(root: &Path, stem: &str, mtime: i64) -> anyhow::Result<()> {
        let image = root.join(format!("{stem}.png"));
        fs::write(&image, b"png-bytes")?;
        fs::write(metadata_path_for(&image), b"{}")?;
        set_file_mtime(&image, FileTime::from_unix_time(mtime, 0))?;
        Ok(())
    }

    #[test]
    fn artifact_filename_layout() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            artifact_filename("stability", &at, 1234, "png"),
            "stability_20260309_140507_1234.png"
        );
    }

    #[test]
    fn metadata_path_shares_the_stem() {
        assert_eq!(
            metadata_path_for(Path::new("/tmp/images/stability_20260309_140507_9.jpeg")),
            Path::new("/tmp/images/stability_20260309_140507_9_metadata.json")
        );
    }

    #[test]
    fn resolve_root_creates_directory_and_is_idempotent() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let configured = temp.path().join("nested").join("images");
        let storage = StorageManager::new(Some(configured.clone()));

        let first = storage.resolve_root()?;
        fs::write(first.join("keep.png"), b"x")?;
        let second = storage.resolve_root()?;

        assert_eq!(first, configured);
        assert_eq!(first, second);
        assert!(first.join("keep.png").exists());
        assert!(!first.join(".write_test").exists());
        Ok(())
    }

    #[test]
    fn resolve_root_fails_when_path_is_a_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"not a dir")?;
        let err = StorageManager::new(Some(blocker)).resolve_root().unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert!(err.to_string().contains("Cannot create or access storage directory"));
        Ok(())
    }

    #[test]
    fn persist_writes_image_and_metadata() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = StorageManager::new(Some(temp.path().to_path_buf()));
        let bytes = vec![137u8, 80, 78, 71, 0, 1, 2, 3];
        let metadata = obj(json!({
            "prompt": "ein Fuchs im Schnee ❄",
            "model": "stable-image-core",
            "seed": 42,
            "output_format": "jpeg",
        }));

        let artifact = storage.persist(&bytes, metadata.clone())?;
        assert_eq!(fs::read(&artifact.image_path)?, bytes);
        let name = artifact
            .image_path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        assert!(name.starts_with("stability_"));
        assert!(name.ends_with("_42.jpeg"));
        assert_eq!(artifact.metadata_path, metadata_path_for(&artifact.image_path));

        let raw = fs::read_to_string(&artifact.metadata_path)?;
        assert!(raw.contains("❄"));
        let record: Value = serde_json::from_str(&raw)?;
        for key in metadata.keys() {
            assert_eq!(record[key], metadata[key], "{key}");
        }
        assert_eq!(
            record["file_path"],
            json!(artifact.image_path.to_string_lossy())
        );
        assert_eq!(record["file_size"], json!(8));
        assert!(record["generated_at"].is_string());
        assert_eq!(record["storage_directory"], json!(temp.path().to_string_lossy()));
        Ok(())
    }

    #[test]
    fn failed_metadata_write_removes_the_image() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        fs::create_dir(temp.path().join("fixed_metadata.json"))?;
        let storage = StorageManager::new(Some(temp.path().to_path_buf()));

        let err = storage
            .persist_named(b"bytes", Map::new(), Some("fixed.png"))
            .unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert!(!temp.path().join("fixed.png").exists());
        Ok(())
    }

    #[test]
    fn prune_removes_oldest_images_with_their_metadata() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        write_pair(root, "newest", 1_700_000_300)?;
        write_pair(root, "oldest", 1_700_000_000)?;
        write_pair(root, "middle", 1_700_000_200)?;
        write_pair(root, "older", 1_700_000_100)?;
        fs::write(root.join("notes.txt"), b"ignored")?;

        let storage = StorageManager::new(Some(root.to_path_buf()));
        assert_eq!(storage.prune_oldest(2)?, 2);

        assert!(!root.join("oldest.png").exists());
        assert!(!root.join("oldest_metadata.json").exists());
        assert!(!root.join("older.png").exists());
        assert!(!root.join("older_metadata.json").exists());
        assert!(root.join("middle.png").exists());
        assert!(root.join("middle_metadata.json").exists());
        assert!(root.join("newest.png").exists());
        assert!(root.join("notes.txt").exists());
        Ok(())
    }

    #[test]
    fn prune_under_cap_is_a_noop() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        write_pair(temp.path(), "only", 1_700_000_000)?;
        let storage = StorageManager::new(Some(temp.path().to_path_buf()));
        assert_eq!(storage.prune_oldest(1)?, 0);
        assert_eq!(storage.prune_oldest(10)?, 0);
        assert!(temp.path().join("only.png").exists());
        Ok(())
    }

    #[test]
    fn stats_counts_by_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::write(root.join("a.png"), vec![0u8; 1024 * 1024])?;
        fs::write(root.join("b.JPG"), vec![0u8; 512 * 1024])?;
        fs::write(root.join("a_metadata.json"), b"{}")?;
        fs::write(root.join("readme.txt"), b"hi")?;
        fs::create_dir(root.join("subdir"))?;

        let stats = StorageManager::new(Some(root.to_path_buf())).stats()?;
        assert_eq!(stats.storage_path, root.to_path_buf());
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.image_files, 2);
        assert_eq!(stats.metadata_files, 1);
        assert_eq!(stats.total_size_bytes, 1024 * 1024 + 512 * 1024 + 2 + 2);
        assert_eq!(stats.total_size_mb(), 1.5);
        Ok(())
    }
}
