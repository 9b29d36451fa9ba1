//! File system placer implementation.

use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use super::config::PlacerConfig;
use super::error::PlacerError;
use super::temp::TempOutput;
use super::types::{BackupRecord, PlacementMethod, Promotion};

/// Prefix of every temp and staging file this crate creates.
const TEMP_PREFIX: &str = "dropconv-";

/// File system based placer implementation.
///
/// Owns the three file-lifecycle steps of a job: moving an existing output
/// aside, allocating the temp output, and promoting the finished temp file
/// to its final path without ever overwriting anything.
#[derive(Debug, Clone)]
pub struct FsPlacer {
    config: PlacerConfig,
}

impl FsPlacer {
    /// Creates a new file system placer with the given configuration.
    pub fn new(config: PlacerConfig) -> Self {
        Self { config }
    }

    /// Creates a placer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default())
    }

    pub fn config(&self) -> &PlacerConfig {
        &self.config
    }

    /// Backup directory that sits next to `output`.
    pub fn backup_dir_for(&self, output: &Path) -> PathBuf {
        output
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.config.backup_dir_name)
    }

    /// Moves an existing `output` into the backup directory.
    ///
    /// Returns `None` when there is nothing to move. The file keeps its base
    /// name; if that is taken the lowest free `.N` suffix (N >= 1) is used.
    pub async fn backup_existing(&self, output: &Path) -> Result<Option<BackupRecord>, PlacerError> {
        match fs::symlink_metadata(output).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PlacerError::Io(e)),
        }

        let file_name = output.file_name().ok_or_else(|| {
            PlacerError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("output path has no file name: {}", output.display()),
            ))
        })?;

        let backup_dir = self.backup_dir_for(output);
        // Shared by concurrent jobs; create_dir_all tolerates an existing dir.
        fs::create_dir_all(&backup_dir)
            .await
            .map_err(|e| PlacerError::DirectoryCreationFailed {
                path: backup_dir.clone(),
                source: e,
            })?;

        let mut suffix = 0u32;
        loop {
            let candidate = backup_candidate(&backup_dir, file_name, suffix);
            match relocate_no_clobber(output, &candidate).await {
                Ok(_) => {
                    tracing::info!(
                        "Backed up {} to {}",
                        output.display(),
                        candidate.display()
                    );
                    return Ok(Some(BackupRecord {
                        original: output.to_path_buf(),
                        backup: candidate,
                    }));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => {
                    return Err(PlacerError::BackupFailed {
                        original: output.to_path_buf(),
                        backup: candidate,
                        source: e,
                    })
                }
            }
        }
    }

    /// Allocates a uniquely named, empty file with the given extension.
    pub async fn allocate_temp(
        &self,
        temp_dir: &Path,
        extension: &str,
    ) -> Result<TempOutput, PlacerError> {
        fs::create_dir_all(temp_dir)
            .await
            .map_err(|e| PlacerError::DirectoryCreationFailed {
                path: temp_dir.to_path_buf(),
                source: e,
            })?;

        let path = create_unique_file(temp_dir, format!(".{}", extension)).await?;
        tracing::debug!("Allocated temp output {}", path.display());
        Ok(TempOutput::new(path))
    }

    /// Moves a finished temp file to `destination`.
    ///
    /// Fails with [`PlacerError::DestinationExists`] rather than overwrite.
    /// When the temp file lives on another filesystem, the bytes are copied
    /// into a staging file next to the destination which is then moved into
    /// place, so a partially copied file never appears at `destination`.
    pub async fn promote(&self, source: &Path, destination: &Path) -> Result<Promotion, PlacerError> {
        if fs::try_exists(destination).await? {
            return Err(PlacerError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }

        if self.config.link_before_copy {
            match relocate_no_clobber(source, destination).await {
                Ok(method) => {
                    let meta = fs::metadata(destination).await?;
                    return Ok(Promotion {
                        destination: destination.to_path_buf(),
                        size_bytes: meta.len(),
                        method,
                        checksum: None,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    return Err(PlacerError::DestinationExists {
                        path: destination.to_path_buf(),
                    })
                }
                Err(e) if is_cross_device(&e) => {
                    tracing::debug!(
                        "{} is on another filesystem, copying instead",
                        source.display()
                    );
                }
                Err(e) => {
                    return Err(PlacerError::move_failed(
                        source.to_path_buf(),
                        destination.to_path_buf(),
                        e,
                    ))
                }
            }
        }

        self.copy_into_place(source, destination).await
    }

    async fn copy_into_place(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<Promotion, PlacerError> {
        let parent = destination.parent().unwrap_or_else(|| Path::new("."));
        let mut staging = TempOutput::new(create_unique_file(parent, ".partial".to_string()).await?);

        let (size_bytes, source_checksum) = self.copy_file(source, staging.path()).await?;

        let checksum = if self.config.verify_checksums {
            let actual = self.calculate_checksum(staging.path()).await?;
            if actual != source_checksum {
                return Err(PlacerError::ChecksumMismatch {
                    path: staging.path().to_path_buf(),
                    expected: source_checksum,
                    actual,
                });
            }
            Some(actual)
        } else {
            None
        };

        relocate_no_clobber(staging.path(), destination)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    PlacerError::DestinationExists {
                        path: destination.to_path_buf(),
                    }
                } else {
                    PlacerError::move_failed(staging.path().to_path_buf(), destination.to_path_buf(), e)
                }
            })?;
        staging.cleanup().await;

        if let Err(e) = fs::remove_file(source).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove {} after copy: {}", source.display(), e);
            }
        }

        Ok(Promotion {
            destination: destination.to_path_buf(),
            size_bytes,
            method: PlacementMethod::Copied,
            checksum,
        })
    }

    /// Copies a file, hashing the bytes read from the source.
    async fn copy_file(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<(u64, String), PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let dest_file = File::create(destination).await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let mut reader = BufReader::with_capacity(self.config.copy_buffer_bytes, source_file);
        let mut writer = BufWriter::with_capacity(self.config.copy_buffer_bytes, dest_file);
        let mut hasher = Sha256::new();

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.config.copy_buffer_bytes];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(&buffer[..bytes_read]);

            writer.write_all(&buffer[..bytes_read]).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
        writer.get_ref().sync_all().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        Ok((total_bytes, format!("{:x}", hasher.finalize())))
    }

    /// Calculates the SHA-256 of a file.
    async fn calculate_checksum(&self, path: &Path) -> Result<String, PlacerError> {
        let file = File::open(path).await?;
        let mut reader = BufReader::with_capacity(self.config.copy_buffer_bytes, file);
        let mut buffer = vec![0u8; self.config.copy_buffer_bytes];
        let mut hasher = Sha256::new();

        loop {
            let bytes_read = reader.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// `<dir>/<name>` for suffix 0, `<dir>/<name>.<suffix>` otherwise.
fn backup_candidate(backup_dir: &Path, file_name: &OsStr, suffix: u32) -> PathBuf {
    if suffix == 0 {
        backup_dir.join(file_name)
    } else {
        let mut name = file_name.to_os_string();
        name.push(format!(".{}", suffix));
        backup_dir.join(name)
    }
}

fn is_cross_device(e: &std::io::Error) -> bool {
    // EXDEV is 18 on Linux and macOS
    e.kind() == ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

/// Moves `source` to `destination`, failing with `AlreadyExists` if taken.
///
/// A hard link claims the destination atomically, so the file is present at
/// one of the two paths at every instant. Filesystems without hard links fall
/// back to an existence check followed by a rename.
async fn relocate_no_clobber(source: &Path, destination: &Path) -> std::io::Result<PlacementMethod> {
    match fs::hard_link(source, destination).await {
        Ok(()) => {
            if let Err(e) = fs::remove_file(source).await {
                let _ = fs::remove_file(destination).await;
                return Err(e);
            }
            Ok(PlacementMethod::Linked)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists || is_cross_device(&e) => Err(e),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
        Err(_) => {
            if fs::try_exists(destination).await? {
                return Err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} already exists", destination.display()),
                ));
            }
            fs::rename(source, destination).await?;
            Ok(PlacementMethod::Renamed)
        }
    }
}

async fn create_unique_file(dir: &Path, suffix: String) -> Result<PathBuf, PlacerError> {
    let dir = dir.to_path_buf();
    let dir_for_task = dir.clone();

    let result = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&dir_for_task)
            .and_then(|file| file.into_temp_path().keep().map_err(|e| e.error))
    })
    .await;

    match result {
        Ok(Ok(path)) => Ok(path),
        Ok(Err(e)) => Err(PlacerError::TempAllocationFailed {
            dir,
            reason: e.to_string(),
        }),
        Err(e) => Err(PlacerError::TempAllocationFailed {
            dir,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_backup_nothing_to_move() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("clip.mp4");

        let placer = FsPlacer::with_defaults();
        let record = placer.backup_existing(&output).await.unwrap();

        assert!(record.is_none());
        assert!(!temp.path().join("backup").exists());
    }

    #[tokio::test]
    async fn test_backup_moves_existing_output() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("clip.mp4");
        fs::write(&output, "old content").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let record = placer.backup_existing(&output).await.unwrap().unwrap();

        assert_eq!(record.backup, temp.path().join("backup").join("clip.mp4"));
        assert!(!output.exists());
        let content = fs::read_to_string(&record.backup).await.unwrap();
        assert_eq!(content, "old content");
    }

    #[tokio::test]
    async fn test_backup_uses_lowest_free_suffix() {
        let temp = TempDir::new().unwrap();
        let backup_dir = temp.path().join("backup");
        fs::create_dir_all(&backup_dir).await.unwrap();
        fs::write(backup_dir.join("clip.mp4"), "first").await.unwrap();
        fs::write(backup_dir.join("clip.mp4.2"), "third").await.unwrap();

        let output = temp.path().join("clip.mp4");
        fs::write(&output, "second").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let record = placer.backup_existing(&output).await.unwrap().unwrap();

        assert_eq!(record.backup, backup_dir.join("clip.mp4.1"));
        assert_eq!(fs::read_to_string(backup_dir.join("clip.mp4")).await.unwrap(), "first");
        assert_eq!(fs::read_to_string(backup_dir.join("clip.mp4.1")).await.unwrap(), "second");
        assert_eq!(fs::read_to_string(backup_dir.join("clip.mp4.2")).await.unwrap(), "third");
    }

    #[tokio::test]
    async fn test_repeated_backups_accumulate() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("clip.mp4");
        let placer = FsPlacer::with_defaults();

        for generation in 0..3 {
            fs::write(&output, format!("gen {}", generation)).await.unwrap();
            placer.backup_existing(&output).await.unwrap();
        }

        let backup_dir = temp.path().join("backup");
        assert_eq!(fs::read_to_string(backup_dir.join("clip.mp4")).await.unwrap(), "gen 0");
        assert_eq!(fs::read_to_string(backup_dir.join("clip.mp4.1")).await.unwrap(), "gen 1");
        assert_eq!(fs::read_to_string(backup_dir.join("clip.mp4.2")).await.unwrap(), "gen 2");
    }

    #[tokio::test]
    async fn test_backup_with_custom_dir_name() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("song.mp3");
        fs::write(&output, "old").await.unwrap();

        let placer = FsPlacer::new(PlacerConfig::default().with_backup_dir_name("previous"));
        let record = placer.backup_existing(&output).await.unwrap().unwrap();

        assert_eq!(record.backup, temp.path().join("previous").join("song.mp3"));
    }

    #[tokio::test]
    async fn test_allocate_temp_is_unique() {
        let temp = TempDir::new().unwrap();
        let placer = FsPlacer::with_defaults();

        let a = placer.allocate_temp(temp.path(), "mp4").await.unwrap();
        let b = placer.allocate_temp(temp.path(), "mp4").await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().exists());
        assert_eq!(a.path().extension().unwrap(), "mp4");
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMP_PREFIX));
    }

    #[tokio::test]
    async fn test_allocate_temp_creates_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        let placer = FsPlacer::with_defaults();

        let out = placer.allocate_temp(&nested, "mp3").await.unwrap();
        assert!(out.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_promote_moves_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dropconv-x.mp4");
        let dest = temp.path().join("clip.mp4");
        fs::write(&source, "encoded").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let promotion = tokio_test::assert_ok!(placer.promote(&source, &dest).await);

        assert_eq!(promotion.destination, dest);
        assert_eq!(promotion.size_bytes, 7);
        assert_ne!(promotion.method, PlacementMethod::Copied);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "encoded");
    }

    #[tokio::test]
    async fn test_promote_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dropconv-x.mp4");
        let dest = temp.path().join("clip.mp4");
        fs::write(&source, "new").await.unwrap();
        fs::write(&dest, "existing").await.unwrap();

        let placer = FsPlacer::with_defaults();
        let result = placer.promote(&source, &dest).await;

        assert!(matches!(result, Err(PlacerError::DestinationExists { .. })));
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "existing");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_promote_by_copy_with_checksum() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("dropconv-x.mp4");
        let dest = temp.path().join("out/clip.mp4");
        fs::create_dir_all(dest.parent().unwrap()).await.unwrap();
        fs::write(&source, "copied bytes").await.unwrap();

        let placer = FsPlacer::new(
            PlacerConfig::default()
                .copy_only()
                .verifying_copies()
                .with_copy_buffer(4),
        );
        let promotion = placer.promote(&source, &dest).await.unwrap();

        assert_eq!(promotion.method, PlacementMethod::Copied);
        assert_eq!(promotion.size_bytes, 12);
        assert!(promotion.checksum.is_some());
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "copied bytes");

        // No staging leftovers next to the destination.
        let mut entries = fs::read_dir(dest.parent().unwrap()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("clip.mp4")]);
    }

    #[test]
    fn test_backup_candidate_names() {
        let dir = Path::new("/videos/backup");
        let name = OsStr::new("clip.mp4");
        assert_eq!(backup_candidate(dir, name, 0), dir.join("clip.mp4"));
        assert_eq!(backup_candidate(dir, name, 3), dir.join("clip.mp4.3"));
    }
}
