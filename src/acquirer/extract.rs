//! Archive extraction: locate the JSON payload member and hand back a file
//! the streamer can read lazily without ever buffering the whole archive.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// A temporary extracted file. The archive member is copied out once (zip
/// entries can't outlive the archive handle that produced them); the
/// streamer then reads this file incrementally. Deleted on drop, per §4.2
/// ("the acquirer deletes the extracted temporary file when the stream is
/// closed, but never deletes the archive").
pub struct ExtractedFile {
    path: PathBuf,
}

impl ExtractedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

impl Drop for ExtractedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Open `archive_path`, find the first member whose name ends in `.json` or
/// `.jsonl`, and extract it next to the archive.
pub fn extract_first_json_member(archive_path: &Path) -> Result<ExtractedFile> {
    let file = File::open(archive_path)
        .map_err(|e| CoreError::FileCorruption(format!("cannot open archive: {e}")))?;
    let mut archive = zip::ZipArchive::new(file)?;

    let member_index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .ok()
                .map(|entry| {
                    let name = entry.name().to_ascii_lowercase();
                    name.ends_with(".json") || name.ends_with(".jsonl")
                })
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            CoreError::FileMissing("archive has no .json or .jsonl member".to_string())
        })?;

    let mut entry = archive.by_index(member_index)?;

    let extracted_path = archive_path.with_extension("extracted.json");
    let mut out = File::create(&extracted_path)
        .map_err(|e| CoreError::Unknown(format!("failed to create extracted file: {e}")))?;
    io::copy(&mut entry, &mut out)
        .map_err(|e| CoreError::FileCorruption(format!("archive member is truncated/corrupt: {e}")))?;

    Ok(ExtractedFile {
        path: extracted_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip_with_member(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let zip_path = dir.join("archive.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap();
        zip_path
    }

    #[test]
    fn extracts_first_matching_member() {
        let dir = tempdir();
        let zip_path = write_zip_with_member(dir.path(), "records.json", b"{\"records\":[]}");
        let extracted = extract_first_json_member(&zip_path).unwrap();
        let contents = std::fs::read_to_string(extracted.path()).unwrap();
        assert_eq!(contents, "{\"records\":[]}");
    }

    #[test]
    fn missing_member_is_file_missing() {
        let dir = tempdir();
        let zip_path = write_zip_with_member(dir.path(), "readme.txt", b"hello");
        let err = extract_first_json_member(&zip_path).unwrap_err();
        assert!(matches!(err, CoreError::FileMissing(_)));
    }

    #[test]
    fn extracted_file_is_deleted_on_drop() {
        let dir = tempdir();
        let zip_path = write_zip_with_member(dir.path(), "records.json", b"{}");
        let path = {
            let extracted = extract_first_json_member(&zip_path).unwrap();
            extracted.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    // Minimal self-contained temp dir helper (avoids pulling in `tempfile`
    // as a dependency just for three tests).
    struct TempDir(PathBuf);
    impl TempDir {
        fn path(&self) -> &Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
    fn tempdir() -> TempDir {
        let dir = std::env::temp_dir().join(format!("lei-sync-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        TempDir(dir)
    }
}
