//! Gzip packaging of a finished script.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

use crate::error::Result;

/// Compress `path` into `<path>.gz` and remove the original.
///
/// Returns the path of the compressed file.
pub fn gzip_file(path: &Path) -> Result<PathBuf> {
    let mut target = path.as_os_str().to_owned();
    target.push(".gz");
    let target = PathBuf::from(target);

    let mut reader = BufReader::new(File::open(path)?);
    let mut encoder = GzEncoder::new(
        BufWriter::new(File::create(&target)?),
        Compression::default(),
    );
    let copied = io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    fs::remove_file(path)?;

    info!("Compressed {} bytes into {}", copied, target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop_2024-01-01_00-00-00.sql");
        fs::write(&path, "SELECT 1;\n".repeat(100)).unwrap();

        let gz = gzip_file(&path).unwrap();
        assert_eq!(gz, dir.path().join("shop_2024-01-01_00-00-00.sql.gz"));
        assert!(!path.exists());

        let mut text = String::new();
        GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "SELECT 1;\n".repeat(100));
    }

    #[test]
    fn test_missing_file_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = gzip_file(&dir.path().join("nope.sql")).unwrap_err();
        assert!(matches!(err, crate::BackupError::Output(_)));
    }
}
