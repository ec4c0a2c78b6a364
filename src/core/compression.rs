/// Chunked gzip streaming for image archives
///
/// Volumes are compressed by `tar` inside the helper container; images come
/// out of `docker save` uncompressed and are gzipped here.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::core::error::{BackupToolError, Result};
use crate::utils::{COPY_CHUNK_SIZE, STAGING_PREFIX};

/// Copy `reader` to `writer` in fixed-size chunks, returning bytes copied
fn copy_chunked<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

fn destination_dir(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Gzip `source` into `destination`. The output is staged in a temporary
/// file next to `destination` and only renamed into place on success.
pub fn gzip_file(source: &Path, destination: &Path) -> Result<u64> {
    let input = File::open(source).map_err(|e| {
        BackupToolError::Compression(format!("cannot open {}: {}", source.display(), e))
    })?;
    let staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(destination_dir(destination))?;

    let mut reader = BufReader::new(input);
    let mut encoder = GzEncoder::new(BufWriter::new(staged.as_file()), Compression::default());
    copy_chunked(&mut reader, &mut encoder)
        .map_err(|e| BackupToolError::Compression(format!("gzip failed: {}", e)))?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(|e| BackupToolError::Compression(format!("gzip failed: {}", e)))?;

    let file = staged
        .persist(destination)
        .map_err(|e| BackupToolError::Compression(format!("cannot write {}: {}", destination.display(), e.error)))?;
    Ok(file.metadata()?.len())
}

/// Gunzip `source` into a fresh temporary file. The file is removed when the
/// returned handle is dropped.
pub fn gunzip_to_temp(source: &Path) -> Result<NamedTempFile> {
    let input = File::open(source).map_err(|e| {
        BackupToolError::Compression(format!("cannot open {}: {}", source.display(), e))
    })?;
    let staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tar")
        .tempfile()?;

    let mut decoder = GzDecoder::new(BufReader::new(input));
    let mut writer = BufWriter::new(staged.as_file());
    copy_chunked(&mut decoder, &mut writer)
        .map_err(|e| BackupToolError::Compression(format!("gunzip of {} failed: {}", source.display(), e)))?;
    writer.flush()?;
    drop(writer);

    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_gzip_then_gunzip() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("image.tar");
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &payload).unwrap();

        let destination = tmp.path().join("image.tar.gz");
        let size = gzip_file(&source, &destination).unwrap();
        assert_eq!(size, fs::metadata(&destination).unwrap().len());
        assert!(size < payload.len() as u64);

        let restored = gunzip_to_temp(&destination).unwrap();
        assert_eq!(fs::read(restored.path()).unwrap(), payload);

        let restored_path = restored.path().to_path_buf();
        drop(restored);
        assert!(!restored_path.exists());
    }

    #[test]
    fn test_gzip_missing_source_leaves_no_output() {
        let tmp = TempDir::new().unwrap();
        let destination = tmp.path().join("out.tar.gz");
        let err = gzip_file(&tmp.path().join("missing.tar"), &destination).unwrap_err();
        assert!(matches!(err, BackupToolError::Compression(_)));
        assert!(!destination.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_gunzip_rejects_non_gzip() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("plain.tar.gz");
        fs::write(&source, b"this is not gzip data").unwrap();
        assert!(matches!(
            gunzip_to_temp(&source),
            Err(BackupToolError::Compression(_))
        ));
    }
}
