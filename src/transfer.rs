use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::TransferError;

const HASH_CHUNK_SIZE: usize = 4096;

/// The directory a node serves files from.
///
/// Requested names are always taken relative to it. Names that would climb out of it
/// (absolute paths, `..`) are refused rather than resolved.
#[derive(Debug, Clone)]
pub struct SharedDir {
    root: PathBuf,
}

impl SharedDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, filename: &str) -> Result<PathBuf, TransferError> {
        let relative = Path::new(filename);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(TransferError::OutsideSharedDir(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }

    /// Read a shared file into memory in one go. There is no size cap.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, TransferError> {
        let path = self.resolve(filename)?;
        if !path.is_file() {
            return Err(TransferError::NotFound(path));
        }
        match std::fs::read(&path) {
            Ok(contents) => {
                debug!("read {} bytes from {}", contents.len(), path.display());
                Ok(contents)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TransferError::NotFound(path)),
            Err(source) => Err(TransferError::Io { path, source }),
        }
    }
}

/// Read until the other side closes, then write everything that arrived to `path`.
///
/// Nothing marks the end of a transfer except the close, so an empty result is written as an
/// empty file. Returns the number of bytes written.
pub fn receive_to_file(mut reader: impl Read, path: &Path) -> io::Result<u64> {
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents)?;
    std::fs::write(path, &contents)?;
    Ok(contents.len() as u64)
}

/// Lowercase hex MD5 of a file's contents, read in small chunks.
///
/// Meant for checking a transfer by hand. Transfers themselves never compute it.
pub fn file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut chunk = [0; HASH_CHUNK_SIZE];
    loop {
        let bytes_read = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(bytes_read) => bytes_read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&chunk[..bytes_read]);
    }
    Ok(hex::encode(context.compute().0))
}
