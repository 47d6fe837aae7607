use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use failure::{Error, format_err};
use serde::Serialize;
use sha2::{Digest, Sha256};

fn temporary_path(path: &Path) -> Result<PathBuf, Error> {
    let mut name = path.file_name()
        .ok_or_else(|| format_err!("Not a file path: {}", path.display()))?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

/// Replace the contents of `path` so readers never observe a partial file.
///
/// The bytes are written to a sibling `.tmp` file, synced and then renamed over `path`.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temporary = temporary_path(path)?;
    {
        let mut file = File::create(&temporary)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temporary, path)?;
    Ok(())
}

pub fn write_json_atomically<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Error> {
    let mut bytes = ::serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomically(path, &bytes)
}

#[inline]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
