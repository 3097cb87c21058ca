//! On-disk permission gate for key material

use std::io;
use std::path::Path;

/// Whether `path` is a regular file that only its owner can access.
///
/// On non-Unix platforms there is no mode to inspect and any regular file
/// passes.
pub fn is_private(path: &Path) -> io::Result<bool> {
    let meta = std::fs::metadata(path)?;
    if !meta.is_file() {
        return Ok(false);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(meta.permissions().mode() & 0o077 == 0)
    }
    #[cfg(not(unix))]
    {
        Ok(true)
    }
}

/// Write `data` to `path` with the given Unix mode, replacing any previous
/// file through a rename so readers never observe a partial write.
pub fn write_with_mode(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    use std::io::Write;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts.open(&tmp)?;
    // mode() is masked by umask and ignored for existing files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)
}
