use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A file holding the id of the running process, removed again on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: u32,
}

impl PidFile {
    /// Write the current process id to `path`, replacing what was there.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let pid = std::process::id();
        log::debug!("Writing pid ({pid}) to pidfile ({})", path.display());
        fs::write(&path, pid.to_string())?;
        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Cannot remove pidfile ({}): {e}", self.path.display());
        }
    }
}
