use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

pub const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Error)]
pub enum ObjectDirError {
    #[error("{path:?} cannot hold objects: {reason}")]
    Root { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A directory standing in for a bucket: one file per object key plus a
/// `<key>.meta.json` sidecar.
///
/// Both files of an object are staged completely before either replaces the committed
/// pair. A failure while staging leaves the previous pair untouched.
#[derive(Debug, Clone)]
pub struct ObjectDir {
    root: PathBuf,
}

impl ObjectDir {
    /// Creates `root` if needed and checks that objects can be staged in it.
    pub fn open(root: PathBuf) -> Result<Self, ObjectDirError> {
        let fail = |reason: String| ObjectDirError::Root {
            path: root.clone(),
            reason,
        };
        match fs::metadata(&root) {
            Ok(meta) if !meta.is_dir() => return Err(fail("not a directory".into())),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&root).map_err(|e| fail(e.to_string()))?;
            }
            Err(err) => return Err(fail(err.to_string())),
        }
        NamedTempFile::new_in(&root).map_err(|e| fail(format!("not writable: {e}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn sidecar_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{SIDECAR_SUFFIX}"))
    }

    /// Replaces the object at `key` and its sidecar; last writer wins.
    ///
    /// The sidecar is swapped in first so a committed object never carries metadata
    /// from an older write.
    pub fn commit(&self, key: &str, body: &[u8], sidecar: &[u8]) -> Result<PathBuf, ObjectDirError> {
        let staged_body = self.stage(body)?;
        let staged_sidecar = self.stage(sidecar)?;

        staged_sidecar
            .persist(self.sidecar_path(key))
            .map_err(|e| ObjectDirError::Io(e.error))?;
        let target = self.object_path(key);
        staged_body
            .persist(&target)
            .map_err(|e| ObjectDirError::Io(e.error))?;
        Ok(target)
    }

    fn stage(&self, content: &[u8]) -> Result<NamedTempFile, ObjectDirError> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        Ok(tmp)
    }
}
