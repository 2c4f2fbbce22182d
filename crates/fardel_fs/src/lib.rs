//! File system boundary. The bundler core never touches `std::fs` directly;
//! everything goes through this trait so builds can run against an in-memory
//! tree in tests.

use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use sugar_path::SugarPathBuf;

pub trait FileSystem: Debug + Send + Sync {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    let bytes = self.read(path)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
  }

  fn is_file(&self, path: &Path) -> bool;

  fn is_dir(&self, path: &Path) -> bool;

  fn cwd(&self) -> PathBuf;
}

#[derive(Debug)]
pub struct OsFileSystem {
  cwd: PathBuf,
}

impl OsFileSystem {
  pub fn new(cwd: PathBuf) -> Self {
    Self { cwd }
  }
}

impl Default for OsFileSystem {
  fn default() -> Self {
    Self {
      cwd: std::env::current_dir().unwrap(),
    }
  }
}

impl FileSystem for OsFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    std::fs::read(path)
  }

  fn is_file(&self, path: &Path) -> bool {
    path.is_file()
  }

  fn is_dir(&self, path: &Path) -> bool {
    path.is_dir()
  }

  fn cwd(&self) -> PathBuf {
    self.cwd.clone()
  }
}

/// In-memory tree used by the integration tests and by stdin-style inputs.
/// Paths are stored normalized, so `/a/./b` and `/a/b` are the same file.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  files: Mutex<FxHashMap<PathBuf, Vec<u8>>>,
  cwd: PathBuf,
}

impl MemoryFileSystem {
  pub fn new(cwd: impl Into<PathBuf>) -> Self {
    Self {
      files: Default::default(),
      cwd: cwd.into(),
    }
  }

  pub fn from_files<I, P, C>(files: I) -> Self
  where
    I: IntoIterator<Item = (P, C)>,
    P: Into<PathBuf>,
    C: Into<Vec<u8>>,
  {
    let fs = Self::new("/");
    for (path, content) in files {
      fs.add_file(path.into(), content.into());
    }
    fs
  }

  pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
    let normalized = normalize(&path.into());
    self.files.lock().unwrap().insert(normalized, content.into());
  }
}

fn normalize(path: &Path) -> PathBuf {
  path.to_path_buf().into_absolutize()
}

impl FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self
      .files
      .lock()
      .unwrap()
      .get(&normalize(path))
      .cloned()
      .ok_or_else(|| {
        io::Error::new(
          io::ErrorKind::NotFound,
          format!("No such file: {}", path.display()),
        )
      })
  }

  fn is_file(&self, path: &Path) -> bool {
    self.files.lock().unwrap().contains_key(&normalize(path))
  }

  fn is_dir(&self, path: &Path) -> bool {
    let prefix = normalize(path);
    self
      .files
      .lock()
      .unwrap()
      .keys()
      .any(|k| k.starts_with(&prefix) && k != &prefix)
  }

  fn cwd(&self) -> PathBuf {
    self.cwd.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_fs_reads_normalized_paths() {
    let fs = MemoryFileSystem::from_files([("/src/./a.js", "let a = 1")]);
    assert!(fs.is_file(Path::new("/src/a.js")));
    assert_eq!(
      fs.read_to_string(Path::new("/src/a.js")).unwrap(),
      "let a = 1"
    );
    assert!(fs.read(Path::new("/src/b.js")).is_err());
  }

  #[test]
  fn memory_fs_knows_directories() {
    let fs = MemoryFileSystem::from_files([("/pkg/index.js", "")]);
    assert!(fs.is_dir(Path::new("/pkg")));
    assert!(!fs.is_dir(Path::new("/pkg/index.js")));
  }
}
