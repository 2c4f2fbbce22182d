use std::path::PathBuf;
use std::sync::Arc;

use derivative::Derivative;
use fardel_common::Loader;
use fardel_fs::{FileSystem, OsFileSystem};
use fardel_resolver::AmdConfig;
use rustc_hash::{FxHashMap, FxHashSet};

pub type WarningHandler = Arc<dyn Fn(crate::BuildError) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct InputItem {
  pub name: Option<String>,
  pub import: String,
}

impl InputItem {
  pub fn from_import(import: impl Into<String>) -> Self {
    Self {
      name: None,
      import: import.into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
  #[default]
  Browser,
  Node,
  Neutral,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct InputOptions {
  pub input: Vec<InputItem>,
  pub cwd: PathBuf,
  pub treeshake: bool,
  pub platform: Platform,
  #[derivative(Debug = "ignore")]
  pub fs: Arc<dyn FileSystem>,
  /// Specifiers forced external, on top of unresolvable bare imports.
  pub external: FxHashSet<String>,
  /// `--define:k=v` replacement sources, parsed once per build.
  pub define: FxHashMap<String, String>,
  /// `--pure:<name>` callees treated as side-effect free.
  pub pure_functions: FxHashSet<String>,
  /// `--loader:<ext>=<kind>` overrides.
  pub loaders: FxHashMap<String, Loader>,
  /// Extra modules bundled ahead of the entries whose exports bind
  /// otherwise-unbound identifiers.
  pub inject: Vec<String>,
  pub resolve_extensions: Option<Vec<String>>,
  pub main_fields: Option<Vec<String>>,
  pub tsconfig: Option<PathBuf>,
  pub amd_config: Option<AmdConfig>,
  /// Diagnostics collected past this bound are dropped with a trailing
  /// "N more errors" note.
  pub error_limit: usize,
  #[derivative(Debug = "ignore")]
  pub on_warn: WarningHandler,
}

impl Default for InputOptions {
  fn default() -> Self {
    Self {
      input: Default::default(),
      cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
      treeshake: true,
      platform: Platform::default(),
      fs: Arc::new(OsFileSystem::default()),
      external: Default::default(),
      define: Default::default(),
      pure_functions: Default::default(),
      loaders: Default::default(),
      inject: Default::default(),
      resolve_extensions: None,
      main_fields: None,
      tsconfig: None,
      amd_config: None,
      error_limit: 10,
      on_warn: Arc::new(|err| {
        eprintln!("{err}");
      }),
    }
  }
}
