use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use fardel_core::{
  Asset, BuildResult, Bundler, InputItem, InputOptions, ModuleFormat, OutputOptions,
};
use fardel_fs::MemoryFileSystem;
use rustc_hash::FxHashSet;

use crate::test_config::TestConfig;

/// Builds a fixture entirely in memory and hands back the assets.
pub struct Tester {
  pub config: TestConfig,
  pub warnings: Arc<Mutex<Vec<fardel_core::BuildError>>>,
  fs: Arc<MemoryFileSystem>,
}

impl Tester {
  pub fn new(config: TestConfig, files: &[(&str, &str)]) -> Self {
    let fs = Arc::new(MemoryFileSystem::from_files(
      files.iter().map(|(path, content)| (path.to_string(), content.to_string())),
    ));
    Self {
      config,
      warnings: Default::default(),
      fs,
    }
  }

  pub fn from_files(entries: &[&str], files: &[(&str, &str)]) -> Self {
    let config = TestConfig {
      input: crate::test_config::InputConfig {
        entries: entries.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
      },
      ..Default::default()
    };
    Self::new(config, files)
  }

  pub fn input_options(&self) -> InputOptions {
    let warning_collector = self.warnings.clone();
    InputOptions {
      input: self
        .config
        .input
        .entries
        .iter()
        .map(|import| InputItem {
          name: None,
          import: import.clone(),
        })
        .collect(),
      cwd: PathBuf::from("/"),
      treeshake: self.config.input.treeshake,
      fs: self.fs.clone(),
      external: self
        .config
        .input
        .external
        .iter()
        .cloned()
        .collect::<FxHashSet<_>>(),
      inject: self.config.input.inject.clone(),
      on_warn: Arc::new(move |err| {
        warning_collector.lock().unwrap().push(err);
      }),
      ..Default::default()
    }
  }

  pub fn output_options(&self) -> OutputOptions {
    OutputOptions {
      format: ModuleFormat::from_str(&self.config.output.format).expect("valid format"),
      splitting: self.config.output.splitting,
      global_name: self.config.output.global_name.clone(),
      ..Default::default()
    }
  }

  pub async fn bundle(&self) -> BuildResult<Vec<Asset>> {
    let mut bundler = Bundler::new(self.input_options());
    bundler.generate(self.output_options()).await
  }

  /// Concatenate all text assets, banner-separated, for shape assertions.
  pub fn assets_to_string(assets: &[Asset]) -> String {
    let mut sorted: Vec<&Asset> = assets.iter().collect();
    sorted.sort_by_key(|a| &a.filename);
    sorted
      .iter()
      .flat_map(|asset| {
        [
          format!("---------- {} ----------", asset.filename),
          asset.content_as_str().trim().to_string(),
        ]
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}
