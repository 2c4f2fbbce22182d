use std::str::FromStr;

use rustc_hash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ModuleFormat {
  Iife,
  Cjs,
  Umd,
  #[default]
  Esm,
}

impl ModuleFormat {
  pub fn is_esm(self) -> bool {
    self == ModuleFormat::Esm
  }

  pub fn is_cjs(self) -> bool {
    self == ModuleFormat::Cjs
  }

  /// Formats whose externals load through `require`.
  pub fn uses_require(self) -> bool {
    !self.is_esm()
  }
}

impl FromStr for ModuleFormat {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "iife" => Ok(ModuleFormat::Iife),
      "cjs" => Ok(ModuleFormat::Cjs),
      "umd" => Ok(ModuleFormat::Umd),
      "esm" => Ok(ModuleFormat::Esm),
      _ => Err(format!("Invalid module format: {value}")),
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SourceMapMode {
  #[default]
  None,
  Inline,
  External,
  Both,
}

impl SourceMapMode {
  pub fn is_enabled(self) -> bool {
    self != SourceMapMode::None
  }

  pub fn wants_file(self) -> bool {
    matches!(self, SourceMapMode::External | SourceMapMode::Both)
  }

  pub fn wants_inline(self) -> bool {
    matches!(self, SourceMapMode::Inline | SourceMapMode::Both)
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MinifyOptions {
  pub syntax: bool,
  pub whitespace: bool,
  pub identifiers: bool,
}

impl MinifyOptions {
  pub fn all() -> Self {
    Self {
      syntax: true,
      whitespace: true,
      identifiers: true,
    }
  }
}

#[derive(Debug)]
pub struct OutputOptions {
  pub format: ModuleFormat,
  /// ESM-only code splitting: shared modules land in a synthesized chunk.
  pub splitting: bool,
  pub global_name: Option<String>,
  pub entry_file_names: FileNameTemplate,
  pub chunk_file_names: FileNameTemplate,
  pub sourcemap: SourceMapMode,
  pub sources_content: bool,
  pub minify: MinifyOptions,
  pub banner: Option<String>,
  pub footer: Option<String>,
  pub public_path: Option<String>,
  /// `--out-extension:.js=.mjs`
  pub out_extensions: FxHashMap<String, String>,
  pub metafile: bool,
}

impl Default for OutputOptions {
  fn default() -> Self {
    Self {
      format: ModuleFormat::default(),
      splitting: false,
      global_name: None,
      entry_file_names: FileNameTemplate::from("[name].js".to_string()),
      chunk_file_names: FileNameTemplate::from("[name].js".to_string()),
      sourcemap: SourceMapMode::default(),
      sources_content: true,
      minify: MinifyOptions::default(),
      banner: None,
      footer: None,
      public_path: None,
      out_extensions: Default::default(),
      metafile: false,
    }
  }
}

impl OutputOptions {
  /// Config errors are reported before any file work.
  pub fn validate(&self) -> crate::UnaryBuildResult<()> {
    if self.splitting && !self.format.is_esm() {
      return Err(crate::BuildError::invalid_options(
        "Splitting currently only works with the \"esm\" format",
      ));
    }
    Ok(())
  }
}

#[derive(Debug)]
pub struct FileNameTemplate {
  template: String,
}

impl FileNameTemplate {
  pub fn new(template: String) -> Self {
    Self { template }
  }

  pub fn render(&self, name: &str) -> String {
    self.template.replace("[name]", name)
  }
}

impl From<String> for FileNameTemplate {
  fn from(template: String) -> Self {
    Self { template }
  }
}
