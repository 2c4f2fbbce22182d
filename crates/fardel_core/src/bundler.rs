use fardel_plugin::BuildPlugin;
use sugar_path::AsPath;

use crate::{
  Bundle, BuildPluginDriver, BuildResult, Graph, InputOptions, Metafile, OutputOptions,
  SharedBuildPluginDriver,
};

pub struct Bundler {
  input_options: InputOptions,
  plugin_driver: SharedBuildPluginDriver,
}

#[derive(Debug, Clone)]
pub struct Asset {
  pub filename: String,
  pub content: Vec<u8>,
}

impl Asset {
  pub fn content_as_str(&self) -> &str {
    std::str::from_utf8(&self.content).unwrap_or("")
  }
}

impl Bundler {
  pub fn new(input_options: InputOptions) -> Self {
    fardel_tracing::init();
    Self {
      input_options,
      plugin_driver: Default::default(),
    }
  }

  pub fn with_plugins(input_options: InputOptions, plugins: Vec<Box<dyn BuildPlugin>>) -> Self {
    fardel_tracing::init();
    Self {
      input_options,
      plugin_driver: BuildPluginDriver::new(plugins).into_shared(),
    }
  }

  async fn build_graph(&mut self) -> BuildResult<Graph> {
    tracing::debug!("InputOptions {:#?}", self.input_options);
    let mut graph = Graph::new();
    graph
      .build(&self.input_options, self.plugin_driver.clone())
      .await?;
    for warning in std::mem::take(&mut graph.warnings) {
      (self.input_options.on_warn)(warning);
    }
    Ok(graph)
  }

  pub async fn build(&mut self, output_options: OutputOptions) -> BuildResult<Vec<Asset>> {
    tracing::debug!("start bundling with OutputOptions: {:#?}", output_options);
    let graph = self.build_graph().await?;
    let mut bundle = Bundle::new(&self.input_options, &output_options, &graph);
    bundle.generate()
  }

  pub async fn generate(&mut self, output_options: OutputOptions) -> BuildResult<Vec<Asset>> {
    self.build(output_options).await
  }

  /// Bundle and write the assets below `dir`.
  pub async fn write(
    &mut self,
    output_options: OutputOptions,
    dir: Option<String>,
  ) -> BuildResult<Vec<Asset>> {
    let dir = dir.unwrap_or_else(|| {
      self
        .input_options
        .cwd
        .as_path()
        .join("dist")
        .to_string_lossy()
        .to_string()
    });
    let output = self.build(output_options).await?;

    std::fs::create_dir_all(&dir).map_err(crate::BuildError::io_error)?;
    for asset in &output {
      let dest = dir.as_path().join(&asset.filename);
      if let Some(parent) = dest.parent() {
        if !parent.exists() {
          std::fs::create_dir_all(parent).map_err(crate::BuildError::io_error)?;
        }
      }
      std::fs::write(&dest, &asset.content).map_err(|e| {
        crate::BuildError::io_error(e).context(format!("Write file: {}", dest.display()))
      })?;
    }
    Ok(output)
  }

  /// The `analyse` command: build the graph and return the metadata JSON
  /// without printing any chunk.
  pub async fn analyse(&mut self) -> BuildResult<String> {
    let graph = self.build_graph().await?;
    let metafile = Metafile::from_graph(&graph, &self.input_options);
    Ok(metafile.to_json())
  }
}
