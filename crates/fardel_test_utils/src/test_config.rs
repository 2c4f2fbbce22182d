use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestConfig {
  pub input: InputConfig,
  pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputConfig {
  pub entries: Vec<String>,
  pub external: Vec<String>,
  pub treeshake: bool,
  pub inject: Vec<String>,
}

impl Default for InputConfig {
  fn default() -> Self {
    Self {
      entries: vec![],
      external: vec![],
      treeshake: true,
      inject: vec![],
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
  pub format: String,
  pub splitting: bool,
  pub global_name: Option<String>,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      format: "esm".to_string(),
      splitting: false,
      global_name: None,
    }
  }
}

impl TestConfig {
  pub fn from_json(source: &str) -> Self {
    serde_json::from_str(source).expect("valid test config")
  }
}
