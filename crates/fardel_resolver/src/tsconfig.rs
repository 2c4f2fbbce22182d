use std::path::Path;

use fardel_fs::FileSystem;
use serde_json::Value;

/// The slice of tsconfig.json the bundler consumes: path mappings feed the
/// resolver, the JSX factories ride along in the options for the lowering
/// stage.
#[derive(Debug, Clone, Default)]
pub struct TsConfig {
  pub base_url: Option<String>,
  pub paths: Vec<(String, String)>,
  pub jsx_factory: Option<String>,
  pub jsx_fragment_factory: Option<String>,
}

impl TsConfig {
  pub fn read(fs: &dyn FileSystem, path: &Path) -> fardel_error::Result<Self> {
    let source = fs
      .read_to_string(path)
      .map_err(fardel_error::Error::io_error)?;
    Self::parse(&source).map_err(|e| {
      fardel_error::Error::invalid_options(format!("Invalid {}: {e}", path.display()))
    })
  }

  pub fn parse(source: &str) -> Result<Self, serde_json::Error> {
    let value: Value = serde_json::from_str(source)?;
    let options = value.get("compilerOptions").cloned().unwrap_or(Value::Null);
    let string_field = |name: &str| {
      options
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
    };

    let mut paths = vec![];
    if let Some(Value::Object(map)) = options.get("paths") {
      for (prefix, targets) in map {
        // TypeScript allows fallback arrays; the first candidate wins here.
        let target = match targets {
          Value::Array(list) => list.first().and_then(|v| v.as_str()),
          Value::String(s) => Some(s.as_str()),
          _ => None,
        };
        if let Some(target) = target {
          let target = target.strip_suffix('*').unwrap_or(target);
          paths.push((prefix.clone(), target.to_string()));
        }
      }
    }
    paths.sort();

    Ok(Self {
      base_url: string_field("baseUrl"),
      paths,
      jsx_factory: string_field("jsxFactory"),
      jsx_fragment_factory: string_field("jsxFragmentFactory"),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_paths_and_jsx_options() {
    let config = TsConfig::parse(
      r#"{
        "compilerOptions": {
          "baseUrl": ".",
          "jsxFactory": "h",
          "paths": { "@app/*": ["./src/app/*"], "lodash": ["./vendor/lodash.js"] }
        }
      }"#,
    )
    .unwrap();
    assert_eq!(config.base_url.as_deref(), Some("."));
    assert_eq!(config.jsx_factory.as_deref(), Some("h"));
    assert_eq!(
      config.paths,
      vec![
        ("@app/*".to_string(), "./src/app/".to_string()),
        ("lodash".to_string(), "./vendor/lodash.js".to_string()),
      ]
    );
  }
}
