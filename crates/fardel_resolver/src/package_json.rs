use std::path::Path;

use fardel_fs::FileSystem;
use serde_json::Value;

/// The slice of package.json the resolver cares about.
#[derive(Debug, Clone, Default)]
pub struct PackageJson {
  pub main: Option<String>,
  pub module: Option<String>,
  pub browser: Option<String>,
  /// `"sideEffects": false` marks every module of the package droppable
  /// when none of its symbols stay live.
  pub side_effects: bool,
}

impl PackageJson {
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
    let string_field = |name: &str| {
      value
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
    };
    let side_effects = match value.get("sideEffects") {
      Some(Value::Bool(flag)) => *flag,
      // An allowlist array still means "some files have effects".
      Some(_) | None => true,
    };
    Ok(Self {
      main: string_field("main"),
      module: string_field("module"),
      browser: string_field("browser"),
      side_effects,
    })
  }

  pub fn field(&self, name: &str) -> Option<&str> {
    match name {
      "main" => self.main.as_deref(),
      "module" => self.module.as_deref(),
      "browser" => self.browser.as_deref(),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_main_fields_and_side_effects() {
    let manifest =
      PackageJson::parse(r#"{"main": "index.js", "module": "esm/index.js", "sideEffects": false}"#)
        .unwrap();
    assert_eq!(manifest.field("main"), Some("index.js"));
    assert_eq!(manifest.field("module"), Some("esm/index.js"));
    assert!(!manifest.side_effects);
  }

  #[test]
  fn browser_object_form_is_ignored() {
    let manifest =
      PackageJson::parse(r#"{"browser": {"fs": false}, "main": "index.js"}"#).unwrap();
    assert_eq!(manifest.field("browser"), None);
    assert!(manifest.side_effects);
  }
}
