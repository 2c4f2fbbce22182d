//! AMD-style resolution config: `baseUrl`, longest-prefix `paths`, scoped
//! `map` with a `*` fallback, and `plugin!resource` expressions.

use rustc_hash::FxHashMap;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmdConfig {
  pub base_url: Option<String>,
  pub paths: FxHashMap<String, String>,
  /// scope -> (name -> replacement); scope `*` applies universally.
  pub map: FxHashMap<String, FxHashMap<String, String>>,
  pub namespace: Option<String>,
  pub plugins: FxHashMap<String, AmdPluginConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmdPluginConfig {
  pub file_extensions: Vec<String>,
  pub append_file_extension: Option<String>,
  pub load_script: Option<AmdLoadScript>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmdLoadScript {
  pub replacement_pattern: String,
  pub replacement_value: String,
}

/// A specifier containing `!` is a plugin expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginExpression<'a> {
  pub plugin: &'a str,
  pub resource: &'a str,
}

impl AmdConfig {
  pub fn parse(source: &str) -> fardel_error::Result<Self> {
    serde_json::from_str(source)
      .map_err(|e| fardel_error::Error::invalid_options(format!("Invalid AMD config: {e}")))
  }

  pub fn split_plugin_expression<'a>(specifier: &'a str) -> Option<PluginExpression<'a>> {
    let bang = specifier.find('!')?;
    Some(PluginExpression {
      plugin: &specifier[..bang],
      resource: &specifier[bang + 1..],
    })
  }

  /// Apply the scoped `map` first, then the longest-prefix `paths` mapping.
  pub fn apply(&self, specifier: &str, importer_scope: Option<&str>) -> String {
    let mapped = self.apply_map(specifier, importer_scope);
    self.apply_paths(&mapped)
  }

  fn apply_map(&self, specifier: &str, importer_scope: Option<&str>) -> String {
    if let Some(scope) = importer_scope {
      if let Some(scoped) = self.map.get(scope) {
        if let Some(replacement) = lookup_prefix(scoped, specifier) {
          return replacement;
        }
      }
    }
    if let Some(universal) = self.map.get("*") {
      if let Some(replacement) = lookup_prefix(universal, specifier) {
        return replacement;
      }
    }
    specifier.to_string()
  }

  fn apply_paths(&self, specifier: &str) -> String {
    let mut best: Option<(&str, &str)> = None;
    for (prefix, replacement) in &self.paths {
      if specifier == prefix || specifier.starts_with(&format!("{prefix}/")) {
        match best {
          Some((found, _)) if found.len() >= prefix.len() => {}
          _ => best = Some((prefix, replacement)),
        }
      }
    }
    match best {
      Some((prefix, replacement)) => {
        format!("{replacement}{}", &specifier[prefix.len()..])
      }
      None => specifier.to_string(),
    }
  }

  /// Resource names resolved through a plugin may need the plugin's implied
  /// extension.
  pub fn plugin_resource(&self, plugin: &str, resource: &str) -> String {
    match self.plugins.get(plugin) {
      Some(config) => {
        let has_known_ext = config
          .file_extensions
          .iter()
          .any(|ext| resource.ends_with(ext.as_str()));
        match (&config.append_file_extension, has_known_ext) {
          (Some(ext), false) => format!("{resource}{ext}"),
          _ => resource.to_string(),
        }
      }
      None => resource.to_string(),
    }
  }
}

fn lookup_prefix(map: &FxHashMap<String, String>, specifier: &str) -> Option<String> {
  let mut best: Option<(&str, &str)> = None;
  for (prefix, replacement) in map {
    if specifier == prefix || specifier.starts_with(&format!("{prefix}/")) {
      match best {
        Some((found, _)) if found.len() >= prefix.len() => {}
        _ => best = Some((prefix, replacement)),
      }
    }
  }
  best.map(|(prefix, replacement)| format!("{replacement}{}", &specifier[prefix.len()..]))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> AmdConfig {
    AmdConfig::parse(
      r#"{
        "baseUrl": "/src",
        "paths": { "app": "./app", "app/vendor": "./third_party" },
        "map": { "*": { "legacy": "modern" }, "old/mod": { "dep": "dep-1.2" } },
        "plugins": {
          "text": { "fileExtensions": [".html"], "appendFileExtension": ".html" }
        }
      }"#,
    )
    .unwrap()
  }

  #[test]
  fn longest_prefix_wins_for_paths() {
    let config = config();
    assert_eq!(config.apply("app/main", None), "./app/main");
    assert_eq!(config.apply("app/vendor/x", None), "./third_party/x");
  }

  #[test]
  fn star_scope_applies_universally() {
    let config = config();
    assert_eq!(config.apply("legacy/util", None), "modern/util");
    assert_eq!(config.apply("dep", Some("old/mod")), "dep-1.2");
    assert_eq!(config.apply("dep", Some("other")), "dep");
  }

  #[test]
  fn plugin_expressions_split_on_bang() {
    let expr = AmdConfig::split_plugin_expression("text!views/home").unwrap();
    assert_eq!(expr.plugin, "text");
    assert_eq!(expr.resource, "views/home");
    assert!(AmdConfig::split_plugin_expression("plain/module").is_none());
  }

  #[test]
  fn plugin_appends_configured_extension() {
    let config = config();
    assert_eq!(config.plugin_resource("text", "views/home"), "views/home.html");
    assert_eq!(
      config.plugin_resource("text", "views/home.html"),
      "views/home.html"
    );
  }
}
