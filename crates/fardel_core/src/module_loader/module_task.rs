use std::path::Path;
use std::sync::Arc;

use fardel_common::{Loader, ModuleId, ModulePath};
use fardel_error::Location;
use fardel_fs::FileSystem;
use fardel_plugin::{LoadArgs, ResolveArgs};
use fardel_resolver::Resolver;
use fardel_syntax::ast::Expr;
use fardel_syntax::{scan, Parser, ScanOptions, ScanResult};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::instrument;

use super::Msg;
use crate::{
  extract_loader_by_path, make_legal, BuildError, SharedBuildPluginDriver, UnaryBuildResult,
};

#[derive(Debug)]
pub(crate) enum ResolvedTarget {
  Normal { path: ModulePath, side_effects: bool },
  External { specifier: String },
}

#[derive(Debug)]
pub(crate) struct TaskResult {
  pub id: ModuleId,
  pub path: ModulePath,
  pub source: String,
  pub loader: Loader,
  pub ast: fardel_syntax::ast::Module,
  pub scan: ScanResult,
  /// Unique specifiers in first-appearance order.
  pub resolved: Vec<(String, ResolvedTarget)>,
  pub is_user_defined_entry: bool,
  pub is_injected: bool,
  pub side_effects: bool,
  pub file_asset: Option<(String, Vec<u8>)>,
}

pub(crate) struct ModuleTask {
  pub id: ModuleId,
  pub path: ModulePath,
  pub is_user_defined_entry: bool,
  pub is_injected: bool,
  pub side_effects: bool,
  pub tx: tokio::sync::mpsc::UnboundedSender<Msg>,
  pub resolver: Arc<Resolver>,
  pub plugin_driver: SharedBuildPluginDriver,
  pub fs: Arc<dyn FileSystem>,
  pub defines: Arc<FxHashMap<String, Expr>>,
  pub pure_functions: Arc<FxHashSet<String>>,
  pub loaders: FxHashMap<String, Loader>,
  pub external: FxHashSet<String>,
}

impl ModuleTask {
  #[instrument(skip_all)]
  pub(crate) async fn run(self) {
    let id = self.id;
    let tx = self.tx.clone();
    match self.run_inner().await {
      Ok(result) => {
        tx.send(Msg::Scanned(Box::new(result))).ok();
      }
      Err(err) => {
        tx.send(Msg::Error(id, err)).ok();
      }
    }
  }

  async fn run_inner(self) -> UnaryBuildResult<TaskResult> {
    // load hook, then the file system
    let loaded = self
      .plugin_driver
      .read()
      .await
      .load(LoadArgs {
        id: &self.path.path,
        namespace: &self.path.namespace,
      })
      .await?;

    let (bytes, loader) = match loaded {
      Some(loaded) => {
        let loader = loaded
          .loader
          .unwrap_or_else(|| extract_loader_by_path(Path::new(&self.path.path), &self.loaders));
        (loaded.code.into_bytes(), loader)
      }
      None => {
        let bytes = self.fs.read(Path::new(&self.path.path)).map_err(|e| {
          BuildError::io_error(e).context(format!("Read file: {}", self.path.path))
        })?;
        let loader = extract_loader_by_path(Path::new(&self.path.path), &self.loaders);
        (bytes, loader)
      }
    };

    let (code, file_asset) = source_for_loader(&self.path, bytes, loader)?;

    // transform hook
    let code = self
      .plugin_driver
      .read()
      .await
      .transform(&self.path.path, code)
      .await?;

    let mut ast = Parser::new(&self.path.path, &code)?.parse_module()?;

    let namespace_symbol_name = format!("{}_ns", make_legal(&module_stem(&self.path)));
    let scan_result = scan(
      &mut ast,
      ScanOptions {
        module_id: self.id,
        path: &self.path.path,
        namespace_symbol_name,
        defines: &self.defines,
        pure_functions: &self.pure_functions,
      },
    );

    let mut unique: Vec<(String, fardel_common::Loc)> = vec![];
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for record in &scan_result.import_records {
      if seen.insert(record.specifier.as_str()) {
        unique.push((record.specifier.clone(), record.loc));
      }
    }
    let this = &self;
    let code_ref = &code;
    let resolved = futures::future::join_all(unique.into_iter().map(|(specifier, loc)| async move {
      this
        .resolve_specifier(&specifier, code_ref, loc)
        .await
        .map(|target| (specifier, target))
    }))
    .await
    .into_iter()
    .collect::<UnaryBuildResult<Vec<_>>>()?;

    Ok(TaskResult {
      id: self.id,
      path: self.path,
      source: code,
      loader,
      ast,
      scan: scan_result,
      resolved,
      is_user_defined_entry: self.is_user_defined_entry,
      is_injected: self.is_injected,
      side_effects: self.side_effects,
      file_asset,
    })
  }

  async fn resolve_specifier(
    &self,
    specifier: &str,
    source: &str,
    loc: fardel_common::Loc,
  ) -> UnaryBuildResult<ResolvedTarget> {
    if self.external.contains(specifier) {
      return Ok(ResolvedTarget::External {
        specifier: specifier.to_string(),
      });
    }

    // plugins first
    let plugin_result = self
      .plugin_driver
      .read()
      .await
      .resolve(ResolveArgs {
        importer: Some(&self.path.path),
        specifier,
      })
      .await?;
    if let Some(result) = plugin_result {
      if result.external {
        return Ok(ResolvedTarget::External {
          specifier: specifier.to_string(),
        });
      }
      return Ok(ResolvedTarget::Normal {
        path: ModulePath::new(
          result.id,
          result.namespace.unwrap_or_else(|| "file".to_string()),
        ),
        side_effects: true,
      });
    }

    let resolved = self
      .resolver
      .resolve(Some(&self.path.path), specifier)
      .map_err(|err| err.context(format!("Resolve \"{specifier}\"")))?;

    match resolved {
      Some(found) => Ok(ResolvedTarget::Normal {
        path: ModulePath::new(found.path, found.namespace),
        side_effects: found.side_effects,
      }),
      None => {
        if specifier.starts_with('.') || Path::new(specifier).is_absolute() {
          // Relative imports must land on a real file.
          let location = Location::from_source(&self.path.path, source, loc.line, loc.col);
          return Err(BuildError::unresolved_import(
            specifier,
            self.path.path.clone(),
            Some(location),
          ));
        }
        Ok(ResolvedTarget::External {
          specifier: specifier.to_string(),
        })
      }
    }
  }
}

fn module_stem(path: &ModulePath) -> String {
  path
    .path
    .rsplit('/')
    .next()
    .unwrap_or("module")
    .split('.')
    .next()
    .unwrap_or("module")
    .to_string()
}

/// Funnel non-JS loaders into JavaScript source. Returns the module source
/// plus an optional carried file asset (the `file` loader).
fn source_for_loader(
  path: &ModulePath,
  bytes: Vec<u8>,
  loader: Loader,
) -> UnaryBuildResult<(String, Option<(String, Vec<u8>)>)> {
  let as_utf8 = |bytes: Vec<u8>| {
    String::from_utf8(bytes).map_err(|_| {
      BuildError::parse_failed(path.path.clone(), "File is not valid UTF-8", None)
    })
  };
  match loader {
    Loader::Js | Loader::Jsx | Loader::Ts | Loader::Tsx => Ok((as_utf8(bytes)?, None)),
    Loader::Json => {
      let text = as_utf8(bytes)?;
      let value = serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
        BuildError::parse_failed(path.path.clone(), format!("Invalid JSON: {e}"), None)
      })?;
      Ok((json_module_source(&value), None))
    }
    Loader::Text | Loader::Css => {
      let text = as_utf8(bytes)?;
      Ok((
        format!("export default {};\n", fardel_syntax::quote_string(&text)),
        None,
      ))
    }
    Loader::Base64 => {
      let encoded = fardel_sourcemap::base64_encode(&bytes);
      Ok((format!("export default \"{encoded}\";\n"), None))
    }
    Loader::DataUrl => {
      let encoded = fardel_sourcemap::base64_encode(&bytes);
      let mime = mime_by_path(&path.path);
      Ok((
        format!("export default \"data:{mime};base64,{encoded}\";\n"),
        None,
      ))
    }
    Loader::Binary => {
      let encoded = fardel_sourcemap::base64_encode(&bytes);
      Ok((
        format!(
          "export default Uint8Array.from(atob(\"{encoded}\"), (c) => c.charCodeAt(0));\n"
        ),
        None,
      ))
    }
    Loader::File => {
      let filename = path
        .path
        .rsplit('/')
        .next()
        .unwrap_or("asset")
        .to_string();
      let source = format!(
        "export default {};\n",
        fardel_syntax::quote_string(&filename)
      );
      Ok((source, Some((filename, bytes))))
    }
  }
}

/// JSON modules expose a default export plus named exports for the
/// identifier-safe top-level keys; the default object references the named
/// bindings so values are not duplicated.
fn json_module_source(value: &serde_json::Value) -> String {
  let serde_json::Value::Object(map) = value else {
    return format!("export default {value};\n");
  };
  let mut out = String::new();
  let mut props: Vec<String> = vec![];
  for (key, entry) in map {
    if is_identifier_safe_key(key) {
      out.push_str(&format!("export const {key} = {entry};\n"));
      props.push(key.clone());
    } else {
      props.push(format!(
        "{}: {}",
        serde_json::Value::String(key.clone()),
        entry
      ));
    }
  }
  if props.is_empty() {
    out.push_str("export default {};\n");
  } else {
    out.push_str(&format!("export default {{ {} }};\n", props.join(", ")));
  }
  out
}

fn is_identifier_safe_key(key: &str) -> bool {
  let mut chars = key.chars();
  let Some(first) = chars.next() else {
    return false;
  };
  if !(first.is_alphabetic() || first == '_' || first == '$') {
    return false;
  }
  if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
    return false;
  }
  !crate::RESERVED_NAMES.contains(key) && key != "arguments"
}

fn mime_by_path(path: &str) -> &'static str {
  match path.rsplit('.').next() {
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("svg") => "image/svg+xml",
    Some("json") => "application/json",
    Some("css") => "text/css",
    Some("txt") => "text/plain",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_objects_get_named_exports_for_safe_keys() {
    let value = serde_json::json!({
      "port": 8080,
      "nested": { "a": 1 },
      "invalid-key": true,
      "default": "reserved"
    });
    let source = json_module_source(&value);
    assert!(source.contains("export const port = 8080;"), "{source}");
    assert!(source.contains("export const nested = {\"a\":1};"), "{source}");
    assert!(!source.contains("export const default"), "{source}");
    assert!(source.contains("\"default\": \"reserved\""), "{source}");
    assert!(source.contains("\"invalid-key\": true"), "{source}");
    // safe keys come back as shorthand references in the default object
    assert!(source.contains("export default {"), "{source}");
    assert!(source.trim_end().ends_with("};"), "{source}");
  }

  #[test]
  fn non_object_json_gets_a_default_export_only() {
    assert_eq!(
      json_module_source(&serde_json::json!([1, 2, 3])),
      "export default [1,2,3];\n"
    );
    assert_eq!(json_module_source(&serde_json::json!(true)), "export default true;\n");
  }

  #[test]
  fn identifier_safe_keys_exclude_reserved_words() {
    assert!(is_identifier_safe_key("port"));
    assert!(is_identifier_safe_key("$inner"));
    assert!(!is_identifier_safe_key("invalid-key"));
    assert!(!is_identifier_safe_key("1two"));
    assert!(!is_identifier_safe_key("default"));
    assert!(!is_identifier_safe_key(""));
  }
}
