//! Module resolution: relative and absolute specifiers, implicit extensions,
//! directory index files, `node_modules` lookup with main fields, tsconfig
//! path mappings, and AMD-style configs. Deterministic and pure with respect
//! to the file system snapshot it is given.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fardel_fs::FileSystem;
use sugar_path::{AsPath, SugarPathBuf};

mod amd_config;
pub use amd_config::*;
mod package_json;
pub use package_json::*;
mod tsconfig;
pub use tsconfig::*;

#[derive(Debug, Clone)]
pub struct Resolved {
  pub path: String,
  pub namespace: String,
  /// False when the owning package declares `"sideEffects": false`.
  pub side_effects: bool,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
  pub extensions: Vec<String>,
  pub main_fields: Vec<String>,
  pub tsconfig_paths: Vec<(String, String)>,
  pub amd: Option<AmdConfig>,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    Self {
      extensions: vec![
        ".tsx".to_string(),
        ".ts".to_string(),
        ".jsx".to_string(),
        ".js".to_string(),
        ".json".to_string(),
      ],
      main_fields: vec!["browser".to_string(), "module".to_string(), "main".to_string()],
      tsconfig_paths: vec![],
      amd: None,
    }
  }
}

#[derive(Debug)]
pub struct Resolver {
  cwd: PathBuf,
  fs: Arc<dyn FileSystem>,
  options: ResolveOptions,
}

impl Resolver {
  pub fn new(cwd: PathBuf, fs: Arc<dyn FileSystem>, options: ResolveOptions) -> Self {
    Self { cwd, fs, options }
  }

  pub fn with_cwd(cwd: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
    Self::new(cwd, fs, ResolveOptions::default())
  }

  pub fn cwd(&self) -> &PathBuf {
    &self.cwd
  }

  /// `Ok(Some(..))` is a bundled file, `Ok(None)` marks the import external.
  pub fn resolve(
    &self,
    importer: Option<&str>,
    specifier: &str,
  ) -> fardel_error::Result<Option<Resolved>> {
    tracing::trace!("resolve {:?} from {:?}", specifier, importer);

    // AMD plugin expressions: `plugin!resource`
    if let Some(amd) = &self.options.amd {
      if let Some(expr) = AmdConfig::split_plugin_expression(specifier) {
        let resource = amd.plugin_resource(expr.plugin, expr.resource);
        let mapped = amd.apply(&resource, importer);
        let base = self.amd_base();
        return self.resolve_file_or_dir(&base.join(&mapped));
      }
    }

    let is_relative = specifier.starts_with('.');
    let is_absolute = specifier.as_path().is_absolute();

    if is_relative || is_absolute {
      let base = if is_absolute {
        PathBuf::from(specifier)
      } else if let Some(importer) = importer {
        importer
          .as_path()
          .parent()
          .unwrap_or_else(|| Path::new("/"))
          .join(specifier)
      } else {
        self.cwd.join(specifier)
      };
      return self.resolve_file_or_dir(&base);
    }

    // bare specifier: tsconfig paths, AMD paths, then node_modules
    for (prefix, replacement) in &self.options.tsconfig_paths {
      if let Some(rest) = match_path_prefix(specifier, prefix) {
        let target = format!("{replacement}{rest}");
        if let Some(found) = self.resolve_file_or_dir(&self.cwd.join(target))? {
          return Ok(Some(found));
        }
      }
    }

    if let Some(amd) = &self.options.amd {
      let mapped = amd.apply(specifier, importer);
      if mapped != specifier {
        let base = self.amd_base();
        if let Some(found) = self.resolve_file_or_dir(&base.join(&mapped))? {
          return Ok(Some(found));
        }
      }
    }

    self.resolve_bare(importer, specifier)
  }

  fn amd_base(&self) -> PathBuf {
    match self
      .options
      .amd
      .as_ref()
      .and_then(|amd| amd.base_url.as_ref())
    {
      Some(base) if base.as_path().is_absolute() => PathBuf::from(base),
      Some(base) => self.cwd.join(base),
      None => self.cwd.clone(),
    }
  }

  fn resolve_bare(
    &self,
    importer: Option<&str>,
    specifier: &str,
  ) -> fardel_error::Result<Option<Resolved>> {
    let mut dir = importer
      .map(|i| {
        i.as_path()
          .parent()
          .map(|p| p.to_path_buf())
          .unwrap_or_else(|| self.cwd.clone())
      })
      .unwrap_or_else(|| self.cwd.clone());

    loop {
      let candidate = dir.join("node_modules").join(specifier);
      if let Some(found) = self.resolve_package(&candidate)? {
        return Ok(Some(found));
      }
      match dir.parent() {
        Some(parent) => dir = parent.to_path_buf(),
        // Unresolved bare imports stay external; the host runtime gets to
        // provide them.
        None => return Ok(None),
      }
    }
  }

  fn resolve_package(&self, candidate: &Path) -> fardel_error::Result<Option<Resolved>> {
    let manifest_path = candidate.join("package.json");
    if self.fs.is_file(&manifest_path) {
      let manifest = PackageJson::read(self.fs.as_ref(), &manifest_path)?;
      for field in &self.options.main_fields {
        if let Some(main) = manifest.field(field) {
          if let Some(found) = self.resolve_file_or_dir(&candidate.join(main))? {
            return Ok(Some(Resolved {
              side_effects: manifest.side_effects,
              ..found
            }));
          }
        }
      }
      if let Some(found) = self.resolve_file_or_dir(&candidate.join("index"))? {
        return Ok(Some(Resolved {
          side_effects: manifest.side_effects,
          ..found
        }));
      }
      return Ok(None);
    }
    if self.fs.is_file(candidate) || self.has_extension_candidate(candidate) {
      return self.resolve_file_or_dir(candidate);
    }
    if self.fs.is_dir(candidate) {
      return self.resolve_file_or_dir(candidate);
    }
    Ok(None)
  }

  fn has_extension_candidate(&self, base: &Path) -> bool {
    self
      .options
      .extensions
      .iter()
      .any(|ext| self.fs.is_file(&append_extension(base, ext)))
  }

  fn resolve_file_or_dir(&self, base: &Path) -> fardel_error::Result<Option<Resolved>> {
    let normalized = base.to_path_buf().into_absolutize();

    if self.fs.is_file(&normalized) {
      return Ok(Some(self.found(normalized)));
    }
    for ext in &self.options.extensions {
      let candidate = append_extension(&normalized, ext);
      if self.fs.is_file(&candidate) {
        return Ok(Some(self.found(candidate)));
      }
    }
    if self.fs.is_dir(&normalized) {
      let index = normalized.join("index");
      for ext in &self.options.extensions {
        let candidate = append_extension(&index, ext);
        if self.fs.is_file(&candidate) {
          return Ok(Some(self.found(candidate)));
        }
      }
    }
    Ok(None)
  }

  fn found(&self, path: PathBuf) -> Resolved {
    Resolved {
      path: path.to_string_lossy().to_string(),
      namespace: "file".to_string(),
      side_effects: true,
    }
  }
}

fn append_extension(base: &Path, ext: &str) -> PathBuf {
  let mut s = base.as_os_str().to_os_string();
  s.push(ext);
  PathBuf::from(s)
}

fn match_path_prefix<'a>(specifier: &'a str, prefix: &str) -> Option<&'a str> {
  // tsconfig-style prefixes may end with `/*`
  if let Some(stem) = prefix.strip_suffix("/*") {
    let rest = specifier.strip_prefix(stem)?;
    return Some(rest.strip_prefix('/').unwrap_or(rest));
  }
  if specifier == prefix {
    return Some("");
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use fardel_fs::MemoryFileSystem;

  fn resolver_with(files: &[(&str, &str)]) -> Resolver {
    let fs = Arc::new(MemoryFileSystem::from_files(
      files.iter().map(|(p, c)| (p.to_string(), c.to_string())),
    ));
    Resolver::with_cwd(PathBuf::from("/"), fs)
  }

  #[test]
  fn resolves_relative_with_implicit_extension() {
    let resolver = resolver_with(&[("/src/entry.ts", ""), ("/src/dep.ts", "")]);
    let found = resolver
      .resolve(Some("/src/entry.ts"), "./dep")
      .unwrap()
      .unwrap();
    assert_eq!(found.path, "/src/dep.ts");
    assert_eq!(found.namespace, "file");
  }

  #[test]
  fn resolves_directory_index() {
    let resolver = resolver_with(&[("/src/entry.js", ""), ("/src/util/index.js", "")]);
    let found = resolver
      .resolve(Some("/src/entry.js"), "./util")
      .unwrap()
      .unwrap();
    assert_eq!(found.path, "/src/util/index.js");
  }

  #[test]
  fn resolves_node_modules_with_main_fields() {
    let resolver = resolver_with(&[
      ("/src/entry.js", ""),
      (
        "/node_modules/lib/package.json",
        r#"{"main": "./dist/lib.js", "sideEffects": false}"#,
      ),
      ("/node_modules/lib/dist/lib.js", ""),
    ]);
    let found = resolver.resolve(Some("/src/entry.js"), "lib").unwrap().unwrap();
    assert_eq!(found.path, "/node_modules/lib/dist/lib.js");
    assert!(!found.side_effects);
  }

  #[test]
  fn unresolved_bare_imports_are_external() {
    let resolver = resolver_with(&[("/src/entry.js", "")]);
    assert!(resolver.resolve(Some("/src/entry.js"), "fs").unwrap().is_none());
  }

  #[test]
  fn tsconfig_paths_rewrite_bare_imports() {
    let fs = Arc::new(MemoryFileSystem::from_files([(
      "/src/shared/log.ts",
      "",
    )]));
    let resolver = Resolver::new(
      PathBuf::from("/"),
      fs,
      ResolveOptions {
        tsconfig_paths: vec![("@shared/*".to_string(), "src/shared/".to_string())],
        ..Default::default()
      },
    );
    let found = resolver.resolve(None, "@shared/log").unwrap().unwrap();
    assert_eq!(found.path, "/src/shared/log.ts");
  }

  #[test]
  fn amd_paths_resolve_from_base_url() {
    let fs = Arc::new(MemoryFileSystem::from_files([("/web/app/main.js", "")]));
    let amd = AmdConfig::parse(r#"{"baseUrl": "/web", "paths": {"app": "./app"}}"#).unwrap();
    let resolver = Resolver::new(
      PathBuf::from("/"),
      fs,
      ResolveOptions {
        amd: Some(amd),
        ..Default::default()
      },
    );
    let found = resolver.resolve(None, "app/main").unwrap().unwrap();
    assert_eq!(found.path, "/web/app/main.js");
  }
}
