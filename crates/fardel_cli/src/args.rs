//! Hand-rolled flag parsing: `--flag`, `--flag=value`, and `--flag:k=v`
//! forms, matched by prefix the way the original CLI does it.

use std::path::PathBuf;
use std::str::FromStr;

use fardel_common::Loader;
use fardel_core::{MinifyOptions, ModuleFormat, Platform, SourceMapMode};
use fardel_error::Error;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
  #[default]
  Build,
  Transform,
  Analyse,
}

#[derive(Debug, Default)]
pub struct CliArgs {
  pub command: Command,
  pub entries: Vec<String>,
  pub bundle: bool,
  pub splitting: bool,
  pub format: Option<ModuleFormat>,
  pub platform: Platform,
  pub target: Option<String>,
  pub sourcemap: SourceMapMode,
  pub minify: MinifyOptions,
  pub external: FxHashSet<String>,
  pub define: FxHashMap<String, String>,
  pub pure_functions: FxHashSet<String>,
  pub loaders: FxHashMap<String, Loader>,
  pub out_extensions: FxHashMap<String, String>,
  pub outfile: Option<String>,
  pub outdir: Option<String>,
  pub outbase: Option<String>,
  pub metafile: Option<String>,
  pub tsconfig: Option<PathBuf>,
  pub amdconfig: Option<PathBuf>,
  pub jsx_factory: Option<String>,
  pub jsx_fragment: Option<String>,
  pub global_name: Option<String>,
  pub main_fields: Option<Vec<String>>,
  pub resolve_extensions: Option<Vec<String>>,
  pub banner: Option<String>,
  pub footer: Option<String>,
  pub inject: Vec<String>,
  pub public_path: Option<String>,
  pub keep_names: bool,
  pub avoid_tdz: bool,
  pub error_limit: usize,
  pub no_treeshake: bool,
}

pub fn parse_args(os_args: &[String]) -> Result<CliArgs, Error> {
  let mut args = CliArgs {
    error_limit: 10,
    ..Default::default()
  };

  let mut rest = os_args;
  match rest.first().map(|s| s.as_str()) {
    Some("build") => {
      args.command = Command::Build;
      rest = &rest[1..];
    }
    Some("transform") => {
      args.command = Command::Transform;
      rest = &rest[1..];
    }
    Some("analyse") | Some("analyze") => {
      args.command = Command::Analyse;
      rest = &rest[1..];
    }
    _ => {}
  }

  for arg in rest {
    let arg = arg.as_str();
    if !arg.starts_with("--") {
      args.entries.push(arg.to_string());
      continue;
    }
    match arg {
      "--bundle" => args.bundle = true,
      "--splitting" => args.splitting = true,
      "--minify" => args.minify = MinifyOptions::all(),
      "--minify-syntax" => args.minify.syntax = true,
      "--minify-whitespace" => args.minify.whitespace = true,
      "--minify-identifiers" => args.minify.identifiers = true,
      "--keep-names" => args.keep_names = true,
      "--avoid-tdz" => args.avoid_tdz = true,
      "--no-treeshake" => args.no_treeshake = true,
      "--sourcemap" => args.sourcemap = SourceMapMode::External,
      _ => {
        if let Some(value) = arg.strip_prefix("--sourcemap=") {
          args.sourcemap = match value {
            "inline" => SourceMapMode::Inline,
            "external" => SourceMapMode::External,
            "both" => SourceMapMode::Both,
            other => {
              return Err(Error::invalid_options(format!(
                "Invalid sourcemap: {other:?} (valid: inline, external, both)"
              )))
            }
          };
        } else if let Some(value) = arg.strip_prefix("--format=") {
          args.format = Some(ModuleFormat::from_str(value).map_err(Error::invalid_options)?);
        } else if let Some(value) = arg.strip_prefix("--platform=") {
          args.platform = match value {
            "browser" => Platform::Browser,
            "node" => Platform::Node,
            "neutral" => Platform::Neutral,
            other => {
              return Err(Error::invalid_options(format!(
                "Invalid platform: {other:?} (valid: browser, node, neutral)"
              )))
            }
          };
        } else if let Some(value) = arg.strip_prefix("--target=") {
          args.target = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--external:") {
          args.external.insert(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--define:") {
          let (key, replacement) = value.split_once('=').ok_or_else(|| {
            Error::invalid_options(format!("Missing \"=\" in define: {value:?}"))
          })?;
          args.define.insert(key.to_string(), replacement.to_string());
        } else if let Some(value) = arg.strip_prefix("--pure:") {
          args.pure_functions.insert(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--loader:") {
          let (ext, kind) = value.split_once('=').ok_or_else(|| {
            Error::invalid_options(format!("Missing \"=\" in loader mapping: {value:?}"))
          })?;
          args.loaders.insert(ext.to_string(), Loader::from_str(kind)?);
        } else if let Some(value) = arg.strip_prefix("--out-extension:") {
          let (from, to) = value.split_once('=').ok_or_else(|| {
            Error::invalid_options(format!("Missing \"=\" in out-extension: {value:?}"))
          })?;
          args
            .out_extensions
            .insert(from.to_string(), to.to_string());
        } else if let Some(value) = arg.strip_prefix("--outfile=") {
          args.outfile = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--outdir=") {
          args.outdir = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--outbase=") {
          args.outbase = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--metafile=") {
          args.metafile = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--tsconfig=") {
          args.tsconfig = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--amdconfig=") {
          args.amdconfig = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--jsx-factory=") {
          args.jsx_factory = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--jsx-fragment=") {
          args.jsx_fragment = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--global-name=") {
          args.global_name = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--main-fields=") {
          args.main_fields = Some(value.split(',').map(|s| s.to_string()).collect());
        } else if let Some(value) = arg.strip_prefix("--resolve-extensions=") {
          args.resolve_extensions = Some(value.split(',').map(|s| s.to_string()).collect());
        } else if let Some(value) = arg.strip_prefix("--banner=") {
          args.banner = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--footer=") {
          args.footer = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--inject:") {
          args.inject.push(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--public-path=") {
          args.public_path = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--error-limit=") {
          args.error_limit = value
            .parse()
            .map_err(|_| Error::invalid_options(format!("Invalid error limit: {value:?}")))?;
        } else {
          return Err(Error::invalid_options(format!("Invalid flag: {arg}")));
        }
      }
    }
  }

  validate(&args)?;
  Ok(args)
}

/// Config errors are caught before any file work.
fn validate(args: &CliArgs) -> Result<(), Error> {
  if args.entries.is_empty() {
    return Err(Error::invalid_options("No entry points were provided"));
  }
  if args.outfile.is_some() && args.outdir.is_some() {
    return Err(Error::invalid_options(
      "Cannot use both \"outfile\" and \"outdir\"",
    ));
  }
  if args.outfile.is_some() && args.entries.len() > 1 {
    return Err(Error::invalid_options(
      "Cannot use \"outfile\" with multiple entry points; use \"outdir\" instead",
    ));
  }
  if args.splitting {
    match args.format {
      Some(ModuleFormat::Esm) => {}
      _ => {
        return Err(Error::invalid_options(
          "Splitting currently only works with the \"esm\" format",
        ))
      }
    }
  }
  if args.sourcemap.wants_file() && args.outfile.is_none() && args.outdir.is_none() {
    return Err(Error::invalid_options(
      "Cannot use an external source map without an output path",
    ));
  }
  if args.command == Command::Build && args.metafile.is_some() && args.outfile.is_none() && args.outdir.is_none()
  {
    return Err(Error::invalid_options(
      "Cannot use \"metafile\" without an output path",
    ));
  }
  if args.command == Command::Transform && args.entries.len() > 1 {
    return Err(Error::invalid_options(
      "The transform command takes a single input file",
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn parses_build_flags() {
    let args = parse_args(&strings(&[
      "build",
      "src/entry.ts",
      "--bundle",
      "--format=iife",
      "--global-name=app",
      "--define:DEBUG=false",
      "--external:fs",
      "--loader:.svg=text",
      "--minify-identifiers",
      "--outfile=out.js",
    ]))
    .unwrap();
    assert_eq!(args.command, Command::Build);
    assert_eq!(args.entries, vec!["src/entry.ts"]);
    assert!(args.bundle);
    assert_eq!(args.format, Some(ModuleFormat::Iife));
    assert_eq!(args.define.get("DEBUG").map(|s| s.as_str()), Some("false"));
    assert!(args.external.contains("fs"));
    assert!(args.minify.identifiers && !args.minify.whitespace);
  }

  #[test]
  fn rejects_conflicting_outputs() {
    let err = parse_args(&strings(&[
      "a.js",
      "--outfile=x.js",
      "--outdir=dist",
    ]))
    .unwrap_err();
    assert_eq!(err.kind.code(), "INVALID_OPTIONS");
  }

  #[test]
  fn rejects_splitting_without_esm() {
    let err = parse_args(&strings(&["a.js", "--splitting", "--format=cjs"])).unwrap_err();
    assert_eq!(err.kind.code(), "INVALID_OPTIONS");
  }

  #[test]
  fn rejects_unknown_flags() {
    let err = parse_args(&strings(&["a.js", "--wat"])).unwrap_err();
    assert!(err.to_string().contains("Invalid flag"));
  }

  #[test]
  fn sourcemap_modes() {
    let args = parse_args(&strings(&["a.js", "--sourcemap=inline"])).unwrap();
    assert_eq!(args.sourcemap, SourceMapMode::Inline);
    let err = parse_args(&strings(&["a.js", "--sourcemap"])).unwrap_err();
    assert!(err.to_string().contains("output path"));
  }
}
