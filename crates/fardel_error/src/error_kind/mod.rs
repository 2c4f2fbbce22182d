use std::fmt::Display;

use crate::utils::format_quoted_strings;
use crate::Location;

pub mod error_code;

#[derive(Debug)]
pub enum ErrorKind {
  // --- Aligned with the usual bundler surface
  UnresolvedEntry {
    unresolved_id: String,
  },
  ExternalEntry {
    id: String,
  },
  UnresolvedImport {
    specifier: String,
    importer: String,
    location: Option<Location>,
  },
  MissingExport {
    importer: String,
    importee: String,
    missing_export: String,
    location: Option<Location>,
  },
  AmbiguousExternalNamespaces {
    reexporting_module: String,
    used_module: String,
    binding: String,
    sources: Vec<String>,
  },
  CircularDependency(Vec<String>),
  MixedModuleCycle {
    module: String,
  },

  // --- Reported before any file work
  InvalidOptions {
    message: String,
  },

  ParseFailed {
    path: String,
    message: String,
    location: Option<Location>,
  },

  /// Unrecoverable failure; also used to surface plain plugin `throw`s.
  Panic {
    source: anyhow::Error,
  },

  IoError(std::io::Error),
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ErrorKind::UnresolvedEntry { unresolved_id } => {
        write!(f, "Could not resolve entry module \"{unresolved_id}\"")
      }
      ErrorKind::ExternalEntry { id } => {
        write!(f, "Entry module \"{id}\" cannot be external.")
      }
      ErrorKind::UnresolvedImport {
        specifier,
        importer,
        ..
      } => write!(
        f,
        "Could not resolve \"{specifier}\" from \"{importer}\""
      ),
      ErrorKind::MissingExport {
        missing_export,
        importee,
        importer,
        ..
      } => write!(
        f,
        r#""{missing_export}" is not exported by "{importee}", imported by "{importer}"."#
      ),
      ErrorKind::AmbiguousExternalNamespaces {
        binding,
        reexporting_module,
        used_module,
        sources,
      } => write!(
        f,
        "Ambiguous external namespace resolution: \"{reexporting_module}\" re-exports \"{binding}\" from one of the external modules {}, guessing \"{used_module}\".",
        format_quoted_strings(sources),
      ),
      ErrorKind::CircularDependency(path) => {
        write!(f, "Circular dependency: {}", path.join(" -> "))
      }
      ErrorKind::MixedModuleCycle { module } => write!(
        f,
        "Module \"{module}\" participates in an import cycle mixing CommonJS and ES modules; its namespace may be observed before it is fully populated."
      ),
      ErrorKind::InvalidOptions { message } => write!(f, "{message}"),
      ErrorKind::ParseFailed { path, message, .. } => {
        write!(f, "Parse error in {path}: {message}")
      }
      ErrorKind::Panic { source } => source.fmt(f),
      ErrorKind::IoError(e) => e.fmt(f),
    }
  }
}

impl ErrorKind {
  pub fn code(&self) -> &'static str {
    match self {
      ErrorKind::UnresolvedEntry { .. } => error_code::UNRESOLVED_ENTRY,
      ErrorKind::ExternalEntry { .. } => error_code::UNRESOLVED_ENTRY,
      ErrorKind::UnresolvedImport { .. } => error_code::UNRESOLVED_IMPORT,
      ErrorKind::MissingExport { .. } => error_code::MISSING_EXPORT,
      ErrorKind::AmbiguousExternalNamespaces { .. } => error_code::AMBIGUOUS_EXTERNAL_NAMESPACES,
      ErrorKind::CircularDependency(_) => error_code::CIRCULAR_DEPENDENCY,
      ErrorKind::MixedModuleCycle { .. } => error_code::MIXED_MODULE_CYCLE,
      ErrorKind::InvalidOptions { .. } => error_code::INVALID_OPTIONS,
      ErrorKind::ParseFailed { .. } => error_code::PARSE_ERROR,
      ErrorKind::Panic { .. } => error_code::PANIC,
      ErrorKind::IoError(_) => error_code::IO_ERROR,
    }
  }

  pub fn location(&self) -> Option<&Location> {
    match self {
      ErrorKind::UnresolvedImport { location, .. }
      | ErrorKind::MissingExport { location, .. }
      | ErrorKind::ParseFailed { location, .. } => location.as_ref(),
      _ => None,
    }
  }
}
