use std::fmt::Display;

use crate::{ErrorKind, Location};

#[derive(Debug)]
pub struct Error {
  contexts: Vec<String>,
  pub kind: ErrorKind,
}

impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    self.kind.to_string().eq(&other.kind.to_string())
  }
}

impl Eq for Error {}

impl Error {
  fn with_kind(kind: ErrorKind) -> Self {
    Self {
      contexts: vec![],
      kind,
    }
  }

  pub fn context(mut self, context: String) -> Self {
    self.contexts.push(context);
    self
  }

  pub fn unresolved_entry(unresolved_id: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::UnresolvedEntry {
      unresolved_id: unresolved_id.into(),
    })
  }

  pub fn entry_cannot_be_external(id: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::ExternalEntry { id: id.into() })
  }

  pub fn unresolved_import(
    specifier: impl Into<String>,
    importer: impl Into<String>,
    location: Option<Location>,
  ) -> Self {
    Self::with_kind(ErrorKind::UnresolvedImport {
      specifier: specifier.into(),
      importer: importer.into(),
      location,
    })
  }

  pub fn missing_export(
    missing_export: &str,
    importer: impl Into<String>,
    importee: impl Into<String>,
    location: Option<Location>,
  ) -> Self {
    Self::with_kind(ErrorKind::MissingExport {
      importer: importer.into(),
      importee: importee.into(),
      missing_export: missing_export.to_string(),
      location,
    })
  }

  pub fn ambiguous_external_namespaces(
    binding: String,
    reexporting_module: String,
    used_module: String,
    sources: Vec<String>,
  ) -> Self {
    Self::with_kind(ErrorKind::AmbiguousExternalNamespaces {
      reexporting_module,
      used_module,
      binding,
      sources,
    })
  }

  pub fn circular_dependency(circular_path: Vec<String>) -> Self {
    Self::with_kind(ErrorKind::CircularDependency(circular_path))
  }

  pub fn mixed_module_cycle(module: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::MixedModuleCycle {
      module: module.into(),
    })
  }

  pub fn invalid_options(message: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::InvalidOptions {
      message: message.into(),
    })
  }

  pub fn parse_failed(
    path: impl Into<String>,
    message: impl Into<String>,
    location: Option<Location>,
  ) -> Self {
    Self::with_kind(ErrorKind::ParseFailed {
      path: path.into(),
      message: message.into(),
      location,
    })
  }

  pub fn io_error(e: std::io::Error) -> Self {
    Self::with_kind(ErrorKind::IoError(e))
  }

  pub fn panic(msg: impl Into<String>) -> Self {
    anyhow::format_err!(msg.into()).into()
  }
}

impl From<anyhow::Error> for Error {
  fn from(value: anyhow::Error) -> Self {
    Self::with_kind(ErrorKind::Panic { source: value })
  }
}

impl From<std::io::Error> for Error {
  fn from(value: std::io::Error) -> Self {
    Self::io_error(value)
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match &self.kind {
      ErrorKind::Panic { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for ctx in self.contexts.iter().rev() {
      writeln!(f, "{}: {}", ansi_term::Color::Yellow.paint("context"), ctx)?;
    }

    self.kind.fmt(f)
  }
}
