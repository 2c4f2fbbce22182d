//! Build metadata JSON, the `analyse` command / `--metafile` payload:
//! every input with its imports, every output with the bytes each input
//! contributed.

use fardel_common::{ImportKind, ModuleId};
use serde::Serialize;
use sugar_path::{AsPath, SugarPath};

use crate::{Chunk, Graph, InputOptions, NormOrExt};

#[derive(Debug, Default, Serialize)]
pub struct Metafile {
  pub inputs: indexmap::Map<MetaInput>,
  pub outputs: indexmap::Map<MetaOutput>,
}

/// Small insertion-ordered string map so the JSON is deterministic.
pub mod indexmap {
  use serde::ser::SerializeMap;
  use serde::Serialize;

  #[derive(Debug)]
  pub struct Map<V> {
    entries: Vec<(String, V)>,
  }

  impl<V> Default for Map<V> {
    fn default() -> Self {
      Self { entries: vec![] }
    }
  }

  impl<V> Map<V> {
    pub fn insert(&mut self, key: String, value: V) {
      self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
      self
        .entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
      self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
      self.entries.is_empty()
    }
  }

  impl<V: Serialize> Serialize for Map<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      let mut map = serializer.serialize_map(Some(self.entries.len()))?;
      for (key, value) in &self.entries {
        map.serialize_entry(key, value)?;
      }
      map.end()
    }
  }
}

#[derive(Debug, Serialize)]
pub struct MetaInput {
  pub bytes: usize,
  pub imports: Vec<MetaImport>,
}

#[derive(Debug, Serialize)]
pub struct MetaImport {
  pub path: String,
  pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct MetaOutput {
  pub bytes: usize,
  #[serde(rename = "entryPoint", skip_serializing_if = "Option::is_none")]
  pub entry_point: Option<String>,
  pub inputs: indexmap::Map<MetaOutputInput>,
  pub imports: Vec<MetaImport>,
}

#[derive(Debug, Serialize)]
pub struct MetaOutputInput {
  #[serde(rename = "bytesInOutput")]
  pub bytes_in_output: usize,
}

fn relative_path(path: &str, options: &InputOptions) -> String {
  path
    .as_path()
    .relative(options.cwd.as_path())
    .to_string_lossy()
    .to_string()
}

fn import_kind(record_kind: ImportKind, is_require: bool, is_dynamic: bool) -> &'static str {
  if is_require {
    "require-call"
  } else if is_dynamic {
    "dynamic-import"
  } else {
    match record_kind {
      ImportKind::ExportStar => "export-star",
      _ => "import-statement",
    }
  }
}

impl Metafile {
  pub fn from_graph(graph: &Graph, options: &InputOptions) -> Self {
    let mut metafile = Metafile::default();
    for module in &graph.modules {
      let NormOrExt::Normal(module) = module else {
        continue;
      };
      let mut imports = vec![];
      for record in &module.import_records {
        let path = match record.resolved {
          Some(target) => match graph.module(target) {
            NormOrExt::Normal(target_module) => relative_path(&target_module.path.path, options),
            NormOrExt::External(external) => external.path.path.clone(),
          },
          None => record.specifier.clone(),
        };
        imports.push(MetaImport {
          path,
          kind: import_kind(record.kind, record.is_require, record.is_dynamic_import)
            .to_string(),
        });
      }
      metafile.inputs.insert(
        relative_path(&module.path.path, options),
        MetaInput {
          bytes: module.source.len(),
          imports,
        },
      );
    }
    metafile
  }

  pub fn add_output(
    &mut self,
    filename: &str,
    bytes: usize,
    chunk: &Chunk,
    graph: &Graph,
    options: &InputOptions,
    input_sizes: &[(ModuleId, usize)],
  ) {
    let mut inputs = indexmap::Map::default();
    for (id, size) in input_sizes {
      if let NormOrExt::Normal(module) = graph.module(*id) {
        inputs.insert(
          relative_path(&module.path.path, options),
          MetaOutputInput {
            bytes_in_output: *size,
          },
        );
      }
    }

    let mut imports = vec![];
    for &id in &chunk.modules {
      if let NormOrExt::Normal(module) = graph.module(id) {
        if !module.is_included() {
          continue;
        }
        for record in &module.import_records {
          if let Some(target) = record.resolved {
            if let NormOrExt::External(external) = graph.module(target) {
              let path = external.path.path.clone();
              if !imports.iter().any(|i: &MetaImport| i.path == path) {
                imports.push(MetaImport {
                  path,
                  kind: import_kind(record.kind, record.is_require, record.is_dynamic_import)
                    .to_string(),
                });
              }
            }
          }
        }
      }
    }

    let entry_point = chunk.entry.and_then(|entry| {
      graph
        .module(entry)
        .as_norm()
        .map(|module| relative_path(&module.path.path, options))
    });

    self.outputs.insert(
      filename.to_string(),
      MetaOutput {
        bytes,
        entry_point,
        inputs,
        imports,
      },
    );
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string_pretty(self).expect("metafile serialization cannot fail")
  }
}
