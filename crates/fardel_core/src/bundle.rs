//! Drives chunk planning, renaming, and rendering into output assets.

use fardel_common::{ChunkId, ModuleId, SymbolRef};
use itertools::Itertools;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::renamer::{assign_names, RenamerInput};
use crate::{
  Asset, BuildResult, Chunk, ChunkGraph, CodeSplitter, Graph, InputOptions, Metafile,
  NormOrExt, OutputOptions, RenderChunkContext, SourceMapMode,
};

pub struct Bundle<'a> {
  pub input_options: &'a InputOptions,
  pub output_options: &'a OutputOptions,
  pub graph: &'a Graph,
}

impl<'a> Bundle<'a> {
  pub fn new(
    input_options: &'a InputOptions,
    output_options: &'a OutputOptions,
    graph: &'a Graph,
  ) -> Self {
    Self {
      input_options,
      output_options,
      graph,
    }
  }

  pub fn generate(&mut self) -> BuildResult<Vec<Asset>> {
    self.output_options.validate()?;

    let mut chunk_graph =
      CodeSplitter::new(self.graph, self.input_options, self.output_options).split();
    for chunk in &mut chunk_graph.chunks {
      chunk.gen_file_name(self.output_options);
    }
    let chunk_filenames: FxHashMap<ChunkId, String> = chunk_graph
      .chunks
      .iter()
      .map(|chunk| (chunk.id, chunk.filename.clone().expect("filename generated")))
      .collect();

    // Symbols each chunk needs from other chunks (code splitting).
    let foreign_requests = self.collect_foreign_requests(&chunk_graph);

    // Renaming runs shared-chunks-first so importers can reserve the names
    // their imports already received.
    let mut global_names: FxHashMap<SymbolRef, String> = FxHashMap::default();
    let mut names_by_chunk: Vec<FxHashMap<SymbolRef, String>> = vec![];
    let mut helpers_by_chunk = vec![];

    for (index, chunk) in chunk_graph.chunks.iter().enumerate() {
      let helpers = chunk.collect_helpers(self.graph, self.output_options);
      let mut helper_names: Vec<String> =
        helpers.used_names().iter().map(|s| s.to_string()).collect();
      helper_names.sort();

      let foreign_names: Vec<String> = foreign_requests[index]
        .iter()
        .copied()
        .sorted()
        .filter_map(|sym| global_names.get(&sym).cloned())
        .collect();

      let chunk_modules = self.chunk_module_ids(chunk);
      let names = assign_names(RenamerInput {
        graph: self.graph,
        modules: &chunk_modules,
        format: self.output_options.format,
        helper_names,
        foreign_names,
        minify_identifiers: self.output_options.minify.identifiers,
      });

      // Publish names of symbols owned by this chunk's normal modules.
      let owned: FxHashSet<ModuleId> = chunk.modules.iter().copied().collect();
      for (sym, name) in &names {
        if owned.contains(&sym.module) {
          global_names.insert(*sym, name.clone());
        }
      }
      names_by_chunk.push(names);
      helpers_by_chunk.push(helpers);
    }

    // Cross-chunk import/export lists with final names.
    let cross_imports_by_chunk =
      self.build_cross_imports(&chunk_graph, &foreign_requests, &global_names);
    let chunk_exports_by_chunk =
      self.build_chunk_exports(&chunk_graph, &foreign_requests, &global_names);

    let rendered: Vec<_> = chunk_graph
      .chunks
      .par_iter()
      .enumerate()
      .map(|(index, chunk)| {
        let cx = RenderChunkContext {
          graph: self.graph,
          input_options: self.input_options,
          output_options: self.output_options,
          helpers: &helpers_by_chunk[index],
          names: &names_by_chunk[index],
          global_names: &global_names,
          cross_imports: &cross_imports_by_chunk[index],
          chunk_exports: &chunk_exports_by_chunk[index],
          chunk_filenames: &chunk_filenames,
        };
        chunk.render(&cx).map(|rendered| (chunk, rendered))
      })
      .collect::<Result<Vec<_>, _>>()
      .map_err(fardel_error::Errors::from)?;

    let mut assets: Vec<Asset> = vec![];
    let mut metafile = self.output_options.metafile.then(|| Metafile::from_graph(self.graph, self.input_options));

    let mut ordered = rendered;
    ordered.sort_by(|(a, _), (b, _)| a.filename.cmp(&b.filename));

    for (chunk, mut rendered) in ordered {
      let filename = chunk.filename.clone().expect("filename generated");

      match self.output_options.sourcemap {
        SourceMapMode::None => {}
        mode => {
          if let Some(map) = rendered.map.take() {
            if mode.wants_inline() {
              rendered
                .code
                .push_str(&format!("//# sourceMappingURL={}\n", map.to_data_url()));
            }
            if mode.wants_file() {
              let map_name = format!("{filename}.map");
              rendered
                .code
                .push_str(&format!("//# sourceMappingURL={map_name}\n"));
              assets.push(Asset {
                filename: map_name,
                content: map.to_json().into_bytes(),
              });
            }
          }
        }
      }

      if let Some(metafile) = metafile.as_mut() {
        metafile.add_output(
          &filename,
          rendered.code.len(),
          chunk,
          self.graph,
          self.input_options,
          &rendered.input_sizes,
        );
      }

      assets.push(Asset {
        filename,
        content: rendered.code.into_bytes(),
      });
    }

    // `file`-loader payloads ride along as their own output files.
    for module in &self.graph.modules {
      if let NormOrExt::Normal(module) = module {
        if let Some((filename, bytes)) = &module.file_asset {
          if module.is_included() {
            assets.push(Asset {
              filename: filename.clone(),
              content: bytes.clone(),
            });
          }
        }
      }
    }

    if let Some(metafile) = metafile {
      assets.push(Asset {
        filename: "metafile.json".to_string(),
        content: metafile.to_json().into_bytes(),
      });
    }

    Ok(assets)
  }

  fn chunk_module_ids(&self, chunk: &Chunk) -> Vec<ModuleId> {
    let mut ids = chunk.modules.clone();
    // externals referenced by this chunk take part in renaming too
    let mut externals: Vec<ModuleId> = vec![];
    for &id in &chunk.modules {
      if let NormOrExt::Normal(module) = self.graph.module(id) {
        for record in &module.import_records {
          if let Some(target) = record.resolved {
            if self.graph.module(target).is_external() && !externals.contains(&target) {
              externals.push(target);
            }
          }
        }
        for &ext in &module.external_star_records {
          if !externals.contains(&ext) {
            externals.push(ext);
          }
        }
      }
    }
    externals.sort_unstable();
    ids.extend(externals);
    ids
  }

  /// Canonical symbols a chunk references but does not own.
  fn collect_foreign_requests(&self, chunk_graph: &ChunkGraph) -> Vec<FxHashSet<SymbolRef>> {
    chunk_graph
      .chunks
      .iter()
      .map(|chunk| {
        let owned: FxHashSet<ModuleId> = chunk.modules.iter().copied().collect();
        let mut foreign: FxHashSet<SymbolRef> = FxHashSet::default();
        let mut note = |sym: SymbolRef| {
          let canonical = self.graph.canonical(sym);
          if owned.contains(&canonical.module) {
            return;
          }
          if self.graph.module(canonical.module).is_external() {
            return;
          }
          if !self.graph.used_symbols.contains(&canonical) {
            return;
          }
          foreign.insert(canonical);
        };
        for &id in &chunk.modules {
          let NormOrExt::Normal(module) = self.graph.module(id) else {
            continue;
          };
          for part in &module.parts {
            if !part.included && !module.wrapped_included {
              continue;
            }
            for referenced in &part.referenced {
              let canonical = self.graph.canonical(*referenced);
              note(canonical);
              if let Some(alias) = &self.graph.symbol_data(canonical).namespace_alias {
                note(alias.namespace);
              }
            }
          }
        }
        if let Some(entry) = chunk.entry {
          if let NormOrExt::Normal(entry_module) = self.graph.module(entry) {
            for spec in entry_module.linked_exports.values() {
              note(spec.symbol);
            }
          }
        }
        foreign
      })
      .collect()
  }

  fn build_cross_imports(
    &self,
    chunk_graph: &ChunkGraph,
    foreign_requests: &[FxHashSet<SymbolRef>],
    global_names: &FxHashMap<SymbolRef, String>,
  ) -> Vec<Vec<(ChunkId, Vec<(SymbolRef, String)>)>> {
    chunk_graph
      .chunks
      .iter()
      .enumerate()
      .map(|(index, _)| {
        let mut by_chunk: FxHashMap<ChunkId, Vec<(SymbolRef, String)>> = FxHashMap::default();
        for sym in foreign_requests[index].iter().copied().sorted() {
          let Some(&owner_chunk) = chunk_graph.module_to_chunk.get(&sym.module) else {
            continue;
          };
          let Some(name) = global_names.get(&sym) else {
            continue;
          };
          by_chunk
            .entry(owner_chunk)
            .or_default()
            .push((sym, name.clone()));
        }
        let mut list: Vec<(ChunkId, Vec<(SymbolRef, String)>)> = by_chunk.into_iter().collect();
        list.sort_by_key(|(chunk, _)| *chunk);
        list
      })
      .collect()
  }

  fn build_chunk_exports(
    &self,
    chunk_graph: &ChunkGraph,
    foreign_requests: &[FxHashSet<SymbolRef>],
    global_names: &FxHashMap<SymbolRef, String>,
  ) -> Vec<Vec<(String, SymbolRef)>> {
    let mut exports: Vec<Vec<(String, SymbolRef)>> =
      vec![vec![]; chunk_graph.chunks.len()];

    if self.output_options.format.is_esm() {
      // entry chunks export their entry's namespace membership
      for (index, chunk) in chunk_graph.chunks.iter().enumerate() {
        let Some(entry) = chunk.entry else { continue };
        let NormOrExt::Normal(entry_module) = self.graph.module(entry) else {
          continue;
        };
        if entry_module.must_wrap {
          continue;
        }
        let mut list: Vec<(String, SymbolRef)> = entry_module
          .linked_exports
          .iter()
          .map(|(name, spec)| (name.clone(), spec.symbol))
          .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        exports[index] = list;
      }
    }

    // shared chunks export whatever other chunks request from them
    let mut requested_by_owner: FxHashMap<ChunkId, FxHashSet<SymbolRef>> = FxHashMap::default();
    for requests in foreign_requests {
      for sym in requests {
        if let Some(&owner) = chunk_graph.module_to_chunk.get(&sym.module) {
          requested_by_owner.entry(owner).or_default().insert(*sym);
        }
      }
    }
    for (index, chunk) in chunk_graph.chunks.iter().enumerate() {
      if chunk.entry.is_some() {
        continue;
      }
      let Some(requested) = requested_by_owner.get(&chunk.id) else {
        continue;
      };
      let mut list: Vec<(String, SymbolRef)> = requested
        .iter()
        .copied()
        .sorted()
        .filter_map(|sym| global_names.get(&sym).map(|name| (name.clone(), sym)))
        .collect();
      list.sort_by(|a, b| a.0.cmp(&b.0));
      exports[index] = list;
    }

    exports
  }
}
