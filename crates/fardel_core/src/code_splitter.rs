//! Chunk planning. Single-bundle mode gives every entry its full reachable
//! set (shared modules are duplicated). Split mode (ESM only) moves inlined
//! modules reachable from two or more entries into one synthesized shared
//! chunk that the entry chunks import. Wrapped modules stay with their
//! entries so each chunk's registry remains self-contained.

use fardel_common::{ChunkId, ModuleId};
use hashlink::LinkedHashSet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_loader::entry_name;
use crate::{Chunk, ChunkGraph, Graph, InputOptions, NormOrExt, OutputOptions};

pub(crate) struct CodeSplitter<'a> {
  graph: &'a Graph,
  input_options: &'a InputOptions,
  output_options: &'a OutputOptions,
}

impl<'a> CodeSplitter<'a> {
  pub(crate) fn new(
    graph: &'a Graph,
    input_options: &'a InputOptions,
    output_options: &'a OutputOptions,
  ) -> Self {
    Self {
      graph,
      input_options,
      output_options,
    }
  }

  /// Static and dynamic edges alike, stopping at externals.
  fn reachable_from(&self, entry: ModuleId) -> LinkedHashSet<ModuleId> {
    let mut visited: LinkedHashSet<ModuleId> = LinkedHashSet::new();
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
      if visited.contains(&id) {
        continue;
      }
      visited.insert(id);
      let module = self.graph.module(id);
      for dep in module
        .dependencies()
        .iter()
        .chain(module.dynamic_dependencies())
      {
        if !self.graph.module(*dep).is_external() && !visited.contains(dep) {
          stack.push(*dep);
        }
      }
    }
    visited
  }

  fn entry_roots(&self) -> Vec<ModuleId> {
    let mut roots: Vec<ModuleId> = self.graph.entries.clone();
    // injected modules ride along with the first entry's chunk
    roots.dedup();
    roots
  }

  pub(crate) fn split(self) -> ChunkGraph {
    let mut chunk_graph = ChunkGraph::default();
    let roots = self.entry_roots();

    let mut used_names: FxHashSet<String> = FxHashSet::default();
    let mut unique_name = |base: String| {
      let mut name = base.clone();
      let mut counter = 1;
      while !used_names.insert(name.clone()) {
        counter += 1;
        name = format!("{base}{counter}");
      }
      name
    };

    let mut reachable_sets: Vec<(ModuleId, LinkedHashSet<ModuleId>)> = roots
      .iter()
      .map(|&entry| {
        let mut set = self.reachable_from(entry);
        for &injected in &self.graph.injected {
          for id in self.reachable_from(injected) {
            set.insert(id);
          }
        }
        (entry, set)
      })
      .collect();

    if self.output_options.splitting && roots.len() > 1 {
      // modules living in >= 2 entry chunks move to the shared chunk,
      // wrapped modules excepted
      let mut counts: FxHashMap<ModuleId, usize> = FxHashMap::default();
      for (_, set) in &reachable_sets {
        for id in set {
          *counts.entry(*id).or_default() += 1;
        }
      }
      let shared: FxHashSet<ModuleId> = counts
        .iter()
        .filter(|(id, count)| {
          **count >= 2
            && matches!(
              self.graph.module(**id),
              NormOrExt::Normal(module) if !module.must_wrap
            )
        })
        .map(|(id, _)| *id)
        .collect();

      if !shared.is_empty() {
        let mut shared_modules: Vec<ModuleId> = shared.iter().copied().collect();
        shared_modules.sort_unstable();
        let chunk_id = ChunkId::new(chunk_graph.chunks.len() as u32);
        let name = unique_name("shared".to_string());
        for id in &shared_modules {
          chunk_graph.module_to_chunk.insert(*id, chunk_id);
        }
        chunk_graph.chunks.push(Chunk::new(
          chunk_id,
          name,
          None,
          shared_modules,
          false,
        ));
        for (_, set) in &mut reachable_sets {
          let kept: LinkedHashSet<ModuleId> = set
            .iter()
            .copied()
            .filter(|id| !shared.contains(id))
            .collect();
          *set = kept;
        }
      }
    }

    for (entry, set) in reachable_sets {
      let chunk_id = ChunkId::new(chunk_graph.chunks.len() as u32);
      let name = unique_name(entry_name(
        self.graph.module(entry).path(),
        &self.input_options.cwd,
      ));
      let mut modules: Vec<ModuleId> = set.into_iter().collect();
      modules.sort_unstable();
      for id in &modules {
        chunk_graph.module_to_chunk.entry(*id).or_insert(chunk_id);
      }
      chunk_graph
        .chunks
        .push(Chunk::new(chunk_id, name, Some(entry), modules, true));
    }

    chunk_graph
  }
}
