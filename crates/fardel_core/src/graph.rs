use fardel_common::{ModuleId, SymbolData, SymbolRef};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_loader::ModuleLoader;
use crate::{linker, BuildResult, InputOptions, NormOrExt, SharedBuildPluginDriver};

/// The import graph: a module arena indexed by `ModuleId` plus everything
/// the later phases tag onto it. Append-only while the loader runs, then
/// mutated by the single-threaded linker and tree-shaker.
#[derive(Debug)]
pub struct Graph {
  /// User-defined entries, in input order.
  pub entries: Vec<ModuleId>,
  /// `--inject` modules; they execute ahead of the entries.
  pub injected: Vec<ModuleId>,
  pub modules: Vec<NormOrExt>,
  pub warnings: Vec<crate::BuildError>,
  /// Live symbols after tree shaking.
  pub used_symbols: FxHashSet<SymbolRef>,
  /// Better output names for anonymous default exports and namespace
  /// objects, keyed by the canonical symbol.
  pub suggested_names: FxHashMap<SymbolRef, String>,
}

impl Graph {
  pub(crate) fn new() -> Self {
    Self {
      entries: Default::default(),
      injected: Default::default(),
      modules: Default::default(),
      warnings: Default::default(),
      used_symbols: Default::default(),
      suggested_names: Default::default(),
    }
  }

  pub fn module(&self, id: ModuleId) -> &NormOrExt {
    &self.modules[id.index()]
  }

  pub(crate) fn module_mut(&mut self, id: ModuleId) -> &mut NormOrExt {
    &mut self.modules[id.index()]
  }

  pub fn symbol_data(&self, sym: SymbolRef) -> &SymbolData {
    self.module(sym.module).symbol(sym)
  }

  pub(crate) fn symbol_data_mut(&mut self, sym: SymbolRef) -> &mut SymbolData {
    match self.module_mut(sym.module) {
      NormOrExt::Normal(module) => module.symbols.get_mut(sym.index),
      NormOrExt::External(module) => module.symbols.get_mut(sym.index),
    }
  }

  /// Follow `link` redirects to the symbol that actually gets printed.
  /// Cycles collapse to the longest non-cyclic prefix.
  pub fn canonical(&self, sym: SymbolRef) -> SymbolRef {
    let mut current = sym;
    let mut visited = FxHashSet::default();
    visited.insert(current);
    while let Some(next) = self.symbol_data(current).link {
      if !visited.insert(next) {
        break;
      }
      current = next;
    }
    current
  }

  /// Distinct mutable borrows of two arena slots.
  pub(crate) fn two_modules_mut(
    &mut self,
    a: ModuleId,
    b: ModuleId,
  ) -> (&mut NormOrExt, &mut NormOrExt) {
    assert_ne!(a, b);
    let (ai, bi) = (a.index(), b.index());
    if ai < bi {
      let (left, right) = self.modules.split_at_mut(bi);
      (&mut left[ai], &mut right[0])
    } else {
      let (left, right) = self.modules.split_at_mut(ai);
      (&mut right[0], &mut left[bi])
    }
  }

  /// Execution order: depth-first over static imports, children before the
  /// parent, dynamic entries appended after everything reachable statically.
  #[tracing::instrument(skip_all)]
  pub(crate) fn sort_modules(&mut self) {
    enum Action {
      Enter,
      Exit,
    }
    let roots: Vec<ModuleId> = self
      .injected
      .iter()
      .chain(self.entries.iter())
      .copied()
      .collect();
    let mut queue: Vec<(Action, ModuleId)> = roots
      .iter()
      .rev()
      .map(|id| (Action::Enter, *id))
      .collect();

    let mut entered: FxHashSet<ModuleId> = FxHashSet::default();
    let mut next_exec_order = 0usize;
    let mut dynamic_entries: Vec<(Action, ModuleId)> = vec![];

    let mut walk = |queue: &mut Vec<(Action, ModuleId)>,
                    mut dynamic_entries: Option<&mut Vec<(Action, ModuleId)>>,
                    entered: &mut FxHashSet<ModuleId>,
                    next_exec_order: &mut usize| {
      while let Some((action, id)) = queue.pop() {
        match action {
          Action::Enter => {
            if entered.insert(id) {
              queue.push((Action::Exit, id));
              let module = &self.modules[id.index()];
              for dep in module.dependencies().iter().rev() {
                if !entered.contains(dep) {
                  queue.push((Action::Enter, *dep));
                }
              }
              if let Some(dynamic_entries) = dynamic_entries.as_mut() {
                for dep in module.dynamic_dependencies() {
                  if !entered.contains(dep) {
                    dynamic_entries.push((Action::Enter, *dep));
                  }
                }
              }
            }
          }
          Action::Exit => {
            self.modules[id.index()].set_exec_order(*next_exec_order);
            *next_exec_order += 1;
          }
        }
      }
    };

    walk(
      &mut queue,
      Some(&mut dynamic_entries),
      &mut entered,
      &mut next_exec_order,
    );
    dynamic_entries.reverse();
    walk(&mut dynamic_entries, None, &mut entered, &mut next_exec_order);
  }

  pub(crate) async fn build(
    &mut self,
    input_options: &InputOptions,
    plugin_driver: SharedBuildPluginDriver,
  ) -> BuildResult<()> {
    ModuleLoader::new(self, plugin_driver, input_options)
      .fetch_all_modules()
      .await?;

    self.sort_modules();
    linker::link(self)?;
    tracing::debug!("link done, modules: {}", self.modules.len());

    if input_options.treeshake {
      crate::treeshake::treeshake(self);
    } else {
      crate::treeshake::include_everything(self);
    }
    Ok(())
  }
}
