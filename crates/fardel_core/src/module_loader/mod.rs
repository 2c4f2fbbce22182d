use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use fardel_common::{ModuleId, ModulePath, SymbolKind};
use fardel_error::Errors;
use fardel_resolver::{ResolveOptions, Resolver, TsConfig};
use fardel_syntax::ast::Expr;
use fardel_syntax::Parser;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::instrument;

pub(crate) mod module_task;

use module_task::{ModuleTask, ResolvedTarget, TaskResult};

use crate::{
  BuildError, BuildResult, ExternalModule, Graph, InputItem, InputOptions, NormOrExt,
  NormalModule, SharedBuildPluginDriver, UnaryBuildResult,
};

pub(crate) struct ModuleLoader<'a> {
  graph: &'a mut Graph,
  input_options: &'a InputOptions,
  plugin_driver: SharedBuildPluginDriver,
  resolver: Arc<Resolver>,
  defines: Arc<FxHashMap<String, Expr>>,
  pure_functions: Arc<FxHashSet<String>>,
  tx: tokio::sync::mpsc::UnboundedSender<Msg>,
  rx: tokio::sync::mpsc::UnboundedReceiver<Msg>,
  remaining_tasks: usize,
  /// (path, namespace) -> arena slot, for normal modules.
  seen: FxHashMap<ModulePath, ModuleId>,
  /// specifier -> arena slot, for externals.
  seen_external: FxHashMap<String, ModuleId>,
  /// Normal module ids in spawn order; results are applied in this order so
  /// discovery stays deterministic no matter how tasks finish.
  handle_queue: VecDeque<ModuleId>,
  pending: FxHashMap<ModuleId, UnaryBuildResult<TaskResult>>,
  slots: Vec<Option<NormOrExt>>,
  dynamic_imported: FxHashSet<ModuleId>,
  errors: Vec<BuildError>,
}

#[derive(Debug)]
pub(crate) enum Msg {
  Scanned(Box<TaskResult>),
  Error(ModuleId, BuildError),
}

impl<'a> ModuleLoader<'a> {
  pub(crate) fn new(
    graph: &'a mut Graph,
    plugin_driver: SharedBuildPluginDriver,
    input_options: &'a InputOptions,
  ) -> Self {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Msg>();

    let mut resolve_options = ResolveOptions::default();
    if let Some(extensions) = &input_options.resolve_extensions {
      resolve_options.extensions = extensions.clone();
    }
    if let Some(main_fields) = &input_options.main_fields {
      resolve_options.main_fields = main_fields.clone();
    }
    if let Some(amd) = &input_options.amd_config {
      resolve_options.amd = Some(amd.clone());
    }
    if let Some(tsconfig_path) = &input_options.tsconfig {
      match TsConfig::read(input_options.fs.as_ref(), tsconfig_path) {
        Ok(tsconfig) => resolve_options.tsconfig_paths = tsconfig.paths,
        Err(err) => (input_options.on_warn)(err),
      }
    }
    let resolver = Arc::new(Resolver::new(
      input_options.cwd.clone(),
      input_options.fs.clone(),
      resolve_options,
    ));

    let defines = input_options
      .define
      .iter()
      .filter_map(|(key, value)| {
        match Parser::parse_expr_source("<define>", value) {
          Ok(expr) => Some((key.clone(), expr)),
          Err(err) => {
            (input_options.on_warn)(
              err.context(format!("Invalid define value for \"{key}\"")),
            );
            None
          }
        }
      })
      .collect::<FxHashMap<_, _>>();

    Self {
      graph,
      input_options,
      plugin_driver,
      resolver,
      defines: Arc::new(defines),
      pure_functions: Arc::new(input_options.pure_functions.clone()),
      tx,
      rx,
      remaining_tasks: 0,
      seen: Default::default(),
      seen_external: Default::default(),
      handle_queue: Default::default(),
      pending: Default::default(),
      slots: Default::default(),
      dynamic_imported: Default::default(),
      errors: Default::default(),
    }
  }

  fn alloc_slot(&mut self) -> ModuleId {
    let id = ModuleId::new(self.slots.len() as u32);
    self.slots.push(None);
    id
  }

  fn spawn_module_task(&mut self, id: ModuleId, path: ModulePath, is_entry: bool, is_injected: bool, side_effects: bool) {
    tracing::trace!("spawning module task for {}", path);
    self.remaining_tasks += 1;
    self.handle_queue.push_back(id);
    let task = ModuleTask {
      id,
      path,
      is_user_defined_entry: is_entry,
      is_injected,
      side_effects,
      tx: self.tx.clone(),
      resolver: self.resolver.clone(),
      plugin_driver: self.plugin_driver.clone(),
      fs: self.input_options.fs.clone(),
      defines: self.defines.clone(),
      pure_functions: self.pure_functions.clone(),
      loaders: self.input_options.loaders.clone(),
      external: self.input_options.external.clone(),
    };
    tokio::spawn(task.run());
  }

  fn ensure_external(&mut self, specifier: &str) -> ModuleId {
    if let Some(&id) = self.seen_external.get(specifier) {
      return id;
    }
    let id = self.alloc_slot();
    self.seen_external.insert(specifier.to_string(), id);
    self.slots[id.index()] = Some(NormOrExt::External(ExternalModule::new(id, specifier)));
    id
  }

  fn resolve_entry(&self, specifier: &str) -> UnaryBuildResult<ModulePath> {
    let resolved = self
      .resolver
      .resolve(None, specifier)
      .map_err(|e| e.context(format!("Resolve entry {specifier}")))?;
    match resolved {
      Some(found) => Ok(ModulePath::new(found.path, found.namespace)),
      None => {
        if self.input_options.external.contains(specifier) {
          Err(BuildError::entry_cannot_be_external(specifier))
        } else {
          Err(BuildError::unresolved_entry(specifier))
        }
      }
    }
  }

  #[instrument(skip_all)]
  pub(crate) async fn fetch_all_modules(mut self) -> BuildResult<()> {
    if self.input_options.input.is_empty() {
      return Err(Errors::from(BuildError::panic(
        "You must supply at least one entry point".to_string(),
      )));
    }

    // Entries claim the first arena slots in input order, so the first
    // entry point is always module 0. Injected modules follow.
    let inputs: Vec<InputItem> = self.input_options.input.clone();
    let mut entry_paths = vec![];
    for item in &inputs {
      match self.resolve_entry(&item.import) {
        Ok(path) => entry_paths.push(Some(path)),
        Err(err) => {
          entry_paths.push(None);
          self.errors.push(err);
        }
      }
    }
    let inject: Vec<String> = self.input_options.inject.clone();
    let mut inject_paths = vec![];
    for path in &inject {
      match self.resolve_entry(path) {
        Ok(path) => inject_paths.push(Some(path)),
        Err(err) => {
          inject_paths.push(None);
          self.errors.push(err);
        }
      }
    }

    for path in entry_paths.into_iter().flatten() {
      if let Some(&id) = self.seen.get(&path) {
        self.graph.entries.push(id);
        continue;
      }
      let id = self.alloc_slot();
      self.seen.insert(path.clone(), id);
      self.graph.entries.push(id);
      self.spawn_module_task(id, path, true, false, true);
    }
    for path in inject_paths.into_iter().flatten() {
      if let Some(&id) = self.seen.get(&path) {
        self.graph.injected.push(id);
        continue;
      }
      let id = self.alloc_slot();
      self.seen.insert(path.clone(), id);
      self.graph.injected.push(id);
      self.spawn_module_task(id, path, false, true, true);
    }

    while self.remaining_tasks > 0 {
      let msg = self.rx.recv().await.expect("sender alive while tasks run");
      match msg {
        Msg::Scanned(result) => {
          self.remaining_tasks -= 1;
          self.pending.insert(result.id, Ok(*result));
        }
        Msg::Error(id, err) => {
          self.remaining_tasks -= 1;
          self.pending.insert(id, Err(err));
        }
      }
      self.drain_ready();
    }
    self.drain_ready();
    debug_assert!(self.handle_queue.is_empty() || !self.errors.is_empty());

    for id in std::mem::take(&mut self.dynamic_imported) {
      if let Some(NormOrExt::Normal(module)) = &mut self.slots[id.index()] {
        module.is_dynamic_entry = true;
      }
    }

    if !self.errors.is_empty() {
      return Err(Errors::from_vec(std::mem::take(&mut self.errors)));
    }

    self.graph.modules = self
      .slots
      .into_iter()
      .map(|slot| slot.expect("all arena slots filled"))
      .collect();
    Ok(())
  }

  /// Apply finished tasks in spawn order; this is the only place that
  /// allocates ids for children, so discovery order is deterministic.
  fn drain_ready(&mut self) {
    while let Some(&next) = self.handle_queue.front() {
      let Some(result) = self.pending.remove(&next) else {
        break;
      };
      self.handle_queue.pop_front();
      match result {
        Ok(result) => self.handle_task_result(result),
        Err(err) => self.errors.push(err),
      }
    }
  }

  fn handle_task_result(&mut self, mut result: TaskResult) {
    let mut dependencies = vec![];
    let mut dyn_dependencies = vec![];
    let mut by_specifier: FxHashMap<String, ModuleId> = FxHashMap::default();

    for (specifier, target) in &result.resolved {
      let target_id = match target {
        ResolvedTarget::Normal { path, side_effects } => {
          if let Some(&id) = self.seen.get(path) {
            id
          } else {
            let id = self.alloc_slot();
            self.seen.insert(path.clone(), id);
            self.spawn_module_task(id, path.clone(), false, false, *side_effects);
            id
          }
        }
        ResolvedTarget::External { specifier } => self.ensure_external(specifier),
      };
      by_specifier.insert(specifier.clone(), target_id);
    }

    for record in &mut result.scan.import_records {
      let Some(&target) = by_specifier.get(&record.specifier) else {
        continue;
      };
      record.resolved = Some(target);
      let is_external = self.slots[target.index()]
        .as_ref()
        .map(|m| m.is_external())
        .unwrap_or(false);
      if record.is_dynamic_import {
        if !is_external && !dyn_dependencies.contains(&target) {
          dyn_dependencies.push(target);
        }
        if !is_external {
          self.dynamic_imported.insert(target);
        }
      } else if !is_external && !dependencies.contains(&target) {
        dependencies.push(target);
      }
    }

    let source_hash = {
      use std::hash::{Hash, Hasher};
      let mut hasher = std::collections::hash_map::DefaultHasher::new();
      result.source.hash(&mut hasher);
      hasher.finish()
    };

    let mut module = NormalModule {
      exec_order: usize::MAX,
      id: result.id,
      path: result.path,
      source: result.source,
      source_hash,
      loader: result.loader,
      ast: result.ast,
      symbols: result.scan.symbols,
      import_records: result.scan.import_records,
      export_records: result.scan.export_records,
      star_exports: result.scan.star_exports,
      parts: result.scan.parts,
      declared_to_parts: Default::default(),
      export_kind: result.scan.export_kind,
      is_user_defined_entry: result.is_user_defined_entry,
      is_dynamic_entry: false,
      is_injected: result.is_injected,
      must_wrap: false,
      wrapped_included: false,
      has_side_effects: result.side_effects,
      dependencies,
      dyn_dependencies,
      referenced_by: Default::default(),
      linked_exports: Default::default(),
      ambiguous_exports: Default::default(),
      external_star_records: Default::default(),
      visited_global_names: result.scan.visited_global_names,
      declared_scoped_names: result.scan.declared_scoped_names,
      is_namespace_referenced: false,
      namespace_part: None,
      interop_ns: Default::default(),
      file_asset: result.file_asset,
    };
    module.rebuild_declared_to_parts();

    // Imported bindings that never resolved keep Unbound semantics.
    debug_assert!(module
      .symbols
      .iter()
      .all(|(_, data)| data.kind != SymbolKind::Namespace || data.link.is_none()));

    self.slots[result.id.index()] = Some(NormOrExt::Normal(module));
  }
}

pub(crate) fn entry_name(path: &ModulePath, cwd: &PathBuf) -> String {
  use sugar_path::{AsPath, SugarPath};
  let relative = path.path.as_path().relative(cwd.as_path());
  let stem = relative
    .file_stem()
    .map(|s| s.to_string_lossy().to_string())
    .unwrap_or_else(|| "entry".to_string());
  stem
}
