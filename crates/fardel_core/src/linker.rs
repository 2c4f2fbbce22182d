//! Import/export linking, in four phases: interop classification, star
//! export flattening, named import resolution, and namespace
//! materialization. Runs single-threaded over the module arena once every
//! module is parsed.

use fardel_common::{
  ExportItem, ExportedSpecifier, ImportKind, Loc, ModuleId, NamespaceAlias, SymbolKind, SymbolRef,
  NAMESPACE_SYMBOL_INDEX,
};
use fardel_error::Errors;
use fardel_syntax::ast;
use fardel_syntax::StatementPart;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{BuildError, BuildResult, Graph, NormOrExt};

pub(crate) fn link(graph: &mut Graph) -> BuildResult<()> {
  let mut cx = Linker {
    graph,
    errors: vec![],
    export_state: vec![],
  };
  cx.export_state = vec![ExportState::NotStarted; cx.graph.modules.len()];

  cx.classify_modules();
  cx.resolve_all_exports();
  cx.resolve_imports();
  cx.relink_injected_globals();
  cx.materialize_namespaces();

  let errors = cx.errors;
  if errors.is_empty() {
    Ok(())
  } else {
    Err(Errors::from_vec(errors))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportState {
  NotStarted,
  InProgress,
  Done,
}

struct Linker<'g> {
  graph: &'g mut Graph,
  errors: Vec<BuildError>,
  export_state: Vec<ExportState>,
}

impl<'g> Linker<'g> {
  fn module_ids(&self) -> Vec<ModuleId> {
    (0..self.graph.modules.len())
      .map(|i| ModuleId::new(i as u32))
      .collect()
  }

  // --- phase A: classify modules, decide wrapping

  fn classify_modules(&mut self) {
    let ids = self.module_ids();
    let mut force_wrap: Vec<ModuleId> = vec![];

    for id in &ids {
      let Some(module) = self.graph.module(*id).as_norm() else {
        continue;
      };
      if module.export_kind.is_commonjs_like() {
        force_wrap.push(*id);
      }
      for record in &module.import_records {
        let Some(target) = record.resolved else {
          continue;
        };
        if self.graph.module(target).is_external() {
          continue;
        }
        if record.is_dynamic_import || record.is_require {
          force_wrap.push(target);
        }
      }
    }

    // referenced_by
    for id in &ids {
      let Some(module) = self.graph.module(*id).as_norm() else {
        continue;
      };
      let targets: Vec<ModuleId> = module
        .import_records
        .iter()
        .filter_map(|r| r.resolved)
        .collect();
      for target in targets {
        if let NormOrExt::Normal(target_module) = self.graph.module_mut(target) {
          target_module.referenced_by.insert(*id);
        }
      }
    }

    for id in force_wrap {
      self.graph.module_mut(id).expect_norm_mut().must_wrap = true;
    }

    // Any strongly-connected component containing a CommonJS-like module
    // wraps whole, so the cycle can run lazily through the registry.
    for scc in strongly_connected_components(self.graph) {
      let cyclic = scc.len() > 1
        || scc
          .first()
          .map(|&id| self.graph.module(id).dependencies().contains(&id))
          .unwrap_or(false);
      if !cyclic {
        continue;
      }
      let has_cjs = scc.iter().any(|&id| {
        self
          .graph
          .module(id)
          .as_norm()
          .map(|m| m.export_kind.is_commonjs_like())
          .unwrap_or(false)
      });
      if has_cjs {
        for id in &scc {
          let module = self.graph.module_mut(*id).expect_norm_mut();
          if !module.must_wrap {
            module.must_wrap = true;
          }
        }
        // runtime-visible partial namespaces are worth a warning
        if let Some(first) = scc.first() {
          let path = self.graph.module(*first).path().to_string();
          self
            .graph
            .warnings
            .push(BuildError::mixed_module_cycle(path));
        }
      }
    }
  }

  // --- phase B: flatten star exports into linked_exports

  fn resolve_all_exports(&mut self) {
    let ids = self.module_ids();
    for id in ids {
      self.resolve_exports_of(id);
    }
  }

  fn resolve_exports_of(&mut self, id: ModuleId) {
    if self.export_state[id.index()] != ExportState::NotStarted {
      return;
    }
    if self.graph.module(id).is_external() {
      self.export_state[id.index()] = ExportState::Done;
      return;
    }
    self.export_state[id.index()] = ExportState::InProgress;

    let export_records = self
      .graph
      .module(id)
      .expect_norm()
      .export_records
      .clone();
    let star_records = self.graph.module(id).expect_norm().star_exports.clone();

    let mut linked: FxHashMap<String, ExportedSpecifier> = FxHashMap::default();
    let mut ambiguous: FxHashSet<String> = FxHashSet::default();

    for record in &export_records {
      let spec = match &record.item {
        ExportItem::Local(sym) => ExportedSpecifier {
          exported_as: record.exported_as.clone(),
          symbol: *sym,
          owner: id,
        },
        ExportItem::ReExport { record: rec_index, imported } => {
          match self.resolve_re_export(id, *rec_index, imported, &record.exported_as, record.loc) {
            Some(spec) => spec,
            None => continue,
          }
        }
      };
      linked.insert(record.exported_as.clone(), spec);
    }

    let explicit: FxHashSet<String> = linked.keys().cloned().collect();

    for star in star_records {
      let target = self
        .graph
        .module(id)
        .expect_norm()
        .import_records[star as usize]
        .resolved;
      let Some(target) = target else { continue };

      if self.graph.module(target).is_external() {
        let module = self.graph.module_mut(id).expect_norm_mut();
        if !module.external_star_records.contains(&target) {
          module.external_star_records.push(target);
        }
        continue;
      }

      let target_is_wrapped = self
        .graph
        .module(target)
        .as_norm()
        .map(|m| m.must_wrap)
        .unwrap_or(false);
      if target_is_wrapped {
        // Star re-exporting a CommonJS module needs runtime merging, which
        // scope hoisting cannot express statically.
        self.graph.warnings.push(BuildError::panic(format!(
          "\"export *\" from CommonJS module {} is not statically analyzable and was ignored",
          self.graph.module(target).path()
        )));
        continue;
      }

      self.resolve_exports_of(target);

      let (target_exports, target_external_stars) = {
        let target_module = self.graph.module(target).expect_norm();
        (
          target_module.linked_exports.clone(),
          target_module.external_star_records.clone(),
        )
      };

      for (name, spec) in target_exports {
        // `export *` never forwards the default export
        if name == "default" {
          continue;
        }
        // explicit named exports shadow star names
        if explicit.contains(&name) {
          continue;
        }
        if ambiguous.contains(&name) {
          continue;
        }
        match linked.get(&name) {
          Some(existing) if existing == &spec => {}
          Some(_) => {
            // spec-compliant ambiguity: the name vanishes
            linked.remove(&name);
            ambiguous.insert(name);
          }
          None => {
            linked.insert(name, spec);
          }
        }
      }

      let module = self.graph.module_mut(id).expect_norm_mut();
      for ext in target_external_stars {
        if !module.external_star_records.contains(&ext) {
          module.external_star_records.push(ext);
        }
      }
    }

    let module = self.graph.module_mut(id).expect_norm_mut();
    module.linked_exports = linked;
    module.ambiguous_exports = ambiguous;
    self.export_state[id.index()] = ExportState::Done;
  }

  fn resolve_re_export(
    &mut self,
    importer: ModuleId,
    record_index: u32,
    imported: &str,
    exported_as: &str,
    loc: Loc,
  ) -> Option<ExportedSpecifier> {
    let record = self.graph.module(importer).expect_norm().import_records[record_index as usize]
      .clone();
    let target = record.resolved?;

    if self.graph.module(target).is_external() {
      // `export { x } from "ext"` becomes an import binding plus a local
      // export of that binding.
      let ext_ns = self.external_namespace_binding(importer, target);
      let hint = if exported_as == "default" { imported } else { exported_as };
      let sym = self
        .graph
        .module_mut(importer)
        .expect_norm_mut()
        .create_top_level_symbol(hint, SymbolKind::ImportBinding);
      if imported == "*" {
        self.graph.symbol_data_mut(sym).link = Some(ext_ns);
      } else {
        self.graph.symbol_data_mut(sym).namespace_alias = Some(NamespaceAlias {
          namespace: ext_ns,
          prop: imported.to_string(),
        });
      }
      return Some(ExportedSpecifier {
        exported_as: exported_as.to_string(),
        symbol: sym,
        owner: importer,
      });
    }

    let target_is_wrapped = self
      .graph
      .module(target)
      .as_norm()
      .map(|m| m.must_wrap)
      .unwrap_or(false);

    if target_is_wrapped {
      let interop = self.interop_namespace_binding(importer, target);
      if imported == "*" {
        return Some(ExportedSpecifier {
          exported_as: exported_as.to_string(),
          symbol: interop,
          owner: importer,
        });
      }
      let sym = self
        .graph
        .module_mut(importer)
        .expect_norm_mut()
        .create_top_level_symbol(exported_as, SymbolKind::ImportBinding);
      self.graph.symbol_data_mut(sym).namespace_alias = Some(NamespaceAlias {
        namespace: interop,
        prop: imported.to_string(),
      });
      return Some(ExportedSpecifier {
        exported_as: exported_as.to_string(),
        symbol: sym,
        owner: importer,
      });
    }

    if imported == "*" {
      self.mark_namespace_referenced(target);
      return Some(ExportedSpecifier {
        exported_as: exported_as.to_string(),
        symbol: SymbolRef::new(target, NAMESPACE_SYMBOL_INDEX),
        owner: target,
      });
    }

    if self.export_state[target.index()] == ExportState::InProgress {
      // Circular re-export chain: degrade to a late-binding read through the
      // target's namespace object.
      self.mark_namespace_referenced(target);
      let sym = self
        .graph
        .module_mut(importer)
        .expect_norm_mut()
        .create_top_level_symbol(exported_as, SymbolKind::ImportBinding);
      self.graph.symbol_data_mut(sym).namespace_alias = Some(NamespaceAlias {
        namespace: SymbolRef::new(target, NAMESPACE_SYMBOL_INDEX),
        prop: imported.to_string(),
      });
      return Some(ExportedSpecifier {
        exported_as: exported_as.to_string(),
        symbol: sym,
        owner: importer,
      });
    }

    self.resolve_exports_of(target);
    match self
      .graph
      .module(target)
      .expect_norm()
      .linked_exports
      .get(imported)
      .cloned()
    {
      Some(found) => Some(ExportedSpecifier {
        exported_as: exported_as.to_string(),
        symbol: found.symbol,
        owner: found.owner,
      }),
      None => {
        let importer_path = self.graph.module(importer).path().to_string();
        let importee_path = self.graph.module(target).path().to_string();
        let location = self.location_in(importer, loc);
        self.errors.push(BuildError::missing_export(
          imported,
          importer_path,
          importee_path,
          location,
        ));
        None
      }
    }
  }

  // --- phase C: resolve named imports

  fn resolve_imports(&mut self) {
    let ids = self.module_ids();
    for id in ids {
      if self.graph.module(id).is_external() {
        continue;
      }
      let record_count = self.graph.module(id).expect_norm().import_records.len();
      for index in 0..record_count {
        self.resolve_import_record(id, index);
      }
      self.force_import_statement_side_effects(id);
    }
  }

  fn resolve_import_record(&mut self, importer: ModuleId, index: usize) {
    let record = self.graph.module(importer).expect_norm().import_records[index].clone();
    let Some(target) = record.resolved else {
      return;
    };
    let Some(local) = record.local_symbol else {
      return;
    };
    if !matches!(
      record.kind,
      ImportKind::Default | ImportKind::Named | ImportKind::ImportItem | ImportKind::Namespace
    ) {
      return;
    }

    if self.graph.module(target).is_external() {
      let ext_ns = self.external_namespace_binding_direct(target);
      if record.kind == ImportKind::Namespace {
        self.graph.symbol_data_mut(local).link = Some(ext_ns);
      } else {
        self.graph.symbol_data_mut(local).namespace_alias = Some(NamespaceAlias {
          namespace: ext_ns,
          prop: record.imported_name.clone(),
        });
      }
      return;
    }

    let target_is_wrapped = self.graph.module(target).expect_norm().must_wrap;

    if target_is_wrapped {
      if record.kind == ImportKind::Namespace {
        // the binding itself becomes `var ns = __import(id)`
        self
          .graph
          .module_mut(importer)
          .expect_norm_mut()
          .interop_ns
          .insert(target, local.index);
      } else {
        let interop = self.interop_namespace_binding(importer, target);
        self.graph.symbol_data_mut(local).namespace_alias = Some(NamespaceAlias {
          namespace: interop,
          prop: record.imported_name.clone(),
        });
      }
      return;
    }

    if record.kind == ImportKind::Namespace {
      let target_ns = SymbolRef::new(target, NAMESPACE_SYMBOL_INDEX);
      self.graph.symbol_data_mut(local).link = Some(target_ns);
      self.mark_namespace_referenced(target);
      let local_name = self.graph.symbol_data(local).name.clone();
      self
        .graph
        .suggested_names
        .entry(target_ns)
        .or_insert(local_name);
      return;
    }

    let found = self
      .graph
      .module(target)
      .expect_norm()
      .linked_exports
      .get(&record.imported_name)
      .cloned();

    match found {
      Some(spec) => {
        self.graph.symbol_data_mut(local).link = Some(spec.symbol);
        let canonical = self.graph.canonical(spec.symbol);
        self.graph.symbol_data_mut(canonical).uses_from_other_modules += 1;
        let canonical_name = self.graph.symbol_data(canonical).name.clone();
        if canonical_name == "default" || canonical_name.ends_with("_ns") {
          let local_name = self.graph.symbol_data(local).name.clone();
          if local_name != "default" {
            self
              .graph
              .suggested_names
              .entry(canonical)
              .or_insert(local_name);
          }
        }
      }
      None => {
        let ambiguous = self
          .graph
          .module(target)
          .expect_norm()
          .ambiguous_exports
          .contains(&record.imported_name);
        let external_star = self
          .graph
          .module(target)
          .expect_norm()
          .external_star_records
          .first()
          .copied();

        if record.kind == ImportKind::ImportItem || ambiguous {
          // property access on a namespace: stays a late-binding read and
          // yields `undefined` at runtime, same as an ambiguous star name
          self.mark_namespace_referenced(target);
          self.graph.symbol_data_mut(local).namespace_alias = Some(NamespaceAlias {
            namespace: SymbolRef::new(target, NAMESPACE_SYMBOL_INDEX),
            prop: record.imported_name.clone(),
          });
          return;
        }

        if let Some(first_external) = external_star {
          // the name may come from an external star re-export at runtime
          let external_stars = self
            .graph
            .module(target)
            .expect_norm()
            .external_star_records
            .clone();
          if external_stars.len() > 1 {
            let binding = record.imported_name.clone();
            let importer_path = self.graph.module(importer).path().to_string();
            let used = self.graph.module(first_external).path().to_string();
            let sources = external_stars
              .iter()
              .map(|id| self.graph.module(*id).path().to_string())
              .collect();
            self
              .graph
              .warnings
              .push(BuildError::ambiguous_external_namespaces(
                binding,
                importer_path,
                used,
                sources,
              ));
          }
          let ext_ns = self.external_namespace_binding_direct(first_external);
          self.graph.symbol_data_mut(local).namespace_alias = Some(NamespaceAlias {
            namespace: ext_ns,
            prop: record.imported_name.clone(),
          });
          return;
        }

        let importer_path = self.graph.module(importer).path().to_string();
        let importee_path = self.graph.module(target).path().to_string();
        let location = self.location_in(importer, record.loc);
        self.errors.push(BuildError::missing_export(
          &record.imported_name,
          importer_path,
          importee_path,
          location,
        ));
      }
    }
  }

  /// A static `import` statement whose target is wrapped must still execute
  /// the target, so the replacement `var ns = __import(id)` statement keeps
  /// a side-effect flag.
  fn force_import_statement_side_effects(&mut self, id: ModuleId) {
    let module = self.graph.module(id).expect_norm();
    let mut flips: Vec<usize> = vec![];
    for (part_index, part) in module.parts.iter().enumerate() {
      let is_import_stmt = matches!(
        module.ast.body.get(part.stmt_index as usize),
        Some(
          ast::Stmt::Import(_)
            | ast::Stmt::ExportNamed(ast::NamedExportDecl { src: Some(_), .. })
            | ast::Stmt::ExportAll { .. }
        )
      );
      if !is_import_stmt {
        continue;
      }
      let forces = part.import_records.iter().any(|&rec| {
        let record = &module.import_records[rec as usize];
        match record.resolved {
          Some(target) => match self.graph.module(target) {
            NormOrExt::Normal(target_module) => {
              target_module.must_wrap && target_module.has_side_effects
            }
            NormOrExt::External(_) => false,
          },
          None => false,
        }
      });
      if forces {
        flips.push(part_index);
      }
    }
    let module = self.graph.module_mut(id).expect_norm_mut();
    for index in flips {
      module.parts[index].side_effect = true;
    }
  }

  fn relink_injected_globals(&mut self) {
    if self.graph.injected.is_empty() {
      return;
    }
    let mut injected_exports: FxHashMap<String, SymbolRef> = FxHashMap::default();
    let injected: FxHashSet<ModuleId> = self.graph.injected.iter().copied().collect();
    for id in &self.graph.injected {
      let Some(module) = self.graph.module(*id).as_norm() else {
        continue;
      };
      for (name, spec) in &module.linked_exports {
        injected_exports.entry(name.clone()).or_insert(spec.symbol);
      }
    }
    if injected_exports.is_empty() {
      return;
    }

    let ids = self.module_ids();
    for id in ids {
      if injected.contains(&id) {
        continue;
      }
      let Some(module) = self.graph.module(id).as_norm() else {
        continue;
      };
      let relinks: Vec<(u32, SymbolRef)> = module
        .symbols
        .iter()
        .filter(|(_, data)| data.kind == SymbolKind::Unbound && data.link.is_none())
        .filter_map(|(index, data)| {
          injected_exports
            .get(&data.name)
            .map(|&target| (index, target))
        })
        .collect();
      for (index, target) in relinks {
        let sym = SymbolRef::new(id, index);
        self.graph.symbol_data_mut(sym).link = Some(target);
      }
    }
  }

  // --- phase D: namespace materialization

  fn materialize_namespaces(&mut self) {
    let ids = self.module_ids();
    for id in ids {
      let Some(module) = self.graph.module(id).as_norm() else {
        continue;
      };
      if !module.is_namespace_referenced || module.must_wrap || module.namespace_part.is_some() {
        continue;
      }

      let mut exports: Vec<(String, SymbolRef)> = module
        .linked_exports
        .iter()
        .map(|(name, spec)| (name.clone(), spec.symbol))
        .collect();
      exports.sort_by(|a, b| a.0.cmp(&b.0));

      let ns_sym = module.namespace_symbol();
      let ns_name = module.symbols.get(NAMESPACE_SYMBOL_INDEX).name.clone();

      let init = if exports.is_empty() {
        ast::Expr::Object {
          props: vec![],
          loc: Loc::default(),
        }
      } else {
        ast::Expr::Call {
          callee: Box::new(ast::Expr::Ident(ast::Ident::new("__export", Loc::default()))),
          args: vec![
            ast::Expr::Object {
              props: vec![],
              loc: Loc::default(),
            },
            ast::Expr::Object {
              props: exports
                .iter()
                .map(|(name, sym)| ast::Prop::KeyValue {
                  key: property_key(name),
                  value: ast::Expr::Arrow(Box::new(ast::Arrow {
                    params: vec![],
                    body: ast::ArrowBody::Expr(Box::new(ast::Expr::Ident(
                      ast::Ident::with_sym(name.clone(), *sym),
                    ))),
                    is_async: false,
                    loc: Loc::default(),
                  })),
                })
                .collect(),
              loc: Loc::default(),
            },
          ],
          pure: true,
          import_record: None,
          loc: Loc::default(),
        }
      };

      let stmt = ast::Stmt::VarDecl {
        kind: ast::VarKind::Var,
        decls: vec![ast::Declarator {
          pat: ast::Pat::Ident(ast::Ident {
            name: ns_name,
            loc: Loc::default(),
            sym: Some(ns_sym),
          }),
          init: Some(init),
        }],
        loc: Loc::default(),
      };

      let module = self.graph.module_mut(id).expect_norm_mut();
      let stmt_index = module.ast.body.len() as u32;
      module.ast.body.push(stmt);
      let part_index = module.add_part(StatementPart {
        stmt_index,
        declared: vec![NAMESPACE_SYMBOL_INDEX],
        referenced: exports.iter().map(|(_, sym)| *sym).collect(),
        side_effect: false,
        import_records: vec![],
        included: false,
      });
      module.namespace_part = Some(part_index);
    }
  }

  // --- shared helpers

  fn mark_namespace_referenced(&mut self, id: ModuleId) {
    if let NormOrExt::Normal(module) = self.graph.module_mut(id) {
      module.is_namespace_referenced = true;
    }
  }

  /// One `var x = __import(id)` binding per (importer, wrapped target).
  fn interop_namespace_binding(&mut self, importer: ModuleId, target: ModuleId) -> SymbolRef {
    if let Some(&index) = self
      .graph
      .module(importer)
      .expect_norm()
      .interop_ns
      .get(&target)
    {
      return SymbolRef::new(importer, index);
    }
    let stem = self.graph.module(target).expect_norm().stem();
    let sym = self
      .graph
      .module_mut(importer)
      .expect_norm_mut()
      .create_top_level_symbol(&format!("import_{stem}"), SymbolKind::ImportBinding);
    self
      .graph
      .module_mut(importer)
      .expect_norm_mut()
      .interop_ns
      .insert(target, sym.index);
    sym
  }

  /// The single namespace symbol every importer shares for one external.
  fn external_namespace_binding_direct(&mut self, target: ModuleId) -> SymbolRef {
    SymbolRef::new(target, NAMESPACE_SYMBOL_INDEX)
  }

  fn external_namespace_binding(&mut self, _importer: ModuleId, target: ModuleId) -> SymbolRef {
    self.external_namespace_binding_direct(target)
  }

  fn location_in(&self, id: ModuleId, loc: Loc) -> Option<fardel_error::Location> {
    self.graph.module(id).as_norm().map(|module| {
      fardel_error::Location::from_source(&module.path.path, &module.source, loc.line, loc.col)
    })
  }
}

fn property_key(name: &str) -> ast::PropKey {
  let is_ident = !name.is_empty()
    && name
      .chars()
      .next()
      .map(|c| c.is_alphabetic() || c == '_' || c == '$')
      .unwrap_or(false)
    && name
      .chars()
      .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
  if is_ident {
    ast::PropKey::Ident(name.to_string(), Loc::default())
  } else {
    ast::PropKey::Str(fardel_syntax::quote_string(name), Loc::default())
  }
}

/// Iterative Tarjan over static import edges.
fn strongly_connected_components(graph: &Graph) -> Vec<Vec<ModuleId>> {
  #[derive(Clone, Copy)]
  struct NodeState {
    index: u32,
    low: u32,
    on_stack: bool,
    visited: bool,
  }

  let n = graph.modules.len();
  let mut state = vec![
    NodeState {
      index: 0,
      low: 0,
      on_stack: false,
      visited: false,
    };
    n
  ];
  let mut counter = 0u32;
  let mut stack: Vec<usize> = vec![];
  let mut components: Vec<Vec<ModuleId>> = vec![];

  for root in 0..n {
    if state[root].visited {
      continue;
    }
    // (node, next child index)
    let mut work: Vec<(usize, usize)> = vec![(root, 0)];
    state[root].visited = true;
    state[root].index = counter;
    state[root].low = counter;
    state[root].on_stack = true;
    stack.push(root);
    counter += 1;

    while let Some(&(node, child)) = work.last() {
      let deps = graph.modules[node].dependencies();
      if child < deps.len() {
        work.last_mut().expect("non-empty work stack").1 += 1;
        let next = deps[child].index();
        if !state[next].visited {
          state[next].visited = true;
          state[next].index = counter;
          state[next].low = counter;
          state[next].on_stack = true;
          stack.push(next);
          counter += 1;
          work.push((next, 0));
        } else if state[next].on_stack {
          state[node].low = state[node].low.min(state[next].index);
        }
      } else {
        work.pop();
        if let Some(&(parent, _)) = work.last() {
          let low = state[node].low;
          state[parent].low = state[parent].low.min(low);
        }
        if state[node].low == state[node].index {
          let mut component = vec![];
          loop {
            let popped = stack.pop().expect("tarjan stack underflow");
            state[popped].on_stack = false;
            component.push(ModuleId::new(popped as u32));
            if popped == node {
              break;
            }
          }
          components.push(component);
        }
      }
    }
  }
  components
}
