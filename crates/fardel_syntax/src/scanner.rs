//! Scope analysis for one parsed module: builds the symbol table, the
//! import/export records, and the per-statement parts that drive tree
//! shaking. Also rewrites `ns.prop` accesses on namespace imports into
//! synthetic import items and applies `--define` substitutions.

use fardel_common::{
  ExportItem, ExportKind, ExportRecord, ImportKind, ImportRecord, ModuleId, SymbolKind,
  SymbolRef, SymbolTable,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::*;
use crate::side_effects::stmt_has_side_effects;

#[derive(Debug)]
pub struct ScanOptions<'a> {
  pub module_id: ModuleId,
  pub path: &'a str,
  /// Name hint for the module's facade namespace symbol.
  pub namespace_symbol_name: String,
  pub defines: &'a FxHashMap<String, Expr>,
  pub pure_functions: &'a FxHashSet<String>,
}

/// One top-level statement as the tree-shaker sees it.
#[derive(Debug, Clone)]
pub struct StatementPart {
  pub stmt_index: u32,
  /// Module-level symbols declared by this statement.
  pub declared: Vec<u32>,
  /// Symbols referenced anywhere inside this statement, nested scopes
  /// included.
  pub referenced: Vec<SymbolRef>,
  pub side_effect: bool,
  pub import_records: Vec<u32>,
  /// Filled in by tree shaking.
  pub included: bool,
}

#[derive(Debug)]
pub struct ScanResult {
  pub symbols: SymbolTable,
  pub import_records: Vec<ImportRecord>,
  pub export_records: Vec<ExportRecord>,
  /// Indices of `export * from` records.
  pub star_exports: Vec<u32>,
  pub parts: Vec<StatementPart>,
  pub export_kind: ExportKind,
  /// Free names observed anywhere in the module, treated as host globals.
  pub visited_global_names: FxHashSet<String>,
  /// Names declared in nested scopes; the renamer must avoid them.
  pub declared_scoped_names: FxHashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
  Function,
  Block,
}

#[derive(Debug)]
struct Scope {
  kind: ScopeKind,
  names: FxHashSet<String>,
}

struct Scanner<'a> {
  module_id: ModuleId,
  defines: &'a FxHashMap<String, Expr>,
  symbols: SymbolTable,
  module_bindings: FxHashMap<String, u32>,
  unbound: FxHashMap<String, u32>,
  import_records: Vec<ImportRecord>,
  export_records: Vec<ExportRecord>,
  star_exports: Vec<u32>,
  scopes: Vec<Scope>,
  visited_global_names: FxHashSet<String>,
  declared_scoped_names: FxHashSet<String>,
  /// namespace-import binding symbol -> import record
  namespace_imports: FxHashMap<u32, u32>,
  /// (record, imported name) -> synthetic import item symbol
  import_items: FxHashMap<(u32, String), u32>,
  part_declared: Vec<u32>,
  part_referenced: Vec<SymbolRef>,
  part_records: Vec<u32>,
  has_cjs_exports: bool,
  has_esm_syntax: bool,
  has_top_level_dynamic_require: bool,
}

pub fn scan(module: &mut Module, opts: ScanOptions) -> ScanResult {
  let mut scanner = Scanner {
    module_id: opts.module_id,
    defines: opts.defines,
    symbols: SymbolTable::new(opts.namespace_symbol_name),
    module_bindings: FxHashMap::default(),
    unbound: FxHashMap::default(),
    import_records: vec![],
    export_records: vec![],
    star_exports: vec![],
    scopes: vec![],
    visited_global_names: FxHashSet::default(),
    declared_scoped_names: FxHashSet::default(),
    namespace_imports: FxHashMap::default(),
    import_items: FxHashMap::default(),
    part_declared: vec![],
    part_referenced: vec![],
    part_records: vec![],
    has_cjs_exports: false,
    has_esm_syntax: false,
    has_top_level_dynamic_require: false,
  };

  scanner.collect_module_decls(module);
  scanner.collect_export_records(module);

  let mut parts = Vec::with_capacity(module.body.len());
  for (index, stmt) in module.body.iter_mut().enumerate() {
    scanner.part_declared.clear();
    scanner.part_referenced.clear();
    scanner.part_records.clear();
    scanner.visit_stmt(stmt);
    let side_effect = stmt_has_side_effects(stmt, opts.pure_functions);
    let mut declared = std::mem::take(&mut scanner.part_declared);
    declared.sort_unstable();
    declared.dedup();
    parts.push(StatementPart {
      stmt_index: index as u32,
      declared,
      referenced: std::mem::take(&mut scanner.part_referenced),
      side_effect,
      import_records: std::mem::take(&mut scanner.part_records),
      included: false,
    });
  }

  let export_kind = match (scanner.has_esm_syntax, scanner.has_cjs_exports
    || scanner.has_top_level_dynamic_require)
  {
    (true, true) => ExportKind::Mixed,
    (true, false) => ExportKind::Esm,
    (false, true) => ExportKind::CommonJs,
    (false, false) => ExportKind::None,
  };

  ScanResult {
    symbols: scanner.symbols,
    import_records: scanner.import_records,
    export_records: scanner.export_records,
    star_exports: scanner.star_exports,
    parts,
    export_kind,
    visited_global_names: scanner.visited_global_names,
    declared_scoped_names: scanner.declared_scoped_names,
  }
}

impl<'a> Scanner<'a> {
  fn sym_ref(&self, index: u32) -> SymbolRef {
    SymbolRef::new(self.module_id, index)
  }

  fn declare_module_symbol(&mut self, name: &str, kind: SymbolKind) -> u32 {
    if let Some(&existing) = self.module_bindings.get(name) {
      return existing;
    }
    let index = self.symbols.create(name.to_string(), kind);
    self.module_bindings.insert(name.to_string(), index);
    index
  }

  // --- phase 1: hoist module-level declarations and import/export bindings

  fn collect_module_decls(&mut self, module: &mut Module) {
    for stmt in &mut module.body {
      self.collect_stmt_decls(stmt, true);
    }
  }

  fn collect_stmt_decls(&mut self, stmt: &mut Stmt, directly_at_top: bool) {
    match stmt {
      Stmt::VarDecl { kind, decls, .. } => {
        if *kind == VarKind::Var || directly_at_top {
          let sym_kind = SymbolKind::Variable;
          for decl in decls.iter() {
            collect_pat_names(&decl.pat, &mut |name| {
              self.declare_module_symbol(name, sym_kind);
            });
          }
        }
      }
      Stmt::Func(decl) if directly_at_top => {
        if let Some(ident) = &decl.function.ident {
          self.declare_module_symbol(&ident.name, SymbolKind::Function);
        }
      }
      Stmt::Class(decl) if directly_at_top => {
        self.declare_module_symbol(&decl.ident.name, SymbolKind::Class);
      }
      Stmt::Import(decl) => {
        self.collect_import_decl(decl);
      }
      Stmt::ExportDecl { decl, .. } => {
        self.collect_stmt_decls(decl, directly_at_top);
      }
      Stmt::ExportDefault { value, .. } => match value {
        ExportDefaultValue::Func(func) => {
          if let Some(ident) = &func.function.ident {
            self.declare_module_symbol(&ident.name, SymbolKind::Function);
          }
        }
        ExportDefaultValue::Class(class) => {
          if !class.ident.name.is_empty() {
            self.declare_module_symbol(&class.ident.name, SymbolKind::Class);
          }
        }
        ExportDefaultValue::Expr(_) => {}
      },
      Stmt::ExportAll { .. } | Stmt::ExportNamed(_) => {}
      // `var` hoists out of nested statements up to module scope.
      Stmt::Block { stmts, .. } => {
        for stmt in stmts {
          self.collect_stmt_decls(stmt, false);
        }
      }
      Stmt::If { cons, alt, .. } => {
        self.collect_stmt_decls(cons, false);
        if let Some(alt) = alt {
          self.collect_stmt_decls(alt, false);
        }
      }
      Stmt::For { init, body, .. } => {
        if let Some(ForInit::VarDecl { kind, decls }) = init {
          if *kind == VarKind::Var {
            for decl in decls.iter() {
              collect_pat_names(&decl.pat, &mut |name| {
                self.declare_module_symbol(name, SymbolKind::Variable);
              });
            }
          }
        }
        self.collect_stmt_decls(body, false);
      }
      Stmt::ForIn { head, body, .. } => {
        if let ForHead::VarDecl { kind, pat } = head {
          if *kind == VarKind::Var {
            collect_pat_names(pat, &mut |name| {
              self.declare_module_symbol(name, SymbolKind::Variable);
            });
          }
        }
        self.collect_stmt_decls(body, false);
      }
      Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
        self.collect_stmt_decls(body, false);
      }
      Stmt::Try {
        block,
        catch,
        finally,
        ..
      } => {
        for stmt in block {
          self.collect_stmt_decls(stmt, false);
        }
        if let Some(catch) = catch {
          for stmt in &mut catch.body {
            self.collect_stmt_decls(stmt, false);
          }
        }
        if let Some(finally) = finally {
          for stmt in finally {
            self.collect_stmt_decls(stmt, false);
          }
        }
      }
      Stmt::Switch { cases, .. } => {
        for case in cases {
          for stmt in &mut case.body {
            self.collect_stmt_decls(stmt, false);
          }
        }
      }
      _ => {}
    }
  }

  fn collect_import_decl(&mut self, decl: &mut ImportDecl) {
    self.has_esm_syntax = true;
    let loc = decl.loc;
    let mut any_binding = false;

    if let Some(default) = &mut decl.default {
      let index = self.declare_module_symbol(&default.name, SymbolKind::ImportBinding);
      default.sym = Some(self.sym_ref(index));
      self.add_import_record(ImportRecord {
        specifier: decl.specifier.clone(),
        kind: ImportKind::Default,
        imported_name: "default".to_string(),
        local_symbol: Some(self.sym_ref(index)),
        is_require: false,
        is_dynamic_import: false,
        resolved: None,
        loc,
      });
      any_binding = true;
    }
    if let Some(namespace) = &mut decl.namespace {
      let index = self.declare_module_symbol(&namespace.name, SymbolKind::ImportBinding);
      namespace.sym = Some(self.sym_ref(index));
      let record = self.add_import_record(ImportRecord {
        specifier: decl.specifier.clone(),
        kind: ImportKind::Namespace,
        imported_name: "*".to_string(),
        local_symbol: Some(self.sym_ref(index)),
        is_require: false,
        is_dynamic_import: false,
        resolved: None,
        loc,
      });
      self.namespace_imports.insert(index, record);
      any_binding = true;
    }
    for named in &mut decl.named {
      let index = self.declare_module_symbol(&named.local.name, SymbolKind::ImportBinding);
      named.local.sym = Some(self.sym_ref(index));
      self.add_import_record(ImportRecord {
        specifier: decl.specifier.clone(),
        kind: ImportKind::Named,
        imported_name: named.imported.clone(),
        local_symbol: Some(self.sym_ref(index)),
        is_require: false,
        is_dynamic_import: false,
        resolved: None,
        loc,
      });
      any_binding = true;
    }
    if !any_binding {
      self.add_import_record(ImportRecord {
        specifier: decl.specifier.clone(),
        kind: ImportKind::SideEffect,
        imported_name: String::new(),
        local_symbol: None,
        is_require: false,
        is_dynamic_import: false,
        resolved: None,
        loc,
      });
    }
  }

  fn add_import_record(&mut self, record: ImportRecord) -> u32 {
    let index = self.import_records.len() as u32;
    self.import_records.push(record);
    index
  }

  // --- phase 1b: export records (module bindings all exist by now)

  fn collect_export_records(&mut self, module: &mut Module) {
    for stmt in &mut module.body {
      match stmt {
        Stmt::ExportDecl { decl, loc } => {
          self.has_esm_syntax = true;
          let loc = *loc;
          let mut names = vec![];
          collect_decl_names(decl, &mut names);
          for name in names {
            let index = self
              .module_bindings
              .get(&name)
              .copied()
              .expect("exported declaration was hoisted");
            self.export_records.push(ExportRecord {
              exported_as: name,
              item: ExportItem::Local(self.sym_ref(index)),
              loc,
            });
          }
        }
        Stmt::ExportNamed(decl) => {
          self.has_esm_syntax = true;
          match &decl.src {
            Some(src) => {
              for spec in &decl.specifiers {
                let record = self.add_import_record(ImportRecord {
                  specifier: src.clone(),
                  kind: ImportKind::Named,
                  imported_name: spec.local.name.clone(),
                  local_symbol: None,
                  is_require: false,
                  is_dynamic_import: false,
                  resolved: None,
                  loc: decl.loc,
                });
                self.export_records.push(ExportRecord {
                  exported_as: spec.exported.clone(),
                  item: ExportItem::ReExport {
                    record,
                    imported: spec.local.name.clone(),
                  },
                  loc: decl.loc,
                });
              }
            }
            None => {
              for spec in &decl.specifiers {
                let index = match self.module_bindings.get(&spec.local.name).copied() {
                  Some(index) => index,
                  None => self.unbound_symbol(&spec.local.name),
                };
                self.export_records.push(ExportRecord {
                  exported_as: spec.exported.clone(),
                  item: ExportItem::Local(self.sym_ref(index)),
                  loc: decl.loc,
                });
              }
            }
          }
        }
        Stmt::ExportAll {
          specifier,
          as_ns,
          loc,
        } => {
          self.has_esm_syntax = true;
          let record = self.add_import_record(ImportRecord {
            specifier: specifier.clone(),
            kind: ImportKind::ExportStar,
            imported_name: "*".to_string(),
            local_symbol: None,
            is_require: false,
            is_dynamic_import: false,
            resolved: None,
            loc: *loc,
          });
          match as_ns {
            Some(ident) => {
              self.export_records.push(ExportRecord {
                exported_as: ident.name.clone(),
                item: ExportItem::ReExport {
                  record,
                  imported: "*".to_string(),
                },
                loc: *loc,
              });
            }
            None => self.star_exports.push(record),
          }
        }
        Stmt::ExportDefault { value, loc, sym } => {
          self.has_esm_syntax = true;
          let index = match value {
            ExportDefaultValue::Func(func) => match &func.function.ident {
              Some(ident) => self.module_bindings[&ident.name],
              None => self.symbols.create_unique("default", SymbolKind::Function),
            },
            ExportDefaultValue::Class(class) if !class.ident.name.is_empty() => {
              self.module_bindings[&class.ident.name]
            }
            ExportDefaultValue::Class(_) => {
              self.symbols.create_unique("default", SymbolKind::Class)
            }
            ExportDefaultValue::Expr(_) => {
              self.symbols.create_unique("default", SymbolKind::Variable)
            }
          };
          *sym = Some(self.sym_ref(index));
          self.export_records.push(ExportRecord {
            exported_as: "default".to_string(),
            item: ExportItem::Local(self.sym_ref(index)),
            loc: *loc,
          });
        }
        Stmt::Import(_) => {
          // handled during hoisting
        }
        _ => {}
      }
    }
  }

  // --- phase 2: reference resolution

  fn in_function_scope(&self) -> bool {
    self.scopes.iter().any(|s| s.kind == ScopeKind::Function)
  }

  fn unbound_symbol(&mut self, name: &str) -> u32 {
    if let Some(&index) = self.unbound.get(name) {
      return index;
    }
    let index = self.symbols.create(name.to_string(), SymbolKind::Unbound);
    self.unbound.insert(name.to_string(), index);
    self.visited_global_names.insert(name.to_string());
    index
  }

  fn lookup_scoped(&self, name: &str) -> bool {
    self.scopes.iter().rev().any(|s| s.names.contains(name))
  }

  fn resolve_ident(&mut self, ident: &mut Ident, is_mutation: bool) {
    if self.lookup_scoped(&ident.name) {
      return;
    }
    if let Some(&index) = self.module_bindings.get(&ident.name) {
      let sym = self.sym_ref(index);
      ident.sym = Some(sym);
      let data = self.symbols.get_mut(index);
      data.use_count += 1;
      if is_mutation {
        data.mutated = true;
      }
      self.part_referenced.push(sym);
      return;
    }
    let index = self.unbound_symbol(&ident.name);
    let sym = self.sym_ref(index);
    ident.sym = Some(sym);
    self.part_referenced.push(sym);
  }

  /// `ns.prop` where `ns` is a namespace import becomes a synthetic named
  /// import item; the access can then link straight to the target export and
  /// the namespace object never materializes unless captured elsewhere.
  fn try_rewrite_namespace_member(&mut self, expr: &mut Expr) -> bool {
    let Expr::Member { obj, prop, .. } = expr else {
      return false;
    };
    let Expr::Ident(ns_ident) = obj.as_mut() else {
      return false;
    };
    let MemberProp::Ident(prop_name, prop_loc) = prop else {
      return false;
    };
    if self.lookup_scoped(&ns_ident.name) {
      return false;
    }
    let Some(&binding) = self.module_bindings.get(&ns_ident.name) else {
      return false;
    };
    let Some(&record) = self.namespace_imports.get(&binding) else {
      return false;
    };

    let key = (record, prop_name.clone());
    let item = match self.import_items.get(&key) {
      Some(&item) => item,
      None => {
        let item = self
          .symbols
          .create(prop_name.clone(), SymbolKind::ImportBinding);
        let specifier = self.import_records[record as usize].specifier.clone();
        let loc = self.import_records[record as usize].loc;
        let item_record = self.add_import_record(ImportRecord {
          specifier,
          kind: ImportKind::ImportItem,
          imported_name: prop_name.clone(),
          local_symbol: Some(self.sym_ref(item)),
          is_require: false,
          is_dynamic_import: false,
          resolved: None,
          loc,
        });
        self.part_records.push(item_record);
        self.import_items.insert(key, item);
        item
      }
    };

    let sym = self.sym_ref(item);
    self.symbols.get_mut(item).use_count += 1;
    self.part_referenced.push(sym);
    *expr = Expr::Ident(Ident {
      name: prop_name.clone(),
      loc: *prop_loc,
      sym: Some(sym),
    });
    true
  }

  /// Dotted `--define` keys like `process.env.NODE_ENV`.
  fn try_apply_define_member(&mut self, expr: &mut Expr) -> bool {
    if self.defines.is_empty() {
      return false;
    }
    let mut path = String::new();
    if !member_path(expr, &mut path) {
      return false;
    }
    if let Some(root) = path.split('.').next() {
      if self.lookup_scoped(root) || self.module_bindings.contains_key(root) {
        return false;
      }
    }
    if let Some(replacement) = self.defines.get(&path) {
      *expr = replacement.clone();
      return true;
    }
    false
  }

  fn visit_stmt(&mut self, stmt: &mut Stmt) {
    match stmt {
      Stmt::VarDecl { kind, decls, .. } => {
        let module_level = match kind {
          VarKind::Var => !self.in_function_scope(),
          _ => self.scopes.is_empty(),
        };
        for decl in decls {
          if let Some(init) = &mut decl.init {
            self.visit_expr(init);
          }
          self.declare_pat(&mut decl.pat, module_level);
        }
      }
      Stmt::Func(decl) => {
        if self.scopes.is_empty() {
          if let Some(ident) = &mut decl.function.ident {
            let index = self.module_bindings[&ident.name];
            ident.sym = Some(self.sym_ref(index));
            self.part_declared.push(index);
          }
        } else if let Some(ident) = &decl.function.ident {
          self.declare_scoped(&ident.name);
        }
        self.visit_function(&mut decl.function);
      }
      Stmt::Class(decl) => {
        if self.scopes.is_empty() {
          let index = self.module_bindings[&decl.ident.name];
          decl.ident.sym = Some(self.sym_ref(index));
          self.part_declared.push(index);
        } else {
          self.declare_scoped(&decl.ident.name);
        }
        self.visit_class(&mut decl.class);
      }
      Stmt::Expr { expr, .. } => self.visit_expr(expr),
      Stmt::Return { arg, .. } => {
        if let Some(arg) = arg {
          self.visit_expr(arg);
        }
      }
      Stmt::If {
        test, cons, alt, ..
      } => {
        self.visit_expr(test);
        self.visit_stmt(cons);
        if let Some(alt) = alt {
          self.visit_stmt(alt);
        }
      }
      Stmt::Block { stmts, .. } => {
        self.push_scope(ScopeKind::Block);
        self.hoist_into_scope(stmts);
        for stmt in stmts {
          self.visit_stmt(stmt);
        }
        self.pop_scope();
      }
      Stmt::For {
        init,
        test,
        update,
        body,
        ..
      } => {
        self.push_scope(ScopeKind::Block);
        if let Some(init) = init {
          match init {
            ForInit::VarDecl { kind, decls } => {
              let module_level = match kind {
                VarKind::Var => !self.in_function_scope(),
                _ => false,
              };
              for decl in decls {
                if let Some(init) = &mut decl.init {
                  self.visit_expr(init);
                }
                self.declare_pat(&mut decl.pat, module_level);
              }
            }
            ForInit::Expr(expr) => self.visit_expr(expr),
          }
        }
        if let Some(test) = test {
          self.visit_expr(test);
        }
        if let Some(update) = update {
          self.visit_expr(update);
        }
        self.visit_stmt(body);
        self.pop_scope();
      }
      Stmt::ForIn {
        head, obj, body, ..
      } => {
        self.push_scope(ScopeKind::Block);
        self.visit_expr(obj);
        match head {
          ForHead::VarDecl { kind, pat } => {
            let module_level = match kind {
              VarKind::Var => !self.in_function_scope(),
              _ => false,
            };
            self.declare_pat(pat, module_level);
          }
          ForHead::Pat(pat) => {
            if let Pat::Ident(ident) = pat {
              self.resolve_ident(ident, true);
            }
          }
        }
        self.visit_stmt(body);
        self.pop_scope();
      }
      Stmt::While { test, body, .. } => {
        self.visit_expr(test);
        self.visit_stmt(body);
      }
      Stmt::DoWhile { body, test, .. } => {
        self.visit_stmt(body);
        self.visit_expr(test);
      }
      Stmt::Labeled { body, .. } => self.visit_stmt(body),
      Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty { .. } => {}
      Stmt::Throw { arg, .. } => self.visit_expr(arg),
      Stmt::Try {
        block,
        catch,
        finally,
        ..
      } => {
        self.push_scope(ScopeKind::Block);
        self.hoist_into_scope(block);
        for stmt in block.iter_mut() {
          self.visit_stmt(stmt);
        }
        self.pop_scope();
        if let Some(catch) = catch {
          self.push_scope(ScopeKind::Block);
          if let Some(param) = &mut catch.param {
            self.declare_pat(param, false);
          }
          self.hoist_into_scope(&mut catch.body);
          for stmt in &mut catch.body {
            self.visit_stmt(stmt);
          }
          self.pop_scope();
        }
        if let Some(finally) = finally {
          self.push_scope(ScopeKind::Block);
          self.hoist_into_scope(finally);
          for stmt in finally.iter_mut() {
            self.visit_stmt(stmt);
          }
          self.pop_scope();
        }
      }
      Stmt::Switch { disc, cases, .. } => {
        self.visit_expr(disc);
        self.push_scope(ScopeKind::Block);
        for case in cases.iter_mut() {
          if let Some(test) = &mut case.test {
            self.visit_expr(test);
          }
          for stmt in &mut case.body {
            self.visit_stmt(stmt);
          }
        }
        self.pop_scope();
      }
      Stmt::Import(_) => {
        // Bindings were declared during hoisting; track the records so a
        // live part keeps the edge alive.
        if let Stmt::Import(decl) = stmt {
          let records = self.records_for_specifier(&decl.specifier.clone());
          self.part_records.extend(records);
        }
      }
      Stmt::ExportNamed(decl) => {
        match &decl.src {
          None => {
            for spec in &mut decl.specifiers {
              self.resolve_ident(&mut spec.local, false);
            }
          }
          Some(src) => {
            let records = self.records_for_specifier(src);
            self.part_records.extend(records);
          }
        }
      }
      Stmt::ExportAll { specifier, .. } => {
        let records = self.records_for_specifier(specifier);
        self.part_records.extend(records);
      }
      Stmt::ExportDecl { decl, .. } => self.visit_stmt(decl),
      Stmt::ExportDefault { value, sym, .. } => {
        if let Some(sym) = sym {
          self.part_declared.push(sym.index);
        }
        match value {
          ExportDefaultValue::Expr(expr) => self.visit_expr(expr),
          ExportDefaultValue::Func(func) => self.visit_function(&mut func.function),
          ExportDefaultValue::Class(class) => self.visit_class(&mut class.class),
        }
      }
    }
  }

  fn hoist_into_scope(&mut self, stmts: &mut [Stmt]) {
    let mut names = vec![];
    for stmt in stmts.iter() {
      match stmt {
        Stmt::VarDecl { kind, decls, .. } => {
          // `var` was hoisted to the module scope unless we're inside a
          // function; either way the declaration statement resolves it.
          if *kind != VarKind::Var {
            for decl in decls {
              collect_pat_names(&decl.pat, &mut |n| names.push(n.to_string()));
            }
          }
        }
        Stmt::Func(decl) => {
          if let Some(ident) = &decl.function.ident {
            names.push(ident.name.clone());
          }
        }
        Stmt::Class(decl) => names.push(decl.ident.name.clone()),
        _ => {}
      }
    }
    for name in names {
      self.declare_scoped(&name);
    }
  }

  fn records_for_specifier(&self, specifier: &str) -> Vec<u32> {
    self
      .import_records
      .iter()
      .enumerate()
      .filter(|(_, r)| r.specifier == specifier && !r.is_require && !r.is_dynamic_import)
      .map(|(i, _)| i as u32)
      .collect()
  }

  fn push_scope(&mut self, kind: ScopeKind) {
    self.scopes.push(Scope {
      kind,
      names: FxHashSet::default(),
    });
  }

  fn pop_scope(&mut self) {
    self.scopes.pop();
  }

  fn declare_scoped(&mut self, name: &str) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.names.insert(name.to_string());
      self.declared_scoped_names.insert(name.to_string());
    }
  }

  fn declare_pat(&mut self, pat: &mut Pat, module_level: bool) {
    match pat {
      Pat::Ident(ident) => {
        if module_level {
          let index = self
            .module_bindings
            .get(&ident.name)
            .copied()
            .unwrap_or_else(|| {
              panic!("module-level binding {} was not hoisted", ident.name)
            });
          ident.sym = Some(self.sym_ref(index));
          self.part_declared.push(index);
        } else {
          self.declare_scoped(&ident.name);
        }
      }
      Pat::Array { elems, .. } => {
        for elem in elems.iter_mut().flatten() {
          self.declare_pat(elem, module_level);
        }
      }
      Pat::Object { props, .. } => {
        for prop in props {
          match prop {
            ObjectPatProp::KeyValue { key, value } => {
              if let PropKey::Computed(expr) = key {
                self.visit_expr(expr);
              }
              self.declare_pat(value, module_level);
            }
            ObjectPatProp::Shorthand { ident, default } => {
              if let Some(default) = default {
                self.visit_expr(default);
              }
              let mut as_pat = Pat::Ident(ident.clone());
              self.declare_pat(&mut as_pat, module_level);
              if let Pat::Ident(resolved) = as_pat {
                *ident = resolved;
              }
            }
          }
        }
      }
      Pat::Assign { pat, default, .. } => {
        self.visit_expr(default);
        self.declare_pat(pat, module_level);
      }
      Pat::Rest { arg, .. } => self.declare_pat(arg, module_level),
    }
  }

  fn visit_function(&mut self, function: &mut Function) {
    self.push_scope(ScopeKind::Function);
    if let Some(ident) = &function.ident {
      // function expressions can call themselves by name
      self.declare_scoped(&ident.name);
    }
    for param in &mut function.params {
      self.declare_pat(param, false);
    }
    self.collect_function_vars(&function.body);
    self.hoist_into_scope(&mut function.body);
    for stmt in &mut function.body {
      self.visit_stmt(stmt);
    }
    self.pop_scope();
  }

  /// `var` declarations anywhere in a function body (blocks included, inner
  /// functions excluded) bind in the function scope.
  fn collect_function_vars(&mut self, stmts: &[Stmt]) {
    let mut names = vec![];
    collect_var_names(stmts, &mut names);
    for name in names {
      self.declare_scoped(&name);
    }
  }

  fn visit_class(&mut self, class: &mut Class) {
    if let Some(super_class) = &mut class.super_class {
      self.visit_expr(super_class);
    }
    for member in &mut class.members {
      match member {
        ClassMember::Method { key, function, .. } => {
          if let PropKey::Computed(expr) = key {
            self.visit_expr(expr);
          }
          self.visit_function(function);
        }
        ClassMember::Field { key, value, .. } => {
          if let PropKey::Computed(expr) = key {
            self.visit_expr(expr);
          }
          if let Some(value) = value {
            self.visit_expr(value);
          }
        }
      }
    }
  }

  fn visit_expr(&mut self, expr: &mut Expr) {
    if self.try_apply_define_member(expr) {
      return;
    }
    if self.try_rewrite_namespace_member(expr) {
      return;
    }
    match expr {
      Expr::Ident(ident) => {
        // A bare identifier matching a define key substitutes before
        // resolution; anything in scope shadows the define.
        if !self.defines.is_empty()
          && !self.lookup_scoped(&ident.name)
          && !self.module_bindings.contains_key(&ident.name)
        {
          if let Some(replacement) = self.defines.get(&ident.name) {
            *expr = replacement.clone();
            return;
          }
        }
        self.resolve_ident(ident, false);
      }
      Expr::Lit { .. } | Expr::This(_) => {}
      Expr::Template(template) => {
        for sub in &mut template.exprs {
          self.visit_expr(sub);
        }
      }
      Expr::TaggedTemplate { tag, quasi, .. } => {
        self.visit_expr(tag);
        for sub in &mut quasi.exprs {
          self.visit_expr(sub);
        }
      }
      Expr::Array { elems, .. } => {
        for elem in elems.iter_mut().flatten() {
          self.visit_expr(elem);
        }
      }
      Expr::Object { props, .. } => {
        for prop in props {
          match prop {
            Prop::KeyValue { key, value } => {
              if let PropKey::Computed(expr) = key {
                self.visit_expr(expr);
              }
              self.visit_expr(value);
            }
            Prop::Shorthand(ident) => self.resolve_ident(ident, false),
            Prop::Method { key, function, .. } => {
              if let PropKey::Computed(expr) = key {
                self.visit_expr(expr);
              }
              self.visit_function(function);
            }
            Prop::Spread(arg) => self.visit_expr(arg),
          }
        }
      }
      Expr::Func(function) => self.visit_function(function),
      Expr::Arrow(arrow) => {
        self.push_scope(ScopeKind::Function);
        for param in &mut arrow.params {
          self.declare_pat(param, false);
        }
        match &mut arrow.body {
          ArrowBody::Expr(expr) => self.visit_expr(expr),
          ArrowBody::Block(stmts) => {
            self.collect_function_vars(stmts);
            self.hoist_into_scope(stmts);
            for stmt in stmts {
              self.visit_stmt(stmt);
            }
          }
        }
        self.pop_scope();
      }
      Expr::ClassExpr { class, .. } => self.visit_class(class),
      Expr::Unary { arg, .. } => self.visit_expr(arg),
      Expr::Update { arg, .. } => {
        if let Expr::Ident(ident) = arg.as_mut() {
          self.resolve_ident(ident, true);
        } else {
          self.visit_expr(arg);
        }
      }
      Expr::Binary { left, right, .. } => {
        self.visit_expr(left);
        self.visit_expr(right);
      }
      Expr::Assign { target, value, .. } => {
        self.detect_cjs_export_write(target);
        match target.as_mut() {
          Expr::Ident(ident) => self.resolve_ident(ident, true),
          // Assigning through a namespace binding counts as a capture, so
          // the member access is not split into an import item.
          Expr::Member { obj, prop, .. } => {
            self.visit_expr(obj);
            if let MemberProp::Computed(prop) = prop {
              self.visit_expr(prop);
            }
          }
          other => self.visit_expr(other),
        }
        self.visit_expr(value);
      }
      Expr::Cond {
        test, cons, alt, ..
      } => {
        self.visit_expr(test);
        self.visit_expr(cons);
        self.visit_expr(alt);
      }
      Expr::Call {
        callee,
        args,
        import_record,
        ..
      } => {
        if let Some(record) = self.try_require_record(callee, args) {
          *import_record = Some(record);
          self.part_records.push(record);
          // the argument string stays untouched; the printer swaps the
          // whole call for __require(id)
          return;
        }
        self.visit_expr(callee);
        for arg in args {
          self.visit_expr(arg);
        }
      }
      Expr::New { callee, args, .. } => {
        self.visit_expr(callee);
        for arg in args {
          self.visit_expr(arg);
        }
      }
      Expr::Member { obj, prop, .. } => {
        self.visit_expr(obj);
        if let MemberProp::Computed(prop) = prop {
          self.visit_expr(prop);
        }
      }
      Expr::Seq { exprs, .. } => {
        for expr in exprs {
          self.visit_expr(expr);
        }
      }
      Expr::Spread { arg, .. } => self.visit_expr(arg),
      Expr::DynamicImport {
        arg,
        import_record,
        ..
      } => {
        if let Expr::Lit {
          value: Lit::Str(raw),
          loc,
        } = arg.as_ref()
        {
          let specifier = crate::lexer::cook_string(raw);
          let record = self.add_import_record(ImportRecord {
            specifier,
            kind: ImportKind::Namespace,
            imported_name: "*".to_string(),
            local_symbol: None,
            is_require: false,
            is_dynamic_import: true,
            resolved: None,
            loc: *loc,
          });
          *import_record = Some(record);
          self.part_records.push(record);
        } else {
          self.visit_expr(arg);
        }
      }
      Expr::Await { arg, .. } => self.visit_expr(arg),
      Expr::Yield { arg, .. } => {
        if let Some(arg) = arg {
          self.visit_expr(arg);
        }
      }
    }
  }

  /// `require("./x")` with an unshadowed `require` and a static string
  /// argument becomes an import record. A dynamic argument at the top level
  /// marks the module CommonJS-like.
  fn try_require_record(&mut self, callee: &Expr, args: &[Expr]) -> Option<u32> {
    let Expr::Ident(ident) = callee else {
      return None;
    };
    if ident.name != "require"
      || self.lookup_scoped("require")
      || self.module_bindings.contains_key("require")
    {
      return None;
    }
    match args {
      [Expr::Lit {
        value: Lit::Str(raw),
        loc,
      }] => {
        let specifier = crate::lexer::cook_string(raw);
        Some(self.add_import_record(ImportRecord {
          specifier,
          kind: ImportKind::Namespace,
          imported_name: "*".to_string(),
          local_symbol: None,
          is_require: true,
          is_dynamic_import: false,
          resolved: None,
          loc: *loc,
        }))
      }
      _ => {
        if self.scopes.is_empty() {
          self.has_top_level_dynamic_require = true;
        }
        // make sure `require` stays reserved
        self.unbound_symbol("require");
        None
      }
    }
  }

  fn detect_cjs_export_write(&mut self, target: &Expr) {
    let Expr::Member { obj, .. } = target else {
      return;
    };
    match obj.as_ref() {
      Expr::Ident(ident)
        if ident.name == "exports"
          && !self.lookup_scoped("exports")
          && !self.module_bindings.contains_key("exports") =>
      {
        self.has_cjs_exports = true;
      }
      Expr::Member {
        obj: inner,
        prop: MemberProp::Ident(prop, _),
        ..
      } => {
        if let Expr::Ident(ident) = inner.as_ref() {
          if ident.name == "module"
            && prop == "exports"
            && !self.lookup_scoped("module")
            && !self.module_bindings.contains_key("module")
          {
            self.has_cjs_exports = true;
          }
        }
      }
      _ => {}
    }
    // `module.exports = ...` directly
    if let Expr::Member {
      obj,
      prop: MemberProp::Ident(prop, _),
      ..
    } = target
    {
      if let Expr::Ident(ident) = obj.as_ref() {
        if ident.name == "module"
          && prop == "exports"
          && !self.lookup_scoped("module")
          && !self.module_bindings.contains_key("module")
        {
          self.has_cjs_exports = true;
        }
      }
    }
  }
}

fn member_path(expr: &Expr, out: &mut String) -> bool {
  match expr {
    Expr::Ident(ident) => {
      out.push_str(&ident.name);
      true
    }
    Expr::Member {
      obj,
      prop: MemberProp::Ident(name, _),
      ..
    } => {
      if !member_path(obj, out) {
        return false;
      }
      out.push('.');
      out.push_str(name);
      true
    }
    _ => false,
  }
}

fn collect_pat_names(pat: &Pat, f: &mut impl FnMut(&str)) {
  match pat {
    Pat::Ident(ident) => f(&ident.name),
    Pat::Array { elems, .. } => {
      for elem in elems.iter().flatten() {
        collect_pat_names(elem, f);
      }
    }
    Pat::Object { props, .. } => {
      for prop in props {
        match prop {
          ObjectPatProp::KeyValue { value, .. } => collect_pat_names(value, f),
          ObjectPatProp::Shorthand { ident, .. } => f(&ident.name),
        }
      }
    }
    Pat::Assign { pat, .. } => collect_pat_names(pat, f),
    Pat::Rest { arg, .. } => collect_pat_names(arg, f),
  }
}

fn collect_decl_names(stmt: &Stmt, out: &mut Vec<String>) {
  match stmt {
    Stmt::VarDecl { decls, .. } => {
      for decl in decls {
        collect_pat_names(&decl.pat, &mut |n| out.push(n.to_string()));
      }
    }
    Stmt::Func(decl) => {
      if let Some(ident) = &decl.function.ident {
        out.push(ident.name.clone());
      }
    }
    Stmt::Class(decl) => out.push(decl.ident.name.clone()),
    _ => {}
  }
}

fn collect_var_names(stmts: &[Stmt], out: &mut Vec<String>) {
  for stmt in stmts {
    match stmt {
      Stmt::VarDecl {
        kind: VarKind::Var,
        decls,
        ..
      } => {
        for decl in decls {
          collect_pat_names(&decl.pat, &mut |n| out.push(n.to_string()));
        }
      }
      Stmt::Block { stmts, .. } => collect_var_names(stmts, out),
      Stmt::If { cons, alt, .. } => {
        collect_var_names(std::slice::from_ref(cons), out);
        if let Some(alt) = alt {
          collect_var_names(std::slice::from_ref(alt), out);
        }
      }
      Stmt::For { init, body, .. } => {
        if let Some(ForInit::VarDecl {
          kind: VarKind::Var,
          decls,
        }) = init
        {
          for decl in decls {
            collect_pat_names(&decl.pat, &mut |n| out.push(n.to_string()));
          }
        }
        collect_var_names(std::slice::from_ref(body), out);
      }
      Stmt::ForIn { head, body, .. } => {
        if let ForHead::VarDecl {
          kind: VarKind::Var,
          pat,
        } = head
        {
          collect_pat_names(pat, &mut |n| out.push(n.to_string()));
        }
        collect_var_names(std::slice::from_ref(body), out);
      }
      Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
        collect_var_names(std::slice::from_ref(body), out)
      }
      Stmt::Try {
        block,
        catch,
        finally,
        ..
      } => {
        collect_var_names(block, out);
        if let Some(catch) = catch {
          collect_var_names(&catch.body, out);
        }
        if let Some(finally) = finally {
          collect_var_names(finally, out);
        }
      }
      Stmt::Switch { cases, .. } => {
        for case in cases {
          collect_var_names(&case.body, out);
        }
      }
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Parser;

  fn scan_source(source: &str) -> (Module, ScanResult) {
    let mut module = Parser::new("/test.js", source)
      .unwrap()
      .parse_module()
      .unwrap();
    let defines = FxHashMap::default();
    let pure_functions = FxHashSet::default();
    let result = scan(
      &mut module,
      ScanOptions {
        module_id: ModuleId::new(0),
        path: "/test.js",
        namespace_symbol_name: "test_ns".to_string(),
        defines: &defines,
        pure_functions: &pure_functions,
      },
    );
    (module, result)
  }

  #[test]
  fn records_imports_and_exports() {
    let (_, result) = scan_source("import a, { b } from './x'\nexport const c = 1\nexport * from './y'");
    assert_eq!(result.import_records.len(), 3);
    assert_eq!(result.import_records[0].imported_name, "default");
    assert_eq!(result.import_records[1].imported_name, "b");
    assert_eq!(result.import_records[2].kind, ImportKind::ExportStar);
    assert_eq!(result.export_records.len(), 1);
    assert_eq!(result.export_records[0].exported_as, "c");
    assert_eq!(result.star_exports, vec![2]);
    assert_eq!(result.export_kind, ExportKind::Esm);
  }

  #[test]
  fn classifies_commonjs_modules() {
    let (_, result) = scan_source("exports.foo = 123");
    assert_eq!(result.export_kind, ExportKind::CommonJs);
    let (_, result) = scan_source("module.exports = { a: 1 }");
    assert_eq!(result.export_kind, ExportKind::CommonJs);
    let (_, result) = scan_source("export const a = 1; exports.b = 2");
    assert_eq!(result.export_kind, ExportKind::Mixed);
  }

  #[test]
  fn rewrites_namespace_property_access_into_import_items() {
    let (module, result) = scan_source("import * as ns from './foo'\nconsole.log(ns.foo, ns.foo)");
    // one namespace record plus one shared import item
    assert_eq!(result.import_records.len(), 2);
    assert_eq!(result.import_records[1].imported_name, "foo");
    // the namespace binding itself is never used as a value
    let ns_index = result.symbols.find_by_name("ns").unwrap();
    assert_eq!(result.symbols.get(ns_index).use_count, 0);
    // the member expression was replaced by a plain identifier
    let Stmt::Expr { expr, .. } = &module.body[1] else {
      panic!()
    };
    let Expr::Call { args, .. } = expr else { panic!() };
    assert!(matches!(&args[0], Expr::Ident(i) if i.sym.is_some()));
  }

  #[test]
  fn capturing_the_namespace_counts_a_use() {
    let (_, result) = scan_source("import * as ns from './foo'\nconsole.log(ns, ns.foo)");
    let ns_index = result.symbols.find_by_name("ns").unwrap();
    assert_eq!(result.symbols.get(ns_index).use_count, 1);
  }

  #[test]
  fn collects_require_and_dynamic_import_records() {
    let (_, result) = scan_source("const dep = require('./dep')\nconst lazy = import('./lazy')");
    assert_eq!(result.import_records.len(), 2);
    assert!(result.import_records[0].is_require);
    assert!(result.import_records[1].is_dynamic_import);
    assert_eq!(result.export_kind, ExportKind::None);
  }

  #[test]
  fn statement_parts_track_declarations_and_references() {
    let (_, result) = scan_source("const a = 1\nconst b = a + 1\nconsole.log(b)");
    assert_eq!(result.parts.len(), 3);
    assert_eq!(result.parts[0].declared.len(), 1);
    assert!(!result.parts[0].side_effect);
    assert!(!result.parts[1].side_effect);
    assert!(result.parts[2].side_effect);
    let a = result.symbols.find_by_name("a").unwrap();
    assert!(result.parts[1]
      .referenced
      .iter()
      .any(|r| r.index == a));
    assert!(result.visited_global_names.contains("console"));
  }

  #[test]
  fn nested_scopes_do_not_leak_into_module_bindings() {
    let (_, result) = scan_source("function f(x) { let y = x; var z = y; return z }\nlet top = 1");
    assert!(result.symbols.find_by_name("f").is_some());
    assert!(result.declared_scoped_names.contains("x"));
    assert!(result.declared_scoped_names.contains("y"));
    assert!(result.declared_scoped_names.contains("z"));
    assert!(result.symbols.find_by_name("top").is_some());
  }

  #[test]
  fn var_in_top_level_blocks_hoists_to_module_scope() {
    let (_, result) = scan_source("if (cond) { var hoisted = 1 }\nconsole.log(hoisted)");
    assert!(result.symbols.find_by_name("hoisted").is_some());
    assert!(!result.declared_scoped_names.contains("hoisted"));
  }

  #[test]
  fn mutation_marks_symbols() {
    let (_, result) = scan_source("let count = 0\ncount += 1");
    let index = result.symbols.find_by_name("count").unwrap();
    assert!(result.symbols.get(index).mutated);
  }
}
