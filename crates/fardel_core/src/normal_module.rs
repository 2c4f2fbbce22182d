use derivative::Derivative;
use fardel_common::{
  ExportKind, ExportRecord, ExportedSpecifier, ImportRecord, Loader, ModuleId, ModulePath,
  SymbolData, SymbolKind, SymbolRef, SymbolTable, NAMESPACE_SYMBOL_INDEX,
};
use fardel_syntax::ast;
use fardel_syntax::StatementPart;
use rustc_hash::{FxHashMap, FxHashSet};

/// One parsed source file: AST, symbol table, records, and the tree-shaking
/// parts. Created by the module loader, linked by the import/export linker,
/// tagged by the tree-shaker, and read-only afterwards.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct NormalModule {
  pub exec_order: usize,
  pub id: ModuleId,
  pub path: ModulePath,
  #[derivative(Debug = "ignore")]
  pub source: String,
  pub source_hash: u64,
  pub loader: Loader,
  #[derivative(Debug = "ignore")]
  pub ast: ast::Module,
  pub symbols: SymbolTable,
  pub import_records: Vec<ImportRecord>,
  pub export_records: Vec<ExportRecord>,
  pub star_exports: Vec<u32>,
  pub parts: Vec<StatementPart>,
  pub declared_to_parts: FxHashMap<u32, Vec<usize>>,
  pub export_kind: ExportKind,
  pub is_user_defined_entry: bool,
  pub is_dynamic_entry: bool,
  pub is_injected: bool,
  /// CommonJS-like, dynamically imported, required, or cycled with one of
  /// those: emitted as a lazily-invoked registry entry.
  pub must_wrap: bool,
  /// Included as a whole because some live code instantiates it.
  pub wrapped_included: bool,
  /// Cleared when the owning package declares `"sideEffects": false`.
  pub has_side_effects: bool,
  /// Static dependencies in source order.
  pub dependencies: Vec<ModuleId>,
  pub dyn_dependencies: Vec<ModuleId>,
  pub referenced_by: FxHashSet<ModuleId>,
  /// Full namespace membership after linking: local exports, named
  /// re-exports, and star-derived names, ambiguous names removed.
  pub linked_exports: FxHashMap<String, ExportedSpecifier>,
  pub ambiguous_exports: FxHashSet<String>,
  /// External modules reachable through `export *`, in discovery order.
  pub external_star_records: Vec<ModuleId>,
  pub visited_global_names: FxHashSet<String>,
  pub declared_scoped_names: FxHashSet<String>,
  /// Some import binding links to this module's namespace symbol, so the
  /// namespace object part exists (it still tree-shakes away when unused).
  pub is_namespace_referenced: bool,
  /// Index into `parts` of the synthesized namespace object literal.
  pub namespace_part: Option<usize>,
  /// Interop namespace bindings created for imports from wrapped or
  /// external targets, one per target module.
  pub interop_ns: FxHashMap<ModuleId, u32>,
  /// `file`-loader payload copied to the output directory.
  #[derivative(Debug = "ignore")]
  pub file_asset: Option<(String, Vec<u8>)>,
}

impl NormalModule {
  pub fn namespace_symbol(&self) -> SymbolRef {
    SymbolRef::new(self.id, NAMESPACE_SYMBOL_INDEX)
  }

  pub fn symbol(&self, index: u32) -> &SymbolData {
    self.symbols.get(index)
  }

  pub fn add_part(&mut self, part: StatementPart) -> usize {
    let index = self.parts.len();
    for declared in &part.declared {
      self
        .declared_to_parts
        .entry(*declared)
        .or_default()
        .push(index);
    }
    self.parts.push(part);
    index
  }

  pub fn rebuild_declared_to_parts(&mut self) {
    let mut map: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
    for (index, part) in self.parts.iter().enumerate() {
      for declared in &part.declared {
        map.entry(*declared).or_default().push(index);
      }
    }
    self.declared_to_parts = map;
  }

  /// A fresh module-level symbol whose name cannot collide with anything
  /// already declared here.
  pub fn create_top_level_symbol(&mut self, hint: &str, kind: SymbolKind) -> SymbolRef {
    let legal = crate::make_legal(hint);
    let index = self.symbols.create_unique(&legal, kind);
    SymbolRef::new(self.id, index)
  }

  pub fn find_exported(&self, name: &str) -> Option<&ExportedSpecifier> {
    self.linked_exports.get(name)
  }

  pub fn is_included(&self) -> bool {
    self.wrapped_included || self.parts.iter().any(|p| p.included)
  }

  pub fn stem(&self) -> String {
    self
      .path
      .path
      .rsplit('/')
      .next()
      .unwrap_or("module")
      .split('.')
      .next()
      .unwrap_or("module")
      .to_string()
  }
}
