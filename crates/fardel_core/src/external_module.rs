use fardel_common::{ModuleId, ModulePath, SymbolRef, SymbolTable, NAMESPACE_SYMBOL_INDEX};

/// A module left to the host runtime. It owns a single namespace symbol that
/// every importing chunk binds once (`import * as x from "spec"` or
/// `var x = __toModule(require("spec"))`).
#[derive(Debug)]
pub struct ExternalModule {
  pub exec_order: usize,
  pub id: ModuleId,
  /// The original specifier, verbatim.
  pub path: ModulePath,
  pub symbols: SymbolTable,
}

impl ExternalModule {
  pub fn new(id: ModuleId, specifier: &str) -> Self {
    let stem = specifier
      .rsplit('/')
      .next()
      .unwrap_or(specifier)
      .split('.')
      .next()
      .unwrap_or("external");
    let name = crate::make_legal(stem);
    Self {
      exec_order: usize::MAX,
      id,
      path: ModulePath::new(specifier, "external"),
      symbols: SymbolTable::new(name),
    }
  }

  pub fn namespace_symbol(&self) -> SymbolRef {
    SymbolRef::new(self.id, NAMESPACE_SYMBOL_INDEX)
  }
}
