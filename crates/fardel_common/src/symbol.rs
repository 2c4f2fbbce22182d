use std::fmt::Debug;

use rustc_hash::FxHashMap;

use crate::ModuleId;

/// Identity of a symbol: the owning module plus the index into that
/// module's symbol vector.
#[derive(Hash, Clone, Copy, PartialEq, PartialOrd, Eq, Ord)]
pub struct SymbolRef {
  pub module: ModuleId,
  pub index: u32,
}

impl SymbolRef {
  pub fn new(module: ModuleId, index: u32) -> Self {
    Self { module, index }
  }
}

impl Debug for SymbolRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "SymbolRef({}#{})", self.module, self.index)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
  Variable,
  Function,
  Class,
  ImportBinding,
  Namespace,
  Unbound,
}

/// A read of `<namespace>.<prop>` that must stay late-bound: the symbol
/// prints as a property access on the namespace binding instead of a direct
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceAlias {
  pub namespace: SymbolRef,
  pub prop: String,
}

#[derive(Debug, Clone)]
pub struct SymbolData {
  pub name: String,
  pub kind: SymbolKind,
  /// The symbol is written to after its declaration.
  pub mutated: bool,
  /// References from inside the owning module.
  pub use_count: u32,
  /// References that reach this symbol through import links.
  pub uses_from_other_modules: u32,
  /// Redirect installed by import/export linking. Chains terminate; cycles
  /// are collapsed during linking.
  pub link: Option<SymbolRef>,
  pub namespace_alias: Option<NamespaceAlias>,
}

impl SymbolData {
  fn new(name: String, kind: SymbolKind) -> Self {
    Self {
      name,
      kind,
      mutated: false,
      use_count: 0,
      uses_from_other_modules: 0,
      link: None,
      namespace_alias: None,
    }
  }
}

/// Per-module symbol arena. Slot 0 is always the module's namespace symbol.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
  symbols: Vec<SymbolData>,
  by_name: FxHashMap<String, u32>,
}

/// Index of the facade namespace symbol inside every symbol table.
pub const NAMESPACE_SYMBOL_INDEX: u32 = 0;

impl SymbolTable {
  pub fn new(namespace_name: String) -> Self {
    let mut table = Self::default();
    table.create(namespace_name, SymbolKind::Namespace);
    table
  }

  pub fn create(&mut self, name: String, kind: SymbolKind) -> u32 {
    let index = self.symbols.len() as u32;
    self.by_name.insert(name.clone(), index);
    self.symbols.push(SymbolData::new(name, kind));
    index
  }

  /// Create a symbol whose name does not collide with any name already in
  /// the table. Collisions get a numeric suffix starting at 2.
  pub fn create_unique(&mut self, hint: &str, kind: SymbolKind) -> u32 {
    let mut name = hint.to_string();
    let mut n = 1;
    while self.by_name.contains_key(&name) {
      n += 1;
      name = format!("{hint}{n}");
    }
    self.create(name, kind)
  }

  pub fn find_by_name(&self, name: &str) -> Option<u32> {
    self.by_name.get(name).copied()
  }

  pub fn get(&self, index: u32) -> &SymbolData {
    &self.symbols[index as usize]
  }

  pub fn get_mut(&mut self, index: u32) -> &mut SymbolData {
    &mut self.symbols[index as usize]
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &SymbolData)> {
    self.symbols.iter().enumerate().map(|(i, s)| (i as u32, s))
  }
}
