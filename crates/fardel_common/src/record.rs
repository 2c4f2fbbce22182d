use crate::{Loc, ModuleId, SymbolRef};

/// How an import binds names from its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
  /// `import foo from './a'`
  Default,
  /// `import { foo } from './a'`
  Named,
  /// A synthetic import item split off a `ns.foo` property access; missing
  /// names degrade to a namespace read instead of erroring.
  ImportItem,
  /// `import * as ns from './a'`
  Namespace,
  /// `import './a'`
  SideEffect,
  /// `export * from './a'`
  ExportStar,
}

/// One import edge out of a module. Named clauses of a single `import`
/// statement each get their own record; records with the same specifier
/// share a resolution.
#[derive(Debug, Clone)]
pub struct ImportRecord {
  pub specifier: String,
  pub kind: ImportKind,
  /// `default`, `*`, or the named binding. Empty for side-effect imports.
  pub imported_name: String,
  /// The local binding symbol in the importer. None for side-effect
  /// imports and bare `require`/`import()` expressions.
  pub local_symbol: Option<SymbolRef>,
  pub is_require: bool,
  pub is_dynamic_import: bool,
  /// Filled by the graph builder. External targets get an arena slot too;
  /// `None` only survives when resolution failed.
  pub resolved: Option<ModuleId>,
  pub loc: Loc,
}

/// `export { foo as foo2 } from './foo'`: `foo` is `imported`, `foo2` is
/// `exported_as`, and `record` points at the import record carrying the
/// specifier.
#[derive(Debug, Clone)]
pub enum ExportItem {
  Local(SymbolRef),
  ReExport { record: u32, imported: String },
}

#[derive(Debug, Clone)]
pub struct ExportRecord {
  pub exported_as: String,
  pub item: ExportItem,
  pub loc: Loc,
}

/// A fully resolved export: `symbol` lives in `owner`, which either declared
/// it or imported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSpecifier {
  pub exported_as: String,
  pub symbol: SymbolRef,
  pub owner: ModuleId,
}

/// What a module statically is, before interop classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
  None,
  Esm,
  CommonJs,
  Mixed,
}

impl ExportKind {
  pub fn is_commonjs_like(self) -> bool {
    matches!(self, ExportKind::CommonJs | ExportKind::Mixed)
  }
}
