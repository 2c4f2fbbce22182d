//! Output identifier assignment for one chunk. Every live canonical symbol
//! owned by the chunk gets a name that collides with nothing else in the
//! chunk: other live symbols, host globals observed in any module, names
//! declared in nested scopes, runtime helper names, and the format preset.
//! Collisions take the smallest free numeric suffix; ties between symbols
//! break by (module id, symbol index) ascending.

use fardel_common::{ModuleId, SymbolKind, SymbolRef};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{make_legal, preset_of_used_names, Graph, MinifiedNames, ModuleFormat, NormOrExt, RESERVED_NAMES};

pub(crate) struct RenamerInput<'a> {
  pub graph: &'a Graph,
  /// Chunk modules sorted by module id.
  pub modules: &'a [ModuleId],
  pub format: ModuleFormat,
  /// Names the runtime prelude of this chunk defines.
  pub helper_names: Vec<String>,
  /// Final names of symbols imported from other chunks; reserved here.
  pub foreign_names: Vec<String>,
  pub minify_identifiers: bool,
}

pub(crate) fn assign_names(input: RenamerInput) -> FxHashMap<SymbolRef, String> {
  let RenamerInput {
    graph,
    modules,
    format,
    helper_names,
    foreign_names,
    minify_identifiers,
  } = input;

  let mut used_names: FxHashSet<String> = FxHashSet::default();
  used_names.extend(preset_of_used_names(format));
  used_names.extend(helper_names);
  used_names.extend(foreign_names);

  let in_chunk: FxHashSet<ModuleId> = modules.iter().copied().collect();

  for &id in modules {
    if let NormOrExt::Normal(module) = graph.module(id) {
      used_names.extend(module.visited_global_names.iter().cloned());
      used_names.extend(module.declared_scoped_names.iter().cloned());
    }
  }

  // Candidates in deterministic order: module id ascending, then symbol
  // index ascending.
  let mut candidates: Vec<SymbolRef> = vec![];
  let mut seen: FxHashSet<SymbolRef> = FxHashSet::default();
  for &id in modules {
    let module = graph.module(id);
    if let NormOrExt::Normal(normal) = module {
      // Wrapped modules keep their own function scope; their locals print
      // under original names.
      if normal.must_wrap {
        continue;
      }
    }
    let symbol_count = match module {
      NormOrExt::Normal(normal) => normal.symbols.len(),
      NormOrExt::External(external) => external.symbols.len(),
    };
    for index in 0..symbol_count {
      let sym = SymbolRef::new(id, index as u32);
      let canonical = graph.canonical(sym);
      if !in_chunk.contains(&canonical.module) {
        continue;
      }
      if !graph.used_symbols.contains(&canonical) && !graph.used_symbols.contains(&sym) {
        continue;
      }
      let data = graph.symbol_data(canonical);
      if data.namespace_alias.is_some() {
        continue;
      }
      if data.kind == SymbolKind::Unbound {
        continue;
      }
      if let NormOrExt::Normal(owner) = graph.module(canonical.module) {
        if owner.must_wrap {
          continue;
        }
      }
      if seen.insert(canonical) {
        candidates.push(canonical);
      }
    }
  }

  let mut names: FxHashMap<SymbolRef, String> = FxHashMap::default();

  if minify_identifiers {
    // Frequency-ordered short names; hotter symbols get shorter names.
    let mut by_frequency = candidates.clone();
    by_frequency.sort_by_key(|sym| {
      let data = graph.symbol_data(*sym);
      (
        std::cmp::Reverse(data.use_count + data.uses_from_other_modules),
        sym.module,
        sym.index,
      )
    });
    let mut generator = MinifiedNames::new();
    for sym in by_frequency {
      let name = loop {
        let candidate = generator.next_name();
        if RESERVED_NAMES.contains(candidate.as_str()) || used_names.contains(&candidate) {
          continue;
        }
        break candidate;
      };
      used_names.insert(name.clone());
      names.insert(sym, name);
    }
    return names;
  }

  for sym in candidates {
    let data = graph.symbol_data(sym);
    let base = graph
      .suggested_names
      .get(&sym)
      .cloned()
      .unwrap_or_else(|| data.name.clone());
    let base = make_legal(&base);

    let mut name = base.clone();
    let mut suffix = 1u32;
    while used_names.contains(&name) {
      suffix += 1;
      name = format!("{base}{suffix}");
    }
    used_names.insert(name.clone());
    names.insert(sym, name);
  }

  names
}
