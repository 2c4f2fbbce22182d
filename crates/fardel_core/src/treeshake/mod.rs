//! Mark phase of dead-code elimination. Seeds: side-effectful top-level
//! statements of every module in the graph (a module in the graph was
//! imported, so it executes), plus every export of an entry. Then a plain
//! worklist closure over symbol references, link redirects, namespace
//! aliases, and import records. Wrapped modules are all-or-nothing.

use fardel_common::{ModuleId, SymbolRef};

use crate::{Graph, NormOrExt};

#[derive(Debug, Clone, Copy)]
enum WorkItem {
  Symbol(SymbolRef),
  Part(ModuleId, usize),
  WrappedModule(ModuleId),
}

pub(crate) fn treeshake(graph: &mut Graph) {
  let mut work: Vec<WorkItem> = vec![];

  for (index, module) in graph.modules.iter().enumerate() {
    let id = ModuleId::new(index as u32);
    let NormOrExt::Normal(module) = module else {
      continue;
    };

    let is_entry = module.is_user_defined_entry || module.is_dynamic_entry || module.is_injected;

    if module.must_wrap {
      if is_entry {
        work.push(WorkItem::WrappedModule(id));
      }
    } else if module.has_side_effects {
      for (part_index, part) in module.parts.iter().enumerate() {
        if part.side_effect {
          work.push(WorkItem::Part(id, part_index));
        }
      }
    }

    if is_entry {
      let mut exports: Vec<SymbolRef> = module
        .linked_exports
        .values()
        .map(|spec| spec.symbol)
        .collect();
      exports.sort_unstable();
      for symbol in exports {
        work.push(WorkItem::Symbol(symbol));
      }
    }
  }

  while let Some(item) = work.pop() {
    match item {
      WorkItem::Symbol(sym) => {
        if !graph.used_symbols.insert(sym) {
          continue;
        }
        let data = graph.symbol_data(sym).clone();
        if let Some(link) = data.link {
          work.push(WorkItem::Symbol(link));
        }
        if let Some(alias) = &data.namespace_alias {
          work.push(WorkItem::Symbol(alias.namespace));
        }
        if let NormOrExt::Normal(module) = graph.module(sym.module) {
          if module.must_wrap {
            work.push(WorkItem::WrappedModule(sym.module));
          } else if let Some(parts) = module.declared_to_parts.get(&sym.index) {
            for &part_index in parts {
              work.push(WorkItem::Part(sym.module, part_index));
            }
          }
        }
      }
      WorkItem::Part(id, part_index) => {
        let NormOrExt::Normal(module) = graph.module(id) else {
          continue;
        };
        if module.parts[part_index].included {
          continue;
        }
        let part = module.parts[part_index].clone();
        {
          let module = graph.module_mut(id).expect_norm_mut();
          module.parts[part_index].included = true;
        }
        for declared in &part.declared {
          work.push(WorkItem::Symbol(SymbolRef::new(id, *declared)));
        }
        for referenced in &part.referenced {
          work.push(WorkItem::Symbol(*referenced));
        }
        for &record_index in &part.import_records {
          let record = &graph.module(id).expect_norm().import_records[record_index as usize];
          let Some(target) = record.resolved else {
            continue;
          };
          let wants_instantiation = record.is_require || record.is_dynamic_import || {
            matches!(
              graph.module(target),
              NormOrExt::Normal(target_module) if target_module.must_wrap
            )
          };
          if wants_instantiation {
            if let NormOrExt::Normal(_) = graph.module(target) {
              work.push(WorkItem::WrappedModule(target));
            }
          }
        }
      }
      WorkItem::WrappedModule(id) => {
        let NormOrExt::Normal(module) = graph.module(id) else {
          continue;
        };
        if module.wrapped_included {
          continue;
        }
        graph.module_mut(id).expect_norm_mut().wrapped_included = true;
        let part_count = graph.module(id).expect_norm().parts.len();
        for part_index in 0..part_count {
          work.push(WorkItem::Part(id, part_index));
        }
      }
    }
  }
}

/// `--no-treeshake`: everything is live.
pub(crate) fn include_everything(graph: &mut Graph) {
  let mut used = std::mem::take(&mut graph.used_symbols);
  for (index, module) in graph.modules.iter_mut().enumerate() {
    let id = ModuleId::new(index as u32);
    match module {
      NormOrExt::Normal(module) => {
        for part in &mut module.parts {
          part.included = true;
        }
        if module.must_wrap {
          module.wrapped_included = true;
        }
        for (sym_index, _) in module.symbols.iter() {
          used.insert(SymbolRef::new(id, sym_index));
        }
      }
      NormOrExt::External(_) => {
        used.insert(SymbolRef::new(id, 0));
      }
    }
  }
  graph.used_symbols = used;
}

#[cfg(test)]
mod tests {
  // Exercised end-to-end through the bundler scenario tests; the pure parts
  // of the mark phase are covered by the scanner's side-effect analysis.
}
