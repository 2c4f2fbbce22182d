use fardel_common::{ModuleId, ModulePath, SymbolData, SymbolRef};

use crate::{external_module::ExternalModule, normal_module::NormalModule};

#[derive(Debug)]
pub enum NormOrExt {
  Normal(NormalModule),
  External(ExternalModule),
}

impl NormOrExt {
  pub fn id(&self) -> ModuleId {
    match self {
      NormOrExt::Normal(module) => module.id,
      NormOrExt::External(module) => module.id,
    }
  }

  pub fn path(&self) -> &ModulePath {
    match self {
      NormOrExt::Normal(module) => &module.path,
      NormOrExt::External(module) => &module.path,
    }
  }

  pub fn is_external(&self) -> bool {
    matches!(self, NormOrExt::External(_))
  }

  pub fn dependencies(&self) -> &[ModuleId] {
    static DUMMY: [ModuleId; 0] = [];
    match self {
      NormOrExt::Normal(module) => &module.dependencies,
      NormOrExt::External(_) => &DUMMY,
    }
  }

  pub fn dynamic_dependencies(&self) -> &[ModuleId] {
    static DUMMY: [ModuleId; 0] = [];
    match self {
      NormOrExt::Normal(module) => &module.dyn_dependencies,
      NormOrExt::External(_) => &DUMMY,
    }
  }

  pub fn exec_order(&self) -> usize {
    match self {
      NormOrExt::Normal(module) => module.exec_order,
      NormOrExt::External(module) => module.exec_order,
    }
  }

  pub fn set_exec_order(&mut self, exec_order: usize) {
    match self {
      NormOrExt::Normal(module) => module.exec_order = exec_order,
      NormOrExt::External(module) => module.exec_order = exec_order,
    }
  }

  pub fn symbol(&self, sym: SymbolRef) -> &SymbolData {
    debug_assert_eq!(self.id(), sym.module);
    match self {
      NormOrExt::Normal(module) => module.symbols.get(sym.index),
      NormOrExt::External(module) => module.symbols.get(sym.index),
    }
  }

  pub fn as_norm(&self) -> Option<&NormalModule> {
    match self {
      NormOrExt::Normal(module) => Some(module),
      _ => None,
    }
  }

  pub fn as_norm_mut(&mut self) -> Option<&mut NormalModule> {
    match self {
      NormOrExt::Normal(module) => Some(module),
      _ => None,
    }
  }

  pub fn as_ext(&self) -> Option<&ExternalModule> {
    match self {
      NormOrExt::External(module) => Some(module),
      _ => None,
    }
  }

  pub fn expect_norm(&self) -> &NormalModule {
    match self {
      NormOrExt::Normal(module) => module,
      NormOrExt::External(module) => {
        panic!("Expected NormalModule, got ExternalModule({})", module.path)
      }
    }
  }

  pub fn expect_norm_mut(&mut self) -> &mut NormalModule {
    match self {
      NormOrExt::Normal(module) => module,
      NormOrExt::External(module) => {
        panic!("Expected NormalModule, got ExternalModule({})", module.path)
      }
    }
  }
}
