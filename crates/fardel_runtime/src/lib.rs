//! The runtime prelude: tiny JavaScript helpers injected into a chunk when
//! emitted code actually calls them. Helper tracking is cheap enough to flip
//! flags from parallel render passes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default, Debug)]
pub struct RuntimeHelpers {
  inner: Inner,
}

macro_rules! define_helpers {
    (
        Helpers {
            $( $name:ident ( $( $declared:ident ),* ): ( $( $dep:ident ),* ), )*
        }
    ) => {

        #[derive(Debug, Default)]
        struct Inner {
            $( $name: AtomicBool, )*
        }

        impl RuntimeHelpers {
            pub fn extend_from(&self, other: &Self) {
                $(
                    if other.inner.$name.load(Ordering::SeqCst) {
                        self.inner.$name.store(true, Ordering::Relaxed);
                        self.$name();
                    }
                )*
            }

            /// Snippet sources in declaration order; dependencies are listed
            /// before their dependents below, so plain ordering works.
            pub fn generate_helpers(&self) -> Vec<&'static str> {
                let mut to = vec![];
                $(
                    if self.inner.$name.load(Ordering::Relaxed) {
                        to.push(include_str!(concat!(
                            "./snippets/_",
                            stringify!($name),
                            ".js"
                        )));
                    }
                )*
                to
            }

            pub fn is_used_any_helpers(&self) -> bool {
                $(
                    if self.inner.$name.load(Ordering::Relaxed) {
                        return true;
                    }
                )*
                false
            }

            /// Identifiers the prelude defines; the renamer reserves these.
            pub fn used_names(&self) -> HashSet<&'static str> {
                let mut to = HashSet::new();
                $(
                    if self.inner.$name.load(Ordering::Relaxed) {
                        $(
                            to.insert(stringify!($declared));
                        )*
                    }
                )*
                to
            }

            $(
                pub fn $name(&self) {
                    self.inner.$name.store(true, Ordering::Relaxed);
                    $(
                        self.$dep();
                    )*
                }
            )*
        }
    };
}

impl RuntimeHelpers {
  pub fn new() -> Self {
    Self::default()
  }
}

define_helpers!(Helpers {
    export(__export): (),
    common_js(__commonJS): (),
    require(__require, __cache, __modules): (common_js),
    to_module(__toModule): (),
    import(__import): (require, to_module),
});

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn import_pulls_its_dependencies() {
    let helpers = RuntimeHelpers::new();
    helpers.import();
    let names = helpers.used_names();
    assert!(names.contains("__import"));
    assert!(names.contains("__require"));
    assert!(names.contains("__toModule"));
    assert!(names.contains("__commonJS"));
    assert_eq!(helpers.generate_helpers().len(), 4);
  }

  #[test]
  fn unused_helpers_are_not_emitted() {
    let helpers = RuntimeHelpers::new();
    assert!(!helpers.is_used_any_helpers());
    helpers.export();
    let sources = helpers.generate_helpers();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].contains("__export"));
  }

  #[test]
  fn extend_from_merges_flags() {
    let a = RuntimeHelpers::new();
    a.require();
    let b = RuntimeHelpers::new();
    b.extend_from(&a);
    assert!(b.used_names().contains("__require"));
    assert!(b.used_names().contains("__commonJS"));
  }
}
