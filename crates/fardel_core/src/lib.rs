mod bundler;
pub use bundler::*;
mod bundle;
pub use bundle::*;
mod chunk;
pub use chunk::*;
mod chunk_graph;
pub(crate) use chunk_graph::*;
mod code_splitter;
pub use code_splitter::*;
mod external_module;
pub use external_module::*;
mod graph;
pub use graph::*;
mod linker;
mod metafile;
pub use metafile::*;
mod module_loader;
mod norm_or_ext;
pub use norm_or_ext::*;
mod normal_module;
pub use normal_module::*;
mod options;
pub use options::*;
mod plugin_driver;
pub(crate) use plugin_driver::*;
mod renamer;
mod treeshake;
mod utils;
pub use utils::*;

pub type BuildResult<T> = std::result::Result<T, fardel_error::Errors>;
pub type UnaryBuildResult<T> = fardel_error::Result<T>;
pub type BuildError = fardel_error::Error;
