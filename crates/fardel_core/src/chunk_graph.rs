use fardel_common::{ChunkId, ModuleId};
use rustc_hash::FxHashMap;

use crate::Chunk;

/// The planned set of output chunks plus the module-to-chunk assignment.
#[derive(Debug, Default)]
pub(crate) struct ChunkGraph {
  pub chunks: Vec<Chunk>,
  pub module_to_chunk: FxHashMap<ModuleId, ChunkId>,
}
