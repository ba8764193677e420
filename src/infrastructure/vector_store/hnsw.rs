use hora::core::ann_index::ANNIndex;
use hora::core::metrics::Metric;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;

use crate::domain::{
    ports::{AnnMatch, VectorIndex},
    DocId, Embedding, PipelineError,
};
use crate::infrastructure::config::IndexConfig;

/// HNSW graph over the corpus embeddings, inner-product similarity.
///
/// Built once per ingestion run; read-only afterwards, so concurrent
/// searches need no locking. Vector `i` belongs to the document with
/// handle `i`.
pub struct HnswVectorIndex {
    index: HNSWIndex<f32, usize>,
    dimension: usize,
    len: usize,
}

impl HnswVectorIndex {
    pub fn build(
        embeddings: &[Embedding],
        dimension: usize,
        config: &IndexConfig,
    ) -> Result<Self, PipelineError> {
        if embeddings.is_empty() {
            return Err(PipelineError::index_build(
                "cannot build an index over zero vectors",
            ));
        }

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.dimension() != dimension {
                return Err(PipelineError::index_build(format!(
                    "vector {i} has dimension {}, expected {dimension}",
                    embedding.dimension()
                )));
            }
        }

        let params = HNSWParams::<f32>::default()
            .max_item(embeddings.len())
            .n_neighbor(config.max_connections)
            .n_neighbor0(config.max_connections * 2)
            .ef_build(config.construction_quality)
            .ef_search(config.search_quality);

        let mut index = HNSWIndex::new(dimension, &params);
        for (i, embedding) in embeddings.iter().enumerate() {
            index
                .add(embedding.as_slice(), i)
                .map_err(PipelineError::index_build)?;
        }
        index
            .build(Metric::DotProduct)
            .map_err(PipelineError::index_build)?;

        Ok(Self {
            index,
            dimension,
            len: embeddings.len(),
        })
    }
}

impl VectorIndex for HnswVectorIndex {
    fn search(&self, query: &[f32], top_k: usize) -> Vec<AnnMatch> {
        self.index
            .search_nodes(query, top_k)
            .into_iter()
            .filter_map(|(node, distance)| {
                node.idx().as_ref().map(|&i| AnnMatch {
                    doc: DocId(i),
                    distance,
                })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
