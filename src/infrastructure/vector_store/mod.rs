mod hnsw;

pub use hnsw::HnswVectorIndex;
