pub mod cluster;
pub mod collator;
pub mod corpus;
pub mod dataloader;
pub mod dataset;
pub mod field;
pub mod minibatch;
pub mod readers;
pub mod sampler;

pub use cluster::{Bucket, Clusterer, KMeans};
pub use collator::{pad_sequence, Collator, PaddingCollator, PaddingSide};
pub use corpus::{Corpus, Sentence};
pub use dataloader::{batchify, DataLoader, DataLoaderConfig, DataLoaderIter};
pub use dataset::{TextDataset, TextDatasetBuilder};
pub use field::{Field, FieldSpec, FieldValue, NumericField, SubwordField, TokenField, Vocab};
pub use minibatch::{BatchColumn, MiniBatch};
pub use sampler::{BatchSampler, BucketsSampler, Sampler, SequentialSampler};
