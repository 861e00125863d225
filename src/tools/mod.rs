//! Data-preparation and post-processing utilities around the retrieval batch.

pub mod codeblock;
pub mod slice;
pub mod snippets;
pub mod tsv;
