//! # Votematch Vector Store
//!
//! Read-only latent policy spaces, one per topic cluster.
//!
//! ## Architecture
//!
//! ```text
//! cluster_vectors.json (weighted PCA/SVD output)
//!     │
//!     ├──> ClusterCatalog
//!     │      └─> Arc<ClusterVectorData> per cluster label
//!     │            ├─> member vectors
//!     │            ├─> bill loadings + discriminative power
//!     │            └─> explained variance + representative bills
//!     │
//!     └──> BillCatalog (titles/descriptions for display)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use votematch_vector_store::{cosine_similarity, ClusterCatalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = ClusterCatalog::load("cluster_vectors.json").await?;
//!     let cluster = catalog.require("3")?;
//!
//!     for (member_id, vector) in cluster.members() {
//!         println!("{member_id}: {:.3}", cosine_similarity(vector, &[1.0, 0.0, 0.0]));
//!     }
//!
//!     Ok(())
//! }
//! ```

mod catalog;
mod cluster;
mod error;
mod similarity;
pub mod stats;
mod types;

pub use catalog::ClusterCatalog;
pub use cluster::ClusterVectorData;
pub use error::{Result, VectorStoreError};
pub use similarity::{cosine_similarity, l2_norm};
pub use types::{BillCatalog, BillMetadata, RepresentativeBill};

pub use votematch_protocol::{BillId, MemberId};
