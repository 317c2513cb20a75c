use crate::cluster::ClusterVectorData;
use crate::error::{Result, VectorStoreError};
use crate::types::RepresentativeBill;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use votematch_protocol::{BillId, MemberId};

/// Every cluster of one clustering run, keyed by cluster label.
///
/// Clusters are shared read-only across sessions.
#[derive(Debug, Clone, Default)]
pub struct ClusterCatalog {
    clustering_id: Option<i64>,
    clusters: BTreeMap<String, Arc<ClusterVectorData>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClusterFile {
    #[serde(default)]
    cluster_id: Option<i64>,
    clusters: BTreeMap<String, RawCluster>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCluster {
    #[serde(default)]
    member_vectors: BTreeMap<MemberId, Vec<f32>>,
    #[serde(default)]
    bill_loadings: Vec<Vec<f32>>,
    #[serde(default)]
    bill_ids: Vec<BillId>,
    #[serde(default)]
    representative_bills: Vec<Vec<RepresentativeBill>>,
    #[serde(default)]
    explained_variance: Vec<f32>,
    #[serde(default)]
    dimensions: usize,
    #[serde(default)]
    bill_discriminative_power: Option<Vec<f32>>,
}

impl RawCluster {
    fn into_cluster(self, label: &str) -> Result<ClusterVectorData> {
        let mut cluster = ClusterVectorData::new(
            label,
            self.dimensions,
            self.member_vectors,
            self.bill_ids,
            self.bill_loadings,
        )?
        .with_explained_variance(self.explained_variance)?
        .with_representative_bills(self.representative_bills)?;

        if let Some(power) = self.bill_discriminative_power {
            cluster = cluster.with_discriminative_power(power)?;
        }
        Ok(cluster)
    }
}

impl ClusterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: RawClusterFile = serde_json::from_str(raw)?;
        let mut catalog = Self {
            clustering_id: file.cluster_id,
            clusters: BTreeMap::new(),
        };
        for (label, raw_cluster) in file.clusters {
            let cluster = raw_cluster.into_cluster(&label)?;
            log::debug!(
                "Cluster {}: {} members, {} bills, {} dimensions",
                label,
                cluster.member_count(),
                cluster.bill_count(),
                cluster.dimensions()
            );
            catalog.insert(cluster);
        }
        Ok(catalog)
    }

    /// Load a cluster-vector file written by the latent space pipeline.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        log::info!("Loading cluster vectors from {:?}", path.as_ref());
        let data = tokio::fs::read_to_string(&path).await?;
        let catalog = Self::from_json(&data)?;
        log::info!(
            "Loaded {} clusters ({} questionable)",
            catalog.len(),
            catalog.questionable_labels().len()
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, cluster: ClusterVectorData) {
        self.clusters
            .insert(cluster.label().to_string(), Arc::new(cluster));
    }

    pub fn clustering_id(&self) -> Option<i64> {
        self.clustering_id
    }

    pub fn get(&self, label: &str) -> Option<&Arc<ClusterVectorData>> {
        self.clusters.get(label)
    }

    pub fn require(&self, label: &str) -> Result<&Arc<ClusterVectorData>> {
        self.get(label)
            .ok_or_else(|| VectorStoreError::NotFound(label.to_string()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.clusters.keys().map(String::as_str)
    }

    /// Labels of clusters that have at least one bill and one dimension.
    pub fn questionable_labels(&self) -> Vec<String> {
        self.clusters
            .values()
            .filter(|cluster| !cluster.is_empty())
            .map(|cluster| cluster.label().to_string())
            .collect()
    }

    pub fn clusters(&self) -> &BTreeMap<String, Arc<ClusterVectorData>> {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "clusterId": 4,
        "nComponents": 2,
        "clusters": {
            "0": {
                "memberVectors": {},
                "billLoadings": [],
                "representativeBills": [],
                "explainedVariance": [],
                "dimensions": 0,
                "memberCount": 0,
                "billCount": 0
            },
            "1": {
                "memberVectors": { "10": [0.5, -0.2], "11": [-0.4, 0.3] },
                "billLoadings": [[0.8, 0.1], [0.2, -0.9]],
                "billIds": [501, 502],
                "representativeBills": [
                    [{ "billId": 501, "title": "Defense budget", "passed": true,
                       "deliberationCompleted": true, "loading": 0.8, "absLoading": 0.8 }],
                    [{ "billId": 502, "title": "Child care", "passed": false,
                       "deliberationCompleted": false, "loading": -0.9, "absLoading": 0.9 }]
                ],
                "explainedVariance": [0.6, 0.25],
                "dimensions": 2,
                "memberCount": 2,
                "billCount": 2
            }
        }
    }"#;

    #[test]
    fn parses_pipeline_output() {
        let catalog = ClusterCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.clustering_id(), Some(4));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.questionable_labels(), vec!["1".to_string()]);

        let cluster = catalog.require("1").unwrap();
        assert_eq!(cluster.member_vector(10), Some(&[0.5, -0.2][..]));
        assert_eq!(cluster.explained_variance(), &[0.6, 0.25]);
        assert_eq!(cluster.representative_bills(1)[0].title, "Child care");
        assert_eq!(
            cluster.summary().representative_titles,
            vec!["Defense budget", "Child care"]
        );
    }

    #[test]
    fn unknown_cluster_is_not_found() {
        let catalog = ClusterCatalog::from_json(SAMPLE).unwrap();
        assert!(matches!(
            catalog.require("9"),
            Err(VectorStoreError::NotFound(label)) if label == "9"
        ));
    }

    #[test]
    fn explicit_power_overrides_derivation() {
        let raw = r#"{
            "clusters": {
                "a": {
                    "memberVectors": { "1": [1.0] },
                    "billLoadings": [[0.5], [0.1]],
                    "billIds": [1, 2],
                    "dimensions": 1,
                    "billDiscriminativePower": [0.25, 0.75]
                }
            }
        }"#;
        let catalog = ClusterCatalog::from_json(raw).unwrap();
        let cluster = catalog.require("a").unwrap();
        assert_eq!(cluster.discriminative_power(2), Some(0.75));
    }

    #[test]
    fn malformed_loadings_are_rejected() {
        let raw = r#"{
            "clusters": {
                "a": {
                    "memberVectors": {},
                    "billLoadings": [[0.5, 0.2]],
                    "billIds": [1],
                    "dimensions": 1
                }
            }
        }"#;
        assert!(matches!(
            ClusterCatalog::from_json(raw),
            Err(VectorStoreError::InvalidDimension { .. })
        ));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let catalog = ClusterCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["0", "1"]);
    }
}
