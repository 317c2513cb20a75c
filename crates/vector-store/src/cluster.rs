use crate::error::{Result, VectorStoreError};
use crate::stats;
use crate::types::RepresentativeBill;
use std::collections::{BTreeMap, HashMap};
use votematch_protocol::{BillId, ClusterSummary, MemberId};

/// Immutable latent space of one topic cluster.
///
/// Members and bills share the same `dimensions`-sized space. Bill data is kept
/// in parallel vectors ordered like `bill_ids`.
#[derive(Debug, Clone)]
pub struct ClusterVectorData {
    label: String,
    dimensions: usize,
    member_vectors: BTreeMap<MemberId, Vec<f32>>,
    bill_ids: Vec<BillId>,
    bill_loadings: Vec<Vec<f32>>,
    bill_discriminative_power: Vec<f32>,
    explained_variance: Vec<f32>,
    representative_bills: Vec<Vec<RepresentativeBill>>,
    bill_index: HashMap<BillId, usize>,
}

impl ClusterVectorData {
    /// Builds and validates a cluster. Discriminative power and representative
    /// bills are derived from the vectors; explained variance starts at zero.
    pub fn new(
        label: impl Into<String>,
        dimensions: usize,
        member_vectors: BTreeMap<MemberId, Vec<f32>>,
        bill_ids: Vec<BillId>,
        bill_loadings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let label = label.into();

        if bill_ids.len() != bill_loadings.len() {
            return Err(VectorStoreError::invalid_cluster(
                &label,
                format!(
                    "{} bill ids but {} loading vectors",
                    bill_ids.len(),
                    bill_loadings.len()
                ),
            ));
        }
        if dimensions == 0 && !(bill_ids.is_empty() && member_vectors.is_empty()) {
            return Err(VectorStoreError::invalid_cluster(
                &label,
                "zero dimensions but non-empty vectors",
            ));
        }

        for vector in member_vectors.values().chain(bill_loadings.iter()) {
            check_vector(&label, dimensions, vector)?;
        }

        let mut bill_index = HashMap::with_capacity(bill_ids.len());
        for (idx, bill_id) in bill_ids.iter().enumerate() {
            if bill_index.insert(*bill_id, idx).is_some() {
                return Err(VectorStoreError::invalid_cluster(
                    &label,
                    format!("duplicate bill id {bill_id}"),
                ));
            }
        }

        let members: Vec<&[f32]> = member_vectors.values().map(Vec::as_slice).collect();
        let bill_discriminative_power =
            stats::discriminative_power(&members, &bill_loadings, dimensions);
        let representative_bills =
            stats::representative_bills(&bill_ids, &bill_loadings, dimensions);

        Ok(Self {
            label,
            dimensions,
            member_vectors,
            bill_ids,
            bill_loadings,
            bill_discriminative_power,
            explained_variance: vec![0.0; dimensions],
            representative_bills,
            bill_index,
        })
    }

    /// Replaces the derived discriminative power with upstream values.
    pub fn with_discriminative_power(mut self, power: Vec<f32>) -> Result<Self> {
        if power.len() != self.bill_ids.len() {
            return Err(VectorStoreError::invalid_cluster(
                &self.label,
                format!(
                    "{} discriminative power values for {} bills",
                    power.len(),
                    self.bill_ids.len()
                ),
            ));
        }
        if power.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(VectorStoreError::invalid_cluster(
                &self.label,
                "discriminative power must be finite and non-negative",
            ));
        }
        self.bill_discriminative_power = power;
        Ok(self)
    }

    pub fn with_explained_variance(mut self, explained_variance: Vec<f32>) -> Result<Self> {
        // Upstream writes an empty list when the score matrix has no variance.
        if explained_variance.is_empty() {
            return Ok(self);
        }
        check_vector(&self.label, self.dimensions, &explained_variance)?;
        self.explained_variance = explained_variance;
        Ok(self)
    }

    /// Replaces the derived representative bills with upstream ones (which carry titles).
    pub fn with_representative_bills(mut self, reps: Vec<Vec<RepresentativeBill>>) -> Result<Self> {
        if reps.is_empty() {
            return Ok(self);
        }
        if reps.len() != self.dimensions {
            return Err(VectorStoreError::InvalidDimension {
                cluster: self.label.clone(),
                expected: self.dimensions,
                actual: reps.len(),
            });
        }
        self.representative_bills = reps;
        Ok(self)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// A cluster without dimensions or bills cannot be questioned.
    pub fn is_empty(&self) -> bool {
        self.dimensions == 0 || self.bill_ids.is_empty()
    }

    pub fn bill_ids(&self) -> &[BillId] {
        &self.bill_ids
    }

    pub fn bill_count(&self) -> usize {
        self.bill_ids.len()
    }

    pub fn member_count(&self) -> usize {
        self.member_vectors.len()
    }

    pub fn contains_bill(&self, bill_id: BillId) -> bool {
        self.bill_index.contains_key(&bill_id)
    }

    pub fn loading(&self, bill_id: BillId) -> Option<&[f32]> {
        let idx = *self.bill_index.get(&bill_id)?;
        Some(self.bill_loadings[idx].as_slice())
    }

    pub fn discriminative_power(&self, bill_id: BillId) -> Option<f32> {
        let idx = *self.bill_index.get(&bill_id)?;
        Some(self.bill_discriminative_power[idx])
    }

    /// `(bill_id, loading, discriminative_power)` in `bill_ids` order.
    pub fn bills(&self) -> impl Iterator<Item = (BillId, &[f32], f32)> + '_ {
        self.bill_ids
            .iter()
            .zip(self.bill_loadings.iter())
            .zip(self.bill_discriminative_power.iter())
            .map(|((id, loading), power)| (*id, loading.as_slice(), *power))
    }

    pub fn member_vector(&self, member_id: MemberId) -> Option<&[f32]> {
        self.member_vectors.get(&member_id).map(Vec::as_slice)
    }

    /// Members in ascending id order.
    pub fn members(&self) -> impl Iterator<Item = (MemberId, &[f32])> + '_ {
        self.member_vectors
            .iter()
            .map(|(id, vector)| (*id, vector.as_slice()))
    }

    pub fn explained_variance(&self) -> &[f32] {
        &self.explained_variance
    }

    pub fn representative_bills(&self, dimension: usize) -> &[RepresentativeBill] {
        self.representative_bills
            .get(dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_representative_bills(&self) -> impl Iterator<Item = &RepresentativeBill> + '_ {
        self.representative_bills.iter().flatten()
    }

    pub fn summary(&self) -> ClusterSummary {
        ClusterSummary {
            label: self.label.clone(),
            dimensions: self.dimensions,
            member_count: self.member_count(),
            bill_count: self.bill_count(),
            explained_variance: self.explained_variance.clone(),
            representative_titles: (0..self.dimensions)
                .map(|dim| {
                    self.representative_bills(dim)
                        .first()
                        .map(|rep| {
                            if rep.title.is_empty() {
                                format!("Bill {}", rep.bill_id)
                            } else {
                                rep.title.clone()
                            }
                        })
                        .unwrap_or_default()
                })
                .collect(),
        }
    }
}

fn check_vector(label: &str, dimensions: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != dimensions {
        return Err(VectorStoreError::InvalidDimension {
            cluster: label.to_string(),
            expected: dimensions,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(VectorStoreError::invalid_cluster(
            label,
            "vectors must contain finite values",
        ));
    }
    Ok(())
}
