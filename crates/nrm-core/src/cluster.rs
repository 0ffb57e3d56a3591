//! Greedy pivot clustering over resonance similarity.
//!
//! Walks agents in the order given. Each agent not yet assigned becomes a
//! pivot and pulls in every later unassigned agent whose similarity to the
//! pivot reaches the threshold. This is first-pivot-wins, not connected
//! components: an agent resonant with two pivots joins whichever comes first,
//! and two members of one cluster need not resonate with each other.

use serde::Serialize;

use crate::agent::{Agent, AgentId};
use crate::phase::PhaseMapper;

/// Pivot-to-member similarity recorded while building a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PairMatch {
    pub pivot: AgentId,
    pub member: AgentId,
    pub similarity: f64,
}

/// One cluster from a single clustering pass. `member_ids[0]` is the pivot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResonantCluster {
    pub member_ids: Vec<AgentId>,
    /// Mean of pivot-to-member similarities (not all pairs).
    pub average_similarity: f64,
    pub matches: Vec<PairMatch>,
}

impl ResonantCluster {
    /// `None` only for a hand-built cluster with no members.
    pub fn pivot(&self) -> Option<AgentId> {
        self.member_ids.first().copied()
    }

    /// Per-agent resonance score: members score their similarity to the
    /// pivot, the pivot scores the cluster average.
    pub fn scores(&self) -> impl Iterator<Item = (AgentId, f64)> + '_ {
        self.pivot()
            .map(|pivot| (pivot, self.average_similarity))
            .into_iter()
            .chain(self.matches.iter().map(|m| (m.member, m.similarity)))
    }
}

/// Stateless clustering entry points.
pub struct ResonanceClusterer;

impl ResonanceClusterer {
    /// Cluster by phase-space resonance. `threshold` defaults to the mapper's.
    pub fn find_resonant_clusters(
        agents: &[&Agent],
        mapper: &PhaseMapper,
        threshold: Option<f64>,
    ) -> Vec<ResonantCluster> {
        let threshold = threshold.unwrap_or_else(|| mapper.resonance_threshold());
        Self::find_clusters_with(agents, threshold, |a, b| {
            a.resonance_with(b, mapper).similarity
        })
    }

    /// Same greedy pass with an arbitrary symmetric similarity function.
    pub fn find_clusters_with<F>(
        agents: &[&Agent],
        threshold: f64,
        similarity: F,
    ) -> Vec<ResonantCluster>
    where
        F: Fn(&Agent, &Agent) -> f64,
    {
        let mut assigned = vec![false; agents.len()];
        let mut clusters = Vec::new();

        for (i, pivot) in agents.iter().enumerate() {
            if assigned[i] {
                continue;
            }

            let mut matches = Vec::new();
            for (j, candidate) in agents.iter().enumerate().skip(i + 1) {
                if assigned[j] {
                    continue;
                }
                let sim = similarity(pivot, candidate);
                if sim >= threshold {
                    matches.push((j, sim));
                }
            }

            // A lone pivot emits nothing. Similarity is symmetric, so no
            // later pivot can claim it either.
            if matches.is_empty() {
                continue;
            }

            assigned[i] = true;
            let mut member_ids = Vec::with_capacity(matches.len() + 1);
            member_ids.push(pivot.id);
            let mut pairs = Vec::with_capacity(matches.len());
            for &(j, sim) in &matches {
                assigned[j] = true;
                member_ids.push(agents[j].id);
                pairs.push(PairMatch {
                    pivot: pivot.id,
                    member: agents[j].id,
                    similarity: sim,
                });
            }

            let average_similarity =
                pairs.iter().map(|p| p.similarity).sum::<f64>() / pairs.len() as f64;
            clusters.push(ResonantCluster {
                member_ids,
                average_similarity,
                matches: pairs,
            });
        }

        clusters
    }
}
