//! Per-stage distance snapshots, distortion scores and the run report.

use std::fmt;
use std::str::FromStr;

use collage_core::{CorrelationMethod, DistanceSnapshot};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, LayoutResult};

/// Pipeline stage after which a snapshot was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Right after overlap resolution; the scoring baseline
    Resolved,
    Intra,
    InterUniform,
    InterPerCluster,
    Axis,
    Shake,
    FinalAxis,
    FinalAxisFine,
    FinalInter,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Resolved => "resolved",
            StageKind::Intra => "intra",
            StageKind::InterUniform => "inter_uniform",
            StageKind::InterPerCluster => "inter_per_cluster",
            StageKind::Axis => "axis",
            StageKind::Shake => "shake",
            StageKind::FinalAxis => "final_axis",
            StageKind::FinalAxisFine => "final_axis_fine",
            StageKind::FinalInter => "final_inter",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resolved" => Ok(StageKind::Resolved),
            "intra" => Ok(StageKind::Intra),
            "inter_uniform" => Ok(StageKind::InterUniform),
            "inter_per_cluster" => Ok(StageKind::InterPerCluster),
            "axis" => Ok(StageKind::Axis),
            "shake" => Ok(StageKind::Shake),
            "final_axis" => Ok(StageKind::FinalAxis),
            "final_axis_fine" => Ok(StageKind::FinalAxisFine),
            "final_inter" => Ok(StageKind::FinalInter),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub stage: StageKind,
    pub snapshot: DistanceSnapshot,
    /// Bounding-box area of the layout after the stage
    pub extent: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageScore {
    pub stage: StageKind,
    pub score: f64,
    pub extent: f64,
}

/// Score every snapshot against the first one (the resolved baseline).
pub fn score_stages(
    stages: &[StageSnapshot],
    method: CorrelationMethod,
) -> LayoutResult<Vec<StageScore>> {
    let Some(baseline) = stages.first() else {
        return Ok(Vec::new());
    };
    stages
        .iter()
        .map(|s| {
            let score = baseline.snapshot.compare(&s.snapshot, method)?;
            debug!("Stage {}: {} score {:.4}", s.stage, method, score);
            Ok(StageScore {
                stage: s.stage,
                score,
                extent: s.extent,
            })
        })
        .collect::<Result<Vec<_>, LayoutError>>()
}

/// Human-readable summary of one layout run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    pub n_images: usize,
    pub n_clusters: usize,
    pub cluster_sizes: Vec<usize>,
    pub overlap_iterations: usize,
    pub correlation: CorrelationMethod,
    /// One entry per snapshot, baseline first
    pub scores: Vec<StageScore>,
}

impl LayoutReport {
    /// Scores of the compaction stages only (baseline excluded).
    pub fn stage_scores(&self) -> &[StageScore] {
        if self.scores.is_empty() {
            &self.scores
        } else {
            &self.scores[1..]
        }
    }

    pub fn final_score(&self) -> Option<f64> {
        self.scores.last().map(|s| s.score)
    }
}

impl fmt::Display for LayoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "images: {}", self.n_images)?;
        writeln!(f, "clusters: {}", self.n_clusters)?;
        let sizes: Vec<String> = self.cluster_sizes.iter().map(|s| s.to_string()).collect();
        writeln!(f, "sizes of clusters: {}", sizes.join(", "))?;
        writeln!(
            f,
            "overlap resolved in {} iterations",
            self.overlap_iterations
        )?;
        writeln!(f, "scores ({}):", self.correlation)?;
        for s in &self.scores {
            writeln!(
                f,
                "  {:<18} {:.3}  extent={:.0}",
                s.stage.name(),
                s.score,
                s.extent
            )?;
        }
        Ok(())
    }
}
