use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::ShapeHistory;

/// Durable reference to a sub-shape of an upstream feature.
///
/// A pick is recorded at selection time and resolved against the referenced
/// feature's live registry at every update, so `id` may be stale by the time
/// it is used. The embedded `history` is the devolve lineage captured when the
/// pick was made; resolution walks it (and the project-wide history) when the
/// direct lookup misses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    /// Shape id at selection time, possibly stale.
    pub id: Uuid,
    /// Ancestry of `id` captured at selection time.
    pub history: ShapeHistory,
    /// Optional feature-tag name fallback ("FaceXP" style), tried when the
    /// id itself cannot be resolved.
    pub tag: Option<String>,
    /// Optional parametric locator refining the pick to derived point(s).
    pub locator: Option<Locator>,
    /// What to do when resolution is ambiguous or comes up empty.
    #[serde(default)]
    pub policy: ResolvePolicy,
}

impl Pick {
    /// Pick with no lineage and no locator; callers fill in history via
    /// `ShapeHistory::devolve_history` when one is available.
    pub fn from_id(id: Uuid) -> Self {
        Pick {
            id,
            history: ShapeHistory::new(),
            tag: None,
            locator: None,
            policy: ResolvePolicy::default(),
        }
    }

    pub fn with_history(id: Uuid, history: ShapeHistory) -> Self {
        Pick {
            id,
            history,
            tag: None,
            locator: None,
            policy: ResolvePolicy::default(),
        }
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// What to do when pick resolution is ambiguous or fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolvePolicy {
    /// Fail the owning feature's build if this pick does not resolve to
    /// exactly one shape.
    Strict,
    /// Use whatever resolves; an empty result contributes nothing.
    #[default]
    BestEffort,
}

/// Parametric location on a picked edge, re-derived after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Locator {
    /// Both curve endpoints (lines only).
    EndPoints,
    /// Curve midpoint (lines only).
    MidPoint,
    /// Circle or ellipse center.
    CenterPoint,
    /// The four quadrant points of a circle or ellipse.
    QuadrantPoints,
}
