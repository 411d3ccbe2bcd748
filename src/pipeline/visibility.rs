//! Per-candidate visibility decisions.
//!
//! Each candidate walks a small state machine: cheap style/geometry checks,
//! then the viewport-intersection and size-cap checks, and only then the
//! occlusion raster. Candidates are observed one at a time, in fixed-size
//! batches, yielding to the scheduler between batches.

use super::occlusion::OcclusionRasterizer;
use super::{Candidate, PassContext};
use crate::config::SomConfig;
use crate::error::Result;
use crate::geometry::Rect;
use crate::scene::SceneProvider;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    ZeroSize,
    StyleHidden,
    OutsideViewport,
    InsufficientIntersection,
    Oversized,
    Occluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Unchecked,
    PendingIntersection,
    PendingOcclusion,
    Visible,
    Rejected(RejectReason),
}

impl VisibilityState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VisibilityState::Visible | VisibilityState::Rejected(_))
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, VisibilityState::Visible)
    }
}

pub struct VisibilityClassifier<'a, P: SceneProvider> {
    provider: &'a P,
    config: &'a SomConfig,
    viewport: Rect,
    rasterizer: OcclusionRasterizer<'a>,
}

impl<'a, P: SceneProvider> VisibilityClassifier<'a, P> {
    pub fn new(ctx: &'a PassContext<'a, P>) -> Self {
        Self {
            provider: ctx.provider,
            config: ctx.config,
            viewport: ctx.viewport,
            rasterizer: ctx.rasterizer(),
        }
    }

    /// Runs one transition of the state machine. Terminal states are returned
    /// unchanged.
    pub fn advance(&self, candidate: &Candidate, state: VisibilityState) -> Result<VisibilityState> {
        Ok(match state {
            VisibilityState::Unchecked => self.cheap_checks(candidate),
            VisibilityState::PendingIntersection => self.intersection_checks(candidate),
            VisibilityState::PendingOcclusion => {
                let ratio = self
                    .rasterizer
                    .visible_ratio(candidate.node, &candidate.shape)?;
                if ratio >= self.config.visibility_ratio {
                    VisibilityState::Visible
                } else {
                    VisibilityState::Rejected(RejectReason::Occluded)
                }
            }
            terminal => terminal,
        })
    }

    fn cheap_checks(&self, candidate: &Candidate) -> VisibilityState {
        let rect = &candidate.shape.rect;
        let min = self.config.min_element_size;
        if rect.is_empty() || rect.width <= min || rect.height <= min {
            return VisibilityState::Rejected(RejectReason::ZeroSize);
        }
        if self.provider.is_style_hidden(candidate.node) {
            return VisibilityState::Rejected(RejectReason::StyleHidden);
        }
        if !rect.intersects(&self.viewport) {
            return VisibilityState::Rejected(RejectReason::OutsideViewport);
        }
        VisibilityState::PendingIntersection
    }

    fn intersection_checks(&self, candidate: &Candidate) -> VisibilityState {
        let rect = &candidate.shape.rect;
        if rect.fraction_inside(&self.viewport) < self.config.visibility_ratio {
            return VisibilityState::Rejected(RejectReason::InsufficientIntersection);
        }
        let cover = self.config.max_cover_ratio;
        if rect.width > self.viewport.width * cover || rect.height > self.viewport.height * cover {
            return VisibilityState::Rejected(RejectReason::Oversized);
        }
        VisibilityState::PendingOcclusion
    }

    /// Resolves a single candidate to a terminal state.
    pub async fn observe(&self, candidate: &Candidate) -> Result<VisibilityState> {
        let mut state = VisibilityState::Unchecked;
        while !state.is_terminal() {
            state = self.advance(candidate, state)?;
        }
        Ok(state)
    }

    /// Sets `visible` on every candidate, in order.
    pub async fn classify(&self, candidates: &mut [Candidate]) -> Result<()> {
        let batch_size = self.config.batch_size.max(1);
        for batch in candidates.chunks_mut(batch_size) {
            for candidate in batch.iter_mut() {
                let state = self.observe(candidate).await?;
                candidate.visible = state.is_visible();
                if let VisibilityState::Rejected(reason) = state {
                    tracing::debug!(
                        node = candidate.node.0,
                        tag = %self.provider.element(candidate.node).tag,
                        ?reason,
                        "candidate rejected"
                    );
                }
            }
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}
