//! The host-facing overlay object.
//!
//! Holds the marks of the last successful pass together with the per-node
//! index annotations, and whether the overlay is currently painted.

use crate::config::SomConfig;
use crate::error::Result;
use crate::pipeline::colors::{ColorChooser, ContrastColorChooser};
use crate::pipeline::selector::{CandidateSelector, RoleSelector};
use crate::pipeline::{Mark, run_pass};
use crate::scene::{NodeId, SceneProvider};
use crate::theme::Theme;
use std::collections::HashMap;

pub struct SetOfMarks<S = RoleSelector, C = ContrastColorChooser> {
    config: SomConfig,
    theme: Theme,
    selector: S,
    chooser: C,
    marks: Vec<Mark>,
    annotations: HashMap<NodeId, usize>,
    hidden: bool,
}

impl SetOfMarks {
    pub fn new(config: SomConfig, theme: Theme) -> Self {
        let chooser = ContrastColorChooser::from_theme(&theme);
        Self::with_collaborators(config, theme, RoleSelector, chooser)
    }
}

impl Default for SetOfMarks {
    fn default() -> Self {
        Self::new(SomConfig::default(), Theme::default())
    }
}

impl<S: CandidateSelector, C: ColorChooser> SetOfMarks<S, C> {
    pub fn with_collaborators(config: SomConfig, theme: Theme, selector: S, chooser: C) -> Self {
        Self {
            config,
            theme,
            selector,
            chooser,
            marks: Vec::new(),
            annotations: HashMap::new(),
            hidden: false,
        }
    }

    /// Runs a full pass over `provider` and replaces the current overlay.
    ///
    /// On error the previous overlay is left exactly as it was.
    pub async fn display<P: SceneProvider>(&mut self, provider: &P) -> Result<&[Mark]> {
        let result = run_pass(
            provider,
            &self.config,
            &self.theme,
            &self.selector,
            &self.chooser,
        )
        .await;
        self.install(result)?;
        Ok(&self.marks)
    }

    fn install(&mut self, result: Result<Vec<Mark>>) -> Result<()> {
        let marks = match result {
            Ok(marks) => marks,
            Err(err) => {
                tracing::error!(error = %err, "pass failed, keeping previous overlay");
                return Err(err);
            }
        };
        self.clear();
        self.annotations = marks.iter().map(|m| (m.node, m.index)).collect();
        self.marks = marks;
        Ok(())
    }

    /// Removes all marks and annotations. Idempotent.
    pub fn clear(&mut self) {
        self.marks.clear();
        self.annotations.clear();
        self.hidden = false;
    }

    pub fn hide(&mut self) {
        self.hidden = true;
    }

    pub fn show(&mut self) {
        self.hidden = false;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn resolve(&self, index: usize) -> Option<NodeId> {
        self.marks.get(index).map(|mark| mark.node)
    }

    /// Index assigned to `node` by the last pass.
    pub fn annotation(&self, node: NodeId) -> Option<usize> {
        self.annotations.get(&node).copied()
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn config(&self) -> &SomConfig {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}
