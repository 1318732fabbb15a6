//! Input vocabulary shared by marks, managers, and the orchestrator.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::kind::{AnchorName, ParamKind};
use crate::mark::MarkId;

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Self::Escape,
            "Delete" => Self::Delete,
            "Backspace" => Self::Backspace,
            _ => Self::Other,
        }
    }
}

/// Placement phase of an in-progress mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    FirstPoint,
    SecondPoint,
    /// Waiting for the anchor at this declaration index (third and later).
    NextPoint(usize),
    WidthAdjust,
}

impl Phase {
    /// Phase that waits for the anchor at `index`.
    #[must_use]
    pub fn for_anchor(index: usize) -> Self {
        match index {
            0 => Self::FirstPoint,
            1 => Self::SecondPoint,
            n => Self::NextPoint(n),
        }
    }

    /// Declaration index of the anchor this phase places, if any.
    #[must_use]
    pub fn anchor_index(self) -> Option<usize> {
        match self {
            Self::FirstPoint => Some(0),
            Self::SecondPoint => Some(1),
            Self::NextPoint(n) => Some(n),
            Self::WidthAdjust => None,
        }
    }
}

/// What part of a mark a drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragPart {
    Anchor(AnchorName),
    Param(ParamKind),
    Body,
}

impl DragPart {
    /// The handle this drag grabbed, if it grabbed one.
    #[must_use]
    pub fn handle(self) -> Option<Handle> {
        match self {
            Self::Anchor(name) => Some(Handle::Anchor(name)),
            Self::Param(param) => Some(Handle::Param(param)),
            Self::Body => None,
        }
    }
}

impl From<Handle> for DragPart {
    fn from(handle: Handle) -> Self {
        match handle {
            Handle::Anchor(name) => Self::Anchor(name),
            Handle::Param(param) => Self::Param(param),
        }
    }
}

/// An interactive affordance on a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Handle {
    /// Moves one anchor directly.
    Anchor(AnchorName),
    /// Adjusts a derived scalar parameter.
    Param(ParamKind),
}

/// Public view of a manager's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Placing(Phase),
    Dragging { target: MarkId, part: DragPart },
    Adjusting { target: MarkId, param: ParamKind },
}

impl ManagerState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
