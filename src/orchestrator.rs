//! Drawing orchestrator: one manager per mark kind, the active-tool slot,
//! and the board's undo/redo history.
//!
//! At most one manager is out of `Idle` at a time. Selecting a tool cancels
//! every other manager. With no tool selected, a pointer-down is offered to
//! each manager in toolbar order until one starts an edit session, and that
//! manager keeps the pointer until it reports [`Action::ToolFinished`].

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;

use std::rc::Rc;

use tracing::debug;

use crate::bridge::CoordinateBridge;
use crate::config::EditorConfig;
use crate::geom::Point;
use crate::input::{Key, ManagerState};
use crate::kind::MarkKind;
use crate::manager::{Action, MarkManager};
use crate::mark::{Mark, MarkSnapshot};
use crate::style::StyleUpdate;

// =============================================================
// History
// =============================================================

/// Bounded linear undo/redo over whole-board snapshots.
///
/// The stack always holds at least the initial board. Saving after an undo
/// drops the redo tail; the oldest checkpoint is evicted past `depth`.
#[derive(Debug, Clone)]
pub struct History {
    states: Vec<Vec<MarkSnapshot>>,
    cursor: usize,
    depth: usize,
}

impl History {
    /// Start from an empty board.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self::with_initial(depth, Vec::new())
    }

    #[must_use]
    pub fn with_initial(depth: usize, board: Vec<MarkSnapshot>) -> Self {
        Self { states: vec![board], cursor: 0, depth: depth.max(1) }
    }

    /// Record `board` as the newest checkpoint.
    pub fn save(&mut self, board: Vec<MarkSnapshot>) {
        self.states.truncate(self.cursor + 1);
        self.states.push(board);
        if self.states.len() > self.depth {
            let excess = self.states.len() - self.depth;
            self.states.drain(..excess);
        }
        self.cursor = self.states.len() - 1;
    }

    /// Step back one checkpoint, returning the board to restore.
    pub fn undo(&mut self) -> Option<&[MarkSnapshot]> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.states.get(self.cursor).map(Vec::as_slice)
    }

    /// Step forward one checkpoint, returning the board to restore.
    pub fn redo(&mut self) -> Option<&[MarkSnapshot]> {
        if self.cursor + 1 >= self.states.len() {
            return None;
        }
        self.cursor += 1;
        self.states.get(self.cursor).map(Vec::as_slice)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.states.len()
    }

    /// Number of retained checkpoints, including the current one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// =============================================================
// Orchestrator
// =============================================================

pub struct DrawingOrchestrator {
    managers: Vec<MarkManager>,
    active: Option<MarkKind>,
    /// Manager that last committed or edited, for key and style routing.
    focused: Option<MarkKind>,
    history: History,
}

impl std::fmt::Debug for DrawingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingOrchestrator")
            .field("active", &self.active)
            .field("focused", &self.focused)
            .field("marks", &self.all_marks().count())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl DrawingOrchestrator {
    #[must_use]
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            managers: MarkKind::ALL.iter().map(|kind| MarkManager::new(*kind, config.clone())).collect(),
            active: None,
            focused: None,
            history: History::new(config.history_depth),
        }
    }

    /// Bind every manager to the host engine.
    pub fn set_bridge(&mut self, bridge: Rc<dyn CoordinateBridge>) {
        for manager in &mut self.managers {
            manager.set_bridge(bridge.clone());
        }
    }

    // --- Queries ---

    /// The manager for `kind`.
    #[must_use]
    pub fn manager(&self, kind: MarkKind) -> Option<&MarkManager> {
        self.managers.iter().find(|m| m.kind() == kind)
    }

    /// The tool currently holding the pointer.
    #[must_use]
    pub fn active_tool(&self) -> Option<MarkKind> {
        self.active
    }

    /// Every committed mark across all kinds.
    pub fn all_marks(&self) -> impl Iterator<Item = &Mark> {
        self.managers.iter().flat_map(|m| m.all_marks().iter())
    }

    /// Snapshots of the whole board, grouped by kind in toolbar order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<MarkSnapshot> {
        self.managers.iter().flat_map(MarkManager::snapshots).collect()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The mark style edits would apply to.
    #[must_use]
    pub fn current_operating_mark(&self) -> Option<&Mark> {
        let kind = self.active.or(self.focused)?;
        self.manager(kind)?.current_operating_mark()
    }

    /// Managers not in `Idle`. Never more than one.
    #[must_use]
    pub fn busy_managers(&self) -> usize {
        self.managers.iter().filter(|m| !m.state().is_idle()).count()
    }

    // --- Tools ---

    /// Make `kind` the active drawing tool, cancelling every other manager.
    pub fn select_tool(&mut self, kind: MarkKind) {
        for manager in &mut self.managers {
            if manager.kind() != kind {
                manager.cancel_mode();
            }
        }
        let Some(manager) = self.manager_mut(kind) else {
            return;
        };
        manager.enter_mode();
        let entered = !manager.state().is_idle();
        self.active = entered.then_some(kind);
        self.focused = Some(kind);
        debug!(tool = %kind, entered, "tool selected");
    }

    /// Cancel whatever the active tool is doing.
    pub fn cancel_tool(&mut self) {
        if let Some(kind) = self.active.take() {
            if let Some(manager) = self.manager_mut(kind) {
                manager.cancel_mode();
            }
            debug!(tool = %kind, "tool cancelled");
        }
    }

    // --- Events ---

    pub fn handle_pointer_down(&mut self, p: Point) -> Vec<Action> {
        if let Some(kind) = self.active {
            let actions = self.manager_mut(kind).map(|m| m.handle_pointer_down(p)).unwrap_or_default();
            return self.absorb(kind, actions);
        }
        let claimed = self.managers.iter_mut().find_map(|m| {
            let actions = m.handle_pointer_down(p);
            (!m.state().is_idle()).then(|| (m.kind(), actions))
        });
        let Some((kind, actions)) = claimed else {
            return Vec::new();
        };
        self.active = Some(kind);
        self.focused = Some(kind);
        debug!(tool = %kind, "edit session claimed pointer");
        self.absorb(kind, actions)
    }

    pub fn handle_pointer_move(&mut self, p: Point) -> Vec<Action> {
        if let Some(kind) = self.active {
            let actions = self.manager_mut(kind).map(|m| m.handle_pointer_move(p)).unwrap_or_default();
            return self.absorb(kind, actions);
        }
        for manager in &mut self.managers {
            manager.handle_pointer_move(p);
        }
        Vec::new()
    }

    pub fn handle_pointer_up(&mut self, p: Point) -> Vec<Action> {
        let Some(kind) = self.active else {
            return Vec::new();
        };
        let actions = self.manager_mut(kind).map(|m| m.handle_pointer_up(p)).unwrap_or_default();
        self.absorb(kind, actions)
    }

    pub fn handle_key_down(&mut self, key: Key) -> Vec<Action> {
        let Some(kind) = self.active.or(self.focused) else {
            return Vec::new();
        };
        let actions = self.manager_mut(kind).map(|m| m.handle_key_down(key)).unwrap_or_default();
        self.absorb(kind, actions)
    }

    /// Apply a style update to the current operating mark.
    pub fn update_props(&mut self, update: &StyleUpdate) -> Vec<Action> {
        let Some(kind) = self.active.or(self.focused) else {
            return Vec::new();
        };
        let actions = self.manager_mut(kind).map(|m| m.update_props(update)).unwrap_or_default();
        self.absorb(kind, actions)
    }

    // --- History ---

    /// Restore the previous checkpoint. Cancels the active tool first.
    pub fn undo(&mut self) -> bool {
        self.cancel_tool();
        let Some(board) = self.history.undo().map(<[MarkSnapshot]>::to_vec) else {
            return false;
        };
        self.restore(&board);
        debug!(marks = board.len(), "undo");
        true
    }

    /// Re-apply the next checkpoint. Cancels the active tool first.
    pub fn redo(&mut self) -> bool {
        self.cancel_tool();
        let Some(board) = self.history.redo().map(<[MarkSnapshot]>::to_vec) else {
            return false;
        };
        self.restore(&board);
        debug!(marks = board.len(), "redo");
        true
    }

    /// Replace the board with `board` and start a fresh history from it.
    pub fn load_snapshots(&mut self, board: Vec<MarkSnapshot>) {
        self.cancel_tool();
        self.restore(&board);
        self.history = History::with_initial(self.history.depth, self.snapshots());
    }

    /// Detach and drop every mark on every manager.
    pub fn destroy(&mut self) {
        for manager in &mut self.managers {
            manager.destroy();
        }
        self.active = None;
        self.focused = None;
    }

    fn restore(&mut self, board: &[MarkSnapshot]) {
        for manager in &mut self.managers {
            manager.restore(board);
        }
    }

    fn manager_mut(&mut self, kind: MarkKind) -> Option<&mut MarkManager> {
        self.managers.iter_mut().find(|m| m.kind() == kind)
    }

    /// Checkpoint board changes and release the tool when it finishes.
    fn absorb(&mut self, kind: MarkKind, actions: Vec<Action>) -> Vec<Action> {
        if actions.iter().any(|a| a.is_checkpoint()) {
            let board = self.snapshots();
            self.history.save(board);
            self.focused = Some(kind);
        }
        if actions.contains(&Action::ToolFinished)
            && self.manager(kind).is_some_and(|m| m.state() == ManagerState::Idle)
        {
            self.active = None;
        }
        actions
    }
}
