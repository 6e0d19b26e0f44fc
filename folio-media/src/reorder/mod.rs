//! Gesture-to-move translation
//!
//! Pointer drags and keyboard steps both end as a single
//! [`CollectionState::move_asset`] call. The controller keeps no ordering
//! state of its own; it only reads the collection length.

use crate::collection::{CollectionError, CollectionState};
use serde::{Deserialize, Serialize};

/// Keyboard reorder steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStep {
    /// One place towards the start
    Up,
    /// One place towards the end
    Down,
    /// To the start
    First,
    /// To the end
    Last,
}

/// A completed reorder gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveGesture {
    /// An item picked up at `from` and dropped on the slot of `drop_index`
    Pointer {
        /// Index the drag started at
        from: usize,
        /// Index of the item under the drop point
        drop_index: usize,
    },
    /// A keyboard step applied to the focused item
    Keyboard {
        /// Index of the focused item
        index: usize,
        /// Step taken
        step: KeyStep,
    },
}

/// A resolved move command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// Source index
    pub from: usize,
    /// Destination index
    pub to: usize,
}

/// Translates gestures into collection moves
#[derive(Debug, Clone, Copy, Default)]
pub struct ReorderController;

impl ReorderController {
    /// Creates a controller
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves `gesture` against a collection of `len` items
    ///
    /// Returns `None` when the gesture would leave the item where it is
    /// (dropped on itself, `Up` on the first item, `Down` on the last).
    /// Pointer drops past the end land on the last slot.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfRange` if the source index is not
    /// in the collection.
    pub fn resolve(
        self,
        gesture: MoveGesture,
        len: usize,
    ) -> Result<Option<Move>, CollectionError> {
        let (from, to) = match gesture {
            MoveGesture::Pointer { from, drop_index } => {
                check(from, len)?;
                (from, drop_index.min(len - 1))
            }
            MoveGesture::Keyboard { index, step } => {
                check(index, len)?;
                let to = match step {
                    KeyStep::Up => index.saturating_sub(1),
                    KeyStep::Down => (index + 1).min(len - 1),
                    KeyStep::First => 0,
                    KeyStep::Last => len - 1,
                };
                (index, to)
            }
        };

        Ok((from != to).then_some(Move { from, to }))
    }

    /// Resolves `gesture` and applies the resulting move, if any
    ///
    /// # Errors
    ///
    /// Same as [`ReorderController::resolve`].
    pub fn apply(
        self,
        gesture: MoveGesture,
        collection: &mut CollectionState,
    ) -> Result<Option<Move>, CollectionError> {
        let resolved = self.resolve(gesture, collection.len())?;
        if let Some(Move { from, to }) = resolved {
            collection.move_asset(from, to)?;
            tracing::debug!(from, to, "Asset moved");
        }
        Ok(resolved)
    }
}

const fn check(index: usize, len: usize) -> Result<(), CollectionError> {
    if index < len {
        Ok(())
    } else {
        Err(CollectionError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaAsset;

    fn gallery(names: &[&str]) -> CollectionState {
        let mut state = CollectionState::new();
        for name in names {
            state.append(MediaAsset::remote(*name, "web", None));
        }
        state
    }

    fn names(state: &CollectionState) -> Vec<&str> {
        state.assets().iter().filter_map(|a| a.origin.url()).collect()
    }

    #[test]
    fn test_pointer_drop_moves_once() {
        let mut state = gallery(&["a", "b", "c"]);
        let applied = ReorderController::new()
            .apply(MoveGesture::Pointer { from: 0, drop_index: 2 }, &mut state)
            .unwrap();

        assert_eq!(applied, Some(Move { from: 0, to: 2 }));
        assert_eq!(names(&state), ["b", "c", "a"]);
    }

    #[test]
    fn test_pointer_drop_past_end_clamps() {
        let resolved = ReorderController::new()
            .resolve(MoveGesture::Pointer { from: 1, drop_index: 99 }, 3)
            .unwrap();
        assert_eq!(resolved, Some(Move { from: 1, to: 2 }));
    }

    #[test]
    fn test_keyboard_steps() {
        let controller = ReorderController::new();
        let step = |index, step| {
            controller
                .resolve(MoveGesture::Keyboard { index, step }, 4)
                .unwrap()
        };

        assert_eq!(step(2, KeyStep::Up), Some(Move { from: 2, to: 1 }));
        assert_eq!(step(2, KeyStep::Down), Some(Move { from: 2, to: 3 }));
        assert_eq!(step(2, KeyStep::First), Some(Move { from: 2, to: 0 }));
        assert_eq!(step(1, KeyStep::Last), Some(Move { from: 1, to: 3 }));
    }

    #[test]
    fn test_noop_gestures_do_not_dirty() {
        let mut state = CollectionState::load(gallery(&["a", "b"]).records().unwrap());
        let controller = ReorderController::new();

        for gesture in [
            MoveGesture::Keyboard { index: 0, step: KeyStep::Up },
            MoveGesture::Keyboard { index: 1, step: KeyStep::Down },
            MoveGesture::Pointer { from: 1, drop_index: 1 },
        ] {
            assert_eq!(controller.apply(gesture, &mut state).unwrap(), None);
        }
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_source_out_of_range() {
        let gesture = MoveGesture::Keyboard {
            index: 0,
            step: KeyStep::Down,
        };
        let result = ReorderController::new().resolve(gesture, 0);
        assert_eq!(result, Err(CollectionError::IndexOutOfRange { index: 0, len: 0 }));
    }
}
