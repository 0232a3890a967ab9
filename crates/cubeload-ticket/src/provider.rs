//! The host-side hooks behind the activation tracker.

use std::hash::Hash;

use cubeload_core::{Level, Position};

/// Owns whatever is kept alive at a position (a *holder*) and reacts to
/// activation level changes.
///
/// The activation tracker only ever calls these from the owning thread.
pub trait HolderProvider {
    /// Handle to the object kept alive at a position.
    type Holder: Clone + Eq + Hash;

    /// `true` while the holder at `pos` is being torn down. Such positions
    /// read as unloaded.
    fn is_unloading(&self, pos: Position) -> bool;

    /// The holder at `pos`, if one exists.
    fn holder(&self, pos: Position) -> Option<Self::Holder>;

    /// Level the holder was last assigned.
    fn holder_level(&self, holder: &Self::Holder) -> Level;

    /// Move `pos` from `old_level` to `level`, creating or retiring its
    /// holder as needed. Returns the holder to finalize once the current
    /// batch of level changes is complete, if any.
    ///
    /// For a position reported by [`is_unloading`](Self::is_unloading),
    /// `old_level` is [`UNLOADED_LEVEL`](cubeload_core::UNLOADED_LEVEL); a
    /// loaded `level` means the holder is wanted again and should be
    /// revived.
    fn set_level(
        &mut self,
        pos: Position,
        level: Level,
        holder: Option<Self::Holder>,
        old_level: Level,
    ) -> Option<Self::Holder>;

    /// Apply the deferred part of a level change.
    fn finalize(&mut self, holder: &Self::Holder);

    /// `true` once the holder has finished loading.
    fn is_ready(&self, _holder: &Self::Holder) -> bool {
        true
    }
}
