//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// A pantry item keeps its id through every update and merge; only removal
/// ends its life.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
