//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Catalog entities may exist in memory before they are persisted, so the identifier
/// is optional.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier, if one has been assigned.
    fn entity_id(&self) -> Option<&Self::Id>;

    /// Whether the entity has never been persisted.
    fn is_new(&self) -> bool {
        self.entity_id().is_none()
    }
}
