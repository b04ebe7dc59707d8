//! Weak, key-based references between entities.
//!
//! Players, squads and teams reference each other circularly. Links break
//! the ownership cycle: a link carries only the target's scope path and key
//! attributes and is resolved lazily against a snapshot tree. In fallback
//! mode a link additionally embeds a full copy of the target taken at
//! creation time, so it stays meaningful after the originating tree is
//! discarded — the diff engine uses this for event references.

use crate::hopper::Hopper;
use crate::key::{matches_filters, KeyAttributes, Keyed};
use crate::state::{Player, Squad, Team};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Embedded copy of a link target, kept when the link was created with
/// fallback mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    Player(Player),
    Squad(Squad),
    Team(Team),
}

impl LinkTarget {
    pub fn as_player(&self) -> Option<&Player> {
        match self {
            LinkTarget::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_squad(&self) -> Option<&Squad> {
        match self {
            LinkTarget::Squad(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_team(&self) -> Option<&Team> {
        match self {
            LinkTarget::Team(t) => Some(t),
            _ => None,
        }
    }
}

/// A borrowed view of an entity found in a snapshot tree.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Player(&'a Player),
    Squad(&'a Squad),
    Team(&'a Team),
}

impl<'a> EntityRef<'a> {
    pub fn as_player(&self) -> Option<&'a Player> {
        match self {
            EntityRef::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_squad(&self) -> Option<&'a Squad> {
        match self {
            EntityRef::Squad(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_team(&self) -> Option<&'a Team> {
        match self {
            EntityRef::Team(t) => Some(t),
            _ => None,
        }
    }

    pub fn key_attributes(&self) -> KeyAttributes {
        match self {
            EntityRef::Player(p) => p.key_attributes(),
            EntityRef::Squad(s) => s.key_attributes(),
            EntityRef::Team(t) => t.key_attributes(),
        }
    }
}

impl<'a> From<&'a LinkTarget> for EntityRef<'a> {
    fn from(target: &'a LinkTarget) -> Self {
        match target {
            LinkTarget::Player(p) => EntityRef::Player(p),
            LinkTarget::Squad(s) => EntityRef::Squad(s),
            LinkTarget::Team(t) => EntityRef::Team(t),
        }
    }
}

/// A weak reference to another entity by scope path and key-field values.
///
/// Links never express ownership and resolving one never mutates the
/// referenced tree. Two links are equal iff their scope and key-field
/// values are equal; an embedded fallback copy does not participate in
/// equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    scope: String,
    keys: KeyAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback: Option<Box<LinkTarget>>,
}

impl Link {
    pub fn new(scope: impl Into<String>, keys: KeyAttributes) -> Self {
        Self {
            scope: scope.into(),
            keys,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, target: LinkTarget) -> Self {
        self.fallback = Some(Box::new(target));
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn keys(&self) -> &KeyAttributes {
        &self.keys
    }

    pub fn fallback(&self) -> Option<&LinkTarget> {
        self.fallback.as_deref()
    }

    /// Drop the embedded copy, keeping only the key reference.
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    /// Look up the target by key-field equality within this link's scope of
    /// the given tree. Lenient matching: a target missing a key field is
    /// matched on the fields it does have.
    pub fn resolve<'a>(&self, tree: &'a Hopper) -> Option<EntityRef<'a>> {
        if self.keys.is_empty() {
            return None;
        }
        match self.scope.as_str() {
            Player::SCOPE => tree
                .players
                .iter()
                .find(|p| matches_filters(*p, &self.keys, true))
                .map(EntityRef::Player),
            Squad::SCOPE => tree
                .squads
                .iter()
                .find(|s| matches_filters(*s, &self.keys, true))
                .map(EntityRef::Squad),
            Team::SCOPE => tree
                .teams
                .iter()
                .find(|t| matches_filters(*t, &self.keys, true))
                .map(EntityRef::Team),
            _ => None,
        }
    }

    /// [`Link::resolve`], degrading to the embedded fallback copy when the
    /// tree does not contain a match.
    pub fn resolve_or_fallback<'a>(&'a self, tree: &'a Hopper) -> Option<EntityRef<'a>> {
        self.resolve(tree)
            .or_else(|| self.fallback.as_deref().map(EntityRef::from))
    }

    /// The embedded copy, when the link was created in fallback mode and
    /// targets a player. Used by event payloads that must answer questions
    /// (teamkill, suicide) without a tree at hand.
    pub fn fallback_player(&self) -> Option<&Player> {
        self.fallback.as_deref().and_then(LinkTarget::as_player)
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope && self.keys == other.keys
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.keys.hash(state);
    }
}

/// Entity types that can be the target of a [`Link`].
pub trait Linkable: Keyed + Sized {
    fn to_link_target(&self) -> LinkTarget;

    /// Produce a link to this entity. With `with_fallback`, a copy of the
    /// entity travels inside the link so it survives even if the
    /// originating tree is discarded.
    fn create_link(&self, with_fallback: bool) -> Link {
        let link = Link::new(Self::SCOPE, self.key_attributes());
        if with_fallback {
            link.with_fallback(self.to_link_target())
        } else {
            link
        }
    }
}

impl Linkable for Player {
    fn to_link_target(&self) -> LinkTarget {
        LinkTarget::Player(self.clone())
    }
}

impl Linkable for Squad {
    fn to_link_target(&self) -> LinkTarget {
        LinkTarget::Squad(self.clone())
    }
}

impl Linkable for Team {
    fn to_link_target(&self) -> LinkTarget {
        LinkTarget::Team(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::testing::HopperBuilder;

    fn named_player(name: &str) -> Player {
        Player {
            name: name.into(),
            ..Player::new()
        }
    }

    #[test]
    fn test_link_equality_ignores_fallback() {
        let p = named_player("bob");
        let bare = p.create_link(false);
        let fat = p.create_link(true);
        assert_eq!(bare, fat);
        assert!(fat.fallback().is_some());
        assert!(bare.fallback().is_none());
    }

    #[test]
    fn test_resolve_by_partial_keys() {
        let hopper = HopperBuilder::new().player(named_player("bob")).build();

        let link = Link::new(
            Player::SCOPE,
            KeyAttributes::new().with("name", "bob"),
        );
        let hit = link.resolve(&hopper);
        assert_eq!(
            hit.and_then(|e| e.as_player()).map(|p| p.name.clone()),
            Some(Field::Set("bob".to_string()))
        );
    }

    #[test]
    fn test_resolve_falls_back_when_tree_lacks_target() {
        let empty = HopperBuilder::new().build();
        let p = named_player("bob");

        let bare = p.create_link(false);
        assert!(bare.resolve_or_fallback(&empty).is_none());

        let fat = p.create_link(true);
        let hit = fat.resolve_or_fallback(&empty);
        assert!(matches!(hit, Some(EntityRef::Player(_))));
    }

    #[test]
    fn test_resolution_never_crosses_scopes() {
        let hopper = HopperBuilder::new().player(named_player("bob")).build();
        let link = Link::new("teams", KeyAttributes::new().with("name", "bob"));
        assert!(link.resolve(&hopper).is_none());
    }
}
