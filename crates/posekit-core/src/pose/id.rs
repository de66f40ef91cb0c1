//! Stable pose identities.

use serde::{Deserialize, Serialize};

use crate::skeleton::PartialId;

/// Which skeleton of an entity a bone belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PoseSlot {
    /// The character body.
    #[default]
    Character,
    /// Main-hand weapon.
    MainHand,
    /// Off-hand weapon.
    OffHand,
}

impl PoseSlot {
    /// All slots in storage order.
    pub const ALL: [PoseSlot; 3] = [PoseSlot::Character, PoseSlot::MainHand, PoseSlot::OffHand];

    /// Storage index of the slot.
    pub fn index(&self) -> usize {
        match self {
            PoseSlot::Character => 0,
            PoseSlot::MainHand => 1,
            PoseSlot::OffHand => 2,
        }
    }

    /// Returns the slot name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PoseSlot::Character => "character",
            PoseSlot::MainHand => "main_hand",
            PoseSlot::OffHand => "off_hand",
        }
    }
}

impl std::fmt::Display for PoseSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a bone pose: `(name, partial_id, slot)`.
///
/// Unlike a [`BoneHandle`](crate::skeleton::BoneHandle) this stays valid
/// across frames. Ordering is lexicographic by slot, then name, then
/// partial id, which keeps serialized output deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BonePoseInfoId {
    /// Bone name.
    pub name: String,
    /// Partial skeleton id.
    #[serde(default)]
    pub partial_id: PartialId,
    /// Skeleton slot.
    #[serde(default)]
    pub slot: PoseSlot,
}

impl BonePoseInfoId {
    /// Creates an id.
    pub fn new(name: impl Into<String>, partial_id: PartialId, slot: PoseSlot) -> Self {
        Self {
            name: name.into(),
            partial_id,
            slot,
        }
    }

    /// Creates an id for a body bone in the root partial.
    pub fn character(name: impl Into<String>) -> Self {
        Self::new(name, PartialId::ROOT, PoseSlot::Character)
    }
}

impl Ord for BonePoseInfoId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.slot
            .cmp(&other.slot)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.partial_id.cmp(&other.partial_id))
    }
}

impl PartialOrd for BonePoseInfoId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for BonePoseInfoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}#{}", self.slot, self.name, self.partial_id)
    }
}
