//! Frame-scoped bone hierarchy.
//!
//! A [`Skeleton`] is an arena of [`BoneNode`]s rebuilt from a
//! [`SkeletonFrame`] every time the animation system produces new data.
//! Nodes are addressed with [`BoneHandle`]s that carry the id of the build
//! they came from; a handle from an older build resolves to nothing.
//!
//! Topology problems in the supplied frame never abort a build. The
//! offending records are left out and a [`Diagnostic`] is recorded:
//!
//! - duplicate `(name, partial_id)`: the later record is dropped (D003)
//! - parent index out of range: the bone and its subtree are dropped (D002)
//! - parent chain that loops: every bone on or below the loop is dropped (D001)
//! - malformed joint constraint: the constraint is dropped (D005)
//!
//! Nodes are stored in parent-before-children order, so iterating the arena
//! is a valid propagation order.

pub mod constraints;
pub mod frame;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticCode};
use crate::pose::PoseSlot;
use crate::transform::Transform;

pub use constraints::{BoneConstraint, BoneConstraintError, ConstraintAxis};
pub use frame::{BoneSample, FrameCapture, SkeletonFrame};

// =============================================================================
// Identity Types
// =============================================================================

/// Identifier of a partial skeleton (body, face, tail, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PartialId(u8);

impl PartialId {
    /// The main body partial.
    pub const ROOT: PartialId = PartialId(0);

    /// Creates a partial id.
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for PartialId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl From<PartialId> for u8 {
    fn from(id: PartialId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PartialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a bone node, valid for one skeleton build only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneHandle {
    index: u32,
    build: u64,
}

impl BoneHandle {
    /// Position of the node in the arena (parent-before-children order).
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Id of the skeleton build this handle belongs to.
    pub fn build(&self) -> u64 {
        self.build
    }
}

// =============================================================================
// Bone Node
// =============================================================================

/// One bone of the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneNode {
    /// Bone name.
    pub name: String,
    /// Partial skeleton id.
    pub partial_id: PartialId,
    /// Local transform supplied by the animation system, before any override.
    pub last_transform: Transform,
    /// Hidden in editors.
    pub is_hidden: bool,
    /// May be moved by IK.
    pub eligible_for_ik: bool,
    /// Rejects every edit while set.
    pub freeze: bool,
    /// Drag sensitivity multiplier.
    pub adjustment_offset: f32,
    /// Joint limits from the rig.
    pub constraint: Option<BoneConstraint>,
    handle: BoneHandle,
    parent: Option<BoneHandle>,
    children: Vec<BoneHandle>,
}

impl BoneNode {
    /// Handle of this node.
    pub fn handle(&self) -> BoneHandle {
        self.handle
    }

    /// Parent node, `None` for roots.
    pub fn parent(&self) -> Option<BoneHandle> {
        self.parent
    }

    /// Child nodes in frame order.
    pub fn children(&self) -> &[BoneHandle] {
        &self.children
    }

    fn user_state(&self) -> UserState {
        UserState {
            is_hidden: self.is_hidden,
            eligible_for_ik: self.eligible_for_ik,
            freeze: self.freeze,
            adjustment_offset: self.adjustment_offset,
        }
    }

    fn apply_user_state(&mut self, state: &UserState) {
        self.is_hidden = state.is_hidden;
        self.eligible_for_ik = state.eligible_for_ik;
        self.freeze = state.freeze;
        self.adjustment_offset = state.adjustment_offset;
    }
}

/// User-editable flags carried from build to build.
#[derive(Debug, Clone, Copy, PartialEq)]
struct UserState {
    is_hidden: bool,
    eligible_for_ik: bool,
    freeze: bool,
    adjustment_offset: f32,
}

// =============================================================================
// Skeleton
// =============================================================================

/// Arena of the bones of one skeleton for one frame.
#[derive(Debug, Clone)]
pub struct Skeleton {
    slot: PoseSlot,
    build: u64,
    nodes: Vec<BoneNode>,
    roots: Vec<BoneHandle>,
    lookup: HashMap<(String, PartialId), u32>,
    diagnostics: Vec<Diagnostic>,
    retained: HashMap<(String, PartialId), UserState>,
}

impl Skeleton {
    /// Builds a skeleton from frame data. `build` must be unique per build.
    pub fn from_frame(frame: &SkeletonFrame, build: u64) -> Self {
        let mut skeleton = Self {
            slot: frame.slot,
            build,
            nodes: Vec::new(),
            roots: Vec::new(),
            lookup: HashMap::new(),
            diagnostics: Vec::new(),
            retained: HashMap::new(),
        };
        skeleton.rebuild(frame);
        skeleton
    }

    /// Rebuilds from new frame data, keeping user flags of bones with the
    /// same `(name, partial_id)`. Flags of bones missing from this frame are
    /// remembered and restored if the bone comes back.
    pub fn refresh(&mut self, frame: &SkeletonFrame, build: u64) {
        for node in &self.nodes {
            self.retained
                .insert((node.name.clone(), node.partial_id), node.user_state());
        }
        self.slot = frame.slot;
        self.build = build;
        self.rebuild(frame);
    }

    fn rebuild(&mut self, frame: &SkeletonFrame) {
        self.nodes.clear();
        self.roots.clear();
        self.lookup.clear();
        self.diagnostics.clear();

        let samples = &frame.bones;
        let count = samples.len();

        // Duplicate identities: first record wins.
        let mut accepted = vec![true; count];
        let mut seen: HashMap<(&str, PartialId), usize> = HashMap::new();
        for (i, sample) in samples.iter().enumerate() {
            if seen.insert((&sample.name, sample.partial_id), i).is_some() {
                accepted[i] = false;
                self.push_diagnostic(Diagnostic::with_bone(
                    DiagnosticCode::DuplicateBone,
                    format!(
                        "duplicate bone identity (partial {}) at record {}; record dropped",
                        sample.partial_id, i
                    ),
                    sample.name.clone(),
                ));
            }
        }

        // Child lists over sample indices.
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut root_samples = Vec::new();
        let mut dangling = vec![false; count];
        for (i, sample) in samples.iter().enumerate() {
            if !accepted[i] {
                continue;
            }
            match sample.parent {
                None => root_samples.push(i),
                Some(p) if p < count && accepted[p] => children[p].push(i),
                Some(p) => {
                    dangling[i] = true;
                    self.push_diagnostic(Diagnostic::with_bone(
                        DiagnosticCode::DanglingParent,
                        format!("parent record {} does not exist; subtree dropped", p),
                        sample.name.clone(),
                    ));
                }
            }
        }

        // Depth-first from the roots, assigning arena slots in pre-order.
        let mut assigned: Vec<Option<u32>> = vec![None; count];
        let mut stack: Vec<usize> = root_samples.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            if assigned[i].is_some() {
                continue;
            }
            let sample = &samples[i];
            let index = self.nodes.len() as u32;
            let handle = BoneHandle {
                index,
                build: self.build,
            };
            assigned[i] = Some(index);

            let parent = sample
                .parent
                .and_then(|p| assigned.get(p).copied().flatten())
                .map(|index| BoneHandle {
                    index,
                    build: self.build,
                });
            match parent {
                Some(parent) => self.nodes[parent.index()].children.push(handle),
                None => self.roots.push(handle),
            }

            let constraint = match &sample.constraint {
                Some(constraint) => match constraint.validate() {
                    Ok(()) => Some(constraint.clone()),
                    Err(e) => {
                        self.push_diagnostic(Diagnostic::with_bone(
                            DiagnosticCode::InvalidConstraint,
                            format!("joint constraint dropped: {}", e),
                            sample.name.clone(),
                        ));
                        None
                    }
                },
                None => None,
            };

            let mut node = BoneNode {
                name: sample.name.clone(),
                partial_id: sample.partial_id,
                last_transform: sample.transform,
                is_hidden: false,
                eligible_for_ik: sample.eligible_for_ik,
                freeze: false,
                adjustment_offset: 1.0,
                constraint,
                handle,
                parent,
                children: Vec::new(),
            };
            if let Some(state) = self.retained.get(&(sample.name.clone(), sample.partial_id)) {
                node.apply_user_state(state);
            }
            self.lookup
                .insert((sample.name.clone(), sample.partial_id), index);
            self.nodes.push(node);

            stack.extend(children[i].iter().rev().copied());
        }

        // Anything accepted but unreached either hangs below a dangling
        // parent (already reported) or sits on/below a parent loop.
        for i in 0..count {
            if !accepted[i] || assigned[i].is_some() || dangling[i] {
                continue;
            }
            if !leads_to_dangling(samples, &dangling, i) {
                self.push_diagnostic(Diagnostic::with_bone(
                    DiagnosticCode::HierarchyCycle,
                    "parent chain loops; bone skipped",
                    samples[i].name.clone(),
                ));
            }
        }
    }

    /// Slot this skeleton was built for.
    pub fn slot(&self) -> PoseSlot {
        self.slot
    }

    /// Id of the current build.
    pub fn build(&self) -> u64 {
        self.build
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when no bone survived the build.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves a handle. Handles from other builds return `None`.
    pub fn get(&self, handle: BoneHandle) -> Option<&BoneNode> {
        if handle.build != self.build {
            return None;
        }
        self.nodes.get(handle.index())
    }

    /// Resolves a handle for mutation of the user flags.
    pub fn get_mut(&mut self, handle: BoneHandle) -> Option<&mut BoneNode> {
        if handle.build != self.build {
            return None;
        }
        self.nodes.get_mut(handle.index())
    }

    /// Finds a bone by identity.
    pub fn find(&self, name: &str, partial_id: PartialId) -> Option<BoneHandle> {
        self.lookup
            .get(&(name.to_string(), partial_id))
            .map(|&index| BoneHandle {
                index,
                build: self.build,
            })
    }

    /// Finds a bone by name alone, preferring the lowest partial id.
    pub fn find_by_name(&self, name: &str) -> Option<BoneHandle> {
        self.nodes
            .iter()
            .filter(|node| node.name == name)
            .min_by_key(|node| node.partial_id)
            .map(|node| node.handle)
    }

    /// Returns true when the bone is frozen, or was frozen when last seen.
    pub fn is_frozen(&self, name: &str, partial_id: PartialId) -> bool {
        if let Some(handle) = self.find(name, partial_id) {
            return self.get(handle).is_some_and(|node| node.freeze);
        }
        self.retained
            .get(&(name.to_string(), partial_id))
            .is_some_and(|state| state.freeze)
    }

    /// Root nodes.
    pub fn roots(&self) -> &[BoneHandle] {
        &self.roots
    }

    /// All nodes, parents before children.
    pub fn nodes(&self) -> impl Iterator<Item = &BoneNode> {
        self.nodes.iter()
    }

    /// Ancestors of `handle`, nearest first. Empty for stale handles.
    pub fn ancestors(&self, handle: BoneHandle) -> Ancestors<'_> {
        Ancestors {
            skeleton: self,
            next: self.get(handle).and_then(|node| node.parent),
        }
    }

    /// Topology diagnostics recorded by the latest build.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }
}

/// Iterator over the ancestors of a bone.
pub struct Ancestors<'a> {
    skeleton: &'a Skeleton,
    next: Option<BoneHandle>,
}

impl Iterator for Ancestors<'_> {
    type Item = BoneHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.skeleton.get(current).and_then(|node| node.parent);
        Some(current)
    }
}

/// Follows parent links from `start` until a dangling bone, a root, or a
/// repeat is found.
fn leads_to_dangling(samples: &[BoneSample], dangling: &[bool], start: usize) -> bool {
    let mut current = start;
    for _ in 0..=samples.len() {
        if dangling[current] {
            return true;
        }
        match samples[current].parent {
            Some(p) if p < samples.len() => current = p,
            _ => return false,
        }
    }
    false
}
