//! Property-based tests for the posing engine using proptest.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p posekit-tests --test proptest_properties
//! ```

use glam::{EulerRot, Quat, Vec3};
use proptest::prelude::*;

use posekit_core::{
    IkSettings, MirrorConfig, MirrorResolver, PoseSlot, SnapshotOptions, Transform,
    DEFAULT_SCALE_EPSILON,
};
use posekit_tests::fixtures::{humanoid_session, Humanoid};

// ============================================================================
// Strategies
// ============================================================================

fn position() -> impl Strategy<Value = Vec3> {
    (-10.0f32..10.0, -10.0f32..10.0, -10.0f32..10.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn rotation() -> impl Strategy<Value = Quat> {
    (-3.0f32..3.0, -1.5f32..1.5, -3.0f32..3.0)
        .prop_map(|(a, b, c)| Quat::from_euler(EulerRot::XYZ, a, b, c))
}

fn scale() -> impl Strategy<Value = Vec3> {
    (0.1f32..3.0, 0.1f32..3.0, 0.1f32..3.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn transform() -> impl Strategy<Value = Transform> {
    (position(), rotation(), scale()).prop_map(|(p, r, s)| Transform::new(p, r, s))
}

// ============================================================================
// 1. Diff Algebra
// ============================================================================

proptest! {
    /// Composing a diff back onto its base reproduces the target.
    #[test]
    fn diff_then_compose_reaches_target(previous in transform(), new in transform()) {
        let diff = Transform::diff(&previous, &new, DEFAULT_SCALE_EPSILON);
        let reached = previous.compose(&diff);
        prop_assert!(
            reached.abs_diff_eq(&new, 1e-3),
            "expected {:?}, got {:?}", new, reached
        );
    }

    /// Diffing a transform against itself gives identity.
    #[test]
    fn self_diff_is_identity(t in transform()) {
        let diff = Transform::diff(&t, &t, DEFAULT_SCALE_EPSILON);
        prop_assert!(diff.is_identity(1e-4), "got {:?}", diff);
    }
}

// ============================================================================
// 2. Mirror Names
// ============================================================================

proptest! {
    /// Mirroring a suffixed name twice leads back to it.
    #[test]
    fn mirror_name_is_an_involution(stem in "[a-z][a-z0-9_]{0,12}", left in any::<bool>()) {
        let resolver = MirrorResolver::new(&MirrorConfig::default()).unwrap();
        let name = format!("{}{}", stem, if left { "_l" } else { "_r" });

        let once = resolver.mirror_name(&name, PoseSlot::Character).unwrap();
        let twice = resolver.mirror_name(&once.name, once.slot).unwrap();

        prop_assert_ne!(&once.name, &name);
        prop_assert_eq!(twice.name, name);
    }
}

// ============================================================================
// 3. IK Budget
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The solver never rotates joints more than depth x iterations times.
    #[test]
    fn ik_adjustments_are_bounded(
        target in position(),
        depth in 1u32..=4,
        iterations in 1u32..=20,
    ) {
        let mut posing = humanoid_session();
        let hand = Humanoid::id(Humanoid::HAND_L);
        posing.set_ik_settings(&hand, IkSettings { enabled: true, depth, iterations, ..IkSettings::default() });

        let outcome = posing.solve_ik(&hand, target);

        let Some(ik) = outcome.ik() else {
            return Err(TestCaseError::fail(format!("expected IK outcome, got {:?}", outcome)));
        };
        prop_assert_eq!(outcome.is_applied(), !ik.rotations.is_empty());
        prop_assert!(ik.adjustments <= depth * iterations);
        prop_assert!(ik.error.is_finite());
    }
}

// ============================================================================
// 4. Undo/Redo Symmetry
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Undoing every step and redoing them all lands on the same pose.
    #[test]
    fn undo_all_then_redo_all_round_trips(offsets in prop::collection::vec(position(), 1..8)) {
        let mut posing = humanoid_session();
        let head = Humanoid::id(Humanoid::HEAD);
        for offset in &offsets {
            posing.apply_bone(&head, &Transform::from_position(*offset));
            posing.snapshot(SnapshotOptions::default());
        }
        let edited = posing.posing().capture();

        let mut undone = 0;
        while posing.undo() {
            undone += 1;
        }
        prop_assert!(posing.posing().capture().bones.is_empty());

        for _ in 0..undone {
            prop_assert!(posing.redo());
        }
        prop_assert_eq!(posing.posing().capture(), edited);
    }
}
