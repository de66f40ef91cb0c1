//! Whole-session posing scenarios on the humanoid rig.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p posekit-tests --test posing_scenarios
//! ```

use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;

use posekit_core::{
    ApplyOutcome, BonePoseInfoId, BoneSample, DiagnosticCode, IkSettings, ImportOptions,
    MirrorMode, PartialId, PoseFile, PoseFileBone, PosingCapability, PoseSlot, RecordingSink,
    SkeletonFrame, Transform, TransformComponents,
};
use posekit_tests::fixtures::{
    dual_wield_session, humanoid_capture, humanoid_frame, humanoid_session, Humanoid,
};

fn effective(posing: &PosingCapability, name: &str) -> Transform {
    posing
        .posing()
        .resolve_effective_transform(&Humanoid::id(name))
        .expect("bone should be live")
}

fn world_position(posing: &PosingCapability, name: &str) -> Vec3 {
    posing
        .posing()
        .resolve_world_transform(&Humanoid::id(name))
        .expect("bone should be live")
        .position
}

// ============================================================================
// Propagation
// ============================================================================

#[test]
fn full_propagation_moves_descendants() {
    let mut posing = humanoid_session();
    let spine = effective(&posing, Humanoid::SPINE);
    posing.apply_bone(
        &Humanoid::id(Humanoid::SPINE),
        &spine.with_position(spine.position + Vec3::X),
    );

    assert!(world_position(&posing, Humanoid::SPINE).abs_diff_eq(Vec3::new(1.0, 1.3, 0.0), 1e-5));
    assert!(world_position(&posing, Humanoid::HEAD).abs_diff_eq(Vec3::new(1.0, 1.8, 0.0), 1e-5));
}

#[test]
fn masked_propagation_keeps_descendants_in_place() {
    let mut posing = humanoid_session();
    let spine_id = Humanoid::id(Humanoid::SPINE);
    posing.set_propagation(&spine_id, TransformComponents::ROTATION);

    let spine = effective(&posing, Humanoid::SPINE);
    posing.apply_bone(&spine_id, &spine.with_position(spine.position + Vec3::X));

    assert!(world_position(&posing, Humanoid::SPINE).abs_diff_eq(Vec3::new(1.0, 1.3, 0.0), 1e-5));
    assert!(world_position(&posing, Humanoid::HEAD).abs_diff_eq(Vec3::new(0.0, 1.8, 0.0), 1e-5));
}

#[test]
fn override_follows_changing_animation() {
    let mut posing = humanoid_session();
    let head_id = Humanoid::id(Humanoid::HEAD);
    posing.apply_bone(&head_id, &Transform::from_position(Vec3::new(0.0, 0.5, 0.2)));

    let mut capture = humanoid_capture();
    capture.skeletons[0].bones[3].transform = Transform::from_position(Vec3::new(0.0, 0.6, 0.0));
    posing.refresh_capture(&capture);

    assert!(effective(&posing, Humanoid::HEAD)
        .position
        .abs_diff_eq(Vec3::new(0.0, 0.6, 0.2), 1e-5));
}

// ============================================================================
// Frozen bones
// ============================================================================

#[test]
fn frozen_bone_rejects_edits() {
    let mut posing = humanoid_session();
    let arm = Humanoid::id(Humanoid::ARM_L);
    assert!(posing.set_bone_freeze(&arm, true));

    let before = effective(&posing, Humanoid::ARM_L);
    let outcome = posing.apply_bone(&arm, &before.with_position(Vec3::ZERO));

    assert_eq!(outcome, ApplyOutcome::Frozen);
    assert_eq!(effective(&posing, Humanoid::ARM_L), before);
}

#[test]
fn frozen_mirror_target_is_left_alone() {
    let mut posing = humanoid_session();
    let left = Humanoid::id(Humanoid::ARM_L);
    let right = Humanoid::id(Humanoid::ARM_R);
    posing.set_mirror_mode(&right, MirrorMode::Mirror);
    posing.set_bone_freeze(&left, true);

    let arm = effective(&posing, Humanoid::ARM_R);
    let outcome = posing.apply_bone(&right, &arm.with_position(arm.position + Vec3::Z));

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            mirrored: None,
            ik: None
        }
    );
    assert!(!posing.get_bone_pose(&left).is_overridden());
}

#[test]
fn flags_survive_refresh_and_absence() {
    let mut posing = humanoid_session();
    let arm = Humanoid::id(Humanoid::ARM_L);
    let head = Humanoid::id(Humanoid::HEAD);
    posing.set_bone_freeze(&arm, true);
    posing.set_bone_hidden(&head, true);
    posing.set_bone_adjustment_offset(&head, 0.25);

    // A frame without the arms, then the full rig again.
    let torso = SkeletonFrame::new(PoseSlot::Character, humanoid_frame().bones[..4].to_vec());
    posing.refresh_slot(&torso);
    assert!(posing.get_bone(&arm).is_none());
    assert!(posing.posing().is_frozen(&arm));

    posing.refresh_slot(&humanoid_frame());
    assert!(posing.get_bone(&arm).unwrap().freeze);
    let head_node = posing.get_bone(&head).unwrap();
    assert!(head_node.is_hidden);
    assert_eq!(head_node.adjustment_offset, 0.25);
}

// ============================================================================
// Mirroring
// ============================================================================

#[test]
fn mirror_mode_reflects_the_diff() {
    let mut posing = humanoid_session();
    let left = Humanoid::id(Humanoid::ARM_L);
    let right = Humanoid::id(Humanoid::ARM_R);
    posing.set_mirror_mode(&left, MirrorMode::Mirror);

    let arm = effective(&posing, Humanoid::ARM_L);
    let target = Transform::new(
        arm.position + Vec3::new(0.1, 0.0, 0.05),
        Quat::from_rotation_y(0.2),
        Vec3::ONE,
    );
    let outcome = posing.apply_bone(&left, &target);

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            mirrored: Some(right.clone()),
            ik: None
        }
    );
    let expected = Transform::new(
        Vec3::new(-0.1, 0.0, 0.05),
        Quat::from_rotation_y(-0.2),
        Vec3::ONE,
    );
    assert!(posing
        .get_bone_pose(&right)
        .override_transform
        .abs_diff_eq(&expected, 1e-5));
}

#[test]
fn copy_mode_repeats_the_diff() {
    let mut posing = humanoid_session();
    let left = Humanoid::id(Humanoid::ELBOW_L);
    let right = Humanoid::id(Humanoid::ELBOW_R);
    posing.set_mirror_mode(&left, MirrorMode::Copy);

    let elbow = effective(&posing, Humanoid::ELBOW_L);
    posing.apply_bone(&left, &elbow.with_scale(Vec3::splat(2.0)));

    let copied = posing.get_bone_pose(&right).override_transform;
    assert!(copied.scale.abs_diff_eq(Vec3::splat(2.0), 1e-5));
    assert!(copied.position.abs_diff_eq(Vec3::ZERO, 1e-6));
}

#[test]
fn mutual_mirrors_apply_once_each() {
    let mut posing = humanoid_session();
    let left = Humanoid::id(Humanoid::HAND_L);
    let right = Humanoid::id(Humanoid::HAND_R);
    posing.set_mirror_mode(&left, MirrorMode::Mirror);
    posing.set_mirror_mode(&right, MirrorMode::Mirror);

    let hand = effective(&posing, Humanoid::HAND_L);
    posing.apply_bone(&left, &hand.with_position(hand.position + Vec3::Y));

    assert!(posing
        .get_bone_pose(&left)
        .override_transform
        .position
        .abs_diff_eq(Vec3::Y, 1e-6));
    assert!(posing
        .get_bone_pose(&right)
        .override_transform
        .position
        .abs_diff_eq(Vec3::Y, 1e-6));
}

#[test]
fn weapon_edits_mirror_across_hands() {
    let mut posing = dual_wield_session();
    let main = BonePoseInfoId::new("n_buki", PartialId::ROOT, PoseSlot::MainHand);
    let off = BonePoseInfoId::new("n_buki", PartialId::ROOT, PoseSlot::OffHand);
    assert_eq!(posing.posing().get_mirror_bone(&main), Some(off.clone()));
    assert_eq!(posing.posing().get_mirror_bone(&off), Some(main.clone()));
    posing.set_mirror_mode(&main, MirrorMode::Mirror);

    let outcome = posing.apply_bone(
        &main,
        &Transform::new(Vec3::new(0.2, 0.1, 0.0), Quat::from_rotation_y(0.3), Vec3::ONE),
    );

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            mirrored: Some(off.clone()),
            ik: None
        }
    );
    let expected = Transform::new(
        Vec3::new(-0.2, 0.1, 0.0),
        Quat::from_rotation_y(-0.3),
        Vec3::ONE,
    );
    assert!(posing
        .get_bone_pose(&off)
        .override_transform
        .abs_diff_eq(&expected, 1e-5));
    // The character slot has no weapon bone to pick up the edit.
    assert!(posing
        .posing()
        .find_bone_pose(&Humanoid::id("n_buki"))
        .is_none());
}

#[test]
fn weapon_mirror_needs_the_other_hand_loaded() {
    let mut posing = dual_wield_session();
    posing.clear_slot(PoseSlot::OffHand);
    let main = BonePoseInfoId::new("n_buki", PartialId::ROOT, PoseSlot::MainHand);
    posing.set_mirror_mode(&main, MirrorMode::Copy);
    assert_eq!(posing.posing().get_mirror_bone(&main), None);

    let outcome = posing.apply_bone(&main, &Transform::from_position(Vec3::X));

    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            mirrored: None,
            ik: None
        }
    );
}

// ============================================================================
// IK
// ============================================================================

#[test]
fn ik_drag_rotates_the_chain_within_budget() {
    let mut posing = humanoid_session();
    let hand = Humanoid::id(Humanoid::HAND_L);
    let settings = IkSettings {
        enabled: true,
        depth: 2,
        iterations: 20,
        ..IkSettings::default()
    };
    posing.set_ik_settings(&hand, settings);

    let local = effective(&posing, Humanoid::HAND_L);
    let outcome = posing.apply_bone(
        &hand,
        &local.with_position(local.position + Vec3::new(-0.1, 0.0, 0.0)),
    );

    let ApplyOutcome::Applied { ik: Some(ik), .. } = outcome else {
        panic!("expected an IK outcome, got {:?}", outcome);
    };
    assert!(ik.adjustments <= settings.depth * settings.iterations);
    assert!(ik.error < 0.1);

    // Position went into joint rotations, not into the hand.
    assert!(!posing.get_bone_pose(&hand).is_overridden());
    assert!(posing
        .get_bone_pose(&Humanoid::id(Humanoid::ELBOW_L))
        .is_overridden());
    assert!(!posing
        .get_bone_pose(&Humanoid::id(Humanoid::SPINE))
        .is_overridden());
}

#[test]
fn unreachable_ik_target_stays_bounded() {
    let mut posing = humanoid_session();
    let hand = Humanoid::id(Humanoid::HAND_L);
    let settings = IkSettings {
        enabled: true,
        depth: 2,
        iterations: 5,
        ..IkSettings::default()
    };
    posing.set_ik_settings(&hand, settings);

    let outcome = posing.solve_ik(&hand, Vec3::new(10.0, 10.0, 0.0));

    let ApplyOutcome::Applied { ik: Some(ik), .. } = outcome else {
        panic!("expected an IK outcome, got {:?}", outcome);
    };
    assert!(!ik.converged);
    assert!(ik.error > 1.0);
    assert!(ik.adjustments <= 10);
}

#[test]
fn ik_chain_stops_at_ineligible_joint() {
    let mut posing = humanoid_session();
    let hand = Humanoid::id(Humanoid::HAND_L);
    let arm = Humanoid::id(Humanoid::ARM_L);
    posing.set_bone_ik_eligible(&arm, false);
    posing.set_ik_settings(
        &hand,
        IkSettings {
            enabled: true,
            depth: 3,
            iterations: 10,
            ..IkSettings::default()
        },
    );

    posing.solve_ik(&hand, Vec3::new(0.6, 1.9, 0.0));

    assert!(!posing.get_bone_pose(&arm).is_overridden());
    assert!(!posing
        .get_bone_pose(&Humanoid::id(Humanoid::SPINE))
        .is_overridden());
}

// ============================================================================
// Topology
// ============================================================================

#[test]
fn parent_cycle_is_reported_and_skipped() {
    let mut posing = humanoid_session();
    // j_loop_a -> j_loop_b -> j_loop_a
    posing.refresh_slot(&SkeletonFrame::new(
        PoseSlot::OffHand,
        vec![
            BoneSample::root("n_buki", Transform::IDENTITY),
            BoneSample::child("j_loop_a", 2, Transform::IDENTITY),
            BoneSample::child("j_loop_b", 1, Transform::IDENTITY),
        ],
    ));
    let skeleton = posing.posing().skeleton(PoseSlot::OffHand).unwrap();

    assert_eq!(skeleton.len(), 1);
    let cycles = posing
        .diagnostics()
        .iter()
        .filter(|d| d.code == DiagnosticCode::HierarchyCycle)
        .count();
    assert_eq!(cycles, 2);
}

#[test]
fn weapon_slot_is_posed_independently() {
    let mut posing = humanoid_session();
    let tip = BonePoseInfoId::new("j_buki_tip", PartialId::ROOT, PoseSlot::MainHand);
    posing.apply_bone(&tip, &Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));

    let mut sink = RecordingSink::new();
    posing.write_back(&mut sink);

    let weapon_tip = sink.bone(PoseSlot::MainHand, "j_buki_tip").unwrap();
    assert!(weapon_tip.local.position.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));
    let hara = sink.bone(PoseSlot::Character, Humanoid::HARA).unwrap();
    assert!(hara.local.position.abs_diff_eq(Vec3::Y, 1e-5));
}

// ============================================================================
// Pose files
// ============================================================================

#[test]
fn import_respects_component_mask() {
    let mut posing = humanoid_session();
    let head = Humanoid::id(Humanoid::HEAD);
    let file = PoseFile {
        bones: vec![PoseFileBone {
            slot: PoseSlot::Character,
            name: Humanoid::HEAD.into(),
            partial_id: PartialId::ROOT,
            transform: Transform::new(Vec3::X, Quat::from_rotation_x(0.5), Vec3::ONE),
        }],
        ..PoseFile::default()
    };

    let report = posing.import_pose(
        &file,
        &ImportOptions::default().with_components(TransformComponents::ROTATION),
    );

    assert_eq!(report.applied, 1);
    let imported = posing.get_bone_pose(&head).override_transform;
    assert_eq!(imported.position, Vec3::ZERO);
    assert!(imported.rotation.abs_diff_eq(Quat::from_rotation_x(0.5), 1e-6));
}

#[test]
fn import_skips_frozen_and_unknown_bones() {
    let mut posing = humanoid_session();
    posing.set_bone_freeze(&Humanoid::id(Humanoid::HEAD), true);
    let entry = |name: &str| PoseFileBone {
        slot: PoseSlot::Character,
        name: name.into(),
        partial_id: PartialId::ROOT,
        transform: Transform::from_position(Vec3::Z),
    };
    let file = PoseFile {
        bones: vec![entry(Humanoid::HEAD), entry("j_tail"), entry(Humanoid::SPINE)],
        ..PoseFile::default()
    };

    let report = posing.import_pose(&file, &ImportOptions::default());

    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped_frozen, 1);
    assert_eq!(report.unknown, vec![Humanoid::id("j_tail")]);
}
