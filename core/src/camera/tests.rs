use decalforge_shared::{CameraId, ReplacementOverride};

use super::*;
use crate::backend::{GpuBackend, TargetKind, TargetRole};
use crate::test_utils::{RecordingBackend, TestCamera};

fn inputs(replacement_override: ReplacementOverride, stereo: bool, max: u32) -> ModeInputs {
    ModeInputs {
        replacement_override,
        stereo,
        path: RenderingPath::Forward,
        max_render_targets: max,
    }
}

fn evaluate(
    state: &mut CameraRenderState,
    camera: &mut TestCamera,
    backend: &mut RecordingBackend,
) -> Evaluation {
    state
        .evaluate(camera, ReplacementOverride::Standard, backend)
        .unwrap()
}

// ============================================================================
// Mode selection
// ============================================================================

#[test]
fn test_mode_selection_table() {
    use ReplacementOverride::*;
    assert_eq!(select_mode(&inputs(Standard, false, 3)), ReplacementMode::SinglePass);
    assert_eq!(select_mode(&inputs(Standard, false, 2)), ReplacementMode::DoublePass);
    assert_eq!(select_mode(&inputs(Standard, true, 8)), ReplacementMode::TriplePass);
    assert_eq!(select_mode(&inputs(Standard, true, 1)), ReplacementMode::TriplePass);
    assert_eq!(select_mode(&inputs(Vr, false, 8)), ReplacementMode::SingleTarget);
    assert_eq!(select_mode(&inputs(Vr, true, 1)), ReplacementMode::SingleTarget);
    assert_eq!(select_mode(&inputs(Mobile, true, 8)), ReplacementMode::Classic);
    assert_eq!(select_mode(&inputs(Mobile, false, 1)), ReplacementMode::Classic);
}

#[test]
fn test_depth_target_only_on_deferred_multi_pass() {
    let forward = TargetLayout::new(ReplacementMode::DoublePass, RenderingPath::Forward);
    let deferred = TargetLayout::new(ReplacementMode::DoublePass, RenderingPath::Deferred);
    assert!(!forward.depth && !forward.depth_pass);
    assert_eq!(forward.native_capture, DepthCapture::DEPTH);
    assert!(deferred.depth && deferred.depth_pass);
    assert_eq!(deferred.native_capture, DepthCapture::empty());
    assert_eq!(deferred.target_count(), 3);

    let single = TargetLayout::new(ReplacementMode::SingleTarget, RenderingPath::Deferred);
    assert_eq!(single.target_count(), 1);
    assert!(single.packed);
}

// ============================================================================
// Allocation lifecycle
// ============================================================================

#[test]
fn test_first_evaluation_allocates_at_resolution() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    assert!(state.shading_inputs().is_none());

    let result = evaluate(&mut state, &mut camera, &mut backend);
    assert_eq!(
        result,
        Evaluation::Ready {
            mode: ReplacementMode::SinglePass,
            reallocated: true
        }
    );
    assert!(state.is_initialized());
    assert_eq!(backend.allocations.len(), 3);
    for (_, desc) in &backend.allocations {
        assert_eq!((desc.width, desc.height), (1280, 720));
        assert_eq!(desc.role, TargetRole::Combined);
    }

    let inputs = state.shading_inputs().unwrap();
    assert_eq!(inputs.mode, ReplacementMode::SinglePass);
    assert!(inputs.depth.is_some() && inputs.normal.is_some() && inputs.mask.is_some());
    assert!(inputs.packed.is_none());
}

#[test]
fn test_no_reallocation_without_change() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);

    for _ in 0..5 {
        let result = evaluate(&mut state, &mut camera, &mut backend);
        assert_eq!(
            result,
            Evaluation::Ready {
                mode: ReplacementMode::SinglePass,
                reallocated: false
            }
        );
    }
    assert_eq!(backend.allocations.len(), 3);
    assert!(backend.releases.is_empty());
}

#[test]
fn test_resize_reallocates() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);
    let old: Vec<_> = state.targets().iter().map(|(_, h)| h).collect();

    camera.size = (1920, 1080);
    let result = evaluate(&mut state, &mut camera, &mut backend);
    assert!(matches!(result, Evaluation::Ready { reallocated: true, .. }));
    for handle in old {
        assert_eq!(backend.release_count(handle), 1);
    }
    let live = backend.live_for(camera.id);
    assert_eq!(live.len(), 3);
    assert!(live.iter().all(|d| (d.width, d.height) == (1920, 1080)));
    assert_eq!(state.resolution(), (1920, 1080));
}

#[test]
fn test_single_pass_to_double_pass_releases_once() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.max_targets = 3;
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);
    assert_eq!(state.mode(), Some(ReplacementMode::SinglePass));
    let old: Vec<_> = state.targets().iter().map(|(_, h)| h).collect();
    assert_eq!(old.len(), 3);

    camera.max_targets = 2;
    camera.size = (1024, 768);
    let result = evaluate(&mut state, &mut camera, &mut backend);
    assert_eq!(
        result,
        Evaluation::Ready {
            mode: ReplacementMode::DoublePass,
            reallocated: true
        }
    );
    // Next frames must not release anything again
    evaluate(&mut state, &mut camera, &mut backend);
    evaluate(&mut state, &mut camera, &mut backend);

    for handle in &old {
        assert_eq!(backend.release_count(*handle), 1);
    }
    let live = backend.live_for(camera.id);
    let mut kinds: Vec<_> = live.iter().map(|d| d.kind).collect();
    kinds.sort_by_key(|k| TargetKind::ALL.iter().position(|a| a == k));
    assert_eq!(kinds, vec![TargetKind::Normal, TargetKind::Mask]);
    assert!(live.iter().all(|d| (d.width, d.height) == (1024, 768)));
}

#[test]
fn test_path_change_reallocates_depth() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.max_targets = 2;
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);
    assert!(state.targets().depth.is_none());

    camera.path = RenderingPath::Deferred;
    let result = evaluate(&mut state, &mut camera, &mut backend);
    assert!(matches!(result, Evaluation::Ready { reallocated: true, .. }));
    assert!(state.targets().depth.is_some());
}

// ============================================================================
// Capture flags
// ============================================================================

#[test]
fn test_capture_restored_verbatim() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.capture = DepthCapture::NORMALS;
    let mut state = CameraRenderState::new(camera.id);

    state
        .evaluate(&mut camera, ReplacementOverride::Mobile, &mut backend)
        .unwrap();
    assert_eq!(state.mode(), Some(ReplacementMode::Classic));
    assert_eq!(camera.capture, DepthCapture::DEPTH_NORMALS);
    assert_eq!(state.original_capture(), Some(DepthCapture::NORMALS));

    // Switching to a mode that needs nothing goes back to the original only
    evaluate(&mut state, &mut camera, &mut backend);
    assert_eq!(camera.capture, DepthCapture::NORMALS);

    state.terminate(Some(&mut camera), &mut backend);
    assert_eq!(camera.capture, DepthCapture::NORMALS);
    assert_eq!(state.phase(), RenderPhase::Terminated);
    assert!(backend.live_for(camera.id).is_empty());
}

#[test]
fn test_capture_untouched_when_not_needed() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);
    state.terminate(Some(&mut camera), &mut backend);
    assert_eq!(camera.capture_writes, 0);
    assert_eq!(state.original_capture(), None);
}

#[test]
fn test_terminate_destroyed_camera() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    state
        .evaluate(&mut camera, ReplacementOverride::Mobile, &mut backend)
        .unwrap();
    let writes = camera.capture_writes;

    camera.alive = false;
    state.terminate(Some(&mut camera), &mut backend);
    assert_eq!(camera.capture_writes, writes);
    assert!(backend.live_for(camera.id).is_empty());

    // Second terminate is a no-op
    state.terminate(None, &mut backend);
    assert!(backend.releases.values().all(|&n| n == 1));
    assert_eq!(
        evaluate(&mut state, &mut camera, &mut backend),
        Evaluation::Terminated
    );
}

// ============================================================================
// Blocking marker and unsupported paths
// ============================================================================

#[test]
fn test_blocked_camera_never_allocates() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.blocked = true;
    let mut state = CameraRenderState::new(camera.id);
    assert_eq!(evaluate(&mut state, &mut camera, &mut backend), Evaluation::Blocked);
    assert_eq!(state.phase(), RenderPhase::Uninitialized);
    assert!(backend.allocations.is_empty());
}

#[test]
fn test_blocking_marker_added_later_tears_down() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    state
        .evaluate(&mut camera, ReplacementOverride::Mobile, &mut backend)
        .unwrap();
    backend.publish(camera.id, &state.shading_inputs().unwrap());

    camera.blocked = true;
    assert_eq!(evaluate(&mut state, &mut camera, &mut backend), Evaluation::Blocked);
    assert_eq!(state.phase(), RenderPhase::Uninitialized);
    assert!(state.targets().is_empty());
    assert!(backend.live_for(camera.id).is_empty());
    assert!(!backend.published.contains_key(&camera.id));
    assert_eq!(camera.capture, DepthCapture::empty());

    camera.blocked = false;
    let result = evaluate(&mut state, &mut camera, &mut backend);
    assert!(matches!(result, Evaluation::Ready { reallocated: true, .. }));
}

#[test]
fn test_unsupported_path_keeps_state() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);

    camera.path = RenderingPath::VertexLit;
    assert_eq!(
        evaluate(&mut state, &mut camera, &mut backend),
        Evaluation::UnsupportedPath(RenderingPath::VertexLit)
    );
    assert!(state.is_initialized());
    assert!(backend.releases.is_empty());
}

#[test]
fn test_zero_size_skips_frame_without_terminating() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.size = (0, 0);
    let mut state = CameraRenderState::new(camera.id);

    assert_eq!(evaluate(&mut state, &mut camera, &mut backend), Evaluation::ZeroSize);
    assert_eq!(state.phase(), RenderPhase::Uninitialized);
    assert!(backend.allocations.is_empty());

    camera.size = (800, 600);
    assert!(matches!(
        evaluate(&mut state, &mut camera, &mut backend),
        Evaluation::Ready { reallocated: true, .. }
    ));

    // Minimized after initialization: targets are kept for the restore
    camera.size = (0, 600);
    assert_eq!(evaluate(&mut state, &mut camera, &mut backend), Evaluation::ZeroSize);
    assert!(state.is_initialized());
    assert!(backend.releases.is_empty());

    camera.size = (800, 600);
    assert!(matches!(
        evaluate(&mut state, &mut camera, &mut backend),
        Evaluation::Ready { reallocated: false, .. }
    ));
}

// ============================================================================
// Stereo
// ============================================================================

#[test]
fn test_single_pass_stereo_sizes() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.stereo = StereoMode::SinglePass;
    camera.eye_size = (600, 700);
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);

    assert_eq!(state.mode(), Some(ReplacementMode::TriplePass));
    assert_eq!(state.resolution(), (1200, 700));
    assert_eq!(state.eye_resolution(), Some((600, 700)));
    let eye = state.eye_targets().unwrap();
    assert!(eye.normal.is_some() && eye.mask.is_some());

    for (_, desc) in &backend.allocations {
        let expected = match desc.role {
            TargetRole::Combined => (1200, 700),
            TargetRole::EyeScratch => (600, 700),
        };
        assert_eq!((desc.width, desc.height), expected);
    }
    assert_eq!(backend.allocations.len(), 4);
}

#[test]
fn test_multi_pass_stereo_uses_eye_size() {
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    camera.stereo = StereoMode::MultiPass;
    camera.eye_size = (600, 700);
    let mut state = CameraRenderState::new(camera.id);
    evaluate(&mut state, &mut camera, &mut backend);
    assert_eq!(state.resolution(), (600, 700));
    assert!(state.eye_targets().is_none());
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_allocation_failure_is_per_camera() {
    let mut backend = RecordingBackend::new();
    let mut good = TestCamera::new(1);
    let mut bad = TestCamera::new(2);
    bad.capture = DepthCapture::NORMALS;
    backend.fail_camera = Some(CameraId(2));

    let mut good_state = CameraRenderState::new(good.id);
    let mut bad_state = CameraRenderState::new(bad.id);
    good_state
        .evaluate(&mut good, ReplacementOverride::Mobile, &mut backend)
        .unwrap();
    let err = bad_state
        .evaluate(&mut bad, ReplacementOverride::Mobile, &mut backend)
        .unwrap_err();
    assert!(matches!(
        err,
        RenderStateError::Allocation { camera: CameraId(2), .. }
    ));
    assert_eq!(bad_state.phase(), RenderPhase::Terminated);
    assert_eq!(bad.capture, DepthCapture::NORMALS);

    // The other camera is unaffected and later frames skip the failed one
    assert!(good_state.is_initialized());
    assert_eq!(backend.live_for(good.id).len(), 1);
    assert_eq!(
        evaluate(&mut bad_state, &mut bad, &mut backend),
        Evaluation::Terminated
    );
}
