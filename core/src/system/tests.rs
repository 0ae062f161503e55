use decalforge_shared::{CameraId, MaskMethod, MaskingLayerConfig, PoolConfig, ProjectorConfig};
use glam::{Vec3, Vec4};

use super::*;
use crate::camera::{DepthCapture, RenderPhase, StereoMode};
use crate::definition::PathSupport;
use crate::test_utils::{RecordingBackend, TestCamera};

fn config_with_pool(capacities: &[u32]) -> ProjectorConfig {
    ProjectorConfig {
        pools: vec![PoolConfig {
            name: "Impacts".into(),
            capacities: capacities.to_vec(),
        }],
        ..ProjectorConfig::default()
    }
}

fn masking(name: &str, layers: &[u32]) -> MaskingLayerConfig {
    MaskingLayerConfig {
        name: name.into(),
        layers: layers.to_vec(),
        tags: Vec::new(),
    }
}

fn impacts(system: &DecalSystem) -> PoolId {
    system.pool_id("Impacts").unwrap()
}

// ============================================================================
// Construction and settings
// ============================================================================

#[test]
fn test_new_rejects_invalid_config() {
    let mut config = ProjectorConfig::default();
    config.masking_layers = (0..5).map(|i| masking(&format!("m{i}"), &[i])).collect();
    assert!(matches!(
        DecalSystem::new(config),
        Err(ConfigError::TooManyMaskingLayers(5))
    ));
}

#[test]
fn test_set_masking_rebuilds_plan() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    assert_eq!(system.mask_plan().sub_draws().len(), 1);

    system.set_masking(vec![masking("Env", &[0])]).unwrap();
    assert_eq!(system.mask_plan().sub_draws().len(), 2);
    assert_eq!(system.mask_plan().vector_for(0, None), Some(Vec4::X));

    // Invalid layers are rejected and the previous plan kept
    let err = system.set_masking(vec![masking("Bad", &[40])]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSceneLayer { layer: 40, .. }));
    assert_eq!(system.config().masking_layers, vec![masking("Env", &[0])]);
    assert_eq!(system.mask_plan().sub_draws().len(), 2);

    system.set_mask_method(MaskMethod::Tag);
    assert_eq!(system.mask_plan().method(), MaskMethod::Tag);
    assert_eq!(system.mask_plan().sub_draws().len(), 1);
}

// ============================================================================
// Pools and registration
// ============================================================================

#[test]
fn test_pool_request_registers_instance() {
    let mut system = DecalSystem::new(config_with_pool(&[4])).unwrap();
    let def = system.create_definition("bullet", ProjectionKind::unlit());
    let pool = impacts(&system);

    let request = system
        .request(pool, Some(&ProjectionTemplate::new(def)))
        .unwrap();
    assert_eq!(request.reuse, SlotReuse::Allocated);
    assert!(system.instance(request.instance).unwrap().is_active());
    assert_eq!(system.registry().group_of(request.instance), Some(def));

    assert!(system.request_from("Missing", None).is_none());
}

#[test]
fn test_eviction_moves_instance_to_new_group() {
    let mut system = DecalSystem::new(config_with_pool(&[2])).unwrap();
    let bullet = system.create_definition("bullet", ProjectionKind::unlit());
    let scorch = system.create_definition("scorch", ProjectionKind::metallic());
    let pool = impacts(&system);

    let first = system
        .request(pool, Some(&ProjectionTemplate::new(bullet)))
        .unwrap();
    system
        .request(pool, Some(&ProjectionTemplate::new(bullet)))
        .unwrap();
    let third = system
        .request(pool, Some(&ProjectionTemplate::new(scorch)))
        .unwrap();

    assert_eq!(third.reuse, SlotReuse::Evicted);
    assert_eq!(third.instance, first.instance);
    assert_eq!(system.registry().len(), 2);
    assert_eq!(system.registry().group(bullet).unwrap().instances().len(), 1);
    assert_eq!(
        system.registry().group(scorch).unwrap().instances(),
        &[first.instance]
    );
}

#[test]
fn test_return_deregisters() {
    let mut system = DecalSystem::new(config_with_pool(&[4])).unwrap();
    let def = system.create_definition("bullet", ProjectionKind::unlit());
    let pool = impacts(&system);
    let request = system
        .request(pool, Some(&ProjectionTemplate::new(def)))
        .unwrap();

    let returned = system.return_instance(request.instance).unwrap();
    assert_eq!(returned.slot, request.slot);
    assert!(!system.registry().contains(request.instance));
    assert!(system.registry().group(def).is_none());
    assert!(system.return_slot(pool, request.slot).is_none());

    // Pooled instances are never despawned out from under the pool
    assert!(system.despawn(request.instance).is_none());
    assert!(system.instance(request.instance).is_some());
}

#[test]
fn test_quality_tier_trim_deregisters_oldest() {
    let mut system = DecalSystem::new(config_with_pool(&[1, 3])).unwrap();
    system.set_quality_tier(1);
    let def = system.create_definition("bullet", ProjectionKind::unlit());
    let pool = impacts(&system);
    let ids: Vec<_> = (0..3)
        .map(|_| {
            system
                .request(pool, Some(&ProjectionTemplate::new(def)))
                .unwrap()
                .instance
        })
        .collect();

    let trimmed = system.set_quality_tier(0);
    assert_eq!(system.quality_tier(), 0);
    let trimmed: Vec<_> = trimmed.iter().map(|(_, r)| r.instance).collect();
    assert_eq!(trimmed, vec![ids[0], ids[1]]);
    assert_eq!(system.registry().len(), 1);
    assert!(system.registry().contains(ids[2]));
    assert_eq!(system.pool(pool).unwrap().active_len(), 1);
}

#[test]
fn test_intersection_query() {
    let mut system = DecalSystem::new(config_with_pool(&[4])).unwrap();
    let def = system.create_definition("bullet", ProjectionKind::unlit());
    let pool = impacts(&system);
    let template = ProjectionTemplate::new(def).at(Vec3::new(10.0, 0.0, 0.0));
    system.request(pool, Some(&template)).unwrap();

    assert!(system.check_intersecting(pool, Vec3::new(10.2, 0.0, 0.0), 1.0));
    assert!(!system.check_intersecting(pool, Vec3::ZERO, 1.0));
}

// ============================================================================
// Scene-driven instances and definitions
// ============================================================================

#[test]
fn test_activate_and_deactivate() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let def = system.create_definition("poster", ProjectionKind::unlit());
    let id = system.spawn(&ProjectionTemplate::new(def));
    assert!(!system.registry().contains(id));

    assert!(system.activate(id));
    assert!(system.registry().contains(id));
    assert!(system.deactivate(id));
    assert!(!system.registry().contains(id));
    assert!(!system.instance(id).unwrap().is_active());

    assert!(system.despawn(id).is_some());
    assert!(!system.activate(id));
}

#[test]
fn test_refresh_moves_changed_definition() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let a = system.create_definition("a", ProjectionKind::unlit());
    let b = system.create_definition("b", ProjectionKind::unlit());
    let id = system.spawn(&ProjectionTemplate::new(a));
    system.activate(id);

    system.instance_mut(id).unwrap().definition = Some(b);
    assert!(system.refresh(id));
    assert_eq!(system.registry().group_of(id), Some(b));
    assert!(system.registry().group(a).is_none());
}

#[test]
fn test_remove_definition_orphans_instances() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let def = system.create_definition("poster", ProjectionKind::unlit());
    let id = system.spawn(&ProjectionTemplate::new(def));
    system.activate(id);

    assert_eq!(system.remove_definition(def), vec![id]);
    assert!(system.registry().is_empty());
    assert_eq!(system.instance(id).unwrap().definition, None);
    assert!(system.remove_definition(def).is_empty());
}

#[test]
fn test_draw_items_follow_priority_and_path() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let late = system.create_definition("late", ProjectionKind::unlit());
    let early = system.create_definition("early", ProjectionKind::gloss());
    system
        .definition_mut(early)
        .unwrap()
        .set_path_support(PathSupport::DeferredOnly);

    let a = system.spawn(&ProjectionTemplate::new(late));
    let b = system.spawn(&ProjectionTemplate::new(early));
    system.activate(a);
    system.activate(b);
    assert!(system.set_priority(early, -1));
    assert!(!system.set_priority(early, -1));
    system.begin_frame();

    let deferred: Vec<_> = system
        .draw_items(RenderingPath::Deferred)
        .iter()
        .map(|d| (d.instance, d.order))
        .collect();
    assert_eq!(deferred, vec![(b, 0), (a, 1)]);

    let forward = system.draw_items(RenderingPath::Forward);
    assert_eq!(forward.len(), 1);
    assert_eq!(forward[0].instance, a);
    assert_eq!(forward[0].shader, ProjectionShader::Unlit);

    assert!(system.draw_items(RenderingPath::VertexLit).is_empty());
}

#[test]
fn test_priority_edit_through_definition_reorders_next_frame() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let a = system.create_definition("a", ProjectionKind::unlit());
    let b = system.create_definition("b", ProjectionKind::unlit());
    system.set_priority(b, 10);
    let ia = system.spawn(&ProjectionTemplate::new(a));
    let ib = system.spawn(&ProjectionTemplate::new(b));
    system.activate(ia);
    system.activate(ib);
    system.begin_frame();
    assert!(system.registry().draw_order(ia) < system.registry().draw_order(ib));

    assert!(system.definition_mut(b).unwrap().set_priority(-5));
    system.begin_frame();
    assert_eq!(system.registry().draw_order(ib), Some(0));
    assert_eq!(system.registry().draw_order(ia), Some(1));
}

#[test]
fn test_begin_frame_applies_dirty_definitions() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let def = system.create_definition("poster", ProjectionKind::unlit());
    let update = system.begin_frame();
    assert_eq!(update.definitions_applied, 1);
    assert_eq!(system.frame(), 1);

    system.definition_mut(def).unwrap().set_opacity(0.5);
    system.definition_mut(def).unwrap().set_opacity(0.25);
    assert_eq!(system.begin_frame().definitions_applied, 1);
    assert_eq!(system.begin_frame().definitions_applied, 0);
}

// ============================================================================
// Camera hooks
// ============================================================================

#[test]
fn test_render_camera_publishes() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);

    system.begin_frame();
    assert!(system.render_camera(&mut camera, &mut backend));
    assert!(backend.published.contains_key(&camera.id));
    assert_eq!(system.stats().cameras_rendered, 1);
    assert_eq!(system.stats().reallocations, 1);
    assert_eq!(system.stats().replacement_draws, 1);

    // Second frame reuses the targets
    system.begin_frame();
    assert!(system.render_camera(&mut camera, &mut backend));
    assert_eq!(system.stats().reallocations, 0);
    assert_eq!(backend.allocations.len(), 3);
}

#[test]
fn test_frame_stats_sum_camera_stats() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut mono = TestCamera::new(1);
    let mut stereo = TestCamera::new(2);
    stereo.stereo = StereoMode::SinglePass;

    system.begin_frame();
    system.render_camera(&mut mono, &mut backend);
    system.render_camera(&mut stereo, &mut backend);

    let mono_stats = *system.camera_stats(mono.id).unwrap();
    let stereo_stats = *system.camera_stats(stereo.id).unwrap();
    assert_eq!(mono_stats.replacement_draws, 1);
    assert_eq!(mono_stats.composites, 0);
    assert_eq!(stereo_stats.replacement_draws, 4);
    assert_eq!(stereo_stats.composites, 4);

    let mut expected = mono_stats;
    expected.merge(&stereo_stats);
    expected.reallocations = 2;
    assert_eq!(*system.stats(), expected);
}

#[test]
fn test_minimized_camera_recovers() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    system.begin_frame();
    assert!(system.render_camera(&mut camera, &mut backend));

    camera.size = (0, 0);
    system.begin_frame();
    assert!(!system.render_camera(&mut camera, &mut backend));
    assert!(backend.published.is_empty());

    camera.size = (1280, 720);
    system.begin_frame();
    assert!(system.render_camera(&mut camera, &mut backend));
    assert_eq!(
        system.camera_state(camera.id).unwrap().phase(),
        RenderPhase::Initialized
    );
}

#[test]
fn test_render_without_evaluation_this_frame_skips() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);

    system.begin_frame();
    assert!(!system.before_render(&camera, &mut backend));
    system.before_cull(&mut camera, &mut backend);
    system.begin_frame();
    assert!(!system.before_render(&camera, &mut backend));
    assert_eq!(system.stats().cameras_skipped, 1);
    assert!(backend.commands.is_empty());
}

#[test]
fn test_unsupported_path_unpublishes() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut camera = TestCamera::new(1);
    system.begin_frame();
    system.render_camera(&mut camera, &mut backend);

    camera.path = RenderingPath::LegacyDeferred;
    system.begin_frame();
    assert_eq!(
        system.before_cull(&mut camera, &mut backend),
        Evaluation::UnsupportedPath(RenderingPath::LegacyDeferred)
    );
    assert!(!system.before_render(&camera, &mut backend));
    assert!(backend.published.is_empty());

    // Back on a supported path it renders again
    camera.path = RenderingPath::Forward;
    system.begin_frame();
    assert!(system.render_camera(&mut camera, &mut backend));
}

#[test]
fn test_failed_camera_is_isolated() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut good = TestCamera::new(1);
    let mut bad = TestCamera::new(2);
    backend.fail_camera = Some(CameraId(2));

    system.begin_frame();
    assert_eq!(
        system.before_cull(&mut bad, &mut backend),
        Evaluation::Terminated
    );
    assert!(!system.before_render(&bad, &mut backend));
    assert!(system.render_camera(&mut good, &mut backend));
    assert_eq!(
        system.camera_state(bad.id).unwrap().phase(),
        RenderPhase::Terminated
    );
    assert_eq!(system.stats().cameras_rendered, 1);
    assert_eq!(system.stats().cameras_skipped, 1);

    backend.fail_camera = None;
    system.begin_frame();
    assert!(!system.render_camera(&mut bad, &mut backend));
}

#[test]
fn test_forget_and_shutdown_release_everything() {
    let mut system = DecalSystem::new(ProjectorConfig::default()).unwrap();
    let mut backend = RecordingBackend::new();
    let mut a = TestCamera::new(1);
    let mut b = TestCamera::new(2);
    let mut c = TestCamera::new(3);
    a.capture = DepthCapture::DEPTH;

    system.begin_frame();
    for camera in [&mut a, &mut b, &mut c] {
        system.render_camera(camera, &mut backend);
    }
    assert_eq!(system.camera_count(), 3);

    c.alive = false;
    system.forget_camera(c.id, &mut backend);
    assert!(backend.live_for(c.id).is_empty());
    assert_eq!(system.camera_count(), 2);

    let mut alive: [&mut dyn SceneCamera; 1] = [&mut a];
    system.shutdown(&mut alive, &mut backend);
    assert_eq!(system.camera_count(), 0);
    assert!(backend.live.is_empty());
    assert!(backend.published.is_empty());
    assert_eq!(a.capture, DepthCapture::DEPTH);
    assert!(backend.releases.values().all(|&n| n == 1));
}
