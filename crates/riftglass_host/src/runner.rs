use std::fmt;
use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Vec2, Vec3};
use riftglass_core::host::{IndicatorHost, RenderTargetBinding};
use riftglass_core::placement::PlacementController;
use riftglass_core::portal::PortalDesc;
use riftglass_core::scene::{PortalScene, SceneError};
use riftglass_core::transition::TriggerOutcome;
use riftglass_shared::camera::ViewerCamera;
use riftglass_shared::layers::LayerMask;
use riftglass_shared::pose::Pose;
use tracing::{debug, info, warn};

use crate::config::{look_rotation, SceneConfig};
use crate::physics::{TriggerVolume, TriggerWorld};
use crate::placement::GroundProbe;

#[derive(Debug)]
pub enum RunError {
    Scene(SceneError),
    EmptyScene,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scene(err) => write!(f, "scene setup failed: {err}"),
            Self::EmptyScene => write!(f, "scene defines no portals"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<SceneError> for RunError {
    fn from(err: SceneError) -> Self {
        Self::Scene(err)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub portals: usize,
    pub entered: u64,
    pub exited: u64,
    pub ignored_triggers: u64,
    pub rearmed: u64,
    pub portal_renders: u64,
    pub occupied_portal: Option<String>,
    pub final_culling_mask: LayerMask,
}

pub struct SceneRun {
    pub scene: PortalScene,
    pub triggers: TriggerWorld,
    pub viewer: ViewerCamera,
}

/// Registers, links and places every portal of `config`, then activates them.
pub fn build_scene<B, H>(config: &SceneConfig, binding: &mut B, indicators: &mut H) -> Result<SceneRun, RunError>
where
    B: RenderTargetBinding,
    H: IndicatorHost,
{
    if config.portals.is_empty() {
        return Err(RunError::EmptyScene);
    }

    let mut scene = PortalScene::new(config.settings.clone());
    let mut ids = Vec::with_capacity(config.portals.len());
    for portal in &config.portals {
        let desc = PortalDesc::new(portal.name.clone(), portal.pose()).with_masks(
            LayerMask::from_bits_retain(portal.contents_mask),
            LayerMask::from_bits_retain(portal.default_mask),
        );
        ids.push(scene.add_portal(desc)?);
    }
    for portal in &config.portals {
        if let Some(destination) = &portal.linked_to {
            scene.link_by_name(&portal.name, destination)?;
        }
    }

    let viewer = config.viewer.camera();
    if let Some(rig) = place_rig(config, &viewer) {
        for &id in &ids {
            let Some(local) = scene.portal(id).map(|portal| *portal.pose()) else {
                continue;
            };
            scene.set_portal_pose(id, rig.compose(&local))?;
        }
    }

    scene.activate_all(binding, indicators)?;

    let mut triggers = TriggerWorld::new(scene.trigger_sender());
    for (portal, &id) in config.portals.iter().zip(&ids) {
        let Some(pose) = scene.portal(id).map(|portal| *portal.pose()) else {
            continue;
        };
        triggers.add_volume(TriggerVolume {
            portal: id,
            pose,
            half_extents: portal.trigger_half_extents,
        });
    }

    info!(
        "Scene ready with {} portals, {} frames of viewer path",
        ids.len(),
        config.total_frames()
    );
    Ok(SceneRun {
        scene,
        triggers,
        viewer,
    })
}

fn place_rig(config: &SceneConfig, viewer: &ViewerCamera) -> Option<Pose> {
    if !config.placement.enabled {
        return None;
    }

    let screen_size = Vec2::new(config.placement.screen_width, config.placement.screen_height);
    let mut probe = GroundProbe::new(viewer, screen_size, config.placement.ground_height);
    let mut controller = PlacementController::new();
    controller.update(&mut probe, screen_size);
    let placed = controller.confirm();
    if placed.is_none() {
        warn!("Placement found no ground under the screen centre, keeping authored poses");
    }
    placed
}

type ViewerStep = (Vec3, f32, f32);

fn viewer_path(config: &SceneConfig) -> impl Iterator<Item = ViewerStep> + '_ {
    let start = (
        config.viewer.position,
        config.viewer.yaw_degrees,
        config.viewer.pitch_degrees,
    );
    let from = iter::once(start).chain(
        config
            .path
            .iter()
            .map(|waypoint| (waypoint.position, waypoint.yaw_degrees, waypoint.pitch_degrees)),
    );
    from.zip(&config.path)
        .flat_map(|((position, yaw, pitch), waypoint)| {
            (1..=waypoint.frames).map(move |step| {
                let t = step as f32 / waypoint.frames as f32;
                (
                    position.lerp(waypoint.position, t),
                    yaw + (waypoint.yaw_degrees - yaw) * t,
                    pitch + (waypoint.pitch_degrees - pitch) * t,
                )
            })
        })
}

/// Frames to run: the path capped at `max_frames`, or with an empty path
/// the viewer standing still for `max_frames` frames.
fn frame_steps(config: &SceneConfig, max_frames: Option<u64>) -> Box<dyn Iterator<Item = ViewerStep> + '_> {
    let limit = max_frames.map_or(usize::MAX, |frames| {
        usize::try_from(frames).unwrap_or(usize::MAX)
    });
    if config.path.is_empty() {
        let still = (
            config.viewer.position,
            config.viewer.yaw_degrees,
            config.viewer.pitch_degrees,
        );
        Box::new(iter::repeat(still).take(max_frames.map_or(1, |_| limit)))
    } else {
        Box::new(viewer_path(config).take(limit))
    }
}

/// Walks the viewer along the scene path. Each frame runs the trigger
/// volumes first so their events are delivered to that frame's tick.
pub fn run<B, H>(
    config: &SceneConfig,
    max_frames: Option<u64>,
    binding: &mut B,
    indicators: &mut H,
    running: &AtomicBool,
) -> Result<RunSummary, RunError>
where
    B: RenderTargetBinding,
    H: IndicatorHost,
{
    let SceneRun {
        mut scene,
        mut triggers,
        mut viewer,
    } = build_scene(config, binding, indicators)?;

    let mut summary = RunSummary {
        portals: config.portals.len(),
        ..RunSummary::default()
    };
    for (position, yaw, pitch) in frame_steps(config, max_frames) {
        if !running.load(Ordering::SeqCst) {
            info!("Run interrupted after {} frames", summary.frames);
            break;
        }

        viewer.pose = Pose::new(position, look_rotation(yaw, pitch));
        triggers.step(viewer.position());
        let report = scene.tick(&mut viewer, binding, indicators);

        summary.frames += 1;
        summary.portal_renders += report.rendered.len() as u64;
        summary.rearmed += report.rearmed.len() as u64;
        summary.ignored_triggers += report.unknown_triggers.len() as u64;
        for (_, outcome) in &report.triggers {
            match outcome {
                TriggerOutcome::Entered => summary.entered += 1,
                TriggerOutcome::Exited => summary.exited += 1,
                _ => summary.ignored_triggers += 1,
            }
        }
        if !report.triggers.is_empty() || !report.rearmed.is_empty() {
            debug!(
                "Frame {}: triggers {:?}, rearmed {:?}",
                report.frame, report.triggers, report.rearmed
            );
        }
    }

    let ids: Vec<_> = scene.portals().map(|portal| portal.id()).collect();
    for id in ids {
        scene.deactivate(id, binding)?;
    }

    summary.occupied_portal = scene
        .occupied_portal()
        .and_then(|id| scene.portal(id))
        .map(|portal| portal.name().to_string());
    summary.final_culling_mask = viewer.culling_mask;
    info!(
        "Run finished: {} frames, {} entries, {} exits, {} portal renders",
        summary.frames, summary.entered, summary.exited, summary.portal_renders
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use glam::Vec3;
    use riftglass_core::transition::Indicator;
    use riftglass_shared::layers::LayerMask;

    use super::{build_scene, frame_steps, run, viewer_path, RunError};
    use crate::backend::{IndicatorBoard, RecordingTargets};
    use crate::config::SceneConfig;

    const WALK_THROUGH: &str = r#"
[viewer]
position = [0.0, 1.6, 5.0]
culling_mask = 1

[[portals]]
name = "gallery"
position = [0.0, 1.5, 0.0]
linked_to = "garden"
contents_mask = 256

[[portals]]
name = "garden"
position = [40.0, 1.5, 0.0]
rotation_degrees = [0.0, 180.0, 0.0]
linked_to = "gallery"
contents_mask = 512

[[path]]
position = [0.0, 1.6, -5.0]
frames = 40

[[path]]
position = [0.0, 1.6, 5.0]
frames = 40
"#;

    fn walk_config() -> SceneConfig {
        SceneConfig::from_toml_str(WALK_THROUGH).expect("scene should parse")
    }

    #[test]
    fn path_interpolates_every_waypoint() {
        let config = walk_config();
        let path: Vec<_> = viewer_path(&config).collect();
        assert_eq!(path.len(), 80);
        assert!((path[39].0 - Vec3::new(0.0, 1.6, -5.0)).length() < 1.0e-5);
        assert!((path[79].0 - Vec3::new(0.0, 1.6, 5.0)).length() < 1.0e-5);
    }

    #[test]
    fn standing_still_does_not_build_every_frame_up_front() {
        let mut config = walk_config();
        config.path.clear();

        let mut steps = frame_steps(&config, Some(5_000_000_000));
        assert!(steps.next().is_some());
        assert!(steps.size_hint().0 > 1_000_000);
        assert_eq!(frame_steps(&config, None).count(), 1);
        assert_eq!(frame_steps(&walk_config(), Some(7)).count(), 7);
    }

    #[test]
    fn walking_through_and_back_enters_then_exits() {
        let config = walk_config();
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();
        let running = AtomicBool::new(true);

        let summary = run(&config, None, &mut targets, &mut indicators, &running)
            .expect("run should succeed");

        assert_eq!(summary.frames, 80);
        assert_eq!(summary.entered, 1);
        assert_eq!(summary.exited, 1);
        assert_eq!(summary.occupied_portal, None);
        assert_eq!(summary.final_culling_mask, LayerMask::DEFAULT);
        assert_eq!(summary.portal_renders, 160);
        assert_eq!(targets.total_frames_rendered(), 160);
    }

    #[test]
    fn stopping_halfway_leaves_viewer_inside() {
        let config = walk_config();
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();
        let running = AtomicBool::new(true);

        let summary = run(&config, Some(40), &mut targets, &mut indicators, &running)
            .expect("run should succeed");

        assert_eq!(summary.frames, 40);
        assert_eq!(summary.entered, 1);
        assert_eq!(summary.occupied_portal.as_deref(), Some("gallery"));
        assert_eq!(summary.final_culling_mask, LayerMask::from_bits_retain(256));
        assert_eq!(summary.rearmed, 1);
    }

    #[test]
    fn interrupted_run_does_no_frames() {
        let config = walk_config();
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();
        let running = AtomicBool::new(false);

        let summary = run(&config, None, &mut targets, &mut indicators, &running)
            .expect("run should succeed");
        assert_eq!(summary.frames, 0);
        assert_eq!(targets.live_targets(), 0);
        assert_eq!(targets.released_targets(), 2);
    }

    #[test]
    fn activation_shows_enter_indicators() {
        let config = walk_config();
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();

        let built = build_scene(&config, &mut targets, &mut indicators).expect("scene builds");
        for portal in built.scene.portals() {
            assert!(portal.is_active());
            assert!(indicators.is_visible(portal.id(), Indicator::Enter));
            assert!(!indicators.is_visible(portal.id(), Indicator::Exit));
            assert_eq!(
                targets.content_shader(portal.id()),
                Some(config.settings.content_shader.as_str())
            );
        }
    }

    #[test]
    fn unknown_link_is_reported() {
        let mut config = walk_config();
        config.portals[0].linked_to = Some("attic".to_string());
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();

        let result = build_scene(&config, &mut targets, &mut indicators);
        assert!(matches!(result, Err(RunError::Scene(_))));
    }

    #[test]
    fn empty_scene_is_rejected() {
        let config = SceneConfig::default();
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();

        let result = build_scene(&config, &mut targets, &mut indicators);
        assert!(matches!(result, Err(RunError::EmptyScene)));
    }

    #[test]
    fn placement_moves_portals_onto_ground() {
        let mut config = walk_config();
        config.placement.enabled = true;
        config.viewer.pitch_degrees = -30.0;
        let mut targets = RecordingTargets::new();
        let mut indicators = IndicatorBoard::new();

        let built = build_scene(&config, &mut targets, &mut indicators).expect("scene builds");
        let gallery = built.scene.portal_by_name("gallery").expect("gallery exists");
        // Ground hit is in front of the viewer; authored offset is 1.5 above it.
        assert!((gallery.position().y - 1.5).abs() < 1.0e-3);
        assert!(gallery.position().z < 5.0);
    }
}
