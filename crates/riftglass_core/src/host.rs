//! Contracts the host engine provides to the portal core.

use riftglass_shared::camera::RenderCamera;
use riftglass_shared::settings::PortalSettings;

use crate::portal::PortalId;
use crate::transition::Indicator;

/// Opaque handle to an offscreen color+depth image owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub depth_bits: u32,
}

impl RenderTargetDesc {
    pub fn from_settings(settings: &PortalSettings) -> Self {
        Self {
            width: settings.target_width,
            height: settings.target_height,
            depth_bits: settings.depth_bits,
        }
    }
}

pub trait RenderTargetBinding {
    fn allocate_target(&mut self, portal: PortalId, desc: &RenderTargetDesc) -> TargetHandle;

    /// Switches every renderer under the portal's contents root to `shader`.
    fn assign_content_shader(&mut self, portal: PortalId, shader: &str);

    fn render(&mut self, portal: PortalId, target: TargetHandle, camera: &RenderCamera);

    /// Binds `target` as the texture of the portal surface's material slot.
    fn bind_surface_texture(&mut self, portal: PortalId, target: TargetHandle, material_slot: usize);

    fn release_target(&mut self, portal: PortalId, target: TargetHandle);
}

pub trait IndicatorHost {
    fn set_indicator_visible(&mut self, portal: PortalId, indicator: Indicator, visible: bool);
}
