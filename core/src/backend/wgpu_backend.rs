//! `wgpu` implementation of [`GpuBackend`]
//!
//! Targets are real textures owned here and addressed by [`TargetHandle`].
//! Replacement draws and composites are queued in submission order; the host
//! renderer drains them with [`WgpuBackend::take_commands`], renders each draw
//! with its own scene pipeline, and calls [`WgpuBackend::encode_composite`]
//! for composites so they land between the eye draws.

use decalforge_shared::CameraId;
use hashbrown::HashMap;

use super::{
    BackendError, Composite, GpuBackend, ReplacementCommand, ReplacementDraw, ShadingInputs,
    TargetDesc, TargetHandle, TargetKind,
};

/// Texture behind a target handle
struct TargetEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: TargetDesc,
}

/// Texture views of one camera's published buffers, ready for binding
pub struct ShadingBindings<'a> {
    pub inputs: ShadingInputs,
    pub depth: Option<&'a wgpu::TextureView>,
    pub normal: Option<&'a wgpu::TextureView>,
    pub mask: Option<&'a wgpu::TextureView>,
    pub packed: Option<&'a wgpu::TextureView>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    targets: HashMap<TargetHandle, TargetEntry>,
    next_handle: u32,
    commands: Vec<ReplacementCommand>,
    published: HashMap<CameraId, ShadingInputs>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            targets: HashMap::new(),
            next_handle: 1, // 0 is never handed out
            commands: Vec::new(),
            published: HashMap::new(),
        }
    }

    /// Number of live targets
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn texture(&self, handle: TargetHandle) -> Option<&wgpu::Texture> {
        self.targets.get(&handle).map(|e| &e.texture)
    }

    pub fn view(&self, handle: TargetHandle) -> Option<&wgpu::TextureView> {
        self.targets.get(&handle).map(|e| &e.view)
    }

    pub fn desc(&self, handle: TargetHandle) -> Option<&TargetDesc> {
        self.targets.get(&handle).map(|e| &e.desc)
    }

    /// Drain queued replacement work in submission order.
    pub fn take_commands(&mut self) -> Vec<ReplacementCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Record a composite as a texture-to-texture copy.
    pub fn encode_composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        composite: &Composite,
    ) -> Result<(), BackendError> {
        let source = self
            .texture(composite.source)
            .ok_or(BackendError::UnknownTarget(composite.source))?;
        let destination = self
            .texture(composite.destination)
            .ok_or(BackendError::UnknownTarget(composite.destination))?;

        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: destination,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: composite.x,
                    y: 0,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: composite.width,
                height: composite.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    pub fn shading_inputs(&self, camera: CameraId) -> Option<&ShadingInputs> {
        self.published.get(&camera)
    }

    /// Views for everything published for `camera`
    pub fn bindings(&self, camera: CameraId) -> Option<ShadingBindings<'_>> {
        let inputs = *self.published.get(&camera)?;
        let view = |kind| inputs.target(kind).and_then(|h| self.view(h));
        Some(ShadingBindings {
            inputs,
            depth: view(TargetKind::Depth),
            normal: view(TargetKind::Normal),
            mask: view(TargetKind::Mask),
            packed: view(TargetKind::Packed),
        })
    }

    /// Write a camera's shading globals into a uniform buffer.
    ///
    /// Returns false if nothing is published for the camera.
    pub fn upload_globals(
        &self,
        queue: &wgpu::Queue,
        camera: CameraId,
        buffer: &wgpu::Buffer,
    ) -> bool {
        let Some(inputs) = self.published.get(&camera) else {
            return false;
        };
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(&inputs.globals()));
        true
    }

    fn check_live(&self, handle: TargetHandle) -> Result<(), BackendError> {
        if self.targets.contains_key(&handle) {
            Ok(())
        } else {
            Err(BackendError::UnknownTarget(handle))
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn allocate_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, BackendError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::InvalidSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(BackendError::TooLarge {
                width: desc.width,
                height: desc.height,
                max,
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.kind.label()),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format().to_wgpu(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let handle = TargetHandle(self.next_handle);
        self.next_handle += 1;
        self.targets.insert(
            handle,
            TargetEntry {
                texture,
                view,
                desc: *desc,
            },
        );
        tracing::trace!(
            ?handle,
            kind = ?desc.kind,
            width = desc.width,
            height = desc.height,
            "target allocated"
        );
        Ok(handle)
    }

    fn release_target(&mut self, handle: TargetHandle) {
        if let Some(entry) = self.targets.remove(&handle) {
            entry.texture.destroy();
        }
    }

    fn draw_replacement(&mut self, draw: ReplacementDraw) -> Result<(), BackendError> {
        for &handle in &draw.targets {
            self.check_live(handle)?;
        }
        self.commands.push(ReplacementCommand::Draw(draw));
        Ok(())
    }

    fn composite(&mut self, composite: Composite) -> Result<(), BackendError> {
        self.check_live(composite.source)?;
        self.check_live(composite.destination)?;
        self.commands.push(ReplacementCommand::Composite(composite));
        Ok(())
    }

    fn publish(&mut self, camera: CameraId, inputs: &ShadingInputs) {
        self.published.insert(camera, *inputs);
    }

    fn unpublish(&mut self, camera: CameraId) {
        self.published.remove(&camera);
    }
}
