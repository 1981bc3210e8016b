//! Scene geometry: interleaved meshes with a per-draw material bind group.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::handle::HandleStore;
use crate::resources::{create_rgba_texture, SsaoResources};

/// Interleaved vertex: position, uv, colour, normal (locations 0..3).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 12,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 20,
            shader_location: 2,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 32,
            shader_location: 3,
        },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// RGBA8 base colour image supplied with a mesh.
pub struct BaseColorImage<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// GPU mesh with its material bind group (GBuffer group 1).
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub material: wgpu::BindGroup,
    /// Keeps an uploaded base colour texture alive; `None` uses the default white texture.
    pub base_color: Option<wgpu::Texture>,
}

/// Issues the scene draws inside the GBuffer pass.
pub trait SceneDrawer {
    fn draw_scene(&self, pass: &mut wgpu::RenderPass<'_>);
}

/// Draws the UI overlay on top of the composition output.
pub trait UiOverlay {
    fn draw_overlay(&self, pass: &mut wgpu::RenderPass<'_>);
}

#[derive(Default)]
pub struct MeshStore {
    meshes: HandleStore<GpuMesh>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resources: &SsaoResources,
        vertices: &[Vertex],
        indices: &[u32],
        base_color: Option<BaseColorImage<'_>>,
    ) -> u64 {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uploaded = base_color.map(|img| {
            create_rgba_texture(device, queue, "Mesh Base Color", img.pixels, img.width, img.height)
        });
        let view = uploaded
            .as_ref()
            .map(|(_, view)| view)
            .unwrap_or(&resources.default_texture_view);

        let material = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Material BG"),
            layout: &resources.material_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&resources.material_sampler),
                },
            ],
        });

        let handle = self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            material,
            base_color: uploaded.map(|(texture, _)| texture),
        });
        log::info!("Uploaded mesh {handle}: {} vertices, {} indices", vertices.len(), indices.len());
        handle
    }

    pub fn destroy(&mut self, handle: u64) -> bool {
        self.meshes.remove(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl SceneDrawer for MeshStore {
    fn draw_scene(&self, pass: &mut wgpu::RenderPass<'_>) {
        for mesh in self.meshes.values() {
            pass.set_bind_group(1, &mesh.material, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

/// Split flat C arrays into interleaved vertices. Missing colours default to white.
pub fn interleave(positions: &[f32], uvs: &[f32], colors: Option<&[f32]>, normals: &[f32]) -> Vec<Vertex> {
    let count = positions.len() / 3;
    (0..count)
        .map(|i| Vertex {
            position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
            uv: [uvs[i * 2], uvs[i * 2 + 1]],
            color: colors
                .map(|c| [c[i * 3], c[i * 3 + 1], c[i * 3 + 2]])
                .unwrap_or([1.0, 1.0, 1.0]),
            normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_shader_locations() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 44);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
        let end = layout.attributes.last().map(|a| a.offset + a.format.size()).unwrap();
        assert_eq!(end, 44);
    }

    #[test]
    fn test_interleave() {
        let positions = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let uvs = [0.5, 0.25, 1.0, 0.0];
        let normals = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let vertices = interleave(&positions, &uvs, None, &normals);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].position, [3.0, 4.0, 5.0]);
        assert_eq!(vertices[1].uv, [1.0, 0.0]);
        assert_eq!(vertices[0].color, [1.0, 1.0, 1.0]);
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0]);

        let colors = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let vertices = interleave(&positions, &uvs, Some(&colors), &normals);
        assert_eq!(vertices[1].color, [0.4, 0.5, 0.6]);
    }
}
