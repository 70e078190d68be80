//! Triangle meshes for placement, auto-snap rotation and bounding boxes
//!
//! Only geometry is kept. Assets are glTF/GLB; glTF is Y-up and the scene is Z-up, so
//! vertices are converted on import as `(x, y, z) -> (x, -z, y)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nalgebra::{Matrix3, Point3, Unit, Vector3};

use crate::config::InputConfig;
use crate::error::MeshError;
use crate::rules::{RuleStore, ShapeKind};

const RAY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        let count = vertices.len();
        for (face, indices) in faces.iter().enumerate() {
            if let Some(&vertex) = indices.iter().find(|&&v| v >= count) {
                return Err(MeshError::BadIndex { face, vertex, count });
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Axis-aligned cube of side 1 centred on the origin.
    pub fn unit_cube() -> Self {
        let h = 0.5;
        let vertices = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        // counter-clockwise seen from outside
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [1, 2, 6],
            [1, 6, 5],
            [0, 4, 7],
            [0, 7, 3],
        ];
        Self { vertices, faces }
    }

    /// Merges every primitive of every mesh in a glTF/GLB file.
    pub fn load_gltf(path: &Path) -> Result<Self, MeshError> {
        let (document, buffers, _images) =
            gltf::import(path).map_err(|source| MeshError::Gltf { path: path.to_path_buf(), source })?;

        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    continue;
                }
                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
                let Some(positions) = reader.read_positions() else {
                    continue;
                };

                let base = vertices.len();
                vertices.extend(positions.map(|[x, y, z]| Point3::new(x as f64, -(z as f64), y as f64)));
                let added = vertices.len() - base;

                match reader.read_indices() {
                    Some(indices) => {
                        let indices: Vec<usize> = indices.into_u32().map(|i| base + i as usize).collect();
                        faces.extend(indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]));
                    }
                    None => {
                        faces.extend((0..added / 3).map(|t| [base + t * 3, base + t * 3 + 1, base + t * 3 + 2]));
                    }
                }
            }
        }

        if faces.is_empty() {
            return Err(MeshError::Empty(path.to_path_buf()));
        }
        Self::new(vertices, faces)
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    fn triangle(&self, face: usize) -> Option<[Point3<f64>; 3]> {
        let [a, b, c] = *self.faces.get(face)?;
        Some([self.vertices[a], self.vertices[b], self.vertices[c]])
    }

    /// Outward unit normal; `None` for a missing or degenerate face.
    pub fn face_normal(&self, face: usize) -> Option<Unit<Vector3<f64>>> {
        let [a, b, c] = self.triangle(face)?;
        Unit::try_new((b - a).cross(&(c - a)), RAY_EPSILON)
    }

    /// Mesh with `linear` applied to every vertex.
    pub fn transformed(&self, linear: &Matrix3<f64>) -> Mesh {
        let vertices = self.vertices.iter().map(|v| Point3::from(linear * v.coords)).collect();
        Mesh { vertices, faces: self.faces.clone() }
    }

    /// Nearest hit distance along `direction` (Möller–Trumbore), ignoring hits behind
    /// the origin.
    pub fn raycast(&self, origin: &Point3<f64>, direction: &Unit<Vector3<f64>>) -> Option<f64> {
        let mut nearest: Option<f64> = None;
        for face in 0..self.faces.len() {
            let Some([a, b, c]) = self.triangle(face) else { continue };
            let edge1 = b - a;
            let edge2 = c - a;
            let p = direction.cross(&edge2);
            let det = edge1.dot(&p);
            if det.abs() < RAY_EPSILON {
                continue;
            }
            let inv = 1.0 / det;
            let s = origin - a;
            let u = s.dot(&p) * inv;
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let q = s.cross(&edge1);
            let v = direction.dot(&q) * inv;
            if v < 0.0 || u + v > 1.0 {
                continue;
            }
            let t = edge2.dot(&q) * inv;
            if t > RAY_EPSILON && nearest.map_or(true, |n| t < n) {
                nearest = Some(t);
            }
        }
        nearest
    }

    /// Distance from the local origin straight down (-Z) to the surface.
    pub fn raycast_down(&self) -> Option<f64> {
        self.raycast(&Point3::origin(), &down())
    }
}

/// Scene -Z.
pub fn down() -> Unit<Vector3<f64>> {
    Unit::new_unchecked(Vector3::new(0.0, 0.0, -1.0))
}

/// Meshes keyed by shape kind and rule name.
#[derive(Debug, Clone, Default)]
pub struct MeshLibrary {
    meshes: HashMap<(ShapeKind, String), Arc<Mesh>>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ShapeKind, name: impl Into<String>, mesh: Arc<Mesh>) {
        self.meshes.insert((kind, name.into()), mesh);
    }

    pub fn get(&self, kind: ShapeKind, name: &str) -> Result<Arc<Mesh>, MeshError> {
        self.meshes
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| MeshError::NotLoaded { kind: kind.to_string(), name: name.to_string() })
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Same mesh for every shape rule.
    pub fn uniform(rules: &RuleStore, mesh: Mesh) -> Self {
        let mesh = Arc::new(mesh);
        let mut library = Self::new();
        for kind in [ShapeKind::Object, ShapeKind::Decoy] {
            for shape in rules.shapes(kind) {
                library.insert(kind, shape.name.clone(), Arc::clone(&mesh));
            }
        }
        library
    }

    /// Loads `<objects_dir>/<file>` and `<decoys_dir>/<file>` for every shape rule.
    pub fn load_gltf(rules: &RuleStore, input: &InputConfig) -> Result<Self, MeshError> {
        let mut library = Self::new();
        for (kind, dir) in [(ShapeKind::Object, &input.objects_dir), (ShapeKind::Decoy, &input.decoys_dir)] {
            for shape in rules.shapes(kind) {
                let path: PathBuf = dir.join(&shape.file);
                let mesh = Mesh::load_gltf(&path)?;
                tracing::debug!(
                    "Loaded {} mesh {} ({} vertices, {} faces)",
                    kind,
                    path.display(),
                    mesh.vertices().len(),
                    mesh.faces().len()
                );
                library.insert(kind, shape.name.clone(), Arc::new(mesh));
            }
        }
        tracing::info!("Loaded {} meshes", library.len());
        Ok(library)
    }
}
