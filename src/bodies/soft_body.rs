use crate::bodies::RigidBody;
use crate::core::{BodyHandle, HandleStorage};
use crate::math::{Vector3, Transform, Aabb};
use crate::protocol::SoftParameters;

use std::collections::HashSet;

/// The topology a soft body was built from; decides its report layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftBodyKind {
    /// A chain of nodes
    Rope,

    /// A grid patch
    Cloth,

    /// A closed or open triangle mesh
    Trimesh,
}

/// A simulated point of a soft body
#[derive(Debug, Clone, Copy)]
pub struct SoftNode {
    /// World position
    pub position: Vector3,

    /// World velocity
    pub velocity: Vector3,

    /// Area-weighted normal, unit length for faced bodies
    pub normal: Vector3,

    /// Inverse mass; zero pins the node
    pub inv_mass: f32,
}

/// A distance constraint between two nodes
#[derive(Debug, Clone, Copy)]
pub struct SoftLink {
    /// First node
    pub a: usize,

    /// Second node
    pub b: usize,

    /// Length the link relaxes to
    pub rest_length: f32,
}

/// A node pinned to a rigid body
#[derive(Debug, Clone, Copy)]
pub struct SoftAnchor {
    /// Anchored node
    pub node: usize,

    /// Rigid body the node follows
    pub body: BodyHandle,

    /// Node position in the body's frame
    pub local: Vector3,

    /// How strongly the node follows the body, `[0, 1]`
    pub influence: f32,

    /// Whether the node still collides with `body`
    pub collide_with_body: bool,
}

/// A position-based soft body
#[derive(Debug, Clone)]
pub struct SoftBody {
    kind: SoftBodyKind,
    nodes: Vec<SoftNode>,
    links: Vec<SoftLink>,
    faces: Vec<[usize; 3]>,
    anchors: Vec<SoftAnchor>,
    parameters: SoftParameters,
    total_mass: f32,
    collision_group: u32,
    collision_mask: u32,
}

impl SoftBody {
    fn with_topology(kind: SoftBodyKind, positions: Vec<Vector3>, faces: Vec<[usize; 3]>, links: Vec<(usize, usize)>, mass: f32, parameters: SoftParameters) -> Self {
        let inv_mass = if mass > 0.0 && !positions.is_empty() {
            positions.len() as f32 / mass
        } else {
            0.0
        };
        let nodes: Vec<SoftNode> = positions
            .into_iter()
            .map(|position| SoftNode {
                position,
                velocity: Vector3::zero(),
                normal: Vector3::zero(),
                inv_mass,
            })
            .collect();
        let links = links
            .into_iter()
            .map(|(a, b)| SoftLink {
                a,
                b,
                rest_length: nodes[a].position.distance(&nodes[b].position),
            })
            .collect();
        let mut body = Self {
            kind,
            nodes,
            links,
            faces,
            anchors: Vec::new(),
            parameters,
            total_mass: mass.max(0.0),
            collision_group: 1,
            collision_mask: u32::MAX,
        };
        body.update_normals();
        body
    }

    /// A rope of `segments + 1` nodes from `start` to `end`
    pub fn rope(start: Vector3, end: Vector3, segments: u32, mass: f32, parameters: SoftParameters) -> Option<Self> {
        if segments == 0 {
            return None;
        }
        let count = segments as usize;
        let positions = (0..=count)
            .map(|i| start.lerp(&end, i as f32 / count as f32))
            .collect();
        let links = (0..count).map(|i| (i, i + 1)).collect();
        Some(Self::with_topology(SoftBodyKind::Rope, positions, Vec::new(), links, mass, parameters))
    }

    /// A cloth grid of `(segments_x + 1) * (segments_z + 1)` nodes spanning
    /// `corners` given as `[c00, c10, c01, c11]`
    pub fn cloth(corners: [Vector3; 4], segments_x: u32, segments_z: u32, mass: f32, parameters: SoftParameters) -> Option<Self> {
        if segments_x == 0 || segments_z == 0 {
            return None;
        }
        let (sx, sz) = (segments_x as usize, segments_z as usize);
        let columns = sx + 1;
        let index = |x: usize, z: usize| z * columns + x;

        let mut positions = Vec::with_capacity(columns * (sz + 1));
        for z in 0..=sz {
            let tz = z as f32 / sz as f32;
            let left = corners[0].lerp(&corners[2], tz);
            let right = corners[1].lerp(&corners[3], tz);
            for x in 0..=sx {
                positions.push(left.lerp(&right, x as f32 / sx as f32));
            }
        }

        let mut links = Vec::new();
        let mut faces = Vec::with_capacity(sx * sz * 2);
        for z in 0..=sz {
            for x in 0..=sx {
                if x < sx {
                    links.push((index(x, z), index(x + 1, z)));
                }
                if z < sz {
                    links.push((index(x, z), index(x, z + 1)));
                }
                if x < sx && z < sz {
                    links.push((index(x, z), index(x + 1, z + 1)));
                    faces.push([index(x, z), index(x, z + 1), index(x + 1, z + 1)]);
                    faces.push([index(x, z), index(x + 1, z + 1), index(x + 1, z)]);
                }
            }
        }
        Some(Self::with_topology(SoftBodyKind::Cloth, positions, faces, links, mass, parameters))
    }

    /// A soft body from a triangle mesh; returns `None` for bad indices
    pub fn trimesh(vertices: Vec<Vector3>, indices: &[[u32; 3]], mass: f32, parameters: SoftParameters) -> Option<Self> {
        if indices.is_empty() || indices.iter().flatten().any(|&i| i as usize >= vertices.len()) {
            return None;
        }
        let faces: Vec<[usize; 3]> = indices
            .iter()
            .map(|f| [f[0] as usize, f[1] as usize, f[2] as usize])
            .collect();
        let mut edges = HashSet::new();
        for face in &faces {
            for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
                if a != b {
                    edges.insert((a.min(b), a.max(b)));
                }
            }
        }
        let mut links: Vec<(usize, usize)> = edges.into_iter().collect();
        links.sort_unstable();
        Some(Self::with_topology(SoftBodyKind::Trimesh, vertices, faces, links, mass, parameters))
    }

    /// Returns the body's topology kind
    pub fn get_kind(&self) -> SoftBodyKind {
        self.kind
    }

    /// Returns the nodes
    pub fn get_nodes(&self) -> &[SoftNode] {
        &self.nodes
    }

    /// Returns the links
    pub fn get_links(&self) -> &[SoftLink] {
        &self.links
    }

    /// Returns the faces as node triples
    pub fn get_faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Returns the anchors
    pub fn get_anchors(&self) -> &[SoftAnchor] {
        &self.anchors
    }

    /// Returns the total mass
    pub fn get_total_mass(&self) -> f32 {
        self.total_mass
    }

    /// Returns the tuning parameters
    pub fn get_parameters(&self) -> &SoftParameters {
        &self.parameters
    }

    /// Sets the collision group and mask
    pub fn set_collision_filter(&mut self, group: u32, mask: u32) {
        self.collision_group = group;
        self.collision_mask = mask;
    }

    /// World bounds of all nodes
    pub fn get_bounds(&self) -> Option<Aabb> {
        let points: Vec<Vector3> = self.nodes.iter().map(|n| n.position).collect();
        Aabb::from_points(&points).map(|b| b.expand(self.parameters.margin))
    }

    /// Moves every node by `transform`
    pub fn apply_transform(&mut self, transform: &Transform) {
        for node in &mut self.nodes {
            node.position = transform.transform_point(node.position);
            node.velocity = transform.transform_direction(node.velocity);
        }
        self.update_normals();
    }

    /// Pins `node` to a rigid body at its current position
    pub fn append_anchor(&mut self, node: usize, handle: BodyHandle, body: &RigidBody, influence: f32, collide_with_body: bool) -> bool {
        let Some(n) = self.nodes.get(node) else {
            return false;
        };
        let local = body.get_transform().inverse_transform_point(n.position);
        self.anchors.push(SoftAnchor {
            node,
            body: handle,
            local,
            influence: influence.clamp(0.0, 1.0),
            collide_with_body,
        });
        true
    }

    /// Drops anchors attached to a removed rigid body
    pub fn remove_anchors_to(&mut self, handle: BodyHandle) {
        self.anchors.retain(|a| a.body != handle);
    }

    /// Whether any node is anchored to `handle`
    pub fn is_anchored_to(&self, handle: BodyHandle) -> bool {
        self.anchors.iter().any(|a| a.body == handle)
    }

    /// Number of report elements: nodes for ropes and cloth, faces for meshes
    pub fn element_count(&self) -> usize {
        match self.kind {
            SoftBodyKind::Rope | SoftBodyKind::Cloth => self.nodes.len(),
            SoftBodyKind::Trimesh => self.faces.len(),
        }
    }

    /// Advances the body one fixed step
    pub fn step(&mut self, dt: f32, gravity: Vector3, bodies: &HandleStorage<BodyHandle, RigidBody>) {
        if dt <= 0.0 {
            return;
        }
        let damping = 1.0 - self.parameters.damping.clamp(0.0, 1.0);
        let previous: Vec<Vector3> = self.nodes.iter().map(|n| n.position).collect();

        for node in &mut self.nodes {
            if node.inv_mass > 0.0 {
                node.velocity = (node.velocity + gravity * dt) * damping;
                node.position += node.velocity * dt;
            }
        }

        let stiffness = self.parameters.stiffness.clamp(0.0, 1.0);
        for _ in 0..self.parameters.iterations.max(1) {
            for link in &self.links {
                let (a, b) = (self.nodes[link.a], self.nodes[link.b]);
                let w = a.inv_mass + b.inv_mass;
                if w <= 0.0 {
                    continue;
                }
                let delta = b.position - a.position;
                let length = delta.length();
                if length < crate::math::EPSILON {
                    continue;
                }
                let correction = delta * ((length - link.rest_length) / (length * w) * stiffness);
                self.nodes[link.a].position += correction * a.inv_mass;
                self.nodes[link.b].position -= correction * b.inv_mass;
            }
            self.solve_anchors(bodies);
        }

        self.solve_collisions(bodies);

        for (node, old) in self.nodes.iter_mut().zip(previous) {
            if node.inv_mass > 0.0 {
                node.velocity = (node.position - old) / dt;
            }
        }
        self.update_normals();
    }

    fn solve_anchors(&mut self, bodies: &HandleStorage<BodyHandle, RigidBody>) {
        for anchor in &self.anchors {
            let Some(body) = bodies.get(anchor.body) else {
                continue;
            };
            let target = body.get_transform().transform_point(anchor.local);
            let node = &mut self.nodes[anchor.node];
            node.position = node.position.lerp(&target, anchor.influence);
        }
    }

    fn solve_collisions(&mut self, bodies: &HandleStorage<BodyHandle, RigidBody>) {
        let Some(bounds) = self.get_bounds() else {
            return;
        };
        let margin = self.parameters.margin;
        for (handle, body) in bodies.iter() {
            if body.get_collision_group() & self.collision_mask == 0 || self.collision_group & body.get_collision_mask() == 0 {
                continue;
            }
            if !body.get_world_bounds().intersects(&bounds) {
                continue;
            }
            let transform = body.get_transform();
            for (index, node) in self.nodes.iter_mut().enumerate() {
                if node.inv_mass <= 0.0 {
                    continue;
                }
                let linked = self
                    .anchors
                    .iter()
                    .any(|a| a.node == index && a.body == handle && !a.collide_with_body);
                if linked {
                    continue;
                }
                let local = transform.inverse_transform_point(node.position);
                if let Some((surface, normal)) = body.get_shape().project_point(local) {
                    let world_normal = transform.transform_direction(normal);
                    node.position = transform.transform_point(surface) + world_normal * margin;
                }
            }
        }
    }

    fn update_normals(&mut self) {
        if self.faces.is_empty() {
            return;
        }
        for node in &mut self.nodes {
            node.normal = Vector3::zero();
        }
        for face in &self.faces {
            let (a, b, c) = (self.nodes[face[0]].position, self.nodes[face[1]].position, self.nodes[face[2]].position);
            let normal = (b - a).cross(&(c - a));
            for &i in face {
                self.nodes[i].normal += normal;
            }
        }
        for node in &mut self.nodes {
            node.normal = node.normal.normalize();
        }
    }
}
