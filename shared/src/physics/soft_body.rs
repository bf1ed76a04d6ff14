//! Pressurised mass-link soft body.
//!
//! Nodes carry position, velocity and inverse mass; links are distance constraints
//! solved position-based. Each sub-step:
//!
//! 1. forces: gravity plus internal pressure on every face, then damping
//! 2. predict positions and project links `position_iterations` times
//! 3. collide against rigid colliders (and, in the world, other soft bodies)
//! 4. derive velocities, relax them along links `velocity_iterations` times
//! 5. refresh normals, bounds and the sleep timer
//!
//! Node `i` is vertex `i` of the [`IndexedMesh`] the body was built from. Render sync
//! depends on that identity.

use nalgebra::{Point3, Vector3};
use rapier3d::parry::bounding_volume::{Aabb, BoundingVolume};
use rapier3d::prelude::{ColliderSet, RigidBodyHandle, RigidBodySet};
use rustc_hash::FxHashMap;

use crate::bitmask_flags::{CollisionFlag, CollisionFlags};
use crate::constants::{COLLISION_MARGIN, SLEEP_SPEED_THRESHOLD, TIME_TO_SLEEP};
use crate::geometry::IndexedMesh;

const LENGTH_EPS: f32 = 1.0e-9;

/// World-space state of one simulation node, as read by render sync.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftNode {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationState {
    Active,
    Sleeping,
    /// Never sleeps, regardless of kinetic energy.
    DisableDeactivation,
}

/// Solver settings.
#[derive(Clone, Debug)]
pub struct SoftBodyConfig {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub collisions: CollisionFlags,
    /// kDF
    pub friction: f32,
    /// kDP
    pub damping: f32,
    /// kPR
    pub pressure: f32,
}

impl Default for SoftBodyConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 0,
            position_iterations: 1,
            collisions: CollisionFlags::from_flags(&[CollisionFlag::SoftRigid]),
            friction: 0.2,
            damping: 0.0,
            pressure: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SoftMaterial {
    /// kLST, applied to edge links.
    pub linear_stiffness: f32,
    /// kAST, applied to bending links.
    pub angular_stiffness: f32,
}

impl Default for SoftMaterial {
    fn default() -> Self {
        Self {
            linear_stiffness: 1.0,
            angular_stiffness: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkKind {
    /// A triangle edge.
    Edge,
    /// Between the opposite corners of two triangles sharing an edge.
    Bending,
}

#[derive(Clone, Copy, Debug)]
struct Link {
    a: u32,
    b: u32,
    rest: f32,
    kind: LinkKind,
}

/// Reaction of a soft body on a dynamic rigid body.
#[derive(Clone, Copy, Debug)]
pub struct ContactImpulse {
    pub body: RigidBodyHandle,
    pub impulse: Vector3<f32>,
    pub point: Point3<f32>,
}

#[derive(Clone, Debug)]
pub struct SoftBody {
    nodes: Vec<SoftNode>,
    velocities: Vec<Vector3<f32>>,
    previous: Vec<Point3<f32>>,
    forces: Vec<Vector3<f32>>,
    inv_masses: Vec<f32>,
    faces: Vec<[u32; 3]>,
    links: Vec<Link>,
    config: SoftBodyConfig,
    material: SoftMaterial,
    margin: f32,
    activation: ActivationState,
    sleep_timer: f32,
    aabb: Aabb,
}

impl SoftBody {
    /// Build a body with one unit-mass node per mesh vertex.
    ///
    /// Edge links come from the triangle edges, bending links from each pair of
    /// triangles sharing an edge.
    pub fn from_tri_mesh(mesh: &IndexedMesh) -> Self {
        let positions = mesh.vertices();
        let n = positions.len();

        // Edge (low, high) -> opposite corners of the triangles using it.
        let mut edges: FxHashMap<(u32, u32), Vec<u32>> = FxHashMap::default();
        for &[a, b, c] in mesh.triangles() {
            for (p, q, opposite) in [(a, b, c), (b, c, a), (c, a, b)] {
                if p != q {
                    edges.entry((p.min(q), p.max(q))).or_default().push(opposite);
                }
            }
        }

        let mut edge_keys: Vec<(u32, u32)> = edges.keys().copied().collect();
        edge_keys.sort_unstable();

        let rest = |a: u32, b: u32| (positions[b as usize] - positions[a as usize]).norm();
        let mut links: Vec<Link> = edge_keys
            .iter()
            .map(|&(a, b)| Link {
                a,
                b,
                rest: rest(a, b),
                kind: LinkKind::Edge,
            })
            .collect();

        let mut bending: Vec<(u32, u32)> = edge_keys
            .iter()
            .filter_map(|key| match edges[key].as_slice() {
                &[o1, o2] if o1 != o2 => Some((o1.min(o2), o1.max(o2))),
                _ => None,
            })
            .filter(|key| !edges.contains_key(key))
            .collect();
        bending.sort_unstable();
        bending.dedup();
        links.extend(bending.into_iter().map(|(a, b)| Link {
            a,
            b,
            rest: rest(a, b),
            kind: LinkKind::Bending,
        }));

        let mut body = Self {
            nodes: positions
                .iter()
                .map(|&position| SoftNode {
                    position,
                    normal: Vector3::zeros(),
                })
                .collect(),
            velocities: vec![Vector3::zeros(); n],
            previous: positions.to_vec(),
            forces: vec![Vector3::zeros(); n],
            inv_masses: vec![1.0; n],
            faces: mesh.triangles().to_vec(),
            links,
            config: SoftBodyConfig::default(),
            material: SoftMaterial::default(),
            margin: COLLISION_MARGIN,
            activation: ActivationState::Active,
            sleep_timer: 0.0,
            aabb: Aabb::new_invalid(),
        };
        body.update_normals();
        body.update_bounds();
        body
    }

    pub fn nodes(&self) -> &[SoftNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn bending_link_count(&self) -> usize {
        self.links
            .iter()
            .filter(|l| l.kind == LinkKind::Bending)
            .count()
    }

    pub fn config(&self) -> &SoftBodyConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SoftBodyConfig {
        &mut self.config
    }

    pub fn material(&self) -> &SoftMaterial {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut SoftMaterial {
        &mut self.material
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn set_margin(&mut self, margin: f32) {
        self.margin = margin.max(0.0);
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    pub fn set_activation_state(&mut self, state: ActivationState) {
        self.activation = state;
        self.sleep_timer = 0.0;
    }

    pub fn is_sleeping(&self) -> bool {
        self.activation == ActivationState::Sleeping
    }

    pub fn wake_up(&mut self) {
        if self.activation == ActivationState::Sleeping {
            self.activation = ActivationState::Active;
            self.sleep_timer = 0.0;
        }
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Spread `mass` evenly over all nodes. Zero mass pins every node in place.
    pub fn set_total_mass(&mut self, mass: f32) {
        let n = self.nodes.len().max(1) as f32;
        let per_node = mass.max(0.0) / n;
        let inv = if per_node > 0.0 { 1.0 / per_node } else { 0.0 };
        self.inv_masses.iter_mut().for_each(|im| *im = inv);
    }

    pub fn total_mass(&self) -> f32 {
        self.inv_masses
            .iter()
            .filter(|im| **im > 0.0)
            .map(|im| 1.0 / im)
            .sum()
    }

    /// Signed enclosed volume; positive for outward-wound closed meshes.
    pub fn volume(&self) -> f32 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (self.pos(a), self.pos(b), self.pos(c));
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    pub fn max_speed(&self) -> f32 {
        self.velocities
            .iter()
            .map(|v| v.norm())
            .fold(0.0, f32::max)
    }

    #[inline]
    fn pos(&self, i: u32) -> Point3<f32> {
        self.nodes[i as usize].position
    }

    /// Forces, damping, prediction and link projection.
    pub(crate) fn predict(&mut self, h: f32, gravity: &Vector3<f32>) {
        if self.is_sleeping() {
            return;
        }

        self.forces.iter_mut().for_each(|f| *f = Vector3::zeros());
        self.apply_pressure();

        let damping = 1.0 - self.config.damping.clamp(0.0, 1.0);
        for i in 0..self.nodes.len() {
            let x = self.nodes[i].position;
            self.previous[i] = x;
            let im = self.inv_masses[i];
            if im <= 0.0 {
                self.velocities[i] = Vector3::zeros();
                continue;
            }
            let v = (self.velocities[i] + (gravity + self.forces[i] * im) * h) * damping;
            self.velocities[i] = v;
            self.nodes[i].position = x + v * h;
        }

        for _ in 0..self.config.position_iterations {
            self.solve_links();
        }
    }

    fn apply_pressure(&mut self) {
        if self.config.pressure == 0.0 {
            return;
        }
        let volume = self.volume().abs();
        if volume <= LENGTH_EPS {
            return;
        }
        let scale = self.config.pressure / volume;
        for fi in 0..self.faces.len() {
            let [a, b, c] = self.faces[fi];
            let (pa, pb, pc) = (self.pos(a), self.pos(b), self.pos(c));
            // Area-weighted outward normal, a third to each corner.
            let f = (pb - pa).cross(&(pc - pa)) * (scale / 6.0);
            for i in [a, b, c] {
                if self.inv_masses[i as usize] > 0.0 {
                    self.forces[i as usize] += f;
                }
            }
        }
    }

    fn link_stiffness(&self, kind: LinkKind) -> f32 {
        match kind {
            LinkKind::Edge => self.material.linear_stiffness,
            LinkKind::Bending => self.material.angular_stiffness,
        }
        .clamp(0.0, 1.0)
    }

    fn solve_links(&mut self) {
        for li in 0..self.links.len() {
            let link = self.links[li];
            let k = self.link_stiffness(link.kind);
            let (a, b) = (link.a as usize, link.b as usize);
            let (wa, wb) = (self.inv_masses[a], self.inv_masses[b]);
            let w = wa + wb;
            if w <= 0.0 || k <= 0.0 {
                continue;
            }
            let d = self.nodes[b].position - self.nodes[a].position;
            let len = d.norm();
            if len <= LENGTH_EPS {
                continue;
            }
            let corr = d * ((len - link.rest) / len * k / w);
            self.nodes[a].position += corr * wa;
            self.nodes[b].position -= corr * wb;
        }
    }

    fn relax_link_velocities(&mut self) {
        for li in 0..self.links.len() {
            let link = self.links[li];
            let k = self.link_stiffness(link.kind);
            let (a, b) = (link.a as usize, link.b as usize);
            let (wa, wb) = (self.inv_masses[a], self.inv_masses[b]);
            let w = wa + wb;
            if w <= 0.0 || k <= 0.0 {
                continue;
            }
            let Some(dir) = (self.nodes[b].position - self.nodes[a].position).try_normalize(LENGTH_EPS)
            else {
                continue;
            };
            let vr = (self.velocities[b] - self.velocities[a]).dot(&dir);
            let j = vr * k / w;
            self.velocities[a] += dir * (j * wa);
            self.velocities[b] -= dir * (j * wb);
        }
    }

    /// Push nodes out of every overlapping rigid collider.
    ///
    /// Returns the reaction impulses owed to dynamic bodies; the caller applies them
    /// once it holds the body set mutably.
    pub(crate) fn collide_rigid(
        &mut self,
        colliders: &ColliderSet,
        bodies: &RigidBodySet,
        h: f32,
    ) -> Vec<ContactImpulse> {
        let mut impulses = Vec::new();
        if self.is_sleeping() || !self.config.collisions.has(CollisionFlag::SoftRigid) {
            return impulses;
        }

        self.update_bounds();
        let margin = self.margin;
        let friction = self.config.friction.clamp(0.0, 1.0);

        for (_, collider) in colliders.iter() {
            if !collider.compute_aabb().intersects(&self.aabb) {
                continue;
            }
            let dynamic_parent = collider
                .parent()
                .filter(|h| bodies.get(*h).is_some_and(|b| b.is_dynamic()));
            let pose = collider.position();

            for i in 0..self.nodes.len() {
                let im = self.inv_masses[i];
                if im <= 0.0 {
                    continue;
                }
                let x = self.nodes[i].position;
                let proj = collider.shape().project_point(pose, &x, false);
                let offset = proj.point - x;
                let dist = offset.norm();

                let (normal, depth) = if proj.is_inside {
                    let Some(n) = offset.try_normalize(LENGTH_EPS) else {
                        continue;
                    };
                    (n, dist + margin)
                } else {
                    if dist >= margin {
                        continue;
                    }
                    let Some(n) = (-offset).try_normalize(LENGTH_EPS) else {
                        continue;
                    };
                    (n, margin - dist)
                };

                let mut resolved = x + normal * depth;
                let moved = resolved - self.previous[i];
                let tangential = moved - normal * moved.dot(&normal);
                resolved -= tangential * friction;
                self.nodes[i].position = resolved;

                if let Some(body) = dynamic_parent {
                    let node_mass = 1.0 / im;
                    impulses.push(ContactImpulse {
                        body,
                        impulse: -normal * (depth * node_mass / h),
                        point: proj.point,
                    });
                }
            }
        }

        // The total reaction is the mean node impulse, not the sum over contacts.
        if impulses.len() > 1 {
            let share = 1.0 / impulses.len() as f32;
            for c in &mut impulses {
                c.impulse *= share;
            }
        }
        impulses
    }

    /// Separate nodes of two soft bodies closer than their combined margins.
    pub(crate) fn collide_soft(a: &mut SoftBody, b: &mut SoftBody) {
        let both = a.config.collisions.has(CollisionFlag::SoftSoft)
            && b.config.collisions.has(CollisionFlag::SoftSoft);
        if !both || (a.is_sleeping() && b.is_sleeping()) {
            return;
        }
        a.update_bounds();
        b.update_bounds();
        if !a.aabb.intersects(&b.aabb) {
            return;
        }

        let reach = a.margin + b.margin;
        for i in 0..a.nodes.len() {
            for j in 0..b.nodes.len() {
                let (wa, wb) = (a.inv_masses[i], b.inv_masses[j]);
                let w = wa + wb;
                if w <= 0.0 {
                    continue;
                }
                let d = b.nodes[j].position - a.nodes[i].position;
                let dist = d.norm();
                if dist >= reach || dist <= LENGTH_EPS {
                    continue;
                }
                let push = d * ((reach - dist) / dist / w);
                a.nodes[i].position -= push * wa;
                b.nodes[j].position += push * wb;
            }
        }
        a.wake_up();
        b.wake_up();
    }

    /// Velocities from the corrected positions, velocity relaxation, normals, bounds
    /// and sleep bookkeeping.
    pub(crate) fn finish(&mut self, h: f32) {
        if self.is_sleeping() || h <= 0.0 {
            return;
        }
        let inv_h = 1.0 / h;
        for i in 0..self.nodes.len() {
            if self.inv_masses[i] > 0.0 {
                self.velocities[i] = (self.nodes[i].position - self.previous[i]) * inv_h;
            }
        }
        for _ in 0..self.config.velocity_iterations {
            self.relax_link_velocities();
        }

        self.update_normals();
        self.update_bounds();

        if self.activation == ActivationState::Active {
            if self.max_speed() < SLEEP_SPEED_THRESHOLD {
                self.sleep_timer += h;
                if self.sleep_timer > TIME_TO_SLEEP {
                    self.activation = ActivationState::Sleeping;
                    self.velocities.iter_mut().for_each(|v| *v = Vector3::zeros());
                }
            } else {
                self.sleep_timer = 0.0;
            }
        }
    }

    /// Area-weighted vertex normals.
    fn update_normals(&mut self) {
        let mut acc = vec![Vector3::zeros(); self.nodes.len()];
        for &[a, b, c] in &self.faces {
            let (pa, pb, pc) = (self.pos(a), self.pos(b), self.pos(c));
            let n = (pb - pa).cross(&(pc - pa));
            for i in [a, b, c] {
                acc[i as usize] += n;
            }
        }
        for (node, n) in self.nodes.iter_mut().zip(acc) {
            node.normal = n.try_normalize(LENGTH_EPS).unwrap_or_else(Vector3::zeros);
        }
    }

    fn update_bounds(&mut self) {
        let Some(first) = self.nodes.first() else {
            self.aabb = Aabb::new_invalid();
            return;
        };
        let (mut mins, mut maxs) = (first.position, first.position);
        for node in &self.nodes[1..] {
            mins = mins.inf(&node.position);
            maxs = maxs.sup(&node.position);
        }
        self.aabb = Aabb::new(mins, maxs).loosened(self.margin);
    }
}
