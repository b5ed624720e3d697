//! Delaunay triangulation of pixel sample locations
//!
//! Incremental Bowyer-Watson insertion inside an enclosing super-triangle.
//! Sample locations are pixel indices, so coordinates are integers and the
//! orientation / in-circle predicates are evaluated exactly in `i128`.
//! Point location walks the triangle adjacency from the previous hit, which
//! keeps row-major insertion close to linear time.

use std::collections::{HashMap, HashSet};

/// Integer sample location `[x, y]` (column, row)
pub type LatticePoint = [i64; 2];

const NONE: usize = usize::MAX;
/// Number of super-triangle vertices stored ahead of the samples
const SUPER: usize = 3;
/// Super-triangle size relative to the sample extent
const SUPER_SCALE: i64 = 4096;

#[derive(Debug, Clone, Copy)]
struct Face {
    /// Vertex indices, counter-clockwise
    v: [usize; 3],
    /// `adj[e]` is the face across the edge opposite `v[e]`
    adj: [usize; 3],
    alive: bool,
}

/// Triangle enclosing a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Sample indices of the triangle corners (counter-clockwise)
    pub vertices: [usize; 3],
    /// Barycentric weights of the query point, summing to one
    pub barycentric: [f64; 3],
}

/// Twice the signed area of (a, b, c); positive when counter-clockwise
fn orient(a: LatticePoint, b: LatticePoint, c: LatticePoint) -> i128 {
    let abx = (b[0] - a[0]) as i128;
    let aby = (b[1] - a[1]) as i128;
    let acx = (c[0] - a[0]) as i128;
    let acy = (c[1] - a[1]) as i128;
    abx * acy - aby * acx
}

/// Whether `d` lies strictly inside the circumcircle of counter-clockwise (a, b, c)
fn in_circumcircle(a: LatticePoint, b: LatticePoint, c: LatticePoint, d: LatticePoint) -> bool {
    let adx = (a[0] - d[0]) as i128;
    let ady = (a[1] - d[1]) as i128;
    let bdx = (b[0] - d[0]) as i128;
    let bdy = (b[1] - d[1]) as i128;
    let cdx = (c[0] - d[0]) as i128;
    let cdy = (c[1] - d[1]) as i128;

    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;

    let det = adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx)
        + ad * (bdx * cdy - bdy * cdx);
    det > 0
}

/// Delaunay triangulation of a set of lattice points
#[derive(Debug, Clone)]
pub struct Triangulation {
    vertices: Vec<LatticePoint>,
    faces: Vec<Face>,
    last: usize,
}

impl Triangulation {
    /// Triangulate the given sample locations
    pub fn new(points: &[LatticePoint]) -> Self {
        let mut triangulation = Self::with_super_triangle(points);
        for i in 0..points.len() {
            triangulation.insert(i + SUPER);
        }
        triangulation
    }

    fn with_super_triangle(points: &[LatticePoint]) -> Self {
        let (mut min_x, mut min_y) = (i64::MAX, i64::MAX);
        let (mut max_x, mut max_y) = (i64::MIN, i64::MIN);
        for p in points {
            min_x = min_x.min(p[0]);
            min_y = min_y.min(p[1]);
            max_x = max_x.max(p[0]);
            max_y = max_y.max(p[1]);
        }
        if points.is_empty() {
            (min_x, min_y, max_x, max_y) = (0, 0, 0, 0);
        }

        let delta = (max_x - min_x).max(max_y - min_y).max(1);
        let far = delta * SUPER_SCALE;
        let mid_x = min_x + (max_x - min_x) / 2;

        let mut vertices = Vec::with_capacity(points.len() + SUPER);
        vertices.push([min_x - far, min_y - delta]);
        vertices.push([max_x + far, min_y - delta]);
        vertices.push([mid_x, max_y + far]);
        vertices.extend_from_slice(points);

        Self {
            vertices,
            faces: vec![Face {
                v: [0, 1, 2],
                adj: [NONE; 3],
                alive: true,
            }],
            last: 0,
        }
    }

    /// Number of samples (excluding the super-triangle)
    pub fn sample_count(&self) -> usize {
        self.vertices.len() - SUPER
    }

    /// Sample location by index
    pub fn point(&self, sample: usize) -> LatticePoint {
        self.vertices[sample + SUPER]
    }

    /// Triangles spanned by samples only, as counter-clockwise sample indices
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.faces
            .iter()
            .filter(|f| f.alive && f.v.iter().all(|&u| u >= SUPER))
            .map(|f| [f.v[0] - SUPER, f.v[1] - SUPER, f.v[2] - SUPER])
    }

    fn insert(&mut self, vi: usize) {
        let p = self.vertices[vi];
        let start = match self.walk(p, self.last) {
            Some(f) => f,
            None => return,
        };

        if self.faces[start].v.iter().any(|&u| self.vertices[u] == p) {
            log::debug!("Skipping duplicate sample location {:?}", p);
            return;
        }

        // Cavity: faces whose circumcircle strictly contains p, grown from the hit face
        let mut cavity: HashSet<usize> = HashSet::new();
        cavity.insert(start);
        let mut bad = vec![start];
        let mut stack = vec![start];
        while let Some(f) = stack.pop() {
            for e in 0..3 {
                let n = self.faces[f].adj[e];
                if n != NONE && !cavity.contains(&n) && self.circumcircle_contains(n, p) {
                    cavity.insert(n);
                    bad.push(n);
                    stack.push(n);
                }
            }
        }

        // Boundary edges (a, b) in cavity order, with the face outside each edge
        let mut boundary: Vec<(usize, usize, usize)> = Vec::with_capacity(bad.len() + 2);
        for &f in &bad {
            let face = self.faces[f];
            for e in 0..3 {
                let n = face.adj[e];
                if n == NONE || !cavity.contains(&n) {
                    boundary.push((face.v[(e + 1) % 3], face.v[(e + 2) % 3], n));
                }
            }
        }

        let mut slots = bad;
        for &f in &slots {
            self.faces[f].alive = false;
        }
        while slots.len() < boundary.len() {
            slots.push(self.faces.len());
            self.faces.push(Face {
                v: [0; 3],
                adj: [NONE; 3],
                alive: false,
            });
        }

        let mut by_start: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        for (k, &(a, b, outer)) in boundary.iter().enumerate() {
            let f = slots[k];
            self.faces[f] = Face {
                v: [a, b, vi],
                adj: [NONE, NONE, outer],
                alive: true,
            };
            if outer != NONE {
                let outer_face = &mut self.faces[outer];
                for e in 0..3 {
                    if outer_face.v[(e + 1) % 3] == b && outer_face.v[(e + 2) % 3] == a {
                        outer_face.adj[e] = f;
                    }
                }
            }
            by_start.insert(a, f);
        }

        // Stitch the fan around p: (a, b, p) meets (b, c, p) along (b, p)
        for &f in slots.iter().take(boundary.len()) {
            let b = self.faces[f].v[1];
            if let Some(&next) = by_start.get(&b) {
                self.faces[f].adj[0] = next;
                self.faces[next].adj[1] = f;
            }
        }

        self.last = slots[0];
    }

    fn circumcircle_contains(&self, f: usize, p: LatticePoint) -> bool {
        let [a, b, c] = self.faces[f].v;
        in_circumcircle(self.vertices[a], self.vertices[b], self.vertices[c], p)
    }

    fn face_contains(&self, face: &Face, p: LatticePoint) -> bool {
        (0..3).all(|e| {
            let a = self.vertices[face.v[(e + 1) % 3]];
            let b = self.vertices[face.v[(e + 2) % 3]];
            orient(a, b, p) >= 0
        })
    }

    /// Visibility walk from `hint` to the face containing `p`
    fn walk(&self, p: LatticePoint, hint: usize) -> Option<usize> {
        let mut f = if hint < self.faces.len() && self.faces[hint].alive {
            hint
        } else {
            self.faces.iter().position(|face| face.alive)?
        };

        for _ in 0..self.faces.len() + 1 {
            let face = self.faces[f];
            let exit = (0..3).find(|&e| {
                let a = self.vertices[face.v[(e + 1) % 3]];
                let b = self.vertices[face.v[(e + 2) % 3]];
                orient(a, b, p) < 0
            });

            match exit {
                None => return Some(f),
                Some(e) if face.adj[e] == NONE => return None,
                Some(e) => f = face.adj[e],
            }
        }

        // Walk did not settle; fall back to a scan
        self.faces
            .iter()
            .position(|face| face.alive && self.face_contains(face, p))
    }

    /// Find the sample triangle containing `p` (boundary inclusive)
    ///
    /// Returns `None` outside the convex hull of the samples. `hint` carries
    /// the last face visited between calls.
    pub fn locate(&self, p: LatticePoint, hint: &mut usize) -> Option<Location> {
        let mut f = self.walk(p, *hint)?;
        *hint = f;

        if self.faces[f].v.iter().any(|&u| u < SUPER) {
            // On a hull edge the walk may stop on the outer side
            let face = self.faces[f];
            let inner = (0..3).find_map(|e| {
                let (ia, ib) = (face.v[(e + 1) % 3], face.v[(e + 2) % 3]);
                let n = face.adj[e];
                let on_real_edge = ia >= SUPER
                    && ib >= SUPER
                    && orient(self.vertices[ia], self.vertices[ib], p) == 0;
                if on_real_edge && n != NONE && self.faces[n].v.iter().all(|&u| u >= SUPER) {
                    Some(n)
                } else {
                    None
                }
            });
            f = inner?;
        }

        let face = self.faces[f];
        let [a, b, c] = face.v.map(|u| self.vertices[u]);
        let area = orient(a, b, c) as f64;
        if area <= 0.0 {
            return None;
        }

        Some(Location {
            vertices: face.v.map(|u| u - SUPER),
            barycentric: [
                orient(b, c, p) as f64 / area,
                orient(c, a, p) as f64 / area,
                orient(a, b, p) as f64 / area,
            ],
        })
    }

    /// Delaunay neighbours of the requested samples
    pub fn neighbors_of(&self, samples: &[usize]) -> HashMap<usize, Vec<usize>> {
        let wanted: HashSet<usize> = samples.iter().map(|&s| s + SUPER).collect();
        let mut neighbors: HashMap<usize, Vec<usize>> = HashMap::with_capacity(wanted.len());

        for face in self.faces.iter().filter(|f| f.alive) {
            for k in 0..3 {
                if !wanted.contains(&face.v[k]) {
                    continue;
                }
                let entry = neighbors.entry(face.v[k] - SUPER).or_default();
                for other in [face.v[(k + 1) % 3], face.v[(k + 2) % 3]] {
                    if other >= SUPER {
                        entry.push(other - SUPER);
                    }
                }
            }
        }

        for list in neighbors.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        neighbors
    }
}
