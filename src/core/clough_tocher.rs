//! Clough-Tocher piecewise-cubic interpolation over a Delaunay triangulation
//!
//! Each triangle is split at its centroid into three cubic Bernstein patches.
//! Vertex gradients come from weighted least-squares plane fits over the
//! Delaunay neighbours; edge control points enforce a cross-boundary
//! derivative that varies linearly along each edge, giving a C1 surface.
//! Constant and linear data are reproduced exactly.

use crate::core::triangulation::{LatticePoint, Location, Triangulation};
use std::collections::HashMap;

type Vec2 = [f64; 2];

fn sub(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

fn dot(a: Vec2, b: Vec2) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn to_vec2(p: LatticePoint) -> Vec2 {
    [p[0] as f64, p[1] as f64]
}

/// C1 surface through scattered samples at lattice locations
pub struct CloughTocherSurface {
    triangulation: Triangulation,
    values: Vec<f64>,
}

impl CloughTocherSurface {
    /// Triangulate the sample locations; `values[i]` belongs to `points[i]`
    pub fn new(points: &[LatticePoint], values: Vec<f64>) -> Self {
        debug_assert_eq!(points.len(), values.len());
        let triangulation = Triangulation::new(points);
        log::debug!(
            "Triangulated {} samples into {} triangles",
            triangulation.sample_count(),
            triangulation.triangles().count()
        );
        Self { triangulation, values }
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Interpolate at each query location; `None` outside the convex hull
    pub fn evaluate(&self, queries: &[LatticePoint]) -> Vec<Option<f64>> {
        let mut hint = 0;
        let locations: Vec<Option<Location>> = queries
            .iter()
            .map(|&q| self.triangulation.locate(q, &mut hint))
            .collect();

        let mut corners: Vec<usize> = locations
            .iter()
            .flatten()
            .flat_map(|loc| loc.vertices)
            .collect();
        corners.sort_unstable();
        corners.dedup();

        let gradients = estimate_gradients(&self.triangulation, &self.values, &corners);

        locations
            .iter()
            .map(|location| {
                location.map(|loc| {
                    let vertices = loc.vertices.map(|v| to_vec2(self.triangulation.point(v)));
                    let values = loc.vertices.map(|v| self.values[v]);
                    let grads = loc
                        .vertices
                        .map(|v| gradients.get(&v).copied().unwrap_or([0.0, 0.0]));
                    clough_tocher_patch(vertices, values, grads, loc.barycentric)
                })
            })
            .collect()
    }
}

/// Gradient estimates for the requested samples
///
/// Weighted least-squares plane through each sample and its Delaunay
/// neighbours, with weights 1/d². Degenerate neighbourhoods get a zero gradient.
pub fn estimate_gradients(
    triangulation: &Triangulation,
    values: &[f64],
    samples: &[usize],
) -> HashMap<usize, Vec2> {
    let neighbors = triangulation.neighbors_of(samples);
    let mut gradients = HashMap::with_capacity(samples.len());

    for &i in samples {
        let pi = to_vec2(triangulation.point(i));
        let (mut sxx, mut sxy, mut syy, mut sxz, mut syz) = (0.0, 0.0, 0.0, 0.0, 0.0);

        for &j in neighbors.get(&i).map(Vec::as_slice).unwrap_or(&[]) {
            let [dx, dy] = sub(to_vec2(triangulation.point(j)), pi);
            let dz = values[j] - values[i];
            let w = 1.0 / (dx * dx + dy * dy);
            sxx += w * dx * dx;
            sxy += w * dx * dy;
            syy += w * dy * dy;
            sxz += w * dx * dz;
            syz += w * dy * dz;
        }

        let det = sxx * syy - sxy * sxy;
        let gradient = if det.abs() < 1e-12 {
            [0.0, 0.0]
        } else {
            [(syy * sxz - sxy * syz) / det, (sxx * syz - sxy * sxz) / det]
        };
        gradients.insert(i, gradient);
    }

    gradients
}

/// Evaluate the Clough-Tocher patch of one triangle
///
/// `vertices` are counter-clockwise, `barycentric` the query weights with
/// respect to them. Control values are carried as offsets from the first
/// vertex value so that flat data comes back bit-exact.
pub fn clough_tocher_patch(
    vertices: [Vec2; 3],
    values: [f64; 3],
    gradients: [Vec2; 3],
    barycentric: [f64; 3],
) -> f64 {
    let reference = values[0];
    let f = values.map(|v| v - reference);
    let centroid = [
        (vertices[0][0] + vertices[1][0] + vertices[2][0]) / 3.0,
        (vertices[0][1] + vertices[1][1] + vertices[2][1]) / 3.0,
    ];

    // Edge control points next to each vertex
    let mut b = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            if i != j {
                b[i][j] = f[i] + dot(gradients[i], sub(vertices[j], vertices[i])) / 3.0;
            }
        }
    }

    // Control points on the spokes towards the centroid
    let a: [f64; 3] =
        std::array::from_fn(|i| f[i] + dot(gradients[i], sub(centroid, vertices[i])) / 3.0);

    // Interior edge points, indexed by the opposite vertex
    let mut e = [0.0; 3];
    for (k, ek) in e.iter_mut().enumerate() {
        let (i, j) = ((k + 1) % 3, (k + 2) % 3);
        let edge = sub(vertices[j], vertices[i]);
        let t = dot(sub(centroid, vertices[i]), edge) / dot(edge, edge);
        let (ui, uj) = (t - 1.0, -t);

        let d0 = uj * (b[i][j] - f[i]) + (a[i] - f[i]);
        let d2 = ui * (b[j][i] - f[j]) + (a[j] - f[j]);
        let m = 0.5 * (b[i][j] + b[j][i]);
        *ek = m + 0.5 * (d0 + d2) - ui * (b[i][j] - m) - uj * (b[j][i] - m);
    }

    let q: [f64; 3] = std::array::from_fn(|i| (a[i] + e[(i + 1) % 3] + e[(i + 2) % 3]) / 3.0);
    let s = (q[0] + q[1] + q[2]) / 3.0;

    // Sub-triangle (v_i, v_j, centroid) opposite the smallest weight
    let k = (0..3)
        .min_by(|&x, &y| barycentric[x].total_cmp(&barycentric[y]))
        .unwrap_or(0);
    let (i, j) = ((k + 1) % 3, (k + 2) % 3);
    let bs = barycentric[i] - barycentric[k];
    let bt = barycentric[j] - barycentric[k];
    let bu = 3.0 * barycentric[k];

    let value = f[i] * bs * bs * bs
        + f[j] * bt * bt * bt
        + s * bu * bu * bu
        + 3.0 * b[i][j] * bs * bs * bt
        + 3.0 * b[j][i] * bs * bt * bt
        + 3.0 * a[i] * bs * bs * bu
        + 3.0 * a[j] * bt * bt * bu
        + 3.0 * q[i] * bs * bu * bu
        + 3.0 * q[j] * bt * bu * bu
        + 6.0 * e[k] * bs * bt * bu;

    reference + value
}
