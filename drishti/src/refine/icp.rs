//! Planar point-to-line ICP.
//!
//! Objects rest on the support plane, so alignment is solved in (x, y, yaw)
//! on the plane projection of both clouds. Target points on a straight edge
//! of the projected cloud contribute their distance along the edge normal;
//! points in filled regions or at corners contribute both axes.
//!
//! # Algorithm
//!
//! ```text
//! Input: source S (rendered), target T (observed), initial pose P₀
//! Output: pose P* = Δ* ⊕ P₀
//!
//! fit a local line (normal n, quality) at every t from its neighbors
//! Δ = identity
//! repeat:
//!   a. pair each Δ(s) with its nearest t (reject pairs beyond max distance)
//!   b. residuals: n·(Δ(s) - t) on good lines, Δ(s) - t elsewhere
//!   c. solve the damped Gauss-Newton step δ about the source centroid
//!   d. Δ = δ ∘ Δ
//!   e. stop when |δ| is below the epsilons
//! ```

use nalgebra::{Matrix3, Point3, Vector3};

use crate::core::{ContPose, Point2D};
use crate::observation::SpatialIndex;

use super::{RefinementOracle, RefinementRequest, RefinementResult};

/// Relative damping added to the normal equations.
const DAMPING: f32 = 1e-4;

/// Configuration for planar ICP.
#[derive(Debug, Clone)]
pub struct IcpConfig {
    /// Maximum number of iterations.
    pub max_iterations: u32,

    /// Convergence threshold for the translation step (meters).
    pub translation_epsilon: f32,

    /// Convergence threshold for the rotation step (radians).
    pub rotation_epsilon: f32,

    /// Point pairs farther apart than this are ignored (meters).
    pub max_correspondence_distance: f32,

    /// Minimum number of pairs required to take a step.
    pub min_correspondences: usize,

    /// Target neighbors used to fit the local line at each target point.
    pub line_neighbors: usize,

    /// Minimum line fit quality (0.0 to 1.0) for a point-to-line residual.
    pub min_line_quality: f32,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            translation_epsilon: 0.0005, // 0.5mm
            rotation_epsilon: 0.001,     // ~0.06°
            max_correspondence_distance: 0.05,
            min_correspondences: 10,
            line_neighbors: 5,
            min_line_quality: 0.8,
        }
    }
}

/// In-plane rigid transform `p ↦ R(θ)·p + t`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Rigid2 {
    tx: f32,
    ty: f32,
    theta: f32,
}

impl Rigid2 {
    #[inline]
    fn apply(&self, p: Point2D) -> Point2D {
        let (sin, cos) = self.theta.sin_cos();
        Point2D::new(
            self.tx + p.x * cos - p.y * sin,
            self.ty + p.x * sin + p.y * cos,
        )
    }

    /// `self ∘ inner`: apply `inner` first.
    #[inline]
    fn after(&self, inner: &Rigid2) -> Rigid2 {
        let t = self.apply(Point2D::new(inner.tx, inner.ty));
        Rigid2 {
            tx: t.x,
            ty: t.y,
            theta: self.theta + inner.theta,
        }
    }

    /// Rotation by `theta` about `center` followed by translation `(tx, ty)`.
    fn about(center: Point2D, tx: f32, ty: f32, theta: f32) -> Rigid2 {
        let rotated = Rigid2 {
            tx: 0.0,
            ty: 0.0,
            theta,
        }
        .apply(center);
        Rigid2 {
            tx: center.x - rotated.x + tx,
            ty: center.y - rotated.y + ty,
            theta,
        }
    }
}

/// Line fitted through the neighborhood of one target point.
#[derive(Clone, Copy, Debug)]
struct LocalLine {
    /// Unit normal
    normal: Point2D,
    /// 1 - λmin/λmax of the neighborhood scatter (1.0 = perfect line)
    quality: f32,
}

impl LocalLine {
    /// Least-squares line through `points`; `None` for fewer than two points.
    fn fit(points: &[Point2D]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f32;
        let c = points.iter().fold(Point2D::default(), |acc, &p| acc + p) * (1.0 / n);
        let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
        for &p in points {
            let d = p - c;
            sxx += d.x * d.x;
            syy += d.y * d.y;
            sxy += d.x * d.y;
        }

        let trace = sxx + syy;
        let det = sxx * syy - sxy * sxy;
        let spread = (trace * trace / 4.0 - det).max(0.0).sqrt();
        let major = trace / 2.0 + spread;
        let minor = trace / 2.0 - spread;
        let quality = if major > 1e-10 { 1.0 - minor / major } else { 0.0 };

        // Eigenvector of the smaller eigenvalue
        let (a, b) = if sxy.abs() > 1e-10 {
            (sxy, minor - sxx)
        } else if sxx > syy {
            (0.0, 1.0)
        } else {
            (1.0, 0.0)
        };
        let norm = a.hypot(b);
        if norm < 1e-10 {
            return None;
        }
        Some(Self {
            normal: Point2D::new(a / norm, b / norm),
            quality,
        })
    }
}

/// Planar point-to-line ICP refinement oracle.
#[derive(Debug, Clone, Default)]
pub struct PlanarIcp {
    config: IcpConfig,
}

impl PlanarIcp {
    /// Create a new ICP refiner with the given configuration.
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// Edge normal at every target point whose neighborhood is a good line.
    fn fit_lines(&self, target: &[Point2D], tree: &SpatialIndex<2>) -> Vec<Option<Point2D>> {
        let mut neighborhood = Vec::with_capacity(self.config.line_neighbors);
        target
            .iter()
            .map(|t| {
                neighborhood.clear();
                neighborhood.extend(
                    tree.nearest_n(&[t.x, t.y], self.config.line_neighbors)
                        .into_iter()
                        .map(|j| target[j]),
                );
                LocalLine::fit(&neighborhood)
                    .filter(|line| line.quality >= self.config.min_line_quality)
                    .map(|line| line.normal)
            })
            .collect()
    }

    /// Pairs `(source_idx, target_idx)` under `transform`.
    fn find_correspondences(
        &self,
        source: &[Point2D],
        target_tree: &SpatialIndex<2>,
        transform: &Rigid2,
    ) -> Vec<(usize, usize)> {
        let max_dist_sq = self.config.max_correspondence_distance.powi(2);
        source
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| {
                let q = transform.apply(p);
                let (j, d2) = target_tree.nearest(&[q.x, q.y])?;
                (d2 <= max_dist_sq).then_some((i, j))
            })
            .collect()
    }

    /// Damped Gauss-Newton step moving transformed source pairs onto the
    /// target, with the distance it moves their centroid; `None` if the
    /// normal equations are singular.
    fn solve_step(
        source: &[Point2D],
        target: &[Point2D],
        lines: &[Option<Point2D>],
        pairs: &[(usize, usize)],
        transform: &Rigid2,
        allow_rotation: bool,
    ) -> Option<(Rigid2, f32)> {
        let n = pairs.len() as f32;
        let center = pairs
            .iter()
            .fold(Point2D::default(), |acc, &(si, _)| acc + transform.apply(source[si]))
            * (1.0 / n);

        let mut h = Matrix3::<f32>::zeros();
        let mut g = Vector3::<f32>::zeros();
        let mut add = |normal: Point2D, q: Point2D, t: Point2D| {
            let arm = q - center;
            let jacobian = Vector3::new(normal.x, normal.y, arm.cross(normal));
            let residual = normal.dot(q - t);
            h += jacobian * jacobian.transpose();
            g -= jacobian * residual;
        };
        for &(si, ti) in pairs {
            let q = transform.apply(source[si]);
            match lines[ti] {
                Some(normal) => add(normal, q, target[ti]),
                None => {
                    add(Point2D::new(1.0, 0.0), q, target[ti]);
                    add(Point2D::new(0.0, 1.0), q, target[ti]);
                }
            }
        }

        if !allow_rotation {
            for k in 0..2 {
                h[(k, 2)] = 0.0;
                h[(2, k)] = 0.0;
            }
            h[(2, 2)] = 1.0;
            g[2] = 0.0;
        }
        let damping = DAMPING * h.trace() / 3.0;
        for k in 0..3 {
            h[(k, k)] += damping;
        }

        let delta = h.cholesky()?.solve(&g);
        Some((
            Rigid2::about(center, delta[0], delta[1], delta[2]),
            delta[0].hypot(delta[1]),
        ))
    }

    fn mse(
        source: &[Point2D],
        target: &[Point2D],
        pairs: &[(usize, usize)],
        transform: &Rigid2,
    ) -> f32 {
        if pairs.is_empty() {
            return f32::MAX;
        }
        let sum: f32 = pairs
            .iter()
            .map(|&(si, ti)| {
                let d = transform.apply(source[si]) - target[ti];
                d.dot(d)
            })
            .sum();
        sum / pairs.len() as f32
    }
}

fn project(points: &[Point3<f32>]) -> Vec<Point2D> {
    points.iter().map(|p| Point2D::new(p.x, p.y)).collect()
}

impl RefinementOracle for PlanarIcp {
    fn refine(&self, request: &RefinementRequest<'_>) -> RefinementResult {
        let initial = request.initial;
        if request.source.len() < self.config.min_correspondences
            || request.target.len() < self.config.min_correspondences
        {
            return RefinementResult::failed(initial, 0);
        }

        let source = project(request.source);
        let target = project(request.target);
        let coords: Vec<[f32; 2]> = target.iter().map(|p| [p.x, p.y]).collect();
        let target_tree = SpatialIndex::build(&coords);
        let lines = self.fit_lines(&target, &target_tree);

        let mut transform = Rigid2::default();
        for iter in 0..self.config.max_iterations {
            let iterations = iter + 1;
            let pairs = self.find_correspondences(&source, &target_tree, &transform);
            if pairs.len() < self.config.min_correspondences {
                return RefinementResult::failed(initial, iterations);
            }

            let Some((step, moved)) = Self::solve_step(
                &source,
                &target,
                &lines,
                &pairs,
                &transform,
                request.allow_rotation,
            ) else {
                return RefinementResult::failed(initial, iterations);
            };
            transform = step.after(&transform);

            if moved < self.config.translation_epsilon
                && step.theta.abs() < self.config.rotation_epsilon
            {
                let position = transform.apply(initial.position());
                return RefinementResult {
                    pose: ContPose::new(position.x, position.y, initial.yaw + transform.theta),
                    fitness: Self::mse(&source, &target, &pairs, &transform),
                    converged: true,
                    iterations,
                };
            }
        }

        RefinementResult::failed(initial, self.config.max_iterations)
    }

    fn name(&self) -> &str {
        "planar_icp"
    }
}
