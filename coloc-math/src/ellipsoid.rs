//! Projection of a spot-to-spot line onto an axis-aligned tolerance ellipsoid.
//!
//! The ellipsoid is centered on the reference spot and has two equal
//! lateral semi-axes (`semi_minor`) and one axial semi-axis (`semi_major`):
//!
//! ```text
//! ((x - x1) / a)² + ((y - y1) / a)² + ((z - z1) / b)² = 1
//! ```
//!
//! Given a second spot, the projection finds the point `P(t) = p1 + t·(p2 - p1)`
//! lying on that surface. `t` is not clipped to `[0, 1]`: a second spot
//! inside the ellipsoid yields `t > 1`.
//!
//! Two solvers are provided:
//!
//! - **Adaptive step**: starts at `t = 0` with a large step, grows the step
//!   by 1.5 while inside the ellipsoid and halves it (stepping back) once
//!   outside. Matches the historical QC reference tables.
//! - **Bisection**: doubles an upper bound until the far end lies outside
//!   the ellipsoid, then bisects. The ellipse ratio grows monotonically with
//!   `t` for `t ≥ 0`, so the bracket always holds the root.
//!
//! Both stop as soon as `|ratio - 1| < tolerance` and give up after
//! `max_iterations` ratio evaluations.

use log::{debug, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or searching a tolerance ellipsoid
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("ellipsoid semi-axes must be positive and finite: semi_minor={semi_minor}, semi_major={semi_major}")]
    DegenerateAxes { semi_minor: f64, semi_major: f64 },
    #[error("projection did not converge after {iterations} iterations (last ellipse ratio {last_ratio:.6e})")]
    NonConvergence { iterations: usize, last_ratio: f64 },
}

/// Root-finding strategy used to locate the ellipsoid crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Damped step-growing search, matches the historical reference outputs
    #[default]
    AdaptiveStep,
    /// Bracket expansion followed by bisection
    Bisection,
}

/// Solver parameters for [`project_on_ellipsoid`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    pub method: SearchMethod,
    /// Maximum number of ellipse-ratio evaluations
    pub max_iterations: usize,
    /// First step along the line (adaptive step only)
    pub initial_step: f64,
    /// Accepted distance of the ellipse ratio from 1.0
    pub tolerance: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            method: SearchMethod::AdaptiveStep,
            max_iterations: 1000,
            initial_step: 10.0,
            tolerance: 1e-12,
        }
    }
}

/// Axis-aligned ellipsoid with two equal lateral semi-axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceEllipsoid {
    center: Point3<f64>,
    semi_minor: f64,
    semi_major: f64,
}

impl ToleranceEllipsoid {
    /// Build an ellipsoid centered on `center`.
    ///
    /// # Arguments
    /// * `semi_minor` - Lateral (x and y) semi-axis
    /// * `semi_major` - Axial (z) semi-axis
    pub fn new(
        center: Point3<f64>,
        semi_minor: f64,
        semi_major: f64,
    ) -> Result<Self, ProjectionError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(semi_minor) || !valid(semi_major) {
            return Err(ProjectionError::DegenerateAxes {
                semi_minor,
                semi_major,
            });
        }

        Ok(Self {
            center,
            semi_minor,
            semi_major,
        })
    }

    pub fn center(&self) -> &Point3<f64> {
        &self.center
    }

    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    /// Normalized squared radius of `point`; exactly 1.0 on the surface.
    pub fn ratio(&self, point: &Point3<f64>) -> f64 {
        let d = point - self.center;
        let a2 = self.semi_minor * self.semi_minor;
        let b2 = self.semi_major * self.semi_major;
        (d.x * d.x + d.y * d.y) / a2 + (d.z * d.z) / b2
    }

    /// True when `point` lies inside or on the ellipsoid.
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.ratio(point) <= 1.0
    }
}

/// Result of a successful projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Point on the ellipsoid surface along the spot1 -> spot2 line
    pub point: Point3<f64>,
    /// Line parameter of `point`
    pub t: f64,
    /// Number of ellipse-ratio evaluations used
    pub iterations: usize,
}

/// Point at parameter `t` on the line through `start` and `end`.
pub fn point_on_line(start: &Point3<f64>, end: &Point3<f64>, t: f64) -> Point3<f64> {
    start + (end - start) * t
}

/// Find where the line from the ellipsoid center toward `target` crosses
/// the ellipsoid surface.
///
/// When `target` coincides with the center in all three axes the search is
/// skipped and the center itself is returned with zero iterations.
///
/// # Errors
/// `ProjectionError::NonConvergence` when `config.max_iterations` is
/// exhausted before the ratio falls within `config.tolerance` of 1.
pub fn project_on_ellipsoid(
    ellipsoid: &ToleranceEllipsoid,
    target: &Point3<f64>,
    config: &ProjectorConfig,
) -> Result<Projection, ProjectionError> {
    let center = *ellipsoid.center();
    if *target == center {
        return Ok(Projection {
            point: center,
            t: 0.0,
            iterations: 0,
        });
    }

    let ratio_at = |t: f64| ellipsoid.ratio(&point_on_line(&center, target, t));

    let outcome = match config.method {
        SearchMethod::AdaptiveStep => adaptive_step_search(ratio_at, config),
        SearchMethod::Bisection => bisection_search(ratio_at, config),
    };

    match outcome {
        Ok((t, iterations)) => {
            debug!(
                "Found t = {t} where ellipse ratio = {} after {iterations} iterations",
                ratio_at(t)
            );
            Ok(Projection {
                point: point_on_line(&center, target, t),
                t,
                iterations,
            })
        }
        Err(err) => {
            warn!(
                "Could not compute reference point within ellipse ratio {}: {err}",
                1.0 + config.tolerance
            );
            Err(err)
        }
    }
}

fn adaptive_step_search<F>(
    ratio_at: F,
    config: &ProjectorConfig,
) -> Result<(f64, usize), ProjectionError>
where
    F: Fn(f64) -> f64,
{
    let mut t = 0.0;
    let mut step = config.initial_step;
    let mut ratio = ratio_at(t);

    for iteration in 0..config.max_iterations {
        ratio = ratio_at(t);
        if (ratio - 1.0).abs() < config.tolerance {
            return Ok((t, iteration + 1));
        }

        if ratio > 1.0 {
            // Overshoot: shrink and retreat
            step *= 0.5;
            t -= step;
        } else {
            step *= 1.5;
            t += step;
        }
    }

    Err(ProjectionError::NonConvergence {
        iterations: config.max_iterations,
        last_ratio: ratio,
    })
}

fn bisection_search<F>(
    ratio_at: F,
    config: &ProjectorConfig,
) -> Result<(f64, usize), ProjectionError>
where
    F: Fn(f64) -> f64,
{
    let mut iterations = 0;
    let mut last_ratio = ratio_at(0.0);
    let mut lo = 0.0;
    let mut hi = 1.0;

    // Expand until hi lies outside the ellipsoid
    while iterations < config.max_iterations {
        last_ratio = ratio_at(hi);
        iterations += 1;
        if (last_ratio - 1.0).abs() < config.tolerance {
            return Ok((hi, iterations));
        }
        if last_ratio > 1.0 {
            break;
        }
        lo = hi;
        hi *= 2.0;
    }

    while iterations < config.max_iterations {
        let mid = 0.5 * (lo + hi);
        last_ratio = ratio_at(mid);
        iterations += 1;
        if (last_ratio - 1.0).abs() < config.tolerance {
            return Ok((mid, iterations));
        }
        // Bracket collapsed to adjacent floats
        if mid <= lo || mid >= hi {
            break;
        }
        if last_ratio > 1.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Err(ProjectionError::NonConvergence {
        iterations,
        last_ratio,
    })
}
