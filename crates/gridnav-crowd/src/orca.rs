//! ORCA local avoidance
//!
//! Builds one half-plane velocity constraint per nearby obstacle
//! segment and per neighbor agent, then solves the constraint set with
//! incremental 2D linear programming. Obstacle constraints are
//! inviolable; agent constraints relax progressively when the program
//! is infeasible, so the solver always returns a velocity inside the
//! max-speed disc.
//!
//! Responsibility for mutual avoidance is split by
//! [`calc_avoidance_weight`] instead of the fixed reciprocal half:
//! heavier, stationary or push-resistant agents yield less.

use glam::Vec2;
use gridnav_common::det_2d;

const EPS: f32 = 1e-5;

/// Half-plane constraint on velocity. Feasible velocities lie to the
/// left of the directed line.
#[derive(Debug, Clone, Copy)]
pub struct OrcaLine {
    pub point: Vec2,
    pub dir: Vec2,
}

/// Kinematic snapshot of one agent as the avoidance pass sees it
#[derive(Debug, Clone, Copy)]
pub struct OrcaBody {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub mass: f32,
    pub push_resistant: bool,
    pub moving: bool,
}

/// Static obstacle segment with neighbor directions for the foreign
/// leg tests. The blocked interior lies to the left of `p1 -> p2`,
/// walkable space to the right.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleSegment {
    pub p1: Vec2,
    pub p2: Vec2,
    /// Direction of the boundary segment ending at `p1`
    pub prev_dir: Vec2,
    /// Direction of the boundary segment starting at `p2`
    pub next_dir: Vec2,
    pub convex1: bool,
    pub convex2: bool,
}

impl ObstacleSegment {
    pub fn standalone(p1: Vec2, p2: Vec2) -> Self {
        let dir = (p2 - p1).normalize_or_zero();
        Self {
            p1,
            p2,
            prev_dir: dir,
            next_dir: dir,
            convex1: true,
            convex2: true,
        }
    }

    pub fn unit_dir(&self) -> Vec2 {
        (self.p2 - self.p1).normalize_or_zero()
    }
}

/// Share of the mutual avoidance effort `a` takes on against `b`,
/// in `[0, 1]`. Equal-footing pairs split the effort evenly.
pub fn calc_avoidance_weight(a: &OrcaBody, b: &OrcaBody) -> f32 {
    match (a.push_resistant, b.push_resistant) {
        (true, true) => return 0.5,
        (true, false) => return 0.0,
        (false, true) => return 1.0,
        (false, false) => {}
    }
    let mass_sum = (a.mass + b.mass).max(EPS);
    let mut w = b.mass / mass_sum;
    // The moving party swerves around the stationary one
    if a.moving && !b.moving {
        w = (w + 1.0) * 0.5;
    } else if !a.moving && b.moving {
        w *= 0.5;
    }
    w.clamp(0.0, 1.0)
}

fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Per-agent constraint builder and solver, reused across ticks
pub struct OrcaQuery {
    lines: Vec<OrcaLine>,
    obstacle_lines: usize,
}

impl Default for OrcaQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl OrcaQuery {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            obstacle_lines: 0,
        }
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.obstacle_lines = 0;
    }

    pub fn lines(&self) -> &[OrcaLine] {
        &self.lines
    }

    /// Adds the constraint for one static obstacle segment. Must be
    /// called before any [`OrcaQuery::add_agent`].
    pub fn add_obstacle_segment(
        &mut self,
        body: &OrcaBody,
        seg: &ObstacleSegment,
        time_horizon_obst: f32,
    ) {
        debug_assert_eq!(self.obstacle_lines, self.lines.len());
        let inv_t = 1.0 / time_horizon_obst;
        let radius = body.radius;
        let rel1 = seg.p1 - body.pos;
        let rel2 = seg.p2 - body.pos;

        // Already covered by a previously built obstacle constraint
        for line in &self.lines[..self.obstacle_lines] {
            if det_2d(inv_t * rel1 - line.point, line.dir) - inv_t * radius >= -EPS
                && det_2d(inv_t * rel2 - line.point, line.dir) - inv_t * radius >= -EPS
            {
                return;
            }
        }

        let dist_sq1 = rel1.length_squared();
        let dist_sq2 = rel2.length_squared();
        let radius_sq = radius * radius;
        let seg_vec = seg.p2 - seg.p1;
        let s = (-rel1).dot(seg_vec) / seg_vec.length_squared().max(EPS);
        let dist_sq_line = (-rel1 - s * seg_vec).length_squared();

        // Current collision cases push straight away from the obstacle
        if s < 0.0 && dist_sq1 <= radius_sq {
            if seg.convex1 {
                self.push_obstacle_line(OrcaLine {
                    point: Vec2::ZERO,
                    dir: perp(rel1).normalize_or_zero(),
                });
            }
            return;
        } else if s > 1.0 && dist_sq2 <= radius_sq {
            if seg.convex2 && det_2d(rel2, seg.next_dir) >= 0.0 {
                self.push_obstacle_line(OrcaLine {
                    point: Vec2::ZERO,
                    dir: perp(rel2).normalize_or_zero(),
                });
            }
            return;
        } else if (0.0..=1.0).contains(&s) && dist_sq_line <= radius_sq {
            self.push_obstacle_line(OrcaLine {
                point: Vec2::ZERO,
                dir: -seg.unit_dir(),
            });
            return;
        }

        // No collision: build the velocity-obstacle legs. Near an end
        // vertex the segment collapses to that vertex.
        let (v1, v2, left_leg, right_leg) = if s < 0.0 && dist_sq_line <= radius_sq {
            if !seg.convex1 {
                return;
            }
            let leg = (dist_sq1 - radius_sq).sqrt();
            let left = Vec2::new(rel1.x * leg - rel1.y * radius, rel1.x * radius + rel1.y * leg)
                / dist_sq1;
            let right = Vec2::new(rel1.x * leg + rel1.y * radius, -rel1.x * radius + rel1.y * leg)
                / dist_sq1;
            (seg.p1, seg.p1, left, right)
        } else if s > 1.0 && dist_sq_line <= radius_sq {
            if !seg.convex2 {
                return;
            }
            let leg = (dist_sq2 - radius_sq).sqrt();
            let left = Vec2::new(rel2.x * leg - rel2.y * radius, rel2.x * radius + rel2.y * leg)
                / dist_sq2;
            let right = Vec2::new(rel2.x * leg + rel2.y * radius, -rel2.x * radius + rel2.y * leg)
                / dist_sq2;
            (seg.p2, seg.p2, left, right)
        } else {
            let left = if seg.convex1 {
                let leg = (dist_sq1 - radius_sq).sqrt();
                Vec2::new(rel1.x * leg - rel1.y * radius, rel1.x * radius + rel1.y * leg)
                    / dist_sq1
            } else {
                -seg.unit_dir()
            };
            let right = if seg.convex2 {
                let leg = (dist_sq2 - radius_sq).sqrt();
                Vec2::new(rel2.x * leg + rel2.y * radius, -rel2.x * radius + rel2.y * leg)
                    / dist_sq2
            } else {
                seg.unit_dir()
            };
            (seg.p1, seg.p2, left, right)
        };

        // A leg pointing into the neighboring boundary segment is
        // foreign; it is replaced by that segment's direction and never
        // used as a constraint of its own
        let mut left_leg = left_leg;
        let mut right_leg = right_leg;
        let mut left_foreign = false;
        let mut right_foreign = false;
        if seg.convex1 && det_2d(left_leg, -seg.prev_dir) >= 0.0 {
            left_leg = -seg.prev_dir;
            left_foreign = true;
        }
        if seg.convex2 && det_2d(right_leg, seg.next_dir) <= 0.0 {
            right_leg = seg.next_dir;
            right_foreign = true;
        }

        let left_cutoff = inv_t * (v1 - body.pos);
        let right_cutoff = inv_t * (v2 - body.pos);
        let cutoff_vec = right_cutoff - left_cutoff;
        let collapsed = v1 == v2;

        let t = if collapsed {
            0.5
        } else {
            (body.velocity - left_cutoff).dot(cutoff_vec) / cutoff_vec.length_squared().max(EPS)
        };
        let t_left = (body.velocity - left_cutoff).dot(left_leg);
        let t_right = (body.velocity - right_cutoff).dot(right_leg);

        if (t < 0.0 && t_left < 0.0) || (collapsed && t_left < 0.0 && t_right < 0.0) {
            // Project on the left cutoff circle
            let unit_w = (body.velocity - left_cutoff).normalize_or_zero();
            self.push_obstacle_line(OrcaLine {
                dir: Vec2::new(unit_w.y, -unit_w.x),
                point: left_cutoff + radius * inv_t * unit_w,
            });
            return;
        } else if t > 1.0 && t_right < 0.0 {
            let unit_w = (body.velocity - right_cutoff).normalize_or_zero();
            self.push_obstacle_line(OrcaLine {
                dir: Vec2::new(unit_w.y, -unit_w.x),
                point: right_cutoff + radius * inv_t * unit_w,
            });
            return;
        }

        // Closest of cutoff segment, left leg, right leg
        let dist_sq_cutoff = if t < 0.0 || t > 1.0 || collapsed {
            f32::INFINITY
        } else {
            (body.velocity - (left_cutoff + t * cutoff_vec)).length_squared()
        };
        let dist_sq_left = if t_left < 0.0 {
            f32::INFINITY
        } else {
            (body.velocity - (left_cutoff + t_left * left_leg)).length_squared()
        };
        let dist_sq_right = if t_right < 0.0 {
            f32::INFINITY
        } else {
            (body.velocity - (right_cutoff + t_right * right_leg)).length_squared()
        };

        if dist_sq_cutoff <= dist_sq_left && dist_sq_cutoff <= dist_sq_right {
            let dir = -seg.unit_dir();
            self.push_obstacle_line(OrcaLine {
                dir,
                point: left_cutoff + radius * inv_t * perp(dir),
            });
        } else if dist_sq_left <= dist_sq_right {
            if left_foreign {
                return;
            }
            self.push_obstacle_line(OrcaLine {
                dir: left_leg,
                point: left_cutoff + radius * inv_t * perp(left_leg),
            });
        } else {
            if right_foreign {
                return;
            }
            self.push_obstacle_line(OrcaLine {
                dir: -right_leg,
                point: right_cutoff + radius * inv_t * perp(-right_leg),
            });
        }
    }

    fn push_obstacle_line(&mut self, line: OrcaLine) {
        self.lines.push(line);
        self.obstacle_lines = self.lines.len();
    }

    /// Adds the constraint for one neighbor agent. `inv_dt` scales the
    /// push-apart term of the already-colliding case.
    pub fn add_agent(&mut self, body: &OrcaBody, other: &OrcaBody, time_horizon: f32, inv_dt: f32) {
        let relative_pos = other.pos - body.pos;
        let mut relative_vel = body.velocity - other.velocity;
        let dist_sq = relative_pos.length_squared();
        let combined_radius = body.radius + other.radius;
        let combined_radius_sq = combined_radius * combined_radius;
        let weight = calc_avoidance_weight(body, other);

        // Exact head-on symmetry never resolves sideways on its own;
        // a small bias to the agent's own left breaks the deadlock the
        // same way for both parties
        if relative_vel.length_squared() > EPS
            && det_2d(relative_pos, relative_vel).abs() < EPS
            && relative_vel.dot(relative_pos) > 0.0
        {
            relative_vel += perp(relative_pos).normalize_or_zero() * 1e-3 * relative_vel.length();
        }

        let (dir, u) = if dist_sq > combined_radius_sq {
            // No collision yet
            let w = relative_vel - relative_pos / time_horizon;
            let w_length_sq = w.length_squared();
            let dot1 = w.dot(relative_pos);

            if dot1 < 0.0 && dot1 * dot1 > combined_radius_sq * w_length_sq {
                // Project on cutoff circle
                let w_length = w_length_sq.sqrt();
                let unit_w = w / w_length;
                (
                    Vec2::new(unit_w.y, -unit_w.x),
                    (combined_radius / time_horizon - w_length) * unit_w,
                )
            } else {
                // Project on the nearer leg
                let leg = (dist_sq - combined_radius_sq).sqrt();
                let dir = if det_2d(relative_pos, w) > 0.0 {
                    Vec2::new(
                        relative_pos.x * leg - relative_pos.y * combined_radius,
                        relative_pos.x * combined_radius + relative_pos.y * leg,
                    ) / dist_sq
                } else {
                    -Vec2::new(
                        relative_pos.x * leg + relative_pos.y * combined_radius,
                        -relative_pos.x * combined_radius + relative_pos.y * leg,
                    ) / dist_sq
                };
                (dir, relative_vel.dot(dir) * dir - relative_vel)
            }
        } else {
            // Already colliding; push apart within one timestep
            let w = relative_vel - relative_pos * inv_dt;
            let w_length = w.length().max(EPS);
            let unit_w = w / w_length;
            (
                Vec2::new(unit_w.y, -unit_w.x),
                (combined_radius * inv_dt - w_length) * unit_w,
            )
        };

        self.lines.push(OrcaLine {
            dir,
            point: body.velocity + weight * u,
        });
    }

    /// Solves the accumulated constraints for the velocity closest to
    /// `pref_velocity` within the max-speed disc.
    pub fn solve(&self, max_speed: f32, pref_velocity: Vec2) -> Vec2 {
        let mut result = Vec2::ZERO;
        let fail = linear_program2(&self.lines, max_speed, pref_velocity, false, &mut result);
        if fail < self.lines.len() {
            linear_program3(
                &self.lines,
                self.obstacle_lines,
                fail,
                max_speed,
                &mut result,
            );
        }
        result
    }
}

/// Solves along one constraint line clipped to the speed disc
fn linear_program1(
    lines: &[OrcaLine],
    line_no: usize,
    radius: f32,
    opt_vel: Vec2,
    direction_opt: bool,
    result: &mut Vec2,
) -> bool {
    let line = lines[line_no];
    let dot_product = line.point.dot(line.dir);
    let discriminant = dot_product * dot_product + radius * radius - line.point.length_squared();
    if discriminant < 0.0 {
        // Speed disc fully violates the constraint
        return false;
    }
    let sqrt_disc = discriminant.sqrt();
    let mut t_left = -dot_product - sqrt_disc;
    let mut t_right = -dot_product + sqrt_disc;

    for prev in lines.iter().take(line_no) {
        let denominator = det_2d(line.dir, prev.dir);
        let numerator = det_2d(prev.dir, line.point - prev.point);
        if denominator.abs() <= EPS {
            if numerator < 0.0 {
                return false;
            }
            continue;
        }
        let t = numerator / denominator;
        if denominator >= 0.0 {
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }
        if t_left > t_right {
            return false;
        }
    }

    if direction_opt {
        *result = if opt_vel.dot(line.dir) > 0.0 {
            line.point + t_right * line.dir
        } else {
            line.point + t_left * line.dir
        };
    } else {
        let t = line.dir.dot(opt_vel - line.point);
        *result = line.point + t.clamp(t_left, t_right) * line.dir;
    }
    true
}

/// Iterates the constraints, re-optimizing along each violated one.
/// Returns the index of the first unsatisfiable constraint, or
/// `lines.len()` on success.
fn linear_program2(
    lines: &[OrcaLine],
    radius: f32,
    opt_vel: Vec2,
    direction_opt: bool,
    result: &mut Vec2,
) -> usize {
    *result = if direction_opt {
        // opt_vel is a unit direction in this mode
        opt_vel * radius
    } else if opt_vel.length_squared() > radius * radius {
        opt_vel.normalize_or_zero() * radius
    } else {
        opt_vel
    };

    for (i, line) in lines.iter().enumerate() {
        if det_2d(line.dir, line.point - *result) > 0.0 {
            let saved = *result;
            if !linear_program1(lines, i, radius, opt_vel, direction_opt, result) {
                *result = saved;
                return i;
            }
        }
    }
    lines.len()
}

/// Bounded relaxation when the program is infeasible: obstacle lines
/// stay inviolable, agent lines give way by the least penetration.
fn linear_program3(
    lines: &[OrcaLine],
    obstacle_lines: usize,
    begin_line: usize,
    radius: f32,
    result: &mut Vec2,
) {
    let mut distance = 0.0f32;
    for i in begin_line..lines.len() {
        if det_2d(lines[i].dir, lines[i].point - *result) <= distance {
            continue;
        }
        let mut proj_lines: Vec<OrcaLine> = lines[..obstacle_lines].to_vec();
        for j in obstacle_lines..i {
            let denominator = det_2d(lines[i].dir, lines[j].dir);
            let point = if denominator.abs() <= EPS {
                if lines[i].dir.dot(lines[j].dir) > 0.0 {
                    continue; // parallel, same direction
                }
                0.5 * (lines[i].point + lines[j].point)
            } else {
                lines[i].point
                    + (det_2d(lines[j].dir, lines[i].point - lines[j].point) / denominator)
                        * lines[i].dir
            };
            proj_lines.push(OrcaLine {
                point,
                dir: (lines[j].dir - lines[i].dir).normalize_or_zero(),
            });
        }

        let saved = *result;
        if linear_program2(
            &proj_lines,
            radius,
            perp(lines[i].dir),
            true,
            result,
        ) < proj_lines.len()
        {
            // Should not happen by construction; keep the last feasible
            // point if it does
            *result = saved;
        }
        distance = det_2d(lines[i].dir, lines[i].point - *result);
    }
}
