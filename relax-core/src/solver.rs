//! The relaxation solver driver.
//!
//! Orchestrates the per-step protocol every constraint and force relies on:
//!
//! ```text
//! For each substep:
//!   1. Clear force/torque sums, evaluate forces, integrate velocities
//!   2. Predict positions/rotations from velocities
//!   3. For each iteration:
//!      a. Reset the shared accumulator
//!      b. calculate() every constraint   (parallel across constraints)
//!      c. apply() every constraint       (serialized)
//!      d. Integrate each particle's resolved blended correction
//!      e. Early-out when summed energy falls below tolerance
//!   4. Update velocities from position change, damp, clamp
//! ```
//!
//! The calculate phase may fan out across rayon workers because constraints
//! only read shared particle state there; the apply phase mutates the shared
//! accumulator and is therefore run single-threaded. Order between
//! constraints is irrelevant in both phases: calculate never mutates shared
//! state, and the accumulator's weighted blend is commutative.

use nalgebra::{Point3, UnitQuaternion};
use rayon::prelude::*;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::accumulator::DeltaAccumulator;
use crate::constraint::{Constraint, Energy};
use crate::error::{Result, SolveError};
use crate::particle::ParticleSystem;

/// Configuration for the relaxation solver.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Constraint projection iterations per substep. More iterations give
    /// stiffer constraint satisfaction. Typical range: 4-50.
    pub iterations: u32,

    /// Substeps per step. More substeps improve stability under large
    /// forces. Typical range: 1-4.
    pub substeps: u32,

    /// Velocity damping per substep, in `[0, 1]`. 0 = none, 1 = full.
    pub damping: f64,

    /// Summed-energy threshold below which iteration stops early.
    pub tolerance: f64,

    /// Maximum particle speed (prevents explosion). `f64::INFINITY`
    /// disables the clamp.
    pub max_velocity: f64,

    /// Run the calculate phase in parallel across constraints.
    pub parallel_constraints: bool,

    /// Minimum constraint count before the parallel calculate phase
    /// activates; below this, forking costs more than it saves.
    pub min_parallel_constraints: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            substeps: 1,
            damping: 0.02,
            tolerance: 1e-12,
            max_velocity: 100.0,
            parallel_constraints: true,
            min_parallel_constraints: 4,
        }
    }
}

impl SolverConfig {
    /// Config tuned for interactive rates: few iterations, mild damping.
    #[must_use]
    pub const fn realtime() -> Self {
        Self {
            iterations: 4,
            substeps: 1,
            damping: 0.02,
            tolerance: 1e-10,
            max_velocity: 50.0,
            parallel_constraints: true,
            min_parallel_constraints: 4,
        }
    }

    /// Config tuned for accuracy: many iterations, several substeps.
    #[must_use]
    pub const fn accurate() -> Self {
        Self {
            iterations: 40,
            substeps: 4,
            damping: 0.005,
            tolerance: 1e-14,
            max_velocity: 200.0,
            parallel_constraints: true,
            min_parallel_constraints: 4,
        }
    }

    /// Config for static form-finding: heavy damping drains kinetic energy
    /// so the system settles into constraint equilibrium.
    #[must_use]
    pub const fn form_finding() -> Self {
        Self {
            iterations: 30,
            substeps: 1,
            damping: 0.3,
            tolerance: 1e-12,
            max_velocity: 100.0,
            parallel_constraints: true,
            min_parallel_constraints: 4,
        }
    }
}

/// Statistics from the last solver step.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverStats {
    /// Iterations actually run in the last substep.
    pub iterations_used: u32,
    /// Summed position-correction magnitude after the last iteration.
    pub linear_energy: f64,
    /// Summed rotation-correction magnitude after the last iteration.
    pub angular_energy: f64,
    /// Whether the last substep hit the energy tolerance before exhausting
    /// its iterations.
    pub converged: bool,
    /// Number of geometric constraints evaluated.
    pub constraint_count: usize,
    /// Number of forces evaluated.
    pub force_count: usize,
}

/// Drives constraints and forces against a particle store.
///
/// Forces and geometric constraints are passed as separate lists because
/// they follow different accumulation disciplines: forces are evaluated once
/// per substep and superpose additively into the force/torque sums, while
/// geometric constraints are iterated and blend through the weighted
/// accumulator.
#[derive(Default)]
pub struct Solver {
    config: SolverConfig,
    stats: SolverStats,
    accumulator: DeltaAccumulator,
}

impl Solver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            stats: SolverStats::default(),
            accumulator: DeltaAccumulator::new(),
        }
    }

    /// Get the solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replace the solver configuration.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Statistics from the last step.
    #[must_use]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Initialize every constraint and force against `system`.
    ///
    /// Must be called once before the first step and again after any
    /// index/topology change.
    ///
    /// # Errors
    ///
    /// Propagates the first structural wiring error ([`SolveError::Setup`]).
    pub fn initialize(
        &mut self,
        system: &ParticleSystem,
        constraints: &mut [Box<dyn Constraint>],
        forces: &mut [Box<dyn Constraint>],
    ) -> Result<()> {
        for constraint in constraints.iter_mut().chain(forces.iter_mut()) {
            constraint.initialize(system)?;
        }
        Ok(())
    }

    /// Advance the system by `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::InvalidTimestep`] for a non-positive or
    /// non-finite `dt`, and [`SolveError::Diverged`] if particle state
    /// leaves the finite range.
    pub fn step(
        &mut self,
        system: &mut ParticleSystem,
        constraints: &mut [Box<dyn Constraint>],
        forces: &mut [Box<dyn Constraint>],
        dt: f64,
    ) -> Result<SolverStats> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolveError::InvalidTimestep(dt));
        }

        let substeps = self.config.substeps.max(1);
        let sub_dt = dt / f64::from(substeps);

        for _ in 0..substeps {
            self.substep(system, constraints, forces, sub_dt);
        }

        if !system.is_finite() {
            return Err(SolveError::diverged("non-finite particle state"));
        }

        Ok(self.stats)
    }

    fn substep(
        &mut self,
        system: &mut ParticleSystem,
        constraints: &mut [Box<dyn Constraint>],
        forces: &mut [Box<dyn Constraint>],
        dt: f64,
    ) {
        // 1. Force phase: forces superpose into the per-particle sums.
        system.clear_force_sums();
        self.accumulator.reset(system);
        {
            let frozen: &ParticleSystem = system;
            for force in forces.iter_mut() {
                force.calculate(frozen);
            }
        }
        for force in forces.iter() {
            force.apply(system, &mut self.accumulator);
        }

        for p in system.positions_mut() {
            if p.inverse_mass > 0.0 {
                p.velocity += p.force_sum * p.inverse_mass * dt;
            }
        }
        for r in system.rotations_mut() {
            if r.inverse_inertia > 0.0 {
                r.angular_velocity += r.torque_sum * r.inverse_inertia * dt;
            }
        }

        // 2. Predict from velocities.
        let prev_positions: Vec<Point3<f64>> =
            system.positions().iter().map(|p| p.current).collect();
        let prev_rotations: Vec<UnitQuaternion<f64>> =
            system.rotations().iter().map(|r| r.current).collect();

        for p in system.positions_mut() {
            if p.inverse_mass > 0.0 {
                p.current += p.velocity * dt;
            }
        }
        for r in system.rotations_mut() {
            if r.inverse_inertia > 0.0 {
                r.current = UnitQuaternion::from_scaled_axis(r.angular_velocity * dt) * r.current;
            }
        }

        // 3. Constraint projection.
        let mut energy = Energy::ZERO;
        let mut iterations_used = 0;
        let mut converged = constraints.is_empty();

        for iteration in 0..self.config.iterations.max(1) {
            iterations_used = iteration + 1;
            self.accumulator.reset(system);

            // Calculate: read-only on the store, each constraint writes its
            // own buffers. Order-independent, so fan out when worthwhile.
            {
                let frozen: &ParticleSystem = system;
                if self.config.parallel_constraints
                    && constraints.len() >= self.config.min_parallel_constraints
                {
                    constraints
                        .par_iter_mut()
                        .for_each(|c| c.calculate(frozen));
                } else {
                    for c in constraints.iter_mut() {
                        c.calculate(frozen);
                    }
                }
            }

            // Apply: mutates the shared accumulator, kept single-threaded.
            for c in constraints.iter() {
                c.apply(system, &mut self.accumulator);
            }

            // Integrate blended corrections.
            let accumulator = &self.accumulator;
            for (i, p) in system.positions_mut().iter_mut().enumerate() {
                if p.inverse_mass > 0.0 {
                    p.current += accumulator.resolve(i);
                }
            }
            for (j, r) in system.rotations_mut().iter_mut().enumerate() {
                if r.inverse_inertia > 0.0 {
                    let axis_angle = accumulator.resolve_angular(j);
                    if axis_angle.norm_squared() > 0.0 {
                        r.current = UnitQuaternion::from_scaled_axis(axis_angle) * r.current;
                    }
                }
            }

            energy = constraints.iter().map(|c| c.energy()).sum();
            trace!(
                iteration,
                linear = energy.linear,
                angular = energy.angular,
                "relaxation iteration"
            );

            if energy.total() <= self.config.tolerance {
                converged = true;
                debug!(
                    iterations = iterations_used,
                    energy = energy.total(),
                    "relaxation converged"
                );
                break;
            }
        }

        // 4. Velocities from position change, damped and clamped.
        let keep = 1.0 - self.config.damping;
        for (i, p) in system.positions_mut().iter_mut().enumerate() {
            if p.inverse_mass > 0.0 {
                p.velocity = (p.current - prev_positions[i]) / dt * keep;
                let speed = p.velocity.norm();
                if speed > self.config.max_velocity {
                    p.velocity *= self.config.max_velocity / speed;
                }
            }
        }
        for (j, r) in system.rotations_mut().iter_mut().enumerate() {
            if r.inverse_inertia > 0.0 {
                let delta = r.current * prev_rotations[j].inverse();
                r.angular_velocity = delta.scaled_axis() / dt * keep;
            }
        }

        self.stats = SolverStats {
            iterations_used,
            linear_energy: energy.linear,
            angular_energy: energy.angular,
            converged,
            constraint_count: constraints.len(),
            force_count: forces.len(),
        };
    }
}
