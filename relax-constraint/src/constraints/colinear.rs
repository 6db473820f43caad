//! Colinearity constraints.

use relax_core::fit::fit_line;
use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// Pulls each element's particles onto their best-fit line.
///
/// The line is refit from the current positions on every calculate pass;
/// each particle's correction is the rejection onto the fit. Groups with
/// fewer than 2 points, or whose points all coincide (no fit direction),
/// contribute nothing.
#[derive(Debug)]
pub struct Colinear {
    batch: ElementBatch,
}

impl Colinear {
    /// Create from particle groups, one element per group.
    #[must_use]
    pub fn new<G: AsRef<[usize]>>(groups: impl IntoIterator<Item = G>, weight: Weight) -> Self {
        Self {
            batch: ElementBatch::from_groups(groups, weight),
        }
    }

    /// Enable chunked parallel evaluation of the groups.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.batch.set_parallel(parallel);
        self
    }
}

impl Constraint for Colinear {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.batch.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();

        self.batch.calculate_each(|_, element, indices, deltas| {
            if indices.len() < 2 {
                return;
            }
            let points: Vec<_> = indices.iter().map(|&i| positions[i].current).collect();
            let Some(line) = fit_line(&points) else {
                return;
            };

            let weight = element.weight().value();
            for (local, point) in points.iter().enumerate() {
                deltas[local] = Delta::new(line.project(point) - point, weight);
            }
        });
    }

    fn apply(&self, _system: &mut ParticleSystem, accumulator: &mut DeltaAccumulator) {
        self.batch.apply(accumulator);
    }

    fn energy(&self) -> Energy {
        self.batch.energy()
    }

    fn particles(&self) -> &[usize] {
        self.batch.indices()
    }

    fn is_parallel(&self) -> bool {
        self.batch.parallel()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_off_line_point_is_rejected_onto_fit() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(-1.0, 0.0, 0.0), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();
        system.add_particle(Point3::new(0.0, 3.0, 0.0), 1.0).unwrap();

        let mut constraint = Colinear::new([vec![0, 1, 2]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        // The outlier is pulled toward the line, the line points get small
        // opposing corrections from the least-squares fit.
        let deltas = constraint.batch.deltas();
        assert!(deltas[2].correction.y < 0.0);
        assert!(constraint.energy().linear > 0.0);
    }

    #[test]
    fn test_already_colinear_is_satisfied() {
        let mut system = ParticleSystem::new();
        for i in 0..4 {
            system
                .add_particle(Point3::new(f64::from(i), 2.0 * f64::from(i), 0.0), 1.0)
                .unwrap();
        }

        let mut constraint = Colinear::new([vec![0, 1, 2, 3]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_relative_eq!(constraint.energy().linear, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_groups_contribute_nothing() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        // One point and coincident points both lack a fit direction.
        let mut constraint = Colinear::new([vec![0], vec![0, 1]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(constraint.batch.deltas().iter().all(|d| !d.is_valid()));
        assert_eq!(constraint.energy().linear, 0.0);
    }
}
