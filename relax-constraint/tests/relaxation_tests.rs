//! End-to-end tests of constraints driving the solver: blending,
//! mass-weighting, convergence, and parallel determinism.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

use relax_constraint::{
    Cocircular, Colinear, Coplanar, Cospherical, Distance, GravityLoad, OnPlane, OnPosition,
    Smooth,
};
use relax_core::{Constraint, ParticleSystem, Solver, SolverConfig};
use relax_types::{Plane, Weight};

fn step_n(
    solver: &mut Solver,
    system: &mut ParticleSystem,
    constraints: &mut [Box<dyn Constraint>],
    forces: &mut [Box<dyn Constraint>],
    steps: usize,
) {
    for _ in 0..steps {
        solver
            .step(system, constraints, forces, 1.0 / 60.0)
            .expect("step should succeed");
    }
}

#[test]
fn conflicting_anchors_blend_by_weight() {
    // Anchors at +x (weight 1) and -x (weight 3) fight over one particle;
    // the equilibrium is the weighted average of the two pulls.
    let mut system = ParticleSystem::new();
    system.add_particle(Point3::origin(), 1.0).unwrap();

    let mut constraints: Vec<Box<dyn Constraint>> = vec![
        Box::new(OnPosition::anchor(
            0,
            Point3::new(1.0, 0.0, 0.0),
            Weight::ONE,
        )),
        Box::new(OnPosition::anchor(
            0,
            Point3::new(-1.0, 0.0, 0.0),
            Weight::new(3.0).unwrap(),
        )),
    ];

    let mut solver = Solver::new(SolverConfig::form_finding());
    solver.initialize(&system, &mut constraints, &mut []).unwrap();
    step_n(&mut solver, &mut system, &mut constraints, &mut [], 200);

    assert_relative_eq!(system.positions()[0].current.x, -0.5, epsilon = 1e-6);
    assert_relative_eq!(system.positions()[0].current.y, 0.0, epsilon = 1e-9);
}

#[test]
fn distance_converges_from_double_separation() {
    let mut system = ParticleSystem::new();
    system.add_particle(Point3::new(-1.0, 0.0, 0.0), 1.0).unwrap();
    system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

    let rest_length = 1.0;
    let mut constraints: Vec<Box<dyn Constraint>> = vec![Box::new(
        Distance::with_rest_length(vec![[0, 1]], rest_length, Weight::ONE).unwrap(),
    )];

    let mut solver = Solver::new(SolverConfig::form_finding());
    solver.initialize(&system, &mut constraints, &mut []).unwrap();
    step_n(&mut solver, &mut system, &mut constraints, &mut [], 300);

    let separation =
        (system.positions()[1].current - system.positions()[0].current).norm();
    assert_relative_eq!(separation, rest_length, epsilon = 1e-6);

    // Equal masses: the correction was symmetric, so the midpoint held.
    let midpoint = (system.positions()[0].current.coords
        + system.positions()[1].current.coords)
        / 2.0;
    assert_relative_eq!(midpoint.norm(), 0.0, epsilon = 1e-9);
}

#[test]
fn infinite_mass_takes_no_correction() {
    let mut system = ParticleSystem::new();
    system.add_fixed_particle(Point3::origin());
    system.add_particle(Point3::new(2.0, 0.0, 0.0), 1.0).unwrap();

    let mut constraints: Vec<Box<dyn Constraint>> = vec![Box::new(
        Distance::with_rest_length(vec![[0, 1]], 1.0, Weight::ONE).unwrap(),
    )];

    let mut solver = Solver::new(SolverConfig::form_finding());
    solver.initialize(&system, &mut constraints, &mut []).unwrap();
    step_n(&mut solver, &mut system, &mut constraints, &mut [], 200);

    // The fixed particle never moved; the free one did all the closing.
    assert_relative_eq!(system.positions()[0].current.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(system.positions()[1].current.x, 1.0, epsilon = 1e-6);
}

#[test]
fn hanging_chain_sags_under_gravity() {
    // A chain of 9 light segments between two anchors at equal height.
    let count = 10;
    let mut system = ParticleSystem::new();
    for i in 0..count {
        let x = f64::from(i) / f64::from(count - 1);
        let position = Point3::new(x, 0.0, 1.0);
        if i == 0 || i == count - 1 {
            system.add_fixed_particle(position);
        } else {
            system.add_particle(position, 0.05).unwrap();
        }
    }

    let pairs: Vec<[usize; 2]> = (0..count as usize - 1).map(|i| [i, i + 1]).collect();
    let mut constraints: Vec<Box<dyn Constraint>> = vec![Box::new(
        Distance::new(pairs, Weight::new(5.0).unwrap()),
    )];
    let free: Vec<usize> = (1..count as usize - 1).collect();
    let mut forces: Vec<Box<dyn Constraint>> = vec![Box::new(GravityLoad::earth(free))];

    let mut solver = Solver::new(SolverConfig::form_finding());
    solver
        .initialize(&system, &mut constraints, &mut forces)
        .unwrap();
    step_n(&mut solver, &mut system, &mut constraints, &mut forces, 600);

    // Anchors held, middle sagged, shape symmetric about the middle.
    assert_relative_eq!(system.positions()[0].current.z, 1.0, epsilon = 1e-12);
    let middle = system.positions()[count as usize / 2].current;
    assert!(middle.z < 0.99);
    let mirror_left = system.positions()[2].current.z;
    let mirror_right = system.positions()[count as usize - 3].current.z;
    assert_relative_eq!(mirror_left, mirror_right, epsilon = 1e-4);
}

#[test]
fn flat_net_relaxes_onto_plane_target() {
    // A bumpy line of particles pulled flat by a plane target while springs
    // keep the spacing; both constraint families cooperate.
    let mut system = ParticleSystem::new();
    for i in 0..5 {
        let z = if i % 2 == 0 { 0.3 } else { -0.2 };
        system
            .add_particle(Point3::new(f64::from(i), 0.0, z), 1.0)
            .unwrap();
    }

    let plane = Plane::from_point_normal(Point3::origin(), Vector3::z()).unwrap();
    let pairs: Vec<[usize; 2]> = (0..4).map(|i| [i, i + 1]).collect();
    let mut constraints: Vec<Box<dyn Constraint>> = vec![
        Box::new(OnPlane::uniform((0..5).collect(), plane, Weight::new(2.0).unwrap())),
        Box::new(Distance::with_rest_length(pairs, 1.0, Weight::ONE).unwrap()),
    ];

    let mut solver = Solver::new(SolverConfig::form_finding());
    solver.initialize(&system, &mut constraints, &mut []).unwrap();
    step_n(&mut solver, &mut system, &mut constraints, &mut [], 400);

    for record in system.positions() {
        assert_relative_eq!(record.current.z, 0.0, epsilon = 1e-5);
    }
    let separation =
        (system.positions()[1].current - system.positions()[0].current).norm();
    assert_relative_eq!(separation, 1.0, epsilon = 1e-4);
}

/// Build a system plus a mixed constraint set, optionally with every
/// parallelism toggle on.
fn mixed_setup(parallel: bool) -> (ParticleSystem, Vec<Box<dyn Constraint>>) {
    let mut system = ParticleSystem::new();
    let n = 24;
    for i in 0..n {
        let angle = f64::from(i) * std::f64::consts::TAU / f64::from(n);
        system
            .add_particle(
                Point3::new(
                    angle.cos() + 0.01 * f64::from(i),
                    angle.sin(),
                    0.02 * f64::from(i % 5),
                ),
                1.0,
            )
            .unwrap();
    }

    let ring_pairs: Vec<[usize; 2]> = (0..n as usize)
        .map(|i| [i, (i + 1) % n as usize])
        .collect();
    let all: Vec<usize> = (0..n as usize).collect();
    let stars: Vec<Vec<usize>> = (0..n as usize)
        .map(|i| {
            vec![
                i,
                (i + n as usize - 1) % n as usize,
                (i + 1) % n as usize,
            ]
        })
        .collect();

    let constraints: Vec<Box<dyn Constraint>> = vec![
        Box::new(Distance::new(ring_pairs, Weight::ONE).parallel(parallel)),
        Box::new(Coplanar::new([all.clone()], Weight::ONE).parallel(parallel)),
        Box::new(Cocircular::new([all.clone()], Weight::ONE).parallel(parallel)),
        Box::new(Colinear::new([vec![0, 1, 2, 3]], Weight::ONE).parallel(parallel)),
        Box::new(Cospherical::new([all], Weight::ONE).parallel(parallel)),
        Box::new(Smooth::new(stars, Weight::ONE).parallel(parallel)),
    ];
    (system, constraints)
}

#[test]
fn parallel_and_sequential_runs_are_identical() {
    let (mut sequential_system, mut sequential_constraints) = mixed_setup(false);
    let (mut parallel_system, mut parallel_constraints) = mixed_setup(true);

    let mut sequential_solver = Solver::new(SolverConfig {
        parallel_constraints: false,
        ..SolverConfig::default()
    });
    let mut parallel_solver = Solver::new(SolverConfig {
        parallel_constraints: true,
        min_parallel_constraints: 2,
        ..SolverConfig::default()
    });

    sequential_solver
        .initialize(&sequential_system, &mut sequential_constraints, &mut [])
        .unwrap();
    parallel_solver
        .initialize(&parallel_system, &mut parallel_constraints, &mut [])
        .unwrap();

    step_n(
        &mut sequential_solver,
        &mut sequential_system,
        &mut sequential_constraints,
        &mut [],
        25,
    );
    step_n(
        &mut parallel_solver,
        &mut parallel_system,
        &mut parallel_constraints,
        &mut [],
        25,
    );

    // Calculate never mutates shared state and apply is serialized in list
    // order, so scheduling cannot change the arithmetic: bit-for-bit equal.
    for (sequential, parallel) in sequential_system
        .positions()
        .iter()
        .zip(parallel_system.positions())
    {
        assert_eq!(sequential.current, parallel.current);
        assert_eq!(sequential.velocity, parallel.velocity);
    }
}

#[test]
fn satisfied_constraints_report_zero_energy_and_converge() {
    let mut system = ParticleSystem::new();
    system.add_particle(Point3::origin(), 1.0).unwrap();
    system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

    // Rest length equals current separation: nothing to do.
    let mut constraints: Vec<Box<dyn Constraint>> = vec![Box::new(
        Distance::with_rest_length(vec![[0, 1]], 1.0, Weight::ONE).unwrap(),
    )];

    let mut solver = Solver::default();
    solver.initialize(&system, &mut constraints, &mut []).unwrap();
    let stats = solver
        .step(&mut system, &mut constraints, &mut [], 1.0 / 60.0)
        .unwrap();

    assert!(stats.converged);
    assert_eq!(stats.linear_energy, 0.0);
    // Converged on the first pass rather than burning all iterations.
    assert_eq!(stats.iterations_used, 1);
}
