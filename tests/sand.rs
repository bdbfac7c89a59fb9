// FluxSand - Sand Automaton Tests

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fluxsand::config::{CHAMBER_CAPACITY, GRID_SIZE};
use fluxsand::sand::{Chamber, Hourglass, SandGrid};

fn random_grid(rng: &mut StdRng, grains: usize) -> SandGrid {
    let mut grid = SandGrid::new();
    while grid.count() < grains {
        let (r, c) = (rng.gen_range(0..GRID_SIZE), rng.gen_range(0..GRID_SIZE));
        grid.set(r as isize, c as isize, true);
    }
    grid
}

/// Bottom half of the chamber packed solid.
fn full_upper() -> SandGrid {
    let mut grid = SandGrid::new();
    for r in GRID_SIZE / 2..GRID_SIZE {
        for c in 0..GRID_SIZE {
            grid.set(r as isize, c as isize, true);
        }
    }
    assert_eq!(grid.count(), CHAMBER_CAPACITY);
    grid
}

#[test]
fn steps_conserve_grains_and_never_collide() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut grid = random_grid(&mut rng, 90);
    for i in 0..500 {
        let gravity = rng.gen_range(0.0..360.0);
        let before = grid;
        let moves = grid.plan(gravity, &mut rng);

        let targets: HashSet<_> = moves.iter().map(|m| (m.to_r, m.to_c)).collect();
        assert_eq!(targets.len(), moves.len(), "step {i}: shared destination");
        for m in &moves {
            assert!(before.get(m.from_r as isize, m.from_c as isize));
            assert!(!before.get(m.to_r as isize, m.to_c as isize), "step {i}: moved into a grain");
            assert!(m.from_r.abs_diff(m.to_r) <= 1 && m.from_c.abs_diff(m.to_c) <= 1);
        }

        grid.apply(&moves);
        assert_eq!(grid.count(), 90, "step {i}");
    }
}

#[test]
fn same_seed_same_animation() {
    let mut a = Hourglass::from_grids(full_upper(), SandGrid::new(), Some(42));
    let mut b = Hourglass::from_grids(full_upper(), SandGrid::new(), Some(42));
    for i in 0..300 {
        let gravity = (i * 7 % 360) as f32;
        a.transfer(gravity);
        b.transfer(gravity);
        assert_eq!(a.step(gravity), b.step(gravity));
        assert_eq!(a.snapshot(), b.snapshot(), "step {i}");
    }
}

#[test]
fn zero_gravity_settles_against_row_zero() {
    let mut glass = Hourglass::from_grids(full_upper(), SandGrid::new(), Some(7));
    for _ in 0..10_000 {
        glass.step_chamber(Chamber::Upper, 0.0);
        assert_eq!(glass.count(Chamber::Upper), CHAMBER_CAPACITY);
        assert_eq!(glass.count(Chamber::Lower), 0);
    }

    let upper = glass.upper();
    assert!(upper.get(0, 0));
    for r in 0..GRID_SIZE as isize {
        for c in 0..GRID_SIZE as isize {
            if !upper.get(r, c) {
                continue;
            }
            // Nothing left to fall into towards the corner.
            assert!(r == 0 || upper.get(r - 1, c), "gap above ({r}, {c})");
            assert!(c == 0 || upper.get(r, c - 1), "gap left of ({r}, {c})");
        }
    }
}

#[test]
fn transfer_moves_one_grain_through_the_waist() {
    let mut upper = SandGrid::new();
    upper.set(0, 0, true);
    let mut glass = Hourglass::from_grids(upper, SandGrid::new(), Some(1));

    assert!(glass.transfer(45.0));
    assert!(!glass.upper().get(0, 0));
    assert!(glass.lower().get(15, 15));
    assert_eq!(glass.count(Chamber::Upper) + glass.count(Chamber::Lower), 1);

    // Nothing left at the upper end of the waist.
    assert!(!glass.transfer(45.0));
}

#[test]
fn blocked_entry_refuses_transfer() {
    let mut upper = SandGrid::new();
    let mut lower = SandGrid::new();
    upper.set(0, 0, true);
    lower.set(15, 15, true);
    let mut glass = Hourglass::from_grids(upper, lower, None);
    assert!(!glass.transfer(10.0));
    assert_eq!(glass.snapshot(), (upper, lower));
}
