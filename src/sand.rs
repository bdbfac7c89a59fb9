// FluxSand - Sand Automaton
//
// Two 16x16 chambers of anonymous grains.  Each step every grain picks at
// most one empty neighbour, the one best aligned with gravity inside a
// noisy acceptance cone; a reservation map keeps destinations unique so the
// moves can be applied in any order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{
    GRID_SIZE, SAND_ACCEPT_ANGLE_DEG, SAND_GRAVITY_OFFSET_DEG, SAND_NOISE_DEG,
};
use crate::math::CyclicAngle;

/// Neighbour offsets as (dr, dc), in tie-break order.
const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Entry cell for new grains and the lower end of the waist.
const ENTRY: (usize, usize) = (GRID_SIZE - 1, GRID_SIZE - 1);
/// Upper end of the waist.
const EXIT: (usize, usize) = (0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from_r: usize,
    pub from_c: usize,
    pub to_r: usize,
    pub to_c: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chamber {
    Upper,
    Lower,
}

/// Bottom row first; within a row the centre column, then alternating
/// left/right outwards.
pub fn visit_order() -> impl Iterator<Item = (usize, usize)> {
    let center = GRID_SIZE / 2;
    (0..GRID_SIZE).rev().flat_map(move |r| {
        std::iter::once(center)
            .chain((1..GRID_SIZE).flat_map(move |offset| {
                let left = center.checked_sub(offset);
                let right = Some(center + offset).filter(|&c| c < GRID_SIZE);
                left.into_iter().chain(right)
            }))
            .map(move |c| (r, c))
    })
}

/// Sand direction for an AHRS roll angle.
pub fn gravity_from_roll(roll: CyclicAngle) -> f32 {
    (630.0 - roll.degrees()).rem_euclid(360.0)
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SandGrid {
    cells: [[bool; GRID_SIZE]; GRID_SIZE],
}

impl SandGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Out-of-bounds reads as empty.
    pub fn get(&self, r: isize, c: isize) -> bool {
        Self::index(r, c).map_or(false, |(r, c)| self.cells[r][c])
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, r: isize, c: isize, value: bool) {
        if let Some((r, c)) = Self::index(r, c) {
            self.cells[r][c] = value;
        }
    }

    pub fn rows(&self) -> &[[bool; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v).count()
    }

    pub fn clear(&mut self) {
        self.cells = [[false; GRID_SIZE]; GRID_SIZE];
    }

    /// Drop a grain on the entry cell if it is free.
    pub fn add_grain(&mut self) -> bool {
        let (r, c) = ENTRY;
        if self.cells[r][c] {
            return false;
        }
        self.cells[r][c] = true;
        true
    }

    /// Place a grain on a random empty cell adjacent to an existing one.
    pub fn add_grain_near_existing<R: Rng>(&mut self, rng: &mut R) -> bool {
        let mut candidates = Vec::new();
        for r in 0..GRID_SIZE {
            for c in 0..GRID_SIZE {
                if !self.cells[r][c] {
                    continue;
                }
                for (dr, dc) in DIRECTIONS {
                    let (nr, nc) = (r as isize + dr, c as isize + dc);
                    if let Some(cell) = Self::index(nr, nc) {
                        if !self.cells[cell.0][cell.1] {
                            candidates.push(cell);
                        }
                    }
                }
            }
        }
        if candidates.is_empty() {
            return false;
        }
        let (r, c) = candidates[rng.gen_range(0..candidates.len())];
        self.cells[r][c] = true;
        true
    }

    /// Choose this tick's moves without touching the grid.
    pub fn plan<R: Rng>(&self, gravity_deg: f32, rng: &mut R) -> Vec<Move> {
        let angle = (gravity_deg + SAND_GRAVITY_OFFSET_DEG).rem_euclid(360.0).to_radians();
        let (gy, gx) = angle.sin_cos();

        let mut reserved = [[false; GRID_SIZE]; GRID_SIZE];
        let mut moves = Vec::new();

        for (r, c) in visit_order() {
            if !self.cells[r][c] {
                continue;
            }

            let noise = rng.gen_range(-SAND_NOISE_DEG..=SAND_NOISE_DEG);
            let cos_threshold = (SAND_ACCEPT_ANGLE_DEG + noise).to_radians().cos();

            let mut best: Option<((usize, usize), f32)> = None;
            for (dr, dc) in DIRECTIONS {
                let Some((nr, nc)) = Self::index(r as isize + dr, c as isize + dc) else {
                    continue;
                };
                if self.cells[nr][nc] {
                    continue;
                }
                let (vx, vy) = (dc as f32, dr as f32);
                let len = (vx * vx + vy * vy).sqrt();
                let dot = (vx * gx + vy * gy) / len;
                if dot > cos_threshold && best.map_or(true, |(_, d)| dot > d) {
                    best = Some(((nr, nc), dot));
                }
            }

            if let Some(((nr, nc), _)) = best {
                if !reserved[nr][nc] {
                    reserved[nr][nc] = true;
                    moves.push(Move {
                        from_r: r,
                        from_c: c,
                        to_r: nr,
                        to_c: nc,
                    });
                }
            }
        }
        moves
    }

    pub fn apply(&mut self, moves: &[Move]) {
        for m in moves {
            self.cells[m.from_r][m.from_c] = false;
            self.cells[m.to_r][m.to_c] = true;
        }
    }

    pub fn step<R: Rng>(&mut self, gravity_deg: f32, rng: &mut R) -> Vec<Move> {
        let moves = self.plan(gravity_deg, rng);
        self.apply(&moves);
        moves
    }

    fn index(r: isize, c: isize) -> Option<(usize, usize)> {
        let n = GRID_SIZE as isize;
        ((0..n).contains(&r) && (0..n).contains(&c)).then(|| (r as usize, c as usize))
    }
}

/// Pass one grain through the waist.  Gravity in `[0, 90)` or `(270, 360)`
/// drains upper into lower, `(90, 270)` drains back; the two horizontal
/// directions move nothing.
pub fn transfer(upper: &mut SandGrid, lower: &mut SandGrid, gravity_deg: f32) -> bool {
    let g = gravity_deg.rem_euclid(360.0);
    let (er, ec) = EXIT;
    let (nr, nc) = ENTRY;

    if g < 90.0 || g > 270.0 {
        if upper.cells[er][ec] && !lower.cells[nr][nc] {
            upper.cells[er][ec] = false;
            lower.cells[nr][nc] = true;
            return true;
        }
    } else if g > 90.0 && g < 270.0 && lower.cells[nr][nc] && !upper.cells[er][ec] {
        lower.cells[nr][nc] = false;
        upper.cells[er][ec] = true;
        return true;
    }
    false
}

// ---------------------------------------------------------------------------
// Hourglass
// ---------------------------------------------------------------------------

/// Both chambers plus the noise source.
pub struct Hourglass {
    upper: SandGrid,
    lower: SandGrid,
    rng: StdRng,
}

impl Hourglass {
    /// A fixed seed makes every step reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            upper: SandGrid::new(),
            lower: SandGrid::new(),
            rng,
        }
    }

    pub fn from_grids(upper: SandGrid, lower: SandGrid, seed: Option<u64>) -> Self {
        Self {
            upper,
            lower,
            ..Self::new(seed)
        }
    }

    pub fn upper(&self) -> &SandGrid {
        &self.upper
    }

    pub fn lower(&self) -> &SandGrid {
        &self.lower
    }

    pub fn grid(&self, chamber: Chamber) -> &SandGrid {
        match chamber {
            Chamber::Upper => &self.upper,
            Chamber::Lower => &self.lower,
        }
    }

    /// New grain on the upper chamber's entry cell.
    pub fn add_grain(&mut self) -> bool {
        self.upper.add_grain()
    }

    pub fn add_grain_near_existing(&mut self, chamber: Chamber) -> bool {
        let Self { upper, lower, rng } = self;
        match chamber {
            Chamber::Upper => upper.add_grain_near_existing(rng),
            Chamber::Lower => lower.add_grain_near_existing(rng),
        }
    }

    pub fn step_chamber(&mut self, chamber: Chamber, gravity_deg: f32) -> Vec<Move> {
        let Self { upper, lower, rng } = self;
        let grid = match chamber {
            Chamber::Upper => upper,
            Chamber::Lower => lower,
        };
        grid.step(gravity_deg, rng)
    }

    /// Step both chambers, upper first.  Returns the number of grains moved.
    pub fn step(&mut self, gravity_deg: f32) -> usize {
        self.step_chamber(Chamber::Upper, gravity_deg).len()
            + self.step_chamber(Chamber::Lower, gravity_deg).len()
    }

    pub fn transfer(&mut self, gravity_deg: f32) -> bool {
        transfer(&mut self.upper, &mut self.lower, gravity_deg)
    }

    pub fn clear(&mut self) {
        self.upper.clear();
        self.lower.clear();
    }

    pub fn count(&self, chamber: Chamber) -> usize {
        self.grid(chamber).count()
    }

    /// Copies of both chambers taken at the same instant.
    pub fn snapshot(&self) -> (SandGrid, SandGrid) {
        (self.upper, self.lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn visit_order_is_bottom_up_center_out() {
        let order: Vec<_> = visit_order().collect();
        assert_eq!(order.len(), GRID_SIZE * GRID_SIZE);
        assert_eq!(order.iter().collect::<HashSet<_>>().len(), GRID_SIZE * GRID_SIZE);
        assert_eq!(&order[..5], &[(15, 8), (15, 7), (15, 9), (15, 6), (15, 10)]);
        assert_eq!(order[15], (15, 0));
        assert_eq!(order[16], (14, 8));
        assert_eq!(*order.last().unwrap(), (0, 0));
    }

    #[test]
    fn out_of_bounds_is_ignored() {
        let mut g = SandGrid::new();
        g.set(-1, 3, true);
        g.set(3, 16, true);
        assert_eq!(g.count(), 0);
        assert!(!g.get(16, 0));
    }

    #[test]
    fn single_grain_falls_towards_origin_at_zero_gravity() {
        let mut g = SandGrid::new();
        g.set(5, 5, true);
        let mut rng = StdRng::seed_from_u64(1);
        let moves = g.step(0.0, &mut rng);
        assert_eq!(
            moves,
            vec![Move {
                from_r: 5,
                from_c: 5,
                to_r: 4,
                to_c: 4
            }]
        );
    }

    #[test]
    fn add_grain_fills_entry_once() {
        let mut g = SandGrid::new();
        assert!(g.add_grain());
        assert!(!g.add_grain());
        assert!(g.get(15, 15));
    }

    #[test]
    fn add_near_existing_touches_a_grain() {
        let mut g = SandGrid::new();
        g.set(7, 7, true);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(g.add_grain_near_existing(&mut rng));
        assert_eq!(g.count(), 2);
        let neighbours = DIRECTIONS.iter().filter(|(dr, dc)| g.get(7 + dr, 7 + dc)).count();
        assert_eq!(neighbours, 1);
        assert!(!SandGrid::new().add_grain_near_existing(&mut rng));
    }

    #[test]
    fn transfer_directions() {
        let mut up = SandGrid::new();
        let mut down = SandGrid::new();
        up.set(0, 0, true);
        assert!(!transfer(&mut up, &mut down, 180.0));
        assert!(!transfer(&mut up, &mut down, 90.0));
        assert!(transfer(&mut up, &mut down, 300.0));
        assert!(down.get(15, 15) && !up.get(0, 0));
        assert!(!transfer(&mut up, &mut down, 270.0));
        assert!(transfer(&mut up, &mut down, 180.0));
        assert!(up.get(0, 0) && !down.get(15, 15));
    }

    #[test]
    fn gravity_from_roll_wraps() {
        assert!((gravity_from_roll(CyclicAngle::new(0.0)) - 270.0).abs() < 1e-3);
        assert!((gravity_from_roll(CyclicAngle::from_degrees(180.0)) - 90.0).abs() < 1e-3);
        assert!((gravity_from_roll(CyclicAngle::from_degrees(300.0)) - 330.0).abs() < 1e-3);
    }
}
