//! Hostile unit decision making
//!
//! Each hostile unit either pursues the nearest player along an A* path when
//! the player is within detection range, or wanders on a stop/go timer.
//! Firing is probabilistic so enemies fall out of lockstep with each other.
//! All randomness comes from the caller's RNG.

use glam::IVec2;
use rand::Rng;

use super::bullet::Bullet;
use super::collision::Collider;
use super::geom::{Direction, Rect};
use super::grid::Grid;
use super::pathfinding::find_path;
use super::state::IdGen;
use super::tank::Tank;
use crate::consts::TANK_SIZE;
use crate::settings::Settings;
use crate::{cell_center, cell_of, distance};

/// Current behavior of a hostile unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiMode {
    #[default]
    Patrol,
    Pursuit,
}

/// Random-walk timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatrolState {
    pub moving: bool,
    /// When the current stop or move phase began
    pub phase_started_ms: u64,
    pub stop_duration_ms: u64,
    pub move_duration_ms: u64,
}

/// Per-unit AI memory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AiBrain {
    pub mode: AiMode,
    /// Cells from the unit's cell toward the target
    pub path: Vec<IVec2>,
    /// Index of the waypoint being approached
    pub waypoint: usize,
    pub last_path_ms: Option<u64>,
    pub patrol: PatrolState,
}

impl AiBrain {
    pub fn has_active_path(&self) -> bool {
        self.waypoint < self.path.len()
    }

    fn path_exhausted(&self) -> bool {
        !self.path.is_empty() && self.waypoint >= self.path.len()
    }
}

/// Read-only inputs shared by every AI decision in a tick
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    pub grid: &'a Grid,
    pub settings: &'a Settings,
    pub now_ms: u64,
}

/// Center of the closest candidate target
pub fn nearest_target(from: IVec2, targets: &[IVec2]) -> Option<IVec2> {
    targets.iter().copied().min_by(|a, b| {
        distance(from, *a)
            .partial_cmp(&distance(from, *b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Run one tick of AI for a hostile unit. Returns the bullet it fired, if any.
pub fn update_enemy<R: Rng + ?Sized>(
    tank: &mut Tank,
    target: Option<IVec2>,
    ctx: &AiContext<'_>,
    collider: &mut Collider<'_>,
    ids: &mut IdGen,
    rng: &mut R,
) -> Option<Bullet> {
    if tank.is_destroyed() {
        return None;
    }
    let mut brain = tank.brain.take().unwrap_or_default();

    let in_range = target
        .filter(|t| distance(tank.center(), *t) <= ctx.settings.detection_range);
    let fired = match in_range {
        Some(target) => {
            if brain.mode != AiMode::Pursuit {
                log::debug!("unit {} pursuing target at {:?}", tank.id, target);
            }
            brain.mode = AiMode::Pursuit;
            pursue(tank, &mut brain, target, ctx, collider, ids, rng)
        }
        None => {
            brain.mode = AiMode::Patrol;
            patrol(tank, &mut brain, ctx, collider, ids, rng)
        }
    };

    tank.brain = Some(brain);
    fired
}

fn pursue<R: Rng + ?Sized>(
    tank: &mut Tank,
    brain: &mut AiBrain,
    target: IVec2,
    ctx: &AiContext<'_>,
    collider: &mut Collider<'_>,
    ids: &mut IdGen,
    rng: &mut R,
) -> Option<Bullet> {
    let stale = brain
        .last_path_ms
        .is_none_or(|t| ctx.now_ms.saturating_sub(t) >= ctx.settings.path_recompute_ms);
    if stale || brain.path_exhausted() {
        recompute_path(tank, brain, target, ctx);
    }

    if !brain.has_active_path() {
        // Unreachable or unroutable: wander until the next recompute window
        return patrol(tank, brain, ctx, collider, ids, rng);
    }

    follow_path(tank, brain, collider);

    if rng.random_bool(ctx.settings.pursuit_fire_chance) && tank.can_fire(ctx.now_ms) {
        return tank.fire(ctx.now_ms, ids.allocate());
    }
    None
}

fn recompute_path(tank: &Tank, brain: &mut AiBrain, target: IVec2, ctx: &AiContext<'_>) {
    let start = cell_of(tank.center());
    let goal = cell_of(target);
    if !ctx.grid.in_bounds(start) || !ctx.grid.in_bounds(goal) {
        brain.path.clear();
        brain.waypoint = 0;
        return;
    }
    brain.path = find_path(ctx.grid, start, goal);
    brain.waypoint = 0;
    brain.last_path_ms = Some(ctx.now_ms);
    log::trace!(
        "unit {} path {:?} -> {:?}: {} cells",
        tank.id,
        start,
        goal,
        brain.path.len()
    );
}

fn follow_path(tank: &mut Tank, brain: &mut AiBrain, collider: &mut Collider<'_>) {
    let Some(&cell) = brain.path.get(brain.waypoint) else {
        return;
    };
    let waypoint = cell_center(cell);
    let delta = waypoint - tank.center();

    if let Some(primary) = Direction::toward(delta) {
        tank.direction = primary;
        if !collider.try_move(tank) {
            // Slide along the minor axis when the major one is blocked
            let minor = if primary.is_horizontal() {
                IVec2::new(0, delta.y)
            } else {
                IVec2::new(delta.x, 0)
            };
            if let Some(secondary) = Direction::toward(minor) {
                tank.direction = secondary;
                if !collider.try_move(tank) {
                    tank.direction = primary;
                }
            }
        }
    }

    let speed = tank.effective_speed();
    let remaining = waypoint - tank.center();
    if remaining.x.abs() <= speed && remaining.y.abs() <= speed {
        brain.waypoint += 1;
    }
}

fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::ALL[rng.random_range(0..Direction::ALL.len())]
}

fn patrol<R: Rng + ?Sized>(
    tank: &mut Tank,
    brain: &mut AiBrain,
    ctx: &AiContext<'_>,
    collider: &mut Collider<'_>,
    ids: &mut IdGen,
    rng: &mut R,
) -> Option<Bullet> {
    let settings = ctx.settings;
    let now = ctx.now_ms;
    let patrol = &mut brain.patrol;
    let elapsed = now.saturating_sub(patrol.phase_started_ms);

    if !patrol.moving {
        if elapsed < patrol.stop_duration_ms {
            return None;
        }
        patrol.moving = true;
        patrol.phase_started_ms = now;
        patrol.move_duration_ms =
            rng.random_range(settings.patrol_move_min_ms..=settings.patrol_move_max_ms);
        tank.direction = random_direction(rng);
    } else if elapsed >= patrol.move_duration_ms {
        patrol.phase_started_ms = now;
        if rng.random_bool(settings.patrol_stop_chance) {
            patrol.moving = false;
            patrol.stop_duration_ms =
                rng.random_range(settings.patrol_stop_min_ms..=settings.patrol_stop_max_ms);
            return None;
        }
        patrol.move_duration_ms =
            rng.random_range(settings.patrol_move_min_ms..=settings.patrol_move_max_ms);
        tank.direction = random_direction(rng);
    }

    let next = Rect::square(tank.next_position(), TANK_SIZE);
    if !collider.can_occupy(tank.id, &next) {
        tank.direction = random_direction(rng);
        return None;
    }
    tank.move_forward();
    collider.update(tank.id, tank.rect());

    if rng.random_bool(settings.patrol_fire_chance) && tank.can_fire(now) {
        return tank.fire(now, ids.allocate());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tank::Archetype;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn run_one(
        tank: &mut Tank,
        target: Option<IVec2>,
        grid: &Grid,
        settings: &Settings,
        now_ms: u64,
        rng: &mut Pcg32,
    ) -> Option<Bullet> {
        let ctx = AiContext {
            grid,
            settings,
            now_ms,
        };
        let mut collider = Collider::new(grid, std::slice::from_ref(tank));
        let mut ids = IdGen::default();
        update_enemy(tank, target, &ctx, &mut collider, &mut ids, rng)
    }

    #[test]
    fn test_detection_range_switches_mode() {
        let grid = Grid::new(12, 4);
        let settings = Settings::default();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut tank = Tank::enemy(1, Archetype::Basic, IVec2::new(0, 0));

        // Player 400 units away (center to center)
        let far = Rect::square(IVec2::new(400, 0), TANK_SIZE).center();
        run_one(&mut tank, Some(far), &grid, &settings, 0, &mut rng);
        let brain = tank.brain.as_ref().unwrap();
        assert_eq!(brain.mode, AiMode::Patrol);
        assert_eq!(brain.last_path_ms, None);

        // Reset position so the distance is exactly 300
        tank.pos = IVec2::ZERO;
        let near = Rect::square(IVec2::new(300, 0), TANK_SIZE).center();
        run_one(&mut tank, Some(near), &grid, &settings, 16, &mut rng);
        let brain = tank.brain.as_ref().unwrap();
        assert_eq!(brain.mode, AiMode::Pursuit);
        assert_eq!(brain.last_path_ms, Some(16));
        assert_eq!(brain.path.first(), Some(&IVec2::new(0, 0)));
        assert_eq!(brain.path.last(), Some(&IVec2::new(8, 0)));
    }

    #[test]
    fn test_pursuit_moves_along_path() {
        let grid = Grid::from_rows(&[
            ".....",
            "####.",
            ".....",
        ]);
        let settings = Settings {
            pursuit_fire_chance: 0.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(1);
        let mut tank = Tank::enemy(1, Archetype::Basic, IVec2::new(0, 0));
        let target = cell_center(IVec2::new(0, 2));

        let mut now = 0;
        for _ in 0..400 {
            run_one(&mut tank, Some(target), &grid, &settings, now, &mut rng);
            assert!(grid.can_occupy(&tank.rect()));
            now += 16;
        }
        // Went right around the wall and back along the bottom row
        assert_eq!(cell_of(tank.center()).y, 2);
        assert!(tank.pos.x < 80);
    }

    #[test]
    fn test_path_recomputed_after_interval() {
        let grid = Grid::new(10, 10);
        let settings = Settings {
            pursuit_fire_chance: 0.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let mut tank = Tank::enemy(1, Archetype::Basic, IVec2::new(0, 0));
        let target = cell_center(IVec2::new(5, 5));

        run_one(&mut tank, Some(target), &grid, &settings, 0, &mut rng);
        assert_eq!(tank.brain.as_ref().unwrap().last_path_ms, Some(0));
        run_one(&mut tank, Some(target), &grid, &settings, 1999, &mut rng);
        assert_eq!(tank.brain.as_ref().unwrap().last_path_ms, Some(0));
        run_one(&mut tank, Some(target), &grid, &settings, 2000, &mut rng);
        assert_eq!(tank.brain.as_ref().unwrap().last_path_ms, Some(2000));
    }

    #[test]
    fn test_unreachable_target_falls_back_to_patrol() {
        let grid = Grid::from_rows(&[
            "..@..",
            "..@..",
        ]);
        let settings = Settings::default();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut tank = Tank::enemy(1, Archetype::Basic, IVec2::new(0, 0));
        let target = cell_center(IVec2::new(4, 0));

        run_one(&mut tank, Some(target), &grid, &settings, 0, &mut rng);
        let brain = tank.brain.as_ref().unwrap();
        assert_eq!(brain.mode, AiMode::Pursuit);
        assert!(brain.path.is_empty());
        assert_eq!(brain.last_path_ms, Some(0));
        // Patrol timers kicked in
        assert!(brain.patrol.moving);
    }

    #[test]
    fn test_out_of_grid_target_skips_recompute() {
        let grid = Grid::new(4, 4);
        let settings = Settings {
            detection_range: 1000.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(5);
        let mut tank = Tank::enemy(1, Archetype::Basic, IVec2::new(0, 0));

        run_one(&mut tank, Some(IVec2::new(500, 20)), &grid, &settings, 0, &mut rng);
        let brain = tank.brain.as_ref().unwrap();
        assert!(brain.path.is_empty());
        assert_eq!(brain.last_path_ms, None);
    }

    #[test]
    fn test_patrol_never_leaves_passable_terrain() {
        let grid = Grid::from_rows(&[
            "......",
            ".#~...",
            "...@..",
            "......",
        ]);
        let settings = Settings::default();
        let mut rng = Pcg32::seed_from_u64(11);
        let mut tank = Tank::enemy(1, Archetype::Fast, IVec2::new(0, 0));

        let mut now = 0;
        for _ in 0..2000 {
            run_one(&mut tank, None, &grid, &settings, now, &mut rng);
            assert!(grid.can_occupy(&tank.rect()), "left terrain at {:?}", tank.pos);
            now += 16;
        }
        assert_eq!(tank.brain.as_ref().unwrap().mode, AiMode::Patrol);
    }

    #[test]
    fn test_patrol_stop_phase_holds_position() {
        let grid = Grid::new(8, 8);
        let settings = Settings::default();
        let mut rng = Pcg32::seed_from_u64(2);
        let mut tank = Tank::enemy(1, Archetype::Basic, IVec2::new(120, 120));
        tank.brain = Some(AiBrain {
            patrol: PatrolState {
                moving: false,
                phase_started_ms: 0,
                stop_duration_ms: 1000,
                move_duration_ms: 0,
            },
            ..Default::default()
        });

        run_one(&mut tank, None, &grid, &settings, 500, &mut rng);
        assert_eq!(tank.pos, IVec2::new(120, 120));
        assert!(!tank.brain.as_ref().unwrap().patrol.moving);

        run_one(&mut tank, None, &grid, &settings, 1000, &mut rng);
        let patrol = tank.brain.as_ref().unwrap().patrol;
        assert!(patrol.moving);
        assert!((2000..=4000).contains(&patrol.move_duration_ms));
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let grid = Grid::new(10, 10);
        let settings = Settings::default();
        let mut a = Tank::enemy(1, Archetype::Basic, IVec2::new(160, 160));
        let mut b = a.clone();
        let mut rng_a = Pcg32::seed_from_u64(42);
        let mut rng_b = Pcg32::seed_from_u64(42);
        for step in 0..500u64 {
            let fa = run_one(&mut a, None, &grid, &settings, step * 16, &mut rng_a);
            let fb = run_one(&mut b, None, &grid, &settings, step * 16, &mut rng_b);
            assert_eq!(fa, fb);
            assert_eq!(a.pos, b.pos);
        }
    }

    #[test]
    fn test_nearest_target() {
        let targets = [IVec2::new(100, 0), IVec2::new(30, 40)];
        assert_eq!(nearest_target(IVec2::ZERO, &targets), Some(IVec2::new(30, 40)));
        assert_eq!(nearest_target(IVec2::ZERO, &[]), None);
    }
}
