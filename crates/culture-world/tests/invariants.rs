use culture_core::{Cell, Position, SimConfig, Team};
use culture_world::{Grid, Simulation};
use proptest::prelude::*;

const ROWS: i32 = 12;
const COLS: i32 = 12;

fn arb_cell() -> impl Strategy<Value = Cell> {
    let team = prop_oneof![Just(Team::A), Just(Team::B)];
    (0u8..7, team, 0u8..=3).prop_map(|(kind, team, health)| match kind {
        0 | 1 => Cell::dot(team).with_health(health),
        2 => Cell::producer(team).with_health(health),
        3 | 4 => Cell::block(team),
        5 => Cell::bomb_armed(team),
        _ => Cell::bomb_hot(team),
    })
}

fn arb_board() -> impl Strategy<Value = Grid> {
    prop::collection::vec((0..ROWS, 0..COLS, arb_cell()), 0..80).prop_map(|placements| {
        let mut grid = Grid::new(ROWS, COLS);
        for (row, col, cell) in placements {
            grid.set(Position::new(row, col), cell);
        }
        grid
    })
}

fn config(seed: u64) -> SimConfig {
    SimConfig {
        rows: ROWS,
        cols: COLS,
        seed,
        ..Default::default()
    }
}

/// Interleave main and nutrient ticks the way the default periods do
fn drive(sim: &mut Simulation, ticks: usize) {
    for _ in 0..ticks {
        sim.tick();
        for _ in 0..5 {
            sim.nutrient_tick();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn reachable_boards_keep_cell_invariants(board in arb_board(), seed in any::<u64>()) {
        let max_health = config(seed).max_health;
        let mut sim = Simulation::with_grid(config(seed), board).unwrap();

        for _ in 0..15 {
            sim.tick();
            prop_assert!(sim.grid().validate(max_health).is_ok());
            for _ in 0..5 {
                sim.nutrient_tick();
                prop_assert!(sim.grid().validate(max_health).is_ok());
            }
        }

        for (_, cell) in sim.grid().iter() {
            prop_assert_eq!(cell.is_empty(), cell.team.is_none());
            prop_assert!(cell.health <= max_health);
        }
    }

    #[test]
    fn tokens_only_ride_their_own_walls(board in arb_board(), seed in any::<u64>()) {
        let mut sim = Simulation::with_grid(config(seed), board).unwrap();
        drive(&mut sim, 12);

        for view in sim.nutrients() {
            let host = sim.grid().get(view.position).unwrap();
            prop_assert!(host.is_wall_of(view.team));
        }

        let mut ids: Vec<_> = sim.tokens().iter().map(|token| token.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);
    }

    #[test]
    fn same_seed_same_bytes(board in arb_board(), seed in any::<u64>()) {
        let mut first = Simulation::with_grid(config(seed), board.clone()).unwrap();
        let mut second = Simulation::with_grid(config(seed), board).unwrap();
        drive(&mut first, 8);
        drive(&mut second, 8);

        prop_assert_eq!(first.grid().to_bytes().unwrap(), second.grid().to_bytes().unwrap());
        prop_assert_eq!(first.tokens(), second.tokens());
    }
}
