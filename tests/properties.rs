//! Property tests over randomly generated battles

use ahash::AHashSet;
use proptest::prelude::*;

use frontline::battle::*;
use frontline::core::types::{HexCoord, NationId, UnitId};
use frontline::world::{Unit, UnitStats, World};
use frontline::BattleConfig;

const WIDTHS: [f64; 5] = [5.0, 10.0, 20.0, 40.0, 60.0];

/// (width index, soft attack, defence, organisation share)
type UnitSeed = (usize, f64, f64, f64);

fn unit_seed() -> impl Strategy<Value = UnitSeed> {
    (0..WIDTHS.len(), 0.0..250.0f64, 0.0..100.0f64, 0.05..1.0f64)
}

fn spawn(world: &mut World, owner: NationId, at: HexCoord, seed: &UnitSeed) -> UnitId {
    let (width, soft_attack, defence, org_share) = *seed;
    let stats = UnitStats {
        soft_attack,
        defence,
        breakthrough: defence / 2.0,
        combat_width: WIDTHS[width],
        ..UnitStats::default()
    };
    let mut unit = Unit::new(owner, at, stats);
    unit.set_organisation(unit.stats.max_organisation * org_share);
    world.add_unit(unit)
}

struct Setup {
    world: World,
    repo: BattleRepository,
}

/// One or two contested hexes, attackers spread over `directions` neighbours
fn setup(
    attackers: &[UnitSeed],
    defenders: &[UnitSeed],
    directions: usize,
    two_fronts: bool,
    seed: u64,
) -> Setup {
    let red = NationId(1);
    let blue = NationId(2);
    let mut world = World::new();
    world.diplomacy.declare_war(red, blue);
    let mut repo = BattleRepository::new(BattleConfig::default().with_seed(seed));

    let hexes: &[HexCoord] = if two_fronts {
        &[HexCoord::new(0, 0), HexCoord::new(5, 5)]
    } else {
        &[HexCoord::new(0, 0)]
    };

    for hex in hexes {
        let neighbors = hex.neighbors();
        let ids: Vec<UnitId> = attackers
            .iter()
            .enumerate()
            .map(|(i, s)| spawn(&mut world, red, neighbors[i % directions], s))
            .collect();
        for s in defenders {
            spawn(&mut world, blue, *hex, s);
        }
        // every generated side has at least one unit, so this always opens
        repo.engage(&ids, *hex, &world).expect("hostile contact");
    }

    Setup { world, repo }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_frontline_never_exceeds_ceiling(
        attackers in prop::collection::vec(unit_seed(), 1..8),
        defenders in prop::collection::vec(unit_seed(), 1..8),
        directions in 1..=3usize,
        seed in any::<u64>(),
    ) {
        let Setup { mut world, mut repo } = setup(&attackers, &defenders, directions, false, seed);

        for _ in 0..40 {
            repo.hour_elapsed(&mut world);
            for battle in repo.iter() {
                let ceiling = repo.config().width_ceiling(max_width(battle, &world, repo.config()));
                for side in [Side::Attacker, Side::Defender] {
                    prop_assert!(frontline_width(battle, side, &world) <= ceiling + 1e-9);
                }
            }
        }
    }

    #[test]
    fn prop_units_belong_to_one_list_of_one_battle(
        attackers in prop::collection::vec(unit_seed(), 1..6),
        defenders in prop::collection::vec(unit_seed(), 1..6),
        seed in any::<u64>(),
    ) {
        let Setup { mut world, mut repo } = setup(&attackers, &defenders, 2, true, seed);

        for _ in 0..30 {
            repo.hour_elapsed(&mut world);
            let mut seen = AHashSet::new();
            for battle in repo.iter() {
                for unit in battle.all_units() {
                    prop_assert!(seen.insert(unit), "{} listed twice", unit);
                    prop_assert_eq!(repo.battle_of(unit).map(Battle::id), Some(battle.id()));
                }
            }
        }
    }

    #[test]
    fn prop_registered_battles_are_undecided(
        attackers in prop::collection::vec(unit_seed(), 1..6),
        defenders in prop::collection::vec(unit_seed(), 1..6),
        seed in any::<u64>(),
    ) {
        let Setup { mut world, mut repo } = setup(&attackers, &defenders, 1, false, seed);

        for _ in 0..60 {
            repo.hour_elapsed(&mut world);
            for battle in repo.iter() {
                prop_assert!(!battle.is_ended());
                prop_assert!(!battle.is_decided());
            }
            for battle in repo.concluded() {
                prop_assert!(battle.outcome().is_some());
            }
        }
    }

    #[test]
    fn prop_prediction_is_bounded(
        attackers in prop::collection::vec(unit_seed(), 1..6),
        defenders in prop::collection::vec(unit_seed(), 1..6),
        seed in any::<u64>(),
    ) {
        let Setup { mut world, mut repo } = setup(&attackers, &defenders, 1, false, seed);

        for _ in 0..20 {
            repo.hour_elapsed(&mut world);
            for battle in repo.iter().chain(repo.concluded()) {
                if let Some(p) = battle.last_prediction() {
                    prop_assert!(p.hours >= 0.0 && p.hours.is_finite());
                    prop_assert!((-1.0..=1.0).contains(&p.score));
                }
            }
        }
    }
}
