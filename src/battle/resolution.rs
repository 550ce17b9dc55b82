//! Per-unit attack resolution
//!
//! One frontline unit, one hour: pick targets within its engagement width,
//! turn its attack into a number of discrete rolls, split the rolls between
//! targets and apply hp / organisation damage on hits.

use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::battle::accountant::{average_hardness, flanks, frontline_width, max_width};
use crate::battle::events::Side;
use crate::battle::execution::Battle;
use crate::battle::reserves::crowding_factor;
use crate::core::config::BattleConfig;
use crate::core::types::UnitId;
use crate::world::{ModifierContext, PropertyTag, Unit, World};

/// What one unit did this hour
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackReport {
    pub targets: Vec<UnitId>,
    /// Effective attack after width and fort penalties
    pub attack: f64,
    pub rolls: u32,
    pub hits: u32,
}

/// Copy of the attacker stats needed while the world is being mutated
#[derive(Debug, Clone, Copy)]
struct Striker {
    soft_attack: f64,
    hard_attack: f64,
    armor: f64,
    piercing: f64,
    initiative: f64,
    combat_width: f64,
    hp_ratio: f64,
}

impl From<&Unit> for Striker {
    fn from(unit: &Unit) -> Self {
        Self {
            soft_attack: unit.stats.soft_attack,
            hard_attack: unit.stats.hard_attack,
            armor: unit.stats.armor,
            piercing: unit.stats.piercing,
            initiative: unit.stats.initiative,
            combat_width: unit.stats.combat_width,
            hp_ratio: unit.hp_ratio(),
        }
    }
}

/// Resolve one hour of attacks by `unit` fighting for `side`
///
/// With no enemy frontline this returns immediately without touching the
/// RNG or any state.
pub fn tick(
    battle: &mut Battle,
    unit: UnitId,
    side: Side,
    world: &mut World,
    rng: &mut impl Rng,
    config: &BattleConfig,
) -> AttackReport {
    let enemy_side = side.opposite();
    let enemies: Vec<UnitId> = battle
        .frontline(enemy_side)
        .iter()
        .copied()
        .filter(|id| world.unit(*id).is_some())
        .collect();
    if enemies.is_empty() {
        return AttackReport::default();
    }
    let Some(attacker) = world.unit(unit) else {
        return AttackReport::default();
    };
    let striker = Striker::from(attacker);

    let targets = select_targets(&enemies, striker.combat_width, world, rng, config);
    let attack = effective_attack(battle, attacker, side, &targets, world, config);
    let rolls = (attack / config.combat.stat_divisor).round() as u32;

    let allocation = allocate_rolls(&striker, &targets, rolls, world, config);

    let mut hits = 0;
    for (target, count) in allocation {
        for _ in 0..count {
            if roll_attack(battle, &striker, target, side, world, rng, config) {
                hits += 1;
            }
        }
    }

    battle.ledger_mut().set_attacks(unit, attack.round());
    tracing::trace!(battle = %battle.id(), %unit, ?side, attack, rolls, hits, "unit attacked");

    AttackReport {
        targets,
        attack,
        rolls,
        hits,
    }
}

/// Shuffled greedy pick of enemies within `factor * own width`, falling
/// back to a single random enemy when none fits
fn select_targets(
    enemies: &[UnitId],
    own_width: f64,
    world: &World,
    rng: &mut impl Rng,
    config: &BattleConfig,
) -> Vec<UnitId> {
    let budget = config.combat.engagement_width_factor * own_width;
    let mut shuffled = enemies.to_vec();
    shuffled.shuffle(rng);

    let mut targets = Vec::new();
    let mut used = 0.0;
    for id in shuffled {
        let width = world.unit(id).map_or(0.0, |u| u.stats.combat_width);
        if used + width <= budget {
            targets.push(id);
            used += width;
        }
    }

    if targets.is_empty() {
        targets.extend(enemies.choose(rng).copied());
    }
    targets
}

fn effective_attack(
    battle: &Battle,
    attacker: &Unit,
    side: Side,
    targets: &[UnitId],
    world: &World,
    config: &BattleConfig,
) -> f64 {
    let hardness = average_hardness(targets.iter().filter_map(|id| world.unit(*id)));
    let base = hardness * attacker.stats.hard_attack + (1.0 - hardness) * attacker.stats.soft_attack;
    let mut attack = attacker.modifiers.effective_value(base, &[PropertyTag::Attack]);

    let max_width = max_width(battle, world, config);
    attack *= crowding_factor(frontline_width(battle, side, world), max_width);

    if side.is_attacker() {
        attack *= 1.0 - fort_penalty(battle, world, config);
    }

    attack.max(0.0)
}

/// Attack reduction from land forts at the battle hex
///
/// Every attacking direction beyond the first cancels one fort level, but a
/// fortified hex always keeps at least one.
pub fn fort_penalty(battle: &Battle, world: &World, config: &BattleConfig) -> f64 {
    let levels = world.fort_level(battle.location());
    if levels == 0 {
        return 0.0;
    }

    let directions = flanks(battle, world).len() as u32;
    let effective = levels
        .saturating_sub(directions.saturating_sub(1))
        .clamp(1, config.fort.max_level);
    let penalty = effective as f64 * config.fort.penalty_per_level;

    world
        .hex_modifiers(battle.location())
        .effective_value(penalty, &[PropertyTag::FortPenalty])
        .min(config.fort.max_debuff)
}

/// How attractive a target is for the concentrated share of rolls
fn rate_target(striker: &Striker, target: &Unit) -> f64 {
    let t = &target.stats;
    let mut score = (striker.hard_attack * (1.0 - t.hardness) + striker.soft_attack * t.hardness)
        / t.combat_width.max(1.0);
    if t.armor > striker.piercing {
        score *= 0.5;
    }
    score * (1.0 - target.org_ratio() / 4.0)
}

/// Split `rolls` across `targets`: a coordinated share on the best-rated
/// target, the rest in proportion to combat width
fn allocate_rolls(
    striker: &Striker,
    targets: &[UnitId],
    rolls: u32,
    world: &World,
    config: &BattleConfig,
) -> Vec<(UnitId, u32)> {
    let units: Vec<&Unit> = targets.iter().filter_map(|id| world.unit(*id)).collect();
    if units.is_empty() || rolls == 0 {
        return Vec::new();
    }

    let share = config.combat.coordinated_share * (1.0 + striker.initiative);
    let coordinated = ((share * rolls as f64).floor() as u32).min(rolls);
    let normal = rolls - coordinated;

    let widths: Vec<f64> = units.iter().map(|u| u.stats.combat_width).collect();
    let mut shares = split_proportionally(normal, &widths);

    let focus = units
        .iter()
        .enumerate()
        .max_by_key(|(i, u)| (OrderedFloat(rate_target(striker, u)), std::cmp::Reverse(*i)))
        .map(|(i, _)| i);
    if let Some(i) = focus {
        shares[i] += coordinated;
    }

    units
        .iter()
        .zip(shares)
        .filter(|(_, n)| *n > 0)
        .map(|(u, n)| (u.id, n))
        .collect()
}

/// Largest-remainder split of `total` by `weights`; equal split when all
/// weights are zero
fn split_proportionally(total: u32, weights: &[f64]) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }

    let sum: f64 = weights.iter().sum();
    let quotas: Vec<f64> = if sum > 0.0 {
        weights.iter().map(|w| w / sum * total as f64).collect()
    } else {
        vec![total as f64 / weights.len() as f64; weights.len()]
    };

    let mut shares: Vec<u32> = quotas.iter().map(|q| q.floor() as u32).collect();
    let assigned: u32 = shares.iter().sum();
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by_key(|i| std::cmp::Reverse(OrderedFloat(quotas[*i] - quotas[*i].floor())));

    for i in order.into_iter().take(total.saturating_sub(assigned) as usize) {
        shares[i] += 1;
    }
    shares
}

/// One attack roll; returns true on a hit
fn roll_attack(
    battle: &mut Battle,
    striker: &Striker,
    target: UnitId,
    side: Side,
    world: &mut World,
    rng: &mut impl Rng,
    config: &BattleConfig,
) -> bool {
    let combat = &config.combat;
    let chance = if battle.ledger_mut().spend_defence(target) {
        combat.defended_hit_chance
    } else {
        combat.undefended_hit_chance
    };

    battle.ledger_mut().stats_mut(side).rolls += 1;
    if rng.gen::<f64>() >= chance {
        return false;
    }

    let Some(unit) = world.unit_mut(target) else {
        return false;
    };

    let org_die = if striker.armor > unit.stats.piercing {
        combat.armored_org_damage_die
    } else {
        combat.org_damage_die
    };
    let hp_damage =
        rng.gen_range(1..=combat.hp_damage_die) as f64 * combat.hp_damage_per_hit * striker.hp_ratio;
    let org_damage =
        rng.gen_range(1..=org_die) as f64 * combat.org_damage_per_hit * striker.hp_ratio;

    unit.set_hp(unit.hp() - hp_damage);
    unit.set_organisation(unit.organisation() - org_damage);

    let stats = battle.ledger_mut().stats_mut(side);
    stats.hits += 1;
    stats.hp_damage += hp_damage;
    stats.org_damage += org_damage;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::testing::{spawn, two_nation_world};
    use crate::core::types::{BattleId, HexCoord};
    use crate::world::{BuildingKind, Hex, UnitStats};
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_split_proportionally_sums_to_total() {
        let shares = split_proportionally(10, &[10.0, 20.0, 10.0]);
        assert_eq!(shares.iter().sum::<u32>(), 10);
        assert_eq!(shares[1], 5);

        let shares = split_proportionally(7, &[1.0, 1.0, 1.0]);
        assert_eq!(shares.iter().sum::<u32>(), 7);
        assert!(shares.iter().all(|s| *s == 2 || *s == 3));
    }

    #[test]
    fn test_split_proportionally_zero_weights() {
        assert_eq!(split_proportionally(4, &[0.0, 0.0]), vec![2, 2]);
        assert!(split_proportionally(4, &[]).is_empty());
    }

    #[test]
    fn test_rating_penalises_armor_and_organisation() {
        let (mut world, red, _) = two_nation_world();
        let here = HexCoord::new(0, 0);
        let striker = Striker {
            soft_attack: 40.0,
            hard_attack: 10.0,
            armor: 0.0,
            piercing: 5.0,
            initiative: 0.0,
            combat_width: 10.0,
            hp_ratio: 1.0,
        };
        let plain = spawn(&mut world, red, here, UnitStats::default());
        let armored = spawn(&mut world, red, here, UnitStats { armor: 20.0, ..UnitStats::default() });
        let shaken = spawn(&mut world, red, here, UnitStats::default());
        world.unit_mut(shaken).unwrap().set_organisation(0.0);

        let plain_score = rate_target(&striker, world.unit(plain).unwrap());
        let armored_score = rate_target(&striker, world.unit(armored).unwrap());
        let shaken_score = rate_target(&striker, world.unit(shaken).unwrap());

        assert!((armored_score - plain_score * 0.5).abs() < 1e-12);
        assert!(shaken_score > plain_score);
        assert!((plain_score - 10.0 / 10.0 * 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_no_enemy_frontline_is_noop() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let def = spawn(&mut world, blue, location, UnitStats::default());
        let config = BattleConfig::default();
        let mut battle = Battle::new(BattleId(1), location, vec![def], vec![att], &world, &config);
        battle.remove_unit(def, crate::battle::RemovalReason::Withdrawn);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut untouched = rng.clone();
        let report = tick(&mut battle, att, Side::Attacker, &mut world, &mut rng, &config);

        assert_eq!(report, AttackReport::default());
        assert_eq!(rng.next_u64(), untouched.next_u64());
        assert_eq!(battle.ledger().attacks(att), 0.0);
    }

    #[test]
    fn test_targets_fit_engagement_width() {
        let (mut world, red, _) = two_nation_world();
        let here = HexCoord::new(0, 0);
        let enemies: Vec<UnitId> = (0..6).map(|_| spawn(&mut world, red, here, UnitStats::default())).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let targets = select_targets(&enemies, 10.0, &world, &mut rng, &BattleConfig::default());
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| enemies.contains(t)));
    }

    #[test]
    fn test_oversized_enemies_fall_back_to_one_target() {
        let (mut world, red, _) = two_nation_world();
        let here = HexCoord::new(0, 0);
        let huge = UnitStats { combat_width: 50.0, ..UnitStats::default() };
        let enemies: Vec<UnitId> = (0..3).map(|_| spawn(&mut world, red, here, huge.clone())).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let targets = select_targets(&enemies, 10.0, &world, &mut rng, &BattleConfig::default());
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_fort_penalty_reduced_by_flanks() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        world.add_hex(Hex::new(location, Some(blue)).with_building(BuildingKind::LandFort, 3));
        let config = BattleConfig::default();

        let one_flank = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let def = spawn(&mut world, blue, location, UnitStats::default());
        let mut battle = Battle::new(BattleId(1), location, vec![def], vec![one_flank], &world, &config);
        assert!((fort_penalty(&battle, &world, &config) - 0.15).abs() < 1e-12);

        let second = spawn(&mut world, red, HexCoord::new(-1, 0), UnitStats::default());
        let third = spawn(&mut world, red, HexCoord::new(0, 1), UnitStats::default());
        battle.add_attacker(second, &world);
        battle.add_attacker(third, &world);
        assert!((fort_penalty(&battle, &world, &config) - 0.05).abs() < 1e-12);

        let fourth = spawn(&mut world, red, HexCoord::new(0, -1), UnitStats::default());
        battle.add_attacker(fourth, &world);
        // never below one level while a fort stands
        assert!((fort_penalty(&battle, &world, &config) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_fort_penalty_capped() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        world.add_hex(Hex::new(location, Some(blue)).with_building(BuildingKind::LandFort, 40));
        let config = BattleConfig::default();
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats::default());
        let def = spawn(&mut world, blue, location, UnitStats::default());
        let battle = Battle::new(BattleId(1), location, vec![def], vec![att], &world, &config);

        assert!((fort_penalty(&battle, &world, &config) - config.fort.max_debuff).abs() < 1e-12);
    }

    #[test]
    fn test_defender_ignores_forts() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        world.add_hex(Hex::new(location, Some(blue)).with_building(BuildingKind::LandFort, 5));
        let config = BattleConfig::default();
        let stats = UnitStats { soft_attack: 100.0, ..UnitStats::default() };
        let att = spawn(&mut world, red, HexCoord::new(1, 0), stats.clone());
        let def = spawn(&mut world, blue, location, stats);
        let mut battle = Battle::new(BattleId(1), location, vec![def], vec![att], &world, &config);

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let att_report = tick(&mut battle, att, Side::Attacker, &mut world, &mut rng, &config);
        let def_report = tick(&mut battle, def, Side::Defender, &mut world, &mut rng, &config);

        assert!((att_report.attack - 100.0 * 0.75).abs() < 1e-9);
        assert!((def_report.attack - 100.0).abs() < 1e-9);
        assert_eq!(def_report.rolls, 10);
        assert_eq!(battle.ledger().attacks(def), 100.0);
    }

    #[test]
    fn test_hits_only_lower_targets() {
        let (mut world, red, blue) = two_nation_world();
        let location = HexCoord::new(0, 0);
        let config = BattleConfig::default();
        let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats { soft_attack: 300.0, ..UnitStats::default() });
        let def = spawn(&mut world, blue, location, UnitStats::default());
        let mut battle = Battle::new(BattleId(1), location, vec![def], vec![att], &world, &config);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let report = tick(&mut battle, att, Side::Attacker, &mut world, &mut rng, &config);
        let target = world.unit(def).unwrap();

        assert_eq!(report.rolls, 30);
        assert!(report.hits > 0);
        assert!(target.organisation() < target.stats.max_organisation);
        assert!(target.hp() < target.stats.max_hp);
        assert_eq!(battle.ledger().stats(Side::Attacker).hits, report.hits as u64);
        assert_eq!(battle.ledger().stats(Side::Attacker).rolls, 30);
    }

    #[test]
    fn test_rolls_beyond_defence_hit_harder() {
        let config = BattleConfig::default();
        let location = HexCoord::new(0, 0);
        let seeds = 200;
        let mut total_hits = 0;

        for seed in 0..seeds {
            let (mut world, red, blue) = two_nation_world();
            let att = spawn(&mut world, red, HexCoord::new(1, 0), UnitStats { soft_attack: 300.0, ..UnitStats::default() });
            let def = spawn(&mut world, blue, location, UnitStats { defence: 50.0, ..UnitStats::default() });
            let mut battle = Battle::new(BattleId(1), location, vec![def], vec![att], &world, &config);
            crate::battle::reserves::build_defences(&mut battle, Side::Defender, &world, &config);
            assert_eq!(battle.ledger().defence(def), 5.0);

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = tick(&mut battle, att, Side::Attacker, &mut world, &mut rng, &config);

            assert_eq!(report.rolls, 30);
            assert_eq!(battle.ledger().defence(def), 0.0);
            total_hits += report.hits;
        }

        // 5 rolls at 0.1 and 25 at 0.4 expect 10.5 hits; all at 0.1 would be 3
        let mean = total_hits as f64 / seeds as f64;
        assert!(mean > 8.0, "mean hits {mean}");
    }
}
