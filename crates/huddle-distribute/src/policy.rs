//! The four distribution policies.
//!
//! Every policy reads `items` and `participants` by reference and records
//! only ids in the returned [`AssignmentMap`]; items themselves are never
//! copied or modified.
//!
//! # Policies
//!
//! - **one-per-participant**: `participants[i]` gets `items[i]`. Extra items
//!   stay unassigned; extra participants get an empty list only when
//!   `allow_empty_assignments` is set.
//! - **round-robin**: item `k` goes to `participants[k % n]`, so counts
//!   differ by at most one.
//! - **random**: uniform shuffle, then round-robin.
//! - **exclude-own**: each participant draws one item they did not author.
//!   Participants with the fewest eligible items draw first, and an item is
//!   drawn at most once, so every drawn item has exactly one holder. With
//!   `exclude_own_responses` off, authorship is ignored and every item is
//!   eligible.

use rand::Rng;
use rand::seq::SliceRandom;

use huddle_core::model::{AssignmentMap, DistributionConfig, DistributionMode, Item, Participant};

/// Distribute with the thread-local RNG.
#[must_use]
pub fn distribute(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
) -> AssignmentMap {
    distribute_with_rng(items, participants, config, &mut rand::thread_rng())
}

/// Distribute using `rng` for the random and exclude-own policies.
#[must_use]
pub fn distribute_with_rng<R: Rng + ?Sized>(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
    rng: &mut R,
) -> AssignmentMap {
    let map = match config.mode {
        DistributionMode::OnePerParticipant => one_per_participant(items, participants, config),
        DistributionMode::RoundRobin => round_robin(items, participants, config),
        DistributionMode::Random => random(items, participants, config, rng),
        DistributionMode::ExcludeOwn => exclude_own(items, participants, config, rng),
    };
    tracing::debug!(
        mode = %map.distribution_mode,
        items = items.len(),
        participants = participants.len(),
        assigned = map.assigned_count(),
        "distribution complete"
    );
    map
}

/// Pair participants and items by index.
#[must_use]
pub fn one_per_participant(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
) -> AssignmentMap {
    let mut map = new_map(DistributionMode::OnePerParticipant, items, participants);
    for (idx, participant) in participants.iter().enumerate() {
        match items.get(idx) {
            Some(item) => map.assign(&item.id, &participant.id),
            None if config.allow_empty_assignments => map.ensure_participant(&participant.id),
            None => {}
        }
    }
    map
}

/// Deal items out in order, one participant at a time.
#[must_use]
pub fn round_robin(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
) -> AssignmentMap {
    let order: Vec<&Item> = items.iter().collect();
    deal(DistributionMode::RoundRobin, &order, items.len(), participants, config)
}

/// Shuffle, then deal round-robin. The map is tagged `random`.
#[must_use]
pub fn random<R: Rng + ?Sized>(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
    rng: &mut R,
) -> AssignmentMap {
    let mut order: Vec<&Item> = items.iter().collect();
    order.shuffle(rng);
    deal(DistributionMode::Random, &order, items.len(), participants, config)
}

/// Give each participant one item they did not author.
#[must_use]
pub fn exclude_own<R: Rng + ?Sized>(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
    rng: &mut R,
) -> AssignmentMap {
    let mut map = new_map(DistributionMode::ExcludeOwn, items, participants);
    let skip_own = config.exclude_own_responses;

    let mut draw_order: Vec<(usize, usize)> = participants
        .iter()
        .enumerate()
        .map(|(idx, participant)| {
            let eligible = if skip_own {
                eligible_count(items, participant)
            } else {
                items.len()
            };
            (idx, eligible)
        })
        .collect();
    draw_order.sort_by_key(|&(idx, eligible)| (eligible, idx));

    let mut taken = vec![false; items.len()];
    for (idx, _) in draw_order {
        let participant = &participants[idx];
        let pool: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(i, item)| {
                !taken[*i] && !(skip_own && item.is_authored_by(&participant.id))
            })
            .map(|(i, _)| i)
            .collect();

        match pool.choose(rng) {
            Some(&pick) => {
                taken[pick] = true;
                map.assign(&items[pick].id, &participant.id);
            }
            None => {
                tracing::debug!(participant = %participant.id, "no eligible item left");
                if config.allow_empty_assignments {
                    map.ensure_participant(&participant.id);
                }
            }
        }
    }
    map
}

/// Number of items `participant` may receive under exclude-own.
#[must_use]
pub fn eligible_count(items: &[Item], participant: &Participant) -> usize {
    items
        .iter()
        .filter(|item| !item.is_authored_by(&participant.id))
        .count()
}

fn deal(
    mode: DistributionMode,
    order: &[&Item],
    total_items: usize,
    participants: &[Participant],
    config: &DistributionConfig,
) -> AssignmentMap {
    let mut map = AssignmentMap::new(
        mode,
        total_items,
        participants.len(),
        chrono::Utc::now().timestamp_millis(),
    );
    if participants.is_empty() {
        return map;
    }
    for (k, item) in order.iter().enumerate() {
        map.assign(&item.id, &participants[k % participants.len()].id);
    }
    if config.allow_empty_assignments {
        for participant in participants {
            map.ensure_participant(&participant.id);
        }
    }
    map
}

fn new_map(mode: DistributionMode, items: &[Item], participants: &[Participant]) -> AssignmentMap {
    AssignmentMap::new(
        mode,
        items.len(),
        participants.len(),
        chrono::Utc::now().timestamp_millis(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::json;

    fn items(authors: &[&str]) -> Vec<Item> {
        authors
            .iter()
            .enumerate()
            .map(|(i, author)| Item::new(format!("item-{i}"), json!(i)).authored_by(*author))
            .collect()
    }

    fn people(n: usize) -> Vec<Participant> {
        (1..=n)
            .map(|i| Participant::new(format!("p{i}"), format!("Person {i}")))
            .collect()
    }

    fn config(mode: DistributionMode) -> DistributionConfig {
        DistributionConfig::default().with_mode(mode)
    }

    #[test]
    fn one_per_participant_pairs_by_index() {
        let map = distribute(
            &items(&["user1", "user2", "user3"]),
            &people(3),
            &config(DistributionMode::OnePerParticipant),
        );
        assert_eq!(map.items_for("p1"), ["item-0".to_string()]);
        assert_eq!(map.items_for("p2"), ["item-1".to_string()]);
        assert_eq!(map.items_for("p3"), ["item-2".to_string()]);
        assert_eq!(map.distribution_mode, DistributionMode::OnePerParticipant);
        assert!(map.check_consistency().is_ok());
    }

    #[test]
    fn one_per_participant_leaves_excess_items_unassigned() {
        let all = items(&["a", "b", "c", "d"]);
        let map = one_per_participant(&all, &people(2), &config(DistributionMode::OnePerParticipant));
        assert_eq!(map.unassigned(&all), vec!["item-2", "item-3"]);
        assert_eq!(map.total_items, 4);
    }

    #[test]
    fn one_per_participant_empty_lists_follow_config() {
        let few = items(&["a"]);
        let mut cfg = config(DistributionMode::OnePerParticipant);

        let map = one_per_participant(&few, &people(3), &cfg);
        assert!(map.participant_assignments.contains_key("p3"));
        assert!(map.items_for("p3").is_empty());

        cfg.allow_empty_assignments = false;
        let map = one_per_participant(&few, &people(3), &cfg);
        assert!(!map.participant_assignments.contains_key("p2"));
        assert!(!map.participant_assignments.contains_key("p3"));
    }

    #[test]
    fn round_robin_cycles_participants() {
        let map = round_robin(
            &items(&["a", "b", "c", "d", "e"]),
            &people(2),
            &config(DistributionMode::RoundRobin),
        );
        assert_eq!(map.items_for("p1"), ["item-0", "item-2", "item-4"].map(String::from));
        assert_eq!(map.items_for("p2"), ["item-1", "item-3"].map(String::from));
    }

    #[test]
    fn round_robin_without_participants_assigns_nothing() {
        let map = round_robin(&items(&["a"]), &[], &config(DistributionMode::RoundRobin));
        assert!(map.item_assignments.is_empty());
        assert!(map.participant_assignments.is_empty());
    }

    #[test]
    fn random_is_tagged_random_and_complete() {
        let all = items(&["a", "b", "c", "d", "e", "f"]);
        let mut rng = StdRng::seed_from_u64(7);
        let map = distribute_with_rng(&all, &people(3), &config(DistributionMode::Random), &mut rng);
        assert_eq!(map.distribution_mode, DistributionMode::Random);
        assert_eq!(map.assigned_count(), 6);
        for p in people(3) {
            assert_eq!(map.items_for(&p.id).len(), 2);
        }
        assert!(map.check_consistency().is_ok());
    }

    #[test]
    fn random_is_reproducible_with_seed() {
        let all = items(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let cfg = config(DistributionMode::Random);
        let a = random(&all, &people(3), &cfg, &mut StdRng::seed_from_u64(42));
        let b = random(&all, &people(3), &cfg, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.participant_assignments, b.participant_assignments);
    }

    #[test]
    fn exclude_own_never_returns_own_item() {
        let all = items(&["p1", "p2", "p3"]);
        let cfg = config(DistributionMode::ExcludeOwn);
        for seed in 0..50 {
            let map = exclude_own(&all, &people(3), &cfg, &mut StdRng::seed_from_u64(seed));
            for item in &all {
                if let Some(holder) = map.participant_for(&item.id) {
                    assert_ne!(Some(holder), item.author_id.as_deref());
                }
            }
            assert!(map.check_consistency().is_ok());
        }
    }

    #[test]
    fn exclude_own_sole_author_gets_empty_list() {
        let all = items(&["p1", "p1"]);
        let mut cfg = config(DistributionMode::ExcludeOwn);
        let map = exclude_own(&all, &people(2), &cfg, &mut StdRng::seed_from_u64(1));
        assert!(map.items_for("p1").is_empty());
        assert!(map.participant_assignments.contains_key("p1"));
        assert_eq!(map.items_for("p2").len(), 1);

        cfg.allow_empty_assignments = false;
        let map = exclude_own(&all, &people(2), &cfg, &mut StdRng::seed_from_u64(1));
        assert!(!map.participant_assignments.contains_key("p1"));
    }

    #[test]
    fn exclude_own_scarce_participants_draw_first() {
        // p1 can only take item-1; p2 could take either and must not steal it.
        let all = items(&["p1", "p3"]);
        let cfg = config(DistributionMode::ExcludeOwn);
        for seed in 0..20 {
            let map = exclude_own(&all, &people(2), &cfg, &mut StdRng::seed_from_u64(seed));
            assert_eq!(map.items_for("p1"), ["item-1".to_string()]);
            assert_eq!(map.items_for("p2"), ["item-0".to_string()]);
        }
    }

    #[test]
    fn exclude_own_flag_off_allows_own_items() {
        let all = items(&["p1", "p1"]);
        let mut cfg = config(DistributionMode::ExcludeOwn);
        cfg.exclude_own_responses = false;
        for seed in 0..10 {
            let map = exclude_own(&all, &people(2), &cfg, &mut StdRng::seed_from_u64(seed));
            assert_eq!(map.items_for("p1").len(), 1);
            assert_eq!(map.items_for("p2").len(), 1);
            assert_eq!(map.distribution_mode, DistributionMode::ExcludeOwn);
            assert!(map.check_consistency().is_ok());
        }
    }

    #[test]
    fn items_are_untouched() {
        let all = items(&["a", "b"]);
        let before = all.clone();
        let _ = distribute(&all, &people(2), &config(DistributionMode::Random));
        assert_eq!(all, before);
    }
}
