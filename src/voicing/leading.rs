// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Event-to-event voice leading.
//!
//! Given the pitch classes of the next chord and the notes that were actually
//! sounding, picks octave placements that move the voices as little as possible.
//! Chords are small (at most [`MAX_VOICES`] notes), so assignments are solved by
//! exhaustive search over permutations.

/// Largest chord, on either side, that the search will handle.
pub const MAX_VOICES: usize = 6;

/// Returns the note with pitch class `pitch_class` closest to `target`. Of the two
/// candidates straddling the target, ties go to the lower one.
pub fn nearest_instance(pitch_class: i32, target: i32) -> i32 {
    let below = target - (target - pitch_class).rem_euclid(12);
    if below == target {
        return target;
    }
    let above = below + 12;
    if target - below <= above - target {
        below
    } else {
        above
    }
}

/// Finds the assignment of `placed[i]` to `targets[assignment[i]]` with the least
/// total absolute distance. Both slices must have the same length.
pub fn best_assignment(placed: &[i32], targets: &[i32]) -> (Vec<usize>, i32) {
    debug_assert_eq!(placed.len(), targets.len());

    let mut indices: Vec<usize> = (0..targets.len()).collect();
    let mut best = (indices.clone(), assignment_cost(placed, targets, &indices));
    permute(&mut indices, 0, &mut |permutation| {
        let cost = assignment_cost(placed, targets, permutation);
        if cost < best.1 {
            best = (permutation.to_vec(), cost);
        }
    });
    best
}

fn assignment_cost(placed: &[i32], targets: &[i32], assignment: &[usize]) -> i32 {
    placed
        .iter()
        .zip(assignment)
        .map(|(note, target)| (note - targets[*target]).abs())
        .sum()
}

/// Visits every permutation of `indices[k..]`.
fn permute(indices: &mut [usize], k: usize, visit: &mut impl FnMut(&[usize])) {
    if k == indices.len() {
        visit(indices);
        return;
    }
    for i in k..indices.len() {
        indices.swap(k, i);
        permute(indices, k + 1, visit);
        indices.swap(k, i);
    }
}

fn centroid(notes: &[i32]) -> i32 {
    let sum: i32 = notes.iter().sum();
    sum.div_euclid(notes.len() as i32)
}

/// Voices `pitch_classes` against the `previous` notes. Returns `None` when the
/// chords cannot be led: an empty previous chord, a size difference of more than
/// one voice, or more than [`MAX_VOICES`] voices.
pub fn lead(pitch_classes: &[i32], previous: &[i32]) -> Option<Vec<i32>> {
    if previous.is_empty()
        || pitch_classes.is_empty()
        || pitch_classes.len() > MAX_VOICES
        || previous.len() > MAX_VOICES
    {
        return None;
    }

    let center = centroid(previous);
    let near_center = |pc: i32| nearest_instance(pc, center);

    match pitch_classes.len() as isize - previous.len() as isize {
        0 => {
            let placed: Vec<i32> = pitch_classes.iter().map(|pc| near_center(*pc)).collect();
            let (assignment, _) = best_assignment(&placed, previous);
            Some(
                pitch_classes
                    .iter()
                    .zip(assignment)
                    .map(|(pc, target)| nearest_instance(*pc, previous[target]))
                    .collect(),
            )
        }
        1 => {
            let mut best: Option<(usize, Vec<usize>, i32)> = None;
            for extra in 0..pitch_classes.len() {
                let placed: Vec<i32> = pitch_classes
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != extra)
                    .map(|(_, pc)| near_center(*pc))
                    .collect();
                let (assignment, cost) = best_assignment(&placed, previous);
                let cost = cost + (near_center(pitch_classes[extra]) - center).abs();
                if best.as_ref().map_or(true, |(_, _, best_cost)| cost < *best_cost) {
                    best = Some((extra, assignment, cost));
                }
            }

            let (extra, assignment, _) = best?;
            let mut assigned = assignment.into_iter();
            Some(
                pitch_classes
                    .iter()
                    .enumerate()
                    .map(|(i, pc)| {
                        if i == extra {
                            near_center(*pc)
                        } else {
                            // One assignment entry exists per non-extra voice.
                            let target = assigned.next().unwrap_or_default();
                            nearest_instance(*pc, previous[target])
                        }
                    })
                    .collect(),
            )
        }
        -1 => {
            let placed: Vec<i32> = pitch_classes.iter().map(|pc| near_center(*pc)).collect();
            let mut best: Option<(Vec<i32>, Vec<usize>, i32)> = None;
            for orphan in 0..previous.len() {
                let remaining: Vec<i32> = previous
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != orphan)
                    .map(|(_, note)| *note)
                    .collect();
                let (assignment, cost) = best_assignment(&placed, &remaining);
                if best.as_ref().map_or(true, |(_, _, best_cost)| cost < *best_cost) {
                    best = Some((remaining, assignment, cost));
                }
            }

            let (remaining, assignment, _) = best?;
            Some(
                pitch_classes
                    .iter()
                    .zip(assignment)
                    .map(|(pc, target)| nearest_instance(*pc, remaining[target]))
                    .collect(),
            )
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::{best_assignment, lead, nearest_instance};

    /// Reference cost of every permutation, by brute force.
    fn all_costs(placed: &[i32], targets: &[i32]) -> Vec<i32> {
        let mut costs = Vec::new();
        let n = targets.len();
        for a in 0..n {
            for b in 0..n {
                for c in 0..n {
                    if a == b || b == c || a == c {
                        continue;
                    }
                    let perm = [a, b, c];
                    costs.push(
                        placed
                            .iter()
                            .zip(perm)
                            .map(|(p, t)| (p - targets[t]).abs())
                            .sum(),
                    );
                }
            }
        }
        costs
    }

    /// Every ordering of `0..n`, built independently of the search's own permuter.
    fn orderings(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut result = Vec::new();
        for shorter in orderings(n - 1) {
            for position in 0..n {
                let mut ordering = shorter.clone();
                ordering.insert(position, n - 1);
                result.push(ordering);
            }
        }
        result
    }

    /// Reference search over every choice of added voice and assignment. Returns
    /// each candidate's cost and the voicing it produces.
    fn growth_candidates(pitch_classes: &[i32], previous: &[i32]) -> Vec<(i32, Vec<i32>)> {
        let center = previous.iter().sum::<i32>().div_euclid(previous.len() as i32);
        let mut candidates = Vec::new();
        for extra in 0..pitch_classes.len() {
            let others: Vec<usize> = (0..pitch_classes.len()).filter(|i| *i != extra).collect();
            for ordering in orderings(previous.len()) {
                let added = nearest_instance(pitch_classes[extra], center);
                let mut cost = (added - center).abs();
                let mut voicing = vec![added; pitch_classes.len()];
                for (voice, target) in others.iter().zip(&ordering) {
                    let pc = pitch_classes[*voice];
                    cost += (nearest_instance(pc, center) - previous[*target]).abs();
                    voicing[*voice] = nearest_instance(pc, previous[*target]);
                }
                candidates.push((cost, voicing));
            }
        }
        candidates
    }

    /// Reference search over every choice of orphaned voice and assignment.
    fn shrinkage_candidates(pitch_classes: &[i32], previous: &[i32]) -> Vec<(i32, Vec<i32>)> {
        let center = previous.iter().sum::<i32>().div_euclid(previous.len() as i32);
        let mut candidates = Vec::new();
        for orphan in 0..previous.len() {
            let remaining: Vec<i32> = previous
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != orphan)
                .map(|(_, note)| *note)
                .collect();
            for ordering in orderings(remaining.len()) {
                let cost = pitch_classes
                    .iter()
                    .zip(&ordering)
                    .map(|(pc, target)| (nearest_instance(*pc, center) - remaining[*target]).abs())
                    .sum();
                let voicing = pitch_classes
                    .iter()
                    .zip(&ordering)
                    .map(|(pc, target)| nearest_instance(*pc, remaining[*target]))
                    .collect();
                candidates.push((cost, voicing));
            }
        }
        candidates
    }

    /// Asserts the voicing is produced by one of the cheapest candidates.
    fn assert_cheapest(result: &[i32], candidates: &[(i32, Vec<i32>)]) {
        let cheapest = candidates.iter().map(|(cost, _)| *cost).min().expect("no candidates");
        assert!(
            candidates
                .iter()
                .any(|(cost, voicing)| *cost == cheapest && voicing == result),
            "voicing {:?} is not among the cheapest candidates (cost {})",
            result,
            cheapest
        );
    }

    #[test]
    fn nearest_instance_straddles_target() {
        assert_eq!(62, nearest_instance(2, 63));
        assert_eq!(65, nearest_instance(5, 63));
        assert_eq!(60, nearest_instance(0, 60));
        assert_eq!(57, nearest_instance(9, 61));
        // 6 semitones either way goes to the lower instance.
        assert_eq!(54, nearest_instance(6, 60));
        assert_eq!(-2, nearest_instance(10, 1));
    }

    #[test]
    fn c_major_to_d_minor() {
        let previous = [60, 64, 67];
        let result = lead(&[2, 5, 9], &previous).expect("expected voicing");
        // A is placed below the centroid on the tie, so the C moves down to it.
        assert_eq!(vec![62, 65, 57], result);

        let center = 63;
        let placed: Vec<i32> = [2, 5, 9].iter().map(|pc| nearest_instance(*pc, center)).collect();
        let (assignment, cost) = best_assignment(&placed, &previous);
        assert_eq!(vec![1, 2, 0], assignment);
        assert_eq!(7, cost);
        assert!(all_costs(&placed, &previous).iter().all(|other| cost <= *other));
    }

    #[test]
    fn common_tones_stay_put() {
        // C major to E minor keeps E and G, moves C down to B.
        assert_eq!(Some(vec![64, 67, 59]), lead(&[4, 7, 11], &[60, 64, 67]));
    }

    #[test]
    fn growth_adds_one_voice() {
        // C major to C7: the existing voices stay put and the seventh is added.
        let result = lead(&[0, 4, 7, 10], &[60, 64, 67]).expect("expected voicing");
        assert_eq!(60, result[0]);
        assert_eq!(64, result[1]);
        assert_eq!(67, result[2]);
        assert_eq!(10, result[3].rem_euclid(12));
        assert_cheapest(&result, &growth_candidates(&[0, 4, 7, 10], &[60, 64, 67]));

        // C major to Am7, where the added voice is not the last one.
        let result = lead(&[9, 0, 4, 7], &[60, 64, 67]).expect("expected voicing");
        assert_cheapest(&result, &growth_candidates(&[9, 0, 4, 7], &[60, 64, 67]));
    }

    #[test]
    fn shrinkage_drops_one_voice() {
        // C7 to F major: one of the four previous voices is orphaned.
        let result = lead(&[5, 9, 0], &[60, 64, 67, 70]).expect("expected voicing");
        assert_eq!(3, result.len());
        assert_eq!(
            vec![5, 9, 0],
            result.iter().map(|n| n.rem_euclid(12)).collect::<Vec<_>>()
        );
        let spread = result.iter().max().unwrap() - result.iter().min().unwrap();
        assert!(spread < 12, "voicing {:?} is spread too wide", result);
        assert_cheapest(&result, &shrinkage_candidates(&[5, 9, 0], &[60, 64, 67, 70]));

        // G7 in a wide spread to E minor.
        let result = lead(&[4, 7, 11], &[43, 59, 62, 65]).expect("expected voicing");
        assert_cheapest(&result, &shrinkage_candidates(&[4, 7, 11], &[43, 59, 62, 65]));
    }

    #[test]
    fn refuses_unledable_chords() {
        assert_eq!(None, lead(&[0, 4, 7], &[]));
        assert_eq!(None, lead(&[0], &[60, 64, 67]));
        assert_eq!(None, lead(&[0, 1, 2, 3, 4, 5, 6], &[60, 61, 62, 63, 64, 65]));
    }

    proptest! {
        #[test]
        fn assignment_is_optimal(
            root_a in 0i32..12,
            root_b in 0i32..12,
            octave in 3i32..7,
        ) {
            // Two major triads with disjoint pitch classes.
            let a: Vec<i32> = [0, 4, 7].iter().map(|o| octave * 12 + root_a + o).collect();
            let b: Vec<i32> = [0, 4, 7].iter().map(|o| (root_b + o) % 12).collect();
            prop_assume!(a.iter().all(|n| !b.contains(&(n % 12))));

            let center = a.iter().sum::<i32>() / 3;
            let placed: Vec<i32> = b.iter().map(|pc| nearest_instance(*pc, center)).collect();
            let (_, cost) = best_assignment(&placed, &a);
            for other in all_costs(&placed, &a) {
                prop_assert!(cost <= other);
            }
        }

        #[test]
        fn size_changes_pick_cheapest_candidate(
            root_a in 0i32..12,
            root_b in 0i32..12,
            octave in 3i32..7,
        ) {
            let triad: Vec<i32> = [0, 4, 7].iter().map(|o| (root_a + o) % 12).collect();
            let seventh: Vec<i32> = [0, 4, 7, 10].iter().map(|o| (root_b + o) % 12).collect();
            let triad_notes: Vec<i32> = triad.iter().map(|pc| octave * 12 + pc).collect();
            let seventh_notes: Vec<i32> = seventh.iter().map(|pc| octave * 12 + pc).collect();

            let grown = lead(&seventh, &triad_notes).expect("expected voicing");
            assert_cheapest(&grown, &growth_candidates(&seventh, &triad_notes));

            let shrunk = lead(&triad, &seventh_notes).expect("expected voicing");
            assert_cheapest(&shrunk, &shrinkage_candidates(&triad, &seventh_notes));
        }
    }
}
