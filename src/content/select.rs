//! Seeded question selection.
//!
//! Every participant draws their questions with a polynomial hash over the
//! UTF-16 units of `"{username}{salt}"`, wrapped in 32-bit signed arithmetic.
//! The same username and content always produce the same sequence, on any
//! device, with no coordination and no stored per-participant assignment.

use super::{Question, RoundSpec};

/// Deterministic index into a pool of `pool_size` candidates.
///
/// The hash wraps like 32-bit signed multiplication so authored seeds keep
/// their historical assignments; `unsigned_abs` folds the sign away before
/// the modulo.
pub fn seeded_index(username: &str, salt: &str, pool_size: usize) -> usize {
    debug_assert!(pool_size > 0, "selection from an empty pool");
    let mut hash: i32 = 0;
    for unit in username.encode_utf16().chain(salt.encode_utf16()) {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    (hash.unsigned_abs() as usize) % pool_size
}

/// Draw `picks` distinct questions from a pool.
///
/// The first pick hashes with the pool salt alone, later picks with
/// `"{salt}-{k}"`. Collisions walk forward through the pool, so the result
/// is always `picks` distinct indices as long as the pool is big enough.
fn pick_from_pool(username: &str, salt: &str, picks: usize, pool: &[Question]) -> Vec<Question> {
    if picks == pool.len() {
        // Drawing the whole pool keeps authored order; fixed rounds rely on
        // this for their question sequence.
        return pool.to_vec();
    }
    let mut chosen: Vec<usize> = Vec::with_capacity(picks);
    for k in 0..picks {
        let seeded = if k == 0 {
            seeded_index(username, salt, pool.len())
        } else {
            seeded_index(username, &format!("{salt}-{k}"), pool.len())
        };
        let mut index = seeded;
        while chosen.contains(&index) {
            index = (index + 1) % pool.len();
        }
        chosen.push(index);
    }
    chosen.into_iter().map(|i| pool[i].clone()).collect()
}

/// The full question sequence a participant faces in one round, pools in
/// authored order.
pub fn questions_for_round(username: &str, spec: &RoundSpec) -> Vec<Question> {
    let mut questions = Vec::with_capacity(spec.question_count());
    for pool in &spec.pools {
        questions.extend(pick_from_pool(username, &pool.salt, pool.picks, &pool.questions));
    }
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{builtin_rounds, QuestionPool};

    fn numbered_questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|i| Question {
                prompt: format!("question {i}"),
                options: vec!["a".into(), "b".into()],
                correct_index: 0,
                image: None,
                points: None,
            })
            .collect()
    }

    #[test]
    fn index_is_stable_for_a_given_seed() {
        let first = seeded_index("scarlett", "logical", 9);
        for _ in 0..10 {
            assert_eq!(seeded_index("scarlett", "logical", 9), first);
        }
    }

    #[test]
    fn index_always_lands_in_the_pool() {
        for name in ["a", "Zo\u{eb}", "参加者", "🦀crab", "", "x y z"] {
            for salt in ["logical", "verbal", "aptitude", "aptitude-1"] {
                for size in [1usize, 2, 9, 12, 31] {
                    assert!(seeded_index(name, salt, size) < size);
                }
            }
        }
    }

    #[test]
    fn different_salts_are_independent_streams() {
        // Not a collision-freedom guarantee, just a sanity check that the
        // salt actually participates in the hash.
        let size = 1000;
        let a = seeded_index("scarlett", "logical", size);
        let b = seeded_index("scarlett", "verbal", size);
        let c = seeded_index("scarlett", "aptitude", size);
        assert!(a != b || b != c);
    }

    #[test]
    fn hash_wraps_like_32_bit_arithmetic() {
        // Long input overflows i32 many times over; the wrapped value must
        // still reduce into range rather than saturate.
        let long = "q".repeat(4096);
        assert!(seeded_index(&long, "salt", 7) < 7);
    }

    #[test]
    fn picks_are_distinct_within_a_pool() {
        // 4 of 5 avoids the full-pool shortcut, so collisions have to be
        // probed away.
        let pool = numbered_questions(5);
        for name in ["ada", "grace", "linus", "same-prefix", "same-prefixx"] {
            let picked = pick_from_pool(name, "rapid", 4, &pool);
            let mut prompts: Vec<_> = picked.iter().map(|q| q.prompt.clone()).collect();
            prompts.sort();
            prompts.dedup();
            assert_eq!(prompts.len(), 4, "duplicate pick for {name}");
        }
    }

    #[test]
    fn round_sequence_is_deterministic() {
        let spec = RoundSpec {
            title: "Warmup".into(),
            countdown_secs: 60,
            points_per_question: 10,
            gate_secret: "secret".into(),
            hint: "hint".into(),
            pools: vec![
                QuestionPool {
                    salt: "alpha".into(),
                    picks: 2,
                    questions: numbered_questions(6),
                },
                QuestionPool {
                    salt: "beta".into(),
                    picks: 1,
                    questions: numbered_questions(4),
                },
            ],
        };
        let first = questions_for_round("marmalade", &spec);
        assert_eq!(first.len(), 3);
        assert_eq!(questions_for_round("marmalade", &spec), first);
    }

    #[test]
    fn full_pool_draw_keeps_authored_order() {
        let pool = numbered_questions(4);
        let picked = pick_from_pool("anyone", "fixed", 4, &pool);
        let prompts: Vec<_> = picked.iter().map(|q| q.prompt.as_str()).collect();
        assert_eq!(
            prompts,
            ["question 0", "question 1", "question 2", "question 3"]
        );
    }

    #[test]
    fn builtin_rounds_deal_full_hands() {
        for spec in builtin_rounds() {
            let hand = questions_for_round("tester", &spec);
            assert_eq!(hand.len(), spec.question_count());
        }
    }
}
