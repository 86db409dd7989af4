//! Split allocation.
//!
//! Pure computation: given a total amount, the splitter list and a
//! [`SplitStrategy`], produce per-participant owed amounts that sum to the
//! total to the cent. No side effects; validation failures reject the input
//! before anything is persisted.
//!
//! Penny distribution is always deterministic in input order, so the same
//! inputs reproduce the same allocation on edit.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{EngineError, ExpenseShare, Money, ResultEngine, SplitInput, SplitStrategy};

/// Result of a split allocation.
///
/// `percent_gap` is only set by the percentage strategy when the supplied
/// percentages do not sum to 100: positive = shortfall, negative = excess.
/// The allocation still proceeds; callers surface the gap as a warning.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub shares: Vec<ExpenseShare>,
    pub percent_gap: Option<f64>,
}

/// Allocates `total` among `participants` under `strategy`.
///
/// Every participant gets an entry, in input order. Guarantees (except for
/// the percentage strategy, which follows the raw percentages):
/// `sum(shares) == total` to the cent.
pub fn allocate(
    total: Money,
    participants: &[Uuid],
    strategy: SplitStrategy,
    inputs: &[SplitInput],
) -> ResultEngine<Allocation> {
    if total.is_negative() {
        return Err(EngineError::InvalidSplit(
            "total must not be negative".to_string(),
        ));
    }
    if participants.is_empty() {
        return Err(EngineError::InvalidSplit(
            "participant set must not be empty".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(participants.len());
    for id in participants {
        if !seen.insert(*id) {
            return Err(EngineError::InvalidSplit(
                "duplicate participant".to_string(),
            ));
        }
    }
    let raw = input_map(participants, inputs)?;

    let (cents, percent_gap) = match strategy {
        SplitStrategy::Equal => (equal_parts(total.cents(), participants.len()), None),
        SplitStrategy::Percentage => percentage_parts(total.cents(), participants, &raw)?,
        SplitStrategy::Weight => (weight_parts(total.cents(), participants, &raw)?, None),
        SplitStrategy::Manual => (manual_parts(total.cents(), participants, &raw)?, None),
        SplitStrategy::Extra => (extra_parts(total.cents(), participants, &raw)?, None),
    };

    let shares = participants
        .iter()
        .zip(cents)
        .map(|(id, amount)| ExpenseShare {
            participant_id: *id,
            amount: Money::new(amount),
        })
        .collect();

    Ok(Allocation {
        shares,
        percent_gap,
    })
}

/// Splits one splitter share across multiple payers, proportionally to the
/// amount each payer fronted. Exact to the cent; remainder pennies go to
/// payers in input order.
pub fn allocate_across_payers(share: Money, payers: &[ExpenseShare]) -> ResultEngine<Vec<Money>> {
    let total_paid: i64 = payers.iter().map(|p| p.amount.cents()).sum();
    if total_paid <= 0 {
        return Err(EngineError::InvalidSplit(
            "payer amounts must sum to a positive total".to_string(),
        ));
    }
    if payers.iter().any(|p| p.amount.is_negative()) {
        return Err(EngineError::InvalidSplit(
            "payer amounts must not be negative".to_string(),
        ));
    }

    let mut parts: Vec<i64> = payers
        .iter()
        .map(|p| round_ratio(share.cents(), p.amount.cents(), total_paid))
        .collect();
    let assigned: i64 = parts.iter().sum();
    distribute_remainder(
        &mut parts,
        share.cents() - assigned,
        |i| payers[i].amount.is_positive(),
    );

    Ok(parts.into_iter().map(Money::new).collect())
}

fn input_map(
    participants: &[Uuid],
    inputs: &[SplitInput],
) -> ResultEngine<HashMap<Uuid, f64>> {
    let members: HashSet<Uuid> = participants.iter().copied().collect();
    let mut map = HashMap::with_capacity(inputs.len());
    for input in inputs {
        if !members.contains(&input.participant_id) {
            return Err(EngineError::InvalidSplit(
                "input for unknown participant".to_string(),
            ));
        }
        if !input.raw_value.is_finite() {
            return Err(EngineError::InvalidSplit(
                "input value must be finite".to_string(),
            ));
        }
        if map.insert(input.participant_id, input.raw_value).is_some() {
            return Err(EngineError::InvalidSplit(
                "duplicate input for participant".to_string(),
            ));
        }
    }
    Ok(map)
}

/// Equal split of `total` cents into `n` parts: base = floor(total / n),
/// remaining pennies one at a time in input order. Works for negative
/// remainders too (euclidean base keeps the spread within one cent).
fn equal_parts(total: i64, n: usize) -> Vec<i64> {
    let n_i64 = n as i64;
    let base = total.div_euclid(n_i64);
    let extra = total.rem_euclid(n_i64);
    (0..n_i64)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Rounds `amount * num / den` to the nearest cent, half away from zero.
fn round_ratio(amount: i64, num: i64, den: i64) -> i64 {
    let product = amount as i128 * num as i128;
    let den = den as i128;
    let half = if product >= 0 { den / 2 } else { -(den / 2) };
    ((product + half) / den) as i64
}

/// Adds (or removes) one cent at a time, in input order, to positions
/// accepted by `eligible`, cycling until the remainder is exhausted. Never
/// takes a share below zero when removing.
fn distribute_remainder<F>(parts: &mut [i64], mut remainder: i64, eligible: F)
where
    F: Fn(usize) -> bool,
{
    let step = remainder.signum();
    if step == 0 {
        return;
    }
    while remainder != 0 {
        let mut moved = false;
        for i in 0..parts.len() {
            if remainder == 0 {
                break;
            }
            if !eligible(i) {
                continue;
            }
            if step < 0 && parts[i] == 0 {
                continue;
            }
            parts[i] += step;
            remainder -= step;
            moved = true;
        }
        if !moved {
            break;
        }
    }
}

fn percentage_parts(
    total: i64,
    participants: &[Uuid],
    raw: &HashMap<Uuid, f64>,
) -> ResultEngine<(Vec<i64>, Option<f64>)> {
    let mut sum_pct = 0.0;
    let mut parts = Vec::with_capacity(participants.len());
    for id in participants {
        let pct = raw.get(id).copied().unwrap_or(0.0);
        if !(0.0..=100.0).contains(&pct) {
            return Err(EngineError::InvalidSplit(
                "percentage must be between 0 and 100".to_string(),
            ));
        }
        sum_pct += pct;
        // Independent rounding per participant; no normalization.
        parts.push((total as f64 * pct / 100.0).round() as i64);
    }

    let gap = 100.0 - sum_pct;
    let percent_gap = (gap.abs() > 1e-9).then_some(gap);
    Ok((parts, percent_gap))
}

fn weight_parts(
    total: i64,
    participants: &[Uuid],
    raw: &HashMap<Uuid, f64>,
) -> ResultEngine<Vec<i64>> {
    let mut weights = Vec::with_capacity(participants.len());
    for id in participants {
        let weight = raw.get(id).copied().unwrap_or(0.0);
        if weight < 0.0 {
            return Err(EngineError::InvalidSplit(
                "weight must not be negative".to_string(),
            ));
        }
        weights.push(weight);
    }
    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        return Err(EngineError::InvalidSplit(
            "weights must sum to a positive total".to_string(),
        ));
    }

    let mut parts: Vec<i64> = weights
        .iter()
        .map(|w| (total as f64 * w / total_weight).round() as i64)
        .collect();
    let assigned: i64 = parts.iter().sum();
    distribute_remainder(&mut parts, total - assigned, |i| weights[i] > 0.0);

    Ok(parts)
}

fn manual_parts(
    total: i64,
    participants: &[Uuid],
    raw: &HashMap<Uuid, f64>,
) -> ResultEngine<Vec<i64>> {
    let mut explicit = Vec::with_capacity(participants.len());
    let mut sum_explicit = 0i64;
    for id in participants {
        let cents = match raw.get(id) {
            Some(value) => {
                let cents = to_cents(*value);
                if cents < 0 {
                    return Err(EngineError::InvalidSplit(
                        "manual amount must not be negative".to_string(),
                    ));
                }
                sum_explicit += cents;
                Some(cents)
            }
            None => None,
        };
        explicit.push(cents);
    }

    let remainder = total - sum_explicit;
    if remainder < 0 {
        return Err(EngineError::InvalidSplit(
            "manual amounts exceed total".to_string(),
        ));
    }

    let implicit = explicit.iter().filter(|c| c.is_none()).count();
    if implicit == 0 {
        if remainder != 0 {
            return Err(EngineError::InvalidSplit(
                "manual amounts must sum to total".to_string(),
            ));
        }
        return Ok(explicit.into_iter().map(|c| c.unwrap_or(0)).collect());
    }

    // Participants without an explicit amount split the remainder equally.
    let mut equal = equal_parts(remainder, implicit).into_iter();
    Ok(explicit
        .into_iter()
        .map(|c| c.unwrap_or_else(|| equal.next().unwrap_or(0)))
        .collect())
}

fn extra_parts(
    total: i64,
    participants: &[Uuid],
    raw: &HashMap<Uuid, f64>,
) -> ResultEngine<Vec<i64>> {
    let adjustments: Vec<i64> = participants
        .iter()
        .map(|id| to_cents(raw.get(id).copied().unwrap_or(0.0)))
        .collect();
    let sum_adjustments: i64 = adjustments.iter().sum();

    // The remainder is split equally among all participants, adjusted or not.
    let equal = equal_parts(total - sum_adjustments, participants.len());
    let parts: Vec<i64> = adjustments
        .iter()
        .zip(&equal)
        .map(|(adj, eq)| adj + eq)
        .collect();

    if parts.iter().any(|c| *c < 0) {
        return Err(EngineError::InvalidSplit(
            "adjustment drives a share below zero".to_string(),
        ));
    }
    Ok(parts)
}

fn to_cents(major: f64) -> i64 {
    (major * 100.0).round() as i64
}
