//! Option candidate selection.
//!
//! Takes the best contract found per underlying and decides which to
//! actually sell this cycle: affordable first, cheapest marginal
//! commitment first when funds are scarce, highest return on collateral
//! first within the budget, and never more than two new symbols per
//! invocation so order flow stays throttled.

use rust_decimal::Decimal;
use tracing::debug;
use vigil_domain::{OptionCandidate, Order, Position, Settings};

use crate::exposure::estimated_units;
use crate::types::{Selection, SellPick};

/// New symbols accepted per invocation.
const MAX_NEW_SYMBOLS: usize = 2;

struct Ranked {
    candidate: OptionCandidate,
    existing_units: u32,
    potential_allocation: Decimal,
    percent_return: Decimal,
}

/// Rank affordable candidates and pick the subset to sell.
///
/// Candidates arrive one per underlying, `None` where the chain selector
/// found nothing; those are dropped up front. Selection walks the
/// percent-return ranking with a running buying-power counter, skipping
/// (not stopping at) anything that does not fit, and stops outright once
/// two symbols are accepted.
pub fn select_puts_to_sell(
    candidates: Vec<Option<OptionCandidate>>,
    option_buying_power: Decimal,
    settings: &Settings,
    positions: &[Position],
    orders: &[Order],
) -> Selection {
    let resolved: Vec<OptionCandidate> = candidates.into_iter().flatten().collect();
    if resolved.is_empty() {
        return Selection::NoCandidates;
    }

    // Affordability: collateral must fit inside buying power outright.
    let affordable: Vec<OptionCandidate> = resolved
        .into_iter()
        .filter(|c| c.collateral() < option_buying_power)
        .collect();
    if affordable.is_empty() {
        return Selection::InsufficientFunds;
    }

    // Cheapest marginal commitment first; the stable sort keeps this as
    // the tiebreak for equal percent returns below.
    let mut ranked: Vec<Ranked> = affordable
        .into_iter()
        .map(|candidate| {
            let existing_units = estimated_units(candidate.underlying(), positions, orders);
            let allocation = candidate.collateral() * Decimal::from(existing_units);
            Ranked {
                existing_units,
                potential_allocation: allocation + candidate.collateral(),
                percent_return: candidate.percent_return(),
                candidate,
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.potential_allocation.cmp(&b.potential_allocation));

    // Concentration caps.
    ranked.retain(|r| {
        r.potential_allocation < settings.max_allocation
            && r.existing_units < settings.max_positions
    });
    if ranked.is_empty() {
        return Selection::MaxedOut;
    }

    // Highest return on collateral first.
    ranked.sort_by(|a, b| b.percent_return.cmp(&a.percent_return));

    let mut running_power = option_buying_power;
    let mut picks = Vec::new();
    for ranked_candidate in ranked {
        let collateral = ranked_candidate.candidate.collateral();
        if running_power - collateral <= Decimal::ZERO {
            // Does not fit; keep evaluating the rest.
            debug!(
                symbol = %ranked_candidate.candidate.symbol,
                %collateral,
                %running_power,
                "candidate skipped, collateral exceeds running buying power"
            );
            continue;
        }
        running_power -= collateral;
        picks.push(SellPick { candidate: ranked_candidate.candidate, contracts: 1 });
        if picks.len() >= MAX_NEW_SYMBOLS {
            break;
        }
    }

    if picks.is_empty() {
        Selection::InsufficientFunds
    } else {
        Selection::Picks(picks)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn candidate(underlying: &str, strike: Decimal, weekly_rate: Decimal) -> OptionCandidate {
        use rust_decimal::prelude::ToPrimitive;
        let millis = (strike * dec!(1000)).to_i64().unwrap();
        OptionCandidate {
            symbol: format!("{}250117P{:08}", underlying, millis),
            strike,
            premium: weekly_rate * dec!(2),
            delta: dec!(-0.3),
            weekly_rate,
        }
    }

    fn settings(max_allocation: Decimal, max_positions: u32) -> Settings {
        Settings {
            puts_enabled: true,
            max_allocation,
            max_positions,
            ..Settings::default()
        }
    }

    fn position(symbol: &str, quantity: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            quantity,
            cost_basis: Decimal::ZERO,
            date_acquired: Utc::now(),
        }
    }

    #[test]
    fn test_empty_input_means_no_candidates() {
        let selection =
            select_puts_to_sell(vec![None, None], dec!(100000), &settings(dec!(1000000), 10), &[], &[]);
        assert_eq!(selection, Selection::NoCandidates);
    }

    #[test]
    fn test_unaffordable_collateral_means_insufficient_funds() {
        // 250 × 100 = 25 000 collateral against 10 000 buying power
        let selection = select_puts_to_sell(
            vec![Some(candidate("MSFT", dec!(250), dec!(100)))],
            dec!(10000),
            &settings(dec!(1000000), 10),
            &[],
            &[],
        );
        assert_eq!(selection, Selection::InsufficientFunds);
    }

    #[test]
    fn test_caps_produce_maxed_out() {
        // Existing exposure of 3 units ≥ max_positions of 3
        let positions = vec![position("MSFT250117P00200000", dec!(-3))];
        let selection = select_puts_to_sell(
            vec![Some(candidate("MSFT", dec!(100), dec!(50)))],
            dec!(100000),
            &settings(dec!(1000000), 3),
            &positions,
            &[],
        );
        assert_eq!(selection, Selection::MaxedOut);

        // Potential allocation 4 × 10 000 ≥ max_allocation 40 000
        let selection = select_puts_to_sell(
            vec![Some(candidate("MSFT", dec!(100), dec!(50)))],
            dec!(100000),
            &settings(dec!(40000), 10),
            &positions,
            &[],
        );
        assert_eq!(selection, Selection::MaxedOut);
    }

    #[test]
    fn test_ranking_is_percent_return_descending() {
        // AAPL: 60 / 5 000 = 1.2% — GOOG: 100 / 10 000 = 1.0%
        let selection = select_puts_to_sell(
            vec![
                Some(candidate("GOOG", dec!(100), dec!(100))),
                Some(candidate("AAPL", dec!(50), dec!(60))),
            ],
            dec!(100000),
            &settings(dec!(1000000), 10),
            &[],
            &[],
        );
        let Selection::Picks(picks) = selection else { panic!("expected picks") };
        assert_eq!(picks[0].candidate.underlying(), "AAPL");
        assert_eq!(picks[1].candidate.underlying(), "GOOG");
    }

    #[test]
    fn test_at_most_two_symbols_accepted() {
        let selection = select_puts_to_sell(
            vec![
                Some(candidate("AAA", dec!(10), dec!(30))),
                Some(candidate("BBB", dec!(10), dec!(20))),
                Some(candidate("CCC", dec!(10), dec!(10))),
            ],
            dec!(100000),
            &settings(dec!(1000000), 10),
            &[],
            &[],
        );
        let Selection::Picks(picks) = selection else { panic!("expected picks") };
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn test_budget_walk_skips_but_does_not_stop() {
        // Buying power 12 000: AAPL (1.2%, 11 000) fits and leaves 1 000;
        // GOOG (1.1%, 10 000) no longer fits and is skipped; FFF (1.0%,
        // 900) still fits individually and is accepted afterwards.
        let selection = select_puts_to_sell(
            vec![
                Some(candidate("AAPL", dec!(110), dec!(132))),
                Some(candidate("GOOG", dec!(100), dec!(110))),
                Some(candidate("FFF", dec!(9), dec!(9))),
            ],
            dec!(12000),
            &settings(dec!(1000000), 10),
            &[],
            &[],
        );
        let Selection::Picks(picks) = selection else { panic!("expected picks") };
        let symbols: Vec<&str> = picks.iter().map(|p| p.candidate.underlying()).collect();
        assert_eq!(symbols, vec!["AAPL", "FFF"]);
    }

    #[test]
    fn test_selected_collateral_stays_within_budget() {
        let selection = select_puts_to_sell(
            vec![
                Some(candidate("AAA", dec!(60), dec!(90))),
                Some(candidate("BBB", dec!(60), dec!(60))),
            ],
            dec!(10000),
            &settings(dec!(1000000), 10),
            &[],
            &[],
        );
        let Selection::Picks(picks) = selection else { panic!("expected picks") };
        let spent: Decimal = picks.iter().map(|p| p.collateral()).sum();
        assert!(spent < dec!(10000));
        assert_eq!(picks.len(), 1); // second 6 000 collateral does not fit
    }

    #[test]
    fn test_collateral_equal_to_budget_is_rejected() {
        // Affordability is strict: 10 000 collateral against exactly
        // 10 000 buying power does not qualify.
        let selection = select_puts_to_sell(
            vec![Some(candidate("AAA", dec!(100), dec!(50)))],
            dec!(10000),
            &settings(dec!(1000000), 10),
            &[],
            &[],
        );
        assert_eq!(selection, Selection::InsufficientFunds);
    }
}
