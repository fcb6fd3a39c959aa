//! Tier and stage progression: meditation sessions and breakthroughs.
//!
//! A character is either idle or cultivating. Starting a session is gated by a
//! daily cap; finishing one is gated by the session duration and pays out
//! cultivation scaled by elemental affinity, followed by one random event.
//! Breakthroughs are gated by readiness, a cooldown and the tier's pill.
use chrono::Duration;
use log::debug;

use crate::game::dice::weighted_pick;
use crate::game::engine::Turn;
use crate::game::errors::{GameError, Refusal};
use crate::game::inventory;
use crate::game::types::{Character, Delta, Element, Outcome, OutcomeKind, Stage};

/// What happened during a finished meditation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeditationEvent {
    /// Cultivation x1.1
    Insight,
    /// Cultivation x0.9
    Distraction,
    /// Cultivation x1.5
    Epiphany,
    /// Health -20
    QiDeviation,
    Calm,
}

pub const MEDITATION_EVENTS: [(f64, MeditationEvent); 5] = [
    (0.10, MeditationEvent::Insight),
    (0.05, MeditationEvent::Distraction),
    (0.01, MeditationEvent::Epiphany),
    (0.01, MeditationEvent::QiDeviation),
    (0.83, MeditationEvent::Calm),
];

/// Consequence of a failed breakthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakthroughPenalty {
    /// Cultivation -100
    Regression,
    /// Health -30
    Injury,
    Spared,
}

pub const BREAKTHROUGH_PENALTIES: [(f64, BreakthroughPenalty); 3] = [
    (0.5, BreakthroughPenalty::Regression),
    (0.3, BreakthroughPenalty::Injury),
    (0.2, BreakthroughPenalty::Spared),
];

/// Cultivation gained per session before affinity: `10 x 2^tier`.
pub fn base_gain(tier: usize) -> f64 {
    10.0 * 2f64.powi(tier as i32)
}

/// Affinity multiplier applied to session gains.
pub fn cultivation_efficiency(character: &Character) -> f64 {
    if character.has_chaos_root() {
        return 1.0;
    }
    let purities: Vec<f64> = character
        .affinities
        .iter()
        .filter(|(element, _)| **element != Element::Chaos)
        .map(|(_, purity)| *purity as f64)
        .collect();
    match purities.len() {
        0 => 0.5,
        1 => 0.8 + purities[0] / 500.0,
        n => 0.5 + purities.iter().sum::<f64>() / n as f64 / 500.0,
    }
}

/// Breakthrough success probability for the character's current tier.
pub fn breakthrough_chance(character: &Character, favored: bool) -> f64 {
    let faction_bonus = if favored { 0.1 } else { 0.0 };
    let chance = 0.5 * 0.9f64.powi(character.tier as i32)
        + character.max_purity() as f64 / 500.0
        + faction_bonus;
    chance.clamp(0.1, 0.9)
}

/// Whole seconds left on a wait, rounded up and never zero.
pub(crate) fn remaining_secs(wait: Duration) -> i64 {
    let secs = wait.num_seconds();
    if wait > Duration::seconds(secs) {
        secs + 1
    } else {
        secs.max(1)
    }
}

/// Enter secluded cultivation.
pub fn start_session(character: &mut Character, turn: &Turn<'_>) -> Result<Outcome, GameError> {
    if character.is_cultivating() {
        return Refusal::AlreadyInProgress.fail();
    }
    let cap = turn.rules.daily_session_cap;
    let today = turn.rules.calendar_day(turn.now);
    let used_today = match character.last_session_at {
        Some(at) if turn.rules.calendar_day(at) == today => character.sessions_today,
        _ => 0,
    };
    if used_today >= cap {
        return Refusal::DailyLimitReached { cap }.fail();
    }

    character.sessions_today = used_today + 1;
    character.last_session_at = Some(turn.now);
    character.cultivating_since = Some(turn.now);

    let narrative = format!(
        "You enter secluded cultivation. Return in {} minutes to gather your qi. (Session {}/{} today)",
        turn.rules.session_minutes, character.sessions_today, cap
    );
    Ok(Outcome::new(OutcomeKind::SessionStarted, narrative))
}

/// Leave cultivation and collect the session's gain.
pub fn complete_session(
    character: &mut Character,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    let Some(since) = character.cultivating_since else {
        return Refusal::NotCultivating.fail();
    };
    let ready_at = since + turn.rules.session_duration();
    if turn.now < ready_at {
        return Refusal::SessionNotElapsed {
            remaining_secs: remaining_secs(ready_at - turn.now),
        }
        .fail();
    }

    let before = character.clone();
    let efficiency = cultivation_efficiency(character);
    let gain = base_gain(character.tier) * efficiency;
    character.cultivation += gain;
    character.cultivating_since = None;

    let mut lines = vec![format!(
        "Your meditation ends. Cultivation +{:.1} (efficiency {:.0}%).",
        gain,
        efficiency * 100.0
    )];

    let event = weighted_pick(&mut *turn.dice, &MEDITATION_EVENTS)
        .copied()
        .unwrap_or(MeditationEvent::Calm);
    debug!("{} meditation event {:?}", character.identity, event);
    match event {
        MeditationEvent::Insight => {
            character.cultivation *= 1.1;
            lines.push("A flash of insight! Your cultivation swells by a tenth.".to_string());
        }
        MeditationEvent::Distraction => {
            character.cultivation = (character.cultivation * 0.9).max(0.0);
            lines.push("Stray thoughts disturb you. A tenth of your cultivation slips away.".to_string());
        }
        MeditationEvent::Epiphany => {
            character.cultivation *= 1.5;
            lines.push("Epiphany! The Dao reveals itself and your cultivation surges by half.".to_string());
        }
        MeditationEvent::QiDeviation => {
            character.lose_health(20);
            lines.push("Your qi deviates and tears at your meridians. Health -20.".to_string());
        }
        MeditationEvent::Calm => {}
    }

    let stage_before = character.stage;
    character.refresh_stage();
    if character.stage != stage_before {
        lines.push(format!("You reach the {} stage.", character.stage));
    }
    if character.ready_for_breakthrough() {
        lines.push("Your foundation is perfected. You may attempt a breakthrough.".to_string());
    }

    Ok(Outcome::new(OutcomeKind::SessionCompleted, lines.join("\n"))
        .with_delta(Delta::between(&before, character)))
}

/// Try to advance to the next tier.
///
/// The attempt timestamp is recorded once the dice are rolled, even when the
/// character turns out to stand on the last tier; that refusal is the only one
/// whose state must be persisted.
pub fn attempt_breakthrough(
    character: &mut Character,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    if !character.ready_for_breakthrough() {
        return Refusal::TierRequirementUnmet {
            stage: character.stage,
        }
        .fail();
    }
    if let Some(last) = character.last_breakthrough_at {
        let until = last + turn.rules.breakthrough_cooldown();
        if turn.now < until {
            return Refusal::CooldownActive {
                action: "attempt a breakthrough".to_string(),
                remaining_secs: remaining_secs(until - turn.now),
            }
            .fail();
        }
    }

    let catalog = turn.catalog;
    let ladder = catalog.ladder(character.faction)?;
    let tier = ladder.get(character.tier).ok_or_else(|| {
        GameError::Catalog(format!(
            "{} ladder has no tier {}",
            character.faction, character.tier
        ))
    })?;
    if let Some(item) = &tier.breakthrough_item {
        if inventory::quantity_of_base(character, item) == 0 {
            let label = catalog
                .recipe_by_id(item)
                .map(|recipe| recipe.name.clone())
                .unwrap_or_else(|| item.clone());
            return Refusal::MissingBreakthroughItem { item: label }.fail();
        }
    }

    let favored = tier.favored_faction == Some(character.faction);
    let chance = breakthrough_chance(character, favored);
    let succeeded = turn.dice.roll() < chance;
    debug!(
        "{} breakthrough at tier {}: chance {:.3}, success {}",
        character.identity, character.tier, chance, succeeded
    );
    character.last_breakthrough_at = Some(turn.now);

    let before = character.clone();
    if succeeded {
        let Some(next) = ladder.get(character.tier + 1) else {
            return Refusal::MaxTierReached {
                tier: tier.name.clone(),
            }
            .fail();
        };
        if let Some(item) = &tier.breakthrough_item {
            inventory::take_one_of_base(character, item);
        }
        let rules = turn.rules;
        character.tier += 1;
        character.stage = Stage::Early;
        character.cultivation = 0.0;
        character.max_health += rules.breakthrough_health_gain;
        character.max_mana += rules.breakthrough_mana_gain;
        character.restore_pools();
        character.attack += rules.breakthrough_attack_gain;
        character.defense += rules.breakthrough_defense_gain;

        let narrative = format!(
            "Heaven and earth tremble! You break through to {}.\nMax health +{}, max mana +{}, attack +{}, defense +{}.",
            next.name,
            rules.breakthrough_health_gain,
            rules.breakthrough_mana_gain,
            rules.breakthrough_attack_gain,
            rules.breakthrough_defense_gain
        );
        return Ok(Outcome::new(OutcomeKind::BreakthroughSucceeded, narrative)
            .with_delta(Delta::between(&before, character)));
    }

    let penalty = weighted_pick(&mut *turn.dice, &BREAKTHROUGH_PENALTIES)
        .copied()
        .unwrap_or(BreakthroughPenalty::Spared);
    let mut lines = vec![format!(
        "The barrier of {} holds firm. Your breakthrough fails.",
        tier.name
    )];
    match penalty {
        BreakthroughPenalty::Regression => {
            character.lose_cultivation(100.0);
            character.refresh_stage();
            lines.push("The backlash scatters your cultivation. Cultivation -100.".to_string());
        }
        BreakthroughPenalty::Injury => {
            character.lose_health(30);
            lines.push("The backlash wounds you. Health -30.".to_string());
        }
        BreakthroughPenalty::Spared => {
            lines.push("Fortunately you escape unharmed.".to_string());
        }
    }
    lines.push(format!(
        "You must steady your mind for {} minutes before trying again.",
        turn.rules.breakthrough_cooldown_minutes
    ));
    Ok(Outcome::new(OutcomeKind::BreakthroughFailed, lines.join("\n"))
        .with_delta(Delta::between(&before, character)))
}
