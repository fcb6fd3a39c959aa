//! Thin text dispatcher: parses a chat line into a [`GameCommand`] and answers
//! with the reply string the chat transport should send back.
use log::debug;

use crate::game::combat::format_battle_history;
use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::storage::EntityStore;
use crate::game::types::{Domain, Faction, Outcome};
use crate::logutil::{headline, log_safe};

/// Duels shown by HISTORY.
pub const HISTORY_LIMIT: usize = 10;
/// Entries shown by RANK.
pub const RANK_LIMIT: usize = 10;

/// Parsed player command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    // Character
    Status,                      // STATUS, ST
    Inventory,                   // INVENTORY, I, BAG
    Faction(Option<Faction>),    // FACTION immortal

    // Advancement
    Cultivate,                   // CULTIVATE, MEDITATE
    Finish,                      // FINISH
    Breakthrough,                // BREAKTHROUGH, BT

    // Production
    Craft(Domain, String),       // ALCHEMY foundation pill, FORGE ..., TALISMAN ...
    Recipes(Option<Domain>),     // RECIPES [domain]
    Learn(String),               // LEARN recipe

    // Combat
    Fight(String),               // FIGHT player
    Hunt(String),                // HUNT monster
    Monsters,                    // MONSTERS
    History,                     // HISTORY

    // Farming
    Plants,                      // PLANTS
    Plant(String, u32),          // PLANT spirit herb 2
    Field,                       // FIELD, FARM
    Harvest(u32),                // HARVEST 2
    Accelerate(u32, String),     // GROW 2 spirit water

    // Trade
    Gift {                       // GIFT spirit herb 3 @Blaze
        item: String,
        count: u32,
        target: String,
    },

    // Quests
    Quests,                      // QUESTS, Q
    Accept(String),              // ACCEPT quest
    Complete(String),            // COMPLETE quest

    // System
    Rank,                        // RANK
    Help,                        // HELP, ?
    Usage(&'static str),         // recognised verb, missing argument
    Unknown(String),
}

/// Parse a line of chat into a command. Only the verb is case-insensitive;
/// arguments keep their spelling.
pub fn parse_command(input: &str) -> GameCommand {
    let input = input.trim();
    let mut split = input.splitn(2, char::is_whitespace);
    let verb = split.next().unwrap_or("").to_uppercase();
    let rest = split.next().unwrap_or("").trim().to_string();

    let with_arg = |usage: &'static str, make: fn(String) -> GameCommand| {
        if rest.is_empty() {
            GameCommand::Usage(usage)
        } else {
            make(rest.clone())
        }
    };

    match verb.as_str() {
        "ST" | "STATUS" => GameCommand::Status,
        "I" | "INV" | "INVENTORY" | "BAG" => GameCommand::Inventory,
        "FACTION" => {
            if rest.is_empty() {
                GameCommand::Faction(None)
            } else {
                match Faction::parse(&rest) {
                    Some(faction) => GameCommand::Faction(Some(faction)),
                    None => GameCommand::Usage("FACTION <immortal|demonic|neutral>"),
                }
            }
        }

        "CULTIVATE" | "MEDITATE" => GameCommand::Cultivate,
        "FINISH" => GameCommand::Finish,
        "BT" | "BREAKTHROUGH" => GameCommand::Breakthrough,

        "ALCHEMY" | "REFINE" => with_arg("ALCHEMY <recipe>", |r| GameCommand::Craft(Domain::Alchemy, r)),
        "FORGE" | "FORGING" => with_arg("FORGE <recipe>", |r| GameCommand::Craft(Domain::Forging, r)),
        "TALISMAN" | "DRAW" => with_arg("TALISMAN <recipe>", |r| GameCommand::Craft(Domain::Talisman, r)),
        "RECIPES" => {
            if rest.is_empty() {
                GameCommand::Recipes(None)
            } else {
                match Domain::parse(&rest) {
                    Some(domain) => GameCommand::Recipes(Some(domain)),
                    None => GameCommand::Usage("RECIPES [alchemy|forging|talisman]"),
                }
            }
        }
        "LEARN" => with_arg("LEARN <recipe>", GameCommand::Learn),

        "FIGHT" | "DUEL" => with_arg("FIGHT <player>", GameCommand::Fight),
        "HUNT" => with_arg("HUNT <monster>", GameCommand::Hunt),
        "MONSTERS" => GameCommand::Monsters,
        "HISTORY" => GameCommand::History,

        "PLANTS" => GameCommand::Plants,
        "PLANT" | "SOW" => match split_last(&rest).map(|(plant, plot)| (plant, plot.parse::<u32>())) {
            Some((plant, Ok(plot))) if !plant.is_empty() => GameCommand::Plant(plant.to_string(), plot),
            _ => GameCommand::Usage("PLANT <plant> <plot>"),
        },
        "FIELD" | "FARM" => GameCommand::Field,
        "HARVEST" => match rest.parse() {
            Ok(plot) => GameCommand::Harvest(plot),
            Err(_) => GameCommand::Usage("HARVEST <plot>"),
        },
        "GROW" | "ACCELERATE" => match rest.split_once(char::is_whitespace) {
            Some((plot, item)) if !item.trim().is_empty() => match plot.parse() {
                Ok(plot) => GameCommand::Accelerate(plot, item.trim().to_string()),
                Err(_) => GameCommand::Usage("GROW <plot> <item>"),
            },
            _ => GameCommand::Usage("GROW <plot> <item>"),
        },
        "GIFT" | "GIVE" => parse_gift(&rest).unwrap_or(GameCommand::Usage("GIFT <item> [count] <player>")),

        "Q" | "QUESTS" => GameCommand::Quests,
        "ACCEPT" => with_arg("ACCEPT <quest>", GameCommand::Accept),
        "COMPLETE" => with_arg("COMPLETE <quest>", GameCommand::Complete),

        "RANK" => GameCommand::Rank,
        "HELP" | "?" => GameCommand::Help,
        _ => GameCommand::Unknown(input.to_string()),
    }
}

/// Split off the last whitespace-separated token.
fn split_last(text: &str) -> Option<(&str, &str)> {
    text.rsplit_once(char::is_whitespace)
        .map(|(head, last)| (head.trim_end(), last))
}

/// `<item> [count] <player>`: the player is the last token and a numeric
/// token just before it is the count.
fn parse_gift(rest: &str) -> Option<GameCommand> {
    let (head, target) = split_last(rest)?;
    let (item, count) = match split_last(head) {
        Some((item, count)) if !item.is_empty() => match count.parse() {
            Ok(count) => (item, count),
            Err(_) => (head, 1),
        },
        _ => (head, 1),
    };
    if item.is_empty() {
        return None;
    }
    Some(GameCommand::Gift {
        item: item.to_string(),
        count,
        target: target.to_string(),
    })
}

pub fn help_text() -> &'static str {
    "=== COMMANDS ===\n\
     STATUS | INVENTORY | FACTION <path>\n\
     CULTIVATE | FINISH | BREAKTHROUGH\n\
     ALCHEMY|FORGE|TALISMAN <recipe>\n\
     RECIPES [domain] | LEARN <recipe>\n\
     FIGHT <player> | HUNT <monster> | MONSTERS | HISTORY\n\
     PLANTS | FIELD | PLANT <plant> <plot> | HARVEST <plot> | GROW <plot> <item>\n\
     GIFT <item> [count] <player>\n\
     QUESTS | ACCEPT <quest> | COMPLETE <quest>\n\
     RANK | HELP"
}

fn outcome_text(result: Result<Outcome, GameError>) -> Result<String, GameError> {
    result.map(|outcome| outcome.narrative)
}

/// Run one command for `identity` and return the reply.
///
/// First contact creates the character. Refusals come back as their player text;
/// integrity failures are replaced by a generic message.
pub fn handle_command<S: EntityStore>(
    game: &Game<S>,
    identity: &str,
    display_name: &str,
    input: &str,
) -> String {
    let command = parse_command(input);
    debug!("{} -> {:?}", identity, log_safe(&format!("{:?}", command)));
    match dispatch(game, identity, display_name, command) {
        Ok(reply) => reply,
        Err(err) => err.player_message(),
    }
}

fn dispatch<S: EntityStore>(
    game: &Game<S>,
    identity: &str,
    display_name: &str,
    command: GameCommand,
) -> Result<String, GameError> {
    let (_, created) = game.enter(identity, display_name)?;
    let greeting = if created {
        let status = game.status(identity)?;
        format!(
            "Welcome to the cultivation world, {}! Your spiritual root has awakened.\n{}\n\n",
            display_name.trim(),
            status
        )
    } else {
        String::new()
    };

    let reply = match command {
        GameCommand::Status => game.status(identity),
        GameCommand::Inventory => game.inventory(identity),
        GameCommand::Faction(None) => Ok(format!(
            "Choose a path: {}",
            Faction::ALL
                .iter()
                .map(|f| f.label())
                .collect::<Vec<_>>()
                .join(", ")
        )),
        GameCommand::Faction(Some(faction)) => outcome_text(game.choose_faction(identity, faction)),

        GameCommand::Cultivate => outcome_text(game.start_cultivation(identity)),
        GameCommand::Finish => outcome_text(game.finish_cultivation(identity)),
        GameCommand::Breakthrough => outcome_text(game.attempt_breakthrough(identity)),

        GameCommand::Craft(domain, recipe) => outcome_text(game.craft(identity, domain, &recipe)),
        GameCommand::Recipes(domain) => game.recipe_list(identity, domain),
        GameCommand::Learn(recipe) => outcome_text(game.learn_recipe(identity, &recipe)),

        GameCommand::Fight(target) => outcome_text(game.challenge(identity, &target)),
        GameCommand::Hunt(monster) => outcome_text(game.hunt(identity, &monster)),
        GameCommand::Monsters => game.monster_list(identity),
        GameCommand::History => game
            .battle_history(identity, HISTORY_LIMIT)
            .map(|entries| format_battle_history(identity, &entries)),

        GameCommand::Plants => Ok(game.plant_list()),
        GameCommand::Plant(plant, plot) => outcome_text(game.plant(identity, &plant, plot)),
        GameCommand::Field => game.field(identity),
        GameCommand::Harvest(plot) => outcome_text(game.harvest(identity, plot)),
        GameCommand::Accelerate(plot, item) => outcome_text(game.accelerate(identity, plot, &item)),
        GameCommand::Gift {
            item,
            count,
            target,
        } => outcome_text(game.gift(identity, &target, &item, count)),

        GameCommand::Quests => game.quest_log(identity),
        GameCommand::Accept(quest) => outcome_text(game.accept_quest(identity, &quest)),
        GameCommand::Complete(quest) => outcome_text(game.complete_quest(identity, &quest)),

        GameCommand::Rank => game.leaderboard(RANK_LIMIT).map(|ranked| format_ranking(game, &ranked)),
        GameCommand::Help => Ok(help_text().to_string()),
        GameCommand::Usage(usage) => Ok(format!("Usage: {}", usage)),
        GameCommand::Unknown(text) => Ok(format!(
            "Unknown command '{}'. Send HELP for the command list.",
            headline(&text)
        )),
    }?;
    Ok(format!("{}{}", greeting, reply))
}

/// Leaderboard lines: rank, name, realm and stage.
pub fn format_ranking<S: EntityStore>(game: &Game<S>, ranked: &[crate::game::types::Character]) -> String {
    if ranked.is_empty() {
        return "No cultivators yet.".to_string();
    }
    let mut output = String::from("=== POWER RANKING ===\n");
    for (position, character) in ranked.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} - {} ({}) {:.0}\n",
            position + 1,
            character.display_name,
            game.catalog().tier_name(character.faction, character.tier),
            character.stage,
            character.power()
        ));
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_case_insensitive_arguments_are_not() {
        assert_eq!(parse_command("status"), GameCommand::Status);
        assert_eq!(
            parse_command("alchemy Foundation Pill"),
            GameCommand::Craft(Domain::Alchemy, "Foundation Pill".to_string())
        );
        assert_eq!(
            parse_command("FIGHT qq:Alice"),
            GameCommand::Fight("qq:Alice".to_string())
        );
        assert_eq!(
            parse_command("recipes forging"),
            GameCommand::Recipes(Some(Domain::Forging))
        );
        assert_eq!(
            parse_command("faction demonic"),
            GameCommand::Faction(Some(Faction::Demonic))
        );
    }

    #[test]
    fn missing_arguments_give_usage() {
        assert_eq!(parse_command("hunt"), GameCommand::Usage("HUNT <monster>"));
        assert_eq!(parse_command("LEARN   "), GameCommand::Usage("LEARN <recipe>"));
        assert!(matches!(parse_command("faction nowhere"), GameCommand::Usage(_)));
    }

    #[test]
    fn farming_commands_take_the_plot_number() {
        assert_eq!(
            parse_command("plant spirit herb 2"),
            GameCommand::Plant("spirit herb".to_string(), 2)
        );
        assert_eq!(parse_command("HARVEST 3"), GameCommand::Harvest(3));
        assert_eq!(
            parse_command("grow 1 Spirit Water"),
            GameCommand::Accelerate(1, "Spirit Water".to_string())
        );
        assert_eq!(parse_command("farm"), GameCommand::Field);
        assert_eq!(parse_command("plant spirit_herb"), GameCommand::Usage("PLANT <plant> <plot>"));
        assert_eq!(parse_command("harvest north"), GameCommand::Usage("HARVEST <plot>"));
        assert_eq!(parse_command("grow 1"), GameCommand::Usage("GROW <plot> <item>"));
    }

    #[test]
    fn gift_count_is_optional() {
        assert_eq!(
            parse_command("gift spirit herb 3 @Blaze"),
            GameCommand::Gift {
                item: "spirit herb".to_string(),
                count: 3,
                target: "@Blaze".to_string(),
            }
        );
        assert_eq!(
            parse_command("GIVE spirit_water qq:b"),
            GameCommand::Gift {
                item: "spirit_water".to_string(),
                count: 1,
                target: "qq:b".to_string(),
            }
        );
        assert_eq!(
            parse_command("gift qq:b"),
            GameCommand::Usage("GIFT <item> [count] <player>")
        );
    }

    #[test]
    fn unknown_input_is_kept() {
        assert_eq!(
            parse_command("dance wildly"),
            GameCommand::Unknown("dance wildly".to_string())
        );
        assert_eq!(parse_command(""), GameCommand::Unknown(String::new()));
    }
}
