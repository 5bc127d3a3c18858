//! Free-text command parsing.
//!
//! A message may hold several commands, one per line, plus menu-button labels.
//! `/track` is the one command whose arguments may continue on the next
//! physical lines (address, then label). Parsing is total: lines that are not
//! commands, or name an unknown command, produce nothing.

use crate::domain::resolve_chain;

pub const COMMAND_PREFIX: char = '/';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Start,
    Help,
    Track,
    List,
    Wallet,
    Untrack,
    Mute,
    Unmute,
    History,
    Filters,
    App,
}

impl CommandKind {
    /// Canonical slash name, used in help and usage texts.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Help => "help",
            CommandKind::Track => "track",
            CommandKind::List => "list",
            CommandKind::Wallet => "wallet",
            CommandKind::Untrack => "untrack",
            CommandKind::Mute => "mute",
            CommandKind::Unmute => "unmute",
            CommandKind::History => "history",
            CommandKind::Filters => "filters",
            CommandKind::App => "app",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: CommandKind,
    pub args: Vec<String>,
    /// 1-based physical line the command starts on.
    pub source_line: usize,
}

/// Reply-keyboard labels. Tapping one sends the label as plain text.
pub const MENU_BUTTONS: &[(&str, CommandKind)] = &[
    ("📋 My wallets", CommandKind::List),
    ("➕ Track wallet", CommandKind::Track),
    ("⚙️ DEX filters", CommandKind::Filters),
    ("📱 Open app", CommandKind::App),
    ("❓ Help", CommandKind::Help),
];

fn lookup_command(token: &str) -> Option<CommandKind> {
    let kind = match token {
        "start" => CommandKind::Start,
        "help" => CommandKind::Help,
        "track" => CommandKind::Track,
        "list" | "wallets" => CommandKind::List,
        "wallet" => CommandKind::Wallet,
        "untrack" | "remove" => CommandKind::Untrack,
        "mute" => CommandKind::Mute,
        "unmute" => CommandKind::Unmute,
        "history" => CommandKind::History,
        "filters" => CommandKind::Filters,
        "app" => CommandKind::App,
        _ => return None,
    };
    Some(kind)
}

fn menu_button(line: &str) -> Option<CommandKind> {
    MENU_BUTTONS
        .iter()
        .find(|(label, _)| *label == line)
        .map(|(_, kind)| *kind)
}

/// `true` if any line looks like a slash command, known or not.
pub fn has_command_prefix(text: &str) -> bool {
    text.lines()
        .any(|l| l.trim_start().starts_with(COMMAND_PREFIX))
}

/// Split `/cmd@bot a b` into (`cmd`, [`a`, `b`]). `None` if not prefixed.
fn split_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let rest = line.strip_prefix(COMMAND_PREFIX)?;
    let mut tokens = rest.split_whitespace();
    let first = tokens.next().unwrap_or("");

    // Telegram may send `/cmd@botname` in groups.
    let name = first.split('@').next().unwrap_or("").to_lowercase();
    let args = tokens.map(str::to_string).collect();
    Some((name, args))
}

/// A line usable as a `/track` continuation: non-empty, not itself a command.
fn continuation(line: Option<&&str>) -> Option<String> {
    let line = line?.trim();
    if line.is_empty() || line.starts_with(COMMAND_PREFIX) {
        return None;
    }
    Some(line.to_string())
}

/// Parse a whole message into commands, in source-line order.
pub fn parse(text: &str) -> Vec<ParsedCommand> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut idx = 0usize;

    while idx < lines.len() {
        let line = lines[idx].trim();
        let source_line = idx + 1;
        idx += 1;

        if line.is_empty() {
            continue;
        }

        if let Some(command) = menu_button(line) {
            out.push(ParsedCommand {
                command,
                args: Vec::new(),
                source_line,
            });
            continue;
        }

        let Some((name, mut args)) = split_command_line(line) else {
            continue;
        };
        let Some(command) = lookup_command(&name) else {
            continue;
        };

        if command == CommandKind::Track {
            idx += absorb_track_continuation(&mut args, &lines[idx..]);
        }

        out.push(ParsedCommand {
            command,
            args,
            source_line,
        });
    }

    out
}

/// Pull address/label from the lines right after `/track <chain>`.
///
/// Returns how many physical lines were consumed.
fn absorb_track_continuation(args: &mut Vec<String>, following: &[&str]) -> usize {
    let Some(chain) = args.first() else {
        return 0;
    };
    if resolve_chain(chain).is_none() {
        return 0;
    }

    match args.len() {
        1 => {
            let Some(address) = continuation(following.first()) else {
                return 0;
            };
            args.push(address);
            match continuation(following.get(1)) {
                Some(label) => {
                    args.push(label);
                    2
                }
                None => 1,
            }
        }
        2 => match continuation(following.first()) {
            Some(label) => {
                args.push(label);
                1
            }
            None => 0,
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(command: CommandKind, args: &[&str], source_line: usize) -> ParsedCommand {
        ParsedCommand {
            command,
            args: args.iter().map(|s| s.to_string()).collect(),
            source_line,
        }
    }

    #[test]
    fn single_line_track() {
        assert_eq!(
            parse("/track eth 0xABC label"),
            vec![cmd(CommandKind::Track, &["eth", "0xABC", "label"], 1)]
        );
    }

    #[test]
    fn track_address_and_label_on_following_lines() {
        assert_eq!(
            parse("/track sol\nADDR\nlabel"),
            vec![cmd(CommandKind::Track, &["sol", "ADDR", "label"], 1)]
        );
    }

    #[test]
    fn track_label_may_contain_spaces_on_its_own_line() {
        assert_eq!(
            parse("/track eth 0xabc\nmy cold wallet"),
            vec![cmd(CommandKind::Track, &["eth", "0xabc", "my cold wallet"], 1)]
        );
    }

    #[test]
    fn two_track_blocks_get_distinct_lines() {
        let text = "/track eth\n0x111\nfirst\n/track sol\nSoLAddr\nsecond";
        assert_eq!(
            parse(text),
            vec![
                cmd(CommandKind::Track, &["eth", "0x111", "first"], 1),
                cmd(CommandKind::Track, &["sol", "SoLAddr", "second"], 4),
            ]
        );
    }

    #[test]
    fn track_continuation_stops_at_next_command() {
        let text = "/track tron\nTAddr\n/list";
        assert_eq!(
            parse(text),
            vec![
                cmd(CommandKind::Track, &["tron", "TAddr"], 1),
                cmd(CommandKind::List, &[], 3),
            ]
        );
    }

    #[test]
    fn track_continuation_requires_adjacent_lines() {
        // A blank line breaks the block; the orphan address is not a command.
        let text = "/track eth\n\n0xabc";
        assert_eq!(parse(text), vec![cmd(CommandKind::Track, &["eth"], 1)]);
    }

    #[test]
    fn track_with_unknown_chain_keeps_raw_tokens() {
        let text = "/track btc\nbc1q\nlabel";
        assert_eq!(parse(text), vec![cmd(CommandKind::Track, &["btc"], 1)]);
    }

    #[test]
    fn other_commands_never_take_continuations() {
        let text = "/mute 5\n60";
        assert_eq!(parse(text), vec![cmd(CommandKind::Mute, &["5"], 1)]);
    }

    #[test]
    fn bot_suffix_and_case_are_normalized() {
        assert_eq!(
            parse("/History@wallet_alert_bot 12"),
            vec![cmd(CommandKind::History, &["12"], 1)]
        );
    }

    #[test]
    fn aliases_map_to_canonical_kinds() {
        assert_eq!(
            parse("/wallets\n/remove 3"),
            vec![
                cmd(CommandKind::List, &[], 1),
                cmd(CommandKind::Untrack, &["3"], 2),
            ]
        );
    }

    #[test]
    fn unknown_commands_and_chatter_are_dropped() {
        assert!(parse("/frobnicate 1").is_empty());
        assert!(parse("hello there").is_empty());
        assert!(parse("").is_empty());
        assert!(parse("/").is_empty());
    }

    #[test]
    fn menu_buttons_are_zero_arg_commands() {
        assert_eq!(
            parse("  📋 My wallets  "),
            vec![cmd(CommandKind::List, &[], 1)]
        );
        assert_eq!(parse("❓ Help"), vec![cmd(CommandKind::Help, &[], 1)]);
    }

    #[test]
    fn blank_lines_keep_physical_numbering() {
        let text = "\n/list\n\n\n/wallet 4\nnot a command";
        assert_eq!(
            parse(text),
            vec![
                cmd(CommandKind::List, &[], 2),
                cmd(CommandKind::Wallet, &["4"], 5),
            ]
        );
    }

    #[test]
    fn prefix_detection() {
        assert!(has_command_prefix("hi\n  /nope"));
        assert!(!has_command_prefix("hi there"));
    }
}
