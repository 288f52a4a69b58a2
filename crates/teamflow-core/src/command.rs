//! Slash-command parsing for the selection prompts.
//!
//! Grammar, informally:
//!
//! ```text
//! /create <kind> <name> [:: <description>]
//! /edit   <kind> <index> <name> [:: <description>]
//! /delete <kind> <index>
//! /back
//! /exit
//! ```
//!
//! A name is either a double-quoted string (with `\\` and `\"` escapes) or a
//! single unquoted token containing no space, quote, or colon. The
//! description runs to end of line and may itself be quoted. Parsing is
//! total: anything that does not fit the grammar comes back as a
//! [`TeamFlowError::Usage`] carrying the explanation to print.

use crate::entity::EntityKind;
use crate::error::{Result, TeamFlowError};

/// A fully parsed slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        kind: EntityKind,
        name: String,
        description: Option<String>,
    },
    Edit {
        kind: EntityKind,
        /// 1-based position in the most recent listing.
        index: usize,
        name: String,
        description: Option<String>,
    },
    Delete {
        kind: EntityKind,
        index: usize,
    },
    Back,
    Exit,
}

/// Parses one input line that starts with `/`.
pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim();
    let body = line
        .strip_prefix('/')
        .ok_or_else(|| TeamFlowError::usage("Commands start with '/'."))?;

    let (action, rest) = split_token(body);
    match action {
        "back" => Ok(Command::Back),
        "exit" => Ok(Command::Exit),
        "create" => {
            let (kind, args) = parse_kind("create", rest)?;
            let (name, description) = parse_name_and_description(args)
                .map_err(|_| usage_error_create(kind))?
                .ok_or_else(|| {
                    TeamFlowError::usage(format!(
                        "Entity name is required.\n{}",
                        create_usage(kind)
                    ))
                })?;
            Ok(Command::Create {
                kind,
                name,
                description,
            })
        }
        "edit" => {
            let (kind, args) = parse_kind("edit", rest)?;
            let (index_str, name_part) = split_token(args);
            let index: usize = index_str
                .parse()
                .map_err(|_| usage_error_edit(kind))?;
            let (name, description) = parse_name_and_description(name_part)
                .map_err(|_| usage_error_edit(kind))?
                .ok_or_else(|| usage_error_edit(kind))?;
            Ok(Command::Edit {
                kind,
                index,
                name,
                description,
            })
        }
        "delete" => {
            let (kind, args) = parse_kind("delete", rest)?;
            let index: usize = args.trim().parse().map_err(|_| {
                TeamFlowError::usage(format!("Usage: /delete {kind} <index>"))
            })?;
            Ok(Command::Delete { kind, index })
        }
        "" => Err(TeamFlowError::usage(
            "Empty command. Try /create, /edit, /delete, /back, or /exit.",
        )),
        other => Err(TeamFlowError::usage(format!(
            "Unknown command: /{other}. Try /create, /edit, /delete, /back, or /exit.",
        ))),
    }
}

/// Splits off the first whitespace-delimited token, returning it and the
/// untrimmed-on-the-right remainder.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

fn parse_kind<'a>(action: &str, rest: &'a str) -> Result<(EntityKind, &'a str)> {
    let (kind_str, args) = split_token(rest);
    if kind_str.is_empty() {
        return Err(TeamFlowError::usage(format!(
            "Usage: /{action} <team|sprint|epic|userstory|task> ...",
        )));
    }
    let kind = kind_str.parse::<EntityKind>().map_err(|_| {
        TeamFlowError::usage(format!(
            "Unknown entity type '{kind_str}'. Expected team, sprint, epic, userstory, or task.",
        ))
    })?;
    Ok((kind, args))
}

/// Parses `<name> [:: <description>]`.
///
/// Returns `Ok(None)` when the input carries a separator but no name (the
/// "/create task :: only-desc" case), which callers must reject without
/// issuing any create call. A structural mismatch (unbalanced quote, junk
/// after the name) is an `Err`.
fn parse_name_and_description(
    input: &str,
) -> std::result::Result<Option<(String, Option<String>)>, ()> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    // Separator with no name at all.
    if input.starts_with("::") {
        return Ok(None);
    }

    let (name, rest) = take_name(input)?;
    let rest = rest.trim_start();

    if rest.is_empty() {
        if name.is_empty() {
            return Ok(None);
        }
        return Ok(Some((name, None)));
    }

    let Some(desc_part) = rest.strip_prefix("::") else {
        // Something after the name that is not the separator, e.g. an
        // unquoted multi-word name.
        return Err(());
    };
    if name.is_empty() {
        return Ok(None);
    }

    let desc_part = desc_part.trim();
    if desc_part.is_empty() {
        return Ok(Some((name, None)));
    }
    let description = if desc_part.starts_with('"') {
        let (unquoted, tail) = take_quoted(desc_part)?;
        if !tail.trim().is_empty() {
            return Err(());
        }
        unquoted
    } else {
        desc_part.to_string()
    };
    Ok(Some((name, Some(description))))
}

/// Takes a quoted or bare name off the front of `input`.
fn take_name(input: &str) -> std::result::Result<(String, &str), ()> {
    if input.starts_with('"') {
        return take_quoted(input);
    }
    // Bare token: runs until whitespace, quote, or colon.
    let end = input
        .find(|c: char| c.is_whitespace() || c == '"' || c == ':')
        .unwrap_or(input.len());
    if input[end..].starts_with('"') {
        // A quote glued onto a bare token is not a valid name form.
        return Err(());
    }
    Ok((input[..end].to_string(), &input[end..]))
}

/// Consumes a double-quoted string with `\\` and `\"` escapes, returning the
/// unescaped content and the remainder after the closing quote.
fn take_quoted(input: &str) -> std::result::Result<(String, &str), ()> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, '"')) => {}
        _ => return Err(()),
    }
    let mut value = String::new();
    let mut escaped = false;
    for (pos, c) in chars {
        if escaped {
            match c {
                '\\' | '"' => value.push(c),
                other => {
                    // Unknown escapes keep the backslash verbatim.
                    value.push('\\');
                    value.push(other);
                }
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Ok((value, &input[pos + c.len_utf8()..]));
        } else {
            value.push(c);
        }
    }
    // No closing quote.
    Err(())
}

fn create_usage(kind: EntityKind) -> String {
    format!(
        "Usage: /create {kind} <name>\n   or: /create {kind} \"<name with spaces>\"\n   or: /create {kind} <name> :: <description>\n   or: /create {kind} \"<name>\" :: \"<description>\"",
    )
}

fn usage_error_create(kind: EntityKind) -> TeamFlowError {
    TeamFlowError::usage(format!(
        "Invalid format for /create {kind}.\n{}",
        create_usage(kind)
    ))
}

fn usage_error_edit(kind: EntityKind) -> TeamFlowError {
    TeamFlowError::usage(format!(
        "Usage: /edit {kind} <index> <new_name> or /edit {kind} <index> \"<new name with spaces>\"",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ContextType;

    fn epic() -> EntityKind {
        EntityKind::Context(ContextType::Epic)
    }

    #[test]
    fn create_with_quoted_name_and_description() {
        let cmd = parse(r#"/create epic "My Epic" :: "A description""#).unwrap();
        assert_eq!(
            cmd,
            Command::Create {
                kind: epic(),
                name: "My Epic".to_string(),
                description: Some("A description".to_string()),
            }
        );
    }

    #[test]
    fn create_with_bare_name_only() {
        let cmd = parse("/create epic Simple").unwrap();
        assert_eq!(
            cmd,
            Command::Create {
                kind: epic(),
                name: "Simple".to_string(),
                description: None,
            }
        );
    }

    #[test]
    fn create_with_bare_name_and_bare_description() {
        let cmd = parse("/create task fix-login :: handle token expiry in the client").unwrap();
        assert_eq!(
            cmd,
            Command::Create {
                kind: EntityKind::Context(ContextType::Task),
                name: "fix-login".to_string(),
                description: Some("handle token expiry in the client".to_string()),
            }
        );
    }

    #[test]
    fn create_allows_separator_glued_to_name() {
        let cmd = parse("/create epic Alpha:: the first one").unwrap();
        assert_eq!(
            cmd,
            Command::Create {
                kind: epic(),
                name: "Alpha".to_string(),
                description: Some("the first one".to_string()),
            }
        );
    }

    #[test]
    fn create_without_name_is_rejected() {
        let err = parse("/create task :: only-desc").unwrap_err();
        assert!(matches!(err, TeamFlowError::Usage(_)));
    }

    #[test]
    fn create_with_multiword_bare_name_is_rejected() {
        let err = parse("/create epic two words").unwrap_err();
        assert!(matches!(err, TeamFlowError::Usage(_)));
    }

    #[test]
    fn create_with_unbalanced_quote_is_rejected() {
        let err = parse(r#"/create epic "half open"#).unwrap_err();
        assert!(matches!(err, TeamFlowError::Usage(_)));
    }

    #[test]
    fn quoted_name_unescapes_backslash_and_quote() {
        let cmd = parse(r#"/create epic "say \"hi\" \\ there""#).unwrap();
        assert_eq!(
            cmd,
            Command::Create {
                kind: epic(),
                name: r#"say "hi" \ there"#.to_string(),
                description: None,
            }
        );
    }

    #[test]
    fn edit_requires_leading_index() {
        let cmd = parse(r#"/edit team 2 "New Name""#).unwrap();
        assert_eq!(
            cmd,
            Command::Edit {
                kind: EntityKind::Team,
                index: 2,
                name: "New Name".to_string(),
                description: None,
            }
        );
        assert!(parse("/edit team NewName").is_err());
    }

    #[test]
    fn delete_takes_a_bare_index() {
        let cmd = parse("/delete task 3").unwrap();
        assert_eq!(
            cmd,
            Command::Delete {
                kind: EntityKind::Context(ContextType::Task),
                index: 3,
            }
        );
        assert!(parse("/delete task first").is_err());
    }

    #[test]
    fn back_and_exit_take_no_arguments() {
        assert_eq!(parse("/back").unwrap(), Command::Back);
        assert_eq!(parse("/exit").unwrap(), Command::Exit);
    }

    #[test]
    fn unknown_action_and_kind_yield_usage() {
        assert!(matches!(
            parse("/frobnicate epic x"),
            Err(TeamFlowError::Usage(_))
        ));
        assert!(matches!(
            parse("/create milestone x"),
            Err(TeamFlowError::Usage(_))
        ));
        assert!(matches!(parse("/create"), Err(TeamFlowError::Usage(_))));
    }
}
