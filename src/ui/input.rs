//! Parsing of lines typed into the interactive board.

use quadrant_common::Category;

use crate::errors::InputError;

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    /// Put text in the form and submit it.
    Add(String),
    /// Submit the form, optionally replacing its text first.
    Save(Option<String>),
    Edit(String),
    Cancel,
    SelectCategory(Category),
    Check(String),
    Uncheck(String),
    Drag(String),
    /// Hover a drop target, given as a raw id.
    Over(String),
    Drop(Option<String>),
    Abort,
    Move(String, Category),
    Clear,
    ToggleSidebar,
    Login,
    Logout,
    Help,
    Quit,
}

/// Map `1`–`4` to the quadrant id; anything else passes through untouched.
fn drop_target(raw: &str) -> String {
    Category::from_user_input(raw)
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, InputError> {
    if rest.is_empty() {
        Err(InputError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

/// Parse one line. A blank line parses to `None`.
pub fn parse(line: &str) -> Result<Option<UserAction>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let action = match command.to_lowercase().as_str() {
        "add" | "a" => UserAction::Add(required(rest, "add", "some text")?.to_string()),
        "save" | "s" => UserAction::Save((!rest.is_empty()).then(|| rest.to_string())),
        "edit" | "e" => UserAction::Edit(required(rest, "edit", "a task number or id")?.to_string()),
        "cancel" => UserAction::Cancel,
        "cat" | "category" => UserAction::SelectCategory(Category::from_user_input(required(
            rest,
            "cat",
            "a quadrant (1-4)",
        )?)?),
        "check" | "done" | "x" => {
            UserAction::Check(required(rest, "check", "a task number or id")?.to_string())
        }
        "uncheck" | "undo" => {
            UserAction::Uncheck(required(rest, "uncheck", "a task number or id")?.to_string())
        }
        "drag" => UserAction::Drag(required(rest, "drag", "a task number or id")?.to_string()),
        "over" => UserAction::Over(drop_target(required(rest, "over", "a drop target")?)),
        "drop" => UserAction::Drop((!rest.is_empty()).then(|| drop_target(rest))),
        "abort" => UserAction::Abort,
        "move" | "mv" => {
            let rest = required(rest, "move", "a task and a quadrant")?;
            let (task, quadrant) = rest
                .rsplit_once(char::is_whitespace)
                .ok_or(InputError::MissingArgument {
                    command: "move",
                    argument: "a quadrant (1-4)",
                })?;
            UserAction::Move(task.trim().to_string(), Category::from_user_input(quadrant)?)
        }
        "clear" => UserAction::Clear,
        "sidebar" | "completed" => UserAction::ToggleSidebar,
        "login" => UserAction::Login,
        "logout" => UserAction::Logout,
        "help" | "?" => UserAction::Help,
        "quit" | "exit" | "q" => UserAction::Quit,
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };
    Ok(Some(action))
}
