//! One-shot task commands: `quadrant list|add|edit|done|undo|move|clear`.
//!
//! Each command loads the current snapshot into a board controller and runs
//! the same operation the interactive board would.

use anyhow::{Result, bail};

use quadrant::board::{BoardController, SubmitOutcome};
use quadrant::config::QuadrantConfig;
use quadrant::errors::StoreError;
use quadrant::store::first_snapshot;
use quadrant::ui::icons::{CHECK, SPARKLE, TRASH};
use quadrant::ui::render_task_list;
use quadrant_common::{Category, short_id};

use super::{open_store, require_identity};

async fn load_board(config: &QuadrantConfig) -> Result<BoardController> {
    let owner = require_identity(config)?;
    let store = open_store(config)?;
    let tasks = first_snapshot(store.as_ref(), &owner.uid).await?;
    let mut board = BoardController::new(store, owner);
    board.model.apply_snapshot(tasks);
    Ok(board)
}

/// Resolve a task reference and return its id and text.
fn lookup(board: &BoardController, reference: &str) -> Result<(String, String)> {
    let task = board.model.resolve(reference)?;
    Ok((task.id.clone(), task.text.clone()))
}

pub async fn cmd_list(config: &QuadrantConfig) -> Result<()> {
    let board = load_board(config).await?;
    let view = board.model.view();
    if view.is_empty() {
        println!("Inga uppgifter än. Lägg till en med `quadrant add <text>`.");
    } else {
        print!("{}", render_task_list(view));
    }
    Ok(())
}

pub async fn cmd_add(config: &QuadrantConfig, text: &str, category: Option<&str>) -> Result<()> {
    let category = category
        .map(Category::from_user_input)
        .transpose()?
        .unwrap_or(Category::DEFAULT);
    let mut board = load_board(config).await?;
    board.model.form.text = text.to_string();
    board.model.form.category = category;

    match board.submit().await? {
        SubmitOutcome::Created(id) => {
            println!("{}Added to {} ({})", CHECK, category.label(), short_id(&id));
            Ok(())
        }
        _ => Err(StoreError::EmptyText.into()),
    }
}

pub async fn cmd_edit(
    config: &QuadrantConfig,
    reference: &str,
    text: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    if text.is_none() && category.is_none() {
        bail!("Nothing to change; pass --text and/or --category");
    }
    let category = category.map(Category::from_user_input).transpose()?;
    let mut board = load_board(config).await?;
    let (id, _) = lookup(&board, reference)?;

    board.model.start_edit(&id)?;
    if let Some(text) = text {
        board.model.form.text = text.to_string();
    }
    if let Some(category) = category {
        board.model.form.category = category;
    }
    match board.submit().await? {
        SubmitOutcome::Updated(_) => {
            println!("{}Updated", CHECK);
            Ok(())
        }
        _ => Err(StoreError::EmptyText.into()),
    }
}

async fn set_completed(config: &QuadrantConfig, reference: &str, completed: bool) -> Result<()> {
    let mut board = load_board(config).await?;
    let (id, text) = lookup(&board, reference)?;
    let changed = board.set_completed(&id, completed).await?;
    match (changed, completed) {
        (true, true) => println!("{}Klart: {}", SPARKLE, text),
        (true, false) => println!("{}Tillbaka på tavlan: {}", CHECK, text),
        (false, true) => println!("Already completed: {}", text),
        (false, false) => println!("Not completed: {}", text),
    }
    Ok(())
}

pub async fn cmd_done(config: &QuadrantConfig, reference: &str) -> Result<()> {
    set_completed(config, reference, true).await
}

pub async fn cmd_undo(config: &QuadrantConfig, reference: &str) -> Result<()> {
    set_completed(config, reference, false).await
}

pub async fn cmd_move(config: &QuadrantConfig, reference: &str, category: &str) -> Result<()> {
    let category = Category::from_user_input(category)?;
    let mut board = load_board(config).await?;
    let (id, text) = lookup(&board, reference)?;
    if board.model.task(&id).is_some_and(|t| t.completed) {
        bail!("'{}' is completed; run `quadrant undo` first", text);
    }
    if board.drop_on(&id, category.as_str()).await? {
        println!("{}Moved to {}: {}", CHECK, category.label(), text);
    } else {
        println!("Already in {}: {}", category.label(), text);
    }
    Ok(())
}

pub async fn cmd_clear(config: &QuadrantConfig) -> Result<()> {
    let mut board = load_board(config).await?;
    let removed = board.clear_completed().await?;
    if removed == 0 {
        println!("Inga klarmarkerade uppgifter än.");
    } else {
        println!("{}Removed {} completed task(s)", TRASH, removed);
    }
    Ok(())
}
