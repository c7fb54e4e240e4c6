//! Text rendering of the three screens: loading, login and board.
//!
//! Everything returns a `String` so the event loop decides when to clear
//! and print, and tests can assert on the output.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use console::style;

use quadrant_common::{BoardView, Category, Identity, Task};

use crate::board::{BoardModel, Notice};
use crate::ui::icons::{
    CHECKED, CROSS, DRAGGING, DROP_TARGET, EDITING, HOURGLASS, INFO, KEY, TRASH, UNCHECKED, USER,
};

pub const TITLE: &str = "Att göra";
pub const SUBTITLE: &str = "You're doing great today, by the way";

const RULE_WIDTH: usize = 44;

pub fn render_loading() -> String {
    format!("\n  {}{}\n", HOURGLASS, style("Laddar...").dim())
}

/// Login screen: one sign-in action, plus the last sign-in error if any.
pub fn render_login(provider: &str, notice: Option<&Notice>) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style(TITLE).bold().cyan());
    let _ = writeln!(out, "  {}", style(SUBTITLE).dim().italic());
    let _ = writeln!(out);
    if let Some(notice) = notice {
        let _ = writeln!(out, "  {}", render_notice(notice));
        let _ = writeln!(out);
    }
    let _ = writeln!(
        out,
        "  {}{}  {}",
        KEY,
        style("Logga in").bold(),
        style(format!("(skriv `login`, via {})", provider)).dim()
    );
    out
}

/// Shown while a sign-in flow is waiting on the provider.
pub fn render_signing_in() -> String {
    format!("\n  {}{}\n", HOURGLASS, style("Verifierar inloggning...").dim())
}

fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Error(msg) => format!("{}{}", CROSS, style(msg).red()),
        Notice::Info(msg) => format!("{}{}", INFO, style(msg).green()),
    }
}

fn rule(title: String, highlighted: bool) -> String {
    let width = console::measure_text_width(&title);
    let fill = "─".repeat(RULE_WIDTH.saturating_sub(width + 4));
    let marker = if highlighted {
        format!(" {}", DROP_TARGET)
    } else {
        String::new()
    };
    format!("── {} {}{}", style(title).bold(), style(fill).dim(), marker)
}

fn completed_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn task_line(n: usize, task: &Task, model: &BoardModel) -> String {
    let check = if task.completed { &CHECKED } else { &UNCHECKED };
    let mut line = format!("  {:>3}. {}{}", n, check, task.text);
    if model.editing() == Some(task.id.as_str()) {
        line = format!("{} {}", line, EDITING);
    }
    if model.drag.active() == Some(task.id.as_str()) {
        line = format!("{} {}", line, DRAGGING);
    }
    line
}

/// The main board.
pub fn render_board(identity: &Identity, model: &BoardModel) -> String {
    let view = model.view();
    let mut out = String::new();

    // Header
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style(TITLE).bold().cyan());
    let _ = writeln!(out, "  {}", style(SUBTITLE).dim().italic());
    let _ = writeln!(
        out,
        "  {}{}  {}",
        USER,
        identity.display_label(),
        style("Logga ut (`logout`)").dim()
    );
    if let Some(notice) = model.notice() {
        let _ = writeln!(out, "  {}", render_notice(notice));
    }
    let _ = writeln!(out);

    if !model.is_loaded() {
        let _ = writeln!(out, "  {}{}", HOURGLASS, style("Laddar...").dim());
        return out;
    }

    // Input form
    let form = &model.form;
    let _ = writeln!(
        out,
        "  Uppgift: {}   Kategori: {}. {}",
        if form.text.is_empty() {
            style("(tom)".to_string()).dim()
        } else {
            style(form.text.clone()).bold()
        },
        form.category.index() + 1,
        form.category.label()
    );
    if model.is_editing() {
        let _ = writeln!(
            out,
            "  [{}] [{}]",
            style("Spara").green().bold(),
            style("Avbryt").yellow()
        );
    } else {
        let _ = writeln!(out, "  [{}]", style("Lägg till").green().bold());
    }
    let _ = writeln!(out);

    // Quadrants
    let hovered = model.drag.hovered();
    let mut n = 0;
    for category in Category::ALL {
        let title = format!("{}. {}", category.index() + 1, category.label());
        let _ = writeln!(out, "{}", rule(title, hovered == Some(category.as_str())));
        let tasks = view.quadrant(category);
        if tasks.is_empty() {
            let _ = writeln!(out, "       {}", style("–").dim());
        }
        for task in tasks {
            n += 1;
            let _ = writeln!(out, "{}", task_line(n, task, model));
        }
    }

    if !view.unknown.is_empty() {
        let _ = writeln!(out, "{}", rule("Okänd kategori".to_string(), false));
        for task in &view.unknown {
            n += 1;
            let _ = writeln!(
                out,
                "{} {}",
                task_line(n, task, model),
                style(format!("({})", task.category)).dim()
            );
        }
    }
    let _ = writeln!(out);

    // Completed sidebar
    let toggle = if model.completed_open() { "Dölj" } else { "Visa" };
    let _ = writeln!(
        out,
        "{}  {}",
        rule(format!("Klarmarkerade ({})", view.completed.len()), false),
        style(format!("[{}]", toggle)).dim()
    );
    if model.completed_open() {
        if view.completed.is_empty() {
            let _ = writeln!(out, "       {}", style("Inga klarmarkerade uppgifter än.").dim());
        } else {
            for task in &view.completed {
                n += 1;
                let _ = writeln!(
                    out,
                    "{}  {}",
                    task_line(n, task, model),
                    style(completed_date(task.completed_at)).dim()
                );
            }
            let _ = writeln!(out, "       {}{}", TRASH, style("Rensa alla (`clear`)").red());
        }
    }
    out
}

/// Numbered listing for one-shot commands: the board without form or header.
pub fn render_task_list(view: &BoardView) -> String {
    let mut out = String::new();
    for (i, task) in view.ordered().enumerate() {
        let place = if task.completed {
            format!("klar {}", completed_date(task.completed_at))
        } else {
            match task.quadrant() {
                Some(c) => c.label().to_string(),
                None => format!("Okänd kategori ({})", task.category),
            }
        };
        let check = if task.completed { "[x]" } else { "[ ]" };
        let _ = writeln!(
            out,
            "{:>3}. {} {}  {}  {}",
            i + 1,
            check,
            task.text,
            style(place).dim(),
            style(task.short_id()).dim()
        );
    }
    out
}

pub fn render_help() -> String {
    let rows = [
        ("add <text>", "lägg till en uppgift i vald kategori"),
        ("cat <1-4>", "välj kategori för formuläret"),
        ("edit <ref>", "redigera en uppgift"),
        ("save [text]", "spara redigeringen"),
        ("cancel", "avbryt redigeringen"),
        ("check <ref>", "klarmarkera"),
        ("uncheck <ref>", "ångra klarmarkering"),
        ("drag <ref>", "börja dra en uppgift"),
        ("over <target>", "hovra över en kategori"),
        ("drop [target]", "släpp uppgiften"),
        ("abort", "avbryt dragningen"),
        ("move <ref> <1-4>", "flytta direkt"),
        ("clear", "rensa alla klarmarkerade"),
        ("sidebar", "visa/dölj klarmarkerade"),
        ("login / logout", "logga in eller ut"),
        ("quit", "avsluta"),
    ];
    let mut out = String::new();
    for (cmd, what) in rows {
        let _ = writeln!(out, "  {:<18} {}", style(cmd).cyan(), what);
    }
    let _ = writeln!(
        out,
        "  {}",
        style("<ref> är numret på tavlan eller början av uppgiftens id").dim()
    );
    out
}
