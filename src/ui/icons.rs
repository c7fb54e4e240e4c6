//! Shared UI icons and emojis.
//!
//! Each icon falls back to plain ASCII on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static INFO: Emoji<'_, '_> = Emoji("💡 ", "[i]");

// Task indicators
pub static CHECKED: Emoji<'_, '_> = Emoji("☑️  ", "[x]");
pub static UNCHECKED: Emoji<'_, '_> = Emoji("⬜ ", "[ ]");
pub static EDITING: Emoji<'_, '_> = Emoji("✏️  ", "[edit]");
pub static DRAGGING: Emoji<'_, '_> = Emoji("✋ ", "[drag]");
pub static DROP_TARGET: Emoji<'_, '_> = Emoji("🎯 ", ">>");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "[-]");

// Session indicators
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[key]");
pub static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "...");
pub static USER: Emoji<'_, '_> = Emoji("👤 ", "@");
