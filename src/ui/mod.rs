pub mod icons;
pub mod input;
pub mod render;

pub use input::{UserAction, parse};
pub use render::{render_board, render_help, render_loading, render_login, render_task_list};
