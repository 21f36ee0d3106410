pub mod panels;
pub mod state;
pub mod theme;

pub use panels::{PanelInfo, UiActions, draw_help_overlay, draw_side_panel};
pub use state::AppState;
pub use theme::apply_theme;
