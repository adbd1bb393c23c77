//! Color theme system for scrollrev.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every UI
//! surface, plus the name of the syntect theme used for code. Two built-in
//! themes are provided:
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including
//!   256-color SSH sessions with no truecolor support.
//! - `catppuccin-mocha` uses the Catppuccin Mocha palette in RGB.

use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Diff rows
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_context: Color,
    /// Collapsed-section rows.
    pub diff_fold: Color,
    /// Line-number gutter.
    pub gutter: Color,
    /// File header rows.
    pub file_header: Color,
    /// Rows of files whose content has not arrived.
    pub placeholder: Color,
    /// Banner for binary files and the load-error pane.
    pub banner: Color,
    pub error: Color,

    // Selection
    /// Background of lines selected on the active side.
    pub selection_bg: Color,
    /// Background of lines inside the selected range on the other side.
    pub range_bg: Color,
    /// Background of the keyboard cursor row.
    pub cursor_bg: Color,
    /// Gutter marker for lines with a comment.
    pub comment_marker: Color,

    // File list
    pub file_added: Color,
    pub file_removed: Color,
    pub file_modified: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_mode_normal: Color,
    pub status_mode_insert: Color,

    /// syntect theme used for code spans.
    pub syntax_theme: &'static str,
}

impl Theme {
    /// Returns the built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_context: Color::Reset,
            diff_fold: Color::Cyan,
            gutter: Color::DarkGray,
            file_header: Color::White,
            placeholder: Color::DarkGray,
            banner: Color::Yellow,
            error: Color::Red,

            selection_bg: Color::Blue,
            range_bg: Color::DarkGray,
            cursor_bg: Color::Black,
            comment_marker: Color::Magenta,

            file_added: Color::Green,
            file_removed: Color::Red,
            file_modified: Color::Yellow,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,

            syntax_theme: "base16-eighties.dark",
        }
    }

    /// Returns the Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let overlay0 = Color::Rgb(108, 112, 134); // #6c7086
        let surface2 = Color::Rgb(88, 91, 112); // #585b70
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let surface0 = Color::Rgb(49, 50, 68); // #313244
        let text = Color::Rgb(205, 214, 244); // #cdd6f4

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_added: green,
            diff_removed: red,
            diff_context: text,
            diff_fold: teal,
            gutter: overlay0,
            file_header: text,
            placeholder: surface2,
            banner: yellow,
            error: red,

            selection_bg: surface2,
            range_bg: surface1,
            cursor_bg: surface0,
            comment_marker: mauve,

            file_added: green,
            file_removed: red,
            file_modified: yellow,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,

            syntax_theme: "base16-ocean.dark",
        }
    }

    /// Resolves a theme name to the corresponding built-in theme.
    ///
    /// Unknown names fall back to `dark()` so a typo in config never prevents
    /// startup; the fallback is logged.
    ///
    /// # Arguments
    ///
    /// * `name` - theme name from config, e.g. `"dark"` or `"catppuccin-mocha"`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
