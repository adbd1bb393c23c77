//! Help overlay renderer for scrollrev.
//!
//! Draws a centred modal over the panel layout. `Clear` erases the area
//! first, so the overlay needs no second draw call.

use ratatui::{
    Frame,
    layout::Constraint,
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay, scrolled by `help_scroll` rows.
///
/// Skipped on terminals narrower than 60 columns, where the centred rect
/// would collapse.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame.area().centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help  - j/k scroll, ? or Esc to dismiss ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(help_text()).block(block).wrap(Wrap { trim: false }).scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Move the cursor down / up"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Scroll half page down / up"),
        Line::from("  Ctrl-f / b    Scroll full page down / up"),
        Line::from("  { / }         Previous / next file"),
        Line::from("  H / L         Move panel focus left / right"),
        Line::from("  Enter / l     In the file list: jump to the file"),
        Line::from("  m             Toggle all files / single file"),
        Line::from(""),
        Line::from("Selection"),
        Line::from("  Space         Select the cursor line (again to clear)"),
        Line::from("  J / K         Extend the selection down / up"),
        Line::from("  Tab           Switch between old and new side"),
        Line::from("  Esc           Clear the selection"),
        Line::from("  mouse         Click, shift-click or drag over lines"),
        Line::from(""),
        Line::from("Folds"),
        Line::from("  o             Expand / collapse unchanged lines"),
        Line::from("  click         Expand a fold"),
        Line::from(""),
        Line::from("Comments"),
        Line::from("  c             Comment on the selection"),
        Line::from("  Enter         Save the comment"),
        Line::from("  Esc           Discard the draft"),
        Line::from(""),
        Line::from("General"),
        Line::from("  r             Re-scan changed files"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q             Quit"),
    ])
}
