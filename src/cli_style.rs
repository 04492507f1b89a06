use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;

fn bold(color: AnsiColor) -> Style {
    Style::new().bold().fg_color(Some(Color::Ansi(color)))
}

/// Help output colors for the `lrc-catalog` binary.
pub fn get_styles() -> Styles {
    Styles::styled()
        .header(bold(AnsiColor::Magenta).underline())
        .usage(bold(AnsiColor::Magenta).underline())
        .literal(bold(AnsiColor::Green))
        .placeholder(Style::new().italic())
        .error(bold(AnsiColor::Red))
        .invalid(bold(AnsiColor::Yellow))
        .valid(bold(AnsiColor::Green))
}
