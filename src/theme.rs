use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub focus_border: Color,
    pub blurred_border: Color,
    pub text: Color,
    pub text_secondary: Color,
    pub text_highlight: Color,

    // Specific components
    pub ticket_key: Style,
    pub rewritten_marker: Style,
    pub checkbox_on: Style,
    pub checkbox_off: Style,
    pub draft_title: Style,
    pub criterion: Style,
    pub banner_error: Style,
    pub banner_success: Style,
    pub loading: Style,
    pub footer: Style,
    pub footer_disabled: Style,
    pub popup_title: Style,
    pub popup_border: Style,
    pub popup_text: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            focus_border: Color::Cyan,
            blurred_border: Color::DarkGray,
            text: Color::White,
            text_secondary: Color::Gray,
            text_highlight: Color::Yellow,

            ticket_key: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            rewritten_marker: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            checkbox_on: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            checkbox_off: Style::default().fg(Color::DarkGray),
            draft_title: Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            criterion: Style::default().fg(Color::Green),
            banner_error: Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
            banner_success: Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD),
            loading: Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
            footer: Style::default().fg(Color::Gray),
            footer_disabled: Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            popup_title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            popup_border: Style::default().bg(Color::Black),
            popup_text: Style::default().fg(Color::White),
        }
    }
}
