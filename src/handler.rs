use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::trace;
use crate::app::{App, InputMode, Trigger};
use crate::conversation::View;
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Notice(notice) => {
            trace!(?notice, "controller notice");
            app.on_notice(notice);
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match (app.view(), app.input_mode) {
        (View::Landing, _) => handle_landing(app, key),
        (View::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (View::Chat, InputMode::Editing) => handle_chat_editing(app, key),
    }
}

fn handle_landing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Tab
        | KeyCode::BackTab
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Char('h')
        | KeyCode::Char('l') => app.toggle_landing_selection(),
        KeyCode::Enter | KeyCode::Char(' ') => {
            let trigger = app.landing_selection.trigger();
            app.activate(trigger);
        }
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => app.activate(Trigger::BackToLanding),

        KeyCode::Char('i') | KeyCode::Tab | KeyCode::Enter => app.focus_input(),

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.activate(Trigger::Submit),
        code => {
            let input = app.conversation.input_mut();
            match code {
                KeyCode::Backspace => input.backspace(),
                KeyCode::Delete => input.delete(),
                KeyCode::Left => input.move_left(),
                KeyCode::Right => input.move_right(),
                KeyCode::Home => input.move_home(),
                KeyCode::End => input.move_end(),
                KeyCode::Char(c) => input.insert(c),
                _ => {}
            }
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let hit = |area: Option<Rect>| area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if app.view() == View::Landing => {
            if hit(app.start_learning_area) {
                app.activate(Trigger::StartLearning);
            } else if hit(app.start_journey_area) {
                app.activate(Trigger::StartJourney);
            }
        }
        MouseEventKind::Down(MouseButton::Left) if app.view() == View::Chat => {
            if hit(app.back_area) {
                app.activate(Trigger::BackToLanding);
            } else if hit(app.input_area) {
                app.focus_input();
            } else if hit(app.chat_area) {
                app.input_mode = InputMode::Normal;
            }
        }
        MouseEventKind::ScrollDown if hit(app.chat_area) => app.scroll_down(WHEEL_STEP),
        MouseEventKind::ScrollUp if hit(app.chat_area) => app.scroll_up(WHEEL_STEP),
        _ => {}
    }
}
