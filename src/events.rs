use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, View};
use crate::ui::common::tab_at;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Threshold input captures everything until Enter or Esc
    if app.is_editing() {
        handle_edit_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::Char('1') => app.set_view(View::Performance),
        KeyCode::Char('2') => app.set_view(View::Optimization),
        KeyCode::Char('3') => app.set_view(View::Alerts),
        KeyCode::Char('4') => app.set_view(View::Settings),

        // Selection
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate(),
        KeyCode::Backspace => app.cycle_setting_back(),

        KeyCode::Char('r') => app.poll_now(),
        KeyCode::Char('f') => app.cycle_alert_filter(),
        KeyCode::Char('s') => app.save_settings(),

        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle key input while a threshold is being edited
fn handle_edit_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Backspace => app.edit_pop(),
        // Validated on commit, not per keystroke
        KeyCode::Char(c) => app.edit_push(c),
        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, tabs_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::Down(MouseButton::Left) if mouse.row == tabs_row => {
            if let Some(view) = tab_at(mouse.column) {
                app.set_view(view);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Screen;
    use crate::client::testing::OfflineBackend;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use std::sync::Arc;

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(
            app,
            KeyEvent {
                code,
                modifiers: KeyModifiers::NONE,
                kind: KeyEventKind::Press,
                state: KeyEventState::NONE,
            },
        );
    }

    fn app() -> App {
        App::new(Arc::new(OfflineBackend), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_number_keys_switch_views() {
        let mut app = app();
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.current_view(), View::Settings);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.current_view(), View::Optimization);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.current_view(), View::Alerts);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current_view(), View::Optimization);
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_swallows_next_key() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.show_help);
        assert!(app.running);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_mode_captures_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('4'));
        // thresholds.lcp is the seventh field
        for _ in 0..6 {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Enter);
        assert!(app.is_editing());

        // 'q' goes into the buffer instead of quitting
        press(&mut app, KeyCode::Char('q'));
        assert!(app.running);

        press(&mut app, KeyCode::Esc);
        assert!(!app.is_editing());
        let Screen::Settings(screen) = &app.screen else {
            panic!("expected settings view");
        };
        assert!(!screen.store.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backspace_cycles_choice_back_and_left_switches_view() {
        let mut app = app();
        press(&mut app, KeyCode::Char('4'));
        // Theme is the first field; Light steps back to System.
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.current_view(), View::Settings);
        assert_eq!(
            app.setting_value(crate::settings::SettingsPath::Theme),
            Some(crate::settings::SettingValue::from("system"))
        );

        press(&mut app, KeyCode::Left);
        assert_eq!(app.current_view(), View::Alerts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_key_cycles_alert_filter() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('f'));
        let Screen::Alerts(screen) = &app.screen else {
            panic!("expected alerts view");
        };
        assert_eq!(screen.filter, crate::data::AlertFilter::Active);
    }
}
