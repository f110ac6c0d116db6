use std::time::Duration;
use tracing::trace;

use crate::domain::{DashConfig, DashError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DashConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Wait up to the poll time for the next terminal event and map it.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DashError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    return Ok(self.handle_key(key, model.raw_keyevents()));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent, raw: bool) -> Option<Message> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Message::Quit);
        }
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::Char('G') | KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Char(']') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('[') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('/') | KeyCode::Enter => Some(Message::OpenColumnMenu),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('y') => Some(Message::CopyLink),
            KeyCode::Char('r') => Some(Message::Reload),
            KeyCode::Char('L') => Some(Message::Logout),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
