use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line text input with a char based cursor.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl InputResult {
    /// The input with every char replaced by `mask`, for secrets.
    pub fn masked(&self, mask: char) -> String {
        self.input.chars().map(|_| mask).collect()
    }
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Delete, KeyModifiers::NONE) => self.delete(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (KeyCode::Home, KeyModifiers::NONE) => self.home(),
            (KeyCode::End, KeyModifiers::NONE) => self.end(),
            (kc, km) => self.key(kc, km),
        }
    }

    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = s.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn value(&self) -> &str {
        &self.current_input
    }

    pub fn is_empty(&self) -> bool {
        self.current_input.is_empty()
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let at = self.byte_pos();
            self.current_input.remove(at);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.cursor_pos < self.char_count() {
            let at = self.byte_pos();
            self.current_input.remove(at);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor_pos < self.char_count() {
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.cursor_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.cursor_pos = self.char_count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            trace!("Ignoring {code:?} with {modifier:?} in text input");
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            let at = self.byte_pos();
            self.current_input.insert(at, chr);
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
pub(crate) fn key(code: KeyCode) -> event::KeyEvent {
    event::KeyEvent::new(code, KeyModifiers::NONE)
}

#[cfg(test)]
pub(crate) fn type_text(input: &mut Inputter, text: &str) {
    for c in text.chars() {
        input.read(key(KeyCode::Char(c)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_and_editing_in_the_middle() {
        let mut input = Inputter::default();
        type_text(&mut input, "Oxfrd");
        input.read(key(KeyCode::Left));
        input.read(key(KeyCode::Left));
        let result = input.read(key(KeyCode::Char('o')));
        assert_eq!(result.input, "Oxford");
        assert_eq!(result.cursor_pos, 4);

        input.read(key(KeyCode::Home));
        input.read(key(KeyCode::Delete));
        let result = input.read(key(KeyCode::End));
        assert_eq!(result.input, "xford");
        assert_eq!(result.cursor_pos, 5);
    }

    #[test]
    fn backspace_removes_char_before_cursor() {
        let mut input = Inputter::default();
        input.set("Zürich");
        for _ in 0..4 {
            input.read(key(KeyCode::Left));
        }
        let result = input.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "Zrich");
        assert_eq!(result.cursor_pos, 1);
    }

    #[test]
    fn enter_finishes_and_escape_cancels() {
        let mut input = Inputter::default();
        type_text(&mut input, "ox");
        let result = input.read(key(KeyCode::Enter));
        assert!(result.finished && !result.canceled);
        assert_eq!(result.input, "ox");

        let result = input.read(key(KeyCode::Esc));
        assert!(result.finished && result.canceled);
        assert!(result.input.is_empty());
    }

    #[test]
    fn control_chords_are_not_typed() {
        let mut input = Inputter::default();
        input.read(event::KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert!(input.is_empty());
        input.read(event::KeyEvent::new(KeyCode::Char('O'), KeyModifiers::SHIFT));
        assert_eq!(input.value(), "O");
        assert_eq!(input.get().masked('*'), "*");
    }
}
