use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single-line editable text with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
    /// Cursor position in characters, not bytes
    cursor: usize,
}

impl TextField {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Apply an editing key. Returns false when the key is not an edit so
    /// the caller can handle it.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = self.byte_index();
                self.value.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Char('u') => self.clear(),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index();
                    self.value.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.value.chars().count() {
                    let at = self.byte_index();
                    self.value.remove(at);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(text: &str) -> TextField {
        let mut field = TextField::default();
        for c in text.chars() {
            assert!(field.handle_key(key(KeyCode::Char(c))));
        }
        field
    }

    #[test]
    fn typing_and_backspace() {
        let mut field = typed("rusty");
        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "rust");
        assert_eq!(field.cursor(), 4);
    }

    #[test]
    fn insert_in_the_middle_of_multibyte_text() {
        let mut field = typed("héllo");
        field.handle_key(key(KeyCode::Home));
        field.handle_key(key(KeyCode::Right));
        field.handle_key(key(KeyCode::Right));
        field.handle_key(key(KeyCode::Char('X')));
        assert_eq!(field.value(), "héXllo");
        field.handle_key(key(KeyCode::Delete));
        assert_eq!(field.value(), "héXlo");
    }

    #[test]
    fn ctrl_u_clears() {
        let mut field = typed("abc");
        field.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(field.value(), "");
        assert_eq!(field.cursor(), 0);
    }

    #[test]
    fn non_edit_keys_are_not_consumed() {
        let mut field = typed("x");
        assert!(!field.handle_key(key(KeyCode::Enter)));
        assert!(!field.handle_key(key(KeyCode::Esc)));
        assert!(!field.handle_key(key(KeyCode::Tab)));
        assert_eq!(field.value(), "x");
    }
}
