use crossterm::event::KeyCode;

use crate::action::Msg;
use crate::command::Command;
use crate::page::{NavRequest, PageTag, Status};

/// Landing screen. Holds no data of its own.
#[derive(Debug, Default)]
pub struct Home {
    pub status: Option<Status>,
}

impl Home {
    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        let Msg::Key(key) = msg else {
            return Vec::new();
        };

        match key.code {
            KeyCode::Char('s') => vec![Command::Navigate(NavRequest::to(
                PageTag::Search,
                PageTag::Home,
            ))],
            KeyCode::Char('n') => vec![Command::Navigate(NavRequest::to(
                PageTag::CreateRepo,
                PageTag::Home,
            ))],
            KeyCode::Char('q') | KeyCode::Esc => vec![Command::Quit],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn press(home: &mut Home, code: KeyCode) -> Vec<Command> {
        home.update(Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[test]
    fn keys_map_to_navigation() {
        let mut home = Home::default();
        match press(&mut home, KeyCode::Char('s')).as_slice() {
            [Command::Navigate(req)] => assert_eq!(req.target, PageTag::Search),
            other => panic!("unexpected {:?}", other),
        }
        match press(&mut home, KeyCode::Char('n')).as_slice() {
            [Command::Navigate(req)] => {
                assert_eq!(req.target, PageTag::CreateRepo);
                assert_eq!(req.origin, PageTag::Home);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            press(&mut home, KeyCode::Esc).as_slice(),
            [Command::Quit]
        ));
        assert!(press(&mut home, KeyCode::Char('x')).is_empty());
    }
}
