use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};

use crate::action::{Msg, TaskOutcome};
use crate::command::Command;
use crate::config::Config;
use crate::page::text_field::TextField;
use crate::page::{NavRequest, PageTag, Status};
use crate::types::CreateRepoRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Description,
    Private,
    Issues,
    Projects,
    Wiki,
    Submit,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::Description,
        Field::Private,
        Field::Issues,
        Field::Projects,
        Field::Wiki,
        Field::Submit,
    ];

    fn index(self) -> usize {
        Field::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Field {
        Field::ALL[(self.index() + 1) % Field::ALL.len()]
    }

    pub fn prev(self) -> Field {
        Field::ALL[(self.index() + Field::ALL.len() - 1) % Field::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Description => "Description",
            Field::Private => "Private",
            Field::Issues => "Issues",
            Field::Projects => "Projects",
            Field::Wiki => "Wiki",
            Field::Submit => "Create",
        }
    }
}

#[derive(Debug)]
pub struct CreateRepo {
    pub focus: Field,
    pub editing: bool,
    pub name: TextField,
    pub description: TextField,
    pub private: bool,
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub submitting: bool,
    pub status: Option<Status>,
    pub config: Arc<Config>,
    origin: PageTag,
}

impl CreateRepo {
    pub fn new(origin: PageTag, config: Arc<Config>) -> Self {
        Self {
            focus: Field::Name,
            editing: false,
            name: TextField::default(),
            description: TextField::default(),
            private: false,
            has_issues: true,
            has_projects: true,
            has_wiki: true,
            submitting: false,
            status: None,
            config,
            origin,
        }
    }

    pub fn toggle_value(&self, field: Field) -> Option<bool> {
        match field {
            Field::Private => Some(self.private),
            Field::Issues => Some(self.has_issues),
            Field::Projects => Some(self.has_projects),
            Field::Wiki => Some(self.has_wiki),
            Field::Name | Field::Description | Field::Submit => None,
        }
    }

    pub fn help(&self) -> &'static str {
        if self.editing {
            "type to edit  enter/esc: done"
        } else {
            "tab/j/k: move  enter/space: edit, toggle or submit  esc: back"
        }
    }

    pub fn request(&self) -> CreateRepoRequest {
        CreateRepoRequest {
            name: self.name.value().trim().to_string(),
            description: self.description.value().trim().to_string(),
            private: self.private,
            has_issues: self.has_issues,
            has_projects: self.has_projects,
            has_wiki: self.has_wiki,
        }
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Key(key) if self.editing => {
                self.edit_key(key);
                Vec::new()
            }
            Msg::Key(key) => self.key(key),
            Msg::Task(TaskOutcome::RepoCreated { name, result }) => {
                self.submitting = false;
                self.status = Some(match result {
                    Ok(()) => Status::success(format!("Created repository {}", name)),
                    Err(e) => Status::danger(format!("Could not create {}: {}", name, e)),
                });
                Vec::new()
            }
            Msg::Resize { .. } | Msg::Tick | Msg::Task(_) => Vec::new(),
        }
    }

    fn edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.editing = false,
            _ => {
                let field = match self.focus {
                    Field::Name => &mut self.name,
                    Field::Description => &mut self.description,
                    _ => {
                        self.editing = false;
                        return;
                    }
                };
                field.handle_key(key);
            }
        }
    }

    fn key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Tab | KeyCode::Char('j') | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Char('k') | KeyCode::Up => self.focus = self.focus.prev(),
            KeyCode::Enter | KeyCode::Char(' ') => return self.activate(),
            KeyCode::Esc | KeyCode::Char('q') => {
                return vec![Command::Navigate(NavRequest::back(
                    self.origin,
                    PageTag::CreateRepo,
                ))];
            }
            _ => {}
        }
        Vec::new()
    }

    fn activate(&mut self) -> Vec<Command> {
        match self.focus {
            Field::Name | Field::Description => self.editing = true,
            Field::Private => self.private = !self.private,
            Field::Issues => self.has_issues = !self.has_issues,
            Field::Projects => self.has_projects = !self.has_projects,
            Field::Wiki => self.has_wiki = !self.has_wiki,
            Field::Submit => return self.submit(),
        }
        Vec::new()
    }

    fn submit(&mut self) -> Vec<Command> {
        if self.submitting {
            return Vec::new();
        }

        let request = self.request();
        if request.name.is_empty() {
            self.status = Some(Status::warning("Repository name is required"));
            return Vec::new();
        }
        let Some(token) = self.config.token.clone() else {
            self.status = Some(Status::danger(
                "No token configured: set PAT in ~/.remgit.conf or GITHUB_TOKEN",
            ));
            return Vec::new();
        };

        self.submitting = true;
        self.status = Some(Status::info("Creating repository..."));
        vec![Command::CreateRepository { token, request }]
    }
}
