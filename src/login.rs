use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

use crate::inputter::{InputResult, Inputter};

pub const USERNAME_REQUIRED: &str = "Please input your Username!";
pub const PASSWORD_REQUIRED: &str = "Please input your Password!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Editing,
    Submitted,
}

#[derive(Debug, Clone, Default)]
pub struct LoginData {
    pub username: InputResult,
    pub password: InputResult,
    pub focus: LoginField,
    pub username_error: Option<&'static str>,
    pub password_error: Option<&'static str>,
}

/// The login form. Nothing is verified, a filled in form is all it takes.
#[derive(Default)]
pub struct LoginForm {
    username: Inputter,
    password: Inputter,
    focus: LoginField,
    username_touched: bool,
    password_touched: bool,
    username_error: Option<&'static str>,
    password_error: Option<&'static str>,
}

impl LoginForm {
    pub fn read(&mut self, key: KeyEvent) -> LoginOutcome {
        match (key.code, key.modifiers) {
            (KeyCode::Tab, _) | (KeyCode::Down, _) | (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
                self.focus = match self.focus {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
                LoginOutcome::Editing
            }
            (KeyCode::Enter, KeyModifiers::NONE) => self.submit(),
            (KeyCode::Esc, _) => LoginOutcome::Editing,
            _ => {
                match self.focus {
                    LoginField::Username => {
                        self.username.read(key);
                        self.username_touched = true;
                    }
                    LoginField::Password => {
                        self.password.read(key);
                        self.password_touched = true;
                    }
                }
                self.revalidate();
                LoginOutcome::Editing
            }
        }
    }

    fn revalidate(&mut self) {
        if self.username_touched {
            self.username_error = self.username.is_empty().then_some(USERNAME_REQUIRED);
        }
        if self.password_touched {
            self.password_error = self.password.is_empty().then_some(PASSWORD_REQUIRED);
        }
    }

    /// Validate both fields; only a complete form is submitted.
    pub fn submit(&mut self) -> LoginOutcome {
        self.username_touched = true;
        self.password_touched = true;
        self.revalidate();
        if let Some(field) = self.first_invalid() {
            self.focus = field;
            return LoginOutcome::Editing;
        }
        info!("Login submitted for {}", self.username.value());
        LoginOutcome::Submitted
    }

    fn first_invalid(&self) -> Option<LoginField> {
        if self.username_error.is_some() {
            Some(LoginField::Username)
        } else if self.password_error.is_some() {
            Some(LoginField::Password)
        } else {
            None
        }
    }

    pub fn data(&self) -> LoginData {
        LoginData {
            username: self.username.get(),
            password: self.password.get(),
            focus: self.focus,
            username_error: self.username_error,
            password_error: self.password_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputter::key;

    fn type_into(form: &mut LoginForm, text: &str) {
        for c in text.chars() {
            form.read(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn empty_form_is_blocked_with_both_messages() {
        let mut form = LoginForm::default();
        assert_eq!(form.read(key(KeyCode::Enter)), LoginOutcome::Editing);
        let data = form.data();
        assert_eq!(data.username_error, Some(USERNAME_REQUIRED));
        assert_eq!(data.password_error, Some(PASSWORD_REQUIRED));
        assert_eq!(data.focus, LoginField::Username);
    }

    #[test]
    fn missing_password_moves_focus_there() {
        let mut form = LoginForm::default();
        type_into(&mut form, "admin");
        assert_eq!(form.submit(), LoginOutcome::Editing);
        let data = form.data();
        assert_eq!(data.username_error, None);
        assert_eq!(data.password_error, Some(PASSWORD_REQUIRED));
        assert_eq!(data.focus, LoginField::Password);
    }

    #[test]
    fn complete_form_submits() {
        let mut form = LoginForm::default();
        type_into(&mut form, "admin");
        form.read(key(KeyCode::Tab));
        type_into(&mut form, "secret");
        assert_eq!(form.read(key(KeyCode::Enter)), LoginOutcome::Submitted);
        assert_eq!(form.data().password.masked('•'), "••••••");
    }

    #[test]
    fn errors_follow_edits_of_touched_fields() {
        let mut form = LoginForm::default();
        type_into(&mut form, "a");
        assert_eq!(form.data().username_error, None);
        form.read(key(KeyCode::Backspace));
        assert_eq!(form.data().username_error, Some(USERNAME_REQUIRED));
        // The untouched password field stays quiet until submit.
        assert_eq!(form.data().password_error, None);
        type_into(&mut form, "b");
        assert_eq!(form.data().username_error, None);
    }
}
