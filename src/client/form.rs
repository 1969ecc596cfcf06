// src/client/form.rs
use super::conversation::EMPTY_MESSAGE_ERROR;
use super::ClientError;
use crate::models::catalog::Model;

/// Used until the user picks another tag from the catalog.
pub const FALLBACK_MODEL_TAG: &str = crate::config::DEFAULT_MODEL_TAG;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter { shift: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub model_tag: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Edited,
    Submit(Submission),
    /// Submission refused; see [`ChatForm::error`].
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ChatForm {
    input: String,
    model: String,
    catalog: Vec<String>,
    models_loading: bool,
    models_error: bool,
    submitting: bool,
    error: Option<String>,
}

impl ChatForm {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            model: default_model.into(),
            catalog: Vec::new(),
            models_loading: true,
            models_error: false,
            submitting: false,
            error: None,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn models_error(&self) -> bool {
        self.models_error
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.models_loading
    }

    pub fn set_catalog(&mut self, models: &[Model]) {
        self.catalog = models.iter().map(|m| m.tag.clone()).collect();
        self.models_loading = false;
        self.models_error = false;
    }

    pub fn catalog_failed(&mut self) {
        self.catalog.clear();
        self.models_loading = false;
        self.models_error = true;
    }

    pub fn select_model(&mut self, tag: &str) -> Result<(), ClientError> {
        if !self.catalog.iter().any(|t| t == tag) {
            return Err(ClientError::Validation(format!("Unknown model: {}", tag)));
        }
        self.model = tag.to_string();
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key) -> FormEvent {
        match key {
            Key::Char(c) => {
                self.input.push(c);
                self.error = None;
                FormEvent::Edited
            }
            Key::Backspace => {
                self.input.pop();
                FormEvent::Edited
            }
            Key::Enter { shift: true } => {
                self.input.push('\n');
                FormEvent::Edited
            }
            Key::Enter { shift: false } => match self.submit() {
                Ok(submission) => FormEvent::Submit(submission),
                Err(_) => FormEvent::Rejected,
            },
        }
    }

    /// Validates and takes the input. The form stays disabled until
    /// [`ChatForm::finish_submission`].
    pub fn submit(&mut self) -> Result<Submission, ClientError> {
        if self.submitting {
            return Err(ClientError::SubmissionInFlight);
        }
        if self.models_loading {
            return Err(ClientError::Validation("Models are still loading".to_string()));
        }
        if self.input.is_empty() {
            self.error = Some(EMPTY_MESSAGE_ERROR.to_string());
            return Err(ClientError::Validation(EMPTY_MESSAGE_ERROR.to_string()));
        }

        self.error = None;
        self.submitting = true;
        Ok(Submission {
            model_tag: self.model.clone(),
            content: std::mem::take(&mut self.input),
        })
    }

    pub fn finish_submission(&mut self) {
        self.submitting = false;
    }
}

impl Default for ChatForm {
    fn default() -> Self {
        Self::new(FALLBACK_MODEL_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_form() -> ChatForm {
        let mut form = ChatForm::default();
        form.set_catalog(&[Model::new("gpt-4o"), Model::new("gpt-4")]);
        form
    }

    fn type_text(form: &mut ChatForm, text: &str) {
        for c in text.chars() {
            form.handle_key(Key::Char(c));
        }
    }

    #[test]
    fn enter_submits_and_shift_enter_adds_a_newline() {
        let mut form = ready_form();
        type_text(&mut form, "line one");
        assert_eq!(form.handle_key(Key::Enter { shift: true }), FormEvent::Edited);
        type_text(&mut form, "line two");

        let event = form.handle_key(Key::Enter { shift: false });
        assert_eq!(
            event,
            FormEvent::Submit(Submission {
                model_tag: "gpt-4o".into(),
                content: "line one\nline two".into(),
            })
        );
        assert_eq!(form.input(), "");
        assert!(form.is_submitting());
    }

    #[test]
    fn empty_input_is_rejected_with_a_message() {
        let mut form = ready_form();
        assert_eq!(form.handle_key(Key::Enter { shift: false }), FormEvent::Rejected);
        assert_eq!(form.error(), Some(EMPTY_MESSAGE_ERROR));

        form.handle_key(Key::Char('x'));
        assert_eq!(form.error(), None);
    }

    #[test]
    fn submit_is_disabled_while_in_flight_or_loading() {
        let mut form = ChatForm::default();
        type_text(&mut form, "hi");
        assert!(!form.can_submit());
        assert!(form.submit().is_err());

        form.set_catalog(&[Model::new("gpt-4o")]);
        assert!(form.submit().is_ok());
        type_text(&mut form, "again");
        assert!(matches!(form.submit(), Err(ClientError::SubmissionInFlight)));

        form.finish_submission();
        assert!(form.submit().is_ok());
    }

    #[test]
    fn only_catalog_models_can_be_selected() {
        let mut form = ready_form();
        assert_eq!(form.model(), FALLBACK_MODEL_TAG);

        form.select_model("gpt-4").unwrap();
        assert_eq!(form.model(), "gpt-4");
        assert!(form.select_model("gpt-9").is_err());
        assert_eq!(form.model(), "gpt-4");
    }

    #[test]
    fn catalog_failure_unblocks_the_form_but_offers_no_models() {
        let mut form = ChatForm::default();
        form.catalog_failed();
        assert!(form.models_error());
        assert!(form.can_submit());
        assert!(form.select_model("gpt-4o").is_err());
    }
}
