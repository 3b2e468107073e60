//! Input-shape checks for request bodies.

use super::error::ApiError;
use crate::model::{NewTask, TaskUpdate};

const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_TITLE_LENGTH: usize = 200;

fn finish(details: Vec<String>) -> Result<(), ApiError> {
    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(details))
    }
}

/// Loose address check: one `@`, a non-empty local part, and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn validate_registration(email: &str, password: &str) -> Result<(), ApiError> {
    let mut details = Vec::new();
    if !is_valid_email(email) {
        details.push("Invalid email".to_string());
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        details.push(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    } else if len > MAX_PASSWORD_LENGTH {
        details.push(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        ));
    }
    finish(details)
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ApiError> {
    let mut details = Vec::new();
    if !is_valid_email(email) {
        details.push("Invalid email".to_string());
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        details.push(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        ));
    }
    finish(details)
}

fn check_title(title: &str, details: &mut Vec<String>) {
    if title.trim().is_empty() {
        details.push("Title is required".to_string());
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        details.push(format!(
            "Title cannot be longer than {} characters",
            MAX_TITLE_LENGTH
        ));
    }
}

pub fn validate_new_task(task: &NewTask) -> Result<(), ApiError> {
    let mut details = Vec::new();
    check_title(&task.title, &mut details);
    finish(details)
}

pub fn validate_task_update(update: &TaskUpdate) -> Result<(), ApiError> {
    let mut details = Vec::new();
    if let Some(title) = &update.title {
        check_title(title, &mut details);
    }
    finish(details)
}
