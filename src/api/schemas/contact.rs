use lettre::Address;
use serde::{Deserialize, Serialize};

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_MESSAGE_CHARS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactRequest {
    /// Validates the submission before it is accepted.
    ///
    /// # Errors
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.chars().count() < MIN_NAME_CHARS {
            return Err(format!("name must be at least {MIN_NAME_CHARS} characters"));
        }
        if self.email.parse::<Address>().is_err() {
            return Err("email must be a valid email address".into());
        }
        if self.message.chars().count() < MIN_MESSAGE_CHARS {
            return Err(format!("message must be at least {MIN_MESSAGE_CHARS} characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub status: String,
    pub message: String,
}

impl ContactResponse {
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            status: "accepted".to_string(),
            message: "Your message has been received and will be processed shortly.".to_string(),
        }
    }
}
