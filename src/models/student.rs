// src/models/student.rs

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_STUDENT_CLASS;

/// Identity of the test-taker, injected by the auth/profile layer and
/// trusted as already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub id: String,
    pub name: String,
    pub class: Option<String>,
}

impl StudentIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn class_or_default(&self) -> &str {
        self.class.as_deref().unwrap_or(DEFAULT_STUDENT_CLASS)
    }
}
