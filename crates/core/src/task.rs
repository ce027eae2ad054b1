//! Task requests: the input to every assembly.

use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The user id used when the host does not supply one.
pub const DEFAULT_USER_ID: &str = "default";

/// Category of work the context package is assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Architecture,
    Feature,
    Bugfix,
    Refactor,
    Decision,
    Progress,
    General,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::Architecture,
        TaskType::Feature,
        TaskType::Bugfix,
        TaskType::Refactor,
        TaskType::Decision,
        TaskType::Progress,
        TaskType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Feature => "feature",
            Self::Bugfix => "bugfix",
            Self::Refactor => "refactor",
            Self::Decision => "decision",
            Self::Progress => "progress",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "architecture" | "arch" => Ok(Self::Architecture),
            "feature" => Ok(Self::Feature),
            "bugfix" | "bug" | "fix" => Ok(Self::Bugfix),
            "refactor" => Ok(Self::Refactor),
            "decision" => Ok(Self::Decision),
            "progress" => Ok(Self::Progress),
            "general" => Ok(Self::General),
            _ => Err(RequestError::InvalidTaskType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "med" | "m" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            _ => Err(RequestError::InvalidPriority(s.to_string())),
        }
    }
}

/// A validated request for a context package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_type: TaskType,
    pub user_input: String,
    #[serde(default)]
    pub priority: Priority,
    pub session_id: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.into()
}

impl TaskRequest {
    pub fn new(
        task_type: TaskType,
        user_input: impl Into<String>,
        priority: Priority,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            task_type,
            user_input: user_input.into(),
            priority,
            session_id: session_id.into(),
            user_id: default_user_id(),
        }
    }

    /// Attach the user whose long-term profile should be used.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Parse and validate an untyped request as it arrives from a host.
    pub fn parse(
        task_type: &str,
        user_input: &str,
        priority: &str,
        session_id: &str,
    ) -> Result<Self, RequestError> {
        let request = Self::new(
            task_type.parse()?,
            user_input,
            priority.parse()?,
            session_id,
        );
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.session_id.trim().is_empty() {
            return Err(RequestError::EmptySessionId);
        }
        if self.user_input.trim().is_empty() {
            return Err(RequestError::EmptyUserInput);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_parses_aliases() {
        assert_eq!("Bugfix".parse::<TaskType>().unwrap(), TaskType::Bugfix);
        assert_eq!("bug".parse::<TaskType>().unwrap(), TaskType::Bugfix);
        assert_eq!(" arch ".parse::<TaskType>().unwrap(), TaskType::Architecture);
        assert!(matches!(
            "cooking".parse::<TaskType>(),
            Err(RequestError::InvalidTaskType(_))
        ));
    }

    #[test]
    fn task_type_display_roundtrips() {
        for task in TaskType::ALL {
            assert_eq!(task.to_string().parse::<TaskType>().unwrap(), task);
        }
    }

    #[test]
    fn priority_rejects_unknown() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(RequestError::InvalidPriority(_))
        ));
    }

    #[test]
    fn parse_validates_shape() {
        let ok = TaskRequest::parse("feature", "add login", "low", "s1").unwrap();
        assert_eq!(ok.user_id, DEFAULT_USER_ID);
        assert_eq!(ok.priority, Priority::Low);

        assert_eq!(
            TaskRequest::parse("feature", "add login", "low", "  ").unwrap_err(),
            RequestError::EmptySessionId
        );
        assert_eq!(
            TaskRequest::parse("feature", "", "low", "s1").unwrap_err(),
            RequestError::EmptyUserInput
        );
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let json = r#"{"task_type":"refactor","user_input":"split module","session_id":"s"}"#;
        let req: TaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.priority, Priority::Medium);
        assert_eq!(req.user_id, "default");
    }
}
