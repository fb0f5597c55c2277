//! Message types shared by prompt definitions and session history
//!
//! This module defines the role-tagged message shapes used throughout the
//! library: concrete history messages, template messages carrying declared
//! parameter allow-lists, and the binding values supplied at render time.
//! Roles are a closed enum validated at construction boundaries rather than
//! free-form strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::PromptStageError;

/// Role of a message sender
///
/// Serialized in lowercase (`system`, `user`, `assistant`) for storage
/// and payload compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Conversation priming instructions
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

impl Role {
    /// Returns the lowercase wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = PromptStageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(PromptStageError::Validation {
                param: "role".to_string(),
                message: format!("unknown role '{}'", other),
            }),
        }
    }
}

/// Concrete message in a conversation
///
/// Represents a ready-to-send message: either rendered from a prompt
/// template or pushed into a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
    /// Creation timestamp, set when the message enters a session history
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use promptstage::message::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            created_at: None,
        }
    }

    /// Stamps the message with the current time
    pub fn timestamped(mut self) -> Self {
        self.created_at = Some(Utc::now());
        self
    }
}

/// Message template inside a prompt definition
///
/// The content may contain scalar placeholders (`{{name}}`) and block
/// placeholders (`{{#name}}...{{/name}}`). `params` declares the only
/// permitted values for each named placeholder; a placeholder absent from
/// `params` accepts any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessage {
    /// Role the rendered message will carry
    pub role: Role,
    /// Template text
    pub content: String,
    /// Allow-lists keyed by placeholder name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Vec<String>>,
}

impl TemplateMessage {
    /// Creates a template message with no declared allow-lists
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            params: BTreeMap::new(),
        }
    }

    /// Declares an allow-list for a placeholder
    ///
    /// # Examples
    ///
    /// ```
    /// use promptstage::message::{Role, TemplateMessage};
    ///
    /// let template = TemplateMessage::new(Role::System, "Respond in {{lang}}")
    ///     .with_param("lang", &["eng", "spa"]);
    /// assert_eq!(template.params["lang"], vec!["eng", "spa"]);
    /// ```
    pub fn with_param(mut self, name: impl Into<String>, allowed: &[&str]) -> Self {
        self.params
            .insert(name.into(), allowed.iter().map(|s| s.to_string()).collect());
        self
    }
}

/// Value bound to a template placeholder
///
/// Scalar placeholders take `Text`; block placeholders iterate over `List`.
/// Untagged serde representation lets callers pass plain JSON strings and
/// arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingValue {
    /// Single text value for scalar substitution
    Text(String),
    /// Sequence of values for block iteration
    List(Vec<String>),
}

impl From<&str> for BindingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BindingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for BindingValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for BindingValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(|s| s.to_string()).collect())
    }
}

/// Parameter bindings supplied to the renderer
pub type Bindings = HashMap<String, BindingValue>;
