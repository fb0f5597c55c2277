//! Prompt definitions and the prompt store
//!
//! A prompt is a named, reusable template: an ordered list of role-tagged
//! message templates plus a default model identifier. The store persists
//! definitions through a [`StorageBackend`] handle and hands out [`Prompt`]
//! value objects for rendering.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PromptStageError, Result};
use crate::message::{Bindings, Message, TemplateMessage};
use crate::storage::{StorageBackend, NS_PROMPTS};
use crate::template;

/// Named, versioned prompt definition
///
/// Message ordering is preserved and semantically significant: it defines
/// the conversation priming order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique name within a store
    pub name: String,
    /// Default model identifier, snapshotted into sessions at creation
    pub model: String,
    /// Ordered message templates
    pub messages: Vec<TemplateMessage>,
}

impl Prompt {
    /// Renders every template message in original order
    ///
    /// Rendering is fail-fast: the first validation failure propagates and
    /// no partial message list is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use promptstage::message::{BindingValue, Role, TemplateMessage};
    /// use promptstage::prompt::Prompt;
    ///
    /// let prompt = Prompt {
    ///     name: "greet".to_string(),
    ///     model: "gpt-4".to_string(),
    ///     messages: vec![TemplateMessage::new(Role::System, "hello {{word}}")],
    /// };
    /// let bindings = HashMap::from([("word".to_string(), BindingValue::from("world"))]);
    /// let rendered = prompt.finish(&bindings).unwrap();
    /// assert_eq!(rendered[0].content, "hello world");
    /// ```
    pub fn finish(&self, bindings: &Bindings) -> Result<Vec<Message>> {
        let mut rendered = Vec::with_capacity(self.messages.len());
        for template_message in &self.messages {
            let content = template::render(template_message, bindings)?;
            rendered.push(Message {
                role: template_message.role,
                content,
                created_at: None,
            });
        }
        debug!("Rendered prompt '{}' ({} messages)", self.name, rendered.len());
        Ok(rendered)
    }

    /// Returns the declared parameter names across all messages
    ///
    /// Names appear in first-seen message order, deduplicated. Within one
    /// message's declaration map, names iterate in name order.
    pub fn param_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for message in &self.messages {
            for name in message.params.keys() {
                if !keys.iter().any(|key| key == name) {
                    keys.push(name.clone());
                }
            }
        }
        keys
    }

    /// Returns the union of all declared allow-lists
    ///
    /// When two messages declare the same parameter, the first declaration
    /// wins.
    pub fn params(&self) -> BTreeMap<String, Vec<String>> {
        let mut union = BTreeMap::new();
        for message in &self.messages {
            for (name, allowed) in &message.params {
                union
                    .entry(name.clone())
                    .or_insert_with(|| allowed.clone());
            }
        }
        union
    }
}

/// Keyed collection of prompt definitions
///
/// CRUD by prompt name over an explicit storage backend handle. Cloning the
/// store clones the handle, not the data.
#[derive(Clone)]
pub struct PromptStore {
    backend: Arc<dyn StorageBackend>,
}

impl PromptStore {
    /// Creates a store over the given backend
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Lists all stored prompts, in name order
    pub fn list(&self) -> Result<Vec<Prompt>> {
        let mut prompts = Vec::new();
        for bytes in self.backend.list(NS_PROMPTS)? {
            let prompt: Prompt = serde_json::from_slice(&bytes)?;
            prompts.push(prompt);
        }
        Ok(prompts)
    }

    /// Creates or fully replaces the prompt at `name`
    pub fn set(&self, name: &str, model: &str, messages: Vec<TemplateMessage>) -> Result<()> {
        let prompt = Prompt {
            name: name.to_string(),
            model: model.to_string(),
            messages,
        };
        self.put(&prompt)?;
        info!("Stored prompt '{}'", name);
        Ok(())
    }

    /// Replaces only the message list, preserving the model
    ///
    /// Fails with `PromptStageError::PromptNotFound` when `name` does not
    /// exist; silent creation would mint a prompt with no meaningful model
    /// for sessions to snapshot.
    pub fn update(&self, name: &str, messages: Vec<TemplateMessage>) -> Result<()> {
        let mut prompt = self
            .get(name)?
            .ok_or_else(|| PromptStageError::PromptNotFound(name.to_string()))?;
        prompt.messages = messages;
        self.put(&prompt)?;
        info!("Updated prompt '{}'", name);
        Ok(())
    }

    /// Removes the prompt at `name`; removing a missing name is a no-op
    pub fn delete(&self, name: &str) -> Result<()> {
        self.backend.delete(NS_PROMPTS, name)?;
        info!("Deleted prompt '{}'", name);
        Ok(())
    }

    /// Returns the prompt stored at `name`, if any
    pub fn get(&self, name: &str) -> Result<Option<Prompt>> {
        match self.backend.get(NS_PROMPTS, name)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Imports a prompt definition from a YAML document
    ///
    /// The document carries the same shape as [`Prompt`] (name, model,
    /// messages with optional params). Import has `set` semantics: an
    /// existing prompt under the same name is replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use promptstage::prompt::PromptStore;
    /// use promptstage::storage::MemoryBackend;
    ///
    /// let store = PromptStore::new(Arc::new(MemoryBackend::new()));
    /// let prompt = store
    ///     .import_yaml("name: greet\nmodel: gpt-4\nmessages:\n  - role: system\n    content: hi\n")
    ///     .unwrap();
    /// assert_eq!(prompt.model, "gpt-4");
    /// ```
    pub fn import_yaml(&self, document: &str) -> Result<Prompt> {
        let prompt: Prompt = serde_yaml::from_str(document)?;
        self.put(&prompt)?;
        info!("Imported prompt '{}' from YAML", prompt.name);
        Ok(prompt)
    }

    /// Imports a prompt definition from a YAML file on disk
    pub fn import_yaml_file(&self, path: impl AsRef<Path>) -> Result<Prompt> {
        let document = std::fs::read_to_string(path)?;
        self.import_yaml(&document)
    }

    fn put(&self, prompt: &Prompt) -> Result<()> {
        let value = serde_json::to_vec(prompt)?;
        self.backend.set(NS_PROMPTS, &prompt.name, &value)
    }
}
