//! Template rendering for prompt messages
//!
//! This module renders a single template message against caller-supplied
//! parameter bindings, producing the final message text or a validation
//! error.
//!
//! # Placeholder Syntax
//!
//! - Scalar substitution: `{{name}}`
//! - Block iteration: `{{#name}}...{{/name}}`, repeating the body once per
//!   element of a list bound to `name`, with `{{.}}` inside the body
//!   substituted by the current element
//!
//! # Validation
//!
//! A scalar placeholder whose name carries a declared allow-list on the
//! template must be bound to an exact member of that list; a missing or
//! non-member value fails rendering. Placeholders without an allow-list
//! degrade gracefully: a missing binding substitutes the empty string.
//! Block placeholders are never subject to allow-list validation and render
//! zero iterations when unbound. Blocks do not nest.
//!
//! Malformed templates (an unterminated `{{`, an unclosed block, a stray
//! close tag) are rejected with a validation error rather than rendered
//! partially.

use crate::error::{PromptStageError, Result};
use crate::message::{BindingValue, Bindings, TemplateMessage};

/// Marker substituted by the current element inside a block body
const ELEMENT_MARKER: &str = "{{.}}";

/// Renders a template message against the given bindings
///
/// Produces the final message text, substituting scalar placeholders and
/// expanding block placeholders in a single left-to-right pass. Rendering
/// is deterministic: the same template and bindings always yield the same
/// output.
///
/// # Arguments
///
/// * `template` - The template message whose content is rendered
/// * `bindings` - Parameter bindings by placeholder name
///
/// # Errors
///
/// Returns `PromptStageError::Validation` when an allow-listed parameter is
/// missing or outside its declared set, or when the template itself is
/// malformed.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use promptstage::message::{BindingValue, Role, TemplateMessage};
/// use promptstage::template::render;
///
/// let template = TemplateMessage::new(Role::User, "hello {{word}}");
/// let bindings = HashMap::from([("word".to_string(), BindingValue::from("world"))]);
/// assert_eq!(render(&template, &bindings).unwrap(), "hello world");
/// ```
pub fn render(template: &TemplateMessage, bindings: &Bindings) -> Result<String> {
    let content = template.content.as_str();
    let mut output = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let close = after_open.find("}}").ok_or_else(|| PromptStageError::Validation {
            param: "template".to_string(),
            message: "unterminated '{{' placeholder".to_string(),
        })?;
        let tag = after_open[..close].trim();
        rest = &after_open[close + 2..];

        if let Some(name) = tag.strip_prefix('#') {
            let name = name.trim();
            let (body, remainder) = split_block(name, rest)?;
            render_block(name, body, bindings, &mut output);
            rest = remainder;
        } else if let Some(name) = tag.strip_prefix('/') {
            return Err(PromptStageError::Validation {
                param: name.trim().to_string(),
                message: "close tag without a matching open tag".to_string(),
            }
            .into());
        } else {
            substitute_scalar(template, tag, bindings, &mut output)?;
        }
    }

    output.push_str(rest);
    Ok(output)
}

/// Splits `rest` at the close tag of the named block
///
/// Returns the block body and the text following the close tag.
fn split_block<'a>(name: &str, rest: &'a str) -> Result<(&'a str, &'a str)> {
    let close_tag = format!("{{{{/{}}}}}", name);
    let close_pos = rest
        .find(&close_tag)
        .ok_or_else(|| PromptStageError::Validation {
            param: name.to_string(),
            message: format!("unclosed block '{{{{#{}}}}}'", name),
        })?;
    Ok((&rest[..close_pos], &rest[close_pos + close_tag.len()..]))
}

/// Expands a block body once per bound element
///
/// A list binding iterates its elements, a text binding iterates once with
/// that value, and a missing binding produces zero iterations. Only the
/// element marker is substituted inside the body.
fn render_block(name: &str, body: &str, bindings: &Bindings, output: &mut String) {
    match bindings.get(name) {
        Some(BindingValue::List(items)) => {
            for item in items {
                output.push_str(&body.replace(ELEMENT_MARKER, item));
            }
        }
        Some(BindingValue::Text(value)) => {
            output.push_str(&body.replace(ELEMENT_MARKER, value));
        }
        None => {}
    }
}

/// Substitutes a scalar placeholder, enforcing its allow-list if declared
fn substitute_scalar(
    template: &TemplateMessage,
    name: &str,
    bindings: &Bindings,
    output: &mut String,
) -> Result<()> {
    if let Some(allowed) = template.params.get(name) {
        match bindings.get(name) {
            Some(BindingValue::Text(value)) => {
                if !allowed.iter().any(|candidate| candidate == value) {
                    return Err(PromptStageError::Validation {
                        param: name.to_string(),
                        message: format!("value '{}' is not in the allowed set", value),
                    }
                    .into());
                }
                output.push_str(value);
            }
            Some(BindingValue::List(_)) => {
                return Err(PromptStageError::Validation {
                    param: name.to_string(),
                    message: "expected a single value, got a list".to_string(),
                }
                .into());
            }
            None => {
                return Err(PromptStageError::Validation {
                    param: name.to_string(),
                    message: "missing value for restricted parameter".to_string(),
                }
                .into());
            }
        }
    } else {
        // Unrestricted placeholders degrade to empty string when unbound;
        // a list has no scalar text form and renders empty as well.
        match bindings.get(name) {
            Some(BindingValue::Text(value)) => output.push_str(value),
            Some(BindingValue::List(_)) | None => {}
        }
    }
    Ok(())
}
