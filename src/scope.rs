//! Execution scope for binding: which document selectors resolve against and
//! how leaf nodes are written.

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};

use crate::dom;
use crate::parse::parse_html;
use crate::selector;
use crate::validate::BindError;

/// The DOM property a leaf binding writes when it has no update handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplaceAttribute {
    TextContent,
    Value,
    Checked,
}

/// Tag and input-type lists used to pick a [`ReplaceAttribute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindOptions {
    /// Elements whose `value` is replaced instead of their text.
    pub value_tags: Vec<String>,
    /// `<input type>`s whose `checked` state is replaced.
    pub checked_input_types: Vec<String>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            value_tags: vec![
                "input".to_string(),
                "textarea".to_string(),
                "progress".to_string(),
            ],
            checked_input_types: vec!["checkbox".to_string(), "radio".to_string()],
        }
    }
}

impl BindOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn replace_attribute_for(&self, node: &Handle) -> ReplaceAttribute {
        let Some(tag) = dom::tag_name(node) else {
            return ReplaceAttribute::TextContent;
        };
        if !self.value_tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            return ReplaceAttribute::TextContent;
        }
        match dom::input_type(node) {
            Some(kind)
                if self
                    .checked_input_types
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(&kind)) =>
            {
                ReplaceAttribute::Checked
            }
            _ => ReplaceAttribute::Value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    document: Handle,
    options: BindOptions,
}

impl Scope {
    pub fn new(document: Handle) -> Self {
        Self {
            document,
            options: BindOptions::default(),
        }
    }

    pub fn parse(html: &str) -> Result<Self, BindError> {
        Ok(Self::new(parse_html(html)?))
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn document(&self) -> &Handle {
        &self.document
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// `document.querySelector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Handle>, BindError> {
        selector::query_selector(&self.document, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(scope: &Scope, selector: &str) -> ReplaceAttribute {
        let node = scope.query_selector(selector).unwrap().unwrap();
        scope.options().replace_attribute_for(&node)
    }

    const FORM: &str = r#"
        <form>
            <input id="check" type="checkbox">
            <input id="radio" type="radio">
            <input id="text" type="text">
            <input id="bare">
            <textarea id="area"></textarea>
            <progress id="bar"></progress>
            <span id="label"></span>
        </form>
    "#;

    #[test]
    fn test_default_replace_attribute() {
        let scope = Scope::parse(FORM).unwrap();
        assert_eq!(strategy(&scope, "#check"), ReplaceAttribute::Checked);
        assert_eq!(strategy(&scope, "#radio"), ReplaceAttribute::Checked);
        assert_eq!(strategy(&scope, "#text"), ReplaceAttribute::Value);
        assert_eq!(strategy(&scope, "#bare"), ReplaceAttribute::Value);
        assert_eq!(strategy(&scope, "#area"), ReplaceAttribute::Value);
        assert_eq!(strategy(&scope, "#bar"), ReplaceAttribute::Value);
        assert_eq!(strategy(&scope, "#label"), ReplaceAttribute::TextContent);
    }

    #[test]
    fn test_options_from_json() {
        let options = BindOptions::from_json(r#"{ "valueTags": ["input", "select"] }"#).unwrap();
        assert_eq!(options.checked_input_types, vec!["checkbox", "radio"]);

        let scope = Scope::parse(r#"<select id="s"></select><textarea id="t"></textarea>"#)
            .unwrap()
            .with_options(options);
        assert_eq!(strategy(&scope, "#s"), ReplaceAttribute::Value);
        assert_eq!(strategy(&scope, "#t"), ReplaceAttribute::TextContent);
    }
}
