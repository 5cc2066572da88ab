use serde::{Deserialize, Serialize};

/// A rendered page as seen by the browser, after client-side scripts ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageContent {
    pub html: String,
    pub visible_text: String,
    pub title: String,
    /// Text of the `#result` element, when the page has one.
    pub result_text: Option<String>,
}

impl PageContent {
    /// The `#result` container is authoritative over the generic body text.
    pub fn question_source(&self) -> &str {
        match self.result_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.visible_text,
        }
    }
}

/// An anchor tag with an `href`, in document order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}
