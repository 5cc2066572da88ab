use serde::{Deserialize, Serialize};

use super::page::Link;

/// Structured view of one quiz page. Built once per fetch, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionData {
    pub question_text: String,
    pub submit_url: String,
    pub scrape_paths: Vec<String>,
    pub data_file_urls: Vec<String>,
    pub links: Vec<Link>,
    pub base_url: String,
}

impl QuestionData {
    pub fn has_scrape_directive(&self) -> bool {
        !self.scrape_paths.is_empty()
    }
}
