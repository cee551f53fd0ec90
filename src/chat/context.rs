//! Prompt assembly

use crate::config::ChatConfig;
use crate::github::{FileContent, RepoData};
use crate::utils::text::{fence, language_tag, truncate_with_marker};

/// Builds the completion prompt from repository context and conversation state.
///
/// Output is a pure function of the inputs.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_file_chars: usize,
    truncation_marker: String,
}

impl ContextAssembler {
    pub fn new<S: Into<String>>(max_file_chars: usize, truncation_marker: S) -> Self {
        Self {
            max_file_chars,
            truncation_marker: truncation_marker.into(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.max_file_chars, config.truncation_marker.clone())
    }

    /// Assemble the full prompt
    pub fn build(
        &self,
        repo: &RepoData,
        files: &[FileContent],
        code_definitions: &[String],
        history: &[String],
        question: &str,
    ) -> String {
        let mut context = self.repository_section(repo);

        if !files.is_empty() {
            context.push_str("\n\nFile Contents:\n");
            let sections: Vec<String> = files.iter().map(|file| self.file_section(file)).collect();
            context.push_str(&sections.join("\n\n"));
        }

        if !code_definitions.is_empty() {
            context.push_str("\n\nCode Definitions:\n");
            context.push_str(&code_definitions.join("\n"));
        }

        format!(
            "Repository context:\n{}\n\nConversation History:\n{}\n\nUser Question: {}",
            context,
            history.join("\n"),
            question
        )
    }

    fn repository_section(&self, repo: &RepoData) -> String {
        let info = &repo.repository;
        [
            "Repository Information:".to_string(),
            format!("Name: {}", info.name),
            format!(
                "Description: {}",
                non_empty(info.description.as_deref()).unwrap_or("No description provided")
            ),
            format!(
                "Language: {}",
                non_empty(info.language.as_deref()).unwrap_or("Not specified")
            ),
            format!("Open Issues: {}", repo.issues.len()),
        ]
        .join("\n")
    }

    fn file_section(&self, file: &FileContent) -> String {
        let content = truncate_with_marker(&file.content, self.max_file_chars, &self.truncation_marker);
        format!(
            "Content of {}:\n{}",
            file.path,
            fence(language_tag(&file.path), &content)
        )
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
