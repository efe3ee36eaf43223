#[cfg(test)]
#[path = "code_action_test.rs"]
mod tests;

use std::str::FromStr;

use strum::EnumIter;
use strum::EnumString;
use strum::EnumVariantNames;

use super::AppError;

/// What the caller must provide as the primary input of an action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Source code to transform or analyse.
    Code,
    /// A natural-language description of the code to produce.
    Description,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, EnumVariantNames, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum CodeAction {
    Format,
    Debug,
    Review,
    Generate,
    Optimize,
    Document,
}

impl CodeAction {
    /// Parses an action identifier such as `format` or `generate`.
    pub fn resolve(id: &str) -> Result<CodeAction, AppError> {
        return CodeAction::from_str(id).map_err(|_| return AppError::UnknownAction(id.to_string()));
    }

    pub fn input_kind(&self) -> InputKind {
        match self {
            CodeAction::Generate => return InputKind::Description,
            CodeAction::Format
            | CodeAction::Debug
            | CodeAction::Review
            | CodeAction::Optimize
            | CodeAction::Document => return InputKind::Code,
        }
    }

    pub fn requires_code(&self) -> bool {
        return self.input_kind() == InputKind::Code;
    }

    pub fn system_instruction(&self) -> &'static str {
        match self {
            CodeAction::Format => return "You are a code formatter. Format the provided code properly with correct indentation and style. Return only the formatted code without explanations.",
            CodeAction::Debug => return "You are a debugging assistant. Analyze the code and identify bugs, potential issues, and suggest fixes.",
            CodeAction::Review => return "You are a senior code reviewer. Review the code for best practices, performance, security, and maintainability. Provide constructive feedback.",
            CodeAction::Generate => return "You are a code generator. Generate clean, well-structured code based on the description. Include comments for clarity.",
            CodeAction::Optimize => return "You are a performance optimization expert. Optimize the code for better performance, efficiency, and resource usage. Explain the optimizations made.",
            CodeAction::Document => return "You are a technical documentation expert. Add comprehensive documentation, comments, and JSDoc/docstrings to the code.",
        }
    }

    /// Builds the user turn. Input is embedded verbatim.
    pub fn format_user_content(&self, input: &str, language: &str) -> String {
        match self {
            CodeAction::Format => return format!("Format this {language} code:\n\n{input}"),
            CodeAction::Debug => return format!("Debug this {language} code:\n\n{input}"),
            CodeAction::Review => return format!("Review this {language} code:\n\n{input}"),
            CodeAction::Generate => return format!("Generate {language} code for: {input}"),
            CodeAction::Optimize => return format!("Optimize this {language} code:\n\n{input}"),
            CodeAction::Document => {
                return format!("Add documentation to this {language} code:\n\n{input}")
            }
        }
    }

    /// Sampling temperature. Formatting is a deterministic transform, analysis
    /// sits in the middle, generation gets the most room.
    pub fn temperature(&self) -> f32 {
        match self {
            CodeAction::Format => return 0.3,
            CodeAction::Debug | CodeAction::Review | CodeAction::Optimize | CodeAction::Document => {
                return 0.5
            }
            CodeAction::Generate => return 0.7,
        }
    }

    /// Name of the JSON request field holding the primary input.
    pub fn input_field(&self) -> &'static str {
        match self.input_kind() {
            InputKind::Code => return "code",
            InputKind::Description => return "description",
        }
    }

    /// Name of the JSON response field holding the reply text.
    pub fn response_field(&self) -> &'static str {
        match self {
            CodeAction::Format => return "formattedCode",
            CodeAction::Debug => return "analysis",
            CodeAction::Review => return "review",
            CodeAction::Generate => return "code",
            CodeAction::Optimize => return "optimizedCode",
            CodeAction::Document => return "documentedCode",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CodeAction::Format => return "Format Code",
            CodeAction::Debug => return "Debug Code",
            CodeAction::Review => return "Code Review",
            CodeAction::Generate => return "Generate Code",
            CodeAction::Optimize => return "Optimize Code",
            CodeAction::Document => return "Document Code",
        }
    }
}

/// One invocation of a code action. Built per call and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionRequest {
    pub action: CodeAction,
    pub language: String,
    /// Source code, or the description when the action is `generate`.
    pub primary_input: String,
}

impl ActionRequest {
    pub fn new(action: CodeAction, language: &str, primary_input: &str) -> ActionRequest {
        return ActionRequest {
            action,
            language: language.to_string(),
            primary_input: primary_input.to_string(),
        };
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.primary_input.trim().is_empty() {
            return Ok(());
        }

        if self.action.requires_code() {
            return Err(AppError::invalid_input("Please enter code"));
        }

        return Err(AppError::invalid_input("Please enter a description"));
    }

    pub fn user_content(&self) -> String {
        return self
            .action
            .format_user_content(&self.primary_input, &self.language);
    }
}
