//! Prompt templates for query expansion and grounded answers

use std::path::Path;

use crate::error::{Error, Result};

/// File name of the query expansion template inside a prompts directory
pub const QUERY_EXPANSION_FILE: &str = "query_expansion.md";
/// File name of the system prompt template
pub const RAG_SYSTEM_FILE: &str = "rag_system.md";
/// File name of the user prompt template
pub const RAG_USER_FILE: &str = "rag_user.md";

const DEFAULT_QUERY_EXPANSION: &str = r#"Rewrite the following search query so that it retrieves more relevant documents.
Add synonyms, related terms and the likely intent behind the question.
Answer with the expanded query only, without explanations.

Query: {query}"#;

const DEFAULT_RAG_SYSTEM: &str = r#"You are a document-grounded assistant that ONLY uses information from the provided context.

RULES:
1. Answer using ONLY facts that are explicitly stated in the context
2. If the answer is not in the context, say that the documents do not contain it
3. Never use outside knowledge or guess
4. Cite the numbered context blocks you rely on, e.g. [1] or [2]
5. Be concise and clear"#;

const DEFAULT_RAG_USER: &str = r#"CONTEXT:
{context}

QUESTION: {query}

Answer using only the context above:"#;

/// Placeholder values available to a template
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptVars<'a> {
    pub query: &'a str,
    pub context: &'a str,
}

impl<'a> PromptVars<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        match name {
            "query" => Some(self.query),
            "context" => Some(self.context),
            _ => None,
        }
    }
}

/// The three templates the pipeline renders
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    /// Expansion prompt; `{query}` is substituted
    pub query_expansion: String,
    /// System prompt; used verbatim
    pub rag_system: String,
    /// User prompt; `{query}` and `{context}` are substituted
    pub rag_user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            query_expansion: DEFAULT_QUERY_EXPANSION.to_string(),
            rag_system: DEFAULT_RAG_SYSTEM.to_string(),
            rag_user: DEFAULT_RAG_USER.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Load templates from `dir`, or the built-in set when `dir` is `None`.
    /// Templates are checked once here so rendering cannot fail later.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let templates = match dir {
            Some(dir) => Self {
                query_expansion: read_template(dir, QUERY_EXPANSION_FILE)?,
                rag_system: read_template(dir, RAG_SYSTEM_FILE)?,
                rag_user: read_template(dir, RAG_USER_FILE)?,
            },
            None => Self::default(),
        };
        templates.validate()?;
        Ok(templates)
    }

    /// Check every placeholder of the rendered templates is known
    pub fn validate(&self) -> Result<()> {
        let probe = PromptVars::default();
        render(&self.query_expansion, &probe)
            .map_err(|e| Error::template(format!("{}: {}", QUERY_EXPANSION_FILE, e)))?;
        render(&self.rag_user, &probe)
            .map_err(|e| Error::template(format!("{}: {}", RAG_USER_FILE, e)))?;
        Ok(())
    }

    /// Expansion prompt for `query`
    pub fn expansion_prompt(&self, query: &str) -> Result<String> {
        render(
            &self.query_expansion,
            &PromptVars {
                query,
                ..Default::default()
            },
        )
    }

    /// System prompt for the answer
    pub fn system_prompt(&self) -> &str {
        &self.rag_system
    }

    /// User prompt carrying the question and the numbered context
    pub fn user_prompt(&self, query: &str, context: &str) -> Result<String> {
        render(&self.rag_user, &PromptVars { query, context })
    }
}

fn read_template(dir: &Path, file: &str) -> Result<String> {
    let path = dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| Error::template(format!("Failed to read {}: {}", path.display(), e)))
}

/// Substitute `{name}` placeholders; `{{` and `}}` are literal braces.
pub fn render(template: &str, vars: &PromptVars<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len() + vars.context.len() + vars.query.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[pos + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| Error::template(format!("unclosed '{{' at byte {}", pos)))?;
                let name = &rest[..end];
                let value = vars
                    .lookup(name.trim())
                    .ok_or_else(|| Error::template(format!("unknown placeholder {{{}}}", name)))?;
                out.push_str(value);
                // skip the name and the closing brace
                for _ in 0..name.chars().count() + 1 {
                    chars.next();
                }
            }
            '}' => {
                return Err(Error::template(format!("single '}}' at byte {}", pos)));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
