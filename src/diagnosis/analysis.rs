// Analysis text parser
//
// Splits a diagnosis report into sections. A line starting with a single `#`
// opens a section; inside a section whose title matches one of the configured
// alternatives keywords, `##` lines open numbered options.

use serde::{Deserialize, Serialize};

/// Keywords that mark the alternatives section (matched case-insensitively)
pub const DEFAULT_ALTERNATIVES_KEYWORDS: &[&str] = &["alternativas", "alternatives"];

/// One `#` section of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Heading text without the marker; empty for text before the first heading
    pub title: String,
    pub body: String,
    /// Enumerated options, only for the alternatives section
    pub alternatives: Vec<AlternativeOption>,
    /// Title matched one of the alternatives keywords
    #[serde(default)]
    pub alternatives_section: bool,
}

impl AnalysisSection {
    /// Whether this is the alternatives section, even when it lists no options
    pub fn is_alternatives(&self) -> bool {
        self.alternatives_section
    }
}

/// One `##` option inside the alternatives section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeOption {
    /// 1-based position
    pub number: usize,
    pub title: String,
    pub body: String,
}

fn heading_level(line: &str) -> usize {
    line.trim_start().chars().take_while(|&c| c == '#').count()
}

fn heading_text(line: &str) -> String {
    line.trim_start().trim_start_matches('#').trim().to_string()
}

/// Split `text` into sections, expanding the alternatives section into options
pub fn parse_analysis(text: &str, keywords: &[String]) -> Vec<AnalysisSection> {
    let mut sections = Vec::new();
    let mut title: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        if heading_level(line) == 1 {
            push_section(&mut sections, title.take(), &body, keywords);
            body.clear();
            title = Some(heading_text(line));
        } else {
            body.push(line);
        }
    }
    push_section(&mut sections, title, &body, keywords);

    sections
}

fn push_section(sections: &mut Vec<AnalysisSection>, title: Option<String>, body: &[&str], keywords: &[String]) {
    let body = body.join("\n").trim().to_string();
    if title.is_none() && body.is_empty() {
        return;
    }
    let title = title.unwrap_or_default();

    let lowered = title.to_lowercase();
    let alternatives_section = keywords.iter().any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()));
    let alternatives = if alternatives_section { parse_options(&body) } else { Vec::new() };

    sections.push(AnalysisSection {
        title,
        body,
        alternatives,
        alternatives_section,
    });
}

fn parse_options(body: &str) -> Vec<AlternativeOption> {
    let mut options = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in body.lines() {
        if heading_level(line) >= 2 {
            if let Some((title, lines)) = current.take() {
                options.push((title, lines));
            }
            current = Some((heading_text(line), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some(last) = current {
        options.push(last);
    }

    options
        .into_iter()
        .enumerate()
        .map(|(i, (title, lines))| AlternativeOption {
            number: i + 1,
            title,
            body: lines.join("\n").trim().to_string(),
        })
        .collect()
}

/// Default keyword list as owned strings
pub fn default_keywords() -> Vec<String> {
    DEFAULT_ALTERNATIVES_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
