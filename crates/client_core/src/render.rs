//! Turns a parsed report tree into nested, labelled display sections.

use std::fmt;

use shared::{
    domain::LabelStyle,
    protocol::{ReportNode, MAX_REPORT_DEPTH},
};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayFragment {
    Empty,
    Text(String),
    Bullets(Vec<DisplayFragment>),
    Sections(Vec<Subsection>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsection {
    pub label: String,
    pub body: DisplayFragment,
}

impl DisplayFragment {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRenderer {
    label_style: LabelStyle,
    max_depth: usize,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new(LabelStyle::Plain)
    }
}

impl ReportRenderer {
    pub fn new(label_style: LabelStyle) -> Self {
        Self {
            label_style,
            max_depth: MAX_REPORT_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn render(&self, node: &ReportNode) -> DisplayFragment {
        self.render_at(node, 0)
    }

    fn render_at(&self, node: &ReportNode, depth: usize) -> DisplayFragment {
        if depth > self.max_depth {
            warn!(depth, max_depth = self.max_depth, "report nesting exceeds render limit");
            return DisplayFragment::Empty;
        }

        match node {
            ReportNode::Leaf(text) => DisplayFragment::Text(text.clone()),
            ReportNode::List(items) => DisplayFragment::Bullets(
                items
                    .iter()
                    .map(|item| self.render_at(item, depth + 1))
                    .collect(),
            ),
            ReportNode::Section(entries) => DisplayFragment::Sections(
                entries
                    .iter()
                    .map(|(key, child)| Subsection {
                        label: self.label_for(key),
                        body: self.render_at(child, depth + 1),
                    })
                    .collect(),
            ),
            ReportNode::Other => DisplayFragment::Empty,
        }
    }

    pub fn label_for(&self, key: &str) -> String {
        let spaced = key.replace('_', " ");
        match self.label_style {
            LabelStyle::Plain => spaced,
            LabelStyle::Capitalized => spaced
                .split(' ')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn collect_lines(fragment: &DisplayFragment, level: usize, indent: usize, out: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    match fragment {
        DisplayFragment::Empty => {}
        DisplayFragment::Text(text) => {
            out.extend(text.lines().map(|line| format!("{pad}{line}")));
        }
        DisplayFragment::Bullets(items) => {
            for item in items {
                match item {
                    DisplayFragment::Text(text) => {
                        let mut lines = text.lines();
                        out.push(format!("{pad}- {}", lines.next().unwrap_or_default()));
                        out.extend(lines.map(|line| format!("{pad}  {line}")));
                    }
                    DisplayFragment::Empty => out.push(format!("{pad}-")),
                    nested => {
                        out.push(format!("{pad}-"));
                        collect_lines(nested, level, indent + 2, out);
                    }
                }
            }
        }
        DisplayFragment::Sections(subsections) => {
            for subsection in subsections {
                out.push(format!("{pad}{} {}", "#".repeat(level.min(6)), subsection.label));
                collect_lines(&subsection.body, level + 1, indent, out);
                out.push(String::new());
            }
        }
    }
}

impl fmt::Display for DisplayFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        collect_lines(self, 1, 0, &mut lines);

        // Collapse runs of blank lines and drop leading ones.
        let mut previous_blank = true;
        for line in lines {
            let blank = line.trim().is_empty();
            if blank && previous_blank {
                continue;
            }
            writeln!(f, "{line}")?;
            previous_blank = blank;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
