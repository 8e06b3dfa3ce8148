//! Lightweight markup → HTML for the response region.
//!
//! Input is HTML-escaped first, so nothing in the text can become live markup
//! except what the rules below emit. Rules run in order and each sees the
//! previous one's output; the order matters (list items must exist before
//! they are wrapped, newlines must be `<br>` before the wrapper spans them).

use std::sync::LazyLock;

use regex::{Captures, Regex};

enum Rewrite {
    Template(&'static str),
    With(fn(&Captures) -> String),
}

/// One named substitution.
pub struct MarkupRule {
    pub name: &'static str,
    regex: Regex,
    rewrite: Rewrite,
}

impl MarkupRule {
    fn template(name: &'static str, pattern: &str, template: &'static str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            rewrite: Rewrite::Template(template),
        }
    }

    fn with(name: &'static str, pattern: &str, f: fn(&Captures) -> String) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            rewrite: Rewrite::With(f),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match &self.rewrite {
            Rewrite::Template(t) => self.regex.replace_all(text, *t).into_owned(),
            Rewrite::With(f) => self
                .regex
                .replace_all(text, |caps: &Captures| f(caps))
                .into_owned(),
        }
    }
}

static RULES: LazyLock<Vec<MarkupRule>> = LazyLock::new(|| {
    vec![
        MarkupRule::template("h3", r"(?m)^### (.*)$", "<h3>${1}</h3>"),
        MarkupRule::template("h2", r"(?m)^## (.*)$", "<h2>${1}</h2>"),
        MarkupRule::template("h1", r"(?m)^# (.*)$", "<h1>${1}</h1>"),
        MarkupRule::template("bold", r"\*\*(.*?)\*\*", "<strong>${1}</strong>"),
        MarkupRule::template("italic", r"\*(.*?)\*", "<em>${1}</em>"),
        MarkupRule::template("code_block", r"(?s)```(.*?)```", "<pre><code>${1}</code></pre>"),
        MarkupRule::template("inline_code", r"`(.*?)`", "<code>${1}</code>"),
        MarkupRule::with("link", r"\[([^\]]+)\]\(([^)]+)\)", link),
        MarkupRule::template("star_item", r"(?m)^\* (.*)$", "<li>${1}</li>"),
        MarkupRule::template("dash_item", r"(?m)^- (.*)$", "<li>${1}</li>"),
        MarkupRule::template("numbered_item", r"(?m)^(\d+)\. (.*)$", "<li>${1}. ${2}</li>"),
        MarkupRule::template("line_break", r"\n", "<br>"),
        MarkupRule::template("wrap_list", r"(<li>.*</li>)", "<ul>${1}</ul>"),
        MarkupRule::template("merge_open", r"<ul><ul>", "<ul>"),
        MarkupRule::template("merge_close", r"</ul></ul>", "</ul>"),
    ]
});

/// The ordered rule set.
pub fn rules() -> &'static [MarkupRule] {
    &RULES
}

fn link(caps: &Captures) -> String {
    let label = &caps[1];
    let href = caps[2].trim();
    if is_safe_href(href) {
        format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{label}</a>"#)
    } else {
        label.to_string()
    }
}

fn is_safe_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Escape text for inclusion in HTML body and attribute positions.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render response text to display HTML. Pure: same input, same output.
pub fn render(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    rules()
        .iter()
        .fold(escape_html(&normalized), |acc, rule| rule.apply(&acc))
}
