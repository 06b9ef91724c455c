//! Narrative markup to terminal text.
//!
//! Narratives use `<p>`, `<strong>`/`<b>` and `<br>`. Other tags are dropped,
//! whitespace is collapsed and a few common entities are decoded.

use ratatui::{
    style::Style,
    text::{Line, Span},
};

/// A run of text and whether it is bold.
pub type Run = (String, bool);

/// Split markup into lines of styled runs. Paragraphs are separated by an
/// empty line.
#[must_use]
pub fn parse(markup: &str) -> Vec<Vec<Run>> {
    let mut lines: Vec<Vec<Run>> = Vec::new();
    let mut line: Vec<Run> = Vec::new();
    let mut text = String::new();
    let mut bold = false;

    let mut rest = markup;
    while !rest.is_empty() {
        let Some(start) = rest.find('<') else {
            text.push_str(rest);
            break;
        };
        text.push_str(&rest[..start]);

        let Some(len) = rest[start..].find('>') else {
            // Unterminated tag: keep it as text
            text.push_str(&rest[start..]);
            break;
        };
        let tag = rest[start + 1..start + len]
            .trim()
            .trim_end_matches('/')
            .trim()
            .to_ascii_lowercase();
        rest = &rest[start + len + 1..];

        let name = tag.split_whitespace().next().unwrap_or("");
        match name {
            "strong" | "b" => {
                flush_run(&mut line, &mut text, bold);
                bold = true;
            }
            "/strong" | "/b" => {
                flush_run(&mut line, &mut text, bold);
                bold = false;
            }
            "br" => {
                flush_run(&mut line, &mut text, bold);
                push_line(&mut lines, &mut line);
            }
            "p" | "/p" => {
                flush_run(&mut line, &mut text, bold);
                push_line(&mut lines, &mut line);
                if name == "/p" {
                    push_blank(&mut lines);
                }
            }
            _ => {}
        }
    }

    flush_run(&mut line, &mut text, bold);
    push_line(&mut lines, &mut line);

    while lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }
    lines
}

/// Render markup as ratatui lines.
#[must_use]
pub fn to_lines(markup: &str, normal: Style, bold: Style) -> Vec<Line<'static>> {
    parse(markup)
        .into_iter()
        .map(|runs| {
            Line::from(
                runs.into_iter()
                    .map(|(text, is_bold)| Span::styled(text, if is_bold { bold } else { normal }))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

fn flush_run(line: &mut Vec<Run>, text: &mut String, bold: bool) {
    if text.is_empty() {
        return;
    }

    let decoded = decode_entities(text);
    let mut collapsed = String::with_capacity(decoded.len());
    let mut last_space = line.is_empty() || line.last().is_some_and(|(t, _)| t.ends_with(' '));
    for c in decoded.chars() {
        if c.is_whitespace() {
            if !last_space {
                collapsed.push(' ');
                last_space = true;
            }
        } else {
            collapsed.push(c);
            last_space = false;
        }
    }
    text.clear();

    if !collapsed.is_empty() {
        line.push((collapsed, bold));
    }
}

fn push_line(lines: &mut Vec<Vec<Run>>, line: &mut Vec<Run>) {
    if let Some((last, _)) = line.last_mut() {
        let trimmed = last.trim_end().len();
        last.truncate(trimmed);
    }
    line.retain(|(t, _)| !t.is_empty());
    if !line.is_empty() {
        lines.push(std::mem::take(line));
    }
}

fn push_blank(lines: &mut Vec<Vec<Run>>) {
    if lines.last().is_some_and(|l| !l.is_empty()) {
        lines.push(Vec::new());
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
