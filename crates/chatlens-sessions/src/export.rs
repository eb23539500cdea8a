use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::types::{ExportFormat, Role, SessionSummary};

/// Format tag written into the native JSON envelope so importers can
/// recognize the exporter.
pub const EXPORT_FORMAT_TAG: &str = "chatlens-export";

/// Envelope version.
pub const EXPORT_VERSION: u32 = 1;

/// Render a set of summaries (messages attached) into a serialized payload.
pub fn render_export(sessions: &[SessionSummary], format: ExportFormat) -> String {
    match format {
        ExportFormat::Json => render_json(sessions),
        ExportFormat::Markdown => render_markdown(sessions),
        ExportFormat::Html => render_html(sessions),
    }
}

/// Byte-copy a session's original backing file, preserving every field the
/// source format defines even when the index's model does not represent it.
pub fn copy_original(source: &Path, dest: &Path) -> Result<u64> {
    std::fs::copy(source, dest).with_context(|| {
        format!(
            "failed to copy {} to {}",
            source.display(),
            dest.display()
        )
    })
}

fn render_json(sessions: &[SessionSummary]) -> String {
    let envelope = json!({
        "format": EXPORT_FORMAT_TAG,
        "version": EXPORT_VERSION,
        "chats": sessions,
    });
    serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| "{}".to_string())
}

fn render_markdown(sessions: &[SessionSummary]) -> String {
    let mut out = String::new();
    for session in sessions {
        out.push_str(&format!(
            "# {} ({})\n\n",
            session.container_label, session.id
        ));
        out.push_str(&format!(
            "Created {} · Updated {} · {} messages\n\n",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.updated_at.format("%Y-%m-%d %H:%M"),
            session.message_count.value(),
        ));
        for message in &session.messages {
            out.push_str(&format!(
                "## {} ({})\n\n{}\n\n",
                role_label(message.role),
                message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                message.content,
            ));
        }
    }
    out
}

fn render_html(sessions: &[SessionSummary]) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Chat export</title>\n</head>\n<body>\n",
    );
    for session in sessions {
        out.push_str(&format!(
            "<section>\n<h1>{} ({})</h1>\n",
            escape_html(&session.container_label),
            escape_html(&session.id),
        ));
        for message in &session.messages {
            out.push_str(&format!(
                "<article>\n<h2>{}</h2>\n<p>{}</p>\n</article>\n",
                role_label(message.role),
                escape_html(&message.content),
            ));
        }
        out.push_str("</section>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

/// Escape text for safe embedding in the HTML export.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(
            escape_html(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#39;y&#39;&quot;)&lt;/script&gt;"
        );
    }
}
