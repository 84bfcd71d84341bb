//! Standalone HTML document assembly

use std::path::Path;

/// On-screen A4 simulation: dark canvas, page box with shadow, footer marker
pub const PAGE_CHROME_CSS: &str = r#"
/* Preview background */
html, body {
  background: #1a1a1a !important;
  margin: 0;
  padding: 20px;
}

/* A4 page container */
.page {
  width: 210mm;
  min-height: 297mm;
  margin: 0 auto 30px auto;
  box-shadow: 0 8px 40px rgba(0,0,0,0.6), 0 0 0 1px rgba(255,255,255,0.08);
  border-radius: 2px;
  position: relative;
}

/* Page marker */
.page::after {
  content: 'A4 Preview';
  position: absolute;
  bottom: 8mm;
  right: 10mm;
  font-size: 8pt;
  color: rgba(128,128,128,0.4);
  font-family: monospace;
  z-index: 100;
}
"#;

/// Body used when the converter produced nothing
pub const EMPTY_PLACEHOLDER: &str = "<p>Empty content</p>";

/// Which document flavour to assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// On-screen preview with page chrome
    Preview,
    /// Direct input for the PDF renderer
    Export,
}

/// Wrap converted body markup into a complete document.
///
/// `base_path` becomes the `<base href>` so relative images resolve against
/// the source file's directory wherever the HTML ends up on disk.
pub fn assemble(body_html: &str, stylesheet: &str, base_path: &Path, variant: Variant) -> String {
    let base = base_href(base_path);
    let (chrome, body) = match variant {
        Variant::Preview if body_html.trim().is_empty() => (PAGE_CHROME_CSS, EMPTY_PLACEHOLDER),
        Variant::Preview => (PAGE_CHROME_CSS, body_html),
        Variant::Export => ("", body_html),
    };

    let mut html = String::with_capacity(stylesheet.len() + body.len() + chrome.len() + 256);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(&format!("<base href=\"file://{base}\">\n"));
    html.push_str("<style>\n");
    html.push_str(stylesheet);
    html.push('\n');
    html.push_str(chrome);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"page\">\n");
    html.push_str(body);
    html.push_str("\n</div>\n</body>\n</html>");
    html
}

/// Error page substituted for the preview when rendering fails
pub fn diagnostic_page(message: &str, hint: Option<&str>) -> String {
    let mut text = escape(message);
    if let Some(hint) = hint {
        text.push_str("\n\n");
        text.push_str(&escape(hint));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"></head>\n\
         <body style=\"background:#111;color:#f00;padding:40px\"><pre>{text}</pre></body>\n</html>"
    )
}

fn base_href(base_path: &Path) -> String {
    let mut base = base_path.to_string_lossy().replace('\\', "/");
    if !base.is_empty() && !base.ends_with('/') {
        base.push('/');
    }
    base
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
