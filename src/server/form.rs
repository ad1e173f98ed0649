//! The single-page upload form.
//!
//! Plain server-rendered HTML: one form that posts to `/convert` and a
//! diagnostics panel filled from a fresh [`ProbeReport`]. Every interpolated
//! value goes through `html_escape`.

use crate::config::{ConverterConfig, DEFAULT_OUTPUT_BASE_NAME};
use crate::probe::ProbeReport;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 42rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.5rem; }
fieldset { border: 1px solid #ccc; border-radius: 6px; padding: 1rem; margin-bottom: 1.5rem; }
label { display: block; margin: 0.6rem 0; }
input[type=text] { width: 100%; padding: 0.3rem; }
button { padding: 0.5rem 1.2rem; }
.diag dt { font-weight: 600; }
.diag dd { margin: 0 0 0.5rem 0; font-family: monospace; word-break: break-all; }
.missing { background: #fff3f3; border: 1px solid #e0a0a0; border-radius: 6px; padding: 0.8rem; }
.hint { color: #666; font-size: 0.9rem; }
"#;

/// Render the upload page.
pub fn render_index(report: &ProbeReport, config: &ConverterConfig) -> String {
    let available = report.is_available();
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>LaTeX to Word</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>LaTeX to Word (.docx)</h1>\n");

    if !available {
        let _ = write!(
            html,
            "<div class=\"missing\"><strong>{program} was not found on this server.</strong> \
             Conversions are disabled until it is installed.<br>\
             Install it (for example <code>apt-get install {program}</code> or \
             <code>brew install {program}</code>) and reload this page.</div>\n",
            program = text(&report.program),
        );
    }

    let _ = write!(
        html,
        "<form method=\"post\" action=\"/convert\" enctype=\"multipart/form-data\">\n\
         <fieldset>\n<legend>Convert</legend>\n\
         <label>LaTeX file (.{ext})\n<input type=\"file\" name=\"file\" accept=\".{ext_attr}\" required></label>\n\
         <label>Output file name\n<input type=\"text\" name=\"output_name\" value=\"{default_name}\"></label>\n\
         <span class=\"hint\">.{out_ext} is added automatically.</span>\n\
         <input type=\"hidden\" name=\"mathml\" value=\"false\">\n\
         <label><input type=\"checkbox\" name=\"mathml\" value=\"true\" checked> \
         Keep equations editable (MathML)</label>\n\
         <button type=\"submit\"{disabled}>Convert</button>\n\
         </fieldset>\n</form>\n",
        ext = text(&config.input_extension),
        ext_attr = attr(&config.input_extension),
        default_name = attr(DEFAULT_OUTPUT_BASE_NAME),
        out_ext = text(&config.output_extension),
        disabled = if available { "" } else { " disabled" },
    );

    html.push_str("<fieldset class=\"diag\">\n<legend>Diagnostics</legend>\n<dl>\n");
    push_entry(&mut html, "Converter", &report.program);
    push_entry(
        &mut html,
        "Path",
        &report
            .tool_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not found".to_string()),
    );
    push_entry(
        &mut html,
        "Version",
        report.version_line.as_deref().unwrap_or("unknown"),
    );
    push_entry(&mut html, "Platform", &report.platform);
    push_entry(&mut html, "Server", &report.server_version);
    html.push_str("</dl>\n<p class=\"hint\">Also available as JSON at <a href=\"/api/diagnostics\">/api/diagnostics</a>.</p>\n");
    html.push_str("</fieldset>\n</body>\n</html>\n");

    html
}

fn push_entry(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(html, "<dt>{}</dt><dd>{}</dd>", text(label), text(value));
}
