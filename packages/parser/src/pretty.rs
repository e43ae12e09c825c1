//! Pretty-print diagnostics with source context using ariadne

use tandem_syntax::{Diagnostic, Severity};

pub fn format_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for diagnostic in diagnostics {
        let start = diagnostic.range.start.min(source.len());
        let end = diagnostic.range.end.clamp(start, source.len());
        let (kind, color) = match diagnostic.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
            Severity::Info => (ReportKind::Advice, Color::Blue),
        };

        let mut report = Report::build(kind, filename, start)
            .with_code(&diagnostic.code)
            .with_message(&diagnostic.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_color(color)
                    .with_message(&diagnostic.message),
            );
        if let Some(suggestion) = &diagnostic.suggestion {
            report = report.with_help(suggestion);
        }

        if report
            .finish()
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            return "Error formatting failed".to_string();
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}
