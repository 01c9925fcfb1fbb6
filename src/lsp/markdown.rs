use std::fmt::Write;

/// Incrementally builds Markdown sections for completion item documentation.
#[derive(Default)]
pub struct MarkdownWriter {
    buffer: String,
    sections: usize,
}

impl MarkdownWriter {
    pub fn is_empty(&self) -> bool {
        self.sections == 0
    }

    pub fn push_text(&mut self, text: impl AsRef<str>) {
        self.start_section();
        self.buffer.push_str(text.as_ref());
    }

    pub fn push_heading(&mut self, text: &str) {
        self.start_section();
        let _ = write!(self.buffer, "**{}**", escape(text));
    }

    pub fn push_field(&mut self, label: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.start_section();
        let _ = write!(self.buffer, "{label}: {}", escape(value));
    }

    pub fn push_rule(&mut self) {
        self.start_section();
        self.buffer.push_str("---");
    }

    pub fn finish(self) -> Option<String> {
        if self.sections == 0 {
            None
        } else {
            Some(self.buffer)
        }
    }

    fn start_section(&mut self) {
        if self.sections > 0 {
            self.buffer.push_str("\n\n");
        }
        self.sections += 1;
    }
}

/// Backslash-escape characters that would otherwise format ticket names.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '_' | '`' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
