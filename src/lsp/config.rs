use serde_json::Value;

pub const DEFAULT_LABEL_LIMIT: usize = 94;
pub const DEFAULT_MIN_COLUMN: u32 = 3;

const SECTION: &str = "clubhouseLanguageServer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionConfig {
    /// Labels longer than this are cut and end in `...`.
    pub label_limit: usize,
    /// Requests with the cursor left of this column yield nothing.
    pub min_column: u32,
    /// Offer to insert the epic heading above a bullet list.
    pub epic_headings: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            label_limit: DEFAULT_LABEL_LIMIT,
            min_column: DEFAULT_MIN_COLUMN,
            epic_headings: true,
        }
    }
}

impl CompletionConfig {
    fn apply_section(&mut self, value: &Value) {
        let Some(map) = value.as_object() else {
            return;
        };
        if let Some(limit) = map.get("labelLimit").and_then(Value::as_u64) {
            self.label_limit = sanitize_limit(limit, self.label_limit);
        }
        if let Some(column) = map.get("minColumn").and_then(Value::as_u64) {
            self.min_column = u32::try_from(column).unwrap_or(self.min_column);
        }
        if let Some(enabled) = map.get("epicHeadings").and_then(Value::as_bool) {
            self.epic_headings = enabled;
        }
    }
}

fn sanitize_limit(value: u64, fallback: usize) -> usize {
    // the ellipsis alone takes three characters
    match usize::try_from(value) {
        Ok(limit) if limit > 3 => limit,
        _ => fallback,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    completion: CompletionConfig,
}

impl ServerConfig {
    pub fn completion(&self) -> CompletionConfig {
        self.completion
    }

    pub fn apply_settings(&mut self, value: Value) {
        if let Some(section) = completion_section(&value) {
            self.completion.apply_section(section);
        }
    }
}

fn completion_section(value: &Value) -> Option<&Value> {
    let obj = value.as_object()?;
    if let Some(section) = obj.get("completion") {
        return Some(section);
    }
    obj.get(SECTION).and_then(completion_section)
}
