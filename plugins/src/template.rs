//! `%name%` filename-template substitution.
//!
//! Templates contain literal `%name%` tokens; only the field names supplied by
//! the caller are substituted and anything else is left verbatim. The scan is
//! a single left-to-right pass, so substituted output is never rescanned — a
//! field value that happens to contain `%token%`-shaped text survives as-is.

/// A resolved field value: plain text, or a zero-padded number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Padded(u32, usize),
}

impl FieldValue {
    fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Padded(n, width) => format!("{n:0w$}", w = *width),
        }
    }
}

/// A named template field. Callers resolve every field to a concrete value
/// (including the literal `"unknown"`) before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub value: FieldValue,
}

impl Field {
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Self { name, value: FieldValue::Text(value.into()) }
    }

    pub fn padded(name: &'static str, value: u32, width: usize) -> Self {
        Self { name, value: FieldValue::Padded(value, width) }
    }
}

/// Renders `template` by substituting every `%name%` token that matches a
/// field. Returns `None` for a missing or empty template, which callers treat
/// as "do not rename".
pub fn render(template: Option<&str>, fields: &[Field]) -> Option<String> {
    let template = template?;
    if template.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                if let Some(field) = fields.iter().find(|f| f.name == name) {
                    out.push_str(&field.value.render());
                    rest = &after[end + 1..];
                } else {
                    // Not one of ours: emit the opening '%' and rescan from the
                    // next character so `%stage%` inside `%x%stage%` still hits.
                    out.push('%');
                    rest = after;
                }
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Some(out)
}
