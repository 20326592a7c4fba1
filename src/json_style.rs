//! Purpose: Render JSON for the terminal, optionally with ANSI colors.
//! Exports: `render_json`, `JsonLayout`.
//! Role: Pure formatter behind every JSON line the CLI prints.
//! Invariants: Without color, output equals `serde_json::to_string_pretty` (Pretty)
//! or `serde_json::to_string` (Compact).

use serde_json::{Map, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum JsonLayout {
    /// Two-space indented, one member per line.
    Pretty,
    /// Single line, used for JSON Lines output such as dumped rows.
    Compact,
}

#[derive(Copy, Clone)]
enum Tint {
    Key,
    Text,
    Number,
    Literal,
    Punct,
}

impl Tint {
    // Basic 8-color codes; bright variants wash out on light themes.
    fn code(self) -> &'static str {
        match self {
            Tint::Key => "36",
            Tint::Text => "32",
            Tint::Number => "33",
            Tint::Literal => "35",
            Tint::Punct => "39",
        }
    }
}

struct Renderer {
    layout: JsonLayout,
    use_color: bool,
    out: String,
}

pub(crate) fn render_json(value: &Value, layout: JsonLayout, use_color: bool) -> String {
    let mut renderer = Renderer {
        layout,
        use_color,
        out: String::new(),
    };
    renderer.value(value, 0);
    renderer.out
}

impl Renderer {
    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.paint("null", Tint::Literal),
            Value::Bool(flag) => self.paint(if *flag { "true" } else { "false" }, Tint::Literal),
            Value::Number(num) => self.paint(&num.to_string(), Tint::Number),
            Value::String(text) => self.paint(&quoted(text), Tint::Text),
            Value::Array(items) => self.array(items, depth),
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            self.paint("[]", Tint::Punct);
            return;
        }
        self.paint("[", Tint::Punct);
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.paint(",", Tint::Punct);
            }
            self.break_line(depth + 1);
            self.value(item, depth + 1);
        }
        self.break_line(depth);
        self.paint("]", Tint::Punct);
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.paint("{}", Tint::Punct);
            return;
        }
        self.paint("{", Tint::Punct);
        for (idx, (key, value)) in map.iter().enumerate() {
            if idx > 0 {
                self.paint(",", Tint::Punct);
            }
            self.break_line(depth + 1);
            self.paint(&quoted(key), Tint::Key);
            self.paint(":", Tint::Punct);
            if self.layout == JsonLayout::Pretty {
                self.out.push(' ');
            }
            self.value(value, depth + 1);
        }
        self.break_line(depth);
        self.paint("}", Tint::Punct);
    }

    fn break_line(&mut self, depth: usize) {
        if self.layout == JsonLayout::Pretty {
            self.out.push('\n');
            self.out.push_str(&"  ".repeat(depth));
        }
    }

    fn paint(&mut self, text: &str, tint: Tint) {
        if self.use_color {
            self.out.push_str("\u{1b}[");
            self.out.push_str(tint.code());
            self.out.push('m');
            self.out.push_str(text);
            self.out.push_str("\u{1b}[0m");
        } else {
            self.out.push_str(text);
        }
    }
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::{JsonLayout, render_json};
    use serde_json::json;

    #[test]
    fn plain_rendering_matches_serde_json() {
        let value = json!({
            "created": { "table": "t.csv", "columns": ["a", "b"] },
            "empty": [],
            "truncated": false,
            "width": 2,
            "note": null
        });
        assert_eq!(
            render_json(&value, JsonLayout::Pretty, false),
            serde_json::to_string_pretty(&value).expect("pretty")
        );
        assert_eq!(
            render_json(&value, JsonLayout::Compact, false),
            serde_json::to_string(&value).expect("compact")
        );
    }

    #[test]
    fn colored_rendering_wraps_each_token() {
        let value = json!({"table": "t.csv", "width": 2, "truncated": true});
        let colored = render_json(&value, JsonLayout::Pretty, true);
        assert!(colored.contains("\u{1b}[36m\"table\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[32m\"t.csv\"\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[33m2\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[35mtrue\u{1b}[0m"));
    }

    #[test]
    fn compact_colored_row_stays_on_one_line() {
        let row = json!(["名字", "x,y"]);
        let colored = render_json(&row, JsonLayout::Compact, true);
        assert!(!colored.contains('\n'));
        assert!(colored.contains("\u{1b}[32m\"x,y\"\u{1b}[0m"));
    }
}
