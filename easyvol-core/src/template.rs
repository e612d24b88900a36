//! Print template engine
//!
//! Renders the HTML stored in a print template against a JSON data context:
//!
//! - `{{name}}` / `{{path.to.field}}` - HTML-escaped substitution, unknown
//!   placeholders render empty
//! - `{{#each items}} ... {{/each}}` - loop over an array; inside the body
//!   fields resolve against the element and `{{@index}}` is 1-based
//! - `{{#if field}} ... {{else}} ... {{/if}}` - truthiness conditional
//!
//! Blocks do not nest within blocks of the same kind; sequential blocks are
//! fine. Unclosed tags pass through verbatim.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static EACH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{#each\s+([\w.]+)\}\}(.*?)\{\{/each\}\}").expect("invalid each regex")
});

static IF_ELSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{#if\s+([\w.]+)\}\}(.*?)\{\{else\}\}(.*?)\{\{/if\}\}")
        .expect("invalid if/else regex")
});

static IF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{#if\s+([\w.]+)\}\}(.*?)\{\{/if\}\}").expect("invalid if regex")
});

static VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(@?[\w.]+)\}\}").expect("invalid var regex"));

/// Render a template against a JSON object context.
pub fn render(template: &str, data: &Value) -> String {
    let output = expand_loops(template, data);
    let output = process_conditionals(&output, data);
    substitute(&output, data, true)
}

/// Expand `{{#each}}` blocks. Each element becomes the local context for
/// its body: conditionals and placeholders inside the body resolve against
/// the element first; anything left over is resolved (or blanked) by the
/// final top-level pass.
fn expand_loops(template: &str, data: &Value) -> String {
    EACH_RE
        .replace_all(template, |caps: &Captures| {
            let path = &caps[1];
            let body = &caps[2];

            let Some(Value::Array(items)) = lookup(data, path) else {
                return String::new();
            };

            let mut out = String::new();
            for (index, item) in items.iter().enumerate() {
                let mut rendered = body.replace("{{@index}}", &(index + 1).to_string());
                rendered = process_conditionals(&rendered, item);
                rendered = substitute(&rendered, item, false);
                out.push_str(&rendered);
            }
            out
        })
        .into_owned()
}

/// Resolve `{{#if}}/{{else}}/{{/if}}` blocks against a context.
fn process_conditionals(template: &str, ctx: &Value) -> String {
    let with_else = IF_ELSE_RE.replace_all(template, |caps: &Captures| {
        if is_truthy(lookup(ctx, &caps[1])) {
            caps[2].to_string()
        } else {
            caps[3].to_string()
        }
    });

    IF_RE
        .replace_all(&with_else, |caps: &Captures| {
            if is_truthy(lookup(ctx, &caps[1])) {
                caps[2].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Substitute `{{name}}` placeholders. When `blank_unknown` is set (the
/// final pass), unresolved placeholders render as empty string; inside loop
/// bodies they are left for the outer context.
fn substitute(template: &str, ctx: &Value, blank_unknown: bool) -> String {
    VAR_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            if name == "else" {
                return caps[0].to_string();
            }
            let resolved = if name == "this" {
                Some(ctx)
            } else {
                lookup(ctx, name)
            };
            match resolved {
                Some(value) => escape_html(&value_to_string(value)),
                None if blank_unknown => String::new(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Walk a dotted path through objects (and arrays by numeric index).
fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = ctx;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Truthiness for conditionals: absent, null, false, zero,
/// empty string, `"0"`, and empty arrays are all falsy.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Non-scalar placeholders render empty
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Escape text for inclusion in HTML attribute or element content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_simple_placeholders() {
        let data = json!({"first_name": "Anna", "last_name": "Bianchi"});
        assert_eq!(
            render("<p>{{first_name}} {{last_name}}</p>", &data),
            "<p>Anna Bianchi</p>"
        );
    }

    #[test]
    fn unknown_placeholders_render_empty() {
        let data = json!({"name": "x"});
        assert_eq!(render("[{{missing}}]", &data), "[]");
    }

    #[test]
    fn escapes_html_in_values() {
        let data = json!({"note": "<b>\"ciao\" & 'via'</b>"});
        assert_eq!(
            render("{{note}}", &data),
            "&lt;b&gt;&quot;ciao&quot; &amp; &#039;via&#039;&lt;/b&gt;"
        );
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let data = json!({"association": {"name": "Croce Verde", "city": "Torino"}});
        assert_eq!(
            render("{{association.name}} - {{association.city}}", &data),
            "Croce Verde - Torino"
        );
    }

    #[test]
    fn each_iterates_with_index() {
        let data = json!({
            "members": [
                {"name": "Anna"},
                {"name": "Bruno"}
            ]
        });
        let template = "{{#each members}}<tr><td>{{@index}}</td><td>{{name}}</td></tr>{{/each}}";
        assert_eq!(
            render(template, &data),
            "<tr><td>1</td><td>Anna</td></tr><tr><td>2</td><td>Bruno</td></tr>"
        );
    }

    #[test]
    fn each_over_missing_array_renders_empty() {
        let data = json!({});
        assert_eq!(render("a{{#each rows}}X{{/each}}b", &data), "ab");
    }

    #[test]
    fn each_body_falls_back_to_outer_context() {
        let data = json!({
            "title": "Elenco",
            "rows": [{"v": "1"}, {"v": "2"}]
        });
        assert_eq!(
            render("{{#each rows}}{{title}}:{{v}};{{/each}}", &data),
            "Elenco:1;Elenco:2;"
        );
    }

    #[test]
    fn if_includes_body_when_truthy() {
        let data = json!({"phone": "333123"});
        assert_eq!(render("{{#if phone}}tel: {{phone}}{{/if}}", &data), "tel: 333123");
    }

    #[test]
    fn if_skips_body_for_falsy_values() {
        for falsy in [json!({"f": ""}), json!({"f": "0"}), json!({"f": null}), json!({"f": false}), json!({"f": 0}), json!({})] {
            assert_eq!(render("x{{#if f}}Y{{/if}}z", &falsy), "xz", "value: {falsy}");
        }
    }

    #[test]
    fn if_else_picks_branch() {
        let template = "{{#if active}}attivo{{else}}dimesso{{/if}}";
        assert_eq!(render(template, &json!({"active": true})), "attivo");
        assert_eq!(render(template, &json!({"active": false})), "dimesso");
    }

    #[test]
    fn conditionals_inside_loops_use_element_context() {
        let data = json!({
            "rows": [
                {"name": "A", "email": "a@x.it"},
                {"name": "B", "email": ""}
            ]
        });
        let template = "{{#each rows}}{{name}}{{#if email}}<{{email}}>{{/if}};{{/each}}";
        assert_eq!(render(template, &data), "A<a@x.it>;B;");
    }

    #[test]
    fn scalar_loop_elements_via_this() {
        let data = json!({"tags": ["alfa", "beta"]});
        assert_eq!(render("{{#each tags}}[{{this}}]{{/each}}", &data), "[alfa][beta]");
    }

    #[test]
    fn unclosed_tags_pass_through() {
        let data = json!({"name": "x"});
        assert_eq!(render("{{#if name}}no close", &data), "{{#if name}}no close");
    }

    #[test]
    fn numbers_render_plainly() {
        let data = json!({"quantity": 12, "ratio": 1.5});
        assert_eq!(render("{{quantity}}/{{ratio}}", &data), "12/1.5");
    }
}
