use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;

use crate::models::{Field, Options};

const FENCE_OPEN: &str = r#"<% "---" %>"#;
const FENCE_CLOSE: &str = r#"<% "---" -%>"#;
const EXEC_OPEN: &str = "<%*";
const EXEC_CLOSE: &str = "-%>";
const BODY_INDENT: &str = "  ";
const OMIT_INDENT: usize = 8;
const PICK_INDENT: usize = 16;

#[derive(Serialize)]
struct OpenFormOptions<'a> {
    omit: &'a [&'a str],
}

/// Builds the Templater snippet for `form_name`. Total over any field list;
/// `on_body` does not affect the output.
pub(crate) fn compile_template(form_name: &str, fields: &[Field], options: &Options) -> String {
    let mut included = Vec::new();
    let mut omitted = Vec::new();
    for field in fields {
        match field {
            Field::Included {
                name,
                on_frontmatter,
                ..
            } => included.push((name.as_str(), *on_frontmatter)),
            Field::Omitted { name } => omitted.push(name.as_str()),
        }
    }

    let open_form = compile_open_form(form_name, &omitted, options.use_global_handle)
        .join(&format!("\n{BODY_INDENT}"));
    let fence = |line: &'static str| if options.include_fences { line } else { "" };

    [
        fence(FENCE_OPEN).to_string(),
        EXEC_OPEN.to_string(),
        format!("{BODY_INDENT}{open_form}"),
        format!("{BODY_INDENT}{}", compile_frontmatter(&included)),
        EXEC_CLOSE.to_string(),
        fence(FENCE_CLOSE).to_string(),
    ]
    .join("\n")
}

fn compile_open_form(form_name: &str, omitted: &[&str], use_global_handle: bool) -> Vec<String> {
    let mut args = to_json(&form_name, None);
    if !omitted.is_empty() {
        args.push_str(", ");
        args.push_str(&to_json(&OpenFormOptions { omit: omitted }, Some(OMIT_INDENT)));
    }
    if use_global_handle {
        return vec![format!("const result = await MF.openForm({args});")];
    }
    vec![
        "const modalForm = app.plugins.plugins.modalforms.api;".to_string(),
        format!("const result = await modalForm.openForm({args});"),
    ]
}

fn compile_frontmatter(included: &[(&str, bool)]) -> String {
    let picked: Vec<&str> = included
        .iter()
        .filter(|(_, on_frontmatter)| *on_frontmatter)
        .map(|(name, _)| *name)
        .collect();
    if picked.is_empty() {
        return String::new();
    }
    if picked.len() == included.len() {
        return "tR += result.asFrontmatterString();".to_string();
    }
    format!(
        "tR += result.asFrontmatterString({{ pick: {} \t}});",
        to_json(&picked, Some(PICK_INDENT))
    )
}

/// Compact JSON, or pretty JSON with `indent` spaces per level.
fn to_json<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> String {
    let mut buf = Vec::new();
    let written = match indent {
        Some(width) => {
            let indent = " ".repeat(width);
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            value.serialize(&mut Serializer::with_formatter(&mut buf, formatter))
        }
        None => value.serialize(&mut Serializer::new(&mut buf)),
    };
    if written.is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn included(name: &str, on_frontmatter: bool) -> Field {
        Field::Included {
            name: name.to_string(),
            on_frontmatter,
            on_body: false,
        }
    }

    fn omitted(name: &str) -> Field {
        Field::Omitted {
            name: name.to_string(),
        }
    }

    #[test]
    fn all_frontmatter_uses_whole_result() {
        let fields = [included("title", true), included("amount", true)];
        let code = compile_template("Invoice", &fields, &Options::default());
        assert_eq!(
            code,
            concat!(
                "<% \"---\" %>\n",
                "<%*\n",
                "  const modalForm = app.plugins.plugins.modalforms.api;\n",
                "  const result = await modalForm.openForm(\"Invoice\");\n",
                "  tR += result.asFrontmatterString();\n",
                "-%>\n",
                "<% \"---\" -%>",
            )
        );
    }

    #[test]
    fn partial_frontmatter_uses_pick_list() {
        let fields = [included("title", true), included("amount", false)];
        let code = compile_template("Invoice", &fields, &Options::default());
        assert!(code.contains(
            "  tR += result.asFrontmatterString({ pick: [\n                \"title\"\n] \t});\n"
        ));
    }

    #[test]
    fn omitted_fields_go_to_open_form_options() {
        let fields = [included("title", true), omitted("amount")];
        let code = compile_template("Invoice", &fields, &Options::default());
        assert!(code.contains(concat!(
            "  const result = await modalForm.openForm(\"Invoice\", {\n",
            "        \"omit\": [\n",
            "                \"amount\"\n",
            "        ]\n",
            "});\n",
        )));
        // the only included field is on the frontmatter, so no pick list
        assert!(code.contains("  tR += result.asFrontmatterString();\n"));
    }

    #[test]
    fn omitted_field_never_picked() {
        let fields = [
            included("title", true),
            included("date", false),
            omitted("amount"),
        ];
        let code = compile_template("Invoice", &fields, &Options::default());
        let pick_line = code
            .lines()
            .skip_while(|line| !line.contains("pick"))
            .take_while(|line| !line.contains("});"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(pick_line.contains("\"title\""));
        assert!(!pick_line.contains("amount"));
    }

    #[test]
    fn pick_list_keeps_declared_order() {
        let fields = [
            included("c", true),
            included("a", false),
            included("b", true),
        ];
        let code = compile_template("Order", &fields, &Options::default());
        assert!(code.contains("[\n                \"c\",\n                \"b\"\n]"));
    }

    #[test]
    fn no_frontmatter_leaves_blank_statement() {
        let fields = [included("title", false)];
        let options = Options {
            include_fences: false,
            use_global_handle: false,
        };
        let code = compile_template("Note", &fields, &options);
        assert_eq!(
            code,
            concat!(
                "\n",
                "<%*\n",
                "  const modalForm = app.plugins.plugins.modalforms.api;\n",
                "  const result = await modalForm.openForm(\"Note\");\n",
                "  \n",
                "-%>\n",
            )
        );
    }

    #[test]
    fn global_handle_is_single_line() {
        let fields = [included("title", true)];
        let options = Options {
            include_fences: true,
            use_global_handle: true,
        };
        let code = compile_template("Note", &fields, &options);
        assert!(code.contains("<%*\n  const result = await MF.openForm(\"Note\");\n  tR +="));
        assert!(!code.contains("modalforms"));
    }

    #[test]
    fn all_fields_omitted() {
        let fields = [omitted("a"), omitted("b")];
        let code = compile_template("Empty", &fields, &Options::default());
        assert!(code.contains("\"omit\": [\n                \"a\",\n                \"b\"\n        ]"));
        assert!(code.contains("\n  \n-%>"));
    }

    #[test]
    fn form_name_is_escaped() {
        let code = compile_template("say \"hi\"", &[], &Options::default());
        assert!(code.contains(r#"openForm("say \"hi\"");"#));
    }

    #[test]
    fn form_name_backslash_is_escaped() {
        let code = compile_template("a\\b", &[], &Options::default());
        let line = code.lines().nth(3).unwrap_or_default();
        assert_eq!(line, r#"  const result = await modalForm.openForm("a\\b");"#);
    }

    #[test]
    fn compiling_is_deterministic() {
        let fields = [included("title", true), omitted("amount"), included("x", false)];
        let options = Options::default();
        assert_eq!(
            compile_template("Invoice", &fields, &options),
            compile_template("Invoice", &fields, &options)
        );
    }
}
