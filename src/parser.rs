use std::collections::HashSet;

use serde::Deserialize;
use tracing::warn;

use crate::models::FormDefinition;

/// Accepts the Modal Forms settings file or a bare list of forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum FormsFile {
    Settings {
        #[serde(rename = "formDefinitions")]
        form_definitions: Vec<FormDefinition>,
    },
    List(Vec<FormDefinition>),
}

pub(crate) fn parse_forms(content: &str) -> Result<Vec<FormDefinition>, serde_json::Error> {
    let forms = match serde_json::from_str::<FormsFile>(content)? {
        FormsFile::Settings { form_definitions } => form_definitions,
        FormsFile::List(forms) => forms,
    };
    Ok(forms
        .into_iter()
        .filter(|form| !form.name.trim().is_empty())
        .map(dedup_fields)
        .collect())
}

fn dedup_fields(mut form: FormDefinition) -> FormDefinition {
    let mut seen = HashSet::new();
    form.fields.retain(|field| {
        if seen.insert(field.name.clone()) {
            return true;
        }
        warn!(form = %form.name, field = %field.name, "dropping duplicate field");
        false
    });
    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_plugin_settings() {
        let content = r#"{
            "editorPosition": "right",
            "formDefinitions": [
                {
                    "title": "New invoice",
                    "name": "Invoice",
                    "fields": [
                        { "name": "title", "label": "Title", "description": "", "input": { "type": "text" } },
                        { "name": "amount", "input": { "type": "number" } }
                    ]
                }
            ]
        }"#;
        let forms = parse_forms(content).unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].name, "Invoice");
        assert_eq!(forms[0].title.as_deref(), Some("New invoice"));
        let names: Vec<&str> = forms[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title", "amount"]);
        assert_eq!(forms[0].fields[0].label.as_deref(), Some("Title"));
    }

    #[test]
    fn parses_bare_list() {
        let content = r#"[{ "name": "Note", "fields": [{ "name": "topic" }] }, { "name": "Empty" }]"#;
        let forms = parse_forms(content).unwrap();
        assert_eq!(forms.len(), 2);
        assert!(forms[1].fields.is_empty());
    }

    #[test]
    fn drops_duplicate_fields_and_blank_forms() {
        let content = r#"[
            { "name": "Note", "fields": [{ "name": "a" }, { "name": "b" }, { "name": "a" }] },
            { "name": "  " }
        ]"#;
        let forms = parse_forms(content).unwrap();
        assert_eq!(forms.len(), 1);
        let names: Vec<&str> = forms[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_forms("{ not json").is_err());
        assert!(parse_forms(r#"{ "formDefinitions": 3 }"#).is_err());
    }
}
