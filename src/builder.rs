use std::borrow::Cow;

use tracing::debug;

use crate::compiler::compile_template;
use crate::models::{Field, FieldPatch, FormDefinition, Options};
use crate::store::{Derived, Writable, update_first};

/// Field selections and options for one form, plus the template compiled
/// from them.
pub(crate) struct TemplateBuilder {
    form_name: String,
    fields: Writable<Vec<Field>>,
    options: Writable<Options>,
    code: Derived<String>,
}

impl TemplateBuilder {
    pub(crate) fn new(form: &FormDefinition) -> Self {
        Self::with_options(form, Options::default())
    }

    pub(crate) fn with_options(form: &FormDefinition, options: Options) -> Self {
        let fields = Writable::new(
            form.fields
                .iter()
                .map(|field| Field::new(&field.name))
                .collect::<Vec<_>>(),
        );
        let options = Writable::new(options);
        let form_name = form.name.clone();
        let name = form_name.clone();
        let code = Derived::from2(&fields, &options, move |fields, options| {
            compile_template(&name, fields, options)
        });
        Self {
            form_name,
            fields,
            options,
            code,
        }
    }

    pub(crate) fn form_name(&self) -> &str {
        &self.form_name
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        self.fields.get()
    }

    pub(crate) fn options(&self) -> Options {
        self.options.get()
    }

    pub(crate) fn code(&self) -> &Derived<String> {
        &self.code
    }

    /// Unknown names are ignored without notifying subscribers.
    pub(crate) fn set_field(&self, name: &str, patch: FieldPatch) {
        let changed = self.fields.update_if(|fields| {
            match update_first(fields, |field| field.name() == name, |field| field.patched(&patch)) {
                Cow::Owned(next) => Some(next),
                Cow::Borrowed(_) => None,
            }
        });
        if !changed {
            debug!(form = %self.form_name, field = name, "ignoring update for unknown field");
        }
    }

    pub(crate) fn omit_field(&self, name: &str, omit: bool) {
        self.set_field(name, FieldPatch::omit(omit));
    }

    pub(crate) fn toggle_all_frontmatter(&self, value: bool) {
        self.fields.update(|fields| {
            fields
                .iter()
                .map(|field| match field {
                    Field::Omitted { .. } => field.clone(),
                    Field::Included { .. } => field.patched(&FieldPatch::frontmatter(value)),
                })
                .collect()
        });
    }

    pub(crate) fn set_options(&self, options: Options) {
        self.options.set(options);
    }

    pub(crate) fn update_options(&self, f: impl FnOnce(&mut Options)) {
        self.options.update(|options| {
            let mut next = *options;
            f(&mut next);
            next
        });
    }
}
