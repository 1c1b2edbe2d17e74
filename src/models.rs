use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct FormDefinition {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) fields: Vec<FieldDefinition>,
}

impl FormDefinition {
    pub(crate) fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() && title != self.name => {
                format!("{title} ({})", self.name)
            }
            _ => self.name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct FieldDefinition {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) label: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

impl FieldDefinition {
    /// Label and description as shown under the field list.
    pub(crate) fn caption(&self) -> String {
        let label = self
            .label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(self.name.as_str());
        match self.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => format!("{label}: {description}"),
            _ => label.to_string(),
        }
    }
}

/// Selection state of one form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    Included {
        name: String,
        on_frontmatter: bool,
        on_body: bool,
    },
    Omitted {
        name: String,
    },
}

impl Field {
    pub(crate) fn new(name: &str) -> Self {
        Field::Included {
            name: name.to_string(),
            on_frontmatter: false,
            on_body: false,
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Field::Included { name, .. } | Field::Omitted { name } => name,
        }
    }

    pub(crate) fn is_omitted(&self) -> bool {
        matches!(self, Field::Omitted { .. })
    }

    pub(crate) fn on_frontmatter(&self) -> bool {
        matches!(
            self,
            Field::Included {
                on_frontmatter: true,
                ..
            }
        )
    }

    pub(crate) fn on_body(&self) -> bool {
        matches!(self, Field::Included { on_body: true, .. })
    }

    /// Merges `patch` into a fresh record. Leaving the omitted variant resets
    /// both flags before the patch's own flags apply.
    pub(crate) fn patched(&self, patch: &FieldPatch) -> Field {
        let omit = patch.omit.unwrap_or(self.is_omitted());
        if omit {
            return Field::Omitted {
                name: self.name().to_string(),
            };
        }
        let (on_frontmatter, on_body) = match self {
            Field::Included {
                on_frontmatter,
                on_body,
                ..
            } => (*on_frontmatter, *on_body),
            Field::Omitted { .. } => (false, false),
        };
        Field::Included {
            name: self.name().to_string(),
            on_frontmatter: patch.on_frontmatter.unwrap_or(on_frontmatter),
            on_body: patch.on_body.unwrap_or(on_body),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FieldPatch {
    pub(crate) omit: Option<bool>,
    pub(crate) on_frontmatter: Option<bool>,
    pub(crate) on_body: Option<bool>,
}

impl FieldPatch {
    pub(crate) fn omit(value: bool) -> Self {
        Self {
            omit: Some(value),
            ..Self::default()
        }
    }

    pub(crate) fn frontmatter(value: bool) -> Self {
        Self {
            on_frontmatter: Some(value),
            ..Self::default()
        }
    }

    pub(crate) fn body(value: bool) -> Self {
        Self {
            on_body: Some(value),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Options {
    pub(crate) include_fences: bool,
    /// Call the pre-bound `MF` global instead of resolving the plugin API.
    pub(crate) use_global_handle: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include_fences: true,
            use_global_handle: false,
        }
    }
}
