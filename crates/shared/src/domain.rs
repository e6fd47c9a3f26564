use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FormError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormVariant {
    /// Four fields, `safety_features` entered as a comma-separated list.
    #[default]
    Basic,
    /// Eight flat text fields.
    Extended,
}

impl FormVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Extended => "extended",
        }
    }
}

impl fmt::Display for FormVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormVariant {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "extended" => Ok(Self::Extended),
            other => Err(FormError::UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    /// Entered as one comma-separated string, submitted as a list.
    MultiValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// `safety_features` -> `safety features`
    #[default]
    Plain,
    /// `safety_features` -> `Safety Features`
    Capitalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(
    name: &'static str,
    label: &'static str,
    placeholder: &'static str,
    kind: FieldKind,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        placeholder,
        kind,
        required: true,
    }
}

const BASIC_FIELDS: &[FieldSpec] = &[
    field(
        "device_name",
        "Device Name",
        "e.g., GlucoTrack X1",
        FieldKind::Text,
    ),
    field(
        "device_category",
        "Device Category",
        "e.g., Blood Glucose Monitoring",
        FieldKind::Text,
    ),
    field(
        "safety_features",
        "Safety Features",
        "Enter features separated by commas, e.g., Auto-shutdown, Data encryption",
        FieldKind::MultiValue,
    ),
    field(
        "intended_use",
        "Intended Use",
        "Describe the intended use of the device...",
        FieldKind::TextArea,
    ),
];

const EXTENDED_FIELDS: &[FieldSpec] = &[
    field(
        "device_name",
        "Device Name",
        "e.g., GlucoTrack X1",
        FieldKind::Text,
    ),
    field(
        "manufacturer",
        "Manufacturer",
        "e.g., Acme Medical Inc.",
        FieldKind::Text,
    ),
    field("model_number", "Model Number", "e.g., GT-X1-2024", FieldKind::Text),
    field(
        "classification",
        "Classification",
        "e.g., Class II",
        FieldKind::Text,
    ),
    field(
        "intended_use",
        "Intended Use",
        "Describe the intended use of the device...",
        FieldKind::TextArea,
    ),
    field(
        "indications_for_use",
        "Indications for Use",
        "Describe the conditions the device diagnoses or treats...",
        FieldKind::TextArea,
    ),
    field(
        "target_population",
        "Target Population",
        "e.g., Adults with type 2 diabetes",
        FieldKind::Text,
    ),
    field("risk_class", "Risk Class", "e.g., Moderate", FieldKind::Text),
];

/// Static description of one form variant: its fields and the behaviours that
/// differ between variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSchema {
    pub variant: FormVariant,
    pub fields: &'static [FieldSpec],
    pub allows_clear: bool,
    pub reveal_on_success: bool,
    pub label_style: LabelStyle,
}

static BASIC_SCHEMA: FormSchema = FormSchema {
    variant: FormVariant::Basic,
    fields: BASIC_FIELDS,
    allows_clear: true,
    reveal_on_success: true,
    label_style: LabelStyle::Plain,
};

static EXTENDED_SCHEMA: FormSchema = FormSchema {
    variant: FormVariant::Extended,
    fields: EXTENDED_FIELDS,
    allows_clear: false,
    reveal_on_success: false,
    label_style: LabelStyle::Capitalized,
};

impl FormSchema {
    pub fn for_variant(variant: FormVariant) -> &'static FormSchema {
        match variant {
            FormVariant::Basic => &BASIC_SCHEMA,
            FormVariant::Extended => &EXTENDED_SCHEMA,
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|spec| spec.name == name)
    }
}
