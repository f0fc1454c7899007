//! Field catalogue data model
//!
//! A [`Field`] is created once per widget by the classifier, possibly appended
//! by the hierarchy builder (synthesized radio groups), and then annotated in
//! place by every later stage. Fields are never removed from a catalogue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable catalogue-local identifier (1-based, assigned in reader order)
pub type FieldId = u32;

/// Suffix that marks a radio group container name
pub const GROUP_SUFFIX: &str = "--group";

/// Field type taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldType {
    TextField,
    CheckBox,
    RadioButton,
    RadioGroup,
    Signature,
    Choice,
    /// Pushbutton (`/Btn` with the pushbutton flag)
    Button,
    Unknown,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::TextField => "TextField",
            FieldType::CheckBox => "CheckBox",
            FieldType::RadioButton => "RadioButton",
            FieldType::RadioGroup => "RadioGroup",
            FieldType::Signature => "Signature",
            FieldType::Choice => "Choice",
            FieldType::Button => "Button",
            FieldType::Unknown => "Unknown",
        }
    }

    /// Types the hierarchy builder considers as radio-group members
    pub fn is_button_like(&self) -> bool {
        matches!(self, FieldType::CheckBox | FieldType::RadioButton)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text found around a field, used as naming context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    #[serde(default)]
    pub above: String,
    #[serde(default)]
    pub below: String,
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub right: String,
    #[serde(default)]
    pub surrounding: String,
    #[serde(default)]
    pub section_header: String,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.above.is_empty()
            && self.below.is_empty()
            && self.left.is_empty()
            && self.right.is_empty()
            && self.surrounding.is_empty()
            && self.section_header.is_empty()
    }
}

/// One form widget or synthesized container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    /// Random identifier carried into the catalogue CSV
    #[serde(default)]
    pub uuid: String,
    /// Widget name as found in the PDF (fully qualified)
    pub name: String,
    /// Resolved type (after hierarchy building)
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Type as first decided by the classifier
    pub raw_type: FieldType,
    #[serde(default)]
    pub value: Option<String>,
    /// Page number (1-indexed), 0 when unknown
    #[serde(default)]
    pub page: u32,
    /// Left edge (PDF coordinates, origin at bottom-left)
    #[serde(default)]
    pub x: f32,
    /// Bottom edge
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub has_coordinates: bool,
    /// Raw `/Ff` value, `None` when the key is absent
    #[serde(default)]
    pub flag_bits: Option<u32>,
    /// Decoded flag names
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<FieldId>,
    /// Textual parent reference, kept even when it resolves to nothing
    #[serde(default)]
    pub parent_name: Option<String>,
    /// Member ids, only populated on radio groups
    #[serde(default)]
    pub children: Vec<FieldId>,
    #[serde(default)]
    pub nesting_level: u8,
    /// Created by the hierarchy builder rather than read from the PDF
    #[serde(default)]
    pub synthesized: bool,
    /// Tooltip from the PDF (`/TU`)
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub context: ContextBlock,
    #[serde(default)]
    pub bem_category: String,
    #[serde(default)]
    pub suggested_name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Field {
    /// Create an unannotated field with no placement
    pub fn new(id: FieldId, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id,
            uuid: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            field_type,
            raw_type: field_type,
            value: None,
            page: 0,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            has_coordinates: false,
            flag_bits: None,
            flags: Vec::new(),
            parent_id: None,
            parent_name: None,
            children: Vec::new(),
            nesting_level: 0,
            synthesized: false,
            tooltip: None,
            label: String::new(),
            context: ContextBlock::default(),
            bem_category: String::new(),
            suggested_name: None,
            confidence: None,
            reasoning: None,
        }
    }

    /// Set placement from a `[x0, y0, x1, y1]` rectangle
    pub fn with_rect(mut self, page: u32, rect: [f32; 4]) -> Self {
        let (x0, x1) = (rect[0].min(rect[2]), rect[0].max(rect[2]));
        let (y0, y1) = (rect[1].min(rect[3]), rect[1].max(rect[3]));
        self.page = page;
        self.x = x0;
        self.y = y0;
        self.width = x1 - x0;
        self.height = y1 - y0;
        self.has_coordinates = true;
        self
    }

    pub fn is_group(&self) -> bool {
        self.field_type == FieldType::RadioGroup
    }

    /// Name without the radio group suffix
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(GROUP_SUFFIX).unwrap_or(&self.name)
    }
}

/// The output of extraction: every field of one PDF
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldCatalogue {
    pub fields: Vec<Field>,
    pub page_count: u32,
}

impl FieldCatalogue {
    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Count of fields per resolved type, keyed by type name
    pub fn type_distribution(&self) -> BTreeMap<String, usize> {
        type_distribution(self.fields.iter().map(|f| f.field_type))
    }

    pub fn radio_groups(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_group())
    }
}

/// Count occurrences of each type, keyed by type name
pub fn type_distribution(types: impl Iterator<Item = FieldType>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for t in types {
        *counts.entry(t.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}
