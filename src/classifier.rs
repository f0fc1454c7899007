//! Field classification from raw widget records
//!
//! Turns a [`RawWidget`] into a [`Field`] with its type and decoded `/Ff`
//! flag names. The `--group` naming convention wins over any PDF metadata;
//! after that, button bit flags decide between radio, pushbutton and checkbox.
//! A button field the reader split into options is itself a radio group.

use crate::field::{Field, FieldId, FieldType, GROUP_SUFFIX};
use crate::reader::RawWidget;
use std::collections::HashMap;

// Field flag bits shared by all field kinds
pub const FF_READ_ONLY: u32 = 1 << 0;
pub const FF_REQUIRED: u32 = 1 << 1;
pub const FF_NO_EXPORT: u32 = 1 << 2;

// Button fields
pub const FF_NO_TOGGLE_TO_OFF: u32 = 1 << 14;
pub const FF_RADIO: u32 = 1 << 15;
pub const FF_PUSHBUTTON: u32 = 1 << 16;
pub const FF_RADIOS_IN_UNISON: u32 = 1 << 25;

// Text fields
pub const FF_MULTILINE: u32 = 1 << 12;
pub const FF_PASSWORD: u32 = 1 << 13;
pub const FF_FILE_SELECT: u32 = 1 << 20;
pub const FF_DO_NOT_SPELL_CHECK: u32 = 1 << 22;
pub const FF_DO_NOT_SCROLL: u32 = 1 << 23;
pub const FF_COMB: u32 = 1 << 24;
pub const FF_RICH_TEXT: u32 = 1 << 25;

// Choice fields
pub const FF_COMBO: u32 = 1 << 17;
pub const FF_EDIT: u32 = 1 << 18;
pub const FF_SORT: u32 = 1 << 19;
pub const FF_MULTI_SELECT: u32 = 1 << 21;
pub const FF_COMMIT_ON_SEL_CHANGE: u32 = 1 << 26;

const COMMON_FLAGS: &[(u32, &str)] = &[
    (FF_READ_ONLY, "ReadOnly"),
    (FF_REQUIRED, "Required"),
    (FF_NO_EXPORT, "NoExport"),
];

const BUTTON_FLAGS: &[(u32, &str)] = &[
    (FF_NO_TOGGLE_TO_OFF, "NoToggleToOff"),
    (FF_RADIO, "Radio"),
    (FF_PUSHBUTTON, "Pushbutton"),
    (FF_RADIOS_IN_UNISON, "RadiosInUnison"),
];

const TEXT_FLAGS: &[(u32, &str)] = &[
    (FF_MULTILINE, "Multiline"),
    (FF_PASSWORD, "Password"),
    (FF_FILE_SELECT, "FileSelect"),
    (FF_DO_NOT_SPELL_CHECK, "DoNotSpellCheck"),
    (FF_DO_NOT_SCROLL, "DoNotScroll"),
    (FF_COMB, "Comb"),
    (FF_RICH_TEXT, "RichText"),
];

const CHOICE_FLAGS: &[(u32, &str)] = &[
    (FF_COMBO, "Combo"),
    (FF_EDIT, "Edit"),
    (FF_SORT, "Sort"),
    (FF_MULTI_SELECT, "MultiSelect"),
    (FF_DO_NOT_SPELL_CHECK, "DoNotSpellCheck"),
    (FF_COMMIT_ON_SEL_CHANGE, "CommitOnSelChange"),
];

/// Decode `/Ff` bits into flag names
///
/// Bits above the shared three mean different things per field kind, so the
/// `/FT` tag selects the table. Unknown kinds only get the shared flags.
pub fn decode_flags(bits: u32, field_type_tag: Option<&str>) -> Vec<String> {
    let specific: &[(u32, &str)] = match field_type_tag {
        Some("Btn") => BUTTON_FLAGS,
        Some("Tx") => TEXT_FLAGS,
        Some("Ch") => CHOICE_FLAGS,
        _ => &[],
    };

    COMMON_FLAGS
        .iter()
        .chain(specific.iter())
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Decide a field type from the widget name, `/FT` tag and `/Ff` bits
pub fn classify_type(name: &str, field_type_tag: Option<&str>, flags: Option<u32>) -> FieldType {
    if name.ends_with(GROUP_SUFFIX) {
        return FieldType::RadioGroup;
    }

    match field_type_tag {
        Some("Btn") => match flags {
            // Simple checkboxes frequently omit /Ff entirely
            None => FieldType::CheckBox,
            Some(bits) if bits & FF_RADIO != 0 => FieldType::RadioButton,
            Some(bits) if bits & FF_PUSHBUTTON != 0 => FieldType::Button,
            Some(_) => FieldType::CheckBox,
        },
        Some("Tx") => FieldType::TextField,
        Some("Sig") => FieldType::Signature,
        Some("Ch") => FieldType::Choice,
        _ => FieldType::TextField,
    }
}

/// Build a catalogue field from one raw widget
///
/// Never fails: anything unrecognised becomes a `TextField`.
pub fn classify(widget: &RawWidget, id: FieldId) -> Field {
    let field_type = if !widget.kids.is_empty() && widget.field_type.as_deref() == Some("Btn") {
        FieldType::RadioGroup
    } else {
        classify_type(&widget.name, widget.field_type.as_deref(), widget.flags)
    };

    let mut field = Field::new(id, widget.name.clone(), field_type);
    if let Some(rect) = widget.rect {
        field = field.with_rect(widget.page.unwrap_or(0), rect);
    } else if let Some(page) = widget.page {
        field.page = page;
    }

    field.value = widget.value.clone();
    field.flag_bits = widget.flags;
    field.flags = widget
        .flags
        .map(|bits| decode_flags(bits, widget.field_type.as_deref()))
        .unwrap_or_default();
    field.tooltip = widget.tooltip.clone().filter(|t| !t.trim().is_empty());

    log::debug!("Classified '{}' as {} (flags {:?})", field.name, field.field_type, field.flags);
    field
}

/// Classify every widget, assigning ids from 1 in reader order
///
/// Options listed in another record's `kids` get that record as `parent_name`.
pub fn classify_all(widgets: &[RawWidget]) -> Vec<Field> {
    let declared: HashMap<&str, &str> = widgets
        .iter()
        .flat_map(|w| w.kids.iter().map(move |kid| (kid.as_str(), w.name.as_str())))
        .collect();

    widgets
        .iter()
        .enumerate()
        .map(|(idx, widget)| {
            let mut field = classify(widget, idx as FieldId + 1);
            if let Some(parent) = declared.get(widget.name.as_str()) {
                field.parent_name = Some(parent.to_string());
            }
            field
        })
        .collect()
}
