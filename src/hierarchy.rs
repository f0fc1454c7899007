//! Radio group reconstruction
//!
//! PDFs rarely say reliably which buttons belong together, so membership is
//! inferred from names, unless the reader already split a radio field into its
//! options. Button-like fields sharing a base name become siblings;
//! siblings are attached to an existing `base--group` field when the form has
//! one, otherwise a container is synthesized for two or more of them.
//! Fields using `__` are linked to the field named before the `__`.

use crate::field::{Field, FieldId, FieldType, GROUP_SUFFIX};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Separator marking a field nested under another field
pub const NESTED_SEPARATOR: &str = "__";

/// Nesting level recorded on `__` fields (group, option, nested field)
pub const NESTED_LEVEL: u8 = 2;

static DIGIT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)[-_. ]*\d+$").unwrap());

/// Common prefix shared by sibling choices
///
/// `dividend_accumulate` and `dividend_reduce` share `dividend`; `option1` and
/// `option2` share `option`. A name with neither pattern is its own base, which
/// groups radio kids that carry the same field name.
pub fn base_name(name: &str) -> String {
    let stem = name.strip_suffix(GROUP_SUFFIX).unwrap_or(name);

    if let Some((prefix, _)) = stem.split_once('_') {
        if !prefix.is_empty() {
            return prefix.to_string();
        }
    }

    if let Some(caps) = DIGIT_SUFFIX.captures(stem) {
        return caps[1].to_string();
    }

    stem.to_string()
}

fn is_group_candidate(field: &Field) -> bool {
    field.field_type.is_button_like()
        && field.parent_id.is_none()
        && !field.name.contains(NESTED_SEPARATOR)
        && !field.name.ends_with(GROUP_SUFFIX)
}

/// Link radio members to their groups and nested fields to their owners
///
/// Fields are only annotated or appended, never removed or reordered.
/// Synthesized groups take ids after the current maximum.
pub fn build_hierarchy(mut fields: Vec<Field>) -> Vec<Field> {
    let mut next_id = fields.iter().map(|f| f.id).max().unwrap_or(0) + 1;

    link_declared_options(&mut fields);

    // Grouping pass: candidates by base name, in first-appearance order
    let mut candidates: Vec<(String, Vec<usize>)> = Vec::new();
    for (idx, field) in fields.iter().enumerate() {
        if !is_group_candidate(field) {
            continue;
        }
        let base = base_name(&field.name);
        match candidates.iter_mut().find(|(b, _)| *b == base) {
            Some((_, members)) => members.push(idx),
            None => candidates.push((base, vec![idx])),
        }
    }

    // Materialization pass
    let mut synthesized = 0;
    for (base, members) in candidates {
        let group_name = format!("{}{}", base, GROUP_SUFFIX);
        let existing = fields
            .iter()
            .position(|f| f.is_group() && f.name == group_name);

        let lone_checkbox =
            members.len() == 1 && fields[members[0]].field_type == FieldType::CheckBox;

        match existing {
            Some(group_idx) if !lone_checkbox => link_members(&mut fields, group_idx, &members),
            Some(_) => {}
            None if members.len() >= 2 => {
                let group = synthesize_group(next_id, &group_name, &fields, &members);
                next_id += 1;
                synthesized += 1;
                fields.push(group);
                let group_idx = fields.len() - 1;
                link_members(&mut fields, group_idx, &members);
            }
            None => {
                // Lone radio button: keep the textual reference for the validator
                let field = &mut fields[members[0]];
                if field.field_type == FieldType::RadioButton {
                    log::debug!("No group found for radio button '{}'", field.name);
                    field.parent_name = Some(group_name);
                }
            }
        }
    }

    link_nested(&mut fields);

    log::info!(
        "Hierarchy built: {} radio groups ({} synthesized)",
        fields.iter().filter(|f| f.is_group()).count(),
        synthesized
    );
    fields
}

/// Attach options to the radio field they were read from
fn link_declared_options(fields: &mut [Field]) {
    for idx in 0..fields.len() {
        let field = &fields[idx];
        if field.parent_id.is_some() || !field.field_type.is_button_like() {
            continue;
        }
        let Some(parent) = field.parent_name.as_deref() else {
            continue;
        };
        let group = fields.iter().position(|f| f.is_group() && f.name == parent);
        if let Some(group_idx) = group {
            link_members(fields, group_idx, &[idx]);
        }
    }
}

fn link_members(fields: &mut [Field], group_idx: usize, members: &[usize]) {
    let group_id = fields[group_idx].id;
    let group_name = fields[group_idx].name.clone();

    let mut child_ids = Vec::with_capacity(members.len());
    for &idx in members {
        let member = &mut fields[idx];
        if member.field_type == FieldType::CheckBox {
            member.field_type = FieldType::RadioButton;
        }
        member.parent_id = Some(group_id);
        member.parent_name = Some(group_name.clone());
        member.nesting_level = 1;
        child_ids.push(member.id);
    }

    let group = &mut fields[group_idx];
    for id in child_ids {
        if !group.children.contains(&id) {
            group.children.push(id);
        }
    }
}

/// New container placed over its members on the first member's page
fn synthesize_group(id: FieldId, name: &str, fields: &[Field], members: &[usize]) -> Field {
    let mut group = Field::new(id, name, FieldType::RadioGroup);
    group.synthesized = true;

    let Some(&first) = members.first() else {
        return group;
    };
    let page = fields[first].page;
    group.page = page;

    let mut bounds: Option<[f32; 4]> = None;
    for member in members.iter().map(|&i| &fields[i]) {
        if !member.has_coordinates || member.page != page {
            continue;
        }
        let rect = [member.x, member.y, member.x + member.width, member.y + member.height];
        bounds = Some(match bounds {
            None => rect,
            Some(b) => [b[0].min(rect[0]), b[1].min(rect[1]), b[2].max(rect[2]), b[3].max(rect[3])],
        });
    }
    if let Some(rect) = bounds {
        group = group.with_rect(page, rect);
    }

    log::debug!("Synthesized '{}' for {} members", name, members.len());
    group
}

/// Point `owner__part` fields at the field named `owner`, without retyping them
fn link_nested(fields: &mut [Field]) {
    let mut by_name: HashMap<String, FieldId> = HashMap::new();
    for field in fields.iter() {
        by_name.entry(field.name.clone()).or_insert(field.id);
    }

    for field in fields.iter_mut() {
        if field.is_group() {
            continue;
        }
        let Some((owner, _)) = field.name.split_once(NESTED_SEPARATOR) else {
            continue;
        };
        if owner.is_empty() {
            continue;
        }
        field.parent_id = by_name.get(owner).copied();
        field.parent_name = Some(owner.to_string());
        field.nesting_level = NESTED_LEVEL;
    }
}
