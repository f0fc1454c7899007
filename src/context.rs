//! Naming context around each field
//!
//! Text printed near a widget is the best evidence of what it captures. Each
//! field's box is grown by a radius into six regions (the full surrounding box,
//! four half-bands and a wider band above for section headers); every region is
//! clamped to the page and its text cropped, whitespace-normalised and truncated.
//! This module also derives display labels and the `bem_category` of each field.

use crate::field::{ContextBlock, Field};
use crate::reader::FormSource;
use crate::text::Rect;
use crate::vocabulary::{first_match, NamingVocabulary};
use serde::{Deserialize, Serialize};

/// Context extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// How far (in points) regions extend beyond the field box
    pub radius: f32,
    /// Maximum characters kept per region
    pub max_chars: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            radius: 50.0,
            max_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRegion {
    Surrounding,
    Above,
    Below,
    Left,
    Right,
    SectionHeader,
}

impl ContextRegion {
    pub const ALL: [ContextRegion; 6] = [
        ContextRegion::Surrounding,
        ContextRegion::Above,
        ContextRegion::Below,
        ContextRegion::Left,
        ContextRegion::Right,
        ContextRegion::SectionHeader,
    ];

    /// Unclamped crop rectangle for a field box
    pub fn rect(&self, field: &Field, radius: f32) -> Rect {
        let (x, y, w, h, r) = (field.x, field.y, field.width, field.height, radius);
        match self {
            ContextRegion::Surrounding => Rect::new(x - r, y - r, x + w + r, y + h + r),
            ContextRegion::Above => Rect::new(x - r, y + h, x + w + r, y + h + r),
            ContextRegion::Below => Rect::new(x - r, y - r, x + w + r, y),
            ContextRegion::Left => Rect::new(x - r, y, x, y + h),
            ContextRegion::Right => Rect::new(x + w, y, x + w + r, y + h),
            ContextRegion::SectionHeader => Rect::new(x - 2.0 * r, y + h, x + w + 2.0 * r, y + h + 2.0 * r),
        }
    }

    fn slot<'a>(&self, block: &'a mut ContextBlock) -> &'a mut String {
        match self {
            ContextRegion::Surrounding => &mut block.surrounding,
            ContextRegion::Above => &mut block.above,
            ContextRegion::Below => &mut block.below,
            ContextRegion::Left => &mut block.left,
            ContextRegion::Right => &mut block.right,
            ContextRegion::SectionHeader => &mut block.section_header,
        }
    }
}

/// Collapse whitespace runs (newlines included) and cap the length
pub fn clean_text(raw: &str, max_chars: usize) -> String {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.chars().count() <= max_chars {
        return joined;
    }
    joined.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Text around one field
///
/// Fields without coordinates get an empty block. A region that clamps to
/// nothing, or whose crop fails, contributes an empty string.
pub fn extract_context<S: FormSource + ?Sized>(
    field: &Field,
    source: &S,
    options: &ContextOptions,
) -> ContextBlock {
    let mut block = ContextBlock::default();
    if !field.has_coordinates || field.page == 0 {
        return block;
    }

    let bounds = source.page_bounds(field.page).unwrap_or_else(Rect::letter);
    for region in ContextRegion::ALL {
        let Some(rect) = region.rect(field, options.radius).clamp_to(&bounds) else {
            continue;
        };
        match source.crop_page_text(field.page, &rect) {
            Ok(text) => *region.slot(&mut block) = clean_text(&text, options.max_chars),
            Err(e) => log::debug!("Crop {:?} failed for '{}': {}", region, field.name, e),
        }
    }
    block
}

/// Title-case the words of a name (`address-change` => `Address Change`)
pub fn humanize(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Display label: tooltip when present, otherwise derived from the name
pub fn derive_label(field: &Field, vocab: &NamingVocabulary) -> String {
    if let Some(tooltip) = field.tooltip.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return tooltip.to_string();
    }

    if field.is_group() {
        let stem = field.stem();
        return match vocab.group_labels.get(stem) {
            Some(label) => label.clone(),
            None => humanize(stem),
        };
    }

    let last = field.name.rsplit('_').find(|s| !s.is_empty()).unwrap_or(&field.name);
    humanize(last)
}

/// Section a field belongs to, from its name words and label
pub fn infer_bem_category(field: &Field, vocab: &NamingVocabulary) -> String {
    let words = field.name.replace(['_', '-', '.'], " ");
    let text = format!("{} {}", words, field.label);
    first_match(&vocab.block_rules, &text)
        .unwrap_or(&vocab.default_block)
        .to_string()
}

/// Fill `label` and `bem_category` on every field
pub fn label_fields(fields: &mut [Field], vocab: &NamingVocabulary) {
    for field in fields.iter_mut() {
        field.label = derive_label(field, vocab);
        field.bem_category = infer_bem_category(field, vocab);
    }
}

/// Context, label and category for every field
pub fn enrich_fields<S: FormSource + ?Sized>(
    fields: &mut [Field],
    source: &S,
    options: &ContextOptions,
    vocab: &NamingVocabulary,
) {
    let mut with_context = 0;
    for field in fields.iter_mut() {
        field.context = extract_context(field, source, options);
        if !field.context.is_empty() {
            with_context += 1;
        }
    }
    label_fields(fields, vocab);
    log::info!("Context extracted for {} of {} fields", with_context, fields.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::reader::{RawAnnotation, RawWidget};
    use crate::text::{text_in_rect, TextItem};
    use crate::FormError;

    struct StaticPage {
        items: Vec<TextItem>,
    }

    impl FormSource for StaticPage {
        fn page_count(&self) -> u32 {
            1
        }

        fn read_form_fields(&self) -> Result<Vec<RawWidget>, FormError> {
            Ok(Vec::new())
        }

        fn read_page_annotations(&self, _page: u32) -> Result<Vec<RawAnnotation>, FormError> {
            Ok(Vec::new())
        }

        fn page_bounds(&self, page: u32) -> Option<Rect> {
            (page == 1).then(Rect::letter)
        }

        fn crop_page_text(&self, page: u32, rect: &Rect) -> Result<String, FormError> {
            if page != 1 {
                return Err(FormError::InvalidInput("no such page".into()));
            }
            Ok(text_in_rect(&self.items, rect))
        }
    }

    fn item(text: &str, x: f32, y: f32) -> TextItem {
        TextItem {
            text: text.into(),
            x,
            y,
            width: 30.0,
            font_size: 10.0,
            page: 1,
        }
    }

    fn page() -> StaticPage {
        StaticPage {
            items: vec![
                item("PRIMARY", 100.0, 790.0),
                item("First", 60.0, 705.0),
                item("Name", 90.0, 705.5),
                item("Above", 150.0, 730.0),
                item("Below", 150.0, 690.0),
                item("Right", 320.0, 705.0),
                item("Far away", 500.0, 100.0),
            ],
        }
    }

    #[test]
    fn test_regions_geometry() {
        let f = Field::new(1, "a", FieldType::TextField).with_rect(1, [100.0, 700.0, 300.0, 720.0]);
        assert_eq!(ContextRegion::Above.rect(&f, 50.0), Rect::new(50.0, 720.0, 350.0, 770.0));
        assert_eq!(ContextRegion::Left.rect(&f, 50.0), Rect::new(50.0, 700.0, 100.0, 720.0));
        assert_eq!(
            ContextRegion::SectionHeader.rect(&f, 50.0),
            Rect::new(0.0, 720.0, 400.0, 820.0)
        );
    }

    #[test]
    fn test_extract_context_regions() {
        let f = Field::new(1, "a", FieldType::TextField).with_rect(1, [100.0, 700.0, 300.0, 720.0]);
        let ctx = extract_context(&f, &page(), &ContextOptions::default());

        assert_eq!(ctx.left, "First Name");
        assert_eq!(ctx.above, "Above");
        assert_eq!(ctx.below, "Below");
        assert_eq!(ctx.right, "Right");
        assert!(ctx.surrounding.contains("Above"));
        assert!(ctx.surrounding.contains("Right"));
        assert!(!ctx.surrounding.contains("Far away"));
        // Section header band is clamped to the page top and reaches y=790
        assert!(ctx.section_header.contains("PRIMARY"));
    }

    #[test]
    fn test_no_coordinates_gives_empty_block() {
        let f = Field::new(1, "a", FieldType::TextField);
        assert!(extract_context(&f, &page(), &ContextOptions::default()).is_empty());
    }

    #[test]
    fn test_crop_failure_is_empty_not_error() {
        let f = Field::new(1, "a", FieldType::TextField).with_rect(9, [100.0, 700.0, 300.0, 720.0]);
        assert!(extract_context(&f, &page(), &ContextOptions::default()).is_empty());
    }

    #[test]
    fn test_region_outside_page_is_empty() {
        // Zero-height field at the very top: "above" clamps to nothing
        let f = Field::new(1, "a", FieldType::TextField).with_rect(1, [100.0, 792.0, 300.0, 792.0]);
        let ctx = extract_context(&f, &page(), &ContextOptions::default());
        assert_eq!(ctx.above, "");
        assert_eq!(ctx.left, "");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\n\n b\tc  ", 200), "a b c");
        assert_eq!(clean_text(&"x".repeat(250), 200).len(), 200);
        assert_eq!(clean_text("abc def", 4), "abc");
    }

    #[test]
    fn test_labels() {
        let vocab = NamingVocabulary::default();
        let label = |name: &str, t: FieldType| derive_label(&Field::new(1, name, t), &vocab);

        assert_eq!(label("first_name", FieldType::TextField), "Name");
        assert_eq!(label("dividend--group", FieldType::RadioGroup), "Future Dividend Application");
        assert_eq!(label("address-change--group", FieldType::RadioGroup), "Address Change Options");
        assert_eq!(label("frequency--group", FieldType::RadioGroup), "Frequency");
        assert_eq!(label("custom--group", FieldType::RadioGroup), "Custom");

        let mut with_tip = Field::new(1, "x", FieldType::TextField);
        with_tip.tooltip = Some(" Owner's SSN ".into());
        assert_eq!(derive_label(&with_tip, &vocab), "Owner's SSN");
    }

    #[test]
    fn test_bem_category() {
        let vocab = NamingVocabulary::default();
        let category = |name: &str, t: FieldType| {
            let mut f = Field::new(1, name, t);
            f.label = derive_label(&f, &vocab);
            infer_bem_category(&f, &vocab)
        };

        assert_eq!(category("first_name", FieldType::TextField), "personal-information");
        assert_eq!(category("address", FieldType::TextField), "personal-information");
        assert_eq!(category("signature", FieldType::Signature), "sign-here");
        assert_eq!(category("test--group", FieldType::RadioGroup), "general-information");
        assert_eq!(category("unknown_field", FieldType::TextField), "general-information");
    }
}
