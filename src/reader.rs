//! Annotation reader: raw widget records from a PDF's AcroForm and pages
//!
//! [`FormSource`] is the seam between the naming pipeline and whatever reads
//! the PDF. [`PdfForm`] implements it on top of lopdf: it walks the AcroForm
//! field tree (inheriting `/FT`, `/Ff` and `/V` from ancestors), resolves each
//! widget's page from the page `/Annots` arrays, and answers text crops from
//! the page content streams.

pub use crate::text::Rect;

use crate::classifier::FF_RADIO;
use crate::field::GROUP_SUFFIX;
use crate::naming::slugify;
use crate::text::{decode_pdf_string, extract_page_text_items, get_number, text_in_rect, TextItem};
use crate::FormError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Guard against malformed or cyclic field trees
const MAX_FIELD_DEPTH: usize = 32;

/// One widget as read from the PDF, before classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawWidget {
    /// Fully qualified field name (`parent.child`)
    pub name: String,
    pub value: Option<String>,
    /// Field type tag without the slash: `Btn`, `Tx`, `Ch`, `Sig`
    pub field_type: Option<String>,
    /// `/Ff` bit flags, `None` when the key is absent everywhere in the chain
    pub flags: Option<u32>,
    /// `[x0, y0, x1, y1]`
    pub rect: Option<[f32; 4]>,
    /// Page number (1-indexed)
    pub page: Option<u32>,
    /// Fully qualified name of the parent field
    pub parent: Option<String>,
    /// Names of the option records emitted after a radio field
    pub kids: Vec<String>,
    /// `/TU` alternate description
    pub tooltip: Option<String>,
}

/// One annotation from a page's `/Annots` array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAnnotation {
    pub subtype: String,
    /// `/T` of the annotation, or of its parent field
    pub name: Option<String>,
    pub field_type: Option<String>,
    pub flags: Option<u32>,
    pub value: Option<String>,
    pub rect: Option<[f32; 4]>,
    pub tooltip: Option<String>,
}

impl RawAnnotation {
    pub fn is_widget(&self) -> bool {
        self.subtype == "Widget"
    }
}

/// Read access to a form PDF
pub trait FormSource {
    fn page_count(&self) -> u32;

    /// All widgets of the form, in field-tree order
    fn read_form_fields(&self) -> Result<Vec<RawWidget>, FormError>;

    /// Annotations placed on one page (1-indexed)
    fn read_page_annotations(&self, page: u32) -> Result<Vec<RawAnnotation>, FormError>;

    /// Page box used to clamp crops
    fn page_bounds(&self, page: u32) -> Option<Rect>;

    /// Raw text printed inside `rect` on `page`
    fn crop_page_text(&self, page: u32, rect: &Rect) -> Result<String, FormError>;
}

/// A loaded PDF form backed by lopdf
pub struct PdfForm {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    text_cache: RefCell<HashMap<u32, Vec<TextItem>>>,
}

impl PdfForm {
    /// Load a form from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FormError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FormError::FileNotFound(path.to_path_buf()));
        }
        let doc = Document::load(path).map_err(map_load_error)?;
        Ok(Self::from_document(doc))
    }

    /// Load a form from a memory buffer
    pub fn load_mem(buffer: &[u8]) -> Result<Self, FormError> {
        if buffer.is_empty() {
            return Err(FormError::InvalidInput("PDF buffer is empty".into()));
        }
        let doc = Document::load_mem(buffer).map_err(map_load_error)?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        Self {
            doc,
            pages,
            text_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The `/Fields` array of the catalog's AcroForm, if any
    fn acroform_fields(&self) -> Option<&Vec<Object>> {
        let root_id = self.doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
        let catalog = self.doc.get_dictionary(root_id).ok()?;
        let acroform = resolve(&self.doc, catalog.get(b"AcroForm").ok()?).as_dict().ok()?;
        let fields = resolve(&self.doc, acroform.get(b"Fields").ok()?).as_array().ok()?;
        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }

    /// Map each annotation object id to the page that lists it
    fn annotation_pages(&self) -> HashMap<ObjectId, u32> {
        let mut index = HashMap::new();
        for (&page_num, &page_id) in &self.pages {
            let Some(annots) = self.page_annots(page_id) else {
                continue;
            };
            for entry in annots {
                if let Object::Reference(id) = entry {
                    index.insert(*id, page_num);
                }
            }
        }
        index
    }

    fn page_annots(&self, page_id: ObjectId) -> Option<&Vec<Object>> {
        let page = self.doc.get_dictionary(page_id).ok()?;
        resolve(&self.doc, page.get(b"Annots").ok()?).as_array().ok()
    }

    /// Fallback when there is no AcroForm: widget annotations straight from pages
    fn widgets_from_pages(&self) -> Result<Vec<RawWidget>, FormError> {
        let mut widgets = Vec::new();
        for &page_num in self.pages.keys() {
            for annot in self.read_page_annotations(page_num)? {
                if !annot.is_widget() {
                    continue;
                }
                let Some(name) = annot.name else {
                    log::warn!("Skipping unnamed widget on page {}", page_num);
                    continue;
                };
                widgets.push(RawWidget {
                    name,
                    value: annot.value,
                    field_type: annot.field_type,
                    flags: annot.flags,
                    rect: annot.rect,
                    page: Some(page_num),
                    parent: None,
                    kids: Vec::new(),
                    tooltip: annot.tooltip,
                });
            }
        }
        Ok(widgets)
    }

    fn page_items(&self, page: u32) -> Result<Vec<TextItem>, FormError> {
        if let Some(items) = self.text_cache.borrow().get(&page) {
            return Ok(items.clone());
        }
        let page_id = *self
            .pages
            .get(&page)
            .ok_or_else(|| FormError::InvalidInput(format!("page {} out of range", page)))?;
        let items = extract_page_text_items(&self.doc, page_id, page)?;
        self.text_cache.borrow_mut().insert(page, items.clone());
        Ok(items)
    }
}

impl FormSource for PdfForm {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn read_form_fields(&self) -> Result<Vec<RawWidget>, FormError> {
        let Some(fields) = self.acroform_fields() else {
            log::info!("No AcroForm fields found, scanning page widgets");
            return self.widgets_from_pages();
        };

        let mut walker = FieldWalker {
            doc: &self.doc,
            annotation_pages: self.annotation_pages(),
            visited: HashSet::new(),
            widgets: Vec::new(),
        };

        for entry in fields {
            let id = match entry {
                Object::Reference(id) => Some(*id),
                _ => None,
            };
            let Ok(dict) = resolve(&self.doc, entry).as_dict() else {
                log::warn!("Skipping non-dictionary AcroForm field entry");
                continue;
            };
            if let Err(e) = walker.walk(id, dict, &Inherited::default(), 0) {
                log::warn!("{}", e);
            }
        }

        log::info!("Read {} widgets from AcroForm", walker.widgets.len());
        Ok(walker.widgets)
    }

    fn read_page_annotations(&self, page: u32) -> Result<Vec<RawAnnotation>, FormError> {
        let page_id = *self
            .pages
            .get(&page)
            .ok_or_else(|| FormError::InvalidInput(format!("page {} out of range", page)))?;
        let Some(annots) = self.page_annots(page_id) else {
            return Ok(Vec::new());
        };

        let mut annotations = Vec::new();
        for entry in annots {
            let Ok(dict) = resolve(&self.doc, entry).as_dict() else {
                continue;
            };
            let subtype = match dict.get(b"Subtype").map(|o| resolve(&self.doc, o)) {
                Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
                _ => continue,
            };
            let parent = dict
                .get(b"Parent")
                .ok()
                .and_then(|p| resolve(&self.doc, p).as_dict().ok());
            let from_self_or_parent = |key: &[u8]| {
                dict.get(key)
                    .ok()
                    .or_else(|| parent.and_then(|p| p.get(key).ok()))
            };

            annotations.push(RawAnnotation {
                subtype,
                name: from_self_or_parent(b"T").and_then(|o| string_value(&self.doc, o)),
                field_type: from_self_or_parent(b"FT").and_then(|o| name_value(&self.doc, o)),
                flags: from_self_or_parent(b"Ff").and_then(|o| flags_value(&self.doc, o)),
                value: from_self_or_parent(b"V").and_then(|o| field_value(&self.doc, o)),
                rect: dict.get(b"Rect").ok().and_then(|o| rect_value(&self.doc, o)),
                tooltip: from_self_or_parent(b"TU").and_then(|o| string_value(&self.doc, o)),
            });
        }
        Ok(annotations)
    }

    fn page_bounds(&self, page: u32) -> Option<Rect> {
        let page_id = *self.pages.get(&page)?;
        let media_box = inherited_attribute(&self.doc, page_id, b"MediaBox")?;
        let [x0, y0, x1, y1] = rect_value(&self.doc, media_box)?;
        Some(Rect::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
    }

    fn crop_page_text(&self, page: u32, rect: &Rect) -> Result<String, FormError> {
        let items = self.page_items(page)?;
        Ok(text_in_rect(&items, rect))
    }
}

/// Values a field inherits from its ancestors
#[derive(Debug, Clone, Default)]
struct Inherited {
    full_name: Option<String>,
    field_type: Option<String>,
    flags: Option<u32>,
    value: Option<String>,
}

struct FieldWalker<'a> {
    doc: &'a Document,
    annotation_pages: HashMap<ObjectId, u32>,
    visited: HashSet<ObjectId>,
    widgets: Vec<RawWidget>,
}

impl<'a> FieldWalker<'a> {
    fn walk(
        &mut self,
        id: Option<ObjectId>,
        dict: &'a Dictionary,
        inherited: &Inherited,
        depth: usize,
    ) -> Result<(), FormError> {
        let label = inherited.full_name.clone().unwrap_or_else(|| "<unnamed>".into());
        if depth > MAX_FIELD_DEPTH {
            return Err(FormError::Extraction {
                name: label,
                reason: "field tree too deep".into(),
            });
        }
        if let Some(id) = id {
            if !self.visited.insert(id) {
                return Err(FormError::Extraction {
                    name: label,
                    reason: format!("cycle at object {} {}", id.0, id.1),
                });
            }
        }

        let partial = dict.get(b"T").ok().and_then(|o| string_value(self.doc, o));
        let full_name = match (&inherited.full_name, partial) {
            (Some(parent), Some(t)) => Some(format!("{}.{}", parent, t)),
            (None, Some(t)) => Some(t),
            (parent, None) => parent.clone(),
        };
        let here = Inherited {
            full_name: full_name.clone(),
            field_type: dict
                .get(b"FT")
                .ok()
                .and_then(|o| name_value(self.doc, o))
                .or_else(|| inherited.field_type.clone()),
            flags: dict
                .get(b"Ff")
                .ok()
                .and_then(|o| flags_value(self.doc, o))
                .or(inherited.flags),
            value: dict
                .get(b"V")
                .ok()
                .and_then(|o| field_value(self.doc, o))
                .or_else(|| inherited.value.clone()),
        };
        let tooltip = dict.get(b"TU").ok().and_then(|o| string_value(self.doc, o));

        let mut child_fields = Vec::new();
        let mut widget_kids = Vec::new();
        if let Some(kids) = dict
            .get(b"Kids")
            .ok()
            .and_then(|k| resolve(self.doc, k).as_array().ok())
        {
            for kid in kids {
                let kid_id = match kid {
                    Object::Reference(id) => Some(*id),
                    _ => None,
                };
                let Ok(kid_dict) = resolve(self.doc, kid).as_dict() else {
                    continue;
                };
                if kid_dict.has(b"T") {
                    child_fields.push((kid_id, kid_dict));
                } else {
                    widget_kids.push((kid_id, kid_dict));
                }
            }
        }

        if !child_fields.is_empty() {
            for (kid_id, kid_dict) in child_fields {
                if let Err(e) = self.walk(kid_id, kid_dict, &here, depth + 1) {
                    log::warn!("{}", e);
                }
            }
            return Ok(());
        }

        let name = full_name.ok_or_else(|| FormError::Extraction {
            name: label,
            reason: "field has no /T name".into(),
        })?;

        match widget_kids.first() {
            None => {
                let widget = self.widget_record(&name, &here, inherited, tooltip, id, dict);
                self.widgets.push(widget);
            }
            Some(_) if is_option_set(&name, &here) => {
                self.push_option_set(&name, &here, inherited, tooltip, &widget_kids);
            }
            Some(&(kid_id, kid_dict)) => {
                // One field shown in several places: the first widget stands for it
                let widget = self.widget_record(&name, &here, inherited, tooltip, kid_id, kid_dict);
                self.widgets.push(widget);
            }
        }
        Ok(())
    }

    fn widget_record(
        &self,
        name: &str,
        field: &Inherited,
        parent: &Inherited,
        tooltip: Option<String>,
        widget_id: Option<ObjectId>,
        widget: &Dictionary,
    ) -> RawWidget {
        let page = widget_id
            .and_then(|id| self.annotation_pages.get(&id).copied())
            .or_else(|| self.page_from_p(widget));

        let value = if field.field_type.as_deref() == Some("Btn") {
            on_state(self.doc, widget).or_else(|| field.value.clone())
        } else {
            field.value.clone()
        };

        log::debug!("Widget '{}' type={:?} flags={:?} page={:?}", name, field.field_type, field.flags, page);

        RawWidget {
            name: name.to_string(),
            value,
            field_type: field.field_type.clone(),
            flags: field.flags,
            rect: widget.get(b"Rect").ok().and_then(|o| rect_value(self.doc, o)),
            page,
            parent: parent.full_name.clone(),
            kids: Vec::new(),
            tooltip,
        }
    }

    /// A radio field: one record for the field, then one per option widget
    ///
    /// Options are named `{base}_{on-state}` so they group under the field.
    fn push_option_set(
        &mut self,
        name: &str,
        field: &Inherited,
        parent: &Inherited,
        tooltip: Option<String>,
        kids: &[(Option<ObjectId>, &Dictionary)],
    ) {
        let base = name.strip_suffix(GROUP_SUFFIX).unwrap_or(name);
        let mut options: Vec<RawWidget> = Vec::with_capacity(kids.len());

        for (idx, &(kid_id, kid_dict)) in kids.iter().enumerate() {
            let state = on_state(self.doc, kid_dict)
                .map(|s| slugify(&s))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| (idx + 1).to_string());
            let mut option_name = format!("{}_{}", base, state);
            if options.iter().any(|o| o.name == option_name) {
                option_name = format!("{}-{}", option_name, idx + 1);
            }

            let mut option = self.widget_record(&option_name, field, parent, None, kid_id, kid_dict);
            option.parent = Some(name.to_string());
            options.push(option);
        }

        let page = options.iter().find_map(|o| o.page);
        let rect = options
            .iter()
            .filter(|o| o.page == page)
            .filter_map(|o| o.rect)
            .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]);

        log::debug!("Radio field '{}' with {} options", name, options.len());

        self.widgets.push(RawWidget {
            name: name.to_string(),
            value: field.value.clone(),
            field_type: field.field_type.clone(),
            flags: field.flags,
            rect,
            page,
            parent: parent.full_name.clone(),
            kids: options.iter().map(|o| o.name.clone()).collect(),
            tooltip,
        });
        self.widgets.extend(options);
    }

    fn page_from_p(&self, widget: &Dictionary) -> Option<u32> {
        let page_ref = widget.get(b"P").ok()?.as_reference().ok()?;
        self.doc
            .get_pages()
            .into_iter()
            .find(|(_, id)| *id == page_ref)
            .map(|(num, _)| num)
    }
}

/// Button field whose widget kids are the options of one choice
fn is_option_set(name: &str, field: &Inherited) -> bool {
    field.field_type.as_deref() == Some("Btn")
        && (name.ends_with(GROUP_SUFFIX) || field.flags.is_some_and(|bits| bits & FF_RADIO != 0))
}

fn map_load_error(e: lopdf::Error) -> FormError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("encrypt") || lower.contains("decrypt") {
        FormError::Encrypted
    } else {
        FormError::Parse(message)
    }
}

/// Follow indirect references to the underlying object
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    for _ in 0..MAX_FIELD_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

/// Look up a page attribute, walking up the page tree via `/Parent`
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_FIELD_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn string_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn name_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn flags_value(doc: &Document, obj: &Object) -> Option<u32> {
    match resolve(doc, obj) {
        Object::Integer(i) => Some(*i as u32),
        Object::Real(r) => Some(*r as u32),
        _ => None,
    }
}

fn field_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(|i| field_value(doc, i)).collect();
            Some(parts.join(", "))
        }
        _ => None,
    }
    .filter(|v| !v.is_empty())
}

fn rect_value(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let array = resolve(doc, obj).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(array) {
        *slot = get_number(resolve(doc, item))?;
    }
    Some(rect)
}

/// The appearance state a button widget takes when selected
fn on_state(doc: &Document, widget: &Dictionary) -> Option<String> {
    let ap = resolve(doc, widget.get(b"AP").ok()?).as_dict().ok()?;
    let normal = resolve(doc, ap.get(b"N").ok()?).as_dict().ok()?;
    normal
        .iter()
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .find(|key| key != "Off")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn form_with_fields(build: impl FnOnce(&mut Document, ObjectId) -> Vec<Object>) -> PdfForm {
        build_form(true, build)
    }

    /// Widgets only reachable through the page `/Annots`
    fn form_without_acroform(build: impl FnOnce(&mut Document, ObjectId) -> Vec<Object>) -> PdfForm {
        build_form(false, build)
    }

    fn build_form(
        with_acroform: bool,
        build: impl FnOnce(&mut Document, ObjectId) -> Vec<Object>,
    ) -> PdfForm {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let annots = build(&mut doc, page_id);
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Annots" => annots.clone(),
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1i64,
            }),
        );
        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if with_acroform {
            catalog.set("AcroForm", Object::Dictionary(dictionary! { "Fields" => annots }));
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        PdfForm::from_document(doc)
    }

    #[test]
    fn test_reads_terminal_text_field() {
        let form = form_with_fields(|doc, page_id| {
            let id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal("owner_name"),
                "V" => Object::string_literal("Jane"),
                "Rect" => vec![100.into(), 700.into(), 300.into(), 720.into()],
                "P" => page_id,
            });
            vec![id.into()]
        });

        let widgets = form.read_form_fields().unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].name, "owner_name");
        assert_eq!(widgets[0].field_type.as_deref(), Some("Tx"));
        assert_eq!(widgets[0].value.as_deref(), Some("Jane"));
        assert_eq!(widgets[0].page, Some(1));
        assert_eq!(widgets[0].rect, Some([100.0, 700.0, 300.0, 720.0]));
        assert_eq!(widgets[0].flags, None);
    }

    #[test]
    fn test_radio_kids_inherit_type_and_flags() {
        let form = form_with_fields(|doc, page_id| {
            let parent_id = doc.new_object_id();
            let mut kids = Vec::new();
            for (i, state) in ["Male", "Female"].iter().enumerate() {
                let x = 100 + (i as i64) * 50;
                let kid = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "Parent" => parent_id,
                    "Rect" => vec![x.into(), 600.into(), (x + 12).into(), 612.into()],
                    "P" => page_id,
                    "AP" => Object::Dictionary(dictionary! {
                        "N" => Object::Dictionary(dictionary! { *state => Object::Null, "Off" => Object::Null }),
                    }),
                });
                kids.push(Object::from(kid));
            }
            doc.objects.insert(
                parent_id,
                Object::Dictionary(dictionary! {
                    "FT" => "Btn",
                    "Ff" => Object::Integer(1 << 15),
                    "T" => Object::string_literal("gender"),
                    "Kids" => kids.clone(),
                }),
            );
            let mut fields = vec![Object::from(parent_id)];
            fields.extend(kids);
            fields
        });

        let widgets = form.read_form_fields().unwrap();
        assert_eq!(widgets.len(), 3);
        assert!(widgets.iter().all(|w| w.flags == Some(1 << 15)));
        assert!(widgets.iter().all(|w| w.field_type.as_deref() == Some("Btn")));

        let field = &widgets[0];
        assert_eq!(field.name, "gender");
        assert_eq!(field.kids, vec!["gender_male", "gender_female"]);
        assert_eq!(field.page, Some(1));
        assert_eq!(field.rect, Some([100.0, 600.0, 162.0, 612.0]));

        assert_eq!(widgets[1].name, "gender_male");
        assert_eq!(widgets[1].value.as_deref(), Some("Male"));
        assert_eq!(widgets[1].parent.as_deref(), Some("gender"));
        assert_eq!(widgets[1].rect, Some([100.0, 600.0, 112.0, 612.0]));
        assert_eq!(widgets[2].name, "gender_female");
        assert_eq!(widgets[2].value.as_deref(), Some("Female"));
        assert!(widgets[1..].iter().all(|w| w.kids.is_empty()));
    }

    #[test]
    fn test_checkbox_shown_twice_is_one_record() {
        let form = form_with_fields(|doc, page_id| {
            let parent_id = doc.new_object_id();
            let mut kids = Vec::new();
            for y in [600i64, 100] {
                let kid = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "Parent" => parent_id,
                    "Rect" => vec![100.into(), y.into(), 112.into(), (y + 12).into()],
                    "P" => page_id,
                    "AP" => Object::Dictionary(dictionary! {
                        "N" => Object::Dictionary(dictionary! { "Yes" => Object::Null, "Off" => Object::Null }),
                    }),
                });
                kids.push(Object::from(kid));
            }
            doc.objects.insert(
                parent_id,
                Object::Dictionary(dictionary! {
                    "FT" => "Btn",
                    "T" => Object::string_literal("consent"),
                    "Kids" => kids,
                }),
            );
            vec![parent_id.into()]
        });

        let widgets = form.read_form_fields().unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].name, "consent");
        assert_eq!(widgets[0].value.as_deref(), Some("Yes"));
        assert_eq!(widgets[0].rect, Some([100.0, 600.0, 112.0, 612.0]));
        assert!(widgets[0].kids.is_empty());
    }

    #[test]
    fn test_page_widgets_without_acroform() {
        let form = form_without_acroform(|doc, page_id| {
            let phone = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "Ff" => 2i64,
                "T" => Object::string_literal("phone"),
                "TU" => Object::string_literal("Daytime phone"),
                "Rect" => vec![100.into(), 500.into(), 250.into(), 515.into()],
                "P" => page_id,
            });
            let plan_parent = doc.add_object(dictionary! {
                "FT" => "Btn",
                "Ff" => Object::Integer(1 << 15),
                "T" => Object::string_literal("plan"),
                "V" => "Gold",
            });
            let plan = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "Parent" => plan_parent,
                "Rect" => vec![100.into(), 400.into(), 112.into(), 412.into()],
                "P" => page_id,
            });
            let link = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![0.into(), 0.into(), 50.into(), 10.into()],
            });
            let unnamed = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "Rect" => vec![0.into(), 20.into(), 50.into(), 30.into()],
            });
            vec![phone.into(), plan.into(), link.into(), unnamed.into()]
        });

        let annotations = form.read_page_annotations(1).unwrap();
        assert_eq!(annotations.len(), 4);
        assert_eq!(annotations.iter().filter(|a| a.is_widget()).count(), 3);
        assert_eq!(annotations[2].subtype, "Link");
        assert_eq!(annotations[2].name, None);
        assert_eq!(annotations[1].name.as_deref(), Some("plan"));
        assert_eq!(annotations[1].value.as_deref(), Some("Gold"));

        let widgets = form.read_form_fields().unwrap();
        assert_eq!(widgets.len(), 2);

        assert_eq!(widgets[0].name, "phone");
        assert_eq!(widgets[0].field_type.as_deref(), Some("Tx"));
        assert_eq!(widgets[0].flags, Some(2));
        assert_eq!(widgets[0].tooltip.as_deref(), Some("Daytime phone"));
        assert_eq!(widgets[0].page, Some(1));
        assert_eq!(widgets[0].rect, Some([100.0, 500.0, 250.0, 515.0]));

        assert_eq!(widgets[1].name, "plan");
        assert_eq!(widgets[1].field_type.as_deref(), Some("Btn"));
        assert_eq!(widgets[1].flags, Some(1 << 15));
        assert_eq!(widgets[1].rect, Some([100.0, 400.0, 112.0, 412.0]));
    }

    #[test]
    fn test_page_annotations_out_of_range() {
        let form = form_without_acroform(|_, _| Vec::new());
        assert!(form.read_form_fields().unwrap().is_empty());
        assert!(matches!(form.read_page_annotations(2), Err(FormError::InvalidInput(_))));
    }

    #[test]
    fn test_nested_field_names_are_qualified() {
        let form = form_with_fields(|doc, page_id| {
            let parent_id = doc.new_object_id();
            let child = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "Parent" => parent_id,
                "T" => Object::string_literal("city"),
                "Rect" => vec![10.into(), 10.into(), 50.into(), 20.into()],
                "P" => page_id,
            });
            doc.objects.insert(
                parent_id,
                Object::Dictionary(dictionary! {
                    "FT" => "Tx",
                    "T" => Object::string_literal("address"),
                    "Kids" => vec![child.into()],
                }),
            );
            vec![parent_id.into()]
        });

        let widgets = form.read_form_fields().unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].name, "address.city");
        assert_eq!(widgets[0].parent.as_deref(), Some("address"));
        assert_eq!(widgets[0].field_type.as_deref(), Some("Tx"));
    }

    #[test]
    fn test_page_bounds_from_media_box() {
        let form = form_with_fields(|_, _| Vec::new());
        assert_eq!(form.page_bounds(1), Some(Rect::letter()));
        assert_eq!(form.page_bounds(2), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PdfForm::load("/nonexistent/form.pdf").err().unwrap();
        assert!(matches!(err, FormError::FileNotFound(_)));
    }

    #[test]
    fn test_load_mem_rejects_garbage() {
        assert!(PdfForm::load_mem(b"This is not a PDF").is_err());
        assert!(matches!(PdfForm::load_mem(b""), Err(FormError::InvalidInput(_))));
    }
}
