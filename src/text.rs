//! Positioned text extraction from page content streams
//!
//! Context extraction needs the words printed near each widget, so this module
//! walks a page's content operators, tracks the text and transformation
//! matrices, and records every shown string with its page position. Crops are
//! answered by selecting items whose origin falls inside a rectangle.

use crate::FormError;
use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned rectangle in PDF page coordinates (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// US Letter, used when a page has no readable MediaBox
    pub fn letter() -> Self {
        Self::new(0.0, 0.0, 612.0, 792.0)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Intersect with `bounds`; `None` when the result is inverted or has no area
    pub fn clamp_to(&self, bounds: &Rect) -> Option<Rect> {
        let clamped = Rect {
            x0: self.x0.max(bounds.x0),
            y0: self.y0.max(bounds.y0),
            x1: self.x1.min(bounds.x1),
            y1: self.y1.min(bounds.y1),
        };
        if clamped.x0 >= clamped.x1 || clamped.y0 >= clamped.y1 {
            None
        } else {
            Some(clamped)
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// A text item with position information
#[derive(Debug, Clone)]
pub struct TextItem {
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position on page (baseline)
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    pub font_size: f32,
    /// Page number (1-indexed)
    pub page: u32,
}

/// A line of text (items sharing a baseline)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub y: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Text and graphics state while walking one content stream
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    font: String,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    in_text_block: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            font: String::new(),
            font_size: 12.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            in_text_block: false,
        }
    }

    fn next_line(&mut self) {
        self.line_matrix[5] -= self.font_size * 1.2;
        self.text_matrix = self.line_matrix;
    }

    /// Record a shown string at the current text position
    fn emit(&self, text: String, page: u32, items: &mut Vec<TextItem>) {
        if text.trim().is_empty() {
            return;
        }
        let size = effective_font_size(self.font_size, &self.text_matrix);
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        let width = text.chars().count() as f32 * size * 0.5;
        items.push(TextItem {
            text,
            x: combined[4],
            y: combined[5],
            width,
            font_size: size,
            page,
        });
    }
}

/// Extract text items from a single page
pub fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
) -> Result<Vec<TextItem>, FormError> {
    use lopdf::content::Content;

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| FormError::Parse(e.to_string()))?;
    let content = Content::decode(&content_data).map_err(|e| FormError::Parse(e.to_string()))?;

    let mut items = Vec::new();
    let mut state = TextState::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" if op.operands.len() >= 6 => {
                let m = read_matrix(&op.operands);
                state.ctm = multiply_matrices(&m, &state.ctm);
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => state.in_text_block = false,
            "Tf" if op.operands.len() >= 2 => {
                if let Ok(name) = op.operands[0].as_name() {
                    state.font = String::from_utf8_lossy(name).to_string();
                }
                if let Some(size) = get_number(&op.operands[1]) {
                    state.font_size = size;
                }
            }
            "Td" | "TD" if op.operands.len() >= 2 => {
                state.line_matrix[4] += get_number(&op.operands[0]).unwrap_or(0.0);
                state.line_matrix[5] += get_number(&op.operands[1]).unwrap_or(0.0);
                state.text_matrix = state.line_matrix;
            }
            "Tm" if op.operands.len() >= 6 => {
                state.text_matrix = read_matrix(&op.operands);
                state.line_matrix = state.text_matrix;
            }
            "T*" => state.next_line(),
            "Tj" if state.in_text_block && !op.operands.is_empty() => {
                if let Some(text) = decode_operand(&op.operands[0], doc, &fonts, &state.font) {
                    state.emit(text, page_num, &mut items);
                }
            }
            "TJ" if state.in_text_block && !op.operands.is_empty() => {
                if let Ok(array) = op.operands[0].as_array() {
                    let text: String = array
                        .iter()
                        .filter_map(|part| decode_operand(part, doc, &fonts, &state.font))
                        .collect();
                    state.emit(text, page_num, &mut items);
                }
            }
            "'" | "\"" => {
                state.next_line();
                if let Some(operand) = op.operands.last() {
                    if let Some(text) = decode_operand(operand, doc, &fonts, &state.font) {
                        state.emit(text, page_num, &mut items);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(items)
}

fn read_matrix(operands: &[Object]) -> [f32; 6] {
    let mut m = IDENTITY;
    for (i, operand) in operands.iter().take(6).enumerate() {
        m[i] = get_number(operand).unwrap_or(IDENTITY[i]);
    }
    m
}

/// Helper to get f32 from Object
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Decode a string operand using the current font's encoding
fn decode_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };

    if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
        if let Ok(encoding) = font_dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                return Some(text);
            }
        }
    }

    Some(decode_pdf_string(bytes))
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, Latin-1 otherwise
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Group items into lines, top of the page first, left to right within a line
pub fn group_into_lines(mut items: Vec<TextItem>) -> Vec<TextLine> {
    const Y_TOLERANCE: f32 = 3.0;

    items.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));

    let mut lines: Vec<TextLine> = Vec::new();
    for item in items {
        match lines.last_mut() {
            Some(line) if (line.y - item.y).abs() < Y_TOLERANCE => line.items.push(item),
            _ => {
                let y = item.y;
                lines.push(TextLine { items: vec![item], y });
            }
        }
    }

    for line in &mut lines {
        line.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}

/// Text of all items whose origin lies inside `rect`, one line per baseline
pub fn text_in_rect(items: &[TextItem], rect: &Rect) -> String {
    let inside: Vec<TextItem> = items
        .iter()
        .filter(|i| rect.contains(i.x, i.y))
        .cloned()
        .collect();

    group_into_lines(inside)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}
