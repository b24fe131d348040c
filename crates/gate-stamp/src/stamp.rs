//! # Watermark Stamping
//!
//! Appends a footer attribution line to every page of a PDF: buyer email,
//! order id, and an ISO-8601 timestamp, in dark red Helvetica near the
//! lower-left margin, sized down when a page is too narrow for the full line.

use chrono::{DateTime, SecondsFormat, Utc};
use gate_core::{GateError, GateResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Distance of the stamp from the lower-left page corner, in points
const MARGIN: f64 = 24.0;

/// Baseline stamp font size, in points
const FONT_SIZE: f64 = 10.0;

/// Smallest font size the width constraint may shrink to
const MIN_FONT_SIZE: f64 = 4.0;

/// Approximate advance width of a Helvetica glyph, as a fraction of the size
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// Resource name under which the stamp font is registered on each page
const STAMP_FONT: &str = "DGW";

/// Stamp color (dark red)
const COLOR: (f32, f32, f32) = (0.7, 0.1, 0.1);

/// Page size fallback when no MediaBox is reachable (US Letter)
const DEFAULT_PAGE_WIDTH: f64 = 612.0;

/// Purchase metadata embedded into the output document
#[derive(Debug, Clone)]
pub struct StampMeta {
    /// Buyer email
    pub email: String,

    /// Provider order/session id
    pub order_id: String,

    /// Moment of the download
    pub timestamp: DateTime<Utc>,
}

impl StampMeta {
    pub fn new(
        email: impl Into<String>,
        order_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            order_id: order_id.into(),
            timestamp,
        }
    }

    /// The exact line drawn onto every page
    pub fn attribution_line(&self) -> String {
        format!(
            "Licensed to {} — Order {} — {}",
            self.email,
            self.order_id,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Stamp every page of `master` with the attribution line.
///
/// Returns new document bytes; the input is untouched. Any parse or encode
/// failure is an error, so an unwatermarked document is never returned.
pub fn stamp_document(master: &[u8], meta: &StampMeta) -> GateResult<Vec<u8>> {
    let mut doc = Document::load_mem(master)
        .map_err(|e| GateError::Stamp(format!("master parse failed: {}", e)))?;

    let text = meta.attribution_line();
    let encoded = winansi_encode(&text);

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    debug!("Stamping {} page(s)", pages.len());

    for page_id in pages {
        let width = page_width(&doc, page_id);
        let size = fitted_font_size(encoded.len(), width);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![STAMP_FONT.into(), Object::Real(size as f32)]),
                Operation::new(
                    "rg",
                    vec![
                        Object::Real(COLOR.0),
                        Object::Real(COLOR.1),
                        Object::Real(COLOR.2),
                    ],
                ),
                Operation::new(
                    "Td",
                    vec![Object::Real(MARGIN as f32), Object::Real(MARGIN as f32)],
                ),
                Operation::new("Tj", vec![Object::string_literal(encoded.clone())]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        let ops = content
            .encode()
            .map_err(|e| GateError::Stamp(format!("content encode failed: {}", e)))?;
        let stamp_id = doc.add_object(Stream::new(dictionary! {}, ops));

        append_page_content(&mut doc, page_id, stamp_id)?;
        attach_stamp_font(&mut doc, page_id, font_id)?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| GateError::Stamp(format!("save failed: {}", e)))?;
    Ok(out)
}

/// Shrink the font until the estimated line width fits inside the margins
fn fitted_font_size(glyphs: usize, page_width: f64) -> f64 {
    let max_width = (page_width - 2.0 * MARGIN).max(1.0);
    let estimated = glyphs as f64 * AVG_GLYPH_WIDTH * FONT_SIZE;
    if estimated <= max_width {
        FONT_SIZE
    } else {
        (max_width / (glyphs as f64 * AVG_GLYPH_WIDTH)).max(MIN_FONT_SIZE)
    }
}

/// Register the stamp stream as an additional content stream on the page
fn append_page_content(doc: &mut Document, page_id: ObjectId, stamp_id: ObjectId) -> GateResult<()> {
    enum Existing {
        Refs(Vec<Object>),
        Inline(Stream),
        None,
    }

    let existing = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| GateError::Stamp(format!("page dictionary: {}", e)))?;
        match page.get(b"Contents") {
            Ok(Object::Array(arr)) => Existing::Refs(arr.clone()),
            Ok(obj @ Object::Reference(_)) => Existing::Refs(vec![obj.clone()]),
            Ok(Object::Stream(s)) => Existing::Inline(s.clone()),
            _ => Existing::None,
        }
    };

    let mut contents = match existing {
        Existing::Refs(refs) => refs,
        // A stream stored inline on the page gets hoisted into its own
        // object so the stamp can be appended after it.
        Existing::Inline(stream) => vec![Object::Reference(doc.add_object(stream))],
        Existing::None => Vec::new(),
    };
    contents.push(Object::Reference(stamp_id));

    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| GateError::Stamp(format!("page dictionary: {}", e)))?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Make the stamp font reachable from the page's resources.
///
/// Resources may live on the page, behind a reference, or be inherited from
/// an ancestor Pages node; the merged dictionary is materialized directly on
/// the page so other inherited entries stay visible.
fn attach_stamp_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> GateResult<()> {
    let resources = resolve_resources(doc, page_id);

    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(rid)) => doc.get_dictionary(*rid).ok().cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    };
    fonts.set(STAMP_FONT, Object::Reference(font_id));

    let mut resources = resources;
    resources.set("Font", Object::Dictionary(fonts));

    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| GateError::Stamp(format!("page dictionary: {}", e)))?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Walk the page tree upward until a Resources dictionary is found
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut node = Some(page_id);
    while let Some(id) = node {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(d)) => return d.clone(),
            Ok(Object::Reference(rid)) => {
                return doc.get_dictionary(*rid).ok().cloned().unwrap_or_default();
            }
            _ => {}
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok());
    }
    Dictionary::new()
}

/// Walk the page tree upward until a MediaBox yields a page width
fn page_width(doc: &Document, page_id: ObjectId) -> f64 {
    let mut node = Some(page_id);
    while let Some(id) = node {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Ok(Object::Array(media_box)) = dict.get(b"MediaBox") {
            if media_box.len() == 4 {
                let x0 = number(&media_box[0]);
                let x1 = number(&media_box[2]);
                if let (Some(x0), Some(x1)) = (x0, x1) {
                    return (x1 - x0).abs();
                }
            }
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok());
    }
    DEFAULT_PAGE_WIDTH
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Encode text for a WinAnsiEncoding simple font.
///
/// ASCII and Latin-1 pass through; the dashes WinAnsi relocates are mapped
/// explicitly; anything else degrades to '?'.
fn winansi_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2014}' => 0x97, // em dash
            '\u{2013}' => 0x96, // en dash
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
