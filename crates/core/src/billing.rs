// crates/core/src/billing.rs
//! Billing proposals.
//!
//! Line items come from fixed tables chosen by a filename match; nothing is
//! computed from the document. Evidence rectangles are page fractions on an
//! A4 page (595 x 842 pt) so the client can highlight them over the PDF.

use serde::Serialize;

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;

/// Highlighted region on a page, in normalized coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub height: f64,
}

impl EvidenceRect {
    fn a4(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub page_number: u32,
    pub rects: Vec<EvidenceRect>,
}

/// One proposed GOÄ billing position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub goe_code: String,
    pub description: String,
    pub factor: f64,
    /// EUR.
    pub amount: f64,
    /// 0.0–1.0
    pub confidence: f64,
    pub evidence: Evidence,
}

impl LineItem {
    fn new(
        id: &str,
        goe_code: &str,
        description: &str,
        factor: f64,
        amount: f64,
        confidence: f64,
        rect: EvidenceRect,
    ) -> Self {
        Self {
            id: id.to_string(),
            goe_code: goe_code.to_string(),
            description: description.to_string(),
            factor,
            amount,
            confidence,
            evidence: Evidence {
                page_number: 1,
                rects: vec![rect],
            },
        }
    }
}

/// Which line-item table applies to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingProfile {
    Appendectomy,
    Mueller,
    Schmidt,
    Mallorca,
}

impl BillingProfile {
    /// Select by filename substring. Later rules win when several match.
    pub fn classify(filename: &str) -> Self {
        let mut profile = BillingProfile::Appendectomy;
        if filename.contains("Müller") {
            profile = BillingProfile::Mueller;
        }
        if filename.contains("Schmidt") {
            profile = BillingProfile::Schmidt;
        }
        if filename.contains("Mallorca") {
            profile = BillingProfile::Mallorca;
        }
        profile
    }

    pub fn line_items(self) -> Vec<LineItem> {
        match self {
            BillingProfile::Appendectomy => vec![LineItem::new(
                "bill_1",
                "3182",
                "Laparoskopische Appendektomie",
                2.3,
                120.50,
                0.98,
                EvidenceRect::a4(
                    50.0 / PAGE_WIDTH,
                    (PAGE_HEIGHT - 575.0) / PAGE_HEIGHT,
                    400.0 / PAGE_WIDTH,
                    (PAGE_HEIGHT - 555.0) / PAGE_HEIGHT,
                ),
            )],
            BillingProfile::Mueller => vec![
                LineItem::new(
                    "mueller_1",
                    "1",
                    "Beratung - 2,3 fach",
                    2.3,
                    10.72,
                    0.99,
                    EvidenceRect::a4(0.1, 0.2, 0.5, 0.25),
                ),
                LineItem::new(
                    "mueller_2",
                    "7",
                    "Untersuchung - 2,3 fach",
                    2.3,
                    21.46,
                    0.95,
                    EvidenceRect::a4(0.1, 0.15, 0.5, 0.18),
                ),
            ],
            BillingProfile::Schmidt => vec![LineItem::new(
                "schmidt_1",
                "3560",
                "Laborwerte - 1,0 fach",
                1.0,
                40.22,
                0.92,
                EvidenceRect::a4(0.1, 0.1, 0.6, 0.15),
            )],
            BillingProfile::Mallorca => vec![LineItem::new(
                "mallorca_1",
                "HOTEL",
                "Nicht erstattungsfähig (Privatvergnügen)",
                1.0,
                0.0,
                0.10,
                EvidenceRect::a4(0.1, 0.5, 0.8, 0.6),
            )],
        }
    }
}

/// Sum of all line item amounts, in EUR.
pub fn total_amount(items: &[LineItem]) -> f64 {
    items.iter().map(|i| i.amount).sum()
}
