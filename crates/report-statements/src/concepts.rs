//! The concept-to-label configuration map.
//!
//! A concept is a semantic financial quantity (total assets, net income)
//! resolved from one or more raw line-item labels. The map is the schema
//! contract between the source spreadsheets and the ratio engine: it is an
//! explicit immutable value passed into the engine's constructor, never
//! ambient state, so several report configurations can coexist in one
//! process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use report_core::error::{ReportError, Result};

/// Mapping from concept key to the ordered list of line-item labels summed
/// to produce that concept's series.
///
/// Concepts needing exactly one label still use a one-element list. Label
/// text must be in canonical header form (trimmed, uppercased) to match the
/// wide table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptMap(BTreeMap<String, Vec<String>>);

impl ConceptMap {
    /// Creates an empty map. Useful for tests; a usable map needs every key
    /// in [`crate::ratios::REQUIRED_CONCEPTS`].
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parses a map from its JSON representation
    /// (`{"concept": ["LABEL", ...], ...}`).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReportError::Config(format!("bad concept map: {e}")))
    }

    /// Adds or replaces a concept.
    pub fn insert(&mut self, concept: impl Into<String>, labels: Vec<String>) {
        self.0.insert(concept.into(), labels);
    }

    /// Whether `concept` is defined.
    #[must_use]
    pub fn contains(&self, concept: &str) -> bool {
        self.0.contains_key(concept)
    }

    /// The label list for `concept`.
    ///
    /// A missing key is a fatal configuration error, as is an empty label
    /// list.
    pub fn get(&self, concept: &str) -> Result<&[String]> {
        let labels = self
            .0
            .get(concept)
            .ok_or_else(|| ReportError::Config(format!("concept key missing from map: {concept}")))?;
        if labels.is_empty() {
            return Err(ReportError::Config(format!(
                "concept has an empty label list: {concept}"
            )));
        }
        Ok(labels)
    }

    /// Iterates the defined concept keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Default for ConceptMap {
    /// The label map for the Vietnamese statement exports the generator was
    /// built around.
    fn default() -> Self {
        fn labels(items: &[&str]) -> Vec<String> {
            items.iter().map(ToString::to_string).collect()
        }

        let mut map = Self::new();
        map.insert(
            "total_current_assets",
            labels(&[
                "CĐKT. TIỀN VÀ TƯƠNG ĐƯƠNG TIỀN",
                "CĐKT. ĐẦU TƯ TÀI CHÍNH NGẮN HẠN",
                "CĐKT. CÁC KHOẢN PHẢI THU NGẮN HẠN",
                "CĐKT. HÀNG TỒN KHO, RÒNG",
                "CĐKT. TÀI SẢN NGẮN HẠN KHÁC",
            ]),
        );
        map.insert(
            "ppe",
            labels(&[
                "CĐKT. GTCL TSCĐ HỮU HÌNH",
                "CĐKT. GTCL TÀI SẢN THUÊ TÀI CHÍNH",
                "CĐKT. GTCL TÀI SẢN CỐ ĐỊNH VÔ HÌNH",
                "CĐKT. XÂY DỰNG CƠ BẢN DỞ DANG (TRƯỚC 2015)",
            ]),
        );
        map.insert(
            "total_assets",
            labels(&["CĐKT. TÀI SẢN NGẮN HẠN", "CĐKT. TÀI SẢN DÀI HẠN"]),
        );
        map.insert("total_current_liabilities", labels(&["CĐKT. NỢ NGẮN HẠN"]));
        map.insert("total_long_term_debt", labels(&["CĐKT. NỢ DÀI HẠN"]));
        map.insert("total_liabilities", labels(&["CĐKT. NỢ PHẢI TRẢ"]));
        map.insert(
            "net_income",
            labels(&["KQKD. LỢI NHUẬN SAU THUẾ THU NHẬP DOANH NGHIỆP"]),
        );
        map.insert("interest_expense", labels(&["KQKD. CHI PHÍ LÃI VAY"]));
        map.insert("taxes", labels(&["KQKD. CHI PHÍ THUẾ TNDN HIỆN HÀNH"]));
        map.insert(
            "depreciation_amortization",
            labels(&["KQKD. KHẤU HAO TÀI SẢN CỐ ĐỊNH"]),
        );
        map.insert("revenue", labels(&["KQKD. DOANH THU THUẦN"]));
        map.insert(
            "gross_profit",
            labels(&["KQKD. LỢI NHUẬN GỘP VỀ BÁN HÀNG VÀ CUNG CẤP DỊCH VỤ"]),
        );
        map.insert("financial_expense", labels(&["KQKD. CHI PHÍ TÀI CHÍNH"]));
        map.insert("selling_expense", labels(&["KQKD. CHI PHÍ BÁN HÀNG"]));
        map.insert(
            "admin_expense",
            labels(&["KQKD. CHI PHÍ QUẢN LÝ DOANH NGHIỆP"]),
        );
        map.insert("total_equity", labels(&["CĐKT. VỐN CHỦ SỞ HỮU"]));
        map.insert("total_debt", labels(&["CĐKT. NỢ PHẢI TRẢ"]));
        map.insert(
            "operating_profit",
            labels(&["KQKD. LỢI NHUẬN THUẦN TỪ HOẠT ĐỘNG KINH DOANH"]),
        );
        map.insert("other_profit", labels(&["KQKD. LỢI NHUẬN KHÁC"]));
        map.insert(
            "jv_profit",
            labels(&["KQKD. LÃI/ LỖ TỪ CÔNG TY LIÊN DOANH (TRƯỚC 2015)"]),
        );
        map.insert("other_income", labels(&["KQKD. LỢI NHUẬN KHÁC"]));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let map = ConceptMap::new();
        let err = map.get("total_assets").unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_empty_label_list_is_config_error() {
        let mut map = ConceptMap::new();
        map.insert("total_assets", vec![]);
        assert!(matches!(
            map.get("total_assets"),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_default_covers_required_concepts() {
        let map = ConceptMap::default();
        for concept in crate::ratios::REQUIRED_CONCEPTS {
            assert!(map.contains(concept), "missing {concept}");
            assert!(!map.get(concept).unwrap().is_empty());
        }
    }

    #[test]
    fn test_from_json() {
        let map = ConceptMap::from_json(r#"{"revenue": ["NET SALES"]}"#).unwrap();
        assert_eq!(map.get("revenue").unwrap(), ["NET SALES"]);
        assert!(ConceptMap::from_json("not json").is_err());
    }
}
