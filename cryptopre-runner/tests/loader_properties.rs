//! Property tests for CSV loading.
//!
//! 1. Header matching ignores case for every required column
//! 2. Any canonical label code survives a write/load cycle unchanged

use proptest::prelude::*;
use std::io::Write;

use cryptopre_core::domain::Label;
use cryptopre_runner::data_loader::{load_labeled_bars, LoadError};

fn arb_casing(name: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), name.len()).prop_map(move |upper| {
        name.chars()
            .zip(upper)
            .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

fn write_tmp(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

proptest! {
    #[test]
    fn headers_match_in_any_case(
        close in arb_casing("close"),
        low in arb_casing("low"),
        high in arb_casing("high"),
        atr in arb_casing("atr"),
        label in arb_casing("label"),
        codes in prop::collection::vec(0u8..3, 1..30),
    ) {
        let mut csv = format!("{close},{low},{high},{atr},{label}\n");
        for code in &codes {
            csv.push_str(&format!("100,99,101,1.5,{code}\n"));
        }
        let f = write_tmp(&csv);
        let bars = load_labeled_bars(f.path()).unwrap();
        let loaded: Vec<u8> = bars.iter().map(|b| b.label.code()).collect();
        prop_assert_eq!(loaded, codes);
    }

    #[test]
    fn out_of_range_codes_are_rejected(code in 3i64..1000) {
        let f = write_tmp(&format!("Close,Low,High,atr,label\n100,99,101,1.5,{code}\n"));
        let is_invalid = matches!(load_labeled_bars(f.path()), Err(LoadError::InvalidValue { .. }));
        prop_assert!(is_invalid);
    }

    #[test]
    fn label_names_load(idx in 0usize..3) {
        let label = [Label::Sell, Label::Hold, Label::Buy][idx];
        let f = write_tmp(&format!("Close,Low,High,atr,label\n100,99,101,1.5,{label}\n"));
        prop_assert_eq!(load_labeled_bars(f.path()).unwrap()[0].label, label);
    }
}
