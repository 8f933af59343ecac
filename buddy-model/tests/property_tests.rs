use buddy_model::{DEFAULT_TEMPERATURE, GenerationParams, fix_markdown};
use proptest::prelude::*;

fn arb_markdown() -> impl Strategy<Value = String> {
    prop::collection::vec("#{0,3} ?[a-z]{0,6}", 0..20).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Derived parameters stay inside their clamps for any chunk count.
    #[test]
    fn prop_params_stay_in_bounds(doc_length in 0usize..1_000_000) {
        let params = GenerationParams::for_document_length(doc_length);
        let top_p = params.top_p.unwrap();
        let max_tokens = params.max_output_tokens.unwrap();
        prop_assert!((0.7..=0.9).contains(&top_p), "top_p {top_p} out of range");
        prop_assert!((1024..=4096).contains(&max_tokens), "max_output_tokens {max_tokens} out of range");
        prop_assert_eq!(params.temperature, DEFAULT_TEMPERATURE);
    }

    /// Longer documents never get a smaller budget.
    #[test]
    fn prop_params_are_monotone(a in 0usize..500, b in 0usize..500) {
        let (short, long) = (a.min(b), a.max(b));
        let short = GenerationParams::for_document_length(short);
        let long = GenerationParams::for_document_length(long);
        prop_assert!(short.top_p.unwrap() <= long.top_p.unwrap());
        prop_assert!(short.max_output_tokens.unwrap() <= long.max_output_tokens.unwrap());
    }

    /// Repairing already repaired Markdown changes nothing.
    #[test]
    fn prop_fix_markdown_is_idempotent(text in arb_markdown()) {
        let once = fix_markdown(&text);
        prop_assert_eq!(fix_markdown(&once), once.clone());
        prop_assert!(!once.contains("\n\n\n"));
    }
}
