//! Property tests for percent escaping and query handling.

use proptest::prelude::*;
use urlstream_core::percent::{EscapeMode, decode, encode};
use urlstream_core::Url;

fn modes() -> impl Strategy<Value = EscapeMode> {
    prop_oneof![Just(EscapeMode::Parameter), Just(EscapeMode::Url)]
}

proptest! {
    #[test]
    fn printable_ascii_round_trips(s in "[ -~]*", mode in modes()) {
        let encoded = encode(&s, mode).into_owned();
        prop_assert_eq!(decode(&encoded), s.as_str());
    }

    #[test]
    fn any_text_round_trips(s in "\\PC*", mode in modes()) {
        let encoded = encode(&s, mode).into_owned();
        prop_assert_eq!(decode(&encoded), s.as_str());
    }

    #[test]
    fn encoded_output_is_ascii_without_spaces(s in "\\PC*", mode in modes()) {
        let encoded = encode(&s, mode);
        prop_assert!(encoded.is_ascii());
        prop_assert!(!encoded.contains(' '));
        prop_assert!(!encoded.contains('&'));
        prop_assert!(!encoded.contains('='));
    }

    #[test]
    fn parameters_survive_render_and_parse(
        pairs in proptest::collection::vec(("[a-z]{1,8}", "\\PC{0,12}"), 0..6)
    ) {
        let mut url = Url::parse("http://example.com/p");
        for (key, value) in &pairs {
            url = url.with_parameter(key.as_str(), value.as_str());
        }

        let reparsed = Url::parse(&url.to_string());
        prop_assert_eq!(reparsed.base(), "http://example.com/p");
        prop_assert_eq!(reparsed.parameters(), url.parameters());
        prop_assert_eq!(reparsed.skipped_query_pairs(), 0);
    }
}
