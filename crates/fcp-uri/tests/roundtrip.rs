use fcp_uri::{KeyType, PubSuffix, Uri};
use proptest::prelude::*;

fn hash_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,32}"
}

fn path_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_/.-]{0,24}"
}

proptest! {
    /// `parse(render(u)) == u` for every constructed URI (spec.md §8).
    #[test]
    fn chk_round_trips(hash in hash_strategy(), msk in proptest::option::of(path_strategy())) {
        let mut u = Uri::new(KeyType::Chk, hash);
        if let Some(m) = msk {
            u = u.with_msk_path(m);
        }
        let rendered = u.render();
        let parsed = Uri::parse(&rendered).unwrap();
        prop_assert_eq!(parsed, u);
    }

    #[test]
    fn ksk_round_trips(hash in hash_strategy(), msk in proptest::option::of(path_strategy())) {
        let mut u = Uri::new(KeyType::Ksk, hash);
        if let Some(m) = msk {
            u = u.with_msk_path(m);
        }
        let rendered = u.render();
        let parsed = Uri::parse(&rendered).unwrap();
        prop_assert_eq!(parsed, u);
    }

    #[test]
    fn public_ssk_round_trips(
        hash in hash_strategy(),
        path in path_strategy(),
        msk in proptest::option::of(path_strategy()),
        entropy in any::<bool>(),
    ) {
        let suffix = if entropy { PubSuffix::Entropy } else { PubSuffix::Standard };
        let mut u = Uri::ssk_public(hash, suffix, path);
        if let Some(m) = msk {
            u = u.with_msk_path(m);
        }
        let rendered = u.render();
        let parsed = Uri::parse(&rendered).unwrap();
        prop_assert_eq!(parsed, u);
    }

    /// `render(parse(s)) == s` for well-formed strings we generate ourselves.
    #[test]
    fn render_parse_is_stable(hash in hash_strategy(), path in "[a-zA-Z0-9_/.-]{1,24}") {
        let s = format!("SSK@{hash}PAgM/{path}");
        let parsed = Uri::parse(&s).unwrap();
        prop_assert_eq!(parsed.render(), s);
    }
}
