
use domain_redirect::{compile, ResourceType, REDIRECT_PRIORITY};
use proptest::prelude::*;
use strategies::{arb_records, arb_valid_records, records_of, GenRecord};

// ---------------------------------------------------------------------------
// Invariant 1: Disabled records never produce rules, and every enabled
// well-formed record produces exactly one.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn output_length_counts_enabled_valid_records(gens in arb_records()) {
        let compiled = compile(&records_of(&gens));
        let expected = gens.iter().filter(|g| g.compiles()).count();
        prop_assert_eq!(compiled.rules().len(), expected);
    }

    #[test]
    fn disabled_records_never_compile(gens in arb_records()) {
        let mut gens = gens;
        for gen in &mut gens {
            gen.record.enabled = false;
        }
        let compiled = compile(&records_of(&gens));
        prop_assert!(compiled.is_empty());
        prop_assert!(compiled.skipped().is_empty());
    }

    #[test]
    fn skipped_are_enabled_malformed_records(gens in arb_records()) {
        let compiled = compile(&records_of(&gens));
        let expected: Vec<i64> = gens
            .iter()
            .filter(|g| g.record.enabled && g.expected.is_none())
            .map(|g| g.record.id)
            .collect();
        let skipped: Vec<i64> = compiled.skipped().iter().map(|e| e.record_id()).collect();
        prop_assert_eq!(skipped, expected);
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Ids are 1..=n in input order of the compiled records.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn ids_contiguous_from_one(gens in arb_records()) {
        let compiled = compile(&records_of(&gens));
        let ids: Vec<u32> = compiled.rules().iter().map(|r| r.id).collect();
        let expected: Vec<u32> = (1..=ids.len() as u32).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn rules_follow_input_order(gens in arb_records()) {
        let compiled = compile(&records_of(&gens));
        let expected: Vec<&GenRecord> = gens.iter().filter(|g| g.compiles()).collect();
        for (rule, gen) in compiled.rules().iter().zip(expected) {
            let want = gen.expected.as_ref().unwrap();
            prop_assert_eq!(rule.url_filter(), want.url_filter.as_str());
            prop_assert_eq!(&rule.transform().scheme, &want.scheme);
            prop_assert_eq!(&rule.transform().host, &want.host);
            prop_assert_eq!(&rule.transform().port, &want.port);
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Fixed rule shape.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn fixed_priority_and_resource_type(gens in arb_valid_records()) {
        let compiled = compile(&records_of(&gens));
        for rule in compiled.rules() {
            prop_assert_eq!(rule.priority, REDIRECT_PRIORITY);
            prop_assert_eq!(&rule.condition.resource_types, &vec![ResourceType::MainFrame]);
            prop_assert!(rule.url_filter().ends_with("/*"));
        }
    }

    #[test]
    fn port_is_empty_or_numeric(gens in arb_valid_records()) {
        let compiled = compile(&records_of(&gens));
        for rule in compiled.rules() {
            let port = &rule.transform().port;
            prop_assert!(port.is_empty() || port.parse::<u16>().is_ok());
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: Determinism. Compiling the same list twice yields
// byte-identical output.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn recompile_is_identical(gens in arb_records()) {
        let records = records_of(&gens);
        let first = compile(&records);
        let second = compile(&records);
        prop_assert_eq!(&first, &second);
        let a = serde_json::to_vec(first.rules()).unwrap();
        let b = serde_json::to_vec(second.rules()).unwrap();
        prop_assert_eq!(a, b);
    }
}

// ---------------------------------------------------------------------------
// Invariant 5: A malformed record does not disturb its siblings.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn malformed_record_isolated(
        gens in arb_valid_records(),
        bad in strategies::arb_malformed_url(),
        at in any::<prop::sample::Index>(),
    ) {
        let clean = compile(&records_of(&gens));

        let mut records = records_of(&gens);
        let mut broken = domain_redirect::RuleRecord::new(0, "https://ok.example", "https://ok.example");
        broken.source_domain = bad;
        let pos = at.index(records.len() + 1);
        records.insert(pos, broken);

        let dirty = compile(&records);
        prop_assert_eq!(dirty.rules(), clean.rules());
        prop_assert_eq!(dirty.skipped().len(), 1);
        prop_assert_eq!(dirty.skipped()[0].record_id(), 0);
    }
}
