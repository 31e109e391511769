use super::*;
use crate::test_support::{addrs, engine, Extra, FixedUnwinder, Kind, Memcheck, TestEngine, TestSymbols};
use pretty_assertions::assert_eq;
use vigil_context::Addr;

fn symbols() -> TestSymbols {
    TestSymbols::new()
        .function(0x10, "malloc")
        .object(0x10, "libc.so")
        .function(0x20, "helper")
        .object(0x20, "app")
        .function(0x30, "main")
        .object(0x30, "app")
        .function(0x40, "__libc_start_main")
        .object(0x40, "libc.so")
        .function(0x50, "worker")
        .object(0x50, "app")
}

fn new_engine(config: EngineConfig) -> TestEngine {
    engine(config, symbols())
}

fn submit(engine: &mut TestEngine, stack: &[u64], kind: Kind, extra: &Extra) -> RecordOutcome {
    let unwinder = FixedUnwinder(addrs(stack));
    engine.maybe_record(&unwinder, ErrorEvent::new(ThreadId::MAIN, kind, extra))
}

const LEAK_IN_MALLOC: &str = "\
{
   leak-in-malloc
   Memcheck:Leak
   fun:malloc
   ...
}
";

#[test]
fn test_repeats_fold_into_one_record() {
    let mut engine = new_engine(EngineConfig::default());
    let extra = Extra::size(4);

    let first = submit(&mut engine, &[0x10, 0x20, 0x30], Kind::Read, &extra);
    let RecordOutcome::Reported(id) = first else {
        panic!("expected a report, got {first:?}");
    };
    for _ in 0..4 {
        assert_eq!(
            submit(&mut engine, &[0x10, 0x20, 0x30], Kind::Read, &extra),
            RecordOutcome::Duplicate(id)
        );
    }

    assert_eq!(engine.errors().len(), 1);
    assert_eq!(engine.errors().get(id).count(), 5);
    assert_eq!(engine.sink().reports.len(), 1);
    let counts = engine.counts();
    assert_eq!(counts.found, 5);
    assert_eq!(counts.contexts, 1);
    assert_eq!(counts.shown, 1);
}

#[test]
fn test_payload_and_stack_distinguish_records() {
    let mut engine = new_engine(EngineConfig::default());

    submit(&mut engine, &[0x10, 0x30], Kind::Read, &Extra::size(4));
    submit(&mut engine, &[0x10, 0x30], Kind::Read, &Extra::size(8));
    submit(&mut engine, &[0x20, 0x30], Kind::Read, &Extra::size(4));
    submit(&mut engine, &[0x10, 0x30], Kind::Leak, &Extra::size(4));

    assert_eq!(engine.errors().len(), 4);
    assert_eq!(engine.sink().reports.len(), 4);
    let uniques: Vec<_> = engine.sink().reports.iter().map(|(r, _)| r.unique).collect();
    assert_eq!(uniques, vec![0, 1, 2, 3]);
}

#[test]
fn test_report_contents() {
    let mut engine = new_engine(EngineConfig::default());
    let extra = Extra::size(4);
    let unwinder = FixedUnwinder(addrs(&[0x10, 0x20, 0x30, 0x40]));
    let event = ErrorEvent::new(ThreadId::new(2), Kind::Read, &extra)
        .at(Addr::new(0x1000))
        .with_message("heap");
    engine.maybe_record(&unwinder, event);

    let (report, interactive) = &engine.sink().reports[0];
    assert!(*interactive);
    assert_eq!(report.tool, "Memcheck");
    assert_eq!(report.kind, Some("Read"));
    assert_eq!(report.thread, ThreadId::new(2));
    assert_eq!(report.headline, "Invalid read of size 4");
    assert_eq!(report.addr, Some(Addr::new(0x1000)));
    assert_eq!(
        report.details,
        vec!["Address 0x1000 is not stack'd, malloc'd or (recently) free'd".to_string()]
    );
    // Frames below main are hidden.
    let functions: Vec<_> = report
        .frames
        .iter()
        .map(|f| f.function.as_deref().unwrap())
        .collect();
    assert_eq!(functions, vec!["malloc", "helper", "main"]);
    assert_eq!(report.suppression, None);
    assert_eq!(report.header, None);

    let record = engine.errors().iter().next().unwrap().1;
    assert_eq!(record.message(), Some("heap"));
    assert_eq!(record.state(), ErrorState::Reported);
}

#[test]
fn test_suppressed_records_count_once_per_record() {
    let mut engine = new_engine(EngineConfig::default());
    assert_eq!(engine.load_suppressions_str("test.supp", LEAK_IN_MALLOC).unwrap(), 1);
    let extra = Extra::default();

    for _ in 0..3 {
        for stack in [&[0x10, 0x20, 0x30][..], &[0x10, 0x50, 0x30][..]] {
            let outcome = submit(&mut engine, stack, Kind::Leak, &extra);
            assert!(matches!(
                outcome,
                RecordOutcome::Suppressed(_) | RecordOutcome::Duplicate(_)
            ));
        }
    }

    assert!(engine.sink().reports.is_empty());
    let (_, supp) = engine.suppressions().iter().next().unwrap();
    assert_eq!(supp.count(), 2);
    assert_eq!(supp.occurrences(), 6);

    let counts = engine.counts();
    assert_eq!(counts.suppressed, 6);
    assert_eq!(counts.suppressed_contexts, 2);
    assert_eq!(counts.found, 0);
    assert!(engine.errors().iter().all(|(_, r)| r.state() == ErrorState::Suppressed));
}

#[test]
fn test_suppression_kind_must_match() {
    let mut engine = new_engine(EngineConfig::default());
    engine.load_suppressions_str("test.supp", LEAK_IN_MALLOC).unwrap();
    let outcome = submit(&mut engine, &[0x10, 0x30], Kind::Read, &Extra::size(4));
    assert!(matches!(outcome, RecordOutcome::Reported(_)));
}

#[test]
fn test_wildcard_then_main_matches_any_stack_ending_in_main() {
    let mut engine = new_engine(EngineConfig::default());
    engine
        .load_suppressions_str("test.supp", "{\n ends-in-main\n Memcheck:Read\n ...\n fun:main\n}\n")
        .unwrap();
    let extra = Extra::size(4);

    assert!(matches!(
        submit(&mut engine, &[0x10, 0x20, 0x30], Kind::Read, &extra),
        RecordOutcome::Suppressed(_)
    ));
    assert!(matches!(
        submit(&mut engine, &[0x30], Kind::Read, &extra),
        RecordOutcome::Suppressed(_)
    ));
    assert!(matches!(
        submit(&mut engine, &[0x10, 0x30, 0x40], Kind::Read, &extra),
        RecordOutcome::Reported(_)
    ));
}

#[test]
fn test_whole_stack_versus_prefix_matching() {
    let rule = "{\n top-only\n Memcheck:Leak\n fun:malloc\n}\n";

    let mut whole = new_engine(EngineConfig::default());
    whole.load_suppressions_str("test.supp", rule).unwrap();
    assert!(matches!(
        submit(&mut whole, &[0x10, 0x30], Kind::Leak, &Extra::default()),
        RecordOutcome::Reported(_)
    ));

    let mut prefix = new_engine(EngineConfig {
        match_whole_stack: false,
        ..EngineConfig::default()
    });
    prefix.load_suppressions_str("test.supp", rule).unwrap();
    assert!(matches!(
        submit(&mut prefix, &[0x10, 0x30], Kind::Leak, &Extra::default()),
        RecordOutcome::Suppressed(_)
    ));
}

#[test]
fn test_suppression_extra_lines_are_checked_by_tool() {
    let mut engine = new_engine(EngineConfig::default());
    engine
        .load_suppressions_str("test.supp", "{\n write\n Memcheck:Param\n write(buf)\n fun:malloc\n ...\n}\n")
        .unwrap();

    assert!(matches!(
        submit(&mut engine, &[0x10, 0x30], Kind::Param, &Extra::param("write(buf)")),
        RecordOutcome::Suppressed(_)
    ));
    assert!(matches!(
        submit(&mut engine, &[0x10, 0x30], Kind::Param, &Extra::param("read(buf)")),
        RecordOutcome::Reported(_)
    ));
}

#[test]
fn test_shown_cutoff_stops_reporting_silently() {
    let mut engine = new_engine(EngineConfig {
        max_shown: 2,
        ..EngineConfig::default()
    });
    let extra = Extra::size(4);

    let outcomes: Vec<_> = (0..5)
        .map(|i| submit(&mut engine, &[0x100 + i, 0x30], Kind::Read, &extra))
        .collect();
    assert!(matches!(outcomes[0], RecordOutcome::Reported(_)));
    assert!(matches!(outcomes[1], RecordOutcome::Reported(_)));
    for outcome in &outcomes[2..] {
        assert!(matches!(outcome, RecordOutcome::Unshown(_)));
    }

    // Counting carries on.
    assert!(matches!(
        submit(&mut engine, &[0x104, 0x30], Kind::Read, &extra),
        RecordOutcome::Duplicate(_)
    ));
    assert_eq!(engine.sink().reports.len(), 2);
    assert!(engine.sink().warnings.is_empty());
    let counts = engine.counts();
    assert_eq!(counts.found, 6);
    assert_eq!(counts.contexts, 5);
    assert_eq!(counts.shown, 2);
}

#[test]
fn test_total_cutoff_stops_everything_with_one_warning() {
    let mut engine = new_engine(EngineConfig {
        max_found: 3,
        ..EngineConfig::default()
    });
    let extra = Extra::size(4);

    for i in 0..3 {
        assert!(matches!(
            submit(&mut engine, &[0x100 + i], Kind::Read, &extra),
            RecordOutcome::Reported(_)
        ));
    }
    for i in 0..3 {
        assert_eq!(
            submit(&mut engine, &[0x100 + i], Kind::Read, &extra),
            RecordOutcome::Ignored
        );
    }

    assert_eq!(engine.sink().warnings.len(), 1);
    assert!(engine.sink().warnings[0].starts_with("More than 3 total errors detected."));
    assert_eq!(engine.counts().found, 3);
}

#[test]
fn test_unlimited_has_no_cutoffs() {
    let mut engine = new_engine(EngineConfig {
        max_shown: 1,
        max_found: 1,
        ..EngineConfig::unlimited()
    });
    for i in 0..4 {
        assert!(matches!(
            submit(&mut engine, &[0x100 + i], Kind::Read, &Extra::size(4)),
            RecordOutcome::Reported(_)
        ));
    }
    assert!(engine.sink().warnings.is_empty());
}

#[test]
fn test_slowdown_compares_fewer_frames() {
    let extra = Extra::size(4);

    let mut precise = new_engine(EngineConfig::default());
    submit(&mut precise, &[0x10, 0x20, 0x30], Kind::Read, &extra);
    assert!(matches!(
        submit(&mut precise, &[0x10, 0x20, 0x50], Kind::Read, &extra),
        RecordOutcome::Reported(_)
    ));

    let mut slowed = new_engine(EngineConfig {
        slowdown_after: 1,
        ..EngineConfig::default()
    });
    let first = submit(&mut slowed, &[0x10, 0x20, 0x30], Kind::Read, &extra);
    let RecordOutcome::Reported(id) = first else {
        panic!("expected a report, got {first:?}");
    };
    assert_eq!(
        submit(&mut slowed, &[0x10, 0x20, 0x50], Kind::Read, &extra),
        RecordOutcome::Duplicate(id)
    );
}

#[test]
fn test_disabled_threads_are_ignored() {
    let mut engine = new_engine(EngineConfig::default());
    let thread = ThreadId::new(3);
    let extra = Extra::size(4);
    let unwinder = FixedUnwinder(addrs(&[0x10]));

    engine.disable_errors(thread);
    engine.disable_errors(thread);
    engine.enable_errors(thread);
    assert!(engine.errors_disabled(thread));
    assert_eq!(
        engine.maybe_record(&unwinder, ErrorEvent::new(thread, Kind::Read, &extra)),
        RecordOutcome::Ignored
    );
    // Other threads are unaffected.
    assert!(matches!(
        engine.maybe_record(&unwinder, ErrorEvent::new(ThreadId::MAIN, Kind::Read, &extra)),
        RecordOutcome::Reported(_)
    ));

    engine.enable_errors(thread);
    assert!(!engine.errors_disabled(thread));
    engine.enable_errors(thread);
    assert!(matches!(
        engine.maybe_record(&unwinder, ErrorEvent::new(thread, Kind::Leak, &extra)),
        RecordOutcome::Reported(_)
    ));
}

#[test]
fn test_record_at_uses_given_context() {
    let mut engine = new_engine(EngineConfig::default());
    let context = engine.contexts_mut().depth_one(Addr::new(0x30));
    let extra = Extra::default();
    let outcome = engine.record_at(context, ErrorEvent::new(ThreadId::MAIN, Kind::Leak, &extra));
    let RecordOutcome::Reported(id) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };
    assert!(std::ptr::eq(engine.errors().get(id).context(), context));
}

#[test]
fn test_empty_stack_uses_sentinel() {
    let mut engine = new_engine(EngineConfig::default());
    let outcome = submit(&mut engine, &[], Kind::Leak, &Extra::default());
    let RecordOutcome::Reported(id) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };
    assert!(std::ptr::eq(engine.errors().get(id).context(), engine.contexts().sentinel()));
}

#[test]
fn test_generated_suppression_round_trips() {
    let mut engine = new_engine(EngineConfig {
        gen_suppressions: true,
        ..EngineConfig::default()
    });
    let extra = Extra::param("write(buf)");
    submit(&mut engine, &[0x10, 0x20, 0x30, 0x40], Kind::Param, &extra);

    let block = engine.sink().reports[0].0.suppression.clone().unwrap();
    assert_eq!(
        block,
        "{\n   <insert_a_suppression_name_here>\n   Memcheck:Param\n   write(buf)\n   fun:malloc\n   fun:helper\n   fun:main\n   ...\n}"
    );

    let mut fresh = new_engine(EngineConfig::default());
    fresh.load_suppressions_str("generated.supp", &block).unwrap();
    assert!(matches!(
        submit(&mut fresh, &[0x10, 0x20, 0x30, 0x40], Kind::Param, &extra),
        RecordOutcome::Suppressed(_)
    ));
}

#[test]
fn test_generated_suppression_past_depth_cap_round_trips() {
    let config = EngineConfig {
        gen_suppressions: true,
        backtrace_size: 2,
        ..EngineConfig::default()
    };
    let inlining = || symbols().inlined(0x20, &["inner", "helper"]);
    let mut first = engine(config.clone(), inlining());
    submit(&mut first, &[0x10, 0x20], Kind::Leak, &Extra::default());

    let block = first.sink().reports[0].0.suppression.clone().unwrap();
    assert_eq!(
        block,
        "{\n   <insert_a_suppression_name_here>\n   Memcheck:Leak\n   fun:malloc\n   fun:inner\n   ...\n}"
    );

    let mut fresh = engine(config, inlining());
    fresh.load_suppressions_str("generated.supp", &block).unwrap();
    assert!(matches!(
        submit(&mut fresh, &[0x10, 0x20], Kind::Leak, &Extra::default()),
        RecordOutcome::Suppressed(_)
    ));
}

#[test]
fn test_generated_suppression_for_whole_stack_has_no_wildcard() {
    let mut engine = new_engine(EngineConfig {
        gen_suppressions: true,
        ..EngineConfig::default()
    });
    submit(&mut engine, &[0x10, 0x20], Kind::Leak, &Extra::default());
    let block = engine.sink().reports[0].0.suppression.clone().unwrap();
    assert!(block.ends_with("   fun:helper\n}"));
}

#[test]
fn test_unique_error_is_not_stored() {
    let mut engine = new_engine(EngineConfig::default());
    let context = engine.contexts_mut().intern(&addrs(&[0x10, 0x30]));
    let extra = Extra::default();

    let suppressed = engine.unique_error(
        context,
        ErrorEvent::new(ThreadId::MAIN, Kind::Leak, &extra),
        UniqueOptions::default(),
    );
    assert!(!suppressed);
    assert!(engine.errors().is_empty());
    assert_eq!(engine.sink().reports.len(), 1);
    assert_eq!(engine.counts().found, 1);

    let quiet = UniqueOptions {
        count: false,
        print: false,
        allow_interactive: false,
    };
    assert!(!engine.unique_error(context, ErrorEvent::new(ThreadId::MAIN, Kind::Leak, &extra), quiet));
    assert_eq!(engine.sink().reports.len(), 1);
    assert_eq!(engine.counts().found, 1);

    engine.load_suppressions_str("test.supp", LEAK_IN_MALLOC).unwrap();
    assert!(engine.unique_error(
        context,
        ErrorEvent::new(ThreadId::MAIN, Kind::Leak, &extra),
        UniqueOptions::default()
    ));
    assert_eq!(engine.counts().suppressed, 1);
    assert_eq!(engine.used_suppressions().len(), 1);
}

#[test]
fn test_uncounted_unique_error_leaves_suppressed_totals_alone() {
    let mut engine = new_engine(EngineConfig::default());
    engine.load_suppressions_str("test.supp", LEAK_IN_MALLOC).unwrap();
    let context = engine.contexts_mut().intern(&addrs(&[0x10, 0x30]));
    let extra = Extra::default();
    let quiet = UniqueOptions {
        count: false,
        print: false,
        allow_interactive: false,
    };

    assert!(engine.unique_error(context, ErrorEvent::new(ThreadId::MAIN, Kind::Leak, &extra), quiet));
    assert_eq!(engine.counts(), ErrorCounts::default());
    assert_eq!(engine.summary(), ErrorSummary::default());
    // The rule still hid something.
    assert_eq!(engine.used_suppressions()[0].count, 1);
}

fn busy_engine(config: EngineConfig) -> TestEngine {
    let mut engine = new_engine(config);
    engine.load_suppressions_str("test.supp", LEAK_IN_MALLOC).unwrap();
    for _ in 0..3 {
        submit(&mut engine, &[0x20, 0x30], Kind::Read, &Extra::size(4));
    }
    submit(&mut engine, &[0x50, 0x30], Kind::Read, &Extra::size(8));
    submit(&mut engine, &[0x10, 0x30], Kind::Leak, &Extra::default());
    engine
}

#[test]
fn test_show_all_errors_lists_contexts_by_count() {
    let mut engine = busy_engine(EngineConfig {
        verbosity: 2,
        ..EngineConfig::default()
    });
    engine.show_all_errors();

    let sink = engine.sink();
    assert_eq!(sink.reports.len(), 4);
    let listed: Vec<_> = sink.reports[2..]
        .iter()
        .map(|(r, interactive)| (r.headline.as_str(), r.header, *interactive))
        .collect();
    assert_eq!(
        listed,
        vec![
            (
                "Invalid read of size 8",
                Some(ContextHeader {
                    count: 1,
                    index: 1,
                    total: 2
                }),
                false
            ),
            (
                "Invalid read of size 4",
                Some(ContextHeader {
                    count: 3,
                    index: 2,
                    total: 2
                }),
                false
            ),
        ]
    );

    assert_eq!(sink.used.len(), 1);
    assert_eq!(sink.used[0].name, "leak-in-malloc");
    assert_eq!(sink.used[0].source, "test.supp");
    assert_eq!(sink.used[0].line, 2);
    assert_eq!(
        sink.summaries,
        vec![ErrorSummary {
            errors: 4,
            contexts: 2,
            suppressed: 1,
            suppressed_contexts: 1,
        }]
    );
    assert_eq!(sink.flushes, 1);
}

#[test]
fn test_show_all_errors_quiet_text_prints_summary_only() {
    let mut engine = busy_engine(EngineConfig::default());
    engine.show_all_errors();
    let sink = engine.sink();
    assert_eq!(sink.reports.len(), 2);
    assert!(sink.used.is_empty());
    assert_eq!(sink.summaries.len(), 1);
}

#[test]
fn test_show_all_errors_json_skips_listing() {
    let mut engine = busy_engine(EngineConfig {
        output: OutputFormat::Json,
        verbosity: 2,
        ..EngineConfig::default()
    });
    engine.show_all_errors();
    let sink = engine.sink();
    assert_eq!(sink.reports.len(), 2);
    assert_eq!(sink.used.len(), 1);
    assert_eq!(sink.summaries.len(), 1);
}

#[test]
fn test_show_last_error() {
    let mut engine = new_engine(EngineConfig::default());
    assert!(!engine.show_last_error());

    submit(&mut engine, &[0x20, 0x30], Kind::Read, &Extra::size(4));
    submit(&mut engine, &[0x50, 0x30], Kind::Read, &Extra::size(8));
    submit(&mut engine, &[0x20, 0x30], Kind::Read, &Extra::size(4));

    assert!(engine.show_last_error());
    let (report, interactive) = engine.sink().reports.last().unwrap();
    assert_eq!(report.headline, "Invalid read of size 4");
    assert_eq!(report.count, 2);
    assert!(!interactive);
}

#[test]
fn test_exit_code() {
    let mut engine = new_engine(EngineConfig::default());
    engine.load_suppressions_str("test.supp", LEAK_IN_MALLOC).unwrap();
    assert_eq!(engine.exit_code(42), 0);

    submit(&mut engine, &[0x10, 0x30], Kind::Leak, &Extra::default());
    assert_eq!(engine.exit_code(42), 0);

    submit(&mut engine, &[0x20, 0x30], Kind::Read, &Extra::size(4));
    assert_eq!(engine.exit_code(42), 42);
}

#[test]
fn test_bad_suppressions_are_rejected_whole() {
    let mut engine = new_engine(EngineConfig::default());
    let err = engine
        .load_suppressions_str("bad.supp", "{\n ok\n Memcheck:Leak\n fun:f\n}\n{\n bad\n Memcheck:Nope\n fun:f\n}\n")
        .unwrap_err();
    assert_eq!(err.line(), Some(8));
    assert!(engine.suppressions().is_empty());

    let missing = engine
        .load_suppressions(Path::new("/nonexistent/vigil/default.supp"))
        .unwrap_err();
    assert!(matches!(missing, SuppError::Io { .. }));
}

#[test]
fn test_tool_is_reachable() {
    let engine = new_engine(EngineConfig::default());
    assert_eq!(engine.tool().name(), Memcheck.name());
    assert_eq!(engine.config().backtrace_depth(), 12);
    assert_eq!(engine.summary(), ErrorSummary::default());
}

#[test]
fn test_sink_mut_reaches_sink() {
    let mut engine = new_engine(EngineConfig::default());
    engine.sink_mut().flush();
    assert_eq!(engine.sink().flushes, 1);
}
