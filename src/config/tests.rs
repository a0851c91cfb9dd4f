use super::*;

use serial_test::serial;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.cache.stale_after, None);
    assert_eq!(settings.dispatch.unknown_action, UnknownActionPolicy::Ignore);
    assert_eq!(settings.motion.reduce_motion, MotionSetting::Unset);
    assert!(!settings.motion.system_reduced_motion);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.cache.stale_after_ms = Some(60_000);
    raw.dispatch.unknown_action = Some("warn".to_string());

    let overrides = Overrides {
        log_level: Some("debug".to_string()),
        stale_after_ms: Some(250),
        unknown_action: Some("Reject".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.stale_after, Some(Duration::from_millis(250)));
    assert_eq!(settings.dispatch.unknown_action, UnknownActionPolicy::Reject);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_stale_age_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.stale_after_ms = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero age is invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.stale_after_ms",
            ..
        }
    ));
}

#[test]
fn invalid_values_name_their_key() {
    let mut raw = RawSettings::default();
    raw.dispatch.unknown_action = Some("explode".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown policy");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "dispatch.unknown_action",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.motion.reduce_motion = Some("sometimes".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown motion value");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "motion.reduce_motion",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn motion_setting_is_parsed() {
    let mut raw = RawSettings::default();
    raw.motion.reduce_motion = Some("on".to_string());
    raw.motion.system_reduced_motion = Some(true);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.motion.reduce_motion, MotionSetting::On);
    assert!(settings.motion.system_reduced_motion);
}

#[test]
#[serial]
fn environment_overrides_files_and_cli_overrides_environment() {
    // SAFETY: serialised with the other environment tests; nothing else in
    // this process reads the variable concurrently.
    unsafe { std::env::set_var("RECOLLECT__CACHE__STALE_AFTER_MS", "1500") };

    let from_env = load(&CliArgs::parse_from(["recollect"]));
    let from_cli = load(&CliArgs::parse_from(["recollect", "--stale-after-ms", "200"]));

    unsafe { std::env::remove_var("RECOLLECT__CACHE__STALE_AFTER_MS") };

    assert_eq!(
        from_env.expect("env settings").cache.stale_after,
        Some(Duration::from_millis(1500))
    );
    assert_eq!(
        from_cli.expect("cli settings").cache.stale_after,
        Some(Duration::from_millis(200))
    );
}

#[test]
fn default_command_is_taxonomy() {
    let args = CliArgs::parse_from(["recollect"]);
    assert!(args.command.is_none());
}

#[test]
fn parse_key_arguments() {
    let args = CliArgs::parse_from([
        "recollect",
        "key",
        "cards.paginated",
        "42",
        "1",
        "20",
        "--display",
    ]);

    match args.command.expect("key command") {
        Command::Key(key) => {
            assert_eq!(key.builder, "cards.paginated");
            assert_eq!(key.args, vec!["42", "1", "20"]);
            assert!(key.display);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_prefetch_arguments() {
    let args = CliArgs::parse_from([
        "recollect",
        "prefetch",
        "/decks/3?page=1",
        "--loads",
        "4",
        "--latency-ms",
        "25",
        "--unknown-action",
        "warn",
    ]);

    assert_eq!(args.overrides.unknown_action.as_deref(), Some("warn"));
    match args.command.expect("prefetch command") {
        Command::Prefetch(prefetch) => {
            assert_eq!(
                prefetch.route,
                Route::Deck {
                    deck_id: 3,
                    page: Some(1),
                }
            );
            assert_eq!(prefetch.loads, 4);
            assert_eq!(prefetch.latency_ms, 25);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn malformed_route_is_a_parse_error() {
    assert!(CliArgs::try_parse_from(["recollect", "prefetch", "/decks/three"]).is_err());
}

#[test]
fn parse_draft_and_motion_arguments() {
    let args = CliArgs::parse_from(["recollect", "draft", "set_front=猫", "swap_sides"]);
    match args.command.expect("draft command") {
        Command::Draft(draft) => assert_eq!(draft.actions, vec!["set_front=猫", "swap_sides"]),
        _ => panic!("wrong command parsed"),
    }

    let args = CliArgs::parse_from(["recollect", "motion", "--set", "off"]);
    match args.command.expect("motion command") {
        Command::Motion(motion) => assert_eq!(motion.set, Some(MotionSetting::Off)),
        _ => panic!("wrong command parsed"),
    }
}
