use form_fsm::{
    Event, FieldConfig, FormConfig, Interpreter, Outcome, StatePath, SubmitPolicy, ValidationRule,
    create_form_machine,
};
use proptest::prelude::*;
use serde_json::json;

fn signup() -> FormConfig {
    FormConfig::new("signup")
        .field(
            FieldConfig::new("email")
                .on_input(
                    ValidationRule::new("isNotEmail", |ctx, _| !ctx.value("email").contains('@'))
                        .with_message("It is not an email"),
                )
                .on_submit(
                    ValidationRule::new("empty", |ctx, _| ctx.value("email").is_empty())
                        .with_message("Email should be filled"),
                ),
        )
        .field(
            FieldConfig::new("password")
                .on_input(
                    ValidationRule::new("empty", |ctx, _| ctx.value("password").is_empty())
                        .with_message("Password should be filled"),
                )
                .on_input(
                    ValidationRule::new("tooShort", |ctx, _| ctx.value("password").len() < 6)
                        .with_message("Password too short"),
                )
                .on_submit(ValidationRule::new("empty", |ctx, _| {
                    ctx.value("password").is_empty()
                })),
        )
        .field(FieldConfig::new("repeatPassword").on_submit(
            ValidationRule::new("passwordMismatch", |ctx, _| {
                ctx.value("password") != ctx.value("repeatPassword")
            })
            .with_message("Password mismatch"),
        ))
        .submit(|_, _| async { Ok::<_, serde_json::Value>(json!({ "status": "success" })) })
}

fn start(config: &FormConfig) -> Interpreter {
    let machine = create_form_machine(config).unwrap();
    Interpreter::new(&machine).unwrap()
}

fn fill(form: &mut Interpreter, email: &str, password: &str, repeat: &str) {
    for (field, value) in [("email", email), ("password", password), ("repeatPassword", repeat)] {
        form.send(&Event::input(field, value)).unwrap();
    }
}

#[test]
fn starts_with_every_field_valid() {
    let form = start(&signup());
    assert!(form.matches("draft"));
    assert_eq!(
        form.active_states(),
        vec![
            StatePath::parse("draft.email.valid"),
            StatePath::parse("draft.password.valid"),
            StatePath::parse("draft.repeatPassword.valid"),
        ]
    );
    assert!(!form.is_done());
    assert!(form.invoking().is_none());
}

#[test]
fn valid_input_sets_value_only_for_its_field() {
    let mut form = start(&signup());

    let outcome = form.send(&Event::input("email", "a@b.c")).unwrap();
    assert_eq!(outcome, Outcome::Transitioned);
    assert!(form.matches("draft.email.valid"));
    assert_eq!(form.context().value("email"), "a@b.c");
    assert_eq!(form.context().error("email"), None);

    let password = form.context().field("password").unwrap();
    assert_eq!(password.value, "");
    assert_eq!(password.error, None);
}

#[test]
fn first_declared_validation_wins() {
    let mut form = start(&signup());

    form.send(&Event::input("password", "")).unwrap();
    assert!(form.matches("draft.password.invalid.input.empty"));
    assert!(!form.matches("draft.password.invalid.input.tooShort"));
    assert_eq!(form.context().error("password"), Some("Password should be filled"));

    form.send(&Event::input("password", "abc")).unwrap();
    assert!(form.matches("draft.password.invalid.input.tooShort"));
    assert_eq!(form.context().error("password"), Some("Password too short"));

    form.send(&Event::input("password", "abcdef")).unwrap();
    assert!(form.matches("draft.password.valid"));
    assert_eq!(form.context().error("password"), None);
    assert_eq!(form.context().value("password"), "abcdef");
}

#[test]
fn input_error_does_not_touch_other_fields() {
    let mut form = start(&signup());
    form.send(&Event::input("password", "abcdef")).unwrap();
    form.send(&Event::input("email", "nope")).unwrap();

    assert!(form.matches("draft.email.invalid.input.isNotEmail"));
    assert!(form.matches("draft.password.valid"));
    assert_eq!(form.context().value("password"), "abcdef");
    assert_eq!(form.context().error("password"), None);
}

#[test]
fn independent_submit_sets_field_errors_and_leaves_draft() {
    let mut form = start(&signup());

    form.send(&Event::Submit).unwrap();

    assert!(form.matches("submit"));
    assert!(!form.matches("draft"));
    assert_eq!(form.context().error("email"), Some("Email should be filled"));
    assert_eq!(form.context().error("password"), Some("Error in password -> empty"));
    assert_eq!(form.context().error("repeatPassword"), None);

    let request = form.take_service_request().unwrap();
    assert_eq!(request.src, "submit");
    assert_eq!(request.event, Event::Submit);
    assert_eq!(&request.context, form.context());
    assert!(form.take_service_request().is_none());
}

#[test]
fn blocking_submit_stays_in_draft_until_fields_pass() {
    let mut form = start(&signup().submit_policy(SubmitPolicy::BlockOnFieldErrors));

    form.send(&Event::Submit).unwrap();
    assert!(form.matches("draft.email.invalid.submit.empty"));
    assert!(form.matches("draft.password.invalid.submit.empty"));
    assert!(form.matches("draft.repeatPassword.valid"));
    assert!(form.take_service_request().is_none());

    fill(&mut form, "a@b.c", "abcdef", "abcdef");
    form.send(&Event::Submit).unwrap();
    assert!(form.matches("submit"));
    assert_eq!(form.invoking(), Some(&StatePath::parse("submit")));
}

#[test]
fn rejected_submit_routes_errors_to_fields() {
    let mut form = start(&signup());
    fill(&mut form, "taken@b.c", "abc", "abc");
    assert_eq!(form.context().error("password"), Some("Password too short"));

    form.send(&Event::Submit).unwrap();
    assert!(form.take_service_request().is_some());

    form.send(&Event::SubmitError(json!({ "errors": { "email": "User already exist" } })))
        .unwrap();

    assert!(form.matches("draft.email.invalid.async"));
    assert_eq!(form.context().error("email"), Some("User already exist"));
    assert!(form.matches("draft.password.valid"));
    assert_eq!(form.context().error("password"), None);
    assert_eq!(form.context().value("password"), "abc");
    assert!(form.matches("draft.repeatPassword.valid"));
    assert!(form.invoking().is_none());
}

#[test]
fn generic_failure_clears_every_field() {
    let mut form = start(&signup());
    fill(&mut form, "a@b.c", "abcdef", "abcdef");
    form.send(&Event::Submit).unwrap();

    form.send(&Event::SubmitError(json!({ "errors": { "form": "Service unavailable" } })))
        .unwrap();

    assert!(form.matches("draft"));
    for (field, state) in form.context().fields() {
        assert_eq!(state.error, None, "{field}");
    }
    assert_eq!(
        form.context().async_errors().get("form").map(String::as_str),
        Some("Service unavailable")
    );
}

#[test]
fn custom_async_error_mapping() {
    let config = signup().prepare_async_errors(|_, event| {
        event
            .data()
            .and_then(|data| data.get("messages"))
            .and_then(|messages| serde_json::from_value(messages.clone()).ok())
            .unwrap_or_default()
    });
    let mut form = start(&config);
    fill(&mut form, "a@b.c", "abcdef", "abcdef");
    form.send(&Event::Submit).unwrap();
    form.send(&Event::SubmitError(json!({ "messages": { "password": "Too common" } })))
        .unwrap();

    assert!(form.matches("draft.password.invalid.async"));
    assert_eq!(form.context().error("password"), Some("Too common"));
}

#[test]
fn resolved_submit_is_final() {
    let mut form = start(&signup());
    fill(&mut form, "a@b.c", "abcdef", "abcdef");
    form.send(&Event::Submit).unwrap();
    form.send(&Event::SubmitDone(json!({ "status": "success" }))).unwrap();

    assert!(form.matches("success"));
    assert!(form.is_done());
    assert!(form.snapshot().done);

    let outcome = form.send(&Event::input("email", "x@y.z")).unwrap();
    assert_eq!(outcome, Outcome::Ignored);
    assert_eq!(form.into_context().value("email"), "a@b.c");
}

#[test]
fn unhandled_events_are_ignored() {
    let mut form = start(&signup());
    assert_eq!(form.send(&Event::input("nickname", "x")).unwrap(), Outcome::Ignored);
    assert_eq!(form.send(&Event::SubmitDone(json!(null))).unwrap(), Outcome::Ignored);

    form.send(&Event::Submit).unwrap();
    assert_eq!(form.send(&Event::input("email", "a@b.c")).unwrap(), Outcome::Ignored);
    assert_eq!(form.send(&Event::Submit).unwrap(), Outcome::Ignored);
    assert!(form.matches("submit"));
}

#[test]
fn snapshot_matches_by_prefix() {
    let mut form = start(&signup());
    form.send(&Event::input("email", "nope")).unwrap();

    let snapshot = form.snapshot();
    assert!(snapshot.matches("draft"));
    assert!(snapshot.matches("draft.email.invalid"));
    assert!(snapshot.matches("draft.email.invalid.input.isNotEmail"));
    assert!(!snapshot.matches("draft.email.valid"));
    assert!(!snapshot.matches("success"));
}

fn overlapping(rules: usize, first_failing: usize) -> FormConfig {
    let field = (0..rules).fold(FieldConfig::new("code"), |field, i| {
        let fails = i >= first_failing;
        field
            .on_input(
                ValidationRule::new(format!("input{i}"), move |_, _| fails)
                    .with_message(format!("input #{i}")),
            )
            .on_submit(
                ValidationRule::new(format!("submit{i}"), move |_, _| fails)
                    .with_message(format!("submit #{i}")),
            )
    });
    FormConfig::new("overlap")
        .field(field)
        .submit(|_, _| async { Ok::<_, serde_json::Value>(json!(null)) })
}

proptest! {
    #[test]
    fn earliest_failing_validation_wins(
        (rules, first_failing) in (1usize..6).prop_flat_map(|n| (Just(n), 0..n)),
    ) {
        let mut form = start(&overlapping(rules, first_failing));

        form.send(&Event::input("code", "x")).unwrap();
        let input_state = format!("draft.code.invalid.input.input{first_failing}");
        let input_error = format!("input #{first_failing}");
        prop_assert!(form.matches(&input_state));
        prop_assert_eq!(form.context().error("code"), Some(input_error.as_str()));

        let blocking =
            overlapping(rules, first_failing).submit_policy(SubmitPolicy::BlockOnFieldErrors);
        let mut form = start(&blocking);
        form.send(&Event::Submit).unwrap();
        let submit_state = format!("draft.code.invalid.submit.submit{first_failing}");
        let submit_error = format!("submit #{first_failing}");
        prop_assert!(form.matches(&submit_state));
        prop_assert_eq!(form.context().error("code"), Some(submit_error.as_str()));
    }
}
