//! Example: a signup form driven through the generated dispatch helpers.
//!
//! Run with `RUST_LOG=form_fsm=debug,form_fsm_gen=info` to see the generated
//! machine and every ignored event.

use std::time::Duration;

use form_fsm::{
    FieldConfig, FormConfig, FormHandle, FormMachine, FormSnapshot, RunnerOptions, ValidationRule,
    create_form_machine, spawn,
};
use serde_json::json;

fn config() -> FormConfig {
    let email = FieldConfig::new("email")
        .on_input(
            ValidationRule::new("isNotEmail", |ctx, _| !ctx.value("email").contains('@'))
                .with_message("It is not an email"),
        )
        .on_submit(
            ValidationRule::new("empty", |ctx, _| ctx.value("email").is_empty())
                .with_message("Email should be filled"),
        );

    let password = FieldConfig::new("password")
        .on_input(
            ValidationRule::new("tooShort", |ctx, _| ctx.value("password").len() < 6)
                .with_message("Password too short"),
        )
        .on_submit(
            ValidationRule::new("empty", |ctx, _| ctx.value("password").is_empty())
                .with_message("Password should be filled"),
        );

    let repeat_password = FieldConfig::new("repeatPassword").on_submit(
        ValidationRule::new("passwordMismatch", |ctx, _| {
            ctx.value("password") != ctx.value("repeatPassword")
        })
        .with_message("Password mismatch"),
    );

    FormConfig::new("signup")
        .fields([email, password, repeat_password])
        .submit(|ctx, _| async move {
            // Simulate a round trip to the server
            tokio::time::sleep(Duration::from_millis(50)).await;
            if ctx.value("email") == "test@test.com" {
                Err(json!({ "status": "error", "messages": { "email": "User already exist" } }))
            } else {
                Ok(json!({ "status": "success" }))
            }
        })
        .prepare_async_errors(|_, event| {
            event
                .data()
                .and_then(|data| data.get("messages"))
                .and_then(|messages| serde_json::from_value(messages.clone()).ok())
                .unwrap_or_default()
        })
        .debug(true)
}

fn type_in(machine: &FormMachine, handle: &FormHandle, field: &str, value: &str) {
    if let Some(api) = machine.api.field(field) {
        if let Err(err) = api.on_input(handle, value) {
            tracing::warn!(field, error = %err, "input dropped");
        }
    }
}

fn render(snapshot: &FormSnapshot) {
    for (field, state) in snapshot.context.fields() {
        match &state.error {
            Some(error) => tracing::info!(field, value = %state.value, error = %error, "field"),
            None => tracing::info!(field, value = %state.value, "field"),
        }
    }
    if snapshot.matches("success") {
        tracing::info!("Success");
    }
}

#[tokio::main]
async fn main() {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let machine = create_form_machine(&config()).expect("signup form is well formed");
    let (handle, task) = spawn(&machine, RunnerOptions::default()).expect("machine starts");

    type_in(&machine, &handle, "email", "test@test.com");
    type_in(&machine, &handle, "password", "abc");
    type_in(&machine, &handle, "password", "abcdef");
    type_in(&machine, &handle, "repeatPassword", "abcdef");
    machine.api.submit(&handle, &mut ()).expect("form is running");

    let rejected = handle
        .wait_for(|s| s.context.error("email").is_some())
        .await
        .expect("form is running");
    render(&rejected);

    type_in(&machine, &handle, "email", "someone@test.com");
    machine.api.submit(&handle, &mut ()).expect("form is running");

    let done = handle.wait_for(|s| s.done).await.expect("form is running");
    render(&done);

    match task.await {
        Ok(context) => tracing::info!(context = ?context, "form finished"),
        Err(err) => tracing::error!(error = %err, "form failed"),
    }
}
