//! Behavioural tests for the agent bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::commands::{GUEST_INFO, GUEST_PING, GUEST_SYNC};

use super::support::{self, HealthEvent, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_successful_loader(&[]);
}

#[given("a configuration loader blacklisting {entries}")]
fn given_blacklisting_loader(world: &RefCell<TestWorld>, entries: String) {
    let entries: Vec<&str> = entries.split(',').collect();
    world.borrow_mut().use_successful_loader(&entries);
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[when("the agent bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    assert!(world.agent().is_some(), "agent should have been built");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    assert!(
        world.borrow().bootstrap_error().is_some(),
        "bootstrap succeeded unexpectedly"
    );
}

#[then("the built-in commands are registered")]
fn then_builtins_registered(world: &RefCell<TestWorld>) -> StepResult {
    let world = world.borrow();
    let agent = world.agent().ok_or("agent missing")?;
    for name in [GUEST_INFO, GUEST_PING, GUEST_SYNC] {
        agent
            .registry()
            .lookup(name)
            .map_err(|error| error.to_string())?;
    }
    Ok(())
}

#[then("{command} is disabled")]
fn then_command_disabled(world: &RefCell<TestWorld>, command: String) -> StepResult {
    let world = world.borrow();
    let agent = world.agent().ok_or("agent missing")?;
    if agent.registry().is_blacklisted(&command) {
        Ok(())
    } else {
        Err(format!("{command} should be blacklisted"))
    }
}

#[then("a command listing is requested")]
fn then_listing_requested(world: &RefCell<TestWorld>) -> StepResult {
    let world = world.borrow();
    let agent = world.agent().ok_or("agent missing")?;
    if !agent.listing_requested() {
        return Err("listing flag not detected".to_owned());
    }
    let mut out = Vec::new();
    agent
        .write_command_list(&mut out)
        .map_err(|error| error.to_string())?;
    let listing = String::from_utf8(out).map_err(|error| error.to_string())?;
    let names: Vec<&str> = listing.lines().collect();
    if names == [GUEST_INFO, GUEST_PING, GUEST_SYNC] {
        Ok(())
    } else {
        Err(format!("unexpected listing: {names:?}"))
    }
}

#[then("the failure is a command-line error")]
fn then_cli_error(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let error = world.bootstrap_error().expect("bootstrap error missing");
    assert!(error.cli_error().is_some(), "unexpected error: {error}");
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(path = "tests/features/agent_bootstrap.feature")]
fn agent_bootstrap(world: RefCell<TestWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}
