//! Behavioural tests for establishing the host channel.

use std::cell::RefCell;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use qga_config::{ChannelEndpoint, TransportMethod};

use crate::channel::{Channel, ChannelError, ChannelState, DialOutcome, DialPolicy};

type StepResult = Result<(), String>;

struct ChannelWorld {
    dir: TempDir,
    channel: Option<Channel>,
    creator: Option<thread::JoinHandle<()>>,
    close_after: Option<Duration>,
    outcome: Option<Result<DialOutcome, ChannelError>>,
    elapsed: Duration,
}

impl ChannelWorld {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            channel: None,
            creator: None,
            close_after: None,
            outcome: None,
            elapsed: Duration::ZERO,
        }
    }

    fn port_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("org.qemu.guest_agent.0"))
            .expect("utf8 path")
    }

    fn use_virtio_port(&mut self) {
        let endpoint = ChannelEndpoint::new(TransportMethod::VirtioSerial, self.port_path());
        self.channel = Some(Channel::new(endpoint).expect("channel"));
    }

    fn create_port_after(&mut self, delay: Duration) {
        let path = self.port_path();
        self.creator = Some(thread::spawn(move || {
            thread::sleep(delay);
            std::fs::write(path, b"").expect("create port");
        }));
    }

    fn dial(&mut self, budget: Duration) {
        let channel = self.channel.as_mut().expect("channel configured");
        let trigger = self.close_after.map(|delay| {
            let closer = channel.closer();
            thread::spawn(move || {
                thread::sleep(delay);
                closer.close();
            })
        });
        let policy = DialPolicy::new(budget)
            .with_backoff(Duration::from_millis(5), Duration::from_millis(50));
        let started = Instant::now();
        self.outcome = Some(channel.dial(&policy));
        self.elapsed = started.elapsed();
        if let Some(trigger) = trigger {
            trigger.join().expect("close trigger");
        }
        if let Some(creator) = self.creator.take() {
            creator.join().expect("port creator");
        }
    }

    fn state(&self) -> ChannelState {
        self.channel.as_ref().expect("channel configured").state()
    }
}

#[fixture]
fn world() -> RefCell<ChannelWorld> {
    RefCell::new(ChannelWorld::new())
}

#[given("a virtio port that never appears")]
fn given_missing_port(world: &RefCell<ChannelWorld>) {
    world.borrow_mut().use_virtio_port();
}

#[given("a virtio port that appears after {millis} milliseconds")]
fn given_late_port(world: &RefCell<ChannelWorld>, millis: u64) {
    let mut world = world.borrow_mut();
    world.use_virtio_port();
    world.create_port_after(Duration::from_millis(millis));
}

#[given("a close is requested after {millis} milliseconds")]
fn given_close_request(world: &RefCell<ChannelWorld>, millis: u64) {
    world.borrow_mut().close_after = Some(Duration::from_millis(millis));
}

#[when("the agent dials for {millis} milliseconds")]
fn when_dials(world: &RefCell<ChannelWorld>, millis: u64) {
    world.borrow_mut().dial(Duration::from_millis(millis));
}

#[then("the dial times out after retrying")]
fn then_times_out(world: &RefCell<ChannelWorld>) -> StepResult {
    let world = world.borrow();
    match world.outcome.as_ref().ok_or("dial never ran")? {
        Err(ChannelError::ConnectTimeout { attempts, .. }) if *attempts > 1 => Ok(()),
        other => Err(format!("expected a timeout after retries, got {other:?}")),
    }
}

#[then("the dial is aborted by the close request")]
fn then_aborted(world: &RefCell<ChannelWorld>) -> StepResult {
    let world = world.borrow();
    match world.outcome.as_ref().ok_or("dial never ran")? {
        Err(ChannelError::Closed { .. }) => Ok(()),
        other => Err(format!("expected a closed error, got {other:?}")),
    }
}

#[then("the dial succeeds")]
fn then_succeeds(world: &RefCell<ChannelWorld>) -> StepResult {
    let world = world.borrow();
    match world.outcome.as_ref().ok_or("dial never ran")? {
        Ok(outcome) if outcome.attempts > 1 => Ok(()),
        other => Err(format!("expected success after retries, got {other:?}")),
    }
}

#[then("the dial returned within {millis} milliseconds")]
fn then_returned_within(world: &RefCell<ChannelWorld>, millis: u64) -> StepResult {
    let elapsed = world.borrow().elapsed;
    if elapsed <= Duration::from_millis(millis) {
        Ok(())
    } else {
        Err(format!("dial took {elapsed:?}"))
    }
}

#[then("the channel holds no descriptor")]
fn then_unconnected(world: &RefCell<ChannelWorld>) {
    assert_eq!(world.borrow().state(), ChannelState::Unconnected);
}

#[then("the channel is connected")]
fn then_connected(world: &RefCell<ChannelWorld>) {
    assert_eq!(world.borrow().state(), ChannelState::Connected);
}

#[then("the channel is closed")]
fn then_closed(world: &RefCell<ChannelWorld>) {
    assert_eq!(world.borrow().state(), ChannelState::Closed);
}

#[scenario(path = "tests/features/channel_dial.feature")]
fn channel_dial(world: RefCell<ChannelWorld>) -> Result<(), String> {
    let _ = world;
    Ok(())
}
