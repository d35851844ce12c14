//! Core button state machine
//!
//! Translates raw press/release edges into high-level events. The
//! transition table is a pure function, [`State::step`], returning the
//! next state, the events to emit and what to do with the timer.
//! [`ButtonStateMachine`] applies those effects.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::buttons::{Button, Edge, RawSignal};
use crate::events::HardwareEvent;
use crate::power::DisplayPower;

use super::timer::{MachineInput, Scheduler, TimerToken};

/// Press-and-hold threshold for Home and Sleep
pub const HOLD_INTERVAL: Duration = Duration::from_millis(1500);
/// Time a volume button must be held before autorepeat starts
pub const REPEAT_DELAY: Duration = Duration::from_millis(700);
/// Autorepeat cadence once started
pub const REPEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Volume direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn from_button(button: Button) -> Option<Self> {
        match button {
            Button::VolumeUp => Some(Direction::Up),
            Button::VolumeDown => Some(Direction::Down),
            _ => None,
        }
    }

    fn button(self) -> Button {
        match self {
            Direction::Up => Button::VolumeUp,
            Direction::Down => Button::VolumeDown,
        }
    }

    fn event(self) -> HardwareEvent {
        match self {
            Direction::Up => HardwareEvent::VolumeUp,
            Direction::Down => HardwareEvent::VolumeDown,
        }
    }
}

/// The press that woke the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSource {
    Home,
    Sleep,
}

/// The five states of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// No button held
    #[default]
    Base,
    /// Home held, waiting for release, a combo or the hold timer
    Home,
    /// Sleep held, waiting for release, a combo or the hold timer
    Sleep,
    /// A volume button held; autorepeats once the first delay passes
    Volume { direction: Direction, repeated: bool },
    /// Home or Sleep pressed on a dark display. Behaves like the
    /// corresponding state except that a plain release emits nothing.
    Wake { source: WakeSource },
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Base => write!(f, "Base"),
            State::Home => write!(f, "Home"),
            State::Sleep => write!(f, "Sleep"),
            State::Volume { direction, .. } => write!(f, "Volume({:?})", direction),
            State::Wake { source } => write!(f, "Wake({:?})", source),
        }
    }
}

/// Input to the pure transition function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Signal(RawSignal),
    /// The timer armed by the current state expired
    TimerExpired,
}

impl std::fmt::Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Signal(signal) => write!(f, "{}", signal),
            Input::TimerExpired => write!(f, "timer-expired"),
        }
    }
}

/// What to do with the machine's single timer after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// Leave the current timer running
    Keep,
    /// Cancel the current timer, arm nothing
    Cancel,
    /// Cancel the current timer and arm a new one
    Arm(Duration),
}

/// A signal the current state has no row for
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unexpected {input} in state {state}")]
pub struct UnexpectedSignal {
    pub state: State,
    pub input: Input,
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: State,
    pub events: Vec<HardwareEvent>,
    pub timer: TimerOp,
    pub fault: Option<UnexpectedSignal>,
}

impl Step {
    /// Enter `state`, replacing whatever timer was running with the new
    /// state's own entry timer
    fn enter(state: State, events: Vec<HardwareEvent>) -> Self {
        let timer = match state.entry_timer() {
            Some(delay) => TimerOp::Arm(delay),
            None => TimerOp::Cancel,
        };
        Self {
            state,
            events,
            timer,
            fault: None,
        }
    }

    fn stay(state: State) -> Self {
        Self {
            state,
            events: Vec::new(),
            timer: TimerOp::Keep,
            fault: None,
        }
    }

    fn fault(state: State, input: Input) -> Self {
        Self {
            fault: Some(UnexpectedSignal { state, input }),
            ..Self::enter(State::Base, Vec::new())
        }
    }
}

impl State {
    /// Delay of the timer armed on entry, if any
    pub fn entry_timer(&self) -> Option<Duration> {
        match self {
            State::Base => None,
            State::Home | State::Sleep | State::Wake { .. } => Some(HOLD_INTERVAL),
            State::Volume { .. } => Some(REPEAT_DELAY),
        }
    }

    /// Compute the transition for `input`. The display is only queried on
    /// Home/Sleep presses in Base.
    pub fn step<D: DisplayPower + ?Sized>(self, input: Input, display: &D) -> Step {
        match self {
            State::Base => Self::step_from_base(input, display),
            State::Home => Self::step_from_home(input),
            State::Sleep => Self::step_from_sleep(input),
            State::Volume {
                direction,
                repeated,
            } => Self::step_from_volume(direction, repeated, input),
            State::Wake { source } => Self::step_from_wake(source, input),
        }
    }

    fn step_from_base<D: DisplayPower + ?Sized>(input: Input, display: &D) -> Step {
        let Input::Signal(signal) = input else {
            return Step::fault(State::Base, input);
        };

        match (signal.button, signal.edge) {
            (Button::Home, Edge::Press) if !display.is_display_on() => Step::enter(
                State::Wake {
                    source: WakeSource::Home,
                },
                vec![HardwareEvent::Wake],
            ),
            (Button::Home, Edge::Press) => Step::enter(State::Home, Vec::new()),
            (Button::Sleep, Edge::Press) if !display.is_display_on() => Step::enter(
                State::Wake {
                    source: WakeSource::Sleep,
                },
                vec![HardwareEvent::Wake],
            ),
            (Button::Sleep, Edge::Press) => Step::enter(State::Sleep, Vec::new()),
            (Button::VolumeUp | Button::VolumeDown, Edge::Press) => {
                Step::enter(volume_state(signal.button), Vec::new())
            }
            // Trailing releases after a combo or hold land here
            (_, Edge::Release) => Step::stay(State::Base),
        }
    }

    fn step_from_home(input: Input) -> Step {
        match input {
            Input::TimerExpired => Step::enter(State::Base, vec![HardwareEvent::HoldHome]),
            Input::Signal(signal) => match (signal.button, signal.edge) {
                (Button::Home, Edge::Release) => {
                    Step::enter(State::Base, vec![HardwareEvent::Home])
                }
                (Button::Sleep, Edge::Press) => {
                    Step::enter(State::Base, vec![HardwareEvent::HomeSleep])
                }
                (Button::VolumeUp | Button::VolumeDown, Edge::Press) => {
                    Step::enter(State::Base, vec![HardwareEvent::HomeVolume])
                }
                _ => Step::fault(State::Home, input),
            },
        }
    }

    fn step_from_sleep(input: Input) -> Step {
        match input {
            Input::TimerExpired => Step::enter(State::Base, vec![HardwareEvent::HoldSleep]),
            Input::Signal(signal) => match (signal.button, signal.edge) {
                (Button::Sleep, Edge::Release) => {
                    Step::enter(State::Base, vec![HardwareEvent::Sleep])
                }
                (Button::Home, Edge::Press) => {
                    Step::enter(State::Base, vec![HardwareEvent::HomeSleep])
                }
                (Button::VolumeUp | Button::VolumeDown, Edge::Press) => {
                    Step::enter(volume_state(signal.button), Vec::new())
                }
                _ => Step::fault(State::Sleep, input),
            },
        }
    }

    fn step_from_volume(direction: Direction, repeated: bool, input: Input) -> Step {
        let signal = match input {
            Input::TimerExpired => {
                return Step {
                    state: State::Volume {
                        direction,
                        repeated: true,
                    },
                    events: vec![direction.event()],
                    timer: TimerOp::Arm(REPEAT_INTERVAL),
                    fault: None,
                };
            }
            Input::Signal(signal) => signal,
        };

        match (signal.button, signal.edge) {
            (Button::Home, Edge::Press) => {
                Step::enter(State::Base, vec![HardwareEvent::HomeVolume])
            }
            (Button::Sleep, Edge::Press) => Step::enter(State::Sleep, Vec::new()),
            (button, Edge::Release) if button == direction.button() => {
                let events = if repeated {
                    Vec::new()
                } else {
                    vec![direction.event()]
                };
                Step::enter(State::Base, events)
            }
            _ => Step::stay(State::Volume {
                direction,
                repeated,
            }),
        }
    }

    fn step_from_wake(source: WakeSource, input: Input) -> Step {
        match input {
            Input::TimerExpired => {
                let event = match source {
                    WakeSource::Home => HardwareEvent::HoldHome,
                    WakeSource::Sleep => HardwareEvent::HoldSleep,
                };
                Step::enter(State::Base, vec![event])
            }
            Input::Signal(signal)
                if signal.is_release()
                    && matches!(signal.button, Button::Home | Button::Sleep) =>
            {
                Step::enter(State::Base, Vec::new())
            }
            // Everything else follows the waking button's own rows
            Input::Signal(_) => match source {
                WakeSource::Home => Self::step_from_home(input),
                WakeSource::Sleep => Self::step_from_sleep(input),
            },
        }
    }
}

fn volume_state(button: Button) -> State {
    match Direction::from_button(button) {
        Some(direction) => State::Volume {
            direction,
            repeated: false,
        },
        None => State::Base,
    }
}

struct ArmedTimer<H> {
    handle: H,
    token: TimerToken,
}

/// The state machine that owns the current state and its timer
pub struct ButtonStateMachine<D, S: Scheduler> {
    /// Current state
    state: State,
    /// Display power provider
    display: D,
    /// Timer service
    scheduler: S,
    /// Timer armed by the current state, if any
    timer: Option<ArmedTimer<S::Handle>>,
    /// Last generation handed out
    generation: u64,
    /// Channel for emitting high-level events
    event_tx: broadcast::Sender<HardwareEvent>,
}

impl<D: DisplayPower, S: Scheduler> ButtonStateMachine<D, S> {
    /// Create a new state machine in the Base state
    pub fn new(display: D, scheduler: S, event_tx: broadcast::Sender<HardwareEvent>) -> Self {
        Self {
            state: State::Base,
            display,
            scheduler,
            timer: None,
            generation: 0,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the current state holds an armed timer
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Cancel any armed timer; called once the input source is exhausted
    pub fn stop(&mut self) {
        info!(
            state = %self.state,
            timer_armed = self.has_timer(),
            "button state machine stopped"
        );
        self.cancel_timer();
    }

    /// Process one input to completion
    pub fn process(&mut self, input: MachineInput) {
        let input = match input {
            MachineInput::Signal(signal) => {
                debug!(%signal, state = %self.state, "raw signal");
                Input::Signal(signal)
            }
            MachineInput::TimerFired(token) => {
                match &self.timer {
                    Some(armed) if armed.token == token => {}
                    _ => {
                        debug!(?token, "ignoring stale timer");
                        return;
                    }
                }
                // Single-shot: the handle is spent
                self.timer = None;
                Input::TimerExpired
            }
        };

        let step = self.state.step(input, &self.display);
        self.apply(step);
    }

    fn apply(&mut self, step: Step) {
        if let Some(fault) = step.fault {
            warn!(%fault, "unexpected button signal, resetting to Base");
        }

        match step.timer {
            TimerOp::Keep => {}
            TimerOp::Cancel => self.cancel_timer(),
            TimerOp::Arm(delay) => {
                self.cancel_timer();
                self.arm_timer(delay);
            }
        }

        if step.state != self.state {
            info!(from = %self.state, to = %step.state, "state transition");
        }
        self.state = step.state;

        for event in step.events {
            debug!(%event, "emitting event");
            // No subscribers is fine
            let _ = self.event_tx.send(event);
        }
    }

    fn arm_timer(&mut self, delay: Duration) {
        self.generation += 1;
        let token = TimerToken(self.generation);
        let handle = self.scheduler.schedule(delay, token);
        self.timer = Some(ArmedTimer { handle, token });
    }

    fn cancel_timer(&mut self) {
        if let Some(armed) = self.timer.take() {
            self.scheduler.cancel(armed.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;


    const HOME_PRESS: RawSignal = RawSignal::press(Button::Home);
    const HOME_RELEASE: RawSignal = RawSignal::release(Button::Home);
    const SLEEP_PRESS: RawSignal = RawSignal::press(Button::Sleep);
    const SLEEP_RELEASE: RawSignal = RawSignal::release(Button::Sleep);
    const UP_PRESS: RawSignal = RawSignal::press(Button::VolumeUp);
    const UP_RELEASE: RawSignal = RawSignal::release(Button::VolumeUp);
    const DOWN_PRESS: RawSignal = RawSignal::press(Button::VolumeDown);
    const DOWN_RELEASE: RawSignal = RawSignal::release(Button::VolumeDown);

    #[derive(Default)]
    struct Clock {
        now: u64,
        next_id: u64,
        pending: Vec<(u64, u64, TimerToken)>,
    }

    /// Virtual-clock scheduler; the test advances time by hand
    #[derive(Clone, Default)]
    struct ManualScheduler {
        clock: Rc<RefCell<Clock>>,
    }

    impl Scheduler for ManualScheduler {
        type Handle = u64;

        fn schedule(&mut self, delay: Duration, token: TimerToken) -> u64 {
            let mut clock = self.clock.borrow_mut();
            clock.next_id += 1;
            let id = clock.next_id;
            let deadline = clock.now + delay.as_millis() as u64;
            clock.pending.push((id, deadline, token));
            id
        }

        fn cancel(&mut self, handle: u64) {
            self.clock.borrow_mut().pending.retain(|(id, _, _)| *id != handle);
        }
    }

    struct Harness {
        machine: ButtonStateMachine<bool, ManualScheduler>,
        clock: Rc<RefCell<Clock>>,
        events_rx: broadcast::Receiver<HardwareEvent>,
    }

    impl Harness {
        fn new(display_on: bool) -> Self {
            let (tx, events_rx) = broadcast::channel(64);
            let scheduler = ManualScheduler::default();
            let clock = Rc::clone(&scheduler.clock);
            Self {
                machine: ButtonStateMachine::new(display_on, scheduler, tx),
                clock,
                events_rx,
            }
        }

        fn signal(&mut self, signal: RawSignal) {
            self.machine.process(MachineInput::Signal(signal));
        }

        /// Advance the virtual clock, firing due timers in deadline order
        fn advance(&mut self, ms: u64) {
            let target = self.clock.borrow().now + ms;
            loop {
                let due = {
                    let mut clock = self.clock.borrow_mut();
                    let next = clock
                        .pending
                        .iter()
                        .enumerate()
                        .filter(|(_, (_, deadline, _))| *deadline <= target)
                        .min_by_key(|(_, (_, deadline, _))| *deadline)
                        .map(|(index, _)| index);
                    next.map(|index| {
                        let (_, deadline, token) = clock.pending.remove(index);
                        clock.now = deadline;
                        token
                    })
                };
                match due {
                    Some(token) => self.machine.process(MachineInput::TimerFired(token)),
                    None => break,
                }
            }
            self.clock.borrow_mut().now = target;
        }

        fn pending_timers(&self) -> usize {
            self.clock.borrow().pending.len()
        }

        fn events(&mut self) -> Vec<HardwareEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events_rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    #[test]
    fn test_initial_state() {
        let harness = Harness::new(true);
        assert_eq!(harness.machine.state(), State::Base);
        assert!(!harness.machine.has_timer());
    }

    #[test]
    fn test_step_base_queries_display_only_for_home_and_sleep() {
        let step = State::Base.step(Input::Signal(HOME_PRESS), &false);
        assert_eq!(
            step.state,
            State::Wake {
                source: WakeSource::Home
            }
        );
        assert_eq!(step.events, vec![HardwareEvent::Wake]);
        assert_eq!(step.timer, TimerOp::Arm(HOLD_INTERVAL));

        let step = State::Base.step(Input::Signal(UP_PRESS), &false);
        assert_eq!(
            step.state,
            State::Volume {
                direction: Direction::Up,
                repeated: false
            }
        );
        assert!(step.events.is_empty());
        assert_eq!(step.timer, TimerOp::Arm(REPEAT_DELAY));
    }

    #[test]
    fn test_step_base_ignores_releases() {
        for signal in [HOME_RELEASE, SLEEP_RELEASE, UP_RELEASE, DOWN_RELEASE] {
            let step = State::Base.step(Input::Signal(signal), &true);
            assert_eq!(step, Step::stay(State::Base));
        }
    }

    #[test]
    fn test_step_volume_ignores_opposite_release() {
        let state = State::Volume {
            direction: Direction::Up,
            repeated: false,
        };
        let step = state.step(Input::Signal(DOWN_RELEASE), &true);
        assert_eq!(step, Step::stay(state));

        let step = state.step(Input::Signal(UP_PRESS), &true);
        assert_eq!(step, Step::stay(state));
    }

    #[test]
    fn test_home_tap() {
        let mut h = Harness::new(true);

        h.signal(HOME_PRESS);
        assert_eq!(h.machine.state(), State::Home);
        h.advance(200);
        h.signal(HOME_RELEASE);

        assert_eq!(h.events(), vec![HardwareEvent::Home]);
        assert_eq!(h.machine.state(), State::Base);
        assert_eq!(h.pending_timers(), 0);
    }

    #[test]
    fn test_home_hold() {
        let mut h = Harness::new(true);

        h.signal(HOME_PRESS);
        h.advance(1499);
        assert!(h.events().is_empty());

        h.advance(1);
        assert_eq!(h.events(), vec![HardwareEvent::HoldHome]);
        assert_eq!(h.machine.state(), State::Base);

        h.signal(HOME_RELEASE);
        h.advance(5000);
        assert!(h.events().is_empty());
        assert_eq!(h.machine.state(), State::Base);
    }

    #[test]
    fn test_sleep_tap_and_hold() {
        let mut h = Harness::new(true);

        h.signal(SLEEP_PRESS);
        h.signal(SLEEP_RELEASE);
        assert_eq!(h.events(), vec![HardwareEvent::Sleep]);

        h.signal(SLEEP_PRESS);
        h.advance(1500);
        h.signal(SLEEP_RELEASE);
        assert_eq!(h.events(), vec![HardwareEvent::HoldSleep]);
        assert_eq!(h.machine.state(), State::Base);
    }

    #[test]
    fn test_home_sleep_combo() {
        let mut h = Harness::new(true);

        h.signal(HOME_PRESS);
        h.advance(100);
        h.signal(SLEEP_PRESS);
        assert_eq!(h.events(), vec![HardwareEvent::HomeSleep]);
        assert_eq!(h.machine.state(), State::Base);

        h.signal(HOME_RELEASE);
        h.signal(SLEEP_RELEASE);
        h.advance(3000);
        assert!(h.events().is_empty());
        assert_eq!(h.pending_timers(), 0);
    }

    #[test]
    fn test_sleep_home_combo() {
        let mut h = Harness::new(true);

        h.signal(SLEEP_PRESS);
        h.signal(HOME_PRESS);
        h.signal(SLEEP_RELEASE);
        h.signal(HOME_RELEASE);
        h.advance(3000);

        assert_eq!(h.events(), vec![HardwareEvent::HomeSleep]);
    }

    #[test]
    fn test_home_volume_combo() {
        let mut h = Harness::new(true);
        h.signal(HOME_PRESS);
        h.signal(DOWN_PRESS);
        h.signal(DOWN_RELEASE);
        h.signal(HOME_RELEASE);
        assert_eq!(h.events(), vec![HardwareEvent::HomeVolume]);

        let mut h = Harness::new(true);
        h.signal(UP_PRESS);
        h.advance(300);
        h.signal(HOME_PRESS);
        h.advance(3000);
        assert_eq!(h.events(), vec![HardwareEvent::HomeVolume]);
        assert_eq!(h.machine.state(), State::Base);
    }

    #[test]
    fn test_volume_autorepeat() {
        let mut h = Harness::new(true);

        h.signal(UP_PRESS);
        h.advance(699);
        assert!(h.events().is_empty());

        h.advance(1);
        assert_eq!(h.events(), vec![HardwareEvent::VolumeUp]);

        for _ in 0..3 {
            h.advance(99);
            assert!(h.events().is_empty());
            h.advance(1);
            assert_eq!(h.events(), vec![HardwareEvent::VolumeUp]);
        }

        h.advance(50);
        h.signal(UP_RELEASE);
        assert!(h.events().is_empty());
        assert_eq!(h.machine.state(), State::Base);
        assert_eq!(h.pending_timers(), 0);
    }

    #[test]
    fn test_volume_tap_emits_on_release() {
        let mut h = Harness::new(true);

        h.signal(DOWN_PRESS);
        h.advance(300);
        assert!(h.events().is_empty());

        h.signal(DOWN_RELEASE);
        assert_eq!(h.events(), vec![HardwareEvent::VolumeDown]);

        h.advance(2000);
        assert!(h.events().is_empty());
    }

    #[test]
    fn test_volume_keeps_timer_on_ignored_input() {
        let mut h = Harness::new(true);

        h.signal(UP_PRESS);
        h.advance(400);
        h.signal(DOWN_RELEASE);
        assert!(h.machine.has_timer());

        h.advance(300);
        assert_eq!(h.events(), vec![HardwareEvent::VolumeUp]);
    }

    #[test]
    fn test_volume_to_sleep_arms_fresh_hold_timer() {
        let mut h = Harness::new(true);

        h.signal(DOWN_PRESS);
        h.advance(600);
        h.signal(SLEEP_PRESS);
        assert_eq!(h.machine.state(), State::Sleep);
        assert_eq!(h.pending_timers(), 1);

        // The volume repeat delay would have expired here
        h.advance(200);
        assert!(h.events().is_empty());

        h.advance(1300);
        assert_eq!(h.events(), vec![HardwareEvent::HoldSleep]);
    }

    #[test]
    fn test_sleep_to_volume() {
        let mut h = Harness::new(true);

        h.signal(SLEEP_PRESS);
        h.signal(UP_PRESS);
        assert_eq!(
            h.machine.state(),
            State::Volume {
                direction: Direction::Up,
                repeated: false
            }
        );
        h.signal(UP_RELEASE);
        assert_eq!(h.events(), vec![HardwareEvent::VolumeUp]);

        h.advance(3000);
        assert!(h.events().is_empty());
    }

    #[test]
    fn test_wake_then_hold() {
        let mut h = Harness::new(false);

        h.signal(SLEEP_PRESS);
        assert_eq!(h.events(), vec![HardwareEvent::Wake]);

        h.advance(1500);
        assert_eq!(h.events(), vec![HardwareEvent::HoldSleep]);

        h.signal(SLEEP_RELEASE);
        assert!(h.events().is_empty());
        assert_eq!(h.machine.state(), State::Base);
    }

    #[test]
    fn test_wake_release_is_not_a_tap() {
        let mut h = Harness::new(false);

        h.signal(HOME_PRESS);
        h.advance(300);
        h.signal(HOME_RELEASE);
        h.advance(3000);

        assert_eq!(h.events(), vec![HardwareEvent::Wake]);
        assert_eq!(h.machine.state(), State::Base);
    }

    #[test]
    fn test_wake_delegates_combos() {
        let mut h = Harness::new(false);
        h.signal(HOME_PRESS);
        h.signal(SLEEP_PRESS);
        h.advance(3000);
        assert_eq!(
            h.events(),
            vec![HardwareEvent::Wake, HardwareEvent::HomeSleep]
        );
        assert_eq!(h.machine.state(), State::Base);

        let mut h = Harness::new(false);
        h.signal(SLEEP_PRESS);
        h.signal(DOWN_PRESS);
        assert_eq!(
            h.machine.state(),
            State::Volume {
                direction: Direction::Down,
                repeated: false
            }
        );
        h.advance(700);
        assert_eq!(
            h.events(),
            vec![HardwareEvent::Wake, HardwareEvent::VolumeDown]
        );
    }

    #[test]
    fn test_unexpected_signal_resets_to_base() {
        let cases: [(&[RawSignal], RawSignal); 5] = [
            (&[HOME_PRESS], HOME_PRESS),
            (&[HOME_PRESS], UP_RELEASE),
            (&[SLEEP_PRESS], SLEEP_PRESS),
            (&[SLEEP_PRESS], HOME_RELEASE),
            (&[UP_PRESS, SLEEP_PRESS], SLEEP_PRESS),
        ];

        for (setup, unexpected) in cases {
            let mut h = Harness::new(true);
            for signal in setup {
                h.signal(*signal);
            }
            h.signal(unexpected);

            assert_eq!(h.machine.state(), State::Base);
            assert_eq!(h.pending_timers(), 0);
            h.advance(5000);
            assert!(h.events().is_empty());
        }

        let mut h = Harness::new(false);
        h.signal(HOME_PRESS);
        h.signal(HOME_PRESS);
        assert_eq!(h.machine.state(), State::Base);
        h.advance(5000);
        assert_eq!(h.events(), vec![HardwareEvent::Wake]);
    }

    #[test]
    fn test_unexpected_step_reports_fault() {
        let step = State::Home.step(Input::Signal(HOME_PRESS), &true);
        assert_eq!(step.state, State::Base);
        assert_eq!(step.timer, TimerOp::Cancel);
        assert_eq!(
            step.fault,
            Some(UnexpectedSignal {
                state: State::Home,
                input: Input::Signal(HOME_PRESS),
            })
        );
        assert!(step.events.is_empty());
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let mut h = Harness::new(true);

        h.signal(HOME_PRESS);
        let stale = h.clock.borrow().pending[0].2;
        h.signal(HOME_RELEASE);
        h.signal(HOME_PRESS);
        h.events();

        // Cancelled timer delivered anyway
        h.machine.process(MachineInput::TimerFired(stale));
        assert!(h.events().is_empty());
        assert_eq!(h.machine.state(), State::Home);

        h.signal(HOME_RELEASE);
        assert_eq!(h.events(), vec![HardwareEvent::Home]);
    }

    #[test]
    fn test_stop_cancels_pending_timer() {
        let mut h = Harness::new(true);

        h.signal(UP_PRESS);
        assert_eq!(h.pending_timers(), 1);

        h.machine.stop();
        assert!(!h.machine.has_timer());
        assert_eq!(h.pending_timers(), 0);
        h.advance(2000);
        assert!(h.events().is_empty());
    }
}
