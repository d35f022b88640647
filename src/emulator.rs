//! The execution engine.
//!
//! Running an emulator starts three periodic activities on their own
//! threads: the CPU loop (a batch of instructions per tick, then sleep out
//! the tick) and one tick loop per timer. They share nothing but the mutexed
//! timer/display/keypad handles, a cancellation token they all poll at their
//! scheduling points, and the outbound event channel. A fatal handler error
//! is reported exactly once and fans out as cancellation to the other loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use display::{self, SharedDisplay};
use keypad::Keypad;
use timer::AsyncTimer;
use vm::Vm;
use Error;

/// The configuration surface the core consumes. Cycle rate and batch size
/// are passed to [`Emulator::run`] instead; they belong to one run, not to
/// the machine.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Tick rate shared by the delay and sound timers, in Hz.
    pub timer_tick_rate: u32,
    pub screen_width: usize,
    pub screen_height: usize,
}

impl Default for EmulatorConfig {
    fn default() -> EmulatorConfig {
        EmulatorConfig {
            timer_tick_rate: 60,
            screen_width: display::DEFAULT_WIDTH,
            screen_height: display::DEFAULT_HEIGHT,
        }
    }
}

/// Outbound notifications. The core pushes these over a channel and assumes
/// nothing about who renders, beeps or logs on the other end.
#[derive(Debug)]
pub enum Event {
    /// A draw happened since the last delay-timer tick.
    DisplayUpdated,
    /// The sound timer is active; a tone of the given duration is wanted.
    ToneRequested(Duration),
    /// An unrecoverable error stopped the run.
    Faulted(Error),
}

/// Cooperative cancellation signal shared by all three loops.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to a running emulator's threads.
pub struct RunHandle {
    cancel: CancelToken,
    threads: Vec<thread::JoinHandle<()>>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for all three loops to observe cancellation and stop.
    pub fn join(self) {
        for thread in self.threads {
            let _ = thread.join();
        }
    }
}

pub struct Emulator {
    vm: Vm,
    display: SharedDisplay,
    keypad: Keypad,
    delay: AsyncTimer,
    sound: AsyncTimer,
    events: Sender<Event>,
}

impl Emulator {
    /// Builds an idle machine and hands back the receiving end of its event
    /// channel.
    pub fn new(config: &EmulatorConfig) -> (Emulator, Receiver<Event>) {
        let (events, events_rx) = mpsc::channel();
        let display = SharedDisplay::new(config.screen_width, config.screen_height);
        let keypad = Keypad::new();
        let delay = AsyncTimer::new(config.timer_tick_rate);
        let sound = AsyncTimer::new(config.timer_tick_rate);
        let vm = Vm::new(
            display.clone(),
            keypad.clone(),
            delay.clone(),
            sound.clone(),
        );

        let emulator = Emulator {
            vm: vm,
            display: display,
            keypad: keypad,
            delay: delay,
            sound: sound,
            events: events,
        };
        (emulator, events_rx)
    }

    /// Loads a program image into user space. May be called again to re-arm
    /// an idle machine.
    pub fn load_program(&mut self, program: &[u8]) {
        self.vm.load(program);
    }

    /// Handle for render collaborators; read through snapshots only.
    pub fn display(&self) -> SharedDisplay {
        self.display.clone()
    }

    /// Handle for the host's input loop.
    pub fn keypad(&self) -> Keypad {
        self.keypad.clone()
    }

    /// Starts the CPU loop and both timer loops. Runs until cancelled or
    /// faulted; there is no resume, a fresh instance is needed afterwards.
    pub fn run(
        self,
        cycles_per_second: u32,
        operations_per_cycle: u32,
        cancel: CancelToken,
    ) -> RunHandle {
        let Emulator {
            mut vm,
            delay,
            sound,
            events,
            ..
        } = self;

        let mut threads = Vec::new();

        {
            let cancel = cancel.clone();
            let events = events.clone();
            let cycle_period = Duration::from_secs(1) / cycles_per_second;
            threads.push(thread::spawn(move || {
                debug!(
                    "cpu loop: {} cycles/s, {} instructions per cycle",
                    cycles_per_second, operations_per_cycle
                );
                'running: while !cancel.is_cancelled() {
                    let cycle_start = Instant::now();
                    for _ in 0..operations_per_cycle {
                        if let Err(e) = vm.cycle() {
                            error!("fatal fault: {}", e);
                            let _ = events.send(Event::Faulted(e));
                            cancel.cancel();
                            break 'running;
                        }
                    }
                    if let Some(left) = cycle_period.checked_sub(cycle_start.elapsed()) {
                        thread::sleep(left);
                    }
                }
                debug!("cpu loop stopped");
            }));
        }

        {
            let cancel = cancel.clone();
            let events = events.clone();
            threads.push(thread::spawn(move || {
                let period = delay.tick_period();
                while !cancel.is_cancelled() {
                    let tick = delay.tick();
                    if tick.action_requested {
                        delay.set_action_requested(false);
                        let _ = events.send(Event::DisplayUpdated);
                    }
                    thread::sleep(period);
                }
                debug!("delay timer loop stopped");
            }));
        }

        {
            let cancel = cancel.clone();
            threads.push(thread::spawn(move || {
                let period = sound.tick_period();
                while !cancel.is_cancelled() {
                    let tick = sound.tick();
                    if tick.action_requested {
                        if tick.counter > 0 {
                            let duration = period * tick.counter as u32;
                            let _ = events.send(Event::ToneRequested(duration));
                        } else {
                            sound.set_action_requested(false);
                        }
                    }
                    thread::sleep(period);
                }
                debug!("sound timer loop stopped");
            }));
        }

        RunHandle {
            cancel: cancel,
            threads: threads,
        }
    }
}
