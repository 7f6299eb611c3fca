//! Live sequencer loop.
//!
//! The sequencer runs on its own thread and fires tick `n` at
//! `start + n × period`. Deadlines come from the start instant rather than
//! from the previous wake-up, so oversleeping on one tick never shifts the
//! ticks after it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use dawn_engine::{ChannelBank, PlaybackPosition, Sequencer, TickClock};
use dawn_ir::Song;

/// Longest single sleep, so a stop request is noticed promptly.
const MAX_SLEEP: Duration = Duration::from_millis(10);

/// Playback progress shared with the controller.
#[derive(Debug, Default)]
pub struct PlaybackStatus {
    tick: AtomicU64,
    order_index: AtomicUsize,
    finished: AtomicBool,
}

impl PlaybackStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn publish(&self, position: PlaybackPosition) {
        self.order_index.store(position.order_index, Ordering::Relaxed);
        self.tick.store(position.tick, Ordering::Release);
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Position as last published, with the pattern id looked up in `song`.
    pub fn position(&self, song: &Song) -> PlaybackPosition {
        let tick = self.tick();
        let order_index = self.order_index.load(Ordering::Relaxed);
        PlaybackPosition {
            order_index,
            pattern_id: song.order.get(order_index).copied(),
            tick,
        }
    }
}

/// The live sequencer loop running on its own thread.
pub struct SequencerThread {
    stop_signal: Arc<AtomicBool>,
    status: Arc<PlaybackStatus>,
    thread: Option<JoinHandle<()>>,
}

impl SequencerThread {
    /// Start playing `song` into `bank` on a new thread, from now.
    pub fn spawn(song: Song, bank: Arc<ChannelBank>) -> Self {
        let clock = TickClock::from_song(&song);
        let mut sequencer = Sequencer::new(song);
        let stop_signal = Arc::new(AtomicBool::new(false));
        let status = Arc::new(PlaybackStatus::new());

        let stop = stop_signal.clone();
        let shared = status.clone();
        let thread = std::thread::spawn(move || {
            drive(
                &mut sequencer,
                &bank,
                &clock,
                &stop,
                &shared,
                Instant::now(),
                |deadline| sleep_until(deadline, &stop),
            );
        });

        Self {
            stop_signal,
            status,
            thread: Some(thread),
        }
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    /// Block until the loop exits on its own or through [`stop`](Self::stop).
    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("sequencer thread panicked");
            }
        }
    }

    /// Ask the loop to exit and wait for it.
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::Release);
        self.join();
    }
}

impl Drop for SequencerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `sequencer` until the song ends or `stop` is raised.
///
/// `wait_until` must block until the given instant (or return early if it
/// notices `stop`). The bank is silenced on every exit path.
pub fn drive(
    sequencer: &mut Sequencer,
    bank: &ChannelBank,
    clock: &TickClock,
    stop: &AtomicBool,
    status: &PlaybackStatus,
    start: Instant,
    mut wait_until: impl FnMut(Instant),
) {
    sequencer.start();
    let mut n: u64 = 0;

    while !stop.load(Ordering::Acquire) {
        wait_until(start + clock.offset(n));
        if stop.load(Ordering::Acquire) {
            break;
        }

        sequencer.tick(bank);
        status.publish(sequencer.position());
        n += 1;

        if !sequencer.is_playing() {
            break;
        }
    }

    sequencer.stop(bank);
    status.finished.store(true, Ordering::Release);
    tracing::debug!(ticks = n, "playback: sequencer loop exited");
}

/// Sleep until `deadline` in short steps, returning early once `stop` is set.
pub fn sleep_until(deadline: Instant, stop: &AtomicBool) {
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(MAX_SLEEP));
    }
}
