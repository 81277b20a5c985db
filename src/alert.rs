//! Alert side effects.
//!
//! Motion alerts go to an `AlertDispatcher`, which queues them (bounded,
//! non-blocking) for a background worker thread that drives the emitters.
//! A slow or failing sound backend cannot stall frame capture: when the
//! queue is full the event is dropped and counted.
//!
//! Cascade alerts skip the queue. The loop calls a `ConsoleEmitter`
//! directly, once per detected box.

use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::AlertSettings;
use crate::overlay::{ANIMAL_LABEL, MOTION_LABEL};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Motion,
    Animal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub frame_index: u64,
    /// Boxes that triggered the alert.
    pub regions: usize,
}

impl AlertEvent {
    pub fn message(&self) -> &'static str {
        match self.kind {
            AlertKind::Motion => MOTION_LABEL,
            AlertKind::Animal => ANIMAL_LABEL,
        }
    }
}

/// One way of telling a human something was seen.
pub trait AlertEmitter: Send {
    fn name(&self) -> &'static str;

    /// Deliver the alert. Runs on the dispatcher thread, or on the loop
    /// thread for cascade console alerts.
    fn emit(&mut self, event: &AlertEvent) -> Result<()>;
}

/// Prints `⚠️ <message>` to stdout.
#[derive(Debug, Default)]
pub struct ConsoleEmitter;

impl AlertEmitter for ConsoleEmitter {
    fn name(&self) -> &'static str {
        "console"
    }

    fn emit(&mut self, event: &AlertEvent) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "⚠️ {}", event.message())?;
        out.flush()?;
        Ok(())
    }
}

/// Rings the terminal bell.
#[derive(Debug, Default)]
pub struct BellEmitter;

impl AlertEmitter for BellEmitter {
    fn name(&self) -> &'static str {
        "bell"
    }

    fn emit(&mut self, _event: &AlertEvent) -> Result<()> {
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

/// Runs an external player, e.g. `aplay alarm.wav`, and waits for it.
#[derive(Debug, Clone)]
pub struct CommandEmitter {
    program: String,
    args: Vec<String>,
}

impl CommandEmitter {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("sound command must not be empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl AlertEmitter for CommandEmitter {
    fn name(&self) -> &'static str {
        "command"
    }

    fn emit(&mut self, _event: &AlertEvent) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("spawn sound command {}", self.program))?;
        if !status.success() {
            return Err(anyhow!(
                "sound command {} exited with {}",
                self.program,
                status
            ));
        }
        Ok(())
    }
}

/// Delivery counters shared with the worker thread.
#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub queued: u64,
    pub dropped: u64,
    /// Emitter calls that succeeded.
    pub delivered: u64,
    /// Emitter calls that returned an error.
    pub failed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    /// Queue full or worker gone; the alert was not delivered.
    Dropped,
}

/// Bounded fire-and-forget queue in front of a worker thread.
pub struct AlertDispatcher {
    sender: Option<SyncSender<AlertEvent>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl AlertDispatcher {
    pub fn new(emitters: Vec<Box<dyn AlertEmitter>>, queue_depth: usize) -> Result<Self> {
        if queue_depth == 0 {
            return Err(anyhow!("alert queue depth must be at least 1"));
        }
        let (sender, receiver) = mpsc::sync_channel::<AlertEvent>(queue_depth);
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);
        let mut emitters = emitters;

        let worker = thread::Builder::new()
            .name("alert-worker".to_string())
            .spawn(move || {
                for event in receiver {
                    for emitter in emitters.iter_mut() {
                        match emitter.emit(&event) {
                            Ok(()) => {
                                worker_counters.delivered.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(err) => {
                                worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                                log::warn!("alert emitter {} failed: {:#}", emitter.name(), err);
                            }
                        }
                    }
                }
            })
            .context("spawn alert worker")?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            counters,
        })
    }

    /// Dispatcher wired from config: console line, optional bell, optional command.
    pub fn from_settings(settings: &AlertSettings) -> Result<Self> {
        let mut emitters: Vec<Box<dyn AlertEmitter>> = vec![Box::new(ConsoleEmitter)];
        if settings.bell {
            emitters.push(Box::new(BellEmitter));
        }
        if let Some(command) = &settings.sound_command {
            emitters.push(Box::new(CommandEmitter::new(command)?));
        }
        Self::new(emitters, settings.queue_depth)
    }

    /// Queue an alert without blocking.
    pub fn dispatch(&self, event: AlertEvent) -> DispatchOutcome {
        let Some(sender) = &self.sender else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return DispatchOutcome::Dropped;
        };
        match sender.try_send(event) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::Queued
            }
            Err(TrySendError::Full(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "alert queue full, dropping {:?} alert for frame {}",
                    event.kind,
                    event.frame_index
                );
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("alert worker is gone, dropping alert");
                DispatchOutcome::Dropped
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting alerts, let the worker drain the queue, and join it.
    pub fn shutdown(&mut self) -> DispatchStats {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("alert worker panicked");
            }
        }
        self.stats()
    }
}

impl Drop for AlertDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
