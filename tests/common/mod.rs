//! Shared fixtures: components and a surface that mirrors what it is told to show.
#![allow(dead_code)]

use list_reconciler::{ApplyCompletion, Cell, Component, List, RenderSurface, Section, SurfaceUpdate};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
pub struct DummyComponent;

impl Component for DummyComponent {
    type ViewModel = ();

    fn view_model(&self) -> &() {
        &()
    }
}

#[derive(Debug)]
pub struct TextComponent(pub String);

impl Component for TextComponent {
    type ViewModel = String;

    fn view_model(&self) -> &String {
        &self.0
    }
}

pub fn single(section: &str, cell: &str) -> List {
    List::new(vec![Section::new(section, vec![Cell::new(cell, DummyComponent)])])
}

pub fn text_section(id: &str, cells: &[(&str, &str)]) -> Section {
    Section::new(
        id,
        cells
            .iter()
            .map(|(cid, text)| Cell::new(*cid, TextComponent(text.to_string())))
            .collect(),
    )
}

#[derive(Debug, Clone, Copy)]
pub enum CompletionMode {
    /// Complete inside `apply`.
    Immediate,
    /// Hold completions until `release_one` is called, possibly from another thread.
    Gated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Reset,
    Batch { changes: usize },
}

/// Surface keeping an in-memory mirror of the rows it shows.
pub struct RecordingSurface {
    mode: CompletionMode,
    attached: AtomicBool,
    fail_next: AtomicBool,
    mirror: Mutex<Option<List>>,
    applied: Mutex<Vec<Applied>>,
    held: Mutex<Vec<ApplyCompletion>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSurface {
    pub fn new(mode: CompletionMode) -> Self {
        RecordingSurface {
            mode,
            attached: AtomicBool::new(true),
            fail_next: AtomicBool::new(false),
            mirror: Mutex::new(None),
            applied: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn mirror(&self) -> Option<List> {
        self.mirror.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<Applied> {
        self.applied.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn held(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Completes the oldest held update; returns false when none is held.
    pub fn release_one(&self) -> bool {
        let completion = {
            let mut held = self.held.lock().unwrap();
            if held.is_empty() {
                return false;
            }
            held.remove(0)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        completion.succeed();
        true
    }

    fn record(&self, update: &SurfaceUpdate) {
        let mut mirror = self.mirror.lock().unwrap();
        let next = match update {
            SurfaceUpdate::Reset { list } => {
                self.applied.lock().unwrap().push(Applied::Reset);
                (**list).clone()
            }
            SurfaceUpdate::Batch { batch, list, .. } => {
                self.applied.lock().unwrap().push(Applied::Batch {
                    changes: batch.change_count(),
                });
                let shown = mirror.as_ref().expect("batch before any reset");
                batch.replay(shown, list)
            }
        };
        *mirror = Some(next);
    }
}

impl RenderSurface for RecordingSurface {
    fn apply(&self, update: SurfaceUpdate, completion: ApplyCompletion) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.fail_next.swap(false, Ordering::SeqCst) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            completion.fail("injected failure");
            return;
        }

        self.record(&update);

        match self.mode {
            CompletionMode::Immediate => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                completion.succeed();
            }
            CompletionMode::Gated => {
                self.held.lock().unwrap().push(completion);
            }
        }
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

/// Spawns a thread completing held updates of `surface` every `delay` until `stop` is set.
pub fn drive_deferred(
    surface: Arc<RecordingSurface>,
    delay: Duration,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::SeqCst) {
            thread::sleep(delay);
            while surface.release_one() {}
        }
        while surface.release_one() {}
    })
}
