//! Headless backend
//!
//! Virtual outputs without any display attached. Frames are counted rather
//! than shown. Used for CI runs and by the tests, which keep a
//! [`HeadlessMonitor`] to look at an output after handing it to the server.

use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use super::{Backend, BackendOutput, Mode, ModeRequest, OutputId, OutputState};
use crate::config::HeadlessConfig;
use crate::error::BackendError;
use crate::event::{Event, EventSender};
use crate::geometry::Size;
use crate::scene::Frame;

/// Observable state of a headless output.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessOutputState {
    pub enabled: bool,
    pub mode: Option<ModeRequest>,
    pub scale: f64,
    pub fullscreen: bool,
    pub title: String,
    pub frames: Vec<Frame>,
    pub commits: usize,
}

impl Default for HeadlessOutputState {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: None,
            scale: 1.0,
            fullscreen: false,
            title: String::new(),
            frames: Vec::new(),
            commits: 0,
        }
    }
}

/// Shared view onto a [`HeadlessOutput`]'s state.
#[derive(Debug, Clone)]
pub struct HeadlessMonitor(Arc<Mutex<HeadlessOutputState>>);

impl HeadlessMonitor {
    pub fn state(&self) -> HeadlessOutputState {
        self.0.lock().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.0.lock().enabled
    }

    pub fn frame_count(&self) -> usize {
        self.0.lock().frames.len()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.0.lock().frames.last().cloned()
    }
}

pub struct HeadlessOutput {
    name: String,
    modes: Vec<Mode>,
    nested: bool,
    fail_init: bool,
    /// Sizes refused by test and commit
    rejected: Vec<Size>,
    /// Commits accepted before every further commit fails
    commit_budget: Option<usize>,
    state: Arc<Mutex<HeadlessOutputState>>,
}

impl HeadlessOutput {
    /// An output with a single preferred mode.
    pub fn new(name: impl Into<String>, width: i32, height: i32, refresh_mhz: i32) -> Self {
        Self {
            name: name.into(),
            modes: vec![Mode {
                width,
                height,
                refresh_mhz,
                preferred: true,
            }],
            nested: false,
            fail_init: false,
            rejected: Vec::new(),
            commit_budget: None,
            state: Arc::default(),
        }
    }

    pub fn with_modes(mut self, modes: Vec<Mode>) -> Self {
        self.modes = modes;
        self
    }

    /// Pretend to be a window inside a host compositor.
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    /// Make [`BackendOutput::init_render`] fail.
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Refuse any state that would switch to this size.
    pub fn rejecting(mut self, size: Size) -> Self {
        self.rejected.push(size);
        self
    }

    /// Accept `commits` more commits, then fail every commit even though
    /// tests keep passing.
    pub fn failing_commits_after(mut self, commits: usize) -> Self {
        self.commit_budget = Some(commits);
        self
    }

    pub fn monitor(&self) -> HeadlessMonitor {
        HeadlessMonitor(Arc::clone(&self.state))
    }

    fn accepts(&self, state: &OutputState) -> bool {
        state
            .mode
            .map_or(true, |mode| !self.rejected.contains(&mode.size()))
    }
}

impl BackendOutput for HeadlessOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_nested(&self) -> bool {
        self.nested
    }

    fn modes(&self) -> Vec<Mode> {
        self.modes.clone()
    }

    fn init_render(&mut self) -> Result<(), BackendError> {
        if self.fail_init {
            return Err(BackendError::RenderInit(self.name.clone()));
        }
        Ok(())
    }

    fn test_state(&self, state: &OutputState) -> bool {
        self.accepts(state)
    }

    fn commit_state(&mut self, state: &OutputState) -> bool {
        if !self.accepts(state) {
            debug!("Output {} rejected {:?}", self.name, state);
            return false;
        }
        match self.commit_budget.as_mut() {
            Some(0) => {
                debug!("Output {} failed to commit {:?}", self.name, state);
                return false;
            }
            Some(budget) => *budget -= 1,
            None => {}
        }

        let mut current = self.state.lock();
        if let Some(enabled) = state.enabled {
            current.enabled = enabled;
        }
        if let Some(mode) = state.mode {
            current.mode = Some(mode);
        }
        if let Some(scale) = state.scale {
            current.scale = scale;
        }
        current.commits += 1;
        true
    }

    fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    fn current_state(&self) -> OutputState {
        let state = self.state.lock();
        OutputState {
            enabled: Some(state.enabled),
            mode: state.mode,
            scale: Some(state.scale),
        }
    }

    fn current_size(&self) -> Option<Size> {
        let state = self.state.lock();
        if !state.enabled {
            return None;
        }
        state.mode.map(|mode| mode.size())
    }

    fn scale(&self) -> f64 {
        self.state.lock().scale
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.lock().fullscreen = fullscreen;
    }

    fn set_title(&mut self, title: &str) {
        self.state.lock().title = title.to_owned();
    }

    fn present(&mut self, frame: &Frame) -> bool {
        let mut state = self.state.lock();
        if !state.enabled {
            return false;
        }
        state.frames.push(frame.clone());
        true
    }
}

/// Backend that announces a fixed set of virtual outputs on start.
pub struct HeadlessBackend {
    pending: Vec<HeadlessOutput>,
    next_id: u64,
    events: Option<EventSender>,
}

impl HeadlessBackend {
    pub fn new(config: &HeadlessConfig) -> Self {
        let outputs = (1..=config.outputs)
            .map(|n| {
                HeadlessOutput::new(
                    format!("HEADLESS-{}", n),
                    config.width,
                    config.height,
                    config.refresh_mhz,
                )
            })
            .collect();
        Self::with_outputs(outputs)
    }

    pub fn with_outputs(outputs: Vec<HeadlessOutput>) -> Self {
        Self {
            pending: outputs,
            next_id: 1,
            events: None,
        }
    }

    fn announce(&mut self, output: HeadlessOutput) -> Result<OutputId, BackendError> {
        let events = self.events.as_ref().ok_or(BackendError::Disconnected)?;
        let id = OutputId(self.next_id);
        self.next_id += 1;
        events
            .send(Event::NewOutput {
                id,
                output: Box::new(output),
            })
            .map_err(|_| BackendError::Disconnected)?;
        Ok(id)
    }

    /// Hotplug another output after start.
    pub fn add_output(&mut self, output: HeadlessOutput) -> Result<OutputId, BackendError> {
        self.announce(output)
    }
}

impl Backend for HeadlessBackend {
    fn start(&mut self, events: EventSender) -> Result<(), BackendError> {
        info!("Starting headless backend with {} output(s)", self.pending.len());
        self.events = Some(events);
        for output in std::mem::take(&mut self.pending) {
            self.announce(output)?;
        }
        Ok(())
    }

    fn is_multi_session(&self) -> bool {
        false
    }

    fn change_vt(&mut self, vt: u32) -> bool {
        debug!("Headless backend cannot switch to VT {}", vt);
        false
    }

    fn prepare_swapchains(&mut self, _states: &[(OutputId, OutputState)]) -> bool {
        true
    }
}
