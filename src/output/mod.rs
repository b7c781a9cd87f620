//! Output management
//!
//! Handles hotplug, mode selection, the multi-output policy and the
//! output-management protocol. Every change to the set of active outputs
//! goes through [`GameframeServer::layout_changed`], which repositions all
//! views and republishes the output configuration.

pub mod layout;

use log::{debug, error, info, warn};

use crate::backend::{BackendOutput, ModeRequest, OutputId, OutputState};
use crate::config::MultiOutputMode;
use crate::event::{ObjectKey, OutputConfiguration, Signal};
use crate::geometry::Size;
use crate::protocol::OutputHead;
use crate::server::GameframeServer;

pub use layout::{LayoutOutput, OutputLayout};

/// A connected output.
pub struct Output {
    pub id: OutputId,
    pub backend: Box<dyn BackendOutput>,
}

impl Output {
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    pub fn is_nested(&self) -> bool {
        self.backend.is_nested()
    }

    pub fn size(&self) -> Size {
        self.backend.current_size().unwrap_or_default()
    }
}

impl GameframeServer {
    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    fn output_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|o| o.id == id)
    }

    /// Choose the initial state for a new output: the configured custom
    /// mode if the output takes it, else the preferred mode, else the first
    /// mode that passes a test.
    fn initial_output_state(&self, output: &dyn BackendOutput) -> OutputState {
        let state = OutputState::enabled(true);

        if let Some(size) = self.config.nested.size() {
            let candidate = state.clone().with_mode(ModeRequest::Custom {
                width: size.width,
                height: size.height,
                refresh_mhz: self.config.nested.refresh_mhz(),
            });
            if output.test_state(&candidate) {
                return candidate;
            }
            warn!(
                "Output {} refused custom mode {}x{}",
                output.name(),
                size.width,
                size.height
            );
        }

        let modes = output.modes();
        if modes.is_empty() {
            return state;
        }

        if let Some(preferred) = output.preferred_mode() {
            let candidate = state.clone().with_mode(ModeRequest::Mode(preferred));
            if output.test_state(&candidate) {
                return candidate;
            }
        }

        for mode in modes {
            let candidate = state.clone().with_mode(ModeRequest::Mode(mode));
            if output.test_state(&candidate) {
                return candidate;
            }
        }

        warn!("No mode of output {} passed a test commit", output.name());
        state
    }

    pub(crate) fn handle_new_output(&mut self, id: OutputId, mut backend: Box<dyn BackendOutput>) {
        let name = backend.name().to_string();
        if let Err(e) = backend.init_render() {
            error!("Failed to initialize rendering on output {}: {}", name, e);
            return;
        }

        let state = self.initial_output_state(backend.as_ref());

        if backend.is_nested() {
            if self.config.nested.fullscreen {
                backend.set_fullscreen(true);
            }
            if self.config.nested.borderless {
                info!("Borderless mode requested for nested output {}", name);
            }
        }

        let scale = backend.scale();
        if !self.seat.cursor.load_theme(scale) {
            error!("Failed to load cursor theme at scale {} for output {}", scale, name);
        }

        let committed = backend.commit_state(&state);
        let size = backend.current_size();

        // Most recently added output first.
        self.outputs.insert(0, Output { id, backend });
        self.listeners.subscribe_all(
            ObjectKey::Output(id),
            &[
                Signal::Frame,
                Signal::Commit,
                Signal::RequestState,
                Signal::Destroy,
            ],
        );

        if !committed {
            error!("Failed to commit initial state of output {}", name);
            return;
        }

        let first = self.layout.is_empty();
        self.layout.add_auto(id, size.unwrap_or_default());
        info!("Output {} enabled at {:?}", name, self.layout.get_box(Some(id)));

        if self.config.general.output_mode == MultiOutputMode::Last && self.outputs.len() > 1 {
            let older: Vec<OutputId> = self.outputs.iter().skip(1).map(|o| o.id).collect();
            for older in older {
                self.output_disable(older);
            }
        }

        if first {
            self.seat.cursor.center(&self.layout);
        }
        self.layout_changed();
    }

    /// Enable an output and add it to the layout automatically.
    pub fn output_enable(&mut self, id: OutputId) -> bool {
        let Some(output) = self.output_mut(id) else {
            return false;
        };
        if !output.backend.commit_state(&OutputState::enabled(true)) {
            error!("Failed to enable output {}", output.name());
            return false;
        }
        let size = output.size();
        debug!("Enabled output {}", output.name());
        self.layout.add_auto(id, size);
        true
    }

    /// Disable an output and drop it from the layout.
    pub fn output_disable(&mut self, id: OutputId) -> bool {
        let Some(output) = self.output_mut(id) else {
            return false;
        };
        if !output.is_enabled() {
            debug!("Not disabling already disabled output {}", output.name());
            return false;
        }
        if !output.backend.commit_state(&OutputState::enabled(false)) {
            error!("Failed to disable output {}", output.name());
            return false;
        }
        debug!("Disabled output {}", output.name());
        self.layout.remove(id);
        true
    }

    pub(crate) fn handle_output_destroyed(&mut self, id: OutputId) {
        if !self.listeners.accepts(ObjectKey::Output(id), Signal::Destroy) {
            return;
        }
        self.listeners.release(ObjectKey::Output(id));

        let Some(index) = self.outputs.iter().position(|o| o.id == id) else {
            return;
        };
        let output = self.outputs.remove(index);
        let was_nested = output.is_nested();
        info!("Output {} removed", output.name());

        self.layout.remove(id);
        self.seat.cursor.unmap_output(id);

        if self.outputs.is_empty() {
            if was_nested {
                info!("Last nested output is gone, shutting down");
                self.terminate();
            }
            self.broadcast_output_configuration();
            return;
        }

        if self.config.general.output_mode == MultiOutputMode::Last {
            let head = self.outputs[0].id;
            self.output_enable(head);
        }
        self.layout_changed();
    }

    pub(crate) fn handle_output_frame(&mut self, id: OutputId) {
        if !self.listeners.accepts(ObjectKey::Output(id), Signal::Frame) {
            return;
        }
        let region = self.layout.get_box(Some(id));
        let fps_cap = self.frame_rate_cap();
        let Some(output) = self.outputs.iter_mut().find(|o| o.id == id) else {
            return;
        };
        if !output.is_enabled() {
            return;
        }
        let frame = self.scene.frame(id, region, fps_cap);
        if !output.backend.present(&frame) {
            debug!("Output {} skipped a frame", output.name());
        }
    }

    pub(crate) fn handle_output_committed(&mut self, id: OutputId, configuration_changed: bool) {
        if !self.listeners.accepts(ObjectKey::Output(id), Signal::Commit) {
            return;
        }
        if configuration_changed {
            self.broadcast_output_configuration();
        }
    }

    /// Nested outputs ask to be resized when the host window changes.
    pub(crate) fn handle_output_request_state(&mut self, id: OutputId, state: OutputState) {
        if !self.listeners.accepts(ObjectKey::Output(id), Signal::RequestState) {
            return;
        }
        let Some(output) = self.output_mut(id) else {
            return;
        };
        if !output.backend.commit_state(&state) {
            warn!("Output {} rejected a requested state", output.name());
            return;
        }
        let enabled = output.is_enabled();
        let size = output.size();
        if enabled && self.layout.contains(id) {
            self.layout.set_size(id, size);
        }
        self.layout_changed();
    }

    /// Reposition every view and republish the configuration.
    pub fn layout_changed(&mut self) {
        self.view_position_all();
        self.broadcast_output_configuration();
    }

    pub fn output_configuration(&self) -> Vec<OutputHead> {
        self.outputs
            .iter()
            .map(|output| {
                let geometry = self.layout.get_box(Some(output.id));
                let enabled = output.is_enabled();
                OutputHead {
                    output: output.id,
                    name: output.name().to_string(),
                    enabled,
                    x: if geometry.is_empty() { 0 } else { geometry.x },
                    y: if geometry.is_empty() { 0 } else { geometry.y },
                    size: enabled.then(|| output.size()),
                    scale: output.backend.scale(),
                }
            })
            .collect()
    }

    pub fn broadcast_output_configuration(&mut self) {
        let heads = self.output_configuration();
        self.collaborators.output_config.set_configuration(&heads);
    }

    /// Test or apply a client's output configuration. Disabling happens
    /// before enabling so outputs can trade places without overlapping.
    ///
    /// Applying is all or nothing: when any output fails to commit, the
    /// outputs committed so far are put back and the layout is left alone.
    pub fn output_apply_configuration(
        &mut self,
        configuration: &OutputConfiguration,
        test_only: bool,
    ) -> bool {
        let mut states = Vec::with_capacity(configuration.heads.len());
        for head in &configuration.heads {
            if self.output(head.output).is_none() {
                warn!("Output configuration names unknown output {:?}", head.output);
                return false;
            }
            let mut state = OutputState::enabled(head.enabled);
            if head.enabled {
                state.mode = head.mode;
                state.scale = head.scale;
            }
            states.push((head.output, state));
        }

        let all_pass = states.iter().all(|(id, state)| {
            self.output(*id)
                .map_or(false, |output| output.backend.test_state(state))
        });
        if !all_pass || !self.backend.prepare_swapchains(&states) {
            return false;
        }
        if test_only {
            return true;
        }

        let ordered: Vec<_> = configuration
            .heads
            .iter()
            .zip(states.iter())
            .filter(|(head, _)| !head.enabled)
            .chain(
                configuration
                    .heads
                    .iter()
                    .zip(states.iter())
                    .filter(|(head, _)| head.enabled),
            )
            .collect();

        let mut committed: Vec<(OutputId, OutputState)> = Vec::with_capacity(ordered.len());
        for (_, (id, state)) in &ordered {
            let Some(output) = self.outputs.iter_mut().find(|o| o.id == *id) else {
                self.rollback_output_states(committed);
                return false;
            };
            let previous = output.backend.current_state();
            if !output.backend.commit_state(state) {
                error!("Failed to apply configuration to output {}", output.name());
                self.rollback_output_states(committed);
                return false;
            }
            committed.push((*id, previous));
        }

        for (head, (id, _)) in ordered {
            let size = self.output(*id).map(Output::size).unwrap_or_default();
            if head.enabled {
                match head.position {
                    Some((x, y)) => self.layout.add(*id, x, y, size),
                    None => self.layout.add_auto(*id, size),
                }
            } else {
                self.layout.remove(*id);
            }
        }

        self.layout_changed();
        true
    }

    /// Re-commit saved states, newest first.
    fn rollback_output_states(&mut self, committed: Vec<(OutputId, OutputState)>) {
        for (id, previous) in committed.into_iter().rev() {
            let Some(output) = self.output_mut(id) else {
                continue;
            };
            if !output.backend.commit_state(&previous) {
                error!("Failed to restore output {} after a failed apply", output.name());
            }
        }
    }

    pub(crate) fn handle_output_config_request(
        &mut self,
        configuration: OutputConfiguration,
        test_only: bool,
    ) {
        let succeeded = self.output_apply_configuration(&configuration, test_only);
        debug!(
            "Output configuration {} {} ({})",
            configuration.serial,
            if succeeded { "succeeded" } else { "failed" },
            if test_only { "test" } else { "apply" }
        );
        self.collaborators
            .output_config
            .configuration_result(configuration.serial, succeeded);
    }
}
