//! Offline host: drives a processor block by block without an audio device.
//!
//! Plays the part of the plugin host for rendering and tests. It owns the
//! notify buffer and the pending inbound events, hands them to the processor
//! each block, and decodes whatever the processor published. With a manual
//! [`WorkerHost`] attached, queued worker requests run right after each block,
//! so their completions arrive on the next one.

use toob_core::{
    InputEvent, NotifyBuffer, NotifyMessage, ProcessBlock, Processor, ProcessorConfig, WorkerHost,
};
use std::sync::Arc;

pub struct OfflineHost<P: Processor> {
    processor: P,
    notify: NotifyBuffer,
    events: Vec<InputEvent>,
    output: Vec<f32>,
    worker: Option<Arc<WorkerHost>>,
    frames: u64,
}

impl<P: Processor> OfflineHost<P> {
    /// Wrap and activate `processor`.
    pub fn new(mut processor: P, config: &ProcessorConfig) -> Self {
        processor.activate();
        Self {
            processor,
            notify: NotifyBuffer::new(config.notify_capacity),
            events: Vec::new(),
            output: Vec::new(),
            worker: None,
            frames: 0,
        }
    }

    /// Run this worker's queue after every block. Only meaningful for manual hosts.
    pub fn with_worker(mut self, worker: Arc<WorkerHost>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Samples processed since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Queue an event for the next block. Events are delivered in frame order.
    pub fn send(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Output of the most recent block.
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Process one block of `input` (which may be empty) and return what was published.
    pub fn process_block(&mut self, input: &[f32]) -> Vec<NotifyMessage> {
        self.output.clear();
        self.output.resize(input.len(), 0.0);
        self.events.sort_by_key(|e| e.frame);
        self.notify.clear();

        self.processor.process(&mut ProcessBlock {
            input,
            output: &mut self.output,
            events: &mut self.events,
            notify: &mut self.notify,
        });
        self.events.clear();
        self.frames += input.len() as u64;

        if let Some(worker) = &self.worker {
            worker.run_pending();
        }
        self.notify.messages()
    }

    /// Process `input` in blocks of `block_size`, returning the rendered output
    /// and every message published along the way.
    pub fn render(&mut self, input: &[f32], block_size: usize) -> (Vec<f32>, Vec<NotifyMessage>) {
        let mut rendered = Vec::with_capacity(input.len());
        let mut messages = Vec::new();
        for chunk in input.chunks(block_size.max(1)) {
            messages.extend(self.process_block(chunk));
            rendered.extend_from_slice(&self.output);
        }
        (rendered, messages)
    }

    pub fn deactivate(&mut self) {
        self.processor.deactivate();
    }

    pub fn into_inner(self) -> P {
        self.processor
    }
}
