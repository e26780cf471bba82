use anyhow::{Context, Result};
use assert_no_alloc::{assert_no_alloc, permit_alloc};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::buffer::AudioBuffer;
use crate::fx::chain::ResolvedChain;
use crate::fx::order::{DspOrder, SharedOrder};
use crate::fx::queue::{self, Consumer, DEFAULT_CAPACITY, Producer};
use crate::fx::stages::{ProcessSpec, StageRack};
use crate::params::{PARAM_COUNT, ParamId, ParameterSet, Smoother, SmootherUpdateMode};
use crate::state::PersistedState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Slots in each order queue.
    pub order_queue_capacity: usize,
    /// Ramp length for float parameters, 0 disables smoothing.
    pub param_smoothing_ms: f32,
    pub initial_order: DspOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_queue_capacity: DEFAULT_CAPACITY,
            param_smoothing_ms: 0.0,
            initial_order: DspOrder::default(),
        }
    }
}

/// State shared between the audio side and the control side.
struct Shared {
    active_order: SharedOrder,
    announce_requested: AtomicBool,
}

/// Real-time side. Owns the stage racks and consumes order changes.
pub struct Engine {
    params: Arc<ParameterSet>,
    shared: Arc<Shared>,
    /// Incoming order changes from the control side.
    rx_orders: Consumer<DspOrder>,
    /// Orders announced back to the control side.
    tx_announce: Producer<DspOrder>,
    order: DspOrder,
    /// One rack per prepared channel.
    racks: Vec<StageRack>,
    smoothers: [Smoother; PARAM_COUNT],
    config: EngineConfig,
    spec: Option<ProcessSpec>,
}

/// Control side. Pushes orders, reads announcements, saves and restores state.
pub struct EngineHandle {
    params: Arc<ParameterSet>,
    shared: Arc<Shared>,
    tx_orders: Producer<DspOrder>,
    rx_announce: Consumer<DspOrder>,
}

impl Engine {
    pub fn new(params: Arc<ParameterSet>, config: EngineConfig) -> (Self, EngineHandle) {
        let (tx_orders, rx_orders) = queue::channel(config.order_queue_capacity);
        let (tx_announce, rx_announce) = queue::channel(config.order_queue_capacity);

        let order = if config.initial_order.is_unset() {
            DspOrder::default()
        } else {
            config.initial_order
        };

        let shared = Arc::new(Shared {
            active_order: SharedOrder::new(order),
            announce_requested: AtomicBool::new(false),
        });

        let smoothers = ParamId::ALL.map(|id| Smoother::new(params.get(id).raw()));

        let engine = Self {
            params: Arc::clone(&params),
            shared: Arc::clone(&shared),
            rx_orders,
            tx_announce,
            order,
            racks: Vec::new(),
            smoothers,
            config,
            spec: None,
        };

        let handle = EngineHandle {
            params,
            shared,
            tx_orders,
            rx_announce,
        };

        (engine, handle)
    }

    /// Allocate stage racks for `spec`. Must be called off the audio thread
    /// before `process`, and again when sample rate, block size or channels change.
    pub fn prepare(&mut self, spec: ProcessSpec) {
        if self.spec == Some(spec) {
            return;
        }

        info!(
            "Preparing engine: {} Hz, {} frames, {} channel(s)",
            spec.sample_rate, spec.max_block_size, spec.num_channels
        );

        self.racks = (0..spec.num_channels)
            .map(|_| StageRack::new(&spec))
            .collect();

        for (smoother, id) in self.smoothers.iter_mut().zip(ParamId::ALL) {
            smoother.set_ramp(self.config.param_smoothing_ms, spec.sample_rate);
            smoother.set_target(self.params.get(id).raw(), SmootherUpdateMode::Initialize);
        }

        self.spec = Some(spec);
        self.apply_parameters(0);
    }

    pub const fn spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    pub const fn current_order(&self) -> DspOrder {
        self.order
    }

    /// Clear all stage history without touching parameters or the order.
    pub fn reset(&mut self) {
        for rack in &mut self.racks {
            rack.reset();
        }
    }

    /// Real-time entry point. An unprepared engine leaves the buffer untouched.
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        assert_no_alloc(|| self.process_block(buffer));
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        if self.racks.is_empty() {
            return;
        }

        if let Some(order) = self.rx_orders.drain_latest()
            && !order.is_unset()
        {
            self.apply_order(order);
        }

        if self.shared.announce_requested.swap(false, Ordering::AcqRel) {
            self.tx_announce.push(self.order);
        }

        self.apply_parameters(buffer.len());

        let params = &self.params;
        let chain = ResolvedChain::resolve(&self.order, |kind| params.is_bypassed(kind));

        for (rack, channel) in self.racks.iter_mut().zip(buffer.channels_mut()) {
            chain.run(rack, channel);
        }
    }

    fn apply_order(&mut self, order: DspOrder) {
        self.order = order;
        self.shared.active_order.store(order);
        self.tx_announce.push(order);

        permit_alloc(|| debug!("DSP order applied: {order}"));
    }

    /// Copy parameter values into every rack, advancing smoothers by `samples`.
    fn apply_parameters(&mut self, samples: usize) {
        let smoothing = self.config.param_smoothing_ms > 0.0;

        for (smoother, id) in self.smoothers.iter_mut().zip(ParamId::ALL) {
            let Some(key) = id.stage_key() else {
                continue;
            };

            let param = self.params.get(id);
            let value = if smoothing && param.spec().is_float() {
                smoother.set_target(param.raw(), SmootherUpdateMode::LiveInRealtime);
                smoother.skip(samples)
            } else {
                param.raw()
            };

            for rack in &mut self.racks {
                if let Some(stage) = rack.stage_mut(id.kind()) {
                    // Parameter ranges must sit inside the stage ranges
                    let result = stage.set_parameter(key, value);
                    debug_assert!(result.is_ok(), "{id} = {value} rejected: {result:?}");
                }
            }
        }
    }
}

impl EngineHandle {
    pub const fn params(&self) -> &Arc<ParameterSet> {
        &self.params
    }

    /// Queue an order for the audio thread. An all-`EndOfList` order is a no-op.
    pub fn push_order(&mut self, order: DspOrder) {
        if let Some(dropped) = self.tx_orders.push(order) {
            debug!("Order queue full, dropped pending order {dropped}");
        }
    }

    /// Next order the audio thread has applied or announced, oldest first.
    pub fn pull_announced_order(&mut self) -> Option<DspOrder> {
        self.rx_announce.pull()
    }

    /// Order the audio thread is currently running.
    pub fn active_order(&self) -> DspOrder {
        self.shared.active_order.load()
    }

    /// Ask the audio thread to announce its current order on the next block.
    pub fn request_order_announcement(&self) {
        self.shared.announce_requested.store(true, Ordering::Release);
    }

    pub fn capture_state(&self) -> PersistedState {
        PersistedState::capture(&self.params, self.active_order())
    }

    pub fn save_state(&self) -> Result<Vec<u8>> {
        self.capture_state().to_bytes()
    }

    /// Validate `bytes` fully, then apply parameters and queue the stored order.
    /// On error nothing is changed.
    pub fn restore_state(&mut self, bytes: &[u8]) -> Result<()> {
        let state = PersistedState::from_bytes(bytes).context("failed to restore state")?;
        self.apply_state(&state);
        Ok(())
    }

    pub fn apply_state(&mut self, state: &PersistedState) {
        state.apply(&self.params);
        self.push_order(state.order());
        debug!("State restored with order {}", state.order());
    }
}
