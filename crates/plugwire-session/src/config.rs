use plugwire_frame::{FrameConfig, IdSpace, DEFAULT_MAX_PAYLOAD};

/// Default name of the method a host calls after every outbound call.
pub const DEFAULT_REDRAW_METHOD: &str = "redraw";

/// Default capacity of the outbound message queue.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// How inbound requests and notifications reach the message handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Each inbound message is handled on its own task. A slow handler never
    /// holds up the read loop, and replies may be sent in any order.
    #[default]
    Concurrent,
    /// Inbound messages are handled one at a time, in wire order.
    ///
    /// A handler must not await a call on the same session in this mode: the
    /// read loop is busy with the handler and cannot deliver the reply.
    Sequential,
}

impl DispatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchMode::Concurrent => "concurrent",
            DispatchMode::Sequential => "sequential",
        }
    }
}

/// Session behavior configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum size of one JSON value on the wire, both directions.
    pub max_payload_size: usize,
    /// Id half used for our own outbound calls.
    pub outbound_ids: IdSpace,
    /// Inbound dispatch strategy.
    pub dispatch: DispatchMode,
    /// Method called by [`Session::redraw`](crate::Session::redraw).
    pub redraw_method: String,
    /// Capacity of the queue feeding the writer task.
    pub outbound_queue: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::host()
    }
}

impl SessionConfig {
    /// Configuration for the host end: outbound ids are negative.
    pub fn host() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            outbound_ids: IdSpace::Negative,
            dispatch: DispatchMode::Concurrent,
            redraw_method: DEFAULT_REDRAW_METHOD.to_string(),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }

    /// Configuration for the plugin end: outbound ids are positive.
    pub fn plugin() -> Self {
        Self {
            outbound_ids: IdSpace::Positive,
            ..Self::host()
        }
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_redraw_method(mut self, method: impl Into<String>) -> Self {
        self.redraw_method = method.into();
        self
    }

    /// Override the writer queue capacity. Zero is raised to one.
    pub fn with_outbound_queue(mut self, capacity: usize) -> Self {
        self.outbound_queue = capacity.max(1);
        self
    }

    /// Framing limits derived from this configuration.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}
