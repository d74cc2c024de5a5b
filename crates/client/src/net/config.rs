#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_tick_rate: u32,
    pub connection_timeout_secs: u64,
    /// How often `sendInput` fires per second (spec.md §4.5).
    pub send_rate: u32,
    pub ping_interval_secs: f32,
    /// Capacity of the `InputBuffer` ring (spec.md §4.5's `inputBuffer`).
    pub input_buffer_capacity: usize,
    /// Caps the batch `sendInput` attaches to one `ClientInput` message.
    pub max_inputs_per_message: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_tick_rate: 60,
            connection_timeout_secs: 120,
            send_rate: 30,
            ping_interval_secs: 0.25,
            input_buffer_capacity: 256,
            max_inputs_per_message: 16,
        }
    }
}
