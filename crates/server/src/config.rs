use netphys_core::PacketLossSimulation;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub max_clients: usize,
    /// Deliberate playout delay added to every client's input key, absorbing ordinary
    /// jitter before the per-connection RTT estimate has stabilized (spec.md §9 Open
    /// Question (i)).
    pub playout_delay_ms: u64,
    pub global_packet_loss: Option<PacketLossSimulation>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_clients: 32,
            playout_delay_ms: 100,
            global_packet_loss: None,
        }
    }
}
