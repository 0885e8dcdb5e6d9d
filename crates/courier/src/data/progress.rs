use crate::core::calculate_percentage;

/// Progress of one direction (upload or download) of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressState {
    /// Whether the transport knows the total length.
    pub is_computable: bool,

    pub bytes_transferred: u64,

    /// Total expected bytes; zero until a computable progress signal arrives.
    pub content_length: u64,

    /// 0–100.
    pub percentage: f64,
}

impl ProgressState {
    /// Record a progress measurement. Counters only move when the total is
    /// computable.
    pub fn record(&mut self, length_computable: bool, loaded: u64, total: u64) {
        self.is_computable = length_computable;

        if length_computable {
            self.bytes_transferred = loaded;
            self.content_length = total;
            self.percentage = calculate_percentage(loaded, total);
        }
    }
}
