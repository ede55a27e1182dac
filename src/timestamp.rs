/// Capture-tick rate implied by a block duration: one block carries 192
/// frames per channel, i.e. 4 ms at the fixed 48 kHz output rate, so 250
/// blocks pass per second.
pub fn tick_rate_from_block(block_ticks: u64) -> u64 {
    block_ticks * 250
}

pub fn time_str(sec: f64) -> String {
    let ms = sec * 1000f64;
    let hours = (ms / 3600000f64) as u64;
    let minutes = ((ms % 3600000f64) / 60000f64) as u64;
    let seconds = ((ms % 60000f64) / 1000f64) as u64;
    let milliseconds = (ms % 1000f64) as u64;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

/// Formats a tick span as wall time, given the estimated tick rate.
pub fn ticks_str(ticks: u64, tick_rate: u64) -> String {
    if tick_rate == 0 {
        return format!("{ticks} ticks");
    }
    time_str(ticks as f64 / tick_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rate() {
        // A 4 ms block at 1 MHz capture rate spans 4000 ticks.
        assert_eq!(tick_rate_from_block(4000), 1_000_000);
    }

    #[test]
    fn formatting() {
        assert_eq!(time_str(0.0), "00:00:00.000");
        assert_eq!(time_str(3661.5), "01:01:01.500");
        assert_eq!(ticks_str(500_000, 1_000_000), "00:00:00.500");
        assert_eq!(ticks_str(123, 0), "123 ticks");
    }
}
