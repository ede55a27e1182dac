#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

/// Stream anomalies observed while decoding.
///
/// All of these are self-healing: the decoder recovers by skipping a bounded
/// span of history and re-scanning. They only surface as `Err` when the
/// configured fail level makes them fatal.
#[derive(thiserror::Error, Debug)]
pub enum SignalError {
    #[error("Pulse-width spread too narrow to separate 1/2/3-clock cells at edge {edge}")]
    BadSignal { edge: u64 },

    #[error("No valid preamble within the scanned window at edge {edge}")]
    LostSync { edge: u64 },

    #[error("Edge ring overrun: producer outpaced the decoder, {dropped} unread edge(s) dropped")]
    RingOverrun { dropped: u64 },

    #[error("Channel-status index wrapped at 192 bits without a B preamble")]
    MissedBlockBoundary,
}
