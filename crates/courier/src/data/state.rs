use std::fmt;

/// Semantic lifecycle state mirroring the transport's numeric ready state.
///
/// States only ever move forward within one exchange:
/// Unsent → Opened → HeadersReceived → Loading → Done
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RequestState {
    #[default]
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    Done,
}

impl RequestState {
    /// Maps a transport ready state (0–4). Values above 4 count as done.
    pub fn from_ready_state(ready_state: u8) -> Self {
        match ready_state {
            0 => Self::Unsent,
            1 => Self::Opened,
            2 => Self::HeadersReceived,
            3 => Self::Loading,
            _ => Self::Done,
        }
    }

    pub fn ready_state(&self) -> u8 {
        match self {
            Self::Unsent => 0,
            Self::Opened => 1,
            Self::HeadersReceived => 2,
            Self::Loading => 3,
            Self::Done => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsent => "UNSENT",
            Self::Opened => "OPENED",
            Self::HeadersReceived => "HEADERS_RECEIVED",
            Self::Loading => "LOADING",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a request engine is in its single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    NotStarted,
    InFlight,
    Settled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_states_map_in_order() {
        let states: Vec<_> = (0..=4).map(RequestState::from_ready_state).collect();
        assert_eq!(
            states,
            vec![
                RequestState::Unsent,
                RequestState::Opened,
                RequestState::HeadersReceived,
                RequestState::Loading,
                RequestState::Done,
            ]
        );
        assert!(states.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(RequestState::from_ready_state(9), RequestState::Done);
    }

    #[test]
    fn names_round_trip_ready_state() {
        for n in 0..=4 {
            let state = RequestState::from_ready_state(n);
            assert_eq!(state.ready_state(), n);
        }
        assert_eq!(RequestState::HeadersReceived.to_string(), "HEADERS_RECEIVED");
    }
}
