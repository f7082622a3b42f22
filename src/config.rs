use std::env;
use std::time::Duration;

use lazy_static::lazy_static;

/// must be called *synchronously* at startup, before the room thread spawns
pub fn init() {
    env_logger::init();
}

macro_rules! env_setting {
    ($name:ident, $type:ty, $default:expr, $parse:expr) => {
        lazy_static! {
            pub static ref $name: $type = match env::var(stringify!($name)) {
                Ok(raw) => ($parse)(raw),
                Err(_) => {
                    let value: $type = $default;
                    warn!("using default for {}: [{:?}]", stringify!($name), &value);
                    value
                }
            };
        }
    };
}

env_setting!(
    SKIRMISH_TICK_INTERVAL,
    Duration,
    Duration::from_micros((1_000_000.0 / crate::constants::TICK_HZ) as u64),
    |raw: String| Duration::from_millis(
        raw.parse()
            .expect("SKIRMISH_TICK_INTERVAL must be whole milliseconds")
    )
);

env_setting!(SKIRMISH_PING_INTERVAL_MS, u64, 5_000, |raw: String| raw
    .parse()
    .expect("SKIRMISH_PING_INTERVAL_MS must be whole milliseconds"));

env_setting!(SKIRMISH_ROOM_ID, String, "skirmish-arena".to_owned(), |raw| raw);
