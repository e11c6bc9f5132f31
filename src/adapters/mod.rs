//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to              |
//! |------------|-----------------|--------------------------|
//! | `ble`      | PeripheralPort  | Bluedroid GATT server    |
//! | `hardware` | SensorPort      | ESP32 ADC1               |
//! | `log_sink` | EventSink       | Serial log output        |
//! | `time`     | ClockPort       | ESP32 system timer / RTC |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod time;
