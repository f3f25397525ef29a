//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter       | Implements  | Connects to                    |
//! |---------------|-------------|--------------------------------|
//! | `wifi`        | RadioPort   | ESP-IDF WiFi STA + event loop  |
//! | `ble`         | NotifyPort  | Bluedroid GATT console service |
//! | `relay_board` | SwitchPort  | relay GPIOs (embedded-hal)     |
//! | `console`     | —           | USB Serial JTAG / stdio        |

pub mod ble;
pub mod console;
pub mod relay_board;
pub mod wifi;
