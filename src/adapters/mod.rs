//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to                   |
//! |-------------|-------------------|-------------------------------|
//! | `radio`     | RadioDriver       | ESP-IDF WiFi STA / soft-AP    |
//! | `cloud`     | CloudClient       | Serial log output             |
//! | `console`   | (app commands)    | stdin line reader             |
//! | `time`      | SystemClock       | newlib wall clock             |
//! | `device_id` | DeviceIdentity    | eFuse MAC                     |
//! | `provisioning_page` | (radio events) | HTTP credential form on the AP |

pub mod cloud;
pub mod console;
pub mod device_id;
pub mod provisioning_page;
pub mod radio;
pub mod time;
