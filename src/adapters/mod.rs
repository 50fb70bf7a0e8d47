//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                    |
//! |----------------|--------------|--------------------------------|
//! | `config_file`  | ConfigPort   | JSON file on disk              |
//! | `frame_source` | FrameSource  | image directory / synthetic    |
//! | `keyboard`     | -            | stdin → command channel        |
//! | `log_sink`     | EventSink    | `log` facade                   |
//! | `recorder`     | Recorder     | PNG clip directories           |
//! | `signal`       | -            | Ctrl+C / SIGTERM → stop flag   |
//! | `time`         | Clock        | `Instant` / manual test clock  |

pub mod config_file;
pub mod frame_source;
pub mod keyboard;
pub mod log_sink;
pub mod recorder;
pub mod signal;
pub mod time;
