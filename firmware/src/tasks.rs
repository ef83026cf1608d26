//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod analog_monitor;
pub mod control;
pub mod led;

// タスク関数を再エクスポート
pub use analog_monitor::{analog_monitor_task, AnalogInputs};
pub use control::control_task;
pub use led::led_task;
