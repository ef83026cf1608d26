//! Configuration module
//!
//! このモジュールは基板の設定と、駆動コアへ渡すパラメータの組み立てを提供します。

pub mod params;

// params.rsから主要な定数を再エクスポート
pub use params::*;

use bldc_drive::DriveParameters;

/// 起動時に駆動コアへ渡すパラメータ
pub fn drive_parameters() -> DriveParameters {
    DriveParameters {
        modulation: DEFAULT_MODULATION,
        ..DriveParameters::default()
    }
}
