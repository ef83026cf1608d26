//! ボード固有の設定パラメータ

use bldc_drive::config::{Modulation, DEFAULT_PWM_FREQUENCY_HZ};

/// 駆動方式（この基板はHallセンサー付きモーター用）（デフォルト値）
pub const DEFAULT_MODULATION: Modulation = Modulation::Trapezoid;

/// 起動時の自動運転
/// デバッグ用: 起動直後に目標速度を設定して運転を開始する
pub const DEFAULT_AUTO_RUN: bool = true;

/// 自動運転時の目標速度 [RPM]（デフォルト値）
pub const DEFAULT_AUTO_RUN_SPEED: u32 = 6_000;

/// 制御ティック周期 [ms]
pub const CONTROL_TICK_MS: u64 = 1;

/// ステータスログ周期 [ms]
pub const STATUS_LOG_PERIOD_MS: u64 = 1_000;

/// 操作コマンドキューの深さ
pub const COMMAND_QUEUE_DEPTH: usize = 8;

/// PWM設定
pub mod pwm {
    use embassy_stm32::time::Hertz;

    use super::DEFAULT_PWM_FREQUENCY_HZ;

    /// PWM周波数（25kHz）（デフォルト値）
    pub const DEFAULT_FREQUENCY: Hertz = Hertz(DEFAULT_PWM_FREQUENCY_HZ);

    /// デッドタイム（デフォルト値）
    pub const DEFAULT_DEAD_TIME: u16 = 1;

    /// TIM1更新割り込みの優先度（最優先）
    pub const UPDATE_IRQ_PRIORITY: u8 = 0x10;
}

/// Hallタイマー（TIM4）/ 転流タイマー（TIM6）設定
pub mod timers {
    /// タイマークロック [Hz]
    pub const TIMER_CLOCK_HZ: u32 = 170_000_000;

    /// Hallエッジ割り込みの優先度
    pub const HALL_IRQ_PRIORITY: u8 = 0x20;

    /// 転流タイマー割り込みの優先度
    pub const COMMUTATION_IRQ_PRIORITY: u8 = 0x20;

    /// 転流タイマーのプリスケーラ（170MHz / 170 = 1MHz → 1カウント1µs）
    pub const COMMUTATION_PRESCALER: u16 = 169;

    /// Hall停止判定のオーバーフロー回数（約385µs/overflow → 約1秒）
    pub const HALL_TIMEOUT_OVERFLOWS: u32 = 2_600;
}

/// アナログ入力設定
pub mod adc {
    /// ADC分解能（12ビット）
    pub const ADC_MAX: u32 = 4_096;

    /// ADC基準電圧 [mV]
    pub const VREF_MV: u32 = 3_300;

    /// バス電圧分圧抵抗 [Ω]（56kΩ + 3.3kΩ、最大入力 約59V）
    pub const VBUS_R_UPPER: u32 = 56_000;
    pub const VBUS_R_LOWER: u32 = 3_300;

    /// シャント抵抗 [mΩ]
    pub const CURRENT_SHUNT_MOHM: u32 = 3;

    /// 電流アンプゲイン
    pub const CURRENT_GAIN: u32 = 16;

    /// 電流0 Aのときのアンプ出力 [mV]
    pub const CURRENT_OFFSET_MV: i32 = 1_650;

    /// 温度センサー: 0°Cでの出力 [mV]
    pub const TEMP_OFFSET_MV: i32 = 500;

    /// 温度センサー: 感度 [mV/°C]
    pub const TEMP_MV_PER_C: i32 = 10;

    /// IIRフィルタ係数（新しい値の重み 1/2^N）
    pub const FILTER_SHIFT: u32 = 3;
}

/// 独立ウォッチドッグ設定
pub mod watchdog {
    /// タイムアウト [µs]
    pub const DEFAULT_TIMEOUT_US: u32 = 20_000;
}
