//! アナログ入力（バス電圧・相電流・温度）
//!
//! ADC生値を mV / mA / °C に変換し、IIRフィルタを通した値をアトミックに保持します。
//! 駆動コアはボード実装経由でこの値を読み取ります。

use core::sync::atomic::{AtomicI16, AtomicI32, AtomicU32, Ordering};

use crate::config::adc::*;

static VBUS_MV: AtomicU32 = AtomicU32::new(0);
static CURRENT_MA: AtomicI32 = AtomicI32::new(0);
static TEMPERATURE_C: AtomicI16 = AtomicI16::new(0);

/// 1回分のADC生値（0-4095）
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub vbus: u16,
    pub current: u16,
    pub temperature: u16,
}

/// アナログフロントエンドの変換パラメータ
#[derive(Debug, Clone, Copy)]
pub struct AnalogConfig {
    /// 分圧抵抗の上側 [Ω]
    pub r_upper: u32,
    /// 分圧抵抗の下側 [Ω]
    pub r_lower: u32,
    pub shunt_mohm: u32,
    pub current_gain: u32,
    pub current_offset_mv: i32,
    pub temp_offset_mv: i32,
    pub temp_mv_per_c: i32,
    /// フィルタ係数（新しい値の重み 1/2^N）
    pub filter_shift: u32,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            r_upper: VBUS_R_UPPER,
            r_lower: VBUS_R_LOWER,
            shunt_mohm: CURRENT_SHUNT_MOHM,
            current_gain: CURRENT_GAIN,
            current_offset_mv: CURRENT_OFFSET_MV,
            temp_offset_mv: TEMP_OFFSET_MV,
            temp_mv_per_c: TEMP_MV_PER_C,
            filter_shift: FILTER_SHIFT,
        }
    }
}

/// ADCピン電圧 [mV]
fn raw_to_mv(raw: u16) -> u32 {
    raw as u32 * VREF_MV / ADC_MAX
}

/// フィルタ付きアナログ入力
pub struct AnalogFrontEnd {
    config: AnalogConfig,
    vbus_mv: i32,
    current_ma: i32,
    temperature_c: i32,
}

impl AnalogFrontEnd {
    pub fn new(config: AnalogConfig) -> Self {
        Self {
            config,
            vbus_mv: 0,
            current_ma: 0,
            temperature_c: 0,
        }
    }

    /// バス電圧 [mV]
    /// V_bus = V_adc * (R_upper + R_lower) / R_lower
    fn vbus_mv(&self, raw: u16) -> i32 {
        let c = &self.config;
        (raw_to_mv(raw) as u64 * (c.r_upper + c.r_lower) as u64 / c.r_lower.max(1) as u64) as i32
    }

    /// 相電流 [mA]
    /// I = (V_adc - V_offset) / (gain * R_shunt)
    fn current_ma(&self, raw: u16) -> i32 {
        let c = &self.config;
        let mv = raw_to_mv(raw) as i32 - c.current_offset_mv;
        mv * 1_000 / (c.current_gain * c.shunt_mohm).max(1) as i32
    }

    /// 温度 [°C]
    fn temperature_c(&self, raw: u16) -> i32 {
        let c = &self.config;
        (raw_to_mv(raw) as i32 - c.temp_offset_mv) / c.temp_mv_per_c.max(1)
    }

    /// フィルタを初期値で初期化（起動時の誤検出防止用）
    pub fn initialize(&mut self, sample: RawSample) {
        self.vbus_mv = self.vbus_mv(sample.vbus);
        self.current_ma = self.current_ma(sample.current);
        self.temperature_c = self.temperature_c(sample.temperature);
        self.publish();
    }

    /// 新しいサンプルでフィルタを更新し、結果を公開
    pub fn update(&mut self, sample: RawSample) {
        let shift = self.config.filter_shift;
        self.vbus_mv = filter(self.vbus_mv, self.vbus_mv(sample.vbus), shift);
        self.current_ma = filter(self.current_ma, self.current_ma(sample.current), shift);
        self.temperature_c = filter(
            self.temperature_c,
            self.temperature_c(sample.temperature),
            shift,
        );
        self.publish();
    }

    fn publish(&self) {
        VBUS_MV.store(self.vbus_mv.max(0) as u32, Ordering::Relaxed);
        CURRENT_MA.store(self.current_ma, Ordering::Relaxed);
        TEMPERATURE_C.store(
            self.temperature_c.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            Ordering::Relaxed,
        );
    }
}

/// filtered += (raw - filtered) / 2^shift
fn filter(filtered: i32, raw: i32, shift: u32) -> i32 {
    filtered + ((raw - filtered) >> shift)
}

/// フィルタ済みバス電圧 [mV]
pub fn bus_voltage_mv() -> u32 {
    VBUS_MV.load(Ordering::Relaxed)
}

/// フィルタ済み相電流 [mA]
pub fn phase_current_ma() -> i32 {
    CURRENT_MA.load(Ordering::Relaxed)
}

/// フィルタ済み温度 [°C]
pub fn temperature_c() -> i16 {
    TEMPERATURE_C.load(Ordering::Relaxed)
}
