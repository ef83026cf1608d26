//! アナログ監視タスク
//!
//! バス電圧・相電流・温度を1msごとにサンプリングし、フィルタ済みの値を公開します。
//! しきい値判定とフォルト処理は駆動コア側で行います。

use embassy_stm32::{
    adc::{Adc, AnyAdcChannel},
    peripherals,
};
use embassy_time::{Duration, Ticker};

use crate::analog::{AnalogConfig, AnalogFrontEnd, RawSample};
use crate::config::CONTROL_TICK_MS;
use crate::fmt::*;

/// アナログ入力のADCとチャネル
pub struct AnalogInputs {
    pub adc1: Adc<'static, peripherals::ADC1>,
    pub adc2: Adc<'static, peripherals::ADC2>,
    /// バス電圧（ADC2）
    pub vbus: AnyAdcChannel<peripherals::ADC2>,
    /// 相電流アンプ出力（ADC1）
    pub current: AnyAdcChannel<peripherals::ADC1>,
    /// 温度センサー（ADC1）
    pub temperature: AnyAdcChannel<peripherals::ADC1>,
}

impl AnalogInputs {
    fn sample(&mut self) -> RawSample {
        RawSample {
            vbus: self.adc2.blocking_read(&mut self.vbus),
            current: self.adc1.blocking_read(&mut self.current),
            temperature: self.adc1.blocking_read(&mut self.temperature),
        }
    }
}

/// アナログ監視タスク
#[embassy_executor::task]
pub async fn analog_monitor_task(mut inputs: AnalogInputs) {
    info!("Analog monitor task started");

    let mut front_end = AnalogFrontEnd::new(AnalogConfig::default());

    // 初回サンプルでフィルタを初期化（起動時の低電圧誤検出を防ぐ）
    let initial = inputs.sample();
    front_end.initialize(initial);
    info!("Initial analog sample: {}", initial);

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_TICK_MS));

    loop {
        ticker.next().await;
        front_end.update(inputs.sample());
    }
}
