//! LED制御タスク
//!
//! 駆動コアが設定した点滅パターンを運転LED/フォルトLEDに出力します。

use core::sync::atomic::{AtomicU32, Ordering};

use bldc_drive::ports::{BlinkPattern, Led};
use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Instant, Timer};

use crate::fmt::*;

/// LED更新周期 [ms]
const LED_UPDATE_MS: u64 = 10;

/// 点滅パターン（rate << 16 | period）
static RUN_PATTERN: AtomicU32 = AtomicU32::new(0);
static FAULT_PATTERN: AtomicU32 = AtomicU32::new(0);

fn slot(led: Led) -> &'static AtomicU32 {
    match led {
        Led::Run => &RUN_PATTERN,
        Led::Fault => &FAULT_PATTERN,
    }
}

/// パターンを設定（割り込みコンテキストからも呼び出し可）
pub fn set_pattern(led: Led, pattern: BlinkPattern) {
    let packed = ((pattern.rate as u32) << 16) | pattern.period as u32;
    slot(led).store(packed, Ordering::Relaxed);
}

fn pattern(led: Led) -> BlinkPattern {
    let packed = slot(led).load(Ordering::Relaxed);
    BlinkPattern {
        rate: (packed >> 16) as u16,
        period: packed as u16,
    }
}

/// LED制御タスク
#[embassy_executor::task]
pub async fn led_task(mut run_led: Output<'static>, mut fault_led: Output<'static>) {
    info!("LED task started");

    loop {
        let elapsed_ms = Instant::now().as_millis() as u32;

        for (led, output) in [(Led::Run, &mut run_led), (Led::Fault, &mut fault_led)] {
            if pattern(led).is_lit(elapsed_ms) {
                output.set_high();
            } else {
                output.set_low();
            }
        }

        Timer::after(Duration::from_millis(LED_UPDATE_MS)).await;
    }
}
