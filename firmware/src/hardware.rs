//! ハードウェア初期化モジュール
//!
//! ペリフェラルの初期化ロジックを集約します。

use embassy_stm32::{pac, Config};

use crate::config::pwm::UPDATE_IRQ_PRIORITY;
use crate::fmt::*;
use crate::{commutation_timer, hall_tim, state};

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::mux::{Adcsel, ClockMux};
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R;

        let mut clock_mux = ClockMux::default();
        clock_mux.adc12sel = Adcsel::SYS;
        config.rcc.mux = clock_mux;
    }
    config
}

/// 前回のリセットが独立ウォッチドッグによるものか（フラグはクリアする）
pub fn take_watchdog_reset() -> bool {
    let rcc = pac::RCC;
    let iwdg_reset = rcc.csr().read().iwdgrstf();
    rcc.csr().modify(|w| w.set_rmvf(true));
    iwdg_reset
}

/// Hall（TIM4）と転流（TIM6）タイマーを初期化
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む
pub unsafe fn init_timers() {
    info!("Initializing TIM4 Hall Sensor Interface (XOR mode)...");
    hall_tim::init_hall_timer();
    info!("Initializing TIM6 commutation timer...");
    commutation_timer::init_commutation_timer();
}

/// TIM1更新割り込み（PWM周期）を有効化
///
/// # Safety
/// PACを使用した直接レジスタ操作を含む。TIM1はComplementaryPwmで設定済みであること
pub unsafe fn enable_pwm_update_interrupt() {
    let tim1 = pac::TIM1;
    tim1.sr().modify(|w| w.set_uif(false));
    tim1.dier().modify(|w| w.set_uie(true));

    cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM1_UP_TIM16);
    let mut cp = cortex_m::Peripherals::steal();
    cp.NVIC
        .set_priority(pac::Interrupt::TIM1_UP_TIM16, UPDATE_IRQ_PRIORITY);
}

/// TIM1更新割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM1_UP_TIM16() {
    let tim1 = pac::TIM1;
    if tim1.sr().read().uif() {
        tim1.sr().modify(|w| w.set_uif(false));
        state::on_pwm_period();
    }
}
