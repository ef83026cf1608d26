//! TIM4ベースのHallセンサーインターフェース実装
//!
//! STM32のハードウェアHall Sensor Interface Mode（XORモード）を使用して、
//! 3つのHallセンサー入力のエッジ検出と、エッジ間隔のキャプチャを行います。
//!
//! ## ハードウェア構成
//! - TIM4_CH1 (PB6): Hall H1
//! - TIM4_CH2 (PB7): Hall H2
//! - TIM4_CH3 (PB8): Hall H3
//! - クロック: 170MHz (APB1)
//!
//! エッジごとに [`crate::state::on_hall_edge`] を呼び出し、台形波駆動の転流を行います。

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use embassy_stm32::pac;

use crate::config::timers::{HALL_IRQ_PRIORITY, HALL_TIMEOUT_OVERFLOWS, TIMER_CLOCK_HZ};
use crate::state;

/// 最後にキャプチャしたHall状態
static HALL_STATE: AtomicU8 = AtomicU8::new(0);

/// オーバーフローカウンタ（65536カウントごとにインクリメント、キャプチャ時にリセット）
static OVERFLOW_COUNTER: AtomicU32 = AtomicU32::new(0);

/// 直近のエッジ間隔 [タイマーカウント]、0は停止
/// period = (overflow << 16) | capture
static PERIOD_CYCLES: AtomicU32 = AtomicU32::new(0);

/// タイムアウトフラグ（モーター停止検出）
static TIMEOUT_FLAG: AtomicU8 = AtomicU8::new(1);

/// PB6/PB7/PB8 をAF2に設定
unsafe fn configure_pin(gpiob: pac::gpio::Gpio, pin: usize) {
    gpiob
        .moder()
        .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::ALTERNATE));
    gpiob.afr(pin / 8).modify(|w| w.set_afr(pin % 8, 2));
    // 外部プルアップ抵抗あり
    gpiob
        .pupdr()
        .modify(|w| w.set_pupdr(pin, pac::gpio::vals::Pupdr::FLOATING));
    gpiob
        .ospeedr()
        .modify(|w| w.set_ospeedr(pin, pac::gpio::vals::Ospeedr::VERY_HIGH_SPEED));
}

/// TIM4 Hall Sensor Interface の初期化
///
/// # Safety
/// PACを使用した直接的なレジスタ操作を含むため、unsafe
pub unsafe fn init_hall_timer() {
    let rcc = pac::RCC;
    let tim4 = pac::TIM4;
    let gpiob = pac::GPIOB;

    // 1. クロック有効化
    rcc.ahb2enr().modify(|w| w.set_gpioben(true));
    rcc.apb1enr1().modify(|w| w.set_tim4en(true));

    // 2. GPIO設定
    for pin in [6, 7, 8] {
        configure_pin(gpiob, pin);
    }

    // 3. TIM4設定（170MHzフルスピード、16ビットフルレンジ）
    tim4.cr1().modify(|w| w.set_cen(false));
    tim4.psc().write_value(0);
    tim4.arr().write_value(pac::timer::regs::ArrCore(0xFFFF));

    // 4. Hall Sensor Interface Mode
    // CH1/CH2/CH3をXOR -> TI1、TI1のエッジでカウンターをリセット
    tim4.cr2().modify(|w| {
        w.set_ti1s(pac::timer::vals::Ti1s::XOR);
    });
    tim4.smcr().modify(|w| {
        w.set_ts(pac::timer::vals::Ts::TI1F_ED);
        w.set_sms(pac::timer::vals::Sms::RESET_MODE);
    });

    // 5. CH1でTRCをキャプチャ（8サイクルフィルタ）
    tim4.ccmr_input(0).modify(|w| {
        w.set_ccs(0, pac::timer::vals::CcmrInputCcs::TRC);
        w.set_icf(0, pac::timer::vals::FilterValue::FCK_INT_N8);
    });
    tim4.ccer().modify(|w| {
        w.set_cce(0, true);
        w.set_ccp(0, false);
    });

    // 6. 割り込み: CC1（エッジ）とUPDATE（オーバーフロー）
    tim4.dier().modify(|w| {
        w.set_ccie(0, true);
        w.set_uie(true);
    });

    cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM4);
    let mut cp = cortex_m::Peripherals::steal();
    cp.NVIC.set_priority(pac::Interrupt::TIM4, HALL_IRQ_PRIORITY);

    // 7. カウンタをリセットしてタイマー開始
    tim4.cnt().write_value(pac::timer::regs::CntCore(0));
    tim4.sr().write(|w| w.0 = 0);
    tim4.egr().write(|w| w.set_ug(true));

    tim4.cr1().modify(|w| {
        w.set_cen(true);
        w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY);
    });

    HALL_STATE.store(read_hall_state(), Ordering::Relaxed);
}

/// TIM4割り込みハンドラー（Capture/Compare 1 + Update）
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
unsafe fn tim4_irq_handler() {
    let tim4 = pac::TIM4;
    let sr = tim4.sr().read();

    // UPDATE割り込み（オーバーフロー）
    if sr.uif() {
        tim4.sr().modify(|w| w.set_uif(false));

        let overflow_count = OVERFLOW_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        if overflow_count > HALL_TIMEOUT_OVERFLOWS {
            TIMEOUT_FLAG.store(1, Ordering::Relaxed);
            PERIOD_CYCLES.store(0, Ordering::Relaxed);
        }
    }

    // CAPTURE/COMPARE 1割り込み（Hallエッジ検出）
    if sr.ccif(0) {
        tim4.sr().modify(|w| w.set_ccif(0, false));

        let capture = tim4.ccr(0).read().ccr() as u32;
        let overflow = OVERFLOW_COUNTER.swap(0, Ordering::Relaxed);
        let hall_state = read_hall_state();

        // タイムアウト直後の最初のエッジは間隔として無効
        if TIMEOUT_FLAG.swap(0, Ordering::Relaxed) == 0 {
            PERIOD_CYCLES.store((overflow << 16) | capture, Ordering::Relaxed);
        }
        HALL_STATE.store(hall_state, Ordering::Relaxed);

        state::on_hall_edge(hall_state);
    }
}

/// TIM4割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM4() {
    tim4_irq_handler();
}

/// 現在のHall状態をGPIOから直接読み取り（H3:H2:H1）
#[inline(always)]
pub fn read_hall_state() -> u8 {
    let idr = pac::GPIOB.idr().read();
    let h1 = idr.idr(6) as u8;
    let h2 = idr.idr(7) as u8;
    let h3 = idr.idr(8) as u8;
    (h3 << 2) | (h2 << 1) | h1
}

/// 最後のエッジでキャプチャしたHall状態
#[inline(always)]
pub fn last_hall_state() -> u8 {
    HALL_STATE.load(Ordering::Relaxed)
}

/// タイムアウト（エッジが途絶えている）か
#[inline(always)]
pub fn is_timeout() -> bool {
    TIMEOUT_FLAG.load(Ordering::Relaxed) != 0
}

/// 直近のエッジ間隔から機械角速度を計算 [RPM]
///
/// # Arguments
/// * `num_poles` - モーターの極数
pub fn speed_rpm(num_poles: u8) -> u32 {
    period_to_rpm(PERIOD_CYCLES.load(Ordering::Relaxed), num_poles)
}

/// エッジ間隔 [タイマーカウント] → 機械角速度 [RPM]
///
/// 6エッジ/電気角1回転、極対数 = num_poles / 2 電気回転/機械角1回転:
/// RPM = clock * 60 / (6 * period * num_poles / 2) = clock * 20 / (period * num_poles)
#[inline(always)]
pub fn period_to_rpm(period_cycles: u32, num_poles: u8) -> u32 {
    let den = period_cycles as u64 * num_poles as u64;
    if den == 0 {
        return 0;
    }
    ((TIMER_CLOCK_HZ as u64 * 20) / den).min(u32::MAX as u64) as u32
}
