//! TIM6ベースのワンショット転流タイマー
//!
//! センサーレス始動中のオープンループ転流に使用します。1カウント1µsで動作し、
//! 満了すると [`crate::state::on_commutation_timer`] を呼び出します。

use embassy_stm32::pac;

use crate::config::timers::{COMMUTATION_IRQ_PRIORITY, COMMUTATION_PRESCALER};
use crate::state;

/// 16ビットタイマーで表現できる最大周期 [µs]
const MAX_PERIOD_US: u32 = 0xFFFF;

fn period_to_arr(period_us: u32) -> u32 {
    period_us.clamp(1, MAX_PERIOD_US)
}

/// TIM6 の初期化（停止状態）
///
/// # Safety
/// PACを使用した直接的なレジスタ操作を含むため、unsafe
pub unsafe fn init_commutation_timer() {
    let tim6 = pac::TIM6;

    pac::RCC.apb1enr1().modify(|w| w.set_tim6en(true));

    tim6.cr1().modify(|w| {
        w.set_cen(false);
        w.set_opm(true); // ワンショット
        w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY);
    });
    tim6.psc().write_value(COMMUTATION_PRESCALER);
    tim6.arr().write_value(pac::timer::regs::ArrCore(MAX_PERIOD_US));
    // プリスケーラ反映（URS=COUNTER_ONLYなので割り込みは発生しない）
    tim6.egr().write(|w| w.set_ug(true));
    tim6.sr().write(|w| w.0 = 0);
    tim6.dier().modify(|w| w.set_uie(true));

    cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM6_DAC);
    let mut cp = cortex_m::Peripherals::steal();
    cp.NVIC
        .set_priority(pac::Interrupt::TIM6_DAC, COMMUTATION_IRQ_PRIORITY);
}

/// `period_us` 後に満了するよう起動
pub fn arm(period_us: u32) {
    let tim6 = pac::TIM6;
    tim6.cr1().modify(|w| w.set_cen(false));
    tim6.arr()
        .write_value(pac::timer::regs::ArrCore(period_to_arr(period_us)));
    tim6.cnt().write_value(pac::timer::regs::CntCore(0));
    tim6.sr().write(|w| w.0 = 0);
    tim6.cr1().modify(|w| w.set_cen(true));
}

/// 周期を更新（動作中なら現在のカウントから新しい周期で満了）
pub fn set_period(period_us: u32) {
    pac::TIM6
        .arr()
        .write_value(pac::timer::regs::ArrCore(period_to_arr(period_us)));
}

/// 停止し、保留中の満了を破棄
pub fn cancel() {
    let tim6 = pac::TIM6;
    tim6.cr1().modify(|w| w.set_cen(false));
    tim6.sr().write(|w| w.0 = 0);
}

/// TIM6割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM6_DAC() {
    let tim6 = pac::TIM6;
    if tim6.sr().read().uif() {
        tim6.sr().modify(|w| w.set_uif(false));
        state::on_commutation_timer();
    }
}
