//! グローバル共有状態管理
//!
//! 駆動コントローラとボードは割り込みとタスクの両方から操作されるため、
//! `critical_section::Mutex` で保護して管理します。操作コマンドはチャネル経由で
//! 制御タスクに渡され、ティックの合間に適用されます。

use core::cell::RefCell;

use bldc_drive::{DriveController, DriveParameters, DriveStatus};
use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::board::Board;
use crate::config::COMMAND_QUEUE_DEPTH;

/// 駆動コントローラとボード実装の組
pub struct Drive {
    pub controller: DriveController,
    pub board: Board,
}

/// 操作コマンド
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Run,
    Stop,
    EmergencyStop,
    /// true = 正転
    SetDirection(bool),
    /// [RPM]
    SetTargetSpeed(u32),
    /// 積分ゲイン（16.16のビット値）
    SetIntegralGain(i32),
    SetParameters(DriveParameters),
    ClearFaults,
}

static DRIVE: Mutex<RefCell<Option<Drive>>> = Mutex::new(RefCell::new(None));

/// 操作コマンドキュー
pub static COMMANDS: Channel<CriticalSectionRawMutex, Command, COMMAND_QUEUE_DEPTH> =
    Channel::new();

/// 駆動コンテキストを登録（以降、割り込みから操作される）
pub fn install(drive: Drive) {
    critical_section::with(|cs| {
        DRIVE.borrow(cs).replace(Some(drive));
    });
}

/// クリティカルセクション内で駆動コンテキストを操作
///
/// 未登録なら `None`
pub fn with_drive<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut DriveController, &mut Board) -> R,
{
    critical_section::with(|cs| {
        let mut drive = DRIVE.borrow(cs).borrow_mut();
        drive
            .as_mut()
            .map(|drive| f(&mut drive.controller, &mut drive.board))
    })
}

/// PWM周期（TIM1更新割り込み）
#[inline(always)]
pub fn on_pwm_period() {
    with_drive(|controller, board| controller.waveform_tick(board));
}

/// Hallエッジ（TIM4割り込み）
#[inline(always)]
pub fn on_hall_edge(hall: u8) {
    with_drive(|controller, board| controller.hall_edge(hall, board));
}

/// 始動用転流タイマー満了（TIM6割り込み）
#[inline(always)]
pub fn on_commutation_timer() {
    with_drive(|controller, board| controller.commutation_timer_expired(board));
}

/// テレメトリ用スナップショット
pub fn status() -> Option<DriveStatus> {
    with_drive(|controller, _| controller.status())
}
